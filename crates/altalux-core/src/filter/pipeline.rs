//! Row program shared by all run strategies.
//!
//! Tile row `y` is processed in two steps:
//!
//! 1. **map**: histogram, clip and map each tile of row `y`, publishing the
//!    column count after every tile.
//! 2. **interpolate**: rebuild block row `y`, waiting for row `y - 1` to have
//!    mapped each block's right-hand tile before touching it.
//!
//! Strategies only differ in which threads run those steps and which
//! [`RowSync`] carries the progress between them.

use std::marker::PhantomData;
use std::slice;
use std::sync::OnceLock;
use std::thread;

use rayon::prelude::*;
use tracing::trace;

use super::sync::{EventSync, RowSync, SpinSync, Unsynchronized};
use super::types::{AltaLuxError, Strategy};
use crate::grid::TileGrid;
use crate::histogram::{clip_histogram, make_histogram, map_histogram, Histogram};
use crate::interpolate::{interpolate, BlockMappings};

/// Run CLAHE over `plane` (row stride `grid.width()`) with the given strategy.
///
/// `clip_limit` is the per-tile bin cap, 0 for unclipped equalization.
pub(crate) fn run_strategy(
    strategy: Strategy,
    grid: &TileGrid,
    plane: &mut [u8],
    clip_limit: u32,
) -> Result<(), AltaLuxError> {
    let rows = grid.vertical_regions();
    match strategy {
        Strategy::Serial => RowPipeline::new(grid, plane, clip_limit, Unsynchronized)?.run_serial(),
        Strategy::ParallelSplitLoop => {
            RowPipeline::new(grid, plane, clip_limit, Unsynchronized)?.run_split_loop()
        }
        Strategy::ParallelEvent => {
            RowPipeline::new(grid, plane, clip_limit, EventSync::new(rows))?.run_pipelined()
        }
        Strategy::ParallelActiveWait => {
            RowPipeline::new(grid, plane, clip_limit, SpinSync::new(rows))?.run_pipelined()
        }
    }
    Ok(())
}

/// Shared view of the luma plane handing out row segments to several threads.
///
/// SAFETY: Callers must ensure that a segment returned by `row_mut` never
/// overlaps another live segment. The row program guarantees this by only
/// writing a block after every histogram that reads its pixels has published.
struct SharedPlane<'a> {
    ptr: *mut u8,
    len: usize,
    stride: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

unsafe impl Send for SharedPlane<'_> {}
unsafe impl Sync for SharedPlane<'_> {}

impl<'a> SharedPlane<'a> {
    fn new(plane: &'a mut [u8], stride: usize) -> Self {
        Self {
            ptr: plane.as_mut_ptr(),
            len: plane.len(),
            stride,
            _marker: PhantomData,
        }
    }

    fn offset(&self, y: usize, x: usize, len: usize) -> usize {
        let start = y * self.stride + x;
        assert!(
            x + len <= self.stride && start + len <= self.len,
            "row segment ({x}, {y}) +{len} outside plane"
        );
        start
    }

    /// # Safety
    /// No `row_mut` segment overlapping this one may be live.
    unsafe fn row(&self, y: usize, x: usize, len: usize) -> &[u8] {
        let start = self.offset(y, x, len);
        unsafe { slice::from_raw_parts(self.ptr.add(start), len) }
    }

    /// # Safety
    /// No other segment overlapping this one may be live.
    #[allow(clippy::mut_from_ref)]
    unsafe fn row_mut(&self, y: usize, x: usize, len: usize) -> &mut [u8] {
        let start = self.offset(y, x, len);
        unsafe { slice::from_raw_parts_mut(self.ptr.add(start), len) }
    }
}

/// One write-once mapping per tile, row-major.
struct MappingArray {
    cells: Vec<OnceLock<Histogram>>,
}

impl MappingArray {
    fn try_new(count: usize) -> Result<Self, AltaLuxError> {
        let mut cells = Vec::new();
        cells.try_reserve_exact(count).map_err(|_| {
            tracing::warn!(tiles = count, "mapping array allocation failed");
            AltaLuxError::OutOfMemory
        })?;
        cells.resize_with(count, OnceLock::new);
        Ok(Self { cells })
    }

    fn publish(&self, index: usize, mapping: Histogram) {
        let fresh = self.cells[index].set(mapping).is_ok();
        debug_assert!(fresh, "tile {index} mapped twice");
    }

    /// Blocks until the tile has been published.
    fn get(&self, index: usize) -> &Histogram {
        self.cells[index].wait()
    }
}

struct RowPipeline<'a, S> {
    grid: &'a TileGrid,
    plane: SharedPlane<'a>,
    mappings: MappingArray,
    clip_limit: u32,
    sync: S,
}

impl<'a, S: RowSync> RowPipeline<'a, S> {
    fn new(
        grid: &'a TileGrid,
        plane: &'a mut [u8],
        clip_limit: u32,
        sync: S,
    ) -> Result<Self, AltaLuxError> {
        if plane.len() < grid.pixel_count() {
            return Err(AltaLuxError::BufferTooSmall {
                expected: grid.pixel_count(),
                actual: plane.len(),
            });
        }
        Ok(Self {
            grid,
            plane: SharedPlane::new(plane, grid.width()),
            mappings: MappingArray::try_new(grid.tile_count())?,
            clip_limit,
            sync,
        })
    }

    /// Map every tile of tile row `ty`, left to right.
    fn map_row(&self, ty: usize) {
        let grid = self.grid;
        let (tile_width, tile_height) = (grid.region_width(), grid.region_height());
        let area = grid.region_area() as u32;

        for tx in 0..grid.horizontal_regions() {
            let (x0, y0) = grid.tile_origin(tx, ty);
            // SAFETY: tile pixels are written only by blocks that wait for this
            // tile's publish below.
            let rows = (y0..y0 + tile_height).map(|y| unsafe { self.plane.row(y, x0, tile_width) });

            let mut mapping = [0u32; crate::NUM_GRAY_LEVELS];
            make_histogram(rows, &mut mapping);
            clip_histogram(&mut mapping, self.clip_limit);
            map_histogram(&mut mapping, area);

            self.mappings.publish(grid.tile_index(tx, ty), mapping);
            self.sync.publish(ty, tx + 1);
        }
        trace!(row = ty, "tile row mapped");
    }

    /// Interpolate every block of block row `by`, left to right.
    fn interpolate_row(&self, by: usize) {
        let grid = self.grid;
        let span_y = grid.block_row(by);
        if span_y.len == 0 {
            return;
        }

        for span_x in grid.block_columns() {
            if by > 0 {
                self.sync.wait(by - 1, span_x.far + 1);
            }
            if span_x.len == 0 {
                continue;
            }

            let mappings = BlockMappings {
                left_up: self.mappings.get(grid.tile_index(span_x.near, span_y.near)),
                right_up: self.mappings.get(grid.tile_index(span_x.far, span_y.near)),
                left_bottom: self.mappings.get(grid.tile_index(span_x.near, span_y.far)),
                right_bottom: self.mappings.get(grid.tile_index(span_x.far, span_y.far)),
            };
            // SAFETY: block bands of different rows are disjoint, and every
            // histogram reading these pixels has published (same thread for
            // tile row `by`, the wait above for tile row `by - 1`).
            let rows = span_y
                .range()
                .map(|y| unsafe { self.plane.row_mut(y, span_x.start, span_x.len) });
            interpolate(rows, span_x.len, &mappings);
        }
        trace!(row = by, "block row interpolated");
    }

    fn run_serial(&self) {
        let tile_rows = self.grid.vertical_regions();
        for y in 0..=tile_rows {
            if y < tile_rows {
                self.map_row(y);
            }
            self.interpolate_row(y);
        }
    }

    fn run_split_loop(&self) {
        let tile_rows = self.grid.vertical_regions();
        (0..tile_rows)
            .into_par_iter()
            .for_each(|ty| self.map_row(ty));
        (0..=tile_rows)
            .into_par_iter()
            .for_each(|by| self.interpolate_row(by));
    }

    /// One scoped thread per row. Blocking waits stay off the rayon pool.
    ///
    /// wasm32 cannot spawn threads, so the rows run in serial order there.
    /// Every wait is then already satisfied by the previous row.
    fn run_pipelined(&self) {
        if cfg!(target_arch = "wasm32") {
            trace!("no thread support, running rows in order");
            return self.run_serial();
        }
        let tile_rows = self.grid.vertical_regions();
        thread::scope(|scope| {
            for y in 0..=tile_rows {
                scope.spawn(move || {
                    if y < tile_rows {
                        self.map_row(y);
                    }
                    self.interpolate_row(y);
                });
            }
        });
    }
}
