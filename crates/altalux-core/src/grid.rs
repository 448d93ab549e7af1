//! Tile grid geometry.
//!
//! The image is covered by `horizontal_regions × vertical_regions` tiles of
//! `region_width × region_height` pixels, anchored at the top-left corner.
//! Pixels to the right of or below the last full tile are not part of any
//! tile histogram.
//!
//! Interpolation happens on a second grid of blocks shifted by half a tile,
//! with one more column and row than the tile grid:
//!
//! ```text
//!  tile columns:   |   0   |   1   |   2   |rem|
//!  block columns:  | 0 |   1   |   2   |  3    |
//! ```
//!
//! The first block column is half a tile wide and only sees tile column 0.
//! Interior block columns blend two neighbouring tile columns. The last block
//! column runs to the right edge of the image (remainder included) and only
//! sees the last tile column. Rows work the same way.

use std::ops::Range;

use crate::{DEFAULT_REGIONS, MAX_REGIONS, MIN_REGIONS};

/// One column (or row) of interpolation blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    /// First pixel covered by the span
    pub start: usize,
    /// Number of pixels covered
    pub len: usize,
    /// Tile index weighted at the start of the span (left / up)
    pub near: usize,
    /// Tile index weighted at the end of the span (right / bottom)
    pub far: usize,
}

impl BlockSpan {
    /// Pixel range covered by the span.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

/// Geometry of the tile grid for a fixed image size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    width: usize,
    height: usize,
    horizontal_regions: usize,
    vertical_regions: usize,
    region_width: usize,
    region_height: usize,
}

impl TileGrid {
    /// Create a grid for a `width × height` image.
    ///
    /// Tile counts are clamped to `[MIN_REGIONS, MAX_REGIONS]`.
    pub fn new(width: u32, height: u32, horizontal_regions: u32, vertical_regions: u32) -> Self {
        let horizontal_regions = clamp_regions(horizontal_regions) as usize;
        let vertical_regions = clamp_regions(vertical_regions) as usize;
        let width = width as usize;
        let height = height as usize;

        Self {
            width,
            height,
            horizontal_regions,
            vertical_regions,
            region_width: width / horizontal_regions,
            region_height: height / vertical_regions,
        }
    }

    /// Create a grid with the default tile counts.
    pub fn with_default_regions(width: u32, height: u32) -> Self {
        Self::new(width, height, DEFAULT_REGIONS, DEFAULT_REGIONS)
    }

    /// Full image width, which is also the row stride of the luminance plane.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Full image height.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn horizontal_regions(&self) -> usize {
        self.horizontal_regions
    }

    pub fn vertical_regions(&self) -> usize {
        self.vertical_regions
    }

    pub fn region_width(&self) -> usize {
        self.region_width
    }

    pub fn region_height(&self) -> usize {
        self.region_height
    }

    /// Number of pixels in one tile.
    pub fn region_area(&self) -> usize {
        self.region_width * self.region_height
    }

    /// Width covered by whole tiles.
    pub fn image_width(&self) -> usize {
        self.region_width * self.horizontal_regions
    }

    /// Height covered by whole tiles.
    pub fn image_height(&self) -> usize {
        self.region_height * self.vertical_regions
    }

    /// Total number of tiles.
    pub fn tile_count(&self) -> usize {
        self.horizontal_regions * self.vertical_regions
    }

    /// Number of luminance samples in the full image.
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True when tiles would be empty (image smaller than the grid).
    pub fn is_degenerate(&self) -> bool {
        self.region_width == 0 || self.region_height == 0
    }

    /// Row-major index of tile `(tx, ty)` in the mapping array.
    #[inline]
    pub fn tile_index(&self, tx: usize, ty: usize) -> usize {
        ty * self.horizontal_regions + tx
    }

    /// Top-left pixel of tile `(tx, ty)`.
    #[inline]
    pub fn tile_origin(&self, tx: usize, ty: usize) -> (usize, usize) {
        (tx * self.region_width, ty * self.region_height)
    }

    /// Block column `index` in `0..=horizontal_regions`.
    pub fn block_column(&self, index: usize) -> BlockSpan {
        block_span(index, self.horizontal_regions, self.region_width, self.width)
    }

    /// Block row `index` in `0..=vertical_regions`.
    pub fn block_row(&self, index: usize) -> BlockSpan {
        block_span(index, self.vertical_regions, self.region_height, self.height)
    }

    /// Iterate over all block columns from left to right.
    pub fn block_columns(&self) -> impl Iterator<Item = BlockSpan> + '_ {
        (0..=self.horizontal_regions).map(|index| self.block_column(index))
    }
}

fn clamp_regions(regions: u32) -> u32 {
    let clamped = regions.clamp(MIN_REGIONS, MAX_REGIONS);
    if clamped != regions {
        tracing::warn!(requested = regions, clamped, "tile count out of range");
    }
    clamped
}

fn block_span(index: usize, regions: usize, region_size: usize, extent: usize) -> BlockSpan {
    let half = region_size / 2;
    if index == 0 {
        BlockSpan {
            start: 0,
            len: half,
            near: 0,
            far: 0,
        }
    } else if index >= regions {
        let start = half + (regions - 1) * region_size;
        BlockSpan {
            start,
            len: extent.saturating_sub(start),
            near: regions - 1,
            far: regions - 1,
        }
    } else {
        BlockSpan {
            start: half + (index - 1) * region_size,
            len: region_size,
            near: index - 1,
            far: index,
        }
    }
}
