//! Per-tile histogram computation, clipping and equalization mapping.
//!
//! These are the phase-1 kernels of CLAHE. A tile histogram is built with
//! [`make_histogram`], limited with [`clip_histogram`] and turned into a gray
//! level lookup table in place with [`map_histogram`].

use crate::{MAX_GRAY_VALUE, NUM_GRAY_LEVELS};

/// 256-bin gray level histogram. After [`map_histogram`] it holds a mapping.
pub type Histogram = [u32; NUM_GRAY_LEVELS];

/// Count the gray levels of a tile given as row slices.
///
/// The output is cleared first. Each item is the part of one image row that
/// belongs to the tile, so pixels outside the tile are never counted.
///
/// # Arguments
/// * `rows` - Tile rows, each `tile_width` bytes long
/// * `histogram` - Output bins
pub fn make_histogram<'a, I>(rows: I, histogram: &mut Histogram)
where
    I: IntoIterator<Item = &'a [u8]>,
{
    histogram.fill(0);
    for row in rows {
        for &pixel in row {
            histogram[pixel as usize] += 1;
        }
    }
}

/// Histogram of the `width × height` tile at `(x, y)` of a plane with the given stride.
///
/// # Panics
/// Panics if the tile does not lie inside `image`.
pub fn tile_histogram(
    image: &[u8],
    stride: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> Histogram {
    let mut histogram = [0u32; NUM_GRAY_LEVELS];
    let rows = (y..y + height).map(|row| {
        let start = row * stride + x;
        &image[start..start + width]
    });
    make_histogram(rows, &mut histogram);
    histogram
}

/// Clip a histogram and redistribute the clipped counts.
///
/// Bins above `clip_limit` are cut down and the excess is spread over the
/// bins below the limit: first an even increment, then one count at a time
/// with a stride that shrinks as the remaining excess does. The total count is
/// preserved and no bin ends up above the limit.
///
/// A `clip_limit` of 0 disables clipping (plain adaptive equalization). When
/// `256 * clip_limit` is smaller than the total count the limit is raised to
/// the smallest value that can hold it, otherwise the redistribution could
/// never finish.
pub fn clip_histogram(histogram: &mut Histogram, clip_limit: u32) {
    if clip_limit == 0 {
        return;
    }

    let total: u64 = histogram.iter().map(|&bin| bin as u64).sum();
    if total == 0 {
        return;
    }
    let capacity_limit = total.div_ceil(NUM_GRAY_LEVELS as u64) as u32;
    let limit = clip_limit.max(capacity_limit);

    let mut excess: u32 = histogram
        .iter()
        .map(|&bin| bin.saturating_sub(limit))
        .sum();
    if excess == 0 {
        return;
    }

    // Even share first; bins too close to the limit are topped off instead.
    let bin_incr = excess / NUM_GRAY_LEVELS as u32;
    let upper = limit.saturating_sub(bin_incr);
    for bin in histogram.iter_mut() {
        if *bin > limit {
            *bin = limit;
        } else if *bin > upper {
            excess -= limit - *bin;
            *bin = limit;
        } else {
            excess -= bin_incr;
            *bin += bin_incr;
        }
    }

    // Every pass over the start offsets places at least one count, since the
    // limit leaves room for the whole total.
    while excess > 0 {
        let mut start = 0;
        while excess > 0 && start < NUM_GRAY_LEVELS {
            let step = (NUM_GRAY_LEVELS / excess as usize).max(1);
            let mut index = start;
            while index < NUM_GRAY_LEVELS && excess > 0 {
                if histogram[index] < limit {
                    histogram[index] += 1;
                    excess -= 1;
                }
                index += step;
            }
            start += 1;
        }
    }
}

/// Turn a histogram into an equalization lookup table, in place.
///
/// Entry `i` becomes the cumulative count up to `i`, scaled to `[0, 255]` and
/// rounded half up. The result is non-decreasing.
pub fn map_histogram(histogram: &mut Histogram, num_pixels: u32) {
    if num_pixels == 0 {
        histogram.fill(0);
        return;
    }

    let num_pixels = num_pixels as u64;
    let mut sum: u64 = 0;
    for bin in histogram.iter_mut() {
        sum += *bin as u64;
        let target = (sum * MAX_GRAY_VALUE as u64 + num_pixels / 2) / num_pixels;
        *bin = target.min(MAX_GRAY_VALUE as u64) as u32;
    }
}

/// Per-tile clip cap for a clip fraction and tile area.
///
/// The cap is `clip_fraction * area / 256`, rounded down and at least 1. A
/// clip fraction of zero or below yields 0, which [`clip_histogram`] treats as
/// "do not clip".
pub fn tile_clip_limit(clip_fraction: f32, region_area: usize) -> u32 {
    if clip_fraction <= 0.0 {
        return 0;
    }
    let limit = (clip_fraction as f64 * region_area as f64) / NUM_GRAY_LEVELS as f64;
    (limit as u32).max(1)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
