//! Bilinear reconstruction of an interpolation block.
//!
//! Every pixel is replaced by a blend of the four surrounding tile mappings
//! evaluated at its own gray level. The weights depend only on the pixel's
//! position inside the block, so the block at the top-left corner of the four
//! tile centers is fully `left_up` and the opposite corner tends to
//! `right_bottom`.

use crate::histogram::Histogram;

/// The four tile mappings around one interpolation block.
///
/// Border blocks pass the same mapping for both sides of the collapsed axis.
#[derive(Debug, Clone, Copy)]
pub struct BlockMappings<'a> {
    pub left_up: &'a Histogram,
    pub right_up: &'a Histogram,
    pub left_bottom: &'a Histogram,
    pub right_bottom: &'a Histogram,
}

impl<'a> BlockMappings<'a> {
    /// Block that sees a single tile on both axes.
    pub fn single(mapping: &'a Histogram) -> Self {
        Self {
            left_up: mapping,
            right_up: mapping,
            left_bottom: mapping,
            right_bottom: mapping,
        }
    }
}

/// Interpolate one block in place.
///
/// `rows` yields the block's rows, each at least `width` bytes long; only the
/// first `width` bytes of each row are touched. The block height is the
/// number of rows. Zero-sized blocks are left alone.
///
/// # Arguments
/// * `rows` - Mutable row segments of the block, top to bottom
/// * `width` - Block width in pixels
/// * `mappings` - Tile mappings at the block's four corners
pub fn interpolate<'a, R>(rows: R, width: usize, mappings: &BlockMappings<'_>)
where
    R: IntoIterator<Item = &'a mut [u8]>,
    R::IntoIter: ExactSizeIterator,
{
    let rows = rows.into_iter();
    let height = rows.len();
    if width == 0 || height == 0 {
        return;
    }

    let area = (width * height) as u64;
    let shift = area.is_power_of_two().then(|| area.trailing_zeros());
    let BlockMappings {
        left_up,
        right_up,
        left_bottom,
        right_bottom,
    } = *mappings;

    for (y, row) in rows.enumerate() {
        let y_coef = y as u64;
        let y_inv = (height - y) as u64;

        for (x, pixel) in row[..width].iter_mut().enumerate() {
            let gray = *pixel as usize;
            let x_coef = x as u64;
            let x_inv = (width - x) as u64;

            let top = x_inv * left_up[gray] as u64 + x_coef * right_up[gray] as u64;
            let bottom = x_inv * left_bottom[gray] as u64 + x_coef * right_bottom[gray] as u64;
            let sum = y_inv * top + y_coef * bottom;

            let value = match shift {
                Some(shift) => sum >> shift,
                None => (sum + area / 2) / area,
            };
            *pixel = value.min(255) as u8;
        }
    }
}
