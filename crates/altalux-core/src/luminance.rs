//! Luminance extraction and re-injection for interleaved pixel formats.
//!
//! Color pixels are reduced to an 8-bit luma plane with BT.601 weights in
//! Q15 fixed point. After the plane has been processed the new luma is pushed
//! back by scaling all three color channels by `new / old`, which keeps hue and
//! saturation. Packed YUV 4:2:2 only needs its luma bytes copied in and out.

use std::sync::OnceLock;

/// BT.601 red weight, `0.299 * 2^15` truncated.
pub const LUMA_FACTOR_R: u32 = 9797;
/// BT.601 green weight, `0.587 * 2^15` truncated.
pub const LUMA_FACTOR_G: u32 = 19234;
/// BT.601 blue weight, `0.114 * 2^15` truncated.
pub const LUMA_FACTOR_B: u32 = 3735;

const LUMA_SHIFT: u32 = 15;
const LUMA_ROUND: u32 = 1 << (LUMA_SHIFT - 1);

const SCALE_SHIFT: u32 = 16;
const SCALE_ROUND: u32 = 1 << (SCALE_SHIFT - 1);

/// Order of the three color bytes in a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Luma weights in byte order.
    #[inline]
    pub fn factors(self) -> [u32; 3] {
        match self {
            ChannelOrder::Rgb => [LUMA_FACTOR_R, LUMA_FACTOR_G, LUMA_FACTOR_B],
            ChannelOrder::Bgr => [LUMA_FACTOR_B, LUMA_FACTOR_G, LUMA_FACTOR_R],
        }
    }
}

/// Byte layout of an interleaved color pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorLayout {
    pub order: ChannelOrder,
    /// 3, or 4 when a trailing alpha/padding byte is present
    pub bytes_per_pixel: usize,
}

impl ColorLayout {
    pub const RGB24: Self = Self::new(ChannelOrder::Rgb, 3);
    pub const RGB32: Self = Self::new(ChannelOrder::Rgb, 4);
    pub const BGR24: Self = Self::new(ChannelOrder::Bgr, 3);
    pub const BGR32: Self = Self::new(ChannelOrder::Bgr, 4);

    pub const fn new(order: ChannelOrder, bytes_per_pixel: usize) -> Self {
        Self {
            order,
            bytes_per_pixel,
        }
    }
}

/// Position of the luma byte inside each 2-byte packed YUV 4:2:2 sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YuvOrder {
    /// YUYV and YVYU
    LumaFirst,
    /// UYVY and VYUY
    ChromaFirst,
}

impl YuvOrder {
    #[inline]
    pub fn luma_offset(self) -> usize {
        match self {
            YuvOrder::LumaFirst => 0,
            YuvOrder::ChromaFirst => 1,
        }
    }
}

/// Luma of one pixel given its first three bytes and weights in byte order.
#[inline]
pub fn luma(c0: u8, c1: u8, c2: u8, factors: [u32; 3]) -> u8 {
    let sum = c0 as u32 * factors[0] + c1 as u32 * factors[1] + c2 as u32 * factors[2];
    ((sum + LUMA_ROUND) >> LUMA_SHIFT).min(255) as u8
}

/// Fill `dst` with the luma of each pixel in `src`.
///
/// Stops at whichever of the two runs out first.
pub fn extract_luma(src: &[u8], layout: ColorLayout, dst: &mut [u8]) {
    let factors = layout.order.factors();
    for (pixel, y) in src.chunks_exact(layout.bytes_per_pixel).zip(dst.iter_mut()) {
        *y = luma(pixel[0], pixel[1], pixel[2], factors);
    }
}

/// Push a processed luma plane back into the color pixels of `dst`.
///
/// Pixels whose luma did not change are not touched. Black pixels have no
/// ratio to scale by and become gray at the new luma. The fourth byte of
/// 32-bit layouts is never modified.
pub fn inject_luma(dst: &mut [u8], layout: ColorLayout, luma_plane: &[u8]) {
    let factors = layout.order.factors();
    let table = scale_table();

    for (pixel, &new) in dst
        .chunks_exact_mut(layout.bytes_per_pixel)
        .zip(luma_plane.iter())
    {
        let old = luma(pixel[0], pixel[1], pixel[2], factors);
        if new == old {
            continue;
        }
        if old == 0 {
            pixel[..3].fill(new);
            continue;
        }

        let scale = table[((old as usize) << 8) | new as usize];
        for channel in &mut pixel[..3] {
            let scaled = (*channel as u32 * scale + SCALE_ROUND) >> SCALE_SHIFT;
            *channel = scaled.min(255) as u8;
        }
    }
}

/// Copy the luma bytes of a packed YUV 4:2:2 buffer into `dst`.
pub fn extract_packed_luma(src: &[u8], order: YuvOrder, dst: &mut [u8]) {
    let offset = order.luma_offset();
    for (sample, y) in src.chunks_exact(2).zip(dst.iter_mut()) {
        *y = sample[offset];
    }
}

/// Write a luma plane back into a packed YUV 4:2:2 buffer, leaving chroma as is.
pub fn inject_packed_luma(dst: &mut [u8], order: YuvOrder, luma_plane: &[u8]) {
    let offset = order.luma_offset();
    for (sample, &y) in dst.chunks_exact_mut(2).zip(luma_plane.iter()) {
        sample[offset] = y;
    }
}

/// `(new << 16) / old`, rounded, indexed by `old << 8 | new`. Row 0 is unused.
fn scale_table() -> &'static [u32] {
    static TABLE: OnceLock<Box<[u32]>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = vec![0u32; 256 * 256];
        for old in 1..256u32 {
            for new in 0..256u32 {
                table[((old << 8) | new) as usize] = ((new << SCALE_SHIFT) + old / 2) / old;
            }
        }
        table.into_boxed_slice()
    })
}
