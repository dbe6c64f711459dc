use image::{Rgb, RgbImage};

use crate::config::BLOCK_SIZE;
use crate::raster::dct::Block;

/// The 64 RGB pixels of one 8x8 block, row-major.
pub type BlockPixels = [Rgb<u8>; 64];

/// Full-range BT.601 luma of an RGB sample.
pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Copy out the 8x8 block at block coordinates `(bx, by)`.
pub fn read_block(image: &RgbImage, bx: usize, by: usize) -> BlockPixels {
    let (px, py) = (bx * BLOCK_SIZE, by * BLOCK_SIZE);
    let mut pixels = [Rgb([0u8; 3]); 64];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let (x, y) = (px + i % BLOCK_SIZE, py + i / BLOCK_SIZE);
        *pixel = *image.get_pixel(x as u32, y as u32);
    }
    pixels
}

/// Write a block back at block coordinates `(bx, by)`.
pub fn write_block(image: &mut RgbImage, bx: usize, by: usize, pixels: &BlockPixels) {
    let (px, py) = (bx * BLOCK_SIZE, by * BLOCK_SIZE);
    for (i, pixel) in pixels.iter().enumerate() {
        let (x, y) = (px + i % BLOCK_SIZE, py + i / BLOCK_SIZE);
        image.put_pixel(x as u32, y as u32, *pixel);
    }
}

pub fn block_luma(pixels: &BlockPixels) -> Block {
    let mut block = [0.0f64; 64];
    for (sample, p) in block.iter_mut().zip(pixels.iter()) {
        *sample = luma(p[0], p[1], p[2]);
    }
    block
}

/// Move every pixel from luma `from` toward luma `to`.
///
/// Chroma is held fixed, so a luma change of `d` moves R, G and B by `d` each.
/// Channels are rounded and clamped one by one, so a saturated pixel realises
/// less than `d`.
pub fn shift_luma(pixels: &BlockPixels, from: &Block, to: &Block) -> BlockPixels {
    let mut shifted = *pixels;
    for ((pixel, &old), &new) in shifted.iter_mut().zip(from.iter()).zip(to.iter()) {
        let delta = new - old;
        for sample in pixel.0.iter_mut() {
            *sample = (*sample as f64 + delta).round().clamp(0.0, 255.0) as u8;
        }
    }
    shifted
}
