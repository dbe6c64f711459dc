use image::{imageops, RgbImage};
use log::debug;
use rayon::prelude::*;

use crate::bits::{self, Utf8Policy};
use crate::config::{self, SuiteConfig, BLOCK_SIZE, DCT_EMBED_POSITIONS};
use crate::error::{Result, StegoError};
use crate::raster::dct::{Block, DctTables};
use crate::raster::luma::{self, BlockPixels};
use crate::scheme::{Scheme, StegoCodec};

const BITS_PER_BLOCK: usize = DCT_EMBED_POSITIONS.len();

/// Re-aim passes per target before trying the next one.
const REFINE_PASSES: usize = 4;

/// Luma-domain embedding in the parity of quantized DCT coefficients.
///
/// The image is cropped to whole 8x8 blocks; each block carries up to three
/// bits at mid-frequency positions, visited row-major, and the payload ends
/// with the 16-bit sentinel.
pub struct DctCodec {
    dct: DctTables,
    quant_step: f64,
}

impl DctCodec {
    pub fn new(cfg: &SuiteConfig) -> Self {
        Self {
            dct: DctTables::new(),
            quant_step: cfg.dct_quant_step,
        }
    }

    /// Crop to whole blocks, failing when not even one block fits.
    fn crop(&self, image: &RgbImage) -> Result<RgbImage> {
        let width = image.width() / BLOCK_SIZE as u32 * BLOCK_SIZE as u32;
        let height = image.height() / BLOCK_SIZE as u32 * BLOCK_SIZE as u32;
        if width == 0 || height == 0 {
            return Err(StegoError::ImageTooSmall {
                scheme: Scheme::Dct,
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(imageops::crop_imm(image, 0, 0, width, height).to_image())
    }

    fn forward(&self, luma: &Block) -> Block {
        let mut shifted = [0.0f64; 64];
        for (s, &v) in shifted.iter_mut().zip(luma.iter()) {
            *s = v - 128.0;
        }
        self.dct.forward(&shifted)
    }

    fn inverse(&self, coeffs: &Block) -> Block {
        let mut restored = self.dct.inverse(coeffs);
        for s in restored.iter_mut() {
            *s = (*s + 128.0).clamp(0.0, 255.0);
        }
        restored
    }

    fn parities(&self, coeffs: &Block) -> [u8; BITS_PER_BLOCK] {
        let mut out = [0u8; BITS_PER_BLOCK];
        for (bit, &(u, v)) in out.iter_mut().zip(DCT_EMBED_POSITIONS.iter()) {
            *bit = quantize(coeffs[u * BLOCK_SIZE + v], self.quant_step).rem_euclid(2) as u8;
        }
        out
    }

    /// Embed up to three bits into one block of pixels.
    ///
    /// Every candidate is checked by reading it back the way the decoder does.
    /// Clipping of saturated pixels can pull a coefficient off its target, so
    /// the aim is corrected by the observed error, and targets one parity step
    /// further out are tried next. Returns `None` when no candidate reads back.
    fn embed_block(&self, pixels: &BlockPixels, bits: &[u8]) -> Option<BlockPixels> {
        let original = luma::block_luma(pixels);
        let coeffs = self.forward(&original);
        let base: Vec<i64> = DCT_EMBED_POSITIONS
            .iter()
            .zip(bits)
            .map(|(&(u, v), &bit)| {
                set_parity(quantize(coeffs[u * BLOCK_SIZE + v], self.quant_step), bit)
            })
            .collect();

        for offsets in parity_preserving_offsets(bits.len()) {
            let targets: Vec<f64> = base
                .iter()
                .zip(&offsets)
                .map(|(q, o)| (q + o) as f64 * self.quant_step)
                .collect();
            let mut aim = targets.clone();

            for _ in 0..REFINE_PASSES {
                let mut shaped = coeffs;
                for (&(u, v), &a) in DCT_EMBED_POSITIONS.iter().zip(&aim) {
                    shaped[u * BLOCK_SIZE + v] = a;
                }
                let candidate = luma::shift_luma(pixels, &original, &self.inverse(&shaped));

                let achieved = self.forward(&luma::block_luma(&candidate));
                if self.parities(&achieved).iter().zip(bits).all(|(p, b)| p == b) {
                    return Some(candidate);
                }
                for ((a, &t), &(u, v)) in aim.iter_mut().zip(&targets).zip(DCT_EMBED_POSITIONS.iter()) {
                    *a += t - achieved[u * BLOCK_SIZE + v];
                }
            }
        }
        None
    }

    /// Read the three coefficient parities of one block.
    fn extract_block(&self, pixels: &BlockPixels) -> [u8; BITS_PER_BLOCK] {
        self.parities(&self.forward(&luma::block_luma(pixels)))
    }
}

impl StegoCodec for DctCodec {
    fn scheme(&self) -> Scheme {
        Scheme::Dct
    }

    fn capacity(&self, cover: &RgbImage) -> usize {
        config::dct_capacity_bits(cover.width(), cover.height())
    }

    fn framed_bits(&self, message_len: usize) -> usize {
        bits::sentinel_framed_len(message_len)
    }

    fn encode(&self, cover: &RgbImage, message: &str) -> Result<RgbImage> {
        let mut stego = self.crop(cover)?;
        let payload = bits::frame_with_sentinel(message);
        let capacity = self.capacity(&stego);
        if payload.len() > capacity {
            return Err(StegoError::CapacityExceeded {
                scheme: Scheme::Dct,
                required: payload.len(),
                available: capacity,
            });
        }

        let blocks_x = stego.width() as usize / BLOCK_SIZE;

        // Blocks are independent; results come back in canonical order and
        // nothing is written until every block has verified.
        let new_blocks: Vec<BlockPixels> = payload
            .par_chunks(BITS_PER_BLOCK)
            .enumerate()
            .map(|(idx, chunk)| {
                let (bx, by) = (idx % blocks_x, idx / blocks_x);
                self.embed_block(&luma::read_block(&stego, bx, by), chunk)
                    .ok_or(StegoError::BlockNotEmbeddable {
                        scheme: Scheme::Dct,
                        block: idx,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        for (idx, block) in new_blocks.iter().enumerate() {
            luma::write_block(&mut stego, idx % blocks_x, idx / blocks_x, block);
        }

        debug!(
            "dct: embedded {} bits into {} of {} blocks",
            payload.len(),
            new_blocks.len(),
            capacity / BITS_PER_BLOCK
        );
        Ok(stego)
    }

    fn decode(&self, stego: &RgbImage) -> Result<String> {
        let cropped = self.crop(stego)?;
        let blocks_x = cropped.width() as usize / BLOCK_SIZE;
        let blocks_y = cropped.height() as usize / BLOCK_SIZE;

        // Extract block rows in parallel batches, scanning for the sentinel after
        // each batch so that a short payload does not pay for the whole image.
        let batch_size = rayon::current_num_threads().max(1);
        let mut bits_read: Vec<u8> = Vec::new();
        let mut row = 0;
        while row < blocks_y {
            let batch_end = (row + batch_size).min(blocks_y);
            let rows: Vec<Vec<u8>> = (row..batch_end)
                .into_par_iter()
                .map(|by| {
                    (0..blocks_x)
                        .flat_map(|bx| self.extract_block(&luma::read_block(&cropped, bx, by)))
                        .collect::<Vec<u8>>()
                })
                .collect();

            let scan_from = bits_read.len().saturating_sub(config::SENTINEL_BITS.len() - 1);
            for r in rows {
                bits_read.extend(r);
            }

            if let Some(end) = bits::find_sentinel(&bits_read, scan_from) {
                debug!("dct: sentinel at bit {}", end);
                let bytes = bits::from_bits(&bits_read[..end]);
                return Ok(bits::decode_text(&bytes, Utf8Policy::Ignore));
            }
            row = batch_end;
        }

        Err(StegoError::SentinelNotFound {
            scheme: Scheme::Dct,
        })
    }
}

fn quantize(coeff: f64, step: f64) -> i64 {
    (coeff / step).round() as i64
}

/// Move a quantized coefficient by one step so its parity equals `bit`.
///
/// The step goes toward zero, except that a coefficient carrying a 1 is never
/// allowed to land on zero.
fn set_parity(quantized: i64, bit: u8) -> i64 {
    if quantized.rem_euclid(2) == bit as i64 {
        return quantized;
    }

    let mut adjustment = if quantized > 0 { -1 } else { 1 };
    if quantized + adjustment == 0 && bit == 1 {
        adjustment = -adjustment;
    }
    let adjusted = quantized + adjustment;
    if adjusted == 0 && bit == 1 {
        1
    } else {
        adjusted
    }
}

/// Per-coefficient target offsets that keep parity, smallest total move first.
fn parity_preserving_offsets(n: usize) -> Vec<Vec<i64>> {
    let mut combos = vec![Vec::new()];
    for _ in 0..n {
        combos = combos
            .into_iter()
            .flat_map(|c: Vec<i64>| {
                [0, -2, 2].into_iter().map(move |o| {
                    let mut next = c.clone();
                    next.push(o);
                    next
                })
            })
            .collect();
    }
    combos.sort_by_key(|c| c.iter().map(|o| o.abs()).sum::<i64>());
    combos
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn codec() -> DctCodec {
        DctCodec::new(&SuiteConfig::default())
    }

    /// Mid-range texture that never clips after embedding.
    fn textured(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let t = ((x * 7 + y * 13) % 50) as u8;
            Rgb([100 + t, 110 + t / 2, 125 - t / 2])
        })
    }

    #[test]
    fn test_set_parity() {
        assert_eq!(set_parity(4, 0), 4);
        assert_eq!(set_parity(4, 1), 3);
        assert_eq!(set_parity(-4, 1), -3);
        assert_eq!(set_parity(3, 0), 2);
        assert_eq!(set_parity(-1, 0), 0);
        // the step toward zero would erase a 1, so it goes outward instead
        assert_eq!(set_parity(0, 1), 1);
        assert_eq!(set_parity(1, 1), 1);
        for q in -20..20 {
            for bit in 0..2u8 {
                let adjusted = set_parity(q, bit);
                assert_eq!(adjusted.rem_euclid(2), bit as i64);
                assert!((adjusted - q).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_roundtrip() {
        let codec = codec();
        let cover = textured(64, 48);
        let message = "frequency domain";
        let stego = codec.encode(&cover, message).unwrap();
        assert_eq!(codec.decode(&stego).unwrap(), message);
    }

    #[test]
    fn test_output_is_cropped_to_whole_blocks() {
        let codec = codec();
        let stego = codec.encode(&textured(70, 21), "ok").unwrap();
        assert_eq!(stego.dimensions(), (64, 16));
        assert_eq!(codec.decode(&stego).unwrap(), "ok");
    }

    #[test]
    fn test_unused_blocks_are_untouched() {
        let codec = codec();
        let cover = textured(64, 64);
        let stego = codec.encode(&cover, "a").unwrap();

        // 24 payload bits fill exactly the first 8 blocks (one block row)
        for y in 8..64 {
            for x in 0..64 {
                assert_eq!(stego.get_pixel(x, y), cover.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn test_capacity_boundary() {
        let codec = codec();
        // 8 blocks * 3 = 24 bits = one byte plus the sentinel
        let exact = textured(64, 8);
        assert_eq!(codec.capacity(&exact), 24);
        let stego = codec.encode(&exact, "a").unwrap();
        assert_eq!(codec.decode(&stego).unwrap(), "a");

        let short = textured(56, 8);
        assert!(matches!(
            codec.encode(&short, "a"),
            Err(StegoError::CapacityExceeded {
                required: 24,
                available: 21,
                ..
            })
        ));
    }

    #[test]
    fn test_too_small_for_a_block() {
        let codec = codec();
        let tiny = textured(7, 40);
        assert!(matches!(
            codec.encode(&tiny, ""),
            Err(StegoError::ImageTooSmall { width: 7, height: 40, .. })
        ));
        assert!(matches!(
            codec.decode(&tiny),
            Err(StegoError::ImageTooSmall { .. })
        ));
    }

    #[test]
    fn test_flat_image_has_no_sentinel() {
        let flat = RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]));
        assert!(matches!(
            codec().decode(&flat),
            Err(StegoError::SentinelNotFound { scheme: Scheme::Dct })
        ));
    }

    /// Pure primaries and yellow in a scattered pattern, every pixel saturated.
    fn saturated_primaries(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| match (x * 7 + y * 13 + (x * y) % 5) % 4 {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            2 => Rgb([0, 0, 255]),
            _ => Rgb([255, 255, 0]),
        })
    }

    fn black_white_checkerboard(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    /// Encoding either reads back exactly or is refused with a typed error.
    fn assert_exact_or_refused(codec: &DctCodec, cover: &RgbImage, message: &str) {
        match codec.encode(cover, message) {
            Ok(stego) => assert_eq!(codec.decode(&stego).unwrap(), message),
            Err(err) => assert!(
                matches!(err, StegoError::BlockNotEmbeddable { scheme: Scheme::Dct, .. }),
                "unexpected error: {err}"
            ),
        }
    }

    #[test]
    fn test_saturated_cover_never_corrupts() {
        assert_exact_or_refused(&codec(), &saturated_primaries(64), "saturated primaries message");
    }

    #[test]
    fn test_checkerboard_cover_never_corrupts() {
        assert_exact_or_refused(&codec(), &black_white_checkerboard(64), "checkerboard cover message");
    }

    #[test]
    fn test_embedded_block_reads_back() {
        let codec = codec();
        let red = [Rgb([255, 0, 0]); 64];
        for pattern in 0..8u8 {
            let bits = [(pattern >> 2) & 1, (pattern >> 1) & 1, pattern & 1];
            let block = codec.embed_block(&red, &bits).unwrap();
            assert_eq!(codec.extract_block(&block), bits);
        }

        let mixed = luma::read_block(&saturated_primaries(8), 0, 0);
        for pattern in 0..8u8 {
            let bits = [(pattern >> 2) & 1, (pattern >> 1) & 1, pattern & 1];
            if let Some(block) = codec.embed_block(&mixed, &bits) {
                assert_eq!(codec.extract_block(&block), bits);
            }
        }
    }

    #[test]
    fn test_unreachable_coefficient_is_refused() {
        // no 8x8 luma block has a coefficient anywhere near 5000
        let codec = DctCodec::new(&SuiteConfig {
            dct_quant_step: 10_000.0,
            ..Default::default()
        });
        assert!(matches!(
            codec.encode(&textured(64, 8), "a"),
            Err(StegoError::BlockNotEmbeddable { scheme: Scheme::Dct, .. })
        ));
    }

    #[test]
    fn test_parity_preserving_offsets() {
        let combos = parity_preserving_offsets(3);
        assert_eq!(combos.len(), 27);
        assert_eq!(combos[0], vec![0, 0, 0]);
        assert!(combos.iter().flatten().all(|o| o % 2 == 0));
        assert_eq!(parity_preserving_offsets(1), vec![vec![0], vec![-2], vec![2]]);
    }
}
