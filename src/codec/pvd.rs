use image::RgbImage;
use log::{debug, warn};

use crate::bits::{self, Utf8Policy};
use crate::config::{SuiteConfig, PVD_CHANNEL, PVD_MAX_BITS_PER_PAIR, PVD_RANGES, PVD_UNIT_BITS};
use crate::error::{Result, StegoError};
use crate::scheme::{Scheme, StegoCodec};

/// Pixel-value differencing on the blue channel.
///
/// Horizontal pixel pairs carry 2 or 3 bits each depending on how far apart
/// their blue samples are. The payload is a run of 9-bit units (a byte plus
/// its parity bit) closed by an all-zero unit.
pub struct PvdCodec;

impl PvdCodec {
    pub fn new(_cfg: &SuiteConfig) -> Self {
        Self
    }
}

/// The difference range a pair falls into, with the number of bits it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub lower: u8,
    pub upper: u8,
    pub width: u32,
}

/// Classify a difference magnitude.
pub fn classify(diff: u8) -> Range {
    let (lower, upper) = PVD_RANGES
        .into_iter()
        .find(|&(lo, hi)| (lo..=hi).contains(&diff))
        .unwrap_or(PVD_RANGES[0]);
    let bit_length = u8::BITS - upper.leading_zeros();
    Range {
        lower,
        upper,
        width: PVD_MAX_BITS_PER_PAIR.min(bit_length.saturating_sub(1)),
    }
}

/// Pixel coordinates of the left sample of every horizontal pair, row-major.
fn pairs(image: &RgbImage) -> impl Iterator<Item = (u32, u32)> + '_ {
    let width = image.width();
    (0..image.height())
        .flat_map(move |y| (0..width.saturating_sub(1)).step_by(2).map(move |x| (x, y)))
}

fn pair_samples(image: &RgbImage, x: u32, y: u32) -> (u8, u8) {
    (
        image.get_pixel(x, y)[PVD_CHANNEL],
        image.get_pixel(x + 1, y)[PVD_CHANNEL],
    )
}

/// Place a pair so that its difference is exactly `new_diff`.
///
/// The second sample moves away from or toward the first, keeping the sign of
/// `p2 - p1`. If that would leave [0, 255] the pair is pinned at the bound and
/// the first sample takes up the rest, so unlike a plain clamp of the second
/// sample, `p1` can move in this case and only in this case.
pub fn place_pair(p1: u8, p2: u8, new_diff: u8) -> (u8, u8) {
    let (p1, d) = (p1 as i16, new_diff as i16);
    if p2 as i16 > p1 {
        if p1 + d <= 255 {
            (p1 as u8, (p1 + d) as u8)
        } else {
            ((255 - d) as u8, 255)
        }
    } else if p1 - d >= 0 {
        (p1 as u8, (p1 - d) as u8)
    } else {
        (d as u8, 0)
    }
}

impl StegoCodec for PvdCodec {
    fn scheme(&self) -> Scheme {
        Scheme::Pvd
    }

    /// Sum of the pair widths of the cover. Embedding keeps every pair in its
    /// range, so this is fixed before any sample changes.
    fn capacity(&self, cover: &RgbImage) -> usize {
        pairs(cover)
            .map(|(x, y)| {
                let (p1, p2) = pair_samples(cover, x, y);
                classify(p1.abs_diff(p2)).width as usize
            })
            .sum()
    }

    fn framed_bits(&self, message_len: usize) -> usize {
        bits::parity_framed_len(message_len)
    }

    fn encode(&self, cover: &RgbImage, message: &str) -> Result<RgbImage> {
        if cover.width() < 2 {
            return Err(StegoError::ImageTooSmall {
                scheme: Scheme::Pvd,
                width: cover.width(),
                height: cover.height(),
            });
        }

        let payload = bits::frame_with_parity(message);
        let capacity = self.capacity(cover);
        if payload.len() > capacity {
            return Err(StegoError::CapacityExceeded {
                scheme: Scheme::Pvd,
                required: payload.len(),
                available: capacity,
            });
        }

        let mut stego = cover.clone();
        let mut cursor = 0usize;
        let mut pairs_used = 0usize;
        for (x, y) in pairs(cover) {
            if cursor >= payload.len() {
                break;
            }
            let (p1, p2) = pair_samples(cover, x, y);
            let range = classify(p1.abs_diff(p2));
            if range.width == 0 {
                continue;
            }

            // zero-pad the final chunk
            let width = range.width as usize;
            let value = (cursor..cursor + width)
                .fold(0u16, |acc, i| (acc << 1) | payload.get(i).copied().unwrap_or(0) as u16);
            cursor += width;

            let new_diff = (range.lower as u16 + value).min(range.upper as u16) as u8;
            let (q1, q2) = place_pair(p1, p2, new_diff);
            stego.get_pixel_mut(x, y)[PVD_CHANNEL] = q1;
            stego.get_pixel_mut(x + 1, y)[PVD_CHANNEL] = q2;
            pairs_used += 1;
        }

        debug!(
            "pvd: embedded {} bits into {} pairs (capacity {} bits)",
            payload.len(),
            pairs_used,
            capacity
        );
        Ok(stego)
    }

    fn decode(&self, stego: &RgbImage) -> Result<String> {
        if stego.width() < 2 {
            return Err(StegoError::ImageTooSmall {
                scheme: Scheme::Pvd,
                width: stego.width(),
                height: stego.height(),
            });
        }

        let mut reader = UnitReader::default();
        for (x, y) in pairs(stego) {
            let (p1, p2) = pair_samples(stego, x, y);
            let diff = p1.abs_diff(p2);
            let range = classify(diff);
            if range.width == 0 {
                continue;
            }
            let value = diff - range.lower;
            if u32::from(value) > (1u32 << range.width) - 1 {
                continue;
            }

            for shift in (0..range.width).rev() {
                if reader.push((value >> shift) & 1) {
                    debug!("pvd: terminator after {} bytes", reader.bytes.len());
                    return Ok(bits::decode_text(&reader.bytes, Utf8Policy::Replace));
                }
            }
        }

        warn!(
            "pvd: no terminator found, returning {} bytes decoded so far",
            reader.bytes.len()
        );
        Ok(bits::decode_text(&reader.bytes, Utf8Policy::Replace))
    }
}

/// Accumulates extracted bits into parity-checked bytes.
#[derive(Default)]
pub struct UnitReader {
    unit: Vec<u8>,
    pub bytes: Vec<u8>,
    pub parity_failures: usize,
}

impl UnitReader {
    /// Feed one bit. Returns true once a valid all-zero unit has been read.
    pub fn push(&mut self, bit: u8) -> bool {
        self.unit.push(bit);
        if self.unit.len() < PVD_UNIT_BITS {
            return false;
        }

        let byte = bits::from_bits(&self.unit[..8])[0];
        let parity = self.unit[8];
        self.unit.clear();

        if parity != bits::parity_bit(byte) {
            self.parity_failures += 1;
            warn!("pvd: parity mismatch, dropping unit");
            return false;
        }
        if byte == 0 {
            return true;
        }
        self.bytes.push(byte);
        false
    }
}
