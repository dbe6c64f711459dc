use image::RgbImage;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bits::{self, Utf8Policy};
use crate::config::{self, SuiteConfig};
use crate::error::{Result, StegoError};
use crate::scheme::{Scheme, StegoCodec};

/// LSB matching: one bit per channel sample, carried by the sample's parity.
///
/// A mismatched sample moves by +1 or -1 instead of having its low bit
/// overwritten. Samples are visited row-major, channel-minor, and the payload
/// ends with the 16-bit sentinel.
pub struct LsbmCodec {
    seed: Option<u64>,
}

impl LsbmCodec {
    pub fn new(cfg: &SuiteConfig) -> Self {
        Self {
            seed: cfg.lsbm_seed,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl StegoCodec for LsbmCodec {
    fn scheme(&self) -> Scheme {
        Scheme::Lsbm
    }

    fn capacity(&self, cover: &RgbImage) -> usize {
        config::lsbm_capacity_bits(cover.width(), cover.height())
    }

    fn framed_bits(&self, message_len: usize) -> usize {
        bits::sentinel_framed_len(message_len)
    }

    fn encode(&self, cover: &RgbImage, message: &str) -> Result<RgbImage> {
        let payload = bits::frame_with_sentinel(message);
        let mut stego = cover.clone();
        embed_bits(&mut stego, &payload, &mut self.rng())?;
        Ok(stego)
    }

    fn decode(&self, stego: &RgbImage) -> Result<String> {
        extract_message(stego.as_raw())
    }
}

/// Embed `payload` into the parities of `samples`, one bit per sample.
///
/// Fails without touching `samples` when the payload is longer than the slice.
pub fn embed_bits<R: Rng + ?Sized>(samples: &mut [u8], payload: &[u8], rng: &mut R) -> Result<()> {
    if payload.len() > samples.len() {
        return Err(StegoError::CapacityExceeded {
            scheme: Scheme::Lsbm,
            required: payload.len(),
            available: samples.len(),
        });
    }

    let mut changed = 0usize;
    for (sample, &bit) in samples.iter_mut().zip(payload) {
        if *sample & 1 != bit {
            *sample = nudge(*sample, rng);
            changed += 1;
        }
    }

    debug!(
        "lsbm: embedded {} bits into {} samples, {} nudged",
        payload.len(),
        samples.len(),
        changed
    );
    Ok(())
}

/// Move a sample one step up or down, staying inside [0, 255].
fn nudge<R: Rng + ?Sized>(sample: u8, rng: &mut R) -> u8 {
    match sample {
        0 => 1,
        255 => 254,
        s => {
            if rng.gen::<bool>() {
                s + 1
            } else {
                s - 1
            }
        }
    }
}

/// Read sample parities up to the first sentinel and rebuild the message.
pub fn extract_message(samples: &[u8]) -> Result<String> {
    let parities: Vec<u8> = samples.iter().map(|s| s & 1).collect();
    let end = bits::find_sentinel(&parities, 0).ok_or(StegoError::SentinelNotFound {
        scheme: Scheme::Lsbm,
    })?;

    debug!("lsbm: sentinel at bit {}", end);
    let bytes = bits::from_bits(&parities[..end]);
    Ok(bits::decode_text(&bytes, Utf8Policy::Replace))
}
