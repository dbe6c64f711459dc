use image::imageops::{self, FilterType};
use image::RgbImage;
use log::{debug, warn};
use rayon::prelude::*;

use crate::config::{CHANNELS, PSNR_CEILING, SSIM_WINDOW};
use crate::error::{Result, StegoError};

const SSIM_C1: f64 = 0.01 * 0.01;
const SSIM_C2: f64 = 0.03 * 0.03;

/// Fidelity of a stego image against its cover.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityMetrics {
    /// Peak signal-to-noise ratio in dB, capped for identical images.
    pub psnr: f64,
    /// Mean structural similarity over all channels.
    pub ssim: f64,
    /// Fraction of differing bits over all samples.
    pub ber: f64,
}

/// Compare `stego` against `cover`. A stego image of different size is resized first.
pub fn compare(cover: &RgbImage, stego: &RgbImage) -> Result<QualityMetrics> {
    let (width, height) = cover.dimensions();
    if (width as usize) < SSIM_WINDOW || (height as usize) < SSIM_WINDOW {
        return Err(StegoError::SimilarityWindow {
            width,
            height,
            window: SSIM_WINDOW,
        });
    }

    let resized;
    let stego = if stego.dimensions() != cover.dimensions() {
        warn!(
            "stego is {:?}, cover is {:?}; resizing stego for comparison",
            stego.dimensions(),
            cover.dimensions()
        );
        resized = imageops::resize(stego, width, height, FilterType::Triangle);
        &resized
    } else {
        stego
    };

    let metrics = QualityMetrics {
        psnr: psnr(cover.as_raw(), stego.as_raw()),
        ssim: ssim(cover, stego),
        ber: ber(cover.as_raw(), stego.as_raw()),
    };
    debug!(
        "metrics: PSNR={:.2}dB SSIM={:.4} BER={:.6}",
        metrics.psnr, metrics.ssim, metrics.ber
    );
    Ok(metrics)
}

fn psnr(a: &[u8], b: &[u8]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = (x as f64 - y as f64) / 255.0;
            d * d
        })
        .sum();
    let mse = sum / a.len().max(1) as f64;
    if mse == 0.0 {
        PSNR_CEILING
    } else {
        (10.0 * (1.0 / mse).log10()).min(PSNR_CEILING)
    }
}

fn ber(a: &[u8], b: &[u8]) -> f64 {
    let flipped: u64 = a.iter().zip(b).map(|(&x, &y)| (x ^ y).count_ones() as u64).sum();
    flipped as f64 / (a.len().max(1) * 8) as f64
}

/// Mean SSIM over the channels, using a uniform window and sample covariance.
fn ssim(a: &RgbImage, b: &RgbImage) -> f64 {
    let total: f64 = (0..CHANNELS)
        .into_par_iter()
        .map(|c| channel_ssim(a, b, c))
        .sum();
    total / CHANNELS as f64
}

fn channel_ssim(a: &RgbImage, b: &RgbImage, channel: usize) -> f64 {
    let (width, height) = (a.width() as usize, a.height() as usize);
    let plane = |img: &RgbImage| -> Vec<f64> {
        img.pixels().map(|p| p[channel] as f64 / 255.0).collect()
    };
    let (pa, pb) = (plane(a), plane(b));

    let n = (SSIM_WINDOW * SSIM_WINDOW) as f64;
    let cov_norm = n / (n - 1.0);
    let mut sum = 0.0;
    let mut count = 0usize;

    for y in 0..=height - SSIM_WINDOW {
        for x in 0..=width - SSIM_WINDOW {
            let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for wy in y..y + SSIM_WINDOW {
                for wx in x..x + SSIM_WINDOW {
                    let (va, vb) = (pa[wy * width + wx], pb[wy * width + wx]);
                    sa += va;
                    sb += vb;
                    saa += va * va;
                    sbb += vb * vb;
                    sab += va * vb;
                }
            }
            let (ua, ub) = (sa / n, sb / n);
            let var_a = cov_norm * (saa / n - ua * ua);
            let var_b = cov_norm * (sbb / n - ub * ub);
            let cov = cov_norm * (sab / n - ua * ub);

            sum += ((2.0 * ua * ub + SSIM_C1) * (2.0 * cov + SSIM_C2))
                / ((ua * ua + ub * ub + SSIM_C1) * (var_a + var_b + SSIM_C2));
            count += 1;
        }
    }
    sum / count as f64
}
