use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::RgbImage;
use log::{info, warn};

use crate::config::SuiteConfig;
use crate::error::StegoError;
use crate::metrics::{self, QualityMetrics};
use crate::raster::container;
use crate::scheme::Scheme;

/// A tagged stego PNG plus the fidelity metrics computed against its cover.
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    pub png: Vec<u8>,
    pub scheme: Scheme,
    /// `None` when metrics were disabled or could not be computed.
    pub metrics: Option<QualityMetrics>,
}

/// Embed `message` into an in-memory cover with the chosen scheme.
pub fn encode_image(
    cover: &RgbImage,
    message: &str,
    scheme: Scheme,
    cfg: &SuiteConfig,
) -> std::result::Result<RgbImage, StegoError> {
    let codec = scheme.codec(cfg);
    info!(
        "encoding {} message bytes with {} into {}x{} cover (capacity {} bits)",
        message.len(),
        scheme,
        cover.width(),
        cover.height(),
        codec.capacity(cover)
    );
    codec.encode(cover, message)
}

/// Full encode: decode cover container -> embed -> tagged PNG -> metrics.
///
/// Any failure before the PNG is produced aborts the whole operation; a
/// metrics failure is only logged.
pub fn encode_bytes(
    cover_bytes: &[u8],
    message: &str,
    scheme: Scheme,
    cfg: &SuiteConfig,
) -> std::result::Result<EncodeOutput, StegoError> {
    let cover = container::load_cover(cover_bytes)?;
    let stego = encode_image(&cover, message, scheme, cfg)?;
    let png = container::write_png(&stego, scheme)?;
    info!("message digest {}", super::sha256_hex(message.as_bytes()));

    let metrics = if cfg.compute_metrics {
        match metrics::compare(&cover, &stego) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!("metrics calculation failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    Ok(EncodeOutput {
        png,
        scheme,
        metrics,
    })
}

/// Encode a cover file into a stego PNG file.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    message: &str,
    scheme: Scheme,
    cfg: &SuiteConfig,
) -> Result<EncodeOutput> {
    info!("reading cover: {}", input_path.display());
    let cover_bytes = fs::read(input_path)
        .with_context(|| format!("failed to read cover image {}", input_path.display()))?;

    let output = encode_bytes(&cover_bytes, message, scheme, cfg)
        .with_context(|| format!("{} encoding failed", scheme))?;

    fs::write(output_path, &output.png)
        .with_context(|| format!("failed to write stego image {}", output_path.display()))?;

    info!("encode complete: {}", output_path.display());
    Ok(output)
}
