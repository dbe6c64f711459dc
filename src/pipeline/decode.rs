use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::SuiteConfig;
use crate::error::StegoError;
use crate::raster::container::{self, StegoImage};
use crate::scheme::{Scheme, SchemeSelector};

/// Identify the embedding scheme from the image's metadata tag.
pub fn detect_scheme(stego: &StegoImage) -> std::result::Result<Scheme, StegoError> {
    let codeword = stego.scheme_tag.as_deref().ok_or(StegoError::NoMetadata)?;
    let scheme = Scheme::from_codeword(codeword)
        .ok_or_else(|| StegoError::UnsupportedScheme(codeword.to_string()))?;
    debug!("metadata codeword '{}' -> {}", codeword, scheme);
    Ok(scheme)
}

/// Recover the message from a decoded stego image.
///
/// A fixed scheme ignores the metadata tag; `Auto` requires it.
pub fn decode_image(
    stego: &StegoImage,
    selector: SchemeSelector,
    cfg: &SuiteConfig,
) -> std::result::Result<String, StegoError> {
    let scheme = match selector {
        SchemeSelector::Scheme(scheme) => scheme,
        SchemeSelector::Auto => detect_scheme(stego)?,
    };

    info!(
        "decoding {}x{} image with {}",
        stego.pixels.width(),
        stego.pixels.height(),
        scheme
    );
    let message = scheme.codec(cfg).decode(&stego.pixels)?;
    info!(
        "recovered {} bytes, digest {}",
        message.len(),
        super::sha256_hex(message.as_bytes())
    );
    Ok(message)
}

/// Full decode: container bytes -> pixels and tag -> message.
pub fn decode_bytes(
    stego_bytes: &[u8],
    selector: SchemeSelector,
    cfg: &SuiteConfig,
) -> std::result::Result<String, StegoError> {
    let stego = container::read_stego(stego_bytes)?;
    decode_image(&stego, selector, cfg)
}

/// Decode a stego image file.
pub fn decode_file(input_path: &Path, selector: SchemeSelector, cfg: &SuiteConfig) -> Result<String> {
    info!("reading stego image: {}", input_path.display());
    let bytes = fs::read(input_path)
        .with_context(|| format!("failed to read stego image {}", input_path.display()))?;

    decode_bytes(&bytes, selector, cfg)
        .with_context(|| format!("failed to decode {}", input_path.display()))
}
