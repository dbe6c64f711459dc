pub mod decode;
pub mod encode;
pub mod hook;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::config::SuiteConfig;
use crate::metrics::QualityMetrics;
use crate::scheme::{Scheme, SchemeSelector};
use hook::PipelineHook;

/// Result of a full encode → hook → decode roundtrip.
#[derive(Debug, Clone)]
pub struct RoundtripResult {
    pub scheme: Scheme,
    /// SHA-256 hex digest of the original message.
    pub original_digest: String,
    /// SHA-256 hex digest of the recovered message.
    pub decoded_digest: String,
    /// `true` if the digests match (lossless round-trip).
    pub matched: bool,
    pub metrics: Option<QualityMetrics>,
}

/// Run a full encode → hook → decode roundtrip.
///
/// Steps:
/// 1. Encodes `message` into `cover_bytes` with `scheme`, producing a tagged PNG.
/// 2. Calls `hook.after_encode(png)`; transport happens here.
/// 3. Decodes the bytes returned by the hook with `auto`, so the scheme comes
///    from the metadata tag.
/// 4. Compares SHA-256 digests of the original and recovered messages.
///
/// # Example
///
/// ```rust,no_run
/// use pixelveil::{roundtrip, NoopHook, Scheme, SuiteConfig};
///
/// let cover = std::fs::read("cover.png").unwrap();
/// let result = roundtrip(&cover, "meet at noon", Scheme::Pvd, &SuiteConfig::default(), &NoopHook).unwrap();
///
/// assert!(result.matched, "round-trip failed: {} != {}", result.original_digest, result.decoded_digest);
/// ```
pub fn roundtrip<H: PipelineHook>(
    cover_bytes: &[u8],
    message: &str,
    scheme: Scheme,
    cfg: &SuiteConfig,
    hook: &H,
) -> Result<RoundtripResult> {
    let original_digest = sha256_hex(message.as_bytes());

    let encoded = encode::encode_bytes(cover_bytes, message, scheme, cfg)
        .with_context(|| format!("{} encoding failed", scheme))?;

    let decode_from = hook.after_encode(encoded.png)?;

    let decoded = decode::decode_bytes(&decode_from, SchemeSelector::Auto, cfg)
        .context("auto decoding failed")?;

    let decoded_digest = sha256_hex(decoded.as_bytes());
    let matched = original_digest == decoded_digest;

    Ok(RoundtripResult {
        scheme,
        original_digest,
        decoded_digest,
        matched,
        metrics: encoded.metrics,
    })
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::error::StegoError;
    use crate::raster::container;

    /// Green 8px checkerboard (edges for ERDE) over a mid-range red/blue texture
    /// (headroom for DCT).
    fn cover() -> RgbImage {
        RgbImage::from_fn(64, 64, |x, y| {
            let t = ((x * 7 + y * 13) % 50) as u8;
            let on = ((x / 8) + (y / 8)) % 2 == 0;
            Rgb([100 + t, if on { 200 } else { 60 }, 125 - t / 2])
        })
    }

    fn png_bytes(image: &RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    fn test_config() -> SuiteConfig {
        SuiteConfig {
            lsbm_seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_dispatch_all_schemes() {
        let cfg = test_config();
        let cover = png_bytes(&cover());
        let message = "auto dispatch";

        for scheme in Scheme::ALL {
            let encoded = encode::encode_bytes(&cover, message, scheme, &cfg).unwrap();
            let stego = container::read_stego(&encoded.png).unwrap();
            assert_eq!(stego.scheme_tag.as_deref(), Some(scheme.codeword()));

            let auto = decode::decode_bytes(&encoded.png, SchemeSelector::Auto, &cfg).unwrap();
            let fixed = decode::decode_bytes(&encoded.png, scheme.into(), &cfg).unwrap();
            assert_eq!(auto, message, "auto decode failed for {}", scheme);
            assert_eq!(fixed, message, "fixed decode failed for {}", scheme);
        }
    }

    #[test]
    fn test_untagged_image_needs_explicit_scheme() {
        let cfg = test_config();
        let cover = cover();
        let stego = encode::encode_image(&cover, "no tag", Scheme::Lsbm, &cfg).unwrap();
        let untagged = png_bytes(&stego);

        assert!(matches!(
            decode::decode_bytes(&untagged, SchemeSelector::Auto, &cfg),
            Err(StegoError::NoMetadata)
        ));
        assert_eq!(
            decode::decode_bytes(&untagged, Scheme::Lsbm.into(), &cfg).unwrap(),
            "no tag"
        );
    }

    #[test]
    fn test_unknown_codeword() {
        let image = cover();
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, image.width(), image.height());
            encoder.set_color(png::ColorType::Rgb);
            encoder.set_depth(png::BitDepth::Eight);
            encoder
                .add_text_chunk("ProcessingInfo".to_string(), "kiwi".to_string())
                .unwrap();
            let mut writer = encoder.write_header().unwrap();
            writer.write_image_data(image.as_raw()).unwrap();
        }

        assert!(matches!(
            decode::decode_bytes(&bytes, SchemeSelector::Auto, &test_config()),
            Err(StegoError::UnsupportedScheme(codeword)) if codeword == "kiwi"
        ));
    }

    #[test]
    fn test_capacity_error_aborts_encode() {
        let cfg = test_config();
        let huge = "x".repeat(10_000);
        for scheme in Scheme::ALL {
            let result = encode::encode_bytes(&png_bytes(&cover()), &huge, scheme, &cfg);
            assert!(
                matches!(result, Err(StegoError::CapacityExceeded { .. })),
                "{} accepted an oversized message",
                scheme
            );
        }
    }

    #[test]
    fn test_metrics_are_reported() {
        let cfg = test_config();
        let encoded = encode::encode_bytes(&png_bytes(&cover()), "metrics", Scheme::Lsbm, &cfg).unwrap();
        let metrics = encoded.metrics.unwrap();
        assert!(metrics.psnr > 40.0);
        assert!(metrics.ber > 0.0);

        let quiet = SuiteConfig {
            compute_metrics: false,
            ..test_config()
        };
        let encoded = encode::encode_bytes(&png_bytes(&cover()), "metrics", Scheme::Lsbm, &quiet).unwrap();
        assert!(encoded.metrics.is_none());
    }

    #[test]
    fn test_metrics_failure_does_not_fail_encode() {
        // 8x4 holds the message but is smaller than the SSIM window
        let tiny = RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]));
        let encoded =
            encode::encode_bytes(&png_bytes(&tiny), "ok", Scheme::Lsbm, &test_config()).unwrap();
        assert!(encoded.metrics.is_none());
    }

    #[test]
    fn test_roundtrip_with_noop_hook() {
        let cover = png_bytes(&cover());
        for scheme in Scheme::ALL {
            let result = roundtrip(&cover, "hook me", scheme, &test_config(), &hook::NoopHook).unwrap();
            assert!(result.matched, "{} did not round-trip", scheme);
            assert_eq!(result.scheme, scheme);
        }
    }

    struct StripMetadata;

    impl PipelineHook for StripMetadata {
        fn after_encode(&self, stego_png: Vec<u8>) -> Result<Vec<u8>> {
            let pixels = container::read_png(&stego_png)?.pixels;
            Ok(png_bytes(&pixels))
        }
    }

    #[test]
    fn test_roundtrip_reports_lost_metadata() {
        let err = roundtrip(
            &png_bytes(&cover()),
            "gone",
            Scheme::Erde,
            &test_config(),
            &StripMetadata,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StegoError>(),
            Some(StegoError::NoMetadata)
        ));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
