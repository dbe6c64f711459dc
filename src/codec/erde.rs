use image::RgbImage;
use log::debug;

use crate::bits::{self, Utf8Policy};
use crate::config::{SuiteConfig, EDGE_CHANNEL, ERDE_EMBED_CHANNEL};
use crate::error::{Result, StegoError};
use crate::raster::edges::{edge_sites, Site};
use crate::scheme::{Scheme, StegoCodec};

/// Edge-guided LSB replacement.
///
/// Edges come from the green channel and the payload goes into the low bit of
/// the blue sample at each edge pixel, so the decoder recomputes the same sites.
pub struct ErdeCodec {
    low_threshold: f32,
    high_threshold: f32,
}

impl ErdeCodec {
    pub fn new(cfg: &SuiteConfig) -> Self {
        Self {
            low_threshold: cfg.edge_low_threshold,
            high_threshold: cfg.edge_high_threshold,
        }
    }

    /// Embedding sites of `image`, in embedding order.
    pub fn sites(&self, image: &RgbImage) -> Vec<Site> {
        edge_sites(image, EDGE_CHANNEL, self.low_threshold, self.high_threshold)
    }
}

impl StegoCodec for ErdeCodec {
    fn scheme(&self) -> Scheme {
        Scheme::Erde
    }

    fn capacity(&self, cover: &RgbImage) -> usize {
        self.sites(cover).len()
    }

    fn framed_bits(&self, message_len: usize) -> usize {
        bits::length_prefixed_len(message_len)
    }

    fn encode(&self, cover: &RgbImage, message: &str) -> Result<RgbImage> {
        let payload = bits::frame_with_length_prefix(message)?;
        let sites = self.sites(cover);
        let mut stego = cover.clone();
        embed_at(&mut stego, &sites, &payload)?;
        Ok(stego)
    }

    fn decode(&self, stego: &RgbImage) -> Result<String> {
        let sites = self.sites(stego);
        let bytes = read_at(stego, &sites)?;
        Ok(bits::decode_text(&bytes, Utf8Policy::Replace))
    }
}

/// Write `payload` into the blue low bits at `sites`, in order.
pub fn embed_at(image: &mut RgbImage, sites: &[Site], payload: &[u8]) -> Result<()> {
    if payload.len() > sites.len() {
        return Err(StegoError::CapacityExceeded {
            scheme: Scheme::Erde,
            required: payload.len(),
            available: sites.len(),
        });
    }

    for (&(x, y), &bit) in sites.iter().zip(payload) {
        let pixel = image.get_pixel_mut(x, y);
        pixel[ERDE_EMBED_CHANNEL] = (pixel[ERDE_EMBED_CHANNEL] & 0xFE) | bit;
    }

    debug!("erde: embedded {} bits at {} edge sites", payload.len(), sites.len());
    Ok(())
}

/// Read a length-prefixed payload from the blue low bits at `sites`.
pub fn read_at(image: &RgbImage, sites: &[Site]) -> Result<Vec<u8>> {
    let low_bits: Vec<u8> = sites
        .iter()
        .map(|&(x, y)| image.get_pixel(x, y)[ERDE_EMBED_CHANNEL] & 1)
        .collect();

    let declared = bits::read_length_prefix(&low_bits)?;
    let required = bits::length_prefixed_len(0) as u64 + declared as u64 * 8;
    if required > low_bits.len() as u64 {
        return Err(StegoError::DeclaredLengthOutOfRange {
            declared_bytes: declared as u64,
            required_bits: required,
            available_bits: low_bits.len(),
        });
    }

    debug!("erde: length prefix declares {} bytes", declared);
    Ok(bits::from_bits(&low_bits[bits::length_prefixed_len(0)..required as usize]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn codec() -> ErdeCodec {
        ErdeCodec::new(&SuiteConfig::default())
    }

    fn checkerboard(size: u32, cell: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            Rgb([(x * 3) as u8, if on { 200 } else { 60 }, (y * 5) as u8])
        })
    }

    fn synthetic_sites(count: u32) -> Vec<Site> {
        (0..count).map(|i| (i % 16, i / 16)).collect()
    }

    #[test]
    fn test_roundtrip() {
        let codec = codec();
        let cover = checkerboard(64, 8);
        let message = "hidden on the edges";
        assert!(codec.capacity(&cover) >= codec.framed_bits(message.len()));

        let stego = codec.encode(&cover, message).unwrap();
        assert_eq!(codec.decode(&stego).unwrap(), message);
    }

    #[test]
    fn test_edge_sites_survive_embedding() {
        let codec = codec();
        let cover = checkerboard(64, 8);
        let stego = codec.encode(&cover, "stable order").unwrap();
        assert_eq!(codec.sites(&cover), codec.sites(&stego));
    }

    #[test]
    fn test_capacity_boundary_on_sites() {
        let payload = bits::frame_with_length_prefix("hi").unwrap();
        assert_eq!(payload.len(), 48);

        let mut image = RgbImage::from_pixel(16, 4, Rgb([9, 9, 9]));
        embed_at(&mut image, &synthetic_sites(48), &payload).unwrap();
        assert_eq!(read_at(&image, &synthetic_sites(48)).unwrap(), b"hi".to_vec());

        let mut image = RgbImage::from_pixel(16, 4, Rgb([9, 9, 9]));
        let before = image.clone();
        assert!(matches!(
            embed_at(&mut image, &synthetic_sites(47), &payload),
            Err(StegoError::CapacityExceeded {
                required: 48,
                available: 47,
                ..
            })
        ));
        assert_eq!(image, before);
    }

    #[test]
    fn test_no_edges_means_no_capacity() {
        let flat = RgbImage::from_pixel(32, 32, Rgb([0, 100, 0]));
        assert!(matches!(
            codec().encode(&flat, "x"),
            Err(StegoError::CapacityExceeded { available: 0, .. })
        ));
    }

    #[test]
    fn test_corrupt_length_prefix_is_typed() {
        // every blue low bit set: the prefix declares 0xFFFFFFFF bytes
        let image = RgbImage::from_pixel(16, 4, Rgb([0, 0, 255]));
        assert!(matches!(
            read_at(&image, &synthetic_sites(64)),
            Err(StegoError::DeclaredLengthOutOfRange {
                declared_bytes: 0xFFFF_FFFF,
                ..
            })
        ));
        assert!(matches!(
            read_at(&image, &synthetic_sites(20)),
            Err(StegoError::MissingLengthPrefix { available: 20 })
        ));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut image = RgbImage::from_pixel(16, 4, Rgb([0, 0, 0]));
        let mut payload = bits::to_bits(&[0, 0, 0, 2]);
        payload.extend(bits::to_bits(&[b'o', 0xFF]));
        embed_at(&mut image, &synthetic_sites(48), &payload).unwrap();

        let bytes = read_at(&image, &synthetic_sites(48)).unwrap();
        assert_eq!(bits::decode_text(&bytes, Utf8Policy::Replace), "o\u{FFFD}");
    }
}
