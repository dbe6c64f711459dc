use std::io::Cursor;

use image::RgbImage;
use log::debug;

use crate::config;
use crate::error::{Result, StegoError};
use crate::scheme::Scheme;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A decoded stego image and the codeword found in its metadata, if any.
#[derive(Debug, Clone)]
pub struct StegoImage {
    pub pixels: RgbImage,
    pub scheme_tag: Option<String>,
}

/// Decode a cover image of any supported format into 8-bit RGB.
pub fn load_cover(bytes: &[u8]) -> Result<RgbImage> {
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}

/// Decode a stego image. PNG input keeps its metadata; other formats carry no tag.
pub fn read_stego(bytes: &[u8]) -> Result<StegoImage> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        read_png(bytes)
    } else {
        Ok(StegoImage {
            pixels: load_cover(bytes)?,
            scheme_tag: None,
        })
    }
}

/// Decode a PNG into 8-bit RGB, collecting the scheme tag from its text chunks.
pub fn read_png(bytes: &[u8]) -> Result<StegoImage> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    buf.truncate(frame.buffer_size());

    let pixels = to_rgb(frame.width, frame.height, frame.color_type, frame.bit_depth, &buf)?;
    let scheme_tag = find_tag(reader.info());
    debug!(
        "read {}x{} PNG ({:?}), tag: {:?}",
        frame.width, frame.height, frame.color_type, scheme_tag
    );

    Ok(StegoImage { pixels, scheme_tag })
}

/// Encode `pixels` as an 8-bit RGB PNG tagged with the scheme codeword.
pub fn write_png(pixels: &RgbImage, scheme: Scheme) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, pixels.width(), pixels.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.add_text_chunk(config::METADATA_KEY.to_string(), scheme.codeword().to_string())?;

        let mut writer = encoder.write_header()?;
        writer.write_image_data(pixels.as_raw())?;
        writer.finish()?;
    }
    Ok(out)
}

fn find_tag(info: &png::Info) -> Option<String> {
    if let Some(chunk) = info
        .uncompressed_latin1_text
        .iter()
        .find(|c| c.keyword == config::METADATA_KEY)
    {
        return Some(chunk.text.clone());
    }
    if let Some(chunk) = info
        .compressed_latin1_text
        .iter()
        .find(|c| c.keyword == config::METADATA_KEY)
    {
        return chunk.get_text().ok();
    }
    info.utf8_text
        .iter()
        .find(|c| c.keyword == config::METADATA_KEY)
        .and_then(|c| c.get_text().ok())
}

fn to_rgb(
    width: u32,
    height: u32,
    color: png::ColorType,
    depth: png::BitDepth,
    buf: &[u8],
) -> Result<RgbImage> {
    if depth != png::BitDepth::Eight {
        return Err(StegoError::UnsupportedPixelLayout { color, depth });
    }

    let rgb: Vec<u8> = match color {
        png::ColorType::Rgb => buf.to_vec(),
        png::ColorType::Rgba => buf
            .chunks_exact(4)
            .flat_map(|p| [p[0], p[1], p[2]])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g]).collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0]])
            .collect(),
        png::ColorType::Indexed => {
            return Err(StegoError::UnsupportedPixelLayout { color, depth })
        }
    };

    RgbImage::from_raw(width, height, rgb)
        .ok_or(StegoError::UnsupportedPixelLayout { color, depth })
}
