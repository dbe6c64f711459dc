use thiserror::Error;

use crate::config;
use crate::scheme::Scheme;

#[derive(Error, Debug)]
pub enum StegoError {
    #[error("{scheme} payload needs {required} bits but the image holds only {available}")]
    CapacityExceeded {
        scheme: Scheme,
        required: usize,
        available: usize,
    },
    #[error("image of {width}x{height} is too small for {scheme} embedding")]
    ImageTooSmall {
        scheme: Scheme,
        width: u32,
        height: u32,
    },
    #[error("{scheme} block {block} cannot hold its bits without clipping")]
    BlockNotEmbeddable { scheme: Scheme, block: usize },
    #[error("no {scheme} end-of-message sentinel found")]
    SentinelNotFound { scheme: Scheme },
    #[error("length prefix incomplete: {available} of {bits} bits present", bits = config::LENGTH_PREFIX_BITS)]
    MissingLengthPrefix { available: usize },
    #[error(
        "declared payload of {declared_bytes} bytes needs {required_bits} bits, \
         only {available_bits} available"
    )]
    DeclaredLengthOutOfRange {
        declared_bytes: u64,
        required_bits: u64,
        available_bits: usize,
    },
    #[error("message of {bytes} bytes does not fit a 32-bit length prefix")]
    MessageTooLong { bytes: usize },
    #[error("image has no '{key}' metadata entry", key = config::METADATA_KEY)]
    NoMetadata,
    #[error("unsupported scheme: '{0}'")]
    UnsupportedScheme(String),
    #[error("unsupported pixel layout: {color:?} at {depth:?}")]
    UnsupportedPixelLayout {
        color: png::ColorType,
        depth: png::BitDepth,
    },
    #[error("image of {width}x{height} is smaller than the {window}x{window} similarity window")]
    SimilarityWindow {
        width: u32,
        height: u32,
        window: usize,
    },
    #[error("image container error: {0}")]
    Image(#[from] image::ImageError),
    #[error("PNG decode error: {0}")]
    PngDecode(#[from] png::DecodingError),
    #[error("PNG encode error: {0}")]
    PngEncode(#[from] png::EncodingError),
}

pub type Result<T> = std::result::Result<T, StegoError>;
