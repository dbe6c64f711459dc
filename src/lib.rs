pub mod bits;
pub mod codec;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod raster;
pub mod scheme;

pub use config::SuiteConfig;
pub use error::StegoError;
pub use metrics::QualityMetrics;
pub use pipeline::decode::{decode_bytes, decode_file};
pub use pipeline::encode::{encode_bytes, encode_file, EncodeOutput};
pub use pipeline::hook::{NoopHook, PipelineHook};
pub use pipeline::{roundtrip, RoundtripResult};
pub use scheme::{Scheme, SchemeSelector, StegoCodec};
