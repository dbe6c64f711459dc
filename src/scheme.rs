use std::fmt;
use std::str::FromStr;

use image::RgbImage;

use crate::codec::{dct::DctCodec, erde::ErdeCodec, lsbm::LsbmCodec, pvd::PvdCodec};
use crate::config::SuiteConfig;
use crate::error::{Result, StegoError};

/// The four embedding schemes. Each one tags its output with a fixed codeword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Lsbm,
    Dct,
    Pvd,
    Erde,
}

impl Scheme {
    pub const ALL: [Scheme; 4] = [Scheme::Lsbm, Scheme::Dct, Scheme::Pvd, Scheme::Erde];

    /// Codeword written under the metadata key of every stego image.
    pub fn codeword(self) -> &'static str {
        match self {
            Scheme::Lsbm => "apple",
            Scheme::Dct => "banana",
            Scheme::Pvd => "orange",
            Scheme::Erde => "grape",
        }
    }

    pub fn from_codeword(codeword: &str) -> Option<Scheme> {
        Scheme::ALL.into_iter().find(|s| s.codeword() == codeword)
    }

    /// Short selector name as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Lsbm => "lsbm",
            Scheme::Dct => "dct",
            Scheme::Pvd => "pvd",
            Scheme::Erde => "erde",
        }
    }

    /// Build the codec implementing this scheme.
    pub fn codec(self, cfg: &SuiteConfig) -> Box<dyn StegoCodec> {
        match self {
            Scheme::Lsbm => Box::new(LsbmCodec::new(cfg)),
            Scheme::Dct => Box::new(DctCodec::new(cfg)),
            Scheme::Pvd => Box::new(PvdCodec::new(cfg)),
            Scheme::Erde => Box::new(ErdeCodec::new(cfg)),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name().to_uppercase())
    }
}

impl FromStr for Scheme {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Scheme::ALL
            .into_iter()
            .find(|scheme| scheme.name() == wanted)
            .ok_or_else(|| StegoError::UnsupportedScheme(s.to_string()))
    }
}

/// Decoder selection: a fixed scheme, or `auto` to read it from the image metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeSelector {
    Auto,
    Scheme(Scheme),
}

impl FromStr for SchemeSelector {
    type Err = StegoError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("auto") {
            Ok(SchemeSelector::Auto)
        } else {
            s.parse().map(SchemeSelector::Scheme)
        }
    }
}

impl From<Scheme> for SchemeSelector {
    fn from(scheme: Scheme) -> Self {
        SchemeSelector::Scheme(scheme)
    }
}

/// The capability set shared by every embedding scheme.
///
/// Capacities are in bits and include the scheme's framing overhead, so a message
/// fits exactly when `framed_bits(message.len()) <= capacity(cover)`.
pub trait StegoCodec: Send + Sync {
    fn scheme(&self) -> Scheme;

    /// Upper bound on embeddable bits, known before any pixel is written.
    fn capacity(&self, cover: &RgbImage) -> usize;

    /// Bits needed to embed a message of `message_len` UTF-8 bytes.
    fn framed_bits(&self, message_len: usize) -> usize;

    /// Longest message (in UTF-8 bytes) that fits in `cover`.
    fn max_message_bytes(&self, cover: &RgbImage) -> usize {
        let capacity = self.capacity(cover);
        if self.framed_bits(0) > capacity {
            return 0;
        }
        // framed_bits is affine in the message length
        let per_byte = self.framed_bits(1) - self.framed_bits(0);
        (capacity - self.framed_bits(0)) / per_byte
    }

    fn encode(&self, cover: &RgbImage, message: &str) -> Result<RgbImage>;

    fn decode(&self, stego: &RgbImage) -> Result<String>;
}
