/// PNG text metadata key holding the scheme codeword.
pub const METADATA_KEY: &str = "ProcessingInfo";

/// End-of-payload marker used by LSB-matching and DCT.
pub const SENTINEL_BITS: [u8; 16] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0];

// DCT parameters
pub const BLOCK_SIZE: usize = 8;
pub const DEFAULT_DCT_QUANT_STEP: f64 = 50.0;

/// Mid-frequency (row, col) coefficient positions carrying one bit each.
pub const DCT_EMBED_POSITIONS: [(usize, usize); 3] = [(3, 3), (2, 3), (3, 2)];

// PVD parameters
pub const PVD_CHANNEL: usize = 2;
pub const PVD_MAX_BITS_PER_PAIR: u32 = 3;
/// Bits per PVD unit: 8 data bits followed by one parity bit.
pub const PVD_UNIT_BITS: usize = 9;

/// Difference ranges for PVD, as inclusive (lower, upper) bounds.
pub const PVD_RANGES: [(u8, u8); 6] = [
    (0, 7),
    (8, 15),
    (16, 31),
    (32, 63),
    (64, 127),
    (128, 255),
];

// ERDE parameters
pub const EDGE_CHANNEL: usize = 1;
pub const ERDE_EMBED_CHANNEL: usize = 2;
pub const DEFAULT_EDGE_LOW_THRESHOLD: f32 = 90.0;
pub const DEFAULT_EDGE_HIGH_THRESHOLD: f32 = 180.0;
pub const LENGTH_PREFIX_BITS: usize = 32;

// Metrics parameters
pub const PSNR_CEILING: f64 = 100.0;
pub const SSIM_WINDOW: usize = 7;

/// Number of RGB samples per pixel.
pub const CHANNELS: usize = 3;

/// Compute the number of full 8x8 blocks in an image.
pub fn blocks_per_image(width: u32, height: u32) -> usize {
    (width as usize / BLOCK_SIZE) * (height as usize / BLOCK_SIZE)
}

/// Compute how many bits the DCT scheme can carry in an image.
pub fn dct_capacity_bits(width: u32, height: u32) -> usize {
    blocks_per_image(width, height) * DCT_EMBED_POSITIONS.len()
}

/// Compute how many bits LSB-matching can carry in an RGB image.
pub fn lsbm_capacity_bits(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// Runtime configuration for an encode/decode operation.
#[derive(Debug, Clone)]
pub struct SuiteConfig {
    pub dct_quant_step: f64,
    pub edge_low_threshold: f32,
    pub edge_high_threshold: f32,
    pub lsbm_seed: Option<u64>,
    pub compute_metrics: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            dct_quant_step: DEFAULT_DCT_QUANT_STEP,
            edge_low_threshold: DEFAULT_EDGE_LOW_THRESHOLD,
            edge_high_threshold: DEFAULT_EDGE_HIGH_THRESHOLD,
            lsbm_seed: None,
            compute_metrics: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dct_capacity_discards_partial_blocks() {
        assert_eq!(dct_capacity_bits(17, 9), 2 * 1 * 3);
        assert_eq!(dct_capacity_bits(7, 64), 0);
    }

    #[test]
    fn test_lsbm_capacity() {
        assert_eq!(lsbm_capacity_bits(4, 3), 36);
    }
}
