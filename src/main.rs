use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use pixelveil::config::DEFAULT_DCT_QUANT_STEP;
use pixelveil::raster::container;
use pixelveil::{metrics, pipeline, Scheme, SchemeSelector, SuiteConfig};

/// Hide text in images with LSB matching, DCT, PVD or edge-guided embedding.
#[derive(Parser)]
#[command(name = "pixelveil", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hide a message in a cover image
    Encode {
        /// Cover image path (any common format)
        #[arg(short, long)]
        input: PathBuf,

        /// Output stego image path (.png)
        #[arg(short, long)]
        output: PathBuf,

        /// Embedding scheme: lsbm, dct, pvd or erde
        #[arg(short, long)]
        scheme: Scheme,

        /// Message text
        #[arg(short, long, conflicts_with = "message_file", required_unless_present = "message_file")]
        message: Option<String>,

        /// Read the message from a UTF-8 text file
        #[arg(short = 'f', long)]
        message_file: Option<PathBuf>,

        /// Seed for the LSB-matching nudge direction (default: random)
        #[arg(long)]
        seed: Option<u64>,

        /// DCT quantization step (must match decoding)
        #[arg(long, default_value_t = DEFAULT_DCT_QUANT_STEP)]
        quant_step: f64,

        /// Skip PSNR/SSIM/BER computation
        #[arg(long)]
        no_metrics: bool,
    },

    /// Recover a message from a stego image
    Decode {
        /// Stego image path
        #[arg(short, long)]
        input: PathBuf,

        /// Scheme, or auto to read it from the image metadata
        #[arg(short, long, default_value = "auto")]
        scheme: SchemeSelector,

        /// Write the message to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// DCT quantization step (must match encoding)
        #[arg(long, default_value_t = DEFAULT_DCT_QUANT_STEP)]
        quant_step: f64,
    },

    /// Show how much each scheme can hide in a cover image
    Capacity {
        /// Cover image path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compare a stego image against its cover
    Metrics {
        /// Cover image path
        #[arg(long)]
        cover: PathBuf,

        /// Stego image path
        #[arg(long)]
        stego: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode {
            input,
            output,
            scheme,
            message,
            message_file,
            seed,
            quant_step,
            no_metrics,
        } => {
            let message = match (message, message_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("failed to read message file {}", path.display()))?,
                (None, None) => anyhow::bail!("no message given"),
            };

            let cfg = SuiteConfig {
                dct_quant_step: quant_step,
                lsbm_seed: seed,
                compute_metrics: !no_metrics,
                ..Default::default()
            };

            let result = pipeline::encode::encode_file(&input, &output, &message, scheme, &cfg)?;
            if let Some(m) = result.metrics {
                info!(
                    "PSNR {:.2} dB, SSIM {:.4}, BER {:.6}",
                    m.psnr, m.ssim, m.ber
                );
            }
        }

        Commands::Decode {
            input,
            scheme,
            output,
            quant_step,
        } => {
            let cfg = SuiteConfig {
                dct_quant_step: quant_step,
                ..Default::default()
            };

            let message = pipeline::decode::decode_file(&input, scheme, &cfg)?;
            match output {
                Some(path) => fs::write(&path, &message)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{}", message),
            }
        }

        Commands::Capacity { input } => {
            let bytes = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let cover = container::load_cover(&bytes)?;
            let cfg = SuiteConfig::default();

            println!("{}x{}", cover.width(), cover.height());
            for scheme in Scheme::ALL {
                let codec = scheme.codec(&cfg);
                println!(
                    "{:<5} {:>10} bits  {:>8} message bytes",
                    scheme.name(),
                    codec.capacity(&cover),
                    codec.max_message_bytes(&cover)
                );
            }
        }

        Commands::Metrics { cover, stego } => {
            let read = |path: &PathBuf| -> Result<_> {
                let bytes = fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(container::read_stego(&bytes)?.pixels)
            };
            let m = metrics::compare(&read(&cover)?, &read(&stego)?)?;
            println!("psnr {:.4}\nssim {:.6}\nber  {:.8}", m.psnr, m.ssim, m.ber);
        }
    }

    Ok(())
}
