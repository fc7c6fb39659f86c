pub mod model;

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::formats::common::Endianness;
use crate::formats::container::DecodeOptions;

/// Decoding flags shared by every command.
#[derive(Debug, Clone, Args)]
pub struct DecodeArgs {
    /// Read multi-byte fields as little endian (default: big endian)
    #[arg(long)]
    pub little_endian: bool,

    /// Decode entities and chunks in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl DecodeArgs {
    pub fn options(&self) -> DecodeOptions {
        let endianness = if self.little_endian {
            Endianness::Little
        } else {
            Endianness::Big
        };
        DecodeOptions::new()
            .with_endianness(endianness)
            .with_parallel(self.parallel)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print entities, chunk pools, textures and decode issues
    Inspect {
        /// NMLD or SML container
        file: PathBuf,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Write the container summary as pretty JSON
    Json {
        /// NMLD or SML container
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        decode: DecodeArgs,
    },

    /// Extract every GCIX texture payload as `<name>.gvr`
    Textures {
        /// NMLD or SML container
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        decode: DecodeArgs,
    },
}

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Inspect { file, decode } => {
                model::inspect(file, &decode.options(), decode.quiet)
            }
            Commands::Json {
                file,
                output,
                decode,
            } => model::json(file, output.as_deref(), &decode.options(), decode.quiet),
            Commands::Textures {
                file,
                output,
                decode,
            } => model::export_textures(file, output, &decode.options(), decode.quiet)
                .map(|_| ()),
        }
    }
}
