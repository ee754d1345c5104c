//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sign files with textbook RSA and verify them later.
#[derive(Parser, Debug, Clone)]
#[command(name = "filesig")]
#[command(about = "Embed RSA signatures into files and verify them")]
#[command(version)]
pub struct Cli {
    /// Directory holding public.pem and private.pem.
    #[arg(long, env = "FILESIG_KEY_DIR", default_value = "keys", global = true)]
    pub key_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "FILESIG_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a keypair and store it in the key directory.
    Keygen {
        /// Smallest candidate prime (inclusive).
        #[arg(long, default_value_t = 200)]
        prime_low: u64,

        /// Upper bound for candidate primes (exclusive).
        #[arg(long, default_value_t = 500)]
        prime_high: u64,
    },

    /// Sign a file, writing <FILE>.signed unless --output is given.
    Sign {
        file: PathBuf,

        /// Signer name recorded in the signature.
        #[arg(long, env = "FILESIG_USER", default_value = "Anonymous")]
        user: String,

        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Verify a signed file against the stored public key.
    Verify {
        file: PathBuf,

        /// Trust the public key embedded in the file instead of the key store.
        #[arg(long)]
        embedded_key: bool,
    },

    /// Print the signature metadata of a signed file.
    Inspect { file: PathBuf },

    /// Recover the original bytes of a signed file.
    Extract {
        file: PathBuf,

        #[arg(long, short)]
        output: PathBuf,
    },
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
