mod cli;

use anyhow::Context;
use chrono::Local;
use rsa_filesig::io::{extract_file, sign_file, signed_path, verify_file, KeyStore, PemKeyStore};
use rsa_filesig::{container, generate_keypair, PrimeRange};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let store = PemKeyStore::new(&cli.key_dir);

    match cli.command {
        Command::Keygen {
            prime_low,
            prime_high,
        } => {
            let range = PrimeRange::new(prime_low, prime_high)?;
            let keypair = generate_keypair(&range)?;
            store.save(&keypair)?;

            println!("Public Key:  {}", keypair.public);
            println!("Private Key: {}", keypair.private);
            println!("Saved to {}", store.dir().display());
        }
        Command::Sign { file, user, output } => {
            let keypair = store
                .load()
                .with_context(|| format!("no usable keypair in {}", store.dir().display()))?;
            let output = output.unwrap_or_else(|| signed_path(&file));
            let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();

            let signature = sign_file(&file, &output, &keypair, &user, &timestamp)?;

            println!("File Hash: {}", signature.digest);
            println!("Signature: {}", signature.signature);
            println!("Written to {}", output.display());
        }
        Command::Verify { file, embedded_key } => {
            let trusted = if embedded_key {
                None
            } else {
                Some(store.load_public().with_context(|| {
                    format!("no public key in {}", store.dir().display())
                })?)
            };

            let verification = verify_file(&file, trusted.as_ref())?;

            println!("User:      {}", verification.record.user);
            println!("Timestamp: {}", verification.record.timestamp);
            if verification.is_authentic() {
                println!("Verification successful: {}", verification.reason());
            } else {
                println!("Verification failed: {}", verification.reason());
                std::process::exit(1);
            }
        }
        Command::Inspect { file } => {
            let signed =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let decoded = container::decode(&signed)?;
            let record = decoded.record;

            println!("Payload:    {} bytes", decoded.payload.len());
            println!("User:       {}", record.user);
            println!("Timestamp:  {}", record.timestamp);
            println!("File Hash:  {}", record.digest_hex);
            println!("Signature:  {}", record.signature);
            println!("Public Key: {}", record.public_key);
        }
        Command::Extract { file, output } => {
            let record = extract_file(&file, &output)?;
            println!(
                "Signed by {} at {}, payload written to {}",
                record.user,
                record.timestamp,
                output.display()
            );
        }
    }

    Ok(())
}
