//! sealnote CLI - client-side encrypted secret sharing
//!
//! Seals text and files locally. Keys are printed as base-58 text meant for
//! the fragment of a share link; envelopes are what gets uploaded.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use url::Url;
use zeroize::Zeroizing;

use sealnote::error::Result;
use sealnote::file_envelope::DEFAULT_CONTENT_TYPE;
use sealnote::file_ops;
use sealnote::key::{KeyStrength, SecretKey};
use sealnote::key_source::{
    ConstantKeySource, KeySource, LinkKeySource, ReaderKeySource, TerminalKeySource,
};
use sealnote::link::{LinkTarget, ShareLink};
use sealnote::random::OsRandom;

#[derive(Parser)]
#[command(name = "sealnote")]
#[command(version)]
#[command(about = "Client-side encrypted secret sharing.", long_about = None)]
struct Cli {
    /// Key text (base-58). Arguments are visible to other local users;
    /// prefer --key-stdin or SEALNOTE_KEY
    #[arg(long, global = true, env = "SEALNOTE_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Take the key from the fragment of a share link
    #[arg(long, global = true, value_name = "URL")]
    link: Option<String>,

    /// Read the key from stdin
    #[arg(long, global = true)]
    key_stdin: bool,

    /// Log more; repeat for debug output (RUST_LOG overrides)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a new key
    Keygen {
        /// Generate a 16-byte key for readers that predate 32-byte keys
        #[arg(long)]
        legacy: bool,
    },

    /// Seal a text secret. Prints the key when one is generated
    #[command(alias = "e")]
    Encrypt {
        /// Path to the UTF-8 file holding the secret
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the base-64 envelope to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// When generating a key, make it 16 bytes
        #[arg(long)]
        legacy: bool,
    },

    /// Open a text envelope
    #[command(alias = "d")]
    Decrypt {
        /// Path to the base-64 envelope
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the secret to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Seal any file into a JSON record. Prints the key when one is generated
    #[command(alias = "ef")]
    EncryptFile {
        /// Path to the file to seal
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the JSON record to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Content type recorded in the metadata
        #[arg(long, default_value = DEFAULT_CONTENT_TYPE)]
        content_type: String,

        /// When generating a key, make it 16 bytes
        #[arg(long)]
        legacy: bool,
    },

    /// Open a JSON record written by encrypt-file
    #[command(alias = "df")]
    DecryptFile {
        /// Path to the JSON record
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the file contents to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the share link for a stored secret
    Link {
        /// Base url of the store's web front end
        #[arg(long, value_name = "URL")]
        base: Url,

        /// Id the store assigned to the secret
        #[arg(long)]
        id: String,

        /// The id names a file rather than a text secret
        #[arg(long)]
        file: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e.display_chain());
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Keygen { legacy } => {
            let key = new_key(*legacy)?;
            println!("{}", key.as_str());
        }
        Commands::Encrypt {
            input,
            output,
            legacy,
        } => {
            let (key, generated) = key_or_generate(cli, *legacy)?;
            file_ops::encrypt_file(input, output, &key)?;
            if generated {
                println!("{}", key.as_str());
            }
        }
        Commands::Decrypt { input, output } => {
            let key = required_key(cli)?;
            file_ops::decrypt_file(input, output, &key)?;
        }
        Commands::EncryptFile {
            input,
            output,
            content_type,
            legacy,
        } => {
            let (key, generated) = key_or_generate(cli, *legacy)?;
            file_ops::seal_file_record(input, output, &key, content_type)?;
            if generated {
                println!("{}", key.as_str());
            }
        }
        Commands::DecryptFile { input, output } => {
            let key = required_key(cli)?;
            let name = file_ops::open_file_record(input, output, &key)?;
            eprintln!("original filename: {}", name);
        }
        Commands::Link { base, id, file } => {
            let key = required_key(cli)?;
            // Reject garbage before it ends up in a link someone relies on.
            SecretKey::from_text(&key)?;
            let target = if *file {
                LinkTarget::File(id.clone())
            } else {
                LinkTarget::Secret(id.clone())
            };
            println!("{}", ShareLink::new(target, key).to_url(base)?);
        }
    }
    Ok(())
}

fn new_key(legacy: bool) -> Result<Zeroizing<String>> {
    let strength = if legacy {
        KeyStrength::Aes128
    } else {
        KeyStrength::Aes256
    };
    Ok(SecretKey::generate_with(&mut OsRandom, strength)?.to_text())
}

fn explicit_key_source(cli: &Cli) -> Option<Box<dyn KeySource>> {
    if cli.key_stdin {
        Some(Box::new(ReaderKeySource::new(Box::new(std::io::stdin()))))
    } else if let Some(link) = &cli.link {
        Some(Box::new(LinkKeySource::new(link.clone())))
    } else {
        cli.key
            .as_ref()
            .map(|key| Box::new(ConstantKeySource::new(key.clone())) as Box<dyn KeySource>)
    }
}

fn required_key(cli: &Cli) -> Result<Zeroizing<String>> {
    let mut source = explicit_key_source(cli)
        .unwrap_or_else(|| Box::new(TerminalKeySource) as Box<dyn KeySource>);
    source.read_key()
}

/// Returns the key to seal with, and whether it was generated here.
fn key_or_generate(cli: &Cli, legacy: bool) -> Result<(Zeroizing<String>, bool)> {
    match explicit_key_source(cli) {
        Some(mut source) => Ok((source.read_key()?, false)),
        None => Ok((new_key(legacy)?, true)),
    }
}
