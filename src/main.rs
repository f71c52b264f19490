use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use attesta::base58;
use attesta::crypto::keypair::Keypair;
use attesta::crypto::sign;
use attesta::envelope::{self, Envelope};
use attesta::error::{Error, Result};
use attesta::store::{FsStorage, InitOutcome, KeyStore};
use attesta::template::{
    self, compose_access_token, decompose_access_token, BuiltinSource, FileSource, TemplateSource,
};

const LOCAL_TEMPLATE: &str = "attesta.txt";
const SIGNED_FILE: &str = "signed.txt";

#[derive(Parser)]
#[command(name = "attesta")]
#[command(about = "Ed25519 certified messages: keypairs, signing, verification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initial setup: keypair and/or local message template
    Create {
        /// Set up the persisted keypair
        #[arg(long)]
        keypair: bool,
        /// Copy the sample message template to ./attesta.txt
        #[arg(long)]
        message: bool,
        /// Existing 64-byte secret key (Base58)
        secret_key: Option<String>,
    },
    /// View the stored keypair (or one derived from a secret key)
    Keypair {
        /// Show the public key
        #[arg(long)]
        public: bool,
        /// Show the private key
        #[arg(long)]
        private: bool,
        /// Show the 64-byte secret key
        #[arg(long)]
        secret: bool,
        /// Show PEM containers instead of Base58
        #[arg(long)]
        pem: bool,
        /// Derive from this secret key instead of the store (Base58)
        secret_key: Option<String>,
    },
    /// Render the message template without signing
    Review {
        /// Template file (defaults to ./attesta.txt)
        file: Option<PathBuf>,
    },
    /// Sign the rendered message and write signed.txt
    Sign {
        /// Template file (defaults to ./attesta.txt)
        file: Option<PathBuf>,
    },
    /// Verify a signed message file (defaults to ./signed.txt)
    Verify {
        file: Option<PathBuf>,
    },
    /// Generate a throwaway keypair without persisting it
    Random,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("\n  Error: {e}\n");
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Create {
            keypair,
            message,
            secret_key,
        } => create(keypair, message, secret_key),
        Commands::Keypair {
            public,
            private,
            secret,
            pem,
            secret_key,
        } => show_keypair(public, private, secret, pem, secret_key),
        Commands::Review { file } => review(file.as_deref()),
        Commands::Sign { file } => sign_message(file.as_deref()),
        Commands::Verify { file } => verify_message(file.as_deref()),
        Commands::Random => {
            let kp = Keypair::generate();
            println!("\n  Public key:   {}", base58::encode(kp.public_key()));
            println!("  Private key:  {}", base58::encode(kp.private_key()));
            println!(
                "  Secret key:   {}\n",
                base58::encode(kp.secret_key().as_bytes())
            );
            Ok(())
        }
    }
}

fn open_store() -> Result<KeyStore<FsStorage>> {
    Ok(KeyStore::new(FsStorage::open()?))
}

fn create(keypair: bool, message: bool, secret_key: Option<String>) -> Result<()> {
    if !keypair && !message {
        println!("\n  Usage: attesta create <--keypair|--message> [secret key]\n");
        return Ok(());
    }
    if keypair {
        println!("\n  Setting up keypair...");
        let store = open_store()?;
        match store.initialize(secret_key.map(Into::into))? {
            InitOutcome::Created => println!("  Keypair setup complete.\n"),
            InitOutcome::AlreadyInitialized => println!("  Keypair already exists.\n"),
        }
    }
    if message {
        let target = Path::new(LOCAL_TEMPLATE);
        println!("\n  Creating {} in the current directory...", LOCAL_TEMPLATE);
        if target.exists() {
            println!("  {} already exists.\n", LOCAL_TEMPLATE);
        } else {
            std::fs::write(target, template::DEFAULT_TEMPLATE)?;
            println!("  Created {}.\n", LOCAL_TEMPLATE);
        }
    }
    Ok(())
}

fn show_keypair(
    public: bool,
    private: bool,
    secret: bool,
    pem: bool,
    secret_key: Option<String>,
) -> Result<()> {
    if !public && !private && !secret && !pem {
        println!("\n  Usage: attesta keypair <--public|--private|--secret|--pem> [secret key]\n");
        return Ok(());
    }

    let kp = match secret_key {
        Some(text) => Keypair::from_secret_key(text.into())?,
        None => open_store()?.load()?.ok_or_else(|| {
            hint("Run 'attesta create --keypair' to generate a keypair first.");
            Error::NotFound("Keypair".into())
        })?,
    };

    println!();
    if pem {
        let (private_pem, public_pem) = sign::keypair_containers(&kp);
        if private || secret {
            println!("{private_pem}");
        }
        if public || !(private || secret) {
            println!("{public_pem}");
        }
    } else if public {
        println!("  Public key:   {}", base58::encode(kp.public_key()));
    } else if private {
        println!("  Private key:  {}", base58::encode(kp.private_key()));
    } else if secret {
        println!("  Secret key:   {}", base58::encode(kp.secret_key().as_bytes()));
    }
    println!();
    Ok(())
}

/// Load the message template: an explicit file, else ./attesta.txt, else the
/// built-in sample.
fn load_template(file: Option<&Path>) -> Result<template::Template> {
    match file {
        Some(path) => FileSource::new(path).load(),
        None => match FileSource::new(LOCAL_TEMPLATE).load() {
            Ok(t) => Ok(t),
            Err(Error::NotFound(_)) => {
                println!(
                    "\n  No {} found, using the built-in sample template.",
                    LOCAL_TEMPLATE
                );
                hint("Run 'attesta create --message' to customize it.");
                BuiltinSource.load()
            }
            Err(e) => Err(e),
        },
    }
}

fn review(file: Option<&Path>) -> Result<()> {
    let store = open_store()?;
    let Some(kp) = store.load()? else {
        hint("Run 'attesta create --keypair' to generate a keypair first.");
        return Err(Error::NotFound("Keypair".into()));
    };
    let template = load_template(file)?;
    let rendered = template::render(&template, &base58::encode(kp.public_key()), Utc::now());

    let preview = Envelope {
        public_key: kp.public_key().to_vec(),
        message: rendered.content,
        signature: None,
        access_token: None,
    };
    println!("{}", preview.format());
    Ok(())
}

fn sign_message(file: Option<&Path>) -> Result<()> {
    let store = open_store()?;
    let Some(kp) = store.load()? else {
        hint("Run 'attesta create --keypair' to generate a keypair first.");
        return Err(Error::NotFound("Keypair".into()));
    };
    let template = load_template(file)?;
    let rendered = template::render(&template, &base58::encode(kp.public_key()), Utc::now());

    let signature = sign::sign_detached(&rendered.content, kp.private_key());
    let access_token = rendered
        .variables
        .access_code
        .as_ref()
        .map(|code| compose_access_token(code, &signature));

    let signed = Envelope {
        public_key: kp.public_key().to_vec(),
        message: rendered.content,
        signature: Some(signature.to_vec()),
        access_token,
    };
    let text = signed.format();
    println!("{text}");
    std::fs::write(SIGNED_FILE, text.trim())?;
    println!("  Saved to {}.\n", SIGNED_FILE);
    Ok(())
}

fn verify_message(file: Option<&Path>) -> Result<()> {
    let path = file.unwrap_or_else(|| Path::new(SIGNED_FILE));
    if !path.exists() {
        hint("Run 'attesta sign' to produce a signed message first.");
        return Err(Error::NotFound(format!("Signed file {}", path.display())));
    }
    let text = std::fs::read_to_string(path)?;

    let parsed = envelope::parse(&text);
    let envelope = match parsed.into_envelope() {
        Ok(env) => env,
        Err(e) => {
            hint("Run 'attesta review' to troubleshoot the message format.");
            return Err(e);
        }
    };
    let Some(signature) = envelope.signature.clone() else {
        hint("The file has no SIGNATURE section; sign it with 'attesta sign'.");
        return Err(Error::Envelope("Missing SIGNATURE section".into()));
    };

    println!("{}", envelope.format());

    if let Some(token) = &envelope.access_token {
        if let Ok((code, _)) = decompose_access_token(token) {
            println!(
                "  Access code: signed {} / expires {}",
                code.signed_at_ms, code.expires_at_ms
            );
        }
    }

    let verified = sign::verify(
        &envelope.message,
        envelope.public_key.as_slice().into(),
        signature.into(),
    )?;
    if verified {
        println!("\n  Signature is verified.\n");
    } else {
        println!("\n  Signature is unauthorized.\n");
    }
    Ok(())
}

fn hint(text: &str) {
    println!("\n  {text}\n");
}
