//! sealfile CLI - Password-based file encryption
//!
//! Command-line interface for encrypting and decrypting files into
//! AES-256-GCM envelopes with scrypt key derivation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sealfile::file_ops;
use sealfile::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};
use sealfile::{ErrorCategory, ErrorKind, SealError};

#[derive(Parser)]
#[command(name = "sealfile")]
#[command(version)]
#[command(about = "Password-based file encryption.", long_about = None)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the envelope to [default: <input>.enc]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Decrypt a file
    #[command(alias = "d")]
    Decrypt {
        /// Path to the envelope to be decrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the plaintext to [default: <input> without .enc]
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing envelope to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Print the raw envelope record as JSON, without decrypting
    Inspect {
        /// Path to the envelope
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,
    },
}

impl Commands {
    /// Only a new password is typed twice; update and decrypt check the
    /// entry against the existing envelope instead.
    fn confirms_password(&self) -> bool {
        matches!(self, Commands::Encrypt { .. })
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let confirm = cli.command.confirms_password();
    let result = match cli.command {
        Commands::Encrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, confirm);
            file_ops::encrypt_file(&input, output.as_deref(), &mut *reader)
                .map(|path| info!("wrote {}", path.display()))
        }
        Commands::Decrypt { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, confirm);
            file_ops::decrypt_file(&input, output.as_deref(), &mut *reader)
                .map(|path| info!("wrote {}", path.display()))
        }
        Commands::Update { input, output } => {
            let mut reader = get_passphrase_reader(cli.passphrase_stdin, confirm);
            file_ops::update_file(&input, &output, &mut *reader)
                .map(|()| info!("updated {}", output.display()))
        }
        Commands::Inspect { input } => inspect(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.chain_message());
        process::exit(1);
    }
}

fn inspect(input: &std::path::Path) -> sealfile::Result<()> {
    let record = file_ops::inspect_file(input)?;
    let json = serde_json::to_string_pretty(&record).map_err(|e| {
        SealError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "failed to render envelope record",
            e,
        )
    })?;
    println!("{}", json);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn get_passphrase_reader(use_stdin: bool, confirm: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else if confirm {
        Box::new(TerminalPassphraseReader::with_confirmation())
    } else {
        Box::new(TerminalPassphraseReader::new())
    }
}
