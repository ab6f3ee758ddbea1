use std::path::PathBuf;
use std::process::ExitCode;

use cei::pcsc::Context;
use cei::{Config, IdentitySource, NoIdentity, Pkcs11Source, ReadResult, Reader};
use clap::{Parser, Subcommand};
use dialoguer::Password;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Error occurred while communicating with the reader: {0}")]
    Transport(#[from] cei::transport::Error),

    #[error("{0}")]
    Read(#[from] cei::reader::Error),

    #[error("Could not read the PIN: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("Could not serialize the result: {0}")]
    Json(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, Error>;

#[derive(Parser)]
#[command(name = "cei", version, about)]
struct Cli {
    /// Prints debug logs, including every APDU exchanged
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reads the identity, document and address data, then prints them as JSON
    Read {
        /// PIN of the card, prompted if omitted
        #[arg(long, env = "CEI_PIN", hide_env_values = true)]
        pin: Option<String>,

        /// Path of the PKCS#11 module of the card middleware
        #[arg(long, env = "CEI_PKCS11_MODULE")]
        module: Option<PathBuf>,

        /// Skips reading the identity from the certificates
        #[arg(long)]
        no_certificate: bool,

        /// Prints the JSON in a single line
        #[arg(long)]
        compact: bool,
    },

    /// Lists the PC/SC readers attached
    Readers,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        true => EnvFilter::new("debug"),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Read {
            pin,
            module,
            no_certificate,
            compact,
        } => {
            let pin = match pin {
                Some(pin) => pin,
                _ => Password::new().with_prompt("PIN").interact()?,
            };

            let mut config = Config::default();
            if let Some(module) = module {
                config = config.with_module_path(module);
            }

            let result = match no_certificate {
                true => read(config, NoIdentity, &pin)?,
                _ => {
                    debug!("Using PKCS#11 module at {}", config.module_path.display());
                    let source = Pkcs11Source::from(&config);
                    read(config, source, &pin)?
                }
            };

            let json = match compact {
                true => serde_json::to_string(&result)?,
                _ => serde_json::to_string_pretty(&result)?,
            };

            println!("{}", json);
        }
        Command::Readers => {
            for reader in Context::try_new()?.readers()? {
                println!("{}", reader);
            }
        }
    }

    Ok(())
}

fn read<I>(config: Config, identity: I, pin: &str) -> Result<ReadResult>
where
    I: IdentitySource,
{
    let ctx = Context::try_new()?;
    let reader = Reader::new(config, ctx, identity);

    Ok(reader.read(pin)?)
}
