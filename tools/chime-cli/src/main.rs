//! chime-inject - replace the startup chime in an iMac firmware update
//!
//! # Commands
//!
//! - `chime-inject inject` - patch a firmware file with a new chime
//! - `chime-inject verify` - check both checksums of a firmware file
//! - `chime-inject profiles` - list the built-in firmware profiles
//!
//! # Usage
//!
//! ```bash
//! # Sounds are raw 16-bit mono 44.1 kHz big-endian PCM
//! chime-inject inject iMacFirmware3.0 chime.raw iMacFirmware3.0-patched
//!
//! # Slot-loading iMac
//! chime-inject inject --profile imac-slot-loading firmware chime.raw patched
//!
//! # Any other layout, described in TOML
//! chime-inject verify --profile-file my-variant.toml patched
//! ```

mod inject;
mod profile_select;
mod profiles;
mod verify;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Replace the startup chime in iMac firmware updates
#[derive(Parser)]
#[command(name = "chime-inject")]
#[command(about = "Replace the startup chime in iMac firmware updates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Patch a firmware file with a new chime
    #[command(after_help = "The sound must be raw 16-bit mono 44.1 kHz big-endian PCM. \
Little-endian raw audio can be converted with `dd conv=swab`.")]
    Inject(inject::InjectArgs),

    /// Check the ROM and file checksums of a firmware file
    Verify(verify::VerifyArgs),

    /// List built-in firmware profiles
    Profiles,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inject(args) => inject::execute(args),
        Commands::Verify(args) => verify::execute(args),
        Commands::Profiles => {
            profiles::execute();
            Ok(())
        }
    }
}
