//! `--profile` / `--profile-file` handling shared by the commands

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use chime_firmware::FirmwareProfile;
use chime_firmware::profile::DEFAULT_PROFILE;

#[derive(Args)]
pub struct ProfileArgs {
    /// Built-in firmware profile (see `chime-inject profiles`)
    #[arg(long, conflicts_with = "profile_file")]
    pub profile: Option<String>,

    /// TOML file describing the firmware layout
    #[arg(long, value_name = "PATH")]
    pub profile_file: Option<PathBuf>,
}

impl ProfileArgs {
    /// Resolve to a validated profile; the default profile if none is given.
    pub fn load(&self) -> Result<FirmwareProfile> {
        if let Some(path) = &self.profile_file {
            let profile = chime_firmware::load_profile(path)
                .with_context(|| format!("Failed to load profile: {}", path.display()))?;
            tracing::info!("Using profile {} from {}", profile.name, path.display());
            return Ok(profile);
        }

        let name = self.profile.as_deref().unwrap_or(DEFAULT_PROFILE);
        let profile = chime_firmware::builtin_profile(name)?;
        tracing::info!("Using built-in profile {}", profile.name);
        Ok(profile)
    }
}
