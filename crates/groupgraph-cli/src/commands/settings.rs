//! The `settings` commands.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Input, Password};

use groupgraph_core::settings::DEFAULT_API_URL;
use groupgraph_core::Settings;

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Write the settings file, prompting for missing values
    Init {
        /// GroupMe access token (lowercase hex)
        #[arg(long)]
        token: Option<String>,

        /// GroupMe API base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Print the settings with the token masked
    Show,
}

pub fn execute(cmd: SettingsCommands, path: &Path) -> Result<()> {
    match cmd {
        SettingsCommands::Init { token, api_url, force } => cmd_init(path, token, api_url, force),
        SettingsCommands::Show => cmd_show(path),
    }
}

fn cmd_init(path: &Path, token: Option<String>, api_url: Option<String>, force: bool) -> Result<()> {
    if path.exists() && !force {
        // A placeholder file from a first run is fine to replace.
        if Settings::load(path).is_ok() {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }
    }

    let api_url = match api_url {
        Some(url) => url,
        None => Input::new()
            .with_prompt("GroupMe API URL")
            .default(DEFAULT_API_URL.to_string())
            .interact_text()?,
    };
    let token = match token {
        Some(token) => token,
        None => Password::new().with_prompt("Access token").interact()?,
    };

    let settings = Settings::new(&api_url, &token)?;
    settings.save(path)?;

    println!("{} {}", "Settings written to".green(), path.display());
    Ok(())
}

fn cmd_show(path: &Path) -> Result<()> {
    let settings = Settings::load(path)?;

    println!("{}", "Settings".bold());
    println!("{}", "─".repeat(40));
    println!("  File:         {}", path.display());
    println!("  API:          {}", settings.group_me_api.cyan());
    println!("  Access token: {}", settings.masked_token().dimmed());
    Ok(())
}
