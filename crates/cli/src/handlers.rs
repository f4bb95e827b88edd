//! Command handlers for byoc CLI

use crate::output::{self, Format};
use anyhow::{bail, Context, Result};
use byoc_core::{
    config_exists, get_config_path, save_config, CatalogClient, ClientConfig, ConfigFile, Credentials, NewCollection, NewTile,
    Region,
};
use clap::Command;
use clap_complete::{generate, Shell as ClapShell};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr logger; RUST_LOG wins over `--verbose` and the config file
pub fn init_logging(verbose: bool, file: &ConfigFile) {
    let level = if verbose {
        "debug".to_string()
    } else {
        file.logging
            .as_ref()
            .map(|logging| logging.level.clone())
            .unwrap_or_else(|| "warn".to_string())
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("byoc={level},byoc_core={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Credentials and configuration gathered from the command line and environment
pub struct Session {
    client_id: Option<String>,
    client_secret: Option<String>,
    file: ConfigFile,
}

impl Session {
    pub fn new(client_id: Option<String>, client_secret: Option<String>, file: ConfigFile) -> Self {
        Self {
            client_id,
            client_secret,
            file,
        }
    }

    fn credentials(&self) -> Result<Credentials> {
        let client_id = self
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .context("Client id missing: pass --client-id or set SH_CLIENT_ID")?;
        let client_secret = self
            .client_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .context("Client secret missing: pass --client-secret or set SH_CLIENT_SECRET")?;

        Ok(Credentials::new(client_id, client_secret))
    }

    async fn connect(&self) -> Result<CatalogClient> {
        let config = ClientConfig::from_file(self.credentials()?, &self.file)?;
        CatalogClient::connect(config)
            .await
            .context("Failed to authenticate")
    }
}

/// Handle get-collections
pub async fn get_collections(session: &Session, format: Format) -> Result<()> {
    let client = session.connect().await?;
    let collections = client.list_collections().await?;

    match format {
        Format::Json => {
            for collection in &collections {
                output::json_line(collection)?;
            }
        }
        Format::Table => println!("{}", output::collections_table(&collections)),
    }
    Ok(())
}

/// Handle create-collection
pub async fn create_collection(
    session: &Session,
    location: &str,
    name: String,
    bucket: String,
) -> Result<()> {
    let region: Region = location.parse()?;
    let client = session.connect().await?;

    let collection = client
        .create_collection(region, &NewCollection::new(name, bucket))
        .await?;
    output::json_line(&collection)
}

/// Handle get-collection
pub async fn get_collection(session: &Session, collection_id: &str) -> Result<()> {
    let client = session.connect().await?;
    let collection = client.get_collection(collection_id).await?;
    output::json_line(&collection)
}

/// Handle delete-collection
pub async fn delete_collection(session: &Session, collection_id: &str, yes: bool) -> Result<()> {
    if !yes && console::user_attended() {
        use dialoguer::{theme::ColorfulTheme, Confirm};

        eprintln!("⚠️  Warning: you are about to delete collection '{}'", collection_id);
        eprintln!("  This action is IRREVERSIBLE!");
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Delete this collection?")
            .default(false)
            .interact()?;
        if !confirmed {
            eprintln!("Cancelled");
            return Ok(());
        }
    }

    let client = session.connect().await?;
    client.delete_collection(collection_id).await?;
    tracing::info!(collection_id, "collection deleted");
    Ok(())
}

/// Handle create-tile
pub async fn create_tile(
    session: &Session,
    collection_id: &str,
    path: String,
    time: Option<String>,
) -> Result<()> {
    let mut tile = NewTile::new(path);
    if let Some(time) = time {
        tile = tile.sensing_time(time);
    }

    let client = session.connect().await?;
    let tile = client.create_tile(collection_id, &tile).await?;
    output::json_line(&tile)
}

/// Handle get-tiles
///
/// JSON output is written as pages arrive; with `--limit` no page beyond the
/// one holding the last printed tile is requested.
pub async fn get_tiles(
    session: &Session,
    collection_id: &str,
    status: Option<&str>,
    limit: Option<usize>,
    format: Format,
) -> Result<()> {
    let client = session.connect().await?;
    let mut pager = client.list_tiles(collection_id).await?;

    let mut table_rows = Vec::new();
    let mut printed = 0;
    while limit.map_or(true, |limit| printed < limit) {
        let Some(tile) = pager.next().await else {
            break;
        };
        let tile = tile?;
        if status.is_some_and(|status| !tile.has_status(status)) {
            continue;
        }

        match format {
            Format::Json => output::json_line(&tile)?,
            Format::Table => table_rows.push(tile),
        }
        printed += 1;
    }

    tracing::debug!(pages = pager.pages_fetched(), printed, "tile listing finished");
    if format == Format::Table {
        println!("{}", output::tiles_table(&table_rows));
    }
    Ok(())
}

/// Handle delete-tile
pub async fn delete_tile(session: &Session, collection_id: &str, tile_id: &str) -> Result<()> {
    let client = session.connect().await?;
    client.delete_tile(collection_id, tile_id).await?;
    tracing::info!(collection_id, tile_id, "tile deleted");
    Ok(())
}

/// Handle config commands
pub async fn handle_config(session: &Session, action: &str, force: bool) -> Result<()> {
    match action {
        "init" => {
            let path = get_config_path()?;
            if config_exists() && !force {
                bail!(
                    "Configuration already exists: {}\nUse --force to overwrite it",
                    path.display()
                );
            }

            save_config(&ConfigFile::with_defaults())?;
            println!("  ✅ Configuration written: {}", path.display());
            Ok(())
        }
        "show" => {
            let client_id = session.client_id.clone().unwrap_or_else(|| "<unset>".to_string());
            let config = ClientConfig::from_file(Credentials::new(client_id, ""), &session.file)?;

            println!("Current configuration:");
            println!();
            println!("Service:");
            println!("  Client ID: {}", config.credentials.client_id);
            println!("  Token URL: {}", config.token_url);
            println!("  Catalog URL: {}", config.catalog_url);
            println!();
            println!("Endpoints:");
            for (region, url) in config.endpoints.iter() {
                println!("  {}: {}", region, url);
            }
            println!();
            println!("Advanced:");
            println!("  Timeout: {}s", config.timeout.as_secs());
            println!("  Page delay: {}ms", config.page_delay.as_millis());
            println!("  Token cache: {}", config.token_dir.display());

            Ok(())
        }
        "path" => {
            println!("{}", get_config_path()?.display());
            Ok(())
        }
        _ => {
            bail!("Unknown action: {}\nAvailable actions: init, show, path", action)
        }
    }
}

/// Handle shell completion generation
pub async fn handle_completion(shell: &str, cmd: &mut Command) -> Result<()> {
    use std::io;

    let clap_shell = match shell {
        "bash" => ClapShell::Bash,
        "zsh" => ClapShell::Zsh,
        "fish" => ClapShell::Fish,
        "elvish" => ClapShell::Elvish,
        "powershell" | "pwsh" => ClapShell::PowerShell,
        _ => {
            return Err(anyhow::anyhow!(
                "Unsupported shell: {}\nSupported shells: bash, zsh, fish, elvish, powershell",
                shell
            ));
        }
    };

    // Script goes to stdout so it can be sourced directly
    generate(clap_shell, cmd, "byoc", &mut io::stdout());

    match shell {
        "bash" => eprintln!("# Add to your ~/.bashrc:  source <(byoc completion bash)"),
        "zsh" => eprintln!("# Add to your ~/.zshrc:  source <(byoc completion zsh)"),
        "fish" => eprintln!("# Save to ~/.config/fish/completions/byoc.fish"),
        _ => {}
    }

    Ok(())
}
