use anyhow::Result;
use clap::{CommandFactory, Parser};
use color_eyre::config::HookBuilder;

mod handlers;
mod output;

/// byoc - manage Bring Your Own Collection (BYOC) collections and tiles
#[derive(Parser, Debug)]
#[command(name = "byoc")]
#[command(version)]
#[command(about = "Manage BYOC collections and tiles from your terminal", long_about = None)]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// OAuth client id
    #[arg(long, env = "SH_CLIENT_ID", global = true)]
    client_id: Option<String>,

    /// OAuth client secret
    #[arg(long, env = "SH_CLIENT_SECRET", hide_env_values = true, global = true)]
    client_secret: Option<String>,

    /// Log requests and cache decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

const EXAMPLES: &str = "\
Examples:
  byoc get-collections | jq '{id, name, location, s3Bucket}'
  byoc get-tiles <collection id> --status FAILED | jq -r '\"\\(.path) \\(.additionalData.failedIngestionCause)\"'
  byoc get-tiles <collection id> --status FAILED | jq -r .id | xargs -I {} byoc delete-tile <collection id> {}";

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List every collection, one JSON object per line
    GetCollections {
        #[arg(short, long, value_enum, default_value_t = output::Format::Json)]
        output: output::Format,
    },

    /// Create a collection in a region
    CreateCollection {
        /// Region identifier (aws-eu-central-1, aws-us-west-2, mundi)
        location: String,
        name: String,
        /// S3 bucket holding the tiles
        bucket: String,
    },

    /// Show one collection
    GetCollection { collection_id: String },

    /// Delete a collection
    DeleteCollection {
        collection_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Register a tile for ingestion
    CreateTile {
        collection_id: String,
        /// Tile path inside the bucket, e.g. tiles/t1/(BAND).tif
        path: String,
        /// Sensing time (ISO 8601)
        #[arg(long)]
        time: Option<String>,
    },

    /// List the tiles of a collection, one JSON object per line
    GetTiles {
        collection_id: String,
        /// Only print tiles with this status (e.g. INGESTED, FAILED)
        #[arg(short, long)]
        status: Option<String>,
        /// Stop after printing this many tiles
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(short, long, value_enum, default_value_t = output::Format::Json)]
        output: output::Format,
    },

    /// Delete a tile
    DeleteTile {
        collection_id: String,
        tile_id: String,
    },

    /// Configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Shell completion
    Completion {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Show the effective settings
    Show,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    let file = byoc_core::load_config_or_default()?;
    handlers::init_logging(cli.verbose, &file);

    let session = handlers::Session::new(cli.client_id, cli.client_secret, file);

    match cli.command {
        Commands::GetCollections { output } => handlers::get_collections(&session, output).await,
        Commands::CreateCollection {
            location,
            name,
            bucket,
        } => handlers::create_collection(&session, &location, name, bucket).await,
        Commands::GetCollection { collection_id } => {
            handlers::get_collection(&session, &collection_id).await
        }
        Commands::DeleteCollection { collection_id, yes } => {
            handlers::delete_collection(&session, &collection_id, yes).await
        }
        Commands::CreateTile {
            collection_id,
            path,
            time,
        } => handlers::create_tile(&session, &collection_id, path, time).await,
        Commands::GetTiles {
            collection_id,
            status,
            limit,
            output,
        } => {
            handlers::get_tiles(&session, &collection_id, status.as_deref(), limit, output).await
        }
        Commands::DeleteTile {
            collection_id,
            tile_id,
        } => handlers::delete_tile(&session, &collection_id, &tile_id).await,
        Commands::Config { action } => {
            let (action_str, force) = match action {
                ConfigAction::Init { force } => ("init", force),
                ConfigAction::Show => ("show", false),
                ConfigAction::Path => ("path", false),
            };
            handlers::handle_config(&session, action_str, force).await
        }
        Commands::Completion { shell } => {
            handlers::handle_completion(&shell, &mut Cli::command()).await
        }
    }
}
