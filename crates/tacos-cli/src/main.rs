use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tacos")]
#[command(about = "Operator tools for the tacos session adapter", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/tacos/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage order sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Inspect the remote cart of a session
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
    /// Print the remote order summary of a session
    Summary { session_id: String },
    /// Print the remote stock catalog
    Catalog,
    /// Delete sessions idle for longer than the given age
    Sweep {
        /// Defaults to the configured session TTL
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
    /// Recipe identity tools
    Recipe {
        #[command(subcommand)]
        action: RecipeAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Handshake with the remote site and store a new session
    Create {
        #[arg(long)]
        id: Option<String>,
    },
    /// Print a stored session
    Show { session_id: String },
    /// Delete a session and its index mappings
    Teardown { session_id: String },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// Decode the cart and refresh the index mapping
    List {
        session_id: String,
        /// Resolve ingredient names against the live catalog
        #[arg(long)]
        with_catalog: bool,
    },
}

#[derive(Subcommand)]
enum RecipeAction {
    /// Compute the identity of a recipe
    Hash {
        /// Size code, e.g. XL or tacos_XL
        size: String,
        #[arg(long = "meat")]
        meats: Vec<String>,
        #[arg(long = "sauce")]
        sauces: Vec<String>,
        #[arg(long = "garniture")]
        garnitures: Vec<String>,
    },
    /// Convert a shareable (base58) or hex identity to hex
    Decode { identity: String },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Session { action } => {
            let config = commands::load_config(config_path)?;
            match action {
                SessionAction::Create { id } => commands::session::create(&config, id).await?,
                SessionAction::Show { session_id } => {
                    commands::session::show(&config, &session_id).await?
                }
                SessionAction::Teardown { session_id } => {
                    commands::session::teardown(&config, &session_id).await?
                }
            }
        }
        Commands::Items { action } => {
            let config = commands::load_config(config_path)?;
            match action {
                ItemsAction::List {
                    session_id,
                    with_catalog,
                } => commands::items::list(&config, &session_id, with_catalog).await?,
            }
        }
        Commands::Summary { session_id } => {
            let config = commands::load_config(config_path)?;
            commands::items::summary(&config, &session_id).await?
        }
        Commands::Catalog => {
            let config = commands::load_config(config_path)?;
            commands::items::catalog(&config).await?
        }
        Commands::Sweep { max_age_hours } => {
            let config = commands::load_config(config_path)?;
            commands::session::sweep(&config, max_age_hours).await?
        }
        Commands::Recipe { action } => match action {
            RecipeAction::Hash {
                size,
                meats,
                sauces,
                garnitures,
            } => commands::recipe::hash(&size, meats, sauces, garnitures)?,
            RecipeAction::Decode { identity } => commands::recipe::decode(&identity)?,
        },
    }

    Ok(())
}
