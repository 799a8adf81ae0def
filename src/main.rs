use anyhow::Result;
use clap::{Parser, Subcommand};

use storyline::config::Config;
use storyline::store::ConversationStore;
use storyline::{commands, logging, tui};

#[derive(Parser)]
#[command(name = "storyline")]
#[command(version)]
#[command(about = "Terminal chat client for a conversation-keeping LLM backend", long_about = None)]
struct Cli {
    /// Backend base URL, overriding the config file and STORYLINE_BACKEND_URL
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversations grouped by recency
    List,
    /// Print a conversation transcript
    Show {
        id: String,
        /// Emit HTML instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Delete a conversation
    Delete { id: String },
    /// Show backend health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.backend_url {
        config.set_backend_url(url);
    }

    match cli.command {
        None => logging::init_file(&config.log_path())?,
        Some(_) => logging::init_stderr()?,
    }

    let store = ConversationStore::new(&config)?;

    match cli.command {
        None => tui::run(&config, store).await,
        Some(Commands::List) => commands::list_conversations(&store).await,
        Some(Commands::Show { id, html }) => commands::show_conversation(&store, &id, html).await,
        Some(Commands::Delete { id }) => commands::delete_conversation(&store, &id).await,
        Some(Commands::Status) => commands::show_status(&store).await,
    }
}
