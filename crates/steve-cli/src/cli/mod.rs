//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use steve_core::{config, interrupt};

use crate::logging;

mod commands;
mod turn;

#[derive(Parser)]
#[command(name = "steve")]
#[command(version)]
#[command(about = "Chat with your knowledgebases from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    chat: ChatArgs,
}

/// Turn arguments shared by `chat` and `ask`.
#[derive(clap::Args, Debug, Clone, Default)]
struct TurnArgs {
    /// Knowledgebase ids to search (comma-separated; default: config)
    #[arg(long = "kb", value_name = "IDS", value_delimiter = ',')]
    kb: Vec<i64>,

    /// Context passages to retrieve (default: config)
    #[arg(long, value_name = "N")]
    top_k: Option<u32>,
}

#[derive(clap::Args, Debug, Clone, Default)]
struct ChatArgs {
    #[command(flatten)]
    turn: TurnArgs,

    /// Continue a saved session by id or id prefix
    #[arg(long, value_name = "ID", conflicts_with = "new")]
    session: Option<String>,

    /// Start a new session
    #[arg(long)]
    new: bool,

    /// Do not save the conversation
    #[arg(long = "no-save")]
    no_save: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Interactive chat (default)
    Chat(ChatArgs),

    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        #[arg(short, long)]
        prompt: String,

        #[command(flatten)]
        turn: TurnArgs,

        /// Also write the rendered answer as HTML to this file
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
    },

    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Render markdown to HTML
    Render {
        /// Markdown file (default: stdin)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Check the chat service
    Health,
}

#[derive(clap::Subcommand)]
enum SessionCommands {
    /// Lists saved sessions
    List,
    /// Shows a session transcript
    Show {
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
    /// Renames a session
    Rename {
        #[arg(value_name = "SESSION_ID")]
        id: String,
        #[arg(value_name = "TITLE")]
        title: String,
    },
    /// Deletes a session
    Delete {
        #[arg(value_name = "SESSION_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Persist the default number of context passages
    SetTopK {
        #[arg(value_name = "N")]
        top_k: u32,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init()?;

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config);

    let Some(command) = cli.command else {
        return commands::chat::run(&chat_options(cli.chat), &config).await;
    };

    match command {
        Commands::Chat(args) => commands::chat::run(&chat_options(args), &config).await,
        Commands::Ask { prompt, turn, html } => {
            commands::ask::run(&prompt, &turn.kb, turn.top_k, html.as_deref(), &config).await
        }
        Commands::Sessions { command } => match command {
            SessionCommands::List => commands::sessions::list(),
            SessionCommands::Show { id } => commands::sessions::show(&id),
            SessionCommands::Rename { id, title } => commands::sessions::rename(&id, &title),
            SessionCommands::Delete { id } => commands::sessions::delete(&id),
        },
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetTopK { top_k } => commands::config::set_top_k(top_k),
        },
        Commands::Render { file } => commands::render::run(file.as_deref()),
        Commands::Health => commands::health::run(&config).await,
    }
}

fn chat_options(args: ChatArgs) -> commands::chat::ChatOptions {
    commands::chat::ChatOptions {
        kb: args.turn.kb,
        top_k: args.turn.top_k,
        session: args.session,
        new: args.new,
        no_save: args.no_save,
    }
}
