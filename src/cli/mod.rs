//! CLI module for Lorekeep
//!
//! Provides commands:
//! - `seed`: import universes, NPCs and scripted events from a JSON world file
//! - `start`, `say`, `end`, `show`: drive a dialogue session

use clap::{Parser, Subcommand};

pub mod session;
pub mod world;

/// Lorekeep NPC dialogue engine CLI
#[derive(Parser, Debug)]
#[command(name = "lorekeep")]
#[command(about = "NPC conversation memory and dialogue orchestration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import world data (universes, NPCs, scripted events)
    Seed {
        /// Path to a world JSON file
        path: String,
    },
    /// Start a dialogue session and print its ID
    Start {
        /// Universe the session takes place in
        #[arg(long)]
        universe: String,
        /// Participating NPC (repeat for a group conversation)
        #[arg(long = "npc", required = true)]
        npcs: Vec<String>,
        /// Player identity
        #[arg(long)]
        player: String,
        /// Scripted event to seed the conversation with
        #[arg(long)]
        event: Option<String>,
    },
    /// Send a player utterance and print the NPC reply
    Say {
        /// Session ID
        session_id: String,
        /// Player utterance
        text: String,
        /// Provider selector (openai, anthropic); defaults to config
        #[arg(long)]
        provider: Option<String>,
    },
    /// End a session and print the produced memories
    End {
        /// Session ID
        session_id: String,
    },
    /// Print a session as JSON
    Show {
        /// Session ID
        session_id: String,
    },
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Seed { path }) => world::seed(&path).await,
        Some(Commands::Start {
            universe,
            npcs,
            player,
            event,
        }) => session::start(&universe, &npcs, &player, event.as_deref()).await,
        Some(Commands::Say {
            session_id,
            text,
            provider,
        }) => session::say(&session_id, &text, provider.as_deref()).await,
        Some(Commands::End { session_id }) => session::end(&session_id).await,
        Some(Commands::Show { session_id }) => session::show(&session_id).await,
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}
