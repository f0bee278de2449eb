pub mod commands;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "incident-ops")]
#[command(about = "Incident Ops configuration API - effective dropdowns, tags and tag policies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides INCIDENT_OPS_PORT / PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Upsert the bundled system defaults")]
    Seed,

    #[command(about = "Mint a bearer token for a user (development)")]
    Token {
        #[arg(long, help = "User id placed in the token subject")]
        user: Uuid,
        #[arg(long, help = "Optional email claim")]
        email: Option<String>,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve(port).await,
        Commands::Migrate => commands::migrate().await,
        Commands::Seed => commands::seed().await,
        Commands::Token { user, email } => commands::token(user, email),
    }
}
