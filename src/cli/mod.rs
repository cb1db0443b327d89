use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "cats-social")]
#[command(about = "Cats Social API - cat profiles and match requests")]
#[command(version)]
pub struct Cli {
    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Run the HTTP server")]
    Serve {
        #[arg(long, help = "Keep all data in process memory instead of PostgreSQL")]
        memory: bool,
    },

    #[command(about = "Apply database migrations and exit")]
    Migrate,
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Serve { memory: false })
    }
}
