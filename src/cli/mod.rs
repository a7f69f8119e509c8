mod auth;
mod export;
mod show;

use crate::error::Result;
use clap::{Parser, Subcommand};

pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "sheet-export")]
#[command(about = "Create a Google spreadsheet and export sample data into it", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            None | Some(Commands::Export) => export::execute().await,
            Some(Commands::Auth { reset }) => auth::execute(*reset).await,
            Some(Commands::Show { resource }) => resource.execute().await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the sample spreadsheet and write the sample data (default)
    Export,
    /// Obtain Google credentials without touching any spreadsheet
    Auth {
        /// Discard cached tokens first
        #[arg(long)]
        reset: bool,
    },
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}
