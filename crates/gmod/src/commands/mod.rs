pub mod gma;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle GMA addon archives
    Gma {
        #[command(subcommand)]
        command: gma::GmaCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Gma { command } => command.handle(),
        }
    }
}
