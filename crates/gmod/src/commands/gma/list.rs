use clap::Args;
use miette::Result;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input GMA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let gma = super::open_archive(&self.file, false)?;

        for entry in gma.entries() {
            println!("{:>10} {}", entry.size, entry.name);
        }

        Ok(())
    }
}
