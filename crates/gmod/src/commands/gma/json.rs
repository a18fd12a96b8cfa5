use clap::Args;
use miette::Result;
use std::path::PathBuf;

#[derive(Args)]
pub struct JsonArgs {
    /// An input GMA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl JsonArgs {
    pub fn handle(&self) -> Result<()> {
        let addon = super::open_archive(&self.file, false)?.into_addon()?;

        println!("{}", addon.addon_json()?.to_string_pretty()?);

        Ok(())
    }
}
