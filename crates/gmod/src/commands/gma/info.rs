use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// An input GMA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Verify the checksums stored in the archive
    #[arg(long, default_value_t = false)]
    verify: bool,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let gma = super::open_archive(&self.file, self.verify)?;

        let size: u64 = gma.entries().iter().map(|e| e.size).sum();

        println!("{} {}", "Name:".bold(), gma.name());
        println!("{} {}", "Author:".bold(), gma.author());
        println!("{} {}", "Description:".bold(), gma.description());
        println!("{} {}", "Version:".bold(), gma.version());
        println!("{} {}", "Steam ID:".bold(), gma.steam_id());
        println!("{} {}", "Timestamp:".bold(), gma.timestamp());
        if !gma.required_content().is_empty() {
            println!(
                "{} {}",
                "Required content:".bold(),
                gma.required_content().join(", ")
            );
        }
        println!("{} {} ({} bytes)", "Files:".bold(), gma.len(), size);

        if self.verify {
            println!("{}", "checksums verified".green());
        }

        Ok(())
    }
}
