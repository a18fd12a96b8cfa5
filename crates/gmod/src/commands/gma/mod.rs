pub mod create;
pub mod extract;
pub mod info;
pub mod json;
pub mod list;

use miette::{Context, IntoDiagnostic, Result};
use std::{fs::File, io::BufReader, path::Path};

use gmod_gma::{GmaArchive, GmaReadOptions};

#[derive(clap::Subcommand)]
pub enum GmaCommands {
    /// Print metadata about a GMA file
    Info(info::InfoArgs),
    /// List the files in a GMA file
    List(list::ListArgs),
    /// Extract a GMA file into a directory
    Extract(extract::ExtractArgs),
    /// Pack a directory into a GMA file
    Create(create::CreateArgs),
    /// Print the addon.json for a GMA file
    Json(json::JsonArgs),
}

impl GmaCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            GmaCommands::Info(info) => info.handle(),
            GmaCommands::List(list) => list.handle(),
            GmaCommands::Extract(extract) => extract.handle(),
            GmaCommands::Create(create) => create.handle(),
            GmaCommands::Json(json) => json.handle(),
        }
    }
}

pub(crate) fn open_archive(path: &Path, verify_integrity: bool) -> Result<GmaArchive> {
    let f = File::open(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))?;

    let archive = GmaArchive::new(
        BufReader::new(f),
        GmaReadOptions::builder()
            .verify_integrity(verify_integrity)
            .build(),
    )
    .context(format!("reading {}", path.display()))?;

    Ok(archive)
}
