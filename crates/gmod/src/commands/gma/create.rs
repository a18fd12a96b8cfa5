use clap::Args;
use gmod_gma::{json::AddonJson, GmaWriter, GmaWriterOptions};
use miette::{Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::info;

use crate::builder;

#[derive(Args)]
pub struct CreateArgs {
    /// An input directory containing an addon.json
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target GMA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Description stored alongside the type and tags
    #[arg(long, default_value = "Description")]
    description: String,

    /// Author of the addon
    #[arg(long, default_value = "Author Name")]
    author: String,

    /// Write checksums for every file and the archive
    #[arg(long, default_value_t = false)]
    crc: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl CreateArgs {
    pub fn handle(&self) -> Result<()> {
        let json_path = self.directory.join(builder::ADDON_JSON);
        let json = std::fs::read_to_string(&json_path)
            .into_diagnostic()
            .context(format!("reading {}", json_path.display()))?;
        let addon_json =
            AddonJson::parse(&json).context(format!("parsing {}", json_path.display()))?;

        let mut addon = builder::addon_from_directory(&self.directory, &addon_json.ignore)?;
        addon.name = addon_json.title.clone();
        addon.description = addon_json
            .into_description(self.description.as_str())
            .to_json()?;
        addon.author = self.author.clone();
        addon.verify_integrity = self.crc;

        info!("creating {} with {} files", &self.file.display(), addon.len());

        let out = if !self.overwrite {
            File::create_new(&self.file)
        } else {
            File::create(&self.file)
        }
        .into_diagnostic()
        .context(format!("creating {}", &self.file.display()))?;

        GmaWriter::new(BufWriter::new(out), GmaWriterOptions::default())
            .write_addon(&addon)
            .context("writing gma file")?
            .flush()
            .into_diagnostic()
            .context("finalizing gma file")?;

        Ok(())
    }
}
