use clap::Args;
use globset::Glob;
use miette::{Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::Write,
    path::{Component, Path, PathBuf},
};
use tracing::{info, warn};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input GMA file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Only extract files matching this pattern, e.g. "**.lua"
    #[arg(short, long)]
    pattern: Option<String>,

    /// Verify the checksums stored in the archive
    #[arg(long, default_value_t = false)]
    verify: bool,

    /// Also write an addon.json built from the description
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let gma = super::open_archive(&self.file, self.verify)?;

        let matcher = self
            .pattern
            .as_deref()
            .map(|p| Glob::new(p).map(|g| g.compile_matcher()))
            .transpose()
            .into_diagnostic()
            .context("invalid pattern")?;

        for entry in gma.entries() {
            if matcher.as_ref().is_some_and(|m| !m.is_match(&entry.name)) {
                continue;
            }

            let relative = Path::new(&entry.name);
            if !is_contained(relative) {
                warn!("skipping {}, it escapes the target directory", entry.name);
                continue;
            }

            let p = self.directory.join(relative);
            info!("writing {}", p.display());

            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .into_diagnostic()
                    .context(format!("creating {}", parent.display()))?;
            }

            self.create(&p)?
                .write_all(&gma.entry_data(entry))
                .into_diagnostic()
                .context(format!("writing {}", p.display()))?;
        }

        if self.json {
            let p = self.directory.join("addon.json");
            info!("writing {}", p.display());

            let json = gma.into_addon()?.addon_json()?.to_string_pretty()?;
            self.create(&p)?
                .write_all(json.as_bytes())
                .into_diagnostic()
                .context(format!("writing {}", p.display()))?;
        }

        Ok(())
    }

    fn create(&self, p: &Path) -> Result<File> {
        let file = if !self.overwrite {
            File::create_new(p)
        } else {
            File::create(p)
        };

        file.into_diagnostic()
            .context(format!("creating {}", p.display()))
    }
}

fn is_contained(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}
