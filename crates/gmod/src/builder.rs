//! Builds an addon tree from a directory on disk

use globset::{Glob, GlobSet, GlobSetBuilder};
use gmod_gma::Addon;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Name of the sidecar describing an unpacked addon
pub const ADDON_JSON: &str = "addon.json";

/// Collects every file below `directory` into a new addon
///
/// Paths matching one of the `ignore` globs and the top level addon.json are skipped. Files are
/// visited in file name order so the same directory always yields the same archive.
pub fn addon_from_directory(directory: &Path, ignore: &[String]) -> Result<Addon> {
    let ignore = build_globset(ignore)?;
    let mut addon = Addon::default();

    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = entry.into_diagnostic()?;
        if entry.file_type().is_dir() {
            continue;
        }

        let name = entry
            .path()
            .strip_prefix(directory)
            .into_diagnostic()?;
        let name = name
            .to_str()
            .ok_or(miette!("unable to convert {} to a string", name.display()))?;

        if name == ADDON_JSON || ignore.is_match(name) {
            debug!("ignoring {}", name);
            continue;
        }

        info!("adding {}", name);
        let data = std::fs::read(entry.path())
            .into_diagnostic()
            .context(format!("reading {}", entry.path().display()))?;

        addon
            .insert_file(name, data)
            .context(format!("adding {}", name))?;
    }

    Ok(addon)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern)
                .into_diagnostic()
                .context(format!("invalid ignore pattern {}", pattern))?,
        );
    }
    builder.build().into_diagnostic()
}
