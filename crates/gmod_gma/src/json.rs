//! Addon description payloads and the `addon.json` sidecar
//!

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tree::Addon;

/// Globs ignored when packing, unless an `addon.json` says otherwise
pub const DEFAULT_IGNORE: [&str; 3] = ["*.psd", "*.vcproj", "*.svn"];

/// JSON payload stored in the description field of an archive
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AddonDescription {
    #[serde(default)]
    pub description: String,

    #[serde(rename = "type")]
    pub addon_type: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl AddonDescription {
    pub fn parse(description: &str) -> Result<Self> {
        Ok(serde_json::from_str(description)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The `addon.json` that sits next to the contents of an unpacked addon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AddonJson {
    pub title: String,

    #[serde(rename = "type")]
    pub addon_type: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

fn default_ignore() -> Vec<String> {
    DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect()
}

impl AddonJson {
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builds the description payload stored in an archive packed from this sidecar
    pub fn into_description(self, description: impl Into<String>) -> AddonDescription {
        AddonDescription {
            description: description.into(),
            addon_type: self.addon_type,
            tags: self.tags,
        }
    }
}

impl Addon {
    /// Parses the description of this addon as an [`AddonDescription`]
    pub fn parsed_description(&self) -> Result<AddonDescription> {
        AddonDescription::parse(&self.description)
    }

    /// Builds the `addon.json` sidecar for this addon
    pub fn addon_json(&self) -> Result<AddonJson> {
        let description = self.parsed_description()?;

        Ok(AddonJson {
            title: self.name.clone(),
            addon_type: description.addon_type,
            tags: description.tags,
            ignore: default_ignore(),
        })
    }
}
