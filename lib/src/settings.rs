use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Chainable, Kind, Result};

/// The settings file looked for at the content root.
pub const CONFIG_FILE: &str = "canopy.toml";

/// Discovery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name of the per-directory descriptor file.
    pub descriptor: String,
    /// Default content index of an explicit post, relative to its directory.
    pub content: String,
    /// Extensions of files that become posts via `YYYY-MM-DD-slug.ext`.
    pub post_extensions: Vec<String>,
    /// Directory names that become listings without a descriptor.
    pub listings: Vec<String>,
    /// Fixed resolution clock. Defaults to today.
    #[serde(with = "crate::descriptor::date")]
    pub build_date: Option<NaiveDate>,
    /// Abort discovery on the first broken subtree instead of skipping it.
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            descriptor: "index.toml".into(),
            content: "index.md".into(),
            post_extensions: vec!["md".into(), "markdown".into()],
            listings: vec!["blog".into(), "posts".into(), "news".into()],
            build_date: None,
            strict: true,
        }
    }
}

impl Settings {
    /// Reads [`CONFIG_FILE`] from `root` if it exists, otherwise returns the
    /// defaults.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Settings> {
        let path = root.as_ref().join(CONFIG_FILE);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no settings file; using defaults");
            return Ok(Settings::default());
        }

        let string = std::fs::read_to_string(&path)
            .map_err(|e| crate::error::Error::from(e).with_kind(Kind::Unreadable))
            .chain_with(|| error!("failed to read settings", "path" => path.display()))?;

        Settings::parse(&string)
            .chain_with(|| error!("invalid settings", "path" => path.display()))
    }

    pub fn parse(string: &str) -> Result<Settings> {
        toml::from_str(string)
            .map_err(|e| crate::error::Error::from(e).with_kind(Kind::Malformed))
    }

    /// The date identifiers measure staleness against.
    pub fn clock(&self) -> NaiveDate {
        self.build_date.unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    pub fn is_post_extension(&self, ext: &str) -> bool {
        self.post_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn is_listing_name(&self, name: &str) -> bool {
        self.listings.iter().any(|l| l == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_keep_defaults() {
        let settings = Settings::parse(r#"
            listings = ["journal"]
            build_date = "2024-06-01"
        "#).unwrap();

        assert_eq!(settings.listings, vec!["journal".to_string()]);
        assert_eq!(settings.descriptor, "index.toml");
        assert!(settings.strict);
        assert_eq!(settings.clock(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(settings.is_listing_name("journal"));
        assert!(!settings.is_listing_name("blog"));
        assert!(settings.is_post_extension("MD"));
    }

    #[test]
    fn missing_settings_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::discover(dir.path()).unwrap(), Settings::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "strict = \"yes\"").unwrap();
        let error = Settings::discover(dir.path()).unwrap_err();
        assert_eq!(error.kind(), Kind::Malformed);
    }
}
