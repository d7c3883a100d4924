//! Configuration system
//!
//! Engine settings are plain serde structures; the file extension picks the
//! format (`.toml` or `.ron`).

pub use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file format, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Ron,
}

fn format_of(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|extension| extension.to_str()) {
        Some("toml") => Ok(Format::Toml),
        Some("ron") => Ok(Format::Ron),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(contents: &str, format: Format) -> Result<T, ConfigError> {
    match format {
        Format::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        Format::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
    }
}

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// I/O failures, malformed contents, or an extension other than `.toml`/`.ron`.
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = format_of(path)?;
        let contents = std::fs::read_to_string(path)?;

        parse(&contents, format)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// I/O failures, serialization failures, or an unsupported extension.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match format_of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input.
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        parse(contents, Format::Toml)
    }

    /// Parse RON text
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed input.
    fn from_ron_str(contents: &str) -> Result<Self, ConfigError> {
        parse(contents, Format::Ron)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        layers: u8,
        name: String,
    }

    impl Config for Sample {}

    #[test]
    fn test_unsupported_extension() {
        let result = Sample::load_from_file("settings.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_toml_and_ron_parsing() {
        let from_toml = Sample::from_toml_str("layers = 32\nname = \"vb\"\n").unwrap();
        assert_eq!(from_toml, Sample { layers: 32, name: "vb".into() });

        let from_ron = Sample::from_ron_str("(layers: 16, name: \"ron\")").unwrap();
        assert_eq!(from_ron.layers, 16);

        assert!(matches!(Sample::from_toml_str("layers = \"x\""), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("vb_engine_config_test_{}.ron", std::process::id()));
        let sample = Sample { layers: 7, name: "saved".into() };
        sample.save_to_file(&path).unwrap();
        let loaded = Sample::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, sample);
    }
}
