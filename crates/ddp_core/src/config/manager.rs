//! Loading and saving the TOML config file.
//!
//! Saves are atomic (a temp file in the same directory is persisted over
//! the config). `update_section` edits the file in place with `toml_edit`
//! so comments and hand-written keys elsewhere survive `--save-defaults`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot access config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot edit config {}: {source}", .path.display())]
    Edit {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings and the file they came from.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Manager for `config_path` holding defaults. Nothing is read yet.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory settings; persisted by `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Read the file. Missing keys take their defaults.
    pub fn load(&mut self) -> ConfigResult<()> {
        let content = self.read()?.ok_or_else(|| ConfigError::NotFound(self.config_path.clone()))?;
        self.settings = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", self.config_path.display());
        Ok(())
    }

    /// Like `load`, but a missing file means defaults. Never writes.
    pub fn load_or_default(&mut self) -> ConfigResult<()> {
        match self.load() {
            Err(ConfigError::NotFound(_)) => {
                self.settings = Settings::default();
                Ok(())
            }
            other => other,
        }
    }

    /// Write every section, replacing the file.
    pub fn save(&self) -> ConfigResult<()> {
        let mut content = String::from("# DDP Atmos encoder configuration\n\n");
        for section in ConfigSection::ALL {
            content.push_str(section.comment());
            content.push('\n');
            content.push_str(&format!("[{}]\n", section.table_name()));
            content.push_str(&self.section_toml(*section)?);
            content.push('\n');
        }
        self.write(&content)
    }

    /// Write one section into the existing file.
    ///
    /// Keys of that table are overwritten one by one, so comments attached
    /// to them and unknown keys stay in place.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = match self.read()? {
            Some(content) => content.parse::<DocumentMut>().map_err(|source| ConfigError::Edit {
                path: self.config_path.clone(),
                source,
            })?,
            None => DocumentMut::new(),
        };

        let fresh = self
            .section_toml(section)?
            .parse::<DocumentMut>()
            .map_err(|source| ConfigError::Edit {
                path: self.config_path.clone(),
                source,
            })?;

        let name = section.table_name();
        if !doc.contains_table(name) {
            doc[name] = Item::Table(Table::new());
        }
        for (key, value) in fresh.iter() {
            doc[name][key] = value.clone();
        }

        self.write(&doc.to_string())
    }

    fn section_toml(&self, section: ConfigSection) -> ConfigResult<String> {
        Ok(match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Tools => toml::to_string_pretty(&self.settings.tools)?,
            ConfigSection::Encode => toml::to_string_pretty(&self.settings.encode)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
        })
    }

    /// File content, or `None` when the file does not exist.
    fn read(&self) -> ConfigResult<Option<String>> {
        match fs::read_to_string(&self.config_path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn write(&self, content: &str) -> ConfigResult<()> {
        let dir = match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        temp.persist(&self.config_path)
            .map_err(|e| self.io_error(e.error))?;

        tracing::debug!("Wrote config {}", self.config_path.display());
        Ok(())
    }

    fn io_error(&self, source: io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.config_path.clone(),
            source,
        }
    }
}
