use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use crate::cache::CacheBackend;
use crate::storage::schema::DEFAULT_PREFIX;

/// `silo.toml` contents; every field is optional
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SiloConfig {
    pub database: Option<String>,
    pub prefix: Option<String>,
    pub cache: Option<CacheConfig>,
}

/// `[cache]` section
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheConfig {
    /// `inline`, `file` or `disabled`
    pub backend: Option<String>,
    /// Root directory of the file backend
    pub path: Option<String>,
}

impl SiloConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(DEFAULT_PREFIX)
    }

    /// Read a config file; a missing file yields `None`
    pub fn load(path: &Path) -> anyhow::Result<Option<Self>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let config = toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(config))
    }

    /// Write the config file, refusing to replace one unless `force` is set
    pub fn save(&self, path: &Path, force: bool) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        let mut options = OpenOptions::new();
        options.write(true);
        if force {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }

        let mut file = match options.open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display())
            }
            Err(e) => return Err(e).with_context(|| format!("writing {}", path.display())),
        };
        file.write_all(contents.as_bytes())?;
        Ok(())
    }

    /// Database path, with its parent directory created
    pub fn prepare_database(&self) -> anyhow::Result<PathBuf> {
        let path = self.database_path();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(path)
    }

    /// Resolve the cache backend (inline when unspecified)
    pub fn cache_backend(&self) -> anyhow::Result<CacheBackend> {
        let Some(cache) = &self.cache else {
            return Ok(CacheBackend::Inline);
        };
        match cache.backend.as_deref().map(str::to_lowercase).as_deref() {
            None | Some("inline") => Ok(CacheBackend::Inline),
            Some("disabled") | Some("none") => Ok(CacheBackend::Disabled),
            Some("file") => {
                let root = cache
                    .path
                    .as_deref()
                    .map(PathBuf::from)
                    .unwrap_or_else(default_cache_path);
                Ok(CacheBackend::File(root))
            }
            Some(other) => anyhow::bail!("unknown cache backend '{}' (expected inline, file or disabled)", other),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("silo.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from(".silo").join("silo.db")
}

pub fn default_cache_path() -> PathBuf {
    PathBuf::from(".silo").join("cache")
}
