//! Cache configuration.
//!
//! Centralized settings for every cache tier: per-size-class capacities
//! and prune fractions for the photo caches, the link metadata cache
//! capacity, the maintenance interval, and the disk tier location.
//! Configuration can be created programmatically, loaded from a file, or
//! overridden through environment variables.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the preview cache subsystem.
///
/// Full images are large, so their pool is small and pruned aggressively
/// under memory pressure; thumbnails are cheap, so their pool is larger
/// and pruned more gently.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Entry capacity of the full-image photo cache.
    pub full_image_entries: usize,
    /// Fraction of full-image entries dropped on memory pressure.
    pub full_image_prune_fraction: f64,
    /// Entry capacity of the thumbnail photo cache.
    pub thumbnail_entries: usize,
    /// Fraction of thumbnail entries dropped on memory pressure.
    pub thumbnail_prune_fraction: f64,
    /// Entry capacity of the link metadata memory cache.
    pub link_entries: usize,
    /// Fraction of link metadata entries dropped on memory pressure.
    pub link_prune_fraction: f64,
    /// Interval of the capacity re-enforcement safety net.
    pub maintenance_interval: Duration,
    /// Directory backing the persistent link preview tier.
    pub disk_cache_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            full_image_entries: 20,
            full_image_prune_fraction: 0.30,
            thumbnail_entries: 50,
            thumbnail_prune_fraction: 0.25,
            link_entries: 10,
            link_prune_fraction: 0.25,
            maintenance_interval: Duration::from_secs(60 * 60),
            disk_cache_dir: Self::default_cache_dir(),
        }
    }
}

impl CacheConfig {
    /// Sets the full-image cache capacity.
    pub fn with_full_image_entries(mut self, entries: usize) -> Self {
        self.full_image_entries = entries;
        self
    }

    /// Sets the thumbnail cache capacity.
    pub fn with_thumbnail_entries(mut self, entries: usize) -> Self {
        self.thumbnail_entries = entries;
        self
    }

    /// Sets the link metadata cache capacity.
    pub fn with_link_entries(mut self, entries: usize) -> Self {
        self.link_entries = entries;
        self
    }

    /// Sets the maintenance interval.
    pub fn with_maintenance_interval(mut self, interval: Duration) -> Self {
        self.maintenance_interval = interval;
        self
    }

    /// Sets the disk cache directory.
    pub fn with_disk_cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.disk_cache_dir = path.as_ref().to_path_buf();
        self
    }

    /// Returns the default disk cache directory for the current platform.
    pub fn default_cache_dir() -> PathBuf {
        if let Some(cache_dir) = dirs::cache_dir() {
            cache_dir.join("shelfmark").join("link-previews")
        } else {
            PathBuf::from("cache/link-previews")
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SHELFMARK_FULL_IMAGE_CACHE_ENTRIES`: full-image capacity (default: 20)
    /// - `SHELFMARK_THUMBNAIL_CACHE_ENTRIES`: thumbnail capacity (default: 50)
    /// - `SHELFMARK_LINK_CACHE_ENTRIES`: link metadata capacity (default: 10)
    /// - `SHELFMARK_CACHE_MAINTENANCE_SECS`: maintenance interval in seconds
    /// - `SHELFMARK_CACHE_DIR`: disk cache directory path
    ///
    /// # Errors
    /// Returns an error if any variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SHELFMARK_FULL_IMAGE_CACHE_ENTRIES") {
            config.full_image_entries = parse_entries("SHELFMARK_FULL_IMAGE_CACHE_ENTRIES", &val)?;
        }

        if let Ok(val) = std::env::var("SHELFMARK_THUMBNAIL_CACHE_ENTRIES") {
            config.thumbnail_entries = parse_entries("SHELFMARK_THUMBNAIL_CACHE_ENTRIES", &val)?;
        }

        if let Ok(val) = std::env::var("SHELFMARK_LINK_CACHE_ENTRIES") {
            config.link_entries = parse_entries("SHELFMARK_LINK_CACHE_ENTRIES", &val)?;
        }

        if let Ok(val) = std::env::var("SHELFMARK_CACHE_MAINTENANCE_SECS") {
            let secs = val.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue("SHELFMARK_CACHE_MAINTENANCE_SECS".to_string())
            })?;
            config.maintenance_interval = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("SHELFMARK_CACHE_DIR") {
            config.disk_cache_dir = PathBuf::from(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format:
    /// ```toml
    /// full_image_entries = 20
    /// thumbnail_entries = 50
    /// link_entries = 10
    /// maintenance_secs = 3600
    /// disk_cache_dir = "/path/to/cache"
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(ConfigError::IoError)?;
        Self::from_toml(&contents)
    }

    fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in toml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"');

                match key {
                    "full_image_entries" => config.full_image_entries = parse_entries(key, value)?,
                    "thumbnail_entries" => config.thumbnail_entries = parse_entries(key, value)?,
                    "link_entries" => config.link_entries = parse_entries(key, value)?,
                    "maintenance_secs" => {
                        let secs = value
                            .parse::<u64>()
                            .map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
                        config.maintenance_interval = Duration::from_secs(secs);
                    }
                    "disk_cache_dir" => config.disk_cache_dir = PathBuf::from(value),
                    _ => {} // Ignore unknown keys
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml()).map_err(ConfigError::IoError)
    }

    fn to_toml(&self) -> String {
        format!(
            "# Shelfmark preview cache configuration\n\
             full_image_entries = {}\n\
             thumbnail_entries = {}\n\
             link_entries = {}\n\
             maintenance_secs = {}\n\
             disk_cache_dir = \"{}\"\n",
            self.full_image_entries,
            self.thumbnail_entries,
            self.link_entries,
            self.maintenance_interval.as_secs(),
            self.disk_cache_dir.display()
        )
    }

    /// Checks that every capacity is at least one entry and every prune
    /// fraction lies in (0, 1].
    ///
    /// # Errors
    /// Returns the offending field name on the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, entries) in [
            ("full_image_entries", self.full_image_entries),
            ("thumbnail_entries", self.thumbnail_entries),
            ("link_entries", self.link_entries),
        ] {
            if entries == 0 {
                return Err(ConfigError::InvalidValue(name.to_string()));
            }
        }
        for (name, fraction) in [
            ("full_image_prune_fraction", self.full_image_prune_fraction),
            ("thumbnail_prune_fraction", self.thumbnail_prune_fraction),
            ("link_prune_fraction", self.link_prune_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ConfigError::InvalidValue(name.to_string()));
            }
        }
        Ok(())
    }
}

fn parse_entries(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
