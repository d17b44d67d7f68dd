//! Configuration management for mediawatch using the prefer crate.
//!
//! Precedence, lowest to highest: built-in defaults, config file
//! (`--config`, a file next to `--target`, or prefer discovery), the
//! `--target` flag, then environment variables (`DATABASE_URL`,
//! `MEDIAWATCH_BIND`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::repository::DbContext;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "mediawatch.db";

/// Default HTTP bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3040";

/// Default query window when a caller gives no start date.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Longest configurable default window (about a century).
pub const MAX_WINDOW_DAYS: u32 = 36_525;

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename inside `data_dir`.
    pub database_filename: String,
    /// Explicit database URL; overrides `data_dir`/`database_filename`.
    pub database_url: Option<String>,
    /// Address the HTTP server binds to.
    pub bind: String,
    /// Days covered by a query with no explicit start date.
    pub default_window_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mediawatch");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            bind: DEFAULT_BIND.to_string(),
            default_window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl Settings {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Whether the database file is present. Always true for explicit URLs.
    pub fn database_exists(&self) -> bool {
        self.database_url.is_some() || self.database_path().exists()
    }

    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if self.database_url.is_none() {
            std::fs::create_dir_all(&self.data_dir)?;
        }
        Ok(())
    }

    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// HTTP bind address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    /// Default query window in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_window_days: Option<u64>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a `mediawatch` config file in the standard locations.
    pub async fn load() -> Self {
        match prefer::load("mediawatch").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => Self::load_from_path(path).await.unwrap_or_else(|e| {
                    tracing::warn!("{}", e);
                    Self::default()
                }),
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load from a file, choosing the parser by extension (default JSON).
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// The config file's directory, used to resolve relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// Paths starting with `~` are expanded.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(days) = self.default_window_days {
            settings.default_window_days =
                u32::try_from(days).map_or(MAX_WINDOW_DAYS, |d| d.min(MAX_WINDOW_DAYS));
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Use CWD for relative paths instead of config file directory.
    pub use_cwd: bool,
    /// Data directory or database file (`--target`).
    pub target: Option<PathBuf>,
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn is_db_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
        || path.is_file()
}

/// Split a `--target` into (data dir, database filename if it named a file).
fn resolve_target(path: &Path) -> (PathBuf, Option<String>) {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        current_dir().join(path)
    };

    if is_db_file(&path) {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        (dir, filename)
    } else {
        (path, None)
    }
}

/// Look for `mediawatch.{ext}` or `config.{ext}` inside the data directory.
fn find_config_in_dir(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["json", "yaml", "yml", "toml"];
    let basenames = ["mediawatch", "config"];

    basenames
        .iter()
        .flat_map(|base| extensions.iter().map(move |ext| data_dir.join(format!("{base}.{ext}"))))
        .find(|path| path.exists())
}

async fn load_file_config(options: &LoadOptions, data_dir: Option<&Path>) -> Config {
    // Priority 1: explicit --config
    if let Some(ref config_path) = options.config_path {
        return Config::load_from_path(config_path).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Config::default()
        });
    }

    // Priority 2: config next to the target data dir
    if let Some(found) = data_dir.and_then(find_config_in_dir) {
        tracing::debug!("Found config in data dir: {}", found.display());
        return Config::load_from_path(&found).await.unwrap_or_else(|e| {
            tracing::warn!("{}", e);
            Config::default()
        });
    }

    // Priority 3: prefer discovery
    Config::load().await
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Load settings with explicit options.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let target = options.target.as_deref().map(resolve_target);
    let config = load_file_config(&options, target.as_ref().map(|(dir, _)| dir.as_path())).await;

    let mut settings = Settings::default();

    let base_dir = if options.use_cwd {
        current_dir()
    } else {
        config.base_dir().unwrap_or_else(current_dir)
    };
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some((dir, filename)) = target {
        settings.data_dir = dir;
        if let Some(filename) = filename {
            settings.database_filename = filename;
        }
    }

    if let Some(url) = env_value("DATABASE_URL") {
        tracing::debug!("Using DATABASE_URL from environment: {}", url);
        settings.database_url = Some(url);
    }
    if let Some(bind) = env_value("MEDIAWATCH_BIND") {
        settings.bind = bind;
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_database_url_from_path() {
        let settings = Settings::with_data_dir(PathBuf::from("/srv/mediawatch"));
        assert_eq!(settings.database_url(), "sqlite:/srv/mediawatch/mediawatch.db");
        assert_eq!(settings.default_window_days, DEFAULT_WINDOW_DAYS);
    }

    #[test]
    fn test_resolve_target_file_and_dir() {
        let (dir, file) = resolve_target(Path::new("/data/news.db"));
        assert_eq!(dir, PathBuf::from("/data"));
        assert_eq!(file.as_deref(), Some("news.db"));

        let (dir, file) = resolve_target(Path::new("/data/archive"));
        assert_eq!(dir, PathBuf::from("/data/archive"));
        assert!(file.is_none());
    }

    #[tokio::test]
    async fn test_load_from_path_by_extension() {
        let dir = tempdir().unwrap();

        let toml_path = dir.path().join("mediawatch.toml");
        std::fs::write(&toml_path, "data_dir = \"store\"\nbind = \"0.0.0.0:8080\"\n").unwrap();
        let config = Config::load_from_path(&toml_path).await.unwrap();
        assert_eq!(config.bind.as_deref(), Some("0.0.0.0:8080"));

        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, &config.base_dir().unwrap());
        assert_eq!(settings.data_dir, dir.path().join("store"));
        assert_eq!(settings.bind, "0.0.0.0:8080");

        let yaml_path = dir.path().join("other.yaml");
        std::fs::write(&yaml_path, "default_window_days: 14\n").unwrap();
        let config = Config::load_from_path(&yaml_path).await.unwrap();
        assert_eq!(config.default_window_days, Some(14));

        let json_path = dir.path().join("broken.json");
        std::fs::write(&json_path, "{not json").unwrap();
        assert!(Config::load_from_path(&json_path).await.is_err());
    }

    #[test]
    fn test_window_days_capped() {
        let config = Config {
            default_window_days: Some(u64::MAX),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("."));
        assert_eq!(settings.default_window_days, MAX_WINDOW_DAYS);

        let config = Config {
            default_window_days: Some(u64::from(u32::MAX)),
            ..Default::default()
        };
        config.apply_to_settings(&mut settings, Path::new("."));
        assert_eq!(settings.default_window_days, MAX_WINDOW_DAYS);
    }

    #[tokio::test]
    async fn test_config_found_next_to_target() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("mediawatch.json"),
            r#"{"default_window_days": 30}"#,
        )
        .unwrap();

        let (settings, config) = load_settings_with_options(LoadOptions {
            target: Some(dir.path().join("news.db")),
            ..Default::default()
        })
        .await;

        assert_eq!(config.default_window_days, Some(30));
        assert_eq!(settings.default_window_days, 30);
        assert_eq!(settings.database_filename, "news.db");
        assert_eq!(settings.data_dir, dir.path());
    }

    #[test]
    fn test_resolve_path_tilde() {
        let config = Config::default();
        let resolved = config.resolve_path("~/news", Path::new("/base"));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("news"));
        assert_eq!(
            config.resolve_path("rel", Path::new("/base")),
            PathBuf::from("/base/rel")
        );
    }
}
