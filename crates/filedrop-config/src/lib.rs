use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Layered application configuration.
///
/// Loaded once at startup; absence of the backing file, or any key in it,
/// is expected on first run, so every section and field falls back to its
/// built-in default. The value is passed down explicitly, there is no
/// global instance; "non-persistent save" is plain value assignment at
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ui: UiPreferences,
    pub catalog: Catalog,
    pub target: StorageTarget,
    pub queue: QueueInfo,
    pub storage: StorageInfo,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPreferences {
    /// Console pane visibility
    pub console: bool,

    /// Echo the raw published message back to the operator
    pub echo_messages: bool,

    /// Allow opening the selected input file from the frontend
    pub allow_open_input_file: bool,

    /// One of "auto", "light", "dark"; validated by `AppConfig::theme`
    pub theme: String,
}

/// A display label with an optional underlying value. Catalogs are
/// ordered lists of these pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub label: String,

    #[serde(default)]
    pub value: String,
}

impl CatalogEntry {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The value sent on the wire; falls back to the label when no
    /// explicit value was configured.
    pub fn underlying_value(&self) -> &str {
        if self.value.is_empty() {
            &self.label
        } else {
            &self.value
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub company: Vec<CatalogEntry>,
    pub file_type: Vec<CatalogEntry>,
    pub data_type: Vec<CatalogEntry>,
    pub file_sub_type: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageTarget {
    /// Target database the downstream pipeline ingests into
    pub db_name: String,

    /// Destination folder inside the bucket
    pub folder_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueInfo {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub virtual_host: String,
    pub queues: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageInfo {
    pub bucket_name: String,
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON formatted logs
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Auto => "auto",
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Theme::Auto),
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(()),
        }
    }
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            console: false,
            echo_messages: false,
            allow_open_input_file: false,
            theme: "dark".to_string(),
        }
    }
}

impl Default for QueueInfo {
    fn default() -> Self {
        Self {
            username: "guest".to_string(),
            password: "guest".to_string(),
            host: "127.0.0.1".to_string(),
            port: 14567,
            virtual_host: "/".to_string(),
            queues: Vec::new(),
        }
    }
}

impl Default for StorageInfo {
    fn default() -> Self {
        Self {
            bucket_name: String::new(),
            endpoint_url: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ui: UiPreferences::default(),
            catalog: Catalog::default(),
            target: StorageTarget::default(),
            queue: QueueInfo::default(),
            storage: StorageInfo::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration layered as defaults <- file <- environment.
    ///
    /// Never fails: a missing, unreadable or malformed file is logged and
    /// the built-in defaults are returned instead.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to read configuration, using defaults"
                );
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> anyhow::Result<Self> {
        let s = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&Self::default())?)
            // Merge the persisted file on top, key by key
            .add_source(config::File::from(path).required(false))
            // Environment variables win (FILEDROP_QUEUE__HOST=rabbit)
            .add_source(config::Environment::with_prefix("FILEDROP").separator("__"))
            .build()?;

        let config = s.try_deserialize()?;
        Ok(config)
    }

    /// Strict read, used where a parse error should surface.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Persist to the backing location, creating missing parent
    /// directories first.
    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validated theme. Anything outside {auto, light, dark} is logged
    /// and treated as Auto, never surfaced as an error.
    pub fn theme(&self) -> Theme {
        match self.ui.theme.parse() {
            Ok(theme) => theme,
            Err(()) => {
                warn!(theme = %self.ui.theme, "unknown theme in configuration, using auto");
                Theme::Auto
            }
        }
    }

    pub fn company_names(&self) -> &[CatalogEntry] {
        &self.catalog.company
    }

    pub fn file_types(&self) -> &[CatalogEntry] {
        &self.catalog.file_type
    }

    pub fn data_types(&self) -> &[CatalogEntry] {
        &self.catalog.data_type
    }

    pub fn file_sub_types(&self) -> &[CatalogEntry] {
        &self.catalog.file_sub_type
    }

    pub fn queue_names(&self) -> &[CatalogEntry] {
        &self.queue.queues
    }
}
