//! Config module - contingency bot configuration (contingency.toml).
//!
//! The config file holds everything the scripts used to hard-code:
//! - OAuth client secret, token cache and scopes
//! - Drive identifiers for download/upload
//! - Transform input/output and column layout
//! - Lookup column names

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full Drive scope; download needs read access to files this app did not create.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Column masked by the transform.
pub const PRODUCT_NUMBER_COLUMN: &str = "NRO_PRODUCTO";
/// Column the transform sorts by and lookup searches on.
pub const ID_COLUMN: &str = "NRO_IDENTIFICACION";
pub const HOLDER_NAME_COLUMN: &str = "NOMBRE_TITULAR";
pub const COLLECTOR_COLUMN: &str = "NOMBRE_RECUPERADOR_JURIDICO";

/// Columns kept by the transform, in output order.
pub const DEFAULT_COLUMNS: [&str; 10] = [
    PRODUCT_NUMBER_COLUMN,
    HOLDER_NAME_COLUMN,
    ID_COLUMN,
    COLLECTOR_COLUMN,
    "CANT_DIAS_MORA_ACTUAL",
    "MONTO_PAGO_FACTURACION",
    "MONTO_PAGO_MINIMO_ACTUAL",
    "MONTO_MORA_PESOS",
    "MONTO_TOTAL_CLIENTE",
    "FECHA_PAGO_ACTUAL",
];

/// OAuth settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Client secret JSON downloaded from the cloud console
    pub client_secret_path: PathBuf,
    /// Where the access/refresh token pair is cached
    pub token_cache_path: PathBuf,
    /// Requested OAuth scopes
    pub scopes: Vec<String>,
    /// Loopback port for the OAuth redirect (0 = any free port)
    pub redirect_port: u16,
    /// Open the system browser for the consent screen
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_secret_path: default_config_dir().join("client_secret.json"),
            token_cache_path: default_config_dir().join("token.json"),
            scopes: vec![DRIVE_SCOPE.to_string()],
            redirect_port: 0,
            open_browser: true,
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub file_id: Option<String>,
    /// File or directory; the remote name is used when absent
    pub destination: Option<PathBuf>,
    /// Bytes copied between progress reports
    pub chunk_size: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            file_id: None,
            destination: None,
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    1024 * 1024
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UploadConfig {
    pub local_path: Option<PathBuf>,
    /// Name on Drive (defaults to the local file name)
    pub remote_name: Option<String>,
    pub parent_folder_id: Option<String>,
    pub shared_drive_id: Option<String>,
    /// Existing file to overwrite
    pub file_id: Option<String>,
}

/// Transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub input: PathBuf,
    /// `.csv` writes CSV, anything else XLSX
    pub output: PathBuf,
    pub delimiter: char,
    pub columns: Vec<String>,
    pub mask_column: String,
    pub sort_column: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("MUESTRA_EVOLUCION.csv"),
            output: PathBuf::from("Muestra para Bot Contingencia.xlsx"),
            delimiter: ',',
            columns: DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect(),
            mask_column: PRODUCT_NUMBER_COLUMN.to_string(),
            sort_column: ID_COLUMN.to_string(),
        }
    }
}

/// Lookup settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Sorted CSV extract to search
    pub file: PathBuf,
    pub id_column: String,
    pub name_column: String,
    pub collector_column: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("Muestra para Bot Contingencia.csv"),
            id_column: ID_COLUMN.to_string(),
            name_column: HOLDER_NAME_COLUMN.to_string(),
            collector_column: COLLECTOR_COLUMN.to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Config version (for future migrations)
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub lookup: LookupConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            auth: AuthConfig::default(),
            download: DownloadConfig::default(),
            upload: UploadConfig::default(),
            transform: TransformConfig::default(),
            lookup: LookupConfig::default(),
        }
    }
}

/// Default config directory (~/.config/contingency/)
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("contingency"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("contingency.toml")
}

impl Config {
    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from file, falling back to defaults when the file is missing
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content =
            toml::to_string_pretty(self).with_context(|| "Cannot serialize config to TOML")?;

        std::fs::write(path, content)
            .with_context(|| format!("Cannot write config file: {}", path.display()))?;

        Ok(())
    }

    /// Check values that do not depend on which command runs.
    pub fn validate(&self) -> Result<()> {
        if self.auth.scopes.is_empty() {
            bail!("auth.scopes must not be empty");
        }
        if self.download.chunk_size == 0 {
            bail!("download.chunk_size must be greater than zero");
        }
        for (field, value) in [
            ("download.file_id", &self.download.file_id),
            ("upload.parent_folder_id", &self.upload.parent_folder_id),
            ("upload.shared_drive_id", &self.upload.shared_drive_id),
            ("upload.file_id", &self.upload.file_id),
        ] {
            if let Some(id) = value {
                validate_drive_id(field, id)?;
            }
        }

        let transform = &self.transform;
        if !transform.delimiter.is_ascii() {
            bail!("transform.delimiter must be a single ASCII character");
        }
        if transform.columns.is_empty() {
            bail!("transform.columns must not be empty");
        }
        for required in [&transform.mask_column, &transform.sort_column] {
            if !transform.columns.contains(required) {
                bail!("transform.columns must include '{}'", required);
            }
        }

        Ok(())
    }
}

/// Drive ids are opaque but never empty and never contain whitespace.
pub fn validate_drive_id(field: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("{} must not be empty", field);
    }
    if id.chars().any(char::is_whitespace) {
        bail!("{} contains whitespace: '{}'", field, id);
    }
    Ok(())
}
