use std::path::PathBuf;

/// Errors that can occur while resolving, fetching or analysing plugins.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An add request named no plugins at all.
    #[error("No plugin specified. Please specify a plugin to add.")]
    EmptyRequest,

    /// A plugin declares preferences that have neither a default nor a value.
    #[error(
        "Variable(s) missing (use: --variable {}=value) for plugin '{plugin}'.",
        .variables.join("=value --variable ")
    )]
    MissingMandatoryVariables {
        plugin: String,
        variables: Vec<String>,
    },

    /// A semantic-version range expression could not be parsed.
    #[error("invalid version range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    /// A version string is not valid semver.
    #[error("invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    /// A plugin specifier could not be split into id and version.
    #[error("invalid plugin specifier '{0}'")]
    InvalidSpecifier(String),

    /// The registry lookup rejected.
    #[error("registry lookup failed for {plugins}: {reason}")]
    RegistryUnavailable { plugins: String, reason: String },

    /// Plugin metadata file is missing or malformed.
    #[error("failed to read plugin manifest at {path}: {message}")]
    PluginManifest { path: PathBuf, message: String },

    /// Platform install-state file is malformed.
    #[error("failed to read platform state at {path}: {message}")]
    PlatformState { path: PathBuf, message: String },

    /// Fetching a plugin source failed.
    #[error("failed to fetch plugin '{target}': {reason}")]
    Fetch { target: String, reason: String },

    /// Installing a fetched plugin into a platform failed.
    #[error("failed to install plugin '{plugin}' for platform '{platform}': {reason}")]
    Install {
        plugin: String,
        platform: String,
        reason: String,
    },

    /// JSON (de)serialisation failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading or writing project files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
