//! Configuration loading via `ortho-config`.
//!
//! Every field defaults to the literal used by the ckanext-archiver CI
//! scripts, so an empty environment reproduces them exactly. Overrides come
//! from `archiver-ci.toml` or `ARCHIVER_CI_*` environment variables.

use std::ffi::OsString;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::version::{SegmentPolicy, VersionError};

/// Default Solr schema location inside a sibling CKAN checkout.
pub const DEFAULT_SCHEMA_SOURCE: &str = "../ckan/ckan/config/solr/schema.xml";

/// Test runner, search-index and privilege settings.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "ARCHIVER_CI",
    discovery(
        app_name = "archiver-ci",
        env_var = "ARCHIVER_CI_CONFIG_PATH",
        config_file_name = "archiver-ci.toml",
        dotfile_name = ".archiver-ci.toml",
        project_file_name = "archiver-ci.toml"
    )
)]
pub struct InvokerConfig {
    /// Executable for the modern test framework.
    #[ortho_config(default = "pytest".to_owned())]
    pub pytest_bin: String,
    /// Executable for the legacy test framework.
    #[ortho_config(default = "nosetests".to_owned())]
    pub nosetests_bin: String,
    /// CKAN ini file passed to `pytest --ckan-ini`.
    #[ortho_config(default = "test.ini".to_owned())]
    pub modern_ini: String,
    /// Ini file handed to the Pylons adapter on the legacy track.
    #[ortho_config(default = "test-core.ini".to_owned())]
    pub legacy_ini: String,
    /// Package measured by coverage on both tracks.
    #[ortho_config(default = "ckanext.archiver".to_owned())]
    pub coverage_target: String,
    /// Test sources collected by `pytest`.
    #[ortho_config(default = "ckanext/archiver/tests".to_owned())]
    pub modern_test_dir: String,
    /// Test sources collected by `nosetests`.
    #[ortho_config(default = "ckanext/archiver/tests/nose".to_owned())]
    pub legacy_test_dir: String,
    /// Which dotted component of `CKANVERSION` is treated as the minor
    /// version: `last` or `second`.
    #[ortho_config(default = "last".to_owned())]
    pub version_segment: String,
    /// Wrapper for privileged setup commands. Empty runs setup unwrapped and
    /// writes files in-process.
    #[ortho_config(default = "sudo".to_owned())]
    pub privilege_command: String,
    /// Jetty service defaults file written during setup.
    #[ortho_config(default = "/etc/default/jetty8".to_owned())]
    pub jetty_defaults_path: String,
    /// Host Jetty binds to.
    #[ortho_config(default = "127.0.0.1".to_owned())]
    pub jetty_host: String,
    /// Port Jetty binds to.
    #[ortho_config(default = 8983)]
    pub jetty_port: u16,
    /// Schema copied into the Solr configuration.
    #[ortho_config(default = DEFAULT_SCHEMA_SOURCE.to_owned())]
    pub solr_schema_source: String,
    /// Destination of the copied schema.
    #[ortho_config(default = "/etc/solr/conf/schema.xml".to_owned())]
    pub solr_schema_target: String,
    /// Service restarted after the search index is configured.
    #[ortho_config(default = "jetty8".to_owned())]
    pub jetty_service: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            pytest_bin: String::from("pytest"),
            nosetests_bin: String::from("nosetests"),
            modern_ini: String::from("test.ini"),
            legacy_ini: String::from("test-core.ini"),
            coverage_target: String::from("ckanext.archiver"),
            modern_test_dir: String::from("ckanext/archiver/tests"),
            legacy_test_dir: String::from("ckanext/archiver/tests/nose"),
            version_segment: String::from("last"),
            privilege_command: String::from("sudo"),
            jetty_defaults_path: String::from("/etc/default/jetty8"),
            jetty_host: String::from("127.0.0.1"),
            jetty_port: 8983,
            solr_schema_source: String::from(DEFAULT_SCHEMA_SOURCE),
            solr_schema_target: String::from("/etc/solr/conf/schema.xml"),
            jetty_service: String::from("jetty8"),
        }
    }
}

impl InvokerConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to archiver-ci.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("archiver-ci")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Resolves the configured version segment policy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Policy`] for an unrecognised policy name.
    pub fn segment_policy(&self) -> Result<SegmentPolicy, ConfigError> {
        Ok(self.version_segment.parse::<SegmentPolicy>()?)
    }

    /// Returns the privilege wrapper, or `None` when setup runs unwrapped.
    #[must_use]
    pub fn privilege(&self) -> Option<&str> {
        let command = self.privilege_command.trim();
        (!command.is_empty()).then_some(command)
    }

    /// Checks the values every invocation needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::Policy`] for an unknown segment policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (
                &self.pytest_bin,
                FieldMetadata::new("pytest executable", "ARCHIVER_CI_PYTEST_BIN", "pytest_bin"),
            ),
            (
                &self.nosetests_bin,
                FieldMetadata::new(
                    "nosetests executable",
                    "ARCHIVER_CI_NOSETESTS_BIN",
                    "nosetests_bin",
                ),
            ),
            (
                &self.modern_ini,
                FieldMetadata::new("pytest ini file", "ARCHIVER_CI_MODERN_INI", "modern_ini"),
            ),
            (
                &self.legacy_ini,
                FieldMetadata::new("nose ini file", "ARCHIVER_CI_LEGACY_INI", "legacy_ini"),
            ),
            (
                &self.coverage_target,
                FieldMetadata::new(
                    "coverage package",
                    "ARCHIVER_CI_COVERAGE_TARGET",
                    "coverage_target",
                ),
            ),
            (
                &self.modern_test_dir,
                FieldMetadata::new(
                    "pytest test directory",
                    "ARCHIVER_CI_MODERN_TEST_DIR",
                    "modern_test_dir",
                ),
            ),
            (
                &self.legacy_test_dir,
                FieldMetadata::new(
                    "nose test directory",
                    "ARCHIVER_CI_LEGACY_TEST_DIR",
                    "legacy_test_dir",
                ),
            ),
        ];
        for (value, metadata) in &required {
            Self::require_field(value, metadata)?;
        }
        self.segment_policy()?;
        Ok(())
    }

    /// Checks the values the search-index setup needs on top of
    /// [`InvokerConfig::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a setup field is empty and
    /// [`ConfigError::InvalidPort`] when the port is zero.
    pub fn validate_setup(&self) -> Result<(), ConfigError> {
        self.validate()?;
        let required = [
            (
                &self.jetty_defaults_path,
                FieldMetadata::new(
                    "Jetty defaults file",
                    "ARCHIVER_CI_JETTY_DEFAULTS_PATH",
                    "jetty_defaults_path",
                ),
            ),
            (
                &self.jetty_host,
                FieldMetadata::new("Jetty host", "ARCHIVER_CI_JETTY_HOST", "jetty_host"),
            ),
            (
                &self.solr_schema_source,
                FieldMetadata::new(
                    "Solr schema source",
                    "ARCHIVER_CI_SOLR_SCHEMA_SOURCE",
                    "solr_schema_source",
                ),
            ),
            (
                &self.solr_schema_target,
                FieldMetadata::new(
                    "Solr schema target",
                    "ARCHIVER_CI_SOLR_SCHEMA_TARGET",
                    "solr_schema_target",
                ),
            ),
            (
                &self.jetty_service,
                FieldMetadata::new("Jetty service", "ARCHIVER_CI_JETTY_SERVICE", "jetty_service"),
            ),
        ];
        for (value, metadata) in &required {
            Self::require_field(value, metadata)?;
        }
        if self.jetty_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        Ok(())
    }
}

/// Values taken from the process environment once at startup.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InvocationInputs {
    /// Raw `CKANVERSION` value, if any.
    pub version_signal: Option<String>,
    /// `JAVA_HOME` value embedded in the Jetty defaults; may be empty.
    pub toolchain_home: String,
}

impl InvocationInputs {
    /// Builds inputs from already-resolved values.
    #[must_use]
    pub fn new(version_signal: Option<String>, toolchain_home: Option<String>) -> Self {
        Self {
            version_signal,
            toolchain_home: toolchain_home.unwrap_or_default(),
        }
    }

    /// Returns the version signal as a borrowed string.
    #[must_use]
    pub fn version_signal(&self) -> Option<&str> {
        self.version_signal.as_deref()
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
    /// The version segment policy name is not recognised.
    #[error(transparent)]
    Policy(#[from] VersionError),
    /// The Jetty port is zero.
    #[error("jetty_port must be greater than zero")]
    InvalidPort,
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
