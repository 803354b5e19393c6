//! Search-index preparation run before the tests in CI.
//!
//! Jetty serves the Solr core CKAN indexes into. Setup writes Jetty's service
//! defaults, installs the CKAN Solr schema and restarts the service, in that
//! order. The first failing step aborts the rest; completed steps are left in
//! place.

use std::ffi::OsString;
use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::InvokerConfig;
use crate::runner::{CommandOutput, CommandRunner, RunnerError};

/// Individual setup actions, in execution order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SetupStep {
    /// Write the Jetty service defaults file.
    WriteDefaults,
    /// Copy the Solr schema into place.
    CopySchema,
    /// Restart the Jetty service.
    RestartService,
}

impl fmt::Display for SetupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteDefaults => f.write_str("write Jetty defaults"),
            Self::CopySchema => f.write_str("copy Solr schema"),
            Self::RestartService => f.write_str("restart Jetty"),
        }
    }
}

/// Errors raised by a setup step.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SetupError {
    /// The step's command ran and exited unsuccessfully.
    #[error("{step} failed: {program} exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Step that failed.
        step: SetupStep,
        /// Program that was run.
        program: String,
        /// Exit status as reported by the OS.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the process.
        stderr: String,
    },
    /// The step's command could not be run.
    #[error("{step} failed: {source}")]
    Runner {
        /// Step that failed.
        step: SetupStep,
        /// Underlying runner error.
        #[source]
        source: RunnerError,
    },
    /// An in-process file operation failed.
    #[error("{step} failed for {path}: {message}")]
    Filesystem {
        /// Step that failed.
        step: SetupStep,
        /// Path being written or read.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
}

impl SetupError {
    /// Returns the step that failed.
    #[must_use]
    pub const fn step(&self) -> SetupStep {
        match self {
            Self::CommandFailure { step, .. }
            | Self::Runner { step, .. }
            | Self::Filesystem { step, .. } => *step,
        }
    }
}

/// Jetty/Solr setup parameters.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchIndexSetup {
    defaults_path: Utf8PathBuf,
    host: String,
    port: u16,
    schema_source: Utf8PathBuf,
    schema_target: Utf8PathBuf,
    service: String,
    privilege: Option<String>,
}

impl SearchIndexSetup {
    /// Builds setup parameters from configuration.
    #[must_use]
    pub fn from_config(config: &InvokerConfig) -> Self {
        Self {
            defaults_path: Utf8PathBuf::from(&config.jetty_defaults_path),
            host: config.jetty_host.clone(),
            port: config.jetty_port,
            schema_source: Utf8PathBuf::from(&config.solr_schema_source),
            schema_target: Utf8PathBuf::from(&config.solr_schema_target),
            service: config.jetty_service.clone(),
            privilege: config.privilege().map(str::to_owned),
        }
    }

    /// Renders the Jetty defaults file for `toolchain_home`.
    ///
    /// ```
    /// use archiver_ci::{InvokerConfig, SearchIndexSetup};
    ///
    /// let setup = SearchIndexSetup::from_config(&InvokerConfig::default());
    /// assert_eq!(
    ///     setup.render_defaults("/usr/lib/jvm/java-8"),
    ///     "NO_START=0\nJETTY_HOST=127.0.0.1\nJETTY_PORT=8983\nJAVA_HOME=/usr/lib/jvm/java-8\n",
    /// );
    /// ```
    #[must_use]
    pub fn render_defaults(&self, toolchain_home: &str) -> String {
        format!(
            "NO_START=0\nJETTY_HOST={}\nJETTY_PORT={}\nJAVA_HOME={toolchain_home}\n",
            self.host, self.port
        )
    }

    /// Runs every setup step in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`SetupError`] of the first step that fails.
    pub fn apply<R: CommandRunner>(
        &self,
        runner: &R,
        toolchain_home: &str,
    ) -> Result<(), SetupError> {
        self.write_defaults(runner, toolchain_home)?;
        self.copy_schema(runner)?;
        self.restart_service(runner)
    }

    fn write_defaults<R: CommandRunner>(
        &self,
        runner: &R,
        toolchain_home: &str,
    ) -> Result<(), SetupError> {
        let step = SetupStep::WriteDefaults;
        let contents = self.render_defaults(toolchain_home);
        info!(path = %self.defaults_path, "writing Jetty defaults");

        match self.privilege.as_deref() {
            Some(wrapper) => {
                let args = [OsString::from("tee"), OsString::from(&self.defaults_path)];
                let output = runner
                    .run_with_input(wrapper, &args, &contents)
                    .map_err(|source| SetupError::Runner { step, source })?;
                check(step, wrapper, &output)
            }
            None => write_file(&self.defaults_path, contents.as_bytes()).map_err(|err| {
                SetupError::Filesystem {
                    step,
                    path: self.defaults_path.clone(),
                    message: err.to_string(),
                }
            }),
        }
    }

    fn copy_schema<R: CommandRunner>(&self, runner: &R) -> Result<(), SetupError> {
        let step = SetupStep::CopySchema;
        info!(
            source = %self.schema_source,
            target = %self.schema_target,
            "installing Solr schema"
        );

        match self.privilege.as_deref() {
            Some(wrapper) => {
                let args = [
                    OsString::from("cp"),
                    OsString::from(&self.schema_source),
                    OsString::from(&self.schema_target),
                ];
                run_step(runner, step, wrapper, &args)
            }
            None => copy_file(&self.schema_source, &self.schema_target).map_err(|err| {
                SetupError::Filesystem {
                    step,
                    path: self.schema_source.clone(),
                    message: err.to_string(),
                }
            }),
        }
    }

    fn restart_service<R: CommandRunner>(&self, runner: &R) -> Result<(), SetupError> {
        let step = SetupStep::RestartService;
        info!(service = %self.service, "restarting search index service");

        let mut args = vec![
            OsString::from(&self.service),
            OsString::from("restart"),
        ];
        match self.privilege.as_deref() {
            Some(wrapper) => {
                args.insert(0, OsString::from("service"));
                run_step(runner, step, wrapper, &args)
            }
            None => run_step(runner, step, "service", &args),
        }
    }
}

fn run_step<R: CommandRunner>(
    runner: &R,
    step: SetupStep,
    program: &str,
    args: &[OsString],
) -> Result<(), SetupError> {
    debug!(%step, program, ?args, "running setup command");
    let output = runner
        .run(program, args)
        .map_err(|source| SetupError::Runner { step, source })?;
    check(step, program, &output)
}

fn check(step: SetupStep, program: &str, output: &CommandOutput) -> Result<(), SetupError> {
    if output.is_success() {
        return Ok(());
    }
    Err(SetupError::CommandFailure {
        step,
        program: program.to_owned(),
        status: output.code,
        status_text: output.status_text(),
        stderr: output.stderr.clone(),
    })
}

fn open_parent(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path is missing a file name")
    })?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

fn write_file(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let (dir, file_name) = open_parent(path)?;
    dir.write(file_name, contents)
}

fn copy_file(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    let (source_dir, source_name) = open_parent(source)?;
    let (target_dir, target_name) = open_parent(target)?;
    source_dir.copy(source_name, &target_dir, target_name)?;
    Ok(())
}
