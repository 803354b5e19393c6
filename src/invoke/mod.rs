//! Orchestrates a single test invocation.
//!
//! The invoker classifies the CKAN version, optionally prepares the search
//! index, runs the selected test framework and hands back its exit code. A
//! failing test run is a result, not an error: only problems that stop the
//! tests from running surface as [`InvokeError`].

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, InvocationInputs, InvokerConfig};
use crate::plan::TestPlan;
use crate::runner::{CommandRunner, RunnerError};
use crate::setup::{SearchIndexSetup, SetupError};
use crate::version::{VersionError, classify};

/// Whether the search index is prepared before testing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Variant {
    /// Run the tests only.
    TestsOnly,
    /// Configure and restart Jetty/Solr, then run the tests.
    WithSearchIndexSetup,
}

/// Errors that prevent the test framework from reporting a result.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The version signal is missing or malformed.
    #[error(transparent)]
    Version(#[from] VersionError),
    /// Configuration is incomplete.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A setup step failed; later steps and the tests were skipped.
    #[error("search index setup failed: {0}")]
    Setup(#[from] SetupError),
    /// The test framework could not be started.
    #[error("test runner failed to start: {0}")]
    Launch(#[source] RunnerError),
    /// The test framework reported neither an exit code nor a terminating
    /// signal.
    #[error("{program} terminated without an exit status")]
    MissingExitCode {
        /// Test framework executable.
        program: String,
    },
}

/// Runs the version-gated test flow with the provided runner.
#[derive(Clone, Debug)]
pub struct TestInvoker<R: CommandRunner> {
    config: InvokerConfig,
    runner: R,
}

impl<R: CommandRunner> TestInvoker<R> {
    /// Creates a new invoker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration validation fails.
    pub fn new(config: InvokerConfig, runner: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Classifies the version signal and builds the test command without
    /// running anything.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError::Version`] for a missing or malformed signal.
    pub fn plan(&self, inputs: &InvocationInputs) -> Result<TestPlan, InvokeError> {
        let policy = self.config.segment_policy()?;
        let classification = classify(inputs.version_signal(), policy)?;
        info!(
            signal = inputs.version_signal().unwrap_or_default(),
            minor = classification.minor,
            track = %classification.track,
            "selected test track"
        );
        Ok(TestPlan::for_track(classification.track, &self.config))
    }

    /// Runs the flow for `variant` and returns the test framework's exit code.
    ///
    /// A framework killed by a signal yields 128 plus the signal number, as a
    /// POSIX shell would report it.
    ///
    /// Input and configuration problems are reported before any setup step
    /// runs. Setup steps that completed before a failure are not undone.
    ///
    /// # Errors
    ///
    /// Returns [`InvokeError`] when the version signal is unusable, a setup
    /// step fails, or the test framework cannot produce an exit code.
    pub fn execute(
        &self,
        inputs: &InvocationInputs,
        variant: Variant,
    ) -> Result<i32, InvokeError> {
        if variant == Variant::WithSearchIndexSetup {
            self.config.validate_setup()?;
        }
        let plan = self.plan(inputs)?;

        if variant == Variant::WithSearchIndexSetup {
            SearchIndexSetup::from_config(&self.config)
                .apply(&self.runner, &inputs.toolchain_home)?;
        }

        info!(program = %plan.program, "launching test run");
        debug!(command = %plan.command_line(), "test command");
        let output = self
            .runner
            .run_inherited(&plan.program, &plan.args)
            .map_err(InvokeError::Launch)?;
        if let Some(signal) = output.signal {
            warn!(signal, "test run was killed by a signal");
        }
        let code = output.exit_code().ok_or_else(|| InvokeError::MissingExitCode {
            program: plan.program.clone(),
        })?;
        if code != 0 {
            warn!(code, "test run finished with a non-zero exit code");
        }
        Ok(code)
    }
}
