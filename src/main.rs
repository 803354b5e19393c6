//! Binary entry point for the `archiver-ci` CLI.

use std::io::{self, Write};
use std::process;

use clap::Parser;
use thiserror::Error;

use archiver_ci::{
    ConfigError, InvocationInputs, InvokeError, InvokerConfig, ProcessCommandRunner,
    StreamingCommandRunner, TestInvoker, Variant, telemetry,
};

mod cli;

use cli::{Cli, VersionArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Invoke(#[from] InvokeError),
    #[error("failed to write plan: {0}")]
    Output(String),
}

fn main() {
    telemetry::init();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Test(command) => run_tests(command.version, None, Variant::TestsOnly),
        Cli::Ci(command) => run_tests(
            command.version,
            command.java_home,
            Variant::WithSearchIndexSetup,
        ),
        Cli::Plan(command) => {
            let config = InvokerConfig::load_without_cli_args()?;
            let inputs = InvocationInputs::new(command.version.ckan_version, None);
            write_plan(config, &inputs, io::stdout())?;
            Ok(0)
        }
    }
}

fn run_tests(
    version: VersionArgs,
    java_home: Option<String>,
    variant: Variant,
) -> Result<i32, CliError> {
    let config = InvokerConfig::load_without_cli_args()?;
    let inputs = InvocationInputs::new(version.ckan_version, java_home);
    let invoker = TestInvoker::new(config, StreamingCommandRunner)?;
    Ok(invoker.execute(&inputs, variant)?)
}

fn write_plan(
    config: InvokerConfig,
    inputs: &InvocationInputs,
    mut target: impl Write,
) -> Result<(), CliError> {
    let invoker = TestInvoker::new(config, ProcessCommandRunner)?;
    let plan = invoker.plan(inputs)?;
    writeln!(target, "{}", plan.command_line()).map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
