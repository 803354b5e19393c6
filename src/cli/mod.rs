//! Command-line interface definitions for the `archiver-ci` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Args, Parser};

/// Top-level CLI for the `archiver-ci` binary.
#[derive(Debug, Parser)]
#[command(
    name = "archiver-ci",
    about = "Run the ckanext-archiver tests with the framework matching the CKAN version",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Run the test suite.
    #[command(name = "test", about = "Run the test suite for the selected CKAN version")]
    Test(TestCommand),
    /// Prepare the Solr search index, then run the test suite.
    #[command(
        name = "ci",
        about = "Configure and restart the Jetty/Solr search index, then run the test suite"
    )]
    Ci(CiCommand),
    /// Print the test command without running it.
    #[command(name = "plan", about = "Print the test command that would run")]
    Plan(TestCommand),
}

/// Version selection shared by every subcommand.
#[derive(Debug, Args)]
pub(crate) struct VersionArgs {
    /// CKAN version under test: `master` or a dotted release such as `2.9`.
    #[arg(long, value_name = "VERSION", env = "CKANVERSION")]
    pub(crate) ckan_version: Option<String>,
}

/// Arguments for the `archiver-ci test` and `archiver-ci plan` subcommands.
#[derive(Debug, Args)]
pub(crate) struct TestCommand {
    #[command(flatten)]
    pub(crate) version: VersionArgs,
}

/// Arguments for the `archiver-ci ci` subcommand.
#[derive(Debug, Args)]
pub(crate) struct CiCommand {
    #[command(flatten)]
    pub(crate) version: VersionArgs,
    /// Java installation written to the Jetty defaults file.
    #[arg(long, value_name = "PATH", env = "JAVA_HOME")]
    pub(crate) java_home: Option<String>,
}
