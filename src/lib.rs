//! Core library for `archiver-ci`, the ckanext-archiver test invoker.
//!
//! The CKAN version under test decides which test framework runs: releases
//! from 2.9 (and the `master` development track) use `pytest`, older ones use
//! `nosetests` with the Pylons adapter. In CI the Jetty-hosted Solr index can
//! be prepared first. The test framework's exit code is passed through.

pub mod config;
pub mod invoke;
pub mod plan;
pub mod runner;
pub mod setup;
pub mod telemetry;
pub mod test_support;
pub mod version;

pub use config::{ConfigError, InvocationInputs, InvokerConfig};
pub use invoke::{InvokeError, TestInvoker, Variant};
pub use plan::TestPlan;
pub use runner::{
    CommandOutput, CommandRunner, ProcessCommandRunner, RunnerError, StreamingCommandRunner,
};
pub use setup::{SearchIndexSetup, SetupError, SetupStep};
pub use version::{Classification, SegmentPolicy, Track, VersionError};
