//! Test command construction for each track.

use std::ffi::OsString;

use shell_escape::unix::escape;

use crate::config::InvokerConfig;
use crate::version::Track;

/// A fully resolved test framework invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestPlan {
    /// Track the plan was built for.
    pub track: Track,
    /// Test framework executable.
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<OsString>,
}

impl TestPlan {
    /// Builds the invocation for `track` from `config`.
    #[must_use]
    pub fn for_track(track: Track, config: &InvokerConfig) -> Self {
        match track {
            Track::Modern => Self::modern(config),
            Track::Legacy => Self::legacy(config),
        }
    }

    fn modern(config: &InvokerConfig) -> Self {
        Self {
            track: Track::Modern,
            program: config.pytest_bin.clone(),
            args: vec![
                OsString::from(format!("--ckan-ini={}", config.modern_ini)),
                OsString::from(format!("--cov={}", config.coverage_target)),
                OsString::from(&config.modern_test_dir),
            ],
        }
    }

    fn legacy(config: &InvokerConfig) -> Self {
        Self {
            track: Track::Legacy,
            program: config.nosetests_bin.clone(),
            args: vec![
                OsString::from("--nologcapture"),
                OsString::from(format!("--with-pylons={}", config.legacy_ini)),
                OsString::from("--with-coverage"),
                OsString::from(format!("--cover-package={}", config.coverage_target)),
                OsString::from("--cover-inclusive"),
                OsString::from("--cover-erase"),
                OsString::from("--cover-tests"),
                OsString::from(&config.legacy_test_dir),
            ],
        }
    }

    /// Renders the invocation as a shell-escaped command line.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut rendered = escape(self.program.as_str().into()).into_owned();
        for arg in &self.args {
            rendered.push(' ');
            rendered.push_str(escape(arg.to_string_lossy()).as_ref());
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn config() -> InvokerConfig {
        InvokerConfig::default()
    }

    #[rstest]
    fn modern_plan_runs_pytest_against_ckan_ini(config: InvokerConfig) {
        let plan = TestPlan::for_track(Track::Modern, &config);
        assert_eq!(
            plan.command_line(),
            "pytest --ckan-ini=test.ini --cov=ckanext.archiver ckanext/archiver/tests"
        );
    }

    #[rstest]
    fn legacy_plan_runs_nose_with_pylons_adapter(config: InvokerConfig) {
        let plan = TestPlan::for_track(Track::Legacy, &config);
        assert_eq!(plan.program, "nosetests");
        assert_eq!(
            plan.command_line(),
            concat!(
                "nosetests --nologcapture --with-pylons=test-core.ini --with-coverage ",
                "--cover-package=ckanext.archiver --cover-inclusive --cover-erase ",
                "--cover-tests ckanext/archiver/tests/nose"
            )
        );
    }

    #[rstest]
    fn plans_follow_configured_paths(mut config: InvokerConfig) {
        config.pytest_bin = String::from("/opt/venv/bin/pytest");
        config.modern_ini = String::from("subdir/test.ini");
        let plan = TestPlan::for_track(Track::Modern, &config);
        assert_eq!(plan.program, "/opt/venv/bin/pytest");
        assert_eq!(
            plan.args.first(),
            Some(&OsString::from("--ckan-ini=subdir/test.ini"))
        );
    }

    #[rstest]
    fn command_line_quotes_awkward_arguments(mut config: InvokerConfig) {
        config.modern_test_dir = String::from("tests with space");
        let plan = TestPlan::for_track(Track::Modern, &config);
        assert!(
            plan.command_line().ends_with(" 'tests with space'"),
            "rendered: {}",
            plan.command_line()
        );
    }

    #[rstest]
    fn building_twice_is_identical(config: InvokerConfig) {
        assert_eq!(
            TestPlan::for_track(Track::Legacy, &config),
            TestPlan::for_track(Track::Legacy, &config)
        );
    }
}
