//! Layered configuration loading for `archiver-ci`.

use std::env;
use std::sync::PoisonError;

use archiver_ci::test_support::{ENV_LOCK, EnvGuard};
use archiver_ci::{InvokerConfig, SegmentPolicy};
use rstest::rstest;

const PREFIX: &str = "ARCHIVER_CI_";

/// Replaces `key` outside any [`EnvGuard`] so it looks like ambient CI
/// state, returning the value it held before.
fn swap_ambient(key: &str, value: Option<&str>) -> Option<String> {
    let _lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = env::var(key).ok();
    // SAFETY: Environment mutation is serialised by `ENV_LOCK`, preventing races.
    unsafe {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
    previous
}

#[rstest]
fn environment_overrides_defaults() {
    let _guard = EnvGuard::isolated(
        PREFIX,
        &[
            ("ARCHIVER_CI_PYTEST_BIN", "/opt/venv/bin/pytest"),
            ("ARCHIVER_CI_VERSION_SEGMENT", "second"),
            ("ARCHIVER_CI_JETTY_SERVICE", "jetty9"),
        ],
    );

    let config = InvokerConfig::load_without_cli_args().expect("config should load");

    assert_eq!(config.pytest_bin, "/opt/venv/bin/pytest");
    assert_eq!(config.jetty_service, "jetty9");
    assert_eq!(config.segment_policy(), Ok(SegmentPolicy::Second));
    assert_eq!(config.nosetests_bin, "nosetests");
    assert_eq!(config.jetty_port, 8983);
}

#[rstest]
fn defaults_match_ci_literals() {
    let _guard = EnvGuard::isolated(PREFIX, &[]);

    let config = InvokerConfig::load_without_cli_args().expect("config should load");

    assert_eq!(config, InvokerConfig::default());
    assert_eq!(config.privilege(), Some("sudo"));
    assert!(config.validate_setup().is_ok());
}

#[rstest]
fn ambient_settings_are_hidden_then_restored() {
    let key = "ARCHIVER_CI_LEGACY_INI";
    swap_ambient(key, Some("polluted.ini"));

    {
        let _guard = EnvGuard::isolated(PREFIX, &[]);
        assert_eq!(env::var_os(key), None);
        let config = InvokerConfig::load_without_cli_args().expect("config should load");
        assert_eq!(config.legacy_ini, "test-core.ini");
    }

    assert_eq!(swap_ambient(key, None).as_deref(), Some("polluted.ini"));
}
