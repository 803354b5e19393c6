//! Fake test frameworks and privilege wrapper for CLI tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Shared helpers live under `tests/common/` and are pulled in via:
//!
//! ```rust
//! #[path = "common/fake_tools.rs"]
//! mod fake_tools;
//! ```

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Scripts are written and then executed; serialising tests avoids
/// `ETXTBSY` when another thread forks while a script is still open.
static SCRIPT_LOCK: Mutex<()> = Mutex::new(());

pub struct FakeTools {
    pub dir: TempDir,
    _guard: MutexGuard<'static, ()>,
}

impl FakeTools {
    pub fn new() -> Self {
        let guard = SCRIPT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = TempDir::new().expect("create temp dir");
        Self { dir, _guard: guard }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn log_path(&self) -> PathBuf {
        self.path("calls.log")
    }

    /// Writes an executable that logs its name and arguments, then exits
    /// with `code`.
    pub fn framework(&self, name: &str, code: i32) -> PathBuf {
        let body = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{log}'\nexit {code}\n",
            log = self.log_path().display()
        );
        self.script(name, &body)
    }

    /// Writes an executable that logs its name and arguments, then kills
    /// itself with `SIGKILL`.
    pub fn killed_framework(&self, name: &str) -> PathBuf {
        let body = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{log}'\nkill -9 $$\n",
            log = self.log_path().display()
        );
        self.script(name, &body)
    }

    /// Writes a `sudo` stand-in that logs calls, drains stdin for `tee`, and
    /// fails the subcommand named `failing` with status 1.
    pub fn privilege(&self, failing: Option<&str>) -> PathBuf {
        let failing = failing.unwrap_or("none");
        let body = format!(
            concat!(
                "#!/bin/sh\n",
                "echo \"sudo $*\" >> '{log}'\n",
                "if [ \"$1\" = \"tee\" ]; then cat > /dev/null; fi\n",
                "if [ \"$1\" = \"{failing}\" ]; then echo \"$1: refused\" 1>&2; exit 1; fi\n",
                "exit 0\n"
            ),
            log = self.log_path().display(),
            failing = failing
        );
        self.script("fake-sudo", &body)
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    /// Builds a command isolated from the caller's CKAN and config settings.
    pub fn command(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("archiver-ci");
        cmd.current_dir(self.dir.path());
        for key in ["CKANVERSION", "JAVA_HOME", "ARCHIVER_CI_CONFIG_PATH", "ARCHIVER_CI_LOG"] {
            cmd.env_remove(key);
        }
        cmd
    }

    fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path(name);
        write_executable(&path, body);
        path
    }
}

fn write_executable(path: &Path, body: &str) {
    fs::write(path, body).unwrap_or_else(|err| panic!("write {}: {err}", path.display()));
    let mut perms = fs::metadata(path)
        .unwrap_or_else(|err| panic!("stat {}: {err}", path.display()))
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .unwrap_or_else(|err| panic!("chmod {}: {err}", path.display()));
}
