use std::path::PathBuf;

use tokio::{fs, process::Command};
use tracing::debug;
use uuid::Uuid;

use crate::{
    app_err, app_error,
    error::AppError,
    sandbox::{ExecOutput, Runtime, Sandbox},
};

/// Runs commands on the host, with a private `OKTETO_HOME` per operation so
/// the activated context never leaks between runs.
#[derive(Debug, Clone)]
pub struct LocalRuntime {
    base_dir: PathBuf,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self {
            base_dir: std::env::temp_dir(),
        }
    }
}

impl Default for LocalRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime for LocalRuntime {
    type Sandbox = LocalSandbox;

    async fn provision(&self, mut env: Vec<(String, String)>) -> Result<LocalSandbox, AppError> {
        let home = self.base_dir.join(format!("okteto-preview-{}", Uuid::new_v4()));
        fs::create_dir_all(&home)
            .await
            .map_err(|e| app_error!(Process, "Can't create {home:?}: {e}"))?;
        debug!("Okteto home: {home:?}");

        env.push(("OKTETO_HOME".to_string(), home.to_string_lossy().into_owned()));
        Ok(LocalSandbox { home, env })
    }
}

pub struct LocalSandbox {
    home: PathBuf,
    env: Vec<(String, String)>,
}

impl Sandbox for LocalSandbox {
    async fn exec(&mut self, argv: &[String]) -> Result<ExecOutput, AppError> {
        let Some((program, args)) = argv.split_first() else {
            return app_err!(Input, "Empty command");
        };

        let output = Command::new(program)
            .args(args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.home)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| app_error!(Process, "Can't start {program}: {e}"))?;

        // killed by a signal
        let exit_code = output.status.code().map(i64::from).unwrap_or(-1);

        Ok(ExecOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn dispose(self) -> Result<(), AppError> {
        fs::remove_dir_all(&self.home)
            .await
            .map_err(|e| app_error!(Process, "Can't remove {:?}: {e}", self.home))
    }
}
