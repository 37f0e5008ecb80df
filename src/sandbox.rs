use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{app_err, error::AppError};

#[derive(Debug, Default, Clone)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

/// An isolated place where commands run one after another and share state.
pub trait Sandbox {
    async fn exec(&mut self, argv: &[String]) -> Result<ExecOutput, AppError>;

    async fn dispose(self) -> Result<(), AppError>;
}

pub trait Runtime {
    type Sandbox: Sandbox;

    async fn provision(&self, env: Vec<(String, String)>) -> Result<Self::Sandbox, AppError>;
}

/// A provisioned sandbox plus the stdout of the last command run in it.
pub struct Environment<S: Sandbox> {
    sandbox: S,
    cancel: CancellationToken,
    stdout: String,
}

impl<S: Sandbox> Environment<S> {
    pub fn new(sandbox: S, cancel: CancellationToken) -> Self {
        Self {
            sandbox,
            cancel,
            stdout: String::new(),
        }
    }

    /// Runs `argv` and returns its stdout. Non-zero exit codes are errors, and
    /// so is cancellation, which abandons the running command.
    pub async fn exec(&mut self, argv: &[&str]) -> Result<String, AppError> {
        let argv = argv.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let command = argv.join(" ");
        debug!("Running: {command}");

        let output = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return app_err!(Interrupted, "`{command}` was interrupted");
            }
            output = self.sandbox.exec(&argv) => output?,
        };
        debug!(exit_code = output.exit_code, "Finished: {command}");

        if output.exit_code != 0 {
            return app_err!(
                Process,
                "`{command}` exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            );
        }

        self.stdout = output.stdout;
        Ok(self.stdout.clone())
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub async fn dispose(self) -> Result<(), AppError> {
        self.sandbox.dispose().await
    }

    /// Disposes the sandbox and returns `result`. A dispose failure only
    /// surfaces when `result` itself is `Ok`.
    pub async fn finish<T>(self, result: Result<T, AppError>) -> Result<T, AppError> {
        match (result, self.dispose().await) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(dispose_err)) => {
                warn!("Error while disposing the environment: {dispose_err}");
                Err(e)
            }
        }
    }
}
