use bollard::container::LogOutput;
use futures_util::{Stream, StreamExt};
use tracing::{trace, warn};

#[derive(Debug, Default)]
pub struct CapturedOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CapturedOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    fn push(&mut self, log: LogOutput) {
        match log {
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                self.stdout.extend_from_slice(&message)
            }
            LogOutput::StdErr { message } => {
                trace!("{}", String::from_utf8_lossy(&message).trim_end());
                self.stderr.extend_from_slice(&message)
            }
            LogOutput::StdIn { .. } => {}
        }
    }
}

/// Reads an attached output stream until it ends, keeping stdout and stderr apart.
pub async fn drain_output<S, E>(mut output: S) -> CapturedOutput
where
    S: Stream<Item = Result<LogOutput, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut captured = CapturedOutput::default();
    while let Some(log) = output.next().await {
        match log {
            Ok(log) => captured.push(log),
            Err(err) => {
                warn!("Error while reading command output: {}", err);
            }
        }
    }
    captured
}
