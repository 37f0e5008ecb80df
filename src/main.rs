use std::{io::Write, process::ExitCode};

use anyhow::{anyhow, Context};
use clap::Parser;
use cli::{CliArgs, Commands, RuntimeKind};
use error::AppError;
use local::LocalRuntime;
use preview::{preview_deploy, preview_destroy, preview_endpoints, set_context};
use runner::{DockerConfig, DockerRuntime};
use sandbox::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod endpoints;
mod error;
#[cfg(test)]
mod fake_docker;
mod local;
mod model;
mod preview;
mod runner;
mod sandbox;
mod utils;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }

    let args = CliArgs::parse();
    debug!("Runtime: {:?}", args.runtime);

    // Ctrl-C stops the running command, the environment is still cleaned up
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cleaning up...");
                cancel.cancel();
            }
        });
    }

    let result = dispatch(&args, &cancel).await;
    ExitCode::from(report(result, &mut std::io::stdout()))
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("info").context("Can't build the default log filter")?,
    };

    // stdout carries the command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// Writes the operation output, or logs the error. Returns the exit status.
fn report(result: Result<String, AppError>, out: &mut impl Write) -> u8 {
    match result {
        Ok(output) => match write!(out, "{output}").and_then(|_| out.flush()) {
            Ok(()) => 0,
            Err(e) => {
                error!("Can't write the output: {e}");
                1
            }
        },
        Err(e) => {
            error!("{e}");
            1
        }
    }
}

async fn dispatch(args: &CliArgs, cancel: &CancellationToken) -> Result<String, AppError> {
    match args.runtime {
        RuntimeKind::Docker => {
            let runtime = DockerRuntime::connect(DockerConfig {
                image: args.image.clone(),
                pull: !args.no_pull,
            })?;
            run(&runtime, &args.command, cancel).await
        }
        RuntimeKind::Local => run(&LocalRuntime::new(), &args.command, cancel).await,
    }
}

async fn run<R: Runtime>(
    runtime: &R,
    command: &Commands,
    cancel: &CancellationToken,
) -> Result<String, AppError> {
    match command {
        Commands::SetContext(target) => {
            let env = set_context(runtime, &target.context, &target.token, cancel).await?;
            let output = env.stdout().to_string();
            env.finish(Ok(output)).await
        }
        Commands::PreviewDeploy(deploy) => {
            preview_deploy(
                runtime,
                &deploy.repo,
                &deploy.branch,
                &deploy.pr,
                &deploy.target.context,
                &deploy.target.token,
                cancel,
            )
            .await
        }
        Commands::PreviewEndpoints(preview) => {
            preview_endpoints(
                runtime,
                &preview.branch,
                &preview.target.context,
                &preview.target.token,
                cancel,
            )
            .await
        }
        Commands::PreviewDestroy(preview) => {
            preview_destroy(
                runtime,
                &preview.branch,
                &preview.target.context,
                &preview.target.token,
                cancel,
            )
            .await
        }
    }
}
