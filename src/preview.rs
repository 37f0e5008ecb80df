use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    endpoints::extract_urls,
    error::AppError,
    model::{ApiToken, PreviewName},
    sandbox::{Environment, Runtime, Sandbox},
};

const OKTETO: &str = "okteto";

/// Provisions a fresh environment authenticated with `token` and activates
/// `context` in it. Commands run in the environment stop early once `cancel`
/// fires.
#[tracing::instrument(skip(runtime, token, cancel))]
pub async fn set_context<R: Runtime>(
    runtime: &R,
    context: &str,
    token: &ApiToken,
    cancel: &CancellationToken,
) -> Result<Environment<R::Sandbox>, AppError> {
    let sandbox = runtime
        .provision(vec![(
            "OKTETO_TOKEN".to_string(),
            token.expose().to_string(),
        )])
        .await?;

    let mut env = Environment::new(sandbox, cancel.clone());
    let result = env.exec(&[OKTETO, "ctx", "use", context]).await;
    match result {
        Ok(_) => {
            info!("Using context {context}");
            Ok(env)
        }
        Err(e) => env.finish(Err(e)).await,
    }
}

/// Deploys the preview for `branch`, waits for it and returns its endpoint
/// URLs, one per line.
#[tracing::instrument(skip(runtime, token, cancel))]
pub async fn preview_deploy<R: Runtime>(
    runtime: &R,
    repo: &str,
    branch: &str,
    pr: &str,
    context: &str,
    token: &ApiToken,
    cancel: &CancellationToken,
) -> Result<String, AppError> {
    let name = PreviewName::from_branch(branch)?;
    let mut env = set_context(runtime, context, token, cancel).await?;
    let result = deploy(&mut env, repo, branch, pr, &name).await;
    env.finish(result).await
}

/// Endpoint URLs of an already deployed preview.
#[tracing::instrument(skip(runtime, token, cancel))]
pub async fn preview_endpoints<R: Runtime>(
    runtime: &R,
    branch: &str,
    context: &str,
    token: &ApiToken,
    cancel: &CancellationToken,
) -> Result<String, AppError> {
    let name = PreviewName::from_branch(branch)?;
    let mut env = set_context(runtime, context, token, cancel).await?;
    let result = list_endpoints(&mut env, &name).await;
    env.finish(result).await
}

/// Starts destroying the preview for `branch` without waiting for it to go
/// away. Returns the CLI output as is.
#[tracing::instrument(skip(runtime, token, cancel))]
pub async fn preview_destroy<R: Runtime>(
    runtime: &R,
    branch: &str,
    context: &str,
    token: &ApiToken,
    cancel: &CancellationToken,
) -> Result<String, AppError> {
    let name = PreviewName::from_branch(branch)?;
    let mut env = set_context(runtime, context, token, cancel).await?;
    let result = env
        .exec(&[OKTETO, "preview", "destroy", name.as_str(), "--wait=false"])
        .await;
    if result.is_ok() {
        info!("Preview {name} scheduled for destruction");
    }
    env.finish(result).await
}

async fn deploy<S: Sandbox>(
    env: &mut Environment<S>,
    repo: &str,
    branch: &str,
    pr: &str,
    name: &PreviewName,
) -> Result<String, AppError> {
    env.exec(&[
        OKTETO,
        "preview",
        "deploy",
        "--branch",
        branch,
        "--sourceUrl",
        pr,
        "--repository",
        repo,
        "--wait",
        name.as_str(),
    ])
    .await?;
    info!("Preview {name} deployed");

    list_endpoints(env, name).await
}

async fn list_endpoints<S: Sandbox>(
    env: &mut Environment<S>,
    name: &PreviewName,
) -> Result<String, AppError> {
    let raw = env
        .exec(&[OKTETO, "preview", "endpoints", name.as_str(), "--output=json"])
        .await?;
    extract_urls(&raw)
}
