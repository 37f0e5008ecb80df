use std::time::Duration;

use bollard::{
    container::{self, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions},
    exec::{CreateExecOptions, StartExecResults},
    image::CreateImageOptions,
    Docker,
};
use futures_util::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    app_err, app_error,
    error::AppError,
    sandbox::{ExecOutput, Runtime, Sandbox},
    utils::drain_output,
};

pub const DEFAULT_IMAGE: &str = "okteto/okteto";

const EXEC_INSPECT_ATTEMPTS: usize = 20;
const EXEC_INSPECT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct DockerConfig {
    pub image: String,
    pub pull: bool,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            pull: true,
        }
    }
}

/// Runs every command of an operation inside one throwaway container.
pub struct DockerRuntime {
    docker: Docker,
    cfg: DockerConfig,
}

impl DockerRuntime {
    pub fn connect(cfg: DockerConfig) -> Result<Self, AppError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self::new(docker, cfg))
    }

    pub fn new(docker: Docker, cfg: DockerConfig) -> Self {
        Self { docker, cfg }
    }

    async fn pull_image(&self) -> Result<(), AppError> {
        info!("Pulling {}...", self.cfg.image);
        // an empty tag makes the daemon pull every tag of the repository
        let (from_image, tag) = pull_reference(&self.cfg.image);
        let mut progress = self.docker.create_image(
            Some(CreateImageOptions {
                from_image,
                tag,
                ..Default::default()
            }),
            None,
            None,
        );
        while let Some(step) = progress.next().await {
            let step = step.map_err(|e| app_error!(Process, "Can't pull {}: {e}", self.cfg.image))?;
            if let Some(status) = step.status {
                debug!("{status}");
            }
        }
        Ok(())
    }
}

impl Runtime for DockerRuntime {
    type Sandbox = DockerSandbox;

    async fn provision(&self, env: Vec<(String, String)>) -> Result<DockerSandbox, AppError> {
        if self.cfg.pull {
            self.pull_image().await?;
        }

        let container_name = format!("okteto-preview-{}", Uuid::new_v4());
        let env = env
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>();

        // the image's entrypoint is `okteto`, replace it with something that idles
        let config = container::Config {
            image: Some(self.cfg.image.clone()),
            entrypoint: Some(vec!["tail".to_string()]),
            cmd: Some(vec!["-f".to_string(), "/dev/null".to_string()]),
            env: Some(env),
            ..Default::default()
        };

        let create_options = Some(CreateContainerOptions {
            name: container_name.clone(),
            ..Default::default()
        });
        self.docker.create_container(create_options, config).await?;

        let sandbox = DockerSandbox {
            docker: self.docker.clone(),
            container_name,
        };

        let started = self
            .docker
            .start_container(&sandbox.container_name, None::<StartContainerOptions<String>>)
            .await;
        if let Err(e) = started {
            if let Err(dispose_err) = sandbox.dispose().await {
                warn!("Error while removing the container: {dispose_err}");
            }
            return Err(e.into());
        }

        debug!("Started container {}", sandbox.container_name);
        Ok(sandbox)
    }
}

pub struct DockerSandbox {
    docker: Docker,
    container_name: String,
}

impl DockerSandbox {
    /// The attached stream can end before the daemon marks the exec as
    /// finished, so poll until it reports an exit code.
    async fn wait_exit_code(&self, exec_id: &str) -> Result<i64, AppError> {
        for _ in 0..EXEC_INSPECT_ATTEMPTS {
            let inspect = self.docker.inspect_exec(exec_id).await?;
            match (inspect.running, inspect.exit_code) {
                (Some(true), _) | (_, None) => sleep(EXEC_INSPECT_DELAY).await,
                (_, Some(exit_code)) => return Ok(exit_code),
            }
        }
        app_err!(Process, "Exec {exec_id} finished without an exit code")
    }
}

/// Splits `name[:tag]` or `name@digest` into the pull `fromImage` and `tag`
/// parameters, defaulting the tag to `latest`.
fn pull_reference(image: &str) -> (&str, &str) {
    if let Some((name, digest)) = image.split_once('@') {
        return (name, digest);
    }
    match image.rsplit_once(':') {
        // a colon before the last slash is a registry port
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

impl Sandbox for DockerSandbox {
    async fn exec(&mut self, argv: &[String]) -> Result<ExecOutput, AppError> {
        let exec = self
            .docker
            .create_exec(
                &self.container_name,
                CreateExecOptions {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let captured = match self.docker.start_exec(&exec.id, None).await? {
            StartExecResults::Attached { output, .. } => drain_output(output).await,
            StartExecResults::Detached => {
                return app_err!(Process, "Exec {} started detached", exec.id);
            }
        };

        let exit_code = self.wait_exit_code(&exec.id).await?;

        Ok(ExecOutput {
            exit_code,
            stdout: captured.stdout_lossy(),
            stderr: captured.stderr_lossy(),
        })
    }

    async fn dispose(self) -> Result<(), AppError> {
        debug!("Removing container {}", self.container_name);
        self.docker
            .remove_container(
                &self.container_name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| app_error!(Process, "Error while removing {}: {e}", self.container_name))
    }
}
