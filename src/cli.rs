use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{error::AppError, model::ApiToken, runner::DEFAULT_IMAGE};

#[derive(Parser, Debug)]
#[command(
    name = "okteto-preview",
    version,
    about = "Deploy and destroy Okteto preview environments"
)]
pub struct CliArgs {
    /// Where to run the okteto CLI
    #[arg(
        long,
        value_enum,
        env = "OKTETO_PREVIEW_RUNTIME",
        default_value_t = RuntimeKind::Docker,
        global = true
    )]
    pub runtime: RuntimeKind,

    /// Image providing the okteto CLI (docker runtime only)
    #[arg(long, env = "OKTETO_IMAGE", default_value = DEFAULT_IMAGE, global = true)]
    pub image: String,

    /// Use the image already present locally
    #[arg(long, global = true)]
    pub no_pull: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeKind {
    Docker,
    Local,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activate an Okteto context and print the CLI output
    SetContext(Target),

    /// Deploy a preview environment and print its endpoints
    PreviewDeploy(DeployArgs),

    /// Print the endpoints of a deployed preview environment
    PreviewEndpoints(BranchArgs),

    /// Destroy a preview environment without waiting for it
    PreviewDestroy(BranchArgs),
}

#[derive(Args, Debug)]
pub struct Target {
    /// Okteto context to be used, e.g. yourinstance.okteto.com
    #[arg(long, env = "OKTETO_CONTEXT")]
    pub context: String,

    /// Token to authenticate with the Okteto context
    #[arg(long, env = "OKTETO_TOKEN", hide_env_values = true, value_parser = parse_token)]
    pub token: ApiToken,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Repository to deploy
    #[arg(long)]
    pub repo: String,

    /// Branch to deploy, also the preview name once lowercased
    #[arg(long)]
    pub branch: String,

    /// URL of the pull request to attach in the Okteto dashboard
    #[arg(long)]
    pub pr: String,

    #[command(flatten)]
    pub target: Target,
}

#[derive(Args, Debug)]
pub struct BranchArgs {
    /// Branch the preview was deployed from
    #[arg(long)]
    pub branch: String,

    #[command(flatten)]
    pub target: Target,
}

fn parse_token(s: &str) -> Result<ApiToken, AppError> {
    ApiToken::new(s)
}
