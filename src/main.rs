use std::sync::Arc;

use thiserror::Error;

use crate::api::server::AppState;
use crate::util::env::EnvErr;
use crate::util::github::GithubErr;
use crate::util::telemetry;

mod api;
mod constants;
mod scoring;
mod util;
mod view;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Github(#[from] GithubErr),

    #[error(transparent)]
    Std(#[from] Box<dyn std::error::Error>),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    let env = util::env::env().await?;
    let telemetry_registry = telemetry::Telemetry::new(env)?.register();

    tracing::info!(
        owner = %env.repo_owner,
        repo = %env.repo_name,
        attribution = ?env.attribution,
        "starting main application"
    );

    let state = AppState::new(env.clone())?;
    let served = api::server::start_server(Arc::new(state)).await;

    telemetry_registry.shutdown();
    Ok(served?)
}
