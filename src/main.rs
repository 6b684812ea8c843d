mod api;
mod cascade;
mod cli;
mod config;
mod error;
mod lifecycle;
mod notify;
mod optimistic;
mod orchestrator;
mod poller;
mod reconcile;
mod ui;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use api::{ApiClient, ApiError, IdeaStore, InMemoryStore};
use cli::{Cli, Command};
use config::FunilConfig;
use error::FunilError;
use lifecycle::{Idea, Stage, TransitionRequest};
use orchestrator::TransitionOrchestrator;
use poller::Poller;
use reconcile::Reconciler;
use ui::TransitionProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = FunilConfig::load()?;
    if let Some(ms) = cli.interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(n) = cli.max_attempts {
        config.poll_max_attempts = n;
    }

    match cli.command {
        Command::Move {
            idea_id,
            to,
            reason,
        } => run_move(&config, &idea_id, &to, reason, cli.verbose).await,
        Command::Status => run_status(&config).await,
        Command::Watch => run_watch(&config).await,
        Command::Demo => run_demo(cli.verbose).await,
    }
}

// Wires ctrl-c to the transition/reconciliation cancellation token so an
// interrupted wait stops polling instead of leaving orphaned timers.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let handle = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });
    cancel
}

async fn run_move(
    config: &FunilConfig,
    idea_id: &str,
    to: &str,
    reason: Option<String>,
    verbose: bool,
) -> Result<()> {
    let to: Stage = to.parse().map_err(FunilError::UnknownStage)?;
    let store = ApiClient::new(config.api_base_url.clone());

    let idea = match store.fetch_idea(idea_id).await {
        Ok(idea) => idea,
        Err(ApiError::NotFound(id)) => return Err(FunilError::IdeaVanished(id).into()),
        Err(e) => return Err(FunilError::Api(e).into()),
    };

    // The closure-confirmation gate: collect a reason before anything moves.
    let reason = if to == Stage::Closed && reason.is_none() {
        ui::prompt_closure_reason(&idea)?
    } else {
        reason
    };

    let cancel = cancel_on_ctrl_c();
    let progress = TransitionProgress::start(&idea.title);
    let orchestrator =
        TransitionOrchestrator::new(store, progress.clone(), config.poller());

    let request = TransitionRequest::new(idea.id.clone(), idea.status, to);
    let report = orchestrator.transition(request, reason, &cancel).await?;

    progress.finish(&report);
    if verbose {
        progress.print_report(&report);
    }
    Ok(())
}

async fn run_status(config: &FunilConfig) -> Result<()> {
    let store = ApiClient::new(config.api_base_url.clone());
    let reconciler = Reconciler::new(
        store,
        config.reconcile_period(),
        Arc::new(Mutex::new(HashSet::new())),
    );
    reconciler.reconcile_once().await;
    ui::print_board(&reconciler);
    Ok(())
}

async fn run_watch(config: &FunilConfig) -> Result<()> {
    let store = ApiClient::new(config.api_base_url.clone());
    let reconciler = Arc::new(Reconciler::new(
        store,
        config.reconcile_period(),
        Arc::new(Mutex::new(HashSet::new())),
    ));
    let cancel = cancel_on_ctrl_c();

    let background = {
        let reconciler = reconciler.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { reconciler.run(&cancel).await })
    };

    loop {
        ui::print_board(&reconciler);
        println!();
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconcile_period()) => {}
        }
    }

    background.await?;
    Ok(())
}

async fn run_demo(verbose: bool) -> Result<()> {
    let store = InMemoryStore::new().with_deep_dive_delay(2);
    let id = store.insert(Idea::new("AI-assisted changelog writer"));
    store.insert(Idea::new("Repo health dashboard"));

    println!("Moving \"AI-assisted changelog writer\" from suggested to considering...");
    let progress = TransitionProgress::start("AI-assisted changelog writer");
    let orchestrator = TransitionOrchestrator::new(
        store,
        progress.clone(),
        Poller::new(Duration::from_millis(200), 30),
    );

    let request = TransitionRequest::new(&id, Stage::Suggested, Stage::Considering);
    let report = orchestrator
        .transition(request, None, &cancel_on_ctrl_c())
        .await?;

    progress.finish(&report);
    if verbose {
        progress.print_report(&report);
    }
    Ok(())
}
