//! Commands that talk to the aggregation service over HTTP.

use std::io::Write as _;
use std::sync::Arc;

use aivis_client::AivisClient;
use aivis_core::{PollConfig, SnapshotError};
use aivis_poller::{
    BrandIdentity, PollSession, PollSettings, RankingDisplay, SessionState, View, WatchObserver,
};

/// Run a poll session for `project_id` and print the outcome.
///
/// Progress is redrawn in place on stdout. Ctrl-C tears the session down and
/// returns without output.
///
/// # Errors
///
/// Returns an error if the client cannot be built or the session ends in
/// failure (timeout, no data, service unavailable).
pub(crate) async fn run_poll(
    config: &PollConfig,
    project_id: &str,
    brand: BrandIdentity,
) -> anyhow::Result<()> {
    let client = Arc::new(AivisClient::new(config)?);
    let (observer, mut rx) = WatchObserver::channel();
    let mut handle = PollSession::start(
        project_id,
        PollSettings::from_poll_config(config),
        Arc::clone(&client),
        client,
        Arc::new(observer),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last_line = String::new();
    let final_state: SessionState = loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break handle.wait().await;
                }
                let state = rx.borrow_and_update().clone();
                if state.is_terminal() {
                    break state;
                }
                let line = View::from_state(&state, &brand).to_string();
                if line != last_line {
                    print!("\r{line:<60}");
                    std::io::stdout().flush()?;
                    last_line = line;
                }
            }
            _ = &mut ctrl_c => {
                handle.teardown().await;
                if !last_line.is_empty() {
                    println!();
                }
                tracing::info!(project_id, "poll cancelled by user");
                return Ok(());
            }
        }
    };

    if !last_line.is_empty() {
        println!();
    }
    handle.wait().await;

    match View::from_state(&final_state, &brand) {
        View::Error { message } => anyhow::bail!("analysis did not finish: {message}"),
        view => println!("{view}"),
    }
    Ok(())
}

/// Fetch and print the final ranking of a finished project.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be fetched.
pub(crate) async fn run_ranking(
    config: &PollConfig,
    project_id: &str,
    project_name: Option<String>,
) -> anyhow::Result<()> {
    let client = AivisClient::new(config)?;
    let snapshot = client
        .fetch_ranking(project_id)
        .await
        .map_err(SnapshotError::from)?;

    let brand = BrandIdentity::new(
        project_name.unwrap_or_else(|| snapshot.brand.name.clone()),
        None,
    );
    println!("{}", RankingDisplay::from_snapshot(&snapshot, &brand).render_table());
    Ok(())
}
