//! Terminal front end for the three screens.
//!
//! Each submodule drives one controller and renders its snapshot as text.
//! Rendering functions return `String` so they can be tested without a
//! terminal.

pub mod dashboard;
pub mod register;
pub mod report;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::api::StoreApi;
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::session::SessionState;

/// Run one CLI command inside an operator session.
pub async fn execute(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(
        StoreApi::new(&config.api_base_url, config.request_timeout)
            .context("store API client")?,
    );
    info!(base_url = %store.base_url(), "store API client ready");

    let sessions = SessionState::new();
    sessions
        .sign_in(&config.operator)
        .map_err(anyhow::Error::msg)?;
    let result = dispatch(command, store, &sessions).await;
    sessions.sign_out();
    result
}

async fn dispatch(
    command: Commands,
    store: Arc<StoreApi>,
    sessions: &SessionState,
) -> anyhow::Result<()> {
    let session = sessions.require().map_err(anyhow::Error::msg)?;
    info!(operator = %session.operator, command = ?command, "running command");

    let text = match command {
        Commands::Report { from, to } => report::run(store, from, to).await?,
        Commands::Dashboard { range } => dashboard::run(store, range).await,
        Commands::Search { query } => register::search_once(store, &query).await,
        Commands::Register => {
            // The interactive loop writes as it goes.
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            register::run_interactive(store, stdin, std::io::stdout()).await?;
            return Ok(());
        }
    };

    let mut out = std::io::stdout().lock();
    write!(out, "{text}")?;
    out.flush()?;
    Ok(())
}

/// Pad or cut `text` to exactly `width` characters.
pub(crate) fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{text}{}", " ".repeat(width - count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_pads_and_truncates_by_chars() {
        assert_eq!(fit("Teh", 5), "Teh  ");
        assert_eq!(fit("Beras Premium 5kg", 8), "Beras P…");
        assert_eq!(fit("", 2), "  ");
    }
}
