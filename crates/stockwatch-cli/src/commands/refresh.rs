use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use stockwatch_core::RefreshScheduler;
use tokio::select;

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

pub async fn run(context: &Context) -> Result<(), CliError> {
    let scheduler = scheduler(context, context.config.refresh_interval);
    let report = scheduler.refresh_all().await;

    output::refresh_report(&report, context.format)?;
    output::watchlist(&context.store.snapshot(), context.format)
}

pub async fn watch(args: &WatchArgs, context: &Context) -> Result<(), CliError> {
    let interval = match args.interval_secs {
        Some(0) => {
            return Err(CliError::Command(String::from(
                "--interval-secs must be greater than zero",
            )))
        }
        Some(secs) => Duration::from_secs(secs),
        None => context.config.refresh_interval,
    };

    let scheduler = scheduler(context, interval);
    let mut changes = context.store.subscribe();

    output::watchlist(&changes.borrow_and_update(), context.format)?;
    if args.now {
        let report = scheduler.refresh_all().await;
        output::refresh_report(&report, context.format)?;
    }

    scheduler.start();
    let outcome = loop {
        select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = changes.borrow_and_update().clone();
                if let Err(error) = output::summary(&state, context.format) {
                    break Err(error);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(error) = signal {
                    warn!("failed to listen for Ctrl-C: {error}");
                }
                info!("interrupted, stopping");
                break Ok(());
            }
        }
    };

    scheduler.stop().await;
    outcome
}

fn scheduler(context: &Context, interval: Duration) -> RefreshScheduler {
    RefreshScheduler::new(
        Arc::clone(&context.store),
        Arc::clone(&context.provider),
        interval,
    )
}
