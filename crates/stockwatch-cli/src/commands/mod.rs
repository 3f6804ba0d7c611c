mod refresh;
mod search;
mod watchlist;

use std::sync::Arc;

use log::debug;
use stockwatch_core::{
    AlphaVantageClient, DashboardConfig, JsonFileStore, KeyValueStore, MarketDataProvider,
    MemoryStore, SearchPipeline, WatchlistStore,
};

use crate::cli::{Cli, Command, OutputFormat};
use crate::error::CliError;

/// Collaborators shared by every command, built once per invocation.
pub struct Context {
    pub config: DashboardConfig,
    pub store: Arc<WatchlistStore>,
    pub provider: Arc<dyn MarketDataProvider>,
    pub format: OutputFormat,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = DashboardConfig::from_env()?;
        if let Some(api_key) = &cli.api_key {
            config = config.with_api_key(api_key.clone());
        }
        if let Some(data_dir) = &cli.data_dir {
            config = config.with_data_dir(data_dir.clone());
        }

        let persistence: Arc<dyn KeyValueStore> = if cli.ephemeral {
            debug!("using in-memory watchlist storage");
            Arc::new(MemoryStore::new())
        } else {
            let files = JsonFileStore::new(config.data_dir.clone());
            debug!("watchlist storage at {}", files.dir().display());
            Arc::new(files)
        };

        let provider: Arc<dyn MarketDataProvider> =
            Arc::new(AlphaVantageClient::from_config(&config));

        Ok(Self {
            store: Arc::new(WatchlistStore::open(persistence)),
            provider,
            format: cli.format,
            config,
        })
    }

    pub fn search_pipeline(&self) -> SearchPipeline {
        SearchPipeline::new(
            Arc::clone(&self.store),
            Arc::clone(&self.provider),
            self.config.debounce,
        )
    }
}

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let context = Context::from_cli(cli)?;

    match &cli.command {
        Command::Search(args) => search::run(args, &context).await,
        Command::Add(args) => watchlist::add(args, &context).await,
        Command::Remove(args) => watchlist::remove(args, &context),
        Command::List => watchlist::list(&context),
        Command::Refresh => refresh::run(&context).await,
        Command::Watch(args) => refresh::watch(args, &context).await,
    }
}
