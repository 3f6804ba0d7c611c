use log::info;
use stockwatch_core::Symbol;

use crate::cli::SymbolArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

pub async fn add(args: &SymbolArgs, context: &Context) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    if context.store.snapshot().contains(&symbol) {
        info!("{symbol} is already in the watchlist");
        return output::watchlist(&context.store.snapshot(), context.format);
    }

    let pipeline = context.search_pipeline();
    let results = pipeline.search_now(symbol.as_str()).await?;
    let Some(stock) = results.into_iter().find(|stock| stock.symbol == symbol) else {
        return Err(CliError::SymbolNotFound(symbol.to_string()));
    };

    pipeline.select(stock);
    info!("added {symbol} to the watchlist");
    output::watchlist(&context.store.snapshot(), context.format)
}

pub fn remove(args: &SymbolArgs, context: &Context) -> Result<(), CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    if !context.store.snapshot().contains(&symbol) {
        return Err(CliError::Command(format!("{symbol} is not in the watchlist")));
    }

    context.store.remove_stock(symbol.clone());
    info!("removed {symbol} from the watchlist");
    output::watchlist(&context.store.snapshot(), context.format)
}

pub fn list(context: &Context) -> Result<(), CliError> {
    output::watchlist(&context.store.snapshot(), context.format)
}
