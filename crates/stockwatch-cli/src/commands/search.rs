use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output;

use super::Context;

pub async fn run(args: &SearchArgs, context: &Context) -> Result<(), CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let pipeline = context.search_pipeline();
    let results = pipeline.search_now(query).await?;
    output::search_results(query, &results, context.format)
}
