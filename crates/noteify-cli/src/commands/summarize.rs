use noteify_core::SummaryClient;

use crate::commands::common::{resolve_note, CommandContext};
use crate::error::CliError;

pub async fn run_summarize(context: &CommandContext, id: &str) -> Result<(), CliError> {
    let client = SummaryClient::from_config(&context.config)?;
    let snapshot = context.load().await?;
    let note = resolve_note(&snapshot, id)?;

    let summary = client.summarize(&note.content).await?;
    println!("{summary}");
    Ok(())
}
