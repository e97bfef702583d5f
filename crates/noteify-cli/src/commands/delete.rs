use crate::commands::common::{resolve_note, CommandContext};
use crate::error::CliError;

pub async fn run_delete(context: &CommandContext, id: &str) -> Result<(), CliError> {
    let snapshot = context.load().await?;
    let note = resolve_note(&snapshot, id)?;

    context.store.remove(&note.id).await?;
    println!("{}", note.id);
    Ok(())
}
