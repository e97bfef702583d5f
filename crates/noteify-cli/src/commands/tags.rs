use crate::commands::common::CommandContext;
use crate::error::CliError;

pub async fn run_tags(context: &CommandContext, as_json: bool) -> Result<(), CliError> {
    let snapshot = context.load().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&*snapshot.available_tags)?);
    } else {
        for tag in snapshot.available_tags.iter() {
            println!("{tag}");
        }
    }

    Ok(())
}
