use noteify_core::Note;

use crate::commands::common::{format_note_lines, note_to_list_item, CommandContext, NoteListItem};
use crate::error::CliError;

pub async fn run_list(
    context: &CommandContext,
    search: Option<&str>,
    tags: &[String],
    limit: Option<usize>,
    as_json: bool,
) -> Result<(), CliError> {
    let notes = list_notes(context, search, tags, limit).await?;
    print_notes(&notes, as_json)
}

/// Load the notes and apply the same search/tag filter a front end would.
pub async fn list_notes(
    context: &CommandContext,
    search: Option<&str>,
    tags: &[String],
    limit: Option<usize>,
) -> Result<Vec<Note>, CliError> {
    context.load().await?;
    context
        .store
        .set_search_query(search.map_or("", str::trim));
    context.store.set_selected_tags(tags.iter().map(|tag| tag.trim()));

    let visible = context.store.snapshot().visible_notes;
    let limit = limit.unwrap_or(visible.len());
    Ok(visible.iter().take(limit).cloned().collect())
}

pub fn print_notes(notes: &[Note], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_note_lines(notes) {
            println!("{line}");
        }
    }

    Ok(())
}
