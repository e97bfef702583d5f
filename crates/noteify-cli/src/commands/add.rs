use noteify_core::models::UNTITLED_NOTE_TITLE;
use noteify_core::NewNote;

use crate::commands::common::{normalize_content, normalize_tags, read_piped_stdin, CommandContext};
use crate::error::CliError;

pub async fn run_add(
    context: &CommandContext,
    title: Option<&str>,
    tags: &[String],
    content_parts: &[String],
) -> Result<(), CliError> {
    let content = match normalize_content(&content_parts.join(" ")) {
        Some(content) => Some(content),
        None => read_piped_stdin()?,
    };

    let note = context
        .store
        .create(&build_new_note(title, tags, content))
        .await?;

    println!("{}", note.id);
    Ok(())
}

/// Without a title the note is created as "Untitled Note".
pub fn build_new_note(title: Option<&str>, tags: &[String], content: Option<String>) -> NewNote {
    let title = title
        .and_then(normalize_content)
        .unwrap_or_else(|| UNTITLED_NOTE_TITLE.to_string());
    NewNote::new(title, content.unwrap_or_default()).with_tags(normalize_tags(tags))
}
