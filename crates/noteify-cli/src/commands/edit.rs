use noteify_core::{AutosavePipeline, EditSession, Note, NotesApi};

use crate::commands::common::{
    capture_editor_input_with_initial, normalize_tags, resolve_note, CommandContext,
};
use crate::error::CliError;

/// Field changes requested on the command line.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NoteEdits {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteEdits {
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

pub async fn run_edit(context: &CommandContext, id: &str, edits: NoteEdits) -> Result<(), CliError> {
    let snapshot = context.load().await?;
    let note = resolve_note(&snapshot, id)?;

    let edits = if edits.is_empty() {
        let content = capture_editor_input_with_initial(&note.content)?
            .ok_or(CliError::EmptyEditedContent)?;
        NoteEdits {
            content: Some(content),
            ..NoteEdits::default()
        }
    } else {
        edits
    };

    let pipeline = AutosavePipeline::from_config(context.store.clone(), &context.config);
    let saved = save_edits(EditSession::new(pipeline), note, edits).await?;
    println!("{}", saved.id);
    Ok(())
}

/// Apply `edits` through an edit session and wait for the autosave to land.
pub async fn save_edits<A: NotesApi + 'static>(
    mut session: EditSession<A>,
    note: Note,
    edits: NoteEdits,
) -> Result<Note, CliError> {
    session.select(Some(note.clone()));

    if let Some(title) = edits.title {
        session.set_title(title.trim())?;
    }
    if let Some(content) = edits.content {
        session.set_content(content)?;
    }
    if let Some(tags) = edits.tags {
        session.set_tags(normalize_tags(&tags))?;
    }

    if !session.is_dirty() {
        tracing::info!(note_id = %note.id, "Nothing to save");
        return Ok(note);
    }

    session.flush();
    session.pipeline().settled().await;

    let snapshot = session.pipeline().store().snapshot();
    if let Some(error) = &snapshot.last_error {
        return Err(error.clone().into());
    }
    snapshot
        .note(&note.id)
        .cloned()
        .ok_or_else(|| CliError::NoteNotFound(note.id.to_string()))
}
