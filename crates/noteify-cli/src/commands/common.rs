use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use noteify_core::config::ENV_API_URL;
use noteify_core::{ClientConfig, Note, NoteStore, RemoteNotesClient, StaticToken, StoreSnapshot};
use serde::Serialize;

use crate::error::CliError;

/// Everything a command needs to talk to the notes API.
pub struct CommandContext {
    pub config: ClientConfig,
    pub store: NoteStore<RemoteNotesClient>,
}

impl CommandContext {
    pub fn new(api_url: Option<String>, token: Option<String>) -> Result<Self, CliError> {
        let config = load_config(api_url)?;
        let tokens = token.map_or_else(StaticToken::none, StaticToken::new);
        let client = RemoteNotesClient::from_config(&config, tokens)?;
        tracing::debug!(api_url = %config.api_base_url, "Using notes API");
        Ok(Self {
            config,
            store: NoteStore::new(client),
        })
    }

    /// Fetch the full note list and return the resulting store snapshot.
    pub async fn load(&self) -> Result<StoreSnapshot, CliError> {
        self.store.load().await?;
        Ok(self.store.snapshot())
    }
}

/// Build the client configuration, letting `--api-url` override the environment.
pub fn load_config(api_url: Option<String>) -> Result<ClientConfig, CliError> {
    let Some(api_url) = api_url else {
        return Ok(ClientConfig::from_env()?);
    };
    let config = ClientConfig::from_lookup(|name| {
        if name == ENV_API_URL {
            Some(api_url.clone())
        } else {
            env::var(name).ok()
        }
    })?;
    Ok(config)
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub tags: Vec<String>,
    pub pinned: bool,
    pub archived: bool,
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    NoteListItem {
        id: note.id.to_string(),
        title: note.title.clone(),
        preview: note_preview(note, 80),
        content: note.content.clone(),
        tags: sorted_tags(note),
        pinned: note.pinned,
        archived: note.archived,
    }
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    notes
        .iter()
        .map(|note| {
            let short_id = short_id(note);
            let preview = note_preview(note, 40);
            let tags = render_tags(note);

            if tags.is_empty() {
                format!("{short_id:<13}  {preview}")
            } else {
                format!("{short_id:<13}  {preview:<40}  {tags}")
            }
        })
        .collect()
}

pub fn short_id(note: &Note) -> String {
    note.id.as_str().chars().take(13).collect()
}

/// Title when set, otherwise the first line of content, collapsed and truncated.
pub fn note_preview(note: &Note, max_chars: usize) -> String {
    let source = if note.title.trim().is_empty() {
        note.content.lines().next().unwrap_or("")
    } else {
        note.title.as_str()
    };
    let collapsed = source.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

fn sorted_tags(note: &Note) -> Vec<String> {
    let mut tags = note
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    tags.sort();
    tags.dedup();
    tags
}

pub fn render_tags(note: &Note) -> String {
    sorted_tags(note)
        .into_iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Trim tags and drop blanks and repeats, keeping first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|existing| existing == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

/// Find a note by exact ID or unique ID prefix.
pub fn resolve_note(snapshot: &StoreSnapshot, note_query: &str) -> Result<Note, CliError> {
    let note_query = normalize_note_identifier(note_query)?;

    if let Some(note) = snapshot
        .all_notes
        .iter()
        .find(|note| note.id.as_str() == note_query)
    {
        return Ok(note.clone());
    }

    let matching = snapshot
        .all_notes
        .iter()
        .filter(|note| note.id.as_str().starts_with(&note_query))
        .take(3)
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::NoteNotFound(note_query)),
        [note] => Ok((*note).clone()),
        _ => {
            let options = matching
                .iter()
                .map(|note| short_id(note))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousNoteId(format!(
                "ID prefix '{note_query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn normalize_note_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyNoteId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let status = match Command::new(editor).arg(file_path).status() {
        Ok(status) => status,
        // EDITOR may carry arguments, e.g. "code --wait".
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };
            Command::new(program).args(parts).arg(file_path).status()?
        }
        Err(err) => return Err(CliError::Io(err)),
    };

    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("noteify-note-{}-{now}.md", std::process::id()))
}
