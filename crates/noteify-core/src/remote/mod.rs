//! Remote notes collection access.
//!
//! [`NotesApi`] is the seam between the note store and the transport. The
//! production implementation is [`RemoteNotesClient`], which talks to the REST
//! notes API with a bearer credential from a [`TokenProvider`].

mod client;
mod error;

use std::future::Future;

pub use client::RemoteNotesClient;
pub use error::{ApiError, ApiErrorKind, ApiResult};

use crate::models::{NewNote, Note, NoteId, NotePatch};

/// Operations against the remote note collection.
///
/// Nothing here retries. `create` in particular must never be retried
/// automatically because a lost response would duplicate the note.
pub trait NotesApi: Send + Sync {
    /// Fetch the full note collection
    fn list(&self) -> impl Future<Output = ApiResult<Vec<Note>>> + Send;

    /// Create a note; the remote assigns its identifier
    fn create(&self, note: &NewNote) -> impl Future<Output = ApiResult<Note>> + Send;

    /// Apply a partial update and return the stored note
    fn update(
        &self,
        id: &NoteId,
        patch: &NotePatch,
    ) -> impl Future<Output = ApiResult<Note>> + Send;

    /// Delete a note
    fn delete(&self, id: &NoteId) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Source of the bearer credential attached to every request.
///
/// `None` (or a blank token) means unauthenticated; requests then fail with
/// [`ApiErrorKind::Unauthorized`] instead of being sent.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A fixed token, e.g. from the command line or environment.
#[derive(Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_tuple("StaticToken")
            .field(&self.0.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}
