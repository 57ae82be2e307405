use thiserror::Error;

pub type TagsafeResult<T> = Result<T, TagsafeError>;

/// Errors raised by the CLI and the entity-refresh tool.
///
/// The scanning core itself has no error states: absence of matches is a
/// normal outcome, and policy load failures recover to defaults inside
/// [`PolicySet`](crate::PolicySet) instead of surfacing here.
#[derive(Error, Debug, Clone)]
pub enum TagsafeError {
    #[error("Failed to read '{path}': {message}")]
    FileRead { path: String, message: String },

    #[error("Failed to write '{path}': {message}")]
    FileWrite { path: String, message: String },

    #[error("Entity source fetch failed: {0}")]
    EntityFetch(String),

    #[error("Entity source returned malformed data: {0}")]
    EntityData(String),
}
