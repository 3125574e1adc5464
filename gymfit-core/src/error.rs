//! Error types shared by the editors and the sync client.
//!
//! Validation errors and XP conflicts are always raised before any request
//! leaves the client. Everything else comes back from a collaborator.

use thiserror::Error;

use crate::models::Reward;

pub type EditorResult<T> = Result<T, EditorError>;

/// Client-local input errors. Never sent to the server.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    BlankField(&'static str),

    #[error("Invalid quantity '{0}': expected a positive integer")]
    InvalidQuantity(String),

    #[error("Invalid XP value '{0}': expected a positive integer")]
    InvalidXp(String),

    #[error("Gift text is {len} characters, the limit is {max}")]
    GiftTooLong { len: usize, max: usize },

    #[error("A variant named '{0}' already exists")]
    DuplicateVariant(String),

    #[error("Duplicate XP values in batch: {}", .0.join(", "))]
    DuplicateXpInBatch(Vec<String>),

    #[error("No foods selected")]
    EmptySelection,
}

/// An XP collision between a candidate reward and one already in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct XpConflict {
    pub xp: u32,
    pub candidate_gift: String,
    pub existing: Reward,
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// `known` lists the keys that did exist when the lookup failed.
    #[error("{kind} not found: '{key}' (known: [{}])", .known.join(", "))]
    NotFound {
        kind: &'static str,
        key: String,
        known: Vec<String>,
    },

    #[error("{} reward(s) collide with existing XP values: {}", .0.len(), conflict_list(.0))]
    XpConflict(Vec<XpConflict>),

    #[error("Template {template_id} was changed by someone else; reload it and retry")]
    StaleVersion { template_id: String },

    #[error("Server returned {status}: {detail}")]
    Remote { status: u16, detail: String },

    #[error("Image upload failed for reward {reward_id}: {message}")]
    Upload { reward_id: String, message: String },

    #[error("A save for template {template_id} is already in progress")]
    Busy { template_id: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl EditorError {
    pub fn not_found(kind: &'static str, key: impl Into<String>, known: Vec<String>) -> Self {
        EditorError::NotFound {
            kind,
            key: key.into(),
            known,
        }
    }

    /// True for errors the caller resolves locally (fix the input or decide a
    /// conflict) rather than by retrying a request.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            EditorError::Validation(_) | EditorError::NotFound { .. } | EditorError::XpConflict(_)
        )
    }
}

impl From<reqwest::Error> for EditorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            EditorError::Decode(e.to_string())
        } else {
            EditorError::Http(e.to_string())
        }
    }
}

fn conflict_list(conflicts: &[XpConflict]) -> String {
    conflicts
        .iter()
        .map(|c| format!("{} (existing: {})", c.xp, c.existing.gift))
        .collect::<Vec<_>>()
        .join(", ")
}
