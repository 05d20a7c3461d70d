use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Every outcome the core reports to its caller. Rendering these for humans
/// is the collaborator's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("missing_url")]
    MissingUrl,
    #[error("invalid_url")]
    InvalidUrl,
    #[error("invalid_validity")]
    InvalidValidity,
    #[error("invalid_shortcode_format")]
    InvalidShortcodeFormat,
    #[error("shortcode_taken")]
    ShortcodeTaken,
    #[error("not_found")]
    NotFound,
    #[error("expired")]
    Expired,
    #[error("empty_batch")]
    EmptyBatch,
    #[error("batch_too_large")]
    BatchTooLarge,
}

/// Field of a submitted entry an error is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryField {
    OriginalUrl,
    CustomShortcode,
    ValidityMinutes,
}

/// Field errors keyed by entry index, then by field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BatchErrors(BTreeMap<usize, BTreeMap<EntryField, ErrorKind>>);

impl BatchErrors {
    pub fn insert(&mut self, index: usize, field: EntryField, kind: ErrorKind) {
        self.0.entry(index).or_default().insert(field, kind);
    }

    pub fn get(&self, index: usize, field: EntryField) -> Option<ErrorKind> {
        self.0.get(&index).and_then(|fields| fields.get(&field)).copied()
    }

    pub fn has_entry(&self, index: usize) -> bool {
        self.0.contains_key(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries with at least one error
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, EntryField, ErrorKind)> + '_ {
        self.0.iter().flat_map(|(index, fields)| {
            fields.iter().map(move |(field, kind)| (*index, *field, *kind))
        })
    }
}

/// A rejected batch: the failing fields, plus entries that were fine on
/// their own but were discarded with the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRejection {
    pub errors: BatchErrors,
    pub not_applied: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("batch contained no entries")]
    EmptyBatch,
    #[error("batch of {received} entries exceeds the limit of {limit}")]
    BatchTooLarge { limit: usize, received: usize },
    #[error("{} entries failed validation", .0.errors.len())]
    Rejected(BatchRejection),
}
