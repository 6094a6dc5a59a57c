//! Typed identifiers for documents and blocks.
//!
//! Both ID types wrap a UUID. New IDs are UUIDv7 (time-ordered); any UUID
//! version parses, so collections written by older clients (random v4 ids)
//! load unchanged. On the wire they are the standard hyphenated UUID string.
//! The `short()` form (last 8 hex chars, from the random part of a v7 id) is
//! for human-facing output and `Debug` only and is never used as a lookup key.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A document identifier.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(uuid::Uuid);

/// A block identifier, unique within its document.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(uuid::Uuid);

// ── Shared behavior ─────────────────────────────────────────────────────────

macro_rules! impl_typed_id {
    ($T:ident, $name:literal) => {
        impl $T {
            /// Create a new time-ordered ID (UUIDv7).
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Last 8 hex characters, for human display only.
            ///
            /// The leading digits of a v7 id are its timestamp, so ids minted
            /// in the same millisecond only differ at the tail.
            pub fn short(&self) -> String {
                self.0.as_simple().to_string()[24..].to_string()
            }

            /// Full 32-character hex string (no hyphens).
            pub fn to_hex(&self) -> String {
                self.0.as_simple().to_string()
            }

            /// Parse from a hex string (32 chars, no hyphens) or standard UUID format.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }

            /// Check if a query string matches this ID by hex prefix.
            ///
            /// Hyphens in the query are ignored so a pasted UUID prefix works.
            pub fn matches_hex_prefix(&self, prefix: &str) -> bool {
                let prefix: String = prefix.chars().filter(|c| *c != '-').collect();
                !prefix.is_empty() && self.to_hex().starts_with(&prefix.to_ascii_lowercase())
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $T {
            fn from(u: uuid::Uuid) -> Self {
                Self(u)
            }
        }

        impl From<$T> for uuid::Uuid {
            fn from(id: $T) -> uuid::Uuid {
                id.0
            }
        }

        impl fmt::Display for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $T {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $name, self.short())
            }
        }
    };
}

impl_typed_id!(DocumentId, "DocumentId");
impl_typed_id!(BlockId, "BlockId");

// ── Prefix resolution ───────────────────────────────────────────────────────

/// Error from ambiguous prefix resolution.
#[derive(Debug, thiserror::Error)]
pub enum PrefixError {
    #[error("no match for '{0}'")]
    NoMatch(String),
    #[error("ambiguous '{prefix}': matches {candidates:?}")]
    Ambiguous {
        prefix: String,
        candidates: Vec<String>,
    },
}

/// Resolve a query string against a set of document IDs and their titles.
///
/// Resolution order:
/// 1. Full UUID
/// 2. Exact title match (must be unique)
/// 3. Unique hex prefix match
/// 4. Error (no match or ambiguous)
pub fn resolve_document_prefix<'a>(
    documents: impl Iterator<Item = (DocumentId, &'a str)>,
    query: &str,
) -> Result<DocumentId, PrefixError> {
    let entries: Vec<(DocumentId, &str)> = documents.collect();

    if let Ok(id) = DocumentId::parse(query)
        && entries.iter().any(|(candidate, _)| *candidate == id)
    {
        return Ok(id);
    }

    let title_matches: Vec<DocumentId> = entries
        .iter()
        .filter(|(_, title)| *title == query)
        .map(|(id, _)| *id)
        .collect();
    match title_matches.len() {
        1 => return Ok(title_matches[0]),
        n if n > 1 => {
            return Err(PrefixError::Ambiguous {
                prefix: query.to_string(),
                candidates: title_matches.iter().map(|id| id.to_hex()).collect(),
            });
        }
        _ => {}
    }

    let hex_matches: Vec<DocumentId> = entries
        .iter()
        .filter(|(id, _)| id.matches_hex_prefix(query))
        .map(|(id, _)| *id)
        .collect();

    match hex_matches.len() {
        0 => Err(PrefixError::NoMatch(query.to_string())),
        1 => Ok(hex_matches[0]),
        _ => Err(PrefixError::Ambiguous {
            prefix: query.to_string(),
            candidates: hex_matches.iter().map(|id| id.to_hex()).collect(),
        }),
    }
}
