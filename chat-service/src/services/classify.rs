//! Failure classification for provider errors.
//!
//! The HTTP status reported by the provider is checked first. Text matching
//! on the rendered error is the fallback, and is only a heuristic.

use super::providers::ProviderError;

/// Provider text for a model with no quota at all on the caller's tier.
pub const ZERO_ALLOCATION_MARKER: &str = "limit: 0";

/// Per-candidate error length kept for diagnostics.
pub const ATTEMPT_ERROR_CHARS: usize = 100;

/// Length of the last error quoted in a quota response.
pub const LAST_ERROR_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limit or quota; waiting may help.
    Transient,
    /// Zero allocation; the model is unusable for this caller.
    Permanent,
    Unclassified,
}

impl FailureKind {
    pub fn is_quota_related(self) -> bool {
        matches!(self, FailureKind::Transient | FailureKind::Permanent)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Transient => "transient",
            FailureKind::Permanent => "permanent",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

/// A structured HTTP status decides on its own: a non-429 response whose text
/// mentions "quota" is `Unclassified`, unlike a plain text match.
pub fn classify(err: &ProviderError) -> FailureKind {
    let text = err.to_string();

    if text.contains(ZERO_ALLOCATION_MARKER) {
        return FailureKind::Permanent;
    }

    let rate_limited = match err.status() {
        Some(status) => status == 429,
        None => text.contains("429") || text.to_lowercase().contains("quota"),
    };

    if rate_limited {
        FailureKind::Transient
    } else {
        FailureKind::Unclassified
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
