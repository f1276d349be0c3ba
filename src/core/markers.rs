//! Placement of engine diagnostics on the original display text.
//!
//! Engine locations refer to the canonical formula, which differs from what
//! the user typed once references are rewritten. No inverse mapping is
//! attempted: offsets are clamped to the original text and single offsets
//! become one-character markers.

use crate::engine::EngineError;
use serde::Serialize;

/// Message used when the engine reports an error without text
pub const DEFAULT_MARKER_MESSAGE: &str = "syntax error";

/// A diagnostic span over the original text, in character offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub start: usize,
    pub end: usize,
    pub message: String,
}

/// Map engine errors to markers over `original`
pub fn markers_for(errors: &[EngineError], original: &str) -> Vec<Marker> {
    let len = original.chars().count();
    errors
        .iter()
        .map(|error| {
            let (start, end) = match (error.location, error.start, error.end) {
                (Some(loc), _, _) => (loc.min(len), (loc + 1).min(len)),
                (None, Some(start), Some(end)) => (start.min(len), end.min(len)),
                _ => (0, len.min(1)),
            };
            let message = if error.message.trim().is_empty() {
                DEFAULT_MARKER_MESSAGE.to_string()
            } else {
                error.message.clone()
            };
            Marker {
                start,
                end: end.max(start),
                message,
            }
        })
        .collect()
}
