use thiserror::Error;

use crate::{
    dom::error::DomError,
    domain::track::{Coordinate, TrackId},
};

/// Everything that stops an annotation pass. None of these are recovered
/// from: the pass ends and rows annotated so far stay as they are.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("metadata content {content:?} is not a track URL")]
    PatternMismatch { content: String },

    #[error("page lists {expected} tracks in metadata but shows {found} track rows")]
    StructuralMismatch { expected: usize, found: usize },

    #[error("missing {what} for track row {row}")]
    MissingNode { what: &'static str, row: usize },

    #[error("track {id} ({wanted}) does not match any row of the track list")]
    UnmatchedTrack { id: TrackId, wanted: Wanted },

    #[error("failed to fetch track {id}: {reason}")]
    Fetch { id: TrackId, reason: String },

    #[error("track {id} is not in the page application state")]
    UnknownHostTrack { id: TrackId },

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// What a correlation strategy was looking for when it came up empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Wanted {
    Coordinate(Option<Coordinate>),
    TitleAt { title: String, position: Option<u32> },
}

impl std::fmt::Display for Wanted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Wanted::Coordinate(Some(c)) => write!(f, "coordinate {c}"),
            Wanted::Coordinate(None) => write!(f, "no track position"),
            Wanted::TitleAt {
                title,
                position: Some(p),
            } => write!(f, "\"{p}. {title}\""),
            Wanted::TitleAt {
                title,
                position: None,
            } => write!(f, "\"{title}\" without a track position"),
        }
    }
}
