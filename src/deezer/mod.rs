//! Access to the public Deezer track API.

pub mod client;

use crate::{
    domain::track::{RemoteTrack, TrackId},
    error::AnnotateError,
};

/// Anything that can answer "what does the catalog say about this track".
pub trait TrackSource {
    fn fetch(&self, id: &TrackId) -> Result<RemoteTrack, AnnotateError>;
}
