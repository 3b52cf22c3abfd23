//! Reading the album page: track metadata, the visible track list and the
//! embedded application state.

pub mod host_state;
pub mod index;
pub mod metadata;
