//! Matching fetched records to rows and writing the annotations.

pub mod correlate;
pub mod pipeline;
pub mod render;
