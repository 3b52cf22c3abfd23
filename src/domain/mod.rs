pub mod host;
pub mod track;
