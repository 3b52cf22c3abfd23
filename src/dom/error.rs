use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("html parse error: {0}")]
    HtmlParse(String),

    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
}
