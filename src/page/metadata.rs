use std::sync::LazyLock;

use regex::Regex;

use crate::{dom::Document, domain::track::TrackId, error::AnnotateError};

static TRACK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://www\.deezer\.com/.{2}/track/(\d+)$").expect("valid track URL pattern")
});

/// Track ids from the page's `music:song` metadata, in document order.
pub fn extract_track_ids(doc: &Document, selector: &str) -> Result<Vec<TrackId>, AnnotateError> {
    doc.select(selector)?
        .into_iter()
        .map(|node| {
            let content = doc.attr(node, "content").unwrap_or_default();
            parse_track_url(content).ok_or_else(|| AnnotateError::PatternMismatch {
                content: content.to_string(),
            })
        })
        .collect()
}

pub fn parse_track_url(url: &str) -> Option<TrackId> {
    TRACK_URL
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|id| TrackId(id.as_str().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selectors;

    fn meta(content: &str) -> String {
        format!(r#"<meta property="music:song" content="{content}">"#)
    }

    #[test]
    fn test_parse_track_url() {
        assert_eq!(
            parse_track_url("https://www.deezer.com/us/track/3135556"),
            Some(TrackId("3135556".into()))
        );
        assert_eq!(parse_track_url("https://www.deezer.com/track/3135556"), None);
        assert_eq!(parse_track_url("https://www.deezer.com/us/album/302127"), None);
        assert_eq!(parse_track_url("https://www.deezer.com/us/track/"), None);
    }

    #[test]
    fn test_extract_ids_in_document_order() -> anyhow::Result<()> {
        let html = format!(
            "<head>{}{}<meta property=\"og:title\" content=\"Discovery\">{}</head>",
            meta("https://www.deezer.com/fr/track/3"),
            meta("https://www.deezer.com/fr/track/1"),
            meta("https://www.deezer.com/fr/track/2"),
        );
        let doc = Document::parse(&html)?;

        let ids = extract_track_ids(&doc, &Selectors::default().meta)?;

        assert_eq!(
            ids,
            vec![
                TrackId("3".into()),
                TrackId("1".into()),
                TrackId("2".into())
            ]
        );
        Ok(())
    }

    #[test]
    fn test_bad_metadata_url_aborts() -> anyhow::Result<()> {
        let html = format!(
            "<head>{}{}</head>",
            meta("https://www.deezer.com/fr/track/1"),
            meta("https://example.com/track/2"),
        );
        let doc = Document::parse(&html)?;

        let err = extract_track_ids(&doc, &Selectors::default().meta).unwrap_err();

        assert!(matches!(
            err,
            AnnotateError::PatternMismatch { content } if content == "https://example.com/track/2"
        ));
        Ok(())
    }
}
