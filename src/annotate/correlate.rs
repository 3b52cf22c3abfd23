use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::{
    domain::track::{RemoteTrack, TrackId},
    error::{AnnotateError, Wanted},
    page::index::{CorrelationIndex, RowHandle},
};

static DISPLAYED_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s(.*)$").expect("valid displayed title pattern"));

/// Finds the visible row a fetched record belongs to.
pub trait Correlator {
    fn correlate<'a>(
        &self,
        id: &TrackId,
        record: &RemoteTrack,
        index: &'a CorrelationIndex,
    ) -> Result<&'a RowHandle, AnnotateError>;
}

/// Joins on `(disk, position)`.
pub struct CoordinateJoin;

impl Correlator for CoordinateJoin {
    fn correlate<'a>(
        &self,
        id: &TrackId,
        record: &RemoteTrack,
        index: &'a CorrelationIndex,
    ) -> Result<&'a RowHandle, AnnotateError> {
        let coordinate = record.coordinate();
        coordinate
            .and_then(|c| index.get(&c.key()))
            .ok_or_else(|| AnnotateError::UnmatchedTrack {
                id: id.clone(),
                wanted: Wanted::Coordinate(coordinate),
            })
    }
}

/// Joins on the row's displayed `"N. Title"` text. Only works on layouts
/// that prefix titles with their position.
pub struct TitleJoin;

pub fn parse_displayed_title(text: &str) -> Option<(u32, &str)> {
    let caps = DISPLAYED_TITLE.captures(text.trim())?;
    let position = caps.get(1)?.as_str().parse().ok()?;
    Some((position, caps.get(2)?.as_str().trim()))
}

impl Correlator for TitleJoin {
    fn correlate<'a>(
        &self,
        id: &TrackId,
        record: &RemoteTrack,
        index: &'a CorrelationIndex,
    ) -> Result<&'a RowHandle, AnnotateError> {
        let wanted_title = record.title.trim();
        record
            .track_position
            .and_then(|position| {
                index.rows().find(|row| {
                    parse_displayed_title(&row.title_text)
                        .is_some_and(|(p, title)| p == position && title == wanted_title)
                })
            })
            .ok_or_else(|| AnnotateError::UnmatchedTrack {
                id: id.clone(),
                wanted: Wanted::TitleAt {
                    title: record.title.clone(),
                    position: record.track_position,
                },
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Match on disk number and track position
    #[default]
    Coordinate,
    /// Match on the "N. Title" text shown in the row
    Title,
}

impl Strategy {
    pub fn correlator(self) -> &'static dyn Correlator {
        match self {
            Strategy::Coordinate => &CoordinateJoin,
            Strategy::Title => &TitleJoin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Selectors,
        dom::Document,
        domain::track::Coordinate,
        page::index::{
            index_rows,
            tests::{disk_row, track_list, track_row},
        },
    };

    fn record(title: &str, disk: Option<u32>, position: Option<u32>) -> RemoteTrack {
        RemoteTrack {
            id: Some(1),
            title: title.to_string(),
            track_position: position,
            disk_number: disk,
            available_countries: vec![],
        }
    }

    fn two_disk_doc() -> anyhow::Result<Document> {
        let html = track_list(&[
            track_row("1. Alpha"),
            track_row("2. Beta"),
            disk_row(2),
            track_row("1. Gamma"),
        ]);
        Ok(Document::parse(&html)?)
    }

    #[test]
    fn test_coordinate_join_null_disk_is_disk_one() -> anyhow::Result<()> {
        let doc = two_disk_doc()?;
        let index = index_rows(&doc, &Selectors::default(), 3)?;
        let id = TrackId("1".into());

        let row = CoordinateJoin.correlate(&id, &record("whatever", None, Some(2)), &index)?;
        assert_eq!(row.coordinate, Coordinate::new(1, 2));

        let row = CoordinateJoin.correlate(&id, &record("whatever", Some(2), Some(1)), &index)?;
        assert_eq!(row.title_text, "1. Gamma");
        Ok(())
    }

    #[test]
    fn test_coordinate_join_miss() -> anyhow::Result<()> {
        let doc = two_disk_doc()?;
        let index = index_rows(&doc, &Selectors::default(), 3)?;
        let id = TrackId("9".into());

        let err = CoordinateJoin
            .correlate(&id, &record("x", Some(2), Some(2)), &index)
            .unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::UnmatchedTrack { wanted: Wanted::Coordinate(Some(c)), .. }
                if c == Coordinate::new(2, 2)
        ));

        let err = CoordinateJoin
            .correlate(&id, &record("x", None, None), &index)
            .unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::UnmatchedTrack {
                wanted: Wanted::Coordinate(None),
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn test_parse_displayed_title() {
        assert_eq!(parse_displayed_title("12. Digital Love"), Some((12, "Digital Love")));
        assert_eq!(parse_displayed_title("3.  Spaced "), Some((3, "Spaced")));
        assert_eq!(parse_displayed_title("Digital Love"), None);
        assert_eq!(parse_displayed_title("12.Digital Love"), None);
    }

    #[test]
    fn test_title_join_matches_title_and_position() -> anyhow::Result<()> {
        let doc = two_disk_doc()?;
        let index = index_rows(&doc, &Selectors::default(), 3)?;
        let id = TrackId("1".into());

        // Same position on disk 2, title picks the right one.
        let row = TitleJoin.correlate(&id, &record("Gamma", Some(2), Some(1)), &index)?;
        assert_eq!(row.coordinate, Coordinate::new(2, 1));

        let err = TitleJoin
            .correlate(&id, &record("Beta", None, Some(1)), &index)
            .unwrap_err();
        assert!(matches!(err, AnnotateError::UnmatchedTrack { .. }));
        Ok(())
    }

    #[test]
    fn test_strategy_dispatch() -> anyhow::Result<()> {
        let doc = two_disk_doc()?;
        let index = index_rows(&doc, &Selectors::default(), 3)?;
        let id = TrackId("1".into());
        let beta = record("Beta", None, Some(2));

        for strategy in [Strategy::Coordinate, Strategy::Title] {
            let row = strategy.correlator().correlate(&id, &beta, &index)?;
            assert_eq!(row.title_text, "2. Beta");
        }
        Ok(())
    }
}
