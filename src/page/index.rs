use std::collections::HashMap;

use crate::{
    config::Selectors,
    dom::{Document, NodeId},
    domain::track::Coordinate,
    error::AnnotateError,
};

/// One visible track row and the nodes the annotator needs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHandle {
    pub coordinate: Coordinate,
    /// Cell the annotation span is appended to.
    pub label: NodeId,
    pub title_text: String,
}

/// Track rows keyed by `"disk.position"`. Built once, read-only afterwards.
#[derive(Debug, Default)]
pub struct CorrelationIndex {
    rows: Vec<RowHandle>,
    by_key: HashMap<String, usize>,
}

impl CorrelationIndex {
    fn insert(&mut self, handle: RowHandle) {
        self.by_key
            .insert(handle.coordinate.key(), self.rows.len());
        self.rows.push(handle);
    }

    pub fn get(&self, key: &str) -> Option<&RowHandle> {
        self.by_key.get(key).map(|i| &self.rows[*i])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in document order.
    pub fn rows(&self) -> impl Iterator<Item = &RowHandle> {
        self.rows.iter()
    }
}

/// Walks the visible track list and assigns every row its coordinate.
///
/// Disk boundaries are only visible as separator rows between tracks, so the
/// disk counter advances whenever a row is directly followed by one.
pub fn index_rows(
    doc: &Document,
    selectors: &Selectors,
    expected: usize,
) -> Result<CorrelationIndex, AnnotateError> {
    let container = doc
        .select(&selectors.track_list)?
        .into_iter()
        .next()
        .ok_or(AnnotateError::MissingNode {
            what: "track list container",
            row: 0,
        })?;

    let rows = doc.select_from(container, &selectors.row)?;
    if rows.len() != expected {
        return Err(AnnotateError::StructuralMismatch {
            expected,
            found: rows.len(),
        });
    }

    let mut index = CorrelationIndex::default();
    let mut disk = 1;
    let mut position = 1;

    for (i, row) in rows.into_iter().enumerate() {
        let label = doc
            .select_first_from(row, &selectors.label)?
            .ok_or(AnnotateError::MissingNode {
                what: "label cell",
                row: i + 1,
            })?;
        let title = doc
            .select_first_from(label, &selectors.title)?
            .ok_or(AnnotateError::MissingNode {
                what: "title",
                row: i + 1,
            })?;
        let title_text = doc.text_content(title).trim().to_string();
        if title_text.is_empty() {
            return Err(AnnotateError::MissingNode {
                what: "title text",
                row: i + 1,
            });
        }

        index.insert(RowHandle {
            coordinate: Coordinate::new(disk, position),
            label,
            title_text,
        });
        position += 1;

        if let Some(next) = doc.next_element_sibling(row) {
            if doc.matches(next, &selectors.disk_separator)? {
                disk += 1;
                position = 1;
            }
        }
    }

    log::debug!("indexed {} track rows over {disk} disk(s)", index.len());
    Ok(index)
}
