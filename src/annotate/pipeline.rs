use std::{collections::VecDeque, thread, time::Duration};

use log::{info, warn};

use crate::{
    annotate::{
        correlate::Strategy,
        render::{attach, is_annotated, render},
    },
    config::Selectors,
    deezer::TrackSource,
    dom::Document,
    domain::{
        host::HostContext,
        track::{RemoteTrack, TrackId},
    },
    error::AnnotateError,
    page::{index::index_rows, metadata::extract_track_ids},
};

/// Serial request queue. Requests go out one at a time, in page order, and
/// each successful one is followed by a fixed pause to go easy on the public
/// API. A failed request ends the pass, so it is returned without a pause.
pub struct FetchQueue {
    pending: VecDeque<TrackId>,
    delay: Duration,
}

impl FetchQueue {
    pub fn new(ids: Vec<TrackId>, delay: Duration) -> Self {
        Self {
            pending: ids.into(),
            delay,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn fetch_next(
        &mut self,
        source: &dyn TrackSource,
    ) -> Option<Result<(TrackId, RemoteTrack), AnnotateError>> {
        let id = self.pending.pop_front()?;
        let record = match source.fetch(&id) {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Some(Ok((id, record)))
    }
}

pub struct PassOptions<'a> {
    pub strategy: Strategy,
    pub delay: Duration,
    pub host: Option<&'a HostContext>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub annotated: usize,
    /// Rows that already carried an annotation.
    pub skipped: usize,
}

/// Annotates every track row of `doc` in place.
///
/// Stops at the first error. Rows annotated before that keep their
/// annotation, so the document is worth writing out either way.
pub fn annotate_page(
    doc: &mut Document,
    selectors: &Selectors,
    source: &dyn TrackSource,
    options: &PassOptions,
) -> Result<RunReport, AnnotateError> {
    let ids = extract_track_ids(doc, &selectors.meta)?;
    let index = index_rows(doc, selectors, ids.len())?;
    info!("found {} tracks on the page", ids.len());

    let correlator = options.strategy.correlator();
    let mut queue = FetchQueue::new(ids, options.delay);
    let mut report = RunReport::default();

    while let Some(fetched) = queue.fetch_next(source) {
        let (id, record) = fetched?;
        if let Some(remote_id) = record.id.filter(|rid| rid.to_string() != id.as_str()) {
            // the page id stays authoritative for the row and host lookups
            warn!("track {id} came back as {remote_id}");
        }
        let row = correlator.correlate(&id, &record, &index)?;

        if is_annotated(doc, row.label) {
            warn!("row {} is already annotated, skipping track {id}", row.coordinate);
            report.skipped += 1;
            continue;
        }

        let annotation = render(&id, &record, options.host)?;
        attach(doc, row.label, &annotation);
        info!(
            "[{}] {} -> {} ({} left)",
            row.coordinate,
            row.title_text,
            annotation.text,
            queue.remaining()
        );
        report.annotated += 1;
    }

    Ok(report)
}
