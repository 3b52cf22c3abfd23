use crate::{
    dom::{Document, NodeId},
    domain::{
        host::HostContext,
        track::{RemoteTrack, TrackId},
    },
    error::AnnotateError,
};

/// Class every annotation span carries, used to spot earlier runs.
pub const ANNOTATION_CLASS: &str = "deezer-avail";

const SHOWN_WHEN_TRUNCATED: usize = 3;
const MAX_LISTED: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub track_id: TrackId,
    pub text: String,
    pub countries: Vec<String>,
}

/// Up to four countries are listed in full. Longer lists show the first
/// three and count the ones left out.
pub fn format_countries(countries: &[String]) -> String {
    if countries.len() <= MAX_LISTED {
        return countries.join(", ");
    }
    format!(
        "{}, and {} more!",
        countries[..SHOWN_WHEN_TRUNCATED].join(", "),
        countries.len() - SHOWN_WHEN_TRUNCATED
    )
}

pub fn availability_suffix(available_here: bool, has_fallback: bool) -> &'static str {
    match (available_here, has_fallback) {
        (true, _) => "",
        (false, true) => " | This track will be subbed!",
        (false, false) => " | This track is unavailable!",
    }
}

pub fn render(
    id: &TrackId,
    record: &RemoteTrack,
    host: Option<&HostContext>,
) -> Result<Annotation, AnnotateError> {
    let mut text = format!(
        "Available in: {}",
        format_countries(&record.available_countries)
    );

    if let Some(host) = host {
        let song = host
            .app_state
            .song(id)
            .ok_or_else(|| AnnotateError::UnknownHostTrack { id: id.clone() })?;
        text.push_str(availability_suffix(
            record.is_available_in(&host.license_country),
            song.has_fallback(),
        ));
    }

    Ok(Annotation {
        track_id: id.clone(),
        text,
        countries: record.available_countries.clone(),
    })
}

/// Whether `label` already holds an annotation from an earlier run.
pub fn is_annotated(doc: &Document, label: NodeId) -> bool {
    doc.children(label)
        .iter()
        .any(|child| doc.tag_name(*child) == Some("span") && doc.has_class(*child, ANNOTATION_CLASS))
}

/// Appends the annotation span to `label`. Right-clicking it prints the raw
/// country list to the browser console instead of opening the context menu.
pub fn attach(doc: &mut Document, label: NodeId, annotation: &Annotation) -> NodeId {
    let countries = serde_json::to_string(&annotation.countries).unwrap_or_else(|_| "[]".into());
    let on_context_menu = format!("event.preventDefault(); console.info({countries});");

    let span = doc.create_element(
        "span",
        &[
            ("class", ANNOTATION_CLASS),
            ("data-track-id", annotation.track_id.as_str()),
            ("style", "font-size: 10px"),
            ("oncontextmenu", on_context_menu.as_str()),
        ],
    );
    let text = doc.create_text(&annotation.text);
    doc.append_child(span, text);
    doc.append_child(label, span);

    log::debug!("track {} countries: {countries}", annotation.track_id);
    span
}
