use crate::{dom::Document, domain::host::AppState};

const STATE_MARKER: &str = "window.__DZR_APP_STATE__";

/// Reads the application state the page embeds as
/// `window.__DZR_APP_STATE__ = {...}` in an inline script.
///
/// Returns `Ok(None)` when no script carries it (e.g. a page saved after the
/// app replaced it).
pub fn extract_app_state(doc: &Document) -> anyhow::Result<Option<AppState>> {
    for script in doc.select("script")? {
        let body = doc.text_content(script);
        let Some(start) = body.find(STATE_MARKER) else {
            continue;
        };
        let Some(json) = body[start..].split_once('=').map(|(_, rest)| rest.trim_start()) else {
            continue;
        };

        let mut stream = serde_json::Deserializer::from_str(json).into_iter::<AppState>();
        return match stream.next() {
            Some(state) => Ok(Some(state?)),
            None => Ok(None),
        };
    }
    Ok(None)
}
