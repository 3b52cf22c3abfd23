use crate::{
    deezer::TrackSource,
    domain::track::{RemoteTrack, TrackId},
    error::AnnotateError,
};

/// Blocking client for `GET {base_url}/track/{id}`.
///
/// No request timeout is set: a hung request stalls the pass, which then
/// has to be interrupted by hand.
pub struct DeezerClient {
    base_url: String,
    http_client: ureq::Agent,
}

impl DeezerClient {
    pub fn new(base_url: &str) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .user_agent(concat!("deezer-avail/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    pub fn track_url(&self, id: &TrackId) -> String {
        format!("{}/track/{}", self.base_url, id)
    }
}

impl TrackSource for DeezerClient {
    fn fetch(&self, id: &TrackId) -> Result<RemoteTrack, AnnotateError> {
        let url = self.track_url(id);
        log::debug!("GET {url}");

        let fetch_error = |reason: String| AnnotateError::Fetch {
            id: id.clone(),
            reason,
        };

        let response = self.http_client.get(&url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => fetch_error(format!("HTTP status {code}")),
            ureq::Error::Transport(transport) => fetch_error(transport.to_string()),
        })?;

        response
            .into_json::<RemoteTrack>()
            .map_err(|e| fetch_error(format!("invalid track body: {e}")))
    }
}
