use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::track::TrackId;

/// Subset of the page's `__DZR_APP_STATE__` the annotator reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppState {
    #[serde(rename = "SONGS", default)]
    pub songs: SongList,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SongList {
    #[serde(default)]
    pub data: Vec<HostSong>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostSong {
    #[serde(rename = "SNG_ID")]
    pub id: String,
    /// Present when Deezer substitutes another recording in regions where
    /// this one is blocked. Only its presence matters, `null` included.
    #[serde(rename = "FALLBACK", default, deserialize_with = "present")]
    pub fallback: Option<Value>,
}

/// `Some` for any value the key carries. A missing key falls back to `default`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl HostSong {
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

impl AppState {
    pub fn song(&self, id: &TrackId) -> Option<&HostSong> {
        self.songs.data.iter().find(|song| song.id == id.as_str())
    }
}

/// What the viewer's player knows: their licence country and the page state.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub license_country: String,
    pub app_state: AppState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_app_state_songs() -> anyhow::Result<()> {
        let json = r#"{
            "DATA": {"ALB_ID": "302127"},
            "SONGS": {"data": [
                {"SNG_ID": "3135553", "SNG_TITLE": "One More Time"},
                {"SNG_ID": "3135554", "FALLBACK": {"SNG_ID": "99"}}
            ], "count": 2}
        }"#;

        let state: AppState = serde_json::from_str(json)?;

        assert_eq!(state.songs.data.len(), 2);
        let plain = state.song(&TrackId("3135553".into())).map(HostSong::has_fallback);
        let subbed = state.song(&TrackId("3135554".into())).map(HostSong::has_fallback);
        assert_eq!(plain, Some(false));
        assert_eq!(subbed, Some(true));
        assert!(state.song(&TrackId("1".into())).is_none());
        Ok(())
    }

    #[test]
    fn test_null_fallback_still_counts() -> anyhow::Result<()> {
        let state: AppState = serde_json::from_str(
            r#"{"SONGS": {"data": [{"SNG_ID": "1", "FALLBACK": null}, {"SNG_ID": "2"}]}}"#,
        )?;

        let with_null = state.song(&TrackId("1".into())).map(HostSong::has_fallback);
        let without_key = state.song(&TrackId("2".into())).map(HostSong::has_fallback);
        assert_eq!(with_null, Some(true));
        assert_eq!(without_key, Some(false));
        Ok(())
    }

    #[test]
    fn test_missing_songs_section_is_empty() -> anyhow::Result<()> {
        let state: AppState = serde_json::from_str(r#"{"DATA": {}}"#)?;

        assert!(state.songs.data.is_empty());
        Ok(())
    }
}
