use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

/// track key the episode site uses for subtitled servers
pub const SUBTITLED_TRACK: &str = "SUB";

lazy_static! {
    // non greedy on purpose, the payload ends at the first `};`
    static ref VIDEOS_ASSIGNMENT: Regex =
        Regex::new(r"(?s)var\s+videos\s*=\s*(\{.*?\});").expect("videos regex should compile");
}

#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    #[error("no `var videos` assignment in the page")]
    NotFound,
    #[error("videos payload is not valid json: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub code: String,
    pub language_track: String,
}

/// per language servers as embedded in an episode page, in the page's order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerManifest {
    tracks: BTreeMap<String, Vec<ServerEntry>>,
}

impl ServerManifest {
    pub fn track(&self, name: &str) -> &[ServerEntry] {
        self.tracks.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn subtitled(&self) -> &[ServerEntry] {
        self.track(SUBTITLED_TRACK)
    }

    pub fn track_names(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }
}

/// Finds the `var videos = {...};` assignment in an episode page and parses it.
///
/// Malformed json is an error, nothing gets partially recovered from a truncated payload.
pub fn extract_manifest(html: &str) -> Result<ServerManifest, ManifestError> {
    let payload = VIDEOS_ASSIGNMENT
        .captures(html)
        .and_then(|c| c.get(1))
        .ok_or(ManifestError::NotFound)?
        .as_str();

    // the trailing `;` isn't part of the capture
    let raw: BTreeMap<String, Value> = serde_json::from_str(payload)?;

    let tracks = raw
        .into_iter()
        .filter_map(|(track, value)| match value {
            Value::Array(servers) => {
                let entries = servers
                    .iter()
                    .filter_map(|server| server.get("code").and_then(Value::as_str))
                    .map(|code| ServerEntry {
                        code: code.to_string(),
                        language_track: track.clone(),
                    })
                    .collect::<Vec<_>>();
                Some((track, entries))
            }
            _ => {
                debug!("skipping non array video track {}", track);
                None
            }
        })
        .collect();

    Ok(ServerManifest { tracks })
}
