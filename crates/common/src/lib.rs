use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use tracing::warn;

/// One album directory found under the music root.
///
/// Field order is the key order of the JSON export.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    pub path: String,
    pub year: Option<String>,
    pub genre: Option<String>,
    pub artist: Option<String>,
}

/// Identity of an album: two albums with the same name and path are the same album.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AlbumKey {
    pub name: String,
    pub path: String,
}

impl Album {
    pub fn untagged(path: String) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn key(&self) -> AlbumKey {
        AlbumKey {
            name: self.name.clone(),
            path: self.path.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioFormat {
    Flac,
    M4a,
    Mp3,
}

impl AudioFormat {
    /// Extensions are matched exactly as written; `track.MP3` is not an audio file here.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "flac" => Some(AudioFormat::Flac),
            "m4a" => Some(AudioFormat::M4a),
            "mp3" => Some(AudioFormat::Mp3),
            _ => None,
        }
    }
}

/// Path of `dir` relative to `root`, always with exactly one leading `/`.
///
/// The root itself maps to `/`. A directory outside of `root` keeps its full
/// path, still normalized to a single leading slash.
pub fn album_path_from(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    format!("/{}", path_to_slash_string(rel))
}

fn path_to_slash_string(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .map(|part| match part.to_str() {
            Some(text) => text.to_string(),
            None => {
                let lossy = part.to_string_lossy().to_string();
                warn!("Directory name {:?} is not valid UTF-8; exported as {:?}", part, lossy);
                lossy
            }
        })
        .collect();
    parts.join("/")
}
