use std::path::Path;

use common::{album_path_from, Album};
use metadata::{MetadataError, TagFields, ALBUM, ALBUM_ARTIST, DATE, GENRE};
use tracing::warn;

/// Builds the album for the directory containing `file`.
///
/// A failed tag read still produces an album, with only its path set.
pub fn extract_album(
    file: &Path,
    root: &Path,
    tags: Result<TagFields, MetadataError>,
) -> Album {
    let dir = file.parent().unwrap_or(root);
    let path = album_path_from(root, dir);
    match tags {
        Ok(tags) => album_from_tags(path, &tags),
        Err(err) => {
            warn!("Failed to read tags for {:?}: {}", file, err);
            Album::untagged(path)
        }
    }
}

pub fn album_from_tags(path: String, tags: &TagFields) -> Album {
    Album {
        name: tags.first(ALBUM).unwrap_or_default().to_string(),
        path,
        year: tags.first(DATE).map(|date| year_of(date).to_string()),
        genre: tags.first(GENRE).map(str::to_string),
        artist: tags.first(ALBUM_ARTIST).map(str::to_string),
    }
}

fn year_of(date: &str) -> &str {
    date.split('-').next().unwrap_or(date)
}
