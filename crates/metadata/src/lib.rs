use std::collections::BTreeMap;
use std::path::Path;

use lofty::error::LoftyError;
use lofty::prelude::{ItemKey, TaggedFileExt};
use lofty::tag::Tag;

pub const ALBUM: &str = "album";
pub const GENRE: &str = "genre";
pub const ALBUM_ARTIST: &str = "albumartist";
pub const DATE: &str = "date";

/// Tag fields of one audio file, keyed by field name.
///
/// A missing key and an empty value list mean the same thing: the field is absent.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagFields {
    fields: BTreeMap<String, Vec<String>>,
}

impl TagFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.fields.insert(key.into(), values);
    }

    pub fn get(&self, key: &str) -> &[String] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of `key`, verbatim.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for TagFields {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        let mut tags = TagFields::new();
        for (key, values) in iter {
            tags.insert(key, values);
        }
        tags
    }
}

#[derive(Debug)]
pub enum MetadataError {
    Lofty(LoftyError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// Reads the tag fields of a single audio file.
///
/// Implementations are shared by every scan worker, so they must be `Sync`.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TagFields, MetadataError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read_tags(&self, path: &Path) -> Result<TagFields, MetadataError> {
        read_tags(path)
    }
}

pub fn read_tags(path: &Path) -> Result<TagFields, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let fields = match tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        Some(tag) => fields_from_tag(tag),
        None => TagFields::new(),
    };
    Ok(fields)
}

fn fields_from_tag(tag: &Tag) -> TagFields {
    let mut date = strings(tag, &ItemKey::RecordingDate);
    if date.is_empty() {
        date = strings(tag, &ItemKey::Year);
    }

    [
        (ALBUM, strings(tag, &ItemKey::AlbumTitle)),
        (GENRE, strings(tag, &ItemKey::Genre)),
        (ALBUM_ARTIST, strings(tag, &ItemKey::AlbumArtist)),
        (DATE, date),
    ]
    .into_iter()
    .filter(|(_, values)| !values.is_empty())
    .collect()
}

fn strings(tag: &Tag, key: &ItemKey) -> Vec<String> {
    tag.get_strings(key).map(|v| v.to_string()).collect()
}
