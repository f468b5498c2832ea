mod export;
mod extract;
mod scan;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

pub use common::{Album, AlbumKey, AudioFormat};
pub use export::{default_destination, export_albums, ExportFormat, ExportOptions};
pub use extract::{album_from_tags, extract_album};
pub use metadata::{LoftyTagReader, MetadataError, TagFields, TagReader};
pub use scan::{collect_audio_files, scan_albums, unique_albums, AlbumScan, ScanStats};

#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Number of worker threads reading tags.
    pub concurrency: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get(),
        }
    }
}

/// A validated music root, ready to be scanned and exported.
#[derive(Clone, Debug)]
pub struct Library {
    root: PathBuf,
    options: ScanOptions,
}

impl Library {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, LibraryError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(LibraryError::InvalidRoot(root.to_path_buf()));
        }
        let root = fs::canonicalize(root)?;
        Ok(Self {
            root,
            options: ScanOptions::default(),
        })
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scan<R: TagReader + ?Sized>(&self, reader: &R) -> Result<AlbumScan, LibraryError> {
        let files = collect_audio_files(&self.root);
        info!("Found {} audio files under {:?}", files.len(), self.root);
        scan_albums(files, &self.root, reader, self.options.concurrency)
    }

    /// Writes `albums` according to `options` and returns the path written.
    pub fn export(
        &self,
        albums: &[Album],
        options: &ExportOptions,
    ) -> Result<PathBuf, LibraryError> {
        let destination = options
            .destination
            .clone()
            .unwrap_or_else(|| default_destination(&self.root, options.format));
        export_albums(albums, &destination, options)?;
        info!("Wrote {} albums to {:?}", albums.len(), destination);
        Ok(destination)
    }
}

#[derive(Debug)]
pub enum LibraryError {
    InvalidRoot(PathBuf),
    Io(std::io::Error),
    Json(serde_json::Error),
    Sqlite(rusqlite::Error),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::InvalidRoot(path) => {
                write!(f, "invalid music directory: {}", path.display())
            }
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Json(err) => write!(f, "json error: {}", err),
            LibraryError::Sqlite(err) => write!(f, "sqlite error: {}", err),
            LibraryError::ThreadPool(err) => write!(f, "thread pool error: {}", err),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Json(err)
    }
}

impl From<rusqlite::Error> for LibraryError {
    fn from(err: rusqlite::Error) -> Self {
        LibraryError::Sqlite(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for LibraryError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        LibraryError::ThreadPool(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        match Library::open(&missing) {
            Err(LibraryError::InvalidRoot(path)) => assert_eq!(path, missing),
            other => panic!("expected invalid root, got {:?}", other),
        }
    }

    #[test]
    fn open_rejects_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.mp3");
        fs::write(&file, b"").unwrap();
        assert!(matches!(
            Library::open(&file),
            Err(LibraryError::InvalidRoot(_))
        ));
    }

    #[test]
    fn corrupt_file_yields_untagged_album_and_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let broken_dir = dir.path().join("Broken").join("Disc");
        let other_dir = dir.path().join("Other");
        fs::create_dir_all(&broken_dir).unwrap();
        fs::create_dir_all(&other_dir).unwrap();
        fs::write(broken_dir.join("01.flac"), b"garbage").unwrap();
        fs::write(other_dir.join("01.flac"), b"more garbage").unwrap();

        let library = Library::open(dir.path())
            .unwrap()
            .with_options(ScanOptions { concurrency: 2 });
        let scan = library.scan(&LoftyTagReader).unwrap();

        let mut albums = scan.albums;
        albums.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            albums,
            vec![
                Album::untagged("/Broken/Disc".to_string()),
                Album::untagged("/Other".to_string()),
            ]
        );
        assert_eq!(scan.stats.tag_errors, 2);
    }

    #[test]
    fn export_defaults_next_to_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("music");
        fs::create_dir(&root).unwrap();
        let library = Library::open(&root).unwrap();
        let albums = vec![Album::untagged("/A".to_string())];

        let json = library.export(&albums, &ExportOptions::default()).unwrap();
        assert_eq!(json, library.root().join("_mpd.json"));
        assert!(json.is_file());

        let options = ExportOptions {
            format: ExportFormat::Sqlite,
            ..ExportOptions::default()
        };
        let db = library.export(&albums, &options).unwrap();
        assert_eq!(db.file_name().unwrap(), "music_mpd.db");
        assert_eq!(db.parent(), library.root().parent());
        assert!(db.is_file());
    }
}
