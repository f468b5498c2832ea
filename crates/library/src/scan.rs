use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{Album, AlbumKey, AudioFormat};
use metadata::TagReader;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::extract::extract_album;
use crate::LibraryError;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub files_found: usize,
    pub files_read: usize,
    pub files_skipped: usize,
    pub tag_errors: usize,
    pub albums_found: usize,
    pub albums: usize,
}

#[derive(Clone, Debug, Default)]
pub struct AlbumScan {
    pub albums: Vec<Album>,
    pub stats: ScanStats,
}

/// Every `.flac`, `.m4a` and `.mp3` file under `root`, sorted.
///
/// Symlinked files are kept; symlinked directories are not descended into.
pub fn collect_audio_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("Skipping unreadable entry: {}", err);
                continue;
            }
        };
        let is_file = if entry.path_is_symlink() {
            entry.path().is_file()
        } else {
            entry.file_type().is_file()
        };
        if !is_file {
            continue;
        }
        if AudioFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files
}

/// State shared by the workers of one `scan_albums` call.
#[derive(Default)]
struct ScanState {
    resolved: Mutex<HashSet<PathBuf>>,
    albums: Mutex<Vec<Album>>,
    files_read: AtomicUsize,
    files_skipped: AtomicUsize,
    tag_errors: AtomicUsize,
}

/// Drains `files` on a pool of `concurrency` threads, producing one album per
/// directory that holds audio files.
///
/// Checking and marking a directory as resolved are separate steps, so two
/// workers can both extract a directory they pick up at the same moment. The
/// final `unique_albums` pass removes those duplicates.
pub fn scan_albums<R: TagReader + ?Sized>(
    files: Vec<PathBuf>,
    root: &Path,
    reader: &R,
    concurrency: usize,
) -> Result<AlbumScan, LibraryError> {
    let files_found = files.len();
    let workers = concurrency.max(1).min(files_found.max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("tag-reader-{}", index))
        .build()?;
    let state = ScanState::default();

    info!("Reading tags with {} workers", workers);
    pool.install(|| {
        files
            .par_iter()
            .for_each(|file| read_album(&state, file, root, reader));
    });

    let found = state.albums.into_inner();
    let albums_found = found.len();
    let albums = unique_albums(found);

    let stats = ScanStats {
        files_found,
        files_read: state.files_read.into_inner(),
        files_skipped: state.files_skipped.into_inner(),
        tag_errors: state.tag_errors.into_inner(),
        albums_found,
        albums: albums.len(),
    };
    info!(
        "Scanned {} files: {} read, {} skipped, {} tag errors, {} albums",
        stats.files_found, stats.files_read, stats.files_skipped, stats.tag_errors, stats.albums
    );

    Ok(AlbumScan { albums, stats })
}

fn read_album<R: TagReader + ?Sized>(state: &ScanState, file: &Path, root: &Path, reader: &R) {
    let dir = file.parent().unwrap_or(root);
    if state.resolved.lock().contains(dir) {
        state.files_skipped.fetch_add(1, Ordering::Relaxed);
        return;
    }

    // No lock is held while the file is read.
    let tags = reader.read_tags(file);
    state.files_read.fetch_add(1, Ordering::Relaxed);
    if tags.is_err() {
        state.tag_errors.fetch_add(1, Ordering::Relaxed);
    }
    let album = extract_album(file, root, tags);
    debug!("Resolved {:?} as {:?}", dir, album.name);

    state.albums.lock().push(album);
    state.resolved.lock().insert(dir.to_path_buf());
}

/// Keeps the first album seen for each (name, path) key, in order.
pub fn unique_albums(albums: Vec<Album>) -> Vec<Album> {
    let mut seen: HashSet<AlbumKey> = HashSet::with_capacity(albums.len());
    albums
        .into_iter()
        .filter(|album| seen.insert(album.key()))
        .collect()
}
