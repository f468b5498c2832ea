use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use common::Album;
use rusqlite::{params, Connection};
use tracing::{debug, warn};

use crate::LibraryError;

const JSON_FILE_NAME: &str = "_mpd.json";
const DB_SUFFIX: &str = "_mpd.db";

const CREATE_ALBUMS_TABLE: &str = "CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    path TEXT NOT NULL
)";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Sqlite,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "sqlite" => Ok(ExportFormat::Sqlite),
            other => Err(format!("unknown export format '{}' (expected json or sqlite)", other)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Overrides the default file next to (or inside) the music root.
    pub destination: Option<PathBuf>,
    pub pretty: bool,
}

/// `<root>/_mpd.json` for JSON, `<root>_mpd.db` beside the root for SQLite.
pub fn default_destination(root: &Path, format: ExportFormat) -> PathBuf {
    match format {
        ExportFormat::Json => root.join(JSON_FILE_NAME),
        ExportFormat::Sqlite => match root.file_name() {
            Some(name) => {
                let mut file_name = name.to_os_string();
                file_name.push(DB_SUFFIX);
                root.with_file_name(file_name)
            }
            None => root.join(DB_SUFFIX),
        },
    }
}

/// Writes `albums` to `destination`.
///
/// The file is written under a temporary name and renamed into place, so a
/// failed export never leaves a half-written destination behind.
pub fn export_albums(
    albums: &[Album],
    destination: &Path,
    options: &ExportOptions,
) -> Result<(), LibraryError> {
    let tmp = temp_path(destination);
    if tmp.exists() {
        fs::remove_file(&tmp)?;
    }

    let written = match options.format {
        ExportFormat::Json => write_json(albums, &tmp, options.pretty),
        ExportFormat::Sqlite => write_sqlite(albums, &tmp),
    };
    let result = written.and_then(|()| fs::rename(&tmp, destination).map_err(LibraryError::from));

    if result.is_err() && tmp.exists() {
        if let Err(err) = fs::remove_file(&tmp) {
            warn!("Failed to remove {:?}: {}", tmp, err);
        }
    }
    result
}

fn write_json(albums: &[Album], path: &Path, pretty: bool) -> Result<(), LibraryError> {
    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, albums)?;
    } else {
        serde_json::to_writer(&mut writer, albums)?;
    }
    writer.flush()?;
    Ok(())
}

// Only name and path are stored; artist, genre and year exist in JSON exports only.
fn write_sqlite(albums: &[Album], path: &Path) -> Result<(), LibraryError> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(CREATE_ALBUMS_TABLE)?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("INSERT INTO albums (name, path) VALUES (?1, ?2)")?;
        for album in albums {
            stmt.execute(params![album.name, album.path])?;
        }
    }
    tx.commit()?;
    conn.close().map_err(|(_, err)| err)?;
    debug!("Inserted {} rows into {:?}", albums.len(), path);
    Ok(())
}

fn temp_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
