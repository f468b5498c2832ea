use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use library::{ExportFormat, ExportOptions, Library, LoftyTagReader, ScanOptions};
use tracing_subscriber::EnvFilter;

/// Reads an MPD music directory and writes its albums (name, path, artist,
/// genre, year) to `_mpd.json` or `<dir>_mpd.db`.
#[derive(Parser, Debug)]
#[command(name = "pretty_mpd_db", version, about)]
struct Args {
    /// MPD directory (same as music_directory in the mpd config file)
    #[arg(value_name = "DIR")]
    root: Option<PathBuf>,

    /// MPD directory, as a flag
    #[arg(short = 'd', value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Export format, also accepted as `-fmt`
    #[arg(short = 'f', long = "fmt", value_name = "FORMAT", default_value_t = ExportFormat::Json)]
    format: ExportFormat,

    /// Write here instead of the default location
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of tag reading threads (defaults to the CPU count)
    #[arg(short = 'j', long = "jobs")]
    jobs: Option<usize>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn music_root(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| self.root.clone())
            .or_else(|| env::var_os("MUSIC_ROOT").map(PathBuf::from))
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse_from(normalize_args(env::args_os()));
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let root = args
        .music_root()
        .ok_or("MUSIC_ROOT not set and no directory argument")?;

    let mut scan_options = ScanOptions::default();
    if let Some(jobs) = args.jobs {
        scan_options.concurrency = jobs;
    }
    let library = Library::open(&root)?.with_options(scan_options);

    let scan = library.scan(&LoftyTagReader)?;
    let export = ExportOptions {
        format: args.format,
        destination: args.output.clone(),
        pretty: args.pretty,
    };
    let written = library.export(&scan.albums, &export)?;

    println!(
        "Exported {} albums from {} files ({} tag errors) to {}",
        scan.stats.albums,
        scan.stats.files_found,
        scan.stats.tag_errors,
        written.display()
    );
    Ok(())
}

/// Rewrites the single-dash `-fmt` spelling into `--fmt`.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            if arg == "-fmt" {
                OsString::from("--fmt")
            } else if let Some(value) = arg.to_str().and_then(|a| a.strip_prefix("-fmt=")) {
                OsString::from(format!("--fmt={}", value))
            } else {
                arg
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(normalize_args(args.iter().map(OsString::from))).unwrap()
    }

    #[test]
    fn accepts_dash_d_and_fmt() {
        let args = parse(&["pretty_mpd_db", "-d", "/music", "-fmt", "sqlite"]);
        assert_eq!(args.dir, Some(PathBuf::from("/music")));
        assert_eq!(args.format, ExportFormat::Sqlite);
        assert_eq!(args.music_root(), Some(PathBuf::from("/music")));

        let args = parse(&["pretty_mpd_db", "-fmt=json", "/music"]);
        assert_eq!(args.format, ExportFormat::Json);
        assert_eq!(args.root, Some(PathBuf::from("/music")));
    }

    #[test]
    fn defaults_to_json() {
        let args = parse(&["pretty_mpd_db", "/music"]);
        assert_eq!(args.format, ExportFormat::Json);
        assert!(args.output.is_none());
        assert!(args.jobs.is_none());
        assert!(!args.pretty);
    }

    #[test]
    fn flag_wins_over_positional() {
        let args = parse(&["pretty_mpd_db", "-d", "/a", "/b"]);
        assert_eq!(args.music_root(), Some(PathBuf::from("/a")));
    }

    #[test]
    fn rejects_unknown_format() {
        let result = Args::try_parse_from(normalize_args(
            ["pretty_mpd_db", "-fmt", "csv", "/music"]
                .iter()
                .map(OsString::from),
        ));
        assert!(result.is_err());
    }

    #[test]
    fn run_fails_on_invalid_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let args = parse(&["pretty_mpd_db", "-d", missing.to_str().unwrap()]);
        assert!(run(&args).is_err());
    }

    #[test]
    fn run_writes_json_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let album_dir = dir.path().join("Artist").join("Album");
        fs::create_dir_all(&album_dir).unwrap();
        fs::write(album_dir.join("01.mp3"), b"not audio").unwrap();
        fs::write(album_dir.join("02.mp3"), b"not audio").unwrap();
        fs::write(album_dir.join("cover.jpg"), b"").unwrap();

        let args = parse(&["pretty_mpd_db", "-j", "2", dir.path().to_str().unwrap()]);
        run(&args).unwrap();

        let text = fs::read_to_string(dir.path().join("_mpd.json")).unwrap();
        let albums: Vec<library::Album> = serde_json::from_str(&text).unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].path, "/Artist/Album");
    }
}
