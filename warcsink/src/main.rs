#[macro_use]
extern crate log;

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{command, value_parser, Arg, ArgAction, ArgMatches};
use indicatif::ProgressBar;

use warcfmt::{Capture, Compression, Metadata};
use warcsink::rotation::parse_size;
use warcsink::{
    describe, CountSyncPolicy, FileSizeRotationPolicy, MoveFileAction, TimedRotationPolicy,
    WarcWriterBuilder,
};

const SOFTWARE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

fn cli() -> clap::Command<'static> {
    command!()
        .about("Archive local files into rotating, per-record compressed WARC files")
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .takes_value(true)
                .value_name("PREFIX")
                .value_parser(value_parser!(String))
                .default_value(warcsink::naming::DEFAULT_PREFIX)
                .help("Prefix of output file names"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .short('o')
                .takes_value(true)
                .value_name("DIR")
                .default_value(".")
                .value_parser(value_parser!(PathBuf))
                .help("Directory to write WARC files to"),
        )
        .arg(
            Arg::new("rotate-size")
                .long("rotate-size")
                .takes_value(true)
                .value_name("SIZE")
                .value_parser(parse_size)
                .help("Start a new file after SIZE uncompressed bytes, such as '1GB' or '512 MB' [default: 1GB]"),
        )
        .arg(
            Arg::new("rotate-interval")
                .long("rotate-interval")
                .takes_value(true)
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .conflicts_with("rotate-size")
                .help("Start a new file after it has been open for SECONDS"),
        )
        .arg(
            Arg::new("sync-every")
                .long("sync-every")
                .takes_value(true)
                .value_name("RECORDS")
                .default_value("1000")
                .value_parser(value_parser!(u64))
                .help("Flush files to stable storage every RECORDS records"),
        )
        .arg(
            Arg::new("worker-index")
                .long("worker-index")
                .takes_value(true)
                .value_name("INDEX")
                .default_value("0")
                .value_parser(value_parser!(u32))
                .help("Index of this process among parallel writers"),
        )
        .arg(
            Arg::new("worker-count")
                .long("worker-count")
                .takes_value(true)
                .value_name("COUNT")
                .default_value("1")
                .value_parser(value_parser!(u32))
                .help("Number of parallel writers sharing the output directory"),
        )
        .arg(
            Arg::new("uncompressed")
                .long("uncompressed")
                .action(ArgAction::SetTrue)
                .help("Write plain .warc files instead of gzip compressed records"),
        )
        .arg(
            Arg::new("content-type")
                .long("content-type")
                .takes_value(true)
                .value_name("TYPE")
                .value_parser(value_parser!(String))
                .help("Content-Type recorded for every file [default: application/octet-stream]"),
        )
        .arg(
            Arg::new("move-to")
                .long("move-to")
                .takes_value(true)
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Move completed WARC files into DIR"),
        )
        .arg(
            Arg::new("info")
                .long("info")
                .takes_value(true)
                .value_name("KEY=VALUE")
                .value_parser(value_parser!(String))
                .action(ArgAction::Append)
                .help("Add a field to the warcinfo record at the start of each file"),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .required(true)
                .multiple_values(true)
                .value_parser(value_parser!(PathBuf))
                .help("Files to archive"),
        )
}

fn main() {
    pretty_env_logger::init();
    let args = cli().get_matches();

    let writer = match configure(&args) {
        Ok(builder) => builder.build(),
        Err(message) => {
            error!("{}", message);
            exit(2);
        }
    };
    let content_type = args.get_one::<String>("content-type");
    let files: Vec<&PathBuf> = args
        .get_many::<PathBuf>("files")
        .map(|files| files.collect())
        .unwrap_or_default();

    let progress = ProgressBar::new(files.len() as u64);
    let mut failures = 0usize;
    for path in files {
        progress.set_message(path.display().to_string());
        if let Err(message) = archive(&writer, path, content_type.map(String::as_str)) {
            progress.suspend(|| error!("{}: {}", path.display(), message));
            failures += 1;
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if let Err(e) = writer.close() {
        error!("{}", describe(&e));
        failures += 1;
    }
    if failures > 0 {
        error!("{} operation(s) failed", failures);
        exit(1);
    }
}

/// Map command line arguments onto writer configuration.
fn configure(args: &ArgMatches) -> Result<WarcWriterBuilder, String> {
    let mut info = vec![
        ("software".to_owned(), SOFTWARE.to_owned()),
        ("format".to_owned(), "WARC File Format 1.0".to_owned()),
    ];
    for pair in args.get_many::<String>("info").into_iter().flatten() {
        match pair.split_once('=') {
            Some((key, value)) => info.push((key.trim().to_owned(), value.trim().to_owned())),
            None => return Err(format!("--info {:?} is not of the form KEY=VALUE", pair)),
        }
    }
    let header = warcfmt::warcinfo(info).map_err(|e| format!("invalid --info: {}", e))?;

    let mut builder = WarcWriterBuilder::new()
        .with_header(header)
        .with_sync_policy(CountSyncPolicy::new(
            args.get_one::<u64>("sync-every").copied().unwrap_or(1000),
        ))
        .with_worker(
            args.get_one::<u32>("worker-index").copied().unwrap_or(0),
            args.get_one::<u32>("worker-count").copied().unwrap_or(1),
        );
    if let Some(prefix) = args.get_one::<String>("prefix") {
        builder = builder.with_prefix(prefix.as_str());
    }
    if let Some(dir) = args.get_one::<PathBuf>("output-dir") {
        builder = builder.with_path(dir.clone());
    }
    if args.get_one::<bool>("uncompressed").copied().unwrap_or(false) {
        builder = builder.with_compression(Compression::None);
    }

    if let Some(&seconds) = args.get_one::<u64>("rotate-interval") {
        builder = builder.with_rotation_policy(TimedRotationPolicy::new(Duration::from_secs(seconds)));
    } else if let Some(&bytes) = args.get_one::<u64>("rotate-size") {
        builder = builder.with_rotation_policy(FileSizeRotationPolicy::from_bytes(bytes));
    }
    if let Some(dir) = args.get_one::<PathBuf>("move-to") {
        builder = builder.add_rotation_action(MoveFileAction::to_destination(dir.clone()));
    }

    Ok(builder)
}

/// Write one local file as a `resource` record.
fn archive(
    writer: &warcsink::WarcWriter,
    path: &Path,
    content_type: Option<&str>,
) -> Result<(), String> {
    let absolute = fs::canonicalize(path).map_err(|e| e.to_string())?;
    let content = fs::read(&absolute).map_err(|e| e.to_string())?;

    let mut metadata = Metadata::new();
    if let Some(content_type) = content_type {
        metadata = metadata.with_content_type(content_type);
    }
    let mut capture = Capture::new(file_url(&absolute))
        .with_content(content)
        .with_metadata(metadata);
    if let Ok(modified) = fs::metadata(&absolute).and_then(|m| m.modified()) {
        capture = capture.with_fetch_time(DateTime::<Utc>::from(modified));
    }

    writer.write_capture(&capture).map_err(|e| describe(&e))?;
    debug!("archived {} as {}", path.display(), capture.url());
    Ok(())
}

/// A `file:` URL for an absolute path.
///
/// Characters that are not allowed in a URI path are escaped, except for spaces and non-ASCII
/// characters which the record encoder escapes itself.
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy();
    let mut url = String::with_capacity(path.len() + 8);
    url.push_str("file://");
    if !path.starts_with('/') {
        url.push('/');
    }
    for c in path.chars() {
        match c {
            '\\' => url.push('/'),
            c if c == ' ' || !c.is_ascii() || c.is_ascii_alphanumeric() => url.push(c),
            '-' | '.' | '_' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ','
            | ';' | '=' | ':' | '@' | '/' => url.push(c),
            c => {
                let _ = write!(url, "%{:02X}", c as u32);
            }
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::{cli, configure, file_url};
    use std::path::Path;

    #[test]
    fn file_urls() {
        assert_eq!(file_url(Path::new("/tmp/a b.txt")), "file:///tmp/a b.txt");
        assert_eq!(
            file_url(Path::new("/tmp/50%#1?.txt")),
            "file:///tmp/50%25%231%3F.txt"
        );
        assert!(warcfmt::normalize_target_uri(&file_url(Path::new("/tmp/[x]|y"))).is_ok());
    }

    #[test]
    fn rejects_malformed_info() {
        let args = cli()
            .try_get_matches_from(vec!["warcsink", "--info", "operator", "file"])
            .unwrap();
        assert!(configure(&args).is_err());

        let args = cli()
            .try_get_matches_from(vec![
                "warcsink",
                "--info",
                "operator=someone",
                "--rotate-size",
                "10 MB",
                "file",
            ])
            .unwrap();
        assert!(configure(&args).is_ok());
    }

    #[test]
    fn rotation_options_conflict() {
        assert!(cli()
            .try_get_matches_from(vec![
                "warcsink",
                "--rotate-size",
                "1GB",
                "--rotate-interval",
                "60",
                "file",
            ])
            .is_err());
        assert!(cli()
            .try_get_matches_from(vec!["warcsink", "--rotate-size", "lots", "file"])
            .is_err());
    }
}
