#![forbid(unsafe_code)]

//! Command-line front end. Each subcommand is one discrete operator action;
//! `session` chains them in the usual order: search, pick a video, load
//! comments, generate the script.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use log::{LevelFilter, debug, info};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};
use ytscript_tools::{
    config::{self, Settings},
    error::Error,
    models::{CommentList, ScriptRequest, SearchResultSet, VideoSummary, format_views},
    script,
    security::ApiKey,
    sheets::{self, SheetsClient},
    youtube::{self, YouTubeClient},
};

const PREVIEW_COMMENTS: usize = 10;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Search videos by views, load comments from a Google Sheet and generate a local Selenium script."
)]
struct Cli {
    #[arg(
        long = "config",
        value_name = "PATH",
        default_value = config::DEFAULT_CONFIG_PATH,
        global = true,
        help = "Path to the KEY=VALUE settings file"
    )]
    config: PathBuf,
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        help = "Log debug output to stderr"
    )]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search videos by keyword and list them by view count
    Search(SearchArgs),
    /// Load comment lines from a Google Sheet
    Comments(CommentsArgs),
    /// Generate the Selenium script for one video
    Generate(GenerateArgs),
    /// Search, pick a result and generate its script in one go
    Session(SessionArgs),
}

#[derive(Args, Debug)]
struct SearchFlags {
    #[arg(short = 'n', long = "limit", value_name = "N", help = "Number of results (5-25)")]
    limit: Option<u32>,
    #[arg(long = "api-key", value_name = "KEY", help = "YouTube Data API key")]
    api_key: Option<String>,
}

#[derive(Args, Debug)]
struct SearchArgs {
    #[arg(help = "Search keyword, e.g. 'python tutorial'")]
    keyword: String,
    #[command(flatten)]
    search: SearchFlags,
    #[arg(long = "json", help = "Print results as JSON")]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct SheetArgs {
    #[arg(long = "sheet-id", value_name = "ID", help = "Google Sheet id from its URL")]
    sheet_id: Option<String>,
    #[arg(
        long = "range",
        value_name = "RANGE",
        help = "Sheet name and range, e.g. Sheet1!A:A"
    )]
    range: Option<String>,
    #[arg(
        long = "service-account",
        value_name = "PATH",
        conflicts_with = "service_account_json",
        help = "Service account JSON key file"
    )]
    service_account: Option<PathBuf>,
    #[arg(
        long = "service-account-json",
        value_name = "JSON",
        help = "Service account JSON key content"
    )]
    service_account_json: Option<String>,
}

#[derive(Args, Debug)]
struct CommentsArgs {
    #[command(flatten)]
    sheet: SheetArgs,
    #[arg(long = "json", help = "Print all comments as JSON")]
    json: bool,
}

#[derive(Args, Debug, Default)]
struct ActionArgs {
    #[arg(
        long = "watch-seconds",
        value_name = "SECONDS",
        help = "Seconds to watch before acting (minimum 5)"
    )]
    watch_seconds: Option<u64>,
    #[arg(long = "like", help = "Emit the like block")]
    like: bool,
    #[arg(long = "comment", help = "Emit the comment loop")]
    comment: bool,
    #[arg(long = "subscribe", help = "Emit the subscribe block")]
    subscribe: bool,
    #[arg(
        long = "comments-file",
        value_name = "PATH",
        help = "Read comments from a text file, one per line, instead of a sheet"
    )]
    comments_file: Option<PathBuf>,
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help = "Write the script here instead of stdout"
    )]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("target")
        .args(["url", "video_id"])
        .required(true)
        .multiple(false)
))]
struct GenerateArgs {
    #[arg(long = "url", value_name = "URL", help = "Video URL to open")]
    url: Option<String>,
    #[arg(long = "video-id", value_name = "ID", help = "Video id to open")]
    video_id: Option<String>,
    #[command(flatten)]
    actions: ActionArgs,
    #[command(flatten)]
    sheet: SheetArgs,
}

#[derive(Args, Debug)]
struct SessionArgs {
    #[arg(help = "Search keyword")]
    keyword: String,
    #[arg(
        long = "pick",
        value_name = "N",
        default_value_t = 1,
        help = "Position of the video to use in the ranked list"
    )]
    pick: usize,
    #[command(flatten)]
    search: SearchFlags,
    #[command(flatten)]
    actions: ActionArgs,
    #[command(flatten)]
    sheet: SheetArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code_for(&err)
        }
    }
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Bad input gets 2 so wrapper scripts can tell it apart from service failures.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::InvalidInput(_)) => ExitCode::from(2),
        Some(other) => {
            debug!("failed with {} error", other.kind());
            ExitCode::FAILURE
        }
        None => ExitCode::FAILURE,
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = config::load_settings_from(&cli.config)
        .with_context(|| format!("Loading settings from {}", cli.config.display()))?;
    debug!("settings loaded from {}", cli.config.display());

    match cli.command {
        Command::Search(args) => run_search(&settings, args),
        Command::Comments(args) => run_comments(&settings, args),
        Command::Generate(args) => run_generate(&settings, args),
        Command::Session(args) => run_session(&settings, args),
    }
}

fn run_search(settings: &Settings, args: SearchArgs) -> Result<()> {
    let results = search(settings, &args.keyword, &args.search)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }
    Ok(())
}

fn run_comments(settings: &Settings, args: CommentsArgs) -> Result<()> {
    let comments = load_sheet_comments(settings, &args.sheet)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&comments)?);
        return Ok(());
    }
    println!("Loaded {} comment(s) from the sheet.", comments.len());
    for comment in comments.preview(PREVIEW_COMMENTS) {
        println!("  - {comment}");
    }
    if comments.len() > PREVIEW_COMMENTS {
        println!("  ... and {} more", comments.len() - PREVIEW_COMMENTS);
    }
    Ok(())
}

fn run_generate(settings: &Settings, args: GenerateArgs) -> Result<()> {
    let target_url = match (args.url, args.video_id) {
        (Some(url), _) => url,
        (None, Some(id)) => VideoSummary::watch_url(id.trim()),
        (None, None) => return Err(Error::invalid_input("a --url or --video-id is required").into()),
    };
    generate_for(settings, target_url, &args.actions, &args.sheet)
}

fn run_session(settings: &Settings, args: SessionArgs) -> Result<()> {
    let results = search(settings, &args.keyword, &args.search)?;
    print_results(&results);
    let chosen = results.select(args.pick)?;
    println!();
    println!(
        "Selected: {} ({} views)",
        chosen.title,
        format_views(chosen.view_count)
    );
    println!("  {}", chosen.url);
    generate_for(settings, chosen.url.clone(), &args.actions, &args.sheet)
}

fn search(settings: &Settings, keyword: &str, flags: &SearchFlags) -> Result<SearchResultSet> {
    let key = resolve_api_key(flags.api_key.as_deref(), settings)?;
    let limit = flags.limit.unwrap_or(settings.search_limit);
    let results = youtube::search(&YouTubeClient::new(), keyword, limit, &key)?;
    Ok(results)
}

fn resolve_api_key(flag: Option<&str>, settings: &Settings) -> Result<ApiKey> {
    let raw = flag
        .or(settings.youtube_api_key.as_deref())
        .unwrap_or_default();
    Ok(ApiKey::new(raw)?)
}

fn generate_for(
    settings: &Settings,
    target_url: String,
    actions: &ActionArgs,
    sheet: &SheetArgs,
) -> Result<()> {
    let comments = if actions.comment {
        load_comments_for_script(settings, actions, sheet)?
    } else {
        CommentList::default()
    };
    let request = build_request(settings, target_url, actions, comments);
    request.validate()?;

    let generated = script::generate(&request);
    match &actions.output {
        Some(path) => {
            fs::write(path, generated.text())
                .with_context(|| format!("Writing script to {}", path.display()))?;
            println!(
                "Saved {} ({} bytes, {}) to {}",
                generated.file_name(),
                generated.text().len(),
                generated.mime_type(),
                path.display()
            );
            println!("Run it locally with Chrome and chromedriver available.");
        }
        None => print!("{}", generated.text()),
    }
    Ok(())
}

fn build_request(
    settings: &Settings,
    target_url: String,
    actions: &ActionArgs,
    comments: CommentList,
) -> ScriptRequest {
    ScriptRequest {
        target_url,
        comments,
        watch_seconds: actions.watch_seconds.unwrap_or(settings.watch_seconds),
        enable_like: actions.like,
        enable_comment: actions.comment,
        enable_subscribe: actions.subscribe,
    }
}

fn load_comments_for_script(
    settings: &Settings,
    actions: &ActionArgs,
    sheet: &SheetArgs,
) -> Result<CommentList> {
    match &actions.comments_file {
        Some(path) => read_comments_file(path),
        None => load_sheet_comments(settings, sheet),
    }
}

fn read_comments_file(path: &Path) -> Result<CommentList> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Reading comments from {}", path.display()))?;
    let comments = CommentList::from_text(&text);
    info!("read {} comment(s) from {}", comments.len(), path.display());
    Ok(comments)
}

fn load_sheet_comments(settings: &Settings, sheet: &SheetArgs) -> Result<CommentList> {
    let document = read_credential_document(settings, sheet)?;
    let sheet_id = sheet
        .sheet_id
        .as_deref()
        .or(settings.sheet_id.as_deref())
        .unwrap_or_default();
    let range = sheet.range.as_deref().unwrap_or(&settings.sheet_range);
    let comments = sheets::load_comments(&SheetsClient::new(), &document, sheet_id, range)?;
    Ok(comments)
}

/// Pasted JSON wins over a key file; the settings file is the last resort.
/// The document is only held for the duration of the load.
fn read_credential_document(settings: &Settings, sheet: &SheetArgs) -> Result<String> {
    if let Some(json) = &sheet.service_account_json {
        return Ok(json.clone());
    }
    let path = sheet
        .service_account
        .as_ref()
        .or(settings.service_account_file.as_ref());
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Reading service account key {}", path.display())),
        None => Ok(String::new()),
    }
}

fn print_results(results: &SearchResultSet) {
    if results.is_empty() {
        println!("No videos found.");
        return;
    }
    println!("Found {} video(s), ordered by views:", results.len());
    for (index, video) in results.videos().iter().enumerate() {
        println!(
            "{:>2}. {} | {} | {} views",
            index + 1,
            video.title,
            video.channel_title,
            format_views(video.view_count)
        );
        println!("    {}", video.url);
    }
}
