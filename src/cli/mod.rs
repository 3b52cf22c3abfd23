use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    annotate::{
        correlate::Strategy,
        pipeline::{PassOptions, annotate_page},
        render::render,
    },
    config::Config,
    deezer::{TrackSource, client::DeezerClient},
    dom::Document,
    domain::{host::HostContext, track::TrackId},
    page::{
        host_state::extract_app_state, index::index_rows, metadata::extract_track_ids,
        metadata::parse_track_url,
    },
};

#[derive(Parser)]
#[command(name = "deezer-avail")]
#[command(version)]
#[command(about = "Shows in which countries each track of a Deezer album page is available")]
pub struct Cli {
    /// Path to the config TOML file. Without it, ./deezer-avail.toml is used
    /// when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Annotate every track row of a saved album page
    Annotate(AnnotateArgs),
    /// Show the track ids and rows found on a page, without fetching anything
    Index {
        /// Saved album page (HTML)
        page: PathBuf,
    },
    /// Fetch a single track and print its availability
    Track {
        /// Track id or track URL
        id: String,
    },
}

#[derive(Args)]
pub struct AnnotateArgs {
    /// Saved album page (HTML)
    pub page: PathBuf,

    /// Where to write the annotated page, stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// How fetched tracks are matched to rows
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Viewer's licence country, enables the "subbed / unavailable" notes
    #[arg(long)]
    pub license_country: Option<String>,

    /// Pause after every API request, in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Ignore the application state embedded in the page
    #[arg(long)]
    pub no_host_state: bool,
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Annotate(args) => annotate(&cfg, &args),
        Commands::Index { page } => index(&cfg, &page),
        Commands::Track { id } => track(&cfg, &id),
    }
}

fn read_page(path: &Path) -> anyhow::Result<Document> {
    let html = fs::read_to_string(path)
        .with_context(|| format!("Failed to read page {}", path.display()))?;
    Document::parse(&html).with_context(|| format!("Failed to parse page {}", path.display()))
}

fn host_context(
    doc: &Document,
    args: &AnnotateArgs,
    cfg: &Config,
) -> anyhow::Result<Option<HostContext>> {
    if args.no_host_state {
        return Ok(None);
    }
    // API country codes are upper case and compared exactly
    let Some(license_country) = args
        .license_country
        .as_deref()
        .or(cfg.annotate.license_country.as_deref())
        .map(|country| country.trim().to_ascii_uppercase())
    else {
        log::debug!("no licence country given, skipping subbed/unavailable notes");
        return Ok(None);
    };

    match extract_app_state(doc).context("Failed to read the page application state")? {
        Some(app_state) => Ok(Some(HostContext {
            license_country,
            app_state,
        })),
        None => {
            warn!("page has no __DZR_APP_STATE__, skipping subbed/unavailable notes");
            Ok(None)
        }
    }
}

fn annotate(cfg: &Config, args: &AnnotateArgs) -> anyhow::Result<()> {
    let mut doc = read_page(&args.page)?;
    let host = host_context(&doc, args, cfg)?;
    let options = PassOptions {
        strategy: args.strategy.unwrap_or(cfg.annotate.strategy),
        delay: args
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| cfg.api.delay()),
        host: host.as_ref(),
    };
    let client = DeezerClient::new(&cfg.api.base_url);

    let result = annotate_page(&mut doc, &cfg.selectors, &client, &options);

    // Partial results are still written: rows annotated before a failure stay.
    let written = write_output(args.out.as_deref(), &doc.to_html());

    let report = match (result, written) {
        (Ok(report), written) => {
            written?;
            report
        }
        (Err(e), Ok(())) => return Err(anyhow::Error::new(e).context("Annotation pass aborted")),
        (Err(e), Err(write_err)) => {
            return Err(write_err.context(format!(
                "Annotation pass aborted ({e}) and the partial page was not saved"
            )));
        }
    };
    info!(
        "annotated {} track(s), {} already annotated",
        report.annotated, report.skipped
    );
    Ok(())
}

fn write_output(out: Option<&Path>, html: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => fs::write(path, html)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(html.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn index(cfg: &Config, page: &Path) -> anyhow::Result<()> {
    let doc = read_page(page)?;
    let ids = extract_track_ids(&doc, &cfg.selectors.meta)?;
    let index = index_rows(&doc, &cfg.selectors, ids.len())?;

    println!("Metadata lists {} tracks:", ids.len());
    for id in &ids {
        println!("    - {id}");
    }
    println!("Track list rows:");
    for row in index.rows() {
        println!("  [{}]  {}", row.coordinate, row.title_text);
    }
    Ok(())
}

fn parse_track_arg(arg: &str) -> anyhow::Result<TrackId> {
    let arg = arg.trim();
    if !arg.is_empty() && arg.chars().all(|c| c.is_ascii_digit()) {
        return Ok(TrackId(arg.to_string()));
    }
    match parse_track_url(arg) {
        Some(id) => Ok(id),
        None => bail!("{arg:?} is neither a track id nor a track URL"),
    }
}

fn track(cfg: &Config, arg: &str) -> anyhow::Result<()> {
    let id = parse_track_arg(arg)?;
    let client = DeezerClient::new(&cfg.api.base_url);
    let record = client.fetch(&id)?;
    let annotation = render(&id, &record, None)?;

    match record.coordinate() {
        Some(coordinate) => println!("[{coordinate}]  {}", record.title),
        None => println!("{}", record.title),
    }
    println!("{}", annotation.text);
    Ok(())
}
