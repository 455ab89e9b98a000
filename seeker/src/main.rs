mod config;
mod error;
mod library;
mod server;

use crate::config::Settings;
use crate::error::SeekerError;
use crate::library::{open_media, Library};
use clap::{Parser as ClapParser, Subcommand};
use futures_util::StreamExt;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

#[derive(ClapParser, Debug)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "seeker.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the manifest of a configured media as JSON
    Probe { media: String },
    /// Write the stream that starts at a seek time
    Dump {
        media: String,
        /// Seconds, negative values count back from the end
        #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
        time: f64,
        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Serve `GET /<media>?t=<seconds>` over HTTP
    Serve,
}

fn main() {
    // Logs go to stderr so `dump` can write the stream to stdout.
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::Layer::default()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_names(false)
                .with_ansi(true)
                .with_line_number(false)
                .with_file(false)
                .with_thread_ids(false),
        );
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set a global logger instance");

    let cli = Cli::parse();
    let settings = match Settings::load(cli.config.as_str()) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let runtime = match common::runtime::build("seeker", settings.runtime.threads) {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli.command, settings)) {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(command: Command, settings: Settings) -> Result<(), SeekerError> {
    match command {
        Command::Probe { media } => probe(&settings, &media).await,
        Command::Dump {
            media,
            time,
            output,
        } => dump(&settings, &media, time, output.as_deref()).await,
        Command::Serve => serve(settings).await,
    }
}

async fn probe(settings: &Settings, name: &str) -> Result<(), SeekerError> {
    let media = find_media(settings, name)?;
    let file = open_media(media, settings.seek.epsilon).await?;
    let manifest = file.manifest().await?;
    let json = serde_json::to_string_pretty(&*manifest)
        .map_err(|e| SeekerError::IoError(format!("encode manifest: {}", e)))?;

    println!("{}", json);
    Ok(())
}

async fn dump(
    settings: &Settings,
    name: &str,
    time: f64,
    output: Option<&str>,
) -> Result<(), SeekerError> {
    let media = find_media(settings, name)?;
    let file = open_media(media, settings.seek.epsilon).await?;
    let stream = file.stream(time).await?;
    info!("{}: seek to {}s starts at {}s", name, time, stream.start_time());

    let written = match output {
        Some(path) => {
            let out = tokio::fs::File::create(path)
                .await
                .map_err(|e| SeekerError::IoError(format!("create {}: {}", path, e)))?;
            write_stream(stream, out).await?
        }
        None => write_stream(stream, tokio::io::stdout()).await?,
    };

    info!("{}: wrote {} bytes", name, written);
    Ok(())
}

async fn write_stream<S, W>(mut stream: S, mut out: W) -> Result<u64, SeekerError>
where
    S: futures_util::Stream<Item = webm_seek::Result<bytes::Bytes>> + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        out.write_all(&chunk)
            .await
            .map_err(|e| SeekerError::IoError(format!("write: {}", e)))?;
        written += chunk.len() as u64;
    }

    out.flush()
        .await
        .map_err(|e| SeekerError::IoError(format!("flush: {}", e)))?;
    Ok(written)
}

async fn serve(settings: Settings) -> Result<(), SeekerError> {
    let library = Arc::new(Library::open(&settings).await?);
    info!("media: {}", library.names().collect::<Vec<_>>().join(", "));
    let shutdown = Arc::new(Notify::new());
    common::systemd::run(shutdown.clone())
        .map_err(|e| SeekerError::IoError(format!("install signal handlers: {}", e)))?;

    server::start(shutdown, &settings.http, library).await?;
    info!("done");
    Ok(())
}

fn find_media<'a>(settings: &'a Settings, name: &str) -> Result<&'a config::Media, SeekerError> {
    settings
        .media(name)
        .ok_or_else(|| SeekerError::ConfigError(format!("unknown media '{}'", name)))
}
