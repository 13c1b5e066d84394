use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use ocr_client::{AuthConfig, DEFAULT_ENDPOINT, ExtractionClient, RemoteExtractionClient, UploadPayload};
use ocr_types::TaskState;
use tracing_subscriber::EnvFilter;
use upload_tracking::{NoOpUploadEventHandler, TaskSnapshot, TrackerConfig, UploadEventHandler, UploadTracker};

const USER_AGENT: &str = concat!("ocrctl", "/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
struct OcrCommand {
    #[clap(flatten)]
    overrides: CliOverrides,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CliOverrides {
    /// Extraction service endpoint.
    #[clap(long)]
    endpoint: Option<String>, // if not specified we use env:OCR_ENDPOINT
    /// Bearer token for the extraction service.
    #[clap(long)]
    token: Option<String>, // if not specified we use env:OCR_TOKEN
}

impl OcrCommand {
    async fn run(self) -> Result<()> {
        let endpoint = self
            .overrides
            .endpoint
            .unwrap_or_else(|| std::env::var("OCR_ENDPOINT").unwrap_or(DEFAULT_ENDPOINT.to_owned()));
        let token = self
            .overrides
            .token
            .unwrap_or_else(|| std::env::var("OCR_TOKEN").unwrap_or_default());

        let auth = (!token.is_empty()).then(|| AuthConfig {
            token: Some(token),
            ..Default::default()
        });
        let client = Arc::new(RemoteExtractionClient::new(&endpoint, &auth, USER_AGENT)?);

        self.command.run(client).await
    }
}

#[derive(Subcommand)]
enum Command {
    /// Uploads travel-document scans and tracks them until every task resolves.
    Upload(UploadArgs),
    /// Lists the destination labels the extraction service accepts.
    Destinations,
}

#[derive(Args)]
struct UploadArgs {
    /// Paths of the scans to upload.
    files: Vec<PathBuf>,
    /// Destination label attached to the whole batch.
    #[clap(long)]
    destination: Option<String>,
    /// Give up waiting for resolution after this many seconds.
    #[clap(long, default_value_t = 300)]
    timeout: u64,
    /// Suppress per-task progress output; only the final summary is printed.
    #[clap(short, long)]
    quiet: bool,
}

/// Announces each resolved task on stderr as it happens.
#[derive(Debug, Default)]
struct PrintingEvents;

#[async_trait]
impl UploadEventHandler for PrintingEvents {
    async fn task_resolved(&self, task: TaskSnapshot) {
        eprintln!("{}: {} ({})", task.file_name, task.status, task.progress_note);
    }

    async fn batch_closed(&self) {}
}

impl Command {
    async fn run(self, client: Arc<RemoteExtractionClient>) -> Result<()> {
        match self {
            Command::Upload(arg) => {
                if arg.files.is_empty() {
                    anyhow::bail!("No files to upload.");
                }

                let mut payloads = Vec::with_capacity(arg.files.len());
                for path in &arg.files {
                    payloads.push(UploadPayload::from_path(path).await?);
                }

                let events: Arc<dyn UploadEventHandler> = if arg.quiet {
                    NoOpUploadEventHandler::new()
                } else {
                    Arc::new(PrintingEvents)
                };
                let tracker = UploadTracker::new(client, events, TrackerConfig::default());

                eprintln!("Uploading {} file(s)...", payloads.len());
                tracker.add_files(payloads).await;
                tracker.submit_waiting(arg.destination).await;

                let all_resolved = async {
                    loop {
                        if tracker.snapshot().await.iter().all(|t| t.status.is_terminal()) {
                            break;
                        }
                        tokio::time::sleep(Duration::from_millis(250)).await;
                    }
                };
                if tokio::time::timeout(Duration::from_secs(arg.timeout), all_resolved).await.is_err() {
                    for task in tracker.snapshot().await.iter().filter(|t| !t.status.is_terminal()) {
                        eprintln!("{}: still {} ({})", task.file_name, task.status, task.progress_note);
                    }
                    anyhow::bail!("Timed out after {}s with unresolved tasks.", arg.timeout);
                }

                let mut n_failed = 0;
                for task in tracker.snapshot().await {
                    match &task.result {
                        Some(result) => {
                            let pages = result.get("successful_pages").and_then(serde_json::Value::as_u64).unwrap_or(0);
                            println!("{}: {} ({} page(s) extracted)", task.file_name, task.status, pages);
                        },
                        None => println!("{}: {} ({})", task.file_name, task.status, task.progress_note),
                    }
                    if task.status == TaskState::Failure {
                        n_failed += 1;
                    }
                }

                if n_failed > 0 {
                    anyhow::bail!("{n_failed} file(s) failed.");
                }
                Ok(())
            },
            Command::Destinations => {
                for destination in client.list_destinations().await? {
                    println!("{destination}");
                }
                Ok(())
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = OcrCommand::parse();
    cli.run().await
}
