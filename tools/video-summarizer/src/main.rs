//! To run the program, please execute the following commands in your terminal:
//!
//! 1.  **Set the environment variable for your API key** (or put it in `.env`):
//!     ```bash
//!     export GOOGLE_API_KEY="YOUR_GOOGLE_API_KEY"
//!     ```
//! 2.  **Serve the browser UI:**
//!     ```bash
//!     cargo r -p video-summarizer -- serve
//!     ```
//!     then open <http://127.0.0.1:8501>, upload a video and ask a question.
//! 3.  **Or analyze a single file from the terminal:**
//!     ```bash
//!     cargo r -p video-summarizer -- analyze clip.mp4 --query "What is happening in this video?"
//!     ```

mod cli;
mod page;
mod web;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use log::{info, warn, LevelFilter};
use video_insight::{Orchestrator, Outcome, UploadedVideo};

use crate::cli::{max_upload_bytes, Cli, Command};

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.filter_level(LevelFilter::Info),
    };
    builder.init();
}

/// Runs one attempt on a local file and prints the answer to stdout.
async fn analyze_file(orchestrator: &Orchestrator, path: &Path, query: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| eyre!("{} is not a file", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let video = UploadedVideo::from_file_name(file_name, bytes)?;

    let report = orchestrator.analyze(video, query).await;
    info!("Attempt went through {:?}", report.trajectory);
    match report.outcome {
        Outcome::Done(response) => {
            info!(
                "Answered by {} after {} tool calls",
                response.model, response.tool_calls
            );
            println!("{}", response.content);
            Ok(())
        }
        Outcome::Rejected(err) => {
            warn!("{err}");
            Err(err.into())
        }
        Outcome::Failed(err) => Err(err).wrap_err("An error occurred during analysis"),
        Outcome::TimedOut {
            name,
            attempts,
            waited,
        } => Err(eyre!(
            "{name} was still processing after {attempts} checks ({waited:?})"
        )),
    }
}

/// Main entry point for the application.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    init_logger();

    // --- 1. Setup ---
    let cli = Cli::parse();
    let orchestrator = cli
        .settings
        .startup()
        .wrap_err("Google API Key not found. Please set it in a .env file as GOOGLE_API_KEY.")?;
    let orchestrator = Arc::new(orchestrator);

    // --- 2. Run ---
    match cli.command {
        Command::Analyze { video, query } => analyze_file(&orchestrator, &video, &query).await,
        Command::Serve {
            listen,
            max_upload_mb,
        } => {
            let router = web::router(
                orchestrator,
                &cli.settings.model,
                max_upload_bytes(max_upload_mb),
            );
            web::serve(router, listen).await
        }
    }
}
