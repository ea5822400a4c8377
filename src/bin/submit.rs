use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use deepfake_gateway::client::UploadClient;
use deepfake_gateway::models::upload::VideoFile;

/// Submit a video to the prediction gateway and print the verdict.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Video to analyze (mp4, avi, mov, mkv, webm; at most 100MB)
    video: PathBuf,

    /// Number of frames to sample, 10 to 100 in steps of 10
    #[arg(short, long, default_value_t = 40)]
    sequence_length: i64,

    /// Base URL of the gateway
    #[arg(short, long, env = "GATEWAY_URL", default_value = "http://localhost:3000")]
    gateway: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut client = match UploadClient::new(&args.gateway) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let video = match VideoFile::from_path(&args.video).await {
        Ok(video) => video,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", args.video.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = client.select_file(video).await {
        eprintln!("{}", e.notification());
        return ExitCode::FAILURE;
    }
    let sequence_length = client.set_sequence_length(args.sequence_length);

    let mut progress = client.progress();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            eprint!("\rProcessing... {:>3}%", *progress.borrow());
        }
    });

    eprintln!("Submitting with sequence length {sequence_length}");
    let outcome = client.submit().await;
    drop(client);
    let _ = reporter.await;
    eprintln!();

    match outcome {
        Ok(result) => match serde_json::to_string_pretty(&result) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to encode result: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("{}", e.notification());
            ExitCode::FAILURE
        }
    }
}
