//! Webpage capture CLI

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use webcapture::{
    init_logging, CaptureEvent, CaptureFormat, CaptureOptions, CapturerOptions, ViewportSpec,
    WaitFor, WebCapturer,
};

#[derive(Parser)]
#[command(name = "webcapture")]
#[command(about = "Capture webpages as screenshots, PDFs or HTML", long_about = None)]
struct Cli {
    /// URLs, local .html/.txt files or literal HTML to capture
    #[arg(required = true)]
    targets: Vec<String>,

    /// Run the browser with a visible window
    #[arg(short, long)]
    debug: bool,

    /// Crop screenshots to the viewport instead of the full page
    #[arg(short, long)]
    crop: bool,

    /// Where to render the output files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Timeout for engine operations (milliseconds)
    #[arg(short, long, default_value_t = 30_000)]
    timeout: u64,

    /// Capture only the first element matching this CSS selector
    #[arg(short, long)]
    selector: Option<String>,

    /// Output format: png, jpeg, pdf, html, base64 or buffer
    #[arg(short, long, default_value = "png", value_parser = parse_format)]
    format: CaptureFormat,

    /// Viewport name or WxH dimensions, repeatable for multi-viewport capture
    #[arg(short, long)]
    viewport: Vec<String>,

    /// Capture all devices in a category: desktop, touch, mobile, landscape
    /// or a device-name filter
    #[arg(long)]
    viewport_category: Option<String>,

    /// Wait after load: a number of milliseconds or a CSS selector
    #[arg(long)]
    wait_for: Option<String>,

    /// JPEG quality (0-100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: Option<u8>,
}

fn parse_format(value: &str) -> Result<CaptureFormat, String> {
    value.parse::<CaptureFormat>().map_err(|e| e.to_string())
}

fn parse_wait_for(value: &str) -> WaitFor {
    match value.parse::<u64>() {
        Ok(ms) => WaitFor::Millis(ms),
        Err(_) => WaitFor::Selector(value.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    let capturer = WebCapturer::new(CapturerOptions {
        debug: cli.debug,
        output_dir: cli.output_dir,
        timeout_ms: cli.timeout,
        ..Default::default()
    })
    .context("invalid capturer configuration")?;

    let viewport = match cli.viewport.len() {
        0 => None,
        1 => Some(ViewportSpec::Name(cli.viewport[0].clone())),
        _ => Some(ViewportSpec::from(
            cli.viewport.iter().map(|v| ViewportSpec::Name(v.clone())).collect::<Vec<_>>(),
        )),
    };

    let options = CaptureOptions {
        format: cli.format,
        viewport,
        viewport_category: cli.viewport_category,
        selector: cli.selector,
        wait_for: cli.wait_for.as_deref().map(parse_wait_for),
        full_page: !cli.crop,
        quality: cli.quality,
        ..Default::default()
    };

    // Print progress as events arrive while the batch runs
    let mut events = capturer.subscribe().await;
    let reporter = tokio::task::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::Started { progress } => {
                    println!(
                        "[{}/{}] capturing {}",
                        progress.current, progress.total, progress.input
                    );
                }
                CaptureEvent::Finished {
                    progress,
                    output,
                    duration_ms,
                    error,
                } => match error {
                    None => {
                        let target = output
                            .map(|o| serde_json::to_string(&o).unwrap_or_default())
                            .unwrap_or_default();
                        println!(
                            "[{}/{}] done in {}ms: {}",
                            progress.current, progress.total, duration_ms, target
                        );
                    }
                    Some(error) => eprintln!(
                        "[{}/{}] failed after {}ms: {}",
                        progress.current, progress.total, duration_ms, error
                    ),
                },
                CaptureEvent::Failed { .. } => {}
            }
        }
    });

    let output_dir = capturer.output_dir().display().to_string();
    let outcome = capturer.capture(cli.targets, options).await;
    capturer.close().await;

    // Dropping the capturer ends the event stream and flushes the reporter
    drop(capturer);
    reporter.await.ok();

    let results = outcome.context("capture failed")?;

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    println!(
        "captured {} source(s), {} failed, output dir: {}",
        results.len(),
        failed,
        output_dir
    );

    Ok(())
}
