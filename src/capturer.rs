//! Capture orchestration over one shared headless-browser session

use crate::config::{CaptureOptions, CapturerOptions};
use crate::events::{CaptureEvent, EventBus, Progress};
use crate::output::{self, CaptureFormat, CaptureOutput, FormatError, OutputTarget};
use crate::page::{PageRenderer, RenderError};
use crate::source::{self, SourceError};
use crate::viewport::{self, ResolvedViewport, ViewportError, ViewportSpec};
use base64::{engine::general_purpose, Engine as _};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, Headers, SetExtraHttpHeadersParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

/// Capturer errors: configuration failures are raised before any I/O, session
/// failures indicate the shared browser is no longer usable
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Viewport \"{0}\" is not supported")]
    UnsupportedViewport(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Page error: {0}")]
    PageError(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Capture produced no result")]
    EmptyResult,
}

/// Errors scoped to one source; they mark the result and never abort the batch
#[derive(Error, Debug)]
enum RunError {
    #[error(transparent)]
    Viewport(#[from] ViewportError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to build output path: {0}")]
    OutputPath(std::io::Error),

    #[error("Failed to write output file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The outcome of capturing one source, one entry per batch input
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    pub input: String,
    /// Absent only when an error occurred
    pub output: Option<CaptureOutput>,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Browser session lifecycle; operations other than `capture`'s lazy launch
/// are only valid in `Ready`
enum SessionState {
    Uninitialized,
    Ready { browser: Browser, page: Page },
    Closed,
}

/// Captures webpages into rendered artifacts through one shared browser
/// session and page.
///
/// Sources are processed strictly one at a time: the underlying page is a
/// single mutable resource and concurrent navigation on it would corrupt
/// results. The session is launched lazily on the first capture and lives
/// until [`WebCapturer::close`].
pub struct WebCapturer {
    options: CapturerOptions,
    output_dir: PathBuf,
    default_viewport: ResolvedViewport,
    state: Arc<RwLock<SessionState>>,
    events: Arc<RwLock<EventBus>>,
    /// Monotonic capture counter, disambiguates output names for sources
    /// without a hostname
    counter: AtomicU64,
}

impl std::fmt::Debug for WebCapturer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebCapturer")
            .field("options", &self.options)
            .field("output_dir", &self.output_dir)
            .field("default_viewport", &self.default_viewport)
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl WebCapturer {
    /// Validate the configuration and prepare the output directory. The
    /// browser is not touched until the first capture.
    pub fn new(options: CapturerOptions) -> Result<Self, CaptureError> {
        let default_viewport = match &options.viewport {
            Some(spec) => viewport::resolve(spec)
                .ok()
                .and_then(|mut v| if v.is_empty() { None } else { Some(v.remove(0)) })
                .ok_or_else(|| CaptureError::UnsupportedViewport(spec_label(spec)))?,
            None => CapturerOptions::fallback_viewport(),
        };

        std::fs::create_dir_all(&options.output_dir).map_err(|source| CaptureError::OutputDir {
            path: options.output_dir.clone(),
            source,
        })?;
        let output_dir =
            std::fs::canonicalize(&options.output_dir).map_err(|source| CaptureError::OutputDir {
                path: options.output_dir.clone(),
                source,
            })?;

        Ok(Self {
            options,
            output_dir,
            default_viewport,
            state: Arc::new(RwLock::new(SessionState::Uninitialized)),
            events: Arc::new(RwLock::new(EventBus::new())),
            counter: AtomicU64::new(0),
        })
    }

    /// Directory receiving file artifacts
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Register an observer for capture progress events
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<CaptureEvent> {
        self.events.write().await.subscribe()
    }

    async fn emit(&self, event: CaptureEvent) {
        self.events.write().await.emit(event);
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.options.timeout_ms)
    }

    /// Capture every source with the given options, returning one result per
    /// effective source in input order.
    ///
    /// Empty input yields an empty result list without launching a session.
    /// Per-source failures are recorded on their result and the batch
    /// continues; only session-level failures abort the call.
    pub async fn capture<I, S>(
        &self,
        sources: I,
        options: CaptureOptions,
    ) -> Result<Vec<CaptureResult>, CaptureError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inputs: Vec<String> = sources
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.trim().is_empty())
            .collect();
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let page = self.ensure_ready().await?;
        let sources = source::prepare(inputs)?;
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let renderer = PageRenderer::new(page, self.timeout());
        let total = sources.len();
        let mut results = Vec::with_capacity(total);

        for (index, input) in sources.into_iter().enumerate() {
            let current = index + 1;
            let progress = Progress {
                input: input.clone(),
                total,
                current,
                remaining: total - current,
            };
            self.emit(CaptureEvent::Started {
                progress: progress.clone(),
            })
            .await;

            let started = Instant::now();
            let outcome = self.run(&renderer, &input, &options).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let result = match outcome {
                Ok(output) => CaptureResult {
                    input,
                    output,
                    duration_ms,
                    error: None,
                },
                Err(e) => {
                    let error = e.to_string();
                    warn!(input = %input, %error, "capture failed");
                    self.emit(CaptureEvent::Failed {
                        progress: progress.clone(),
                        error: error.clone(),
                    })
                    .await;
                    CaptureResult {
                        input,
                        output: None,
                        duration_ms,
                        error: Some(error),
                    }
                }
            };

            self.emit(CaptureEvent::Finished {
                progress,
                output: result.output.clone(),
                duration_ms,
                error: result.error.clone(),
            })
            .await;

            self.counter.fetch_add(1, Ordering::SeqCst);
            results.push(result);
        }

        Ok(results)
    }

    /// Capture one source as a base64 PNG string
    pub async fn base64(
        &self,
        source: &str,
        mut options: CaptureOptions,
    ) -> Result<CaptureResult, CaptureError> {
        options.format = CaptureFormat::Base64;
        self.single(source, options).await
    }

    /// Capture one source as raw screenshot bytes
    pub async fn buffer(
        &self,
        source: &str,
        mut options: CaptureOptions,
    ) -> Result<CaptureResult, CaptureError> {
        options.format = CaptureFormat::Buffer;
        self.single(source, options).await
    }

    /// Capture one source to the given output path; the format is taken from
    /// the path's extension, defaulting to PNG when it has none
    pub async fn file(
        &self,
        source: &str,
        output: &str,
        mut options: CaptureOptions,
    ) -> Result<CaptureResult, CaptureError> {
        options.format = match Path::new(output).extension().and_then(|e| e.to_str()) {
            Some(extension) => extension.parse::<CaptureFormat>()?,
            None => CaptureFormat::Png,
        };
        options.name = Some(output.to_string());
        self.single(source, options).await
    }

    async fn single(
        &self,
        source: &str,
        options: CaptureOptions,
    ) -> Result<CaptureResult, CaptureError> {
        let mut results = self.capture([source], options).await?;
        if results.is_empty() {
            return Err(CaptureError::EmptyResult);
        }
        Ok(results.remove(0))
    }

    /// Close the session; further captures fail with [`CaptureError::SessionClosed`]
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        if let SessionState::Ready { mut browser, .. } =
            std::mem::replace(&mut *state, SessionState::Closed)
        {
            info!("closing browser");
            if let Err(e) = browser.close().await {
                warn!("failed to close browser gracefully: {e}");
            }
        }
    }

    /// Hand out the shared page, launching the session on first use
    async fn ensure_ready(&self) -> Result<Page, CaptureError> {
        {
            let state = self.state.read().await;
            match &*state {
                SessionState::Ready { page, .. } => return Ok(page.clone()),
                SessionState::Closed => return Err(CaptureError::SessionClosed),
                SessionState::Uninitialized => {}
            }
        }

        let mut state = self.state.write().await;
        // Another caller may have prepared the session while we waited
        match &*state {
            SessionState::Ready { page, .. } => return Ok(page.clone()),
            SessionState::Closed => return Err(CaptureError::SessionClosed),
            SessionState::Uninitialized => {}
        }

        let (browser, page) = self.launch().await?;
        *state = SessionState::Ready {
            browser,
            page: page.clone(),
        };
        Ok(page)
    }

    /// Launch the browser, open the shared page and apply session defaults
    async fn launch(&self) -> Result<(Browser, Page), CaptureError> {
        info!(debug = self.options.debug, "launching browser");

        let mut builder = BrowserConfig::builder()
            .viewport(chromiumoxide::handler::viewport::Viewport {
                width: self.default_viewport.width,
                height: self.default_viewport.height,
                device_scale_factor: Some(self.default_viewport.device_scale_factor),
                emulating_mobile: self.default_viewport.is_mobile,
                is_landscape: self.default_viewport.is_landscape,
                has_touch: self.default_viewport.has_touch,
            })
            .request_timeout(self.timeout());

        if self.options.debug {
            builder = builder.with_head();
        }
        for arg in &self.options.launch_args {
            builder = builder.arg(arg.clone());
        }

        let config = builder
            .build()
            .map_err(|e| CaptureError::LaunchFailed(format!("failed to build config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;

        tokio::task::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| CaptureError::PageError(e.to_string()))?;

        if !self.options.headers.is_empty() {
            page.execute(EnableParams::default())
                .await
                .map_err(|e| CaptureError::PageError(e.to_string()))?;
            let headers = SetExtraHttpHeadersParams::builder()
                .headers(Headers::new(serde_json::json!(self.options.headers)))
                .build()
                .map_err(CaptureError::PageError)?;
            page.execute(headers)
                .await
                .map_err(|e| CaptureError::PageError(e.to_string()))?;
        }

        let renderer = PageRenderer::new(page.clone(), self.timeout());
        renderer
            .apply_viewport(&self.default_viewport)
            .await
            .map_err(|e| CaptureError::PageError(e.to_string()))?;

        info!("browser ready");
        Ok((browser, page))
    }

    /// Expand one source over its effective viewports and render each
    async fn run(
        &self,
        renderer: &PageRenderer,
        input: &str,
        options: &CaptureOptions,
    ) -> Result<Option<CaptureOutput>, RunError> {
        let viewports = if let Some(category) = &options.viewport_category {
            viewport::resolve_category(category)
        } else if let Some(spec) = &options.viewport {
            viewport::resolve(spec)?
        } else {
            Vec::new()
        };

        // No viewport spec: keep the session default, no explicit switch
        if viewports.is_empty() {
            let output = self.render(renderer, input, options, None).await?;
            return Ok(Some(output));
        }

        let mut outputs = Vec::with_capacity(viewports.len());
        for viewport in &viewports {
            outputs.push(self.render(renderer, input, options, Some(viewport)).await?);
        }
        Ok(CaptureOutput::from_list(outputs))
    }

    /// Render one (source, viewport) combination into the requested artifact
    async fn render(
        &self,
        renderer: &PageRenderer,
        input: &str,
        options: &CaptureOptions,
        viewport: Option<&ResolvedViewport>,
    ) -> Result<CaptureOutput, RunError> {
        if let Some(viewport) = viewport {
            renderer.apply_viewport(viewport).await?;
        }

        renderer
            .load(input, options.wait_until.unwrap_or_default())
            .await?;
        renderer.inject_styles(&options.styles).await?;
        renderer.inject_scripts(&options.scripts).await?;

        if let Some(wait) = &options.wait_for {
            renderer.wait_for(wait).await?;
        }

        let selector = options.selector.as_deref();

        match options.format {
            CaptureFormat::Buffer => {
                let data = renderer
                    .screenshot(selector, false, options.quality, options.full_page)
                    .await?;
                Ok(CaptureOutput::Bytes(data))
            }
            CaptureFormat::Base64 => {
                // Image type forced to PNG for a stable encoding
                let data = renderer
                    .screenshot(selector, false, None, options.full_page)
                    .await?;
                Ok(CaptureOutput::Base64(general_purpose::STANDARD.encode(data)))
            }
            CaptureFormat::Html => {
                let path = self.output_path(input, options, viewport)?;
                let content = renderer.content().await?;
                tokio::fs::write(&path, content)
                    .await
                    .map_err(|source| RunError::Write {
                        path: path.clone(),
                        source,
                    })?;
                Ok(CaptureOutput::File(path))
            }
            CaptureFormat::Pdf => {
                let path = self.output_path(input, options, viewport)?;
                renderer
                    .save_pdf(&options.pdf.unwrap_or_default(), &path)
                    .await?;
                Ok(CaptureOutput::File(path))
            }
            CaptureFormat::Png | CaptureFormat::Jpeg => {
                let path = self.output_path(input, options, viewport)?;
                let jpeg = options.format == CaptureFormat::Jpeg;
                let data = renderer
                    .screenshot(selector, jpeg, options.quality, options.full_page)
                    .await?;
                tokio::fs::write(&path, data)
                    .await
                    .map_err(|source| RunError::Write {
                        path: path.clone(),
                        source,
                    })?;
                Ok(CaptureOutput::File(path))
            }
        }
    }

    fn output_path(
        &self,
        input: &str,
        options: &CaptureOptions,
        viewport: Option<&ResolvedViewport>,
    ) -> Result<PathBuf, RunError> {
        output::build_path(
            &self.output_dir,
            &OutputTarget {
                input,
                name: options.name.as_deref(),
                viewport: viewport.and_then(|v| v.name.as_deref()),
                format: options.format,
                counter: self.counter.load(Ordering::SeqCst),
            },
        )
        .map_err(RunError::OutputPath)
    }
}

/// Human-readable label for configuration error messages
fn spec_label(spec: &ViewportSpec) -> String {
    match spec {
        ViewportSpec::Name(name) => name.clone(),
        ViewportSpec::Size(side) => side.to_string(),
        other => format!("{other:?}"),
    }
}
