//! Page-level render step: emulation, content loading, resource injection and
//! capture primitives

use crate::config::{PdfOptions, WaitFor, WaitUntil};
use crate::source;
use crate::viewport::ResolvedViewport;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams, PrintToPdfParams, Viewport,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Render errors for one (source, viewport) combination
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("No element matches selector: {0}")]
    ElementNotFound(String),

    #[error("Failed to read resource file: {0}")]
    Resource(#[from] std::io::Error),

    #[error("Invalid engine parameters: {0}")]
    InvalidParams(String),

    #[error("Unexpected engine payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<String> for RenderError {
    fn from(s: String) -> Self {
        RenderError::InvalidParams(s)
    }
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// A style or script resource, classified by how it must be loaded
#[derive(Debug, Clone, Copy, PartialEq)]
enum Resource<'a> {
    Remote(&'a str),
    LocalFile(&'a str),
    Inline(&'a str),
}

impl<'a> Resource<'a> {
    fn classify(value: &'a str) -> Self {
        if source::is_url(value) {
            Resource::Remote(value)
        } else if Path::new(value).is_file() {
            Resource::LocalFile(value)
        } else {
            Resource::Inline(value)
        }
    }
}

/// Drives a single browser page through one render: apply the viewport, load
/// the source, inject resources, wait, then produce the requested artifact.
pub struct PageRenderer {
    page: Page,
    timeout: Duration,
}

impl PageRenderer {
    pub fn new(page: Page, timeout: Duration) -> Self {
        Self { page, timeout }
    }

    /// Race an engine operation against the session timeout
    async fn engine<T, F>(&self, label: &str, operation: F) -> RenderResult<T>
    where
        F: Future<Output = chromiumoxide::error::Result<T>>,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| RenderError::Timeout(label.to_string()))?
            .map_err(|e| RenderError::Engine(e.to_string()))
    }

    /// Apply a resolved viewport to the page, emulating the full device
    /// profile when the viewport carries a user agent
    pub async fn apply_viewport(&self, viewport: &ResolvedViewport) -> RenderResult<()> {
        debug!(
            width = viewport.width,
            height = viewport.height,
            device = viewport.name.as_deref().unwrap_or("custom"),
            "applying viewport"
        );

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(viewport.device_scale_factor)
            .mobile(viewport.is_mobile)
            .build()?;
        self.engine("viewport override", self.page.execute(metrics))
            .await?;

        let touch = SetTouchEmulationEnabledParams::builder()
            .enabled(viewport.has_touch)
            .build()?;
        self.engine("touch emulation", self.page.execute(touch))
            .await?;

        if let Some(user_agent) = &viewport.user_agent {
            self.engine("user agent override", self.page.set_user_agent(user_agent.as_str()))
                .await?;
        }

        Ok(())
    }

    /// Load the source into the page: literal HTML is injected as content,
    /// anything else is navigated to as a URL
    pub async fn load(&self, source: &str, wait_until: WaitUntil) -> RenderResult<()> {
        if source::is_html(source) {
            self.engine("content injection", self.page.set_content(source))
                .await?;
            return Ok(());
        }

        self.engine("navigation", self.page.goto(source)).await?;

        match wait_until {
            WaitUntil::None => {}
            WaitUntil::Load | WaitUntil::DomContentLoaded => {
                self.engine("page load", self.page.wait_for_navigation())
                    .await?;
            }
            WaitUntil::NetworkIdle => {
                self.engine("page load", self.page.wait_for_navigation())
                    .await?;
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }

        Ok(())
    }

    /// Inject styles in declaration order
    pub async fn inject_styles(&self, styles: &[String]) -> RenderResult<()> {
        for style in styles {
            match Resource::classify(style) {
                Resource::Inline(css) => self.add_style_content(css).await?,
                Resource::LocalFile(path) => {
                    let css = tokio::fs::read_to_string(path).await?;
                    self.add_style_content(&css).await?;
                }
                Resource::Remote(url) => {
                    let expression = format!(
                        "new Promise((resolve, reject) => {{ \
                         const link = document.createElement('link'); \
                         link.rel = 'stylesheet'; \
                         link.href = {url}; \
                         link.onload = () => resolve(); \
                         link.onerror = () => reject(new Error('stylesheet failed to load')); \
                         document.head.appendChild(link); }})",
                        url = serde_json::to_string(url)?
                    );
                    self.evaluate_promise("stylesheet load", expression).await?;
                }
            }
        }
        Ok(())
    }

    async fn add_style_content(&self, css: &str) -> RenderResult<()> {
        let expression = format!(
            "(() => {{ const style = document.createElement('style'); \
             style.type = 'text/css'; \
             style.appendChild(document.createTextNode({css})); \
             document.head.appendChild(style); }})()",
            css = serde_json::to_string(css)?
        );
        self.engine("style injection", self.page.evaluate(expression))
            .await?;
        Ok(())
    }

    /// Inject scripts in declaration order; inline scripts execute before the
    /// next resource is processed
    pub async fn inject_scripts(&self, scripts: &[String]) -> RenderResult<()> {
        for script in scripts {
            match Resource::classify(script) {
                Resource::Inline(code) => self.add_script_content(code).await?,
                Resource::LocalFile(path) => {
                    let code = tokio::fs::read_to_string(path).await?;
                    self.add_script_content(&code).await?;
                }
                Resource::Remote(url) => {
                    let expression = format!(
                        "new Promise((resolve, reject) => {{ \
                         const script = document.createElement('script'); \
                         script.src = {url}; \
                         script.onload = () => resolve(); \
                         script.onerror = () => reject(new Error('script failed to load')); \
                         document.head.appendChild(script); }})",
                        url = serde_json::to_string(url)?
                    );
                    self.evaluate_promise("script load", expression).await?;
                }
            }
        }
        Ok(())
    }

    async fn add_script_content(&self, code: &str) -> RenderResult<()> {
        let expression = format!(
            "(() => {{ const script = document.createElement('script'); \
             script.type = 'text/javascript'; \
             script.text = {code}; \
             document.head.appendChild(script); }})()",
            code = serde_json::to_string(code)?
        );
        self.engine("script injection", self.page.evaluate(expression))
            .await?;
        Ok(())
    }

    /// Evaluate an expression that resolves a promise once its resource loaded
    async fn evaluate_promise(&self, label: &str, expression: String) -> RenderResult<()> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()?;
        self.engine(label, self.page.evaluate(params)).await?;
        Ok(())
    }

    /// Apply the optional post-load wait condition
    pub async fn wait_for(&self, wait: &WaitFor) -> RenderResult<()> {
        match wait {
            WaitFor::Millis(ms) => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            WaitFor::Selector(selector) => {
                self.find_element(selector, self.timeout).await?;
                Ok(())
            }
        }
    }

    /// Take a screenshot of the page, or of the first element matching the
    /// selector when one is given
    pub async fn screenshot(
        &self,
        selector: Option<&str>,
        jpeg: bool,
        quality: Option<u8>,
        full_page: bool,
    ) -> RenderResult<Vec<u8>> {
        let format = if jpeg {
            CaptureScreenshotFormat::Jpeg
        } else {
            CaptureScreenshotFormat::Png
        };
        let mut params = CaptureScreenshotParams::builder().format(format).build();

        // CDP rejects quality on PNG captures
        if jpeg {
            if let Some(quality) = quality {
                params.quality = Some(quality.min(100) as i64);
            }
        }

        if full_page {
            params.capture_beyond_viewport = Some(true);
        }

        if let Some(selector) = selector {
            params.clip = Some(self.element_clip(selector).await?);
        }

        let data = self.engine("screenshot", self.page.screenshot(params)).await?;

        if let Ok(img) = image::load_from_memory(&data) {
            debug!(width = img.width(), height = img.height(), bytes = data.len(), "captured image");
        }

        Ok(data)
    }

    /// Resolve a selector to its bounding-rect clip region
    async fn element_clip(&self, selector: &str) -> RenderResult<Viewport> {
        #[derive(Debug, Deserialize)]
        struct Rect {
            x: f64,
            y: f64,
            width: f64,
            height: f64,
        }

        // Wait for the element to exist before measuring it
        self.find_element(selector, self.timeout).await?;

        let expression = format!(
            "(() => {{ const el = document.querySelector({selector}); \
             if (!el) return null; \
             const r = el.getBoundingClientRect(); \
             return {{x: r.x, y: r.y, width: r.width, height: r.height}}; }})()",
            selector = serde_json::to_string(selector)?
        );

        let evaluation = self
            .engine("element measurement", self.page.evaluate(expression))
            .await?;
        let rect: Option<Rect> = evaluation
            .into_value()
            .map_err(|e| RenderError::Engine(e.to_string()))?;
        let rect = rect.ok_or_else(|| RenderError::ElementNotFound(selector.to_string()))?;

        Ok(Viewport::builder()
            .x(rect.x)
            .y(rect.y)
            .width(rect.width)
            .height(rect.height)
            .scale(1.0)
            .build()?)
    }

    /// Render the page to a PDF file at `output`
    pub async fn save_pdf(&self, options: &PdfOptions, output: &Path) -> RenderResult<()> {
        let params = PrintToPdfParams::builder()
            .landscape(options.landscape)
            .print_background(options.print_background)
            .scale(options.scale)
            .paper_width(options.paper_width)
            .paper_height(options.paper_height)
            .build();

        self.engine("pdf rendering", self.page.save_pdf(params, output))
            .await?;
        Ok(())
    }

    /// Serialized HTML content of the page
    pub async fn content(&self) -> RenderResult<String> {
        self.engine("content extraction", self.page.content()).await
    }

    /// Evaluate a script on the page, returning its JSON value
    pub async fn evaluate(&self, script: &str) -> RenderResult<serde_json::Value> {
        let evaluation = self.engine("evaluation", self.page.evaluate(script)).await?;
        evaluation
            .into_value()
            .map_err(|e| RenderError::Engine(e.to_string()))
    }

    /// Poll for an element until it appears or the timeout elapses
    async fn find_element(&self, selector: &str, timeout: Duration) -> RenderResult<Element> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.page.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(_) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(RenderError::ElementNotFound(selector.to_string()));
                    }
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}
