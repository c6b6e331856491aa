//! Capturer and per-call capture configuration

use crate::output::CaptureFormat;
use crate::viewport::{RawViewport, ResolvedViewport, ViewportSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Session-wide capturer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturerOptions {
    /// Run the browser with a visible window for debugging
    pub debug: bool,

    /// Directory receiving file artifacts, created at construction
    pub output_dir: PathBuf,

    /// Additional arguments passed to the browser binary
    pub launch_args: Vec<String>,

    /// Deadline applied to every engine operation (milliseconds)
    pub timeout_ms: u64,

    /// Default viewport applied at session start
    pub viewport: Option<ViewportSpec>,

    /// Extra HTTP headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for CapturerOptions {
    fn default() -> Self {
        Self {
            debug: false,
            output_dir: PathBuf::from("."),
            launch_args: Vec::new(),
            timeout_ms: 30_000,
            viewport: None,
            headers: HashMap::new(),
        }
    }
}

impl CapturerOptions {
    /// The viewport used when the caller did not configure one: 1280x800 at
    /// scale factor 2
    pub fn fallback_viewport() -> ResolvedViewport {
        ResolvedViewport::from(RawViewport {
            width: 1280,
            height: 800,
            device_scale_factor: Some(2.0),
            is_mobile: None,
            has_touch: None,
            is_landscape: None,
        })
    }
}

/// Load-completion signal honored after navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    /// Wait for the load event
    #[default]
    Load,

    /// Wait for DOMContentLoaded
    DomContentLoaded,

    /// Wait for the network to settle after load
    NetworkIdle,

    /// Don't wait beyond navigation
    None,
}

/// Extra wait applied once the page has loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitFor {
    /// Sleep for a fixed number of milliseconds
    Millis(u64),

    /// Poll until a CSS selector matches
    Selector(String),
}

/// PDF rendering options, defaulting to A4 portrait
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfOptions {
    pub landscape: bool,
    pub print_background: bool,
    /// Paper width in inches
    pub paper_width: f64,
    /// Paper height in inches
    pub paper_height: f64,
    pub scale: f64,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            landscape: false,
            print_background: false,
            paper_width: 8.27,
            paper_height: 11.69,
            scale: 1.0,
        }
    }
}

/// Per-call capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CaptureOptions {
    /// Output artifact kind
    pub format: CaptureFormat,

    /// Viewport(s) to capture; absent means the session default stays
    pub viewport: Option<ViewportSpec>,

    /// Capture every device in a category instead of a viewport spec
    pub viewport_category: Option<String>,

    /// Restrict screenshots to the first element matching this selector
    pub selector: Option<String>,

    /// Explicit output name, bypassing derived naming
    pub name: Option<String>,

    /// Load-completion signal, defaults to the load event
    pub wait_until: Option<WaitUntil>,

    /// Extra wait applied after load
    pub wait_for: Option<WaitFor>,

    /// Scripts injected after load: inline code, URLs or file paths
    pub scripts: Vec<String>,

    /// Styles injected after load: inline CSS, URLs or file paths
    pub styles: Vec<String>,

    /// Capture the full scrollable page instead of the viewport
    pub full_page: bool,

    /// JPEG quality (0-100)
    pub quality: Option<u8>,

    /// PDF sub-options, used when the format is pdf
    pub pdf: Option<PdfOptions>,
}

impl CaptureOptions {
    pub fn with_format(format: CaptureFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }
}
