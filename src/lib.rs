//! Webpage capture through headless Chrome
//!
//! This library turns URLs, local HTML files or literal HTML fragments into
//! rendered artifacts:
//! - PNG/JPEG screenshots of the page, the viewport or a single element
//! - PDF renderings and serialized HTML content
//! - In-memory base64 strings and raw screenshot buffers
//! - Named device emulation (viewport, touch, user agent) and device
//!   categories for multi-viewport captures
//!
//! Rendering is delegated to Chrome over CDP via chromiumoxide; one shared
//! browser session and page serve all captures sequentially.

pub mod capturer;
pub mod config;
pub mod devices;
pub mod events;
pub mod output;
pub mod page;
pub mod source;
pub mod viewport;

pub use capturer::{CaptureError, CaptureResult, WebCapturer};
pub use config::{CaptureOptions, CapturerOptions, PdfOptions, WaitFor, WaitUntil};
pub use devices::{Device, DeviceViewport, DEVICES};
pub use events::{CaptureEvent, Progress};
pub use output::{CaptureFormat, CaptureOutput, FormatError};
pub use page::{PageRenderer, RenderError};
pub use viewport::{RawViewport, ResolvedViewport, ViewportError, ViewportSpec};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webcapture=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
