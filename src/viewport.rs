//! Viewport specifications and their resolution to concrete emulation profiles

use crate::devices::{self, Device};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Viewport resolution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewportError {
    #[error("Invalid viewport \"{0}\": not a known device or a WxH string")]
    Unknown(String),
}

/// Raw viewport dimensions with optional emulation flags
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawViewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub device_scale_factor: Option<f64>,
    #[serde(default)]
    pub is_mobile: Option<bool>,
    #[serde(default)]
    pub has_touch: Option<bool>,
    #[serde(default)]
    pub is_landscape: Option<bool>,
}

/// A viewport specification as accepted at the API surface.
///
/// Strings name either a device profile ("iphone-6") or plain dimensions
/// ("1280x800", "800"); numbers are square viewports; arrays expand to one
/// capture per member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewportSpec {
    Size(u32),
    Name(String),
    Dimensions(RawViewport),
    Many(Vec<ViewportSpec>),
}

impl From<&str> for ViewportSpec {
    fn from(value: &str) -> Self {
        ViewportSpec::Name(value.to_string())
    }
}

impl From<u32> for ViewportSpec {
    fn from(value: u32) -> Self {
        ViewportSpec::Size(value)
    }
}

impl<T: Into<ViewportSpec>> From<Vec<T>> for ViewportSpec {
    fn from(value: Vec<T>) -> Self {
        ViewportSpec::Many(value.into_iter().map(Into::into).collect())
    }
}

/// A fully resolved viewport ready to be applied to a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedViewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
    pub is_landscape: bool,
    /// User agent to emulate, only carried by named device profiles
    pub user_agent: Option<String>,
    /// Device name, used for output labeling
    pub name: Option<String>,
}

impl Default for ResolvedViewport {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
            is_landscape: false,
            user_agent: None,
            name: None,
        }
    }
}

impl ResolvedViewport {
    fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
            ..Default::default()
        }
    }
}

impl From<&'static Device> for ResolvedViewport {
    fn from(device: &'static Device) -> Self {
        Self {
            width: device.viewport.width,
            height: device.viewport.height,
            device_scale_factor: device.viewport.device_scale_factor,
            is_mobile: device.viewport.is_mobile,
            has_touch: device.viewport.has_touch,
            is_landscape: device.viewport.is_landscape,
            user_agent: Some(device.user_agent.to_string()),
            name: Some(device.name.to_string()),
        }
    }
}

impl From<RawViewport> for ResolvedViewport {
    fn from(raw: RawViewport) -> Self {
        Self {
            width: raw.width,
            height: raw.height,
            device_scale_factor: raw.device_scale_factor.unwrap_or(1.0),
            is_mobile: raw.is_mobile.unwrap_or(false),
            has_touch: raw.has_touch.unwrap_or(false),
            is_landscape: raw.is_landscape.unwrap_or(false),
            user_agent: None,
            name: None,
        }
    }
}

// Matches "800x600" and "800" (square), up to four digits per side
static DIMENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,4})(?:x)?(\d{1,4})?$").expect("dimension pattern"));

/// Resolve a viewport specification into one or more concrete viewports.
///
/// Array specs preserve member order and are not deduplicated. An unknown
/// device name anywhere in the spec fails the whole resolution.
pub fn resolve(spec: &ViewportSpec) -> Result<Vec<ResolvedViewport>, ViewportError> {
    match spec {
        ViewportSpec::Size(side) => Ok(vec![ResolvedViewport::square(*side)]),
        ViewportSpec::Name(name) => resolve_name(name).map(|v| vec![v]),
        ViewportSpec::Dimensions(raw) => Ok(vec![ResolvedViewport::from(*raw)]),
        ViewportSpec::Many(specs) => {
            let mut out = Vec::with_capacity(specs.len());
            for spec in specs {
                out.extend(resolve(spec)?);
            }
            Ok(out)
        }
    }
}

/// Resolve a single viewport string: dimensions first, then the device table
fn resolve_name(name: &str) -> Result<ResolvedViewport, ViewportError> {
    if let Some(caps) = DIMENSIONS.captures(name) {
        let width: u32 = caps[1].parse().expect("matched digits");
        let height = caps
            .get(2)
            .map(|m| m.as_str().parse().expect("matched digits"))
            .unwrap_or(width);
        return Ok(ResolvedViewport {
            width,
            height,
            ..Default::default()
        });
    }

    devices::find(name)
        .map(ResolvedViewport::from)
        .ok_or_else(|| ViewportError::Unknown(name.to_string()))
}

/// Expand a viewport category into resolved viewports, possibly none
pub fn resolve_category(category: &str) -> Vec<ResolvedViewport> {
    devices::by_category(category)
        .into_iter()
        .map(ResolvedViewport::from)
        .collect()
}
