//! Output formats, capture payloads and artifact path construction

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Output format errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("The output type {0} is not supported, must be one of [pdf,png,jpeg,html,base64,buffer]")]
    Unsupported(String),
}

/// The rendered artifact kind for one capture call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// PNG screenshot written to a file
    #[default]
    Png,
    /// JPEG screenshot written to a file
    Jpeg,
    /// PDF rendering written to a file
    Pdf,
    /// Serialized page content written to a file
    Html,
    /// In-memory base64 screenshot, image type forced to PNG
    Base64,
    /// In-memory raw screenshot bytes
    Buffer,
}

impl CaptureFormat {
    /// File extension for on-disk formats
    pub fn extension(&self) -> &'static str {
        match self {
            CaptureFormat::Png => "png",
            CaptureFormat::Jpeg => "jpeg",
            CaptureFormat::Pdf => "pdf",
            CaptureFormat::Html => "html",
            CaptureFormat::Base64 => "base64",
            CaptureFormat::Buffer => "buffer",
        }
    }

    /// In-memory formats never touch the filesystem
    pub fn is_in_memory(&self) -> bool {
        matches!(self, CaptureFormat::Base64 | CaptureFormat::Buffer)
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for CaptureFormat {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "png" => Ok(CaptureFormat::Png),
            "jpeg" | "jpg" => Ok(CaptureFormat::Jpeg),
            "pdf" => Ok(CaptureFormat::Pdf),
            "html" => Ok(CaptureFormat::Html),
            "base64" => Ok(CaptureFormat::Base64),
            "buffer" => Ok(CaptureFormat::Buffer),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }
}

/// One rendered artifact: a file path, an encoded string, raw bytes, or one
/// entry per viewport when a capture expanded over several
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CaptureOutput {
    File(PathBuf),
    Base64(String),
    Bytes(Vec<u8>),
    Many(Vec<CaptureOutput>),
}

impl CaptureOutput {
    /// Collapse a per-viewport list to the bare value when it has one element
    pub fn from_list(mut outputs: Vec<CaptureOutput>) -> Option<CaptureOutput> {
        match outputs.len() {
            0 => None,
            1 => outputs.pop(),
            _ => Some(CaptureOutput::Many(outputs)),
        }
    }

    /// The file path, when this output was written to disk
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            CaptureOutput::File(path) => Some(path),
            _ => None,
        }
    }

    /// The encoded string, when this output is base64
    pub fn as_base64(&self) -> Option<&str> {
        match self {
            CaptureOutput::Base64(value) => Some(value),
            _ => None,
        }
    }

    /// The raw bytes, when this output is a buffer
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CaptureOutput::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Inputs to output-path construction for one render
#[derive(Debug)]
pub struct OutputTarget<'a> {
    pub input: &'a str,
    /// Explicit output name, used verbatim when it already has an extension
    pub name: Option<&'a str>,
    /// Device name of the resolved viewport, when one applies
    pub viewport: Option<&'a str>,
    pub format: CaptureFormat,
    /// Session capture counter, disambiguates sources without a hostname
    pub counter: u64,
}

/// Build the output path for one artifact.
///
/// Explicit names resolve against the current directory; derived names join
/// hostname-or-counter, the viewport label and a millisecond timestamp with
/// `-` and land inside `output_dir`.
pub fn build_path(output_dir: &Path, target: &OutputTarget<'_>) -> std::io::Result<PathBuf> {
    if let Some(name) = target.name.filter(|n| !n.is_empty()) {
        let mut path = PathBuf::from(name);
        if path.extension().is_none() {
            path.set_extension(target.format.extension());
        }
        if path.is_absolute() {
            return Ok(path);
        }
        return Ok(std::env::current_dir()?.join(path));
    }

    let base = Url::parse(target.input)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| format!("{:04}", target.counter));

    let mut parts = vec![base];
    if let Some(viewport) = target.viewport {
        parts.push(viewport.to_string());
    }
    parts.push(Utc::now().timestamp_millis().to_string());

    let file_name = format!("{}.{}", parts.join("-"), target.format.extension());
    Ok(output_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(input: &str) -> OutputTarget<'_> {
        OutputTarget {
            input,
            name: None,
            viewport: None,
            format: CaptureFormat::Png,
            counter: 0,
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("png".parse::<CaptureFormat>().unwrap(), CaptureFormat::Png);
        assert_eq!("PDF".parse::<CaptureFormat>().unwrap(), CaptureFormat::Pdf);
        assert_eq!("jpg".parse::<CaptureFormat>().unwrap(), CaptureFormat::Jpeg);

        let err = "bmp".parse::<CaptureFormat>().unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_explicit_name_with_extension_is_verbatim() {
        let dir = Path::new("/tmp/shots");
        let path = build_path(
            dir,
            &OutputTarget {
                name: Some("about.png"),
                ..target("http://example.com")
            },
        )
        .unwrap();
        assert!(path.to_str().unwrap().ends_with("about.png"));
    }

    #[test]
    fn test_explicit_name_without_extension_gets_format() {
        let dir = Path::new("/tmp/shots");
        let path = build_path(
            dir,
            &OutputTarget {
                name: Some("output/about"),
                ..target("http://example.com")
            },
        )
        .unwrap();
        assert_eq!(path.file_name().unwrap(), "about.png");

        let path = build_path(
            dir,
            &OutputTarget {
                name: Some("output/about"),
                format: CaptureFormat::Jpeg,
                ..target("http://example.com")
            },
        )
        .unwrap();
        assert_eq!(path.file_name().unwrap(), "about.jpeg");
    }

    #[test]
    fn test_derived_name_uses_hostname() {
        let path = build_path(Path::new("/tmp/shots"), &target("http://example.com/page")).unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("example.com-"));
        assert!(file_name.ends_with(".png"));
        assert!(path.starts_with("/tmp/shots"));
    }

    #[test]
    fn test_derived_name_falls_back_to_counter() {
        let path = build_path(
            Path::new("/tmp/shots"),
            &OutputTarget {
                counter: 7,
                ..target("<h1>hello</h1>")
            },
        )
        .unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("0007-"));
    }

    #[test]
    fn test_derived_name_includes_viewport_label() {
        let path = build_path(
            Path::new("/tmp/shots"),
            &OutputTarget {
                viewport: Some("iphone-6"),
                ..target("http://example.com")
            },
        )
        .unwrap();
        assert!(path.to_str().unwrap().contains("example.com-iphone-6-"));
    }

    #[test]
    fn test_output_collapsing() {
        assert_eq!(CaptureOutput::from_list(vec![]), None);
        assert_eq!(
            CaptureOutput::from_list(vec![CaptureOutput::Base64("aa==".into())]),
            Some(CaptureOutput::Base64("aa==".into()))
        );
        assert!(matches!(
            CaptureOutput::from_list(vec![
                CaptureOutput::File("a.png".into()),
                CaptureOutput::File("b.png".into()),
            ]),
            Some(CaptureOutput::Many(v)) if v.len() == 2
        ));
    }
}
