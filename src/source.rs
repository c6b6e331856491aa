//! Capture input normalization: URLs, literal HTML, local files and list files

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Source preparation errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read source file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot build a file URL for {0}")]
    FileUrl(PathBuf),
}

// A tag-like structure or a doctype is enough to treat input as markup
static HTML_SNIFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<!doctype html|<([a-z][a-z0-9-]*)(\s[^>]*)?/?>").expect("html pattern")
});

/// True for absolute URLs with a scheme the browser can navigate to
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://")
        || input.starts_with("https://")
        || input.starts_with("file://")
        || input.starts_with("data:")
        || input.starts_with("about:")
}

/// True when the input looks like a literal HTML fragment
pub fn is_html(input: &str) -> bool {
    HTML_SNIFF.is_match(input)
}

/// True when the input is plausibly a filesystem path
fn is_path_like(input: &str) -> bool {
    !input.is_empty()
        && input.len() < 4096
        && !input.contains('\n')
        && !input.contains('<')
        && !input.contains('>')
}

fn to_file_url(input: &str) -> Result<String, SourceError> {
    let path = Path::new(input);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|_| SourceError::FileUrl(absolute))
}

/// Normalize a list of capture inputs.
///
/// URLs and literal HTML pass through unchanged. A path ending in `.html`
/// becomes a `file://` URL; a path ending in `.txt` is read eagerly and every
/// non-empty line becomes an independent source, flattened in place. Lines
/// from list files are taken as literal sources and not resolved further.
/// The result is deduplicated by exact string equality, first occurrence
/// first; empty inputs are dropped. A missing referenced file fails here,
/// before any capture starts.
pub fn prepare<I, S>(inputs: I) -> Result<Vec<String>, SourceError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    let push_unique = |source: String, out: &mut Vec<String>| {
        if !source.trim().is_empty() && !out.contains(&source) {
            out.push(source);
        }
    };

    for input in inputs {
        let input: String = input.into();
        if input.trim().is_empty() {
            continue;
        }

        if is_url(&input) || is_html(&input) || !is_path_like(&input) {
            push_unique(input, &mut out);
            continue;
        }

        if input.ends_with(".html") {
            let path = Path::new(&input);
            if !path.exists() {
                return Err(SourceError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
                });
            }
            push_unique(to_file_url(&input)?, &mut out);
        } else if input.ends_with(".txt") {
            let path = Path::new(&input);
            let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            for line in content.lines() {
                push_unique(line.trim().to_string(), &mut out);
            }
        } else {
            push_unique(input, &mut out);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_urls_pass_through() {
        let sources = prepare(["http://google.it", "about:blank"]).unwrap();
        assert_eq!(sources, vec!["http://google.it", "about:blank"]);
    }

    #[test]
    fn test_html_passes_through() {
        let sources = prepare(["<h1>testing</h1>"]).unwrap();
        assert_eq!(sources, vec!["<h1>testing</h1>"]);
        assert!(is_html("<!DOCTYPE html><html></html>"));
        assert!(!is_html("just some text"));
    }

    #[test]
    fn test_html_file_becomes_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.html");
        std::fs::write(&file, "<html></html>").unwrap();

        let sources = prepare([file.to_str().unwrap()]).unwrap();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].starts_with("file://"));
        assert!(sources[0].ends_with("page.html"));
    }

    #[test]
    fn test_txt_file_expands_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("list.txt");
        let mut handle = std::fs::File::create(&file).unwrap();
        writeln!(handle, "http://example.com").unwrap();
        writeln!(handle).unwrap();
        writeln!(handle, "  http://google.com  ").unwrap();

        let sources = prepare([file.to_str().unwrap()]).unwrap();
        assert_eq!(sources, vec!["http://example.com", "http://google.com"]);
    }

    #[test]
    fn test_missing_files_fail_eagerly() {
        let result = prepare(["definitely/not/here/list.txt"]);
        assert!(matches!(result, Err(SourceError::Io { .. })));
        let result = prepare(["definitely/not/here/page.html"]);
        assert!(matches!(result, Err(SourceError::Io { .. })));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let sources = prepare(["a", "b", "a"]).unwrap();
        assert_eq!(sources, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_inputs_are_dropped() {
        let sources = prepare(["", "   ", "http://example.com"]).unwrap();
        assert_eq!(sources, vec!["http://example.com"]);
    }
}
