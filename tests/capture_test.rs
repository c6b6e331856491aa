//! Integration tests driving a real browser session

use webcapture::{
    CaptureOptions, CaptureOutput, CapturerOptions, RawViewport, ViewportSpec, WebCapturer,
};

const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn capturer(output_dir: &std::path::Path) -> WebCapturer {
    WebCapturer::new(CapturerOptions {
        output_dir: output_dir.to_path_buf(),
        ..Default::default()
    })
    .unwrap()
}

/// Base64 well-formedness: standard alphabet, length multiple of 4, padding
/// only at the end, at most two padding chars
fn is_valid_base64(value: &str) -> bool {
    let len = value.len();
    if len == 0 || len % 4 != 0 {
        return false;
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return false;
    }
    match value.find('=') {
        None => true,
        Some(first) => first >= len - 2 && value[first..].chars().all(|c| c == '='),
    }
}

#[tokio::test]
async fn test_capture_deduplicates_sources() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["about:blank", "data:text/html,<p>two</p>", "about:blank"],
            CaptureOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].input, "about:blank");
    assert_eq!(results[1].input, "data:text/html,<p>two</p>");

    capturer.close().await;
}

#[tokio::test]
async fn test_dimension_viewport_produces_file() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["about:blank"],
            CaptureOptions {
                viewport: Some("200x200".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(results[0].error.is_none());
    let path = results[0].output.as_ref().unwrap().as_path().unwrap();
    assert!(path.exists());
    assert_eq!(path.extension().unwrap(), "png");

    capturer.close().await;
}

#[tokio::test]
async fn test_object_and_numeric_viewports() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let object = CaptureOptions {
        viewport: Some(ViewportSpec::Dimensions(RawViewport {
            width: 600,
            height: 400,
            device_scale_factor: None,
            is_mobile: None,
            has_touch: None,
            is_landscape: None,
        })),
        ..Default::default()
    };
    let results = capturer.capture(["about:blank"], object).await.unwrap();
    assert!(results[0].error.is_none());

    let numeric = CaptureOptions {
        viewport: Some(ViewportSpec::Size(350)),
        ..Default::default()
    };
    let results = capturer.capture(["about:blank"], numeric).await.unwrap();
    assert!(results[0].error.is_none());

    capturer.close().await;
}

#[tokio::test]
async fn test_multiple_viewports_yield_an_output_per_device() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["about:blank"],
            CaptureOptions {
                viewport: Some(ViewportSpec::from(vec![
                    "desktop-firefox",
                    "desktop-safari",
                ])),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let output = results[0].output.as_ref().unwrap();
    match output {
        CaptureOutput::Many(outputs) => {
            assert_eq!(outputs.len(), 2);
            let first = outputs[0].as_path().unwrap().to_str().unwrap();
            let second = outputs[1].as_path().unwrap().to_str().unwrap();
            assert!(first.contains("desktop-firefox"));
            assert!(second.contains("desktop-safari"));
        }
        other => panic!("expected one output per device, got {other:?}"),
    }

    capturer.close().await;
}

#[tokio::test]
async fn test_invalid_viewport_is_a_per_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["about:blank"],
            CaptureOptions {
                viewport: Some("non-existing".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(results[0].output.is_none());
    let error = results[0].error.as_ref().unwrap();
    assert!(error.contains("Invalid viewport"), "got: {error}");

    capturer.close().await;
}

#[tokio::test]
async fn test_bad_source_does_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["http://localhost:1/unreachable", "about:blank"],
            CaptureOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].error.is_some());
    assert!(results[1].error.is_none());

    capturer.close().await;
}

#[tokio::test]
async fn test_base64_output_is_well_formed() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let result = capturer
        .base64("about:blank", CaptureOptions::default())
        .await
        .unwrap();

    let encoded = result.output.unwrap();
    let encoded = encoded.as_base64().unwrap();
    assert!(is_valid_base64(encoded));

    // Image type is forced to PNG for base64 captures
    use base64::Engine as _;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    assert_eq!(&decoded[..8], PNG_MAGIC);

    capturer.close().await;
}

#[tokio::test]
async fn test_buffer_output_is_raw_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let result = capturer
        .buffer("about:blank", CaptureOptions::default())
        .await
        .unwrap();

    let output = result.output.unwrap();
    let bytes = output.as_bytes().unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(&bytes[..8], PNG_MAGIC);

    capturer.close().await;
}

#[tokio::test]
async fn test_file_defaults_to_png_and_honors_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let output = dir.path().join("about");
    let result = capturer
        .file("about:blank", output.to_str().unwrap(), CaptureOptions::default())
        .await
        .unwrap();
    let path = result.output.unwrap();
    let path = path.as_path().unwrap().to_path_buf();
    assert_eq!(path.file_name().unwrap(), "about.png");
    assert!(path.exists());

    let output = dir.path().join("about.jpeg");
    let result = capturer
        .file("about:blank", output.to_str().unwrap(), CaptureOptions::default())
        .await
        .unwrap();
    let path = result.output.unwrap();
    let path = path.as_path().unwrap().to_path_buf();
    assert_eq!(path.file_name().unwrap(), "about.jpeg");
    assert!(path.exists());

    capturer.close().await;
}

#[tokio::test]
async fn test_html_capture_serializes_page_content() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["<h1>testing</h1>"],
            CaptureOptions {
                format: "html".parse().unwrap(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let path = results[0].output.as_ref().unwrap().as_path().unwrap().to_path_buf();
    assert_eq!(path.extension().unwrap(), "html");
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("<h1>testing</h1>"));

    capturer.close().await;
}

#[tokio::test]
async fn test_pdf_capture_writes_a_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["<h1>print me</h1>"],
            CaptureOptions {
                format: "pdf".parse().unwrap(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let path = results[0].output.as_ref().unwrap().as_path().unwrap().to_path_buf();
    assert_eq!(path.extension().unwrap(), "pdf");
    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..4], b"%PDF");

    capturer.close().await;
}

#[tokio::test]
async fn test_script_injection_runs_before_capture() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["<body><p>original</p></body>"],
            CaptureOptions {
                format: "html".parse().unwrap(),
                scripts: vec![
                    "window.foo = \"bar\"; document.body.innerHTML = '<p id=\"injected\">' + window.foo + '</p>';".to_string(),
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let path = results[0].output.as_ref().unwrap().as_path().unwrap().to_path_buf();
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("injected"));
    assert!(content.contains("bar"));

    capturer.close().await;
}

#[tokio::test]
async fn test_style_injection_adds_a_style_element() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["about:blank"],
            CaptureOptions {
                format: "html".parse().unwrap(),
                styles: vec!["body { background-color: red; }".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let path = results[0].output.as_ref().unwrap().as_path().unwrap().to_path_buf();
    let content = std::fs::read_to_string(path).unwrap();
    assert!(content.contains("<style"));
    assert!(content.contains("background-color: red;"));

    capturer.close().await;
}

#[tokio::test]
async fn test_selector_restricts_the_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());

    let results = capturer
        .capture(
            ["<body><div id=\"box\" style=\"width:120px;height:80px\">x</div></body>"],
            CaptureOptions {
                selector: Some("#box".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(results[0].error.is_none(), "error: {:?}", results[0].error);
    assert!(results[0].output.is_some());

    capturer.close().await;
}

#[tokio::test]
async fn test_missing_selector_is_a_per_source_error() {
    let dir = tempfile::tempdir().unwrap();
    let capturer = WebCapturer::new(CapturerOptions {
        output_dir: dir.path().to_path_buf(),
        timeout_ms: 3_000,
        ..Default::default()
    })
    .unwrap();

    let results = capturer
        .capture(
            ["<p>no box here</p>"],
            CaptureOptions {
                selector: Some("#box".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(results[0].output.is_none());
    assert!(results[0].error.is_some());

    capturer.close().await;
}

#[tokio::test]
async fn test_progress_events_are_ordered() {
    use webcapture::CaptureEvent;

    let dir = tempfile::tempdir().unwrap();
    let capturer = capturer(dir.path());
    let mut events = capturer.subscribe().await;

    capturer
        .capture(
            ["about:blank", "data:text/html,<p>two</p>"],
            CaptureOptions::default(),
        )
        .await
        .unwrap();
    capturer.close().await;
    drop(capturer);

    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }

    // Started/Finished alternate strictly, one pair per source
    assert_eq!(seen.len(), 4);
    assert!(matches!(&seen[0], CaptureEvent::Started { progress } if progress.current == 1));
    assert!(matches!(&seen[1], CaptureEvent::Finished { progress, .. } if progress.current == 1));
    assert!(matches!(&seen[2], CaptureEvent::Started { progress } if progress.current == 2));
    assert!(matches!(&seen[3], CaptureEvent::Finished { progress, .. } if progress.current == 2));
}
