//! Failure screenshot capture.

use std::path::{Path, PathBuf};

use chrono::Utc;
use portal_adapter::PortalPage;
use tracing::{info, warn};

use crate::errors::NavError;

/// Capture a full-page screenshot of the failure state.
///
/// The file name is deterministic from the record identifier plus a UTC
/// timestamp with millisecond precision, so concurrent batches writing to the
/// same directory cannot collide. This function never fails: capture problems
/// are logged and swallowed so they cannot mask the original error.
pub async fn capture_failure_artifact(
    page: &dyn PortalPage,
    capture_dir: &Path,
    ie: &str,
    error: &NavError,
) -> Option<PathBuf> {
    let bytes = match page.screenshot().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(ie, %err, "failure screenshot could not be taken");
            return None;
        }
    };

    let filename = format!(
        "{}_{}.png",
        sanitize_identifier(ie),
        Utc::now().format("%Y%m%d_%H%M%S_%3f")
    );
    let path = capture_dir.join(filename);

    if let Err(err) = tokio::fs::create_dir_all(capture_dir).await {
        warn!(ie, %err, dir = %capture_dir.display(), "capture directory could not be created");
        return None;
    }
    if let Err(err) = tokio::fs::write(&path, &bytes).await {
        warn!(ie, %err, path = %path.display(), "failure screenshot could not be written");
        return None;
    }

    info!(ie, path = %path.display(), %error, "failure capture saved");
    Some(path)
}

/// Keep identifiers filesystem-safe: alphanumerics pass through, anything
/// else becomes a dash.
fn sanitize_identifier(ie: &str) -> String {
    ie.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_adapter::fake::FakePage;

    #[test]
    fn identifiers_are_sanitized_for_filenames() {
        assert_eq!(sanitize_identifier("19.012.345-6"), "19-012-345-6");
        assert_eq!(sanitize_identifier("190123456"), "190123456");
    }

    #[tokio::test]
    async fn capture_writes_a_png_named_after_the_record() {
        let page = FakePage::new();
        let dir = tempfile::tempdir().unwrap();
        let error = NavError::Timeout("page not ready".into());

        let path = capture_failure_artifact(&page, dir.path(), "190123456", &error)
            .await
            .expect("capture should produce a path");

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("190123456_"));
        assert!(name.ends_with(".png"));
        assert!(path.exists());
        assert!(!std::fs::read(&path).unwrap().is_empty());
    }

    #[tokio::test]
    async fn capture_failures_are_swallowed() {
        let page = FakePage::new();
        page.fail_screenshots();
        let dir = tempfile::tempdir().unwrap();
        let error = NavError::Timeout("page not ready".into());

        let path = capture_failure_artifact(&page, dir.path(), "190123456", &error).await;

        assert!(path.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn capture_creates_the_directory_when_missing() {
        let page = FakePage::new();
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("captures").join("errors");
        let error = NavError::ElementNotFound("no button".into());

        let path = capture_failure_artifact(&page, &nested, "190000001", &error).await;

        assert!(path.is_some());
        assert!(nested.exists());
    }
}
