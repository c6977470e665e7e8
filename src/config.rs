//! Process-wide configuration.

use std::path::PathBuf;
use std::time::Duration;

use portal_adapter::SessionConfig;
use submit_flow::FlowConfig;

/// Everything the run needs, resolved once at startup from flags, environment
/// and defaults. Core crates receive this by reference and never consult the
/// environment themselves.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub flow: FlowConfig,
    pub session: SessionConfig,
    /// Pause between the completion of one record and the start of the next.
    pub delay_between: Duration,
    /// Directory for run reports.
    pub results_dir: PathBuf,
}

impl AppConfig {
    pub fn resolve(
        headless: bool,
        chrome_executable: Option<PathBuf>,
        capture_dir: PathBuf,
        results_dir: PathBuf,
        delay_between: Duration,
        retry_transient: bool,
    ) -> Self {
        let flow = FlowConfig {
            capture_dir,
            retry_transient,
            ..FlowConfig::default()
        };
        let session = SessionConfig {
            headless,
            chrome_executable,
            ..SessionConfig::default()
        };
        Self {
            flow,
            session,
            delay_between,
            results_dir,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::resolve(
            true,
            None,
            PathBuf::from("captures"),
            PathBuf::from("results"),
            Duration::from_millis(10_000),
            false,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_portal_batch_timings() {
        let config = AppConfig::default();
        assert_eq!(config.delay_between, Duration::from_millis(10_000));
        assert_eq!(config.flow.page_load_timeout, Duration::from_millis(30_000));
        assert_eq!(config.flow.element_timeout, Duration::from_millis(15_000));
        assert!(config.session.headless);
        assert!(!config.flow.retry_transient);
    }

    #[test]
    fn resolve_threads_flags_into_the_right_layers() {
        let config = AppConfig::resolve(
            false,
            Some(PathBuf::from("/usr/bin/chromium")),
            PathBuf::from("shots"),
            PathBuf::from("out"),
            Duration::from_secs(3),
            true,
        );
        assert!(!config.session.headless);
        assert_eq!(
            config.session.chrome_executable,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
        assert_eq!(config.flow.capture_dir, PathBuf::from("shots"));
        assert!(config.flow.retry_transient);
        assert_eq!(config.results_dir, PathBuf::from("out"));
    }
}
