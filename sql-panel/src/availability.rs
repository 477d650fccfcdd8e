//! Whether the SQL panel can show live data.
//!
//! Three conditions are checked in order: database support is compiled in,
//! a database extension is registered on the application, and query
//! recording is switched on. A missing piece never raises; the panel shows
//! an explanation instead.

use serde::Serialize;

use common::config::AppConfig;

use crate::state::AppState;

/// Database support is compiled in (the `database` cargo feature).
pub const LIBRARY_AVAILABLE: bool = cfg!(feature = "database");

/// How a database extension decides whether to record queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingMode {
    /// Only `record_queries` turns recording on.
    #[default]
    Explicit,
    /// Debug mode also turns recording on.
    DebugAuto,
}

/// Snapshot of the three availability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// Database support is compiled in.
    pub library_available: bool,
    /// A database extension is registered on the application.
    pub extension_used: bool,
    /// Query recording is active.
    pub recording_enabled: bool,
}

impl Availability {
    /// Runs the checks against the application state.
    pub fn detect(state: &AppState) -> Self {
        Self {
            library_available: LIBRARY_AVAILABLE,
            extension_used: state.extension_used(),
            recording_enabled: recording_enabled(&state.config, state.recording_mode()),
        }
    }

    /// All three checks pass.
    pub fn is_available(&self) -> bool {
        self.library_available && self.extension_used && self.recording_enabled
    }

    /// Recorded queries can be read at all.
    pub fn can_read_queries(&self) -> bool {
        self.library_available && self.extension_used
    }
}

/// Whether queries are recorded for the given configuration and extension mode.
///
/// `mode` is `None` when no extension is registered; only the explicit flag
/// counts then.
pub fn recording_enabled(config: &AppConfig, mode: Option<RecordingMode>) -> bool {
    let debug_enables = matches!(mode, Some(RecordingMode::DebugAuto));
    (debug_enables && config.debug) || config.record_queries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(debug: bool, record_queries: bool) -> AppConfig {
        AppConfig {
            debug,
            record_queries,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_explicit_flag_always_enables() {
        assert!(recording_enabled(&config(false, true), None));
        assert!(recording_enabled(&config(false, true), Some(RecordingMode::Explicit)));
        assert!(recording_enabled(&config(true, true), Some(RecordingMode::DebugAuto)));
    }

    #[test]
    fn test_debug_only_enables_in_debug_auto_mode() {
        assert!(recording_enabled(&config(true, false), Some(RecordingMode::DebugAuto)));
        assert!(!recording_enabled(&config(true, false), Some(RecordingMode::Explicit)));
        assert!(!recording_enabled(&config(true, false), None));
        assert!(!recording_enabled(&config(false, false), Some(RecordingMode::DebugAuto)));
    }

    #[test]
    fn test_detect_without_extension() {
        let state = AppState::new(config(true, true));
        let availability = Availability::detect(&state);
        assert_eq!(availability.library_available, LIBRARY_AVAILABLE);
        assert!(!availability.extension_used);
        assert!(availability.recording_enabled);
        assert!(!availability.is_available());
        assert!(!availability.can_read_queries());
    }

    #[test]
    fn test_is_available_needs_all_three() {
        let all = Availability {
            library_available: true,
            extension_used: true,
            recording_enabled: true,
        };
        assert!(all.is_available());
        assert!(!Availability { recording_enabled: false, ..all }.is_available());
        assert!(!Availability { extension_used: false, ..all }.is_available());
        assert!(!Availability { library_available: false, ..all }.is_available());
    }
}
