use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `steward`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
///
/// Note that most runtime failures in the core are deliberately *not* errors:
/// a capability handler that fails becomes a failed [`crate::router::Outcome`],
/// an unavailable external source becomes a neutral default, and a missing
/// required field becomes a slot-filling transition.
#[derive(Debug, Error)]
pub enum StewardError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Point engine ────────────────────────────────────────────────────
    #[error("points: {0}")]
    Points(#[from] PointError),

    // ── Slot optimizer ──────────────────────────────────────────────────
    #[error("schedule: {0}")]
    Schedule(#[from] ScheduleError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Point engine errors ────────────────────────────────────────────────────

/// Hard validation failures for the point engine. An unknown action type or
/// role must never fall through to a silent default award.
#[derive(Debug, Error)]
pub enum PointError {
    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

// ─── Slot optimizer errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("requested duration must be positive")]
    ZeroDuration,

    #[error("search window is inverted: {start} .. {end}")]
    InvertedWindow { start: String, end: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, StewardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = StewardError::Config(ConfigError::Validation("bad threshold".into()));
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn point_error_names_the_offending_input() {
        let err = StewardError::Points(PointError::UnknownActionType("dance_party".into()));
        assert!(err.to_string().contains("dance_party"));
    }

    #[test]
    fn anyhow_interop() {
        let anyhow_err = anyhow::anyhow!("something went wrong");
        let err: StewardError = anyhow_err.into();
        assert!(err.to_string().contains("something went wrong"));
    }

    #[test]
    fn schedule_error_displays_window() {
        let err = StewardError::Schedule(ScheduleError::InvertedWindow {
            start: "2026-01-02T09:00:00Z".into(),
            end: "2026-01-01T09:00:00Z".into(),
        });
        assert!(err.to_string().contains("inverted"));
    }
}
