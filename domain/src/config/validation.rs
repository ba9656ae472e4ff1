//! Configuration issue types shared by every layer that validates settings.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the board cannot run with this configuration.
    Error,
    /// Non-fatal: the board runs but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// No specialist roles are registered.
    NoRoles,
    /// Two roles share the same id.
    DuplicateRole,
    /// Two roles share the same priority; ordering falls back to role id.
    DuplicatePriority,
    /// Word limit is zero.
    ZeroWordLimit,
    /// Per-role timeout is zero.
    ZeroTimeout,
    /// A critical field name is not in the case catalogue.
    UnknownCriticalField,
    /// More critical fields than Key Facts slots.
    TooManyCriticalFields,
    /// A safety override names an unknown medication.
    UnknownOverrideItem,
    /// A safety override condition or action cannot be parsed.
    InvalidOverride,
    /// The intake parser name is not recognized.
    UnknownIntakeParser,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
