//! Board configuration - what the use cases need to run one consultation.
//!
//! [`BoardConfig`] is built by the infrastructure config loader from the
//! TOML layers, or from defaults in tests.

use ckm_domain::synthesis::critical::default_rules;
use ckm_domain::synthesis::overrides::default_overrides;
use ckm_domain::synthesis::snapshot::DEFAULT_WORD_LIMIT;
use ckm_domain::{Case, CaseField, CriticalFieldRule, RoleSpec, SafetyOverride};
use std::time::Duration;

/// Default per-role assessment timeout
pub const DEFAULT_ROLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Runtime parameters of the consultation board
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Registered roles with their fixed priority
    pub roles: Vec<RoleSpec>,
    pub role_timeout: Duration,
    /// Rendered Snapshot word limit
    pub word_limit: usize,
    /// Synthesis regenerations after the first attempt
    pub max_retries: u32,
    pub critical_fields: Vec<CriticalFieldRule>,
    pub safety_overrides: Vec<SafetyOverride>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            roles: RoleSpec::default_panel(),
            role_timeout: DEFAULT_ROLE_TIMEOUT,
            word_limit: DEFAULT_WORD_LIMIT,
            max_retries: 1,
            critical_fields: default_rules(),
            safety_overrides: default_overrides(),
        }
    }
}

impl BoardConfig {
    // ==================== Builder Methods ====================

    pub fn with_roles(mut self, roles: Vec<RoleSpec>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_role_timeout(mut self, timeout: Duration) -> Self {
        self.role_timeout = timeout;
        self
    }

    pub fn with_word_limit(mut self, limit: usize) -> Self {
        self.word_limit = limit;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_critical_fields(mut self, rules: Vec<CriticalFieldRule>) -> Self {
        self.critical_fields = rules;
        self
    }

    pub fn with_safety_overrides(mut self, overrides: Vec<SafetyOverride>) -> Self {
        self.safety_overrides = overrides;
        self
    }

    // ==================== Queries ====================

    /// Critical fields absent from `case`, in configured order
    pub fn missing_critical(&self, case: &Case) -> Vec<CaseField> {
        self.critical_fields
            .iter()
            .filter(|r| !case.is_set(r.field))
            .map(|r| r.field)
            .collect()
    }

    /// Total provider calls synthesis may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
