//! Board configuration from TOML (`[board]` section)

use ckm_domain::{ConfigIssue, ConfigIssueCode, Role, RoleSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One `[[board.roles]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRoleConfig {
    /// Role identifier ("cardiology", "nephrology", ... or any custom name)
    pub id: String,
    /// Report order; lower comes first
    pub priority: u32,
    /// Guideline references; omitted means the role's built-in list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<String>>,
}

impl FileRoleConfig {
    pub fn to_spec(&self) -> RoleSpec {
        // Role parsing is infallible; unknown ids become custom roles
        let role = self
            .id
            .parse::<Role>()
            .unwrap_or_else(|never| match never {});
        let spec = RoleSpec::new(role, self.priority);
        match &self.citations {
            Some(citations) => spec.with_citations(citations.clone()),
            None => spec,
        }
    }
}

impl From<&RoleSpec> for FileRoleConfig {
    fn from(spec: &RoleSpec) -> Self {
        Self {
            id: spec.role.as_str().to_string(),
            priority: spec.priority,
            citations: Some(spec.citations.clone()),
        }
    }
}

/// Raw board configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBoardConfig {
    /// Per-role assessment timeout in seconds
    pub role_timeout_secs: u64,
    pub roles: Vec<FileRoleConfig>,
}

impl Default for FileBoardConfig {
    fn default() -> Self {
        Self {
            role_timeout_secs: 120,
            roles: RoleSpec::default_panel()
                .iter()
                .map(FileRoleConfig::from)
                .collect(),
        }
    }
}

impl FileBoardConfig {
    /// Build role specs, reporting duplicate ids and priorities.
    ///
    /// Duplicate ids keep the first entry.
    pub fn parse_roles(&self) -> (Vec<RoleSpec>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut specs: Vec<RoleSpec> = Vec::with_capacity(self.roles.len());
        let mut priorities = HashSet::new();

        if self.roles.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::NoRoles,
                "board.roles: at least one role is required",
            ));
        }

        for entry in &self.roles {
            let spec = entry.to_spec();
            if specs.iter().any(|s| s.role == spec.role) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateRole,
                    format!("board.roles: role '{}' is listed more than once", spec.role),
                ));
                continue;
            }
            if !priorities.insert(spec.priority) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicatePriority,
                    format!(
                        "board.roles: priority {} is shared; '{}' is ordered by id",
                        spec.priority, spec.role
                    ),
                ));
            }
            specs.push(spec);
        }

        (specs, issues)
    }

    pub fn timeout_issues(&self) -> Vec<ConfigIssue> {
        if self.role_timeout_secs == 0 {
            vec![ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "board.role_timeout_secs cannot be 0",
            )]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roles_match_panel() {
        let (specs, issues) = FileBoardConfig::default().parse_roles();
        assert!(issues.is_empty());
        assert_eq!(specs, RoleSpec::default_panel());
    }

    #[test]
    fn test_custom_role_and_citations() {
        let config = FileBoardConfig {
            role_timeout_secs: 30,
            roles: vec![
                FileRoleConfig {
                    id: "Pharmacy".into(),
                    priority: 4,
                    citations: Some(vec!["BNF".into()]),
                },
                FileRoleConfig {
                    id: "nephrology".into(),
                    priority: 2,
                    citations: None,
                },
            ],
        };
        let (specs, issues) = config.parse_roles();
        assert!(issues.is_empty());
        assert_eq!(specs[0].role, Role::Custom("pharmacy".into()));
        assert_eq!(specs[0].citations, vec!["BNF".to_string()]);
        assert_eq!(specs[1].citations, Role::Nephrology.default_citations());
    }

    #[test]
    fn test_duplicates_are_reported() {
        let role = |id: &str, priority| FileRoleConfig {
            id: id.into(),
            priority,
            citations: None,
        };
        let config = FileBoardConfig {
            role_timeout_secs: 120,
            roles: vec![role("cardiology", 1), role("Cardiologist", 2), role("renal", 1)],
        };
        let (specs, issues) = config.parse_roles();
        assert_eq!(specs.len(), 2);
        let codes: Vec<ConfigIssueCode> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![ConfigIssueCode::DuplicateRole, ConfigIssueCode::DuplicatePriority]
        );
        assert!(issues[0].is_error());
        assert!(!issues[1].is_error());
    }

    #[test]
    fn test_empty_roles_is_error() {
        let config = FileBoardConfig {
            role_timeout_secs: 120,
            roles: vec![],
        };
        let (_, issues) = config.parse_roles();
        assert_eq!(issues[0].code, ConfigIssueCode::NoRoles);
    }
}
