//! Specialist role value object

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Specialist perspective invoked during fan-out (Value Object)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Cardiology,
    Nephrology,
    Endocrinology,
    Custom(String),
}

impl Role {
    /// Get the string identifier for this role
    pub fn as_str(&self) -> &str {
        match self {
            Role::Cardiology => "cardiology",
            Role::Nephrology => "nephrology",
            Role::Endocrinology => "endocrinology",
            Role::Custom(s) => s,
        }
    }

    /// Name shown in reports and used as the owner of next steps
    pub fn display_name(&self) -> String {
        match self {
            Role::Cardiology => "Cardiology".to_string(),
            Role::Nephrology => "Nephrology".to_string(),
            Role::Endocrinology => "Endocrinology".to_string(),
            Role::Custom(s) => {
                let mut chars = s.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        }
    }

    /// Guidelines this role cites when no other references are configured
    pub fn default_citations(&self) -> Vec<String> {
        let refs: &[&str] = match self {
            Role::Cardiology => &[
                "ESC 2023 Heart Failure Guidelines",
                "AHA/ACC/HFSA 2022-2024 Heart Failure Guidelines",
            ],
            Role::Nephrology => &["KDIGO 2024 CKD Clinical Practice Guideline"],
            Role::Endocrinology => &[
                "ADA Standards of Care in Diabetes 2024",
                "ASA 2023 guidance on GLP-1 RAs before procedures",
            ],
            Role::Custom(_) => &[],
        };
        refs.iter().map(|s| s.to_string()).collect()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "cardiology" | "cardiologist" => Role::Cardiology,
            "nephrology" | "nephrologist" => Role::Nephrology,
            "endocrinology" | "endocrinologist" | "diabetology" | "diabetologist" => {
                Role::Endocrinology
            }
            other => Role::Custom(other.to_string()),
        })
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Registered role with its fixed priority (lower runs first in reports)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub role: Role,
    pub priority: u32,
    #[serde(default)]
    pub citations: Vec<String>,
}

impl RoleSpec {
    pub fn new(role: Role, priority: u32) -> Self {
        let citations = role.default_citations();
        Self {
            role,
            priority,
            citations,
        }
    }

    pub fn with_citations(mut self, citations: Vec<String>) -> Self {
        self.citations = citations;
        self
    }

    /// The cardiology → nephrology → endocrinology panel
    pub fn default_panel() -> Vec<RoleSpec> {
        vec![
            RoleSpec::new(Role::Cardiology, 1),
            RoleSpec::new(Role::Nephrology, 2),
            RoleSpec::new(Role::Endocrinology, 3),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_aliases() {
        assert_eq!("Diabetologist".parse::<Role>().unwrap(), Role::Endocrinology);
        assert_eq!("cardiology".parse::<Role>().unwrap(), Role::Cardiology);
        assert_eq!(
            "pharmacy".parse::<Role>().unwrap(),
            Role::Custom("pharmacy".to_string())
        );
    }

    #[test]
    fn test_custom_display_name() {
        assert_eq!(Role::Custom("pharmacy".to_string()).display_name(), "Pharmacy");
    }

    #[test]
    fn test_role_serde_as_string() {
        let json = serde_json::to_string(&Role::Nephrology).unwrap();
        assert_eq!(json, "\"nephrology\"");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Nephrology);
    }

    #[test]
    fn test_default_panel_priorities() {
        let panel = RoleSpec::default_panel();
        assert_eq!(panel.len(), 3);
        assert!(panel.windows(2).all(|w| w[0].priority < w[1].priority));
        assert!(!panel[1].citations.is_empty());
    }
}
