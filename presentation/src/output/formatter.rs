//! Output formatter trait and the JSON formatter

use ckm_application::TurnOutput;
use serde_json::json;

/// Trait for formatting consultation turns
pub trait OutputFormatter {
    fn format_turn(&self, output: &TurnOutput) -> String;
}

/// One pretty-printed JSON document per turn
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn to_value(output: &TurnOutput) -> serde_json::Value {
        match output {
            TurnOutput::Prompt(prompt) => json!({ "prompt": prompt }),
            TurnOutput::View(view) => json!(view),
            TurnOutput::Error { message, prompt } => json!({
                "error": message,
                "prompt": prompt,
            }),
            TurnOutput::Cancelled => json!({ "cancelled": true }),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_turn(&self, output: &TurnOutput) -> String {
        serde_json::to_string_pretty(&Self::to_value(output)).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckm_domain::{Decision, IntakePrompt, RenderedView, Snapshot};

    #[test]
    fn test_view_is_tagged() {
        let view = RenderedView::Snapshot(Snapshot {
            problem: "Review".into(),
            facts: vec![],
            risks: vec![],
            decision: Decision {
                needed: false,
                rationale: String::new(),
            },
            next_steps: vec![],
            truncated: true,
        });
        let value = JsonFormatter::to_value(&TurnOutput::View(view));
        assert_eq!(value["view"], "snapshot");
        assert_eq!(value["problem"], "Review");
        assert_eq!(value["truncated"], true);
    }

    #[test]
    fn test_prompt_and_cancel() {
        let prompt = IntakePrompt::new(Some("Hello".into()), vec!["Mode?".to_string()]);
        let value = JsonFormatter::to_value(&TurnOutput::Prompt(prompt));
        assert_eq!(value["prompt"]["message"], "Hello");
        assert_eq!(value["prompt"]["questions"][0], "Mode?");

        let text = JsonFormatter.format_turn(&TurnOutput::Cancelled);
        assert!(text.contains("\"cancelled\": true"));
    }
}
