//! Console output formatter for consultation turns

use crate::output::formatter::OutputFormatter;
use ckm_application::TurnOutput;
use ckm_domain::{
    AssessmentStatus, CitationView, IntakePrompt, MedicationTable, RationaleView, RenderedView,
    Snapshot,
};
use colored::Colorize;

/// Shown under every rendered view
const VIEW_HINT: &str =
    "Details: A) medication table  B) specialist rationale  C) citations  |  back";

/// Formats consultation turns for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format one turn's output
    pub fn format_turn(output: &TurnOutput) -> String {
        match output {
            TurnOutput::Prompt(prompt) => Self::format_prompt(prompt),
            TurnOutput::View(view) => Self::format_view(view),
            TurnOutput::Error { message, prompt } => {
                format!(
                    "{} {}\n\n{}",
                    "!".red().bold(),
                    message.red(),
                    Self::format_prompt(prompt)
                )
            }
            TurnOutput::Cancelled => format!(
                "{}\n",
                "Consultation reset. The previous submission was discarded.".yellow()
            ),
        }
    }

    pub fn format_prompt(prompt: &IntakePrompt) -> String {
        let mut output = String::new();
        if let Some(message) = &prompt.message {
            output.push_str(message);
            output.push('\n');
        }
        for (i, question) in prompt.questions().iter().enumerate() {
            output.push_str(&format!("{} {}\n", format!("{}.", i + 1).cyan().bold(), question));
        }
        output
    }

    pub fn format_view(view: &RenderedView) -> String {
        let body = match view {
            RenderedView::Snapshot(snapshot) => Self::format_snapshot(snapshot),
            RenderedView::Table(table) => Self::format_table(table),
            RenderedView::Rationale(rationale) => Self::format_rationale(rationale),
            RenderedView::Citations(citations) => Self::format_citations(citations),
        };
        format!("{}\n{}\n", body, VIEW_HINT.dimmed())
    }

    pub fn format_snapshot(snapshot: &Snapshot) -> String {
        let mut output = Self::header("Consultation Snapshot");
        output.push('\n');
        for line in snapshot.render().lines() {
            if Self::is_section_line(line) {
                output.push_str(&format!("{}\n", line.cyan().bold()));
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }
        if snapshot.truncated {
            output.push_str(&format!(
                "\n{}\n",
                "Note: shortened to fit the word limit; see B) for full rationale.".yellow()
            ));
        }
        output.push_str(&Self::footer());
        output
    }

    pub fn format_table(table: &MedicationTable) -> String {
        let mut output = Self::section_header("A) Peri-operative Medication Table");
        if table.rows.is_empty() {
            output.push_str("No managed medications listed.\n");
        } else {
            let width = table
                .rows
                .iter()
                .map(|r| r.medication.chars().count())
                .max()
                .unwrap_or(0)
                .max("Medication".len());
            output.push_str(&format!(
                "{:<width$}  {}\n",
                "Medication".bold(),
                "Continue / Hold / Restart / Owner".bold(),
                width = width
            ));
            for row in &table.rows {
                output.push_str(&format!("{:<width$}  ", row.medication, width = width));
                output.push_str(&format!("{} {}\n", "Continue:".green(), row.continue_));
                let pad = " ".repeat(width + 2);
                output.push_str(&format!("{}{} {}\n", pad, "Hold:".red(), row.hold));
                output.push_str(&format!("{}{} {}\n", pad, "Restart:".yellow(), row.restart));
                output.push_str(&format!("{}{} {}\n", pad, "Owner:".dimmed(), row.owner));
                for note in &row.notes {
                    output.push_str(&format!("{}* {}\n", pad, note));
                }
            }
        }
        if !table.unmatched.is_empty() {
            output.push_str(&format!(
                "\n{} {}\n",
                "Not in the managed list:".dimmed(),
                table.unmatched.join(", ")
            ));
        }
        output
    }

    pub fn format_rationale(view: &RationaleView) -> String {
        let mut output = Self::section_header("B) Specialist Rationale");
        for role in &view.roles {
            let title = format!("-- {} --", role.role.display_name());
            match role.status {
                AssessmentStatus::Ok => {
                    output.push_str(&format!("\n{}\n", title.yellow().bold()));
                    output.push_str(&Self::indent(&Self::bullets(&role.bullets), "  "));
                    output.push('\n');
                }
                AssessmentStatus::TimedOut | AssessmentStatus::Failed => {
                    output.push_str(&format!(
                        "\n{}\n  {}\n",
                        title.red().bold(),
                        role.error.as_deref().unwrap_or("no assessment")
                    ));
                }
            }
        }
        if !view.agreements.is_empty() {
            output.push_str(&format!("\n{}\n", "Agreed across roles:".green().bold()));
            output.push_str(&Self::bullets(&view.agreements));
        }
        if !view.resolutions.is_empty() {
            output.push_str(&format!("\n{}\n", "Conflicts resolved:".yellow().bold()));
            output.push_str(&Self::bullets(&view.resolutions));
        }
        output
    }

    pub fn format_citations(view: &CitationView) -> String {
        let mut output = Self::section_header("C) Guideline Citations");
        for role in &view.roles {
            output.push_str(&format!(
                "\n{}\n",
                format!("-- {} --", role.role.display_name()).yellow().bold()
            ));
            if role.references.is_empty() && role.cited.is_empty() {
                output.push_str("  (none)\n");
                continue;
            }
            output.push_str(&Self::indent(&Self::bullets(&role.references), "  "));
            output.push('\n');
            if !role.cited.is_empty() {
                output.push_str(&format!("  {}\n", "Cited in assessment:".dimmed()));
                output.push_str(&Self::indent(&Self::bullets(&role.cited), "    "));
                output.push('\n');
            }
        }
        output
    }

    fn is_section_line(line: &str) -> bool {
        let mut chars = line.chars();
        matches!(
            (chars.next(), chars.next()),
            (Some('A'..='E'), Some(')'))
        )
    }

    fn bullets(items: &[String]) -> String {
        items
            .iter()
            .map(|item| format!("* {}\n", item))
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_turn(&self, output: &TurnOutput) -> String {
        Self::format_turn(output)
    }
}
