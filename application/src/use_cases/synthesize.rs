//! Synthesize use case
//!
//! Builds the directives for one joined assessment, calls the synthesis
//! provider, and validates the parsed Snapshot with bounded regeneration.

use crate::config::BoardConfig;
use crate::ports::progress::{BoardPhase, NoProgress, ProgressNotifier};
use crate::ports::synthesis_provider::SynthesisProvider;
use ckm_domain::synthesis::agreement::{apply_agreements, find_agreements};
use ckm_domain::synthesis::conflict::{detect_conflicts, enforce_resolutions, resolve};
use ckm_domain::synthesis::critical::{inject_flags, missing_rules};
use ckm_domain::synthesis::overrides::{apply_overrides, evaluate};
use ckm_domain::synthesis::parsing::{ParsedSnapshot, parse_snapshot};
use ckm_domain::synthesis::validation::{fit_to_limit, validate};
use ckm_domain::{
    ConflictPriority, Decision, FinalCase, JoinedAssessment, NextStep, Resolution, Snapshot,
    SynthesisDirectives, SynthesisOutput, SynthesisRequest, ValidationIssue,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Step added when no provider attempt produced a Snapshot
const FALLBACK_STEP: &str = "Review specialist assessments individually";

/// Decision rationale used when a peri-operative case turns the flag on
const PERIOP_RATIONALE: &str = "Peri-operative medication plan";

/// Observer for each provider attempt, used for the conversation log
pub trait AttemptObserver: Send + Sync {
    fn on_attempt(&self, attempt: u32, issues: &[ValidationIssue]);
}

/// No-op observer
pub struct NoAttemptObserver;

impl AttemptObserver for NoAttemptObserver {
    fn on_attempt(&self, _attempt: u32, _issues: &[ValidationIssue]) {}
}

/// Use case for turning a joined assessment into a Snapshot
pub struct SynthesisStage<S: SynthesisProvider + 'static> {
    provider: Arc<S>,
}

impl<S: SynthesisProvider + 'static> SynthesisStage<S> {
    pub fn new(provider: Arc<S>) -> Self {
        Self { provider }
    }

    /// Synthesize with default (no-op) progress
    pub async fn synthesize(
        &self,
        case: &FinalCase,
        joined: &JoinedAssessment,
        config: &BoardConfig,
    ) -> SynthesisOutput {
        self.synthesize_with_progress(case, joined, config, &NoProgress, &NoAttemptObserver)
            .await
    }

    /// Run the bounded synthesis loop.
    ///
    /// Never fails: provider errors count as invalid attempts and the last
    /// resort is a skeletal Snapshot built from the case, flagged truncated.
    pub async fn synthesize_with_progress(
        &self,
        case: &FinalCase,
        joined: &JoinedAssessment,
        config: &BoardConfig,
        progress: &dyn ProgressNotifier,
        observer: &dyn AttemptObserver,
    ) -> SynthesisOutput {
        info!("Synthesizing {} role assessments", joined.successful().count());
        progress.on_phase_start(&BoardPhase::Synthesis, 1);

        let agreements = find_agreements(joined);
        let fired = evaluate(&config.safety_overrides, case);
        let resolutions: Vec<Resolution> = detect_conflicts(joined)
            .iter()
            .map(|c| resolve(c, &config.roles, &fired))
            .collect();
        let flags: Vec<String> = missing_rules(case, &config.critical_fields)
            .into_iter()
            .map(|r| r.flag.clone())
            .collect();
        let decision_required = case.periop() == Some(true);

        debug!(
            agreements = agreements.len(),
            resolutions = resolutions.len(),
            overrides = fired.len(),
            flags = flags.len(),
            "Synthesis directives prepared"
        );

        let mut directives = SynthesisDirectives {
            deduplicate: true,
            agreements: agreements.clone(),
            missing_flags: flags.clone(),
            conflict_priority: ConflictPriority::ORDER.to_vec(),
            resolutions: resolutions.clone(),
            safety_overrides: fired.clone(),
            word_limit: config.word_limit,
            decision_required,
            feedback: Vec::new(),
        };

        let max_attempts = config.max_attempts();
        let mut best: Option<ParsedSnapshot> = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts {
            attempts = attempt;
            progress.on_synthesis_attempt(attempt);
            let request = SynthesisRequest {
                case: case.clone(),
                joined: joined.clone(),
                directives: directives.clone(),
                attempt,
            };

            let issues = match self.provider.synthesize(&request).await {
                Ok(text) => {
                    let mut parsed = parse_snapshot(&text);
                    let snapshot = &mut parsed.snapshot;
                    enforce_resolutions(snapshot, &resolutions);
                    apply_overrides(snapshot, &fired);
                    apply_agreements(snapshot, &agreements);
                    inject_flags(snapshot, &flags);
                    if decision_required && !snapshot.decision.needed {
                        snapshot.decision = Decision {
                            needed: true,
                            rationale: PERIOP_RATIONALE.to_string(),
                        };
                    }
                    let issues = validate(&parsed, config.word_limit);
                    best = Some(parsed);
                    issues
                }
                Err(e) => {
                    warn!("Synthesis attempt {} failed: {}", attempt, e);
                    vec![ValidationIssue::ProviderFailure {
                        message: e.to_string(),
                    }]
                }
            };
            observer.on_attempt(attempt, &issues);

            if issues.is_empty() {
                info!("Snapshot valid after {} attempt(s)", attempt);
                progress.on_phase_complete(&BoardPhase::Synthesis);
                let Some(parsed) = best else {
                    break;
                };
                return SynthesisOutput {
                    snapshot: parsed.snapshot,
                    agreements,
                    resolutions,
                    fired_overrides: fired,
                    attempts,
                };
            }

            debug!(attempt, issues = issues.len(), "Snapshot rejected");
            directives.feedback = issues;
        }

        let snapshot = match best {
            Some(parsed) => {
                warn!(
                    "Snapshot still invalid after {} attempts; returning best effort",
                    attempts
                );
                let mut snapshot = parsed.snapshot;
                fit_to_limit(&mut snapshot, config.word_limit, &flags);
                snapshot.truncated = true;
                snapshot
            }
            None => {
                warn!("No synthesis attempt succeeded; building skeletal snapshot");
                skeleton(case, &flags, decision_required)
            }
        };
        progress.on_phase_complete(&BoardPhase::Synthesis);

        SynthesisOutput {
            snapshot,
            agreements,
            resolutions,
            fired_overrides: fired,
            attempts,
        }
    }
}

/// Snapshot built from the case alone
fn skeleton(case: &FinalCase, flags: &[String], decision_required: bool) -> Snapshot {
    let mut snapshot = Snapshot {
        problem: case
            .primary_question()
            .unwrap_or("CKM consultation")
            .to_string(),
        facts: Vec::new(),
        risks: Vec::new(),
        decision: Decision {
            needed: decision_required,
            rationale: "Synthesis unavailable".to_string(),
        },
        next_steps: vec![NextStep::new(FALLBACK_STEP, "Primary team", "Today")],
        truncated: true,
    };
    inject_flags(&mut snapshot, flags);
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::assessment_provider::ProviderError;
    use async_trait::async_trait;
    use ckm_domain::{
        AssessmentResult, Case, CaseField, FieldValue, MedAction, MedicationClass, Role, RoleSpec,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const VALID: &str = "A) One-Line Problem: Pre-op CKM optimisation\n\
B) Key Facts:\n1. HFrEF\n2. CKD 3b\nC) Key Risks:\n1. AKI\n\
D) Decisions Needed Today: Yes — peri-operative plan\n\
E) Next Steps:\n- **Continue beta-blocker** — Cardiology (Today)\n";

    /// Synthesis provider returning scripted replies and recording requests
    struct ScriptedSynthesis {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        requests: Mutex<Vec<SynthesisRequest>>,
    }

    impl ScriptedSynthesis {
        fn new(replies: Vec<Result<&str, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SynthesisProvider for ScriptedSynthesis {
        async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, ProviderError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".into())))
        }
    }

    fn case_with(fields: Vec<(CaseField, FieldValue)>) -> FinalCase {
        let mut case = Case::new();
        for (field, value) in fields {
            case.set(field, value).unwrap();
        }
        case.finalize()
    }

    fn full_case() -> FinalCase {
        case_with(vec![
            (CaseField::PrimaryQuestion, FieldValue::text("Medication review")),
            (CaseField::Periop, FieldValue::Flag(false)),
            (CaseField::EjectionFraction, FieldValue::Measure(35.0)),
            (CaseField::Egfr, FieldValue::Measure(45.0)),
            (CaseField::Hba1c, FieldValue::Measure(7.5)),
        ])
    }

    fn joined(payloads: Vec<(Role, &str)>) -> JoinedAssessment {
        JoinedAssessment::assemble(
            &RoleSpec::default_panel(),
            payloads
                .into_iter()
                .map(|(role, text)| AssessmentResult::ok(role, text, 1))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_valid_first_attempt() {
        let provider = ScriptedSynthesis::new(vec![Ok(VALID)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let output = stage
            .synthesize(&full_case(), &joined(vec![]), &BoardConfig::default())
            .await;
        assert_eq!(output.attempts, 1);
        assert!(!output.snapshot.truncated);
        assert_eq!(output.snapshot.problem, "Pre-op CKM optimisation");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_section_retries_with_feedback() {
        let missing_c = "A) One-Line Problem: Review\nB) Key Facts:\n1. HF\n\
D) Decisions Needed Today: No — stable\nE) Next Steps:\n- Recheck labs — PCP (2 weeks)\n";
        let provider = ScriptedSynthesis::new(vec![Ok(missing_c), Ok(VALID)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let output = stage
            .synthesize(&full_case(), &joined(vec![]), &BoardConfig::default())
            .await;

        assert_eq!(output.attempts, 2);
        assert!(!output.snapshot.truncated);
        let requests = provider.requests.lock().unwrap();
        assert!(requests[0].directives.feedback.is_empty());
        assert!(requests[1].directives.feedback.iter().any(|i| matches!(
            i,
            ValidationIssue::MissingSection { .. }
        )));
    }

    #[tokio::test]
    async fn test_retry_bound_then_truncated() {
        let long_fact = "word ".repeat(60);
        let long = format!(
            "A) One-Line Problem: Review\nB) Key Facts:\n1. {0}\n2. {0}\n3. {0}\n4. {0}\n\
C) Key Risks:\n1. {0}\nD) Decisions Needed Today: No — stable\nE) Next Steps:\n- Recheck — PCP (Today)\n",
            long_fact
        );
        let provider = ScriptedSynthesis::new(vec![Ok(long.as_str()), Ok(long.as_str()), Ok(VALID)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let output = stage
            .synthesize(&full_case(), &joined(vec![]), &BoardConfig::default())
            .await;

        assert_eq!(provider.calls(), 2);
        assert!(output.snapshot.truncated);
        assert!(output.snapshot.word_count() <= 250);
    }

    #[tokio::test]
    async fn test_all_attempts_fail_gives_skeleton() {
        let provider = ScriptedSynthesis::new(vec![
            Err(ProviderError::Timeout),
            Err(ProviderError::ConnectionError("refused".into())),
        ]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let case = case_with(vec![(
            CaseField::PrimaryQuestion,
            FieldValue::text("Pre-op clearance"),
        )]);
        let output = stage
            .synthesize(&case, &joined(vec![]), &BoardConfig::default())
            .await;

        assert!(output.snapshot.truncated);
        assert_eq!(output.snapshot.problem, "Pre-op clearance");
        assert!(output.snapshot.has_fact("HF phenotype unclear; EF not provided"));
        assert_eq!(output.snapshot.next_steps[0].action, FALLBACK_STEP);
    }

    #[tokio::test]
    async fn test_missing_fields_flagged_even_if_provider_omits_them() {
        let provider = ScriptedSynthesis::new(vec![Ok(VALID)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let case = case_with(vec![
            (CaseField::PrimaryQuestion, FieldValue::text("Review")),
            (CaseField::Egfr, FieldValue::Measure(40.0)),
            (CaseField::Hba1c, FieldValue::Measure(7.0)),
        ]);
        let output = stage
            .synthesize(&case, &joined(vec![]), &BoardConfig::default())
            .await;

        assert!(output.snapshot.has_fact("HF phenotype unclear; EF not provided"));
        assert!(!output.snapshot.has_fact("CKD staging unclear; eGFR not provided"));
        let request = &provider.requests.lock().unwrap()[0];
        assert_eq!(
            request.directives.missing_flags,
            vec!["HF phenotype unclear; EF not provided".to_string()]
        );
    }

    #[tokio::test]
    async fn test_periop_sglt2i_held_and_decision_yes() {
        let reply = "A) One-Line Problem: Hip replacement clearance\n\
B) Key Facts:\n1. HFrEF\nC) Key Risks:\n1. Bleeding\n\
D) Decisions Needed Today: No — routine\n\
E) Next Steps:\n- **Continue empagliflozin** — Cardiology (Today)\n";
        let provider = ScriptedSynthesis::new(vec![Ok(reply)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let case = case_with(vec![
            (CaseField::PrimaryQuestion, FieldValue::text("Pre-op clearance")),
            (CaseField::Periop, FieldValue::Flag(true)),
            (CaseField::EjectionFraction, FieldValue::Measure(30.0)),
            (CaseField::Egfr, FieldValue::Measure(50.0)),
            (CaseField::Hba1c, FieldValue::Measure(7.8)),
            (
                CaseField::Medications,
                FieldValue::List(vec!["empagliflozin".into(), "metoprolol".into()]),
            ),
        ]);
        let output = stage
            .synthesize(&case, &joined(vec![]), &BoardConfig::default())
            .await;

        assert!(output.snapshot.decision.needed);
        assert_eq!(output.snapshot.decision.rationale, PERIOP_RATIONALE);
        let step = output
            .snapshot
            .next_steps
            .iter()
            .find(|s| MedicationClass::Sglt2i.is_mentioned_in(&s.action))
            .unwrap();
        assert_eq!(MedAction::detect(&step.action.to_lowercase()), Some(MedAction::Hold));
        assert_eq!(step.timing, "3-4 days pre-op");
        assert_eq!(output.fired_overrides.len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_resolved_by_safety_priority() {
        let provider = ScriptedSynthesis::new(vec![Ok(VALID)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let panel = joined(vec![
            (
                Role::Cardiology,
                "- Continue lisinopril for guideline-directed HFrEF therapy",
            ),
            (
                Role::Nephrology,
                "- Hold lisinopril given hyperkalemia and AKI risk",
            ),
        ]);
        let output = stage
            .synthesize(&full_case(), &panel, &BoardConfig::default())
            .await;

        assert_eq!(output.resolutions.len(), 1);
        let resolution = &output.resolutions[0];
        assert_eq!(resolution.action, MedAction::Hold);
        assert_eq!(resolution.winner, Some(Role::Nephrology));
        assert!(output.snapshot.next_steps.iter().any(|s| {
            MedicationClass::AceiArb.is_mentioned_in(&s.action)
                && MedAction::detect(&s.action.to_lowercase()) == Some(MedAction::Hold)
        }));
    }

    #[tokio::test]
    async fn test_agreed_recommendation_appears_once() {
        let reply = "A) One-Line Problem: CKD with HFrEF\n\
B) Key Facts:\n1. eGFR 45\nC) Key Risks:\n1. Hyperkalemia\n\
D) Decisions Needed Today: No — outpatient\n\
E) Next Steps:\n- Continue ACE inhibitor — Cardiology (Ongoing)\n\
- Continue ACE inhibitor — Nephrology (Ongoing)\n";
        let provider = ScriptedSynthesis::new(vec![Ok(reply)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let panel = joined(vec![
            (Role::Cardiology, "- Continue ACE inhibitor"),
            (Role::Nephrology, "- Continue ACE inhibitor"),
        ]);
        let output = stage
            .synthesize(&full_case(), &panel, &BoardConfig::default())
            .await;

        let matching: Vec<_> = output
            .snapshot
            .next_steps
            .iter()
            .filter(|s| s.action.to_lowercase().contains("ace inhibitor"))
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(
            matching[0].agreed_by,
            vec![Role::Cardiology, Role::Nephrology]
        );
        assert_eq!(output.agreements.len(), 1);
    }

    #[tokio::test]
    async fn test_single_long_step_fitted_to_limit() {
        let long_step = format!(
            "A) One-Line Problem: Review\nB) Key Facts:\n1. HFrEF\nC) Key Risks:\n1. AKI\n\
D) Decisions Needed Today: No — stable\nE) Next Steps:\n- {} — PCP (Today)\n",
            "word ".repeat(300).trim()
        );
        let provider = ScriptedSynthesis::new(vec![Ok(long_step.as_str()), Ok(long_step.as_str())]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let output = stage
            .synthesize(&full_case(), &joined(vec![]), &BoardConfig::default())
            .await;

        assert_eq!(provider.calls(), 2);
        assert!(output.snapshot.truncated);
        assert!(output.snapshot.word_count() <= 250);
        assert_eq!(output.snapshot.next_steps.len(), 1);
    }

    #[tokio::test]
    async fn test_periop_case_flags_ef_and_hba1c_and_merges_agreed_hold() {
        let reply = "A) One-Line Problem: Pre-op CKM review\n\
B) Key Facts:\n1. eGFR 45\nC) Key Risks:\n1. Hyperkalemia\n\
D) Decisions Needed Today: No — routine\n\
E) Next Steps:\n- Hold ACE inhibitor 24h pre-op — Cardiology (Pre-op)\n\
- Hold ACE inhibitor 24h pre-op — Nephrology (Pre-op)\n";
        let provider = ScriptedSynthesis::new(vec![Ok(reply)]);
        let stage = SynthesisStage::new(Arc::clone(&provider));
        let case = case_with(vec![
            (CaseField::PrimaryQuestion, FieldValue::text("Pre-op medication plan")),
            (CaseField::Periop, FieldValue::Flag(true)),
            (CaseField::Egfr, FieldValue::Measure(45.0)),
            (CaseField::Medications, FieldValue::List(vec!["lisinopril".into()])),
        ]);
        let panel = joined(vec![
            (Role::Cardiology, "- Hold ACE inhibitor 24h pre-op"),
            (Role::Nephrology, "- Hold ACE inhibitor 24h pre-op"),
        ]);
        let output = stage
            .synthesize(&case, &panel, &BoardConfig::default())
            .await;

        let snapshot = &output.snapshot;
        assert!(snapshot.has_fact("HF phenotype unclear; EF not provided"));
        assert!(snapshot.has_fact("Glycemic control unclear; HbA1c not provided"));
        assert!(!snapshot.has_fact("CKD staging unclear; eGFR not provided"));
        assert!(snapshot.decision.needed);
        assert_eq!(snapshot.decision.rationale, PERIOP_RATIONALE);
        assert!(output.resolutions.is_empty());

        let holds: Vec<_> = snapshot
            .next_steps
            .iter()
            .filter(|s| s.action.to_lowercase().contains("hold ace inhibitor"))
            .collect();
        assert_eq!(holds.len(), 1);
        assert_eq!(holds[0].agreed_by, vec![Role::Cardiology, Role::Nephrology]);
        assert!(snapshot.render().contains("Decisions Needed Today: Yes — Peri-operative"));
    }
}
