//! Intake use case
//!
//! Drives the intake state machine one user turn at a time. The session owns
//! the Draft case and is the only place where it becomes `Final`.

use crate::ports::intake_parser::IntakeParser;
use ckm_domain::case::extract::{extract_measurement, parse_yes_no, split_answers, split_list};
use ckm_domain::intake::questions::{PASTE_REQUEST, WELCOME, pending_questions};
use ckm_domain::{
    Case, CaseDiff, CaseField, DomainError, FieldKind, FieldValue, FinalCase, IntakeMode,
    IntakePrompt, IntakeSignal, IntakeState,
};
use thiserror::Error;
use tracing::{debug, info};

/// Message shown once the case is committed
pub const COMPILING: &str = "Compiling case for the specialist panel...";

/// Errors that leave the intake state unchanged
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntakeError {
    #[error("Invalid input in {state}: {reason}")]
    InvalidTransition { state: IntakeState, reason: String },

    #[error("Could not read the pasted case: {0}")]
    IntakeParseFailure(String),
}

impl IntakeError {
    fn invalid(state: IntakeState, reason: impl Into<String>) -> Self {
        IntakeError::InvalidTransition {
            state,
            reason: reason.into(),
        }
    }
}

/// Result of one accepted intake turn
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeTurn {
    pub next_prompt: IntakePrompt,
    /// Assignments made (or proposed, in paste mode) this turn
    pub case_delta: CaseDiff,
    /// The case reached `Final`; fetch it with [`IntakeSession::take_final`]
    pub finalized: bool,
}

#[derive(Debug, Clone)]
enum CaseSlot {
    Draft(Case),
    Final(FinalCase),
}

/// Turn-based intake session for one conversation
#[derive(Debug, Clone)]
pub struct IntakeSession {
    case: CaseSlot,
    mode: IntakeMode,
    state: IntakeState,
    /// Parsed paste awaiting confirmation
    pending: Option<CaseDiff>,
    handoff: Option<FinalCase>,
}

impl Default for IntakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IntakeSession {
    pub fn new() -> Self {
        Self {
            case: CaseSlot::Draft(Case::new()),
            mode: IntakeMode::Undetermined,
            state: IntakeState::AwaitingMode,
            pending: None,
            handoff: None,
        }
    }

    pub fn state(&self) -> IntakeState {
        self.state
    }

    pub fn mode(&self) -> IntakeMode {
        self.mode
    }

    pub fn case(&self) -> &Case {
        match &self.case {
            CaseSlot::Draft(case) => case,
            CaseSlot::Final(case) => case.case(),
        }
    }

    pub fn pending_diff(&self) -> Option<&CaseDiff> {
        self.pending.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    /// Hand the finalized case over; returns `None` until finalization and after the first call
    pub fn take_final(&mut self) -> Option<FinalCase> {
        self.handoff.take()
    }

    /// Prompt for the current state, used to open a session or re-ask after an error
    pub fn current_prompt(&self) -> IntakePrompt {
        match self.state {
            IntakeState::AwaitingMode => IntakePrompt::message(WELCOME),
            IntakeState::AwaitingPaste => IntakePrompt::message(PASTE_REQUEST),
            IntakeState::AwaitingConfirm => match &self.pending {
                Some(diff) => IntakePrompt::confirm(diff),
                None => IntakePrompt::message(PASTE_REQUEST),
            },
            IntakeState::ReadyToFinalize => IntakePrompt::message(COMPILING),
            guided => IntakePrompt::for_state(guided, self.case(), None),
        }
    }

    /// Process one user turn
    pub async fn submit(
        &mut self,
        input: &str,
        parser: &dyn IntakeParser,
    ) -> Result<IntakeTurn, IntakeError> {
        if self.is_terminated() {
            return Err(IntakeError::invalid(self.state, "intake is already finalized"));
        }
        let signal = IntakeSignal::parse(input);
        debug!(state = %self.state, ?signal, "Intake turn");

        match self.state {
            IntakeState::AwaitingMode => self.choose_mode(signal),
            IntakeState::GuidedQ5 => self.concerns_turn(input, signal),
            state if state.is_guided() => self.guided_turn(input, signal),
            IntakeState::AwaitingPaste => self.paste_turn(input, parser).await,
            IntakeState::AwaitingConfirm => self.confirm_turn(input, signal, parser).await,
            state => Err(IntakeError::invalid(state, "no transition from this state")),
        }
    }

    fn choose_mode(&mut self, signal: Option<IntakeSignal>) -> Result<IntakeTurn, IntakeError> {
        match signal {
            Some(IntakeSignal::ChooseGuided) => {
                self.mode = IntakeMode::Guided;
                self.state = IntakeState::GuidedQ1;
            }
            Some(IntakeSignal::ChoosePaste) => {
                self.mode = IntakeMode::Paste;
                self.state = IntakeState::AwaitingPaste;
            }
            _ => {
                return Err(IntakeError::invalid(
                    self.state,
                    "reply 1 for guided intake or 2 for paste mode",
                ));
            }
        }
        info!(mode = ?self.mode, "Intake mode selected");
        Ok(self.turn(CaseDiff::new()))
    }

    fn guided_turn(
        &mut self,
        input: &str,
        signal: Option<IntakeSignal>,
    ) -> Result<IntakeTurn, IntakeError> {
        if signal.is_some_and(|s| s.is_commit()) {
            return Err(IntakeError::invalid(
                self.state,
                "answer the current questions before generating the synthesis",
            ));
        }
        let questions = pending_questions(self.state, self.case());
        // a single-question batch takes the whole reply
        let answers = if questions.len() == 1 {
            Some(input.trim().to_string())
                .filter(|a| !a.is_empty())
                .into_iter()
                .collect()
        } else {
            split_answers(input)
        };
        if answers.is_empty() {
            return Err(IntakeError::invalid(self.state, "no answer given"));
        }

        let mut diff = CaseDiff::new();
        for (question, answer) in questions.iter().zip(&answers) {
            let value = answer_value(self.state, question.field, answer)?;
            diff.set(question.field, value);
        }
        for field in [CaseField::EjectionFraction, CaseField::Egfr, CaseField::Hba1c] {
            if self.case().is_set(field) {
                continue;
            }
            if let Some(value) = answers.iter().find_map(|a| extract_measurement(a, field)) {
                diff.set(field, FieldValue::Measure(value));
            }
        }

        self.apply(&diff)?;
        if pending_questions(self.state, self.case()).is_empty() {
            self.state = self.state.next_guided(self.case().periop());
        }
        Ok(self.turn(diff))
    }

    fn concerns_turn(
        &mut self,
        input: &str,
        signal: Option<IntakeSignal>,
    ) -> Result<IntakeTurn, IntakeError> {
        match signal {
            Some(s) if s.is_commit() => Ok(self.finalize(CaseDiff::new())),
            Some(IntakeSignal::AddDetails) => Ok(self.turn(CaseDiff::new())),
            _ if input.trim().is_empty() => {
                Err(IntakeError::invalid(self.state, "no answer given"))
            }
            _ => {
                let concerns = match self.case().text(CaseField::Concerns) {
                    Some(existing) => format!("{}; {}", existing, input.trim()),
                    None => input.trim().to_string(),
                };
                let diff = CaseDiff::new().with(CaseField::Concerns, FieldValue::Text(concerns));
                self.apply(&diff)?;
                Ok(self.turn(diff))
            }
        }
    }

    async fn paste_turn(
        &mut self,
        input: &str,
        parser: &dyn IntakeParser,
    ) -> Result<IntakeTurn, IntakeError> {
        let diff = parse_paste(input, parser).await?;
        self.pending = Some(diff.clone());
        self.state = IntakeState::AwaitingConfirm;
        info!(fields = diff.len(), "Paste parsed, awaiting confirmation");
        Ok(self.turn(diff))
    }

    async fn confirm_turn(
        &mut self,
        input: &str,
        signal: Option<IntakeSignal>,
        parser: &dyn IntakeParser,
    ) -> Result<IntakeTurn, IntakeError> {
        let signal = signal.or_else(|| match parse_yes_no(input) {
            Some(true) if input.split_whitespace().count() == 1 => Some(IntakeSignal::Confirm),
            Some(false) if input.split_whitespace().count() == 1 => Some(IntakeSignal::Reject),
            _ => None,
        });

        match signal {
            Some(s) if s.is_commit() => {
                let diff = self.pending.clone().unwrap_or_default();
                self.apply(&diff)?;
                self.pending = None;
                Ok(self.finalize(diff))
            }
            Some(IntakeSignal::Reject) => {
                self.pending = None;
                self.state = IntakeState::AwaitingPaste;
                info!("Parsed paste rejected");
                Ok(IntakeTurn {
                    next_prompt: IntakePrompt::message(format!(
                        "Discarded. {}",
                        PASTE_REQUEST
                    )),
                    case_delta: CaseDiff::new(),
                    finalized: false,
                })
            }
            Some(IntakeSignal::AddDetails) => Ok(IntakeTurn {
                next_prompt: IntakePrompt::message("Type the additional details or corrections."),
                case_delta: CaseDiff::new(),
                finalized: false,
            }),
            _ => {
                let corrections = parse_paste(input, parser).await?;
                let mut merged = self.pending.take().unwrap_or_default();
                merged.merge(corrections.clone());
                self.pending = Some(merged);
                Ok(self.turn(corrections))
            }
        }
    }

    fn apply(&mut self, diff: &CaseDiff) -> Result<(), IntakeError> {
        let state = self.state;
        match &mut self.case {
            CaseSlot::Draft(case) => case
                .apply(diff)
                .map_err(|e| IntakeError::invalid(state, e.to_string())),
            CaseSlot::Final(_) => Err(IntakeError::invalid(
                state,
                DomainError::CaseFrozen.to_string(),
            )),
        }
    }

    /// The single commit point: Draft becomes Final here and nowhere else
    fn finalize(&mut self, case_delta: CaseDiff) -> IntakeTurn {
        let slot = std::mem::replace(&mut self.case, CaseSlot::Draft(Case::new()));
        let final_case = match slot {
            CaseSlot::Draft(case) => case.finalize(),
            CaseSlot::Final(case) => case,
        };
        info!(fields = final_case.fields().count(), "Case finalized");
        self.case = CaseSlot::Final(final_case.clone());
        self.handoff = Some(final_case);
        self.state = IntakeState::ReadyToFinalize;
        IntakeTurn {
            next_prompt: IntakePrompt::message(COMPILING),
            case_delta,
            finalized: true,
        }
    }

    fn turn(&self, case_delta: CaseDiff) -> IntakeTurn {
        IntakeTurn {
            next_prompt: self.current_prompt(),
            case_delta,
            finalized: false,
        }
    }
}

fn answer_value(state: IntakeState, field: CaseField, answer: &str) -> Result<FieldValue, IntakeError> {
    match field.kind() {
        FieldKind::Flag => parse_yes_no(answer).map(FieldValue::Flag).ok_or_else(|| {
            IntakeError::invalid(state, format!("answer Yes or No for {}", field.label()))
        }),
        FieldKind::List => Ok(FieldValue::List(split_list(answer))),
        FieldKind::Measure => extract_measurement(answer, field)
            .or_else(|| answer.trim().trim_end_matches('%').parse().ok())
            .map(FieldValue::Measure)
            .ok_or_else(|| {
                IntakeError::invalid(state, format!("expected a number for {}", field.label()))
            }),
        FieldKind::Text => Ok(FieldValue::text(answer)),
    }
}

async fn parse_paste(input: &str, parser: &dyn IntakeParser) -> Result<CaseDiff, IntakeError> {
    if input.trim().is_empty() {
        return Err(IntakeError::IntakeParseFailure("nothing was pasted".to_string()));
    }
    let diff = parser
        .parse(input)
        .await
        .map_err(|e| IntakeError::IntakeParseFailure(e.to_string()))?;
    if diff.is_empty() {
        return Err(IntakeError::IntakeParseFailure(
            "no case fields were recognized".to_string(),
        ));
    }
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::assessment_provider::ProviderError;
    use async_trait::async_trait;
    use ckm_domain::MAX_QUESTIONS_PER_TURN;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Parser returning scripted results in order
    struct ScriptedParser {
        results: Mutex<VecDeque<Result<CaseDiff, ProviderError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedParser {
        fn new(results: Vec<Result<CaseDiff, ProviderError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl IntakeParser for ScriptedParser {
        async fn parse(&self, _text: &str) -> Result<CaseDiff, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(CaseDiff::new()))
        }
    }

    fn no_parser() -> ScriptedParser {
        ScriptedParser::new(vec![])
    }

    fn paste_diff() -> CaseDiff {
        CaseDiff::new()
            .with(CaseField::PrimaryQuestion, FieldValue::text("Medication review"))
            .with(CaseField::Egfr, FieldValue::Measure(38.0))
    }

    #[tokio::test]
    async fn test_invalid_mode_keeps_state() {
        let mut session = IntakeSession::new();
        let err = session.submit("hello", &no_parser()).await.unwrap_err();
        assert!(matches!(err, IntakeError::InvalidTransition { .. }));
        assert_eq!(session.state(), IntakeState::AwaitingMode);
    }

    #[tokio::test]
    async fn test_guided_flow_periop_includes_procedure() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("1", &parser).await.unwrap();
        assert_eq!(session.state(), IntakeState::GuidedQ1);

        let turn = session
            .submit("Pre-op clearance for hip replacement\nYes", &parser)
            .await
            .unwrap();
        assert_eq!(session.state(), IntakeState::GuidedQ2);
        assert_eq!(turn.case_delta.get(CaseField::Periop), Some(&FieldValue::Flag(true)));

        session
            .submit("Elective hip replacement, moderate bleeding risk", &parser)
            .await
            .unwrap();
        assert_eq!(session.state(), IntakeState::GuidedQ3);

        let turn = session
            .submit("HFrEF, EF 35%\nCKD 3b, eGFR 38\nT2DM, HbA1c 8.1", &parser)
            .await
            .unwrap();
        assert_eq!(
            turn.case_delta.get(CaseField::EjectionFraction),
            Some(&FieldValue::Measure(35.0))
        );
        assert_eq!(session.case().measure(CaseField::Egfr), Some(38.0));
        assert_eq!(session.case().measure(CaseField::Hba1c), Some(8.1));
        assert_eq!(session.state(), IntakeState::GuidedQ4);

        session
            .submit("empagliflozin, metformin, lisinopril", &parser)
            .await
            .unwrap();
        assert_eq!(session.state(), IntakeState::GuidedQ5);
        assert_eq!(session.case().medications().map(|m| m.len()), Some(3));

        let turn = session.submit("Generate synthesis", &parser).await.unwrap();
        assert!(turn.finalized);
        assert_eq!(session.state(), IntakeState::ReadyToFinalize);
        let final_case = session.take_final().unwrap();
        assert!(!final_case.is_draft());
        assert!(session.take_final().is_none());
    }

    #[tokio::test]
    async fn test_not_periop_skips_procedure() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("guided", &parser).await.unwrap();
        session
            .submit("Optimize GDMT; No", &parser)
            .await
            .unwrap();
        assert_eq!(session.state(), IntakeState::GuidedQ3);
    }

    #[tokio::test]
    async fn test_partial_batch_reasks_remaining() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("1", &parser).await.unwrap();
        let turn = session.submit("Pre-op clearance", &parser).await.unwrap();
        assert_eq!(session.state(), IntakeState::GuidedQ1);
        assert_eq!(turn.next_prompt.questions().len(), 1);
        assert!(turn.next_prompt.questions()[0].contains("peri-operative"));
    }

    #[tokio::test]
    async fn test_bad_flag_rejects_whole_turn() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("1", &parser).await.unwrap();
        let err = session
            .submit("Medication review\nmaybe", &parser)
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidTransition { .. }));
        assert!(!session.case().is_set(CaseField::PrimaryQuestion));
        assert_eq!(session.state(), IntakeState::GuidedQ1);
    }

    #[tokio::test]
    async fn test_no_medications_sets_empty_list() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("1", &parser).await.unwrap();
        session.submit("Review\nNo", &parser).await.unwrap();
        session.submit("EF unknown\neGFR 50\nno diabetes", &parser).await.unwrap();
        assert!(!session.case().is_set(CaseField::EjectionFraction));
        session.submit("none", &parser).await.unwrap();
        assert_eq!(session.case().medications(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_concerns_recorded_and_q5_reasked() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("1", &parser).await.unwrap();
        session.submit("Review\nNo", &parser).await.unwrap();
        session.submit("HF\nCKD\nDM", &parser).await.unwrap();
        session.submit("none", &parser).await.unwrap();

        let turn = session.submit("Worried about hypoglycemia", &parser).await.unwrap();
        assert!(!turn.finalized);
        assert_eq!(session.state(), IntakeState::GuidedQ5);
        assert_eq!(
            session.case().text(CaseField::Concerns),
            Some("Worried about hypoglycemia")
        );
    }

    #[tokio::test]
    async fn test_commit_only_allowed_at_q5() {
        let parser = no_parser();
        let mut session = IntakeSession::new();
        session.submit("1", &parser).await.unwrap();
        let err = session.submit("Generate synthesis", &parser).await.unwrap_err();
        assert!(matches!(err, IntakeError::InvalidTransition { .. }));
        assert!(session.take_final().is_none());
    }

    #[tokio::test]
    async fn test_paste_confirm_finalizes() {
        let parser = ScriptedParser::new(vec![Ok(paste_diff())]);
        let mut session = IntakeSession::new();
        session.submit("2", &parser).await.unwrap();
        assert_eq!(session.state(), IntakeState::AwaitingPaste);

        let turn = session.submit("68M, eGFR 38 ...", &parser).await.unwrap();
        assert_eq!(session.state(), IntakeState::AwaitingConfirm);
        assert_eq!(turn.case_delta.len(), 2);
        // nothing is applied before confirmation
        assert!(!session.case().is_set(CaseField::Egfr));

        let turn = session.submit("Confirm", &parser).await.unwrap();
        assert!(turn.finalized);
        let final_case = session.take_final().unwrap();
        assert_eq!(final_case.measure(CaseField::Egfr), Some(38.0));
    }

    #[tokio::test]
    async fn test_paste_reject_discards_diff() {
        let parser = ScriptedParser::new(vec![Ok(paste_diff())]);
        let mut session = IntakeSession::new();
        session.submit("2", &parser).await.unwrap();
        session.submit("case text", &parser).await.unwrap();
        session.submit("reject", &parser).await.unwrap();
        assert_eq!(session.state(), IntakeState::AwaitingPaste);
        assert!(session.pending_diff().is_none());
        assert!(!session.case().is_set(CaseField::Egfr));
    }

    #[tokio::test]
    async fn test_malformed_paste_stays_and_is_not_retried() {
        let parser = ScriptedParser::new(vec![Err(ProviderError::InvalidResponse(
            "not json".into(),
        ))]);
        let mut session = IntakeSession::new();
        session.submit("2", &parser).await.unwrap();
        let err = session.submit("garbage", &parser).await.unwrap_err();
        assert!(matches!(err, IntakeError::IntakeParseFailure(_)));
        assert_eq!(session.state(), IntakeState::AwaitingPaste);
        assert_eq!(parser.calls(), 1);
    }

    #[tokio::test]
    async fn test_corrections_merge_into_pending() {
        let correction = CaseDiff::new().with(CaseField::Egfr, FieldValue::Measure(28.0));
        let parser = ScriptedParser::new(vec![Ok(paste_diff()), Ok(correction)]);
        let mut session = IntakeSession::new();
        session.submit("2", &parser).await.unwrap();
        session.submit("case text", &parser).await.unwrap();
        session.submit("eGFR is actually 28", &parser).await.unwrap();
        assert_eq!(session.state(), IntakeState::AwaitingConfirm);
        assert_eq!(
            session.pending_diff().unwrap().get(CaseField::Egfr),
            Some(&FieldValue::Measure(28.0))
        );
        session.submit("yes", &parser).await.unwrap();
        assert_eq!(session.take_final().unwrap().measure(CaseField::Egfr), Some(28.0));
    }

    #[tokio::test]
    async fn test_submit_after_termination_is_invalid() {
        let parser = ScriptedParser::new(vec![Ok(paste_diff())]);
        let mut session = IntakeSession::new();
        session.submit("2", &parser).await.unwrap();
        session.submit("case", &parser).await.unwrap();
        session.submit("confirm", &parser).await.unwrap();
        let err = session.submit("more", &parser).await.unwrap_err();
        assert!(matches!(err, IntakeError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_question_cap_holds_for_every_reachable_state() {
        let parser = ScriptedParser::new(vec![Ok(paste_diff())]);
        let mut session = IntakeSession::new();
        let inputs = ["1", "Review\nYes", "Surgery", "HF\nCKD\nDM", "none", "concern"];
        assert!(session.current_prompt().questions().len() <= MAX_QUESTIONS_PER_TURN);
        for input in inputs {
            let turn = session.submit(input, &parser).await.unwrap();
            assert!(turn.next_prompt.questions().len() <= MAX_QUESTIONS_PER_TURN);
        }

        let mut paste = IntakeSession::new();
        for input in ["2", "case", "Confirm"] {
            let turn = paste.submit(input, &parser).await.unwrap();
            assert!(turn.next_prompt.questions().len() <= MAX_QUESTIONS_PER_TURN);
        }
    }
}
