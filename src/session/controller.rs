// src/session/controller.rs

//! The quiz-taking state machine.
//!
//! ```text
//! Loading -> (Inactive | EntryForm) -> Active -> Completed
//! ```
//!
//! The controller is synchronous and owns no clock. Every input, whether a
//! user intent, a countdown tick, a visibility change or a grace expiry,
//! goes through [`SessionController::handle`], which mutates the phase and
//! returns the side effects the caller must perform. Countdown and grace
//! state live inside the active phase, so any exit from `Active` drops them,
//! and the terminal transition can only be taken from `Active`, so a second
//! terminal trigger finds `Completed` and does nothing.

use serde::Serialize;

use crate::models::{
    question::Question,
    quiz::QuizDetail,
    submission::{NewSubmission, SubmissionType},
};
use crate::session::{
    Capability, SessionError,
    integrity::{GraceToken, IntegrityMonitor},
    participant::Participant,
    submission::{self, Trigger},
    timer::{self, Countdown},
};

/// Every input the controller reacts to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    QuizLoaded(QuizDetail),
    Begin(Participant),
    SelectOption(String),
    SubmitAnswer,
    Advance,
    ForceSubmit(Trigger),
    Tick,
    VisibilityChanged { hidden: bool },
    GraceElapsed(GraceToken),
    DispatchSettled(Result<(), String>),
}

/// Work the caller performs on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start delivering `SessionEvent::Tick` once per second.
    StartCountdown,
    StopCountdown,
    /// Deliver `SessionEvent::GraceElapsed(token)` after the grace period.
    ArmGrace(GraceToken),
    CancelGrace,
    /// Send the record to the store, then report back with `DispatchSettled`.
    Dispatch(NewSubmission),
    Notify(Notice),
}

/// User-facing acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Notice {
    CorrectAnswer,
    IncorrectAnswer,
    ReturnToQuiz,
    AutoSubmittedInactivity,
    TimeExpired,
    PreviewCompleted,
    SubmissionSaved,
    SubmissionFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Loading,
    Inactive,
    EntryForm,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum DispatchStatus {
    Pending,
    Delivered,
    Failed(String),
    /// Privileged previews never record a submission.
    Skipped,
}

#[derive(Debug, Clone, Default)]
struct Progress {
    index: usize,
    selected: Option<String>,
    answered: bool,
    score: u32,
    integrity_flag: bool,
}

#[derive(Debug)]
struct ActiveRun {
    quiz: QuizDetail,
    participant: Participant,
    progress: Progress,
    countdown: Option<Countdown>,
    monitor: IntegrityMonitor,
}

#[derive(Debug)]
struct CompletedRun {
    quiz: QuizDetail,
    progress: Progress,
    time_remaining: Option<u32>,
    submission_type: SubmissionType,
    is_cheated: bool,
    dispatch: DispatchStatus,
}

#[derive(Debug)]
enum Phase {
    Loading,
    Inactive(QuizDetail),
    EntryForm(QuizDetail),
    Active(ActiveRun),
    Completed(CompletedRun),
}

/// Read-only view of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: PhaseKind,
    pub quiz_id: Option<i64>,
    pub quiz_title: Option<String>,
    pub total_questions: usize,
    pub question_index: usize,
    pub current_question: Option<Question>,
    pub selected_answer: Option<String>,
    pub answered: bool,
    pub score: u32,
    pub time_remaining_seconds: Option<u32>,
    pub integrity_flag: bool,
    pub submission_type: Option<SubmissionType>,
    pub is_cheated: bool,
    pub dispatch: Option<DispatchStatus>,
}

impl SessionSnapshot {
    /// Remaining time as `m:ss`, when the attempt is timed.
    pub fn clock(&self) -> Option<String> {
        self.time_remaining_seconds.map(timer::format_clock)
    }

    pub fn is_urgent(&self) -> bool {
        self.time_remaining_seconds.is_some_and(timer::is_urgent)
    }

    /// Whether advancing from the current question finishes the attempt.
    pub fn is_last_question(&self) -> bool {
        self.total_questions > 0 && self.question_index + 1 == self.total_questions
    }
}

pub struct SessionController {
    capability: Capability,
    tab_hidden: bool,
    phase: Phase,
}

impl SessionController {
    /// Creates a controller in `Loading`, waiting for `QuizLoaded`.
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            tab_hidden: false,
            phase: Phase::Loading,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn phase(&self) -> PhaseKind {
        match self.phase {
            Phase::Loading => PhaseKind::Loading,
            Phase::Inactive(_) => PhaseKind::Inactive,
            Phase::EntryForm(_) => PhaseKind::EntryForm,
            Phase::Active(_) => PhaseKind::Active,
            Phase::Completed(_) => PhaseKind::Completed,
        }
    }

    /// True once the attempt is over and nothing is left in flight.
    pub fn is_settled(&self) -> bool {
        matches!(&self.phase, Phase::Completed(run) if run.dispatch != DispatchStatus::Pending)
    }

    /// Applies one event. Guard failures are no-ops; only a rejected entry
    /// form is reported as an error.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<Effect>, SessionError> {
        let effects = match event {
            SessionEvent::QuizLoaded(quiz) => self.on_loaded(quiz),
            SessionEvent::Begin(participant) => return self.on_begin(participant),
            SessionEvent::SelectOption(value) => self.on_select(value),
            SessionEvent::SubmitAnswer => self.on_submit_answer(),
            SessionEvent::Advance => self.on_advance(),
            SessionEvent::ForceSubmit(trigger) => self.finish(trigger, None),
            SessionEvent::Tick => self.on_tick(),
            SessionEvent::VisibilityChanged { hidden } => self.on_visibility(hidden),
            SessionEvent::GraceElapsed(token) => self.on_grace_elapsed(token),
            SessionEvent::DispatchSettled(result) => self.on_dispatch_settled(result),
        };
        Ok(effects)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            phase: self.phase(),
            quiz_id: None,
            quiz_title: None,
            total_questions: 0,
            question_index: 0,
            current_question: None,
            selected_answer: None,
            answered: false,
            score: 0,
            time_remaining_seconds: None,
            integrity_flag: false,
            submission_type: None,
            is_cheated: false,
            dispatch: None,
        };

        let (quiz, progress) = match &self.phase {
            Phase::Loading => return snapshot,
            Phase::Inactive(quiz) | Phase::EntryForm(quiz) => (quiz, None),
            Phase::Active(run) => {
                snapshot.time_remaining_seconds = run.countdown.map(|c| c.remaining());
                (&run.quiz, Some(&run.progress))
            }
            Phase::Completed(run) => {
                snapshot.time_remaining_seconds = run.time_remaining;
                snapshot.submission_type = Some(run.submission_type);
                snapshot.is_cheated = run.is_cheated;
                snapshot.dispatch = Some(run.dispatch.clone());
                (&run.quiz, Some(&run.progress))
            }
        };

        snapshot.quiz_id = Some(quiz.id);
        snapshot.quiz_title = Some(quiz.title.clone());
        snapshot.total_questions = quiz.questions.len();

        if let Some(progress) = progress {
            snapshot.question_index = progress.index;
            snapshot.selected_answer = progress.selected.clone();
            snapshot.answered = progress.answered;
            snapshot.score = progress.score;
            snapshot.integrity_flag = progress.integrity_flag;
            if snapshot.phase == PhaseKind::Active {
                snapshot.current_question = quiz.questions.get(progress.index).cloned();
            }
        }

        snapshot
    }

    // ── Transitions ──────────────────────────────────────────────────

    fn on_loaded(&mut self, quiz: QuizDetail) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Loading) {
            tracing::debug!("quiz already loaded; ignoring");
            return Vec::new();
        }

        self.phase = if !quiz.is_active && self.capability == Capability::Unprivileged {
            tracing::info!(quiz_id = quiz.id, "quiz is not active yet");
            Phase::Inactive(quiz)
        } else {
            Phase::EntryForm(quiz)
        };
        Vec::new()
    }

    fn on_begin(&mut self, participant: Participant) -> Result<Vec<Effect>, SessionError> {
        if !matches!(self.phase, Phase::EntryForm(_)) {
            tracing::debug!(phase = ?self.phase(), "begin ignored outside entry form");
            return Ok(Vec::new());
        }

        if self.capability == Capability::Unprivileged {
            let fields = participant.missing_fields();
            if !fields.is_empty() {
                return Err(SessionError::InvalidEntry { fields });
            }
        }

        let Phase::EntryForm(quiz) = std::mem::replace(&mut self.phase, Phase::Loading) else {
            return Ok(Vec::new());
        };

        let countdown = match self.capability {
            Capability::Unprivileged => quiz.time_limit_seconds().map(Countdown::new),
            Capability::Privileged => None,
        };

        let mut effects = Vec::new();
        if countdown.is_some() {
            effects.push(Effect::StartCountdown);
        }

        tracing::info!(
            quiz_id = quiz.id,
            questions = quiz.questions.len(),
            timed = countdown.is_some(),
            privileged = self.capability == Capability::Privileged,
            "attempt started"
        );

        self.phase = Phase::Active(ActiveRun {
            quiz,
            participant,
            progress: Progress::default(),
            countdown,
            monitor: IntegrityMonitor::new(),
        });
        Ok(effects)
    }

    fn on_select(&mut self, value: String) -> Vec<Effect> {
        if let Phase::Active(run) = &mut self.phase {
            if !run.progress.answered {
                run.progress.selected = Some(value);
            }
        }
        Vec::new()
    }

    fn on_submit_answer(&mut self) -> Vec<Effect> {
        let Phase::Active(run) = &mut self.phase else {
            return Vec::new();
        };
        let progress = &mut run.progress;
        if progress.answered {
            tracing::debug!(index = progress.index, "question already answered");
            return Vec::new();
        }
        let Some(selected) = progress.selected.as_deref().filter(|s| !s.is_empty()) else {
            tracing::debug!(index = progress.index, "no option selected");
            return Vec::new();
        };
        let Some(question) = run.quiz.questions.get(progress.index) else {
            return Vec::new();
        };

        let correct = question.is_correct(selected);
        if correct {
            progress.score += 1;
        }
        progress.answered = true;

        vec![Effect::Notify(if correct {
            Notice::CorrectAnswer
        } else {
            Notice::IncorrectAnswer
        })]
    }

    fn on_advance(&mut self) -> Vec<Effect> {
        let Phase::Active(run) = &mut self.phase else {
            return Vec::new();
        };
        if !run.progress.answered {
            tracing::debug!(index = run.progress.index, "advance before answering");
            return Vec::new();
        }

        if run.progress.index + 1 < run.quiz.questions.len() {
            run.progress.index += 1;
            run.progress.selected = None;
            run.progress.answered = false;
            return Vec::new();
        }

        self.finish(Trigger::Manual, None)
    }

    fn on_tick(&mut self) -> Vec<Effect> {
        let Phase::Active(run) = &mut self.phase else {
            return Vec::new();
        };
        let Some(countdown) = run.countdown.as_mut() else {
            return Vec::new();
        };
        if countdown.tick() {
            return self.finish(Trigger::Timeout, Some(Notice::TimeExpired));
        }
        Vec::new()
    }

    fn on_visibility(&mut self, hidden: bool) -> Vec<Effect> {
        self.tab_hidden = hidden;

        let Phase::Active(run) = &mut self.phase else {
            return Vec::new();
        };

        if hidden {
            match run.monitor.visibility_lost() {
                Some(token) => vec![
                    Effect::ArmGrace(token),
                    Effect::Notify(Notice::ReturnToQuiz),
                ],
                None => Vec::new(),
            }
        } else {
            match run.monitor.visibility_restored() {
                Some(_) => vec![Effect::CancelGrace],
                None => Vec::new(),
            }
        }
    }

    fn on_grace_elapsed(&mut self, token: GraceToken) -> Vec<Effect> {
        let Phase::Active(run) = &mut self.phase else {
            return Vec::new();
        };
        if !run.monitor.grace_elapsed(token) {
            tracing::debug!(?token, "stale grace expiry ignored");
            return Vec::new();
        }

        tracing::warn!(quiz_id = run.quiz.id, "tab hidden past grace period");
        run.progress.integrity_flag = true;
        self.finish(Trigger::Timeout, Some(Notice::AutoSubmittedInactivity))
    }

    fn on_dispatch_settled(&mut self, result: Result<(), String>) -> Vec<Effect> {
        let Phase::Completed(run) = &mut self.phase else {
            return Vec::new();
        };
        if run.dispatch != DispatchStatus::Pending {
            return Vec::new();
        }

        match result {
            Ok(()) => {
                run.dispatch = DispatchStatus::Delivered;
                vec![Effect::Notify(Notice::SubmissionSaved)]
            }
            Err(error) => {
                tracing::error!(quiz_id = run.quiz.id, %error, "failed to save submission");
                run.dispatch = DispatchStatus::Failed(error.clone());
                vec![Effect::Notify(Notice::SubmissionFailed(error))]
            }
        }
    }

    /// The single terminal transition. Only reachable from `Active`.
    fn finish(&mut self, trigger: Trigger, notice: Option<Notice>) -> Vec<Effect> {
        let run = match std::mem::replace(&mut self.phase, Phase::Loading) {
            Phase::Active(run) => run,
            other => {
                self.phase = other;
                tracing::debug!(?trigger, "terminal trigger ignored; attempt not active");
                return Vec::new();
            }
        };

        let mut effects = Vec::new();
        if run.countdown.is_some() {
            effects.push(Effect::StopCountdown);
        }
        if run.monitor.pending().is_some() {
            effects.push(Effect::CancelGrace);
        }
        if let Some(notice) = notice {
            effects.push(Effect::Notify(notice));
        }

        let (submission_type, is_cheated) =
            submission::classify(trigger, run.progress.integrity_flag, self.tab_hidden);

        let dispatch = match self.capability {
            Capability::Unprivileged => {
                effects.push(Effect::Dispatch(submission::assemble(
                    &run.quiz,
                    &run.participant,
                    run.progress.score,
                    trigger,
                    run.progress.integrity_flag,
                    self.tab_hidden,
                )));
                DispatchStatus::Pending
            }
            Capability::Privileged => {
                effects.push(Effect::Notify(Notice::PreviewCompleted));
                DispatchStatus::Skipped
            }
        };

        tracing::info!(
            quiz_id = run.quiz.id,
            score = run.progress.score,
            total = run.quiz.questions.len(),
            submission_type = %submission_type,
            is_cheated,
            "attempt completed"
        );

        self.phase = Phase::Completed(CompletedRun {
            time_remaining: run.countdown.map(|c| c.remaining()),
            quiz: run.quiz,
            progress: run.progress,
            submission_type,
            is_cheated,
            dispatch,
        });
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, correct: &str) -> Question {
        Question {
            id,
            quiz_id: 1,
            text: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: correct.to_string(),
            explanation: "Because.".to_string(),
            position: id as i32,
            created_at: None,
        }
    }

    fn quiz(count: i64, time_limit: Option<i32>, is_active: bool) -> QuizDetail {
        QuizDetail {
            id: 1,
            title: "Signals".to_string(),
            description: String::new(),
            questions: (0..count).map(|i| question(i, "A")).collect(),
            time_limit,
            is_active,
        }
    }

    fn student() -> Participant {
        Participant {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            roll_number: "077BCT001".into(),
            faculty: "BCT".into(),
            year: "2nd".into(),
        }
    }

    fn started(capability: Capability, quiz: QuizDetail) -> (SessionController, Vec<Effect>) {
        let mut controller = SessionController::new(capability);
        controller.handle(SessionEvent::QuizLoaded(quiz)).unwrap();
        let participant = match capability {
            Capability::Unprivileged => student(),
            Capability::Privileged => Participant::default(),
        };
        let effects = controller.handle(SessionEvent::Begin(participant)).unwrap();
        (controller, effects)
    }

    fn answer(controller: &mut SessionController, option: &str) -> Vec<Effect> {
        controller
            .handle(SessionEvent::SelectOption(option.to_string()))
            .unwrap();
        controller.handle(SessionEvent::SubmitAnswer).unwrap();
        controller.handle(SessionEvent::Advance).unwrap()
    }

    fn dispatched(effects: &[Effect]) -> Vec<&NewSubmission> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Dispatch(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    fn ticks(controller: &mut SessionController, n: u32) -> Vec<Effect> {
        let mut effects = Vec::new();
        for _ in 0..n {
            effects.extend(controller.handle(SessionEvent::Tick).unwrap());
        }
        effects
    }

    #[test]
    fn test_inactive_quiz_blocks_students() {
        let mut controller = SessionController::new(Capability::Unprivileged);
        controller.handle(SessionEvent::QuizLoaded(quiz(2, None, false))).unwrap();
        assert_eq!(controller.phase(), PhaseKind::Inactive);

        controller.handle(SessionEvent::Begin(student())).unwrap();
        assert_eq!(controller.phase(), PhaseKind::Inactive);
    }

    #[test]
    fn test_inactive_quiz_open_to_privileged() {
        let mut controller = SessionController::new(Capability::Privileged);
        controller.handle(SessionEvent::QuizLoaded(quiz(2, None, false))).unwrap();
        assert_eq!(controller.phase(), PhaseKind::EntryForm);
    }

    #[test]
    fn test_entry_gate_reports_missing_fields() {
        let mut controller = SessionController::new(Capability::Unprivileged);
        controller.handle(SessionEvent::QuizLoaded(quiz(2, None, true))).unwrap();

        let mut participant = student();
        participant.year.clear();
        let err = controller.handle(SessionEvent::Begin(participant)).unwrap_err();
        match err {
            SessionError::InvalidEntry { fields } => assert_eq!(fields, vec!["year"]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(controller.phase(), PhaseKind::EntryForm);
    }

    #[test]
    fn test_entry_gate_rejects_overlong_roll_number() {
        let mut controller = SessionController::new(Capability::Unprivileged);
        controller.handle(SessionEvent::QuizLoaded(quiz(2, None, true))).unwrap();

        let mut participant = student();
        participant.roll_number = "7".repeat(60);
        match controller.handle(SessionEvent::Begin(participant)) {
            Err(SessionError::InvalidEntry { fields }) => assert_eq!(fields, vec!["roll_number"]),
            other => panic!("expected InvalidEntry, got {other:?}"),
        }
        assert_eq!(controller.phase(), PhaseKind::EntryForm);

        // The longest accepted roll number still produces a storable record.
        let mut participant = student();
        participant.roll_number = "7".repeat(50);
        controller.handle(SessionEvent::Begin(participant)).unwrap();
        let effects = controller
            .handle(SessionEvent::ForceSubmit(Trigger::Manual))
            .unwrap();
        let record = effects
            .into_iter()
            .find_map(|effect| match effect {
                Effect::Dispatch(record) => Some(record),
                _ => None,
            })
            .expect("unprivileged attempts dispatch a record");
        assert!(record.check().is_ok());
    }

    #[test]
    fn test_huge_time_limit_starts_without_overflow() {
        let (controller, effects) = started(Capability::Unprivileged, quiz(2, Some(i32::MAX), true));
        assert_eq!(effects, vec![Effect::StartCountdown]);
        assert_eq!(controller.snapshot().time_remaining_seconds, Some(u32::MAX));
    }

    #[test]
    fn test_privileged_bypasses_entry_gate() {
        let (controller, effects) = started(Capability::Privileged, quiz(2, Some(10), true));
        assert_eq!(controller.phase(), PhaseKind::Active);
        assert!(effects.is_empty(), "privileged previews run without a countdown");
        assert_eq!(controller.snapshot().time_remaining_seconds, None);
    }

    #[test]
    fn test_timed_start_arms_countdown() {
        let (controller, effects) = started(Capability::Unprivileged, quiz(2, Some(1), true));
        assert_eq!(effects, vec![Effect::StartCountdown]);
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.time_remaining_seconds, Some(60));
        assert_eq!(snapshot.clock().as_deref(), Some("1:00"));
        assert!(!snapshot.is_urgent());
    }

    #[test]
    fn test_selecting_never_scores_or_advances() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, None, true));
        controller.handle(SessionEvent::SelectOption("A".into())).unwrap();
        controller.handle(SessionEvent::SelectOption("B".into())).unwrap();

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.selected_answer.as_deref(), Some("B"));
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.question_index, 0);
        assert!(!snapshot.answered);
    }

    #[test]
    fn test_advance_requires_answer() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, None, true));
        controller.handle(SessionEvent::SelectOption("A".into())).unwrap();
        controller.handle(SessionEvent::Advance).unwrap();
        assert_eq!(controller.snapshot().question_index, 0);

        controller.handle(SessionEvent::SubmitAnswer).unwrap();
        controller.handle(SessionEvent::Advance).unwrap();
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.question_index, 1);
        assert_eq!(snapshot.selected_answer, None);
        assert!(!snapshot.answered);
    }

    #[test]
    fn test_submit_without_selection_is_noop() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(1, None, true));
        assert!(controller.handle(SessionEvent::SubmitAnswer).unwrap().is_empty());
        controller.handle(SessionEvent::SelectOption(String::new())).unwrap();
        assert!(controller.handle(SessionEvent::SubmitAnswer).unwrap().is_empty());
        assert!(!controller.snapshot().answered);
    }

    #[test]
    fn test_answer_scores_at_most_once() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, None, true));
        controller.handle(SessionEvent::SelectOption("A".into())).unwrap();
        let effects = controller.handle(SessionEvent::SubmitAnswer).unwrap();
        assert_eq!(effects, vec![Effect::Notify(Notice::CorrectAnswer)]);

        controller.handle(SessionEvent::SelectOption("A".into())).unwrap();
        assert!(controller.handle(SessionEvent::SubmitAnswer).unwrap().is_empty());
        assert_eq!(controller.snapshot().score, 1);
    }

    #[test]
    fn test_selection_locked_after_answering() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, None, true));
        controller.handle(SessionEvent::SelectOption("B".into())).unwrap();
        controller.handle(SessionEvent::SubmitAnswer).unwrap();
        controller.handle(SessionEvent::SelectOption("A".into())).unwrap();
        assert_eq!(controller.snapshot().selected_answer.as_deref(), Some("B"));
    }

    #[test]
    fn test_manual_run_correct_wrong_correct() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(3, None, true));
        assert!(dispatched(&answer(&mut controller, "A")).is_empty());
        assert!(dispatched(&answer(&mut controller, "C")).is_empty());
        let effects = answer(&mut controller, "A");

        let records = dispatched(&effects);
        assert_eq!(records.len(), 1);
        let record = records[0];
        assert_eq!(record.score, 2);
        assert_eq!(record.total_questions, 3);
        assert_eq!(record.submission_type, SubmissionType::Manual);
        assert!(!record.is_cheated);
        assert_eq!(record.roll_number, "077BCT001");

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, PhaseKind::Completed);
        assert_eq!(snapshot.dispatch, Some(DispatchStatus::Pending));
        assert_eq!(snapshot.current_question, None);
    }

    #[test]
    fn test_score_never_exceeds_question_count() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(4, None, true));
        for _ in 0..4 {
            controller.handle(SessionEvent::SelectOption("A".into())).unwrap();
            controller.handle(SessionEvent::SubmitAnswer).unwrap();
            controller.handle(SessionEvent::SubmitAnswer).unwrap();
            controller.handle(SessionEvent::Advance).unwrap();
        }
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, PhaseKind::Completed);
        assert_eq!(snapshot.score, 4);
    }

    #[test]
    fn test_countdown_expiry_submits_timeout() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(3, Some(1), true));

        assert!(dispatched(&ticks(&mut controller, 59)).is_empty());
        assert_eq!(controller.phase(), PhaseKind::Active);
        assert!(controller.snapshot().is_urgent());

        let effects = ticks(&mut controller, 1);
        assert_eq!(effects[0], Effect::StopCountdown);
        assert!(effects.contains(&Effect::Notify(Notice::TimeExpired)));
        let records = dispatched(&effects);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].score, 0);
        assert_eq!(records[0].submission_type, SubmissionType::Timeout);
        assert!(!records[0].is_cheated);
        assert_eq!(controller.snapshot().time_remaining_seconds, Some(0));
    }

    #[test]
    fn test_countdown_expiry_while_hidden_is_blur() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(3, Some(1), true));
        ticks(&mut controller, 57);
        controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        let effects = ticks(&mut controller, 3);

        assert!(effects.contains(&Effect::CancelGrace));
        let records = dispatched(&effects);
        assert_eq!(records[0].submission_type, SubmissionType::Blur);
        assert!(records[0].is_cheated);
        assert!(!controller.snapshot().integrity_flag);
    }

    #[test]
    fn test_short_absence_leaves_no_flag() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, None, true));
        let effects = controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        let Effect::ArmGrace(token) = effects[0] else {
            panic!("expected grace to be armed, got {effects:?}");
        };
        assert_eq!(effects[1], Effect::Notify(Notice::ReturnToQuiz));

        let effects = controller
            .handle(SessionEvent::VisibilityChanged { hidden: false })
            .unwrap();
        assert_eq!(effects, vec![Effect::CancelGrace]);

        // A late expiry from the cancelled grace period must not count.
        assert!(controller.handle(SessionEvent::GraceElapsed(token)).unwrap().is_empty());
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, PhaseKind::Active);
        assert!(!snapshot.integrity_flag);
    }

    #[test]
    fn test_grace_expiry_is_breach() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, Some(5), true));
        answer(&mut controller, "A");
        let effects = controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        let Effect::ArmGrace(token) = effects[0] else {
            panic!("expected grace to be armed");
        };

        let effects = controller.handle(SessionEvent::GraceElapsed(token)).unwrap();
        assert!(effects.contains(&Effect::StopCountdown));
        assert!(!effects.contains(&Effect::CancelGrace));
        assert!(effects.contains(&Effect::Notify(Notice::AutoSubmittedInactivity)));
        let records = dispatched(&effects);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].submission_type, SubmissionType::Blur);
        assert!(records[0].is_cheated);
        assert_eq!(records[0].score, 1);

        let snapshot = controller.snapshot();
        assert!(snapshot.integrity_flag);
        assert_eq!(snapshot.phase, PhaseKind::Completed);
    }

    #[test]
    fn test_monitor_rearms_after_return() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, None, true));
        controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        controller
            .handle(SessionEvent::VisibilityChanged { hidden: false })
            .unwrap();
        let effects = controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        let Effect::ArmGrace(second) = effects[0] else {
            panic!("expected a fresh grace period");
        };
        let effects = controller.handle(SessionEvent::GraceElapsed(second)).unwrap();
        assert_eq!(dispatched(&effects).len(), 1);
    }

    #[test]
    fn test_racing_terminal_triggers_dispatch_once() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(2, Some(1), true));
        ticks(&mut controller, 55);
        let effects = controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        let Effect::ArmGrace(token) = effects[0] else {
            panic!("expected grace to be armed");
        };
        ticks(&mut controller, 4);

        let mut effects = ticks(&mut controller, 1);
        effects.extend(controller.handle(SessionEvent::GraceElapsed(token)).unwrap());
        effects.extend(controller.handle(SessionEvent::ForceSubmit(Trigger::Manual)).unwrap());
        effects.extend(ticks(&mut controller, 3));

        assert_eq!(dispatched(&effects).len(), 1);
    }

    #[test]
    fn test_privileged_completion_skips_dispatch() {
        let (mut controller, _) = started(Capability::Privileged, quiz(1, Some(1), true));
        let effects = answer(&mut controller, "A");
        assert!(dispatched(&effects).is_empty());
        assert!(effects.contains(&Effect::Notify(Notice::PreviewCompleted)));
        assert!(controller.is_settled());
        assert_eq!(controller.snapshot().dispatch, Some(DispatchStatus::Skipped));
    }

    #[test]
    fn test_dispatch_failure_keeps_completed() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(1, None, true));
        answer(&mut controller, "A");
        assert!(!controller.is_settled());

        let effects = controller
            .handle(SessionEvent::DispatchSettled(Err("connection refused".into())))
            .unwrap();
        assert_eq!(
            effects,
            vec![Effect::Notify(Notice::SubmissionFailed("connection refused".into()))]
        );
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, PhaseKind::Completed);
        assert_eq!(snapshot.score, 1);
        assert_eq!(
            snapshot.dispatch,
            Some(DispatchStatus::Failed("connection refused".into()))
        );
        assert!(controller.is_settled());
    }

    #[test]
    fn test_force_submit_ends_active_attempt() {
        let (mut controller, _) = started(Capability::Unprivileged, quiz(3, None, true));
        answer(&mut controller, "A");
        let effects = controller
            .handle(SessionEvent::ForceSubmit(Trigger::Manual))
            .unwrap();
        let records = dispatched(&effects);
        assert_eq!(records[0].score, 1);
        assert_eq!(records[0].submission_type, SubmissionType::Manual);
    }

    #[test]
    fn test_visibility_before_start_is_tracked_but_not_monitored() {
        let mut controller = SessionController::new(Capability::Unprivileged);
        controller.handle(SessionEvent::QuizLoaded(quiz(1, None, true))).unwrap();
        let effects = controller
            .handle(SessionEvent::VisibilityChanged { hidden: true })
            .unwrap();
        assert!(effects.is_empty());

        controller.handle(SessionEvent::Begin(student())).unwrap();
        let effects = controller
            .handle(SessionEvent::ForceSubmit(Trigger::Timeout))
            .unwrap();
        assert_eq!(dispatched(&effects)[0].submission_type, SubmissionType::Blur);
    }
}
