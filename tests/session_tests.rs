// tests/session_tests.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lecture_quiz::models::{
    question::Question,
    quiz::QuizDetail,
    submission::{NewSubmission, SubmissionType},
};
use lecture_quiz::session::{
    Capability, DispatchStatus, Notice, Participant, PhaseKind, QuizStore, Session,
    SessionError, StoreError, Trigger,
};
use tokio::time::{Instant, sleep};

/// In-memory quiz store that records every submission it receives.
#[derive(Default)]
struct MemoryStore {
    quizzes: Mutex<HashMap<i64, QuizDetail>>,
    records: Mutex<Vec<NewSubmission>>,
    reject_submissions: bool,
}

impl MemoryStore {
    fn with_quiz(quiz: QuizDetail) -> Arc<Self> {
        let store = MemoryStore::default();
        store.quizzes.lock().unwrap().insert(quiz.id, quiz);
        Arc::new(store)
    }

    fn failing_with_quiz(quiz: QuizDetail) -> Arc<Self> {
        let store = MemoryStore {
            reject_submissions: true,
            ..Default::default()
        };
        store.quizzes.lock().unwrap().insert(quiz.id, quiz);
        Arc::new(store)
    }

    fn records(&self) -> Vec<NewSubmission> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<QuizDetail, StoreError> {
        self.quizzes
            .lock()
            .unwrap()
            .get(&quiz_id)
            .cloned()
            .ok_or(StoreError::Status {
                status: 404,
                message: "Quiz not found".to_string(),
            })
    }

    async fn submit_result(&self, record: &NewSubmission) -> Result<(), StoreError> {
        if self.reject_submissions {
            return Err(StoreError::Transport("connection refused".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

fn question(id: i64, correct: &str) -> Question {
    Question {
        id,
        quiz_id: 7,
        text: format!("Question {}", id),
        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct_answer: correct.to_string(),
        explanation: String::new(),
        position: id as i32,
        created_at: None,
    }
}

fn quiz(is_active: bool, time_limit: Option<i32>) -> QuizDetail {
    QuizDetail {
        id: 7,
        title: "Digital Logic".to_string(),
        description: String::new(),
        questions: vec![question(1, "A"), question(2, "B"), question(3, "C")],
        time_limit,
        is_active,
    }
}

fn student() -> Participant {
    Participant {
        name: "Asha Rai".to_string(),
        email: "asha@example.com".to_string(),
        roll_number: "077BCT001".to_string(),
        faculty: "BCT".to_string(),
        year: "2nd".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn manual_run_scores_correct_answers() {
    let store = MemoryStore::with_quiz(quiz(true, None));
    let mut handle = Session::open(store.clone(), 7, Capability::Unprivileged)
        .await
        .unwrap();
    assert_eq!(handle.snapshot().phase, PhaseKind::EntryForm);

    handle.begin(student()).await.unwrap();
    assert_eq!(handle.snapshot().phase, PhaseKind::Active);

    for answer in ["A", "D", "C"] {
        handle.select_option(answer).await.unwrap();
        handle.submit_answer().await.unwrap();
        handle.advance().await.unwrap();
    }

    let snapshot = handle.settled().await;
    assert_eq!(snapshot.phase, PhaseKind::Completed);
    assert_eq!(snapshot.score, 2);
    assert_eq!(snapshot.submission_type, Some(SubmissionType::Manual));
    assert!(!snapshot.is_cheated);
    assert_eq!(snapshot.dispatch, Some(DispatchStatus::Delivered));

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score, 2);
    assert_eq!(records[0].total_questions, 3);
    assert_eq!(records[0].roll_number, "077BCT001");
    assert_eq!(records[0].submission_type, SubmissionType::Manual);
    assert!(!records[0].is_cheated);

    assert_eq!(
        handle.pending_notices(),
        vec![
            Notice::CorrectAnswer,
            Notice::IncorrectAnswer,
            Notice::CorrectAnswer,
            Notice::SubmissionSaved,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn advance_waits_for_an_answer() {
    let store = MemoryStore::with_quiz(quiz(true, None));
    let handle = Session::open(store, 7, Capability::Unprivileged).await.unwrap();
    handle.begin(student()).await.unwrap();

    handle.advance().await.unwrap();
    assert_eq!(handle.snapshot().question_index, 0);

    handle.select_option("B").await.unwrap();
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.selected_answer.as_deref(), Some("B"));
    assert_eq!(snapshot.score, 0);
    assert!(!snapshot.answered);

    handle.submit_answer().await.unwrap();
    handle.advance().await.unwrap();
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.question_index, 1);
    assert_eq!(snapshot.selected_answer, None);
}

#[tokio::test(start_paused = true)]
async fn countdown_submits_at_the_limit_and_not_before() {
    let store = MemoryStore::with_quiz(quiz(true, Some(1)));
    let mut handle = Session::open(store.clone(), 7, Capability::Unprivileged)
        .await
        .unwrap();
    handle.begin(student()).await.unwrap();
    let started = Instant::now();
    assert_eq!(handle.snapshot().time_remaining_seconds, Some(60));

    sleep(Duration::from_millis(59_500)).await;
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, PhaseKind::Active);
    assert_eq!(snapshot.time_remaining_seconds, Some(1));
    assert!(snapshot.is_urgent());

    let snapshot = handle.settled().await;
    assert_eq!(started.elapsed(), Duration::from_secs(60));
    assert_eq!(snapshot.score, 0);
    assert_eq!(snapshot.submission_type, Some(SubmissionType::Timeout));
    assert!(!snapshot.is_cheated);
    assert_eq!(store.records().len(), 1);
    assert_eq!(store.records()[0].submission_type, SubmissionType::Timeout);

    let notices = handle.pending_notices();
    assert_eq!(notices.first(), Some(&Notice::TimeExpired));
}

#[tokio::test(start_paused = true)]
async fn brief_tab_switch_is_forgiven() {
    let store = MemoryStore::with_quiz(quiz(true, None));
    let mut handle = Session::open(store.clone(), 7, Capability::Unprivileged)
        .await
        .unwrap();
    handle.begin(student()).await.unwrap();

    handle.set_visibility(true).await.unwrap();
    sleep(Duration::from_secs(4)).await;
    handle.set_visibility(false).await.unwrap();
    sleep(Duration::from_secs(10)).await;

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, PhaseKind::Active);
    assert!(!snapshot.integrity_flag);
    assert!(store.records().is_empty());
    assert_eq!(handle.pending_notices(), vec![Notice::ReturnToQuiz]);
}

#[tokio::test(start_paused = true)]
async fn hidden_past_grace_submits_as_blur() {
    let store = MemoryStore::with_quiz(quiz(true, None));
    let mut handle = Session::open(store.clone(), 7, Capability::Unprivileged)
        .await
        .unwrap();
    handle.begin(student()).await.unwrap();
    handle.select_option("A").await.unwrap();
    handle.submit_answer().await.unwrap();

    handle.set_visibility(true).await.unwrap();
    let hidden_at = Instant::now();

    let snapshot = handle.settled().await;
    assert_eq!(hidden_at.elapsed(), Duration::from_secs(5));
    assert_eq!(snapshot.phase, PhaseKind::Completed);
    assert!(snapshot.integrity_flag);
    assert!(snapshot.is_cheated);
    assert_eq!(snapshot.submission_type, Some(SubmissionType::Blur));

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].score, 1);
    assert!(records[0].is_cheated);
    assert_eq!(records[0].submission_type, SubmissionType::Blur);

    let notices = handle.pending_notices();
    assert!(notices.contains(&Notice::ReturnToQuiz));
    assert!(notices.contains(&Notice::AutoSubmittedInactivity));
}

#[tokio::test(start_paused = true)]
async fn expiry_and_breach_in_same_instant_dispatch_once() {
    let store = MemoryStore::with_quiz(quiz(true, Some(1)));
    let handle = Session::open(store.clone(), 7, Capability::Unprivileged)
        .await
        .unwrap();
    handle.begin(student()).await.unwrap();

    // Grace ends at 60 s, the same instant as the last tick.
    sleep(Duration::from_secs(55)).await;
    handle.set_visibility(true).await.unwrap();

    let snapshot = handle.settled().await;
    assert_eq!(snapshot.submission_type, Some(SubmissionType::Blur));
    assert!(snapshot.is_cheated);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(store.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn force_submit_after_completion_is_ignored() {
    let store = MemoryStore::with_quiz(quiz(true, None));
    let handle = Session::open(store.clone(), 7, Capability::Unprivileged)
        .await
        .unwrap();
    handle.begin(student()).await.unwrap();
    handle.force_submit(Trigger::Manual).await.unwrap();

    let snapshot = handle.settled().await;
    assert_eq!(snapshot.submission_type, Some(SubmissionType::Manual));

    // The task exits once settled; later intents are refused.
    assert!(matches!(
        handle.force_submit(Trigger::Timeout).await,
        Err(SessionError::Closed)
    ));
    assert_eq!(store.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn preview_skips_gate_timer_and_dispatch() {
    let store = MemoryStore::with_quiz(quiz(false, Some(1)));
    let mut handle = Session::open(store.clone(), 7, Capability::Privileged)
        .await
        .unwrap();
    assert_eq!(handle.snapshot().phase, PhaseKind::EntryForm);

    handle.begin(Participant::default()).await.unwrap();
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.phase, PhaseKind::Active);
    assert_eq!(snapshot.time_remaining_seconds, None);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(handle.snapshot().phase, PhaseKind::Active);

    for _ in 0..3 {
        handle.select_option("A").await.unwrap();
        handle.submit_answer().await.unwrap();
        handle.advance().await.unwrap();
    }

    let snapshot = handle.settled().await;
    assert_eq!(snapshot.score, 1);
    assert_eq!(snapshot.dispatch, Some(DispatchStatus::Skipped));
    assert!(store.records().is_empty());
    assert!(handle.pending_notices().contains(&Notice::PreviewCompleted));
}

#[tokio::test(start_paused = true)]
async fn inactive_quiz_blocks_students() {
    let store = MemoryStore::with_quiz(quiz(false, None));
    let handle = Session::open(store, 7, Capability::Unprivileged).await.unwrap();
    assert_eq!(handle.snapshot().phase, PhaseKind::Inactive);

    handle.begin(student()).await.unwrap();
    assert_eq!(handle.snapshot().phase, PhaseKind::Inactive);
}

#[tokio::test(start_paused = true)]
async fn incomplete_entry_form_is_rejected() {
    let store = MemoryStore::with_quiz(quiz(true, Some(5)));
    let handle = Session::open(store, 7, Capability::Unprivileged).await.unwrap();

    let participant = Participant {
        name: "Asha Rai".to_string(),
        ..Default::default()
    };
    match handle.begin(participant).await {
        Err(SessionError::InvalidEntry { fields }) => {
            assert_eq!(fields, vec!["faculty", "roll_number", "year"]);
        }
        other => panic!("expected InvalidEntry, got {:?}", other),
    }
    assert_eq!(handle.snapshot().phase, PhaseKind::EntryForm);

    let mut student = student();
    student.email.clear();
    handle.begin(student).await.unwrap();
    assert_eq!(handle.snapshot().phase, PhaseKind::Active);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_keeps_completed_state() {
    let store = MemoryStore::failing_with_quiz(quiz(true, None));
    let mut handle = Session::open(store, 7, Capability::Unprivileged)
        .await
        .unwrap();
    handle.begin(student()).await.unwrap();
    handle.force_submit(Trigger::Manual).await.unwrap();

    let snapshot = handle.settled().await;
    assert_eq!(snapshot.phase, PhaseKind::Completed);
    assert!(matches!(snapshot.dispatch, Some(DispatchStatus::Failed(_))));

    let notices = handle.pending_notices();
    assert!(
        notices
            .iter()
            .any(|n| matches!(n, Notice::SubmissionFailed(msg) if msg.contains("connection refused")))
    );
}

#[tokio::test(start_paused = true)]
async fn missing_quiz_opens_no_session() {
    let store = MemoryStore::with_quiz(quiz(true, None));
    let result = Session::open(store, 99, Capability::Unprivileged).await;
    assert!(matches!(
        result,
        Err(SessionError::QuizUnavailable(StoreError::Status { status: 404, .. }))
    ));
}
