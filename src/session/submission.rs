// src/session/submission.rs

//! Assembly of the terminal submission record.

use serde::{Deserialize, Serialize};

use crate::models::{
    quiz::QuizDetail,
    submission::{NewSubmission, SubmissionType},
};
use crate::session::participant::Participant;

/// What ended the attempt, before the visibility refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Manual,
    Timeout,
}

/// Decides the reported submission type and the cheat flag.
///
/// A timeout that happens while the tab is hidden is reported as `blur` and
/// flagged, even when the grace period never ran out. That read of live
/// visibility is intentional and kept as-is.
pub fn classify(trigger: Trigger, integrity_flag: bool, tab_hidden: bool) -> (SubmissionType, bool) {
    let hidden_timeout = trigger == Trigger::Timeout && tab_hidden;
    let submission_type = match trigger {
        Trigger::Manual => SubmissionType::Manual,
        Trigger::Timeout if hidden_timeout => SubmissionType::Blur,
        Trigger::Timeout => SubmissionType::Timeout,
    };
    (submission_type, integrity_flag || hidden_timeout)
}

pub fn assemble(
    quiz: &QuizDetail,
    participant: &Participant,
    score: u32,
    trigger: Trigger,
    integrity_flag: bool,
    tab_hidden: bool,
) -> NewSubmission {
    let (submission_type, is_cheated) = classify(trigger, integrity_flag, tab_hidden);
    NewSubmission {
        quiz_id: quiz.id,
        student_name: participant.name.clone(),
        student_email: participant.email.clone(),
        roll_number: participant.roll_number.clone(),
        faculty: participant.faculty.clone(),
        year: participant.year.clone(),
        score: score as i32,
        total_questions: quiz.questions.len() as i32,
        is_cheated,
        submission_type,
    }
}
