// src/session/mod.rs

//! Quiz-taking sessions.
//!
//! A session is one participant's attempt at one quiz. [`controller`] holds
//! the state machine, [`runtime`] drives it with real timers on a tokio
//! task, and [`store`] is the seam to the Quiz Store service.

pub mod controller;
pub mod integrity;
pub mod participant;
pub mod runtime;
pub mod store;
pub mod submission;
pub mod timer;

use std::fmt;

pub use controller::{
    DispatchStatus, Effect, Notice, PhaseKind, SessionController, SessionEvent, SessionSnapshot,
};
pub use participant::Participant;
pub use runtime::{Session, SessionHandle};
pub use store::{HttpQuizStore, QuizStore, StoreError};
pub use submission::Trigger;

use crate::utils::jwt::verify_jwt;

/// Who is taking the quiz. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// An instructor previewing: no entry form, no countdown, nothing recorded.
    Privileged,
    Unprivileged,
}

impl Capability {
    /// Derives the capability from an optional instructor bearer token.
    ///
    /// Missing, invalid or non-admin tokens all yield `Unprivileged`.
    pub fn from_bearer(token: Option<&str>, secret: &str) -> Self {
        match token.map(|t| verify_jwt(t, secret)) {
            Some(Ok(claims)) if claims.role == "admin" => Capability::Privileged,
            _ => Capability::Unprivileged,
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    /// Participant fields are empty or longer than the store accepts.
    /// Nothing changed.
    InvalidEntry { fields: Vec<String> },

    /// The quiz could not be fetched, so no session exists.
    QuizUnavailable(StoreError),

    /// The session task has finished and no longer accepts intents.
    Closed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidEntry { fields } => {
                write!(f, "Please check these details: {}", fields.join(", "))
            }
            SessionError::QuizUnavailable(err) => write!(f, "Failed to load quiz: {}", err),
            SessionError::Closed => write!(f, "Session is closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::QuizUnavailable(err) => Some(err),
            _ => None,
        }
    }
}
