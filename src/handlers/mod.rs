// src/handlers/mod.rs

pub mod auth;
pub mod questions;
pub mod quizzes;
pub mod subjects;
pub mod submissions;
