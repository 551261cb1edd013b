// src/models/mod.rs

pub mod question;
pub mod quiz;
pub mod subject;
pub mod submission;
pub mod user;
