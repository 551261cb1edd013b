// src/session/participant.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::submission::{
    EMAIL_MAX_LEN, FACULTY_MAX_LEN, NAME_MAX_LEN, ROLL_NUMBER_MAX_LEN, YEAR_MAX_LEN,
};

/// Student identity collected by the entry form.
///
/// Email is collected but optional; the other four fields gate the start
/// of an unprivileged attempt. Upper bounds match what the store accepts,
/// so an attempt that starts can always be recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[validate(length(min = 1, max = NAME_MAX_LEN, message = "Full name is required (max 200 characters)"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = EMAIL_MAX_LEN, message = "Email is too long"))]
    pub email: String,
    #[validate(length(min = 1, max = ROLL_NUMBER_MAX_LEN, message = "Roll number is required (max 50 characters)"))]
    pub roll_number: String,
    #[validate(length(min = 1, max = FACULTY_MAX_LEN, message = "Faculty is required (max 50 characters)"))]
    pub faculty: String,
    #[validate(length(min = 1, max = YEAR_MAX_LEN, message = "Year is required (max 20 characters)"))]
    pub year: String,
}

impl Participant {
    /// Names of the fields that are empty or too long, in a stable order.
    pub fn missing_fields(&self) -> Vec<String> {
        match self.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => {
                let mut fields: Vec<String> = errors
                    .field_errors()
                    .keys()
                    .map(|field| field.to_string())
                    .collect();
                fields.sort();
                fields
            }
        }
    }
}
