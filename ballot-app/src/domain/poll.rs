use ballot_errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub options: Vec<String>,
    pub max_selections: u32,
    pub anonymous: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Poll {
    /// Checks a ballot against this poll's option set and selection limit.
    pub fn check_choices(&self, choices: &[String]) -> Result<(), AppError> {
        if choices.is_empty() {
            return Err(AppError::validation("Select at least one option"));
        }

        if choices.len() > self.max_selections as usize {
            return Err(AppError::TooManyChoices {
                max: self.max_selections,
            });
        }

        let mut seen = HashSet::with_capacity(choices.len());
        for choice in choices {
            if !self.options.iter().any(|option| option == choice) {
                return Err(AppError::InvalidChoice(choice.clone()));
            }
            if !seen.insert(choice.as_str()) {
                return Err(AppError::validation("Each option can only be selected once"));
            }
        }

        Ok(())
    }
}

/// Admin input for starting a poll.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPoll {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub options: Vec<String>,
    pub max_selections: u32,
    #[serde(default)]
    pub anonymous: bool,
}

impl NewPoll {
    /// Normalizes whitespace and rejects malformed input.
    pub fn validate(self) -> Result<Self, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }

        if self.options.len() < 2 {
            return Err(AppError::validation("At least 2 options are required"));
        }

        if self.options.iter().any(|option| option.trim().is_empty()) {
            return Err(AppError::validation("Options cannot be blank"));
        }

        if self.max_selections < 1 || self.max_selections as usize > self.options.len() {
            return Err(AppError::validation("Invalid maxSelections value"));
        }

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(Self {
            title,
            description,
            ..self
        })
    }
}
