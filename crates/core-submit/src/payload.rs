//! Submit payloads.
//!
//! `FormPayload` is what the coordinator hands to the collaborator: trimmed
//! text fields plus the accepted entries of each batch field. The typed
//! payloads mirror the backend request bodies and are built from it.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormPayload {
    pub form: String,
    pub fields: BTreeMap<String, String>,
    pub batches: BTreeMap<String, Vec<String>>,
}

impl FormPayload {
    fn text(&self, field: &str) -> Result<String, ValidationError> {
        self.fields
            .get(field)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownField {
                field: field.to_string(),
            })
    }

    fn optional_text(&self, field: &str) -> Option<String> {
        self.fields.get(field).filter(|v| !v.is_empty()).cloned()
    }

    fn batch(&self, field: &str) -> Result<Vec<String>, ValidationError> {
        self.batches
            .get(field)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownField {
                field: field.to_string(),
            })
    }
}

/// Collaborator's success outcome. Counts are present when the backend reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub accepted: Option<usize>,
    pub duplicates: Option<usize>,
}

impl SubmitReceipt {
    pub fn counted(accepted: usize, duplicates: usize) -> Self {
        Self {
            accepted: Some(accepted),
            duplicates: Some(duplicates),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCampaignPayload {
    pub name: String,
    pub subject: String,
    pub content: String,
    pub recipient_list: Vec<String>,
    pub scheduled_for: Option<String>,
}

impl TryFrom<&FormPayload> for EmailCampaignPayload {
    type Error = ValidationError;

    fn try_from(payload: &FormPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            name: payload.text("name")?,
            subject: payload.text("subject")?,
            content: payload.text("content")?,
            recipient_list: payload.batch("recipients")?,
            scheduled_for: payload.optional_text("scheduled_for"),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(ValidationError::InvalidChoice {
                field: "priority".to_string(),
                allowed: "low, medium, high".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkUrlPayload {
    pub urls: Vec<String>,
    pub category: String,
    pub priority: Priority,
    pub notes: Option<String>,
}

impl TryFrom<&FormPayload> for BulkUrlPayload {
    type Error = ValidationError;

    fn try_from(payload: &FormPayload) -> Result<Self, Self::Error> {
        let priority = match payload.optional_text("priority") {
            Some(raw) => raw.parse()?,
            None => Priority::default(),
        };
        Ok(Self {
            urls: payload.batch("urls")?,
            category: payload.text("category")?,
            priority,
            notes: payload.optional_text("notes"),
        })
    }
}
