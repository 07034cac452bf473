//! Client handle trait and error types.

use std::fmt;

use async_trait::async_trait;
use nonempty::NonEmpty;
use thiserror::Error;

use crate::model::{Appointment, CoziList, FamilyMember, ItemStatus, ListItem, ListType};

/// Errors that can occur while serving a tool call.
#[derive(Error, Debug)]
pub enum CoziError {
    #[error("{0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Cozi API error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Coarse classification of a [`CoziError`], so callers can branch without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Remote,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Remote => "remote",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CoziError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoziError::Validation(_) => ErrorKind::Validation,
            CoziError::Authentication(_) => ErrorKind::Authentication,
            CoziError::Remote { .. } | CoziError::Http(_) => ErrorKind::Remote,
            CoziError::Parse(_) | CoziError::UnexpectedResponse(_) => ErrorKind::Unexpected,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        CoziError::Validation(message.into())
    }
}

/// An authenticated connection to the Cozi service.
///
/// Each method maps to exactly one remote request. Implementations do not
/// retry; failures are returned to the caller unchanged.
#[async_trait]
pub trait CoziApi: Send + Sync {
    async fn get_family_members(&self) -> Result<Vec<FamilyMember>, CoziError>;

    async fn get_lists(&self) -> Result<Vec<CoziList>, CoziError>;

    async fn get_lists_by_type(&self, list_type: ListType) -> Result<Vec<CoziList>, CoziError>;

    async fn create_list(&self, title: &str, list_type: ListType) -> Result<CoziList, CoziError>;

    /// Returns `true` when the service confirms the deletion.
    async fn delete_list(&self, list_id: &str) -> Result<bool, CoziError>;

    /// Replace a list wholesale, typically to reorder its items.
    async fn update_list(&self, list: &CoziList) -> Result<CoziList, CoziError>;

    /// Insert an item at `position` (0 = top) and return it.
    async fn add_item(
        &self,
        list_id: &str,
        text: &str,
        position: u32,
    ) -> Result<ListItem, CoziError>;

    async fn update_item_text(
        &self,
        list_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<ListItem, CoziError>;

    async fn mark_item(
        &self,
        list_id: &str,
        item_id: &str,
        status: ItemStatus,
    ) -> Result<ListItem, CoziError>;

    async fn remove_items(
        &self,
        list_id: &str,
        item_ids: &NonEmpty<String>,
    ) -> Result<bool, CoziError>;

    /// Appointments for one calendar month, `month` in 1..=12.
    async fn get_calendar(&self, year: i32, month: u32) -> Result<Vec<Appointment>, CoziError>;

    async fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, CoziError>;

    /// `appointment.id` must be set.
    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, CoziError>;

    /// `month` optionally narrows the lookup to the `(year, month)` the
    /// appointment falls in.
    async fn delete_appointment(
        &self,
        appointment_id: &str,
        month: Option<(i32, u32)>,
    ) -> Result<bool, CoziError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(CoziError::validation("bad").kind(), ErrorKind::Validation);
        assert_eq!(CoziError::Authentication("nope".into()).kind(), ErrorKind::Authentication);
        assert_eq!(
            CoziError::Remote {
                status: 404,
                message: "not found".into()
            }
            .kind(),
            ErrorKind::Remote
        );
        assert_eq!(CoziError::UnexpectedResponse("empty".into()).kind(), ErrorKind::Unexpected);
    }

    #[test]
    fn validation_message_is_not_prefixed() {
        assert_eq!(
            CoziError::validation("Invalid month: 13. month must be between 1 and 12").to_string(),
            "Invalid month: 13. month must be between 1 and 12"
        );
    }
}
