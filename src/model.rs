//! Domain entities returned by the Cozi service.
//!
//! Every type here serializes to the flat mapping handed back to the tool
//! caller: snake_case field names, dates as `YYYY-MM-DD`, times as
//! `HH:MM:SS`, absent optionals as `null`.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::client::CoziError;

/// Classification of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Shopping,
    Todo,
}

impl ListType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Shopping => "shopping",
            ListType::Todo => "todo",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = CoziError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shopping" => Ok(ListType::Shopping),
            "todo" => Ok(ListType::Todo),
            _ => Err(CoziError::Validation(format!(
                "Invalid list type: {s}. Must be 'shopping' or 'todo'"
            ))),
        }
    }
}

/// Completion state of a single list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Complete,
    Incomplete,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Complete => "complete",
            ItemStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = CoziError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "complete" => Ok(ItemStatus::Complete),
            "incomplete" => Ok(ItemStatus::Incomplete),
            _ => Err(CoziError::Validation(format!(
                "Invalid status: {s}. Must be 'complete' or 'incomplete'"
            ))),
        }
    }
}

/// A person on the family account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Index into Cozi's fixed palette.
    pub color: Option<u32>,
    pub is_adult: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: String,
    pub text: String,
    pub status: ItemStatus,
    pub item_type: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub owner: Option<String>,
    pub version: Option<i64>,
}

/// A shopping or todo list together with its items, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoziList {
    pub id: String,
    pub title: String,
    pub list_type: ListType,
    pub items: Vec<ListItem>,
    pub owner: Option<String>,
    pub version: Option<i64>,
    pub notes: Option<String>,
}

impl CoziList {
    pub fn item(&self, item_id: &str) -> Option<&ListItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

/// A calendar entry.
///
/// `id` is `None` until the service assigns one. An appointment without
/// `start_time` is an all-day event; `date_span` counts the days it runs
/// past `start_day`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Option<String>,
    pub subject: String,
    pub start_day: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub date_span: u32,
    pub attendees: Vec<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none()
    }
}
