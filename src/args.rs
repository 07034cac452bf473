//! Tool arguments and their validation.
//!
//! Every struct here derives `JsonSchema`, which becomes the tool's declared
//! input schema. Validation converts the primitive fields into domain values
//! and always runs before a client handle is touched.

use chrono::{NaiveDate, NaiveTime};
use nonempty::NonEmpty;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::client::CoziError;
use crate::model::{Appointment, CoziList, ItemStatus, ListItem, ListType};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListTypeArgs {
    #[schemars(description = "Type of lists to retrieve ('shopping' or 'todo')")]
    pub list_type: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateListArgs {
    #[schemars(description = "Title of the new list")]
    pub title: String,
    #[schemars(description = "Type of list to create ('shopping' or 'todo')")]
    pub list_type: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListIdArgs {
    #[schemars(description = "ID of the list")]
    pub list_id: String,
}

/// One entry of a list being replaced by `update_list`.
///
/// Field names follow the item mapping returned by the list tools, so an
/// item read from `get_lists` can be sent back unchanged.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListItemInput {
    #[serde(alias = "item_id")]
    #[schemars(description = "ID of an existing item")]
    pub id: String,
    #[schemars(description = "Text content of the item")]
    pub text: String,
    #[schemars(description = "'complete' or 'incomplete'")]
    pub status: String,
    #[schemars(description = "Item kind as reported by Cozi (e.g. 'header')")]
    pub item_type: Option<String>,
    #[schemars(description = "Due date in YYYY-MM-DD format")]
    pub due_date: Option<String>,
    pub notes: Option<String>,
    pub owner: Option<String>,
    pub version: Option<i64>,
}

/// A full list mapping, as returned by `get_lists` or `create_list`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateListArgs {
    #[serde(alias = "list_id")]
    #[schemars(description = "ID of the list to update")]
    pub id: String,
    #[schemars(description = "Title of the list")]
    pub title: String,
    #[schemars(description = "Type of the list ('shopping' or 'todo')")]
    pub list_type: String,
    #[schemars(description = "Every item of the list, in the desired order")]
    pub items: Vec<ListItemInput>,
    #[schemars(description = "Family member owning the list")]
    pub owner: Option<String>,
    #[schemars(description = "List notes")]
    pub notes: Option<String>,
    #[schemars(description = "Version last read from the service, if known")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddItemArgs {
    #[schemars(description = "ID of the list to add the item to")]
    pub list_id: String,
    #[schemars(description = "Text content of the item to add")]
    pub text: String,
    #[schemars(description = "Position in the list (0 = top)")]
    pub position: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateItemTextArgs {
    #[schemars(description = "ID of the list containing the item")]
    pub list_id: String,
    #[schemars(description = "ID of the item to update")]
    pub item_id: String,
    #[schemars(description = "New text content for the item")]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MarkItemArgs {
    #[schemars(description = "ID of the list containing the item")]
    pub list_id: String,
    #[schemars(description = "ID of the item to mark")]
    pub item_id: String,
    #[schemars(description = "Status to set ('complete' or 'incomplete')")]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RemoveItemsArgs {
    #[schemars(description = "ID of the list containing the items")]
    pub list_id: String,
    #[schemars(description = "IDs of the items to remove")]
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CalendarArgs {
    #[schemars(description = "Year (e.g., 2024)")]
    pub year: i32,
    #[schemars(description = "Month (1-12)")]
    pub month: u32,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AppointmentArgs {
    #[schemars(description = "Subject/title of the appointment")]
    pub subject: String,
    #[schemars(description = "Start date in YYYY-MM-DD format")]
    pub start_date: String,
    #[schemars(description = "Optional last day in YYYY-MM-DD format, for multi-day appointments")]
    pub end_date: Option<String>,
    #[schemars(description = "Optional start time in HH:MM format")]
    pub start_time: Option<String>,
    #[schemars(description = "Optional end time in HH:MM format")]
    pub end_time: Option<String>,
    #[schemars(description = "Optional location")]
    pub location: Option<String>,
    #[schemars(description = "Optional notes")]
    pub notes: Option<String>,
    #[schemars(description = "Whether this is an all-day event (default: false)")]
    pub all_day: Option<bool>,
    #[schemars(description = "Optional family member IDs attending")]
    pub attendees: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateAppointmentArgs {
    #[schemars(description = "ID of the appointment to update")]
    pub appointment_id: String,
    #[serde(flatten)]
    pub details: AppointmentArgs,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteAppointmentArgs {
    #[schemars(description = "ID of the appointment to delete")]
    pub appointment_id: String,
    #[schemars(description = "Year of the appointment; give together with month")]
    pub year: Option<i32>,
    #[schemars(description = "Month of the appointment (1-12); give together with year")]
    pub month: Option<u32>,
}

// --- Validation ---

/// Trimmed, non-blank value of a required identifier.
pub fn required(field: &str, value: &str) -> Result<String, CoziError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoziError::validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Non-blank free text, forwarded exactly as given.
pub fn required_text(field: &str, value: &str) -> Result<String, CoziError> {
    required(field, value)?;
    Ok(value.to_string())
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, CoziError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| CoziError::validation(format!("Invalid {field} format. Use YYYY-MM-DD")))
}

pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, CoziError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| CoziError::validation(format!("Invalid {field} format. Use HH:MM")))
}

pub fn check_month(month: u32) -> Result<u32, CoziError> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(CoziError::validation(format!(
            "Invalid month: {month}. month must be between 1 and 12"
        )))
    }
}

/// Blank optional strings count as absent.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl ListItemInput {
    fn into_item(self, index: usize) -> Result<ListItem, CoziError> {
        let due_date = present(self.due_date.as_deref())
            .map(|d| parse_date(&format!("items[{index}].due_date"), d))
            .transpose()?;
        Ok(ListItem {
            id: required(&format!("items[{index}].id"), &self.id)?,
            text: required_text(&format!("items[{index}].text"), &self.text)?,
            status: self.status.parse()?,
            item_type: self.item_type,
            due_date,
            notes: self.notes,
            owner: self.owner,
            version: self.version,
        })
    }
}

impl UpdateListArgs {
    /// Validate every field and assemble the replacement list.
    pub fn into_list(self) -> Result<CoziList, CoziError> {
        let id = required("id", &self.id)?;
        let title = required_text("title", &self.title)?;
        let list_type: ListType = self.list_type.parse()?;
        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| item.into_item(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = std::collections::HashSet::new();
        if let Some(duplicate) = items.iter().find(|item| !seen.insert(item.id.as_str())) {
            return Err(CoziError::validation(format!(
                "item {} appears more than once",
                duplicate.id
            )));
        }

        Ok(CoziList {
            id,
            title,
            list_type,
            items,
            owner: self.owner,
            version: self.version,
            notes: self.notes,
        })
    }
}

impl RemoveItemsArgs {
    pub fn validate(self) -> Result<(String, NonEmpty<String>), CoziError> {
        let list_id = required("list_id", &self.list_id)?;
        let ids = self
            .item_ids
            .iter()
            .map(|id| required("item_ids", id))
            .collect::<Result<Vec<_>, _>>()?;
        let ids = NonEmpty::from_vec(ids)
            .ok_or_else(|| CoziError::validation("item_ids must not be empty"))?;
        Ok((list_id, ids))
    }
}

impl CalendarArgs {
    pub fn validate(&self) -> Result<(i32, u32), CoziError> {
        Ok((self.year, check_month(self.month)?))
    }
}

impl AppointmentArgs {
    /// Validate and build the appointment sent to the service.
    pub fn into_appointment(self, id: Option<String>) -> Result<Appointment, CoziError> {
        let subject = required_text("subject", &self.subject)?;
        let start_day = parse_date("start_date", &self.start_date)?;

        let date_span = match present(self.end_date.as_deref()) {
            Some(end) => {
                let end_day = parse_date("end_date", end)?;
                let span = (end_day - start_day).num_days();
                u32::try_from(span).map_err(|_| {
                    CoziError::validation("end_date must not be earlier than start_date")
                })?
            }
            None => 0,
        };

        let start_time = present(self.start_time.as_deref())
            .map(|t| parse_time("start_time", t))
            .transpose()?;
        let end_time = present(self.end_time.as_deref())
            .map(|t| parse_time("end_time", t))
            .transpose()?;

        if self.all_day.unwrap_or(false) && (start_time.is_some() || end_time.is_some()) {
            return Err(CoziError::validation(
                "start_time and end_time cannot be combined with all_day",
            ));
        }
        if start_time.is_none() && end_time.is_some() {
            return Err(CoziError::validation("end_time requires start_time"));
        }

        let attendees = self
            .attendees
            .unwrap_or_default()
            .iter()
            .map(|id| required("attendees", id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Appointment {
            id,
            subject,
            start_day,
            start_time,
            end_time,
            date_span,
            attendees,
            location: optional_text(self.location),
            notes: optional_text(self.notes),
        })
    }
}

impl UpdateAppointmentArgs {
    pub fn into_appointment(self) -> Result<Appointment, CoziError> {
        let id = required("appointment_id", &self.appointment_id)?;
        self.details.into_appointment(Some(id))
    }
}

impl DeleteAppointmentArgs {
    pub fn validate(&self) -> Result<(String, Option<(i32, u32)>), CoziError> {
        let id = required("appointment_id", &self.appointment_id)?;
        let month = match (self.year, self.month) {
            (Some(year), Some(month)) => Some((year, check_month(month)?)),
            (None, None) => None,
            _ => return Err(CoziError::validation("year and month must be given together")),
        };
        Ok((id, month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, text: &str) -> ListItemInput {
        ListItemInput {
            id: id.to_string(),
            text: text.to_string(),
            status: "incomplete".to_string(),
            item_type: None,
            due_date: None,
            notes: None,
            owner: None,
            version: None,
        }
    }

    fn list_args(items: Vec<ListItemInput>) -> UpdateListArgs {
        UpdateListArgs {
            id: "L1".to_string(),
            title: "Groceries".to_string(),
            list_type: "shopping".to_string(),
            items,
            owner: None,
            notes: None,
            version: None,
        }
    }

    fn appointment_args() -> AppointmentArgs {
        AppointmentArgs {
            subject: "Dentist".to_string(),
            start_date: "2024-03-15".to_string(),
            end_date: None,
            start_time: None,
            end_time: None,
            location: None,
            notes: None,
            all_day: None,
            attendees: None,
        }
    }

    #[test]
    fn malformed_dates_name_the_expected_format() {
        for bad in ["2024/03/15", "2024-13-01", "2024-02-30", "15-03-2024", ""] {
            let err = parse_date("start_date", bad).unwrap_err();
            assert_eq!(err.to_string(), "Invalid start_date format. Use YYYY-MM-DD");
        }
    }

    #[test]
    fn malformed_times_name_the_expected_format() {
        for bad in ["25:00", "10.30", "10:61", "ten"] {
            let err = parse_time("end_time", bad).unwrap_err();
            assert_eq!(err.to_string(), "Invalid end_time format. Use HH:MM");
        }
    }

    #[test]
    fn month_bounds() {
        assert!(check_month(1).is_ok());
        assert!(check_month(12).is_ok());
        assert_eq!(
            check_month(13).unwrap_err().to_string(),
            "Invalid month: 13. month must be between 1 and 12"
        );
        assert!(check_month(0).is_err());
    }

    #[test]
    fn multi_day_appointment_computes_span() {
        let mut args = appointment_args();
        args.end_date = Some("2024-03-17".to_string());
        args.all_day = Some(true);

        let appointment = args.into_appointment(None).unwrap();
        assert_eq!(appointment.date_span, 2);
        assert!(appointment.is_all_day());
    }

    #[test]
    fn end_date_before_start_is_rejected() {
        let mut args = appointment_args();
        args.end_date = Some("2024-03-14".to_string());
        assert!(matches!(
            args.into_appointment(None),
            Err(CoziError::Validation(_))
        ));
    }

    #[test]
    fn all_day_with_times_is_rejected() {
        let mut args = appointment_args();
        args.all_day = Some(true);
        args.start_time = Some("09:00".to_string());
        assert!(args.into_appointment(None).is_err());
    }

    #[test]
    fn end_time_alone_is_rejected() {
        let mut args = appointment_args();
        args.end_time = Some("09:00".to_string());
        assert!(args.into_appointment(None).is_err());
    }

    #[test]
    fn blank_optional_strings_are_absent() {
        let mut args = appointment_args();
        args.start_time = Some("  ".to_string());
        args.location = Some("".to_string());
        let appointment = args.into_appointment(None).unwrap();
        assert_eq!(appointment.start_time, None);
        assert_eq!(appointment.location, None);
    }

    #[test]
    fn update_list_rejects_bad_status() {
        let mut item = item("I1", "Milk");
        item.status = "finished".to_string();
        let args = list_args(vec![item]);
        let err = args.into_list().unwrap_err();
        assert!(err.to_string().starts_with("Invalid status: finished"));
    }

    #[test]
    fn update_list_rejects_duplicate_items() {
        let item = item("I1", "Milk");
        let args = list_args(vec![item.clone(), item]);
        assert!(args.into_list().is_err());
    }

    #[test]
    fn list_mapping_round_trips_into_update_args() {
        let list = CoziList {
            id: "L1".to_string(),
            title: "Groceries".to_string(),
            list_type: ListType::Shopping,
            items: vec![ListItem {
                id: "H1".to_string(),
                text: "Produce".to_string(),
                status: ItemStatus::Incomplete,
                item_type: Some("header".to_string()),
                due_date: NaiveDate::from_ymd_opt(2024, 3, 15),
                notes: Some("aisle 4".to_string()),
                owner: Some("P1".to_string()),
                version: Some(7),
            }],
            owner: Some("P1".to_string()),
            version: Some(3),
            notes: Some("weekly".to_string()),
        };

        let mapping = serde_json::to_value(&list).unwrap();
        let args: UpdateListArgs = serde_json::from_value(mapping).unwrap();
        assert_eq!(args.into_list().unwrap(), list);
    }

    #[test]
    fn legacy_id_keys_are_accepted() {
        let args: UpdateListArgs = serde_json::from_value(serde_json::json!({
            "list_id": "L1",
            "title": "Groceries",
            "list_type": "shopping",
            "items": [{"item_id": "I1", "text": "Milk", "status": "incomplete"}]
        }))
        .unwrap();
        let list = args.into_list().unwrap();
        assert_eq!(list.id, "L1");
        assert_eq!(list.items[0].id, "I1");
    }

    #[test]
    fn free_text_is_forwarded_verbatim() {
        let mut args = appointment_args();
        args.subject = "  Dentist ".to_string();
        args.location = Some(" Main St ".to_string());
        let appointment = args.into_appointment(None).unwrap();
        assert_eq!(appointment.subject, "  Dentist ");
        assert_eq!(appointment.location.as_deref(), Some(" Main St "));

        assert_eq!(required("list_id", " L1 ").unwrap(), "L1");
        assert!(required_text("text", "   ").is_err());
    }

    #[test]
    fn remove_items_requires_ids() {
        let args = RemoveItemsArgs {
            list_id: "L1".to_string(),
            item_ids: vec![],
        };
        assert_eq!(
            args.validate().unwrap_err().to_string(),
            "item_ids must not be empty"
        );
    }

    #[test]
    fn delete_appointment_needs_year_and_month_together() {
        let args = DeleteAppointmentArgs {
            appointment_id: "A1".to_string(),
            year: Some(2024),
            month: None,
        };
        assert!(args.validate().is_err());

        let args = DeleteAppointmentArgs {
            appointment_id: "A1".to_string(),
            year: Some(2024),
            month: Some(3),
        };
        assert_eq!(args.validate().unwrap(), ("A1".to_string(), Some((2024, 3))));
    }
}
