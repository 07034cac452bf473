//! Request and response bodies as the Cozi REST API spells them.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::client::CoziError;
use crate::model::{Appointment, CoziList, FamilyMember, ItemStatus, ListItem, ListType};

const TIME_FORMAT: &str = "%H:%M:%S";

// --- Authentication ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub issue_refresh: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LoginResponse {
    pub account_id: String,
    pub access_token: String,
}

// --- Family members ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PersonWire {
    pub account_person_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone_number_key: Option<String>,
    pub color_index: Option<u32>,
    pub account_person_type: Option<String>,
}

impl From<PersonWire> for FamilyMember {
    fn from(wire: PersonWire) -> Self {
        FamilyMember {
            id: wire.account_person_id,
            name: wire.name,
            email: wire.email.filter(|e| !e.is_empty()),
            phone: wire.phone_number_key.filter(|p| !p.is_empty()),
            color: wire.color_index,
            is_adult: wire
                .account_person_type
                .map(|kind| kind.eq_ignore_ascii_case("adult")),
        }
    }
}

// --- Lists ---

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ItemWire {
    pub item_id: String,
    pub text: String,
    pub status: ItemStatus,
    pub item_type: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub owner: Option<String>,
    pub version: Option<i64>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListWire {
    pub list_id: String,
    pub title: String,
    pub list_type: ListType,
    #[serde(default)]
    pub items: Vec<ItemWire>,
    pub owner: Option<String>,
    pub version: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NewList<'a> {
    pub title: &'a str,
    pub list_type: ListType,
    pub items: Vec<ItemWire>,
}

#[derive(Serialize)]
pub(super) struct NewItem<'a> {
    pub text: &'a str,
    pub position: u32,
}

#[skip_serializing_none]
#[derive(Serialize)]
pub(super) struct ItemEdit<'a> {
    pub text: Option<&'a str>,
    pub status: Option<ItemStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ItemRemoval<'a> {
    pub item_ids: Vec<&'a str>,
}

impl From<ItemWire> for ListItem {
    fn from(wire: ItemWire) -> Self {
        ListItem {
            id: wire.item_id,
            text: wire.text,
            status: wire.status,
            item_type: wire.item_type,
            due_date: wire.due_date,
            notes: wire.notes,
            owner: wire.owner,
            version: wire.version,
        }
    }
}

impl From<&ListItem> for ItemWire {
    fn from(item: &ListItem) -> Self {
        ItemWire {
            item_id: item.id.clone(),
            text: item.text.clone(),
            status: item.status,
            item_type: item.item_type.clone(),
            due_date: item.due_date,
            notes: item.notes.clone(),
            owner: item.owner.clone(),
            version: item.version,
        }
    }
}

impl From<ListWire> for CoziList {
    fn from(wire: ListWire) -> Self {
        CoziList {
            id: wire.list_id,
            title: wire.title,
            list_type: wire.list_type,
            items: wire.items.into_iter().map(ListItem::from).collect(),
            owner: wire.owner,
            version: wire.version,
            notes: wire.notes,
        }
    }
}

impl From<&CoziList> for ListWire {
    fn from(list: &CoziList) -> Self {
        ListWire {
            list_id: list.id.clone(),
            title: list.title.clone(),
            list_type: list.list_type,
            items: list.items.iter().map(ItemWire::from).collect(),
            owner: list.owner.clone(),
            version: list.version,
            notes: list.notes.clone(),
        }
    }
}

// --- Calendar ---

#[derive(Debug, Deserialize)]
pub(super) struct CalendarMonthWire {
    #[serde(default)]
    pub items: HashMap<String, AppointmentWire>,
}

#[skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AppointmentDetailsWire {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub date_span: u32,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub attendee_set: Vec<String>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AppointmentWire {
    pub id: Option<String>,
    #[serde(default = "appointment_item_type")]
    pub item_type: String,
    pub start_day: NaiveDate,
    /// Cozi calls the subject line the description.
    pub description: String,
    #[serde(default)]
    pub item_details: AppointmentDetailsWire,
}

fn appointment_item_type() -> String {
    "appointment".to_string()
}

fn parse_wire_time(value: &str) -> Result<NaiveTime, CoziError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| CoziError::UnexpectedResponse(format!("unreadable time of day: {value}")))
}

impl TryFrom<AppointmentWire> for Appointment {
    type Error = CoziError;

    fn try_from(wire: AppointmentWire) -> Result<Self, Self::Error> {
        let details = wire.item_details;
        let start_time = details
            .start_time
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(parse_wire_time)
            .transpose()?;
        let end_time = details
            .end_time
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(parse_wire_time)
            .transpose()?;

        Ok(Appointment {
            id: wire.id,
            subject: wire.description,
            start_day: wire.start_day,
            start_time,
            end_time,
            date_span: details.date_span,
            attendees: details.attendee_set,
            location: details.location.filter(|l| !l.is_empty()),
            notes: details.notes.filter(|n| !n.is_empty()),
        })
    }
}

impl From<&Appointment> for AppointmentWire {
    fn from(appointment: &Appointment) -> Self {
        AppointmentWire {
            id: appointment.id.clone(),
            item_type: appointment_item_type(),
            start_day: appointment.start_day,
            description: appointment.subject.clone(),
            item_details: AppointmentDetailsWire {
                start_time: appointment
                    .start_time
                    .map(|t| t.format(TIME_FORMAT).to_string()),
                end_time: appointment
                    .end_time
                    .map(|t| t.format(TIME_FORMAT).to_string()),
                date_span: appointment.date_span,
                location: appointment.location.clone(),
                notes: appointment.notes.clone(),
                attendee_set: appointment.attendees.clone(),
            },
        }
    }
}

/// Flatten a month payload into appointments ordered by start.
pub(super) fn appointments_from_month(
    month: CalendarMonthWire,
) -> Result<Vec<Appointment>, CoziError> {
    let mut appointments = month
        .items
        .into_iter()
        .map(|(id, mut wire)| {
            wire.id.get_or_insert(id);
            Appointment::try_from(wire)
        })
        .collect::<Result<Vec<_>, _>>()?;

    appointments.sort_by(|a, b| {
        (a.start_day, a.start_time, &a.id).cmp(&(b.start_day, b.start_time, &b.id))
    });
    Ok(appointments)
}
