//! Cozi REST API client implementation.

use async_trait::async_trait;
use nonempty::NonEmpty;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, StatusCode};
use url::Url;

use super::wire::{
    appointments_from_month, AppointmentWire, CalendarMonthWire, ItemEdit, ItemRemoval,
    ListWire, LoginRequest, LoginResponse, NewItem, NewList, PersonWire,
};
use crate::client::{CoziApi, CoziError};
use crate::config::Credentials;
use crate::http::{build_http_client, RequestBuilderExt, ResponseExt};
use crate::model::{Appointment, CoziList, FamilyMember, ItemStatus, ListItem, ListType};
use crate::options::TransportOptions;

pub const DEFAULT_BASE_URL: &str = "https://rest.cozi.com/api/ext/";

const API_VERSION: &str = "2004";
const LOGIN_VERSION: &str = "2207";

/// Authenticated Cozi client.
///
/// Construction performs the login; the resulting session is used for every
/// later request and is never refreshed.
#[derive(Debug, Clone)]
pub struct CoziClient {
    http: reqwest::Client,
    base_url: Url,
    account_id: String,
    access_token: String,
}

impl CoziClient {
    /// Log in with `credentials` and return a ready client.
    pub async fn authenticate(
        credentials: &Credentials,
        base_url: &Url,
        transport_options: TransportOptions,
    ) -> Result<Self, CoziError> {
        let http = build_http_client(&transport_options)?;
        let base_url = normalize_base(base_url);

        let mut url = base_url.clone();
        push_segments(&mut url, &[LOGIN_VERSION, "auth", "login"])?;

        tracing::debug!("Authenticating Cozi account {}", credentials.username());

        // Plain `json` rather than `json_logged`: the body carries the password.
        let response = http
            .post(url)
            .json(&LoginRequest {
                username: credentials.username(),
                password: credentials.password(),
                issue_refresh: true,
            })
            .send()
            .await?
            .checked()
            .await
            .map_err(|e| match e {
                CoziError::Remote { status, message }
                    if status == StatusCode::FORBIDDEN.as_u16() =>
                {
                    CoziError::Authentication(message)
                }
                other => other,
            })?;
        let login: LoginResponse = response.json_logged().await?;

        tracing::info!("Authenticated with Cozi account {}", login.account_id);

        Ok(Self {
            http,
            base_url,
            account_id: login.account_id,
            access_token: login.access_token,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CoziError> {
        let mut url = self.base_url.clone();
        push_segments(&mut url, &[API_VERSION, &self.account_id])?;
        push_segments(&mut url, segments)?;
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, CoziError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.access_token)).map_err(|_| {
                CoziError::Authentication("access token is not a valid header value".to_string())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        tracing::debug!("Cozi {} {}", method, url);
        Ok(self.http.request(method, url).headers(headers))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, CoziError> {
        request.send().await?.checked().await
    }

    async fn fetch_lists(&self) -> Result<Vec<CoziList>, CoziError> {
        let url = self.endpoint(&["list", ""])?;
        let response = self.send(self.request(Method::GET, url)?).await?;
        let lists: Vec<ListWire> = response.json_logged().await?;
        Ok(lists.into_iter().map(CoziList::from).collect())
    }

    async fn edit_item(
        &self,
        list_id: &str,
        item_id: &str,
        edit: &ItemEdit<'_>,
    ) -> Result<ListItem, CoziError> {
        let url = self.endpoint(&["list", list_id, "item", item_id])?;
        let response = self
            .send(self.request(Method::PUT, url)?.json_logged(edit))
            .await?;
        let wire: ListWire = response.json_logged().await?;
        take_item(CoziList::from(wire), item_id)
    }
}

#[async_trait]
impl CoziApi for CoziClient {
    async fn get_family_members(&self) -> Result<Vec<FamilyMember>, CoziError> {
        let url = self.endpoint(&["account", "person", ""])?;
        let response = self.send(self.request(Method::GET, url)?).await?;
        let people: Vec<PersonWire> = response.json_logged().await?;
        Ok(people.into_iter().map(FamilyMember::from).collect())
    }

    async fn get_lists(&self) -> Result<Vec<CoziList>, CoziError> {
        self.fetch_lists().await
    }

    async fn get_lists_by_type(&self, list_type: ListType) -> Result<Vec<CoziList>, CoziError> {
        let lists = self.fetch_lists().await?;
        Ok(lists
            .into_iter()
            .filter(|list| list.list_type == list_type)
            .collect())
    }

    async fn create_list(&self, title: &str, list_type: ListType) -> Result<CoziList, CoziError> {
        let url = self.endpoint(&["list", ""])?;
        let body = NewList {
            title,
            list_type,
            items: Vec::new(),
        };
        let response = self
            .send(self.request(Method::POST, url)?.json_logged(&body))
            .await?;
        let wire: ListWire = response.json_logged().await?;
        Ok(CoziList::from(wire))
    }

    async fn delete_list(&self, list_id: &str) -> Result<bool, CoziError> {
        let url = self.endpoint(&["list", list_id])?;
        let response = self.send(self.request(Method::DELETE, url)?).await?;
        Ok(response.status().is_success())
    }

    async fn update_list(&self, list: &CoziList) -> Result<CoziList, CoziError> {
        let url = self.endpoint(&["list", &list.id])?;
        let response = self
            .send(self.request(Method::PUT, url)?.json_logged(&ListWire::from(list)))
            .await?;
        let wire: ListWire = response.json_logged().await?;
        Ok(CoziList::from(wire))
    }

    async fn add_item(
        &self,
        list_id: &str,
        text: &str,
        position: u32,
    ) -> Result<ListItem, CoziError> {
        let url = self.endpoint(&["list", list_id, "item", ""])?;
        let response = self
            .send(
                self.request(Method::POST, url)?
                    .json_logged(&NewItem { text, position }),
            )
            .await?;
        let wire: ListWire = response.json_logged().await?;
        take_added_item(CoziList::from(wire), text, position)
    }

    async fn update_item_text(
        &self,
        list_id: &str,
        item_id: &str,
        text: &str,
    ) -> Result<ListItem, CoziError> {
        let edit = ItemEdit {
            text: Some(text),
            status: None,
        };
        self.edit_item(list_id, item_id, &edit).await
    }

    async fn mark_item(
        &self,
        list_id: &str,
        item_id: &str,
        status: ItemStatus,
    ) -> Result<ListItem, CoziError> {
        let edit = ItemEdit {
            text: None,
            status: Some(status),
        };
        self.edit_item(list_id, item_id, &edit).await
    }

    async fn remove_items(
        &self,
        list_id: &str,
        item_ids: &NonEmpty<String>,
    ) -> Result<bool, CoziError> {
        let url = self.endpoint(&["list", list_id, "item", ""])?;
        let body = ItemRemoval {
            item_ids: item_ids.iter().map(String::as_str).collect(),
        };
        let response = self
            .send(self.request(Method::DELETE, url)?.json_logged(&body))
            .await?;
        Ok(response.status().is_success())
    }

    async fn get_calendar(&self, year: i32, month: u32) -> Result<Vec<Appointment>, CoziError> {
        let url = self.endpoint(&["calendar", &year.to_string(), &month.to_string()])?;
        let response = self.send(self.request(Method::GET, url)?).await?;
        let month: CalendarMonthWire = response.json_logged().await?;
        appointments_from_month(month)
    }

    async fn create_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, CoziError> {
        let url = self.endpoint(&["calendar", ""])?;
        let response = self
            .send(
                self.request(Method::POST, url)?
                    .json_logged(&AppointmentWire::from(appointment)),
            )
            .await?;
        let wire: AppointmentWire = response.json_logged().await?;
        Appointment::try_from(wire)
    }

    async fn update_appointment(
        &self,
        appointment: &Appointment,
    ) -> Result<Appointment, CoziError> {
        let id = appointment.id.as_deref().ok_or_else(|| {
            CoziError::validation("appointment_id is required to update an appointment")
        })?;
        let url = self.endpoint(&["calendar", id])?;
        let response = self
            .send(
                self.request(Method::PUT, url)?
                    .json_logged(&AppointmentWire::from(appointment)),
            )
            .await?;
        let wire: AppointmentWire = response.json_logged().await?;
        let mut updated = Appointment::try_from(wire)?;
        updated.id.get_or_insert_with(|| id.to_string());
        Ok(updated)
    }

    async fn delete_appointment(
        &self,
        appointment_id: &str,
        month: Option<(i32, u32)>,
    ) -> Result<bool, CoziError> {
        let url = match month {
            Some((year, month)) => self.endpoint(&[
                "calendar",
                &year.to_string(),
                &month.to_string(),
                appointment_id,
            ])?,
            None => self.endpoint(&["calendar", appointment_id])?,
        };
        let response = self.send(self.request(Method::DELETE, url)?).await?;
        Ok(response.status().is_success())
    }
}

/// The base URL must end in `/` for segment pushes to land under it.
fn normalize_base(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Append path segments, percent-encoding each. An empty trailing segment
/// yields a trailing slash.
fn push_segments(url: &mut Url, segments: &[&str]) -> Result<(), CoziError> {
    if url.cannot_be_a_base() {
        return Err(CoziError::validation(format!("{url} cannot be a base URL")));
    }
    let mut path = url
        .path_segments_mut()
        .map_err(|_| CoziError::validation("base URL cannot have path segments"))?;
    path.pop_if_empty();
    path.extend(segments);
    Ok(())
}

fn take_item(list: CoziList, item_id: &str) -> Result<ListItem, CoziError> {
    let list_id = list.id.clone();
    list.items
        .into_iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| {
            CoziError::UnexpectedResponse(format!("item {item_id} missing from list {list_id}"))
        })
}

/// Locate the item just inserted: prefer the requested slot, fall back to
/// the first item with matching text.
fn take_added_item(list: CoziList, text: &str, position: u32) -> Result<ListItem, CoziError> {
    let list_id = list.id.clone();
    let mut items = list.items;
    let slot = usize::try_from(position).unwrap_or(usize::MAX);

    let index = match items.get(slot) {
        Some(item) if item.text == text => Some(slot),
        _ => items.iter().position(|item| item.text == text),
    };

    match index {
        Some(i) => Ok(items.swap_remove(i)),
        None => Err(CoziError::UnexpectedResponse(format!(
            "new item {text:?} missing from list {list_id}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemStatus;

    fn item(id: &str, text: &str) -> ListItem {
        ListItem {
            id: id.to_string(),
            text: text.to_string(),
            status: ItemStatus::Incomplete,
            item_type: None,
            due_date: None,
            notes: None,
            owner: None,
            version: None,
        }
    }

    fn list(items: Vec<ListItem>) -> CoziList {
        CoziList {
            id: "L1".to_string(),
            title: "Groceries".to_string(),
            list_type: ListType::Shopping,
            items,
            owner: None,
            version: None,
            notes: None,
        }
    }

    #[test]
    fn segments_are_appended_under_the_base() {
        let mut url = normalize_base(&Url::parse("https://rest.cozi.com/api/ext").unwrap());
        push_segments(&mut url, &["2004", "acct", "list", ""]).unwrap();
        assert_eq!(url.as_str(), "https://rest.cozi.com/api/ext/2004/acct/list/");
    }

    #[test]
    fn identifiers_are_percent_encoded() {
        let mut url = Url::parse(DEFAULT_BASE_URL).unwrap();
        push_segments(&mut url, &["list", "../admin"]).unwrap();
        assert!(url.path().ends_with("/list/..%2Fadmin"));
    }

    #[test]
    fn added_item_prefers_requested_position() {
        let list = list(vec![item("I1", "Milk"), item("I2", "Milk")]);
        assert_eq!(take_added_item(list, "Milk", 1).unwrap().id, "I2");
    }

    #[test]
    fn added_item_falls_back_to_text_match() {
        let list = list(vec![item("I1", "Eggs"), item("I2", "Milk")]);
        assert_eq!(take_added_item(list, "Milk", 0).unwrap().id, "I2");
    }

    #[test]
    fn missing_item_is_an_unexpected_response() {
        let err = take_item(list(vec![item("I1", "Eggs")]), "I9").unwrap_err();
        assert!(matches!(err, CoziError::UnexpectedResponse(_)));
    }
}
