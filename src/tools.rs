//! The tool catalog, independent of the MCP transport.
//!
//! Each operation validates its arguments, obtains the client handle,
//! performs exactly one remote call and flattens the result to JSON.
//! Errors are logged with the operation name and returned unchanged.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::args::{
    AddItemArgs, AppointmentArgs, CalendarArgs, CreateListArgs, DeleteAppointmentArgs,
    ListIdArgs, ListTypeArgs, MarkItemArgs, RemoveItemsArgs, UpdateAppointmentArgs,
    UpdateItemTextArgs, UpdateListArgs, required, required_text,
};
use crate::client::{CoziApi, CoziError, ErrorKind};
use crate::config::Credentials;
use crate::handle::{ClientFactory, ClientHandle};
use crate::model::{ItemStatus, ListType};

/// Executes tool calls against a lazily-connected Cozi client.
#[derive(Debug)]
pub struct CoziTools {
    handle: ClientHandle,
}

impl CoziTools {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            handle: ClientHandle::new(factory),
        }
    }

    pub fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    /// Credentials are checked only now, after argument validation, and
    /// before anything is connected.
    async fn client(
        &self,
        credentials: Result<Credentials, CoziError>,
    ) -> Result<Arc<dyn CoziApi>, CoziError> {
        let credentials = credentials?;
        self.handle.get(&credentials).await
    }

    pub async fn get_family_members(
        &self,
        credentials: Result<Credentials, CoziError>,
    ) -> Result<Value, CoziError> {
        run("get_family_members", async move {
            let client = self.client(credentials).await?;
            flatten(client.get_family_members().await?)
        })
        .await
    }

    pub async fn get_lists(
        &self,
        credentials: Result<Credentials, CoziError>,
    ) -> Result<Value, CoziError> {
        run("get_lists", async move {
            let client = self.client(credentials).await?;
            flatten(client.get_lists().await?)
        })
        .await
    }

    pub async fn get_lists_by_type(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: ListTypeArgs,
    ) -> Result<Value, CoziError> {
        run("get_lists_by_type", async move {
            let list_type: ListType = args.list_type.parse()?;
            let client = self.client(credentials).await?;
            flatten(client.get_lists_by_type(list_type).await?)
        })
        .await
    }

    pub async fn create_list(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: CreateListArgs,
    ) -> Result<Value, CoziError> {
        run("create_list", async move {
            let title = required_text("title", &args.title)?;
            let list_type: ListType = args.list_type.parse()?;
            let client = self.client(credentials).await?;
            flatten(client.create_list(&title, list_type).await?)
        })
        .await
    }

    pub async fn delete_list(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: ListIdArgs,
    ) -> Result<Value, CoziError> {
        run("delete_list", async move {
            let list_id = required("list_id", &args.list_id)?;
            let client = self.client(credentials).await?;
            flatten(client.delete_list(&list_id).await?)
        })
        .await
    }

    pub async fn update_list(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: UpdateListArgs,
    ) -> Result<Value, CoziError> {
        run("update_list", async move {
            let list = args.into_list()?;
            let client = self.client(credentials).await?;
            flatten(client.update_list(&list).await?)
        })
        .await
    }

    pub async fn add_item(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: AddItemArgs,
    ) -> Result<Value, CoziError> {
        run("add_item", async move {
            let list_id = required("list_id", &args.list_id)?;
            let text = required_text("text", &args.text)?;
            let client = self.client(credentials).await?;
            flatten(
                client
                    .add_item(&list_id, &text, args.position.unwrap_or(0))
                    .await?,
            )
        })
        .await
    }

    pub async fn update_item_text(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: UpdateItemTextArgs,
    ) -> Result<Value, CoziError> {
        run("update_item_text", async move {
            let list_id = required("list_id", &args.list_id)?;
            let item_id = required("item_id", &args.item_id)?;
            let text = required_text("text", &args.text)?;
            let client = self.client(credentials).await?;
            flatten(client.update_item_text(&list_id, &item_id, &text).await?)
        })
        .await
    }

    pub async fn mark_item(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: MarkItemArgs,
    ) -> Result<Value, CoziError> {
        run("mark_item", async move {
            let status: ItemStatus = args.status.parse()?;
            let list_id = required("list_id", &args.list_id)?;
            let item_id = required("item_id", &args.item_id)?;
            let client = self.client(credentials).await?;
            flatten(client.mark_item(&list_id, &item_id, status).await?)
        })
        .await
    }

    pub async fn remove_items(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: RemoveItemsArgs,
    ) -> Result<Value, CoziError> {
        run("remove_items", async move {
            let (list_id, item_ids) = args.validate()?;
            let client = self.client(credentials).await?;
            flatten(client.remove_items(&list_id, &item_ids).await?)
        })
        .await
    }

    pub async fn get_calendar(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: CalendarArgs,
    ) -> Result<Value, CoziError> {
        run("get_calendar", async move {
            let (year, month) = args.validate()?;
            let client = self.client(credentials).await?;
            flatten(client.get_calendar(year, month).await?)
        })
        .await
    }

    pub async fn create_appointment(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: AppointmentArgs,
    ) -> Result<Value, CoziError> {
        run("create_appointment", async move {
            let appointment = args.into_appointment(None)?;
            let client = self.client(credentials).await?;
            flatten(client.create_appointment(&appointment).await?)
        })
        .await
    }

    pub async fn update_appointment(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: UpdateAppointmentArgs,
    ) -> Result<Value, CoziError> {
        run("update_appointment", async move {
            let appointment = args.into_appointment()?;
            let client = self.client(credentials).await?;
            flatten(client.update_appointment(&appointment).await?)
        })
        .await
    }

    pub async fn delete_appointment(
        &self,
        credentials: Result<Credentials, CoziError>,
        args: DeleteAppointmentArgs,
    ) -> Result<Value, CoziError> {
        run("delete_appointment", async move {
            let (appointment_id, month) = args.validate()?;
            let client = self.client(credentials).await?;
            flatten(client.delete_appointment(&appointment_id, month).await?)
        })
        .await
    }
}

fn flatten<T: Serialize>(value: T) -> Result<Value, CoziError> {
    serde_json::to_value(value).map_err(CoziError::from)
}

/// Run one operation, logging its outcome by error kind.
async fn run<F>(operation: &'static str, call: F) -> Result<Value, CoziError>
where
    F: Future<Output = Result<Value, CoziError>>,
{
    debug!("Tool call requested: {}", operation);
    let result = call.await;
    match &result {
        Ok(_) => debug!("Tool {} executed successfully", operation),
        Err(e) => match e.kind() {
            ErrorKind::Validation | ErrorKind::Authentication => {
                warn!("Tool {} rejected ({}): {}", operation, e.kind(), e)
            }
            ErrorKind::Remote => error!("Cozi API error in {}: {}", operation, e),
            ErrorKind::Unexpected => error!("Unexpected error in {}: {:?}", operation, e),
        },
    }
    result
}
