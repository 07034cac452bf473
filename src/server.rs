//! MCP server exposing the Cozi tool catalog.
//!
//! The same catalog is served in two profiles: a standalone process with
//! credentials from the environment, and a hosted per-session server whose
//! credentials arrive in the query string of the MCP endpoint.

use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    service::RequestContext,
    tool, tool_handler, tool_router, ErrorData as McpError, RoleServer, ServerHandler,
};
use serde_json::{json, Value};

use crate::args::{
    AddItemArgs, AppointmentArgs, CalendarArgs, CreateListArgs, DeleteAppointmentArgs,
    ListIdArgs, ListTypeArgs, MarkItemArgs, RemoveItemsArgs, UpdateAppointmentArgs,
    UpdateItemTextArgs, UpdateListArgs,
};
use crate::client::{CoziError, ErrorKind};
use crate::config::{CredentialSource, Credentials, SessionConfig, PASSWORD_VAR, USERNAME_VAR};
use crate::handle::ClientFactory;
use crate::tools::CoziTools;

const INSTRUCTIONS: &str = "Tools for the Cozi family organizer: read family members, \
manage shopping and to-do lists and their items, and manage calendar appointments. \
Dates use YYYY-MM-DD and times use HH:MM (24 hour).";

#[derive(Clone)]
pub struct CoziServer {
    tools: Arc<CoziTools>,
    source: CredentialSource,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CoziServer {
    /// Server for a single account, connected on the first tool call.
    ///
    /// Missing credentials do not prevent start-up; every call then fails
    /// with an authentication error.
    pub fn standalone(factory: Arc<dyn ClientFactory>, credentials: Option<Credentials>) -> Self {
        Self::with_source(factory, CredentialSource::Environment(credentials))
    }

    /// Server for one hosted session, reading credentials per request.
    pub fn session(factory: Arc<dyn ClientFactory>) -> Self {
        Self::with_source(factory, CredentialSource::Session)
    }

    fn with_source(factory: Arc<dyn ClientFactory>, source: CredentialSource) -> Self {
        Self {
            tools: Arc::new(CoziTools::new(factory)),
            source,
            tool_router: Self::tool_router(),
        }
    }

    pub fn tools(&self) -> &CoziTools {
        &self.tools
    }

    fn credentials(&self, context: &RequestContext<RoleServer>) -> Result<Credentials, CoziError> {
        match &self.source {
            CredentialSource::Environment(Some(credentials)) => Ok(credentials.clone()),
            CredentialSource::Environment(None) => Err(CoziError::Authentication(format!(
                "{USERNAME_VAR} and {PASSWORD_VAR} environment variables must be set"
            ))),
            CredentialSource::Session => {
                session_credentials(context.extensions.get::<http::request::Parts>())
            }
        }
    }

    #[tool(description = "Get all family members in the Cozi account")]
    async fn get_family_members(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond(
            "get_family_members",
            self.tools.get_family_members(credentials).await,
        )
    }

    #[tool(description = "Get all lists (shopping and todo) from Cozi")]
    async fn get_lists(
        &self,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("get_lists", self.tools.get_lists(credentials).await)
    }

    #[tool(description = "Get lists filtered by type ('shopping' or 'todo')")]
    async fn get_lists_by_type(
        &self,
        Parameters(args): Parameters<ListTypeArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond(
            "get_lists_by_type",
            self.tools.get_lists_by_type(credentials, args).await,
        )
    }

    #[tool(description = "Create a new shopping or todo list")]
    async fn create_list(
        &self,
        Parameters(args): Parameters<CreateListArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("create_list", self.tools.create_list(credentials, args).await)
    }

    #[tool(description = "Delete a list by its ID")]
    async fn delete_list(
        &self,
        Parameters(args): Parameters<ListIdArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("delete_list", self.tools.delete_list(credentials, args).await)
    }

    #[tool(description = "Replace a list's title and items (e.g. to reorder items)")]
    async fn update_list(
        &self,
        Parameters(args): Parameters<UpdateListArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("update_list", self.tools.update_list(credentials, args).await)
    }

    #[tool(description = "Add an item to a list, optionally at a given position")]
    async fn add_item(
        &self,
        Parameters(args): Parameters<AddItemArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("add_item", self.tools.add_item(credentials, args).await)
    }

    #[tool(description = "Change the text of an existing list item")]
    async fn update_item_text(
        &self,
        Parameters(args): Parameters<UpdateItemTextArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond(
            "update_item_text",
            self.tools.update_item_text(credentials, args).await,
        )
    }

    #[tool(description = "Mark a list item as 'complete' or 'incomplete'")]
    async fn mark_item(
        &self,
        Parameters(args): Parameters<MarkItemArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("mark_item", self.tools.mark_item(credentials, args).await)
    }

    #[tool(description = "Remove one or more items from a list")]
    async fn remove_items(
        &self,
        Parameters(args): Parameters<RemoveItemsArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("remove_items", self.tools.remove_items(credentials, args).await)
    }

    #[tool(description = "Get the calendar appointments for a month")]
    async fn get_calendar(
        &self,
        Parameters(args): Parameters<CalendarArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond("get_calendar", self.tools.get_calendar(credentials, args).await)
    }

    #[tool(
        description = "Create a calendar appointment. Dates are YYYY-MM-DD, times HH:MM; omit times or set all_day for an all-day event"
    )]
    async fn create_appointment(
        &self,
        Parameters(args): Parameters<AppointmentArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond(
            "create_appointment",
            self.tools.create_appointment(credentials, args).await,
        )
    }

    #[tool(description = "Replace an existing calendar appointment")]
    async fn update_appointment(
        &self,
        Parameters(args): Parameters<UpdateAppointmentArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond(
            "update_appointment",
            self.tools.update_appointment(credentials, args).await,
        )
    }

    #[tool(description = "Delete a calendar appointment by its ID")]
    async fn delete_appointment(
        &self,
        Parameters(args): Parameters<DeleteAppointmentArgs>,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let credentials = self.credentials(&context);
        respond(
            "delete_appointment",
            self.tools.delete_appointment(credentials, args).await,
        )
    }
}

#[tool_handler]
impl ServerHandler for CoziServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(INSTRUCTIONS.to_string()),
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for CoziServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoziServer")
            .field("tools", &self.tools)
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve session credentials from the HTTP request that carried the call.
pub fn session_credentials(parts: Option<&http::request::Parts>) -> Result<Credentials, CoziError> {
    let parts = parts.ok_or_else(|| {
        CoziError::Authentication("no session configuration on this request".to_string())
    })?;
    SessionConfig::from_query(parts.uri.query().unwrap_or_default())?.credentials()
}

/// Map a failed tool call onto an MCP error, tagged with kind and operation.
pub fn to_mcp_error(operation: &str, error: CoziError) -> McpError {
    let kind = error.kind();
    let data = Some(json!({ "kind": kind.as_str(), "operation": operation }));
    match kind {
        ErrorKind::Validation => McpError::invalid_params(error.to_string(), data),
        _ => McpError::internal_error(error.to_string(), data),
    }
}

fn respond(operation: &str, result: Result<Value, CoziError>) -> Result<CallToolResult, McpError> {
    let value = result.map_err(|e| to_mcp_error(operation, e))?;
    Ok(CallToolResult::success(vec![Content::json(value)?]))
}
