use async_trait::async_trait;
use cozi_mcp::model::{Appointment, CoziList, FamilyMember, ItemStatus, ListItem, ListType};
use cozi_mcp::rmcp::model::{CallToolRequestParam, RawContent};
use cozi_mcp::rmcp::service::ServiceError;
use cozi_mcp::rmcp::ServiceExt;
use cozi_mcp::{ClientFactory, CoziApi, CoziError, CoziServer, Credentials};
use nonempty::NonEmpty;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Answers only the calls these tests make.
struct FixedCozi;

fn unsupported<T>() -> Result<T, CoziError> {
    Err(CoziError::UnexpectedResponse("not supported by mock".to_string()))
}

#[async_trait]
impl CoziApi for FixedCozi {
    async fn get_family_members(&self) -> Result<Vec<FamilyMember>, CoziError> {
        Ok(vec![FamilyMember {
            id: "p1".to_string(),
            name: "Alex".to_string(),
            email: None,
            phone: None,
            color: None,
            is_adult: Some(false),
        }])
    }

    async fn get_lists(&self) -> Result<Vec<CoziList>, CoziError> {
        Ok(vec![])
    }

    async fn get_lists_by_type(&self, _list_type: ListType) -> Result<Vec<CoziList>, CoziError> {
        Ok(vec![])
    }

    async fn create_list(&self, title: &str, list_type: ListType) -> Result<CoziList, CoziError> {
        Ok(CoziList {
            id: "l1".to_string(),
            title: title.to_string(),
            list_type,
            items: vec![],
            owner: None,
            version: None,
            notes: None,
        })
    }

    async fn delete_list(&self, _list_id: &str) -> Result<bool, CoziError> {
        Err(CoziError::Remote {
            status: 404,
            message: "List not found".to_string(),
        })
    }

    async fn update_list(&self, _list: &CoziList) -> Result<CoziList, CoziError> {
        unsupported()
    }

    async fn add_item(&self, _: &str, _: &str, _: u32) -> Result<ListItem, CoziError> {
        unsupported()
    }

    async fn update_item_text(&self, _: &str, _: &str, _: &str) -> Result<ListItem, CoziError> {
        unsupported()
    }

    async fn mark_item(&self, _: &str, _: &str, _: ItemStatus) -> Result<ListItem, CoziError> {
        unsupported()
    }

    async fn remove_items(&self, _: &str, _: &NonEmpty<String>) -> Result<bool, CoziError> {
        unsupported()
    }

    async fn get_calendar(&self, _: i32, _: u32) -> Result<Vec<Appointment>, CoziError> {
        Ok(vec![])
    }

    async fn create_appointment(&self, _: &Appointment) -> Result<Appointment, CoziError> {
        unsupported()
    }

    async fn update_appointment(&self, _: &Appointment) -> Result<Appointment, CoziError> {
        unsupported()
    }

    async fn delete_appointment(&self, _: &str, _: Option<(i32, u32)>) -> Result<bool, CoziError> {
        unsupported()
    }
}

#[derive(Default)]
struct Factory {
    connects: AtomicUsize,
}

#[async_trait]
impl ClientFactory for Factory {
    async fn connect(&self, _credentials: &Credentials) -> Result<Arc<dyn CoziApi>, CoziError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FixedCozi))
    }
}

async fn connect(
    server: CoziServer,
) -> cozi_mcp::rmcp::service::RunningService<cozi_mcp::rmcp::RoleClient, ()> {
    let (server_transport, client_transport) = tokio::io::duplex(4096);
    tokio::spawn(async move {
        let service = server.serve(server_transport).await.unwrap();
        service.waiting().await.unwrap();
    });
    ().serve(client_transport).await.unwrap()
}

fn standalone(factory: Arc<Factory>) -> CoziServer {
    let credentials = Credentials::new("sam@example.com", "secret").unwrap();
    CoziServer::standalone(factory, Some(credentials))
}

fn request(name: &str, arguments: Value) -> CallToolRequestParam {
    CallToolRequestParam {
        name: name.to_string().into(),
        arguments: arguments.as_object().cloned(),
    }
}

fn text_of(result: &cozi_mcp::rmcp::model::CallToolResult) -> Value {
    match &result.content[0].raw {
        RawContent::Text(t) => serde_json::from_str(&t.text).unwrap(),
        _ => panic!("Expected text content"),
    }
}

#[tokio::test]
async fn test_lists_the_full_catalog() {
    let client = connect(standalone(Arc::new(Factory::default()))).await;

    let tools = client.list_tools(None).await.unwrap();
    let mut names: Vec<String> = tools.tools.iter().map(|t| t.name.to_string()).collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "add_item",
            "create_appointment",
            "create_list",
            "delete_appointment",
            "delete_list",
            "get_calendar",
            "get_family_members",
            "get_lists",
            "get_lists_by_type",
            "mark_item",
            "remove_items",
            "update_appointment",
            "update_item_text",
            "update_list",
        ]
    );

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_call_tool_returns_json_text() {
    let factory = Arc::new(Factory::default());
    let client = connect(standalone(factory.clone())).await;

    let result = client
        .call_tool(request(
            "create_list",
            json!({ "title": "Groceries", "list_type": "shopping" }),
        ))
        .await
        .unwrap();

    let list = text_of(&result);
    assert_eq!(list["id"], "l1");
    assert_eq!(list["list_type"], "shopping");
    assert_eq!(factory.connects.load(Ordering::SeqCst), 1);

    let members = client
        .call_tool(request("get_family_members", json!({})))
        .await
        .unwrap();
    assert_eq!(text_of(&members)[0]["name"], "Alex");
    assert_eq!(factory.connects.load(Ordering::SeqCst), 1);

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_validation_error_is_invalid_params() {
    let factory = Arc::new(Factory::default());
    let client = connect(standalone(factory.clone())).await;

    let err = client
        .call_tool(request("get_calendar", json!({ "year": 2024, "month": 13 })))
        .await
        .unwrap_err();

    match err {
        ServiceError::McpError(e) => {
            assert!(e.message.contains("between 1 and 12"));
            assert_eq!(e.data.unwrap()["kind"], "validation");
        }
        other => panic!("Expected MCP error, got {other:?}"),
    }
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_remote_error_carries_operation() {
    let client = connect(standalone(Arc::new(Factory::default()))).await;

    let err = client
        .call_tool(request("delete_list", json!({ "list_id": "gone" })))
        .await
        .unwrap_err();

    match err {
        ServiceError::McpError(e) => {
            let data = e.data.unwrap();
            assert_eq!(data["kind"], "remote");
            assert_eq!(data["operation"], "delete_list");
        }
        other => panic!("Expected MCP error, got {other:?}"),
    }

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_missing_credentials_are_reported() {
    let factory = Arc::new(Factory::default());
    let client = connect(CoziServer::standalone(factory.clone(), None)).await;

    let err = client
        .call_tool(request("get_lists", json!({})))
        .await
        .unwrap_err();

    match err {
        ServiceError::McpError(e) => {
            assert!(e.message.contains("COZI_USERNAME"));
            assert_eq!(e.data.unwrap()["kind"], "authentication");
        }
        other => panic!("Expected MCP error, got {other:?}"),
    }
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_session_without_http_request_is_rejected() {
    let factory = Arc::new(Factory::default());
    let client = connect(CoziServer::session(factory.clone())).await;

    let err = client
        .call_tool(request("get_lists", json!({})))
        .await
        .unwrap_err();

    match err {
        ServiceError::McpError(e) => assert_eq!(e.data.unwrap()["kind"], "authentication"),
        other => panic!("Expected MCP error, got {other:?}"),
    }
    assert_eq!(factory.connects.load(Ordering::SeqCst), 0);

    client.cancel().await.unwrap();
}
