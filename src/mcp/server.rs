//! MCP server implementation.

use super::protocol::*;
use super::tools::{default_registry, ToolRegistry};
use crate::config::Settings;
use crate::library::Library;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "finn";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Finn.
pub struct McpServer {
    settings: Settings,
    library: Option<Library>,
    registry: ToolRegistry,
}

impl McpServer {
    /// Create a new MCP server. The library is opened on `initialize`.
    pub fn new(settings: Settings) -> crate::error::Result<Self> {
        Ok(Self {
            settings,
            library: None,
            registry: default_registry()?,
        })
    }

    /// Create a server over an already opened library.
    pub fn with_library(settings: Settings, library: Library) -> crate::error::Result<Self> {
        let mut server = Self::new(settings)?;
        server.library = Some(library);
        Ok(server)
    }

    /// Run the MCP server (reads from stdin, writes to stdout).
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        // Logging goes to stderr so it doesn't interfere with JSON-RPC
        info!("Finn MCP server starting");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    warn!("Failed to parse request: {}", e);
                    Some(JsonRpcResponse::error(None, PARSE_ERROR, "Parse error"))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        info!("stdin closed, MCP server exiting");
        Ok(())
    }

    /// Handle a single JSON-RPC message. Notifications get no response.
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Unsupported JSON-RPC version",
            ));
        }

        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }
        let id = request.id;

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id).await,
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
            ),
        };

        Some(response)
    }

    /// Handle initialize request.
    async fn handle_initialize(&mut self, id: Option<Value>) -> JsonRpcResponse {
        if self.library.is_none() {
            match Library::open(&self.settings).await {
                Ok(library) => {
                    info!("Library opened");
                    self.library = Some(library);
                }
                Err(e) => {
                    warn!("Failed to open library: {}", e);
                    return JsonRpcResponse::error(id, SERVER_ERROR, &format!("Init failed: {}", e));
                }
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        to_response(id, &result)
    }

    /// Handle tools/list request.
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: self.registry.definitions(),
        };
        to_response(id, &result)
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        &format!("Invalid params: {}", e),
                    )
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let Some(library) = &self.library else {
            return to_response(id, &ToolCallResult::error("Server not initialized".to_string()));
        };

        let result = self
            .registry
            .call(library, &params.name, params.arguments.unwrap_or(Value::Null))
            .await;

        to_response(id, &result)
    }
}

fn to_response<T: serde::Serialize>(id: Option<Value>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, SERVER_ERROR, &format!("Serialization failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryVideoStore, Video, VideoStore};
    use std::sync::Arc;

    async fn server() -> McpServer {
        let store: Arc<dyn VideoStore> = Arc::new(MemoryVideoStore::new());
        store
            .upsert(&Video::new(
                "aaaaaaaaaaa",
                "Mixture of experts",
                "UCml",
                "2024-04-01",
                "Sparse routing across expert layers.",
            ))
            .await
            .unwrap();
        let settings = Settings::default();
        let library = Library::with_store(&settings, store, None).await.unwrap();
        McpServer::with_library(settings, library).unwrap()
    }

    fn request(value: Value) -> JsonRpcRequest {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let mut server = server().await;

        let init = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 1, "method": "initialize"})))
            .await
            .unwrap();
        let init = serde_json::to_value(init).unwrap();
        assert_eq!(init["result"]["serverInfo"]["name"], "finn");

        let tools = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})))
            .await
            .unwrap();
        let tools = serde_json::to_value(tools).unwrap();
        assert_eq!(tools["result"]["tools"].as_array().unwrap().len(), 3);
        assert!(tools["result"]["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let mut server = server().await;
        let response = server
            .handle_request(request(
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            ))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tool_call() {
        let mut server = server().await;
        let response = server
            .handle_request(request(json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "search", "arguments": {"query": "experts"}}
            })))
            .await
            .unwrap();

        let value = serde_json::to_value(response).unwrap();
        let text = value["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Mixture of experts"));
    }

    #[tokio::test]
    async fn test_errors() {
        let mut server = server().await;

        let unknown = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 4, "method": "resources/list"})))
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, METHOD_NOT_FOUND);

        let missing = server
            .handle_request(request(json!({"jsonrpc": "2.0", "id": 5, "method": "tools/call"})))
            .await
            .unwrap();
        assert_eq!(missing.error.unwrap().code, INVALID_PARAMS);

        let version = server
            .handle_request(request(json!({"jsonrpc": "1.0", "id": 6, "method": "ping"})))
            .await
            .unwrap();
        assert_eq!(version.error.unwrap().code, INVALID_REQUEST);
    }
}
