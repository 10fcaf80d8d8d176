//! MCP (JSON-RPC 2.0) adapter over an [`AdvisorySource`].
//!
//! Exposes three tools: `list_advisories`, `get_advisory` and
//! `search_advisories`. Messages are handled one line at a time on stdio,
//! and the same handler serves `POST /mcp` in the REST server.
//!
//! Lookups that find nothing, invalid tool arguments and unsupported
//! operations are tool results with `isError: true`, not protocol errors.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::model::{ListParams, SearchParams};
use crate::source::AdvisorySource;

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

const FALLBACK_RESPONSE: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

type RpcResult = std::result::Result<Value, JsonRpcError>;

pub struct McpServer {
    source: Arc<dyn AdvisorySource>,
}

impl McpServer {
    pub fn new(source: Arc<dyn AdvisorySource>) -> Self {
        Self { source }
    }

    /// Serves JSON-RPC over stdin/stdout until stdin closes.
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        info!("MCP server started on stdio (source: {})", self.source.kind());

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(reply) = self.handle_message(line).await {
                stdout.write_all(reply.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        info!("MCP server stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw JSON-RPC message. Returns the serialized response,
    /// or `None` for notifications.
    pub async fn handle_message(&self, raw: &str) -> Option<String> {
        let value = match serde_json::from_str::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Rejecting malformed JSON-RPC message: {}", e);
                return Some(error_response(
                    None,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        // Derived structs also accept arrays positionally; batches are unsupported.
        if !value.is_object() {
            warn!("Rejecting JSON-RPC message that is not an object");
            return Some(error_response(
                None,
                JsonRpcError::new(INVALID_REQUEST, "Invalid Request: expected an object"),
            ));
        }

        let id = value.get("id").cloned();
        let response = match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await?,
            Err(e) => {
                warn!("Rejecting invalid JSON-RPC request: {}", e);
                return Some(error_response(
                    id,
                    JsonRpcError::new(INVALID_REQUEST, format!("Invalid Request: {}", e)),
                ));
            }
        };

        Some(serde_json::to_string(&response).unwrap_or_else(|_| FALLBACK_RESPONSE.to_string()))
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.method.starts_with("notifications/") {
            debug!("Received notification {}", request.method);
            return None;
        }

        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(list_tools()),
            "tools/call" => self.call_tool(request.params.as_ref()).await,
            other => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };

        let (result, error) = match result {
            Ok(value) => (Some(value), None),
            Err(error) => (None, Some(error)),
        };

        Some(JsonRpcResponse {
            jsonrpc: "2.0",
            id: request.id,
            result,
            error,
        })
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "advisory-index",
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, params: Option<&Value>) -> RpcResult {
        let params = params.ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing params"))?;

        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| JsonRpcError::new(INVALID_PARAMS, "Missing tool name"))?;

        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        debug!("tools/call {} {}", name, arguments);

        match name {
            "list_advisories" => self.tool_list(arguments).await,
            "get_advisory" => self.tool_get(&arguments).await,
            "search_advisories" => self.tool_search(arguments).await,
            _ => Err(JsonRpcError::new(
                INVALID_PARAMS,
                format!("Unknown tool: {}", name),
            )),
        }
    }

    async fn tool_list(&self, arguments: Value) -> RpcResult {
        let params: ListParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => return Ok(error_text(format!("Invalid arguments: {}", e))),
        };
        let options = match params.validate() {
            Ok(o) => o,
            Err(e) => return Ok(error_text(e.to_string())),
        };

        match self.source.list_advisories(&options).await {
            Ok(advisories) => json_text(&advisories),
            Err(e) => Ok(source_error_text(e)),
        }
    }

    async fn tool_get(&self, arguments: &Value) -> RpcResult {
        let ghsa_id = match arguments
            .get("ghsa_id")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(id) => id,
            None => return Ok(error_text("Missing 'ghsa_id' argument")),
        };

        match self.source.get_advisory(ghsa_id).await {
            Ok(Some(advisory)) => json_text(&advisory),
            Ok(None) => Ok(error_text(format!("Advisory {} not found", ghsa_id))),
            Err(e) => Ok(source_error_text(e)),
        }
    }

    async fn tool_search(&self, arguments: Value) -> RpcResult {
        if !self.source.supports_search() {
            return Ok(source_error_text(SourceError::Unsupported(
                self.source.kind(),
                "search",
            )));
        }

        let params: SearchParams = match serde_json::from_value(arguments) {
            Ok(p) => p,
            Err(e) => return Ok(error_text(format!("Invalid arguments: {}", e))),
        };
        let (query, options) = match params.validate() {
            Ok(v) => v,
            Err(e) => return Ok(error_text(e.to_string())),
        };

        match self.source.search_advisories(&query, &options).await {
            Ok(advisories) => json_text(&advisories),
            Err(e) => Ok(source_error_text(e)),
        }
    }
}

fn list_tools() -> Value {
    let tools = vec![
        Tool {
            name: "list_advisories",
            description: "List reviewed security advisories with optional filters, sorting and pagination",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ghsa_id": { "type": "string", "description": "Exact GHSA identifier" },
                    "cve_id": { "type": "string", "description": "Exact CVE identifier" },
                    "ecosystem": {
                        "type": "string",
                        "description": "Package ecosystem (npm, pip, maven, rust, go, ...)"
                    },
                    "severity": {
                        "type": "string",
                        "enum": ["low", "medium", "high", "critical", "unknown"]
                    },
                    "cwes": { "type": "string", "description": "Comma-separated CWE ids, e.g. CWE-79,CWE-89" },
                    "is_withdrawn": { "type": "boolean" },
                    "affects": { "type": "string", "description": "Substring of an affected package name" },
                    "published": { "type": "string", "description": "YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD" },
                    "updated": { "type": "string", "description": "YYYY-MM-DD or YYYY-MM-DD..YYYY-MM-DD" },
                    "sort": { "type": "string", "enum": ["published", "updated"] },
                    "direction": { "type": "string", "enum": ["asc", "desc"] },
                    "per_page": { "type": "integer", "minimum": 1, "maximum": 100 },
                    "page": { "type": "integer", "minimum": 1 }
                }
            }),
        },
        Tool {
            name: "get_advisory",
            description: "Get a single advisory by its GHSA identifier",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "ghsa_id": { "type": "string", "description": "GHSA identifier, e.g. GHSA-xxxx-xxxx-xxxx" }
                },
                "required": ["ghsa_id"]
            }),
        },
        Tool {
            name: "search_advisories",
            description: "Case-insensitive text search over advisory id, CVE, summary and description",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Text to search for" },
                    "ecosystem": { "type": "string" },
                    "severity": { "type": "string" },
                    "per_page": { "type": "integer", "minimum": 1, "maximum": 100 }
                },
                "required": ["query"]
            }),
        },
    ];

    json!({ "tools": tools })
}

fn error_response(id: Option<Value>, error: JsonRpcError) -> String {
    let response = JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(error),
    };
    serde_json::to_string(&response).unwrap_or_else(|_| FALLBACK_RESPONSE.to_string())
}

fn text_content(text: String, is_error: bool) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": text
        }],
        "isError": is_error
    })
}

fn error_text(message: impl Into<String>) -> Value {
    text_content(message.into(), true)
}

fn json_text<T: Serialize + ?Sized>(value: &T) -> RpcResult {
    serde_json::to_string_pretty(value)
        .map(|text| text_content(text, false))
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Serialization failed: {}", e)))
}

fn source_error_text(error: SourceError) -> Value {
    if !error.is_unsupported() && !error.is_client_error() {
        warn!("Advisory source failed: {}", error);
    }
    error_text(error.to_string())
}
