//! Line-delimited JSON-RPC server over an async reader/writer pair.
//!
//! Requests are answered one at a time, in arrival order, one response
//! line each. The server returns once the reader hits EOF.

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use lumos_core::HubService;

use crate::protocol::{
    CallParams, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, Request, Response, SERVER_NAME,
};
use crate::tools;

pub struct Server {
    service: HubService,
}

impl Server {
    pub fn new(service: HubService) -> Self {
        Self { service }
    }

    /// Serve until `reader` reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut handled = 0_u64;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match parse_line(line) {
                Ok(request) if request.is_notification() => {
                    debug!(method = %request.method, "notification received");
                    continue;
                }
                Ok(request) => dispatch(&self.service, request).await,
                Err(response) => *response,
            };

            write_response(&mut writer, &response).await?;
            handled += 1;
        }

        info!(handled, "input closed");
        writer.flush().await
    }
}

async fn write_response<W>(writer: &mut W, response: &Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}

/// Decode one input line, or produce the error response for it.
fn parse_line(line: &str) -> Result<Request, Box<Response>> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!(error = %e, "unparsable request line");
        Box::new(Response::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = serde_json::from_value(value).map_err(|e| {
        Box::new(Response::failure(
            id.clone(),
            INVALID_REQUEST,
            format!("Invalid request: {e}"),
        ))
    })?;

    if request.jsonrpc.as_deref().is_some_and(|v| v != JSONRPC_VERSION) {
        return Err(Box::new(Response::failure(
            id,
            INVALID_REQUEST,
            "Invalid request: jsonrpc must be \"2.0\"",
        )));
    }
    Ok(request)
}

async fn dispatch(service: &HubService, request: Request) -> Response {
    let id = request.id.unwrap_or(Value::Null);
    debug!(method = %request.method, "request received");

    match request.method.as_str() {
        "initialize" => Response::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ),
        "ping" => Response::success(id, json!({})),
        "tools/list" => Response::success(id, tools::list()),
        "tools/call" => call_tool(service, id, request.params).await,
        other => {
            warn!(method = other, "unknown method");
            Response::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
        }
    }
}

async fn call_tool(service: &HubService, id: Value, params: Option<Value>) -> Response {
    let params: CallParams = match params.map(serde_json::from_value).transpose() {
        Ok(Some(params)) => params,
        Ok(None) => return Response::failure(id, INVALID_PARAMS, "Missing tools/call params"),
        Err(e) => return Response::failure(id, INVALID_PARAMS, format!("Invalid params: {e}")),
    };

    let Some(result) = tools::call(service, &params.name, &params.arguments).await else {
        return Response::failure(
            id,
            INVALID_PARAMS,
            format!("Tool not found: {}", params.name),
        );
    };

    match serde_json::to_value(&result) {
        Ok(value) => Response::success(id, value),
        Err(e) => Response::failure(id, INTERNAL_ERROR, e.to_string()),
    }
}
