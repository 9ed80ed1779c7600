// Hub WebSocket request/response exchange
//
// One short-lived connection per request: connect, authenticate with the
// bearer token, send a single typed command, read the single reply frame, close.
// Registry listings are only reachable reliably through this surface.

use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::client::{HubClient, elapsed_ms};
use crate::error::Error;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

impl HubClient {
    /// Run one socket command and return its `result` payload.
    ///
    /// `payload` fields are merged into the command frame
    /// next to `id` and `type`. The whole exchange (connect, auth, command,
    /// reply) shares the transport timeout. The connection is closed on
    /// every path.
    pub async fn socket_request(
        &self,
        request_type: &str,
        payload: Option<Map<String, Value>>,
    ) -> Result<Value, Error> {
        let started = Instant::now();
        let deadline = self.transport().timeout;

        let outcome =
            tokio::time::timeout(deadline, self.socket_exchange(request_type, payload)).await;
        let elapsed_ms = elapsed_ms(started);

        match outcome {
            Ok(Ok(result)) => {
                debug!(request_type, elapsed_ms, "socket request complete");
                Ok(result)
            }
            Ok(Err(e)) => {
                warn!(request_type, elapsed_ms, error = %e, "socket request failed");
                Err(e)
            }
            Err(_) => {
                warn!(request_type, elapsed_ms, "socket request timed out");
                Err(Error::Timeout {
                    timeout_secs: self.transport().timeout_secs(),
                })
            }
        }
    }

    /// [`socket_request`](Self::socket_request) decoded into a list.
    pub async fn socket_list<T: DeserializeOwned>(
        &self,
        request_type: &str,
    ) -> Result<Vec<T>, Error> {
        let result = self.socket_request(request_type, None).await?;
        serde_json::from_value(result.clone())
            .map_err(|e| Error::decode(&e, result.to_string().as_bytes()))
    }

    async fn socket_exchange(
        &self,
        request_type: &str,
        payload: Option<Map<String, Value>>,
    ) -> Result<Value, Error> {
        let url = self.websocket_url();
        trace!(url = %url, "connecting to hub socket");

        let (mut socket, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        let result = self
            .authenticate_and_request(&mut socket, request_type, payload)
            .await;

        if let Err(e) = socket.close(None).await {
            trace!(error = %e, "socket close failed");
        }
        result
    }

    async fn authenticate_and_request(
        &self,
        socket: &mut Socket,
        request_type: &str,
        payload: Option<Map<String, Value>>,
    ) -> Result<Value, Error> {
        // ── Handshake ────────────────────────────────────────────────
        let greeting = next_json(socket).await?;
        if frame_type(&greeting) != "auth_required" {
            return Err(Error::Protocol {
                message: format!(
                    "expected auth_required, got {:?}",
                    frame_type(&greeting)
                ),
            });
        }

        let auth = json!({
            "type": "auth",
            "access_token": self.token().expose_secret(),
        });
        send_json(socket, &auth).await?;

        let reply = next_json(socket).await.map_err(|e| Error::Authentication {
            message: format!("no reply to auth: {e}"),
        })?;
        if frame_type(&reply) != "auth_ok" {
            let reason = reply
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("token rejected");
            return Err(Error::Authentication {
                message: format!("{}: {reason}", frame_type(&reply)),
            });
        }

        // ── Command ──────────────────────────────────────────────────
        let id = self.next_message_id();
        let mut command = payload.unwrap_or_default();
        command.insert("id".into(), json!(id));
        command.insert("type".into(), json!(request_type));
        send_json(socket, &Value::Object(command)).await?;

        // Exactly one reply frame, and it must answer our id.
        let reply = next_json(socket).await?;
        if reply.get("id").and_then(Value::as_u64) != Some(id) {
            let got = reply.get("id").map_or_else(|| "none".to_owned(), Value::to_string);
            return Err(Error::Protocol {
                message: format!(
                    "{request_type}: reply id mismatch (sent {id}, got {got}, type {:?})",
                    frame_type(&reply)
                ),
            });
        }
        into_result(reply, request_type)
    }
}

/// Unwrap a `{"type":"result", "success":.., "result":..}` frame.
fn into_result(mut frame: Value, request_type: &str) -> Result<Value, Error> {
    if frame_type(&frame) != "result" {
        return Err(Error::Protocol {
            message: format!(
                "{request_type}: expected result frame, got {:?}",
                frame_type(&frame)
            ),
        });
    }
    if frame.get("success").and_then(Value::as_bool) != Some(true) {
        let reason = frame
            .pointer("/error/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(Error::Protocol {
            message: format!("{request_type} failed: {reason}"),
        });
    }
    frame
        .get_mut("result")
        .map(Value::take)
        .ok_or_else(|| Error::Protocol {
            message: format!("{request_type}: result frame without payload"),
        })
}

fn frame_type(frame: &Value) -> &str {
    frame.get("type").and_then(Value::as_str).unwrap_or("")
}

async fn send_json(socket: &mut Socket, frame: &Value) -> Result<(), Error> {
    socket
        .send(Message::text(frame.to_string()))
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))
}

/// Read frames until a JSON text (or binary) message arrives.
async fn next_json(socket: &mut Socket) -> Result<Value, Error> {
    loop {
        let payload = match socket.next().await {
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Binary(bytes))) => bytes.to_vec(),
            Some(Ok(Message::Close(frame))) => {
                let (code, reason) = frame.map_or((ABNORMAL_CLOSURE, String::new()), |cf| {
                    (u16::from(cf.code), cf.reason.to_string())
                });
                return Err(Error::WebSocketClosed { code, reason });
            }
            // Ping, Pong and raw frames carry nothing for us.
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
            None => {
                return Err(Error::WebSocketClosed {
                    code: ABNORMAL_CLOSURE,
                    reason: "stream ended".into(),
                });
            }
        };
        return serde_json::from_slice(&payload).map_err(|e| Error::decode(&e, &payload));
    }
}
