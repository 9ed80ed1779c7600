// Integration tests for the hub socket exchange against an in-process
// tungstenite server.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use lumos_api::{Area, Error, HubClient, TransportConfig};

// ── Scripted hub ────────────────────────────────────────────────────

/// How the fake hub answers after the greeting.
#[derive(Clone, Copy)]
enum Script {
    /// Accept the token, then answer the command with `result`.
    Reply,
    /// Reject the token.
    RejectAuth,
    /// Accept the token, then answer `success: false`.
    CommandFails,
    /// Accept the token, then go silent.
    Stall,
    /// Accept the token, then answer with an event frame for another id.
    WrongId,
}

/// Serve exactly one socket connection. Returns the socket URL and a
/// handle yielding the command frame the client sent (if any).
async fn fake_hub(script: Script, result: Value) -> (Url, JoinHandle<Option<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        ws.send(Message::text(
            json!({ "type": "auth_required", "ha_version": "2026.1.0" }).to_string(),
        ))
        .await
        .unwrap();

        let auth = read_json(&mut ws).await?;
        assert_eq!(auth["type"], "auth");
        assert_eq!(auth["access_token"], "socket-token");

        if matches!(script, Script::RejectAuth) {
            ws.send(Message::text(
                json!({ "type": "auth_invalid", "message": "Invalid access token" }).to_string(),
            ))
            .await
            .unwrap();
            return None;
        }
        ws.send(Message::text(json!({ "type": "auth_ok" }).to_string()))
            .await
            .unwrap();

        let command = read_json(&mut ws).await?;
        let id = command["id"].clone();

        match script {
            Script::Reply => {
                // Control frames carry no reply and are passed over.
                ws.send(Message::Ping(vec![1u8].into())).await.unwrap();
                ws.send(Message::text(
                    json!({ "id": id, "type": "result", "success": true, "result": result })
                        .to_string(),
                ))
                .await
                .unwrap();
            }
            Script::CommandFails => {
                ws.send(Message::text(
                    json!({
                        "id": id,
                        "type": "result",
                        "success": false,
                        "error": { "code": "unauthorized", "message": "Unauthorized" }
                    })
                    .to_string(),
                ))
                .await
                .unwrap();
            }
            Script::Stall => tokio::time::sleep(Duration::from_secs(5)).await,
            Script::WrongId => {
                ws.send(Message::text(json!({ "id": 999, "type": "event" }).to_string()))
                    .await
                    .unwrap();
            }
            Script::RejectAuth => unreachable!(),
        }

        // Drain until the client closes.
        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
        Some(command)
    });

    let url = Url::parse(&format!("ws://{addr}/api/websocket")).unwrap();
    (url, handle)
}

async fn read_json<S>(ws: &mut S) -> Option<Value>
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    while let Some(Ok(msg)) = ws.next().await {
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).ok();
        }
    }
    None
}

fn client(ws_url: Url, timeout: Duration) -> HubClient {
    HubClient::new(
        Url::parse("http://127.0.0.1:1").unwrap(),
        SecretString::from("socket-token".to_string()),
        &TransportConfig::with_timeout(timeout),
    )
    .unwrap()
    .with_websocket_url(ws_url)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_socket_request_returns_result_payload() {
    let (url, hub) = fake_hub(
        Script::Reply,
        json!([
            { "area_id": "kitchen", "name": "Kitchen", "picture": null, "aliases": [] },
            { "area_id": "office", "name": "Office" }
        ]),
    )
    .await;
    let client = client(url, Duration::from_secs(5));

    let areas: Vec<Area> = client
        .socket_list("config/area_registry/list")
        .await
        .unwrap();

    assert_eq!(areas, vec![Area::new("kitchen", "Kitchen"), Area::new("office", "Office")]);

    let command = hub.await.unwrap().unwrap();
    assert_eq!(command["type"], "config/area_registry/list");
    assert!(command["id"].as_u64().is_some());
}

#[tokio::test]
async fn test_socket_rejected_token_is_authentication_error() {
    let (url, _hub) = fake_hub(Script::RejectAuth, Value::Null).await;
    let client = client(url, Duration::from_secs(5));

    let err = client
        .socket_request("config/area_registry/list", None)
        .await
        .unwrap_err();
    match err {
        Error::Authentication { message } => assert!(message.contains("auth_invalid")),
        other => panic!("expected Authentication, got {other:?}"),
    }
}

#[tokio::test]
async fn test_socket_unsuccessful_command_is_protocol_error() {
    let (url, _hub) = fake_hub(Script::CommandFails, Value::Null).await;
    let client = client(url, Duration::from_secs(5));

    let err = client
        .socket_request("config/device_registry/list", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_socket_reply_for_other_id_is_protocol_error() {
    let (url, _hub) = fake_hub(Script::WrongId, Value::Null).await;
    let client = client(url, Duration::from_secs(5));

    let err = client
        .socket_request("config/area_registry/list", None)
        .await
        .unwrap_err();
    match err {
        Error::Protocol { message } => assert!(message.contains("got 999"), "{message}"),
        other => panic!("expected Protocol, got {other:?}"),
    }
}

#[tokio::test]
async fn test_socket_silence_hits_timeout() {
    let (url, _hub) = fake_hub(Script::Stall, Value::Null).await;
    let client = client(url, Duration::from_millis(300));

    let err = client
        .socket_request("config/entity_registry/list", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_socket_unreachable_is_connect_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let url = Url::parse(&format!("ws://127.0.0.1:{port}/api/websocket")).unwrap();
    let client = client(url, Duration::from_secs(2));

    let err = client
        .socket_request("config/area_registry/list", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WebSocketConnect(_)), "got {err:?}");
}
