//! JSON-RPC over HTTP binding for the remote store.

use super::{Message, RemoteActor, RemoteError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

pub struct HttpActor {
    http_client: reqwest::Client,
    endpoint: String,
    request_id: AtomicU64,
}

impl HttpActor {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            endpoint: endpoint.into(),
            request_id: AtomicU64::new(1),
        }
    }

    async fn send<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<JsonRpcResponse<R>, RemoteError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };
        trace!(method, id, "sending rpc request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| RemoteError::Transport(format!("failed to send {method}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Transport(format!(
                "{method} returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|err| RemoteError::Transport(format!("failed to parse {method} response: {err}")))
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, RemoteError> {
        let body = self.send(method, params).await?;
        into_result(method, body)
    }

    async fn call_unit(&self, method: &str, params: Value) -> Result<(), RemoteError> {
        let body: JsonRpcResponse<Value> = self.send(method, params).await?;
        into_unit(method, body)
    }
}

fn rejection(method: &str, error: JsonRpcError) -> RemoteError {
    debug!(method, code = error.code, "remote rejected rpc call");
    RemoteError::Rejected(error.message)
}

fn into_result<R>(method: &str, body: JsonRpcResponse<R>) -> Result<R, RemoteError> {
    if let Some(error) = body.error {
        return Err(rejection(method, error));
    }

    body.result
        .ok_or_else(|| RemoteError::Transport(format!("{method} response missing result")))
}

// Unit methods answer with `"result": null`, which serde reads as `None`.
fn into_unit(method: &str, body: JsonRpcResponse<Value>) -> Result<(), RemoteError> {
    match body.error {
        Some(error) => Err(rejection(method, error)),
        None => Ok(()),
    }
}

#[async_trait]
impl RemoteActor for HttpActor {
    async fn add_message(&self, password: &str, content: &str) -> Result<Message, RemoteError> {
        self.call("addMessage", json!([password, content])).await
    }

    async fn clear_chat(&self, password: &str) -> Result<(), RemoteError> {
        self.call_unit("clearChat", json!([password])).await
    }

    async fn get_messages(
        &self,
        password: &str,
        since_message_id: Option<u64>,
    ) -> Result<Vec<Message>, RemoteError> {
        self.call("getMessages", json!([password, since_message_id]))
            .await
    }

    async fn set_password(&self, old_password: &str, new_password: &str) -> Result<(), RemoteError> {
        self.call_unit("setPassword", json!([old_password, new_password]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{into_result, into_unit, HttpActor, JsonRpcResponse};
    use crate::remote::{Message, RemoteActor, RemoteError};
    use serde_json::Value;
    use std::time::Duration;

    #[test]
    fn error_object_maps_to_rejected() {
        let body: JsonRpcResponse<Vec<Message>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"Invalid password"}}"#,
        )
        .expect("fixture should parse");

        match into_result("getMessages", body) {
            Err(RemoteError::Rejected(message)) => assert_eq!(message, "Invalid password"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn result_is_returned() {
        let body: JsonRpcResponse<Vec<Message>> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"result":[{"messageId":0,"content":"hi","timestamp":5}]}"#,
        )
        .expect("fixture should parse");

        let messages = into_result("getMessages", body).expect("result should be returned");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
    }

    #[test]
    fn null_result_for_unit_methods_is_accepted() {
        let body: JsonRpcResponse<Value> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":3,"result":null}"#)
                .expect("fixture should parse");
        into_unit("clearChat", body).expect("null result should be success");
    }

    #[test]
    fn unit_method_error_is_rejected() {
        let body: JsonRpcResponse<Value> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32000,"message":"Invalid password"}}"#,
        )
        .expect("fixture should parse");
        assert!(matches!(
            into_unit("setPassword", body),
            Err(RemoteError::Rejected(_))
        ));
    }

    #[test]
    fn missing_result_for_value_methods_is_transport_error() {
        let body: JsonRpcResponse<Vec<Message>> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":5}"#).expect("fixture should parse");
        assert!(matches!(
            into_result("getMessages", body),
            Err(RemoteError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let actor = HttpActor::new("http://127.0.0.1:9/rpc", Duration::from_millis(500));
        let err = actor
            .get_messages("icp", None)
            .await
            .expect_err("nothing listens on the discard port");
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
