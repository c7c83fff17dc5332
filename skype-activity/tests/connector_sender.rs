use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use skype_activity::{ActivityError, BotConnectorSender, SkypeApiClient};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
struct CapturedRequest {
    conversation_id: String,
    activity_id: Option<String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct ConnectorState {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl ConnectorState {
    fn record(
        &self,
        conversation_id: String,
        activity_id: Option<String>,
        headers: &HeaderMap,
        body: Value,
    ) -> Response {
        if conversation_id == "blocked" {
            return (StatusCode::FORBIDDEN, "denied").into_response();
        }
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let mut requests = self.requests.lock().expect("state lock");
        requests.push(CapturedRequest {
            conversation_id,
            activity_id,
            authorization,
            body,
        });
        Json(json!({ "id": format!("act-{}", requests.len()) })).into_response()
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("state lock").clone()
    }
}

async fn post_activity(
    State(state): State<ConnectorState>,
    Path(conversation_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(conversation_id, None, &headers, body)
}

async fn reply_to_activity(
    State(state): State<ConnectorState>,
    Path((conversation_id, activity_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record(conversation_id, Some(activity_id), &headers, body)
}

async fn spawn_connector(state: ConnectorState) -> String {
    let app = Router::new()
        .route(
            "/apis/v3/conversations/{conversation_id}/activities",
            post(post_activity),
        )
        .route(
            "/apis/v3/conversations/{conversation_id}/activities/{activity_id}",
            post(reply_to_activity),
        )
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local connector");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve connector");
    });
    format!("http://{addr}/apis/")
}

fn webhook_payload(service_url: &str, conversation_id: &str, message_id: &str) -> String {
    json!({
        "type": "message",
        "id": message_id,
        "serviceUrl": service_url,
        "conversation": { "id": conversation_id, "name": "Support" },
        "recipient": { "id": "28:bot", "name": "HelpBot" },
        "from": { "id": "29:user", "name": "Ada" },
        "text": "hi bot"
    })
    .to_string()
}

fn sender() -> Arc<BotConnectorSender> {
    Arc::new(
        BotConnectorSender::new(Duration::from_secs(5))
            .expect("http client")
            .with_auth_token(Some("  test-token ".to_string())),
    )
}

#[tokio::test]
async fn reply_posts_typing_then_message_to_reply_endpoint() {
    let state = ConnectorState::default();
    let service_url = spawn_connector(state.clone()).await;
    let client = SkypeApiClient::from_request(&webhook_payload(&service_url, "c1", "m5"), sender());

    let receipt = client
        .send_text_message("hello from the bot")
        .await
        .expect("send should succeed");
    assert_eq!(receipt.id.as_deref(), Some("act-2"));

    let requests = state.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.conversation_id, "c1");
        assert_eq!(request.activity_id.as_deref(), Some("m5"));
        assert_eq!(request.authorization.as_deref(), Some("Bearer test-token"));
    }
    assert_eq!(requests[0].body["type"], "typing");
    assert_eq!(
        requests[1].body,
        json!({
            "type": "message",
            "from": { "id": "28:bot", "name": "HelpBot" },
            "conversation": { "id": "c1", "name": "Support" },
            "recipient": { "id": "29:user", "name": "Ada" },
            "replyToId": "m5",
            "text": "hello from the bot"
        })
    );
}

#[tokio::test]
async fn relayed_context_without_reply_id_posts_to_conversation() {
    let state = ConnectorState::default();
    let service_url = spawn_connector(state.clone()).await;
    let mut client = SkypeApiClient::from_request("", sender());
    client.populate_from_external_event(&json!({
        "conversation": { "id": "c2" },
        "from": { "id": "28:bot", "name": "HelpBot" },
        "recipient": { "id": "29:user", "name": "Ada" },
        "serviceUrl": service_url
    }));

    client
        .show_bot_typing(true)
        .await
        .expect("typing should send");

    let requests = state.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].conversation_id, "c2");
    assert_eq!(requests[0].activity_id, None);
    assert_eq!(requests[0].body["replyToId"], "");
}

#[tokio::test]
async fn non_success_status_is_reported_as_rejection() {
    let state = ConnectorState::default();
    let service_url = spawn_connector(state.clone()).await;
    let client =
        SkypeApiClient::from_request(&webhook_payload(&service_url, "blocked", "m1"), sender());

    let error = client
        .show_bot_typing(true)
        .await
        .expect_err("connector should reject");
    match error {
        ActivityError::SendRejected { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "denied");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(state.requests().is_empty());
}
