use ideabot::config::TelegramConfig;
use ideabot::domain::{ChatId, MessageRef, UserId};
use ideabot::nav::{Button, CallbackAction};
use ideabot::session::Trigger;
use ideabot::transport::{Markup, TelegramTransport, Transport, TransportError, UpdateSource};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "123:secret-token";

fn transport(server: &MockServer) -> TelegramTransport {
    let config = TelegramConfig {
        base_url: server.uri(),
        poll_timeout_secs: 0,
        request_timeout_ms: 2_000,
        ..TelegramConfig::default()
    };
    TelegramTransport::new(&config, TOKEN).expect("transport")
}

fn method_path(name: &str) -> String {
    format!("/bot{}/{}", TOKEN, name)
}

#[tokio::test]
async fn send_message_uses_html_and_inline_keyboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": 42,
            "text": "<b>Choose</b>",
            "parse_mode": "HTML",
            "reply_markup": { "inline_keyboard": [[{ "text": "Notes", "callback_data": "upd:p:7" }]] }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 77, "chat": { "id": 42, "type": "private" }, "date": 0 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let markup = Markup::Inline(vec![vec![Button::new("Notes", CallbackAction::Project(7))]]);
    let sent = transport(&server)
        .send_message(ChatId(42), "<b>Choose</b>", markup)
        .await
        .expect("sent");
    assert_eq!(sent, MessageRef::new(ChatId(42), 77));
}

#[tokio::test]
async fn edit_not_modified_is_not_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("editMessageText")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: message is not modified: specified new message content and reply markup are exactly the same"
        })))
        .mount(&server)
        .await;

    let err = transport(&server)
        .edit_message(&MessageRef::new(ChatId(42), 77), "same", Markup::None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::NotModified));
    assert!(!err.is_terminal());
}

#[tokio::test]
async fn forbidden_is_terminal_and_hides_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("sendChatAction")))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .mount(&server)
        .await;

    let err = transport(&server).send_typing(ChatId(42)).await.unwrap_err();
    assert!(err.is_terminal());
    assert!(!err.to_string().contains("secret-token"));
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("answerCallbackQuery")))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 7",
            "parameters": { "retry_after": 7 }
        })))
        .mount(&server)
        .await;

    let err = transport(&server)
        .answer_callback("cb", Some("Updated"), false)
        .await
        .unwrap_err();
    match err {
        TransportError::RateLimited { retry_after } => assert_eq!(retry_after.as_secs(), 7),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn get_updates_decodes_events_and_advances_offset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(method_path("getUpdates")))
        .and(body_partial_json(json!({ "offset": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                {
                    "update_id": 500,
                    "message": {
                        "message_id": 1,
                        "chat": { "id": 42 },
                        "from": { "id": 42 },
                        "text": "/start"
                    }
                },
                {
                    "update_id": 501,
                    "edited_message": { "message_id": 1, "chat": { "id": 42 } }
                },
                {
                    "update_id": 502,
                    "callback_query": {
                        "id": "cb-9",
                        "from": { "id": 42 },
                        "message": { "message_id": 5, "chat": { "id": 42 } },
                        "data": "upd:pg:1"
                    }
                }
            ]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(method_path("getUpdates")))
        .and(body_partial_json(json!({ "offset": 503 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let transport = transport(&server);
    let events = transport.next_events().await.expect("first poll");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].user, UserId(42));
    assert_eq!(events[0].trigger, Trigger::Start);
    match &events[1].trigger {
        Trigger::Callback(query) => {
            assert_eq!(query.id, "cb-9");
            assert_eq!(query.action, Ok(CallbackAction::Page(1)));
        }
        other => panic!("expected callback, got {other:?}"),
    }

    let events = transport.next_events().await.expect("second poll");
    assert!(events.is_empty());
}
