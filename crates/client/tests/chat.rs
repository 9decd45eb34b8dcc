//! Tests for the chat client state machine.

mod common;

use common::{MockTransport, config, json_body};
use pcore::{ChatMessage, ChatOptions, Error, Role};
use playkit_client::{ChatClient, ChatEvent, ClientConfig, Completion, Phase};
use tokio::sync::mpsc;

const SCENARIO_A: &str = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;

fn frame(content: &str) -> String {
    format!(
        "{{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}}}}]}}\n",
        serde_json::to_string(content).unwrap()
    )
}

fn client() -> (
    ChatClient<MockTransport>,
    MockTransport,
    mpsc::UnboundedReceiver<ChatEvent>,
) {
    let transport = MockTransport::default();
    let client = ChatClient::new(transport.clone(), config("http://playkit.test"));
    let (tx, rx) = mpsc::unbounded_channel();
    client.subscribe(tx);
    (client, transport, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test]
async fn non_streaming_completion() {
    let (client, transport, mut rx) = client();
    transport.respond(200, SCENARIO_A);

    let handle = client.send("hello", ChatOptions::default()).unwrap();
    let record = handle.finished().await.expect("terminal record");
    assert_eq!(record.content, "hi");

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let ChatEvent::Completed(response) = &events[0] else {
        panic!("expected completion, got {events:?}");
    };
    assert!(response.success);
    assert_eq!(response.content, "hi");
    assert_eq!(response.usage.total_tokens, 4);
    assert!(!client.is_processing());

    let history = client.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.messages()[0], ChatMessage::user("hello"));
    assert_eq!(history.messages()[1].role, Role::Assistant);
    assert_eq!(history.messages()[1].content, "hi");
}

#[tokio::test]
async fn request_body_carries_history_and_options() {
    let (client, transport, _rx) = client();
    client.set_system_prompt("You are a shopkeeper.");
    transport.respond(200, SCENARIO_A);

    let options = ChatOptions::default().with_temperature(5.0);
    client.send("What do you sell?", options).unwrap().finished().await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "http://playkit.test/ai/game-42/v1/chat");
    assert_eq!(requests[0].bearer, "dev-token");

    let body = json_body(&requests[0]);
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["stream"], false);
    assert_eq!(body["temperature"], 2.0);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "What do you sell?");
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn streaming_cumulative_snapshots() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("hi", ChatOptions::streaming()).unwrap();

    let first = frame("He");
    let both = format!("{first}{}", frame("llo"));
    client.on_progress(first.as_bytes());
    client.on_progress(both.as_bytes());
    assert_eq!(client.phase(), Phase::Streaming);
    client.on_complete(Completion::ok(200, both.clone()));

    let events = drain(&mut rx);
    assert_eq!(
        events[..2],
        [ChatEvent::Delta("He".into()), ChatEvent::Delta("llo".into())]
    );
    let ChatEvent::Completed(response) = &events[2] else {
        panic!("expected completion, got {events:?}");
    };
    assert_eq!(response.content, "Hello");
    assert_eq!(events.len(), 3);
    assert_eq!(client.phase(), Phase::Idle);

    // The request was ended by hand, so its driver has nothing to report.
    drop(script);
    assert_eq!(handle.finished().await, None);
}

#[tokio::test]
async fn streaming_through_transport_chunks() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("hi", ChatOptions::streaming()).unwrap();

    let body = format!("{}{}data: [DONE]\n", frame("The "), frame("blacksmith"));
    let (head, tail) = body.split_at(17);
    script.chunk(head);
    script.chunk(tail);
    script.complete(200, &body);
    handle.finished().await;

    let deltas: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ChatEvent::Delta(delta) => Some(delta),
            ChatEvent::Completed(response) => {
                assert_eq!(response.content, "The blacksmith");
                None
            }
            ChatEvent::Structured(value) => panic!("unexpected document: {value}"),
            ChatEvent::Failed(error) => panic!("unexpected error: {error:?}"),
        })
        .collect();
    assert_eq!(deltas.concat(), "The blacksmith");
    assert_eq!(client.history().last().unwrap().content, "The blacksmith");
}

#[tokio::test]
async fn http_error_status() {
    let (client, transport, mut rx) = client();
    transport.respond(500, "server error");

    let record = client
        .send("hi", ChatOptions::default())
        .unwrap()
        .finished()
        .await
        .expect("terminal record");
    assert!(!record.success);
    assert_eq!(record.error.as_ref().map(|e| e.code.as_str()), Some("500"));

    let events = drain(&mut rx);
    let [ChatEvent::Failed(error)] = events.as_slice() else {
        panic!("expected one failure, got {events:?}");
    };
    assert_eq!(error.code, "500");
    assert_eq!(error.message, "server error");
    assert!(!client.is_processing());
    assert_eq!(client.history().len(), 1);
}

#[tokio::test]
async fn network_failure() {
    let (client, transport, mut rx) = client();
    transport.script().fail("connection refused");

    client.send("hi", ChatOptions::default()).unwrap().finished().await;

    let events = drain(&mut rx);
    let [ChatEvent::Failed(error)] = events.as_slice() else {
        panic!("expected one failure, got {events:?}");
    };
    assert_eq!(error.code, "NETWORK_ERROR");
    assert_eq!(client.phase(), Phase::Idle);
}

#[tokio::test]
async fn unparseable_body_is_a_parse_error() {
    let (client, transport, mut rx) = client();
    transport.respond(200, "<html>gateway</html>");

    client.send("hi", ChatOptions::default()).unwrap().finished().await;

    let events = drain(&mut rx);
    let [ChatEvent::Failed(error)] = events.as_slice() else {
        panic!("expected one failure, got {events:?}");
    };
    assert_eq!(error.code, "PARSE_ERROR");
    assert!(!client.is_processing());
}

#[tokio::test]
async fn malformed_frame_is_skipped() {
    let (client, transport, mut rx) = client();
    let _script = transport.script();
    client.send("hi", ChatOptions::streaming()).unwrap();

    let body = format!("{}not json\n{}", frame("a"), frame("b"));
    client.on_progress(body.as_bytes());
    client.on_complete(Completion::ok(200, body));

    let events = drain(&mut rx);
    assert_eq!(
        events[..2],
        [ChatEvent::Delta("a".into()), ChatEvent::Delta("b".into())]
    );
    assert!(matches!(&events[2], ChatEvent::Completed(r) if r.content == "ab"));
    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn send_while_in_flight_is_busy() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("first", ChatOptions::streaming()).unwrap();
    client.on_progress(frame("par").as_bytes());

    let err = client.send("second", ChatOptions::streaming()).unwrap_err();
    assert_eq!(err, Error::Busy);
    assert_eq!(err.code(), "REQUEST_IN_PROGRESS");
    assert_eq!(client.phase(), Phase::Streaming);
    assert_eq!(client.history().len(), 1);
    assert_eq!(transport.requests().len(), 1);

    let rest = format!("{}{}", frame("par"), frame("tial"));
    client.on_progress(rest.as_bytes());
    script.complete(200, &rest);
    handle.finished().await;

    let content: String = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ChatEvent::Delta(delta) => Some(delta),
            _ => None,
        })
        .collect();
    assert_eq!(content, "partial");
}

#[tokio::test]
async fn duplicate_completion_is_ignored() {
    let (client, transport, mut rx) = client();
    let _script = transport.script();
    client.send("hi", ChatOptions::default()).unwrap();

    client.on_complete(Completion::ok(200, SCENARIO_A));
    client.on_complete(Completion::ok(200, SCENARIO_A));
    client.on_progress(frame("late").as_bytes());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChatEvent::Completed(_)));
    assert_eq!(client.history().len(), 2);
}

#[tokio::test]
async fn stale_driver_completion_does_not_touch_next_request() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("one", ChatOptions::default()).unwrap();
    client.on_complete(Completion::ok(200, SCENARIO_A));

    transport.respond(200, SCENARIO_A);
    let second = client.send("two", ChatOptions::default()).unwrap();
    assert_eq!(second.generation(), handle.generation() + 1);

    // The first driver finishes after the second request started.
    drop(script);
    handle.finished().await;
    second.finished().await;

    let completed = drain(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, ChatEvent::Completed(_)))
        .count();
    assert_eq!(completed, 2);
    assert_eq!(client.history().len(), 4);
}

#[tokio::test]
async fn cancel_mid_stream() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("hi", ChatOptions::streaming()).unwrap();
    client.on_progress(frame("Hel").as_bytes());

    assert!(client.cancel());
    assert_eq!(client.phase(), Phase::Cancelling);
    script.chunk(&frame("lo"));
    handle.finished().await;

    assert_eq!(transport.aborts(), 1);
    assert!(!client.is_processing());
    let events = drain(&mut rx);
    assert_eq!(events[0], ChatEvent::Delta("Hel".into()));
    let [_, ChatEvent::Failed(error)] = events.as_slice() else {
        panic!("expected delta then failure, got {events:?}");
    };
    assert_eq!(error.code, "CANCELLED");
    assert_eq!(client.history().len(), 1);
    assert!(!client.cancel());
}

#[tokio::test]
async fn transport_closing_early_clears_in_flight() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("hi", ChatOptions::streaming()).unwrap();

    script.chunk(&frame("x"));
    drop(script);
    handle.finished().await;

    let events = drain(&mut rx);
    assert!(matches!(events.last(), Some(ChatEvent::Failed(e)) if e.code == "NETWORK_ERROR"));
    assert!(!client.is_processing());
}

#[tokio::test]
async fn preflight_errors_leave_state_untouched() {
    let (client, transport, _rx) = client();

    let err = client.send("   ", ChatOptions::default()).unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");

    let missing_game = ChatClient::new(transport.clone(), ClientConfig::default());
    let err = missing_game.send("hi", ChatOptions::default()).unwrap_err();
    assert_eq!(err.code(), "CONFIG_ERROR");

    let no_token = ChatClient::new(transport.clone(), ClientConfig::new("game-42"));
    let err = no_token.send("hi", ChatOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    assert!(client.history().is_empty());
    assert!(no_token.history().is_empty());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn send_messages_leaves_history_alone() {
    let (client, transport, _rx) = client();
    transport.respond(200, SCENARIO_A);

    let messages = vec![ChatMessage::system("Be brief."), ChatMessage::user("hello")];
    client
        .send_messages(messages, ChatOptions::default().with_max_tokens(16))
        .unwrap()
        .finished()
        .await;

    let body = json_body(&transport.requests()[0]);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["max_tokens"], 16);

    let history = client.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history.messages()[0].content, "hi");
}

#[tokio::test]
async fn clear_history_keeps_system_prompt() {
    let (client, transport, _rx) = client();
    client.set_system_prompt("You are a guard.");
    transport.respond(200, SCENARIO_A);
    client.send("halt", ChatOptions::default()).unwrap().finished().await;
    assert_eq!(client.history().len(), 3);

    client.clear_history();
    let history = client.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history.system_prompt(), Some("You are a guard."));
}

#[test]
fn with_model_overrides_default() {
    let transport = MockTransport::default();
    let client = ChatClient::new(transport.clone(), config("http://playkit.test"));
    assert_eq!(client.model(), "gpt-4o-mini");
    assert_eq!(client.clone().with_model("").model(), "gpt-4o-mini");
    assert_eq!(client.with_model("gpt-4o").model(), "gpt-4o");
}

fn structured_reply(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20 },
    })
    .to_string()
}

fn npc_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "level": { "type": "integer" },
        },
        "required": ["name", "level"],
    })
}

#[tokio::test]
async fn structured_generation_reports_json() {
    let (client, transport, mut rx) = client();
    client.set_system_prompt("ignored for structured requests");
    transport.respond(200, &structured_reply(r#"{"name":"Bob","level":3}"#));

    let handle = client
        .generate_structured("Create an NPC", npc_schema(), Some("Be terse."), 0.2)
        .unwrap();
    let record = handle.finished().await.expect("terminal record");
    assert!(record.success);

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![ChatEvent::Structured(serde_json::json!({"name": "Bob", "level": 3}))]
    );

    let body = json_body(&transport.requests()[0]);
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Be terse.");
    assert_eq!(body["messages"][1]["content"], "Create an NPC");
    assert_eq!(body["response_format"]["type"], "json_schema");
    assert_eq!(body["response_format"]["json_schema"]["schema"], npc_schema());

    assert_eq!(client.history().len(), 1);
    assert!(!client.is_processing());
}

#[tokio::test]
async fn structured_reply_that_is_not_json_is_a_parse_error() {
    let (client, transport, mut rx) = client();
    transport.respond(200, &structured_reply("Sure! Bob is level 3."));

    let record = client
        .generate_structured("Create an NPC", npc_schema(), None, 0.7)
        .unwrap()
        .finished()
        .await
        .expect("terminal record");
    assert!(!record.success);

    let events = drain(&mut rx);
    let [ChatEvent::Failed(error)] = events.as_slice() else {
        panic!("expected one failure, got {events:?}");
    };
    assert_eq!(error.code, "PARSE_ERROR");
    let body = json_body(&transport.requests()[0]);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn structured_generation_shares_busy_and_cancel_rules() {
    let (client, transport, mut rx) = client();
    let script = transport.script();
    let handle = client.send("hi", ChatOptions::streaming()).unwrap();

    let err = client
        .generate_structured("Create an NPC", npc_schema(), None, 0.7)
        .unwrap_err();
    assert_eq!(err, Error::Busy);
    script.complete(200, &frame("ok"));
    handle.finished().await;
    drain(&mut rx);

    let _script = transport.script();
    let handle = client
        .generate_structured("Create an NPC", npc_schema(), None, 0.7)
        .unwrap();
    assert!(client.cancel());
    handle.finished().await;

    let events = drain(&mut rx);
    assert!(matches!(events.as_slice(), [ChatEvent::Failed(e)] if e.code == "CANCELLED"));
    assert_eq!(transport.aborts(), 1);
    assert!(!client.is_processing());
}

#[tokio::test]
async fn structured_generation_rejects_bad_input() {
    let (client, transport, _rx) = client();

    let err = client
        .generate_structured("  ", npc_schema(), None, 0.7)
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");
    let err = client
        .generate_structured("npc", serde_json::json!("object"), None, 0.7)
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");
    assert!(transport.requests().is_empty());
    assert_eq!(client.phase(), Phase::Idle);
}
