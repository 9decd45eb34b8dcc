//! Tests for the streaming response accumulator.

use playkit_core::Accumulator;

const STREAM: &str = include_str!("../templates/chat/stream.txt");
const TOOL_STREAM: &str = include_str!("../templates/chat/tool_stream.txt");

fn frame(content: &str) -> String {
    format!(
        "{{\"choices\":[{{\"index\":0,\"delta\":{{\"content\":{}}}}}]}}\n",
        serde_json::to_string(content).unwrap()
    )
}

#[test]
fn cumulative_snapshots_yield_each_frame_once() {
    let first = frame("He");
    let both = format!("{first}{}", frame("llo"));

    let mut acc = Accumulator::new();
    let p1 = acc.on_progress(first.as_bytes());
    assert_eq!(p1.deltas, vec!["He"]);

    let p2 = acc.on_progress(both.as_bytes());
    assert_eq!(p2.deltas, vec!["llo"]);

    assert_eq!(acc.content(), "Hello");
    assert_eq!(acc.consumed_offset(), both.len());
    assert_eq!(acc.finish().content, "Hello");
}

#[test]
fn partial_line_waits_for_delimiter() {
    let line = frame("partial");
    let truncated = &line[..line.len() - 1];

    let mut acc = Accumulator::new();
    let p = acc.on_progress(truncated.as_bytes());
    assert!(p.deltas.is_empty());
    assert_eq!(p.frames, 0);
    assert_eq!(acc.consumed_offset(), 0);

    let p = acc.on_progress(line.as_bytes());
    assert_eq!(p.deltas, vec!["partial"]);
    assert_eq!(p.frames, 1);
    assert_eq!(acc.consumed_offset(), line.len());
}

#[test]
fn split_at_every_byte_never_loses_or_duplicates() {
    let mut acc = Accumulator::new();
    let mut emitted = String::new();
    let mut last_offset = 0;

    for i in 1..=STREAM.len() {
        let progress = acc.on_progress(&STREAM.as_bytes()[..i]);
        for delta in progress.deltas {
            emitted.push_str(&delta);
        }
        assert!(acc.consumed_offset() >= last_offset);
        assert!(acc.consumed_offset() <= acc.buffered_len());
        last_offset = acc.consumed_offset();
    }

    assert_eq!(emitted, "The blacksmith is by the river.");
    assert_eq!(emitted, acc.content());
    assert!(acc.is_done());
}

#[test]
fn sse_stream_collects_reason_and_usage() {
    let mut acc = Accumulator::new();
    let progress = acc.extend(STREAM.as_bytes());
    assert_eq!(progress.deltas.len(), 3);
    assert!(progress.done);

    let response = acc.finish();
    assert!(response.success);
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.total_tokens, 29);
}

#[test]
fn malformed_frame_is_skipped() {
    let body = format!("{}not json\n{}", frame("a"), frame("b"));
    let mut acc = Accumulator::new();
    let progress = acc.extend(body.as_bytes());

    assert_eq!(progress.deltas, vec!["a", "b"]);
    assert_eq!(acc.skipped(), 1);
    assert_eq!(acc.frames(), 2);
}

#[test]
fn sse_event_fields_are_not_malformed() {
    let body = format!(
        "event: message\nid: 1\ndata: {}retry: 3000\n\ndata: {}",
        frame("a"),
        frame("b")
    );
    let mut acc = Accumulator::new();
    let progress = acc.extend(body.as_bytes());

    assert_eq!(progress.deltas, vec!["a", "b"]);
    assert_eq!(acc.skipped(), 0);
    assert_eq!(acc.frames(), 2);
}

#[test]
fn frames_after_sentinel_are_ignored() {
    let body = format!("{}[DONE]\n{}", frame("kept"), frame("dropped"));
    let mut acc = Accumulator::new();
    let progress = acc.extend(body.as_bytes());

    assert_eq!(progress.deltas, vec!["kept"]);
    assert_eq!(acc.consumed_offset(), body.len());
    assert_eq!(acc.finish().content, "kept");
}

#[test]
fn shrinking_snapshot_is_ignored() {
    let body = frame("x");
    let mut acc = Accumulator::new();
    acc.on_progress(body.as_bytes());

    let progress = acc.on_progress(b"");
    assert!(progress.deltas.is_empty());
    assert_eq!(acc.consumed_offset(), body.len());
    assert_eq!(acc.buffered_len(), body.len());
}

#[test]
fn multibyte_content_split_across_chunks() {
    let body = frame("héllo wörld");
    let bytes = body.as_bytes();
    // Split inside the two-byte 'é'.
    let split = body.find('é').unwrap() + 1;

    let mut acc = Accumulator::new();
    assert!(acc.extend(&bytes[..split]).deltas.is_empty());
    assert_eq!(acc.extend(&bytes[split..]).deltas, vec!["héllo wörld"]);
}

#[test]
fn crlf_delimited_frames_decode() {
    let body = frame("win").replace('\n', "\r\n");
    let mut acc = Accumulator::new();
    assert_eq!(acc.extend(body.as_bytes()).deltas, vec!["win"]);
}

#[test]
fn undelimited_tail_is_not_part_of_the_result() {
    let body = format!("{}{}", frame("kept"), frame("tail").trim_end());
    let mut acc = Accumulator::new();
    acc.extend(body.as_bytes());

    assert_eq!(acc.finish().content, "kept");
}

#[test]
fn tool_call_fragments_merge_by_index() {
    let mut acc = Accumulator::new();
    let progress = acc.extend(TOOL_STREAM.as_bytes());
    assert!(progress.deltas.is_empty());

    let response = acc.finish();
    assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
    assert_eq!(response.tool_calls.len(), 1);
    let call = &response.tool_calls[0];
    assert_eq!(call.id.as_str(), "call_1");
    assert_eq!(call.function.name.as_str(), "open_shop");
    assert_eq!(call.function.arguments, r#"{"npc":"smith"}"#);
}
