//! End-to-end tests for decoding chunked agent streams.

mod common;

use std::convert::Infallible;
use std::fmt;

use futures::StreamExt;
use pretty_assertions::assert_eq;

use spectra::sse::{decode_stream, SseDecoder};
use spectra::types::{LogEntry, LogSource};

use common::pairs;

const MODEL_TEXT: &str = r#"{"content":{"role":"model","parts":[{"text":"Hello"}]},"timestamp":1700000000.5}"#;
const FUNCTION_CALL: &str =
    r#"{"content":{"role":"model","parts":[{"functionCall":{"name":"scan","args":{"target":"10.0.0.1"}}}]}}"#;
const TOOL_RESPONSE: &str =
    r#"{"content":{"role":"user","parts":[{"functionResponse":{"name":"scan","response":{"ports":[80,443]}}}]}}"#;
const USER_TEXT: &str = r#"{"content":{"role":"user","parts":[{"text":"héllo 👋"}]}}"#;

fn sse(events: &[&str]) -> String {
    events.iter().map(|e| format!("data: {e}\n\n")).collect()
}

async fn decode_chunks(chunks: Vec<Vec<u8>>) -> Vec<LogEntry> {
    let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
    decode_stream(stream).collect().await
}

async fn decode_whole(body: &str) -> Vec<LogEntry> {
    decode_chunks(vec![body.as_bytes().to_vec()]).await
}

fn expected_examples() -> Vec<(LogSource, String)> {
    vec![
        (LogSource::Ai, "Hello".to_string()),
        (
            LogSource::Ai,
            r#"Function Call: scan({"target":"10.0.0.1"})"#.to_string(),
        ),
        (
            LogSource::System,
            r#"Tool Response [scan]: {"ports":[80,443]}"#.to_string(),
        ),
        (LogSource::User, "héllo 👋".to_string()),
    ]
}

#[tokio::test]
async fn classifies_each_event_kind() {
    let body = sse(&[MODEL_TEXT, FUNCTION_CALL, TOOL_RESPONSE, USER_TEXT]);
    let entries = decode_whole(&body).await;
    assert_eq!(pairs(&entries), expected_examples());
    assert_eq!(entries[0].timestamp.timestamp(), 1_700_000_000);
}

#[tokio::test]
async fn split_at_every_byte_matches_single_chunk() {
    let body = sse(&[MODEL_TEXT, FUNCTION_CALL, TOOL_RESPONSE, USER_TEXT]);
    let whole = pairs(&decode_whole(&body).await);
    let bytes = body.as_bytes();

    // Every split point, including inside the multi-byte code points.
    for split in 0..=bytes.len() {
        let chunks = vec![bytes[..split].to_vec(), bytes[split..].to_vec()];
        assert_eq!(pairs(&decode_chunks(chunks).await), whole, "split at byte {split}");
    }

    let single_bytes = bytes.iter().map(|b| vec![*b]).collect();
    assert_eq!(pairs(&decode_chunks(single_bytes).await), whole);
}

#[tokio::test]
async fn preserves_event_order() {
    let events: Vec<String> = (0..50)
        .map(|i| format!(r#"{{"content":{{"role":"model","parts":[{{"text":"step {i}"}}]}}}}"#))
        .collect();
    let refs: Vec<&str> = events.iter().map(String::as_str).collect();

    let entries = decode_whole(&sse(&refs)).await;
    let messages: Vec<String> = entries.into_iter().map(|e| e.message).collect();
    let expected: Vec<String> = (0..50).map(|i| format!("step {i}")).collect();
    assert_eq!(messages, expected);
}

#[tokio::test]
async fn malformed_event_is_isolated() {
    let body = sse(&[MODEL_TEXT, "{not json", FUNCTION_CALL]);
    let entries = decode_whole(&body).await;

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].source, LogSource::Ai);
    assert_eq!(entries[0].message, "Hello");
    assert_eq!(entries[1].source, LogSource::System);
    assert!(entries[1].message.starts_with("Failed to parse event data:"));
    assert_eq!(entries[2].message, r#"Function Call: scan({"target":"10.0.0.1"})"#);
}

#[tokio::test]
async fn empty_records_produce_nothing() {
    let body = format!("data: {MODEL_TEXT}\n\n\n\n\n\ndata: {USER_TEXT}\n\n");
    let entries = decode_whole(&body).await;
    assert_eq!(
        pairs(&entries),
        vec![
            (LogSource::Ai, "Hello".to_string()),
            (LogSource::User, "héllo 👋".to_string()),
        ]
    );
}

#[tokio::test]
async fn unterminated_final_event_is_flushed_with_marker() {
    let body = format!(
        "data: {MODEL_TEXT}\n\ndata: {}",
        r#"{"content":{"role":"model","parts":[{"text":"done"}]}}"#
    );
    let entries = decode_whole(&body).await;
    assert_eq!(
        pairs(&entries),
        vec![
            (LogSource::Ai, "Hello".to_string()),
            (LogSource::Ai, "[trailing] done".to_string()),
        ]
    );
}

#[tokio::test]
async fn trailing_residual_without_data_prefix_is_dropped() {
    let body = format!("data: {MODEL_TEXT}\n\n: keepalive");
    let entries = decode_whole(&body).await;
    assert_eq!(pairs(&entries), vec![(LogSource::Ai, "Hello".to_string())]);
}

#[tokio::test]
async fn non_data_lines_are_ignored() {
    let body = format!("event: message\nid: 7\ndata: {MODEL_TEXT}\nretry: 100\n\n: comment\n\n");
    let entries = decode_whole(&body).await;
    assert_eq!(pairs(&entries), vec![(LogSource::Ai, "Hello".to_string())]);
}

#[tokio::test]
async fn crlf_delimited_records_are_decoded() {
    let body = format!("data: {MODEL_TEXT}\r\n\r\ndata: {TOOL_RESPONSE}\r\n\r\n");
    let entries = decode_whole(&body).await;
    assert_eq!(pairs(&entries), vec![expected_examples()[0].clone(), expected_examples()[2].clone()]);
}

#[tokio::test]
async fn two_decoders_agree_on_the_same_input() {
    let body = sse(&[MODEL_TEXT, "{broken", TOOL_RESPONSE]);
    let first = pairs(&decode_whole(&body).await);
    let second = pairs(&decode_whole(&body).await);
    assert_eq!(first, second);

    let mut a = SseDecoder::new();
    let mut b = SseDecoder::new();
    let mut from_a = a.feed(body.as_bytes());
    from_a.extend(a.finish());
    let mut from_b = b.feed(body.as_bytes());
    from_b.extend(b.finish());
    assert_eq!(pairs(&from_a), pairs(&from_b));
}

#[derive(Debug)]
struct Reset;

impl fmt::Display for Reset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection reset")
    }
}

#[tokio::test]
async fn transport_error_ends_stream_with_one_system_entry() {
    let chunks: Vec<Result<Vec<u8>, Reset>> = vec![
        Ok(sse(&[MODEL_TEXT]).into_bytes()),
        Ok(b"data: {\"content\":".to_vec()),
        Err(Reset),
        Ok(sse(&[USER_TEXT]).into_bytes()),
    ];
    let entries: Vec<LogEntry> = decode_stream(futures::stream::iter(chunks)).collect().await;
    assert_eq!(
        pairs(&entries),
        vec![
            (LogSource::Ai, "Hello".to_string()),
            (LogSource::System, "Stream interrupted: connection reset".to_string()),
        ]
    );
}
