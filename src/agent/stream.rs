//! Incremental parsing of streaming CLI output.
//!
//! The supported CLIs share a line-delimited-JSON transport but speak three
//! different streaming protocols:
//!
//! - **claude / cursor-agent**: a terminal `{"type":"result",...}` event
//!   carries the full result (cursor-agent emits a single JSON document
//!   that already satisfies this shape)
//! - **gemini**: `{"type":"init"}` opens the stream, assistant `message`
//!   events carry text fragments, a `result` event closes it
//! - **codex**: `{"type":"thread.started"}` opens a thread, completed
//!   `agent_message` items carry text, `{"type":"turn.completed"}` closes it
//!
//! [`StreamProcessor`] consumes one line at a time, classifies the protocol
//! from the discriminators it sees, and signals as soon as a final result is
//! available so the supervisor can stop reading and terminate the child.
//!
//! Lines that are not valid JSON (log noise, partial writes) are ignored
//! without surfacing an error.

use serde_json::Value;

/// A classified wire event.
///
/// Each line of output maps to exactly one variant. The discriminator
/// cascade lives in [`WireEvent::classify`]; protocol state (which format
/// is active) stays in the processor, so adding a protocol means adding a
/// variant here and an arm in [`StreamProcessor::apply`].
#[derive(Debug)]
enum WireEvent {
    /// Gemini stream opened (`type: init`).
    Init,
    /// Codex thread opened (`type: thread.started`).
    ThreadStarted,
    /// Gemini assistant message fragment (`type: message`, `role: assistant`).
    AssistantMessage(String),
    /// Codex completed item; carries text when the item is an agent message.
    ItemCompleted(Option<String>),
    /// Codex turn finished (`type: turn.completed`).
    TurnCompleted,
    /// Generic terminal result event (`type: result`), value kept whole.
    Result(Value),
    /// JSON value with no `type` discriminator at all.
    Untagged(Value),
    /// Recognized transport, unrecognized event; ignored.
    Other,
}

impl WireEvent {
    /// Classify a parsed JSON value into a wire event.
    fn classify(value: Value) -> Self {
        let Some(discriminator) = value.get("type") else {
            return WireEvent::Untagged(value);
        };
        let Some(kind) = discriminator.as_str() else {
            // A `type` field that is not a string is an unrecognized event,
            // not an untagged document.
            return WireEvent::Other;
        };

        match kind {
            "init" => WireEvent::Init,
            "thread.started" => WireEvent::ThreadStarted,
            "message" => {
                let is_assistant =
                    value.get("role").and_then(Value::as_str) == Some("assistant");
                match value.get("content").and_then(Value::as_str) {
                    Some(content) if is_assistant => {
                        WireEvent::AssistantMessage(content.to_string())
                    }
                    _ => WireEvent::Other,
                }
            }
            "item.completed" => {
                let text = value.get("item").and_then(|item| {
                    if item.get("type").and_then(Value::as_str) == Some("agent_message") {
                        item.get("text").and_then(Value::as_str).map(str::to_string)
                    } else {
                        None
                    }
                });
                WireEvent::ItemCompleted(text)
            }
            "turn.completed" => WireEvent::TurnCompleted,
            "result" => WireEvent::Result(value),
            _ => WireEvent::Other,
        }
    }
}

/// Incremental state machine over one invocation's output stream.
///
/// Feed lines in arrival order via [`process_line`](Self::process_line);
/// once it returns `true` the final result is held internally and all
/// further input is ignored.
#[derive(Debug, Default)]
pub struct StreamProcessor {
    /// The finalized result event. `Some` means the terminal state.
    result: Option<Value>,
    /// Accumulated gemini text fragments, in arrival order.
    gemini_parts: Vec<String>,
    /// Accumulated codex agent messages, in arrival order.
    codex_messages: Vec<String>,
    /// Gemini protocol detected on this stream.
    is_gemini: bool,
    /// Codex protocol detected on this stream.
    is_codex: bool,
}

impl StreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one line of CLI output.
    ///
    /// Returns `true` once a final result is available. Empty lines, lines
    /// that fail JSON parsing, and anything after completion are no-ops.
    pub fn process_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || self.result.is_some() {
            return false;
        }

        let Ok(value) = serde_json::from_str::<Value>(line) else {
            return false;
        };

        self.apply(WireEvent::classify(value));
        self.result.is_some()
    }

    /// Apply one classified event to the protocol state.
    fn apply(&mut self, event: WireEvent) {
        match event {
            WireEvent::Init => self.is_gemini = true,
            WireEvent::ThreadStarted => self.is_codex = true,
            WireEvent::AssistantMessage(text) if self.is_gemini => {
                self.gemini_parts.push(text);
            }
            WireEvent::ItemCompleted(Some(text)) if self.is_codex => {
                self.codex_messages.push(text);
            }
            WireEvent::TurnCompleted if self.is_codex => {
                // Codex has no result event; the joined messages are the result.
                self.result = Some(serde_json::json!({
                    "type": "result",
                    "result": self.codex_messages.join("\n"),
                    "status": "success",
                }));
            }
            WireEvent::Result(value) => {
                if self.is_gemini {
                    let status = value
                        .get("status")
                        .and_then(Value::as_str)
                        .unwrap_or("success");
                    self.result = Some(serde_json::json!({
                        "type": "result",
                        "result": self.gemini_parts.concat(),
                        "status": status,
                    }));
                } else {
                    self.result = Some(value);
                }
            }
            WireEvent::Untagged(value) => {
                // A JSON document with no discriminator is the result itself.
                self.result = Some(value);
            }
            _ => {}
        }
    }

    /// The finalized result event, if the stream has completed.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The result text, if the stream has completed.
    ///
    /// A completed result whose event lacks a `result` string field (e.g.
    /// an untagged document) yields an empty string.
    pub fn result_text(&self) -> Option<String> {
        self.result.as_ref().map(|value| {
            value
                .get("result")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_of(processor: &StreamProcessor) -> &Value {
        processor.result().expect("stream should be complete")
    }

    #[test]
    fn bare_result_event_completes_immediately() {
        let mut p = StreamProcessor::new();
        assert!(p.process_line(r#"{"type": "result", "result": "hello"}"#));
        assert_eq!(result_of(&p)["result"], "hello");
        assert_eq!(p.result_text().unwrap(), "hello");
    }

    #[test]
    fn gemini_stream_concatenates_fragments() {
        let mut p = StreamProcessor::new();
        assert!(!p.process_line(r#"{"type": "init"}"#));
        assert!(!p.process_line(r#"{"type": "message", "role": "assistant", "content": "part1"}"#));
        assert!(!p.process_line(r#"{"type": "message", "role": "assistant", "content": "part2"}"#));
        assert!(p.process_line(r#"{"type": "result", "status": "success"}"#));

        let result = result_of(&p);
        assert_eq!(result["result"], "part1part2");
        assert_eq!(result["status"], "success");
    }

    #[test]
    fn gemini_result_status_defaults_to_success() {
        let mut p = StreamProcessor::new();
        p.process_line(r#"{"type": "init"}"#);
        assert!(p.process_line(r#"{"type": "result"}"#));
        assert_eq!(result_of(&p)["status"], "success");
    }

    #[test]
    fn gemini_ignores_non_assistant_messages() {
        let mut p = StreamProcessor::new();
        p.process_line(r#"{"type": "init"}"#);
        p.process_line(r#"{"type": "message", "role": "user", "content": "ignored"}"#);
        p.process_line(r#"{"type": "message", "role": "assistant", "content": "kept"}"#);
        assert!(p.process_line(r#"{"type": "result"}"#));
        assert_eq!(result_of(&p)["result"], "kept");
    }

    #[test]
    fn codex_stream_joins_messages_with_newlines() {
        let mut p = StreamProcessor::new();
        assert!(!p.process_line(r#"{"type": "thread.started"}"#));
        assert!(!p.process_line(
            r#"{"type": "item.completed", "item": {"type": "agent_message", "text": "msg1"}}"#
        ));
        assert!(!p.process_line(
            r#"{"type": "item.completed", "item": {"type": "agent_message", "text": "msg2"}}"#
        ));
        assert!(p.process_line(r#"{"type": "turn.completed"}"#));

        let result = result_of(&p);
        assert_eq!(result["result"], "msg1\nmsg2");
        assert_eq!(result["status"], "success");
    }

    #[test]
    fn codex_ignores_non_message_items() {
        let mut p = StreamProcessor::new();
        p.process_line(r#"{"type": "thread.started"}"#);
        p.process_line(
            r#"{"type": "item.completed", "item": {"type": "command_execution", "text": "ls"}}"#,
        );
        assert!(p.process_line(r#"{"type": "turn.completed"}"#));
        assert_eq!(result_of(&p)["result"], "");
    }

    #[test]
    fn turn_completed_without_thread_start_is_ignored() {
        let mut p = StreamProcessor::new();
        assert!(!p.process_line(r#"{"type": "turn.completed"}"#));
        assert!(p.result().is_none());
    }

    #[test]
    fn untagged_json_is_the_result_itself() {
        let mut p = StreamProcessor::new();
        assert!(p.process_line(r#"{"answer": "forty-two"}"#));
        assert_eq!(result_of(&p)["answer"], "forty-two");
        // No `result` string field: text degrades to empty.
        assert_eq!(p.result_text().unwrap(), "");
    }

    #[test]
    fn invalid_json_lines_are_skipped_silently() {
        let mut p = StreamProcessor::new();
        assert!(!p.process_line("not json at all"));
        assert!(!p.process_line("{\"truncated\": "));
        assert!(!p.process_line(""));
        assert!(!p.process_line("   "));
        assert!(p.result().is_none());

        // Noise must not disturb an in-progress stream.
        p.process_line(r#"{"type": "init"}"#);
        p.process_line("WARN something happened");
        p.process_line(r#"{"type": "message", "role": "assistant", "content": "ok"}"#);
        assert!(p.process_line(r#"{"type": "result"}"#));
        assert_eq!(result_of(&p)["result"], "ok");
    }

    #[test]
    fn unknown_tagged_events_are_ignored() {
        let mut p = StreamProcessor::new();
        assert!(!p.process_line(r#"{"type": "usage", "tokens": 123}"#));
        assert!(p.result().is_none());
    }

    #[test]
    fn completion_is_idempotent() {
        let mut p = StreamProcessor::new();
        assert!(p.process_line(r#"{"type": "result", "result": "first"}"#));

        // Everything after completion is a no-op, including new results.
        assert!(!p.process_line(r#"{"type": "result", "result": "second"}"#));
        assert!(!p.process_line(r#"{"other": "document"}"#));
        assert_eq!(result_of(&p)["result"], "first");
    }

    #[test]
    fn result_event_carries_status_verbatim() {
        let mut p = StreamProcessor::new();
        assert!(p.process_line(r#"{"type": "result", "result": "partial text", "status": "partial"}"#));
        assert_eq!(result_of(&p)["status"], "partial");
    }

    #[test]
    fn no_result_before_terminal_event() {
        let mut p = StreamProcessor::new();
        p.process_line(r#"{"type": "thread.started"}"#);
        p.process_line(
            r#"{"type": "item.completed", "item": {"type": "agent_message", "text": "work"}}"#,
        );
        assert!(p.result().is_none());
        assert!(p.result_text().is_none());
    }
}
