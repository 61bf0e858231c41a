//! Command/response transactions over an unframed line link
//!
//! The device gives no acknowledgement or framing, so a transaction relies on
//! timing: flush stale bytes, write the command, let the device settle, then
//! drain whatever arrived and pick the first line that is neither an echo of
//! the command nor a prompt glyph. A device that echoes first and computes
//! afterwards gets one extra, bounded read.

use crate::core::constants::{
    FALLBACK_INTERVAL_MS, MAX_DRAIN_LINES, READ_TIMEOUT_MS, SETTLE_INTERVAL_MS,
};
use crate::core::{ClassifiedLine, Command, LineKind, Response, Transcript};
use crate::hardware::{Link, LinkResult};
use crate::protocol::classify::classify_line;
use crate::protocol::{TransactionError, TransactionResult};
use crate::utils::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, debug_span, trace};

/// Timing and draining parameters for transactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Wait after writing before the receive buffer is drained (milliseconds)
    pub settle_ms: u64,
    /// Wait before the extra read when only the echo was seen (milliseconds)
    pub fallback_ms: u64,
    /// Bound on each blocking line read (milliseconds)
    pub read_timeout_ms: u64,
    /// Maximum lines read per drain; `None` drains until the buffer is empty,
    /// capped at `MAX_DRAIN_LINES`
    pub drain_limit: Option<usize>,
    /// Enable the delayed-response read
    pub fallback_enabled: bool,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            settle_ms: SETTLE_INTERVAL_MS,
            fallback_ms: FALLBACK_INTERVAL_MS,
            read_timeout_ms: READ_TIMEOUT_MS,
            drain_limit: None,
            fallback_enabled: true,
        }
    }
}

impl TransactionConfig {
    /// Single blind line read with no echo fallback
    pub fn single_line() -> Self {
        Self {
            drain_limit: Some(1),
            fallback_enabled: false,
            ..Default::default()
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn fallback(&self) -> Duration {
        Duration::from_millis(self.fallback_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "read_timeout_ms".to_string(),
                value: self.read_timeout_ms.to_string(),
                reason: "blocking reads need a non-zero bound".to_string(),
            });
        }
        if self.drain_limit == Some(0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "drain_limit".to_string(),
                value: "0".to_string(),
                reason: "use null to drain until the buffer is empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Executes one command at a time over an exclusively owned link
pub struct TransactionEngine<L: Link> {
    link: L,
    config: TransactionConfig,
}

impl<L: Link> TransactionEngine<L> {
    pub fn new(link: L, config: TransactionConfig) -> Self {
        Self { link, config }
    }

    pub fn with_defaults(link: L) -> Self {
        Self::new(link, TransactionConfig::default())
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Send `command` and return the device's reply, if it produced one
    ///
    /// `Ok(None)` means the exchange completed but no reply line could be
    /// told apart from echo and prompt output. The command is never resent.
    pub fn send(&mut self, command: impl Into<Command>) -> TransactionResult<Option<Response>> {
        self.send_detailed(command).map(|transcript| transcript.response)
    }

    /// Like [`send`](Self::send) but also returns every line observed
    pub fn send_detailed(&mut self, command: impl Into<Command>) -> TransactionResult<Transcript> {
        let command = command.into();
        if command.has_line_break() {
            return Err(TransactionError::InvalidCommand {
                command: command.to_string(),
            });
        }

        let span = debug_span!("transaction", port = %self.link.port_name(), command = %command);
        let _enter = span.enter();

        self.execute(&command).map_err(|source| TransactionError::Link {
            command: command.to_string(),
            source,
        })
    }

    /// Close the underlying link; safe to call more than once
    pub fn close(&mut self) {
        self.link.close();
    }

    fn execute(&mut self, command: &Command) -> LinkResult<Transcript> {
        // A reply left over from an earlier exchange must not be taken for this one
        self.link.flush_input()?;
        self.link.flush_output()?;

        self.link.write(&command.to_wire())?;
        debug!("command sent");

        self.link.pause(self.config.settle());

        let mut transcript = Transcript::new(command.clone());
        self.drain(command, &mut transcript.lines)?;

        let first_content = transcript
            .content_lines()
            .next()
            .map(|l| l.line.trimmed().to_string());

        if let Some(text) = first_content {
            debug!(response = %text, "response received");
            transcript.response = Some(Response::immediate(text));
            return Ok(transcript);
        }

        let echo_only =
            matches!(transcript.lines.as_slice(), [only] if only.kind == LineKind::Echo);

        if self.config.fallback_enabled && echo_only {
            transcript.fallback_used = true;
            transcript.response = self.read_delayed(command, &mut transcript.lines)?;
        }

        if transcript.response.is_none() {
            debug!(lines = transcript.lines.len(), "no response");
        }

        Ok(transcript)
    }

    /// Read every line already buffered, without waiting for more
    fn drain(&mut self, command: &Command, lines: &mut Vec<ClassifiedLine>) -> LinkResult<()> {
        let limit = self
            .config
            .drain_limit
            .map_or(MAX_DRAIN_LINES, |limit| limit.min(MAX_DRAIN_LINES));
        let mut reads = 0usize;

        while self.link.bytes_available()? > 0 {
            if reads >= limit {
                trace!(reads, "drain limit reached");
                break;
            }

            let Some(line) = self.link.read_line(self.config.read_timeout())? else {
                break;
            };
            reads += 1;

            if line.trimmed().is_empty() {
                continue;
            }

            let kind = classify_line(command, &line);
            debug!(line = %line.trimmed(), %kind, "received");
            lines.push(ClassifiedLine { line, kind });
        }

        Ok(())
    }

    /// Give a device that echoed and then went quiet one more chance to answer
    fn read_delayed(
        &mut self,
        command: &Command,
        lines: &mut Vec<ClassifiedLine>,
    ) -> LinkResult<Option<Response>> {
        debug!(wait_ms = self.config.fallback_ms, "only echo seen, waiting for delayed reply");
        self.link.pause(self.config.fallback());

        let Some(line) = self.link.read_line(self.config.read_timeout())? else {
            return Ok(None);
        };

        let kind = classify_line(command, &line);
        debug!(line = %line.trimmed(), %kind, "received (delayed)");

        let response = match kind {
            LineKind::Content => Some(Response::delayed(line.trimmed())),
            // A single non-prompt character is accepted here, unlike in the first pass
            LineKind::Noise if !line.trimmed().is_empty() => {
                Some(Response::delayed(line.trimmed()))
            }
            _ => None,
        };

        lines.push(ClassifiedLine { line, kind });
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{LinkError, MockLink, MockReply};

    fn engine() -> TransactionEngine<MockLink> {
        TransactionEngine::with_defaults(MockLink::new("mock0"))
    }

    fn text(response: Option<Response>) -> Option<String> {
        response.map(|r| r.text)
    }

    #[test]
    fn test_echo_then_content() {
        let mut engine = engine();
        engine.link_mut().expect_reply(&["led on", "OK:ON"]);

        let response = engine.send("led on").unwrap().unwrap();
        assert_eq!(response.text, "OK:ON");
        assert!(!response.delayed);
        assert_eq!(engine.link().written_text(), vec!["led on\n".to_string()]);
    }

    #[test]
    fn test_echo_only_is_no_response() {
        for command in ["led on", "led off", "status", "reboot now"] {
            let mut engine = engine();
            engine.link_mut().expect_reply(&[command]);

            let transcript = engine.send_detailed(command).unwrap();
            assert!(transcript.response.is_none(), "{command} returned the echo");
            assert!(transcript.fallback_used);
        }
    }

    #[test]
    fn test_prompt_only_is_no_response() {
        for glyph in [">", "$", "#"] {
            let mut engine = engine();
            engine.link_mut().expect_reply(&[glyph]);

            let transcript = engine.send_detailed("status").unwrap();
            assert!(transcript.response.is_none());
            assert!(!transcript.fallback_used);
        }
    }

    #[test]
    fn test_uppercase_echo_is_not_content() {
        let mut engine = engine();
        engine.link_mut().expect_reply(&["LED ON"]);

        assert!(engine.send("led on").unwrap().is_none());
    }

    #[test]
    fn test_first_content_line_wins() {
        let mut engine = engine();
        engine.link_mut().expect_reply(&["status", "#", "STATE:ON", "UPTIME:42"]);

        let transcript = engine.send_detailed("status").unwrap();
        assert_eq!(text(transcript.response), Some("STATE:ON".to_string()));
        let kinds: Vec<LineKind> = transcript.lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Echo, LineKind::Prompt, LineKind::Content, LineKind::Content]
        );
    }

    #[test]
    fn test_burst_within_settle_window_is_captured() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("led on")
                .after(Duration::from_millis(150), "OK:ON"),
        );

        let transcript = engine.send_detailed("led on").unwrap();
        assert_eq!(text(transcript.response), Some("OK:ON".to_string()));
        assert!(!transcript.fallback_used);
    }

    #[test]
    fn test_delayed_response_fallback() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("status")
                .after(Duration::from_millis(260), "STATE:OFF"),
        );

        let response = engine.send("status").unwrap().unwrap();
        assert_eq!(response.text, "STATE:OFF");
        assert!(response.delayed);
    }

    #[test]
    fn test_delayed_read_rejects_prompt_and_echo() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("status")
                .after(Duration::from_millis(250), ">"),
        );
        assert!(engine.send("status").unwrap().is_none());

        engine.link_mut().expect(
            MockReply::new()
                .immediately("status")
                .after(Duration::from_millis(250), "STATUS"),
        );
        assert!(engine.send("status").unwrap().is_none());
    }

    #[test]
    fn test_delayed_single_character_reply() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("status")
                .after(Duration::from_millis(250), "1"),
        );

        assert_eq!(text(engine.send("status").unwrap()), Some("1".to_string()));
    }

    #[test]
    fn test_no_fallback_when_echo_is_followed_by_prompt() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("status")
                .immediately(">")
                .after(Duration::from_millis(250), "STATE:OFF"),
        );

        let transcript = engine.send_detailed("status").unwrap();
        assert_eq!(transcript.lines.len(), 2);
        assert!(transcript.response.is_none());
        assert!(!transcript.fallback_used);
        assert_eq!(engine.link().unread_lines(), 1);
    }

    #[test]
    fn test_drain_is_capped_for_streaming_device() {
        let mut engine = engine();
        let chatter: Vec<String> = (0..MAX_DRAIN_LINES + 50)
            .map(|n| format!("TICK:{n}"))
            .collect();
        let lines: Vec<&str> = chatter.iter().map(String::as_str).collect();
        engine.link_mut().expect_reply(&lines);

        let transcript = engine.send_detailed("status").unwrap();
        assert_eq!(transcript.lines.len(), MAX_DRAIN_LINES);
        assert_eq!(text(transcript.response), Some("TICK:0".to_string()));
        assert_eq!(engine.link().unread_lines(), 50);
    }

    #[test]
    fn test_no_fallback_without_leading_echo() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("$")
                .after(Duration::from_millis(250), "STATE:ON"),
        );

        let transcript = engine.send_detailed("status").unwrap();
        assert!(transcript.response.is_none());
        assert!(!transcript.fallback_used);
    }

    #[test]
    fn test_fallback_waits_are_bounded() {
        let mut engine = engine();
        engine.link_mut().expect_reply(&["led off"]);

        assert!(engine.send("led off").unwrap().is_none());
        let config = TransactionConfig::default();
        assert_eq!(
            engine.link().elapsed(),
            config.settle() + config.fallback() + config.read_timeout()
        );
    }

    #[test]
    fn test_stale_line_is_flushed() {
        let mut engine = engine();
        engine.link_mut().expect(
            MockReply::new()
                .immediately("led on")
                .immediately("OK:ON")
                .after(Duration::from_secs(2), "STATE:ON"),
        );
        assert_eq!(text(engine.send("led on").unwrap()), Some("OK:ON".to_string()));

        // "STATE:ON" lands after the first exchange finished and is never read
        engine.link_mut().pause(Duration::from_secs(3));
        assert_eq!(engine.link_mut().bytes_available().unwrap(), "STATE:ON\n".len());
        engine.link_mut().expect_reply(&["status"]);

        assert!(engine.send("status").unwrap().is_none());
        assert_eq!(engine.link().unread_lines(), 0);
        assert_eq!(engine.link().input_flushes(), 2);
        assert_eq!(engine.link().output_flushes(), 2);
    }

    #[test]
    fn test_silent_device() {
        let mut engine = engine();
        engine.link_mut().expect_silence();

        let transcript = engine.send_detailed("status").unwrap();
        assert!(transcript.lines.is_empty());
        assert!(transcript.response.is_none());
        assert_eq!(engine.link().elapsed(), TransactionConfig::default().settle());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let mut engine = engine();
        engine.link_mut().expect_reply(&["", "status", "  ", "STATE:ON"]);

        let transcript = engine.send_detailed("status").unwrap();
        assert_eq!(transcript.lines.len(), 2);
        assert_eq!(text(transcript.response), Some("STATE:ON".to_string()));
    }

    #[test]
    fn test_single_line_mode() {
        let mut engine =
            TransactionEngine::new(MockLink::new("mock0"), TransactionConfig::single_line());
        engine.link_mut().expect_reply(&["led on", "OK:ON"]);

        let transcript = engine.send_detailed("led on").unwrap();
        assert_eq!(transcript.lines.len(), 1);
        assert!(transcript.response.is_none());
        assert!(!transcript.fallback_used);
    }

    #[test]
    fn test_write_failure_is_transaction_error() {
        let mut engine = engine();
        engine.link_mut().fail_next_write();

        let err = engine.send("led on").unwrap_err();
        assert!(matches!(
            err,
            TransactionError::Link { source: LinkError::Io { .. }, .. }
        ));
        assert!(err.is_recoverable());
        assert_eq!(err.command(), "led on");
    }

    #[test]
    fn test_decode_failure_is_transaction_error() {
        let mut engine = engine();
        engine
            .link_mut()
            .expect(MockReply::new().raw_after(Duration::ZERO, &[0xff, 0xfe, b'\n']));

        assert!(matches!(
            engine.send("status"),
            Err(TransactionError::Link { source: LinkError::Decode { .. }, .. })
        ));
    }

    #[test]
    fn test_closed_link() {
        let mut engine = engine();
        engine.close();
        engine.close();

        let err = engine.send("status").unwrap_err();
        assert!(!err.is_recoverable());
        assert_eq!(engine.link().close_calls(), 2);
    }

    #[test]
    fn test_line_break_in_command_is_rejected() {
        let mut engine = engine();
        let err = engine.send("led on\nled off").unwrap_err();

        assert!(matches!(err, TransactionError::InvalidCommand { .. }));
        assert!(engine.link().written().is_empty());
    }

    #[test]
    fn test_mock_scenario() {
        let mut engine = engine();

        engine.link_mut().expect_reply(&["led on", "OK:ON"]);
        assert_eq!(text(engine.send("led on").unwrap()), Some("OK:ON".to_string()));

        engine.link_mut().expect_reply(&["$", "STATE:ON"]);
        assert_eq!(text(engine.send("status").unwrap()), Some("STATE:ON".to_string()));

        engine.link_mut().expect_reply(&["led off"]);
        assert_eq!(text(engine.send("led off").unwrap()), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(TransactionConfig::default().validate().is_ok());
        assert!(TransactionConfig::single_line().validate().is_ok());

        let config = TransactionConfig {
            drain_limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { ref parameter, .. }) if parameter == "drain_limit"
        ));
    }
}
