#![allow(dead_code)]

use std::time::Duration;

use autoxdcc::config::Config;
use autoxdcc::engine::Engine;
use autoxdcc::host::{Host, HookHandle};
use autoxdcc::notify::{Notifier, Outcome};

pub const SERVER: &str = "net";
pub const CHANNEL: &str = "#chan";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub handle: HookHandle,
    pub after: Duration,
}

/// Scripted in-memory host: records everything the engine asks for and lets
/// tests fire timers by hand.
#[derive(Default)]
pub struct FakeHost {
    pub servers: Vec<String>,
    pub channels: Vec<(String, String)>,
    /// (server, channel, line) in send order.
    pub sent_lines: Vec<(String, String, String)>,
    /// Currently armed timers, in arm order.
    pub armed: Vec<ArmedTimer>,
    pub cancelled: Vec<HookHandle>,
    /// Active stream subscriptions.
    pub subscriptions: Vec<HookHandle>,
    pub unsubscribed: Vec<HookHandle>,
    next_handle: u64,
}

impl FakeHost {
    pub fn with_channel(server: &str, channel: &str) -> Self {
        Self {
            servers: vec![server.to_string()],
            channels: vec![(server.to_string(), channel.to_string())],
            ..Self::default()
        }
    }

    fn next(&mut self) -> HookHandle {
        let handle = HookHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    pub fn last_timer(&self) -> ArmedTimer {
        *self.armed.last().expect("no timer armed")
    }

    pub fn sent_texts(&self) -> Vec<&str> {
        self.sent_lines.iter().map(|(_, _, l)| l.as_str()).collect()
    }
}

impl Host for FakeHost {
    fn server_connected(&mut self, server: &str) -> bool {
        self.servers.iter().any(|s| s == server)
    }

    fn channel_open(&mut self, server: &str, channel: &str) -> bool {
        self.channels
            .iter()
            .any(|(s, c)| s == server && c == channel)
    }

    fn send_line(&mut self, server: &str, channel: &str, line: &str) {
        self.sent_lines
            .push((server.to_string(), channel.to_string(), line.to_string()));
    }

    fn arm_timer(&mut self, after: Duration) -> HookHandle {
        let handle = self.next();
        self.armed.push(ArmedTimer { handle, after });
        handle
    }

    fn cancel_timer(&mut self, handle: HookHandle) {
        // cancelling an absent handle is a checked no-op
        self.armed.retain(|t| t.handle != handle);
        self.cancelled.push(handle);
    }

    fn subscribe(&mut self, _server: &str) -> HookHandle {
        let handle = self.next();
        self.subscriptions.push(handle);
        handle
    }

    fn unsubscribe(&mut self, handle: HookHandle) {
        self.subscriptions.retain(|h| *h != handle);
        self.unsubscribed.push(handle);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub outcomes: Vec<Outcome>,
}

impl Notifier for RecordingNotifier {
    fn deliver(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }
}

pub fn test_config() -> Config {
    Config {
        server: SERVER.to_string(),
        channel: CHANNEL.to_string(),
        ..Config::default()
    }
}

pub fn make_engine() -> Engine<FakeHost, RecordingNotifier> {
    Engine::new(
        test_config(),
        FakeHost::with_channel(SERVER, CHANNEL),
        RecordingNotifier::default(),
    )
}

pub fn result_line(grabs: u64, size: &str, filename: &str, pack: u32) -> String {
    format!("( {grabs}x [{size}] {filename} ) (/msg SourceBot xdcc send #{pack})")
}

pub const END_MARKER: &str = "( 2 Results Found - 12 Gets )";

/// Drive a search session through collection and the settle timer so it
/// lands in pending-download with curated choices.
pub fn finalized_search(
    engine: &mut Engine<FakeHost, RecordingNotifier>,
    session_id: &str,
    lines: &[String],
) {
    engine.search(session_id, "some show");
    for line in lines {
        engine.handle_line(line);
    }
    engine.handle_line(END_MARKER);
    let settle = engine.host().last_timer().handle;
    engine.handle_timer(settle);
}
