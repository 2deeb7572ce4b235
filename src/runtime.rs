//! Tokio wiring for the engine: a single event queue consumed by one task,
//! so every engine handler runs to completion without preemption.
//!
//! The embedding layer feeds scraped lines and service commands in through
//! the event sender and drains [`OutboundLine`]s on the other side,
//! typically forwarding them with [`crate::relay::RelayClient`]. The engine
//! itself never touches the relay connection.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::engine::Engine;
use crate::host::{Host, HookHandle};
use crate::notify::Notifier;

/// One unit of work for the engine loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Inbound service command (`search`/`hot`/`download`).
    Command(String),
    /// One raw line scraped from the chat stream.
    Line(String),
    TimerFired(HookHandle),
}

/// A line the engine wants written to a relay buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLine {
    /// Full buffer name, e.g. `irc.libera.#channel`.
    pub buffer: String,
    pub text: String,
}

/// [`Host`] implementation backed by the tokio timer wheel. Timer fires come
/// back through the shared event queue; cancellation aborts the sleep task.
pub struct TokioHost {
    events: mpsc::UnboundedSender<EngineEvent>,
    outbound: mpsc::UnboundedSender<OutboundLine>,
    timers: HashMap<HookHandle, JoinHandle<()>>,
    subscriptions: HashSet<HookHandle>,
    servers: HashSet<String>,
    channels: HashSet<(String, String)>,
    next_handle: u64,
}

impl TokioHost {
    pub fn new(
        events: mpsc::UnboundedSender<EngineEvent>,
        outbound: mpsc::UnboundedSender<OutboundLine>,
    ) -> Self {
        Self {
            events,
            outbound,
            timers: HashMap::new(),
            subscriptions: HashSet::new(),
            servers: HashSet::new(),
            channels: HashSet::new(),
            next_handle: 0,
        }
    }

    /// Record that a server identity is connected. The embedding layer keeps
    /// this in sync with relay state.
    pub fn mark_server_connected(&mut self, server: &str) {
        self.servers.insert(server.to_string());
    }

    pub fn mark_channel_open(&mut self, server: &str, channel: &str) {
        self.channels
            .insert((server.to_string(), channel.to_string()));
    }

    fn next(&mut self) -> HookHandle {
        let handle = HookHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl Host for TokioHost {
    fn server_connected(&mut self, server: &str) -> bool {
        self.servers.contains(server)
    }

    fn channel_open(&mut self, server: &str, channel: &str) -> bool {
        self.channels
            .contains(&(server.to_string(), channel.to_string()))
    }

    fn send_line(&mut self, server: &str, channel: &str, line: &str) {
        let _ = self.outbound.send(OutboundLine {
            buffer: format!("irc.{server}.{channel}"),
            text: line.to_string(),
        });
    }

    fn arm_timer(&mut self, after: Duration) -> HookHandle {
        let handle = self.next();
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = events.send(EngineEvent::TimerFired(handle));
        });
        self.timers.insert(handle, task);
        handle
    }

    fn cancel_timer(&mut self, handle: HookHandle) {
        if let Some(task) = self.timers.remove(&handle) {
            task.abort();
        }
    }

    fn subscribe(&mut self, _server: &str) -> HookHandle {
        let handle = self.next();
        self.subscriptions.insert(handle);
        handle
    }

    fn unsubscribe(&mut self, handle: HookHandle) {
        self.subscriptions.remove(&handle);
    }
}

/// Owns the engine and its event queue; `run` is the cooperative loop.
pub struct Driver<N: Notifier> {
    engine: Engine<TokioHost, N>,
    events: mpsc::UnboundedReceiver<EngineEvent>,
}

impl<N: Notifier> Driver<N> {
    /// Build a driver plus the two queue ends the embedding layer holds on
    /// to: the event sender for lines/commands, and the outbound receiver.
    pub fn new(
        config: Config,
        notifier: N,
    ) -> (
        Self,
        mpsc::UnboundedSender<EngineEvent>,
        mpsc::UnboundedReceiver<OutboundLine>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let host = TokioHost::new(events_tx.clone(), outbound_tx);
        let driver = Self {
            engine: Engine::new(config, host, notifier),
            events: events_rx,
        };
        (driver, events_tx, outbound_rx)
    }

    pub fn engine_mut(&mut self) -> &mut Engine<TokioHost, N> {
        &mut self.engine
    }

    /// Consume events until every sender is dropped. Handlers run strictly
    /// in arrival order.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.dispatch(event);
        }
        self.engine.shutdown();
    }

    fn dispatch(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Command(input) => {
                if let Err(e) = self.engine.handle_command(&input) {
                    tracing::warn!(command = %input, error = %e, "rejected inbound command");
                }
            }
            EngineEvent::Line(raw) => self.engine.handle_line(&raw),
            EngineEvent::TimerFired(handle) => self.engine.handle_timer(handle),
        }
    }
}
