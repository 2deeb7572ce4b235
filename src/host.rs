use std::time::Duration;

/// Opaque identifier for a timer or stream subscription armed through a
/// [`Host`]. Handles are never reused while the arming session is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(pub u64);

/// Capability surface the engine needs from its embedding chat client.
///
/// The engine never talks to a scheduler or an IRC connection directly; it
/// arms timers and subscriptions here and gets told about fires and lines
/// through its own entry points. Cancelling or unsubscribing a handle that is
/// no longer armed must be a no-op.
pub trait Host {
    /// Is the named server identity present and connected?
    fn server_connected(&mut self, server: &str) -> bool;

    /// Is the channel joined on that server?
    fn channel_open(&mut self, server: &str, channel: &str) -> bool;

    /// Write one line verbatim to a channel.
    fn send_line(&mut self, server: &str, channel: &str, line: &str);

    /// Arm a one-shot timer. The fire is reported back to the engine as a
    /// timer event carrying this handle.
    fn arm_timer(&mut self, after: Duration) -> HookHandle;

    fn cancel_timer(&mut self, handle: HookHandle);

    /// Start receiving the server's notice lines. Delivery happens through
    /// the engine's line entry point; the handle only scopes teardown.
    fn subscribe(&mut self, server: &str) -> HookHandle;

    fn unsubscribe(&mut self, handle: HookHandle);
}
