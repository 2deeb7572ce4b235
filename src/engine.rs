//! Session lifecycle engine: session store, global lock, timer dispatch,
//! and the collection → finalize → download/expiry state machine.
//!
//! Every entry point runs to completion on the caller's thread; the engine
//! holds no locking primitive beyond the single busy flag. Timers and
//! subscriptions go through the injected [`Host`], terminal outcomes through
//! the injected [`Notifier`].

use std::collections::HashMap;
use std::time::Duration;

use crate::classify;
use crate::config::Config;
use crate::error::EngineError;
use crate::host::{Host, HookHandle};
use crate::model::{Session, SessionKind, SessionState};
use crate::notify::{Notifier, Outcome, Status};

/// Delay between seeing the search end marker and curating, absorbing result
/// lines still in flight after the marker.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Inbound service command, shell-token delimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search { session_id: String, query: String },
    Hot { session_id: String },
    Download { session_id: String, choice_id: String },
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        match tokens.as_slice() {
            ["search", session_id, query @ ..] if !query.is_empty() => Ok(Command::Search {
                session_id: session_id.to_string(),
                query: query.join(" "),
            }),
            ["search", ..] => Err(EngineError::Usage("search <session_id> <query>")),
            ["hot", session_id] => Ok(Command::Hot {
                session_id: session_id.to_string(),
            }),
            ["hot", ..] => Err(EngineError::Usage("hot <session_id>")),
            ["download", session_id, choice_id] => Ok(Command::Download {
                session_id: session_id.to_string(),
                choice_id: choice_id.to_string(),
            }),
            ["download", ..] => Err(EngineError::Usage("download <session_id> <choice_id>")),
            _ => Err(EngineError::Usage("expected search, hot, or download")),
        }
    }
}

enum TimerRole {
    Completion,
    Expiry,
}

pub struct Engine<H: Host, N: Notifier> {
    config: Config,
    host: H,
    notifier: N,
    sessions: HashMap<String, Session>,
    /// Global lock: at most one session between accept and finalize.
    busy: bool,
}

impl<H: Host, N: Notifier> Engine<H, N> {
    pub fn new(config: Config, host: H, notifier: N) -> Self {
        Self {
            config,
            host,
            notifier,
            sessions: HashMap::new(),
            busy: false,
        }
    }

    /// Parse and dispatch one inbound command line. A usage error leaves the
    /// engine untouched and sends nothing.
    pub fn handle_command(&mut self, input: &str) -> Result<(), EngineError> {
        match Command::parse(input)? {
            Command::Search { session_id, query } => self.search(&session_id, &query),
            Command::Hot { session_id } => self.hot(&session_id),
            Command::Download {
                session_id,
                choice_id,
            } => self.download(&session_id, &choice_id),
        }
        Ok(())
    }

    pub fn search(&mut self, session_id: &str, query: &str) {
        self.accept(session_id, SessionKind::Search, query);
    }

    pub fn hot(&mut self, session_id: &str) {
        self.accept(session_id, SessionKind::Hot, "");
    }

    fn accept(&mut self, session_id: &str, kind: SessionKind, query: &str) {
        if let Err(e) = self.try_accept(session_id, kind, query) {
            match e {
                EngineError::Busy => {
                    tracing::info!(%session_id, "rejecting request, another search is active");
                    self.notifier
                        .deliver(Outcome::rejected_busy(session_id, e.to_string()));
                }
                _ => {
                    tracing::error!(%session_id, error = %e, "aborting session at accept");
                    self.notifier
                        .deliver(Outcome::error(session_id, e.to_string()));
                }
            }
        }
    }

    fn try_accept(
        &mut self,
        session_id: &str,
        kind: SessionKind,
        query: &str,
    ) -> Result<(), EngineError> {
        if self.busy {
            return Err(EngineError::Busy);
        }
        self.busy = true;
        tracing::info!(%session_id, ?kind, %query, "search lock acquired, starting session");

        if !self.host.server_connected(&self.config.server) {
            self.release_lock();
            return Err(EngineError::ServerNotFound(self.config.server.clone()));
        }
        if !self.host.channel_open(&self.config.server, &self.config.channel) {
            self.release_lock();
            return Err(EngineError::ChannelNotFound(self.config.channel.clone()));
        }

        // A pending session may still hold this id; replace it rather than
        // leak its handles.
        if self.sessions.contains_key(session_id) {
            tracing::warn!(%session_id, "replacing live session with duplicate id");
            self.end_session(session_id);
        }

        let mut session = Session::new(session_id, kind, query);
        session.subscription = Some(self.host.subscribe(&self.config.server));
        match kind {
            SessionKind::Search => {
                self.host.send_line(
                    &self.config.server,
                    &self.config.channel,
                    &format!("!search {query}"),
                );
            }
            SessionKind::Hot => {
                // No end marker exists for hot lists; completion is the idle
                // timer going quiet.
                session.completion_timer = Some(self.host.arm_timer(self.config.hot_idle()));
                self.host
                    .send_line(&self.config.server, &self.config.channel, "!hot");
            }
        }
        self.sessions.insert(session_id.to_string(), session);
        Ok(())
    }

    /// Feed one raw scraped line to whichever session is collecting.
    /// Lines arriving with no subscribed session are dropped.
    pub fn handle_line(&mut self, raw: &str) {
        let clean = classify::strip_formatting(raw);
        let Some(id) = self
            .sessions
            .values()
            .find(|s| s.state == SessionState::Collecting && s.subscription.is_some())
            .map(|s| s.id.clone())
        else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&id) else {
            return;
        };

        match session.kind {
            SessionKind::Search => {
                if let Some(record) = classify::parse_result_line(&clean) {
                    session.records.push(record);
                }
                if classify::is_end_of_results(&clean) {
                    tracing::info!(session_id = %id, "end of search results detected");
                    // Unsubscribe now; the settle timer absorbs stragglers
                    // already in flight.
                    if let Some(handle) = session.subscription.take() {
                        self.host.unsubscribe(handle);
                    }
                    session.completion_timer = Some(self.host.arm_timer(SETTLE_DELAY));
                }
            }
            SessionKind::Hot => {
                let mut matched = false;
                if let Some(summary) = classify::parse_hot_header(&clean) {
                    tracing::debug!(session_id = %id, %summary, "matched hot header");
                    session.hot_summary = Some(summary);
                    matched = true;
                }
                if let Some(item) = classify::parse_hot_item(&clean) {
                    tracing::debug!(session_id = %id, filename = %item.filename, "matched hot item");
                    session.hot_items.push(item);
                    matched = true;
                }
                // One re-arm per observed line, even when the header and an
                // item both match.
                if matched {
                    if let Some(handle) = session.completion_timer.take() {
                        self.host.cancel_timer(handle);
                    }
                    session.completion_timer = Some(self.host.arm_timer(self.config.hot_idle()));
                }
            }
        }
    }

    /// Dispatch a timer fire to the session owning the handle. Fires for
    /// handles no live session owns are stale and ignored.
    pub fn handle_timer(&mut self, handle: HookHandle) {
        let mut target = None;
        for session in self.sessions.values() {
            if session.completion_timer == Some(handle) {
                target = Some((session.id.clone(), TimerRole::Completion));
                break;
            }
            if session.expiry_timer == Some(handle) {
                target = Some((session.id.clone(), TimerRole::Expiry));
                break;
            }
        }
        match target {
            Some((id, TimerRole::Completion)) => self.finalize(&id),
            Some((id, TimerRole::Expiry)) => self.expire(&id),
            None => {}
        }
    }

    fn finalize(&mut self, session_id: &str) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::error!(%session_id, "finalize fired for an ended session");
            // The lock must not outlive a vanished session.
            self.release_lock();
            return;
        };

        // Teardown before curation: nothing may append after this point.
        if let Some(handle) = session.subscription.take() {
            self.host.unsubscribe(handle);
        }
        if let Some(handle) = session.completion_timer.take() {
            self.host.cancel_timer(handle);
        }

        match session.kind {
            SessionKind::Search => {
                session.curate();
                if session.choices.is_empty() {
                    let outcome = Outcome::search(
                        session.id.as_str(),
                        Status::NoResults,
                        format!("Search for '{}' yielded no results.", session.query),
                        None,
                    );
                    self.notifier.deliver(outcome);
                    self.end_session(session_id);
                } else {
                    let outcome = Outcome::search(
                        session.id.as_str(),
                        Status::Success,
                        format!("Found {} choices.", session.choices.len()),
                        Some(session.choices.clone()),
                    );
                    session.state = SessionState::PendingDownload;
                    session.expiry_timer = Some(self.host.arm_timer(self.config.session_timeout()));
                    self.notifier.deliver(outcome);
                }
            }
            SessionKind::Hot => {
                let outcome = if session.hot_items.is_empty() {
                    Outcome::hot(session.id.as_str(), Status::NoResults, None, None)
                } else {
                    Outcome::hot(
                        session.id.as_str(),
                        Status::Success,
                        session.hot_summary.clone(),
                        Some(session.hot_items.clone()),
                    )
                };
                self.notifier.deliver(outcome);
                self.end_session(session_id);
            }
        }
        self.release_lock();
    }

    pub fn download(&mut self, session_id: &str, choice_id: &str) {
        match self.try_download(session_id, choice_id) {
            Ok(filename) => {
                let message =
                    format!("Download command for '{filename}' (Choice #{choice_id}) sent to IRC.");
                self.notifier
                    .deliver(Outcome::download(session_id, Status::Success, message));
                self.end_session(session_id);
            }
            Err(e) => {
                // An invalid choice leaves the session alive with its expiry
                // timer still running.
                tracing::info!(%session_id, error = %e, "download request failed");
                self.notifier
                    .deliver(Outcome::download(session_id, Status::Error, e.to_string()));
            }
        }
    }

    fn try_download(&mut self, session_id: &str, choice_id: &str) -> Result<String, EngineError> {
        let session = self
            .sessions
            .get(session_id)
            .filter(|s| s.kind == SessionKind::Search && s.state == SessionState::PendingDownload)
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;
        let invalid_choice = || EngineError::InvalidChoice {
            session_id: session_id.to_string(),
            choice_id: choice_id.to_string(),
        };
        let choice: usize = choice_id.parse().map_err(|_| invalid_choice())?;
        let (directive, filename) = session.download_directive(choice).ok_or_else(invalid_choice)?;
        let directive = directive.to_string();
        let filename = filename.to_string();

        if !self.host.channel_open(&self.config.server, &self.config.channel) {
            return Err(EngineError::ChannelNotFound(self.config.channel.clone()));
        }
        tracing::info!(%session_id, choice, %directive, "sending download directive");
        self.host
            .send_line(&self.config.server, &self.config.channel, &directive);
        Ok(filename)
    }

    fn expire(&mut self, session_id: &str) {
        if !self.sessions.contains_key(session_id) {
            return;
        }
        tracing::info!(%session_id, "session expired");
        self.notifier.deliver(Outcome::expired(
            session_id,
            "This search session has expired due to inactivity.",
        ));
        self.end_session(session_id);
    }

    /// Unhook every handle the session owns and drop it from the store.
    /// Ending an absent or already-ended session is a no-op.
    pub fn end_session(&mut self, session_id: &str) {
        let Some(mut session) = self.sessions.remove(session_id) else {
            return;
        };
        if let Some(handle) = session.subscription.take() {
            self.host.unsubscribe(handle);
        }
        if let Some(handle) = session.completion_timer.take() {
            self.host.cancel_timer(handle);
        }
        if let Some(handle) = session.expiry_timer.take() {
            self.host.cancel_timer(handle);
        }
        tracing::info!(%session_id, "session ended");
    }

    /// Terminate every live session and release the lock. Used by the
    /// embedding host on unload.
    pub fn shutdown(&mut self) {
        let ids: Vec<String> = self.sessions.keys().cloned().collect();
        tracing::info!(count = ids.len(), "shutting down, terminating live sessions");
        for id in ids {
            self.end_session(&id);
        }
        self.release_lock();
    }

    fn release_lock(&mut self) {
        if self.busy {
            self.busy = false;
            tracing::info!("search lock released");
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_search_joins_query_tokens() {
        let command = Command::parse("search sid-1 some show 1080p").unwrap();
        assert_eq!(
            command,
            Command::Search {
                session_id: "sid-1".to_string(),
                query: "some show 1080p".to_string(),
            }
        );
    }

    #[test]
    fn parse_hot_takes_exactly_one_argument() {
        assert_eq!(
            Command::parse("hot sid-2").unwrap(),
            Command::Hot {
                session_id: "sid-2".to_string(),
            }
        );
        assert!(matches!(
            Command::parse("hot"),
            Err(EngineError::Usage(_))
        ));
        assert!(matches!(
            Command::parse("hot sid-2 extra"),
            Err(EngineError::Usage(_))
        ));
    }

    #[test]
    fn parse_download_takes_exactly_two_arguments() {
        assert_eq!(
            Command::parse("download sid-3 2").unwrap(),
            Command::Download {
                session_id: "sid-3".to_string(),
                choice_id: "2".to_string(),
            }
        );
        assert!(matches!(
            Command::parse("download sid-3"),
            Err(EngineError::Usage(_))
        ));
    }

    #[test]
    fn parse_rejects_missing_query_and_unknown_verbs() {
        assert!(matches!(
            Command::parse("search sid-1"),
            Err(EngineError::Usage(_))
        ));
        assert!(matches!(Command::parse(""), Err(EngineError::Usage(_))));
        assert!(matches!(
            Command::parse("frobnicate sid-1"),
            Err(EngineError::Usage(_))
        ));
    }
}
