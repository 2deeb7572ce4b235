//! Webhook notification of terminal session outcomes.
//!
//! Delivery is at-most-once and best-effort: the engine's state transition
//! is committed before `deliver` is called and is never rolled back, no
//! matter what happens to the HTTP request. Failures are logged, never
//! retried, never surfaced to the remote caller.

use std::thread;
use std::time::Duration;

use serde::Serialize;

use crate::model::{Choice, HotItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoResults,
    RejectedBusy,
    Error,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResultsPayload {
    pub session_id: String,
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Choice>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotResultsPayload {
    pub session_id: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<HotItem>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadStatusPayload {
    pub session_id: String,
    pub status: Status,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionExpiredPayload {
    pub session_id: String,
    pub status: Status,
    pub message: String,
}

/// One terminal outcome, tagged by destination endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    SearchResults(SearchResultsPayload),
    HotResults(HotResultsPayload),
    DownloadStatus(DownloadStatusPayload),
    SessionExpired(SessionExpiredPayload),
}

impl Outcome {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Outcome::SearchResults(_) => "search_results",
            Outcome::HotResults(_) => "hot_results",
            Outcome::DownloadStatus(_) => "download_status",
            Outcome::SessionExpired(_) => "session_expired",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            Outcome::SearchResults(p) => &p.session_id,
            Outcome::HotResults(p) => &p.session_id,
            Outcome::DownloadStatus(p) => &p.session_id,
            Outcome::SessionExpired(p) => &p.session_id,
        }
    }

    pub fn search(
        session_id: impl Into<String>,
        status: Status,
        message: impl Into<String>,
        choices: Option<Vec<Choice>>,
    ) -> Self {
        Outcome::SearchResults(SearchResultsPayload {
            session_id: session_id.into(),
            status,
            message: message.into(),
            choices,
        })
    }

    /// Busy rejections ride the search_results endpoint so the frontend
    /// handles them uniformly.
    pub fn rejected_busy(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::search(session_id, Status::RejectedBusy, message, None)
    }

    /// Generic engine error, also delivered on the search_results endpoint.
    pub fn error(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::search(session_id, Status::Error, message, None)
    }

    pub fn hot(
        session_id: impl Into<String>,
        status: Status,
        summary: Option<String>,
        items: Option<Vec<HotItem>>,
    ) -> Self {
        Outcome::HotResults(HotResultsPayload {
            session_id: session_id.into(),
            status,
            summary,
            items,
        })
    }

    pub fn download(
        session_id: impl Into<String>,
        status: Status,
        message: impl Into<String>,
    ) -> Self {
        Outcome::DownloadStatus(DownloadStatusPayload {
            session_id: session_id.into(),
            status,
            message: message.into(),
        })
    }

    pub fn expired(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Outcome::SessionExpired(SessionExpiredPayload {
            session_id: session_id.into(),
            status: Status::Expired,
            message: message.into(),
        })
    }
}

/// Outbound sink for terminal outcomes. At-most-once, fire-and-forget.
pub trait Notifier {
    fn deliver(&mut self, outcome: Outcome);
}

/// Production notifier: JSON POST to `<base_url>/<endpoint>` with a hard
/// timeout, sent from a spawned thread. Completion is logged keyed by
/// session id.
pub struct HttpNotifier {
    base_url: String,
    timeout: Duration,
}

impl HttpNotifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

impl Notifier for HttpNotifier {
    fn deliver(&mut self, outcome: Outcome) {
        if self.base_url.is_empty() {
            tracing::error!("webhook base URL is not configured, dropping notification");
            return;
        }
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            outcome.endpoint()
        );
        let session_id = outcome.session_id().to_string();
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        tracing::info!(%session_id, %url, "sending webhook");
        thread::spawn(move || match agent.post(&url).send_json(&outcome) {
            Ok(_) => tracing::info!(%session_id, "webhook delivered"),
            Err(e) => tracing::error!(%session_id, error = %e, "webhook delivery failed"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_success_serializes_choices() {
        let outcome = Outcome::search(
            "sid-1",
            Status::Success,
            "Found 1 choices.",
            Some(vec![Choice {
                choice_id: 1,
                filename: "A".to_string(),
                size: "1.2G".to_string(),
            }]),
        );
        assert_eq!(outcome.endpoint(), "search_results");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["session_id"], "sid-1");
        assert_eq!(json["status"], "success");
        assert_eq!(json["choices"][0]["choice_id"], 1);
        assert_eq!(json["choices"][0]["filename"], "A");
    }

    #[test]
    fn search_no_results_omits_choices_field() {
        let outcome = Outcome::search("sid-1", Status::NoResults, "nothing", None);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("choices"));
        assert!(json.contains("no_results"));
    }

    #[test]
    fn rejected_busy_rides_search_results_endpoint() {
        let outcome = Outcome::rejected_busy("sid-2", "busy");
        assert_eq!(outcome.endpoint(), "search_results");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected_busy");
    }

    #[test]
    fn hot_payload_omits_absent_summary_and_items() {
        let outcome = Outcome::hot("sid-3", Status::NoResults, None, None);
        assert_eq!(outcome.endpoint(), "hot_results");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(!json.contains("summary"));
        assert!(!json.contains("items"));
    }

    #[test]
    fn hot_success_serializes_items() {
        let outcome = Outcome::hot(
            "sid-3",
            Status::Success,
            Some("TOP GETS ¦ 12 GETS".to_string()),
            Some(vec![HotItem {
                grabs: 68,
                category: "TV-X265".to_string(),
                size: "564M".to_string(),
                filename: "file".to_string(),
            }]),
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["items"][0]["grabs"], 68);
        assert_eq!(json["items"][0]["category"], "TV-X265");
    }

    #[test]
    fn expired_payload_has_expired_status() {
        let outcome = Outcome::expired("sid-4", "gone");
        assert_eq!(outcome.endpoint(), "session_expired");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "expired");
        assert_eq!(json["message"], "gone");
    }

    #[test]
    fn download_payload_shape() {
        let outcome = Outcome::download("sid-5", Status::Error, "bad choice");
        assert_eq!(outcome.endpoint(), "download_status");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "bad choice");
    }
}
