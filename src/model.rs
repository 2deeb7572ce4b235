use serde::Serialize;

use crate::host::HookHandle;

/// One raw result parsed from `!search` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub grabs: u64,
    pub size: String,
    /// Dedup key for curation.
    pub filename: String,
    /// Verbatim transfer command, opaque to the engine.
    pub directive: String,
}

/// A curated, user-facing download option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub choice_id: usize,
    pub filename: String,
    pub size: String,
}

/// One `!hot` list entry, passed through uncurated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotItem {
    pub grabs: u64,
    pub category: String,
    pub size: String,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Search,
    Hot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Subscribed to the line stream, accumulating records.
    Collecting,
    /// Search only: finalized with choices, awaiting a download or expiry.
    PendingDownload,
}

/// One tracked unit of work, keyed by an externally supplied id.
///
/// The session owns its timer and subscription handles exclusively; they are
/// unhooked exactly once, when the session is removed from the store.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub kind: SessionKind,
    /// Search only; empty for hot sessions.
    pub query: String,
    pub state: SessionState,
    pub records: Vec<Record>,
    pub choices: Vec<Choice>,
    pub hot_summary: Option<String>,
    pub hot_items: Vec<HotItem>,
    pub subscription: Option<HookHandle>,
    /// Search settle timer or hot idle timer, depending on kind.
    pub completion_timer: Option<HookHandle>,
    pub expiry_timer: Option<HookHandle>,
}

impl Session {
    pub fn new(id: impl Into<String>, kind: SessionKind, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            query: query.into(),
            state: SessionState::Collecting,
            records: Vec::new(),
            choices: Vec::new(),
            hot_summary: None,
            hot_items: Vec::new(),
            subscription: None,
            completion_timer: None,
            expiry_timer: None,
        }
    }

    /// Curate raw records into the numbered choice list: sort by grabs
    /// descending (stable), collapse to unique filenames in post-sort order,
    /// keep the best record's size, number from 1.
    pub fn curate(&mut self) {
        self.records.sort_by(|a, b| b.grabs.cmp(&a.grabs));
        self.choices.clear();
        for record in &self.records {
            if self.choices.iter().any(|c| c.filename == record.filename) {
                continue;
            }
            self.choices.push(Choice {
                choice_id: self.choices.len() + 1,
                filename: record.filename.clone(),
                size: record.size.clone(),
            });
        }
    }

    /// Resolve a 1-based choice id to the transfer directive and filename of
    /// the highest-grabs record sharing the choice's filename.
    pub fn download_directive(&self, choice_id: usize) -> Option<(&str, &str)> {
        let choice = self.choices.iter().find(|c| c.choice_id == choice_id)?;
        let mut best: Option<&Record> = None;
        for record in &self.records {
            if record.filename != choice.filename {
                continue;
            }
            // strictly greater keeps the first-seen record on ties
            if best.is_none_or(|b| record.grabs > b.grabs) {
                best = Some(record);
            }
        }
        best.map(|r| (r.directive.as_str(), choice.filename.as_str()))
    }
}
