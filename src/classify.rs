//! Stateless classification of scraped bot output lines.
//!
//! One decolorized line goes in, at most one structured record comes out.
//! The four shapes are independent; anything else is silently ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{HotItem, Record};

/// Separator used when joining the two hot-list header segments.
pub const HOT_SUMMARY_SEPARATOR: &str = " ¦ ";

// ( 1x [2.3G] Some.File.Name.mkv ) (/msg Bot xdcc send #123)
static RESULT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*(\d+)x\s*\[(.*?)]\s*(.*?)\s*\)\s*\(\s*(/msg\s+.*?xdcc\s+send\s+#\d+)\s*\).*")
        .unwrap()
});

// ( 6 Results Found - 64 Gets )
static END_OF_RESULTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\( (\d+) Result(s)? Found - \d+ Gets \)").unwrap());

// #THE.SOURCE - ALL SECTIONS ¦ TOP GETS OF THE LAST 2 DAYS ¦ 536 NEW RELEASES, 4481 GETS
static HOT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#THE\.SOURCE.*?¦\s*(.*?)\s*¦\s*(.*)").unwrap());

// 68x | TV-X265 [564M] Squid.Game.S03E01.1080p.HEVC.x265-MeGusta
static HOT_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)x\s*\|\s+([\w\.-]+)\s+\[(.*?)]\s+(.*)").unwrap());

// mIRC formatting bytes: bold, color (with optional fg,bg digits), reset,
// reverse, italic, underline.
static IRC_FORMATTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[\u{02}\u{0f}\u{16}\u{1d}\u{1f}]|\u{03}(?:\\d{1,2}(?:,\\d{1,2})?)?").unwrap()
});

/// Remove terminal escape sequences and IRC formatting bytes from a raw
/// scraped line. Classification expects its input to have gone through this.
pub fn strip_formatting(line: &str) -> String {
    let stripped = strip_ansi_escapes::strip(line.as_bytes());
    let text = String::from_utf8_lossy(&stripped);
    IRC_FORMATTING.replace_all(&text, "").into_owned()
}

/// Parse one line of `!search` output into a raw result record.
pub fn parse_result_line(line: &str) -> Option<Record> {
    let caps = RESULT_LINE.captures(line)?;
    Some(Record {
        grabs: caps[1].parse().ok()?,
        size: caps[2].trim().to_string(),
        filename: caps[3].trim().to_string(),
        directive: caps[4].trim().to_string(),
    })
}

/// Does this line mark the end of `!search` output?
pub fn is_end_of_results(line: &str) -> bool {
    END_OF_RESULTS.is_match(line)
}

/// Parse the `!hot` header line into its joined summary string.
pub fn parse_hot_header(line: &str) -> Option<String> {
    let caps = HOT_HEADER.captures(line)?;
    Some(format!(
        "{}{}{}",
        caps[1].trim(),
        HOT_SUMMARY_SEPARATOR,
        caps[2].trim()
    ))
}

/// Parse one `!hot` item line.
pub fn parse_hot_item(line: &str) -> Option<HotItem> {
    let caps = HOT_ITEM.captures(line)?;
    Some(HotItem {
        grabs: caps[1].parse().ok()?,
        category: caps[2].trim().to_string(),
        size: caps[3].trim().to_string(),
        filename: caps[4].trim().to_string(),
    })
}
