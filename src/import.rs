//! Bulk-import mini-language.
//!
//! One mission per line of free text. Markers, in the order they are
//! stripped: a trailing `- <priority>` (case-insensitive), an `@token` due
//! date (`@today`, `@tomorrow`, `@nextweek`, or a literal `YYYY-MM-DD`),
//! and a trailing `#notes`. Whatever survives is the title; a line whose
//! title ends up empty produces nothing.

use chrono::{Duration, NaiveDate};

use crate::fields::{parse_priority, Priority};
use crate::mission::CreateMissionInput;

/// Parse a pasted block into mission inputs, one per usable line.
pub fn parse_block(text: &str, today: NaiveDate) -> Vec<CreateMissionInput> {
    text.lines()
        .filter_map(|line| parse_line(line, today))
        .collect()
}

/// Parse a single line. Returns `None` for blank lines and lines whose
/// title is empty once the markers are stripped.
pub fn parse_line(line: &str, today: NaiveDate) -> Option<CreateMissionInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (rest, priority) = strip_priority_marker(line);
    let (rest, due_date) = strip_date_marker(&rest, today);
    let (title, notes) = split_notes_marker(&rest);

    let title = title.trim().to_string();
    if title.is_empty() {
        return None;
    }
    Some(CreateMissionInput {
        title,
        notes,
        priority: Some(priority.unwrap_or(Priority::Medium)),
        due_date,
        ..CreateMissionInput::default()
    })
}

/// Strip a trailing `- urgent|high|medium|low`, any case.
fn strip_priority_marker(line: &str) -> (String, Option<Priority>) {
    let trimmed = line.trim_end();
    for name in ["urgent", "high", "medium", "low"] {
        if trimmed.len() < name.len() {
            continue;
        }
        let split = trimmed.len() - name.len();
        if !trimmed.is_char_boundary(split)
            || !trimmed.as_bytes()[split..].eq_ignore_ascii_case(name.as_bytes())
        {
            continue;
        }
        let head = trimmed[..split].trim_end();
        if let Some(head) = head.strip_suffix('-') {
            return (head.trim_end().to_string(), parse_priority(name));
        }
    }
    (trimmed.to_string(), None)
}

/// Strip the first `@token`. Recognized tokens become the due date;
/// an unrecognized token is still removed so it never pollutes the title.
fn strip_date_marker(line: &str, today: NaiveDate) -> (String, Option<NaiveDate>) {
    let Some(at) = line.find('@') else {
        return (line.to_string(), None);
    };
    let after = line[at + 1..].trim_start();
    let token: String = after.chars().take_while(|c| !c.is_whitespace()).collect();
    let consumed = (line[at + 1..].len() - after.len()) + token.len() + 1;
    let mut rest = String::with_capacity(line.len());
    rest.push_str(&line[..at]);
    rest.push_str(&line[at + consumed..]);

    let due = match token.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "nextweek" | "next-week" => Some(today + Duration::days(7)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
    };
    (rest.trim().to_string(), due)
}

/// Split a `#notes` suffix off the line, if present.
fn split_notes_marker(line: &str) -> (String, Option<String>) {
    match line.find('#') {
        Some(hash) => {
            let notes = line[hash + 1..].trim();
            let notes = (!notes.is_empty()).then(|| notes.to_string());
            (line[..hash].trim_end().to_string(), notes)
        }
        None => (line.to_string(), None),
    }
}
