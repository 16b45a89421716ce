/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Turns raw records into validated comments.


use super::comment::{Comment, Mode, Pool, RawComment, ATTRIBUTE_ADVANCED};
use std::cmp::Ordering;
use tracing::trace;

/// The wire font size that is drawn at the configured nominal size.
pub const NOMINAL_FONT_SIZE: u32 = 25;

/// The largest font size a comment may request.
pub const MAX_FONT_SIZE: u32 = 127;

/// The largest 24-bit RGB value.
pub const MAX_COLOR: u32 = 0xFF_FF_FF;

/// The latest arrival time in seconds. Later times are clamped to it, which keeps every
/// on-screen duration representable on top of an arrival time.
pub const MAX_ARRIVAL_TIME: f64 = 1e9;

/// The outcome of normalizing a stream of records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    /// Comments ordered by arrival time and then by sequence ID.
    pub comments: Vec<Comment>,
    /// Number of records that could not be turned into a comment.
    pub dropped: usize,
}

/// Normalizes every record, numbering them by their position in `records`.
pub fn normalize_comments(records: Vec<RawComment>) -> Normalized {

    let mut comments = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (sequence_id, record) in records.into_iter().enumerate() {
        match normalize_comment(record, sequence_id as u64) {
            Some(comment) => comments.push(comment),
            None => {
                trace!(sequence_id, "dropping record that cannot be normalized");
                dropped += 1;
            }
        }
    }

    comments.sort_by(compare_order);

    Normalized { comments, dropped }
}

/// The processing order: arrival time, then sequence ID.
pub fn compare_order(a: &Comment, b: &Comment) -> Ordering {
    a.arrival_time.total_cmp(&b.arrival_time).then(a.sequence_id.cmp(&b.sequence_id))
}

/// Validates a single record.
///
/// Returns `None` when the record lacks something a comment cannot do without: a finite time,
/// a known mode, or any text.
pub fn normalize_comment(record: RawComment, sequence_id: u64) -> Option<Comment> {

    let seconds = record.progress.seconds();

    if !seconds.is_finite() {
        return None
    }

    let arrival_time = if seconds > 0.0 { seconds.min(MAX_ARRIVAL_TIME) } else { 0.0 };
    let pool = Pool::from_code(record.pool);
    let nominal_mode = Mode::from_code(record.mode)?;
    let mode = if pool == Pool::Special || record.attributes & ATTRIBUTE_ADVANCED != 0 {
        Mode::Advanced
    } else {
        nominal_mode
    };
    let font_size = if record.font_size <= 0 {
        NOMINAL_FONT_SIZE
    } else {
        (record.font_size as u32).min(MAX_FONT_SIZE)
    };
    let color = record.color.clamp(0, MAX_COLOR as i64) as u32;
    let (content, raw_params) = match mode {
        Mode::Advanced => {
            let raw_params = record.content.trim().to_string();
            (raw_params.clone(), Some(raw_params))
        }
        _ => (unescape_text(&record.content), None),
    };

    if content.trim().is_empty() {
        return None
    }

    Some(
        Comment {
            arrival_time,
            mode,
            font_size,
            color,
            content,
            pool,
            sequence_id,
            raw_params,
            weight: record.weight,
            row_id: record.row_id,
            timestamp: record.timestamp,
        }
    )
}

/// Turns literal line break escapes into real line breaks and strips control characters.
///
/// Both a backslash followed by `n` and the legacy `/n` count as line breaks.
pub fn unescape_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace("\\n", "\n")
        .replace("/n", "\n")
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .collect()
}
