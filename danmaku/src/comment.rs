/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Operates on individual comments.
//!
//! # Overview
//!
//! A comment is the most fundamental data structure within a danmaku stream. Each one is
//! attached to a point on the video's timeline and is displayed in one of several modes.
//!
//! Comments pass through two shapes:
//!
//! 1. [`RawComment`], exactly as a reader decoded it from the wire.
//! 2. [`Comment`], validated and clamped by the normalizer.
//!
//! The modes a comment can take are:
//!
//! - Scrolling from right to left, the common case.
//! - Scrolling from left to right, either as a scroll variant or as a reverse comment.
//! - Fixed to the top or to the bottom of the screen.
//! - Advanced, where the text carries its own motion script.

#[cfg(test)]
pub(crate) mod tests;

use super::config::{ConfigError, ConfigResult};

/// The time offset of a record as it appeared on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
    /// Floating point seconds, as used by the version 1 XML layout.
    Seconds(f64),
    /// Integer milliseconds, as used by the version 2 XML layout and by Protobuf segments.
    Millis(i64),
}

impl Default for Progress {
    fn default() -> Self { Self::Millis(0) }
}

impl Progress {

    /// Returns the offset in seconds without any clamping.
    pub fn seconds(&self) -> f64 {
        match *self {
            Progress::Seconds(seconds) => seconds,
            Progress::Millis(millis) => millis as f64 / 1000.0,
        }
    }
}

/// A comment record as decoded by a reader, before any validation has taken place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawComment {
    /// When the comment appears relative to the start of the video.
    pub progress: Progress,
    /// The numeric mode code from the wire.
    pub mode: i32,
    /// The font size from the wire, where 25 is the nominal size.
    pub font_size: i32,
    /// The decimal RGB color from the wire. This may be out of range.
    pub color: i64,
    /// The Unix timestamp at which the comment was sent.
    pub timestamp: i64,
    /// The numeric pool code from the wire.
    pub pool: i32,
    /// The hash identifying the sender.
    pub sender: String,
    /// The row ID assigned by the server.
    pub row_id: i64,
    /// The priority weight, only carried by Protobuf segments.
    pub weight: Option<i32>,
    /// The attribute bitmask, only carried by Protobuf segments.
    pub attributes: i32,
    /// The comment text, or the motion script of an advanced comment.
    pub content: String,
}

/// Attribute bit marking a comment that uses advanced positioning.
pub const ATTRIBUTE_ADVANCED: i32 = 1 << 3;

/// Defines how a comment moves across the screen.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Mode {
    /// Enters from the right edge and leaves through the left edge.
    ScrollRightToLeft,
    /// Enters from the left edge and leaves through the right edge.
    ScrollLeftToRight,
    /// Stays centered at the top of the screen.
    Top,
    /// Stays centered at the bottom of the screen.
    Bottom,
    /// Scrolls against the usual direction, from left to right.
    Reverse,
    /// Carries its own placement and animation script.
    Advanced,
}

impl Mode {

    /// Maps a wire mode code onto a mode. Codes for script and BAS comments, along with
    /// anything unknown, have no mode.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 | 3 => Some(Mode::ScrollRightToLeft),
            2 => Some(Mode::ScrollLeftToRight),
            4 => Some(Mode::Bottom),
            5 => Some(Mode::Top),
            6 => Some(Mode::Reverse),
            7 => Some(Mode::Advanced),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Mode::ScrollRightToLeft => 1,
            Mode::ScrollLeftToRight => 2,
            Mode::Bottom => 4,
            Mode::Top => 5,
            Mode::Reverse => 6,
            Mode::Advanced => 7,
        }
    }
}

/// The provenance of a comment.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Pool {
    /// An ordinary viewer comment.
    Normal,
    /// A comment from the subtitle pool.
    Subtitle,
    /// A comment from the special pool. These always receive advanced handling.
    Special,
}

impl Default for Pool {
    fn default() -> Self { Self::Normal }
}

impl Pool {

    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Pool::Subtitle,
            2 => Pool::Special,
            _ => Pool::Normal,
        }
    }
}

/// A validated comment.
///
/// Comments are immutable once the normalizer has produced them. They are totally ordered by
/// `arrival_time` and then by `sequence_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct Comment {
    /// Seconds from the start of the video. This is never negative.
    pub arrival_time: f64,
    pub mode: Mode,
    /// The font size in pixels before scaling, where 25 is the nominal size.
    pub font_size: u32,
    /// A 24-bit RGB color.
    pub color: u32,
    /// The text to display, with real line breaks. For advanced comments this is the same as
    /// `raw_params`.
    pub content: String,
    pub pool: Pool,
    /// The position of the record within the concatenated input stream.
    pub sequence_id: u64,
    /// The motion script of an advanced comment.
    pub raw_params: Option<String>,
    pub weight: Option<i32>,
    pub row_id: i64,
    pub timestamp: i64,
}

impl Comment {

    /// The number of lines the content occupies.
    pub fn line_count(&self) -> usize {
        self.content.split('\n').count()
    }
}

/// Estimates the width of the widest line of `text`, in ems.
///
/// ASCII characters count as half an em; everything else counts as a full em.
pub fn text_width_ems(text: &str) -> f64 {
    text.split('\n')
        .map(|line| {
            line.chars()
                .map(|c| if c.is_ascii() { 0.5 } else { 1.0 })
                .sum::<f64>()
        })
        .fold(0.0, f64::max)
}

/// The pixel dimensions of the video the subtitles are drawn over.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Canvas {
    width: u32,
    height: u32,
}

impl Canvas {

    pub fn new(width: u32, height: u32) -> ConfigResult<Self> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidCanvas { width, height })
        }
        Ok(Canvas { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
