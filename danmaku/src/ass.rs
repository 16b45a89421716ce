/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Writes positioned comments as an Advanced SubStation Alpha document.
//!
//! # Overview
//!
//! A document consists of three sections:
//!
//! 1. `[Script Info]`, declaring the script type and the canvas resolution.
//! 2. `[V4+ Styles]`, holding the single style every event uses.
//! 3. `[Events]`, holding one `Dialogue` line per comment.
//!
//! Each event carries its geometry as override tags at the start of its text. Scroll comments
//! move linearly from just beyond one edge to just beyond the other, fixed comments are
//! positioned at their lane, and advanced comments carry whatever the motion interpreter
//! resolved.
//!
//! Output depends on nothing but the arguments, so identical input always produces identical
//! bytes.


use super::{
    comment::Canvas,
    config::ConversionConfig,
    lane::{Anchor, Direction, Placement, PositionedComment},
    motion::{Ease, Motion, MotionCommand, Rotation},
    normalize::MAX_COLOR,
};
use std::io::{Error as IoError, Write};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for document-writing operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// The error type for [`WriteAssExt`].
#[derive(ThisError, Debug)]
pub enum WriteError {
    /// The document could not be written because of an underlying I/O error.
    #[error("document IO error")]
    IoError {
        #[from]
        source: IoError,
    },
}

/// Allows writing an ASS document to a destination.
pub trait WriteAssExt {
    /// Writes the header, the style, and one event per comment, in the order given.
    fn write_ass(
        &mut self,
        comments: &[PositionedComment],
        canvas: &Canvas,
        config: &ConversionConfig,
    ) -> WriteResult<()>;
}

impl<T> WriteAssExt for T where
    T: Write,
{

    fn write_ass(
        &mut self,
        comments: &[PositionedComment],
        canvas: &Canvas,
        config: &ConversionConfig,
    ) -> WriteResult<()> {

        write_header(self, canvas, config)?;

        for comment in comments.iter() {
            self.write_all(event_line(comment, canvas, config).as_bytes())?;
        }

        Ok(())
    }
}

fn write_header<W: Write + ?Sized>(
    output: &mut W,
    canvas: &Canvas,
    config: &ConversionConfig,
) -> WriteResult<()> {

    let alpha = style_alpha(config.text_opacity);
    let size = round(config.font_size);
    let outline = round((config.font_size / 25.0).max(1.0));

    write!(
        output,
        "[Script Info]\n\
        ; Script generated by danmaku2ass\n\
        ScriptType: v4.00+\n\
        PlayResX: {width}\n\
        PlayResY: {height}\n\
        Aspect Ratio: {width}:{height}\n\
        Collisions: Normal\n\
        WrapStyle: 2\n\
        ScaledBorderAndShadow: yes\n\
        \n\
        [V4+ Styles]\n\
        Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
        BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
        BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
        Style: {name}, {font}, {size}, &H{alpha:02X}FFFFFF, &H{alpha:02X}FFFFFF, \
        &H{alpha:02X}000000, &H{alpha:02X}000000, 0, 0, 0, 0, 100, 100, 0.00, 0.00, 1, \
        {outline}, 0, 7, 0, 0, 0, 0\n\
        \n\
        [Events]\n\
        Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n",
        width = canvas.width(),
        height = canvas.height(),
        name = config.style_name,
        font = config.font_face,
        size = size,
        alpha = alpha,
        outline = outline,
    )?;

    Ok(())
}

/// Renders the `Dialogue` line of a single comment, including its trailing line break.
pub fn event_line(comment: &PositionedComment, canvas: &Canvas, config: &ConversionConfig) -> String {

    let (tags, text) = match &comment.placement {
        Placement::Advanced(motion) => {
            (advanced_tags(comment, motion, canvas, config), advanced_text(motion))
        }
        placement => {
            (lane_tags(comment, placement, canvas, config), escape_text(&comment.comment.content))
        }
    };

    format!(
        "Dialogue: {layer},{start},{end},{style},,0000,0000,0000,,{{{tags}}}{text}\n",
        layer = comment.layer,
        start = format_timestamp(comment.arrival_time()),
        end = format_timestamp(comment.exit_time),
        style = config.style_name,
        tags = tags,
        text = text,
    )
}

fn lane_tags(
    comment: &PositionedComment,
    placement: &Placement,
    canvas: &Canvas,
    config: &ConversionConfig,
) -> String {

    let width = canvas.width() as i64;
    let mut tags = match placement {
        Placement::Scroll { direction, y, text_width } => {
            let offscreen = -(text_width.ceil() as i64);
            let y = round(*y);
            match direction {
                Direction::Leftward => format!("\\move({}, {}, {}, {})", width, y, offscreen, y),
                Direction::Rightward => format!("\\move({}, {}, {}, {})", offscreen, y, width, y),
            }
        }
        Placement::Fixed { anchor: Anchor::Top, y } => {
            format!("\\an8\\pos({}, {})", width / 2, round(*y))
        }
        Placement::Fixed { anchor: Anchor::Bottom, y } => {
            format!("\\an2\\pos({}, {})", width / 2, round(*y))
        }
        Placement::Advanced(_) => String::new(),
    };

    if round(comment.size) != round(config.font_size) {
        tags.push_str(&format!("\\fs{}", round(comment.size)));
    }

    tags.push_str(&color_tags(comment.comment.color, ColorSpaceHint::for_canvas(canvas)));

    tags
}

fn advanced_tags(
    comment: &PositionedComment,
    motion: &Motion,
    canvas: &Canvas,
    config: &ConversionConfig,
) -> String {

    let mut tags = String::new();

    for command in motion.commands.iter() {
        tags.push_str(&command_tag(command));
    }

    if !motion.border {
        tags.push_str("\\bord0");
    }
    if let Some(face) = &motion.font_face {
        tags.push_str(&format!("\\fn{}", escape_tag_argument(face)));
    }
    if round(motion.font_size) != round(config.font_size) {
        tags.push_str(&format!("\\fs{}", round(motion.font_size)));
    }

    tags.push_str(&color_tags(comment.comment.color, ColorSpaceHint::for_canvas(canvas)));

    tags
}

fn command_tag(command: &MotionCommand) -> String {
    match command {
        MotionCommand::Align(alignment) => format!("\\an{}", alignment),
        MotionCommand::Origin(point) => format!("\\org({}, {})", round(point.x), round(point.y)),
        MotionCommand::Position(point) => format!("\\pos({}, {})", round(point.x), round(point.y)),
        MotionCommand::Move { from, to, start, end } => {
            format!(
                "\\move({}, {}, {}, {}, {}, {})",
                round(from.x), round(from.y), round(to.x), round(to.y), start, end,
            )
        }
        MotionCommand::Rotate(rotation) => rotation_tags(rotation),
        MotionCommand::Transform { start, end, ease, rotation } => {
            match ease {
                Ease::Linear => format!("\\t({}, {}, {})", start, end, rotation_tags(rotation)),
                Ease::Accelerate => format!("\\t({}, {}, 2, {})", start, end, rotation_tags(rotation)),
            }
        }
        MotionCommand::Alpha(alpha) => format!("\\alpha&H{:02X}&", alpha),
        MotionCommand::Fade { fade_in, fade_out } => format!("\\fad({}, {})", fade_in, fade_out),
        MotionCommand::FadeBetween { from, to, end } => {
            format!("\\fade({}, {}, {}, 0, {}, {}, {})", from, to, to, end, end, end)
        }
    }
}

fn rotation_tags(rotation: &Rotation) -> String {
    format!(
        "\\frx{}\\fry{}\\frz{}\\fscx{}\\fscy{}",
        round(rotation.x),
        round(rotation.y),
        round(rotation.z),
        round(rotation.scale_x),
        round(rotation.scale_y),
    )
}

/// Escapes the text of an advanced comment, revealing it one character at a time when the
/// script asks for it.
fn advanced_text(motion: &Motion) -> String {

    let interval = match motion.reveal_interval {
        Some(interval) => interval,
        None => return escape_text(&motion.text),
    };
    let visible = motion.commands.iter()
        .find_map(|command| match command {
            MotionCommand::Alpha(alpha) => Some(*alpha),
            _ => None,
        })
        .unwrap_or(0);
    let mut text = String::new();
    let mut shown: i64 = 0;

    for c in motion.text.chars() {
        if c == '\n' {
            text.push_str("\\N");
            continue
        }
        let at = shown.saturating_mul(interval);
        text.push_str(&format!("{{\\1a&HFF&\\t({at}, {at}, \\1a&H{visible:02X}&)}}", at = at, visible = visible));
        text.push_str(&escape_text(&c.to_string()));
        shown += 1;
    }

    text
}

/// The color space event colors are written in.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ColorSpaceHint {
    /// Colors are written as given.
    Bt601,
    /// Colors are converted to BT.709 coefficients, as renderers use them for HD video.
    ///
    /// The header declares no `YCbCr Matrix`, so renderers take the converted colors as they
    /// are instead of converting them a second time.
    Bt709,
}

impl ColorSpaceHint {

    /// Small canvases keep BT.601, which is what renderers assume for SD video.
    pub fn for_canvas(canvas: &Canvas) -> Self {
        if canvas.width() < 1280 && canvas.height() < 576 {
            ColorSpaceHint::Bt601
        } else {
            ColorSpaceHint::Bt709
        }
    }
}

fn color_tags(color: u32, hint: ColorSpaceHint) -> String {

    if color == MAX_COLOR {
        return String::new()
    }

    let mut tags = format!("\\c&H{}&", convert_color(color, hint));

    if color == 0 {
        tags.push_str("\\3c&HFFFFFF&");
    }

    tags
}

/// Formats a 24-bit RGB color as ASS `BBGGRR` hex digits.
///
/// Pure black and pure white are identical in every color space and pass through unchanged.
pub fn convert_color(rgb: u32, hint: ColorSpaceHint) -> String {

    match rgb {
        0 => return "000000".to_string(),
        MAX_COLOR => return "FFFFFF".to_string(),
        _ => (),
    }

    let r = ((rgb >> 16) & 0xFF) as f64;
    let g = ((rgb >> 8) & 0xFF) as f64;
    let b = (rgb & 0xFF) as f64;

    match hint {
        ColorSpaceHint::Bt601 => {
            format!("{:02X}{:02X}{:02X}", b as u8, g as u8, r as u8)
        }
        ColorSpaceHint::Bt709 => {
            format!(
                "{:02X}{:02X}{:02X}",
                clip_byte(r * 0.00956384088080656 + g * 0.03217254540203729 + b * 0.95826361371715607),
                clip_byte(r * -0.10493933142075390 + g * 1.17231478191855154 + b * -0.06737545049779757),
                clip_byte(r * 0.91348912373987645 + g * 0.07858536372532510 + b * 0.00792551253479842),
            )
        }
    }
}

fn clip_byte(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Formats seconds as `H:MM:SS.cc`, rounding to the nearest centisecond.
pub fn format_timestamp(seconds: f64) -> String {

    let centiseconds = (seconds * 100.0).round().max(0.0) as u64;
    let hours = centiseconds / 360_000;
    let minutes = (centiseconds % 360_000) / 6_000;
    let seconds = (centiseconds % 6_000) / 100;
    let cs = centiseconds % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs)
}

/// Escapes text so that renderers show it literally.
///
/// Every backslash is followed by a word joiner so that sequences such as `\N` or `\h` in the
/// text are not taken as overrides. Braces are escaped, line breaks become `\N`, and spaces at
/// either end of a line become figure spaces so that renderers do not trim them. Empty lines
/// become a single space so that they keep their height.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\u{2060}")
        .replace('{', "\\{")
        .replace('}', "\\}")
        .split('\n')
        .map(keep_edge_spaces)
        .collect::<Vec<_>>()
        .join("\\N")
}

fn keep_edge_spaces(line: &str) -> String {

    if line.is_empty() {
        return " ".to_string()
    }

    let trimmed = line.trim_matches(' ');

    if trimmed.len() == line.len() {
        return line.to_string()
    }

    let leading = line.len() - line.trim_start_matches(' ').len();
    let trailing = line.len() - line.trim_end_matches(' ').len();

    if trimmed.is_empty() {
        return "\u{2007}".repeat(line.len())
    }

    format!("{}{}{}", "\u{2007}".repeat(leading), trimmed, "\u{2007}".repeat(trailing))
}

fn escape_tag_argument(argument: &str) -> String {
    argument.chars().filter(|c| !matches!(*c, '\\' | '{' | '}' | '\n')).collect()
}

/// The style alpha for an opacity, where 0 is opaque and 255 is invisible.
pub fn style_alpha(opacity: f64) -> u8 {
    (255.0 - (opacity * 255.0).round()).clamp(0.0, 255.0) as u8
}

fn round(value: f64) -> i64 {
    value.round() as i64
}
