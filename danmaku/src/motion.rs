/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Interprets the motion scripts of advanced comments.
//!
//! # Overview
//!
//! An advanced comment carries a JSON array instead of plain text. Its positional entries are:
//!
//! | index | meaning | default |
//! |---|---|---|
//! | 0, 1 | start x and y | 0 |
//! | 2 | opacity as `"from-to"` | `"1"` |
//! | 3 | lifetime in seconds | 4.5 |
//! | 4 | text | required |
//! | 5 | rotation around z in degrees | 0 |
//! | 6 | rotation around y in degrees | 0 |
//! | 7, 8 | end x and y | start |
//! | 9 | move duration in milliseconds | lifetime |
//! | 10 | move delay in milliseconds | 0 |
//! | 11 | whether the text is outlined | `true` |
//! | 12 | font face | style font |
//! | 13 | whether the movement accelerates | `0` |
//! | 14 | motion path as `M x,y L x,y ...` | none |
//! | 15 | per-character reveal interval in milliseconds | none |
//!
//! Coordinates refer to the 672×438 player the scripts were authored against. Integers are
//! absolute pixels, while fractions no greater than one are relative to that player. Both are
//! mapped onto the canvas with letterboxing so that the aspect ratio is kept.
//!
//! Rotations are Flash 3D rotations and are projected through Flash's default camera into the
//! `\frx`, `\fry`, `\frz`, `\fscx`, and `\fscy` overrides.
//!
//! A script that cannot be interpreted never fails the conversion. [`interpret`] degrades it to
//! its raw text shown centered for the still duration.


use super::{
    comment::{Canvas, Comment},
    config::{ConversionConfig, MIN_DURATION},
};
use std::f64::consts::PI;
use serde_json::{Error as JsonError, Value};
use thiserror::Error as ThisError;
use tracing::warn;

/// The player size motion scripts are authored against.
pub const REFERENCE_PLAYER: (f64, f64) = (672.0, 438.0);

/// The lifetime of a script that does not state one.
pub const DEFAULT_LIFETIME: f64 = 4.5;

/// The longest lifetime, duration, delay, or reveal interval a script may state, in
/// milliseconds. Anything longer degrades the comment.
pub const MAX_SCRIPT_MILLIS: i64 = 86_400_000;

pub type MotionResult<T> = Result<T, MotionError>;

#[derive(ThisError, Debug)]
pub enum MotionError {
    #[error("motion script is not a JSON array")]
    JsonError {
        #[from]
        source: JsonError,
    },
    #[error("motion script has no text")]
    MissingText,
    #[error("motion script has an invalid number: {0}")]
    InvalidNumber(String),
    #[error("motion script has an invalid lifetime: {0}")]
    InvalidLifetime(f64),
    #[error("motion script time of {0} ms is out of range")]
    TimeOutOfRange(f64),
    #[error("motion script has an invalid path: {0}")]
    InvalidPath(String),
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A projected rotation along with the scaling the projection implies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

/// How a transform progresses over its interval.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Ease {
    Linear,
    Accelerate,
}

/// An explicit geometry or opacity instruction. Times are milliseconds relative to the
/// comment's arrival.
#[derive(Clone, Debug, PartialEq)]
pub enum MotionCommand {
    /// Sets the numpad alignment of the text.
    Align(u8),
    /// Sets the point rotations pivot around.
    Origin(Point),
    Position(Point),
    Move {
        from: Point,
        to: Point,
        start: i64,
        end: i64,
    },
    Rotate(Rotation),
    /// Animates towards a rotation.
    Transform {
        start: i64,
        end: i64,
        ease: Ease,
        rotation: Rotation,
    },
    /// Sets a constant transparency, where 0 is opaque and 255 is invisible.
    Alpha(u8),
    Fade {
        fade_in: i64,
        fade_out: i64,
    },
    /// Moves linearly from one transparency to another over the whole lifetime.
    FadeBetween {
        from: u8,
        to: u8,
        end: i64,
    },
}

/// A fully resolved advanced comment.
#[derive(Clone, Debug, PartialEq)]
pub struct Motion {
    pub text: String,
    /// Seconds the comment stays on screen.
    pub lifetime: f64,
    pub commands: Vec<MotionCommand>,
    pub font_face: Option<String>,
    /// Font size in canvas pixels.
    pub font_size: f64,
    pub border: bool,
    /// Milliseconds between the appearance of consecutive characters.
    pub reveal_interval: Option<i64>,
    /// Whether the script could not be interpreted.
    pub degraded: bool,
}

/// Maps reference player coordinates onto the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomFactor {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl ZoomFactor {

    pub fn new(source: (f64, f64), target: &Canvas) -> Self {

        let target = (target.width() as f64, target.height() as f64);
        let source_aspect = source.0 / source.1;
        let target_aspect = target.0 / target.1;

        if target_aspect < source_aspect {
            ZoomFactor {
                scale: target.0 / source.0,
                offset_x: 0.0,
                offset_y: (target.1 - target.0 / source_aspect) / 2.0,
            }
        } else if target_aspect > source_aspect {
            ZoomFactor {
                scale: target.1 / source.1,
                offset_x: (target.0 - target.1 * source_aspect) / 2.0,
                offset_y: 0.0,
            }
        } else {
            ZoomFactor {
                scale: target.0 / source.0,
                offset_x: 0.0,
                offset_y: 0.0,
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Axis {
    X,
    Y,
}

/// Resolves the motion script of an advanced comment, degrading it when the script cannot be
/// interpreted.
///
/// `font_size` is the comment's size in canvas pixels before zooming.
pub fn interpret(
    comment: &Comment,
    font_size: f64,
    canvas: &Canvas,
    config: &ConversionConfig,
) -> Motion {

    let script = comment.raw_params.as_deref().unwrap_or(&comment.content);

    match parse_motion(script, font_size, canvas) {
        Ok(motion) => motion,
        Err(err) => {
            warn!(sequence_id = comment.sequence_id, %err, "degrading advanced comment");
            degraded(script, font_size, canvas, config)
        }
    }
}

/// Shows the raw script centered on the canvas for the still duration.
pub fn degraded(script: &str, font_size: f64, canvas: &Canvas, config: &ConversionConfig) -> Motion {
    Motion {
        text: script.to_string(),
        lifetime: config.duration_still,
        commands: vec![
            MotionCommand::Align(5),
            MotionCommand::Position(
                Point {
                    x: canvas.width() as f64 / 2.0,
                    y: canvas.height() as f64 / 2.0,
                }
            ),
        ],
        font_face: None,
        font_size,
        border: true,
        reveal_interval: None,
        degraded: true,
    }
}

/// Interprets a motion script.
pub fn parse_motion(script: &str, font_size: f64, canvas: &Canvas) -> MotionResult<Motion> {

    let args = serde_json::from_str::<Vec<Value>>(script)?;
    let zoom = ZoomFactor::new(REFERENCE_PLAYER, canvas);
    let text = match args.get(4) {
        Some(Value::String(text)) => text.replace("/n", "\n"),
        Some(Value::Number(number)) => number.to_string(),
        _ => return Err(MotionError::MissingText),
    };

    //
    // GEOMETRY
    //

    let origin = Value::from(0);
    let raw_from_x = present(args.get(0)).unwrap_or(&origin);
    let raw_from_y = present(args.get(1)).unwrap_or(&origin);
    let raw_to_x = present(args.get(7)).unwrap_or(raw_from_x);
    let raw_to_y = present(args.get(8)).unwrap_or(raw_from_y);
    let mut from = Point {
        x: coordinate(raw_from_x, &zoom, Axis::X)?,
        y: coordinate(raw_from_y, &zoom, Axis::Y)?,
    };
    let mut to = Point {
        x: coordinate(raw_to_x, &zoom, Axis::X)?,
        y: coordinate(raw_to_y, &zoom, Axis::Y)?,
    };

    if let Some(Value::String(path)) = args.get(14) {
        if !path.trim().is_empty() {
            let points = parse_path(path, &zoom)?;
            if let (Some(first), Some(last)) = (points.first(), points.last()) {
                from = *first;
                to = *last;
            }
        }
    }

    //
    // TIMING
    //

    let lifetime = number(args.get(3), DEFAULT_LIFETIME)?;

    if !(lifetime >= MIN_DURATION && lifetime * 1000.0 <= MAX_SCRIPT_MILLIS as f64) {
        return Err(MotionError::InvalidLifetime(lifetime))
    }

    let lifetime_ms = (lifetime * 1000.0).round() as i64;
    let duration = milliseconds(args.get(9), lifetime_ms)?;
    let delay = milliseconds(args.get(10), 0)?;
    let ease = if flag(args.get(13), false) { Ease::Accelerate } else { Ease::Linear };
    let reveal_interval = match present(args.get(15)) {
        Some(_) => {
            Some(milliseconds(args.get(15), 0)?.min(lifetime_ms)).filter(|interval| *interval > 0)
        }
        None => None,
    };

    //
    // ROTATION
    //

    let rotate_z = number(args.get(5), 0.0)?;
    let rotate_y = number(args.get(6), 0.0)?;
    let (from_point, from_rotation) = flash_rotation(rotate_y, rotate_z, from, canvas);
    let (to_point, to_rotation) = flash_rotation(rotate_y, rotate_z, to, canvas);
    let mut commands = vec![
        MotionCommand::Origin(
            Point {
                x: canvas.width() as f64 / 2.0,
                y: canvas.height() as f64 / 2.0,
            }
        ),
    ];

    if from_point == to_point {
        commands.push(MotionCommand::Position(from_point));
    } else {
        commands.push(
            MotionCommand::Move {
                from: from_point,
                to: to_point,
                start: delay,
                end: delay.saturating_add(duration),
            }
        );
    }

    commands.push(MotionCommand::Rotate(from_rotation));

    if from != to {
        commands.push(
            MotionCommand::Transform {
                start: delay,
                end: delay.saturating_add(duration),
                ease,
                rotation: to_rotation,
            }
        );
    }

    //
    // OPACITY
    //

    let (from_alpha, to_alpha) = alpha_range(args.get(2))?;

    commands.push(
        match (from_alpha, to_alpha) {
            (from, to) if from == to => MotionCommand::Alpha(from),
            (255, 0) => MotionCommand::Fade { fade_in: lifetime_ms, fade_out: 0 },
            (0, 255) => MotionCommand::Fade { fade_in: 0, fade_out: lifetime_ms },
            (from, to) => MotionCommand::FadeBetween { from, to, end: lifetime_ms },
        }
    );

    let font_face = match args.get(12) {
        Some(Value::String(face)) if !face.trim().is_empty() => Some(face.clone()),
        _ => None,
    };

    Ok(
        Motion {
            text,
            lifetime,
            commands,
            font_face,
            font_size: font_size * zoom.scale,
            border: flag(args.get(11), true),
            reveal_interval,
            degraded: false,
        }
    )
}

/// Projects a Flash 3D rotation of a point into ASS rotation and scaling.
///
/// Returns where the point lands on the canvas along with the rotation to apply around the
/// canvas center.
pub fn flash_rotation(rotate_y: f64, rotate_z: f64, point: Point, canvas: &Canvas) -> (Point, Rotation) {

    let width = canvas.width() as f64;
    let height = canvas.height() as f64;
    let mut rotate_y = wrap_angle(rotate_y);
    let rotate_z = wrap_angle(rotate_z);

    if rotate_y == 90.0 || rotate_y == -90.0 {
        rotate_y -= 1.0;
    }

    let (mut out_x, mut out_y, out_z);
    let radians_y = rotate_y * PI / 180.0;
    let radians_z = rotate_z * PI / 180.0;

    if rotate_y == 0.0 || rotate_z == 0.0 {
        out_x = 0.0;
        // Positive values turn clockwise in Flash.
        out_y = -rotate_y;
        out_z = -rotate_z;
    } else {
        out_y = (-radians_y.sin() * radians_z.cos()).atan2(radians_y.cos()) * 180.0 / PI;
        out_z = (-radians_y.cos() * radians_z.sin()).atan2(radians_z.cos()) * 180.0 / PI;
        out_x = (radians_y.sin() * radians_z.sin()).asin() * 180.0 / PI;
    }

    let mut tr_x = (point.x * radians_z.cos() + point.y * radians_z.sin()) / radians_y.cos()
        + (1.0 - radians_z.cos() / radians_y.cos()) * width / 2.0
        - radians_z.sin() / radians_y.cos() * height / 2.0;
    let mut tr_y = point.y * radians_z.cos() - point.x * radians_z.sin()
        + radians_z.sin() * width / 2.0
        + (1.0 - radians_z.cos()) * height / 2.0;
    let tr_z = (tr_x - width / 2.0) * radians_y.sin();
    let field_of_view = width * (2.0 * PI / 9.0).tan() / 2.0;
    let mut scale = if field_of_view + tr_z == 0.0 {
        // Behind the camera.
        1.0
    } else {
        field_of_view / (field_of_view + tr_z)
    };

    tr_x = (tr_x - width / 2.0) * scale + width / 2.0;
    tr_y = (tr_y - height / 2.0) * scale + height / 2.0;

    if scale < 0.0 {
        scale = -scale;
        out_x += 180.0;
        out_y += 180.0;
    }

    (
        Point { x: tr_x, y: tr_y },
        Rotation {
            x: wrap_angle(out_x),
            y: wrap_angle(out_y),
            z: wrap_angle(out_z),
            scale_x: scale * 100.0,
            scale_y: scale * 100.0,
        },
    )
}

/// Wraps an angle in degrees into `(-180, 180]`.
fn wrap_angle(degrees: f64) -> f64 {

    let wrapped = 180.0 - (180.0 - degrees).rem_euclid(360.0);

    // rem_euclid may round up to the modulus itself.
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(value) => Some(value),
    }
}

fn coordinate(value: &Value, zoom: &ZoomFactor, axis: Axis) -> MotionResult<f64> {
    match value {
        Value::Number(number) => {
            match (number.as_i64(), number.as_f64()) {
                (Some(integer), _) => Ok(absolute(integer as f64, zoom, axis)),
                (None, Some(float)) => Ok(fractional(float, zoom, axis)),
                _ => Err(MotionError::InvalidNumber(number.to_string())),
            }
        }
        Value::String(text) => coordinate_text(text, zoom, axis),
        other => Err(MotionError::InvalidNumber(other.to_string())),
    }
}

fn coordinate_text(text: &str, zoom: &ZoomFactor, axis: Axis) -> MotionResult<f64> {

    let text = text.trim();

    if let Ok(integer) = text.parse::<i64>() {
        return Ok(absolute(integer as f64, zoom, axis))
    }

    match text.parse::<f64>() {
        Ok(float) if float.is_finite() => Ok(fractional(float, zoom, axis)),
        _ => Err(MotionError::InvalidNumber(text.to_string())),
    }
}

fn absolute(position: f64, zoom: &ZoomFactor, axis: Axis) -> f64 {
    match axis {
        Axis::X => zoom.scale * position + zoom.offset_x,
        Axis::Y => zoom.scale * position + zoom.offset_y,
    }
}

/// Fractions no greater than one are relative to the reference player; anything larger is an
/// absolute position.
fn fractional(position: f64, zoom: &ZoomFactor, axis: Axis) -> f64 {
    if position > 1.0 {
        absolute(position, zoom, axis)
    } else {
        match axis {
            Axis::X => REFERENCE_PLAYER.0 * zoom.scale * position + zoom.offset_x,
            Axis::Y => REFERENCE_PLAYER.1 * zoom.scale * position + zoom.offset_y,
        }
    }
}

fn parse_path(path: &str, zoom: &ZoomFactor) -> MotionResult<Vec<Point>> {

    let mut points = Vec::new();

    for step in path.split(|c: char| matches!(c, 'M' | 'm' | 'L' | 'l')) {

        let step = step.trim();

        if step.is_empty() {
            continue
        }

        let (x, y) = step.split_once(',')
            .ok_or_else(|| MotionError::InvalidPath(path.to_string()))?;

        points.push(
            Point {
                x: coordinate_text(x, zoom, Axis::X)?,
                y: coordinate_text(y, zoom, Axis::Y)?,
            }
        );
    }

    Ok(points)
}

fn number(value: Option<&Value>, default: f64) -> MotionResult<f64> {
    match present(value) {
        None => Ok(default),
        Some(Value::Number(number)) => {
            number.as_f64().ok_or_else(|| MotionError::InvalidNumber(number.to_string()))
        }
        Some(Value::String(text)) => {
            text.trim().parse().map_err(|_| MotionError::InvalidNumber(text.clone()))
        }
        Some(other) => Err(MotionError::InvalidNumber(other.to_string())),
    }
}

/// Reads a non-negative millisecond count no greater than [`MAX_SCRIPT_MILLIS`].
fn milliseconds(value: Option<&Value>, default: i64) -> MotionResult<i64> {

    let millis = number(value, default as f64)?;

    if !millis.is_finite() {
        return Err(MotionError::InvalidNumber(millis.to_string()))
    }
    if millis > MAX_SCRIPT_MILLIS as f64 {
        return Err(MotionError::TimeOutOfRange(millis))
    }

    Ok(millis.max(0.0).round() as i64)
}

fn flag(value: Option<&Value>, default: bool) -> bool {
    match present(value) {
        None => default,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map(|n| n != 0.0).unwrap_or(default),
        Some(Value::String(text)) => !matches!(text.trim(), "false" | "0"),
        Some(_) => default,
    }
}

/// Reads an opacity range such as `"1-0"` and returns it as ASS transparencies.
fn alpha_range(value: Option<&Value>) -> MotionResult<(u8, u8)> {

    let (from, to) = match present(value) {
        None => (1.0, 1.0),
        Some(Value::Number(number)) => {
            let opacity = number.as_f64()
                .ok_or_else(|| MotionError::InvalidNumber(number.to_string()))?;
            (opacity, opacity)
        }
        Some(Value::String(text)) => {
            let mut parts = text.splitn(2, '-');
            let from = opacity_part(parts.next(), 1.0)?;
            let to = opacity_part(parts.next(), from)?;
            (from, to)
        }
        Some(other) => return Err(MotionError::InvalidNumber(other.to_string())),
    };

    Ok((transparency(from), transparency(to)))
}

fn opacity_part(part: Option<&str>, default: f64) -> MotionResult<f64> {
    match part.map(str::trim) {
        None | Some("") => Ok(default),
        Some(text) => {
            match text.parse::<f64>() {
                Ok(opacity) if opacity.is_finite() => Ok(opacity),
                _ => Err(MotionError::InvalidNumber(text.to_string())),
            }
        }
    }
}

fn transparency(opacity: f64) -> u8 {
    (255.0 - (opacity * 255.0).round()).clamp(0.0, 255.0) as u8
}
