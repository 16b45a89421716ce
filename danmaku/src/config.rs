/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Conversion settings.
//!
//! A [`ConversionConfig`] is a plain value. It is handed to every stage of a conversion by
//! reference and is never stored anywhere, which is what allows any number of conversions to
//! run at once.


use super::comment::Canvas;
use std::str::FromStr;
use regex::Error as RegexError;
use thiserror::Error as ThisError;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// The shortest on-screen duration in seconds. Subtitle timestamps cannot express less.
pub const MIN_DURATION: f64 = 0.01;

/// The error type for invalid settings. These are always fatal.
#[derive(ThisError, Debug)]
pub enum ConfigError {
    #[error("canvas dimensions must be positive, got {width}x{height}")]
    InvalidCanvas {
        width: u32,
        height: u32,
    },
    #[error("unrecognized input format: {0}")]
    UnrecognizedInputFormat(String),
    #[error("{name} must be a positive finite number, got {value}")]
    NonPositive {
        name: &'static str,
        value: f64,
    },
    #[error("{name} must be at least one centisecond, got {value}")]
    TooShort {
        name: &'static str,
        value: f64,
    },
    #[error("text opacity must be within 0 and 1, got {0}")]
    OpacityOutOfRange(f64),
    #[error("reduce cap must be at least one comment per window")]
    ZeroReduceCap,
    #[error("bottom reservation of {reserved} pixels leaves no room on a canvas {height} pixels tall")]
    BottomReservedTooLarge {
        reserved: u32,
        height: u32,
    },
    #[error("invalid keyword pattern")]
    InvalidKeywordPattern {
        #[from]
        source: RegexError,
    },
}

/// The wire format of the input.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum InputFormat {
    /// One or more XML documents.
    Xml,
    /// One or more Protobuf segments.
    Protobuf,
}

impl Default for InputFormat {
    fn default() -> Self { Self::Xml }
}

impl FromStr for InputFormat {

    type Err = ConfigError;

    fn from_str(value: &str) -> ConfigResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "xml" => Ok(InputFormat::Xml),
            "protobuf" => Ok(InputFormat::Protobuf),
            _ => Err(ConfigError::UnrecognizedInputFormat(value.to_string())),
        }
    }
}

/// Categories and contents of comments to leave out entirely.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockOptions {
    pub top: bool,
    pub bottom: bool,
    /// Blocks right-to-left scrolling comments.
    pub scroll: bool,
    /// Blocks left-to-right scrolling comments, including reverse comments.
    pub reverse: bool,
    /// Blocks advanced comments.
    pub special: bool,
    /// Blocks every comment that is not white.
    pub colorful: bool,
    /// Blocks comments whose text matches any of these regular expressions.
    pub keyword_patterns: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversionConfig {
    pub input_format: InputFormat,
    /// Enables the density reducer.
    pub reduce_comments: bool,
    pub font_face: String,
    /// The nominal font size in pixels. A wire font size of 25 is drawn at this size.
    pub font_size: f64,
    /// Opacity of the text, from 0 (transparent) to 1 (opaque).
    pub text_opacity: f64,
    /// Seconds a scroll comment takes to cross the canvas, before its own width is accounted
    /// for.
    pub duration_marquee: f64,
    /// Seconds a top or bottom comment stays on screen.
    pub duration_still: f64,
    /// Pixels per lane. Defaults to the nominal font size.
    pub lane_height: Option<f64>,
    /// Pixels at the bottom of the canvas that no lane may use.
    pub bottom_reserved: u32,
    /// Width in seconds of a density window.
    pub reduce_window: f64,
    /// Comments kept per density window. Defaults to the lane capacity of the canvas.
    pub reduce_cap: Option<usize>,
    pub style_name: String,
    pub block: BlockOptions,
}

impl Default for ConversionConfig {

    fn default() -> Self {
        ConversionConfig {
            input_format: InputFormat::Xml,
            reduce_comments: false,
            font_face: "sans-serif".to_string(),
            font_size: 25.0,
            text_opacity: 1.0,
            duration_marquee: 5.0,
            duration_still: 5.0,
            lane_height: None,
            bottom_reserved: 0,
            reduce_window: 1.0,
            reduce_cap: None,
            style_name: "Danmaku".to_string(),
            block: BlockOptions::default(),
        }
    }
}

impl ConversionConfig {

    /// Checks that every setting can produce output on the given canvas.
    pub fn validate(&self, canvas: &Canvas) -> ConfigResult<()> {

        positive("font size", self.font_size)?;
        duration("marquee duration", self.duration_marquee)?;
        duration("still duration", self.duration_still)?;
        positive("reduce window", self.reduce_window)?;

        if let Some(lane_height) = self.lane_height {
            positive("lane height", lane_height)?;
        }
        if !(0.0..=1.0).contains(&self.text_opacity) {
            return Err(ConfigError::OpacityOutOfRange(self.text_opacity))
        }
        if self.reduce_cap == Some(0) {
            return Err(ConfigError::ZeroReduceCap)
        }
        if self.bottom_reserved >= canvas.height() {
            return Err(
                ConfigError::BottomReservedTooLarge {
                    reserved: self.bottom_reserved,
                    height: canvas.height(),
                }
            )
        }

        Ok(())
    }

    /// The height of a single lane in pixels.
    pub fn lane_height(&self) -> f64 {
        self.lane_height.unwrap_or(self.font_size)
    }

    /// The number of lanes each category may open on the given canvas.
    pub fn max_lanes(&self, canvas: &Canvas) -> usize {
        let usable = canvas.height().saturating_sub(self.bottom_reserved) as f64;
        ((usable / self.lane_height()).floor() as usize).max(1)
    }

    /// The number of comments the density reducer keeps per window.
    pub fn reduce_cap(&self, canvas: &Canvas) -> usize {
        self.reduce_cap.unwrap_or_else(|| self.max_lanes(canvas))
    }
}

fn duration(name: &'static str, value: f64) -> ConfigResult<()> {

    positive(name, value)?;

    if value < MIN_DURATION {
        return Err(ConfigError::TooShort { name, value })
    }

    Ok(())
}

fn positive(name: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}
