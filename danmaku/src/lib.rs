/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Converts danmaku comment streams into ASS subtitles.
//!
//! Danmaku are time-stamped viewer comments that fly across or stick to the video while it
//! plays. This crate reads them from XML documents or Protobuf segments, lays them out so that
//! they do not collide, and writes the result as an Advanced SubStation Alpha document that any
//! subtitle renderer can overlay.
//!
//! The entry points are [`convert`] and [`convert_to_ass`]. Both are pure: they keep no state
//! between calls and may be called from any number of threads at once.

pub mod ass;
pub mod comment;
pub mod config;
pub mod convert;
pub mod filter;
pub mod lane;
pub mod motion;
pub mod normalize;
pub mod reader;
pub mod reduce;

pub use comment::{Canvas, Comment, Mode, Pool};
pub use config::{BlockOptions, ConfigError, ConversionConfig, InputFormat};
pub use convert::{convert, convert_to_ass, Conversion, ConversionStats, ConvertError, ConvertResult};
