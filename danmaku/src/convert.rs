/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Runs a whole conversion in one pass.
//!
//! # Overview
//!
//! A conversion flows through these stages, each consuming the previous stage's output:
//!
//! 1. Reading every input in the configured format.
//! 2. Normalizing the records into ordered comments.
//! 3. Leaving out blocked comments.
//! 4. Reducing density, when enabled.
//! 5. Placing every comment onto the canvas.
//! 6. Writing the ASS document.
//!
//! Nothing survives a call. All state lives on the stack of the calling thread, so any number
//! of conversions may run at once, and identical arguments always produce identical output.

#[cfg(test)]
mod tests;

use super::{
    ass::{WriteAssExt, WriteError},
    comment::{Canvas, RawComment},
    config::{ConfigError, ConversionConfig, InputFormat},
    filter::CommentFilter,
    lane::{allocate, Placement},
    normalize::normalize_comments,
    reader::{read_xml, ReadDanmakuSegmentExt},
    reduce::{reduce_comments, ReduceSettings},
};
use thiserror::Error as ThisError;
use tracing::{debug, warn};

pub type ConvertResult<T> = Result<T, ConvertError>;

/// The error type for conversions. Only invalid arguments and failed writes end a conversion;
/// bad input data never does.
#[derive(ThisError, Debug)]
pub enum ConvertError {
    #[error("invalid conversion settings")]
    ConfigError {
        #[from]
        source: ConfigError,
    },
    #[error("could not write the subtitle document")]
    WriteError {
        #[from]
        source: WriteError,
    },
}

/// Counts of what happened to the input along the way.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ConversionStats {
    /// Records decoded from the input.
    pub read: usize,
    /// Records dropped because they could not be decoded or normalized.
    pub malformed: usize,
    /// Protobuf segments skipped because they were out of shape.
    pub skipped_segments: usize,
    /// Comments left out by the block options.
    pub filtered: usize,
    /// Comments dropped by the density reducer.
    pub reduced: usize,
    /// Advanced comments whose motion scripts could not be interpreted.
    pub degraded: usize,
    /// Events written to the document.
    pub events: usize,
}

/// The outcome of a conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Conversion {
    /// The complete ASS document.
    pub ass: String,
    pub stats: ConversionStats,
}

/// Converts danmaku into an ASS document for a canvas of the given size.
///
/// Every item of `inputs` is one XML document or one Protobuf segment, depending on the
/// configured input format. Inputs are concatenated in the order given, which also decides the
/// sequence IDs of their records.
#[tracing::instrument(skip(inputs, config), fields(format = ?config.input_format))]
pub fn convert<I, B>(
    inputs: I,
    width: u32,
    height: u32,
    config: &ConversionConfig,
) -> ConvertResult<Conversion> where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{

    let canvas = Canvas::new(width, height)?;

    config.validate(&canvas)?;

    let filter = CommentFilter::new(&config.block)?;
    let mut stats = ConversionStats::default();
    let records = read_inputs(inputs, config.input_format, &mut stats);

    stats.read = records.len();

    let normalized = normalize_comments(records);

    stats.malformed += normalized.dropped;

    let (comments, filtered) = filter.apply(normalized.comments);

    stats.filtered = filtered;

    let comments = if config.reduce_comments {
        let settings = ReduceSettings {
            window: config.reduce_window,
            cap: config.reduce_cap(&canvas),
        };
        let (kept, reduced) = reduce_comments(comments, settings);
        stats.reduced = reduced;
        kept
    } else {
        comments
    };
    let positioned = allocate(comments, &canvas, config);

    stats.degraded = positioned.iter()
        .filter(|comment| {
            matches!(&comment.placement, Placement::Advanced(motion) if motion.degraded)
        })
        .count();
    stats.events = positioned.len();

    let mut output = Vec::<u8>::new();

    output.write_ass(&positioned, &canvas, config)?;

    debug!(
        read = stats.read,
        malformed = stats.malformed,
        skipped_segments = stats.skipped_segments,
        filtered = stats.filtered,
        reduced = stats.reduced,
        degraded = stats.degraded,
        events = stats.events,
        "conversion finished"
    );

    Ok(
        Conversion {
            ass: String::from_utf8_lossy(&output).into_owned(),
            stats,
        }
    )
}

/// Converts danmaku into an ASS document, returning only the document.
pub fn convert_to_ass<I, B>(
    inputs: I,
    width: u32,
    height: u32,
    config: &ConversionConfig,
) -> ConvertResult<String> where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    convert(inputs, width, height, config).map(|conversion| conversion.ass)
}

/// Decodes every input in order, counting malformed XML elements and skipped segments into
/// `stats`.
pub fn read_inputs<I, B>(
    inputs: I,
    format: InputFormat,
    stats: &mut ConversionStats,
) -> Vec<RawComment> where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{

    let mut records = Vec::new();

    for (index, input) in inputs.into_iter().enumerate() {
        match format {
            InputFormat::Xml => {
                let document = read_xml(input.as_ref());
                if document.malformed > 0 {
                    debug!(input = index, malformed = document.malformed, "skipped malformed elements");
                }
                stats.malformed += document.malformed;
                records.extend(document.comments);
            }
            InputFormat::Protobuf => {
                let mut segment = input.as_ref();
                match segment.read_danmaku_segment() {
                    Ok(comments) => records.extend(comments),
                    Err(err) => {
                        warn!(segment = index, %err, "skipping segment");
                        stats.skipped_segments += 1;
                    }
                }
            }
        }
    }

    records
}
