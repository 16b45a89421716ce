/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

use super::super::comment::{Progress, RawComment};
use std::io::{Error as IoError, Read};
use prost::{DecodeError, Message};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for segment-reading operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// The error type for [`ReadDanmakuSegmentExt`].
///
/// Any of these means the segment as a whole is out of shape.
#[derive(ThisError, Debug)]
pub enum ReadError {
    /// The segment could not be read because of an underlying I/O error.
    #[error("segment IO error")]
    IoError {
        #[from]
        source: IoError,
    },
    /// The payload is not a well-formed `DmSegMobileReply` message. This covers truncated
    /// fields, overlong varints, invalid tags, and mismatched wire types.
    #[error("segment decoding error")]
    DecodeError {
        #[from]
        source: DecodeError,
    },
}

/// One page of the comment stream.
#[derive(Clone, PartialEq, Message)]
pub struct DmSegMobileReply {
    #[prost(message, repeated, tag = "1")]
    pub elems: Vec<DanmakuElem>,
}

/// A single comment as the server encodes it.
///
/// Text fields are kept as bytes so that invalid UTF-8 in one comment does not cost the whole
/// segment.
#[derive(Clone, PartialEq, Message)]
pub struct DanmakuElem {
    #[prost(int64, tag = "1")]
    pub id: i64,
    /// Milliseconds from the start of the video.
    #[prost(int32, tag = "2")]
    pub progress: i32,
    #[prost(int32, tag = "3")]
    pub mode: i32,
    #[prost(int32, tag = "4")]
    pub fontsize: i32,
    #[prost(uint32, tag = "5")]
    pub color: u32,
    #[prost(bytes = "vec", tag = "6")]
    pub mid_hash: Vec<u8>,
    #[prost(bytes = "vec", tag = "7")]
    pub content: Vec<u8>,
    #[prost(int64, tag = "8")]
    pub ctime: i64,
    #[prost(int32, optional, tag = "9")]
    pub weight: Option<i32>,
    #[prost(int32, tag = "11")]
    pub pool: i32,
    #[prost(bytes = "vec", tag = "12")]
    pub id_str: Vec<u8>,
    #[prost(int32, tag = "13")]
    pub attr: i32,
}

impl From<DanmakuElem> for RawComment {

    fn from(elem: DanmakuElem) -> Self {

        // The string form of the ID is only consulted when the numeric one is absent.
        let row_id = if elem.id == 0 {
            String::from_utf8_lossy(&elem.id_str).trim().parse().unwrap_or(0)
        } else {
            elem.id
        };

        RawComment {
            progress: Progress::Millis(elem.progress as i64),
            mode: elem.mode,
            font_size: elem.fontsize,
            color: elem.color as i64,
            timestamp: elem.ctime,
            pool: elem.pool,
            sender: String::from_utf8_lossy(&elem.mid_hash).into_owned(),
            row_id,
            weight: elem.weight,
            attributes: elem.attr,
            content: String::from_utf8_lossy(&elem.content).into_owned(),
        }
    }
}

/// Allows reading a Protobuf danmaku segment from a source.
pub trait ReadDanmakuSegmentExt {
    /// Reads the source to its end and decodes it as a single segment. Records keep the order
    /// in which they appear within the segment.
    fn read_danmaku_segment(&mut self) -> ReadResult<Vec<RawComment>>;
}

impl<T> ReadDanmakuSegmentExt for T where
    T: Read,
{

    fn read_danmaku_segment(&mut self) -> ReadResult<Vec<RawComment>> {

        let mut payload = vec![];

        self.read_to_end(&mut payload)?;

        let reply = DmSegMobileReply::decode(payload.as_slice())?;

        Ok(reply.elems.into_iter().map(RawComment::from).collect())
    }
}
