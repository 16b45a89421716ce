/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Decodes raw danmaku data into [`RawComment`](super::comment::RawComment) records.
//!
//! # Overview
//!
//! Danmaku are distributed in two wire formats:
//!
//! 1. XML documents, where each comment is a `<d>` element whose `p` attribute packs the
//!    numeric fields and whose content is the text.
//! 2. Protobuf segments, where the stream is paginated into chunks that each decode to a
//!    repeated comment message.
//!
//! Both readers only decode. Validation, clamping, and ordering are left to the normalizer.
//! Neither reader ever fails on a single bad record: malformed XML elements are counted and
//! skipped, while a structurally broken Protobuf segment is reported as a [`ReadError`] so
//! that the caller can skip the whole segment.


mod protobufread;
mod xmlread;

pub use protobufread::*;
pub use xmlread::*;
