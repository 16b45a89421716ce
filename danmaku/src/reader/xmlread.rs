/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

use super::super::comment::{Progress, RawComment};
use std::str::FromStr;

/// The field layout of the `p` attribute.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum XmlLayout {
    /// `time,mode,size,color,timestamp,pool,sender,row_id` with the time in seconds.
    Version1,
    /// `id,?,progress,mode,size,color,timestamp,...` with the progress in milliseconds.
    Version2,
}

/// The records decoded from one XML document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XmlDocument {
    /// Records in document order.
    pub comments: Vec<RawComment>,
    /// Number of `<d>` elements that were skipped because they could not be decoded.
    pub malformed: usize,
}

/// Decodes every `<d>` element of an XML document.
///
/// The input may be UTF-8 text or bytes, with or without a byte order mark. Elements that
/// cannot be decoded are skipped and counted. Nothing here is fatal.
pub fn read_xml(input: &[u8]) -> XmlDocument {

    let text = String::from_utf8_lossy(input);
    let text = text.trim_start_matches('\u{feff}');
    let layout = detect_layout(text);
    let mut document = XmlDocument::default();
    let mut rest = text;

    while let Some(start) = rest.find("<d") {

        let after = &rest[start + 2..];

        match after.chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => {
            }
            _ => {
                rest = after;
                continue
            }
        }

        let tag_end = match find_tag_end(after) {
            Some(tag_end) => tag_end,
            None => {
                document.malformed += 1;
                break
            }
        };
        let tag = &after[..tag_end];
        let body = &after[tag_end + 1..];
        let (content, next) = if tag.ends_with('/') {
            ("", body)
        } else {
            match body.find("</d>") {
                Some(end) => (&body[..end], &body[end + 4..]),
                None => {
                    document.malformed += 1;
                    break
                }
            }
        };

        match parse_element(layout, tag.trim_end_matches('/'), content) {
            Some(comment) => document.comments.push(comment),
            None => document.malformed += 1,
        }

        rest = next;
    }

    document
}

fn detect_layout(text: &str) -> XmlLayout {

    let declaration = text.trim_start();

    if let Some(declaration) = declaration.strip_prefix("<?xml") {
        if let Some(end) = declaration.find("?>") {
            let version = attributes(&declaration[..end])
                .into_iter()
                .find(|(name, _)| *name == "version")
                .map(|(_, value)| value);
            if version.as_deref() == Some("2.0") {
                return XmlLayout::Version2
            }
        }
    }

    XmlLayout::Version1
}

fn parse_element(layout: XmlLayout, tag: &str, content: &str) -> Option<RawComment> {

    let attributes = attributes(tag);
    let p = attributes.iter().find(|(name, _)| *name == "p").map(|(_, value)| value)?;
    let fields = p.split(',').map(str::trim).collect::<Vec<_>>();
    let content = unescape(content);

    match layout {
        XmlLayout::Version1 => {

            if fields.len() < 4 {
                return None
            }

            Some(
                RawComment {
                    progress: Progress::Seconds(fields[0].parse().ok()?),
                    mode: fields[1].parse().ok()?,
                    font_size: fields[2].parse().ok()?,
                    color: fields[3].parse().ok()?,
                    timestamp: optional(&fields, 4),
                    pool: optional(&fields, 5),
                    sender: fields.get(6).map(|s| s.to_string()).unwrap_or_default(),
                    row_id: optional(&fields, 7),
                    weight: None,
                    attributes: 0,
                    content,
                }
            )
        }
        XmlLayout::Version2 => {

            if fields.len() < 6 {
                return None
            }

            let row_id = attributes.iter()
                .find(|(name, _)| *name == "id")
                .and_then(|(_, value)| value.trim().parse().ok())
                .unwrap_or_else(|| optional(&fields, 0));

            Some(
                RawComment {
                    progress: Progress::Millis(fields[2].parse().ok()?),
                    mode: fields[3].parse().ok()?,
                    font_size: fields[4].parse().ok()?,
                    color: fields[5].parse().ok()?,
                    timestamp: optional(&fields, 6),
                    pool: 0,
                    sender: String::new(),
                    row_id,
                    weight: None,
                    attributes: 0,
                    content,
                }
            )
        }
    }
}

fn optional<T: FromStr + Default>(fields: &[&str], index: usize) -> T {
    fields.get(index).and_then(|field| field.parse().ok()).unwrap_or_default()
}

/// Finds the `>` closing a start tag, skipping any inside quoted attribute values.
fn find_tag_end(tag: &str) -> Option<usize> {

    let mut quote = None;

    for (index, c) in tag.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            (None, '>') => return Some(index),
            _ => (),
        }
    }

    None
}

/// Splits the inside of a tag into `name="value"` pairs, unescaping the values.
fn attributes(tag: &str) -> Vec<(&str, String)> {

    let mut pairs = Vec::new();
    let mut rest = tag.trim_start();

    loop {

        let name_end = match rest.find(|c: char| c == '=' || c.is_whitespace()) {
            Some(name_end) => name_end,
            None => break,
        };
        let name = &rest[..name_end];
        let after_name = rest[name_end..].trim_start();
        let after_equals = match after_name.strip_prefix('=') {
            Some(after_equals) => after_equals.trim_start(),
            None => break,
        };
        let quote = match after_equals.chars().next() {
            Some(c) if c == '"' || c == '\'' => c,
            _ => break,
        };
        let value = &after_equals[1..];
        let value_end = match value.find(quote) {
            Some(value_end) => value_end,
            None => break,
        };

        pairs.push((name, unescape(&value[..value_end])));
        rest = value[value_end + 1..].trim_start();
    }

    pairs
}

/// Resolves entity and character references and unwraps CDATA sections.
fn unescape(text: &str) -> String {

    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(position) = rest.find(|c: char| c == '&' || c == '<') {

        output.push_str(&rest[..position]);
        rest = &rest[position..];

        if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
            match cdata.find("]]>") {
                Some(end) => {
                    output.push_str(&cdata[..end]);
                    rest = &cdata[end + 3..];
                }
                None => {
                    output.push_str(cdata);
                    rest = "";
                }
            }
        } else if rest.starts_with('&') {
            let entity = rest.find(';')
                .filter(|end| *end <= 12)
                .and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
            match entity {
                Some((c, end)) => {
                    output.push(c);
                    rest = &rest[end + 1..];
                }
                None => {
                    output.push('&');
                    rest = &rest[1..];
                }
            }
        } else {
            output.push('<');
            rest = &rest[1..];
        }
    }

    output.push_str(rest);

    output
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
