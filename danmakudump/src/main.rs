/*
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * Copyright 2021 William Swartzendruber
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use danmaku::{
    ass::format_timestamp,
    convert::read_inputs,
    normalize::normalize_comments,
    ConversionStats,
    InputFormat,
    Mode,
    Pool,
};
use std::{
    fs::File,
    io::{stdin, Read},
};
use anyhow::{Context, Result};
use clap::{app_from_crate, crate_authors, crate_description, crate_name, crate_version, Arg};
use tracing_subscriber::filter::LevelFilter;

fn main() -> Result<()> {

    let matches = app_from_crate!()
        .arg(Arg::with_name("format")
            .long("format")
            .short("f")
            .value_name("FORMAT")
            .help("Format of the input files")
            .takes_value(true)
            .possible_values(&["xml", "protobuf"])
            .default_value("xml")
        )
        .arg(Arg::with_name("verbose")
            .long("verbose")
            .short("v")
            .help("Logs records that are dropped")
        )
        .arg(Arg::with_name("input")
            .index(1)
            .value_name("INPUT-FILE")
            .help("Input files, concatenated in order; use - for STDIN")
            .required(true)
            .multiple(true)
        )
        .after_help(format!("This utility will dump danmaku comments as they are seen after \
            normalization, in the order they are processed.\n\n\
            Copyright © 2021 William Swartzendruber\n\
            Licensed under the Mozilla Public License 2.0\n\
            <{}>", env!("CARGO_PKG_REPOSITORY")).as_str())
        .get_matches();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(
            if matches.is_present("verbose") { LevelFilter::TRACE } else { LevelFilter::WARN }
        )
        .init();

    let format = matches.value_of("format").unwrap_or("xml").parse::<InputFormat>()?;
    let mut inputs = Vec::new();

    for input_value in matches.values_of("input").into_iter().flatten() {

        let mut data = Vec::new();

        if input_value == "-" {
            stdin().read_to_end(&mut data).context("Could not read from STDIN.")?;
        } else {
            File::open(input_value)
                .with_context(|| format!("Could not open input file {} for reading.", input_value))?
                .read_to_end(&mut data)
                .with_context(|| format!("Could not read input file {}.", input_value))?;
        }

        inputs.push(data);
    }

    eprintln!("Iterating through danmaku comments...");

    let mut stats = ConversionStats::default();
    let records = read_inputs(&inputs, format, &mut stats);
    let read = records.len();
    let normalized = normalize_comments(records);

    for comment in normalized.comments.iter() {
        println!("comment({})", format_timestamp(comment.arrival_time));
        println!("  sequence_id = {}", comment.sequence_id);
        println!("  row_id = {}", comment.row_id);
        println!("  mode = {}", match comment.mode {
            Mode::ScrollRightToLeft => "SCROLL_RIGHT_TO_LEFT",
            Mode::ScrollLeftToRight => "SCROLL_LEFT_TO_RIGHT",
            Mode::Top => "TOP",
            Mode::Bottom => "BOTTOM",
            Mode::Reverse => "REVERSE",
            Mode::Advanced => "ADVANCED",
        });
        println!("  pool = {}", match comment.pool {
            Pool::Normal => "NORMAL",
            Pool::Subtitle => "SUBTITLE",
            Pool::Special => "SPECIAL",
        });
        println!("  font_size = {}", comment.font_size);
        println!("  color = #{:06X}", comment.color);
        println!("  timestamp = {}", comment.timestamp);
        match comment.weight {
            Some(weight) => println!("  weight = {}", weight),
            None => (),
        }
        println!("  content = {:?}", comment.content);
    }

    eprintln!(
        "Read {} records: {} normalized, {} malformed, {} segments skipped.",
        read,
        normalized.comments.len(),
        stats.malformed + normalized.dropped,
        stats.skipped_segments,
    );

    Ok(())
}
