/*
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * Copyright 2021 William Swartzendruber
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use danmaku::{convert, BlockOptions, ConversionConfig, InputFormat};
use std::{
    fs::File,
    io::{stdin, stdout, BufWriter, Read, Write},
};
use anyhow::{bail, Context, Result};
use clap::{
    app_from_crate,
    crate_authors,
    crate_description,
    crate_name,
    crate_version,
    value_t,
    Arg,
    ArgMatches,
};
use tracing::{info, Level};

fn main() -> Result<()> {

    let matches = app_from_crate!()
        .arg(Arg::with_name("size")
            .long("size")
            .short("s")
            .value_name("WIDTHxHEIGHT")
            .help("Resolution of the video the subtitles are drawn over")
            .takes_value(true)
            .required(true)
            .validator(|value| parse_size(&value).map(|_| ()))
        )
        .arg(Arg::with_name("format")
            .long("format")
            .short("f")
            .value_name("FORMAT")
            .help("Format of the input files")
            .takes_value(true)
            .possible_values(&["xml", "protobuf"])
            .default_value("xml")
        )
        .arg(Arg::with_name("output")
            .long("output")
            .short("o")
            .value_name("OUTPUT-FILE")
            .help("Output ASS file; use - for STDOUT")
            .takes_value(true)
            .default_value("-")
        )
        .arg(Arg::with_name("font-face")
            .long("font-face")
            .short("n")
            .value_name("FONT")
            .help("Font face of the subtitle style")
            .takes_value(true)
            .default_value("sans-serif")
        )
        .arg(Arg::with_name("font-size")
            .long("font-size")
            .short("z")
            .value_name("PIXELS")
            .help("Size that comments of the nominal size are drawn at")
            .takes_value(true)
            .default_value("25")
            .validator(positive_number)
        )
        .arg(Arg::with_name("opacity")
            .long("opacity")
            .short("a")
            .value_name("OPACITY")
            .help("Opacity of the text, from 0 to 1")
            .takes_value(true)
            .default_value("1.0")
            .validator(|value| {
                match value.parse::<f64>() {
                    Ok(opacity) if (0.0..=1.0).contains(&opacity) => Ok(()),
                    _ => Err("must be a number from 0 to 1".to_string()),
                }
            })
        )
        .arg(Arg::with_name("duration-marquee")
            .long("duration-marquee")
            .short("m")
            .value_name("SECONDS")
            .help("Base duration of scrolling comments")
            .takes_value(true)
            .default_value("5.0")
            .validator(positive_number)
        )
        .arg(Arg::with_name("duration-still")
            .long("duration-still")
            .short("t")
            .value_name("SECONDS")
            .help("Duration of comments fixed to the top or bottom")
            .takes_value(true)
            .default_value("5.0")
            .validator(positive_number)
        )
        .arg(Arg::with_name("lane-height")
            .long("lane-height")
            .value_name("PIXELS")
            .help("Height of a lane; defaults to the font size")
            .takes_value(true)
            .validator(positive_number)
        )
        .arg(Arg::with_name("protect")
            .long("protect")
            .short("p")
            .value_name("PIXELS")
            .help("Reserves blank space at the bottom of the screen")
            .takes_value(true)
            .default_value("0")
            .validator(|value| {
                if value.parse::<u32>().is_ok() {
                    Ok(())
                } else {
                    Err("must be an unsigned integer".to_string())
                }
            })
        )
        .arg(Arg::with_name("reduce")
            .long("reduce")
            .short("r")
            .help("Drops comments from crowded stretches of the timeline")
        )
        .arg(Arg::with_name("reduce-window")
            .long("reduce-window")
            .value_name("SECONDS")
            .help("Width of the stretches the reducer counts comments in")
            .takes_value(true)
            .default_value("1.0")
            .requires("reduce")
            .validator(positive_number)
        )
        .arg(Arg::with_name("reduce-cap")
            .long("reduce-cap")
            .value_name("COMMENTS")
            .help("Comments kept per stretch; defaults to the number of lanes")
            .takes_value(true)
            .requires("reduce")
            .validator(|value| {
                match value.parse::<usize>() {
                    Ok(cap) if cap > 0 => Ok(()),
                    _ => Err("must be a positive integer".to_string()),
                }
            })
        )
        .arg(Arg::with_name("style-name")
            .long("style-name")
            .value_name("NAME")
            .help("Name of the subtitle style")
            .takes_value(true)
            .default_value("Danmaku")
        )
        .arg(Arg::with_name("block")
            .long("block")
            .short("b")
            .value_name("KIND")
            .help("Leaves out a kind of comment entirely")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
            .possible_values(&["top", "bottom", "scroll", "reverse", "special", "colorful"])
        )
        .arg(Arg::with_name("keyword")
            .long("keyword")
            .short("k")
            .value_name("REGEX")
            .help("Leaves out comments matching a regular expression")
            .takes_value(true)
            .multiple(true)
            .number_of_values(1)
        )
        .arg(Arg::with_name("verbose")
            .long("verbose")
            .short("v")
            .help("Logs the progress of the conversion")
        )
        .arg(Arg::with_name("input")
            .index(1)
            .value_name("INPUT-FILE")
            .help("Input files, concatenated in order; use - for STDIN")
            .required(true)
            .multiple(true)
        )
        .after_help(format!("This utility will convert danmaku comments into ASS subtitles \
            that any subtitle renderer can overlay onto the video. Protobuf comments are \
            usually split into several segments, each of which is given as its own input \
            file.\n\n\
            Copyright © 2021 William Swartzendruber\n\
            Licensed under the Mozilla Public License 2.0\n\
            <{}>", env!("CARGO_PKG_REPOSITORY")).as_str())
        .get_matches();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if matches.is_present("verbose") { Level::DEBUG } else { Level::WARN })
        .init();

    let (width, height) = parse_size(matches.value_of("size").unwrap_or_default())
        .map_err(anyhow::Error::msg)?;
    let config = config_from(&matches)?;
    let mut inputs = Vec::new();

    for input_value in matches.values_of("input").into_iter().flatten() {
        inputs.push(read_input(input_value)?);
    }

    let conversion = convert(&inputs, width, height, &config)
        .context("Could not convert the comments.")?;

    info!(
        events = conversion.stats.events,
        malformed = conversion.stats.malformed,
        skipped_segments = conversion.stats.skipped_segments,
        filtered = conversion.stats.filtered,
        reduced = conversion.stats.reduced,
        degraded = conversion.stats.degraded,
        "converted {} comments",
        conversion.stats.read
    );

    let output_value = matches.value_of("output").unwrap_or("-");
    let (mut stdout_write, mut file_write);
    let mut output = BufWriter::<&mut dyn Write>::new(
        if output_value == "-" {
            stdout_write = stdout();
            &mut stdout_write
        } else {
            file_write = File::create(output_value)
                .with_context(|| format!("Could not open output file {} for writing.", output_value))?;
            &mut file_write
        }
    );

    output.write_all(conversion.ass.as_bytes()).context("Could not write the output.")?;
    output.flush().context("Could not flush the output.")?;

    Ok(())
}

fn config_from(matches: &ArgMatches) -> Result<ConversionConfig> {

    let blocked = matches.values_of("block").into_iter().flatten().collect::<Vec<_>>();
    let block = BlockOptions {
        top: blocked.contains(&"top"),
        bottom: blocked.contains(&"bottom"),
        scroll: blocked.contains(&"scroll"),
        reverse: blocked.contains(&"reverse"),
        special: blocked.contains(&"special"),
        colorful: blocked.contains(&"colorful"),
        keyword_patterns: matches.values_of("keyword")
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect(),
    };
    let input_format = matches.value_of("format")
        .unwrap_or("xml")
        .parse::<InputFormat>()?;
    let lane_height = match matches.value_of("lane-height") {
        Some(_) => Some(value_t!(matches, "lane-height", f64)?),
        None => None,
    };
    let reduce_cap = match matches.value_of("reduce-cap") {
        Some(_) => Some(value_t!(matches, "reduce-cap", usize)?),
        None => None,
    };

    if block.keyword_patterns.iter().any(|pattern| pattern.is_empty()) {
        bail!("A keyword pattern must not be empty.")
    }

    Ok(
        ConversionConfig {
            input_format,
            reduce_comments: matches.is_present("reduce"),
            font_face: matches.value_of("font-face").unwrap_or("sans-serif").to_string(),
            font_size: value_t!(matches, "font-size", f64)?,
            text_opacity: value_t!(matches, "opacity", f64)?,
            duration_marquee: value_t!(matches, "duration-marquee", f64)?,
            duration_still: value_t!(matches, "duration-still", f64)?,
            lane_height,
            bottom_reserved: value_t!(matches, "protect", u32)?,
            reduce_window: value_t!(matches, "reduce-window", f64)?,
            reduce_cap,
            style_name: matches.value_of("style-name").unwrap_or("Danmaku").to_string(),
            block,
        }
    )
}

fn read_input(input_value: &str) -> Result<Vec<u8>> {

    let mut data = Vec::new();

    if input_value == "-" {
        stdin().read_to_end(&mut data).context("Could not read from STDIN.")?;
    } else {
        File::open(input_value)
            .with_context(|| format!("Could not open input file {} for reading.", input_value))?
            .read_to_end(&mut data)
            .with_context(|| format!("Could not read input file {}.", input_value))?;
    }

    Ok(data)
}

fn parse_size(value: &str) -> Result<(u32, u32), String> {

    let (width, height) = value.split_once(|c| c == 'x' || c == 'X')
        .ok_or_else(|| "must be formatted as WIDTHxHEIGHT".to_string())?;

    match (width.trim().parse::<u32>(), height.trim().parse::<u32>()) {
        (Ok(width), Ok(height)) if width > 0 && height > 0 => Ok((width, height)),
        _ => Err("must be two positive integers, such as 1920x1080".to_string()),
    }
}

fn positive_number(value: String) -> Result<(), String> {
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => Ok(()),
        _ => Err("must be a positive number".to_string()),
    }
}
