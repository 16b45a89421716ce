/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;
use super::super::{
    comment::Progress,
    config::BlockOptions,
    reader::tests::{encode_segment, raw_comment},
};
use std::{
    collections::HashMap,
    sync::{Arc, Barrier},
    thread,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn events(document: &str) -> Vec<&str> {
    document.lines().filter(|line| line.starts_with("Dialogue:")).collect()
}

/// Returns the layer and the start time in centiseconds of an event.
fn layer_and_start(event: &str) -> (u32, u64) {

    let fields = event.trim_start_matches("Dialogue: ").split(',').collect::<Vec<_>>();
    let layer = fields[0].parse().unwrap();
    let clock = fields[1].split(|c: char| c == ':' || c == '.')
        .map(|part| part.parse::<u64>().unwrap())
        .collect::<Vec<_>>();

    (layer, ((clock[0] * 60 + clock[1]) * 60 + clock[2]) * 100 + clock[3])
}

fn protobuf() -> ConversionConfig {
    ConversionConfig {
        input_format: InputFormat::Protobuf,
        ..ConversionConfig::default()
    }
}

fn random_segments(seed: u64, segments: usize, per_segment: usize) -> Vec<Vec<u8>> {

    let mut rng = StdRng::seed_from_u64(seed);

    (0..segments)
        .map(|_| {
            let comments = (0..per_segment)
                .map(|index| {
                    let mut comment = raw_comment(
                        rng.gen_range(0..12_000) * 10,
                        [1, 1, 1, 2, 4, 5, 6, 7][rng.gen_range(0..8)],
                        &"弹幕 danmaku".repeat(rng.gen_range(1..4)),
                    );
                    if comment.mode == 7 {
                        comment.content = match index % 3 {
                            0 => r#"[0.2, 0.8, "1-0", 4, "spin", 30, 45, 0.8, 0.2, 2000, 500]"#,
                            1 => r#"["100", "100", "0.5-1", "2", "path", 0, 0, 0, 0, 1000, 0, 0, "SimSun", 1, "M0,0L300,300"]"#,
                            _ => "[not json",
                        }.to_string();
                    }
                    comment.font_size = [18, 25, 25, 36][rng.gen_range(0..4)];
                    comment.color = [0xFF_FF_FF, 0xFF_FF_FF, 0, 0xE7_00_07][rng.gen_range(0..4)];
                    comment.pool = rng.gen_range(0..3);
                    comment.weight = Some(rng.gen_range(0..11));
                    comment
                })
                .collect::<Vec<_>>();
            encode_segment(&comments)
        })
        .collect()
}

#[test]
fn test_xml_scroll_and_top() {

    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<i>
    <d p="0.0,1,25,16777215,1600000000,0,abcdef01,1">scrolling</d>
    <d p="0.0,5,25,16777215,1600000000,0,abcdef02,2">fixed</d>
</i>"#;
    let document = convert_to_ass([&xml[..]], 1920, 1080, &ConversionConfig::default()).unwrap();
    let events = events(&document);

    assert_eq!(events.len(), 2);

    let scroll = events.iter().find(|event| event.ends_with("scrolling")).unwrap();
    let fixed = events.iter().find(|event| event.ends_with("fixed")).unwrap();

    assert!(scroll.contains(",0:00:00.00,"));
    assert!(fixed.contains(",0:00:00.00,"));
    assert!(scroll.contains("{\\move(1920, 0, -"));
    assert!(fixed.contains("{\\an8\\pos(960, 0)}"));
    assert_ne!(layer_and_start(scroll).0, layer_and_start(fixed).0);
}

#[test]
fn test_segments_ordered_by_arrival() {

    let first = encode_segment(&[
        raw_comment(5_000, 1, "a5"),
        raw_comment(1_000, 1, "a1"),
        raw_comment(9_000, 5, "a9"),
        raw_comment(3_000, 4, "a3"),
    ]);
    let second = encode_segment(&[
        raw_comment(3_000, 1, "b3"),
        raw_comment(7_000, 1, "b7"),
        raw_comment(0, 5, "b0"),
        raw_comment(1_000, 1, "b1"),
    ]);
    let document = convert_to_ass(vec![first, second], 1920, 1080, &protobuf()).unwrap();
    let events = events(&document);
    let texts = events.iter()
        .map(|event| &event[event.rfind('}').unwrap() + 1..])
        .collect::<Vec<_>>();

    // Ties keep the order of the concatenated input.
    assert_eq!(texts, vec!["b0", "a1", "b1", "a3", "b3", "a5", "b7", "a9"]);
}

#[test]
fn test_corrupted_advanced_comment_degrades() {

    let xml = br#"<i><d p="2.5,7,25,16777215">[0, 0, "1-1", broken</d></i>"#;
    let conversion = convert([&xml[..]], 1920, 1080, &ConversionConfig::default()).unwrap();
    let events = events(&conversion.ass);

    assert_eq!(events.len(), 1);
    assert_eq!(conversion.stats.degraded, 1);
    assert!(events[0].starts_with("Dialogue: 0,0:00:02.50,0:00:07.50,"));
    assert!(events[0].contains("{\\an5\\pos(960, 540)}"));
}

#[test]
fn test_extreme_values_convert() {

    let xml = br#"<i>
    <d p="1e17,5,25,16777215">late</d>
    <d p="1.0,7,25,16777215">[0, 0, "1", 4, "x", 0, 0, 100, 100, 1e300, 5]</d>
</i>"#;
    let conversion = convert([&xml[..]], 1920, 1080, &ConversionConfig::default()).unwrap();
    let events = events(&conversion.ass);

    assert_eq!(events.len(), 2);
    assert_eq!(conversion.stats.degraded, 1);
    assert!(events[0].starts_with("Dialogue: 0,0:00:01.00,0:00:06.00,"));
    assert!(events[1].starts_with("Dialogue: 4,277777:46:40.00,277777:46:45.00,"));
}

#[test]
fn test_broken_segment_skipped() {

    let good = encode_segment(&[raw_comment(1_000, 1, "kept")]);
    let mut broken = encode_segment(&[raw_comment(2_000, 1, "lost")]);

    broken.truncate(broken.len() - 2);

    let conversion = convert(vec![broken, good], 1920, 1080, &protobuf()).unwrap();

    assert_eq!(conversion.stats.skipped_segments, 1);
    assert_eq!(conversion.stats.read, 1);
    assert_eq!(events(&conversion.ass).len(), 1);
    assert!(events(&conversion.ass)[0].ends_with("kept"));
}

#[test]
fn test_stats() {

    let xml = br#"<i>
        <d p="1,1,25,16777215">one</d>
        <d p="2,8,25,16777215">code</d>
        <d p="3,1,25">short</d>
        <d p="4,5,25,255">blue</d>
        <d p="5,1,25,16777215">spam link</d>
    </i>"#;
    let config = ConversionConfig {
        block: BlockOptions {
            keyword_patterns: vec!["spam".to_string()],
            ..BlockOptions::default()
        },
        ..ConversionConfig::default()
    };
    let conversion = convert([&xml[..]], 1920, 1080, &config).unwrap();

    assert_eq!(
        conversion.stats,
        ConversionStats {
            read: 4,
            malformed: 2,
            skipped_segments: 0,
            filtered: 1,
            reduced: 0,
            degraded: 0,
            events: 2,
        }
    );
}

#[test]
fn test_reduction_bounded() {

    let segments = random_segments(7, 3, 400);
    let config = ConversionConfig {
        reduce_comments: true,
        reduce_window: 2.0,
        reduce_cap: Some(4),
        ..protobuf()
    };
    let conversion = convert(&segments, 1920, 1080, &config).unwrap();
    let again = convert(&segments, 1920, 1080, &config).unwrap();

    assert_eq!(conversion, again);
    assert!(conversion.stats.reduced > 0);

    let mut per_window = HashMap::<u64, usize>::new();

    for event in events(&conversion.ass) {
        *per_window.entry(layer_and_start(event).1 / 200).or_default() += 1;
    }

    assert!(per_window.values().all(|count| *count <= 4));
}

#[test]
fn test_events_sorted_and_timed() {

    let segments = random_segments(11, 4, 250);
    let conversion = convert(&segments, 1280, 720, &protobuf()).unwrap();
    let events = events(&conversion.ass);

    assert_eq!(events.len(), conversion.stats.events);
    assert_eq!(conversion.stats.read, 1_000);

    let starts = events.iter().map(|event| layer_and_start(event).1).collect::<Vec<_>>();

    assert!(starts.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn test_invalid_arguments_fatal() {

    let xml = br#"<i><d p="1,1,25,16777215">text</d></i>"#;

    assert!(matches!(
        convert_to_ass([&xml[..]], 0, 1080, &ConversionConfig::default()),
        Err(ConvertError::ConfigError { source: ConfigError::InvalidCanvas { .. } }),
    ));

    let config = ConversionConfig {
        duration_marquee: 0.0,
        ..ConversionConfig::default()
    };

    assert!(matches!(
        convert_to_ass([&xml[..]], 1920, 1080, &config),
        Err(ConvertError::ConfigError { source: ConfigError::NonPositive { .. } }),
    ));

    let config = ConversionConfig {
        block: BlockOptions {
            keyword_patterns: vec!["[".to_string()],
            ..BlockOptions::default()
        },
        ..ConversionConfig::default()
    };

    assert!(matches!(
        convert_to_ass([&xml[..]], 1920, 1080, &config),
        Err(ConvertError::ConfigError { source: ConfigError::InvalidKeywordPattern { .. } }),
    ));
}

#[test]
fn test_empty_input() {

    let conversion = convert(Vec::<Vec<u8>>::new(), 1920, 1080, &protobuf()).unwrap();

    assert!(conversion.ass.starts_with("[Script Info]\n"));
    assert!(events(&conversion.ass).is_empty());
    assert_eq!(conversion.stats, ConversionStats::default());
}

#[test]
fn test_progress_precision() {

    let segment = encode_segment(&[raw_comment(1_234, 1, "late")]);
    let document = convert_to_ass([segment], 1920, 1080, &protobuf()).unwrap();

    assert_eq!(Progress::Millis(1_234).seconds(), 1.234);
    assert!(events(&document)[0].starts_with("Dialogue: 1,0:00:01.23,"));
}

#[test]
fn test_concurrent_conversions_identical() {

    const THREADS: usize = 24;

    let segments = Arc::new(random_segments(0xC0FFEE, 6, 300));
    let config = Arc::new(protobuf());
    let expected = convert_to_ass(segments.iter(), 1920, 1080, &config).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles = (0..THREADS)
        .map(|_| {
            let segments = Arc::clone(&segments);
            let config = Arc::clone(&config);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                convert_to_ass(segments.iter(), 1920, 1080, &config).unwrap()
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
