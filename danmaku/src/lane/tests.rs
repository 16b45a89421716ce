/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;
use super::super::{
    comment::tests::sample,
    config::MIN_DURATION,
    normalize::MAX_ARRIVAL_TIME,
};
use std::collections::BTreeSet;
use rand::{rngs::StdRng, Rng, SeedableRng};

const MODES: [Mode; 6] = [
    Mode::ScrollRightToLeft,
    Mode::ScrollLeftToRight,
    Mode::Top,
    Mode::Bottom,
    Mode::Reverse,
    Mode::Advanced,
];

fn random_stream(rng: &mut StdRng, count: usize) -> Vec<Comment> {

    let mut arrivals = (0..count)
        .map(|_| rng.gen_range(0..6_000) as f64 / 100.0)
        .collect::<Vec<_>>();

    arrivals.sort_by(f64::total_cmp);

    arrivals.into_iter()
        .enumerate()
        .map(|(index, arrival_time)| {
            let mode = MODES[rng.gen_range(0..MODES.len())];
            let content = match mode {
                Mode::Advanced => r#"[0.5, 0.5, "1-0", 3, "advanced"]"#.to_string(),
                _ => "弹".repeat(rng.gen_range(1..30)),
            };
            let mut comment = sample(arrival_time, mode, &content, index as u64);
            comment.font_size = rng.gen_range(12..40);
            comment
        })
        .collect()
}

/// Asserts that comments only share a lane while every lane of their category is occupied.
fn assert_lane_safety(positioned: &[PositionedComment], max_lanes: usize) {

    let lanes_of = |placed: &PositionedComment| {
        let start = placed.lane_index.unwrap_or(0);
        start..start + placed.lane_span
    };

    for (index, later) in positioned.iter().enumerate() {

        let category = match Category::of(later.comment.mode) {
            Some(category) => category,
            None => continue,
        };
        let busy = positioned[..index].iter()
            .filter(|other| Category::of(other.comment.mode) == Some(category))
            .filter(|other| other.exit_time > later.arrival_time())
            .flat_map(lanes_of)
            .collect::<BTreeSet<_>>();

        if lanes_of(later).any(|lane| busy.contains(&lane)) {
            assert_eq!(busy.len(), max_lanes, "overlap while a lane was free");
        }
    }
}

#[test]
fn test_category_layers() {

    assert_eq!(Category::of(Mode::ScrollRightToLeft), Some(Category::Leftward));
    assert_eq!(Category::of(Mode::ScrollLeftToRight), Some(Category::Rightward));
    assert_eq!(Category::of(Mode::Reverse), Some(Category::Rightward));
    assert_eq!(Category::of(Mode::Top), Some(Category::Top));
    assert_eq!(Category::of(Mode::Bottom), Some(Category::Bottom));
    assert_eq!(Category::of(Mode::Advanced), None);

    let layers = [Category::Leftward, Category::Rightward, Category::Bottom, Category::Top]
        .iter()
        .map(Category::layer)
        .collect::<BTreeSet<_>>();

    assert_eq!(layers.len(), 4);
    assert!(!layers.contains(&ADVANCED_LAYER));
}

#[test]
fn test_lane_set_policy() {

    let mut lanes = LaneSet::new(2);

    assert!(lanes.is_empty());
    assert_eq!(lanes.assign(0.0, 5.0, 1), 0..1);
    assert_eq!(lanes.assign(0.1, 5.1, 1), 1..2);
    assert_eq!(lanes.len(), 2);

    // Both lanes are busy, so the one emptying first is shared.
    assert_eq!(lanes.assign(0.2, 5.2, 1), 0..1);
    assert_eq!(lanes.assign(0.3, 5.3, 1), 1..2);
    assert_eq!(lanes.len(), 2);

    // The lowest free lane wins.
    assert_eq!(lanes.assign(6.0, 9.0, 1), 0..1);
    assert_eq!(lanes.assign(6.0, 7.0, 1), 1..2);
    assert_eq!(lanes.assign(8.0, 8.5, 1), 1..2);
}

#[test]
fn test_lane_set_overflow_keeps_latest_exit() {

    let mut lanes = LaneSet::new(1);

    assert_eq!(lanes.assign(0.0, 10.0, 1), 0..1);
    assert_eq!(lanes.assign(1.0, 2.0, 1), 0..1);

    // The long occupant is still on screen.
    assert_eq!(lanes.assign(5.0, 6.0, 1), 0..1);
    assert_eq!(lanes.exit_times, vec![10.0]);
}

#[test]
fn test_lane_set_spans() {

    let mut lanes = LaneSet::new(4);

    assert_eq!(lanes.assign(0.0, 5.0, 1), 0..1);
    assert_eq!(lanes.assign(0.0, 5.0, 2), 1..3);
    assert_eq!(lanes.len(), 3);
    assert_eq!(lanes.assign(0.0, 8.0, 1), 3..4);

    assert_eq!(lanes.assign(6.0, 9.0, 2), 0..2);

    // Only lane 2 is free, so a tall occupant squeezes into it.
    assert_eq!(lanes.assign(6.5, 8.5, 3), 2..3);
    assert_eq!(lanes.exit_times, vec![9.0, 9.0, 8.5, 8.0]);

    // Nothing is free; lanes 2 and 3 together empty soonest.
    assert_eq!(lanes.assign(7.0, 9.5, 2), 2..4);
    assert_eq!(lanes.exit_times, vec![9.0, 9.0, 9.5, 9.5]);

    // Wider than the category.
    assert_eq!(lanes.assign(10.0, 11.0, 9), 0..4);
    assert_eq!(lanes.exit_times, vec![11.0; 4]);
}

#[test]
fn test_lanes_needed() {

    assert_eq!(lanes_needed(25.0, 1, 25.0), 1);
    assert_eq!(lanes_needed(12.0, 1, 25.0), 1);
    assert_eq!(lanes_needed(36.0, 1, 25.0), 2);
    assert_eq!(lanes_needed(25.0, 3, 25.0), 3);
    assert_eq!(lanes_needed(25.0, 0, 25.0), 1);
}

#[test]
fn test_scroll_duration() {

    let config = ConversionConfig::default();

    assert_eq!(scroll_duration(0.0, 1920.0, &config), 5.0);
    assert!(scroll_duration(200.0, 1920.0, &config) > scroll_duration(100.0, 1920.0, &config));
    assert!(scroll_duration(100.0, 640.0, &config) > scroll_duration(100.0, 1920.0, &config));
}

#[test]
fn test_geometry() {

    let canvas = Canvas::new(1920, 1080).unwrap();
    let config = ConversionConfig {
        bottom_reserved: 80,
        ..ConversionConfig::default()
    };
    let comments = vec![
        sample(0.0, Mode::ScrollRightToLeft, "abcd", 0),
        sample(0.0, Mode::Top, "top", 1),
        sample(0.0, Mode::Top, "top", 2),
        sample(0.0, Mode::Bottom, "bottom", 3),
        sample(0.0, Mode::Bottom, "bottom", 4),
        sample(0.0, Mode::Reverse, "reverse", 5),
    ];
    let positioned = allocate(comments, &canvas, &config);

    assert_eq!(positioned.len(), 6);
    assert_eq!(
        positioned[0].placement,
        Placement::Scroll { direction: Direction::Leftward, y: 0.0, text_width: 50.0 },
    );
    assert_eq!(positioned[0].on_screen_duration, 5.0 * 1970.0 / 1920.0);
    assert_eq!(positioned[0].layer, 1);
    assert_eq!(positioned[1].placement, Placement::Fixed { anchor: Anchor::Top, y: 0.0 });
    assert_eq!(positioned[2].placement, Placement::Fixed { anchor: Anchor::Top, y: 25.0 });
    assert_eq!(positioned[2].lane_index, Some(1));
    assert_eq!(positioned[2].on_screen_duration, config.duration_still);
    assert_eq!(positioned[3].placement, Placement::Fixed { anchor: Anchor::Bottom, y: 1000.0 });
    assert_eq!(positioned[4].placement, Placement::Fixed { anchor: Anchor::Bottom, y: 975.0 });
    assert_eq!(positioned[5].lane_index, Some(0));
    assert_eq!(positioned[5].layer, 2);
    assert!(matches!(
        positioned[5].placement,
        Placement::Scroll { direction: Direction::Rightward, .. },
    ));
}

#[test]
fn test_scaled_size() {

    let canvas = Canvas::new(1920, 1080).unwrap();
    let config = ConversionConfig {
        font_size: 50.0,
        ..ConversionConfig::default()
    };
    let mut comment = sample(0.0, Mode::Top, "big", 0);

    comment.font_size = 36;

    let positioned = allocate(vec![comment], &canvas, &config);

    assert_eq!(positioned[0].size, 72.0);
}

#[test]
fn test_tall_comments_span_lanes() {

    let canvas = Canvas::new(1920, 1080).unwrap();
    let config = ConversionConfig::default();
    let mut big = sample(0.0, Mode::Top, "big", 0);
    let mut tall = sample(0.0, Mode::Bottom, "one\ntwo", 2);

    big.font_size = 36;
    tall.font_size = 25;

    let positioned = allocate(
        vec![big, sample(0.0, Mode::Top, "small", 1), tall, sample(0.0, Mode::Bottom, "x", 3)],
        &canvas,
        &config,
    );

    assert_eq!(positioned[0].lane_index, Some(0));
    assert_eq!(positioned[0].lane_span, 2);
    assert_eq!(positioned[1].lane_index, Some(2));
    assert_eq!(positioned[1].placement, Placement::Fixed { anchor: Anchor::Top, y: 50.0 });
    assert_eq!(positioned[2].lane_span, 2);
    assert_eq!(positioned[3].lane_index, Some(2));
    assert_eq!(positioned[3].placement, Placement::Fixed { anchor: Anchor::Bottom, y: 1030.0 });
}

#[test]
fn test_exit_after_arrival_at_extreme_times() {

    let canvas = Canvas::new(1920, 1080).unwrap();
    let config = ConversionConfig {
        duration_marquee: MIN_DURATION,
        duration_still: MIN_DURATION,
        ..ConversionConfig::default()
    };
    let comments = MODES.iter()
        .enumerate()
        .map(|(index, mode)| {
            let content = match mode {
                Mode::Advanced => r#"[0, 0, "1-0", 0.01, "late"]"#,
                _ => "late",
            };
            sample(MAX_ARRIVAL_TIME, *mode, content, index as u64)
        })
        .collect::<Vec<_>>();
    let positioned = allocate(comments, &canvas, &config);

    for placed in positioned.iter() {
        assert_eq!(placed.arrival_time(), MAX_ARRIVAL_TIME);
        assert!(placed.exit_time > placed.arrival_time(), "{:?}", placed.comment.mode);
    }
}

#[test]
fn test_advanced_bypasses_lanes() {

    let canvas = Canvas::new(1920, 1080).unwrap();
    let config = ConversionConfig::default();
    let positioned = allocate(
        vec![
            sample(1.0, Mode::Advanced, r#"[0, 0, "1-1", 2.5, "scripted"]"#, 0),
            sample(1.0, Mode::Advanced, "not a script", 1),
        ],
        &canvas,
        &config,
    );

    assert_eq!(positioned[0].lane_index, None);
    assert_eq!(positioned[0].layer, ADVANCED_LAYER);
    assert_eq!(positioned[0].exit_time, 3.5);
    assert_eq!(positioned[1].exit_time, 1.0 + config.duration_still);
    assert!(matches!(&positioned[1].placement, Placement::Advanced(motion) if motion.degraded));
}

#[test]
fn test_random_streams() {

    let mut rng = StdRng::seed_from_u64(1920 * 1080);

    for (width, height) in [(1920, 1080), (640, 360), (1280, 200), (320, 60)] {

        let canvas = Canvas::new(width, height).unwrap();
        let config = ConversionConfig::default();
        let max_lanes = config.max_lanes(&canvas);
        let comments = random_stream(&mut rng, 600);
        let positioned = allocate(comments.clone(), &canvas, &config);

        assert_eq!(positioned.len(), comments.len());

        for (original, placed) in comments.iter().zip(positioned.iter()) {
            assert_eq!(&placed.comment, original);
            assert!(placed.exit_time > placed.arrival_time());
            match Category::of(original.mode) {
                Some(category) => {
                    assert_eq!(placed.layer, category.layer());
                    assert!(placed.lane_span >= 1);
                    assert!(
                        placed.lane_index
                            .map(|lane| lane + placed.lane_span <= max_lanes)
                            .unwrap_or(false)
                    );
                }
                None => {
                    assert_eq!(placed.layer, ADVANCED_LAYER);
                    assert_eq!(placed.lane_index, None);
                }
            }
        }

        assert_lane_safety(&positioned, max_lanes);
        assert_eq!(allocate(comments, &canvas, &config), positioned);
    }
}
