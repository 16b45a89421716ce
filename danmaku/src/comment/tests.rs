/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;

/// Builds a nominal white comment for tests elsewhere in the crate.
pub(crate) fn sample(arrival_time: f64, mode: Mode, content: &str, sequence_id: u64) -> Comment {
    Comment {
        arrival_time,
        mode,
        font_size: 25,
        color: 0xFF_FF_FF,
        content: content.to_string(),
        pool: Pool::Normal,
        sequence_id,
        raw_params: match mode {
            Mode::Advanced => Some(content.to_string()),
            _ => None,
        },
        weight: None,
        row_id: sequence_id as i64,
        timestamp: 0,
    }
}

#[test]
fn test_progress_seconds() {

    assert_eq!(Progress::Seconds(1.5).seconds(), 1.5);
    assert_eq!(Progress::Millis(2_250).seconds(), 2.25);
    assert_eq!(Progress::default().seconds(), 0.0);
}

#[test]
fn test_mode_codes() {

    assert_eq!(Mode::from_code(1), Some(Mode::ScrollRightToLeft));
    assert_eq!(Mode::from_code(2), Some(Mode::ScrollLeftToRight));
    assert_eq!(Mode::from_code(3), Some(Mode::ScrollRightToLeft));
    assert_eq!(Mode::from_code(4), Some(Mode::Bottom));
    assert_eq!(Mode::from_code(5), Some(Mode::Top));
    assert_eq!(Mode::from_code(6), Some(Mode::Reverse));
    assert_eq!(Mode::from_code(7), Some(Mode::Advanced));
    assert_eq!(Mode::from_code(8), None);
    assert_eq!(Mode::from_code(9), None);
    assert_eq!(Mode::from_code(0), None);
    assert_eq!(Mode::from_code(-1), None);
}

#[test]
fn test_mode_code_cycle() {

    for mode in [
        Mode::ScrollRightToLeft,
        Mode::ScrollLeftToRight,
        Mode::Top,
        Mode::Bottom,
        Mode::Reverse,
        Mode::Advanced,
    ] {
        assert_eq!(Mode::from_code(mode.code()), Some(mode));
    }
}

#[test]
fn test_pool_codes() {

    assert_eq!(Pool::from_code(0), Pool::Normal);
    assert_eq!(Pool::from_code(1), Pool::Subtitle);
    assert_eq!(Pool::from_code(2), Pool::Special);
    assert_eq!(Pool::from_code(42), Pool::Normal);
}

#[test]
fn test_text_width_ems() {

    assert_eq!(text_width_ems(""), 0.0);
    assert_eq!(text_width_ems("abcd"), 2.0);
    assert_eq!(text_width_ems("弹幕"), 2.0);
    assert_eq!(text_width_ems("ab弹幕"), 3.0);
    assert_eq!(text_width_ems("ab\n弹幕弹幕"), 4.0);
}

#[test]
fn test_canvas_rejects_zero() {

    assert!(Canvas::new(0, 1080).is_err());
    assert!(Canvas::new(1920, 0).is_err());

    let canvas = Canvas::new(1920, 1080).unwrap();

    assert_eq!(canvas.width(), 1920);
    assert_eq!(canvas.height(), 1080);
}
