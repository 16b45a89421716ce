/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Places comments onto the canvas.
//!
//! # Overview
//!
//! Every comment that is not advanced belongs to one of four categories, and every category
//! owns an independent set of lanes. A lane is a horizontal row for comments fixed to the top
//! or bottom, and a timeline track for comments scrolling in either direction. Each lane
//! remembers when its latest occupant leaves the screen.
//!
//! Comments are placed in a single pass in processing order. A comment taller than one lane,
//! because of its size or its line count, spans as many consecutive lanes as it needs. It
//! takes the lowest run of lanes that is already free when it arrives, opening new lanes as
//! long as the category has fewer than fit on the canvas. When no run is wide enough, it
//! squeezes into the widest free run, spilling over its neighbours on screen. Only when every
//! lane is busy does it overlap whichever run empties soonest rather than being dropped.
//!
//! Advanced comments bypass lanes entirely; their placement comes from the motion
//! interpreter.

#[cfg(test)]
mod tests;

use super::{
    comment::{text_width_ems, Canvas, Comment, Mode},
    config::ConversionConfig,
    motion::{interpret, Motion},
    normalize::NOMINAL_FONT_SIZE,
};
use std::ops::Range;
use tracing::trace;

/// The layer advanced comments are painted on.
pub const ADVANCED_LAYER: u32 = 0;

/// A group of comments sharing a set of lanes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Category {
    /// Comments scrolling from right to left.
    Leftward,
    /// Comments scrolling from left to right, including reverse comments.
    Rightward,
    Top,
    Bottom,
}

impl Category {

    /// Returns the category of a mode, or `None` for advanced comments.
    pub fn of(mode: Mode) -> Option<Self> {
        match mode {
            Mode::ScrollRightToLeft => Some(Category::Leftward),
            Mode::ScrollLeftToRight | Mode::Reverse => Some(Category::Rightward),
            Mode::Top => Some(Category::Top),
            Mode::Bottom => Some(Category::Bottom),
            Mode::Advanced => None,
        }
    }

    /// The layer the category is painted on. Higher layers are painted over lower ones.
    pub fn layer(&self) -> u32 {
        match self {
            Category::Leftward => 1,
            Category::Rightward => 2,
            Category::Bottom => 3,
            Category::Top => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    Leftward,
    Rightward,
}

/// The edge a fixed comment hangs from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Anchor {
    Top,
    Bottom,
}

/// Resolved geometry, one shape per kind of comment.
#[derive(Clone, Debug, PartialEq)]
pub enum Placement {
    /// Moves across the full canvas width. `y` is the top of the lane.
    Scroll {
        direction: Direction,
        y: f64,
        /// Estimated width of the text in pixels.
        text_width: f64,
    },
    /// Stays horizontally centered. `y` is the top of the lane for [`Anchor::Top`] and its
    /// bottom for [`Anchor::Bottom`].
    Fixed {
        anchor: Anchor,
        y: f64,
    },
    Advanced(Motion),
}

/// A comment with its lane, timing, and geometry resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionedComment {
    pub comment: Comment,
    /// The first lane within the comment's category, or `None` for advanced comments.
    pub lane_index: Option<usize>,
    /// The number of consecutive lanes the comment occupies, starting at `lane_index`.
    pub lane_span: usize,
    /// Seconds the comment is on screen.
    pub on_screen_duration: f64,
    /// Arrival time plus the on-screen duration. This always exceeds the arrival time.
    pub exit_time: f64,
    /// Font size in canvas pixels.
    pub size: f64,
    pub layer: u32,
    pub placement: Placement,
}

impl PositionedComment {

    pub fn arrival_time(&self) -> f64 {
        self.comment.arrival_time
    }
}

/// The lanes of a single category.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneSet {
    exit_times: Vec<f64>,
    max_lanes: usize,
}

impl LaneSet {

    pub fn new(max_lanes: usize) -> Self {
        LaneSet {
            exit_times: Vec::new(),
            max_lanes: max_lanes.max(1),
        }
    }

    /// The number of lanes opened so far.
    pub fn len(&self) -> usize {
        self.exit_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exit_times.is_empty()
    }

    /// Picks up to `span` consecutive lanes for an occupant on screen from `arrival_time`
    /// until `exit_time`, records the occupancy, and returns the lanes taken.
    ///
    /// Lanes that have not been opened yet count as free. The lowest free run of `span` lanes
    /// wins. Failing that, the occupant narrows to the widest free run so that it shares no
    /// lane while any lane is free. Only when every lane is busy does it overlap the run of
    /// `span` lanes that empties soonest.
    pub fn assign(&mut self, arrival_time: f64, exit_time: f64, span: usize) -> Range<usize> {

        let span = span.clamp(1, self.max_lanes);
        let mut widest: Option<Range<usize>> = None;
        let mut run_start = 0;

        for lane in 0..self.max_lanes {
            if self.lane_exit(lane) > arrival_time {
                run_start = lane + 1;
                continue
            }
            let run = run_start..lane + 1;
            if widest.as_ref().map(|widest| run.len() > widest.len()).unwrap_or(true) {
                widest = Some(run);
            }
            if lane + 1 - run_start == span {
                break
            }
        }

        let lanes = match widest {
            Some(run) => run,
            None => {
                let mut earliest = 0;
                for start in 1..=self.max_lanes - span {
                    if self.run_exit(start, span) < self.run_exit(earliest, span) {
                        earliest = start;
                    }
                }
                trace!(lane = earliest, span, arrival_time, "all lanes occupied, overlapping");
                earliest..earliest + span
            }
        };

        if self.exit_times.len() < lanes.end {
            self.exit_times.resize(lanes.end, arrival_time);
        }
        for lane_exit in self.exit_times[lanes.clone()].iter_mut() {
            *lane_exit = lane_exit.max(exit_time);
        }

        lanes
    }

    fn lane_exit(&self, lane: usize) -> f64 {
        self.exit_times.get(lane).copied().unwrap_or(f64::NEG_INFINITY)
    }

    /// The time at which every lane of a run is free again.
    fn run_exit(&self, start: usize, span: usize) -> f64 {
        (start..start + span)
            .map(|lane| self.lane_exit(lane))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// The number of lanes a comment of `size` pixels needs for its `lines`.
pub fn lanes_needed(size: f64, lines: usize, lane_height: f64) -> usize {
    ((size * lines as f64) / lane_height).ceil().max(1.0) as usize
}

/// The font size of a comment in canvas pixels.
pub fn scaled_size(comment: &Comment, config: &ConversionConfig) -> f64 {
    comment.font_size as f64 * config.font_size / NOMINAL_FONT_SIZE as f64
}

/// How long a scroll comment takes to cross a canvas `canvas_width` pixels wide, given its
/// own width in pixels. Wider text and narrower canvases both take longer.
pub fn scroll_duration(text_width: f64, canvas_width: f64, config: &ConversionConfig) -> f64 {
    config.duration_marquee * (canvas_width + text_width) / canvas_width
}

/// Places every comment in a single pass.
///
/// `comments` must already be in processing order. The output keeps that order and holds
/// exactly one entry per input comment.
pub fn allocate(
    comments: Vec<Comment>,
    canvas: &Canvas,
    config: &ConversionConfig,
) -> Vec<PositionedComment> {

    let max_lanes = config.max_lanes(canvas);
    let lane_height = config.lane_height();
    let width = canvas.width() as f64;
    let bottom = (canvas.height() - config.bottom_reserved.min(canvas.height())) as f64;
    let mut leftward = LaneSet::new(max_lanes);
    let mut rightward = LaneSet::new(max_lanes);
    let mut top = LaneSet::new(max_lanes);
    let mut bottom_lanes = LaneSet::new(max_lanes);
    let mut positioned = Vec::with_capacity(comments.len());

    for comment in comments {

        let size = scaled_size(&comment, config);
        let arrival_time = comment.arrival_time;
        let category = match Category::of(comment.mode) {
            Some(category) => category,
            None => {
                let motion = interpret(&comment, size, canvas, config);
                let on_screen_duration = motion.lifetime;
                positioned.push(
                    PositionedComment {
                        comment,
                        lane_index: None,
                        lane_span: 0,
                        on_screen_duration,
                        exit_time: arrival_time + on_screen_duration,
                        size,
                        layer: ADVANCED_LAYER,
                        placement: Placement::Advanced(motion),
                    }
                );
                continue
            }
        };
        let text_width = text_width_ems(&comment.content) * size;
        let on_screen_duration = match category {
            Category::Leftward | Category::Rightward => scroll_duration(text_width, width, config),
            Category::Top | Category::Bottom => config.duration_still,
        };
        let exit_time = arrival_time + on_screen_duration;
        let lanes = match category {
            Category::Leftward => &mut leftward,
            Category::Rightward => &mut rightward,
            Category::Top => &mut top,
            Category::Bottom => &mut bottom_lanes,
        };
        let taken = lanes.assign(
            arrival_time,
            exit_time,
            lanes_needed(size, comment.line_count(), lane_height),
        );
        let offset = taken.start as f64 * lane_height;
        let placement = match category {
            Category::Leftward => Placement::Scroll {
                direction: Direction::Leftward,
                y: offset,
                text_width,
            },
            Category::Rightward => Placement::Scroll {
                direction: Direction::Rightward,
                y: offset,
                text_width,
            },
            Category::Top => Placement::Fixed {
                anchor: Anchor::Top,
                y: offset,
            },
            Category::Bottom => Placement::Fixed {
                anchor: Anchor::Bottom,
                y: bottom - offset,
            },
        };

        positioned.push(
            PositionedComment {
                comment,
                lane_index: Some(taken.start),
                lane_span: taken.len(),
                on_screen_duration,
                exit_time,
                size,
                layer: category.layer(),
                placement,
            }
        );
    }

    positioned
}
