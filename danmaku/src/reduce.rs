/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Bounds how many comments appear within any short stretch of the timeline.
//!
//! The timeline is cut into windows of fixed width. Within each window the comments are ranked
//! and only the best ones, up to a cap, are kept. Ranking looks at the pool first (subtitle,
//! then special, then normal), then at the weight (highest first, absent counting as zero),
//! and finally at the sequence ID. The kept comments retain their original order.


use super::comment::{Comment, Pool};
use std::{
    cmp::{Ordering, Reverse},
    collections::{BTreeMap, BTreeSet},
};

/// Which windows a comment belongs to and how many of each are kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReduceSettings {
    /// Width of a window in seconds.
    pub window: f64,
    /// Comments kept per window.
    pub cap: usize,
}

/// Returns the index of the window containing `arrival_time`.
pub fn window_index(arrival_time: f64, window: f64) -> u64 {
    (arrival_time / window).floor() as u64
}

/// Drops the lowest-ranked comments of every window that holds more than the cap.
///
/// Returns the kept comments along with the number dropped.
pub fn reduce_comments(comments: Vec<Comment>, settings: ReduceSettings) -> (Vec<Comment>, usize) {

    let mut windows = BTreeMap::<u64, Vec<usize>>::new();

    for (index, comment) in comments.iter().enumerate() {
        windows.entry(window_index(comment.arrival_time, settings.window))
            .or_default()
            .push(index);
    }

    let mut kept = BTreeSet::<usize>::new();

    for members in windows.values_mut() {
        members.sort_by(|a, b| compare_priority(&comments[*a], &comments[*b]));
        kept.extend(members.iter().take(settings.cap));
    }

    let total = comments.len();
    let retained = comments.into_iter()
        .enumerate()
        .filter(|(index, _)| kept.contains(index))
        .map(|(_, comment)| comment)
        .collect::<Vec<_>>();
    let dropped = total - retained.len();

    (retained, dropped)
}

/// Orders comments from most to least worth keeping.
pub fn compare_priority(a: &Comment, b: &Comment) -> Ordering {
    pool_rank(a.pool).cmp(&pool_rank(b.pool))
        .then(Reverse(a.weight.unwrap_or(0)).cmp(&Reverse(b.weight.unwrap_or(0))))
        .then(a.sequence_id.cmp(&b.sequence_id))
}

fn pool_rank(pool: Pool) -> u8 {
    match pool {
        Pool::Subtitle => 0,
        Pool::Special => 1,
        Pool::Normal => 2,
    }
}
