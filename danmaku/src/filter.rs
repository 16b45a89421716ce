/*
 * SPDX-FileCopyrightText: 2021 William Swartzendruber <wswartzendruber@gmail.com>
 *
 * SPDX-License-Identifier: OSL-3.0
 */

//! Leaves out comments the viewer asked not to see.


use super::{
    comment::{Comment, Mode},
    config::{BlockOptions, ConfigResult},
    normalize::MAX_COLOR,
};
use regex::Regex;

/// Block options with their keyword patterns compiled.
///
/// A filter is built once per conversion and dropped with it.
#[derive(Clone, Debug)]
pub struct CommentFilter<'a> {
    options: &'a BlockOptions,
    patterns: Vec<Regex>,
}

impl<'a> CommentFilter<'a> {

    pub fn new(options: &'a BlockOptions) -> ConfigResult<Self> {

        let mut patterns = Vec::with_capacity(options.keyword_patterns.len());

        for pattern in options.keyword_patterns.iter() {
            patterns.push(Regex::new(pattern)?);
        }

        Ok(CommentFilter { options, patterns })
    }

    /// Whether any block option is in effect at all.
    pub fn is_active(&self) -> bool {
        let options = self.options;
        options.top
            || options.bottom
            || options.scroll
            || options.reverse
            || options.special
            || options.colorful
            || !self.patterns.is_empty()
    }

    pub fn allows(&self, comment: &Comment) -> bool {

        let blocked_mode = match comment.mode {
            Mode::Top => self.options.top,
            Mode::Bottom => self.options.bottom,
            Mode::ScrollRightToLeft => self.options.scroll,
            Mode::ScrollLeftToRight | Mode::Reverse => self.options.reverse,
            Mode::Advanced => self.options.special,
        };

        if blocked_mode {
            return false
        }
        if self.options.colorful && comment.color != MAX_COLOR {
            return false
        }

        !self.patterns.iter().any(|pattern| pattern.is_match(&comment.content))
    }

    /// Keeps the allowed comments in their original order, returning how many were blocked.
    pub fn apply(&self, comments: Vec<Comment>) -> (Vec<Comment>, usize) {

        if !self.is_active() {
            return (comments, 0)
        }

        let total = comments.len();
        let kept = comments.into_iter()
            .filter(|comment| self.allows(comment))
            .collect::<Vec<_>>();
        let blocked = total - kept.len();

        (kept, blocked)
    }
}
