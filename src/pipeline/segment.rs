//! Letter segmentation by column-density minima.
//!
//! ## Algorithm
//!
//! 1. Find the leftmost column holding any ink; that is where the first
//!    letter starts. A raster without ink starts at its right edge.
//! 2. For each letter, scan the columns `start + min ..= start + max` and
//!    count ink pixels over the full height of each one.
//! 3. The sparsest column is taken as the gap after the letter (the first
//!    one wins ties). Its distance from `start` is the letter's width.
//! 4. The next letter starts where this one ended.
//!
//! Segmentation never inspects what it cuts: it always yields
//! `letter_count` contiguous boxes. Misplaced cuts on tightly kerned glyphs
//! are left to the rotation sweep downstream.

use crate::config::SegmentParams;
use crate::pipeline::preprocess::BinaryRaster;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ink count of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensitySample {
    pub position: u32,
    pub count: u32,
}

/// Horizontal span of one letter; always the full raster height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LetterBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl LetterBox {
    /// First column after the box.
    pub fn right(&self) -> u32 {
        self.left + self.width
    }
}

/// Leftmost ink column, or the raster width when there is no ink.
pub fn find_start_offset(raster: &BinaryRaster) -> u32 {
    (0..raster.width())
        .find(|&x| raster.column_ink_count(x) > 0)
        .unwrap_or(raster.width())
}

/// Column densities for the candidate gap positions after `start`.
pub fn density_window(
    raster: &BinaryRaster,
    start: u32,
    params: &SegmentParams,
) -> Vec<DensitySample> {
    let first = start.saturating_add(params.min_letter_width);
    let last = start.saturating_add(params.max_letter_width);
    (first..=last)
        .map(|position| DensitySample {
            position,
            count: raster.column_ink_count(position),
        })
        .collect()
}

/// Cut the raster into `params.letter_count` boxes, left to right.
pub fn segment(raster: &BinaryRaster, params: &SegmentParams) -> Vec<LetterBox> {
    let first = find_start_offset(raster);
    let mut start = first;
    let mut boxes = Vec::with_capacity(params.letter_count);

    for index in 0..params.letter_count {
        let window = density_window(raster, start, params);
        let gap = window
            .iter()
            .min_by_key(|s| s.count)
            .map(|s| s.position)
            .unwrap_or(start.saturating_add(params.min_letter_width));

        let letter = LetterBox {
            left: start,
            top: 0,
            width: gap - start,
            height: raster.height(),
        };
        debug!(
            "Letter {}: x={}..{} (gap density {})",
            index,
            letter.left,
            letter.right(),
            raster.column_ink_count(gap)
        );
        boxes.push(letter);
        start = letter.right();
    }

    debug!(
        "Segmented {} letters from x={} to x={}",
        boxes.len(),
        first,
        start
    );
    boxes
}
