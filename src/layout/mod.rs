mod clustering;
mod dice;
mod dice_face;
mod domino;
mod encoding;
pub(crate) mod grid;
mod ranking;
pub(crate) mod types;

pub use clustering::{Merge, PresenceMatrix, cluster_order, leaf_order, ward_linkage};
pub use dice::compute_dice_layout;
pub use dice_face::{assign_positions, face_offsets};
pub use domino::compute_domino_layout;
pub use encoding::{ColorScale, SizeScale, significance};
pub use grid::{Axis, AxisSwap, Grid, OrderedCategories, Tick};
pub use ranking::{GroupAssignment, GroupRanking, order_secondary};
pub use types::*;

use std::collections::HashMap;

use crate::config::Config;
use crate::error::PlotError;
use crate::ir::Table;

/// Which plot to assemble, with its per-plot options.
#[derive(Debug, Clone)]
pub enum PlotRequest {
    Dice(crate::config::DiceOptions),
    Domino(crate::config::DominoOptions),
}

pub fn compute_layout(
    table: &Table,
    request: &PlotRequest,
    config: &Config,
) -> Result<PlotLayout, PlotError> {
    match request {
        PlotRequest::Dice(options) => {
            compute_dice_layout(table, options, &config.dice).map(PlotLayout::Dice)
        }
        PlotRequest::Domino(options) => {
            compute_domino_layout(table, options, &config.domino).map(PlotLayout::Domino)
        }
    }
}

/// Counts per value in first-seen order.
pub(crate) fn first_seen_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for value in values {
        match slots.get(value) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }
    counts
}
