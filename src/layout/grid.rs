use serde::Serialize;
use std::collections::HashMap;

use crate::config::Margins;

use super::Canvas;

/// Immutable ordered category list. Grid indices are 1-based positions in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedCategories {
    labels: Vec<String>,
    index: HashMap<String, usize>,
}

impl OrderedCategories {
    /// Builds the list, keeping the first occurrence of duplicate labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ordered = Vec::new();
        let mut index = HashMap::new();
        for label in labels {
            let label = label.into();
            if index.contains_key(&label) {
                continue;
            }
            index.insert(label.clone(), ordered.len() + 1);
            ordered.push(label);
        }
        Self {
            labels: ordered,
            index,
        }
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    pub ticks: Vec<Tick>,
    /// Data range shown along the axis.
    pub range: (f64, f64),
    /// Grid units used for canvas sizing.
    pub cells: usize,
}

impl Axis {
    /// One unit cell per category, ticks at the integer indices.
    pub fn categorical(title: impl Into<String>, categories: &OrderedCategories) -> Self {
        let ticks = categories
            .labels()
            .iter()
            .enumerate()
            .map(|(idx, label)| Tick {
                position: (idx + 1) as f64,
                label: label.clone(),
            })
            .collect();
        Self {
            title: title.into(),
            ticks,
            range: (0.5, categories.len() as f64 + 0.5),
            cells: categories.len(),
        }
    }

    /// Two adjacent slots per category, categories `spacing` units apart.
    pub fn paired(title: impl Into<String>, categories: &OrderedCategories, spacing: usize) -> Self {
        let ticks = categories
            .labels()
            .iter()
            .enumerate()
            .map(|(idx, label)| Tick {
                position: (idx * spacing) as f64 + 1.5,
                label: label.clone(),
            })
            .collect();
        let cells = if categories.is_empty() {
            0
        } else {
            (categories.len() - 1) * spacing + 2
        };
        Self {
            title: title.into(),
            ticks,
            range: (0.5, cells as f64 + 0.5),
            cells,
        }
    }
}

/// Relabels x and y. Applying it twice is the identity.
pub trait AxisSwap {
    fn swap_axes(&mut self);
}

/// Marks and boxes positioned on a two-axis categorical grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid<M, B> {
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub marks: Vec<M>,
    pub boxes: Vec<B>,
}

impl<M: AxisSwap, B: AxisSwap> Grid<M, B> {
    pub fn switch_axes(mut self) -> Self {
        std::mem::swap(&mut self.x_axis, &mut self.y_axis);
        for mark in &mut self.marks {
            mark.swap_axes();
        }
        for record in &mut self.boxes {
            record.swap_axes();
        }
        self
    }
}

/// Bounds of a box centered on `(x, y)`: `(x_min, x_max, y_min, y_max)`.
pub fn centered_box(x: f64, y: f64, half_extent: f64) -> (f64, f64, f64, f64) {
    (
        x - half_extent,
        x + half_extent,
        y - half_extent,
        y + half_extent,
    )
}

/// Base x position of a contrast slot (0 or 1) for the 1-based feature index.
pub fn paired_slot(feature_index: usize, slot: usize, spacing: usize) -> f64 {
    ((feature_index - 1) * spacing + 1 + slot) as f64
}

pub fn canvas_size(
    cells_x: usize,
    cells_y: usize,
    box_size: f32,
    margins: Margins,
    explicit: Option<(f32, f32)>,
) -> Canvas {
    let (width, height) = explicit.unwrap_or((
        box_size * cells_x as f32 + margins.left + margins.right,
        box_size * cells_y as f32 + margins.top + margins.bottom,
    ));
    Canvas {
        width,
        height,
        margins,
    }
}
