use serde::Serialize;

use crate::config::Margins;
use crate::error::PlotWarning;

use super::grid::{AxisSwap, Grid};

/// One mark per dice observation that has a sub-cell position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiceMark {
    pub primary: String,
    pub secondary: String,
    pub tertiary: String,
    pub group: Option<String>,
    pub color: String,
    pub x_num: usize,
    pub y_num: usize,
    pub x_offset: f64,
    pub y_offset: f64,
    pub x_pos: f64,
    pub y_pos: f64,
}

/// One box per distinct (primary, secondary) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxRecord {
    pub primary: String,
    pub secondary: String,
    pub group: Option<String>,
    pub fill: Option<String>,
    pub x_num: usize,
    pub y_num: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominoMark {
    pub feature: String,
    pub celltype: String,
    pub contrast: String,
    pub var: Option<String>,
    pub log_fc: f64,
    /// Log-fold-change clamped to the configured limits.
    pub adj_log_fc: f64,
    pub p_value: f64,
    pub size: f64,
    pub color_position: f64,
    pub color: String,
    pub x_num: usize,
    pub y_num: usize,
    pub x_pos: f64,
    pub y_pos: f64,
}

/// One box per (feature, cell type) pair and contrast slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominoBox {
    pub feature: String,
    pub celltype: String,
    pub contrast: String,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubCellPosition {
    pub x_offset: f64,
    pub y_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
    pub margins: Margins,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorScaleLegend {
    pub title: String,
    pub low: String,
    pub mid: String,
    pub high: String,
    pub limits: (f64, f64),
}

#[derive(Debug, Clone, Serialize)]
pub struct DiceLayout {
    pub grid: Grid<DiceMark, BoxRecord>,
    /// Primary labels in clustered order, independent of axis switching.
    pub primary_order: Vec<String>,
    pub secondary_order: Vec<String>,
    pub positions: Vec<(String, SubCellPosition)>,
    pub tertiary_legend: Vec<LegendEntry>,
    pub tertiary_title: String,
    pub group_legend: Vec<LegendEntry>,
    pub group_alpha: f32,
    pub marker_size: f32,
    pub canvas: Canvas,
    pub title: Option<String>,
    pub switched: bool,
    pub warnings: Vec<PlotWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DominoLayout {
    pub grid: Grid<DominoMark, DominoBox>,
    pub feature_order: Vec<String>,
    pub celltype_order: Vec<String>,
    pub contrast_levels: [String; 2],
    pub contrast_labels: [String; 2],
    pub spacing_factor: usize,
    pub size_bounds: (f64, f64),
    pub color_scale: ColorScaleLegend,
    pub box_opacity: f32,
    pub marker_scale: f32,
    pub canvas: Canvas,
    pub title: Option<String>,
    pub switched: bool,
    pub warnings: Vec<PlotWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotLayout {
    Dice(DiceLayout),
    Domino(DominoLayout),
}

impl PlotLayout {
    pub fn canvas(&self) -> Canvas {
        match self {
            PlotLayout::Dice(layout) => layout.canvas,
            PlotLayout::Domino(layout) => layout.canvas,
        }
    }

    pub fn warnings(&self) -> &[PlotWarning] {
        match self {
            PlotLayout::Dice(layout) => &layout.warnings,
            PlotLayout::Domino(layout) => &layout.warnings,
        }
    }
}

impl AxisSwap for DiceMark {
    fn swap_axes(&mut self) {
        std::mem::swap(&mut self.x_num, &mut self.y_num);
        std::mem::swap(&mut self.x_offset, &mut self.y_offset);
        std::mem::swap(&mut self.x_pos, &mut self.y_pos);
    }
}

impl AxisSwap for BoxRecord {
    fn swap_axes(&mut self) {
        std::mem::swap(&mut self.x_num, &mut self.y_num);
        std::mem::swap(&mut self.x_min, &mut self.y_min);
        std::mem::swap(&mut self.x_max, &mut self.y_max);
    }
}

impl AxisSwap for DominoMark {
    fn swap_axes(&mut self) {
        std::mem::swap(&mut self.x_num, &mut self.y_num);
        std::mem::swap(&mut self.x_pos, &mut self.y_pos);
    }
}

impl AxisSwap for DominoBox {
    fn swap_axes(&mut self) {
        std::mem::swap(&mut self.x_min, &mut self.y_min);
        std::mem::swap(&mut self.x_max, &mut self.y_max);
    }
}
