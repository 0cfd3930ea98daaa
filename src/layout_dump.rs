use crate::error::PlotWarning;
use crate::layout::{Axis, PlotLayout};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Flat, renderer-agnostic view of a layout bundle.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub kind: String,
    pub width: f32,
    pub height: f32,
    pub switched: bool,
    pub x_axis: AxisDump,
    pub y_axis: AxisDump,
    pub marks: Vec<MarkDump>,
    pub boxes: Vec<BoxDump>,
    pub warnings: Vec<PlotWarning>,
}

#[derive(Debug, Serialize)]
pub struct AxisDump {
    pub title: String,
    pub labels: Vec<String>,
    pub ticks: Vec<f64>,
    pub range: [f64; 2],
}

#[derive(Debug, Serialize)]
pub struct MarkDump {
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub size: Option<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BoxDump {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub fill: Option<String>,
}

impl AxisDump {
    fn from_axis(axis: &Axis) -> Self {
        Self {
            title: axis.title.clone(),
            labels: axis.ticks.iter().map(|t| t.label.clone()).collect(),
            ticks: axis.ticks.iter().map(|t| t.position).collect(),
            range: [axis.range.0, axis.range.1],
        }
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &PlotLayout) -> Self {
        let canvas = layout.canvas();
        match layout {
            PlotLayout::Dice(dice) => {
                let grid = &dice.grid;
                LayoutDump {
                    kind: "dice".to_string(),
                    width: canvas.width,
                    height: canvas.height,
                    switched: dice.switched,
                    x_axis: AxisDump::from_axis(&grid.x_axis),
                    y_axis: AxisDump::from_axis(&grid.y_axis),
                    marks: grid
                        .marks
                        .iter()
                        .map(|m| MarkDump {
                            x: m.x_pos,
                            y: m.y_pos,
                            color: m.color.clone(),
                            size: None,
                            labels: vec![
                                m.primary.clone(),
                                m.secondary.clone(),
                                m.tertiary.clone(),
                            ],
                        })
                        .collect(),
                    boxes: grid
                        .boxes
                        .iter()
                        .map(|b| BoxDump {
                            x_min: b.x_min,
                            x_max: b.x_max,
                            y_min: b.y_min,
                            y_max: b.y_max,
                            fill: b.fill.clone(),
                        })
                        .collect(),
                    warnings: dice.warnings.clone(),
                }
            }
            PlotLayout::Domino(domino) => {
                let grid = &domino.grid;
                LayoutDump {
                    kind: "domino".to_string(),
                    width: canvas.width,
                    height: canvas.height,
                    switched: domino.switched,
                    x_axis: AxisDump::from_axis(&grid.x_axis),
                    y_axis: AxisDump::from_axis(&grid.y_axis),
                    marks: grid
                        .marks
                        .iter()
                        .map(|m| MarkDump {
                            x: m.x_pos,
                            y: m.y_pos,
                            color: m.color.clone(),
                            size: Some(m.size),
                            labels: vec![
                                m.feature.clone(),
                                m.celltype.clone(),
                                m.contrast.clone(),
                            ],
                        })
                        .collect(),
                    boxes: grid
                        .boxes
                        .iter()
                        .map(|b| BoxDump {
                            x_min: b.x_min,
                            x_max: b.x_max,
                            y_min: b.y_min,
                            y_max: b.y_max,
                            fill: None,
                        })
                        .collect(),
                    warnings: domino.warnings.clone(),
                }
            }
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &PlotLayout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
