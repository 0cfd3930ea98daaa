use std::collections::{BTreeSet, HashSet};

use crate::config::{DominoLayoutConfig, DominoOptions};
use crate::error::{PlotError, PlotWarning};
use crate::ir::Table;
use crate::theme::three_stop_color;

use super::encoding::{ColorScale, SizeScale};
use super::grid::{Axis, Grid, OrderedCategories, canvas_size, centered_box, paired_slot};
use super::{ColorScaleLegend, DominoBox, DominoLayout, DominoMark, first_seen_counts};

struct Row {
    feature: String,
    celltype: String,
    slot: usize,
    var: Option<String>,
    log_fc: f64,
    p_value: f64,
}

struct Columns {
    feature: usize,
    celltype: usize,
    contrast: usize,
    var: Option<usize>,
    log_fc: usize,
    p_value: usize,
}

impl Columns {
    fn resolve(table: &Table, options: &DominoOptions) -> Result<Self, PlotError> {
        Ok(Self {
            feature: table.require("feature", &options.feature_col)?,
            celltype: table.require("cell type", &options.celltype_col)?,
            contrast: table.require("contrast", &options.contrast_col)?,
            var: table.column_index(&options.var_id),
            log_fc: table.require("log-fold-change", &options.logfc_col)?,
            p_value: table.require("p-value", &options.pval_col)?,
        })
    }
}

fn collect_rows(
    table: &Table,
    options: &DominoOptions,
    warnings: &mut Vec<PlotWarning>,
) -> Result<Vec<Row>, PlotError> {
    let columns = Columns::resolve(table, options)?;
    let listed: Option<HashSet<&str>> = options
        .gene_list
        .as_ref()
        .map(|genes| genes.iter().map(String::as_str).collect());

    let mut unknown_contrasts = Vec::new();
    let mut unlisted = Vec::new();
    let mut incomplete = 0usize;
    let mut rows = Vec::with_capacity(table.len());

    for row in 0..table.len() {
        let (Some(feature), Some(celltype), Some(contrast)) = (
            table.label(row, columns.feature),
            table.label(row, columns.celltype),
            table.label(row, columns.contrast),
        ) else {
            incomplete += 1;
            continue;
        };
        let Some(slot) = options.contrast_levels.iter().position(|l| *l == contrast) else {
            unknown_contrasts.push(contrast.into_owned());
            continue;
        };
        if listed.as_ref().is_some_and(|genes| !genes.contains(&*feature)) {
            unlisted.push(feature.into_owned());
            continue;
        }
        let Some(log_fc) = table.number(row, columns.log_fc).filter(|v| !v.is_nan()) else {
            PlotWarning::InvalidNumber {
                field: options.logfc_col.clone(),
                row,
            }
            .emit(warnings);
            continue;
        };
        let Some(p_value) = table.number(row, columns.p_value) else {
            PlotWarning::InvalidNumber {
                field: options.pval_col.clone(),
                row,
            }
            .emit(warnings);
            continue;
        };
        rows.push(Row {
            feature: feature.into_owned(),
            celltype: celltype.into_owned(),
            slot,
            var: columns
                .var
                .and_then(|v| table.label(row, v))
                .map(|v| v.into_owned()),
            log_fc,
            p_value,
        });
    }

    if incomplete > 0 {
        tracing::debug!(rows = incomplete, "skipped rows with missing categories");
    }
    for (value, count) in first_seen_counts(unknown_contrasts.iter().map(String::as_str)) {
        PlotWarning::UnknownContrast {
            value: value.to_string(),
            count,
        }.emit(warnings);
    }
    for (feature, count) in first_seen_counts(unlisted.iter().map(String::as_str)) {
        PlotWarning::UnlistedFeature {
            feature: feature.to_string(),
            count,
        }.emit(warnings);
    }
    Ok(rows)
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn compute_domino_layout(
    table: &Table,
    options: &DominoOptions,
    config: &DominoLayoutConfig,
) -> Result<DominoLayout, PlotError> {
    options.validate()?;
    let mut warnings = Vec::new();
    let mut rows = collect_rows(table, options, &mut warnings)?;

    let features = OrderedCategories::new(match &options.gene_list {
        Some(genes) => genes.clone(),
        None => sorted_distinct(rows.iter().map(|r| r.feature.as_str())),
    });
    let celltypes = OrderedCategories::new(match &options.celltype_order {
        Some(order) => order.clone(),
        None => sorted_distinct(rows.iter().map(|r| r.celltype.as_str())),
    });

    let before = rows.len();
    rows.retain(|r| celltypes.index_of(&r.celltype).is_some());
    if rows.len() < before {
        tracing::debug!(
            rows = before - rows.len(),
            "dropped rows outside the cell type order"
        );
    }
    if rows.is_empty() {
        return Err(PlotError::DegenerateInput {
            field: options.feature_col.clone(),
        });
    }
    tracing::debug!(
        rows = rows.len(),
        features = features.len(),
        celltypes = celltypes.len(),
        "computing domino layout"
    );

    let spacing = options.spacing_factor;
    let sizes = SizeScale::fit(
        rows.iter().map(|r| r.p_value),
        options.min_dot_size,
        options.max_dot_size,
    );
    let colors = ColorScale::new(options.logfc_limits.0, options.logfc_limits.1);
    let anchors = &options.logfc_colors;

    let mut marks = Vec::with_capacity(rows.len());
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    let mut seen_pairs = HashSet::new();
    for row in &rows {
        let (Some(x_num), Some(y_num)) = (
            features.index_of(&row.feature),
            celltypes.index_of(&row.celltype),
        ) else {
            continue;
        };
        if seen_pairs.insert((x_num, y_num)) {
            pairs.push((x_num, y_num));
        }
        let color_position = colors.position(row.log_fc);
        marks.push(DominoMark {
            feature: row.feature.clone(),
            celltype: row.celltype.clone(),
            contrast: options.contrast_levels[row.slot].clone(),
            var: row.var.clone(),
            log_fc: row.log_fc,
            adj_log_fc: colors.clamp(row.log_fc),
            p_value: row.p_value,
            size: sizes.size(row.p_value),
            color_position,
            color: three_stop_color(&anchors.low, &anchors.mid, &anchors.high, color_position),
            x_num,
            y_num,
            x_pos: paired_slot(x_num, row.slot, spacing),
            y_pos: y_num as f64,
        });
    }
    marks.sort_by(|a, b| {
        (a.x_num, a.y_num)
            .cmp(&(b.x_num, b.y_num))
            .then(a.x_pos.total_cmp(&b.x_pos))
    });

    pairs.sort_unstable();
    let labels = features.labels();
    let cells = celltypes.labels();
    let mut boxes = Vec::with_capacity(pairs.len() * 2);
    for (x_num, y_num) in pairs {
        for (slot, contrast) in options.contrast_levels.iter().enumerate() {
            let (x_min, x_max, y_min, y_max) = centered_box(
                paired_slot(x_num, slot, spacing),
                y_num as f64,
                config.box_half_extent,
            );
            boxes.push(DominoBox {
                feature: labels[x_num - 1].clone(),
                celltype: cells[y_num - 1].clone(),
                contrast: contrast.clone(),
                x_min,
                x_max,
                y_min,
                y_max,
            });
        }
    }

    let mut grid = Grid {
        x_axis: Axis::paired("Genes", &features, spacing),
        y_axis: Axis::categorical("Cell Types", &celltypes),
        marks,
        boxes,
    };
    if options.switch_axis {
        grid = grid.switch_axes();
    }
    // Explicit labels name the drawn axes, after any switch.
    if let Some(xlabel) = &options.xlabel {
        grid.x_axis.title = xlabel.clone();
    }
    if let Some(ylabel) = &options.ylabel {
        grid.y_axis.title = ylabel.clone();
    }
    let canvas = canvas_size(
        grid.x_axis.cells,
        grid.y_axis.cells,
        config.box_size,
        config.margins,
        options.width.zip(options.height),
    );

    let levels = [
        options.contrast_levels[0].clone(),
        options.contrast_levels[1].clone(),
    ];
    let contrast_labels = match &options.contrast_labels {
        Some(labels) => [labels[0].clone(), labels[1].clone()],
        None => levels.clone(),
    };

    Ok(DominoLayout {
        grid,
        feature_order: features.labels().to_vec(),
        celltype_order: celltypes.labels().to_vec(),
        contrast_levels: levels,
        contrast_labels,
        spacing_factor: spacing,
        size_bounds: (options.min_dot_size, options.max_dot_size),
        color_scale: ColorScaleLegend {
            title: options.color_scale_name.clone(),
            low: anchors.low.clone(),
            mid: anchors.mid.clone(),
            high: anchors.high.clone(),
            limits: options.logfc_limits,
        },
        box_opacity: config.box_opacity,
        marker_scale: config.marker_scale,
        canvas,
        title: options.title.clone(),
        switched: options.switch_axis,
        warnings,
    })
}
