use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::{DiceLayoutConfig, DiceOptions};
use crate::error::{PlotError, PlotWarning};
use crate::ir::Table;

use super::clustering::{PresenceMatrix, cluster_order};
use super::dice_face::assign_positions;
use super::grid::{Axis, Grid, OrderedCategories, canvas_size, centered_box};
use super::ranking::{GroupAssignment, GroupRanking, order_secondary};
use super::{BoxRecord, DiceLayout, DiceMark, LegendEntry, first_seen_counts};

struct Observation {
    primary: String,
    secondary: String,
    tertiary: String,
    group: Option<String>,
}

fn collect_observations(
    table: &Table,
    options: &DiceOptions,
) -> Result<Vec<Observation>, PlotError> {
    let a = table.require("primary", &options.cat_a)?;
    let b = table.require("secondary", &options.cat_b)?;
    let c = table.require("tertiary", &options.cat_c)?;
    let group = options
        .group
        .as_deref()
        .map(|name| table.require("group", name))
        .transpose()?;

    let mut observations = Vec::with_capacity(table.len());
    let mut incomplete = 0usize;
    for row in 0..table.len() {
        let (Some(primary), Some(secondary), Some(tertiary)) =
            (table.label(row, a), table.label(row, b), table.label(row, c))
        else {
            incomplete += 1;
            continue;
        };
        observations.push(Observation {
            primary: primary.into_owned(),
            secondary: secondary.into_owned(),
            tertiary: tertiary.into_owned(),
            group: group.and_then(|g| table.label(row, g)).map(|g| g.into_owned()),
        });
    }
    if incomplete > 0 {
        tracing::debug!(rows = incomplete, "skipped rows with missing categories");
    }
    Ok(observations)
}

pub fn compute_dice_layout(
    table: &Table,
    options: &DiceOptions,
    config: &DiceLayoutConfig,
) -> Result<DiceLayout, PlotError> {
    options.validate()?;
    let observations = collect_observations(table, options)?;
    let positions = assign_positions(&options.cat_c_colors, options.max_dice_sides)?;
    if observations.is_empty() {
        return Err(PlotError::DegenerateInput {
            field: options.cat_a.clone(),
        });
    }
    tracing::debug!(observations = observations.len(), "computing dice layout");

    let mut warnings = Vec::new();
    let colors = &options.cat_c_colors;

    for (value, count) in first_seen_counts(
        observations
            .iter()
            .map(|o| o.tertiary.as_str())
            .filter(|t| colors.get(t).is_none()),
    ) {
        PlotWarning::UnmappedTertiary {
            value: value.to_string(),
            count,
        }
        .emit(&mut warnings);
    }

    let assignment = if options.group.is_some() {
        GroupAssignment::resolve(
            observations
                .iter()
                .map(|o| (o.secondary.as_str(), o.group.as_deref())),
            &mut warnings,
        )
    } else {
        GroupAssignment::default()
    };

    let ranking = match (&options.group, &options.group_colors) {
        (None, _) => GroupRanking::default(),
        (Some(_), Some(group_colors)) => {
            let ranking = GroupRanking::new(group_colors.keys().map(str::to_string).collect());
            let mut reported = HashSet::new();
            for group in observations.iter().filter_map(|o| o.group.as_deref()) {
                if !ranking.contains(group) && reported.insert(group) {
                    PlotWarning::UnknownGroup {
                        group: group.to_string(),
                    }
                    .emit(&mut warnings);
                }
            }
            ranking
        }
        (Some(_), None) => GroupRanking::new(
            observations
                .iter()
                .filter_map(|o| o.group.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        ),
    };

    let mut matrix = PresenceMatrix::new();
    for obs in &observations {
        matrix.add_row(&obs.primary);
        if colors.get(&obs.tertiary).is_some() {
            matrix.mark(&obs.primary, &obs.secondary, &obs.tertiary);
        }
    }
    let primary = OrderedCategories::new(cluster_order(&matrix, &options.cat_a)?);
    let secondary = OrderedCategories::new(order_secondary(
        observations.iter().map(|o| o.secondary.as_str()),
        &assignment,
        &ranking,
    ));

    let offsets: HashMap<&str, _> = positions.iter().map(|(v, p)| (v.as_str(), *p)).collect();
    let group_rank = |secondary: &str| ranking.reversed_rank(assignment.group_of(secondary));

    let mut marks = Vec::with_capacity(observations.len());
    for obs in &observations {
        let Some(offset) = offsets.get(obs.tertiary.as_str()) else {
            continue;
        };
        let (Some(x_num), Some(y_num)) = (
            primary.index_of(&obs.primary),
            secondary.index_of(&obs.secondary),
        ) else {
            continue;
        };
        marks.push(DiceMark {
            primary: obs.primary.clone(),
            secondary: obs.secondary.clone(),
            tertiary: obs.tertiary.clone(),
            group: assignment.group_of(&obs.secondary).map(str::to_string),
            color: colors.get(&obs.tertiary).unwrap_or_default().to_string(),
            x_num,
            y_num,
            x_offset: offset.x_offset,
            y_offset: offset.y_offset,
            x_pos: x_num as f64 + offset.x_offset,
            y_pos: y_num as f64 + offset.y_offset,
        });
    }
    marks.sort_by_key(|m| (m.x_num, group_rank(&m.secondary), m.y_num));

    let mut seen_pairs = HashSet::new();
    let mut boxes = Vec::new();
    for obs in &observations {
        if !seen_pairs.insert((obs.primary.as_str(), obs.secondary.as_str())) {
            continue;
        }
        let (Some(x_num), Some(y_num)) = (
            primary.index_of(&obs.primary),
            secondary.index_of(&obs.secondary),
        ) else {
            continue;
        };
        let group = assignment.group_of(&obs.secondary).map(str::to_string);
        let fill = group.as_deref().and_then(|g| {
            options
                .group_colors
                .as_ref()
                .and_then(|colors| colors.get(g))
                .map(str::to_string)
        });
        let (x_min, x_max, y_min, y_max) =
            centered_box(x_num as f64, y_num as f64, config.box_half_extent);
        boxes.push(BoxRecord {
            primary: obs.primary.clone(),
            secondary: obs.secondary.clone(),
            group,
            fill,
            x_num,
            y_num,
            x_min,
            x_max,
            y_min,
            y_max,
        });
    }
    boxes.sort_by_key(|b| (b.x_num, group_rank(&b.secondary), b.y_num));

    let mut grid = Grid {
        x_axis: Axis::categorical(
            options.cat_a_label.clone().unwrap_or_else(|| options.cat_a.clone()),
            &primary,
        ),
        y_axis: Axis::categorical(
            options.cat_b_label.clone().unwrap_or_else(|| options.cat_b.clone()),
            &secondary,
        ),
        marks,
        boxes,
    };
    if options.switch_axis {
        grid = grid.switch_axes();
    }

    let explicit = options.width.zip(options.height);
    let canvas = canvas_size(
        grid.x_axis.cells,
        grid.y_axis.cells,
        config.box_size,
        config.margins,
        explicit,
    );

    let tertiary_legend = colors
        .iter()
        .map(|(label, color)| LegendEntry {
            label: label.to_string(),
            color: color.to_string(),
        })
        .collect();
    let group_legend = match (&options.group, &options.group_colors) {
        (Some(_), Some(group_colors)) => group_colors
            .iter()
            .map(|(label, color)| LegendEntry {
                label: label.to_string(),
                color: color.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(DiceLayout {
        grid,
        primary_order: primary.labels().to_vec(),
        secondary_order: secondary.labels().to_vec(),
        positions,
        tertiary_legend,
        tertiary_title: options
            .cat_c_label
            .clone()
            .unwrap_or_else(|| options.cat_c.clone()),
        group_legend,
        group_alpha: options.group_alpha,
        marker_size: config.marker_size,
        canvas,
        title: options.title.clone(),
        switched: options.switch_axis,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ColorMap, Value};

    fn colors() -> ColorMap {
        [("x", "red"), ("y", "blue"), ("z", "green")]
            .into_iter()
            .collect()
    }

    fn table(rows: &[(&str, &str, &str, &str)]) -> Table {
        Table::from_rows(
            &["A", "B", "C", "G"],
            rows.iter()
                .map(|(a, b, c, g)| {
                    vec![
                        Value::from(*a),
                        Value::from(*b),
                        Value::from(*c),
                        Value::from(*g),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn unknown_field_fails_before_geometry() {
        let t = table(&[("a1", "b1", "x", "g1")]);
        let options = DiceOptions::new("A", "Pathway", "C", colors());
        let err = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PlotError::UnknownField {
                role: "secondary",
                field: "Pathway".to_string()
            }
        );
    }

    #[test]
    fn marks_sit_on_grid_plus_offset() {
        let t = table(&[
            ("a1", "b1", "x", "g1"),
            ("a1", "b1", "y", "g1"),
            ("a1", "b2", "z", "g1"),
        ]);
        let options = DiceOptions::new("A", "B", "C", colors());
        let layout = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap();
        assert_eq!(layout.primary_order, vec!["a1"]);
        assert_eq!(layout.secondary_order, vec!["b1", "b2"]);
        let second = &layout.grid.marks[1];
        assert_eq!(second.tertiary, "y");
        assert_eq!((second.x_num, second.y_num), (1, 1));
        assert!((second.x_pos - 0.8).abs() < 1e-12);
        assert!((second.y_pos - 1.2).abs() < 1e-12);
        assert_eq!(layout.grid.boxes.len(), 2);
        let b = &layout.grid.boxes[1];
        assert!((b.y_min - 1.6).abs() < 1e-12 && (b.y_max - 2.4).abs() < 1e-12);
        assert!(b.group.is_none() && b.fill.is_none());
    }

    #[test]
    fn unmapped_tertiary_is_reported_once() {
        let t = table(&[
            ("a1", "b1", "x", "g1"),
            ("a1", "b1", "w", "g1"),
            ("a2", "b1", "w", "g1"),
        ]);
        let options = DiceOptions::new("A", "B", "C", colors());
        let layout = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap();
        assert_eq!(layout.grid.marks.len(), 1);
        assert_eq!(layout.grid.boxes.len(), 2);
        assert_eq!(
            layout.warnings,
            vec![PlotWarning::UnmappedTertiary {
                value: "w".to_string(),
                count: 2
            }]
        );
    }

    #[test]
    fn group_without_colors_ranks_sorted_labels() {
        let t = table(&[
            ("a1", "b1", "x", "alpha"),
            ("a1", "b2", "x", "beta"),
            ("a1", "b3", "x", "beta"),
        ]);
        let mut options = DiceOptions::new("A", "B", "C", colors());
        options.group = Some("G".to_string());
        let layout = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap();
        assert_eq!(layout.secondary_order, vec!["b2", "b3", "b1"]);
        assert!(layout.group_legend.is_empty());
    }

    #[test]
    fn unknown_group_ranks_last_with_warning() {
        let t = table(&[
            ("a1", "b1", "x", "mystery"),
            ("a1", "b2", "x", "known"),
        ]);
        let group_colors: ColorMap = [("known", "#333333")].into_iter().collect();
        let options = DiceOptions::new("A", "B", "C", colors()).with_group("G", group_colors);
        let layout = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap();
        assert_eq!(layout.secondary_order, vec!["b2", "b1"]);
        assert_eq!(
            layout.warnings,
            vec![PlotWarning::UnknownGroup {
                group: "mystery".to_string()
            }]
        );
        let unknown_box = layout.grid.boxes.iter().find(|b| b.secondary == "b1").unwrap();
        assert_eq!(unknown_box.fill, None);
    }

    #[test]
    fn seven_colors_are_a_configuration_error() {
        let t = table(&[("a1", "b1", "x", "g")]);
        let colors: ColorMap = (0..7).map(|i| (format!("v{i}"), "red")).collect();
        let mut options = DiceOptions::new("A", "B", "C", colors);
        options.max_dice_sides = 6;
        let err = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap_err();
        assert_eq!(err, PlotError::UnsupportedCardinality { count: 7 });
    }

    #[test]
    fn empty_table_is_degenerate() {
        let t = table(&[]);
        let options = DiceOptions::new("A", "B", "C", colors());
        let err = compute_dice_layout(&t, &options, &DiceLayoutConfig::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DegenerateInput);
    }
}
