use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use diceplot_rs::config::{Config, load_options};
use diceplot_rs::layout::{PlotRequest, compute_layout};
use diceplot_rs::parser::load_table;
use diceplot_rs::render::{Backend, OutputFormat, renderer_for};
use diceplot_rs::{
    ColorMap, DiceLayout, DiceOptions, DominoLayout, DominoOptions, PlotLayout, PlotWarning,
    Table, Value, compute_dice_layout, compute_domino_layout,
};

fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(rel)
}

fn pathology() -> (Table, DiceOptions) {
    let table = load_table(&fixture("dice_pathology.csv")).expect("fixture read failed");
    let options: DiceOptions =
        load_options(Some(fixture("dice_options.json").as_path())).expect("options read failed");
    (table, options)
}

fn pathology_layout() -> DiceLayout {
    let (table, options) = pathology();
    compute_dice_layout(&table, &options, &Config::default().dice).expect("layout failed")
}

fn domino_layout(options: &DominoOptions) -> DominoLayout {
    let table = load_table(&fixture("domino_de.tsv")).expect("fixture read failed");
    compute_domino_layout(&table, options, &Config::default().domino).expect("layout failed")
}

fn assert_valid_svg(svg: &str, fixture: &str) {
    assert!(svg.contains("<svg"), "{fixture}: missing <svg tag");
    assert!(svg.contains("</svg>"), "{fixture}: missing </svg tag");
}

#[test]
fn worked_example_uses_four_corner_faces() {
    let layout = pathology_layout();
    let positions: Vec<(&str, f64, f64)> = layout
        .positions
        .iter()
        .map(|(value, p)| (value.as_str(), p.x_offset, p.y_offset))
        .collect();
    assert_eq!(
        positions,
        vec![
            ("Amyloid", -0.2, 0.2),
            ("NFT", 0.2, 0.2),
            ("Tangles", -0.2, -0.2),
            ("Plaq N", 0.2, -0.2),
        ]
    );
    assert!(layout.warnings.is_empty(), "{:?}", layout.warnings);
}

#[test]
fn worked_example_has_one_box_per_observed_pair() {
    let (table, _) = pathology();
    let observed: HashSet<(String, String)> = (0..table.len())
        .map(|row| {
            (
                table.label(row, 0).unwrap().into_owned(),
                table.label(row, 1).unwrap().into_owned(),
            )
        })
        .collect();
    let layout = pathology_layout();
    assert!(layout.grid.boxes.len() <= 75);
    assert_eq!(layout.grid.boxes.len(), observed.len());
    let boxed: HashSet<(String, String)> = layout
        .grid
        .boxes
        .iter()
        .map(|b| (b.primary.clone(), b.secondary.clone()))
        .collect();
    assert_eq!(boxed, observed);
    assert_eq!(layout.grid.marks.len(), table.len());
}

#[test]
fn worked_example_orders_and_canvas() {
    let layout = pathology_layout();
    let mut primary = layout.primary_order.clone();
    primary.sort();
    assert_eq!(
        primary,
        vec!["Astrocyte", "Endothelial", "Microglia", "Neuron", "Oligodendrocyte"]
    );
    assert_eq!(layout.secondary_order.len(), 15);

    // Secondary categories are grouped by reversed group ranking.
    let group_of: HashMap<&str, &str> = layout
        .grid
        .boxes
        .iter()
        .map(|b| (b.secondary.as_str(), b.group.as_deref().unwrap()))
        .collect();
    let groups: Vec<&str> = layout
        .secondary_order
        .iter()
        .map(|s| group_of[s.as_str()])
        .collect();
    let first_bbb = groups.iter().position(|g| *g == "BBB-linked").unwrap();
    let last_other = groups.iter().rposition(|g| *g == "Other").unwrap();
    assert!(last_other < first_bbb);

    assert_eq!(layout.canvas.width, 50.0 * 5.0 + 150.0 + 300.0);
    assert_eq!(layout.canvas.height, 50.0 * 15.0 + 100.0 + 200.0);
    let fill = layout
        .grid
        .boxes
        .iter()
        .find(|b| b.group.as_deref() == Some("BBB-linked"))
        .and_then(|b| b.fill.clone());
    assert_eq!(fill.as_deref(), Some("#333333"));
}

#[test]
fn clustering_is_deterministic() {
    let first = pathology_layout();
    let second = pathology_layout();
    assert_eq!(first.primary_order, second.primary_order);
    assert_eq!(first.secondary_order, second.secondary_order);
    assert_eq!(first.grid, second.grid);
}

#[test]
fn single_primary_category_skips_clustering() {
    let table = Table::from_rows(
        &["CellType", "Pathway", "Var"],
        vec![
            vec!["Neuron".into(), "Apoptosis".into(), "Amyloid".into()],
            vec!["Neuron".into(), "Metabolism".into(), "NFT".into()],
        ],
    );
    let colors: ColorMap = [("Amyloid", "#d5cccd"), ("NFT", "#cb9992"), ("Tangles", "#ad310f")]
        .into_iter()
        .collect();
    let options = DiceOptions::new("CellType", "Pathway", "Var", colors);
    let layout = compute_dice_layout(&table, &options, &Config::default().dice).unwrap();
    assert_eq!(layout.primary_order, vec!["Neuron"]);
    assert_eq!(layout.canvas.width, 50.0 + 450.0);
}

#[test]
fn conflicting_groups_warn_and_use_first_seen() {
    let table = Table::from_rows(
        &["CellType", "Pathway", "Var", "Group"],
        vec![
            vec!["Neuron".into(), "Apoptosis".into(), "Amyloid".into(), "Other".into()],
            vec!["Astrocyte".into(), "Apoptosis".into(), "NFT".into(), "BBB-linked".into()],
            vec!["Astrocyte".into(), "Metabolism".into(), "NFT".into(), "BBB-linked".into()],
        ],
    );
    let colors: ColorMap = [("Amyloid", "#d5cccd"), ("NFT", "#cb9992"), ("Tangles", "#ad310f")]
        .into_iter()
        .collect();
    let groups: ColorMap = [("BBB-linked", "#333333"), ("Other", "#DDDDDD")]
        .into_iter()
        .collect();
    let options =
        DiceOptions::new("CellType", "Pathway", "Var", colors).with_group("Group", groups);
    let layout = compute_dice_layout(&table, &options, &Config::default().dice).unwrap();

    assert_eq!(
        layout.warnings,
        vec![PlotWarning::MultipleGroups {
            secondary: "Apoptosis".to_string(),
            groups: vec!["Other".to_string(), "BBB-linked".to_string()],
        }]
    );
    for record in layout.grid.boxes.iter().filter(|b| b.secondary == "Apoptosis") {
        assert_eq!(record.group.as_deref(), Some("Other"));
        assert_eq!(record.fill.as_deref(), Some("#DDDDDD"));
    }
}

#[test]
fn unknown_field_is_a_configuration_error() {
    let (table, mut options) = pathology();
    options.group = Some("Lineage".to_string());
    let err = compute_dice_layout(&table, &options, &Config::default().dice).unwrap_err();
    assert_eq!(err.kind(), diceplot_rs::ErrorKind::Configuration);
    assert!(err.to_string().contains("Lineage"));
}

#[test]
fn switched_dice_layout_round_trips() {
    let (table, mut options) = pathology();
    let plain = compute_dice_layout(&table, &options, &Config::default().dice).unwrap();
    options.switch_axis = true;
    let switched = compute_dice_layout(&table, &options, &Config::default().dice).unwrap();
    assert_eq!(switched.grid.x_axis, plain.grid.y_axis);
    assert_eq!(switched.canvas.width, 50.0 * 15.0 + 450.0);
    assert_eq!(switched.grid.clone().switch_axes(), plain.grid);
}

#[test]
fn domino_zero_p_value_gets_max_size() {
    let layout = domino_layout(&DominoOptions::default());
    let zero = layout
        .grid
        .marks
        .iter()
        .find(|m| m.p_value == 0.0)
        .expect("fixture has a zero p-value");
    assert_eq!(zero.size, 5.0);
    assert_eq!(zero.feature, "APOE");
    for mark in &layout.grid.marks {
        assert!((1.0..=5.0).contains(&mark.size));
        assert!((0.0..=1.0).contains(&mark.color_position));
    }
}

#[test]
fn domino_geometry_follows_spacing() {
    let layout = domino_layout(&DominoOptions::default());
    assert_eq!(
        layout.feature_order,
        vec!["APOE", "GFAP", "MBP", "SNAP25", "SPP1", "TREM2"]
    );
    assert_eq!(layout.celltype_order, vec!["Astrocyte", "Microglia", "Neuron"]);
    for mark in &layout.grid.marks {
        let slot = if mark.contrast == "Clinical" { 1 } else { 2 };
        assert_eq!(mark.x_pos, ((mark.x_num - 1) * 3 + slot) as f64);
        assert_eq!(mark.y_pos, mark.y_num as f64);
    }
    assert_eq!(layout.grid.boxes.len(), 6 * 3 * 2);
    assert_eq!(layout.grid.x_axis.cells, 17);
    assert_eq!(layout.canvas.width, 50.0 * 17.0 + 450.0);
    assert_eq!(layout.grid.marks.iter().filter(|m| m.var.is_some()).count(), layout.grid.marks.len());
}

#[test]
fn domino_gene_list_filters_and_warns() {
    let options = DominoOptions {
        gene_list: Some(vec!["SPP1".to_string(), "APOE".to_string()]),
        ..Default::default()
    };
    let layout = domino_layout(&options);
    assert_eq!(layout.feature_order, vec!["SPP1", "APOE"]);
    assert!(
        layout
            .grid
            .marks
            .iter()
            .all(|m| m.feature == "SPP1" || m.feature == "APOE")
    );
    assert_eq!(
        layout
            .warnings
            .iter()
            .filter(|w| matches!(w, PlotWarning::UnlistedFeature { .. }))
            .count(),
        4
    );
}

#[test]
fn render_all_fixtures() {
    let config = Config::default();
    let dice = PlotRequest::Dice(
        load_options(Some(fixture("dice_options.json").as_path())).expect("options read failed"),
    );
    let domino = PlotRequest::Domino(DominoOptions::default());

    // Keep this list explicit so new fixtures must be added intentionally.
    let candidates = [
        ("dice_pathology.csv", &dice),
        ("domino_de.tsv", &domino),
    ];

    for (rel, request) in candidates {
        let path = fixture(rel);
        assert!(path.exists(), "fixture missing: {rel}");
        let table = load_table(&path).expect("fixture read failed");
        let layout = compute_layout(&table, request, &config).expect("layout failed");
        for backend in [Backend::Svg, Backend::Html] {
            let figure = renderer_for(backend).render(&layout, &config.theme);
            assert_valid_svg(&figure.svg, rel);
            assert_eq!(figure.width, layout.canvas().width);
        }
    }
}

#[test]
fn save_writes_requested_formats() {
    let dir = tempfile::tempdir().unwrap();
    let layout = PlotLayout::Domino(domino_layout(&DominoOptions {
        title: Some("DE <contrasts>".to_string()),
        ..Default::default()
    }));
    let renderer = renderer_for(Backend::Html);
    let figure = renderer.render(&layout, &Config::default().theme);
    let written = renderer
        .save(&figure, dir.path(), "domino", &[OutputFormat::Html, OutputFormat::Svg])
        .unwrap();
    assert_eq!(
        written,
        vec![dir.path().join("domino.html"), dir.path().join("domino.svg")]
    );
    let page = std::fs::read_to_string(&written[0]).unwrap();
    assert!(page.contains("<title>DE &lt;contrasts&gt;</title>"));
    assert!(page.contains("log2FC"));
}

#[test]
fn numeric_categories_are_labels() {
    let table = Table::from_rows(
        &["Donor", "Region", "Stage"],
        vec![
            vec![Value::from(1.0), "Cortex".into(), Value::from(2.0)],
            vec![Value::from(2.0), "Cortex".into(), Value::from(3.0)],
        ],
    );
    let colors: ColorMap = [("2", "red"), ("3", "blue")].into_iter().collect();
    let options = DiceOptions::new("Donor", "Region", "Stage", colors);
    let layout = compute_dice_layout(&table, &options, &Config::default().dice).unwrap();
    assert_eq!(layout.grid.marks.len(), 2);
    let mut order = layout.primary_order.clone();
    order.sort();
    assert_eq!(order, vec!["1", "2"]);
}
