use crate::error::PlotError;
use crate::ir::ColorMap;
use crate::render::{Backend, OutputFormat};
use crate::theme::{Theme, parse_color};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            left: 150.0,
            right: 300.0,
            top: 100.0,
            bottom: 200.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceLayoutConfig {
    /// Pixels per grid cell.
    pub box_size: f32,
    pub margins: Margins,
    pub box_half_extent: f64,
    pub marker_size: f32,
}

impl Default for DiceLayoutConfig {
    fn default() -> Self {
        Self {
            box_size: 50.0,
            margins: Margins::default(),
            box_half_extent: 0.4,
            marker_size: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DominoLayoutConfig {
    pub box_size: f32,
    pub margins: Margins,
    pub box_half_extent: f64,
    /// Marker radius in pixels per size unit.
    pub marker_scale: f32,
    pub box_opacity: f32,
}

impl Default for DominoLayoutConfig {
    fn default() -> Self {
        Self {
            box_size: 50.0,
            margins: Margins::default(),
            box_half_extent: 0.4,
            marker_scale: 2.0,
            box_opacity: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub backend: Option<Backend>,
    pub formats: Vec<OutputFormat>,
    pub output_dir: PathBuf,
    pub base_name: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: None,
            formats: vec![OutputFormat::Svg],
            output_dir: PathBuf::from("."),
            base_name: "plot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub dice: DiceLayoutConfig,
    pub domino: DominoLayoutConfig,
    pub render: RenderConfig,
}

/// Caller-facing options for a dice plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiceOptions {
    pub cat_a: String,
    pub cat_b: String,
    pub cat_c: String,
    pub group: Option<String>,
    pub cat_c_colors: ColorMap,
    pub group_colors: Option<ColorMap>,
    pub switch_axis: bool,
    pub group_alpha: f32,
    pub title: Option<String>,
    pub max_dice_sides: usize,
    pub cat_a_label: Option<String>,
    pub cat_b_label: Option<String>,
    pub cat_c_label: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl Default for DiceOptions {
    fn default() -> Self {
        Self {
            cat_a: String::new(),
            cat_b: String::new(),
            cat_c: String::new(),
            group: None,
            cat_c_colors: ColorMap::new(),
            group_colors: None,
            switch_axis: false,
            group_alpha: 0.6,
            title: None,
            max_dice_sides: 6,
            cat_a_label: None,
            cat_b_label: None,
            cat_c_label: None,
            width: None,
            height: None,
        }
    }
}

impl DiceOptions {
    pub fn new(
        cat_a: impl Into<String>,
        cat_b: impl Into<String>,
        cat_c: impl Into<String>,
        cat_c_colors: ColorMap,
    ) -> Self {
        Self {
            cat_a: cat_a.into(),
            cat_b: cat_b.into(),
            cat_c: cat_c.into(),
            cat_c_colors,
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>, group_colors: ColorMap) -> Self {
        self.group = Some(group.into());
        self.group_colors = Some(group_colors);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), PlotError> {
        if !(0.0..=1.0).contains(&self.group_alpha) {
            return Err(PlotError::invalid(
                "group_alpha",
                format!("{} is outside 0..=1", self.group_alpha),
            ));
        }
        if self.max_dice_sides == 0 || self.max_dice_sides > 6 {
            return Err(PlotError::UnsupportedCardinality {
                count: self.max_dice_sides,
            });
        }
        validate_dimensions(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFcColors {
    pub low: String,
    pub mid: String,
    pub high: String,
}

impl Default for LogFcColors {
    fn default() -> Self {
        Self {
            low: "blue".to_string(),
            mid: "white".to_string(),
            high: "red".to_string(),
        }
    }
}

/// Caller-facing options for a domino plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DominoOptions {
    pub gene_list: Option<Vec<String>>,
    pub celltype_order: Option<Vec<String>>,
    pub feature_col: String,
    pub celltype_col: String,
    pub contrast_col: String,
    pub var_id: String,
    pub logfc_col: String,
    pub pval_col: String,
    pub contrast_levels: Vec<String>,
    pub contrast_labels: Option<Vec<String>>,
    pub switch_axis: bool,
    pub min_dot_size: f64,
    pub max_dot_size: f64,
    pub spacing_factor: usize,
    pub logfc_limits: (f64, f64),
    pub logfc_colors: LogFcColors,
    pub color_scale_name: String,
    pub title: Option<String>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl Default for DominoOptions {
    fn default() -> Self {
        Self {
            gene_list: None,
            celltype_order: None,
            feature_col: "gene".to_string(),
            celltype_col: "Celltype".to_string(),
            contrast_col: "Contrast".to_string(),
            var_id: "var".to_string(),
            logfc_col: "avg_log2FC".to_string(),
            pval_col: "p_val_adj".to_string(),
            contrast_levels: vec!["Clinical".to_string(), "Pathological".to_string()],
            contrast_labels: None,
            switch_axis: false,
            min_dot_size: 1.0,
            max_dot_size: 5.0,
            spacing_factor: 3,
            logfc_limits: (-1.5, 1.5),
            logfc_colors: LogFcColors::default(),
            color_scale_name: "Log2 Fold Change".to_string(),
            title: None,
            xlabel: None,
            ylabel: None,
            width: None,
            height: None,
        }
    }
}

impl DominoOptions {
    pub(crate) fn validate(&self) -> Result<(), PlotError> {
        if self.contrast_levels.len() != 2 {
            return Err(PlotError::invalid(
                "contrast_levels",
                format!(
                    "exactly two levels are supported, got {}",
                    self.contrast_levels.len()
                ),
            ));
        }
        if self.contrast_levels[0] == self.contrast_levels[1] {
            return Err(PlotError::invalid("contrast_levels", "levels must differ"));
        }
        if let Some(labels) = &self.contrast_labels {
            if labels.len() != 2 {
                return Err(PlotError::invalid(
                    "contrast_labels",
                    "one label per contrast level is required",
                ));
            }
        }
        for (anchor, color) in [
            ("low", &self.logfc_colors.low),
            ("mid", &self.logfc_colors.mid),
            ("high", &self.logfc_colors.high),
        ] {
            if parse_color(color).is_none() {
                return Err(PlotError::invalid(
                    "logfc_colors",
                    format!("{anchor} color '{color}' is not a recognized color"),
                ));
            }
        }
        if self.spacing_factor < 2 {
            return Err(PlotError::invalid(
                "spacing_factor",
                "two contrast slots need a spacing factor of at least 2",
            ));
        }
        let (low, high) = self.logfc_limits;
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(PlotError::invalid(
                "logfc_limits",
                format!("({low}, {high}) is not an increasing finite range"),
            ));
        }
        if !(self.min_dot_size >= 0.0 && self.min_dot_size <= self.max_dot_size) {
            return Err(PlotError::invalid(
                "min_dot_size",
                format!(
                    "size bounds ({}, {}) are not ordered",
                    self.min_dot_size, self.max_dot_size
                ),
            ));
        }
        validate_dimensions(self.width, self.height)
    }
}

fn validate_dimensions(width: Option<f32>, height: Option<f32>) -> Result<(), PlotError> {
    match (width, height) {
        (None, None) => Ok(()),
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => Ok(()),
        (Some(_), Some(_)) => Err(PlotError::invalid("width", "dimensions must be positive")),
        _ => Err(PlotError::invalid(
            "width",
            "width and height must be given together",
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    dice: Option<DiceLayoutConfig>,
    domino: Option<DominoLayoutConfig>,
    render: Option<RenderConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    title_font_size: Option<f32>,
    text_color: Option<String>,
    background: Option<String>,
    box_stroke: Option<String>,
    box_fill: Option<String>,
    mark_stroke: Option<String>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = match serde_json::from_str(&contents) {
        Ok(parsed) => parsed,
        Err(_) => json5::from_str(&contents)?,
    };

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.title_font_size {
            config.theme.title_font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
        if let Some(v) = vars.box_stroke {
            config.theme.box_stroke = v;
        }
        if let Some(v) = vars.box_fill {
            config.theme.box_fill = v;
        }
        if let Some(v) = vars.mark_stroke {
            config.theme.mark_stroke = v;
        }
    }

    if let Some(dice) = parsed.dice {
        config.dice = dice;
    }
    if let Some(domino) = parsed.domino {
        config.domino = domino;
    }
    if let Some(render) = parsed.render {
        config.render = render;
    }
    Ok(config)
}

/// Reads plot options from a JSON (or JSON5) file.
pub fn load_options<T: serde::de::DeserializeOwned + Default>(
    path: Option<&Path>,
) -> anyhow::Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let contents = std::fs::read_to_string(path)?;
    match serde_json::from_str(&contents) {
        Ok(options) => Ok(options),
        Err(_) => Ok(json5::from_str(&contents)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_constants() {
        let config = Config::default();
        assert_eq!(config.dice.box_size, 50.0);
        assert_eq!(config.dice.margins.left, 150.0);
        assert_eq!(config.dice.margins.right, 300.0);
        assert_eq!(config.dice.margins.top, 100.0);
        assert_eq!(config.dice.margins.bottom, 200.0);
        let domino = DominoOptions::default();
        assert_eq!(domino.spacing_factor, 3);
        assert_eq!(domino.logfc_limits, (-1.5, 1.5));
    }

    #[test]
    fn load_config_applies_theme_and_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "theme": "modern",
                "themeVariables": {{ "fontSize": 9 }},
                "dice": {{ "box_size": 40 }},
                "render": {{ "backend": "html", "formats": ["svg", "html"] }}
            }}"#
        )
        .unwrap();
        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.theme.font_size, 9.0);
        assert_eq!(config.theme.font_family, Theme::modern().font_family);
        assert_eq!(config.dice.box_size, 40.0);
        assert_eq!(config.dice.margins, Margins::default());
        assert_eq!(config.render.backend, Some(Backend::Html));
        assert_eq!(
            config.render.formats,
            vec![OutputFormat::Svg, OutputFormat::Html]
        );
    }

    #[test]
    fn options_accept_json5() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{{ cat_a: 'CellType', cat_b: 'Pathway', cat_c: 'Var', cat_c_colors: {{ b: 'red', a: 'blue' }}, }}"
        )
        .unwrap();
        let options: DiceOptions = load_options(Some(file.path())).unwrap();
        assert_eq!(options.cat_a, "CellType");
        assert_eq!(options.cat_c_colors.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(options.group_alpha, 0.6);
    }

    #[test]
    fn domino_validation_rejects_bad_ranges() {
        let mut options = DominoOptions::default();
        assert!(options.validate().is_ok());
        options.contrast_levels.push("Third".to_string());
        assert!(matches!(
            options.validate(),
            Err(PlotError::InvalidOption {
                option: "contrast_levels",
                ..
            })
        ));
        let options = DominoOptions {
            logfc_limits: (1.0, -1.0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
        let options = DominoOptions {
            logfc_colors: LogFcColors {
                low: "darkblue".to_string(),
                mid: "white".to_string(),
                high: "not-a-color".to_string(),
            },
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(PlotError::InvalidOption {
                option: "logfc_colors",
                ..
            })
        ));
        let options = DominoOptions {
            width: Some(400.0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
