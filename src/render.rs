use crate::config::Margins;
use crate::error::PlotError;
use crate::layout::{Axis, Canvas, DiceLayout, DominoLayout, PlotLayout};
use crate::theme::Theme;
use anyhow::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Static vector output.
    #[serde(alias = "static", alias = "matplotlib")]
    Svg,
    /// Standalone HTML page with hover tooltips.
    #[serde(alias = "interactive", alias = "plotly")]
    Html,
}

impl Backend {
    pub fn from_name(name: &str) -> Result<Self, PlotError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "svg" | "static" | "matplotlib" => Ok(Backend::Svg),
            "html" | "interactive" | "plotly" => Ok(Backend::Html),
            _ => Err(PlotError::UnknownBackend(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Backend::Svg => "svg",
            Backend::Html => "html",
        }
    }
}

impl FromStr for Backend {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::from_name(s)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

static DEFAULT_BACKEND: Lazy<RwLock<Backend>> = Lazy::new(|| RwLock::new(Backend::Svg));

/// Sets the backend used when neither the caller nor the config picks one.
/// Last writer wins.
pub fn set_default_backend(backend: Backend) {
    match DEFAULT_BACKEND.write() {
        Ok(mut guard) => *guard = backend,
        Err(poisoned) => *poisoned.into_inner() = backend,
    }
}

pub fn default_backend() -> Backend {
    match DEFAULT_BACKEND.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Svg,
    Png,
    Html,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            "html" | "htm" => Ok(OutputFormat::Html),
            other => Err(PlotError::invalid(
                "formats",
                format!("unsupported output format '{other}'"),
            )),
        }
    }
}

/// A rendered plot. `svg` is always present; HTML output wraps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub backend: Backend,
    pub title: Option<String>,
    pub width: f32,
    pub height: f32,
    pub svg: String,
}

impl Figure {
    pub fn html(&self) -> String {
        let title = self.title.as_deref().unwrap_or("diceplot");
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>body{{margin:0;background:#fff}} circle:hover{{stroke-width:2.5}} rect.cell:hover{{stroke:#000}}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_xml(title),
            self.svg
        )
    }
}

pub trait Renderer {
    fn backend(&self) -> Backend;

    fn render_dice(&self, layout: &DiceLayout, theme: &Theme) -> Figure;

    fn render_domino(&self, layout: &DominoLayout, theme: &Theme) -> Figure;

    fn show(&self, figure: &Figure) -> Result<()>;

    fn render(&self, layout: &PlotLayout, theme: &Theme) -> Figure {
        match layout {
            PlotLayout::Dice(dice) => self.render_dice(dice, theme),
            PlotLayout::Domino(domino) => self.render_domino(domino, theme),
        }
    }

    /// Writes `<base_name>.<ext>` into `dir` for every requested format.
    fn save(
        &self,
        figure: &Figure,
        dir: &Path,
        base_name: &str,
        formats: &[OutputFormat],
    ) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(formats.len());
        for format in formats {
            let path = dir.join(format!("{base_name}.{}", format.extension()));
            match format {
                OutputFormat::Svg => write_output_svg(&figure.svg, Some(path.as_path()))?,
                OutputFormat::Html => std::fs::write(&path, figure.html())?,
                OutputFormat::Png => write_output_png(&figure.svg, &path, figure.width, figure.height)?,
            }
            tracing::debug!(path = %path.display(), "wrote figure");
            written.push(path);
        }
        Ok(written)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for SvgRenderer {
    fn backend(&self) -> Backend {
        Backend::Svg
    }

    fn render_dice(&self, layout: &DiceLayout, theme: &Theme) -> Figure {
        figure(Backend::Svg, layout.title.clone(), layout.canvas, render_dice_svg(layout, theme, false))
    }

    fn render_domino(&self, layout: &DominoLayout, theme: &Theme) -> Figure {
        figure(Backend::Svg, layout.title.clone(), layout.canvas, render_domino_svg(layout, theme, false))
    }

    fn show(&self, figure: &Figure) -> Result<()> {
        write_output_svg(&figure.svg, None)
    }
}

impl Renderer for HtmlRenderer {
    fn backend(&self) -> Backend {
        Backend::Html
    }

    fn render_dice(&self, layout: &DiceLayout, theme: &Theme) -> Figure {
        figure(Backend::Html, layout.title.clone(), layout.canvas, render_dice_svg(layout, theme, true))
    }

    fn render_domino(&self, layout: &DominoLayout, theme: &Theme) -> Figure {
        figure(Backend::Html, layout.title.clone(), layout.canvas, render_domino_svg(layout, theme, true))
    }

    fn show(&self, figure: &Figure) -> Result<()> {
        print!("{}", figure.html());
        Ok(())
    }
}

pub fn renderer_for(backend: Backend) -> Box<dyn Renderer> {
    match backend {
        Backend::Svg => Box::new(SvgRenderer),
        Backend::Html => Box::new(HtmlRenderer),
    }
}

fn figure(backend: Backend, title: Option<String>, canvas: Canvas, svg: String) -> Figure {
    Figure {
        backend,
        title,
        width: canvas.width,
        height: canvas.height,
        svg,
    }
}

/// Maps data coordinates to pixels. Data y grows downward, so category 1
/// sits at the top of the frame.
struct Frame {
    margins: Margins,
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Frame {
    fn new(canvas: Canvas, x_axis: &Axis, y_axis: &Axis) -> Self {
        let m = canvas.margins;
        Self {
            margins: m,
            left: m.left,
            top: m.top,
            width: (canvas.width - m.left - m.right).max(1.0),
            height: (canvas.height - m.top - m.bottom).max(1.0),
            x_range: x_axis.range,
            y_range: y_axis.range,
        }
    }

    fn x(&self, value: f64) -> f32 {
        let span = (self.x_range.1 - self.x_range.0).max(f64::EPSILON);
        self.left + ((value - self.x_range.0) / span) as f32 * self.width
    }

    fn y(&self, value: f64) -> f32 {
        let span = (self.y_range.1 - self.y_range.0).max(f64::EPSILON);
        self.top + ((value - self.y_range.0) / span) as f32 * self.height
    }

    fn right(&self) -> f32 {
        self.left + self.width
    }

    fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Pixel rectangle for data bounds.
    fn rect(&self, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> (f32, f32, f32, f32) {
        let x0 = self.x(x_min);
        let x1 = self.x(x_max);
        let y0 = self.y(y_min);
        let y1 = self.y(y_max);
        (x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }
}

fn open_svg(svg: &mut String, canvas: Canvas, theme: &Theme) {
    let width = canvas.width;
    let height = canvas.height;
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        escape_xml(&theme.background)
    ));
}

fn title_svg(svg: &mut String, title: Option<&str>, canvas: Canvas, theme: &Theme) {
    let Some(title) = title else {
        return;
    };
    let x = canvas.width / 2.0;
    let y = (canvas.margins.top / 2.0).max(theme.title_font_size);
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.title_font_size,
        escape_xml(&theme.text_color),
        escape_xml(title)
    ));
}

fn text_svg(svg: &mut String, x: f32, y: f32, anchor: &str, rotate: Option<f32>, text: &str, theme: &Theme) {
    let transform = rotate
        .map(|deg| format!(" transform=\"rotate({deg} {x:.2} {y:.2})\""))
        .unwrap_or_default();
    svg.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\"{transform} font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        escape_xml(&theme.font_family),
        theme.font_size,
        escape_xml(&theme.text_color),
        escape_xml(text)
    ));
}

fn axes_svg(svg: &mut String, frame: &Frame, x_axis: &Axis, y_axis: &Axis, theme: &Theme) {
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/>",
        frame.left,
        frame.top,
        frame.width,
        frame.height,
        escape_xml(&theme.box_stroke)
    ));
    let tick_y = frame.bottom() + theme.font_size + 4.0;
    for tick in &x_axis.ticks {
        let x = frame.x(tick.position);
        text_svg(svg, x, tick_y, "end", Some(-45.0), &tick.label, theme);
    }
    for tick in &y_axis.ticks {
        let y = frame.y(tick.position) + theme.font_size * 0.35;
        text_svg(svg, frame.left - 8.0, y, "end", None, &tick.label, theme);
    }

    let x_title_y = frame.bottom() + frame.margins.bottom * 0.6;
    text_svg(
        svg,
        frame.left + frame.width / 2.0,
        x_title_y,
        "middle",
        None,
        &x_axis.title,
        theme,
    );
    let y_title_x = (frame.margins.left * 0.25).max(theme.font_size);
    let y_title_y = frame.top + frame.height / 2.0;
    text_svg(svg, y_title_x, y_title_y, "middle", Some(-90.0), &y_axis.title, theme);
}

fn tooltip(enabled: bool, lines: &[String]) -> String {
    if enabled {
        format!("<title>{}</title>", escape_xml(&lines.join("\n")))
    } else {
        String::new()
    }
}

fn render_dice_svg(layout: &DiceLayout, theme: &Theme, tooltips: bool) -> String {
    let grid = &layout.grid;
    let frame = Frame::new(layout.canvas, &grid.x_axis, &grid.y_axis);
    let mut svg = String::new();
    open_svg(&mut svg, layout.canvas, theme);
    title_svg(&mut svg, layout.title.as_deref(), layout.canvas, theme);

    for record in &grid.boxes {
        let (x, y, w, h) = frame.rect(record.x_min, record.x_max, record.y_min, record.y_max);
        let (fill, opacity) = match &record.fill {
            Some(fill) => (fill.as_str(), layout.group_alpha),
            None => (theme.box_fill.as_str(), 1.0),
        };
        let mut lines = vec![
            format!("{}: {}", grid.x_axis.title, primary_or_secondary(layout, &record.primary, &record.secondary, true)),
            format!("{}: {}", grid.y_axis.title, primary_or_secondary(layout, &record.primary, &record.secondary, false)),
        ];
        if let Some(group) = &record.group {
            lines.push(format!("group: {group}"));
        }
        svg.push_str(&format!(
            "<rect class=\"cell\" x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"{}\">{}</rect>",
            escape_xml(fill),
            opacity,
            escape_xml(&theme.box_stroke),
            theme.box_stroke_width,
            tooltip(tooltips, &lines)
        ));
    }

    let radius = layout.marker_size / 2.0;
    for mark in &grid.marks {
        let cx = frame.x(mark.x_pos);
        let cy = frame.y(mark.y_pos);
        let lines = [
            mark.primary.clone(),
            mark.secondary.clone(),
            format!("{}: {}", layout.tertiary_title, mark.tertiary),
        ];
        svg.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{radius:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\">{}</circle>",
            escape_xml(&mark.color),
            escape_xml(&theme.mark_stroke),
            theme.mark_stroke_width,
            tooltip(tooltips, &lines)
        ));
    }

    axes_svg(&mut svg, &frame, &grid.x_axis, &grid.y_axis, theme);

    let mut legend_y = frame.top;
    let legend_x = frame.right() + 30.0;
    text_svg(&mut svg, legend_x, legend_y, "start", None, &layout.tertiary_title, theme);
    for entry in &layout.tertiary_legend {
        legend_y += theme.font_size + 8.0;
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{radius:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            legend_x + radius,
            legend_y - theme.font_size * 0.35,
            escape_xml(&entry.color),
            escape_xml(&theme.mark_stroke),
            theme.mark_stroke_width
        ));
        text_svg(&mut svg, legend_x + radius * 2.0 + 8.0, legend_y, "start", None, &entry.label, theme);
    }
    if !layout.group_legend.is_empty() {
        legend_y += theme.font_size * 2.0 + 8.0;
        for entry in &layout.group_legend {
            let size = theme.font_size;
            svg.push_str(&format!(
                "<rect x=\"{legend_x:.2}\" y=\"{:.2}\" width=\"{size}\" height=\"{size}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\"/>",
                legend_y - size,
                escape_xml(&entry.color),
                layout.group_alpha,
                escape_xml(&theme.box_stroke)
            ));
            text_svg(&mut svg, legend_x + size + 8.0, legend_y, "start", None, &entry.label, theme);
            legend_y += theme.font_size + 8.0;
        }
    }

    svg.push_str("</svg>");
    svg
}

/// Label shown on the x (or y) axis for a box, accounting for switched axes.
fn primary_or_secondary<'a>(layout: &DiceLayout, primary: &'a str, secondary: &'a str, x: bool) -> &'a str {
    if x != layout.switched { primary } else { secondary }
}

fn render_domino_svg(layout: &DominoLayout, theme: &Theme, tooltips: bool) -> String {
    let grid = &layout.grid;
    let frame = Frame::new(layout.canvas, &grid.x_axis, &grid.y_axis);
    let mut svg = String::new();
    open_svg(&mut svg, layout.canvas, theme);
    svg.push_str(&format!(
        "<defs><linearGradient id=\"logfc\" x1=\"0\" y1=\"1\" x2=\"0\" y2=\"0\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"0.5\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></linearGradient></defs>",
        escape_xml(&layout.color_scale.low),
        escape_xml(&layout.color_scale.mid),
        escape_xml(&layout.color_scale.high)
    ));
    title_svg(&mut svg, layout.title.as_deref(), layout.canvas, theme);

    for record in &grid.boxes {
        let (x, y, w, h) = frame.rect(record.x_min, record.x_max, record.y_min, record.y_max);
        let lines = [
            record.feature.clone(),
            record.celltype.clone(),
            record.contrast.clone(),
        ];
        svg.push_str(&format!(
            "<rect class=\"cell\" x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" fill=\"{}\" fill-opacity=\"{}\" stroke=\"{}\" stroke-width=\"{}\">{}</rect>",
            escape_xml(&theme.box_fill),
            layout.box_opacity,
            escape_xml(&theme.box_stroke),
            theme.box_stroke_width,
            tooltip(tooltips, &lines)
        ));
    }

    for mark in &grid.marks {
        let cx = frame.x(mark.x_pos);
        let cy = frame.y(mark.y_pos);
        let radius = mark.size as f32 * layout.marker_scale;
        let mut lines = vec![
            format!("{} / {}", mark.feature, mark.celltype),
            format!("contrast: {}", mark.contrast),
            format!("log2FC: {:.3}", mark.log_fc),
            format!("p: {:.3e}", mark.p_value),
        ];
        if let Some(var) = &mark.var {
            lines.push(format!("var: {var}"));
        }
        svg.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{radius:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\">{}</circle>",
            escape_xml(&mark.color),
            escape_xml(&theme.mark_stroke),
            theme.mark_stroke_width,
            tooltip(tooltips, &lines)
        ));
    }

    axes_svg(&mut svg, &frame, &grid.x_axis, &grid.y_axis, theme);

    let legend_x = frame.right() + 30.0;
    let bar_top = frame.top + theme.font_size + 8.0;
    let bar_height = (frame.height * 0.5).clamp(40.0, 160.0);
    text_svg(&mut svg, legend_x, frame.top, "start", None, &layout.color_scale.title, theme);
    svg.push_str(&format!(
        "<rect x=\"{legend_x:.2}\" y=\"{bar_top:.2}\" width=\"14\" height=\"{bar_height:.2}\" fill=\"url(#logfc)\" stroke=\"{}\" stroke-width=\"0.5\"/>",
        escape_xml(&theme.box_stroke)
    ));
    let (low, high) = layout.color_scale.limits;
    text_svg(&mut svg, legend_x + 20.0, bar_top + theme.font_size * 0.35, "start", None, &format!("{high}"), theme);
    text_svg(&mut svg, legend_x + 20.0, bar_top + bar_height / 2.0 + theme.font_size * 0.35, "start", None, &format!("{}", (low + high) / 2.0), theme);
    text_svg(&mut svg, legend_x + 20.0, bar_top + bar_height + theme.font_size * 0.35, "start", None, &format!("{low}"), theme);

    let mut legend_y = bar_top + bar_height + theme.font_size * 3.0;
    text_svg(&mut svg, legend_x, legend_y, "start", None, "-log10(p)", theme);
    for (label, size) in [("min", layout.size_bounds.0), ("max", layout.size_bounds.1)] {
        let radius = size as f32 * layout.marker_scale;
        legend_y += radius.max(theme.font_size / 2.0) * 2.0 + 6.0;
        svg.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{radius:.2}\" fill=\"none\" stroke=\"{}\"/>",
            legend_x + 10.0,
            legend_y - theme.font_size * 0.35,
            escape_xml(&theme.mark_stroke)
        ));
        text_svg(&mut svg, legend_x + 30.0, legend_y, "start", None, label, theme);
    }

    legend_y += theme.font_size * 2.0;
    let slots = if layout.switched { "top / bottom" } else { "left / right" };
    text_svg(
        &mut svg,
        legend_x,
        legend_y,
        "start",
        None,
        &format!(
            "{}: {} / {}",
            slots, layout.contrast_labels[0], layout.contrast_labels[1]
        ),
        theme,
    );

    svg.push_str("</svg>");
    svg
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, width: f32, height: f32) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "DejaVu Sans".to_string();
    opt.fontdb_mut().load_system_fonts();
    if let Some(size) = usvg::Size::from_wh(width, height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, output: &Path, _width: f32, _height: f32) -> Result<()> {
    Err(anyhow::anyhow!(
        "cannot write {}: built without the `png` feature",
        output.display()
    ))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
