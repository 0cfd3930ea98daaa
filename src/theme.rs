use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());
static RGB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*[0-9.]+\s*)?\)$")
        .unwrap()
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub title_font_size: f32,
    pub text_color: String,
    pub background: String,
    pub box_stroke: String,
    pub box_stroke_width: f32,
    pub box_fill: String,
    pub mark_stroke: String,
    pub mark_stroke_width: f32,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "DejaVu Sans, Arial, sans-serif".to_string(),
            font_size: 12.0,
            title_font_size: 16.0,
            text_color: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
            box_stroke: "grey".to_string(),
            box_stroke_width: 0.5,
            box_fill: "#FFFFFF".to_string(),
            mark_stroke: "black".to_string(),
            mark_stroke_width: 1.0,
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            title_font_size: 17.0,
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
            box_stroke: "#9AA5B8".to_string(),
            box_stroke_width: 0.6,
            box_fill: "#FFFFFF".to_string(),
            mark_stroke: "#1C2430".to_string(),
            mark_stroke_width: 0.8,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

fn named_color(name: &str) -> Option<Rgb> {
    let (r, g, b) = match name.to_ascii_lowercase().as_str() {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "grey" | "gray" => (128, 128, 128),
        "lightgrey" | "lightgray" => (211, 211, 211),
        "darkgrey" | "darkgray" => (169, 169, 169),
        "navy" => (0, 0, 128),
        "darkred" => (139, 0, 0),
        "steelblue" => (70, 130, 180),
        "firebrick" => (178, 34, 34),
        "crimson" => (220, 20, 60),
        "darkblue" => (0, 0, 139),
        "darkgreen" => (0, 100, 0),
        "darkorange" => (255, 140, 0),
        "darkviolet" => (148, 0, 211),
        "dodgerblue" => (30, 144, 255),
        "royalblue" => (65, 105, 225),
        "skyblue" => (135, 206, 235),
        "lightblue" => (173, 216, 230),
        "cyan" | "aqua" => (0, 255, 255),
        "teal" => (0, 128, 128),
        "magenta" | "fuchsia" => (255, 0, 255),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "lime" => (0, 255, 0),
        "gold" => (255, 215, 0),
        "tomato" => (255, 99, 71),
        "coral" => (255, 127, 80),
        "salmon" => (250, 128, 114),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "silver" => (192, 192, 192),
        "whitesmoke" => (245, 245, 245),
        "ivory" => (255, 255, 240),
        _ => return None,
    };
    Some(Rgb { r, g, b })
}

/// Parses `#rgb`, `#rrggbb`, `rgb(...)`/`rgba(...)` and a small set of CSS names.
pub fn parse_color(input: &str) -> Option<Rgb> {
    let trimmed = input.trim();
    if let Some(caps) = HEX_RE.captures(trimmed) {
        let hex = caps.get(1)?.as_str();
        let expanded: String = if hex.len() == 3 {
            hex.chars().flat_map(|c| [c, c]).collect()
        } else {
            hex.to_string()
        };
        let channel = |idx: usize| u8::from_str_radix(&expanded[idx..idx + 2], 16).ok();
        return Some(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        });
    }
    if let Some(caps) = RGB_RE.captures(trimmed) {
        let channel = |idx: usize| {
            caps.get(idx)
                .and_then(|m| m.as_str().parse::<u16>().ok())
                .map(|v| v.min(255) as u8)
        };
        return Some(Rgb {
            r: channel(1)?,
            g: channel(2)?,
            b: channel(3)?,
        });
    }
    named_color(trimmed)
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8
}

fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
    Rgb {
        r: lerp_channel(a.r, b.r, t),
        g: lerp_channel(a.g, b.g, t),
        b: lerp_channel(a.b, b.b, t),
    }
}

/// Samples a low/mid/high gradient with the mid stop at 0.5. Anchors are
/// checked by `DominoOptions` validation; an unparseable anchor gives grey.
pub fn three_stop_color(low: &str, mid: &str, high: &str, position: f64) -> String {
    let t = position.clamp(0.0, 1.0);
    let (Some(low), Some(mid), Some(high)) = (parse_color(low), parse_color(mid), parse_color(high))
    else {
        return "#808080".to_string();
    };
    if t <= 0.5 {
        lerp(low, mid, t * 2.0).to_hex()
    } else {
        lerp(mid, high, (t - 0.5) * 2.0).to_hex()
    }
}
