//! Control panels: which style controls a selected element gets, what they
//! display, and the tokens they produce when the user changes them.

use serde::{Deserialize, Serialize};

use super::palette;
use super::{Dimension, ParsedStyleSet};
use crate::error::{CanvasError, CanvasResult};

const FONT_WEIGHTS: &[&str] = &["thin", "light", "normal", "medium", "semibold", "bold", "black"];
const FONT_SIZES: &[&str] = &["xs", "sm", "base", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl"];
const TEXT_ALIGN: &[&str] = &["left", "center", "right", "justify", "start", "end"];
const TEXT_TRANSFORM: &[&str] = &["uppercase", "lowercase", "capitalize", "normal-case"];
const TEXT_DECORATION: &[&str] = &["none", "underline", "line-through"];
const JUSTIFY: &[&str] = &["start", "center", "end", "between", "around", "evenly"];
const ITEMS: &[&str] = &["start", "center", "end", "stretch", "baseline"];

const TYPOGRAPHY: &[Dimension] = &[
    Dimension::TextColor,
    Dimension::FontWeight,
    Dimension::TextSize,
    Dimension::TextAlign,
    Dimension::TextTransform,
    Dimension::TextDecoration,
];

const LAYOUT: &[Dimension] = &[
    Dimension::Padding,
    Dimension::Margin,
    Dimension::BackgroundColor,
    Dimension::JustifyContent,
    Dimension::AlignItems,
];

const COMPOSITE: &[Dimension] = &[
    Dimension::Padding,
    Dimension::Margin,
    Dimension::BackgroundColor,
    Dimension::TextColor,
    Dimension::FontWeight,
    Dimension::TextSize,
    Dimension::TextAlign,
    Dimension::TextTransform,
    Dimension::TextDecoration,
];

/// The control panel shown for a selected element, chosen once from its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlPanel {
    Typography,
    Layout,
    Composite,
    Unknown,
}

impl ControlPanel {
    pub fn for_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "span" | "label" | "blockquote" => {
                ControlPanel::Typography
            }
            "div" | "section" | "main" | "header" | "footer" | "nav" | "article" | "aside"
            | "ul" | "ol" | "form" => ControlPanel::Layout,
            "button" | "a" => ControlPanel::Composite,
            _ => ControlPanel::Unknown,
        }
    }

    pub fn dimensions(self) -> &'static [Dimension] {
        match self {
            ControlPanel::Typography => TYPOGRAPHY,
            ControlPanel::Layout => LAYOUT,
            ControlPanel::Composite => COMPOSITE,
            ControlPanel::Unknown => &[],
        }
    }

    /// What each control displays for the current styles. Controls hold no
    /// state of their own, so this is rebuilt after every change.
    pub fn bindings(self, styles: &ParsedStyleSet) -> Vec<ControlBinding> {
        self.dimensions()
            .iter()
            .map(|&dimension| ControlBinding::new(dimension, styles))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    /// Picker seeded with the hex of the current token
    Color { hex: String },
    Dropdown { options: Vec<String>, selected: Option<String> },
    /// Numeric input seeded with the first number of the current token
    Size { value: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlBinding {
    pub dimension: Dimension,
    /// Explicit token, or `None` when the dimension sits at its default
    pub current: Option<String>,
    #[serde(flatten)]
    pub kind: ControlKind,
}

impl ControlBinding {
    fn new(dimension: Dimension, styles: &ParsedStyleSet) -> Self {
        let current = styles.explicit(dimension).map(str::to_string);
        let kind = if dimension.is_color() {
            ControlKind::Color {
                hex: palette::token_to_hex(styles.get(dimension)),
            }
        } else if let Some(options) = dropdown_options(dimension) {
            ControlKind::Dropdown {
                options: options.iter().map(|o| o.to_string()).collect(),
                selected: current.as_deref().and_then(|t| option_for_token(dimension, t)),
            }
        } else {
            ControlKind::Size {
                value: current.as_deref().and_then(size_value),
            }
        };
        Self {
            dimension,
            current,
            kind,
        }
    }
}

pub fn dropdown_options(dimension: Dimension) -> Option<&'static [&'static str]> {
    match dimension {
        Dimension::FontWeight => Some(FONT_WEIGHTS),
        Dimension::TextSize => Some(FONT_SIZES),
        Dimension::TextAlign => Some(TEXT_ALIGN),
        Dimension::TextTransform => Some(TEXT_TRANSFORM),
        Dimension::TextDecoration => Some(TEXT_DECORATION),
        Dimension::JustifyContent => Some(JUSTIFY),
        Dimension::AlignItems => Some(ITEMS),
        _ => None,
    }
}

fn invalid(dimension: Dimension, token: &str, reason: impl Into<String>) -> CanvasError {
    CanvasError::InvalidStyleToken {
        dimension: dimension.key().to_string(),
        token: token.to_string(),
        reason: reason.into(),
    }
}

/// Token for a dropdown choice (`fontWeight` + `bold` → `font-bold`).
pub fn dropdown_token(dimension: Dimension, option: &str) -> CanvasResult<String> {
    let options = dropdown_options(dimension)
        .ok_or_else(|| invalid(dimension, option, "dimension has no dropdown control"))?;
    if !options.contains(&option) {
        return Err(invalid(dimension, option, format!("expected one of {}", options.join(", "))));
    }
    let token = match dimension {
        Dimension::FontWeight => format!("font-{}", option),
        Dimension::TextSize | Dimension::TextAlign => format!("text-{}", option),
        Dimension::TextDecoration if option == "none" => "no-underline".to_string(),
        Dimension::TextTransform | Dimension::TextDecoration => option.to_string(),
        Dimension::JustifyContent => format!("justify-{}", option),
        Dimension::AlignItems => format!("items-{}", option),
        _ => return Err(invalid(dimension, option, "dimension has no dropdown control")),
    };
    Ok(token)
}

fn option_for_token(dimension: Dimension, token: &str) -> Option<String> {
    dropdown_options(dimension)?
        .iter()
        .find(|o| dropdown_token(dimension, o).map(|t| t == token).unwrap_or(false))
        .map(|o| o.to_string())
}

/// Token for a numeric size control (`padding` + 4 → `p-4`).
pub fn size_token(dimension: Dimension, value: u32) -> CanvasResult<String> {
    match dimension {
        Dimension::Padding => Ok(format!("p-{}", value)),
        Dimension::Margin => Ok(format!("m-{}", value)),
        Dimension::Gap => Ok(format!("gap-{}", value)),
        _ => Err(invalid(dimension, &value.to_string(), "dimension has no size control")),
    }
}

/// First number in a spacing token (`px-6` → 6).
pub fn size_value(token: &str) -> Option<u32> {
    let digits: String = token
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Token for a color picker result. Always an arbitrary hex value
/// (`bg-[#3b82f6]`); named palette tokens are never reconstructed.
pub fn color_token(dimension: Dimension, picked: &str) -> CanvasResult<String> {
    let prefix = dimension
        .color_prefix()
        .ok_or_else(|| invalid(dimension, picked, "dimension has no color control"))?;
    let hex = palette::to_hex(picked)
        .ok_or_else(|| invalid(dimension, picked, "not a hex or rgb color"))?;
    Ok(format!("{}-[{}]", prefix, hex))
}

/// A value coming back from a control, before it becomes a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ControlInput {
    Dropdown(String),
    Size(u32),
    /// Hex or `rgb()`/`rgba()` string from a color picker
    Color(String),
    /// Back to the dimension default
    Clear,
}

impl ControlInput {
    pub fn token(&self, dimension: Dimension) -> CanvasResult<String> {
        match self {
            ControlInput::Dropdown(option) => dropdown_token(dimension, option),
            ControlInput::Size(value) => size_token(dimension, *value),
            ControlInput::Color(picked) => color_token(dimension, picked),
            ControlInput::Clear => Ok(dimension.default_token().to_string()),
        }
    }
}
