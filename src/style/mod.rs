//! # Style model
//!
//! A fixed set of style dimensions, each holding exactly one utility-class
//! token. [`classify`] assigns a token to at most one dimension using an
//! ordered rule list; [`ParsedStyleSet::parse`] and
//! [`ParsedStyleSet::serialize`] convert between a class list and the
//! per-dimension record. Tokens no rule claims ride along unchanged.

pub mod controls;
pub mod palette;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{CanvasError, CanvasResult};

/// One semantic style axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    TextColor,
    BackgroundColor,
    BorderColor,
    TextSize,
    FontWeight,
    FontStyle,
    TextAlign,
    TextDecoration,
    LineHeight,
    LetterSpacing,
    Display,
    FlexDirection,
    JustifyContent,
    AlignItems,
    Gap,
    Padding,
    Margin,
    Width,
    Height,
    BorderWidth,
    BorderRadius,
    Shadow,
    Opacity,
    TextTransform,
}

impl Dimension {
    pub const COUNT: usize = 24;

    pub const ALL: [Dimension; Dimension::COUNT] = [
        Dimension::TextColor,
        Dimension::BackgroundColor,
        Dimension::BorderColor,
        Dimension::TextSize,
        Dimension::FontWeight,
        Dimension::FontStyle,
        Dimension::TextAlign,
        Dimension::TextDecoration,
        Dimension::LineHeight,
        Dimension::LetterSpacing,
        Dimension::Display,
        Dimension::FlexDirection,
        Dimension::JustifyContent,
        Dimension::AlignItems,
        Dimension::Gap,
        Dimension::Padding,
        Dimension::Margin,
        Dimension::Width,
        Dimension::Height,
        Dimension::BorderWidth,
        Dimension::BorderRadius,
        Dimension::Shadow,
        Dimension::Opacity,
        Dimension::TextTransform,
    ];

    /// Key used by style controls (`textColor`, `padding`, ...).
    pub fn key(self) -> &'static str {
        match self {
            Dimension::TextColor => "textColor",
            Dimension::BackgroundColor => "backgroundColor",
            Dimension::BorderColor => "borderColor",
            Dimension::TextSize => "textSize",
            Dimension::FontWeight => "fontWeight",
            Dimension::FontStyle => "fontStyle",
            Dimension::TextAlign => "textAlign",
            Dimension::TextDecoration => "textDecoration",
            Dimension::LineHeight => "lineHeight",
            Dimension::LetterSpacing => "letterSpacing",
            Dimension::Display => "display",
            Dimension::FlexDirection => "flexDirection",
            Dimension::JustifyContent => "justifyContent",
            Dimension::AlignItems => "alignItems",
            Dimension::Gap => "gap",
            Dimension::Padding => "padding",
            Dimension::Margin => "margin",
            Dimension::Width => "width",
            Dimension::Height => "height",
            Dimension::BorderWidth => "borderWidth",
            Dimension::BorderRadius => "borderRadius",
            Dimension::Shadow => "shadow",
            Dimension::Opacity => "opacity",
            Dimension::TextTransform => "textTransform",
        }
    }

    /// Token a dimension holds when the class list says nothing about it.
    pub fn default_token(self) -> &'static str {
        match self {
            Dimension::TextColor => "text-black",
            Dimension::BackgroundColor => "bg-transparent",
            Dimension::BorderColor => "border-gray-200",
            Dimension::TextSize => "text-base",
            Dimension::FontWeight => "font-normal",
            Dimension::FontStyle => "not-italic",
            Dimension::TextAlign => "text-left",
            Dimension::TextDecoration => "no-underline",
            Dimension::LineHeight => "leading-normal",
            Dimension::LetterSpacing => "tracking-normal",
            Dimension::Display => "block",
            Dimension::FlexDirection => "flex-row",
            Dimension::JustifyContent => "justify-start",
            Dimension::AlignItems => "items-stretch",
            Dimension::Gap => "gap-0",
            Dimension::Padding => "p-0",
            Dimension::Margin => "m-0",
            Dimension::Width => "w-auto",
            Dimension::Height => "h-auto",
            Dimension::BorderWidth => "border-0",
            Dimension::BorderRadius => "rounded-none",
            Dimension::Shadow => "shadow-none",
            Dimension::Opacity => "opacity-100",
            Dimension::TextTransform => "normal-case",
        }
    }

    /// Color dimensions accept arbitrary `[#hex]` values and palette names.
    pub fn is_color(self) -> bool {
        matches!(
            self,
            Dimension::TextColor | Dimension::BackgroundColor | Dimension::BorderColor
        )
    }

    /// Class prefix a color dimension writes (`text`, `bg`, `border`).
    pub fn color_prefix(self) -> Option<&'static str> {
        match self {
            Dimension::TextColor => Some("text"),
            Dimension::BackgroundColor => Some("bg"),
            Dimension::BorderColor => Some("border"),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dimension {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // controls historically call the text size dimension "fontSize"
        if s == "fontSize" {
            return Ok(Dimension::TextSize);
        }
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.key() == s)
            .ok_or_else(|| CanvasError::InvalidStyleToken {
                dimension: s.to_string(),
                token: String::new(),
                reason: "unknown style dimension".to_string(),
            })
    }
}

const TEXT_SIZES: &str = "xs|sm|base|lg|xl|2xl|3xl|4xl|5xl|6xl|7xl|8xl|9xl";
const TEXT_ALIGNS: &str = "left|center|right|justify|start|end";

struct Rule {
    dimension: Dimension,
    pattern: Regex,
    /// Tokens matching the pattern but owned by a more specific rule or by no dimension
    exclude: Option<Regex>,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let rule = |dimension, pattern: &str, exclude: Option<String>| Rule {
            dimension,
            pattern: Regex::new(pattern).unwrap(),
            exclude: exclude.map(|e| Regex::new(&e).unwrap()),
        };
        vec![
            rule(
                Dimension::TextColor,
                r"^text-",
                Some(format!(
                    r"^text-({}|{}|wrap|nowrap|balance|pretty|ellipsis|clip)$",
                    TEXT_SIZES, TEXT_ALIGNS
                )),
            ),
            rule(Dimension::BackgroundColor, r"^bg-", None),
            rule(
                Dimension::BorderColor,
                r"^border-",
                Some(
                    r"^border(-[txbylrse])?(-[0-9]+)?$|^border-(solid|dashed|dotted|double|hidden|none|collapse|separate)$"
                        .to_string(),
                ),
            ),
            rule(Dimension::TextSize, &format!(r"^text-({})$", TEXT_SIZES), None),
            rule(
                Dimension::FontWeight,
                r"^font-(thin|extralight|light|normal|medium|semibold|bold|extrabold|black)$",
                None,
            ),
            rule(Dimension::FontStyle, r"^(italic|not-italic)$", None),
            rule(Dimension::TextAlign, &format!(r"^text-({})$", TEXT_ALIGNS), None),
            rule(
                Dimension::TextDecoration,
                r"^(underline|overline|line-through|no-underline)$",
                None,
            ),
            rule(Dimension::LineHeight, r"^leading-", None),
            rule(Dimension::LetterSpacing, r"^tracking-", None),
            rule(
                Dimension::Display,
                r"^(block|inline-block|inline|flex|inline-flex|grid|inline-grid|hidden|contents|table)$",
                None,
            ),
            rule(Dimension::FlexDirection, r"^flex-(row|row-reverse|col|col-reverse)$", None),
            rule(
                Dimension::JustifyContent,
                r"^justify-(start|end|center|between|around|evenly|normal|stretch)$",
                None,
            ),
            rule(Dimension::AlignItems, r"^items-(start|end|center|baseline|stretch)$", None),
            rule(Dimension::Gap, r"^gap-", None),
            rule(Dimension::Padding, r"^p[txbylrse]?-", None),
            rule(Dimension::Margin, r"^-?m[txbylrse]?-", None),
            rule(Dimension::Width, r"^w-", None),
            rule(Dimension::Height, r"^h-", None),
            rule(Dimension::BorderWidth, r"^border(-[txbylrse])?(-[0-9]+)?$", None),
            rule(Dimension::BorderRadius, r"^rounded(-|$)", None),
            rule(Dimension::Shadow, r"^shadow(-|$)", None),
            rule(Dimension::Opacity, r"^opacity-", None),
            rule(
                Dimension::TextTransform,
                r"^(uppercase|lowercase|capitalize|normal-case)$",
                None,
            ),
        ]
    })
}

/// The dimension a class token belongs to, if any. Rules are tried in order
/// and the first match wins, so a token never lands in two dimensions.
pub fn classify(token: &str) -> Option<Dimension> {
    rules()
        .iter()
        .find(|rule| {
            rule.pattern.is_match(token)
                && !rule.exclude.as_ref().map(|e| e.is_match(token)).unwrap_or(false)
        })
        .map(|rule| rule.dimension)
}

/// One token per dimension, plus the tokens no dimension claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStyleSet {
    values: [String; Dimension::COUNT],
    unclassified: Vec<String>,
}

impl Default for ParsedStyleSet {
    fn default() -> Self {
        Self {
            values: std::array::from_fn(|i| Dimension::ALL[i].default_token().to_string()),
            unclassified: Vec::new(),
        }
    }
}

impl ParsedStyleSet {
    /// Later tokens for the same dimension overwrite earlier ones.
    pub fn parse<S: AsRef<str>>(class_list: &[S]) -> Self {
        let mut set = Self::default();
        for token in class_list.iter().map(AsRef::as_ref) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match classify(token) {
                Some(dimension) => set.values[dimension.index()] = token.to_string(),
                None => {
                    if !set.unclassified.iter().any(|t| t == token) {
                        set.unclassified.push(token.to_string());
                    }
                }
            }
        }
        set
    }

    pub fn parse_class_attribute(class: &str) -> Self {
        let tokens: Vec<&str> = class.split_whitespace().collect();
        Self::parse(&tokens)
    }

    /// Class list with default tokens dropped, in dimension order, followed
    /// by the unclassified tokens in their original order.
    pub fn serialize(&self) -> Vec<String> {
        Dimension::ALL
            .iter()
            .filter(|d| !self.is_default(**d))
            .map(|d| self.values[d.index()].clone())
            .chain(self.unclassified.iter().cloned())
            .collect()
    }

    pub fn get(&self, dimension: Dimension) -> &str {
        &self.values[dimension.index()]
    }

    pub fn is_default(&self, dimension: Dimension) -> bool {
        self.get(dimension) == dimension.default_token()
    }

    /// Current token when it differs from the default; what a control displays.
    pub fn explicit(&self, dimension: Dimension) -> Option<&str> {
        (!self.is_default(dimension)).then(|| self.get(dimension))
    }

    /// Sets a dimension. An empty token resets it to the default.
    /// Returns `false` when the dimension already held the token.
    pub fn set(&mut self, dimension: Dimension, token: &str) -> CanvasResult<bool> {
        let token = token.trim();
        let token = if token.is_empty() {
            dimension.default_token()
        } else {
            token
        };
        match classify(token) {
            Some(d) if d == dimension => {}
            other => {
                return Err(CanvasError::InvalidStyleToken {
                    dimension: dimension.key().to_string(),
                    token: token.to_string(),
                    reason: match other {
                        Some(d) => format!("token belongs to {}", d),
                        None => "token is not a recognised utility class".to_string(),
                    },
                })
            }
        }
        if self.get(dimension) == token {
            return Ok(false);
        }
        self.values[dimension.index()] = token.to_string();
        Ok(true)
    }

    pub fn unclassified(&self) -> &[String] {
        &self.unclassified
    }

    /// `(dimension, token)` for every dimension, defaults included.
    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &str)> {
        Dimension::ALL.iter().map(move |d| (*d, self.get(*d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_fixed_vocabulary() {
        let cases = [
            ("p-4", Dimension::Padding),
            ("px-2", Dimension::Padding),
            ("-mt-3", Dimension::Margin),
            ("mx-auto", Dimension::Margin),
            ("bg-blue-500", Dimension::BackgroundColor),
            ("text-lg", Dimension::TextSize),
            ("text-2xl", Dimension::TextSize),
            ("text-center", Dimension::TextAlign),
            ("text-red-500", Dimension::TextColor),
            ("text-[#ff0000]", Dimension::TextColor),
            ("font-bold", Dimension::FontWeight),
            ("rounded-full", Dimension::BorderRadius),
            ("rounded", Dimension::BorderRadius),
            ("border", Dimension::BorderWidth),
            ("border-2", Dimension::BorderWidth),
            ("border-t-4", Dimension::BorderWidth),
            ("border-gray-200", Dimension::BorderColor),
            ("flex", Dimension::Display),
            ("flex-col", Dimension::FlexDirection),
            ("justify-between", Dimension::JustifyContent),
            ("items-center", Dimension::AlignItems),
            ("shadow-lg", Dimension::Shadow),
            ("uppercase", Dimension::TextTransform),
            ("italic", Dimension::FontStyle),
            ("underline", Dimension::TextDecoration),
            ("leading-tight", Dimension::LineHeight),
            ("tracking-wide", Dimension::LetterSpacing),
            ("gap-4", Dimension::Gap),
            ("w-full", Dimension::Width),
            ("h-screen", Dimension::Height),
            ("opacity-50", Dimension::Opacity),
        ];
        for (token, expected) in cases {
            assert_eq!(classify(token), Some(expected), "{}", token);
        }
    }

    #[test]
    fn unclaimed_tokens() {
        for token in ["hover:bg-red-500", "space-y-4", "flex-1", "border-solid", "text-ellipsis", "max-w-md"] {
            assert_eq!(classify(token), None, "{}", token);
        }
    }

    #[test]
    fn defaults_classify_into_their_own_dimension() {
        for d in Dimension::ALL {
            assert_eq!(classify(d.default_token()), Some(d), "{}", d);
        }
    }

    #[test]
    fn parse_recovers_one_token_per_dimension() {
        let tokens = [
            "text-red-500", "bg-blue-500", "border-gray-400", "text-lg", "font-bold", "italic",
            "text-center", "underline", "leading-tight", "tracking-wide", "flex", "flex-col",
            "justify-between", "items-center", "gap-2", "p-4", "m-2", "w-full", "h-10", "border-2",
            "rounded-full", "shadow-md", "opacity-75", "uppercase",
        ];
        let set = ParsedStyleSet::parse(&tokens);
        for (d, token) in Dimension::ALL.iter().zip(tokens.iter()) {
            assert_eq!(set.get(*d), *token, "{}", d);
        }
        assert_eq!(set.serialize(), tokens.to_vec());
    }

    #[test]
    fn later_tokens_overwrite_earlier_ones() {
        let set = ParsedStyleSet::parse_class_attribute("p-2 text-sm p-6 hover:underline");
        assert_eq!(set.get(Dimension::Padding), "p-6");
        assert_eq!(set.serialize(), vec!["text-sm", "p-6", "hover:underline"]);
    }

    #[test]
    fn serialize_drops_defaults() {
        assert!(ParsedStyleSet::default().serialize().is_empty());
        let set = ParsedStyleSet::parse_class_attribute("p-0 m-0 bg-transparent gap-0 border-0 block");
        assert!(set.serialize().is_empty());
    }

    #[test]
    fn set_reports_changes_and_validates() {
        let mut set = ParsedStyleSet::parse_class_attribute("text-lg");
        assert_eq!(set.set(Dimension::TextSize, "text-2xl").unwrap(), true);
        assert_eq!(set.set(Dimension::TextSize, "text-2xl").unwrap(), false);
        assert!(set.set(Dimension::TextColor, "text-lg").is_err());
        assert!(set.set(Dimension::Padding, "banana").is_err());
        assert_eq!(set.set(Dimension::TextSize, "").unwrap(), true);
        assert!(set.is_default(Dimension::TextSize));
        assert_eq!(set.explicit(Dimension::TextSize), None);
    }

    #[test]
    fn dimension_keys() {
        assert_eq!("fontSize".parse::<Dimension>().unwrap(), Dimension::TextSize);
        assert_eq!("backgroundColor".parse::<Dimension>().unwrap(), Dimension::BackgroundColor);
        assert!("colour".parse::<Dimension>().is_err());
        assert_eq!(serde_json::to_string(&Dimension::TextColor).unwrap(), "\"textColor\"");
    }
}
