//! Color descriptions normalized to three channels in `[0, 1]`.
//!
//! Accepted forms are `#rgb`, `#rrggbb`, `#rrggbbaa` (alpha is ignored) and a
//! table of CSS color names. Parsing happens once at the configuration or CLI
//! boundary, so shaders only ever see finite values.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("color description is empty")]
    Empty,
    #[error("hex color '{0}' must have 3, 6 or 8 digits")]
    BadLength(String),
    #[error("hex color '{input}' contains invalid digit '{digit}'")]
    BadDigit { input: String, digit: char },
    #[error("unknown color name '{0}'")]
    UnknownName(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let quantize = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        [quantize(self.r), quantize(self.g), quantize(self.b), 255]
    }
}

impl From<Color> for [f32; 3] {
    fn from(color: Color) -> Self {
        color.to_array()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, _] = self.to_rgba8();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

/// Parses a color description into normalized channels.
pub fn parse_color(input: &str) -> Result<Color, ColorError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ColorError::Empty);
    }
    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(trimmed, hex);
    }
    let lowered = trimmed.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, [r, g, b])| Color::from_rgb8(*r, *g, *b))
        .ok_or_else(|| ColorError::UnknownName(trimmed.to_string()))
}

fn parse_hex(input: &str, hex: &str) -> Result<Color, ColorError> {
    let mut digits = Vec::with_capacity(8);
    for ch in hex.chars() {
        let value = ch.to_digit(16).ok_or_else(|| ColorError::BadDigit {
            input: input.to_string(),
            digit: ch,
        })?;
        digits.push(value as u8);
    }

    let channel = |hi: u8, lo: u8| hi * 16 + lo;
    match digits.as_slice() {
        [r, g, b] => Ok(Color::from_rgb8(r * 17, g * 17, b * 17)),
        [r1, r0, g1, g0, b1, b0] | [r1, r0, g1, g0, b1, b0, _, _] => Ok(Color::from_rgb8(
            channel(*r1, *r0),
            channel(*g1, *g0),
            channel(*b1, *b0),
        )),
        _ => Err(ColorError::BadLength(input.to_string())),
    }
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("navy", [0, 0, 128]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("gold", [255, 215, 0]),
    ("coral", [255, 127, 80]),
    ("salmon", [250, 128, 114]),
    ("tomato", [255, 99, 71]),
    ("crimson", [220, 20, 60]),
    ("indigo", [75, 0, 130]),
    ("violet", [238, 130, 238]),
    ("beige", [245, 245, 220]),
    ("ivory", [255, 255, 240]),
    ("khaki", [240, 230, 140]),
    ("lavender", [230, 230, 250]),
    ("sienna", [160, 82, 45]),
    ("tan", [210, 180, 140]),
    ("chocolate", [210, 105, 30]),
    ("darkslategray", [47, 79, 79]),
    ("darkseagreen", [143, 188, 143]),
    ("seagreen", [46, 139, 87]),
    ("slategray", [112, 128, 144]),
    ("steelblue", [70, 130, 180]),
    ("midnightblue", [25, 25, 112]),
    ("whitesmoke", [245, 245, 245]),
    ("gainsboro", [220, 220, 220]),
    ("lightgray", [211, 211, 211]),
    ("darkgray", [169, 169, 169]),
    ("dimgray", [105, 105, 105]),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-6)
    }

    #[test]
    fn parses_six_digit_hex() {
        let color = parse_color("#9cbfa1").unwrap();
        assert!(approx(
            color.to_array(),
            [156.0 / 255.0, 191.0 / 255.0, 161.0 / 255.0]
        ));
    }

    #[test]
    fn short_hex_expands_each_digit() {
        assert_eq!(parse_color("#fff").unwrap(), Color::WHITE);
        assert_eq!(parse_color("#0f0").unwrap(), Color::from_rgb8(0, 255, 0));
    }

    #[test]
    fn eight_digit_hex_ignores_alpha() {
        assert_eq!(
            parse_color("#e9e9e980").unwrap(),
            parse_color("#e9e9e9").unwrap()
        );
    }

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(parse_color("White").unwrap(), Color::WHITE);
        assert_eq!(" navy ".parse::<Color>().unwrap(), Color::from_rgb8(0, 0, 128));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_color("  "), Err(ColorError::Empty));
        assert!(matches!(parse_color("#12345"), Err(ColorError::BadLength(_))));
        assert!(matches!(
            parse_color("#12345g"),
            Err(ColorError::BadDigit { digit: 'g', .. })
        ));
        assert!(matches!(
            parse_color("notacolor"),
            Err(ColorError::UnknownName(_))
        ));
    }

    #[test]
    fn display_round_trips_through_hex() {
        let color = parse_color("#9cbfa1").unwrap();
        assert_eq!(color.to_string(), "#9cbfa1");
        assert_eq!(color.to_rgba8(), [0x9c, 0xbf, 0xa1, 255]);
    }
}
