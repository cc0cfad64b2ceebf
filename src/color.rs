use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ColorError;

/// sRGB colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a colour from a packed `0xRRGGBB` value. Bits above 24 are ignored.
    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_hex(self) -> u32 {
        let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// CSS hex notation, e.g. `#ff8000`.
    pub fn to_css(self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    pub fn from_vec3(value: Vec3) -> Self {
        Self::rgb(value.x, value.y, value.z)
    }

    /// Resolves any accepted colour input.
    pub fn from_input(input: &ColorInput) -> Result<Self, ColorError> {
        match input {
            ColorInput::Hex(hex) => Ok(Self::from_hex(*hex)),
            ColorInput::Style(style) => Self::parse(style),
        }
    }

    /// Parses a colour string: `#rgb`, `#rrggbb`, `0xrrggbb`, `rgb()`/`rgba()`,
    /// `hsl()`/`hsla()` or a CSS colour keyword.
    pub fn parse(style: &str) -> Result<Self, ColorError> {
        let trimmed = style.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex_digits(hex, trimmed);
        }
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return parse_hex_digits(hex, trimmed);
        }
        if let Some((name, args)) = split_function(trimmed) {
            return match name.to_ascii_lowercase().as_str() {
                "rgb" | "rgba" => parse_rgb_args(args)
                    .ok_or_else(|| ColorError::InvalidFunction(trimmed.to_string())),
                "hsl" | "hsla" => parse_hsl_args(args)
                    .ok_or_else(|| ColorError::InvalidFunction(trimmed.to_string())),
                _ => Err(ColorError::InvalidFunction(trimmed.to_string())),
            };
        }
        named_color(trimmed)
            .map(Self::from_hex)
            .ok_or_else(|| ColorError::UnknownName(trimmed.to_string()))
    }

    /// Converts hue/saturation/lightness (each in `0..=1`, hue wrapping) to RGB.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(1.0);
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self::rgb(l, l, l);
        }
        let high = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let low = 2.0 * l - high;
        Self::rgb(
            hue_to_channel(low, high, h + 1.0 / 3.0),
            hue_to_channel(low, high, h),
            hue_to_channel(low, high, h - 1.0 / 3.0),
        )
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// A colour value as handed over by a caller, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorInput {
    Hex(u32),
    Style(String),
}

impl ColorInput {
    /// Numeric inputs are floored and clamped to the 24-bit range.
    pub fn from_number(value: f64) -> Self {
        let floored = if value.is_finite() { value.floor() } else { 0.0 };
        Self::Hex(floored.clamp(0.0, 0xff_ffff as f64) as u32)
    }
}

impl From<u32> for ColorInput {
    fn from(value: u32) -> Self {
        Self::Hex(value)
    }
}

impl From<&str> for ColorInput {
    fn from(value: &str) -> Self {
        Self::Style(value.to_string())
    }
}

impl From<String> for ColorInput {
    fn from(value: String) -> Self {
        Self::Style(value)
    }
}

impl fmt::Display for ColorInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(hex) => write!(f, "0x{hex:06x}"),
            Self::Style(style) => f.write_str(style),
        }
    }
}

fn parse_hex_digits(digits: &str, original: &str) -> Result<Color, ColorError> {
    let invalid = || ColorError::InvalidHex(original.to_string());
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    match digits.len() {
        3 => {
            let value = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
            let expand = |nibble: u32| nibble * 17;
            Ok(Color::from_hex(
                (expand((value >> 8) & 0xf) << 16)
                    | (expand((value >> 4) & 0xf) << 8)
                    | expand(value & 0xf),
            ))
        }
        6 => u32::from_str_radix(digits, 16)
            .map(Color::from_hex)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

fn split_function(style: &str) -> Option<(&str, &str)> {
    let open = style.find('(')?;
    let inner = style[open + 1..].strip_suffix(')')?;
    Some((style[..open].trim(), inner))
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |part: &str| -> Option<f32> {
        match part.strip_suffix('%') {
            Some(percent) => Some((percent.trim().parse::<f32>().ok()? / 100.0).clamp(0.0, 1.0)),
            None => Some((part.parse::<f32>().ok()?.min(255.0) / 255.0).max(0.0)),
        }
    };
    Some(Color::rgb(
        channel(parts[0])?,
        channel(parts[1])?,
        channel(parts[2])?,
    ))
}

fn parse_hsl_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let hue = parts[0].trim_end_matches("deg").parse::<f32>().ok()? / 360.0;
    let percent = |part: &str| -> Option<f32> {
        Some(part.strip_suffix('%')?.trim().parse::<f32>().ok()? / 100.0)
    };
    Some(Color::from_hsl(hue, percent(parts[1])?, percent(parts[2])?))
}

fn hue_to_channel(low: f32, high: f32, t: f32) -> f32 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };
    if t < 1.0 / 6.0 {
        low + (high - low) * 6.0 * t
    } else if t < 0.5 {
        high
    } else if t < 2.0 / 3.0 {
        low + (high - low) * 6.0 * (2.0 / 3.0 - t)
    } else {
        low
    }
}

fn named_color(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(candidate, _)| *candidate == lower)
        .map(|(_, hex)| *hex)
}

const NAMED_COLORS: &[(&str, u32)] = &[
    ("aliceblue", 0xf0f8ff),
    ("antiquewhite", 0xfaebd7),
    ("aqua", 0x00ffff),
    ("aquamarine", 0x7fffd4),
    ("azure", 0xf0ffff),
    ("beige", 0xf5f5dc),
    ("bisque", 0xffe4c4),
    ("black", 0x000000),
    ("blanchedalmond", 0xffebcd),
    ("blue", 0x0000ff),
    ("blueviolet", 0x8a2be2),
    ("brown", 0xa52a2a),
    ("burlywood", 0xdeb887),
    ("cadetblue", 0x5f9ea0),
    ("chartreuse", 0x7fff00),
    ("chocolate", 0xd2691e),
    ("coral", 0xff7f50),
    ("cornflowerblue", 0x6495ed),
    ("cornsilk", 0xfff8dc),
    ("crimson", 0xdc143c),
    ("cyan", 0x00ffff),
    ("darkblue", 0x00008b),
    ("darkcyan", 0x008b8b),
    ("darkgoldenrod", 0xb8860b),
    ("darkgray", 0xa9a9a9),
    ("darkgreen", 0x006400),
    ("darkgrey", 0xa9a9a9),
    ("darkkhaki", 0xbdb76b),
    ("darkmagenta", 0x8b008b),
    ("darkolivegreen", 0x556b2f),
    ("darkorange", 0xff8c00),
    ("darkorchid", 0x9932cc),
    ("darkred", 0x8b0000),
    ("darksalmon", 0xe9967a),
    ("darkseagreen", 0x8fbc8f),
    ("darkslateblue", 0x483d8b),
    ("darkslategray", 0x2f4f4f),
    ("darkslategrey", 0x2f4f4f),
    ("darkturquoise", 0x00ced1),
    ("darkviolet", 0x9400d3),
    ("deeppink", 0xff1493),
    ("deepskyblue", 0x00bfff),
    ("dimgray", 0x696969),
    ("dimgrey", 0x696969),
    ("dodgerblue", 0x1e90ff),
    ("firebrick", 0xb22222),
    ("floralwhite", 0xfffaf0),
    ("forestgreen", 0x228b22),
    ("fuchsia", 0xff00ff),
    ("gainsboro", 0xdcdcdc),
    ("ghostwhite", 0xf8f8ff),
    ("gold", 0xffd700),
    ("goldenrod", 0xdaa520),
    ("gray", 0x808080),
    ("green", 0x008000),
    ("greenyellow", 0xadff2f),
    ("grey", 0x808080),
    ("honeydew", 0xf0fff0),
    ("hotpink", 0xff69b4),
    ("indianred", 0xcd5c5c),
    ("indigo", 0x4b0082),
    ("ivory", 0xfffff0),
    ("khaki", 0xf0e68c),
    ("lavender", 0xe6e6fa),
    ("lavenderblush", 0xfff0f5),
    ("lawngreen", 0x7cfc00),
    ("lemonchiffon", 0xfffacd),
    ("lightblue", 0xadd8e6),
    ("lightcoral", 0xf08080),
    ("lightcyan", 0xe0ffff),
    ("lightgoldenrodyellow", 0xfafad2),
    ("lightgray", 0xd3d3d3),
    ("lightgreen", 0x90ee90),
    ("lightgrey", 0xd3d3d3),
    ("lightpink", 0xffb6c1),
    ("lightsalmon", 0xffa07a),
    ("lightseagreen", 0x20b2aa),
    ("lightskyblue", 0x87cefa),
    ("lightslategray", 0x778899),
    ("lightslategrey", 0x778899),
    ("lightsteelblue", 0xb0c4de),
    ("lightyellow", 0xffffe0),
    ("lime", 0x00ff00),
    ("limegreen", 0x32cd32),
    ("linen", 0xfaf0e6),
    ("magenta", 0xff00ff),
    ("maroon", 0x800000),
    ("mediumaquamarine", 0x66cdaa),
    ("mediumblue", 0x0000cd),
    ("mediumorchid", 0xba55d3),
    ("mediumpurple", 0x9370db),
    ("mediumseagreen", 0x3cb371),
    ("mediumslateblue", 0x7b68ee),
    ("mediumspringgreen", 0x00fa9a),
    ("mediumturquoise", 0x48d1cc),
    ("mediumvioletred", 0xc71585),
    ("midnightblue", 0x191970),
    ("mintcream", 0xf5fffa),
    ("mistyrose", 0xffe4e1),
    ("moccasin", 0xffe4b5),
    ("navajowhite", 0xffdead),
    ("navy", 0x000080),
    ("oldlace", 0xfdf5e6),
    ("olive", 0x808000),
    ("olivedrab", 0x6b8e23),
    ("orange", 0xffa500),
    ("orangered", 0xff4500),
    ("orchid", 0xda70d6),
    ("palegoldenrod", 0xeee8aa),
    ("palegreen", 0x98fb98),
    ("paleturquoise", 0xafeeee),
    ("palevioletred", 0xdb7093),
    ("papayawhip", 0xffefd5),
    ("peachpuff", 0xffdab9),
    ("peru", 0xcd853f),
    ("pink", 0xffc0cb),
    ("plum", 0xdda0dd),
    ("powderblue", 0xb0e0e6),
    ("purple", 0x800080),
    ("rebeccapurple", 0x663399),
    ("red", 0xff0000),
    ("rosybrown", 0xbc8f8f),
    ("royalblue", 0x4169e1),
    ("saddlebrown", 0x8b4513),
    ("salmon", 0xfa8072),
    ("sandybrown", 0xf4a460),
    ("seagreen", 0x2e8b57),
    ("seashell", 0xfff5ee),
    ("sienna", 0xa0522d),
    ("silver", 0xc0c0c0),
    ("skyblue", 0x87ceeb),
    ("slateblue", 0x6a5acd),
    ("slategray", 0x708090),
    ("slategrey", 0x708090),
    ("snow", 0xfffafa),
    ("springgreen", 0x00ff7f),
    ("steelblue", 0x4682b4),
    ("tan", 0xd2b48c),
    ("teal", 0x008080),
    ("thistle", 0xd8bfd8),
    ("tomato", 0xff6347),
    ("turquoise", 0x40e0d0),
    ("violet", 0xee82ee),
    ("wheat", 0xf5deb3),
    ("white", 0xffffff),
    ("whitesmoke", 0xf5f5f5),
    ("yellow", 0xffff00),
    ("yellowgreen", 0x9acd32),
];
