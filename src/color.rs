use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pixels with alpha below this are treated as fully transparent when matching.
pub const TRANSPARENT_ALPHA_THRESHOLD: u8 = 10;

/// Highest tolerance; matches any two non-transparent colors.
pub const MAX_TOLERANCE: u8 = 255;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("invalid color length {0}, expected 3, 6 or 8 hex digits")]
    InvalidLength(usize),

    #[error("invalid hex digit in color {0:?}")]
    InvalidDigit(String),
}

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn is_transparent(&self) -> bool {
        self.a < TRANSPARENT_ALPHA_THRESHOLD
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`. The leading `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || ColorParseError::InvalidDigit(hex.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| invalid())
        };

        match digits.len() {
            3 => {
                let short = |i: usize| channel(i..i + 1).map(|v| v * 17);
                Ok(Self::opaque(short(0)?, short(1)?, short(2)?))
            }
            6 => Ok(Self::opaque(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            len => Err(ColorParseError::InvalidLength(len)),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Rgba {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgba> for String {
    fn from(color: Rgba) -> Self {
        color.to_hex()
    }
}

impl From<image::Rgba<u8>> for Rgba {
    fn from(pixel: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = pixel.0;
        Self::new(r, g, b, a)
    }
}

impl From<Rgba> for image::Rgba<u8> {
    fn from(color: Rgba) -> Self {
        image::Rgba([color.r, color.g, color.b, color.a])
    }
}

impl From<Rgba> for tiny_skia::Color {
    fn from(color: Rgba) -> Self {
        tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Compares two colors under a 0..=255 tolerance.
///
/// Two near-transparent colors always match; a near-transparent color never
/// matches an opaque one. Otherwise the squared RGB distance must not exceed
/// `tolerance²`, with [`MAX_TOLERANCE`] matching everything. Alpha only takes
/// part through the transparency check.
pub fn colors_match(c1: Rgba, c2: Rgba, tolerance: u8) -> bool {
    match (c1.is_transparent(), c2.is_transparent()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    if tolerance == MAX_TOLERANCE {
        return true;
    }

    let dr = i32::from(c1.r) - i32::from(c2.r);
    let dg = i32::from(c1.g) - i32::from(c2.g);
    let db = i32::from(c1.b) - i32::from(c2.b);
    let tolerance = i32::from(tolerance);

    dr * dr + dg * dg + db * db <= tolerance * tolerance
}
