use std::{
    fmt::Display,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

pub type TileId = String;
pub type BankId = String;
pub type CharCode = u8; // Hardware character code (0-255)
pub type PaletteIdx = u8; // Index into the MSX1 palette (0-15)
pub type PixelCoord = usize;

pub const SEGMENT_WIDTH: usize = 8; // Pixels sharing one fg/bg pair in SCREEN 2
pub const CHAR_SIZE: usize = 8; // Width and height of a hardware character

// Colors are opaque tokens ("#RRGGBB" or "rgba(0,0,0,0)"); only identity matters
// to the editing algorithms. Tokens are stored as written and compared ignoring
// ASCII case, so "#ff0000" == "#FF0000" but each round-trips unchanged.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Color(String);

impl Color {
    pub fn new(token: &str) -> Self {
        Color(token.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
        state.write_u8(0xff);
    }
}

impl From<String> for Color {
    fn from(s: String) -> Self {
        Color(s)
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Color::new(s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.0
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ScreenMode {
    // Graphics II: one fg/bg pair per 8-pixel segment.
    Screen2,
    // Free per-pixel colors.
    Screen5,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Default)]
pub struct Point {
    pub x: PixelCoord,
    pub y: PixelCoord,
}

impl Point {
    pub fn new(x: PixelCoord, y: PixelCoord) -> Self {
        Point { x, y }
    }
}

/// Number of 8-pixel units needed to cover `pixels`.
pub fn chars_covering(pixels: usize) -> usize {
    pixels.div_ceil(CHAR_SIZE)
}
