// Fixed hardware palettes. The TMS9918 (MSX1) palette supplies the numeric
// color indices written into the color table; SCREEN 5 is the default palette
// for unconstrained tiles.
use crate::common::{Color, PaletteIdx};

pub struct PaletteEntry {
    pub name: &'static str,
    pub hex: &'static str,
    pub index: PaletteIdx,
}

pub const TRANSPARENT: &str = "rgba(0,0,0,0)";

pub const MSX1_PALETTE: [PaletteEntry; 16] = [
    PaletteEntry { name: "Transparent (Backdrop)", hex: TRANSPARENT, index: 0 },
    PaletteEntry { name: "Black", hex: "#000000", index: 1 },
    PaletteEntry { name: "Medium Green", hex: "#21C842", index: 2 },
    PaletteEntry { name: "Light Green", hex: "#5EDC78", index: 3 },
    PaletteEntry { name: "Dark Blue", hex: "#5455ED", index: 4 },
    PaletteEntry { name: "Light Blue", hex: "#7D76FC", index: 5 },
    PaletteEntry { name: "Dark Red", hex: "#D4524D", index: 6 },
    PaletteEntry { name: "Cyan", hex: "#42EBF5", index: 7 },
    PaletteEntry { name: "Medium Red", hex: "#FC5554", index: 8 },
    PaletteEntry { name: "Light Red", hex: "#FF7978", index: 9 },
    PaletteEntry { name: "Dark Yellow", hex: "#D4C154", index: 10 },
    PaletteEntry { name: "Light Yellow", hex: "#E6CE80", index: 11 },
    PaletteEntry { name: "Dark Green", hex: "#21B03B", index: 12 },
    PaletteEntry { name: "Magenta", hex: "#C95BBA", index: 13 },
    PaletteEntry { name: "Gray", hex: "#CCCCCC", index: 14 },
    PaletteEntry { name: "White", hex: "#FFFFFF", index: 15 },
];

pub const SCREEN5_PALETTE: [(&str, &str); 16] = [
    ("Transparent", TRANSPARENT),
    ("Black", "#000000"),
    ("Medium Green", "#3EB847"),
    ("Light Green", "#74D07D"),
    ("Dark Blue", "#2F2FC1"),
    ("Light Blue", "#5858FC"),
    ("Dark Red", "#B63125"),
    ("Cyan", "#68D2DA"),
    ("Medium Red", "#FC584A"),
    ("Light Red", "#FF8E81"),
    ("Dark Yellow", "#C0BF3B"),
    ("Light Yellow", "#E7E474"),
    ("Dark Green", "#309337"),
    ("Magenta", "#B640C8"),
    ("Gray", "#999999"),
    ("White", "#FFFFFF"),
];

pub const DEFAULT_FG_INDEX: PaletteIdx = 15; // White
pub const DEFAULT_BG_INDEX: PaletteIdx = 1; // Black

pub fn msx1_color(index: PaletteIdx) -> Color {
    MSX1_PALETTE
        .get(index as usize)
        .map(|e| Color::new(e.hex))
        .unwrap_or_else(|| Color::new(MSX1_PALETTE[DEFAULT_BG_INDEX as usize].hex))
}

pub fn msx1_index(color: &Color) -> Option<PaletteIdx> {
    MSX1_PALETTE
        .iter()
        .find(|e| e.hex.eq_ignore_ascii_case(color.as_str()))
        .map(|e| e.index)
}

pub fn transparent() -> Color {
    Color::new(TRANSPARENT)
}

pub fn default_fg() -> Color {
    msx1_color(DEFAULT_FG_INDEX)
}

pub fn default_bg() -> Color {
    msx1_color(DEFAULT_BG_INDEX)
}

/// RGBA value of a color token, for previews. Unknown tokens render as
/// opaque magenta so they stand out.
pub fn rgba(color: &Color) -> [u8; 4] {
    let s = color.as_str();
    if s.eq_ignore_ascii_case(TRANSPARENT) {
        return [0, 0, 0, 0];
    }
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() == 6 {
        if let Ok(v) = u32::from_str_radix(hex, 16) {
            return [(v >> 16) as u8, (v >> 8) as u8, v as u8, 255];
        }
    }
    [255, 0, 255, 255]
}
