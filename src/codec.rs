// SCREEN 2 export: pattern bytes, color-attribute bytes and assembler text.
//
// Tiles are walked as 8x8 character blocks in row-major block order, eight
// bytes (one per pixel row) per block. Pattern bits are MSB-first: bit 7 is
// the leftmost pixel of the row.
use std::fmt::Write as _;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    common::{CharCode, CHAR_SIZE},
    palette::{self, DEFAULT_BG_INDEX, DEFAULT_FG_INDEX},
    tile::{LineAttribute, Tile},
};

const BYTES_PER_LINE: usize = 16;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    #[default]
    Hex,
    Decimal,
}

impl NumberFormat {
    pub fn format(self, value: u8) -> String {
        match self {
            NumberFormat::Hex => format!("${:02X}", value),
            NumberFormat::Decimal => value.to_string(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            NumberFormat::Hex => "HEX",
            NumberFormat::Decimal => "DECIMAL",
        }
    }
}

/// Answers export questions about tiles on behalf of the bank layer.
pub trait BankResolver {
    /// Base character code assigned to the tile, if any bank holds it.
    fn base_char_code(&self, tile: &Tile) -> Option<CharCode>;

    /// Whether the tile carries the per-segment attributes SCREEN 2 needs.
    fn is_screen2(&self, tile: &Tile) -> bool {
        tile.is_constrained()
    }
}

/// Uppercase assembler label with everything outside `[A-Za-z0-9_]` replaced.
pub fn sanitize_label(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn blocks(tile: &Tile) -> (usize, usize) {
    (tile.width() / CHAR_SIZE, tile.height() / CHAR_SIZE)
}

// (block_x, block_y, absolute row) triples in output order.
fn block_rows(tile: &Tile) -> impl Iterator<Item = (usize, usize, usize)> {
    let (bx, by) = blocks(tile);
    (0..by)
        .cartesian_product(0..bx)
        .flat_map(|(cby, cbx)| (0..CHAR_SIZE).map(move |r| (cbx, cby, cby * CHAR_SIZE + r)))
}

fn pattern_byte(tile: &Tile, cbx: usize, row: usize) -> u8 {
    let Some(pixels) = tile.pixels().get(row) else {
        return 0;
    };
    let transparent = palette::transparent();
    let attr = tile.attribute(row, cbx);
    let mut byte = 0u8;
    for i in 0..CHAR_SIZE {
        let Some(c) = pixels.get(cbx * CHAR_SIZE + i) else {
            continue;
        };
        let on = match attr {
            Some(a) => *c == a.fg,
            None => *c != transparent,
        };
        if on {
            byte |= 1 << (7 - i);
        }
    }
    byte
}

fn color_byte(attr: Option<&LineAttribute>) -> u8 {
    let (fg, bg) = match attr {
        Some(a) => (
            palette::msx1_index(&a.fg).unwrap_or(DEFAULT_FG_INDEX),
            palette::msx1_index(&a.bg).unwrap_or(DEFAULT_BG_INDEX),
        ),
        None => (DEFAULT_FG_INDEX, DEFAULT_BG_INDEX),
    };
    (fg << 4) | (bg & 0x0F)
}

/// Pattern table bytes: `(width/8) * (height/8) * 8` of them.
pub fn pattern_bytes(tile: &Tile) -> Vec<u8> {
    block_rows(tile)
        .map(|(cbx, _, row)| pattern_byte(tile, cbx, row))
        .collect()
}

/// Color table bytes, `fg << 4 | bg` per block row. `None` for tiles without
/// line attributes. Colors outside the MSX1 palette fall back to white on black.
pub fn color_bytes(tile: &Tile) -> Option<Vec<u8>> {
    if !tile.is_constrained() {
        return None;
    }
    Some(
        block_rows(tile)
            .map(|(cbx, _, row)| color_byte(tile.attribute(row, cbx)))
            .collect(),
    )
}

pub fn all_pattern_bytes<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> Vec<u8> {
    tiles.into_iter().flat_map(pattern_bytes).collect()
}

pub fn all_color_bytes<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> Vec<u8> {
    tiles.into_iter().filter_map(color_bytes).flatten().collect()
}

fn db_line(bytes: &[u8], format: NumberFormat) -> String {
    format!("DB {}", bytes.iter().map(|&b| format.format(b)).join(","))
}

/// Assembler source for a single tile: a pattern block and a color block,
/// each with one commented `DB` line per character block.
pub fn tile_assembly_text(tile: &Tile, name: &str, format: NumberFormat) -> String {
    let Some(colors) = color_bytes(tile) else {
        return format!(
            ";; ERROR: Tile {} is missing line attributes required for SCREEN 2 export.\n",
            name
        );
    };
    let patterns = pattern_bytes(tile);
    let label = sanitize_label(name);
    let (bx, by) = blocks(tile);

    let mut out = String::new();
    let _ = writeln!(out, ";; Tile: {} ({}x{})", name, tile.width(), tile.height());
    let _ = writeln!(
        out,
        ";; Structure: {}x{} character blocks (8x8 pixels each)",
        bx, by
    );
    let _ = writeln!(out, ";; Data format: {}\n", format.name());

    let sections = [
        ("PATTERN DATA", "PATTERN", "PATTERN Data (8 bytes)", &patterns),
        (
            "COLOR ATTRIBUTE DATA",
            "COLOR",
            "COLOR Attribute Data (8 bytes - FG|BG)",
            &colors,
        ),
    ];
    for (title, suffix, what, bytes) in sections {
        let _ = writeln!(out, ";; --- {} ---", title);
        if bytes.is_empty() {
            let _ = writeln!(out, ";; No {} generated.", title.to_lowercase());
        } else {
            let _ = writeln!(out, "{}_{}_DATA:", label, suffix);
            for (i, chunk) in bytes.chunks(CHAR_SIZE).enumerate() {
                let _ = writeln!(
                    out,
                    ";; Character Block ({}, {}) for {} - {}:",
                    i % bx,
                    i / bx,
                    label,
                    what
                );
                let _ = writeln!(out, "    {}", db_line(chunk, format));
            }
        }
        out.push('\n');
    }
    let _ = writeln!(out, ";; End of Tile Data for {}", label);
    out
}

fn push_chunked(out: &mut String, bytes: &[u8], format: NumberFormat) {
    for chunk in bytes.chunks(BYTES_PER_LINE) {
        let _ = writeln!(out, "    {}", db_line(chunk, format));
    }
}

/// Assembler source for a whole tileset: every tile's patterns under
/// `ALL_MAP_TILES_PTR`, then every tile's colors under `ALL_MAP_TILES_COL`.
/// Tiles the resolver does not consider SCREEN 2 tiles are skipped with a
/// comment in both sections.
pub fn tileset_assembly_text<'a>(
    tiles: impl IntoIterator<Item = &'a Tile>,
    resolver: &impl BankResolver,
    format: NumberFormat,
) -> String {
    let tiles: Vec<&Tile> = tiles.into_iter().collect();
    if tiles.is_empty() {
        return ";; No tiles in the project to export.\n".to_string();
    }

    let mut header = String::from(";; TILESET EXPORT\n");
    let _ = writeln!(header, ";; {} tiles total.\n", tiles.len());
    let _ = writeln!(header, ";; Data format: {}\n", format.name());
    let mut patterns = String::from(";; --- ALL TILE PATTERNS ---\nALL_MAP_TILES_PTR:\n");
    let mut colors = String::from("\n;; --- ALL TILE COLORS ---\nALL_MAP_TILES_COL:\n");

    for tile in tiles {
        let label = sanitize_label(&tile.name);
        let color_data = color_bytes(tile).filter(|_| resolver.is_screen2(tile));
        let Some(color_data) = color_data else {
            let skipped = format!(
                "    ;; Tile: {} - SKIPPED (Not configured for SCREEN 2)\n",
                label
            );
            patterns.push_str(&skipped);
            colors.push_str(&skipped);
            continue;
        };
        let at = resolver
            .base_char_code(tile)
            .map(|code| format!(" (char {})", format.format(code)))
            .unwrap_or_default();
        let _ = writeln!(patterns, "    ;; Pattern data for {}{}", label, at);
        push_chunked(&mut patterns, &pattern_bytes(tile), format);
        let _ = writeln!(colors, "    ;; Color data for {}{}", label, at);
        push_chunked(&mut colors, &color_data, format);
    }
    header + &patterns + &colors
}
