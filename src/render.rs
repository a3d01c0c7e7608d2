// PNG previews of tiles, each pixel drawn as a `scale` x `scale` square.
use std::{fs::File, io::BufWriter, io::Write, path::Path};

use anyhow::{ensure, Context, Result};
use log::info;

use crate::{palette, tile::Tile};

/// Row-major RGBA8 buffer of the scaled tile.
pub fn rgba_pixels(tile: &Tile, scale: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(tile.width() * tile.height() * scale * scale * 4);
    for row in tile.pixels() {
        let colors: Vec<[u8; 4]> = row.iter().map(palette::rgba).collect();
        for _ in 0..scale {
            for c in &colors {
                for _ in 0..scale {
                    out.extend_from_slice(c);
                }
            }
        }
    }
    out
}

pub fn write_png<W: Write>(writer: W, tile: &Tile, scale: usize) -> Result<()> {
    ensure!(scale > 0, "Scale must be positive");
    let width = u32::try_from(tile.width() * scale).context("Preview too wide")?;
    let height = u32::try_from(tile.height() * scale).context("Preview too tall")?;
    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&rgba_pixels(tile, scale))?;
    writer.finish()?;
    Ok(())
}

pub fn save_png(path: &Path, tile: &Tile, scale: usize) -> Result<()> {
    info!("Saving {}", path.display());
    let file = File::create(path).with_context(|| format!("Unable to create {}", path.display()))?;
    write_png(BufWriter::new(file), tile, scale)
}
