use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use json_pretty_compact::PrettyCompactFormatter;
use log::{info, warn};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Serializer, Value};

use crate::{
    bank::TileBankConfig,
    common::{Color, ScreenMode, SEGMENT_WIDTH},
    palette,
    project::Project,
    state::EditorState,
    tile::{normalized_width, AttributeGrid, LineAttribute, LogicalProperties, PixelGrid, Tile},
};

const DEFAULT_TILE_SIZE: usize = 16;

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    info!("Saving {}", path.display());
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)?;
    fs::create_dir_all(path.parent().context("invalid parent directory")?)?;
    fs::write(path, &data_bytes)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    info!("Loading {}", path.display());
    let data_bytes = std::fs::read(path)?;
    let data: T = serde_json::from_slice(&data_bytes)
        .with_context(|| format!("Unable to parse {}", path.display()))?;
    Ok(data)
}

pub fn write_binary(path: &Path, bytes: &[u8]) -> Result<()> {
    info!("Writing {} ({} bytes)", path.display(), bytes.len());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_global_config(state: &mut EditorState) -> Result<()> {
    state.global_config = load_json(&state.global_config_path)?;
    Ok(())
}

pub fn save_global_config(state: &mut EditorState) -> Result<()> {
    if state.global_config.modified {
        save_json(&state.global_config_path, &state.global_config)?;
        state.global_config.modified = false;
    }
    Ok(())
}

pub fn get_project_dir(state: &EditorState) -> Result<PathBuf> {
    Ok(state
        .global_config
        .project_dir
        .as_ref()
        .context("Project directory not set.")?
        .to_owned())
}

fn get_tile_dir(project_dir: &Path) -> PathBuf {
    project_dir.join("Tiles")
}

fn get_banks_path(project_dir: &Path) -> PathBuf {
    project_dir.join("banks.json")
}

/// File-system safe form of a tile name.
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// Bytes outside [A-Za-z0-9-] become `_XX`, so distinct ids never share a
// file name.
fn escape_id(id: &str) -> String {
    id.bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() || b == b'-' {
                (b as char).to_string()
            } else {
                format!("_{:02X}", b)
            }
        })
        .collect()
}

/// `Tiles/<name>.<id>.json`. The name part is for readability only.
pub fn tile_path(project_dir: &Path, tile: &Tile) -> PathBuf {
    get_tile_dir(project_dir).join(format!(
        "{}.{}.json",
        file_stem(&tile.name),
        escape_id(&tile.id)
    ))
}

fn dimension(obj: &serde_json::Map<String, Value>, key: &str) -> usize {
    obj.get(key)
        .and_then(Value::as_u64)
        .filter(|&v| v > 0)
        .map_or(DEFAULT_TILE_SIZE, |v| v as usize)
}

/// Turns one loosely-formed tile record into a valid tile: missing fields get
/// defaults, grids of the wrong shape are rebuilt, and constrained tiles are
/// repaired so every pixel matches its segment. `mode` forces the tile into
/// a screen mode; `None` keeps whatever the record describes.
pub fn validate_tile(raw: &Value, index: usize, mode: Option<ScreenMode>) -> Result<Tile> {
    let Some(obj) = raw.as_object() else {
        bail!("Tile entry {} is not an object", index);
    };
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let id = text("id").unwrap_or_else(|| format!("loaded_tile_{}", index));
    let name = text("name").unwrap_or_else(|| format!("Loaded Tile {}", index + 1));
    let constrained = match mode {
        Some(ScreenMode::Screen2) => true,
        Some(ScreenMode::Screen5) => false,
        None => obj.get("lineAttributes").is_some_and(|v| !v.is_null()),
    };

    let mut width = dimension(obj, "width");
    let height = dimension(obj, "height");
    if constrained && width % SEGMENT_WIDTH != 0 {
        let w = normalized_width(width);
        warn!("Tile '{}' (ID: {}) width {} rounded to {}", name, id, width, w);
        width = w;
    }

    let pixels: Option<PixelGrid> = obj
        .get("data")
        .and_then(|v| serde_json::from_value(v.clone()).ok());
    let pixels = match pixels {
        Some(p) if p.len() == height && p.iter().all(|r| r.len() == width) => p,
        other => {
            if other.is_some() {
                warn!(
                    "Tile '{}' (ID: {}) has mismatched pixel data dimensions. Re-initializing.",
                    name, id
                );
            }
            let black = Color::new(palette::SCREEN5_PALETTE[1].1);
            vec![vec![black; width]; height]
        }
    };

    let line_attributes = if constrained {
        let segments = width / SEGMENT_WIDTH;
        let attrs: Option<AttributeGrid> = obj
            .get("lineAttributes")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        match attrs {
            Some(a) if a.len() == height && a.iter().all(|r| r.len() == segments) => Some(a),
            _ => {
                warn!(
                    "Tile '{}' (ID: {}) missing or has invalid lineAttributes. Applying defaults for SCREEN 2.",
                    name, id
                );
                Some(vec![vec![LineAttribute::default(); segments]; height])
            }
        }
    } else {
        None
    };

    let logical_properties = obj
        .get("logicalProperties")
        .and_then(Value::as_u64)
        .filter(|&v| v <= u8::MAX as u64)
        .map_or(LogicalProperties::default(), |v| LogicalProperties(v as u8));

    let tile = Tile::from_parts(&id, &name, pixels, line_attributes, logical_properties)
        .with_context(|| format!("Tile '{}' (ID: {}) could not be rebuilt", name, id))?;
    Ok(tile)
}

/// Parses a tileset file: either a bare array of tiles or `{"tiles": [...]}`.
pub fn parse_tileset(text: &str, mode: Option<ScreenMode>) -> Result<Vec<Tile>> {
    let parsed: Value = serde_json::from_str(text).context("Tileset is not valid JSON")?;
    let entries = match &parsed {
        Value::Array(a) => a,
        Value::Object(o) => match o.get("tiles") {
            Some(Value::Array(a)) => a,
            _ => bail!("Invalid tileset format. Expected an array of tiles or an object with a 'tiles' array."),
        },
        _ => bail!("Invalid tileset format. Expected an array of tiles or an object with a 'tiles' array."),
    };
    entries
        .iter()
        .enumerate()
        .map(|(i, raw)| validate_tile(raw, i, mode))
        .collect()
}

pub fn load_tileset(path: &Path, mode: Option<ScreenMode>) -> Result<Vec<Tile>> {
    info!("Loading tileset {}", path.display());
    let text = fs::read_to_string(path)?;
    let tiles = parse_tileset(&text, mode)?;
    if tiles.is_empty() {
        warn!("No tiles found in {}", path.display());
    }
    Ok(tiles)
}

pub fn save_tileset(path: &Path, tiles: &[Tile]) -> Result<()> {
    save_json(path, &tiles)
}

fn load_tiles(project_dir: &Path) -> Result<Vec<Tile>> {
    let tile_dir = get_tile_dir(project_dir);
    let pattern = format!("{}/*.json", tile_dir.display());
    let mut tiles: Vec<Tile> = vec![];
    for (i, entry) in glob::glob(&pattern)?.enumerate() {
        let path = entry?;
        let raw: Value = load_json(&path)?;
        let tile = validate_tile(&raw, i, None)?;
        if tiles.iter().any(|t| t.id == tile.id) {
            warn!("Skipping {}: duplicate tile id {}", path.display(), tile.id);
            continue;
        }
        tiles.push(tile);
    }
    Ok(tiles)
}

fn load_banks(project_dir: &Path) -> Result<TileBankConfig> {
    let path = get_banks_path(project_dir);
    if !path.exists() {
        info!("No {} found, using default banks", path.display());
        return Ok(TileBankConfig::default_config());
    }
    load_json(&path)
}

pub fn load_project_dir(project_dir: &Path) -> Result<Project> {
    let tiles = load_tiles(project_dir)?;
    let mut banks = load_banks(project_dir)?;
    banks.refresh_runs(&tiles);
    for bank in &banks.banks {
        for stale in bank.stale_assignments() {
            warn!("Tile {} lies outside the range of bank {} or overlaps another run", stale, bank.id);
        }
    }
    Ok(Project::new(tiles, banks))
}

/// Writes every tile and the bank config, then deletes tile files that no
/// longer belong to any tile of the project.
pub fn save_project_dir(project_dir: &Path, project: &Project) -> Result<()> {
    let mut written: Vec<PathBuf> = vec![];
    for tile in &project.tiles {
        let path = tile_path(project_dir, tile);
        save_json(&path, tile)?;
        written.push(path);
    }
    save_json(&get_banks_path(project_dir), &project.banks)?;

    let pattern = format!("{}/*.json", get_tile_dir(project_dir).display());
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if !written.contains(&path) {
            info!("Deleting {}", path.display());
            fs::remove_file(&path)
                .with_context(|| format!("Unable to delete {}", path.display()))?;
        }
    }
    Ok(())
}

pub fn delete_tile(project_dir: &Path, tile: &Tile) -> Result<()> {
    let path = tile_path(project_dir, tile);
    info!("Deleting {}", path.display());
    std::fs::remove_file(path)?;
    Ok(())
}

pub fn save_project(state: &mut EditorState) -> Result<()> {
    if state.global_config.project_dir.is_none() {
        return Ok(());
    }
    let project_dir = get_project_dir(state)?;
    save_project_dir(&project_dir, &state.project)?;
    Ok(())
}

/// Removes a tile (by id or name) from the project together with its bank
/// assignments and, when a project directory is set, its file.
pub fn remove_tile(state: &mut EditorState, key: &str) -> Result<Tile> {
    let id = state.project.find_tile(key)?.id.clone();
    let tile = state
        .project
        .remove_tile(&id)
        .with_context(|| format!("No tile with id {}", id))?;
    if state.global_config.project_dir.is_some() {
        let project_dir = get_project_dir(state)?;
        if tile_path(&project_dir, &tile).exists() {
            delete_tile(&project_dir, &tile)?;
        }
        save_project_dir(&project_dir, &state.project)?;
    }
    Ok(tile)
}

pub fn load_project(state: &mut EditorState) -> Result<()> {
    if state.global_config.project_dir.is_none() {
        warn!("Project directory not set; starting with an empty project");
        return Ok(());
    }
    let project_dir = get_project_dir(state)?;
    state.project = load_project_dir(&project_dir)?;
    Ok(())
}
