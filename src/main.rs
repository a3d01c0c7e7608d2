use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use msx_tile_editor::{
    codec::{self, NumberFormat},
    common::ScreenMode,
    persist, render,
    state::{get_initial_state, EditorState},
};

#[derive(Parser, Debug)]
#[command(name = "msxtile", about = "MSX SCREEN 2 tile project tool")]
struct Args {
    /// Project directory (remembered in the global config)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assembler source for one tile or the whole tileset
    ExportAsm {
        #[arg(long)]
        tile: Option<String>,
        /// Decimal numbers instead of $XX hex
        #[arg(long)]
        decimal: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Raw pattern/color tables per tile plus concatenated tileset tables
    ExportBin {
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Add tiles from a tileset JSON file to the project
    Import {
        file: PathBuf,
        /// Keep free per-pixel colors instead of forcing SCREEN 2 attributes
        #[arg(long)]
        unconstrained: bool,
    },
    Assign {
        #[arg(long)]
        bank: String,
        #[arg(long)]
        tile: String,
    },
    Unassign {
        #[arg(long)]
        bank: String,
        #[arg(long)]
        tile: String,
    },
    ToggleBank {
        #[arg(long)]
        bank: String,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
    LockBank {
        #[arg(long)]
        bank: String,
        #[arg(long, action = clap::ArgAction::Set)]
        locked: bool,
    },
    /// Delete a tile, its bank assignments and its file
    Remove {
        #[arg(long)]
        tile: String,
    },
    SetRange {
        #[arg(long)]
        bank: String,
        #[arg(long)]
        start: u8,
        #[arg(long)]
        end: u8,
    },
    /// List banks with their ranges and VRAM usage
    Banks,
    /// Render a tile to PNG
    Preview {
        #[arg(long)]
        tile: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 8)]
        scale: usize,
    },
}

fn write_text(output: Option<PathBuf>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            info!("Saving {}", path.display());
            std::fs::write(&path, text).with_context(|| format!("Unable to write {}", path.display()))?;
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn export_bin(state: &EditorState, dir: &Path) -> Result<()> {
    let tiles = &state.project.tiles;
    for tile in tiles {
        let stem = persist::file_stem(&tile.name);
        persist::write_binary(
            &dir.join(format!("{}_pattern.bin", stem)),
            &codec::pattern_bytes(tile),
        )?;
        if let Some(colors) = codec::color_bytes(tile) {
            persist::write_binary(&dir.join(format!("{}_color.bin", stem)), &colors)?;
        }
    }
    persist::write_binary(&dir.join("all_patterns.bin"), &codec::all_pattern_bytes(tiles))?;
    persist::write_binary(&dir.join("all_colors.bin"), &codec::all_color_bytes(tiles))?;
    Ok(())
}

fn run(state: &mut EditorState, command: Command) -> Result<()> {
    let project = &mut state.project;
    match command {
        Command::ExportAsm {
            tile,
            decimal,
            output,
        } => {
            let format = if decimal {
                NumberFormat::Decimal
            } else {
                state.global_config.number_format
            };
            let text = match tile {
                Some(key) => {
                    let tile = project.find_tile(&key)?;
                    codec::tile_assembly_text(tile, &tile.name, format)
                }
                None => codec::tileset_assembly_text(&project.tiles, &*project, format),
            };
            write_text(output, &text)?;
        }
        Command::ExportBin { output } => export_bin(state, &output)?,
        Command::Import {
            file,
            unconstrained,
        } => {
            let mode = if unconstrained {
                ScreenMode::Screen5
            } else {
                ScreenMode::Screen2
            };
            let tiles = persist::load_tileset(&file, Some(mode))?;
            let n = tiles.len();
            for tile in tiles {
                project.add_tile(tile)?;
            }
            info!("Imported {} tile(s) from {}", n, file.display());
            persist::save_project(state)?;
        }
        Command::Assign { bank, tile } => {
            let id = project.find_tile(&tile)?.id.clone();
            let code = project.assign(&bank, &id)?;
            println!("{} -> {} at character code {}", tile, bank, code);
            persist::save_project(state)?;
        }
        Command::Unassign { bank, tile } => {
            let id = project.find_tile(&tile)?.id.clone();
            project.unassign(&bank, &id)?;
            persist::save_project(state)?;
        }
        Command::ToggleBank { bank, enabled } => {
            project.set_bank_enabled(&bank, enabled)?;
            persist::save_project(state)?;
        }
        Command::LockBank { bank, locked } => {
            project.banks.set_locked(&bank, locked)?;
            persist::save_project(state)?;
        }
        Command::Remove { tile } => {
            let removed = persist::remove_tile(state, &tile)?;
            info!("Removed tile {} ({})", removed.name, removed.id);
        }
        Command::SetRange { bank, start, end } => {
            project.banks.update_range(&bank, start, end)?;
            persist::save_project(state)?;
        }
        Command::Banks => {
            for bank in &project.banks.banks {
                let usage = bank.vram_usage();
                println!(
                    "{:<18} {:<20} {:>3}-{:<3} {:<8} pattern ${:04X} color ${:04X} used {}/{} chars",
                    bank.id,
                    bank.name,
                    bank.charset_range.start,
                    bank.charset_range.end,
                    if bank.enabled { "enabled" } else { "disabled" },
                    bank.vram_pattern_start,
                    bank.vram_color_start,
                    usage.chars_used,
                    bank.charset_range.len(),
                );
            }
        }
        Command::Preview {
            tile,
            output,
            scale,
        } => {
            let tile = project.find_tile(&tile)?;
            render::save_png(&output, tile, scale)?;
        }
    }
    Ok(())
}

pub fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mut state = get_initial_state(args.project)?;
    run(&mut state, args.command)?;
    persist::save_global_config(&mut state)?;
    Ok(())
}
