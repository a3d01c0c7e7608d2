// The set of tiles being edited together with the bank configuration they
// are exported through.
use anyhow::{bail, ensure, Context, Result};
use log::info;

use crate::{
    bank::{Assignment, TileBankConfig},
    codec::BankResolver,
    common::CharCode,
    tile::Tile,
};

#[derive(Clone, Debug, Default)]
pub struct Project {
    // Kept in insertion order; exports walk tiles in this order.
    pub tiles: Vec<Tile>,
    pub banks: TileBankConfig,
}

impl Project {
    pub fn new(tiles: Vec<Tile>, banks: TileBankConfig) -> Self {
        Project { tiles, banks }
    }

    pub fn add_tile(&mut self, tile: Tile) -> Result<()> {
        ensure!(
            self.tile(&tile.id).is_none(),
            "Tile id {} already exists",
            tile.id
        );
        self.tiles.push(tile);
        Ok(())
    }

    pub fn tile(&self, id: &str) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_mut(&mut self, id: &str) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|t| t.id == id)
    }

    /// Looks a tile up by id first, then by display name.
    pub fn find_tile(&self, key: &str) -> Result<&Tile> {
        self.tile(key)
            .or_else(|| self.tiles.iter().find(|t| t.name == key))
            .with_context(|| format!("No tile named {}", key))
    }

    /// Removes the tile and every bank assignment pointing at it.
    pub fn remove_tile(&mut self, id: &str) -> Option<Tile> {
        let idx = self.tiles.iter().position(|t| t.id == id)?;
        let dropped = self.banks.remove_tile_everywhere(id);
        if dropped > 0 {
            info!("Dropped {} bank assignment(s) of tile {}", dropped, id);
        }
        Some(self.tiles.remove(idx))
    }

    pub fn assign(&mut self, bank_id: &str, tile_id: &str) -> Result<CharCode> {
        let Some(tile) = self.tiles.iter().find(|t| t.id == tile_id) else {
            bail!("No tile with id {}", tile_id);
        };
        let code = self
            .banks
            .assign(bank_id, tile, &self.tiles)
            .with_context(|| format!("Unable to assign {} to bank {}", tile.name, bank_id))?;
        info!("Assigned {} to bank {} at code {}", tile.name, bank_id, code);
        Ok(code)
    }

    pub fn unassign(&mut self, bank_id: &str, tile_id: &str) -> Result<Option<Assignment>> {
        let removed = self.banks.unassign(bank_id, tile_id)?;
        if removed.is_some() {
            info!("Unassigned {} from bank {}", tile_id, bank_id);
        }
        Ok(removed)
    }

    pub fn set_bank_enabled(&mut self, bank_id: &str, enabled: bool) -> Result<()> {
        self.banks.set_enabled(bank_id, enabled)?;
        let main = self
            .banks
            .rules
            .iter()
            .filter(|r| r.overlay == bank_id)
            .filter_map(|r| self.banks.bank(&r.base));
        for base in main {
            for stale in base.stale_assignments() {
                info!(
                    "Tile {} now lies outside the range of bank {} or overlaps another run",
                    stale, base.id
                );
            }
        }
        Ok(())
    }
}

impl BankResolver for TileBankConfig {
    fn base_char_code(&self, tile: &Tile) -> Option<CharCode> {
        self.assignment_for(&tile.id).map(|(_, a)| a.char_code)
    }
}

impl BankResolver for Project {
    fn base_char_code(&self, tile: &Tile) -> Option<CharCode> {
        self.banks.base_char_code(tile)
    }
}
