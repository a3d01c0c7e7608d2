// Character-code banks: contiguous code ranges mapped to VRAM pattern/color
// tables, with first-fit allocation of multi-character tiles.
use hashbrown::HashMap;
use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    common::{chars_covering, BankId, CharCode, PaletteIdx, TileId},
    tile::Tile,
};

pub const SCREEN_WIDTH_CHARS: u16 = 32;
pub const SCREEN_HEIGHT_CHARS: u16 = 24;
const BYTES_PER_CHAR: usize = 8; // one byte per character row

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("tile has zero size in characters")]
    ZeroSizeTile,
    #[error("tile {0} is already assigned to this bank")]
    AlreadyAssigned(TileId),
    #[error("no contiguous block of {need} free character codes in range [{start}-{end}]")]
    NoContiguousSpace {
        need: usize,
        start: CharCode,
        end: CharCode,
    },
    #[error("no bank with id {0}")]
    UnknownBank(BankId),
    #[error("bank {0} is locked")]
    BankLocked(BankId),
    #[error("bank {0} is disabled")]
    BankDisabled(BankId),
    #[error("range of bank {0} follows its overlays and cannot be set directly")]
    RangeManagedByReflow(BankId),
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct CharsetRange {
    #[serde(rename = "charsetRangeStart")]
    pub start: CharCode,
    #[serde(rename = "charsetRangeEnd")]
    pub end: CharCode,
}

impl CharsetRange {
    /// Inclusive range; an inverted pair collapses onto `start`.
    pub fn new(start: CharCode, end: CharCode) -> Self {
        CharsetRange {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end as usize - self.start as usize + 1
    }

    pub fn contains(&self, code: usize) -> bool {
        code >= self.start as usize && code <= self.end as usize
    }

    pub fn union(&self, other: &CharsetRange) -> CharsetRange {
        CharsetRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Screen rectangle, in character cells, that a bank governs.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ScreenZone {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl ScreenZone {
    pub fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        ScreenZone {
            x,
            y,
            width,
            height,
        }
    }

    // Bounding rectangle of both zones.
    pub fn union(&self, other: &ScreenZone) -> ScreenZone {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        ScreenZone::new(x, y, right - x, bottom - y)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub char_code: CharCode,
    // Length of the run, re-derived from the tile's size before allocating.
    #[serde(default = "one_code")]
    pub codes: u16,
}

fn one_code() -> u16 {
    1
}

fn default_true() -> bool {
    true
}

impl Assignment {
    pub fn run(&self) -> std::ops::Range<usize> {
        let start = self.char_code as usize;
        start..start + self.codes as usize
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct VramUsage {
    pub pattern_bytes: usize,
    pub color_bytes: usize,
    pub chars_used: usize,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileBank {
    pub id: BankId,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(rename = "isLocked", default)]
    pub locked: bool,
    #[serde(flatten)]
    pub charset_range: CharsetRange,
    pub vram_pattern_start: u16,
    pub vram_color_start: u16,
    pub screen_zone: ScreenZone,
    #[serde(default)]
    pub default_fg_color_index: PaletteIdx,
    #[serde(default)]
    pub default_bg_color_index: PaletteIdx,
    #[serde(default)]
    pub assigned_tiles: HashMap<TileId, Assignment>,
}

/// Number of consecutive character codes a tile occupies.
pub fn codes_needed(tile: &Tile) -> usize {
    chars_covering(tile.width()) * chars_covering(tile.height())
}

impl TileBank {
    fn occupancy(&self) -> [bool; 256] {
        let mut used = [false; 256];
        for a in self.assigned_tiles.values() {
            for code in a.run() {
                if code < 256 {
                    used[code] = true;
                }
            }
        }
        used
    }

    /// Re-derives each run length from the assigned tile's current size.
    /// Tiles missing from `tiles` keep their stored length.
    pub fn refresh_runs(&mut self, tiles: &[Tile]) {
        for (id, a) in self.assigned_tiles.iter_mut() {
            if let Some(t) = tiles.iter().find(|t| t.id == *id) {
                a.codes = u16::try_from(codes_needed(t)).unwrap_or(u16::MAX);
            }
        }
    }

    fn check_editable(&self) -> Result<(), AllocationError> {
        if self.locked {
            return Err(AllocationError::BankLocked(self.id.clone()));
        }
        if !self.enabled {
            return Err(AllocationError::BankDisabled(self.id.clone()));
        }
        Ok(())
    }

    /// First-fit search for `need` consecutive free codes, lowest address
    /// first, against the stored run lengths.
    pub fn find_free_block(&self, need: usize) -> Option<CharCode> {
        if need == 0 || need > self.charset_range.len() {
            return None;
        }
        let used = self.occupancy();
        let first = self.charset_range.start as usize;
        let last = self.charset_range.end as usize + 1 - need;
        (first..=last)
            .find(|&base| used[base..base + need].iter().all(|u| !u))
            .map(|base| base as CharCode)
    }

    /// Allocates a run for `tile`. `tiles` supplies the current sizes of the
    /// tiles already in the bank, which may have been resized since.
    pub fn assign(&mut self, tile: &Tile, tiles: &[Tile]) -> Result<CharCode, AllocationError> {
        self.check_editable()?;
        let need = codes_needed(tile);
        if need == 0 {
            return Err(AllocationError::ZeroSizeTile);
        }
        if self.assigned_tiles.contains_key(&tile.id) {
            return Err(AllocationError::AlreadyAssigned(tile.id.clone()));
        }
        self.refresh_runs(tiles);
        let base = self
            .find_free_block(need)
            .ok_or(AllocationError::NoContiguousSpace {
                need,
                start: self.charset_range.start,
                end: self.charset_range.end,
            })?;
        self.assigned_tiles.insert(
            tile.id.clone(),
            Assignment {
                char_code: base,
                codes: need as u16,
            },
        );
        Ok(base)
    }

    pub fn unassign(&mut self, tile_id: &str) -> Result<Option<Assignment>, AllocationError> {
        self.check_editable()?;
        Ok(self.assigned_tiles.remove(tile_id))
    }

    /// Clamps and stores a new range, keeping `start <= end`.
    pub fn update_range(&mut self, start: CharCode, end: CharCode) -> Result<(), AllocationError> {
        self.check_editable()?;
        self.charset_range = CharsetRange::new(start, end);
        Ok(())
    }

    /// Assignments whose run leaves the current range or overlaps another
    /// run. Neither reflow nor tile resizes migrate assignments, so both can
    /// show up after the fact.
    pub fn stale_assignments(&self) -> Vec<TileId> {
        let mut count = [0usize; 256];
        for code in self.assigned_tiles.values().flat_map(|a| a.run()) {
            if let Some(n) = count.get_mut(code) {
                *n += 1;
            }
        }
        let broken = |code: usize| !self.charset_range.contains(code) || count[code] > 1;
        let mut stale: Vec<TileId> = self
            .assigned_tiles
            .iter()
            .filter(|(_, a)| a.run().any(&broken))
            .map(|(id, _)| id.clone())
            .collect();
        stale.sort();
        stale
    }

    pub fn vram_usage(&self) -> VramUsage {
        if !self.enabled {
            return VramUsage::default();
        }
        let chars = self.charset_range.len();
        VramUsage {
            pattern_bytes: chars * BYTES_PER_CHAR,
            color_bytes: chars * BYTES_PER_CHAR,
            chars_used: self.assigned_tiles.values().map(|a| a.codes as usize).sum(),
        }
    }
}

/// When `overlay` is disabled, `base` absorbs the overlay's configured range
/// and screen zone; when it is enabled again the base shrinks back.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ReflowRule {
    pub base: BankId,
    pub overlay: BankId,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankLayout {
    #[serde(flatten)]
    pub charset_range: CharsetRange,
    pub screen_zone: ScreenZone,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TileBankConfig {
    pub banks: Vec<TileBank>,
    // Configured layout of each bank, the reference point for reflow.
    pub layouts: HashMap<BankId, BankLayout>,
    pub rules: Vec<ReflowRule>,
}

fn stock_bank(
    id: &str,
    name: &str,
    range: (CharCode, CharCode),
    vram: (u16, u16),
    zone: ScreenZone,
    colors: (PaletteIdx, PaletteIdx),
) -> TileBank {
    TileBank {
        id: id.to_string(),
        name: name.to_string(),
        enabled: true,
        locked: false,
        charset_range: CharsetRange::new(range.0, range.1),
        vram_pattern_start: vram.0,
        vram_color_start: vram.1,
        screen_zone: zone,
        default_fg_color_index: colors.0,
        default_bg_color_index: colors.1,
        assigned_tiles: HashMap::new(),
    }
}

pub const HUD_BANK: &str = "bank_hud";
pub const MAIN_BANK: &str = "bank_main_game";
pub const STATUS_BANK: &str = "bank_status_menu";

impl Default for TileBankConfig {
    fn default() -> Self {
        TileBankConfig::default_config()
    }
}

impl TileBankConfig {
    /// The three stock banks: HUD on top, main play area, status bar below.
    /// Main reclaims the space of whichever overlay is disabled.
    pub fn default_config() -> Self {
        let w = SCREEN_WIDTH_CHARS;
        let h = SCREEN_HEIGHT_CHARS;
        let banks = vec![
            stock_bank(
                HUD_BANK,
                "HUD Elements",
                (0, 31),
                (0x0000, 0x2000),
                ScreenZone::new(0, 0, w, 3),
                (15, 4),
            ),
            stock_bank(
                MAIN_BANK,
                "Main Game Area",
                (32, 191),
                (0x0100, 0x2100),
                ScreenZone::new(0, 3, w, h - 3 - 2),
                (2, 1),
            ),
            stock_bank(
                STATUS_BANK,
                "Status/Menu Area",
                (192, 255),
                (0x0600, 0x2600),
                ScreenZone::new(0, h - 2, w, 2),
                (11, 6),
            ),
        ];
        let rules = [HUD_BANK, STATUS_BANK]
            .iter()
            .map(|overlay| ReflowRule {
                base: MAIN_BANK.to_string(),
                overlay: overlay.to_string(),
            })
            .collect();
        TileBankConfig::new(banks, rules)
    }

    /// Captures the current range and zone of every bank as its configured
    /// layout.
    pub fn new(banks: Vec<TileBank>, rules: Vec<ReflowRule>) -> Self {
        let layouts = banks
            .iter()
            .map(|b| {
                (
                    b.id.clone(),
                    BankLayout {
                        charset_range: b.charset_range,
                        screen_zone: b.screen_zone,
                    },
                )
            })
            .collect();
        TileBankConfig {
            banks,
            layouts,
            rules,
        }
    }

    pub fn bank(&self, id: &str) -> Option<&TileBank> {
        self.banks.iter().find(|b| b.id == id)
    }

    pub fn bank_mut(&mut self, id: &str) -> Option<&mut TileBank> {
        self.banks.iter_mut().find(|b| b.id == id)
    }

    fn bank_or_err(&mut self, id: &str) -> Result<&mut TileBank, AllocationError> {
        self.bank_mut(id)
            .ok_or_else(|| AllocationError::UnknownBank(id.to_string()))
    }

    pub fn assign(
        &mut self,
        bank_id: &str,
        tile: &Tile,
        tiles: &[Tile],
    ) -> Result<CharCode, AllocationError> {
        self.bank_or_err(bank_id)?.assign(tile, tiles)
    }

    pub fn unassign(&mut self, bank_id: &str, tile_id: &str) -> Result<Option<Assignment>, AllocationError> {
        self.bank_or_err(bank_id)?.unassign(tile_id)
    }

    pub fn refresh_runs(&mut self, tiles: &[Tile]) {
        for bank in &mut self.banks {
            bank.refresh_runs(tiles);
        }
    }

    /// Bank and assignment holding `tile_id`, first bank wins.
    pub fn assignment_for(&self, tile_id: &str) -> Option<(&TileBank, &Assignment)> {
        self.banks
            .iter()
            .find_map(|b| b.assigned_tiles.get(tile_id).map(|a| (b, a)))
    }

    /// Drops `tile_id` from every bank, locked or not, since the tile itself
    /// is gone. Returns how many assignments went away.
    pub fn remove_tile_everywhere(&mut self, tile_id: &str) -> usize {
        self.banks
            .iter_mut()
            .filter_map(|b| b.assigned_tiles.remove(tile_id))
            .count()
    }

    pub fn set_enabled(&mut self, bank_id: &str, enabled: bool) -> Result<(), AllocationError> {
        let bank = self.bank_or_err(bank_id)?;
        if bank.locked {
            return Err(AllocationError::BankLocked(bank_id.to_string()));
        }
        bank.enabled = enabled;
        self.reflow_on_toggle(bank_id);
        Ok(())
    }

    pub fn set_locked(&mut self, bank_id: &str, locked: bool) -> Result<(), AllocationError> {
        self.bank_or_err(bank_id)?.locked = locked;
        Ok(())
    }

    /// Reconfigures a bank's own range. The new range becomes its configured
    /// layout, so later reflows start from it. Base banks of a reflow rule
    /// only change through their overlays.
    pub fn update_range(
        &mut self,
        bank_id: &str,
        start: CharCode,
        end: CharCode,
    ) -> Result<(), AllocationError> {
        if self.rules.iter().any(|r| r.base == bank_id) {
            return Err(AllocationError::RangeManagedByReflow(bank_id.to_string()));
        }
        let bank = self.bank_or_err(bank_id)?;
        bank.update_range(start, end)?;
        let layout = BankLayout {
            charset_range: bank.charset_range,
            screen_zone: bank.screen_zone,
        };
        self.layouts
            .entry(bank_id.to_string())
            .or_insert(layout)
            .charset_range = layout.charset_range;
        self.reflow_on_toggle(bank_id);
        Ok(())
    }

    /// Recomputes the range and zone of every base bank that has a rule for
    /// `toggled`: the base's configured layout united with the layouts of its
    /// currently disabled overlays. Assignments are left untouched.
    pub fn reflow_on_toggle(&mut self, toggled: &str) {
        let bases: Vec<BankId> = self
            .rules
            .iter()
            .filter(|r| r.overlay == toggled)
            .map(|r| r.base.clone())
            .collect();
        for base in bases {
            let Some(mut layout) = self.layouts.get(&base).copied() else {
                continue;
            };
            for rule in self.rules.iter().filter(|r| r.base == base) {
                let disabled = self.bank(&rule.overlay).is_some_and(|b| !b.enabled);
                if let (true, Some(overlay)) = (disabled, self.layouts.get(&rule.overlay)) {
                    layout.charset_range = layout.charset_range.union(&overlay.charset_range);
                    layout.screen_zone = layout.screen_zone.union(&overlay.screen_zone);
                }
            }
            if let Some(bank) = self.bank_mut(&base) {
                bank.charset_range = layout.charset_range;
                bank.screen_zone = layout.screen_zone;
                info!(
                    "Bank {} now spans codes [{}-{}]",
                    bank.id, bank.charset_range.start, bank.charset_range.end
                );
            }
        }
    }
}
