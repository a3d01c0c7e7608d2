// Tile pixel/attribute storage. In constrained (SCREEN 2) mode each 8-pixel
// segment of a row carries one fg/bg pair, and every pixel of the segment must
// be one of those two colors. All mutations below leave that rule satisfied.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    common::{Color, Point, TileId, CHAR_SIZE, SEGMENT_WIDTH},
    palette,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    #[error("coordinates ({x}, {y}) out of bounds for {width}x{height} tile")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("invalid tile dimensions {width}x{height}")]
    InvalidDimension { width: usize, height: usize },
    #[error("tile has no line color attributes")]
    MissingAttributes,
    #[error("segment {segment} of row {row} does not exist")]
    SegmentOutOfRange { row: usize, segment: usize },
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct LineAttribute {
    pub fg: Color,
    pub bg: Color,
}

impl LineAttribute {
    pub fn new(fg: Color, bg: Color) -> Self {
        LineAttribute { fg, bg }
    }

    pub fn allows(&self, c: &Color) -> bool {
        *c == self.fg || *c == self.bg
    }

    // Color a pixel takes when the pair changes from `self` to `new`.
    fn remap(&self, c: &Color, new: &LineAttribute) -> Color {
        if *c == self.fg {
            new.fg.clone()
        } else if *c == self.bg {
            new.bg.clone()
        } else {
            new.fg.clone()
        }
    }
}

impl Default for LineAttribute {
    fn default() -> Self {
        LineAttribute {
            fg: palette::default_fg(),
            bg: palette::default_bg(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Solidity {
    NoSolid = 0,
    Solid = 1,
    Platform = 2,
    Slope = 3,
}

impl Solidity {
    pub fn from_family(family: u8) -> Option<Self> {
        match family {
            0 => Some(Solidity::NoSolid),
            1 => Some(Solidity::Solid),
            2 => Some(Solidity::Platform),
            3 => Some(Solidity::Slope),
            _ => None,
        }
    }

    pub fn is_solid(self) -> bool {
        self != Solidity::NoSolid
    }

    pub fn name(self) -> &'static str {
        match self {
            Solidity::NoSolid => "NoSolid (Passable)",
            Solidity::Solid => "Solid (Wall/Ground)",
            Solidity::Platform => "Platform (Top-Solid)",
            Solidity::Slope => "Slope (Solid)",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PropertyFlag {
    Breakable = 0,
    Movable = 1,
    Damaging = 2,
    Switch = 3,
}

/// Gameplay metadata packed into one byte: high nibble is the solidity
/// family, low nibble the property flags. Not interpreted by the editor core.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalProperties(pub u8);

impl LogicalProperties {
    pub fn new(family: u8, flags: u8) -> Self {
        LogicalProperties((family & 0x0F) << 4 | (flags & 0x0F))
    }

    pub fn family(self) -> u8 {
        self.0 >> 4
    }

    pub fn flags(self) -> u8 {
        self.0 & 0x0F
    }

    pub fn solidity(self) -> Option<Solidity> {
        Solidity::from_family(self.family())
    }

    pub fn has_flag(self, flag: PropertyFlag) -> bool {
        self.flags() & (1 << flag as u8) != 0
    }

    pub fn with_family(self, family: u8) -> Self {
        LogicalProperties::new(family, self.flags())
    }

    pub fn with_flag(self, flag: PropertyFlag, on: bool) -> Self {
        let bit = 1 << flag as u8;
        let flags = if on {
            self.flags() | bit
        } else {
            self.flags() & !bit
        };
        LogicalProperties::new(self.family(), flags)
    }
}

pub type PixelGrid = Vec<Vec<Color>>;
pub type AttributeGrid = Vec<Vec<LineAttribute>>;

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub name: String,
    width: usize,
    height: usize,
    #[serde(rename = "data")]
    pixels: PixelGrid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line_attributes: Option<AttributeGrid>,
    #[serde(default)]
    pub logical_properties: LogicalProperties,
}

/// Rounds a requested width down to the nearest multiple of the segment
/// width (minimum one segment). Hosts apply this before `resize` in
/// constrained mode.
pub fn normalized_width(width: usize) -> usize {
    (width / SEGMENT_WIDTH).max(1) * SEGMENT_WIDTH
}

fn check_constrained_dims(width: usize, height: usize) -> Result<(), TileError> {
    if width == 0 || height == 0 || width % SEGMENT_WIDTH != 0 {
        return Err(TileError::InvalidDimension { width, height });
    }
    Ok(())
}

impl Tile {
    pub fn new_constrained(
        id: &str,
        name: &str,
        width: usize,
        height: usize,
        attr: LineAttribute,
    ) -> Result<Self, TileError> {
        check_constrained_dims(width, height)?;
        let segments = width / SEGMENT_WIDTH;
        Ok(Tile {
            id: id.to_string(),
            name: name.to_string(),
            width,
            height,
            pixels: vec![vec![attr.fg.clone(); width]; height],
            line_attributes: Some(vec![vec![attr; segments]; height]),
            logical_properties: LogicalProperties::default(),
        })
    }

    pub fn new_unconstrained(
        id: &str,
        name: &str,
        width: usize,
        height: usize,
        color: Color,
    ) -> Result<Self, TileError> {
        if width == 0 || height == 0 {
            return Err(TileError::InvalidDimension { width, height });
        }
        Ok(Tile {
            id: id.to_string(),
            name: name.to_string(),
            width,
            height,
            pixels: vec![vec![color; width]; height],
            line_attributes: None,
            logical_properties: LogicalProperties::default(),
        })
    }

    /// Builds a tile from externally supplied grids. The grids must match the
    /// dimensions; any pixel violating its segment's pair is snapped to fg.
    pub fn from_parts(
        id: &str,
        name: &str,
        pixels: PixelGrid,
        line_attributes: Option<AttributeGrid>,
        logical_properties: LogicalProperties,
    ) -> Result<Self, TileError> {
        let height = pixels.len();
        let width = pixels.first().map_or(0, |r| r.len());
        if width == 0 || pixels.iter().any(|r| r.len() != width) {
            return Err(TileError::InvalidDimension { width, height });
        }
        if let Some(attrs) = &line_attributes {
            check_constrained_dims(width, height)?;
            let segments = width / SEGMENT_WIDTH;
            if attrs.len() != height || attrs.iter().any(|r| r.len() != segments) {
                return Err(TileError::MissingAttributes);
            }
        }
        let mut tile = Tile {
            id: id.to_string(),
            name: name.to_string(),
            width,
            height,
            pixels,
            line_attributes,
            logical_properties,
        };
        tile.repair();
        Ok(tile)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_constrained(&self) -> bool {
        self.line_attributes.is_some()
    }

    pub fn segments_per_row(&self) -> usize {
        self.width.div_ceil(SEGMENT_WIDTH)
    }

    pub fn pixels(&self) -> &PixelGrid {
        &self.pixels
    }

    pub fn attributes(&self) -> Option<&AttributeGrid> {
        self.line_attributes.as_ref()
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x < self.width && p.y < self.height
    }

    fn check_bounds(&self, x: usize, y: usize) -> Result<(), TileError> {
        if x < self.width && y < self.height {
            Ok(())
        } else {
            Err(TileError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> Result<&Color, TileError> {
        self.check_bounds(x, y)?;
        Ok(&self.pixels[y][x])
    }

    pub fn attribute(&self, row: usize, segment: usize) -> Option<&LineAttribute> {
        self.line_attributes.as_ref()?.get(row)?.get(segment)
    }

    /// Attribute pair governing pixel `p`, if the tile is constrained.
    pub fn attribute_at(&self, p: Point) -> Option<&LineAttribute> {
        self.attribute(p.y, p.x / SEGMENT_WIDTH)
    }

    /// Writes a pixel. In constrained mode a color outside the segment's pair
    /// cannot be stored and is snapped to the segment fg. Returns whether the
    /// stored color changed.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) -> Result<bool, TileError> {
        self.check_bounds(x, y)?;
        let color = match self.attribute(y, x / SEGMENT_WIDTH) {
            Some(attr) if !attr.allows(&color) => attr.fg.clone(),
            _ => color,
        };
        if self.pixels[y][x] == color {
            return Ok(false);
        }
        self.pixels[y][x] = color;
        Ok(true)
    }

    pub fn set_segment_attribute(
        &mut self,
        row: usize,
        segment: usize,
        new_attr: LineAttribute,
    ) -> Result<(), TileError> {
        let width = self.width;
        let attrs = self
            .line_attributes
            .as_mut()
            .ok_or(TileError::MissingAttributes)?;
        let old_attr = attrs
            .get_mut(row)
            .and_then(|r| r.get_mut(segment))
            .ok_or(TileError::SegmentOutOfRange { row, segment })?;
        let old = std::mem::replace(old_attr, new_attr.clone());
        let start = segment * SEGMENT_WIDTH;
        let end = (start + SEGMENT_WIDTH).min(width);
        for px in &mut self.pixels[row][start..end] {
            *px = old.remap(px, &new_attr);
        }
        Ok(())
    }

    /// Resizes both grids, keeping the top-left region. New attribute cells
    /// copy the origin cell's pair; new pixels take their segment's fg (or
    /// `fill` for unconstrained tiles).
    pub fn resize(&mut self, width: usize, height: usize, fill: &Color) -> Result<(), TileError> {
        if self.is_constrained() {
            check_constrained_dims(width, height)?;
        } else if width == 0 || height == 0 {
            return Err(TileError::InvalidDimension { width, height });
        }
        if width == self.width && height == self.height {
            return Ok(());
        }

        if let Some(attrs) = &self.line_attributes {
            let default_attr = attrs
                .first()
                .and_then(|r| r.first())
                .cloned()
                .unwrap_or_default();
            let segments = width / SEGMENT_WIDTH;
            let new_attrs: AttributeGrid = (0..height)
                .map(|y| {
                    (0..segments)
                        .map(|s| {
                            attrs
                                .get(y)
                                .and_then(|r| r.get(s))
                                .cloned()
                                .unwrap_or_else(|| default_attr.clone())
                        })
                        .collect()
                })
                .collect();
            let new_pixels: PixelGrid = (0..height)
                .map(|y| {
                    (0..width)
                        .map(|x| match self.pixels.get(y).and_then(|r| r.get(x)) {
                            Some(c) => c.clone(),
                            _ => new_attrs[y][x / SEGMENT_WIDTH].fg.clone(),
                        })
                        .collect()
                })
                .collect();
            self.line_attributes = Some(new_attrs);
            self.pixels = new_pixels;
        } else {
            let new_pixels: PixelGrid = (0..height)
                .map(|y| {
                    (0..width)
                        .map(|x| {
                            self.pixels
                                .get(y)
                                .and_then(|r| r.get(x))
                                .cloned()
                                .unwrap_or_else(|| fill.clone())
                        })
                        .collect()
                })
                .collect();
            self.pixels = new_pixels;
        }
        self.width = width;
        self.height = height;
        self.repair();
        Ok(())
    }

    pub fn fill_all_foregrounds(&mut self, color: &Color) -> Result<(), TileError> {
        self.fill_all(color, true)
    }

    pub fn fill_all_backgrounds(&mut self, color: &Color) -> Result<(), TileError> {
        self.fill_all(color, false)
    }

    fn fill_all(&mut self, color: &Color, foreground: bool) -> Result<(), TileError> {
        let width = self.width;
        let attrs = self
            .line_attributes
            .as_mut()
            .ok_or(TileError::MissingAttributes)?;
        for (y, row) in attrs.iter_mut().enumerate() {
            for (s, attr) in row.iter_mut().enumerate() {
                let old = attr.clone();
                if foreground {
                    attr.fg = color.clone();
                } else {
                    attr.bg = color.clone();
                }
                if old == *attr {
                    continue;
                }
                let start = s * SEGMENT_WIDTH;
                let end = (start + SEGMENT_WIDTH).min(width);
                for px in &mut self.pixels[y][start..end] {
                    *px = old.remap(px, attr);
                }
            }
        }
        Ok(())
    }

    /// Resets every pixel: segment fg in constrained mode, `fill` otherwise.
    pub fn clear(&mut self, fill: &Color) {
        for y in 0..self.height {
            for x in 0..self.width {
                self.pixels[y][x] = match self.attribute(y, x / SEGMENT_WIDTH) {
                    Some(attr) => attr.fg.clone(),
                    None => fill.clone(),
                };
            }
        }
    }

    /// Snaps every pixel outside its segment's pair to the segment fg.
    /// Returns the number of pixels changed.
    pub fn repair(&mut self) -> usize {
        let Some(attrs) = &self.line_attributes else {
            return 0;
        };
        let mut fixed = 0;
        for (y, row) in self.pixels.iter_mut().enumerate() {
            for (x, px) in row.iter_mut().enumerate() {
                if let Some(attr) = attrs.get(y).and_then(|r| r.get(x / SEGMENT_WIDTH)) {
                    if !attr.allows(px) {
                        *px = attr.fg.clone();
                        fixed += 1;
                    }
                }
            }
        }
        fixed
    }

    /// First pixel that violates its segment's color pair, if any.
    pub fn check_invariant(&self) -> Option<Point> {
        let attrs = self.line_attributes.as_ref()?;
        for (y, row) in self.pixels.iter().enumerate() {
            for (x, px) in row.iter().enumerate() {
                match attrs.get(y).and_then(|r| r.get(x / SEGMENT_WIDTH)) {
                    Some(attr) if attr.allows(px) => {}
                    _ => return Some(Point::new(x, y)),
                }
            }
        }
        None
    }

    // Roll operations move pixel data only; attributes stay put.

    pub fn shift_up(&mut self) {
        if self.height >= 2 {
            self.pixels.rotate_left(1);
            self.repair();
        }
    }

    pub fn shift_down(&mut self) {
        if self.height >= 2 {
            self.pixels.rotate_right(1);
            self.repair();
        }
    }

    pub fn shift_left(&mut self) {
        if self.width >= 2 {
            for row in &mut self.pixels {
                row.rotate_left(1);
            }
            self.repair();
        }
    }

    pub fn shift_right(&mut self) {
        if self.width >= 2 {
            for row in &mut self.pixels {
                row.rotate_right(1);
            }
            self.repair();
        }
    }

    pub fn mirror_horizontal(&mut self) {
        for row in &mut self.pixels {
            row.reverse();
        }
        self.repair();
    }

    pub fn mirror_vertical(&mut self) {
        self.pixels.reverse();
        self.repair();
    }

    /// Splits the tile into 8x8 tiles, row-major. Each part copies its pixels
    /// and attribute segment; logical properties are reset.
    pub fn split_8x8(&self) -> Result<Vec<Tile>, TileError> {
        if self.width % CHAR_SIZE != 0 || self.height % CHAR_SIZE != 0 {
            return Err(TileError::InvalidDimension {
                width: self.width,
                height: self.height,
            });
        }
        let mut parts = vec![];
        for ty in 0..self.height / CHAR_SIZE {
            for tx in 0..self.width / CHAR_SIZE {
                let rows = ty * CHAR_SIZE..(ty + 1) * CHAR_SIZE;
                let pixels: PixelGrid = rows
                    .clone()
                    .map(|y| self.pixels[y][tx * CHAR_SIZE..(tx + 1) * CHAR_SIZE].to_vec())
                    .collect();
                let line_attributes = self
                    .line_attributes
                    .as_ref()
                    .map(|attrs| rows.map(|y| vec![attrs[y][tx].clone()]).collect());
                parts.push(Tile {
                    id: format!("{}_part_{}_{}", self.id, ty, tx),
                    name: format!("{}_part_{}_{}", self.name, ty, tx),
                    width: CHAR_SIZE,
                    height: CHAR_SIZE,
                    pixels,
                    line_attributes,
                    logical_properties: LogicalProperties::default(),
                });
            }
        }
        Ok(parts)
    }

    /// Copies the overlapping region of `source` onto this tile. In
    /// constrained mode the attributes are rebuilt from defaults plus the
    /// overlapping segments of `source`.
    pub fn paste_from(&mut self, source: &Tile) {
        let h = self.height.min(source.height);
        let w = self.width.min(source.width);
        for y in 0..h {
            self.pixels[y][..w].clone_from_slice(&source.pixels[y][..w]);
        }
        if self.line_attributes.is_some() {
            let segments = self.width / SEGMENT_WIDTH;
            let mut attrs = vec![vec![LineAttribute::default(); segments]; self.height];
            if let Some(src) = &source.line_attributes {
                let src_segments = source.width / SEGMENT_WIDTH;
                for y in 0..h {
                    for s in 0..segments.min(src_segments) {
                        attrs[y][s] = src[y][s].clone();
                    }
                }
            }
            self.line_attributes = Some(attrs);
            self.repair();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Color {
        Color::new(s)
    }

    fn red_black() -> LineAttribute {
        LineAttribute::new(c("#FC5554"), c("#000000"))
    }

    #[test]
    fn test_new_constrained_rejects_bad_width() {
        assert_eq!(
            Tile::new_constrained("t", "t", 12, 8, red_black()),
            Err(TileError::InvalidDimension {
                width: 12,
                height: 8
            })
        );
        assert!(Tile::new_constrained("t", "t", 16, 8, red_black()).is_ok());
    }

    #[test]
    fn test_set_pixel_out_of_bounds() {
        let mut t = Tile::new_constrained("t", "t", 8, 8, red_black()).unwrap();
        assert!(matches!(
            t.set_pixel(8, 0, c("#000000")),
            Err(TileError::OutOfBounds { x: 8, y: 0, .. })
        ));
        assert!(t.set_pixel(7, 7, c("#000000")).unwrap());
        assert!(!t.set_pixel(7, 7, c("#000000")).unwrap());
    }

    #[test]
    fn test_set_pixel_snaps_foreign_color() {
        let mut t = Tile::new_constrained("t", "t", 8, 8, red_black()).unwrap();
        t.set_pixel(1, 1, c("#000000")).unwrap();
        t.set_pixel(1, 1, c("#21C842")).unwrap();
        assert_eq!(t.pixel(1, 1).unwrap(), &c("#FC5554"));
        assert_eq!(t.check_invariant(), None);
    }

    #[test]
    fn test_segment_attribute_remaps_pixels() {
        let red = c("#FC5554");
        let blue = c("#5455ED");
        let mut t = Tile::new_constrained("t", "t", 8, 8, LineAttribute::new(red.clone(), red.clone()))
            .unwrap();
        t.set_segment_attribute(0, 0, LineAttribute::new(blue.clone(), red.clone()))
            .unwrap();
        for x in 0..8 {
            assert_eq!(t.pixel(x, 0).unwrap(), &blue);
            assert_eq!(t.pixel(x, 1).unwrap(), &red);
        }
        assert_eq!(t.check_invariant(), None);
    }

    #[test]
    fn test_segment_attribute_keeps_bg_identity() {
        let mut t = Tile::new_constrained("t", "t", 16, 1, red_black()).unwrap();
        t.set_pixel(3, 0, c("#000000")).unwrap();
        let new_attr = LineAttribute::new(c("#FFFFFF"), c("#5455ED"));
        t.set_segment_attribute(0, 0, new_attr).unwrap();
        assert_eq!(t.pixel(3, 0).unwrap(), &c("#5455ED"));
        assert_eq!(t.pixel(2, 0).unwrap(), &c("#FFFFFF"));
        // the other segment is untouched
        assert_eq!(t.pixel(8, 0).unwrap(), &c("#FC5554"));
    }

    #[test]
    fn test_segment_attribute_errors() {
        let mut t = Tile::new_constrained("t", "t", 8, 8, red_black()).unwrap();
        assert_eq!(
            t.set_segment_attribute(0, 1, red_black()),
            Err(TileError::SegmentOutOfRange { row: 0, segment: 1 })
        );
        let mut u = Tile::new_unconstrained("u", "u", 8, 8, c("#000000")).unwrap();
        assert_eq!(
            u.set_segment_attribute(0, 0, red_black()),
            Err(TileError::MissingAttributes)
        );
    }

    #[test]
    fn test_resize_grows_with_origin_attribute() {
        let mut t = Tile::new_constrained("t", "t", 8, 8, red_black()).unwrap();
        t.set_pixel(0, 0, c("#000000")).unwrap();
        t.resize(16, 16, &c("#FFFFFF")).unwrap();
        assert_eq!(t.width(), 16);
        assert_eq!(t.segments_per_row(), 2);
        assert_eq!(t.attribute(15, 1), Some(&red_black()));
        assert_eq!(t.pixel(0, 0).unwrap(), &c("#000000"));
        assert_eq!(t.pixel(15, 15).unwrap(), &c("#FC5554"));
        assert_eq!(t.check_invariant(), None);
    }

    #[test]
    fn test_resize_shrink_and_invalid() {
        let mut t = Tile::new_constrained("t", "t", 16, 16, red_black()).unwrap();
        assert_eq!(
            t.resize(10, 8, &c("#FFFFFF")),
            Err(TileError::InvalidDimension {
                width: 10,
                height: 8
            })
        );
        t.resize(8, 8, &c("#FFFFFF")).unwrap();
        assert_eq!(t.pixels().len(), 8);
        assert_eq!(t.attributes().unwrap()[0].len(), 1);
    }

    #[test]
    fn test_resize_unconstrained_uses_fill() {
        let mut t = Tile::new_unconstrained("u", "u", 4, 4, c("#000000")).unwrap();
        t.resize(6, 5, &c("#FFFFFF")).unwrap();
        assert_eq!(t.pixel(5, 4).unwrap(), &c("#FFFFFF"));
        assert_eq!(t.pixel(3, 3).unwrap(), &c("#000000"));
    }

    #[test]
    fn test_fill_all_foregrounds_remaps() {
        let mut t = Tile::new_constrained("t", "t", 16, 2, red_black()).unwrap();
        t.set_pixel(0, 0, c("#000000")).unwrap();
        t.fill_all_foregrounds(&c("#FFFFFF")).unwrap();
        assert_eq!(t.pixel(0, 0).unwrap(), &c("#000000"));
        assert_eq!(t.pixel(1, 0).unwrap(), &c("#FFFFFF"));
        assert_eq!(t.attribute(1, 1).unwrap().fg, c("#FFFFFF"));
        t.fill_all_backgrounds(&c("#5455ED")).unwrap();
        assert_eq!(t.pixel(0, 0).unwrap(), &c("#5455ED"));
        assert_eq!(t.check_invariant(), None);
    }

    #[test]
    fn test_roll_and_mirror_repair() {
        let mut t = Tile::new_constrained("t", "t", 16, 8, red_black()).unwrap();
        t.set_segment_attribute(0, 1, LineAttribute::new(c("#FFFFFF"), c("#000000")))
            .unwrap();
        // row 0: red in segment 0, white in segment 1; rolling left moves a
        // red pixel into segment 1 where it is no longer allowed
        t.shift_left();
        assert_eq!(t.pixel(15, 0).unwrap(), &c("#FFFFFF"));
        assert_eq!(t.check_invariant(), None);
        t.mirror_horizontal();
        t.shift_down();
        t.mirror_vertical();
        assert_eq!(t.check_invariant(), None);
    }

    #[test]
    fn test_split_8x8() {
        let mut t = Tile::new_constrained("big", "Big", 16, 16, red_black()).unwrap();
        t.set_pixel(9, 8, c("#000000")).unwrap();
        let parts = t.split_8x8().unwrap();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[3].name, "Big_part_1_1");
        assert_eq!(parts[3].pixel(1, 0).unwrap(), &c("#000000"));
        assert_eq!(parts[0].attributes().unwrap().len(), 8);

        let odd = Tile::new_unconstrained("o", "o", 12, 8, c("#000000")).unwrap();
        assert!(odd.split_8x8().is_err());
    }

    #[test]
    fn test_paste_from_copies_overlap() {
        let mut src = Tile::new_constrained("s", "s", 8, 8, red_black()).unwrap();
        src.set_pixel(2, 2, c("#000000")).unwrap();
        let mut dst = Tile::new_constrained("d", "d", 16, 8, LineAttribute::default()).unwrap();
        dst.paste_from(&src);
        assert_eq!(dst.pixel(2, 2).unwrap(), &c("#000000"));
        assert_eq!(dst.attribute(0, 0), Some(&red_black()));
        assert_eq!(dst.attribute(0, 1), Some(&LineAttribute::default()));
        assert_eq!(dst.check_invariant(), None);
    }

    #[test]
    fn test_from_parts_repairs() {
        let pixels = vec![vec![c("#21C842"); 8]; 2];
        let attrs = vec![vec![red_black()]; 2];
        let t = Tile::from_parts("x", "x", pixels, Some(attrs), LogicalProperties(0x31)).unwrap();
        assert_eq!(t.pixel(0, 0).unwrap(), &c("#FC5554"));
        assert_eq!(t.logical_properties.family(), 3);
    }

    #[test]
    fn test_logical_properties_packing() {
        let p = LogicalProperties::new(1, 0)
            .with_flag(PropertyFlag::Breakable, true)
            .with_flag(PropertyFlag::Switch, true);
        assert_eq!(p.0, 0x19);
        assert!(p.has_flag(PropertyFlag::Switch));
        assert!(!p.has_flag(PropertyFlag::Movable));
        assert_eq!(p.solidity(), Some(Solidity::Solid));
        assert!(p.solidity().unwrap().is_solid());
        let p = p.with_family(2).with_flag(PropertyFlag::Breakable, false);
        assert_eq!(p.0, 0x28);
        assert_eq!(LogicalProperties(0xF0).solidity(), None);
    }

    #[test]
    fn test_normalized_width() {
        assert_eq!(normalized_width(3), 8);
        assert_eq!(normalized_width(20), 16);
        assert_eq!(normalized_width(24), 24);
    }

    #[test]
    fn test_json_round_trip() {
        let mut t = Tile::new_constrained("t1", "Wall", 8, 8, red_black()).unwrap();
        t.logical_properties = LogicalProperties(0x15);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"lineAttributes\""));
        assert!(json.contains("\"logicalProperties\":21"));
        let back: Tile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_invariant_holds_through_mixed_edits() {
        use crate::{
            common::Point,
            draw::{apply_tool, Brush, DrawingTool},
            symmetry::SymmetrySettings,
        };
        let green = c("#21C842");
        let blue = c("#5455ED");
        let white = c("#FFFFFF");
        let mut t = Tile::new_constrained("t", "t", 16, 16, red_black()).unwrap();
        let mut steps = 0;
        let mut check = |t: &Tile, step: &str| {
            steps += 1;
            assert_eq!(t.check_invariant(), None, "after {}", step);
        };

        t.set_pixel(3, 3, c("#000000")).unwrap();
        t.set_pixel(4, 3, green.clone()).unwrap();
        t.set_pixel(5, 3, c("#fc5554")).unwrap();
        check(&t, "set_pixel");
        t.set_segment_attribute(3, 0, LineAttribute::new(green.clone(), blue.clone()))
            .unwrap();
        t.set_segment_attribute(7, 1, LineAttribute::new(white.clone(), green.clone()))
            .unwrap();
        check(&t, "set_segment_attribute");
        t.set_pixel(2, 3, white.clone()).unwrap();
        t.set_pixel(9, 7, green.clone()).unwrap();
        check(&t, "set_pixel after remap");

        let sym = SymmetrySettings {
            horizontal: true,
            vertical: true,
            ..Default::default()
        };
        let brush = Brush::default();
        apply_tool(&mut t, DrawingTool::Pencil, Point::new(1, 2), true, &sym, &brush).unwrap();
        apply_tool(&mut t, DrawingTool::Dither { diameter: 5 }, Point::new(8, 8), false, &sym, &brush)
            .unwrap();
        apply_tool(&mut t, DrawingTool::FloodFill, Point::new(0, 0), true, &sym, &brush).unwrap();
        check(&t, "drawing tools");

        t.resize(24, 8, &white).unwrap();
        check(&t, "resize grow width");
        t.set_pixel(20, 5, blue.clone()).unwrap();
        t.resize(8, 24, &white).unwrap();
        check(&t, "resize shrink width");
        t.fill_all_foregrounds(&blue).unwrap();
        check(&t, "fill_all_foregrounds");
        t.fill_all_backgrounds(&green).unwrap();
        check(&t, "fill_all_backgrounds");

        t.resize(16, 16, &white).unwrap();
        t.set_segment_attribute(0, 1, LineAttribute::new(white.clone(), c("#000000")))
            .unwrap();
        t.set_pixel(12, 0, c("#000000")).unwrap();
        t.shift_right();
        check(&t, "shift_right");
        t.shift_down();
        check(&t, "shift_down");
        t.shift_left();
        t.shift_up();
        check(&t, "shift back");
        t.mirror_horizontal();
        check(&t, "mirror_horizontal");
        t.mirror_vertical();
        check(&t, "mirror_vertical");

        let mut src = Tile::new_constrained("s", "s", 24, 8, red_black()).unwrap();
        src.set_pixel(1, 1, c("#000000")).unwrap();
        t.paste_from(&src);
        check(&t, "paste_from");
        for part in t.split_8x8().unwrap() {
            check(&part, "split_8x8");
        }
        t.clear(&white);
        check(&t, "clear");
        assert!(steps > 15);
    }
}
