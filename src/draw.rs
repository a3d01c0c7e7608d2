// Drawing tools operating on a tile through its invariant-preserving setters.
use std::collections::VecDeque;

use crate::{
    common::{Color, Point},
    palette,
    symmetry::{expand, SymmetrySettings},
    tile::{Tile, TileError},
};

pub const DITHER_DIAMETERS: [usize; 4] = [1, 3, 5, 7];

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DrawingTool {
    Pencil,
    FloodFill,
    Dither { diameter: usize },
}

impl DrawingTool {
    /// Dither tool with one of the supported brush sizes.
    pub fn dither(diameter: usize) -> Option<Self> {
        DITHER_DIAMETERS
            .contains(&diameter)
            .then_some(DrawingTool::Dither { diameter })
    }
}

/// Colors used on unconstrained tiles, where there is no per-segment pair.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Brush {
    pub primary: Color,
    pub secondary: Color,
}

impl Brush {
    pub fn new(primary: Color) -> Self {
        Brush {
            primary,
            secondary: palette::transparent(),
        }
    }
}

impl Default for Brush {
    fn default() -> Self {
        Brush::new(palette::default_fg())
    }
}

fn resolve_color(tile: &Tile, p: Point, use_background: bool, brush: &Brush) -> Color {
    match tile.attribute_at(p) {
        Some(attr) if use_background => attr.bg.clone(),
        Some(attr) => attr.fg.clone(),
        None if use_background => brush.secondary.clone(),
        None => brush.primary.clone(),
    }
}

fn check_point(tile: &Tile, p: Point) -> Result<(), TileError> {
    tile.pixel(p.x, p.y).map(|_| ())
}

/// Pencil: writes the resolved fg (or bg) at every symmetric image of `point`.
pub fn paint_point(
    tile: &mut Tile,
    point: Point,
    use_background: bool,
    symmetry: &SymmetrySettings,
    brush: &Brush,
) -> Result<bool, TileError> {
    check_point(tile, point)?;
    let mut changed = false;
    for p in expand(point, tile.width(), tile.height(), symmetry) {
        let color = resolve_color(tile, p, use_background, brush);
        changed |= tile.set_pixel(p.x, p.y, color)?;
    }
    Ok(changed)
}

/// 4-connected fill from a single seed. The fill color is resolved per
/// pixel, so a fill crossing segments paints each segment's own fg (or bg).
/// No symmetry expansion is applied.
pub fn flood_fill(
    tile: &mut Tile,
    start: Point,
    use_background: bool,
    brush: &Brush,
) -> Result<bool, TileError> {
    let target = tile.pixel(start.x, start.y)?.clone();
    let seed_color = resolve_color(tile, start, use_background, brush);
    if target == seed_color {
        return Ok(false);
    }

    let (w, h) = (tile.width(), tile.height());
    let mut visited = vec![vec![false; w]; h];
    let mut queue = VecDeque::new();
    visited[start.y][start.x] = true;
    tile.set_pixel(start.x, start.y, seed_color)?;
    queue.push_back(start);

    while let Some(p) = queue.pop_front() {
        let mut neighbors = Vec::with_capacity(4);
        if p.x + 1 < w {
            neighbors.push(Point::new(p.x + 1, p.y));
        }
        if p.x > 0 {
            neighbors.push(Point::new(p.x - 1, p.y));
        }
        if p.y + 1 < h {
            neighbors.push(Point::new(p.x, p.y + 1));
        }
        if p.y > 0 {
            neighbors.push(Point::new(p.x, p.y - 1));
        }
        for n in neighbors {
            if visited[n.y][n.x] || *tile.pixel(n.x, n.y)? != target {
                continue;
            }
            visited[n.y][n.x] = true;
            let color = resolve_color(tile, n, use_background, brush);
            tile.set_pixel(n.x, n.y, color)?;
            queue.push_back(n);
        }
    }
    Ok(true)
}

/// Stamps a square checkerboard of fg/bg centered at each symmetric image of
/// `center`. The phase follows brush-local coordinates, so it stays stable as
/// the brush moves. `use_background` swaps the phase.
pub fn dither_brush(
    tile: &mut Tile,
    center: Point,
    diameter: usize,
    use_background: bool,
    symmetry: &SymmetrySettings,
    brush: &Brush,
) -> Result<bool, TileError> {
    check_point(tile, center)?;
    let radius = (diameter / 2) as i64;
    let (w, h) = (tile.width() as i64, tile.height() as i64);
    let mut changed = false;
    for c in expand(center, tile.width(), tile.height(), symmetry) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (px, py) = (c.x as i64 + dx, c.y as i64 + dy);
                if px < 0 || px >= w || py < 0 || py >= h {
                    continue;
                }
                let p = Point::new(px as usize, py as usize);
                let (local_x, local_y) = (dx + radius, dy + radius);
                let on_phase = (local_x % 2 == local_y % 2) != use_background;
                let color = resolve_color(tile, p, !on_phase, brush);
                changed |= tile.set_pixel(p.x, p.y, color)?;
            }
        }
    }
    Ok(changed)
}

/// Dispatches one grid interaction to the selected tool.
pub fn apply_tool(
    tile: &mut Tile,
    tool: DrawingTool,
    point: Point,
    use_background: bool,
    symmetry: &SymmetrySettings,
    brush: &Brush,
) -> Result<bool, TileError> {
    match tool {
        DrawingTool::Pencil => paint_point(tile, point, use_background, symmetry, brush),
        DrawingTool::FloodFill => flood_fill(tile, point, use_background, brush),
        DrawingTool::Dither { diameter } => {
            dither_brush(tile, point, diameter, use_background, symmetry, brush)
        }
    }
}
