// Mirror/rotation expansion of a single edited point.
use hashbrown::HashSet;

use crate::common::Point;

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct SymmetrySettings {
    pub horizontal: bool,
    pub vertical: bool,
    pub diagonal_main: bool,
    pub diagonal_anti: bool,
    // Exactly the 4-fold H+V combination; overrides the independent flags.
    pub quad: bool,
}

impl SymmetrySettings {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.horizontal || self.vertical || self.diagonal_main || self.diagonal_anti || self.quad
    }
}

/// Returns every point that must be updated when `point` is edited on a
/// `width` x `height` tile. Reflections landing outside the tile (diagonals
/// on non-square tiles) are dropped.
pub fn expand(point: Point, width: usize, height: usize, settings: &SymmetrySettings) -> HashSet<Point> {
    let mut points: HashSet<Point> = HashSet::new();
    let (w, h) = (width as i64, height as i64);
    let add = |points: &mut HashSet<Point>, x: i64, y: i64| {
        if x >= 0 && x < w && y >= 0 && y < h {
            points.insert(Point::new(x as usize, y as usize));
        }
    };

    let (x, y) = (point.x as i64, point.y as i64);
    add(&mut points, x, y);

    if settings.quad {
        add(&mut points, w - 1 - x, y);
        add(&mut points, x, h - 1 - y);
        add(&mut points, w - 1 - x, h - 1 - y);
        return points;
    }

    let reflections: [(bool, fn(i64, i64, i64, i64) -> (i64, i64)); 4] = [
        (settings.horizontal, |x, y, w, _| (w - 1 - x, y)),
        (settings.vertical, |x, y, _, h| (x, h - 1 - y)),
        (settings.diagonal_main, |x, y, _, _| (y, x)),
        (settings.diagonal_anti, |x, y, w, h| (w - 1 - y, h - 1 - x)),
    ];
    for (enabled, reflect) in reflections {
        if !enabled {
            continue;
        }
        let current: Vec<Point> = points.iter().copied().collect();
        for p in current {
            let (rx, ry) = reflect(p.x as i64, p.y as i64, w, h);
            add(&mut points, rx, ry);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: &[(usize, usize)]) -> HashSet<Point> {
        points.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_no_symmetry() {
        let r = expand(Point::new(2, 3), 8, 8, &SymmetrySettings::none());
        assert_eq!(r, set(&[(2, 3)]));
    }

    #[test]
    fn test_horizontal_and_vertical() {
        let s = SymmetrySettings {
            horizontal: true,
            vertical: true,
            ..Default::default()
        };
        let r = expand(Point::new(1, 2), 8, 6, &s);
        assert_eq!(r, set(&[(1, 2), (6, 2), (1, 3), (6, 3)]));
    }

    #[test]
    fn test_quad_ignores_diagonals() {
        let s = SymmetrySettings {
            quad: true,
            diagonal_main: true,
            ..Default::default()
        };
        let r = expand(Point::new(1, 2), 8, 8, &s);
        assert_eq!(r, set(&[(1, 2), (6, 2), (1, 5), (6, 5)]));
    }

    #[test]
    fn test_full_dihedral() {
        let s = SymmetrySettings {
            horizontal: true,
            vertical: true,
            diagonal_main: true,
            ..Default::default()
        };
        let r = expand(Point::new(1, 2), 8, 8, &s);
        assert_eq!(r.len(), 8);
        assert!(r.contains(&Point::new(2, 1)));
        assert!(r.contains(&Point::new(5, 6)));
    }

    #[test]
    fn test_anti_diagonal() {
        let s = SymmetrySettings {
            diagonal_anti: true,
            ..Default::default()
        };
        let r = expand(Point::new(0, 1), 8, 8, &s);
        assert_eq!(r, set(&[(0, 1), (6, 7)]));
    }

    #[test]
    fn test_diagonal_discards_outside_points() {
        let s = SymmetrySettings {
            diagonal_main: true,
            ..Default::default()
        };
        let r = expand(Point::new(12, 1), 16, 8, &s);
        assert_eq!(r, set(&[(12, 1)]));
    }

    #[test]
    fn test_reexpansion_is_idempotent() {
        let configs = [
            SymmetrySettings { horizontal: true, ..Default::default() },
            SymmetrySettings { horizontal: true, vertical: true, ..Default::default() },
            SymmetrySettings { quad: true, ..Default::default() },
            SymmetrySettings {
                horizontal: true,
                vertical: true,
                diagonal_main: true,
                diagonal_anti: true,
                quad: false,
            },
        ];
        for s in configs {
            for y in 0..8 {
                for x in 0..8 {
                    let first = expand(Point::new(x, y), 8, 8, &s);
                    for p in &first {
                        assert_eq!(expand(*p, 8, 8, &s), first);
                    }
                }
            }
        }
    }
}
