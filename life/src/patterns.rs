use crate::grid::{CellState::Alive, Grid};

/// A named set of live-cell `(x, y)` offsets, anchored at the upper left.
pub struct Pattern {
    pub name: &'static str,
    pub cells: &'static [(usize, usize)],
}

pub const GLIDER: Pattern = Pattern {
    name: "Glider",
    cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
};

pub const BLOCK: Pattern = Pattern {
    name: "Block",
    cells: &[(0, 0), (1, 0), (0, 1), (1, 1)],
};

pub const BLINKER: Pattern = Pattern {
    name: "Blinker",
    cells: &[(0, 0), (1, 0), (2, 0)],
};

/// Write a pattern onto the grid, wrapping offsets that run past the edges.
pub fn stamp(grid: &mut Grid, pattern: &Pattern, origin: (usize, usize)) {
    for &(dx, dy) in pattern.cells {
        let x = (origin.0 + dx) % grid.width();
        let y = (origin.1 + dy) % grid.height();
        grid.set(x, y, Alive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_places_exactly_the_pattern_cells() {
        let mut grid = Grid::new(8, 8);
        stamp(&mut grid, &GLIDER, (3, 3));

        let alive = (0..grid.height())
            .flat_map(|y| (0..grid.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| grid.get(x, y) == Alive)
            .count();
        assert_eq!(alive, GLIDER.cells.len());

        for &(dx, dy) in GLIDER.cells {
            assert_eq!(grid.get(3 + dx, 3 + dy), Alive);
        }
    }

    #[test]
    fn stamp_wraps_at_the_edges() {
        let mut grid = Grid::new(4, 4);
        stamp(&mut grid, &BLOCK, (3, 3));

        for (x, y) in [(3, 3), (0, 3), (3, 0), (0, 0)] {
            assert_eq!(grid.get(x, y), Alive);
        }
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let mut grid = Grid::new(5, 5);
        stamp(&mut grid, &BLINKER, (1, 2));

        grid.advance();
        for (x, y) in [(2, 1), (2, 2), (2, 3)] {
            assert_eq!(grid.get(x, y), Alive);
        }

        grid.advance();
        for (x, y) in [(1, 2), (2, 2), (3, 2)] {
            assert_eq!(grid.get(x, y), Alive);
        }
    }
}
