use crate::grid::CellState::{Alive, Dead};
use rand::Rng;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellState {
    Dead,
    Alive,
}

/// A `width x height` cell field stored in one contiguous buffer,
/// indexed `y * width + x`.
#[derive(Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl Grid {
    /// Allocate a grid with every cell dead.
    ///
    /// Stepping is supported for `width, height >= 3`; on shorter sides the
    /// wrap-around neighbor lookup visits the same cell more than once.
    pub fn new(width: usize, height: usize) -> Self {
        Grid {
            width,
            height,
            cells: vec![Dead; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> CellState {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, state: CellState) {
        self.cells[y * self.width + x] = state;
    }

    /// Set every cell alive with independent probability `rate` (in `[0, 1]`),
    /// drawing from the given generator.
    pub fn populate<R: Rng>(&mut self, rate: f64, rng: &mut R) {
        for cell in &mut self.cells {
            *cell = if rng.random_bool(rate) { Alive } else { Dead };
        }
    }

    /// [`populate`](Self::populate) with the thread-local generator.
    pub fn randomize(&mut self, rate: f64) {
        self.populate(rate, &mut rand::rng());
    }

    /// Advance the grid by one step (Game of Life logic)
    pub fn advance(&mut self) -> bool {
        // Next generation goes into a scratch buffer so every neighbor count
        // reads the previous generation.
        let mut next = vec![Dead; self.cells.len()];

        for y in 0..self.height {
            for x in 0..self.width {
                let alive_neighbors = self.alive_neighbors(x, y);
                let is_alive = self.cells[y * self.width + x];

                // Apply Game of Life rules
                next[y * self.width + x] = match (is_alive, alive_neighbors) {
                    (Alive, 2..=3) => Alive, // Survives
                    (Dead, 3) => Alive,      // Becomes alive
                    _ => Dead,               // Dies or remains dead
                };
            }
        }

        if self.cells == next {
            return false;
        }
        self.cells = next;
        true
    }

    /// Count the number of alive neighbors for a cell, wrapping at the edges
    pub fn alive_neighbors(&self, x: usize, y: usize) -> usize {
        let mut count = 0;

        for dy in [-1, 0, 1].iter() {
            for dx in [-1, 0, 1].iter() {
                if *dx == 0 && *dy == 0 {
                    // Skip the current cell
                    continue;
                }

                let neighbor_x = (x as isize + dx).rem_euclid(self.width as isize) as usize;
                let neighbor_y = (y as isize + dy).rem_euclid(self.height as isize) as usize;

                if self.cells[neighbor_y * self.width + neighbor_x] == Alive {
                    count += 1;
                }
            }
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::CellState::{Alive, Dead};
    use super::Grid;
    use crate::patterns;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn neighbor_count_stays_in_range() {
        let mut grid = Grid::new(16, 16);
        grid.populate(0.6, &mut ChaCha8Rng::seed_from_u64(42));
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                assert!(grid.alive_neighbors(x, y) <= 8);
            }
        }
    }

    #[test]
    fn corner_neighbors_wrap_to_opposite_edges() {
        let (w, h) = (7, 5);
        for (x, y) in [(w - 1, h - 1), (w - 1, 0), (0, h - 1)] {
            let mut grid = Grid::new(w, h);
            grid.set(x, y, Alive);
            assert_eq!(grid.alive_neighbors(0, 0), 1, "({x},{y}) not counted");
        }
    }

    #[test]
    fn advance_is_deterministic() {
        let mut a = Grid::new(20, 20);
        a.populate(0.5, &mut ChaCha8Rng::seed_from_u64(7));
        let mut b = a.clone();

        a.advance();
        b.advance();
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn block_is_a_still_life() {
        let mut grid = Grid::new(6, 6);
        patterns::stamp(&mut grid, &patterns::BLOCK, (2, 2));

        let before = grid.cells.clone();
        let changed = grid.advance();
        assert!(!changed);
        assert_eq!(grid.cells, before);
    }

    #[test]
    fn glider_translates_by_one_after_four_steps() {
        let mut grid = Grid::new(9, 9);
        patterns::stamp(&mut grid, &patterns::GLIDER, (1, 1));

        for _ in 0..4 {
            grid.advance();
        }

        let mut expected = Grid::new(9, 9);
        patterns::stamp(&mut expected, &patterns::GLIDER, (2, 2));
        assert_eq!(grid.cells, expected.cells);
    }

    #[test]
    fn population_rate_boundaries() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut grid = Grid::new(10, 8);

        grid.populate(0.0, &mut rng);
        assert!(grid.cells.iter().all(|cell| *cell == Dead));

        grid.populate(1.0, &mut rng);
        assert!(grid.cells.iter().all(|cell| *cell == Alive));
    }

    #[test]
    fn allocation_across_sizes() {
        for (w, h) in [(1, 1), (3, 3), (64, 64), (640, 360)] {
            let mut grid = Grid::new(w, h);
            assert_eq!(grid.width(), w);
            assert_eq!(grid.height(), h);
            assert_eq!(grid.get(w - 1, h - 1), Dead);
            grid.set(w - 1, h - 1, Alive);
            assert_eq!(grid.get(w - 1, h - 1), Alive);
        }
    }
}
