use tracing::trace;

/// Scratch matrix of transition weights, `rows x n`, reused across steps and
/// runs. Capacity grows by doubling and is never released.
#[derive(Debug, Clone)]
pub struct SimMemory {
    n: usize,
    rows: usize,
    cells: Vec<f64>,
}

impl SimMemory {
    pub fn new(n: usize, rows: usize) -> Self {
        Self {
            n,
            rows,
            cells: vec![0.0; rows * n],
        }
    }

    pub fn columns(&self) -> usize {
        self.n
    }

    pub fn capacity_rows(&self) -> usize {
        self.rows
    }

    pub fn ensure_rows(&mut self, rows: usize) {
        if rows <= self.rows {
            return;
        }
        let grown = (self.rows * 2).max(rows);
        trace!(from = self.rows, to = grown, "growing weight buffer");
        self.cells.resize(grown * self.n, 0.0);
        self.rows = grown;
    }

    /// Zeroed row-major view of the first `rows` rows.
    pub fn weights(&mut self, rows: usize) -> &mut [f64] {
        self.ensure_rows(rows);
        let view = &mut self.cells[..rows * self.n];
        view.fill(0.0);
        view
    }
}
