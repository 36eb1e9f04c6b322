//! Resizable 2-D grid with sparse storage.
//!
//! Cells live in an `FxHashMap` keyed by `(x, y)`; a missing entry is the
//! null cell. Structural edits (row/column insertion and deletion) go
//! through fate arrays: `fate[old_index] = Some(new_index)` keeps a
//! row/column at a new position, `None` drops it.

use rustc_hash::FxHashMap;

use crate::cell::CellView;

#[derive(Debug, Clone, Default)]
pub struct Table {
    w: usize,
    h: usize,
    cells: FxHashMap<(usize, usize), String>,
}

impl Table {
    pub fn new(w: usize, h: usize) -> Self {
        Table {
            w,
            h,
            cells: FxHashMap::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn cell_view(&self) -> CellView {
        CellView::new()
    }

    /// Value at `(x, y)`, or `None` when the cell is null or out of bounds.
    pub fn cell(&self, x: usize, y: usize) -> Option<&str> {
        if x >= self.w || y >= self.h {
            return None;
        }
        self.cells.get(&(x, y)).map(String::as_str)
    }

    /// Text at `(x, y)`; the null cell reads as empty.
    pub fn cell_text(&self, x: usize, y: usize) -> &str {
        self.cell(x, y).unwrap_or("")
    }

    pub fn set_cell(&mut self, x: usize, y: usize, value: Option<String>) {
        match value {
            Some(v) => {
                self.cells.insert((x, y), v);
            }
            None => {
                self.cells.remove(&(x, y));
            }
        }
    }

    /// Change dimensions without touching stored cells. Cells outside the
    /// new bounds become unaddressable but are kept, so growing again
    /// restores them; callers that want a fresh sheet pair this with
    /// [`Table::clear`].
    pub fn resize(&mut self, w: usize, h: usize) {
        self.w = w;
        self.h = h;
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Rebuild rows according to `fate`: row `y` moves to `fate[y]`, rows
    /// with `None` fate (or beyond the fate array) are dropped. The new
    /// height is `hfate`.
    pub fn insert_or_delete_rows(&mut self, fate: &[Option<usize>], hfate: usize) {
        let old = std::mem::take(&mut self.cells);
        for ((x, y), v) in old {
            if let Some(Some(ny)) = fate.get(y) {
                self.cells.insert((x, *ny), v);
            }
        }
        self.h = hfate;
    }

    /// Column counterpart of [`Table::insert_or_delete_rows`].
    pub fn insert_or_delete_columns(&mut self, fate: &[Option<usize>], wfate: usize) {
        let old = std::mem::take(&mut self.cells);
        for ((x, y), v) in old {
            if let Some(Some(nx)) = fate.get(x) {
                self.cells.insert((*nx, y), v);
            }
        }
        self.w = wfate;
    }

    /// Drop trailing rows and columns that are entirely blank (null or
    /// empty cells). Loaders call this so that padding in the input text
    /// does not show up as spurious diff rows.
    pub fn trim_blank(&mut self) {
        let view = self.cell_view();
        while self.h > 0 {
            let y = self.h - 1;
            if (0..self.w).any(|x| !view.is_blank(self.cell(x, y))) {
                break;
            }
            self.h -= 1;
        }
        while self.w > 0 {
            let x = self.w - 1;
            if (0..self.h).any(|y| !view.is_blank(self.cell(x, y))) {
                break;
            }
            self.w -= 1;
        }
    }
}
