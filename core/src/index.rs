//! Composite-key hash index over table rows.
//!
//! An `Index` maps the concatenated text of selected columns to the rows
//! sharing that key; an `IndexPair` builds one index per table on the
//! same column subset and scores how well the keys discriminate. Row
//! matching in the aligner and source-row lookup in the patcher both run
//! on these queries.

use rustc_hash::FxHashMap;

use crate::table::Table;

/// Cell text for one row, keyed by column.
///
/// Lets a patch row stand in for a table row when querying an index. A
/// `None` component is skipped from the composite key, same as a null
/// cell.
pub(crate) trait RowContent {
    fn row_string(&self, col: usize) -> Option<String>;
}

pub(crate) struct TableRow<'a> {
    pub table: &'a Table,
    pub row: usize,
}

impl RowContent for TableRow<'_> {
    fn row_string(&self, col: usize) -> Option<String> {
        self.table.cell(col, self.row).map(str::to_owned)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Index {
    items: FxHashMap<String, Vec<usize>>,
    cols: Vec<usize>,
    keys: Vec<String>,
    pub top_freq: usize,
    pub height: usize,
}

impl Index {
    pub fn new() -> Self {
        Index::default()
    }

    /// Register a key column; registration order is key order.
    pub fn add_column(&mut self, i: usize) {
        self.cols.push(i);
    }

    /// Composite key for a row: registered columns in order, blank and
    /// null components skipped, joined by `" // "`. The joiner belongs to
    /// the column slot, so a skipped first column still leaves its mark:
    /// keys are opaque, only collisions matter.
    pub fn to_key<R: RowContent + ?Sized>(&self, row: &R) -> String {
        let mut wide = String::new();
        for (k, &col) in self.cols.iter().enumerate() {
            let Some(txt) = row.row_string(col) else {
                continue;
            };
            if txt.is_empty() {
                continue;
            }
            if k > 0 {
                wide.push_str(" // ");
            }
            wide.push_str(&txt);
        }
        wide
    }

    pub fn index_table(&mut self, t: &Table) {
        for i in 0..t.height() {
            if self.keys.len() <= i {
                let key = self.to_key(&TableRow { table: t, row: i });
                self.keys.push(key);
            }
            let bucket = self.items.entry(self.keys[i].clone()).or_default();
            bucket.push(i);
            if bucket.len() > self.top_freq {
                self.top_freq = bucket.len();
            }
        }
        self.height = t.height();
    }

    pub fn bucket(&self, key: &str) -> Option<&[usize]> {
        self.items.get(key).map(Vec::as_slice)
    }

    fn buckets(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.items.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Bucket sizes and row lists for one key queried against both sides.
///
/// Only a `spot_a == spot_b == 1` match is usable for linking.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CrossMatch<'i> {
    pub item_a: Option<&'i [usize]>,
    pub item_b: Option<&'i [usize]>,
    pub spot_a: usize,
    pub spot_b: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct IndexPair {
    ia: Index,
    ib: Index,
    quality: f64,
}

impl IndexPair {
    pub fn new() -> Self {
        IndexPair::default()
    }

    pub fn add_columns(&mut self, ca: usize, cb: usize) {
        self.ia.add_column(ca);
        self.ib.add_column(cb);
    }

    pub fn index_tables(&mut self, a: &Table, b: &Table) {
        self.ia.index_table(a);
        self.ib.index_table(b);
        let mut good = 0usize;
        for (key, bucket_a) in self.ia.buckets() {
            let spot_b = self.ib.bucket(key).map_or(0, <[usize]>::len);
            if bucket_a.len() == 1 && spot_b == 1 {
                good += 1;
            }
        }
        self.quality = good as f64 / a.height().max(1) as f64;
    }

    /// Share of keys that identify exactly one row on each side.
    pub fn quality(&self) -> f64 {
        self.quality
    }

    /// Largest bucket on either side; the collision indicator.
    pub fn top_freq(&self) -> usize {
        self.ia.top_freq.max(self.ib.top_freq)
    }

    pub fn query_local(&self, a: &Table, row: usize) -> CrossMatch<'_> {
        self.query_by_key(&self.ia.to_key(&TableRow { table: a, row }))
    }

    pub fn query_by_content<R: RowContent + ?Sized>(&self, row: &R) -> CrossMatch<'_> {
        self.query_by_key(&self.ia.to_key(row))
    }

    /// The empty key never matches: an all-blank row has nothing to say.
    pub fn query_by_key(&self, key: &str) -> CrossMatch<'_> {
        let item_a = self.ia.bucket(key);
        let item_b = self.ib.bucket(key);
        let mut spot_a = 0;
        let mut spot_b = 0;
        if !key.is_empty() {
            spot_a = item_a.map_or(0, <[usize]>::len);
            spot_b = item_b.map_or(0, <[usize]>::len);
        }
        CrossMatch {
            item_a,
            item_b,
            spot_a,
            spot_b,
        }
    }
}
