//! Comparison driver: staged equality checks plus row/column alignment.
//!
//! [`compare_tables`] and [`compare_tables3`] build a [`CompareTable`]
//! over borrowed tables. Cheap verdicts (equality, shared columns) run
//! first in resumable stages; [`CompareTable::align`] then produces the
//! full [`Alignment`] used by diff construction.

use std::collections::hash_map::Entry;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::alignment::Alignment;
use crate::diff::DiffError;
use crate::index::IndexPair;
use crate::ordering::Unit;
use crate::table::Table;

/// Rows inspected on each side when guessing the header row.
const HEADER_SLOP: usize = 5;
/// At most this many key columns participate in row matching.
const KEY_COLUMN_LIMIT: usize = 5;
/// Indexes whose commonest key covers at least this share of rows are
/// considered too ambiguous to match on.
const AMBIGUITY_CEILING: f64 = 0.1;

/// Compare two tables (local vs remote).
pub fn compare_tables<'a>(local: &'a Table, remote: &'a Table) -> CompareTable<'a> {
    CompareTable::attach(TableComparisonState::new(None, local, remote))
}

/// Compare two tables against a common ancestor. A `None` parent
/// degrades to the two-way form.
pub fn compare_tables3<'a>(
    parent: Option<&'a Table>,
    local: &'a Table,
    remote: &'a Table,
) -> CompareTable<'a> {
    CompareTable::attach(TableComparisonState::new(parent, local, remote))
}

/// Cell-by-cell equality under blank coercion: same dimensions and
/// every cell equal per [`crate::CellView::equals`].
pub fn tables_equal(a: &Table, b: &Table) -> bool {
    if a.width() != b.width() || a.height() != b.height() {
        return false;
    }
    let view = a.cell_view();
    for y in 0..a.height() {
        for x in 0..a.width() {
            if !view.equals(a.cell(x, y), b.cell(x, y)) {
                return false;
            }
        }
    }
    true
}

/// Inputs and verdicts of a staged comparison.
#[derive(Debug, Clone)]
pub struct TableComparisonState<'a> {
    pub p: Option<&'a Table>,
    pub a: &'a Table,
    pub b: &'a Table,
    pub completed: bool,
    pub run_to_completion: bool,
    pub is_equal: bool,
    pub is_equal_known: bool,
    pub has_same_columns: bool,
    pub has_same_columns_known: bool,
}

impl<'a> TableComparisonState<'a> {
    pub fn new(p: Option<&'a Table>, a: &'a Table, b: &'a Table) -> Self {
        TableComparisonState {
            p,
            a,
            b,
            completed: false,
            run_to_completion: true,
            is_equal: false,
            is_equal_known: false,
            has_same_columns: false,
            has_same_columns_known: false,
        }
    }
}

/// A comparison in progress, with optional capture of the row indexes
/// built along the way (used by patch application to look rows up by
/// content).
pub struct CompareTable<'a> {
    comp: TableComparisonState<'a>,
    indexes: Option<Vec<IndexPair>>,
}

impl<'a> CompareTable<'a> {
    pub fn attach(comp: TableComparisonState<'a>) -> Self {
        let mut ct = CompareTable { comp, indexes: None };
        let mut more = ct.compare_core();
        while more && ct.comp.run_to_completion {
            more = ct.compare_core();
        }
        ct
    }

    pub fn comparison(&self) -> &TableComparisonState<'a> {
        &self.comp
    }

    /// Retain the row indexes built during alignment so they can be
    /// queried afterwards.
    pub fn store_indexes(&mut self) {
        self.indexes = Some(Vec::new());
    }

    pub(crate) fn take_indexes(&mut self) -> Option<Vec<IndexPair>> {
        self.indexes.take()
    }

    /// Align rows and columns of the compared tables. With a parent
    /// present the result carries a reference alignment (parent vs
    /// local) alongside the main one (parent vs remote).
    pub fn align(&mut self) -> Result<Alignment<'a>, DiffError> {
        let mut alignment = Alignment::new();
        self.align_core(&mut alignment)?;
        Ok(alignment)
    }

    fn compare_core(&mut self) -> bool {
        if self.comp.completed {
            return false;
        }
        if !self.comp.is_equal_known {
            return self.test_is_equal();
        }
        if !self.comp.has_same_columns_known {
            return self.test_has_same_columns();
        }
        self.comp.completed = true;
        false
    }

    fn test_is_equal(&mut self) -> bool {
        let mut eq = tables_equal(self.comp.a, self.comp.b);
        if eq {
            if let Some(p) = self.comp.p {
                eq = tables_equal(p, self.comp.a);
            }
        }
        self.comp.is_equal = eq;
        self.comp.is_equal_known = true;
        true
    }

    fn test_has_same_columns(&mut self) -> bool {
        let mut eq = Self::has_same_columns2(self.comp.a, self.comp.b);
        if eq {
            if let Some(p) = self.comp.p {
                eq = Self::has_same_columns2(p, self.comp.a);
            }
        }
        self.comp.has_same_columns = eq;
        self.comp.has_same_columns_known = true;
        true
    }

    fn has_same_columns2(a: &Table, b: &Table) -> bool {
        if a.width() != b.width() {
            return false;
        }
        if a.height() == 0 || b.height() == 0 {
            return true;
        }
        let view = a.cell_view();
        for x in 0..a.width() {
            // A name repeated within one header row disqualifies it.
            for x2 in x + 1..a.width() {
                if view.equals(a.cell(x, 0), a.cell(x2, 0)) {
                    return false;
                }
            }
            if !view.equals(a.cell(x, 0), b.cell(x, 0)) {
                return false;
            }
        }
        true
    }

    fn align_core(&mut self, align: &mut Alignment<'a>) -> Result<(), DiffError> {
        let Some(p) = self.comp.p else {
            return self.align_core2(align, self.comp.a, self.comp.b);
        };
        // Three-way: main alignment is parent vs remote, the reference
        // is parent vs local, and the column alignments are chained the
        // same way.
        self.align_core2(align, p, self.comp.b)?;
        let mut reference = Alignment::new();
        self.align_core2(&mut reference, p, self.comp.a)?;
        if let (Some(meta), Some(ref_meta)) = (align.meta.as_deref_mut(), reference.meta.as_deref())
        {
            meta.set_reference(ref_meta.clone());
        }
        align.set_reference(reference);
        Ok(())
    }

    fn align_core2(
        &mut self,
        align: &mut Alignment<'a>,
        a: &'a Table,
        b: &'a Table,
    ) -> Result<(), DiffError> {
        let column_units: Vec<Unit> = {
            let meta = align.meta.get_or_insert_with(|| Box::new(Alignment::new()));
            Self::align_columns(meta, a, b);
            meta.to_order()?.units().to_vec()
        };
        let common_units: Vec<Unit> = column_units
            .iter()
            .copied()
            .filter(|u| u.l.is_some() && u.r.is_some() && !(u.parent_tracked() && u.p.is_none()))
            .collect();

        align.range(a.height(), b.height());
        align.tables(a, b);

        let ha = a.height();
        let hb = b.height();

        // With many shared columns, match on the few with the lowest
        // cardinality; low-cardinality columns are the cheap ones to
        // combine and the combinations discriminate just as well.
        let columns: Vec<usize> = if common_units.len() > KEY_COLUMN_LIMIT {
            let mut evaluated: Vec<(usize, usize)> = Vec::new();
            for (i, unit) in common_units.iter().enumerate() {
                let mut ct = 0;
                if let (Some(ca), Some(cb)) = (unit.l, unit.r) {
                    let mut seen_a: FxHashSet<Option<&str>> = FxHashSet::default();
                    let mut seen_b: FxHashSet<Option<&str>> = FxHashSet::default();
                    for j in 0..ha {
                        if seen_a.insert(a.cell(ca, j)) {
                            ct += 1;
                        }
                    }
                    for j in 0..hb {
                        if seen_b.insert(b.cell(cb, j)) {
                            ct += 1;
                        }
                    }
                }
                evaluated.push((ct, i));
            }
            evaluated.sort();
            evaluated
                .into_iter()
                .take(KEY_COLUMN_LIMIT)
                .map(|(_, i)| i)
                .collect()
        } else {
            (0..common_units.len()).collect()
        };

        // Try key-column subsets widest first, so the most specific
        // index claims each row before narrower ones get a chance.
        let mut subsets: Vec<usize> = (1..1usize << columns.len()).collect();
        subsets.sort_by_key(|k| (std::cmp::Reverse(k.count_ones()), *k));

        let mut pending: FxHashSet<usize> = (0..ha).collect();
        for k in subsets {
            if pending.is_empty() {
                break;
            }
            let mut index = IndexPair::new();
            let mut bits = k;
            let mut at = 0;
            while bits > 0 {
                if bits % 2 == 1 {
                    let unit = common_units[columns[at]];
                    if let (Some(ca), Some(cb)) = (unit.l, unit.r) {
                        index.add_columns(ca, cb);
                    }
                }
                bits >>= 1;
                at += 1;
            }
            index.index_tables(a, b);
            let h = ha.max(hb).max(1);
            let ratio = index.top_freq() as f64 / (h + 20) as f64;
            if ratio >= AMBIGUITY_CEILING {
                continue;
            }
            let mut fixed: Vec<usize> = Vec::new();
            for j in 0..ha {
                if !pending.contains(&j) {
                    continue;
                }
                let cross = index.query_local(a, j);
                if cross.spot_a != 1 || cross.spot_b != 1 {
                    continue;
                }
                if let Some(&target) = cross.item_b.and_then(|items| items.first()) {
                    align.link(j, target);
                    fixed.push(j);
                }
            }
            for j in &fixed {
                pending.remove(j);
            }
            if let Some(indexes) = self.indexes.as_mut() {
                indexes.push(index);
            }
        }
        // The header rows always correspond.
        align.link(0, 0);
        Ok(())
    }

    /// Column alignment: pick the most header-like row on each side,
    /// then link columns whose values in those rows match uniquely.
    fn align_columns(align: &mut Alignment<'a>, a: &'a Table, b: &'a Table) {
        align.range(a.width(), b.width());
        align.tables(a, b);

        let mut ma_best: Option<FxHashMap<Option<String>, Option<usize>>> = None;
        let mut mb_best: Option<FxHashMap<Option<String>, Option<usize>>> = None;
        let mut ct_best: Option<usize> = None;
        let mut ra_header = 0;
        let mut rb_header = 0;
        let mut ra_uniques: isize = 0;
        let mut rb_uniques: isize = 0;

        for ra in 0..HEADER_SLOP.min(a.height()) {
            for rb in 0..HEADER_SLOP.min(b.height()) {
                // Map cell value to its column, or None once ambiguous.
                let mut ma: FxHashMap<Option<String>, Option<usize>> = FxHashMap::default();
                let mut uniques: isize = 0;
                for ca in 0..a.width() {
                    match ma.entry(a.cell(ca, ra).map(str::to_owned)) {
                        Entry::Occupied(mut e) => {
                            e.insert(None);
                            uniques -= 1;
                        }
                        Entry::Vacant(e) => {
                            e.insert(Some(ca));
                            uniques += 1;
                        }
                    }
                }
                if uniques > ra_uniques {
                    ra_header = ra;
                    ra_uniques = uniques;
                }
                let mut mb: FxHashMap<Option<String>, Option<usize>> = FxHashMap::default();
                let mut uniques: isize = 0;
                for cb in 0..b.width() {
                    match mb.entry(b.cell(cb, rb).map(str::to_owned)) {
                        Entry::Occupied(mut e) => {
                            e.insert(None);
                            uniques -= 1;
                        }
                        Entry::Vacant(e) => {
                            e.insert(Some(cb));
                            uniques += 1;
                        }
                    }
                }
                if uniques > rb_uniques {
                    rb_header = rb;
                    rb_uniques = uniques;
                }
                let ct = ma
                    .iter()
                    .filter(|(key, col)| {
                        col.is_some() && mb.get(*key).map_or(false, |c| c.is_some())
                    })
                    .count();
                if ct_best.map_or(true, |c| ct > c) {
                    ct_best = Some(ct);
                    ma_best = Some(ma);
                    mb_best = Some(mb);
                }
            }
        }

        let (Some(ma), Some(mb)) = (ma_best, mb_best) else {
            // One side has no rows at all; nothing to link.
            return;
        };
        for (key, ca) in &ma {
            if let (Some(ca), Some(Some(cb))) = (ca, mb.get(key)) {
                align.link(*ca, *cb);
            }
        }
        align.headers(ra_header, rb_header);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(cells: &[&[&str]]) -> Table {
        let h = cells.len();
        let w = cells.first().map_or(0, |r| r.len());
        let mut t = Table::new(w, h);
        for (y, row) in cells.iter().enumerate() {
            for (x, value) in row.iter().enumerate() {
                t.set_cell(x, y, Some((*value).to_string()));
            }
        }
        t
    }

    #[test]
    fn equal_tables_compare_equal() {
        let a = grid(&[&["id", "name"], &["1", "ann"], &["2", "bob"]]);
        let b = a.clone();
        let ct = compare_tables(&a, &b);
        assert!(ct.comparison().is_equal);
        assert!(ct.comparison().has_same_columns);
        assert!(ct.comparison().completed);
    }

    #[test]
    fn one_changed_cell_breaks_equality_but_not_columns() {
        let a = grid(&[&["id", "name"], &["1", "ann"]]);
        let b = grid(&[&["id", "name"], &["1", "anne"]]);
        let ct = compare_tables(&a, &b);
        assert!(!ct.comparison().is_equal);
        assert!(ct.comparison().has_same_columns);
    }

    #[test]
    fn duplicate_header_names_disqualify_column_match() {
        let a = grid(&[&["x", "x"], &["1", "2"]]);
        let b = grid(&[&["x", "x"], &["1", "2"]]);
        let ct = compare_tables(&a, &b);
        assert!(ct.comparison().is_equal);
        assert!(!ct.comparison().has_same_columns);
    }

    #[test]
    fn empty_tables_share_columns_trivially() {
        let a = Table::new(2, 0);
        let b = Table::new(2, 0);
        let ct = compare_tables(&a, &b);
        assert!(ct.comparison().is_equal);
        assert!(ct.comparison().has_same_columns);
    }

    #[test]
    fn a_changed_parent_breaks_three_way_equality() {
        let p = grid(&[&["id"], &["1"]]);
        let a = grid(&[&["id"], &["2"]]);
        let b = grid(&[&["id"], &["2"]]);
        let ct = compare_tables3(Some(&p), &a, &b);
        assert!(!ct.comparison().is_equal);
    }

    #[test]
    fn identical_tables_align_row_for_row() {
        let a = grid(&[
            &["id", "name"],
            &["1", "ann"],
            &["2", "bob"],
            &["3", "cara"],
        ]);
        let b = a.clone();
        let mut ct = compare_tables(&a, &b);
        let align = ct.align().expect("alignment");
        for i in 0..4 {
            assert_eq!(align.a2b(i), Some(i), "row {i}");
        }
        assert_eq!(align.meta().map(|m| m.a2b(0)), Some(Some(0)));
        assert_eq!(align.meta().map(|m| m.a2b(1)), Some(Some(1)));
    }

    #[test]
    fn reordered_rows_are_tracked_by_content() {
        let a = grid(&[&["id", "name"], &["1", "ann"], &["2", "bob"]]);
        let b = grid(&[&["id", "name"], &["2", "bob"], &["1", "ann"]]);
        let mut ct = compare_tables(&a, &b);
        let align = ct.align().expect("alignment");
        assert_eq!(align.a2b(0), Some(0));
        assert_eq!(align.a2b(1), Some(2));
        assert_eq!(align.a2b(2), Some(1));
    }

    #[test]
    fn renamed_column_links_through_matching_data() {
        let a = grid(&[&["id", "name", "age"], &["1", "ann", "3"]]);
        let b = grid(&[&["id", "title", "age"], &["1", "ann", "3"]]);
        let mut ct = compare_tables(&a, &b);
        let align = ct.align().expect("alignment");
        let meta = align.meta().expect("column alignment");
        // The data row matches on all three columns and outvotes the
        // header row, so the renamed column keeps its link.
        assert_eq!(meta.a2b(0), Some(0));
        assert_eq!(meta.a2b(1), Some(1));
        assert_eq!(meta.a2b(2), Some(2));
        assert_eq!(meta.source_header(), 0);
        assert_eq!(meta.target_header(), 0);
    }

    #[test]
    fn three_way_alignment_carries_a_reference() {
        let p = grid(&[&["id", "name"], &["1", "ann"]]);
        let a = grid(&[&["id", "name"], &["1", "anne"]]);
        let b = grid(&[&["id", "name"], &["1", "ann"], &["2", "bob"]]);
        let mut ct = compare_tables3(Some(&p), &a, &b);
        let align = ct.align().expect("alignment");
        assert!(align.reference().is_some());
        let meta = align.meta().expect("column alignment");
        assert!(meta.reference().is_some());
    }

    #[test]
    fn stored_indexes_become_available_after_alignment() {
        let a = grid(&[&["id", "name"], &["1", "ann"], &["2", "bob"]]);
        let b = a.clone();
        let mut ct = compare_tables(&a, &b);
        ct.store_indexes();
        ct.align().expect("alignment");
        let indexes = ct.take_indexes().expect("captured");
        assert!(!indexes.is_empty());
    }

    #[test]
    fn blank_and_missing_cells_compare_equal() {
        let mut a = Table::new(1, 1);
        a.set_cell(0, 0, Some(String::new()));
        let b = Table::new(1, 1);
        assert!(tables_equal(&a, &b));
    }
}
