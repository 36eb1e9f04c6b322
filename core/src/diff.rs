//! Diff table construction.
//!
//! [`TableDiff`] renders an [`Alignment`] plus [`CompareFlags`] into a
//! single annotated table: a leading action column, an optional `!`
//! schema row and `@@` header row, `old->new` cell updates (conflicts
//! as `parent!->local!->remote`), context windowing around changes,
//! and optional order annotations behind a `@:@` corner.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::alignment::Alignment;
use crate::cell::CellView;
use crate::config::CompareFlags;
use crate::error_codes;
use crate::mover;
use crate::ordering::Unit;
use crate::table::Table;

/// Separator search gives up after this many growth steps and keeps the
/// last candidate.
const SEPARATOR_GROWTH_LIMIT: usize = 64;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiffError {
    #[error(
        "[TBLDIFF_ORDER_001] Ordering merge stalled after {cap} iterations with rows still \
         unplaced. Suggestion: this indicates an internal alignment inconsistency; please \
         report the input tables."
    )]
    OrderingStalled { cap: usize },
}

impl DiffError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            DiffError::OrderingStalled { .. } => error_codes::ORDER_STALLED,
        }
    }
}

pub struct TableDiff<'a> {
    align: Alignment<'a>,
    flags: CompareFlags,
}

impl<'a> TableDiff<'a> {
    pub fn new(align: Alignment<'a>, flags: CompareFlags) -> Self {
        TableDiff { align, flags }
    }

    /// Build the annotated diff table into `output`.
    pub fn hilite(&mut self, output: &mut Table) -> Result<(), DiffError> {
        output.resize(0, 0);
        output.clear();
        let mut row_map: FxHashMap<usize, Unit> = FxHashMap::default();
        let mut col_map: FxHashMap<usize, Unit> = FxHashMap::default();
        let units: Vec<Unit> = self.align.to_order()?.units().to_vec();
        let column_units: Vec<Unit> = match self.align.meta.as_deref_mut() {
            Some(meta) => meta.to_order()?.units().to_vec(),
            None => Vec::new(),
        };
        let has_parent = self.align.reference().is_some();
        let (p, a, b, ra_header, rb_header);
        if let Some(reference) = self.align.reference() {
            p = self.align.source();
            a = reference.target();
            b = self.align.target();
            ra_header = reference.meta().map_or(0, |m| m.target_header());
            rb_header = self.align.meta().map_or(0, |m| m.target_header());
        } else {
            a = self.align.source();
            b = self.align.target();
            p = a;
            ra_header = self.align.meta().map_or(0, |m| m.source_header());
            rb_header = self.align.meta().map_or(0, |m| m.target_header());
        }
        let (Some(p), Some(a), Some(b)) = (p, a, b) else {
            return Ok(());
        };

        let mut show_rc_numbers = false;
        let mut row_moves: Option<FxHashSet<usize>> = None;
        let mut col_moves: Option<FxHashSet<usize>> = None;
        if self.flags.ordered {
            row_moves = Some(mover::move_units(&units).into_iter().collect());
            col_moves = Some(mover::move_units(&column_units).into_iter().collect());
        }

        let outer_reps_needed = if self.flags.show_unchanged { 1 } else { 2 };
        let view = a.cell_view();
        let mut sep = String::new();
        let mut conflict_sep = String::new();

        // Schema row: one modifier per column, shown only when some
        // column changed.
        let mut schema: Vec<String> = Vec::new();
        let mut have_schema = false;
        for (j, cunit) in column_units.iter().enumerate() {
            let reordered = col_moves.as_ref().map_or(false, |m| m.contains(&j));
            if reordered {
                show_rc_numbers = true;
            }
            let mut act = String::new();
            if cunit.r.is_some() && cunit.local_or_parent().is_none() {
                have_schema = true;
                act = "+++".to_string();
            }
            if cunit.r.is_none() && cunit.local_or_parent().is_some() {
                have_schema = true;
                act = "---".to_string();
            }
            if let (Some(cr), Some(cl)) = (cunit.r, cunit.local_or_parent()) {
                if a.height() >= ra_header && b.height() >= rb_header {
                    let aa = a.cell(cl, ra_header);
                    let bb = b.cell(cr, rb_header);
                    if !view.equals(aa, bb) {
                        have_schema = true;
                        act = format!("({})", view.to_text(aa));
                    }
                }
            }
            if reordered {
                act.insert(0, ':');
                have_schema = true;
            }
            schema.push(act);
        }
        if have_schema {
            let at = output.height();
            output.resize(column_units.len() + 1, at + 1);
            output.set_cell(0, at, Some("!".to_string()));
            for (j, act) in schema.iter().enumerate() {
                output.set_cell(j + 1, at, Some(act.clone()));
            }
        }

        let mut top_line_done = false;
        if self.flags.always_show_header {
            let at = output.height();
            output.resize(column_units.len() + 1, at + 1);
            output.set_cell(0, at, Some("@@".to_string()));
            for (j, cunit) in column_units.iter().enumerate() {
                if let Some(cr) = cunit.r {
                    if b.height() > 0 {
                        output.set_cell(j + 1, at, b.cell(cr, rb_header).map(String::from));
                    }
                } else if let Some(cl) = cunit.local_or_parent() {
                    if a.height() > 0 {
                        output.set_cell(j + 1, at, a.cell(cl, ra_header).map(String::from));
                    }
                }
                col_map.insert(j + 1, *cunit);
            }
            top_line_done = true;
        }

        // Pass 1 (skipped when showing everything) marks changed rows;
        // pass 2 widens each mark into its context window and publishes.
        let mut active: Vec<i32> = if self.flags.show_unchanged {
            Vec::new()
        } else {
            vec![0; units.len()]
        };
        for out in 0..outer_reps_needed {
            if out == 1 {
                let del = self.flags.unchanged_context as isize;
                if del > 0 {
                    let mut mark: isize = -del - 1;
                    for i in 0..units.len() {
                        let ii = i as isize;
                        if active[i] == 0 || active[i] == 3 {
                            if ii - mark <= del {
                                active[i] = 2;
                            } else if ii - mark == del + 1 {
                                active[i] = 3;
                            }
                        } else if active[i] == 1 {
                            mark = ii;
                        }
                    }
                    mark = units.len() as isize + del + 1;
                    for j in 0..units.len() {
                        let i = units.len() - 1 - j;
                        let ii = i as isize;
                        if active[i] == 0 || active[i] == 3 {
                            if mark - ii <= del {
                                active[i] = 2;
                            } else if mark - ii == del + 1 {
                                active[i] = 3;
                            }
                        } else if active[i] == 1 {
                            mark = ii;
                        }
                    }
                }
            }
            let mut showed_dummy = false;
            for (i, unit) in units.iter().enumerate() {
                let reordered = row_moves.as_ref().map_or(false, |m| m.contains(&i));
                if reordered {
                    show_rc_numbers = true;
                }
                if unit.r.is_none() && unit.l.is_none() {
                    continue;
                }
                if unit.r == Some(0) && unit.local_or_parent() == Some(0) && top_line_done {
                    continue;
                }
                let mut act = String::new();
                if reordered {
                    act = ":".to_string();
                }
                let mut publish = self.flags.show_unchanged;
                let mut dummy = false;
                if out == 1 {
                    publish = active[i] > 0;
                    dummy = active[i] == 3;
                    if dummy && showed_dummy {
                        continue;
                    }
                    if !publish {
                        continue;
                    }
                }
                if !dummy {
                    showed_dummy = false;
                }
                let at = output.height();
                if publish {
                    output.resize(column_units.len() + 1, at + 1);
                }
                if dummy {
                    for j in 0..column_units.len() + 1 {
                        output.set_cell(j, at, Some("...".to_string()));
                    }
                    showed_dummy = true;
                    continue;
                }
                let mut have_addition = false;
                if unit.p.is_none() && unit.l.is_none() && unit.r.is_some() {
                    act = "+++".to_string();
                }
                if (unit.p.is_some() || !has_parent) && unit.l.is_some() && unit.r.is_none() {
                    act = "---".to_string();
                }
                for (j, cunit) in column_units.iter().enumerate() {
                    let mut pp: Option<&str> = None;
                    let mut ll: Option<&str> = None;
                    let mut rr: Option<&str> = None;
                    let dd: Option<&str>;
                    let mut dd_to: Option<&str> = None;
                    let mut have_dd_to = false;
                    let mut dd_to_alt: Option<&str> = None;
                    let mut have_dd_to_alt = false;
                    let mut have_pp = false;
                    let mut have_ll = false;
                    let mut have_rr = false;
                    if let (Some(cp), Some(up)) = (cunit.p, unit.p) {
                        pp = p.cell(cp, up);
                        have_pp = true;
                    }
                    if let (Some(cl), Some(ul)) = (cunit.l, unit.l) {
                        ll = a.cell(cl, ul);
                        have_ll = true;
                    }
                    if let (Some(cr), Some(ur)) = (cunit.r, unit.r) {
                        rr = b.cell(cr, ur);
                        have_rr = true;
                        if !have_pp && cunit.l.is_none() {
                            if let Some(added) = rr {
                                if !added.is_empty() {
                                    have_addition = true;
                                }
                            }
                        }
                    }
                    if have_pp {
                        if !have_rr || view.equals(pp, rr) {
                            dd = pp;
                        } else {
                            dd = pp;
                            dd_to = rr;
                            have_dd_to = true;
                            if !view.equals(pp, ll) {
                                dd_to_alt = ll;
                                have_dd_to_alt = true;
                            }
                        }
                    } else if have_ll {
                        if !have_rr || view.equals(ll, rr) {
                            dd = ll;
                        } else {
                            dd = ll;
                            dd_to = rr;
                            have_dd_to = true;
                        }
                    } else {
                        dd = rr;
                    }
                    let mut txt: Option<String> = None;
                    if have_dd_to {
                        let mut built = quote_for_diff(&view, dd);
                        if sep.is_empty() {
                            sep = get_separator(a, b, "->");
                        }
                        let is_conflict = have_dd_to_alt && !view.equals(dd_to, dd_to_alt);
                        if !is_conflict {
                            built.push_str(&sep);
                            built.push_str(&quote_for_diff(&view, dd_to));
                            if sep.len() > act.len() {
                                act = sep.clone();
                            }
                        } else {
                            if conflict_sep.is_empty() {
                                conflict_sep = format!("{}{}", get_separator(p, a, "!"), sep);
                            }
                            built.push_str(&conflict_sep);
                            built.push_str(&quote_for_diff(&view, dd_to_alt));
                            built.push_str(&conflict_sep);
                            built.push_str(&quote_for_diff(&view, dd_to));
                            act = conflict_sep.clone();
                        }
                        txt = Some(built);
                    }
                    if act.is_empty() && have_addition {
                        act = "+".to_string();
                    }
                    if publish {
                        match txt {
                            Some(t) => output.set_cell(j + 1, at, Some(t)),
                            None => output.set_cell(j + 1, at, dd.map(String::from)),
                        }
                    }
                }
                if publish {
                    output.set_cell(0, at, Some(act.clone()));
                    row_map.insert(at, *unit);
                }
                if !act.is_empty() && !publish {
                    active[i] = 1;
                }
            }
        }

        if !show_rc_numbers {
            if self.flags.always_show_order {
                show_rc_numbers = true;
            } else if self.flags.ordered {
                show_rc_numbers = is_reordered(&row_map, output.height());
                if !show_rc_numbers {
                    show_rc_numbers = is_reordered(&col_map, output.width());
                }
            }
        }
        if show_rc_numbers && !self.flags.never_show_order {
            let column_fate: Vec<Option<usize>> =
                (0..output.width()).map(|i| Some(i + 1)).collect();
            output.insert_or_delete_columns(&column_fate, column_fate.len() + 1);
            let mut annotator = OrderAnnotator::new();
            for i in 0..output.height() {
                if let Some(unit) = row_map.get(&i) {
                    output.set_cell(0, i, Some(annotator.describe(unit)));
                }
            }
            let row_fate: Vec<Option<usize>> = (0..output.height()).map(|i| Some(i + 1)).collect();
            output.insert_or_delete_rows(&row_fate, row_fate.len() + 1);
            let mut annotator = OrderAnnotator::new();
            for i in 1..output.width() {
                if let Some(unit) = col_map.get(&(i - 1)) {
                    output.set_cell(i, 0, Some(annotator.describe(unit)));
                }
            }
            output.set_cell(0, 0, Some("@:@".to_string()));
        }
        Ok(())
    }
}

/// Writes `l:r` (or `p|l:r`) coordinates, bracketed once a coordinate
/// runs backwards relative to the previous call.
struct OrderAnnotator {
    l_prev: Option<usize>,
    r_prev: Option<usize>,
}

impl OrderAnnotator {
    fn new() -> Self {
        OrderAnnotator {
            l_prev: None,
            r_prev: None,
        }
    }

    fn describe(&mut self, unit: &Unit) -> String {
        let mut txt = unit.to_string();
        let mut reordered = false;
        if let Some(l) = unit.l {
            if self.l_prev.map_or(false, |prev| l < prev) {
                reordered = true;
            }
            self.l_prev = Some(l);
        }
        if let Some(r) = unit.r {
            if self.r_prev.map_or(false, |prev| r < prev) {
                reordered = true;
            }
            self.r_prev = Some(r);
        }
        if reordered {
            txt = format!("[{txt}]");
        }
        txt
    }
}

fn is_reordered(m: &FxHashMap<usize, Unit>, ct: usize) -> bool {
    let mut l_prev: Option<usize> = None;
    let mut r_prev: Option<usize> = None;
    for i in 0..ct {
        let Some(unit) = m.get(&i) else { continue };
        if let Some(l) = unit.l {
            if l_prev.map_or(false, |prev| l < prev) {
                return true;
            }
            l_prev = Some(l);
        }
        if let Some(r) = unit.r {
            if r_prev.map_or(false, |prev| r < prev) {
                return true;
            }
            r_prev = Some(r);
        }
    }
    false
}

/// Quote a datum for use inside an `old->new` pair: null becomes
/// `NULL`, and a value that would read back as null gains a protective
/// underscore.
fn quote_for_diff(view: &CellView, d: Option<&str>) -> String {
    if view.equals(d, None) {
        return "NULL".to_string();
    }
    let text = view.to_text(d);
    if text.trim_start_matches('_') == "NULL" {
        return format!("_{text}");
    }
    text.to_string()
}

/// Grow the separator until no cell of either table contains it.
fn get_separator(t: &Table, t2: &Table, root: &str) -> String {
    let mut sep = root.to_string();
    let mut growths = 0;
    for table in [t, t2] {
        for y in 0..table.height() {
            for x in 0..table.width() {
                let Some(txt) = table.cell(x, y) else { continue };
                while txt.contains(&sep) {
                    if growths >= SEPARATOR_GROWTH_LIMIT {
                        return sep;
                    }
                    sep.insert(0, '-');
                    growths += 1;
                }
            }
        }
    }
    sep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{compare_tables, compare_tables3};

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

    fn diff_with(a: &Table, b: &Table, flags: CompareFlags) -> Table {
        let mut ct = compare_tables(a, b);
        let align = ct.align().expect("alignment");
        let mut td = TableDiff::new(align, flags);
        let mut output = Table::new(0, 0);
        td.hilite(&mut output).expect("hilite");
        output
    }

    #[test]
    fn changed_cell_becomes_an_update_pair() {
        let a = grid(&[&["id", "name"], &["1", "ann"], &["2", "bob"]]);
        let b = grid(&[&["id", "name"], &["1", "ann"], &["2", "robert"]]);
        let out = diff_with(&a, &b, CompareFlags::default());
        assert_eq!(out.cell(0, 0), Some("@@"));
        assert_eq!(out.cell(1, 0), Some("id"));
        assert_eq!(out.cell(0, 2), Some("->"));
        assert_eq!(out.cell(2, 2), Some("bob->robert"));
        // One row of context around the change.
        assert_eq!(out.cell(0, 1), Some(""));
        assert_eq!(out.cell(2, 1), Some("ann"));
        assert_eq!(out.height(), 3);
    }

    #[test]
    fn added_column_gets_schema_row_and_cell_additions() {
        let a = grid(&[&["id", "name"], &["1", "ann"]]);
        let b = grid(&[&["id", "name", "age"], &["1", "ann", "3"]]);
        let out = diff_with(&a, &b, CompareFlags::default());
        assert_eq!(out.cell(0, 0), Some("!"));
        assert_eq!(out.cell(3, 0), Some("+++"));
        assert_eq!(out.cell(0, 1), Some("@@"));
        assert_eq!(out.cell(3, 1), Some("age"));
        assert_eq!(out.cell(0, 2), Some("+"));
        assert_eq!(out.cell(3, 2), Some("3"));
    }

    #[test]
    fn removed_column_is_marked_in_schema() {
        let a = grid(&[&["id", "name", "age"], &["1", "ann", "3"]]);
        let b = grid(&[&["id", "name"], &["1", "ann"]]);
        let out = diff_with(&a, &b, CompareFlags::default());
        assert_eq!(out.cell(0, 0), Some("!"));
        assert_eq!(out.cell(3, 0), Some("---"));
        assert_eq!(out.cell(3, 1), Some("age"));
        assert_eq!(out.cell(3, 2), Some("3"));
    }

    #[test]
    fn inserted_and_deleted_rows_carry_their_own_acts() {
        let a = grid(&[&["id"], &["1"], &["2"]]);
        let b = grid(&[&["id"], &["1"], &["3"]]);
        let out = diff_with(&a, &b, CompareFlags::default());
        let mut acts: Vec<String> = Vec::new();
        for y in 0..out.height() {
            acts.push(out.cell_text(0, y).to_string());
        }
        assert!(acts.contains(&"---".to_string()));
        assert!(acts.contains(&"+++".to_string()));
    }

    #[test]
    fn far_changes_are_elided_with_dummy_rows() {
        let a = grid(&[
            &["id", "v"],
            &["1", "a"],
            &["2", "b"],
            &["3", "c"],
            &["4", "d"],
            &["5", "e"],
        ]);
        let mut b = a.clone();
        b.set_cell(1, 3, Some("CHANGED".to_string()));
        let out = diff_with(&a, &b, CompareFlags::default());
        let mut dummies = 0;
        let mut found_change = false;
        for y in 0..out.height() {
            if out.cell(0, y) == Some("...") {
                dummies += 1;
            }
            if out.cell(2, y) == Some("c->CHANGED") {
                found_change = true;
            }
        }
        assert!(found_change);
        assert!(dummies >= 1);
        // Untouched far rows stay out of the output.
        assert!(out.height() < 7);
    }

    #[test]
    fn show_unchanged_emits_every_row_once() {
        let a = grid(&[&["id"], &["1"], &["2"], &["3"]]);
        let b = a.clone();
        let out = diff_with(&a, &b, CompareFlags::show_all());
        // Header plus three data rows; the r0 line is folded into @@.
        assert_eq!(out.height(), 4);
        for y in 1..out.height() {
            assert_eq!(out.cell(0, y), Some(""));
        }
    }

    #[test]
    fn conflicting_edits_use_the_conflict_separator() {
        let p = grid(&[&["id", "v"], &["1", "x"]]);
        let a = grid(&[&["id", "v"], &["1", "y"]]);
        let b = grid(&[&["id", "v"], &["1", "z"]]);
        let mut ct = compare_tables3(Some(&p), &a, &b);
        let align = ct.align().expect("alignment");
        let mut td = TableDiff::new(align, CompareFlags::default());
        let mut out = Table::new(0, 0);
        td.hilite(&mut out).expect("hilite");
        let mut found = false;
        for y in 0..out.height() {
            if out.cell(2, y) == Some("x!->y!->z") {
                found = true;
                assert_eq!(out.cell(0, y), Some("!->"));
            }
        }
        assert!(found, "conflict cell missing: {:?}", out);
    }

    #[test]
    fn remote_only_edit_in_three_way_is_a_plain_update() {
        let p = grid(&[&["id", "v"], &["1", "x"]]);
        let a = grid(&[&["id", "v"], &["1", "x"]]);
        let b = grid(&[&["id", "v"], &["1", "z"]]);
        let mut ct = compare_tables3(Some(&p), &a, &b);
        let align = ct.align().expect("alignment");
        let mut td = TableDiff::new(align, CompareFlags::default());
        let mut out = Table::new(0, 0);
        td.hilite(&mut out).expect("hilite");
        let mut found = false;
        for y in 0..out.height() {
            if out.cell(2, y) == Some("x->z") {
                found = true;
            }
        }
        assert!(found);
    }

    #[test]
    fn moved_rows_get_move_acts_and_order_annotations() {
        let a = grid(&[&["id"], &["1"], &["2"], &["3"]]);
        let b = grid(&[&["id"], &["2"], &["3"], &["1"]]);
        let out = diff_with(&a, &b, CompareFlags::with_order_annotations());
        assert_eq!(out.cell(0, 0), Some("@:@"));
        let mut move_act = false;
        let mut bracketed = false;
        for y in 0..out.height() {
            if out.cell(1, y) == Some(":") {
                move_act = true;
            }
            if out.cell_text(0, y).starts_with('[') {
                bracketed = true;
            }
        }
        assert!(move_act);
        assert!(bracketed);
    }

    #[test]
    fn grown_separator_avoids_cell_collisions() {
        let a = grid(&[&["id", "v"], &["1", "a->b"]]);
        let b = grid(&[&["id", "v"], &["1", "c"]]);
        let out = diff_with(&a, &b, CompareFlags::default());
        let mut found = false;
        for y in 0..out.height() {
            if out.cell(2, y) == Some("a->b-->c") {
                found = true;
                assert_eq!(out.cell(0, y), Some("-->"));
            }
        }
        assert!(found, "grown separator missing: {:?}", out);
    }

    #[test]
    fn quote_for_diff_protects_sentinels() {
        let view = CellView::new();
        assert_eq!(quote_for_diff(&view, None), "NULL");
        assert_eq!(quote_for_diff(&view, Some("")), "NULL");
        assert_eq!(quote_for_diff(&view, Some("NULL")), "_NULL");
        assert_eq!(quote_for_diff(&view, Some("_NULL")), "__NULL");
        assert_eq!(quote_for_diff(&view, Some("x")), "x");
    }

    #[test]
    fn separator_growth_scans_both_tables() {
        let a = grid(&[&["x"], &["plain"]]);
        let b = grid(&[&["x"], &["has -> inside"]]);
        assert_eq!(get_separator(&a, &b, "->"), "-->");
        assert_eq!(get_separator(&a, &a, "->"), "->");
    }
}
