//! Row/column correspondence between two tables.
//!
//! An `Alignment` is a partial bijection between source and target
//! indices, plus the scaffolding a diff needs around it: the orthogonal
//! `meta` alignment (columns, when this one is rows), an optional
//! `reference` alignment against a common ancestor for 3-way work, and
//! the chosen header positions. From these it derives an [`Ordering`],
//! the merged sequence that interleaves parent, local, and remote
//! indices into one walk.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::diff::DiffError;
use crate::ordering::Ordering;
use crate::table::Table;

#[derive(Debug, Clone, Default)]
pub struct Alignment<'a> {
    map_a2b: FxHashMap<usize, usize>,
    map_b2a: FxHashMap<usize, usize>,
    pub(crate) ha: usize,
    pub(crate) hb: usize,
    pub(crate) ta: Option<&'a Table>,
    pub(crate) tb: Option<&'a Table>,
    pub(crate) ia: usize,
    pub(crate) ib: usize,
    pub(crate) meta: Option<Box<Alignment<'a>>>,
    pub(crate) reference: Option<Box<Alignment<'a>>>,
    order_cache: Option<Ordering>,
}

impl<'a> Alignment<'a> {
    pub fn new() -> Self {
        Alignment::default()
    }

    pub fn range(&mut self, ha: usize, hb: usize) {
        self.ha = ha;
        self.hb = hb;
    }

    pub fn tables(&mut self, ta: &'a Table, tb: &'a Table) {
        self.ta = Some(ta);
        self.tb = Some(tb);
    }

    pub fn headers(&mut self, ia: usize, ib: usize) {
        self.ia = ia;
        self.ib = ib;
    }

    /// Pair `a` with `b`, replacing any stale pairing of either endpoint
    /// so the maps stay a bijection.
    pub fn link(&mut self, a: usize, b: usize) {
        if let Some(old_b) = self.map_a2b.insert(a, b) {
            if old_b != b {
                self.map_b2a.remove(&old_b);
            }
        }
        if let Some(old_a) = self.map_b2a.insert(b, a) {
            if old_a != a {
                self.map_a2b.remove(&old_a);
            }
        }
    }

    pub fn a2b(&self, a: usize) -> Option<usize> {
        self.map_a2b.get(&a).copied()
    }

    pub fn b2a(&self, b: usize) -> Option<usize> {
        self.map_b2a.get(&b).copied()
    }

    /// Number of linked pairs.
    pub fn count(&self) -> usize {
        self.map_a2b.len()
    }

    pub fn source(&self) -> Option<&'a Table> {
        self.ta
    }

    pub fn target(&self) -> Option<&'a Table> {
        self.tb
    }

    pub fn source_header(&self) -> usize {
        self.ia
    }

    pub fn target_header(&self) -> usize {
        self.ib
    }

    pub fn source_height(&self) -> usize {
        self.ha
    }

    pub fn target_height(&self) -> usize {
        self.hb
    }

    /// Column alignment when this one is rows (and vice versa).
    pub fn meta(&self) -> Option<&Alignment<'a>> {
        self.meta.as_deref()
    }

    pub fn reference(&self) -> Option<&Alignment<'a>> {
        self.reference.as_deref()
    }

    /// Install the parent-side alignment for 3-way comparison. Any
    /// ordering derived before this point described a 2-way view and is
    /// invalidated.
    pub fn set_reference(&mut self, reference: Alignment<'a>) {
        self.order_cache = None;
        self.reference = Some(Box::new(reference));
    }

    /// The merged ordering, memoized.
    pub fn to_order(&mut self) -> Result<&Ordering, DiffError> {
        if self.order_cache.is_none() {
            let order = self.merge_order()?;
            self.order_cache = Some(order);
        }
        Ok(self.order_cache.get_or_insert_with(Ordering::new))
    }

    /// Interleave parent, local, and remote indices into one sequence.
    ///
    /// Self maps parent to remote (or local to remote with no parent);
    /// `reference` maps parent to local. Without a reference, a synthetic
    /// identity reference stands in and the emitted units drop the parent
    /// axis.
    fn merge_order(&self) -> Result<Ordering, DiffError> {
        let identity;
        let reference = match self.reference.as_deref() {
            Some(r) => r,
            None => {
                identity = self.identity_reference();
                &identity
            }
        };
        let mut order = Ordering::new();
        if self.reference.is_none() {
            order.ignore_parent();
        }
        let mut state = MergeState::new(self.ha, reference.hb, self.hb, order);
        while state.remaining() {
            state.step(self, reference)?;
        }
        Ok(state.finish())
    }

    fn identity_reference(&self) -> Alignment<'a> {
        let mut reference = Alignment::new();
        reference.range(self.ha, self.ha);
        if let Some(ta) = self.ta {
            reference.tables(ta, ta);
        }
        for i in 0..self.ha {
            reference.link(i, i);
        }
        reference
    }
}

/// Cursor state for the three-way ordering merge.
///
/// One cursor and one pending set per axis: `p` parent, `l` local, `r`
/// remote. Cursors wrap modulo their height; the pending sets drive the
/// loop and guarantee each index is emitted exactly once.
struct MergeState {
    xp: usize,
    xl: usize,
    xr: usize,
    hp: usize,
    hl: usize,
    hr: usize,
    vp: FxHashSet<usize>,
    vl: FxHashSet<usize>,
    vr: FxHashSet<usize>,
    prev: Option<usize>,
    iterations: usize,
    cap: usize,
    order: Ordering,
}

impl MergeState {
    fn new(hp: usize, hl: usize, hr: usize, order: Ordering) -> Self {
        MergeState {
            xp: 0,
            xl: 0,
            xr: 0,
            hp,
            hl,
            hr,
            vp: (0..hp).collect(),
            vl: (0..hl).collect(),
            vr: (0..hr).collect(),
            prev: None,
            iterations: 0,
            cap: (hp + hl + hr) * 10,
            order,
        }
    }

    fn remaining(&self) -> bool {
        !self.vp.is_empty() || !self.vl.is_empty() || !self.vr.is_empty()
    }

    fn finish(self) -> Ordering {
        self.order
    }

    /// One merge iteration: try each rule in priority order, emit at most
    /// one unit, advance at least one cursor.
    fn step(&mut self, align: &Alignment, reference: &Alignment) -> Result<(), DiffError> {
        self.iterations += 1;
        if self.iterations > self.cap {
            return Err(DiffError::OrderingStalled { cap: self.cap });
        }
        if self.xp >= self.hp {
            self.xp = 0;
        }
        if self.xl >= self.hl {
            self.xl = 0;
        }
        if self.xr >= self.hr {
            self.xr = 0;
        }

        // Parent row gone from both sides.
        if self.xp < self.hp
            && !self.vp.is_empty()
            && align.a2b(self.xp).is_none()
            && reference.a2b(self.xp).is_none()
        {
            if self.vp.remove(&self.xp) {
                self.order.add(None, None, Some(self.xp));
                self.prev = Some(self.xp);
            }
            self.xp += 1;
            return Ok(());
        }

        // Local insertion: no parent counterpart.
        let mut zl = None;
        if self.xl < self.hl && !self.vl.is_empty() {
            zl = reference.b2a(self.xl);
            if zl.is_none() {
                if self.vl.remove(&self.xl) {
                    self.order.add(Some(self.xl), None, None);
                }
                self.xl += 1;
                return Ok(());
            }
        }

        // Remote insertion: no parent counterpart.
        let mut zr = None;
        if self.xr < self.hr && !self.vr.is_empty() {
            zr = align.b2a(self.xr);
            if zr.is_none() {
                if self.vr.remove(&self.xr) {
                    self.order.add(None, Some(self.xr), None);
                }
                self.xr += 1;
                return Ok(());
            }
        }

        // Local row whose parent is unmatched on the remote side.
        if let Some(zl) = zl {
            if align.a2b(zl).is_none() {
                if self.vl.remove(&self.xl) {
                    self.order.add(Some(self.xl), None, Some(zl));
                    self.prev = Some(zl);
                    self.vp.remove(&zl);
                    self.xp = zl + 1;
                }
                self.xl += 1;
                return Ok(());
            }
        }

        // Remote row whose parent is unmatched on the local side.
        if let Some(zr) = zr {
            if reference.a2b(zr).is_none() {
                if self.vr.remove(&self.xr) {
                    self.order.add(None, Some(self.xr), Some(zr));
                    self.prev = Some(zr);
                    self.vp.remove(&zr);
                    self.xp = zr + 1;
                }
                self.xr += 1;
                return Ok(());
            }
        }

        // Both sides resolve through the parent; keep whichever runs on
        // from the last emitted parent row.
        if let (Some(zl), Some(zr)) = (zl, zr) {
            if let (Some(r_of_zl), Some(l_of_zr)) = (align.a2b(zl), reference.a2b(zr)) {
                let next = self.prev.map_or(0, |p| p + 1);
                if zl == next || zr != next {
                    if self.vr.remove(&self.xr) {
                        self.order.add(Some(l_of_zr), Some(self.xr), Some(zr));
                        self.prev = Some(zr);
                        self.vp.remove(&zr);
                        self.vl.remove(&l_of_zr);
                        self.xp = zr + 1;
                        self.xl = l_of_zr + 1;
                    }
                    self.xr += 1;
                } else {
                    if self.vl.remove(&self.xl) {
                        self.order.add(Some(self.xl), Some(r_of_zl), Some(zl));
                        self.prev = Some(zl);
                        self.vp.remove(&zl);
                        self.vr.remove(&r_of_zl);
                        self.xp = zl + 1;
                        self.xr = r_of_zl + 1;
                    }
                    self.xl += 1;
                }
                return Ok(());
            }
        }

        // Stall-breaker.
        self.xp += 1;
        self.xl += 1;
        self.xr += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::Unit;

    #[test]
    fn link_keeps_the_bijection_clean() {
        let mut align = Alignment::new();
        align.link(0, 5);
        align.link(1, 5);
        assert_eq!(align.a2b(0), None);
        assert_eq!(align.a2b(1), Some(5));
        assert_eq!(align.b2a(5), Some(1));
        assert_eq!(align.count(), 1);

        align.link(1, 6);
        assert_eq!(align.b2a(5), None);
        assert_eq!(align.a2b(1), Some(6));
        assert_eq!(align.count(), 1);
    }

    #[test]
    fn identity_alignment_orders_straight_through() {
        let mut align = Alignment::new();
        align.range(3, 3);
        for i in 0..3 {
            align.link(i, i);
        }
        let order = align.to_order().expect("merge identity");
        let units: Vec<Unit> = order.units().to_vec();
        assert_eq!(
            units,
            vec![
                Unit::pair(Some(0), Some(0)),
                Unit::pair(Some(1), Some(1)),
                Unit::pair(Some(2), Some(2)),
            ]
        );
    }

    #[test]
    fn unmatched_rows_emit_inserts_and_deletes() {
        // Source has 2 rows, target has 3; only row 0 matches.
        let mut align = Alignment::new();
        align.range(2, 3);
        align.link(0, 0);
        align.link(1, 2);
        let order = align.to_order().expect("merge");
        let units = order.units();
        // Target row 1 appears with no source side.
        assert!(units.contains(&Unit::pair(None, Some(1))));
        // Every source and target index appears exactly once.
        let mut sources: Vec<usize> = units.iter().filter_map(|u| u.l).collect();
        let mut targets: Vec<usize> = units.iter().filter_map(|u| u.r).collect();
        sources.sort_unstable();
        targets.sort_unstable();
        assert_eq!(sources, vec![0, 1]);
        assert_eq!(targets, vec![0, 1, 2]);
    }

    #[test]
    fn three_way_merge_covers_every_axis_once() {
        // Parent 3 rows; local drops row 1; remote appends a row.
        let mut align = Alignment::new();
        align.range(3, 4);
        align.link(0, 0);
        align.link(1, 1);
        align.link(2, 2);

        let mut reference = Alignment::new();
        reference.range(3, 2);
        reference.link(0, 0);
        reference.link(2, 1);
        align.set_reference(reference);

        let order = align.to_order().expect("3-way merge");
        let units = order.units();
        let mut parents: Vec<usize> = units.iter().filter_map(|u| u.p).collect();
        let mut locals: Vec<usize> = units.iter().filter_map(|u| u.l).collect();
        let mut remotes: Vec<usize> = units.iter().filter_map(|u| u.r).collect();
        parents.sort_unstable();
        locals.sort_unstable();
        remotes.sort_unstable();
        assert_eq!(parents, vec![0, 1, 2]);
        assert_eq!(locals, vec![0, 1]);
        assert_eq!(remotes, vec![0, 1, 2, 3]);
        // Parent row 1 must read as deleted locally, kept remotely.
        assert!(units.contains(&Unit::triple(None, Some(1), Some(1))));
    }

    #[test]
    fn installing_a_reference_invalidates_the_memo() {
        let mut align = Alignment::new();
        align.range(2, 2);
        align.link(0, 0);
        align.link(1, 1);
        let first = align.to_order().expect("2-way order").clone();
        assert!(first.is_ignoring_parent());

        let mut reference = Alignment::new();
        reference.range(2, 2);
        reference.link(0, 0);
        reference.link(1, 1);
        align.set_reference(reference);
        let second = align.to_order().expect("3-way order");
        assert!(!second.is_ignoring_parent());
        assert!(second.units().iter().all(|u| u.parent_tracked()));
    }

    #[test]
    fn empty_alignment_orders_to_nothing() {
        let mut align = Alignment::new();
        let order = align.to_order().expect("empty merge");
        assert!(order.is_empty());
    }
}
