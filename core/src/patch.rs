//! Patch application.
//!
//! [`HighlightPatch`] reconstructs a modified table by replaying a
//! diff table (the output of [`TableDiff::hilite`](crate::TableDiff))
//! against a source table, in place. Rows and columns are matched back
//! to the source by content through the same composite-key indexes the
//! aligner uses, so the patch does not need to carry row numbers.

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::action::ActionKind;
use crate::compare::{CompareTable, TableComparisonState};
use crate::csv::Csv;
use crate::diff::DiffError;
use crate::error_codes;
use crate::index::{IndexPair, RowContent};
use crate::render::{examine_cell, CellInfo};
use crate::table::Table;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PatchError {
    #[error(
        "[TBLDIFF_PATCH_001] Could not index the source table for patch row lookup. \
         Suggestion: the self-alignment of the source failed; see: {0}"
    )]
    SourceLookup(#[from] DiffError),
}

impl PatchError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            PatchError::SourceLookup(_) => error_codes::PATCH_SOURCE_LOOKUP,
        }
    }
}

/// Disposition of one patch row or column while the patch is applied.
#[derive(Debug, Clone, Copy)]
struct PatchUnit {
    code: ActionKind,
    add: bool,
    rem: bool,
    update: bool,
    source_row: Option<usize>,
    source_row_offset: usize,
    source_prev_row: Option<usize>,
    source_next_row: Option<usize>,
    dest_row: Option<usize>,
    patch_row: Option<usize>,
}

impl Default for PatchUnit {
    fn default() -> Self {
        PatchUnit {
            code: ActionKind::Plain,
            add: false,
            rem: false,
            update: false,
            source_row: None,
            source_row_offset: 0,
            source_prev_row: None,
            source_next_row: None,
            dest_row: None,
            patch_row: None,
        }
    }
}

/// A patch row posing as a source row for index queries. Cells are
/// pulled from the patch through the source-to-patch column map, with
/// the pre-change half of any `old->new` cell.
struct PatchRowProbe<'p> {
    patch: &'p Table,
    row: usize,
    row_info: CellInfo,
    source_in_patch_col: &'p FxHashMap<usize, usize>,
}

impl RowContent for PatchRowProbe<'_> {
    fn row_string(&self, col: usize) -> Option<String> {
        let at = match self.source_in_patch_col.get(&col) {
            Some(&at) => at,
            None => return Some("NOT_FOUND".to_string()),
        };
        let txt = self.patch.cell_text(at, self.row);
        if !self.row_info.updated {
            return Some(txt.to_string());
        }
        let cell = examine_cell(txt, "", &self.row_info.value);
        if !cell.updated {
            return Some(txt.to_string());
        }
        Some(cell.lvalue.unwrap_or_default())
    }
}

pub struct HighlightPatch<'a> {
    source: &'a mut Table,
    patch: &'a Table,
    header: FxHashMap<usize, String>,
    header_pre: FxHashMap<String, usize>,
    header_post: FxHashMap<String, usize>,
    header_rename: FxHashMap<String, String>,
    header_move: Option<FxHashSet<String>>,
    modifier: FxHashMap<usize, String>,
    mods: Vec<PatchUnit>,
    cmods: Vec<PatchUnit>,
    csv: Csv,
    rc_offset: usize,
    current_row: usize,
    source_in_patch_col: Option<FxHashMap<usize, usize>>,
    patch_in_source_col: Option<FxHashMap<usize, usize>>,
    patch_in_source_row: FxHashMap<isize, Option<usize>>,
    indexes: Option<Vec<IndexPair>>,
    last_source_row: Option<usize>,
    actions: Vec<String>,
    payload_col: usize,
    payload_top: usize,
    row_permutation: Vec<Option<usize>>,
    col_permutation: Vec<Option<usize>>,
}

impl<'a> HighlightPatch<'a> {
    pub fn new(source: &'a mut Table, patch: &'a Table) -> Self {
        HighlightPatch {
            source,
            patch,
            header: FxHashMap::default(),
            header_pre: FxHashMap::default(),
            header_post: FxHashMap::default(),
            header_rename: FxHashMap::default(),
            header_move: None,
            modifier: FxHashMap::default(),
            mods: Vec::new(),
            cmods: Vec::new(),
            csv: Csv::new(),
            rc_offset: 0,
            current_row: 0,
            source_in_patch_col: None,
            patch_in_source_col: None,
            patch_in_source_row: FxHashMap::default(),
            indexes: None,
            last_source_row: None,
            actions: Vec::new(),
            payload_col: 0,
            payload_top: 0,
            row_permutation: Vec::new(),
            col_permutation: Vec::new(),
        }
    }

    /// Replay the patch against the source table. Patches narrower
    /// than two columns or with no rows are treated as empty and leave
    /// the source untouched.
    pub fn apply(&mut self) -> Result<(), PatchError> {
        self.reset();
        if self.patch.width() < 2 || self.patch.height() < 1 {
            return Ok(());
        }
        let corner = self.patch.cell_text(0, 0);
        self.rc_offset = if corner == "@:@" { 1 } else { 0 };
        self.payload_col = 1 + self.rc_offset;
        self.payload_top = self.patch.width();
        for r in 0..self.patch.height() {
            self.actions
                .push(self.patch.cell_text(self.rc_offset, r).to_string());
        }
        for r in 0..self.patch.height() {
            self.apply_row(r)?;
        }
        self.finish_rows();
        self.finish_columns();
        Ok(())
    }

    fn reset(&mut self) {
        self.header.clear();
        self.header_pre.clear();
        self.header_post.clear();
        self.header_rename.clear();
        self.header_move = None;
        self.modifier.clear();
        self.mods.clear();
        self.cmods.clear();
        self.csv = Csv::new();
        self.rc_offset = 0;
        self.current_row = 0;
        self.source_in_patch_col = None;
        self.patch_in_source_col = None;
        self.patch_in_source_row.clear();
        self.indexes = None;
        self.last_source_row = None;
        self.actions.clear();
        self.row_permutation.clear();
        self.col_permutation.clear();
    }

    fn apply_row(&mut self, r: usize) -> Result<(), PatchError> {
        self.current_row = r;
        let code = self.actions[r].clone();
        if r == 0 && self.rc_offset > 0 {
            return Ok(());
        }
        match ActionKind::classify(&code) {
            ActionKind::Header => {
                self.apply_header()?;
                self.apply_action(ActionKind::Header)?;
            }
            ActionKind::Schema => self.apply_meta(),
            ActionKind::Plain | ActionKind::Skip => self.last_source_row = None,
            kind => self.apply_action(kind)?,
        }
        Ok(())
    }

    fn apply_header(&mut self) -> Result<(), PatchError> {
        for i in self.payload_col..self.payload_top {
            let name = self.patch.cell_text(i, self.current_row).to_string();
            let mut modifier = self.modifier.get(&i).cloned();
            let mut moved = false;
            if let Some(m) = modifier.as_mut() {
                if let Some(stripped) = m.strip_prefix(':') {
                    moved = true;
                    *m = stripped.to_string();
                }
            }
            self.header.insert(i, name.clone());
            if let Some(m) = &modifier {
                if m.starts_with('(') {
                    // "(old)" marks a rename; the header row carries
                    // the new name.
                    let mut inner = m.chars();
                    inner.next();
                    inner.next_back();
                    let prev_name = inner.as_str().to_string();
                    self.header_pre.insert(prev_name.clone(), i);
                    self.header_post.insert(name.clone(), i);
                    self.header_rename.insert(prev_name, name);
                    continue;
                }
            }
            if modifier.as_deref() != Some("+++") {
                self.header_pre.insert(name.clone(), i);
            }
            if modifier.as_deref() != Some("---") {
                self.header_post.insert(name.clone(), i);
            }
            if moved {
                self.header_move
                    .get_or_insert_with(FxHashSet::default)
                    .insert(name);
            }
        }
        if self.source.height() == 0 {
            self.apply_action(ActionKind::Insert)?;
        }
        Ok(())
    }

    fn apply_meta(&mut self) {
        for i in self.payload_col..self.payload_top {
            let name = self.patch.cell_text(i, self.current_row).to_string();
            if name.is_empty() {
                continue;
            }
            self.modifier.insert(i, name);
        }
    }

    fn apply_action(&mut self, code: ActionKind) -> Result<(), PatchError> {
        let mut unit = PatchUnit {
            code,
            add: code == ActionKind::Insert,
            rem: code == ActionKind::Delete,
            update: code == ActionKind::Update,
            ..PatchUnit::default()
        };
        self.need_source_index()?;
        if self.last_source_row.is_none() {
            self.last_source_row = self.look_up(-1);
        }
        unit.source_prev_row = self.last_source_row;
        let next_act: Option<String> = self.actions.get(self.current_row + 1).cloned();
        if next_act.as_deref().map_or(true, |a| a != "+++" && a != "...") {
            unit.source_next_row = self.look_up(1);
        }
        if unit.add {
            let prev_is_add =
                self.current_row > 0 && self.actions[self.current_row - 1] == "+++";
            if !prev_is_add {
                unit.source_prev_row = self.look_up(-1);
            }
            unit.source_row = unit.source_prev_row;
            if unit.source_row.is_some() {
                unit.source_row_offset = 1;
            }
        } else {
            unit.source_row = self.look_up(0);
            self.last_source_row = unit.source_row;
        }
        if next_act.as_deref() == Some("") {
            self.last_source_row = unit.source_next_row;
        }
        unit.patch_row = Some(self.current_row);
        if code == ActionKind::Header {
            unit.source_row = Some(0);
        }
        self.mods.push(unit);
        Ok(())
    }

    /// Find the source row whose content matches patch row
    /// `current_row + del`, trying each stored index in turn and
    /// caching the answer.
    fn look_up(&mut self, del: isize) -> Option<usize> {
        let key = self.current_row as isize + del;
        if let Some(&cached) = self.patch_in_source_row.get(&key) {
            return cached;
        }
        let mut result = None;
        if key >= 0 && (key as usize) < self.patch.height() {
            let row = key as usize;
            if let (Some(indexes), Some(source_in_patch_col)) =
                (&self.indexes, &self.source_in_patch_col)
            {
                let probe = PatchRowProbe {
                    patch: self.patch,
                    row,
                    row_info: row_action_info(self.patch, self.rc_offset, row),
                    source_in_patch_col,
                };
                for idx in indexes {
                    let cross = idx.query_by_content(&probe);
                    if cross.spot_a != 1 {
                        continue;
                    }
                    result = cross.item_a.and_then(|items| items.first()).copied();
                    break;
                }
            }
        }
        self.patch_in_source_row.insert(key, result);
        result
    }

    fn need_source_index(&mut self) -> Result<(), PatchError> {
        if self.indexes.is_some() {
            return Ok(());
        }
        let source: &Table = &*self.source;
        let comp = TableComparisonState::new(None, source, source);
        let mut compare = CompareTable::attach(comp);
        compare.store_indexes();
        compare.align()?;
        self.indexes = compare.take_indexes();
        self.need_source_columns();
        Ok(())
    }

    fn need_source_columns(&mut self) {
        if self.source_in_patch_col.is_some() {
            return;
        }
        let mut s2p = FxHashMap::default();
        let mut p2s = FxHashMap::default();
        for i in 0..self.source.width() {
            let name = self.source.cell_text(i, 0);
            if let Some(&at) = self.header_pre.get(name) {
                s2p.insert(i, at);
                p2s.insert(at, i);
            }
        }
        self.source_in_patch_col = Some(s2p);
        self.patch_in_source_col = Some(p2s);
    }

    fn finish_rows(&mut self) {
        let mut fate = Vec::new();
        self.row_permutation = compute_ordering(&self.mods, self.source.height());
        if !self.row_permutation.is_empty() {
            for unit in &mut self.mods {
                if let Some(r) = unit.source_row {
                    unit.source_row = self.row_permutation.get(r).copied().flatten();
                }
            }
            self.source
                .insert_or_delete_rows(&self.row_permutation, self.row_permutation.len());
        }
        let len = process_mods(&mut self.mods, &mut fate, self.source.height());
        self.source.insert_or_delete_rows(&fate, len);
        let Some(p2s) = &self.patch_in_source_col else {
            return;
        };
        for unit in &self.mods {
            if unit.rem {
                continue;
            }
            if unit.add {
                let (Some(patch_row), Some(dest_row)) = (unit.patch_row, unit.dest_row) else {
                    continue;
                };
                let mut cols: Vec<usize> = self.header_post.values().copied().collect();
                cols.sort_unstable();
                for c in cols {
                    if let Some(&offset) = p2s.get(&c) {
                        let d = self.patch.cell(c, patch_row).map(str::to_owned);
                        self.source.set_cell(offset, dest_row, d);
                    }
                }
            } else if unit.update {
                let (Some(patch_row), Some(dest_row)) = (unit.patch_row, unit.dest_row) else {
                    continue;
                };
                let row_info = row_action_info(self.patch, self.rc_offset, patch_row);
                if !row_info.updated {
                    continue;
                }
                let mut cols: Vec<usize> = self.header_pre.values().copied().collect();
                cols.sort_unstable();
                for c in cols {
                    let txt = self.patch.cell_text(c, patch_row);
                    let cell = examine_cell(txt, "", &row_info.value);
                    if !cell.updated || cell.conflicted {
                        continue;
                    }
                    let d = self.csv.parse_single_cell(&cell.rvalue.unwrap_or_default());
                    if let Some(&offset) = p2s.get(&c) {
                        self.source.set_cell(offset, dest_row, d);
                    }
                }
            }
        }
    }

    fn finish_columns(&mut self) {
        self.need_source_columns();
        for i in self.payload_col..self.payload_top {
            let act = self.modifier.get(&i).cloned().unwrap_or_default();
            let source_col = self
                .patch_in_source_col
                .as_ref()
                .and_then(|p2s| p2s.get(&i))
                .copied();
            match ActionKind::classify(&act) {
                ActionKind::Delete => {
                    self.cmods.push(PatchUnit {
                        code: ActionKind::Delete,
                        rem: true,
                        source_row: source_col,
                        patch_row: Some(i),
                        ..PatchUnit::default()
                    });
                }
                ActionKind::Insert => {
                    let mut unit = PatchUnit {
                        code: ActionKind::Insert,
                        add: true,
                        patch_row: Some(i),
                        ..PatchUnit::default()
                    };
                    unit.source_row = self.cmods.last().and_then(|m| m.source_row);
                    if unit.source_row.is_some() {
                        unit.source_row_offset = 1;
                    }
                    self.cmods.push(unit);
                }
                kind => {
                    self.cmods.push(PatchUnit {
                        code: kind,
                        source_row: source_col,
                        patch_row: Some(i),
                        ..PatchUnit::default()
                    });
                }
            }
        }
        let n = self.cmods.len();
        let mut at: Option<usize> = None;
        let mut rat: Option<usize> = None;
        if n > 0 {
            for i in 0..n - 1 {
                if self.cmods[i].code != ActionKind::Insert
                    && self.cmods[i].code != ActionKind::Delete
                {
                    at = self.cmods[i].source_row;
                }
                self.cmods[i + 1].source_prev_row = at;
                let j = n - 1 - i;
                if self.cmods[j].code != ActionKind::Insert
                    && self.cmods[j].code != ActionKind::Delete
                {
                    rat = self.cmods[j].source_row;
                }
                self.cmods[j - 1].source_next_row = rat;
            }
        }
        let mut fate = Vec::new();
        if self.header_move.is_some() {
            self.col_permutation = compute_ordering(&self.cmods, self.source.width());
            if !self.col_permutation.is_empty() {
                for unit in &mut self.cmods {
                    if let Some(r) = unit.source_row {
                        unit.source_row = self.col_permutation.get(r).copied().flatten();
                    }
                }
                self.source
                    .insert_or_delete_columns(&self.col_permutation, self.col_permutation.len());
            }
        }
        let len = process_mods(&mut self.cmods, &mut fate, self.source.width());
        self.source.insert_or_delete_columns(&fate, len);
        for cmod in &self.cmods {
            if cmod.rem || !cmod.add {
                continue;
            }
            let (Some(cmod_patch), Some(cmod_dest)) = (cmod.patch_row, cmod.dest_row) else {
                continue;
            };
            for unit in &self.mods {
                if let (Some(patch_row), Some(dest_row)) = (unit.patch_row, unit.dest_row) {
                    let d = self.patch.cell(cmod_patch, patch_row).map(str::to_owned);
                    self.source.set_cell(cmod_dest, dest_row, d);
                }
            }
            self.source
                .set_cell(cmod_dest, 0, self.header.get(&cmod_patch).cloned());
        }
        for i in 0..self.source.width() {
            let name = self.source.cell_text(i, 0).to_string();
            let Some(next_name) = self.header_rename.get(&name).cloned() else {
                continue;
            };
            self.source.set_cell(i, 0, Some(next_name));
        }
    }
}

fn row_action_info(patch: &Table, rc_offset: usize, row: usize) -> CellInfo {
    let act = patch.cell_text(rc_offset, row);
    examine_cell(act, "", act)
}

/// Reconstruct a destination order from the prev/next adjacency links
/// recorded on the units. Returns an empty vector when every link is
/// already adjacent, a fate-style permutation otherwise.
fn compute_ordering(mods: &[PatchUnit], dim: usize) -> Vec<Option<usize>> {
    let mut to_unit: FxHashMap<usize, usize> = FxHashMap::default();
    let mut from_unit: FxHashMap<usize, usize> = FxHashMap::default();
    let mut ct = 0;
    for unit in mods {
        if unit.add || unit.rem {
            continue;
        }
        let Some(sr) = unit.source_row else {
            continue;
        };
        if let Some(prev) = unit.source_prev_row {
            to_unit.insert(prev, sr);
            from_unit.insert(sr, prev);
            if prev + 1 != sr {
                ct += 1;
            }
        }
        if let Some(next) = unit.source_next_row {
            to_unit.insert(sr, next);
            from_unit.insert(next, sr);
            if sr + 1 != next {
                ct += 1;
            }
        }
    }
    if ct == 0 {
        return Vec::new();
    }
    let mut meta_from_unit: FxHashMap<usize, usize> = FxHashMap::default();
    let mut starts: std::collections::VecDeque<usize> = std::collections::VecDeque::new();
    for i in 0..dim {
        if let Some(&u) = from_unit.get(&i) {
            meta_from_unit.insert(u, i);
        } else {
            starts.push_back(i);
        }
    }
    let mut used: FxHashSet<usize> = FxHashSet::default();
    let mut rev: Vec<usize> = Vec::with_capacity(dim);
    let mut logical: Option<usize> = None;
    for _ in 0..dim {
        let mut cursor = logical.and_then(|l| meta_from_unit.get(&l).copied());
        if cursor.is_none() {
            cursor = starts.pop_front();
        }
        let mut cur = cursor.unwrap_or(0);
        while used.contains(&cur) {
            cur = (cur + 1) % dim;
        }
        logical = Some(cur);
        rev.push(cur);
        used.insert(cur);
    }
    let mut permutation = vec![None; rev.len()];
    for (i, &r) in rev.iter().enumerate() {
        permutation[r] = Some(i);
    }
    permutation
}

/// Walk the sorted units once, pushing a fate entry per source slot
/// and assigning each unit its destination. Returns the new dimension.
fn process_mods(rmods: &mut [PatchUnit], fate: &mut Vec<Option<usize>>, len: usize) -> usize {
    rmods.sort_by(sort_mods);
    let mut offset: isize = 0;
    let mut last: isize = -1;
    let mut target: usize = 0;
    for unit in rmods.iter_mut() {
        if last != -1 {
            let end = unit
                .source_row
                .map_or(-1, |r| (r + unit.source_row_offset) as isize);
            let mut i = last;
            while i < end {
                fate.push(usize::try_from(i + offset).ok());
                target += 1;
                i += 1;
            }
        }
        if unit.rem {
            fate.push(None);
            offset -= 1;
        } else if unit.add {
            unit.dest_row = Some(target);
            target += 1;
            offset += 1;
        } else {
            unit.dest_row = Some(target);
        }
        if let Some(r) = unit.source_row {
            last = (r + unit.source_row_offset) as isize;
            if unit.rem {
                last += 1;
            }
        } else {
            last = -1;
        }
    }
    if last != -1 {
        let mut i = last;
        while i < len as isize {
            fate.push(usize::try_from(i + offset).ok());
            i += 1;
        }
    }
    usize::try_from(len as isize + offset).unwrap_or(0)
}

fn sort_mods(a: &PatchUnit, b: &PatchUnit) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    if b.code == ActionKind::Header && a.code != ActionKind::Header {
        return Ordering::Greater;
    }
    if a.code == ActionKind::Header && b.code != ActionKind::Header {
        return Ordering::Less;
    }
    if a.source_row.is_none() && !a.add && b.source_row.is_some() {
        return Ordering::Greater;
    }
    if a.source_row.is_some() && !b.add && b.source_row.is_none() {
        return Ordering::Less;
    }
    let pa = a.source_row.map(|r| r + a.source_row_offset);
    let pb = b.source_row.map(|r| r + b.source_row_offset);
    match pa.cmp(&pb) {
        Ordering::Equal => a.patch_row.cmp(&b.patch_row),
        other => other,
    }
}
