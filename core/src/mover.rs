//! Greedy move extraction over matched sequence positions.
//!
//! Given the matched `(l, r)` pairs of an ordering, find which source
//! positions must be flagged as moved for the diff to read sensibly.
//! Contiguous runs that keep their relative order form blocks; the
//! longest block anchors, and any block on the wrong side of the anchor
//! is reported wholesale. A greedy approximation, not a minimum-move
//! solver: the output is advisory annotation only.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ordering::Unit;

/// Unit indices (into `units`) that moved between the `l` and `r` axes.
pub(crate) fn move_units(units: &[Unit]) -> Vec<usize> {
    let mut in_src: FxHashMap<usize, usize> = FxHashMap::default();
    let mut in_dest: FxHashMap<usize, usize> = FxHashMap::default();
    let mut ltop = 0;
    let mut rtop = 0;
    for (i, unit) in units.iter().enumerate() {
        if let (Some(l), Some(r)) = (unit.l, unit.r) {
            ltop = ltop.max(l + 1);
            rtop = rtop.max(r + 1);
            in_src.insert(l, i);
            in_dest.insert(r, i);
        }
    }
    let isrc: Vec<usize> = (0..ltop).filter_map(|i| in_src.get(&i).copied()).collect();
    let idest: Vec<usize> = (0..rtop).filter_map(|i| in_dest.get(&i).copied()).collect();
    move_without_extras(&isrc, &idest).unwrap_or_default()
}

/// Like [`move_without_extras`], but first drops items present on only
/// one side.
pub(crate) fn move_with_extras(isrc: &[usize], idest: &[usize]) -> Option<Vec<usize>> {
    let in_src: FxHashSet<usize> = isrc.iter().copied().collect();
    let in_dest: FxHashSet<usize> = idest.iter().copied().collect();
    let src: Vec<usize> = isrc
        .iter()
        .copied()
        .filter(|v| in_dest.contains(v))
        .collect();
    let dest: Vec<usize> = idest
        .iter()
        .copied()
        .filter(|v| in_src.contains(v))
        .collect();
    move_without_extras(&src, &dest)
}

struct Block {
    len: usize,
    src_loc: usize,
    dest_loc: usize,
}

/// `src` and `dest` hold the same items in their respective orders.
/// Returns the moved items, or `None` when the inputs do not describe a
/// permutation of one another.
pub(crate) fn move_without_extras(src: &[usize], dest: &[usize]) -> Option<Vec<usize>> {
    if src.len() != dest.len() {
        return None;
    }
    if src.len() <= 1 {
        return Some(Vec::new());
    }
    let in_src: FxHashMap<usize, usize> = src.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    // Walk the destination, cutting a new block whenever the source
    // position stops being consecutive.
    let mut blocks: Vec<Block> = Vec::new();
    let mut in_cursor: Option<usize> = None;
    for (out_cursor, v) in dest.iter().enumerate() {
        let next = *in_src.get(v)?;
        let continues = matches!(in_cursor, Some(c) if next == c + 1);
        if continues {
            if let Some(last) = blocks.last_mut() {
                last.len += 1;
            }
        } else {
            blocks.push(Block {
                len: 1,
                src_loc: next,
                dest_loc: out_cursor,
            });
        }
        in_cursor = Some(next);
    }

    // Longest first; the stable sort keeps first-seen order on ties.
    blocks.sort_by_key(|b| std::cmp::Reverse(b.len));

    let mut moved = Vec::new();
    while !blocks.is_empty() {
        let anchor = blocks.remove(0);
        let mut i = blocks.len();
        while i > 0 {
            i -= 1;
            let to_left_src = blocks[i].src_loc < anchor.src_loc;
            let to_left_dest = blocks[i].dest_loc < anchor.dest_loc;
            if to_left_src != to_left_dest {
                let gone = blocks.remove(i);
                for j in 0..gone.len {
                    moved.push(src[gone.src_loc + j]);
                }
            }
        }
    }
    Some(moved)
}
