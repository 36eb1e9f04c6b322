//! Merged row/column sequences.
//!
//! A `Unit` records where one logical row (or column) sits in the local,
//! remote, and parent tables; an `Ordering` is the merged sequence of
//! units covering every index of every participating table exactly once.
//! Units have a compact text form (`l:r`, or `p|l:r` with a parent, `-`
//! for absent) used by the reorder annotations in hilite output.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub l: Option<usize>,
    pub r: Option<usize>,
    pub p: Option<usize>,
    parent_tracked: bool,
}

impl Unit {
    /// Two-way unit; the parent axis carries no meaning.
    pub fn pair(l: Option<usize>, r: Option<usize>) -> Self {
        Unit {
            l,
            r,
            p: None,
            parent_tracked: false,
        }
    }

    /// Three-way unit; `p: None` means the row is absent from the parent.
    pub fn triple(l: Option<usize>, r: Option<usize>, p: Option<usize>) -> Self {
        Unit {
            l,
            r,
            p,
            parent_tracked: true,
        }
    }

    pub fn parent_tracked(&self) -> bool {
        self.parent_tracked
    }

    /// The parent index when tracked, otherwise the local index.
    ///
    /// This is the "was it there before" side: against it, `r` decides
    /// whether a unit is an insertion, a deletion, or a survivor.
    pub fn local_or_parent(&self) -> Option<usize> {
        if self.parent_tracked {
            self.p
        } else {
            self.l
        }
    }
}

fn describe(i: Option<usize>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match i {
        Some(v) => write!(f, "{}", v),
        None => f.write_str("-"),
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parent_tracked {
            describe(self.p, f)?;
            f.write_str("|")?;
        }
        describe(self.l, f)?;
        f.write_str(":")?;
        describe(self.r, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed unit string (expected `l:r` or `p|l:r`, with `-` for absent)")]
pub struct UnitParseError;

impl FromStr for Unit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        fn field(s: &str) -> Result<Option<usize>, UnitParseError> {
            if s == "-" {
                return Ok(None);
            }
            s.parse::<usize>().map(Some).map_err(|_| UnitParseError)
        }
        let (parent, rest) = match s.split_once('|') {
            Some((p, rest)) => (Some(field(p)?), rest),
            None => (None, s),
        };
        let (l, r) = rest.split_once(':').ok_or(UnitParseError)?;
        let l = field(l)?;
        let r = field(r)?;
        Ok(match parent {
            Some(p) => Unit::triple(l, r, p),
            None => Unit::pair(l, r),
        })
    }
}

/// Ordered sequence of units, as produced by the alignment merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ordering {
    units: Vec<Unit>,
    ignore_parent: bool,
}

impl Ordering {
    pub fn new() -> Self {
        Ordering::default()
    }

    /// Record all further units without a parent axis. Set before the
    /// merge when the comparison is 2-way.
    pub fn ignore_parent(&mut self) {
        self.ignore_parent = true;
    }

    pub fn is_ignoring_parent(&self) -> bool {
        self.ignore_parent
    }

    pub fn add(&mut self, l: Option<usize>, r: Option<usize>, p: Option<usize>) {
        let unit = if self.ignore_parent {
            Unit::pair(l, r)
        } else {
            Unit::triple(l, r, p)
        };
        self.units.push(unit);
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, unit) in self.units.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_dash_for_absent() {
        assert_eq!(Unit::pair(Some(3), None).to_string(), "3:-");
        assert_eq!(Unit::triple(Some(1), Some(2), None).to_string(), "-|1:2");
        assert_eq!(Unit::triple(None, Some(0), Some(4)).to_string(), "4|-:0");
    }

    #[test]
    fn parse_round_trips_both_forms() {
        for txt in ["0:1", "3:-", "-:2", "4|-:0", "-|1:2"] {
            let unit: Unit = txt.parse().expect("parse unit");
            assert_eq!(unit.to_string(), txt);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Unit>().is_err());
        assert!("1".parse::<Unit>().is_err());
        assert!("a:b".parse::<Unit>().is_err());
        assert!("1|2".parse::<Unit>().is_err());
    }

    #[test]
    fn local_or_parent_prefers_tracked_parent() {
        assert_eq!(
            Unit::triple(Some(1), Some(2), Some(7)).local_or_parent(),
            Some(7)
        );
        assert_eq!(Unit::triple(Some(1), Some(2), None).local_or_parent(), None);
        assert_eq!(Unit::pair(Some(1), Some(2)).local_or_parent(), Some(1));
    }

    #[test]
    fn ignore_parent_strips_the_parent_axis_from_adds() {
        let mut order = Ordering::new();
        order.ignore_parent();
        order.add(Some(0), Some(0), Some(5));
        assert_eq!(order.units()[0], Unit::pair(Some(0), Some(0)));
        assert!(!order.units()[0].parent_tracked());
    }

    #[test]
    fn display_joins_units_with_commas() {
        let mut order = Ordering::new();
        order.ignore_parent();
        order.add(Some(0), Some(0), None);
        order.add(Some(1), None, None);
        assert_eq!(order.to_string(), "0:0, 1:-");
    }
}
