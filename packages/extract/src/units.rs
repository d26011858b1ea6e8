use crate::dwarf::{Die, Goff, Loff, Unit};

/// All compilation units of a binary, kept in ascending `.debug_info` offset
/// order (the order `UnitIter` naturally produces them in), supporting
/// lookup of a DIE from a bare global offset regardless of which unit it
/// lives in. Needed to resolve cross-CU `DW_AT_specification`/`DW_AT_type`
/// references, which gimli only hands back as global offsets.
pub struct Units(Vec<Unit>);

impl Units {
    pub fn new(units: Vec<Unit>) -> Self {
        debug_assert!(units.windows(2).all(|w| w[0].offset <= w[1].offset));
        Self(units)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The unit whose `.debug_info` span contains `goff`.
    pub fn find(&self, goff: Goff) -> Option<&Unit> {
        let idx = match self.0.binary_search_by(|u| u.offset.cmp(&goff)) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        Some(&self.0[idx])
    }

    /// Resolve a global offset into the DIE it names, searching across all
    /// units. Returns `Ok(None)` if no unit claims the offset or the offset
    /// does not land on an entry (a malformed reference, tolerated rather
    /// than treated as fatal).
    pub fn die_at(&self, goff: Goff) -> cu::Result<Option<Die<'_, '_>>> {
        let Some(unit) = self.find(goff) else {
            return Ok(None);
        };
        let local = goff - unit.offset;
        let loff = Loff::from_usize(local as usize);
        match unit.entry_at(loff) {
            Ok(die) => Ok(Some(die)),
            Err(_) => Ok(None),
        }
    }
}
