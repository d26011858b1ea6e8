use cu::pre::*;

pub type In<'i> = gimli::EndianSlice<'i, gimli::LittleEndian>;
pub type Tag = gimli::DwTag;

/// Global offset of a DIE: the byte offset of its compilation unit within
/// `.debug_info` plus the DIE's offset local to that unit. Unique across the
/// whole binary, used to identify declaration/definition DIE pairs.
pub type Goff = u64;

/// Offset of a DIE local to its compilation unit, as gimli hands them out
/// when resolving `DW_FORM_ref*` attributes.
#[rustfmt::skip]
#[derive(
    DebugCustom, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord,
    Into, Display
)]
#[display("local(0x{:08x})", self.0)]
#[debug("local(0x{:08x})", self.0)]
pub struct Loff(usize);

impl From<gimli::UnitOffset<usize>> for Loff {
    fn from(value: gimli::UnitOffset<usize>) -> Self {
        Self(value.0)
    }
}

impl From<Loff> for gimli::UnitOffset<usize> {
    fn from(value: Loff) -> Self {
        Self(value.0)
    }
}

impl Loff {
    /// Convert unit-local offset to a global offset by adding the offset of
    /// the unit it belongs to.
    #[inline(always)]
    pub fn to_global(self, unit_offset: Goff) -> Goff {
        self.0 as Goff + unit_offset
    }

    /// Build a `Loff` from a raw unit-local offset value, e.g. a global
    /// offset minus its unit's base offset.
    #[inline(always)]
    pub fn from_usize(v: usize) -> Self {
        Self(v)
    }
}
