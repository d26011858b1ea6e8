use std::borrow::Cow;
use std::sync::Arc;

use cu::pre::*;
use gimli::{Abbreviations, AttributeValue, DwAt, Operation, UnitSectionOffset};

use crate::dwarf::{Die, Dwarf, EntriesTree, Goff, In, Loff};

pub struct UnitIter {
    pub(crate) debug_info_iter: gimli::DebugInfoUnitHeadersIter<In<'static>>,
    pub(crate) dwarf: Arc<Dwarf>,
}

impl UnitIter {
    pub fn next_unit(&mut self) -> cu::Result<Option<Unit>> {
        let header = cu::check!(
            self.debug_info_iter.next(),
            "failed to read next unit header"
        )?;
        let Some(header) = header else {
            return Ok(None);
        };
        let offset = match header.offset() {
            UnitSectionOffset::DebugInfoOffset(o) => o.0,
            UnitSectionOffset::DebugTypesOffset(o) => {
                cu::bail!(
                    "failed to get DWARF offset for compilation unit: expecting DebugInfoOffset, got {o:?}"
                );
            }
        };
        let unit = cu::check!(
            gimli::Unit::new(&self.dwarf.dwarf, header),
            "failed to create debug info unit"
        )?;
        let abbrevs = cu::check!(
            header.abbreviations(&self.dwarf.dwarf.debug_abbrev),
            "failed to create debug info unit abbrevs"
        )?;
        let mut unit = Unit {
            unit,
            header,
            abbrevs,
            dwarf: Arc::clone(&self.dwarf),
            name: String::new(),
            offset: offset as Goff,
        };

        let mut tree = cu::check!(
            unit.tree(),
            "failed to parse root node when creating debug info unit"
        )?;
        let root = cu::check!(
            tree.root(),
            "failed to parse root node when creating debug info unit"
        )?;
        let entry = root.entry();
        let name = cu::check!(entry.name(), "failed to get name of compilation unit")?;
        unit.name = name.to_string();
        Ok(Some(unit))
    }
}

/// Holder of a Unit in .debug_info
#[derive(Display)]
#[display("compilation unit at {} ({})", self.offset, self.name)]
pub struct Unit {
    unit: gimli::Unit<In<'static>>,
    header: gimli::UnitHeader<In<'static>>,
    abbrevs: Abbreviations,
    dwarf: Arc<Dwarf>,
    /// name of the unit (typically file name)
    pub name: String,
    /// global byte offset of the unit in `.debug_info`
    pub offset: Goff,
}

impl Unit {
    pub fn tree(&self) -> cu::Result<EntriesTree<'_>> {
        self.entries_tree(None)
    }
    pub fn tree_at(&self, loff: Loff) -> cu::Result<EntriesTree<'_>> {
        self.entries_tree(Some(loff))
    }
    fn entries_tree(&self, loff: Option<Loff>) -> cu::Result<EntriesTree<'_>> {
        let tree = match loff {
            None => cu::check!(
                self.unit.entries_tree(None),
                "failed to parse root for {self}"
            )?,
            Some(loff) => cu::check!(
                self.unit.entries_tree(Some(loff.into())),
                "failed to parse tree at {} for {self}",
                self.goff(loff)
            )?,
        };
        Ok(EntriesTree { unit: self, tree })
    }

    /// Get a single entry at offset
    pub fn entry_at<'x>(&'x self, loff: Loff) -> cu::Result<Die<'x, 'x>> {
        let entry = self.unit.entry(loff.into());
        let entry = cu::check!(
            entry,
            "failed to read entry at {} for {self}",
            self.goff(loff)
        )?;
        Ok(Die {
            unit: self,
            entry: Cow::Owned(entry),
        })
    }

    /// Convert local offset in this compilation unit to global offset
    pub fn goff(&self, loff: Loff) -> Goff {
        loff.to_global(self.offset)
    }

    /// Get the statement-list offset (`DW_AT_stmt_list`) of the CU's root
    /// DIE, if present, for line-program (file table) parsing.
    pub fn stmt_list_offset(&self) -> cu::Result<Option<u64>> {
        let mut tree = self.tree()?;
        let root = tree.root()?;
        root.entry().uint_opt(gimli::constants::DW_AT_stmt_list)
    }

    /// The `DW_AT_comp_dir` of the CU's root DIE.
    pub fn comp_dir(&self) -> cu::Result<Option<String>> {
        let mut tree = self.tree()?;
        let root = tree.root()?;
        Ok(root.entry().str_opt(gimli::constants::DW_AT_comp_dir)?.map(str::to_string))
    }

    /// The `DW_AT_name` of the CU's root DIE (the primary source file).
    pub fn primary_source_name(&self) -> cu::Result<Option<String>> {
        let mut tree = self.tree()?;
        let root = tree.root()?;
        Ok(root.entry().name_opt()?.map(str::to_string))
    }

    pub(crate) fn header(&self) -> &gimli::UnitHeader<In<'static>> {
        &self.header
    }

    pub(crate) fn dwarf(&self) -> &gimli::Dwarf<In<'static>> {
        &self.dwarf.dwarf
    }

    pub(crate) fn encoding(&self) -> gimli::Encoding {
        self.unit.encoding()
    }

    /// Get an attribute value as string
    pub(crate) fn attr_string<'x>(
        &'x self,
        value: AttributeValue<In<'static>>,
    ) -> cu::Result<&'x str> {
        let value = cu::check!(
            self.dwarf.dwarf.attr_string(&self.unit, value),
            "failed to get attribute value as string in {self}"
        )?;
        cu::check!(
            value.to_string(),
            "failed to decode attribute value as string in {self}"
        )
    }
    /// Get an attribute value as signed integer
    pub(crate) fn attr_signed(
        &self,
        offset: Goff,
        at: DwAt,
        attr: AttributeValue<In<'_>>,
    ) -> cu::Result<i64> {
        match attr {
            AttributeValue::Data1(x) => Ok(x as i64),
            AttributeValue::Data2(x) => Ok(x as i64),
            AttributeValue::Data4(x) => Ok(x as i64),
            AttributeValue::Data8(x) => Ok(x as i64),
            AttributeValue::Udata(x) => Ok(x as i64),
            AttributeValue::Sdata(x) => Ok(x),
            _ => cu::bail!("expecting signed data for entry {offset:#x}, attr {at}"),
        }
    }
    /// Get an attribute value as unsigned integer
    pub(crate) fn attr_unsigned(
        &self,
        offset: Goff,
        at: DwAt,
        attr: AttributeValue<In<'_>>,
    ) -> cu::Result<u64> {
        match attr {
            AttributeValue::Data1(x) => Ok(x as u64),
            AttributeValue::Data2(x) => Ok(x as u64),
            AttributeValue::Data4(x) => Ok(x as u64),
            AttributeValue::Data8(x) => Ok(x),
            AttributeValue::Udata(x) => Ok(x),
            AttributeValue::Addr(x) => Ok(x),
            // DWARF5 emits DW_AT_stmt_list as DW_FORM_sec_offset, which gimli
            // parses into this variant rather than a plain integer form.
            AttributeValue::DebugLineRef(offset) => Ok(offset.0 as u64),
            // DWARF5 represents DW_AT_decl_file as DW_FORM_udata but gimli
            // tags it with this variant instead of a plain Udata.
            AttributeValue::FileIndex(x) => Ok(x),
            // DW_AT_accessibility is DW_FORM_data1 but gimli tags it with
            // this variant rather than a plain Data1.
            AttributeValue::Accessibility(access) => Ok(access.0 as u64),
            // used for vtable elem location, unused elsewhere but cheap to support
            AttributeValue::Exprloc(expr) => {
                let mut ops = expr.operations(self.unit.encoding());
                let op = cu::check!(
                    ops.next(),
                    "failed to read Exprloc ops for entry {offset:#x}, attr {at}"
                )?;
                let op = cu::check!(
                    op,
                    "expecting an Exprloc op for entry {offset:#x}, attr {at}"
                )?;
                let Operation::UnsignedConstant { value } = op else {
                    cu::bail!(
                        "expecting UnsignedConstant for Exprloc ops for entry {offset:#x}, attr {at}"
                    );
                };
                Ok(value)
            }
            other => {
                cu::bail!(
                    "expecting unsigned data for entry {offset:#x}, attr {at}, got: {other:?}"
                )
            }
        }
    }
}
