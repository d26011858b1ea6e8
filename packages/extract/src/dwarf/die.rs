use std::borrow::Cow;

use cu::pre::*;
use gimli::AttributeValue;
use gimli::Reader;
use gimli::constants::*;

use crate::dwarf::{Goff, In, Loff, Tag, Unit};

pub struct EntriesTree<'x> {
    pub(crate) unit: &'x Unit,
    pub(crate) tree: gimli::EntriesTree<'x, 'x, In<'static>>,
}

impl<'x> EntriesTree<'x> {
    pub fn root(&mut self) -> cu::Result<DieNode<'x, '_>> {
        let node = cu::check!(
            self.tree.root(),
            "failed to parse tree node in {}",
            self.unit
        )?;
        Ok(DieNode {
            unit: self.unit,
            node,
        })
    }
}

pub struct DieNode<'x, 't> {
    pub(crate) node: gimli::EntriesTreeNode<'x, 'x, 't, In<'static>>,
    pub(crate) unit: &'x Unit,
}

impl<'x> DieNode<'x, '_> {
    #[allow(unused)]
    pub fn unit(&self) -> &'x Unit {
        self.unit
    }
    pub fn entry(&self) -> Die<'x, '_> {
        let entry = self.node.entry();
        Die {
            unit: self.unit,
            entry: Cow::Borrowed(entry),
        }
    }
    pub fn goff(&self) -> Goff {
        self.unit.goff(self.node.entry().offset().into())
    }
    /// Execute f on each direct child node (does not include this node)
    pub fn for_each_child<F>(self, mut f: F) -> cu::Result<()>
    where
        F: for<'t> FnMut(DieNode<'x, 't>) -> cu::Result<()>,
    {
        let offset = self.goff();
        let mut children = self.node.children();
        while let Some(child) = cu::check!(
            children.next(),
            "failed to read a child for entry at {offset:#x} in {}",
            self.unit
        )? {
            let node = DieNode {
                node: child,
                unit: self.unit,
            };
            let child_offset = node.goff();
            cu::check!(
                f(node),
                "error while processing child entry at {child_offset:#x}"
            )?;
        }
        Ok(())
    }
}

pub struct Die<'x, 'n> {
    pub(crate) unit: &'x Unit,
    pub(crate) entry: Cow<'n, gimli::DebuggingInformationEntry<'x, 'x, In<'static>, usize>>,
}

impl<'x> Die<'x, '_> {
    /// Get the global offset of this entry
    pub fn goff(&self) -> Goff {
        self.unit.goff(self.entry.offset().into())
    }
    /// Get the unit
    pub fn unit(&self) -> &'x Unit {
        self.unit
    }
    pub fn tag(&self) -> Tag {
        self.entry.tag()
    }
    /// Get the name of the entry
    pub fn name(&self) -> cu::Result<&str> {
        let value = self.name_opt()?;
        let offset = self.goff();
        let value = cu::check!(
            value,
            "DW_AT_name is missing for entry at offset {offset:#x} in {}",
            self.unit
        )?;
        Ok(value)
    }

    /// Get the DW_AT_name of a DIE, if it exists
    pub fn name_opt(&self) -> cu::Result<Option<&str>> {
        self.str_opt(DW_AT_name)
    }

    /// Get the DW_AT_linkage_name of a DIE, if it exists
    pub fn linkage_name_opt(&self) -> cu::Result<Option<&str>> {
        self.str_opt(DW_AT_linkage_name)
    }

    /// Get a string attribute value
    pub fn str_opt(&self, attr: DwAt) -> cu::Result<Option<&str>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at {offset:#x} in {}",
            self.unit
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        let value = cu::check!(
            self.unit.attr_string(value),
            "failed to read value for {attr} at {offset:#x} in {}",
            self.unit
        )?;
        Ok(Some(value))
    }
    /// Get a signed integer attribute value
    pub fn int(&self, attr: DwAt) -> cu::Result<i64> {
        let value = self.int_opt(attr)?;
        let offset = self.goff();
        let value = cu::check!(value, "entry is missing {attr} at offset {offset:#x}")?;
        Ok(value)
    }
    /// Get a signed integer attribute value, allowing it to be missing
    pub fn int_opt(&self, attr: DwAt) -> cu::Result<Option<i64>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at offset {offset:#x}"
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        let value = self.unit.attr_signed(offset, attr, value)?;
        Ok(Some(value))
    }
    /// Get an unsigned integer attribute value
    pub fn uint(&self, attr: DwAt) -> cu::Result<u64> {
        let value = self.uint_opt(attr)?;
        let offset = self.goff();
        let value = cu::check!(value, "entry is missing {attr} at offset {offset:#x}")?;
        Ok(value)
    }
    /// Get an unsigned integer attribute value, allowing it to be missing
    pub fn uint_opt(&self, attr: DwAt) -> cu::Result<Option<u64>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at offset {offset:#x}"
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        let value = self.unit.attr_unsigned(offset, attr, value)?;
        Ok(Some(value))
    }
    /// Get an attr of an entry as flag
    pub fn flag(&self, attr: DwAt) -> cu::Result<bool> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at {offset:#x}"
        )?;
        match value {
            None => Ok(false),
            Some(AttributeValue::Flag(x)) => Ok(x),
            _ => {
                cu::bail!("expecting {attr} to be a Flag, at entry {offset:#x}");
            }
        }
    }

    /// True iff `DW_AT_virtuality` is present and equals `DW_VIRTUALITY_virtual` (1).
    pub fn is_virtual(&self) -> cu::Result<bool> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(DW_AT_virtuality),
            "failed to read DW_AT_virtuality at offset {offset:#x}"
        )?;
        Ok(matches!(
            value,
            Some(AttributeValue::Virtuality(DW_VIRTUALITY_virtual))
        ))
    }

    /// True iff `DW_AT_object_pointer` is present (used to tell static
    /// methods from instance methods).
    pub fn has_object_pointer(&self) -> cu::Result<bool> {
        Ok(self.loff_opt(DW_AT_object_pointer)?.is_some())
    }

    /// Read a reference attribute as a global offset, accepting both
    /// same-unit (`DW_FORM_ref*`) and cross-unit (`DW_FORM_ref_addr`) forms.
    /// Same-unit refs are resolved against this DIE's own unit.
    pub fn ref_goff(&self, attr: DwAt) -> cu::Result<Option<Goff>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at offset {offset:#x}"
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        match value {
            AttributeValue::UnitRef(loff) => Ok(Some(self.unit.goff(loff.into()))),
            AttributeValue::DebugInfoRef(debug_info_offset) => {
                Ok(Some(debug_info_offset.0 as Goff))
            }
            other => cu::bail!("unsupported reference form for {attr} at {offset:#x}: {other:?}"),
        }
    }

    /// Read an attribute of a DIE, expecting a unit reference (local offset)
    pub fn loff(&self, attr: DwAt) -> cu::Result<Loff> {
        let t = self.loff_opt(attr)?;
        cu::check!(t, "missing {attr} for entry at offset {:#x}", self.goff())
    }

    /// Read an attribute of a DIE, expecting a local offset, allowing it to be missing
    pub fn loff_opt(&self, attr: DwAt) -> cu::Result<Option<Loff>> {
        let offset = self.goff();
        let type_value = cu::check!(
            self.entry.attr_value(attr),
            "failed to read {attr} at offset {offset:#x}"
        )?;
        let Some(type_value) = type_value else {
            return Ok(None);
        };
        let type_offset = match type_value {
            AttributeValue::UnitRef(offset) => offset,
            _ => cu::bail!("expecting {attr} to be a unit ref at offset {offset:#x}"),
        };
        Ok(Some(type_offset.into()))
    }

    /// Read `DW_AT_const_value` as raw bytes: `Block` forms are copied
    /// as-is, scalar forms are stored little-endian. Interpreting these
    /// bytes as a float/int/string is left to the renderer, which knows the
    /// field's resolved type.
    pub fn const_value_bytes(&self) -> cu::Result<Option<Vec<u8>>> {
        let offset = self.goff();
        let value = cu::check!(
            self.entry.attr_value(DW_AT_const_value),
            "failed to read DW_AT_const_value at offset {offset:#x}"
        )?;
        let Some(value) = value else {
            return Ok(None);
        };
        let bytes = match value {
            AttributeValue::Block(block) => {
                let slice = cu::check!(
                    block.to_slice(),
                    "failed to read const value block at {offset:#x}"
                )?;
                slice.to_vec()
            }
            AttributeValue::String(s) => {
                let s = cu::check!(s.to_slice(), "failed to read const value string at {offset:#x}")?;
                s.to_vec()
            }
            AttributeValue::DebugStrRef(str_offset) => {
                let s = cu::check!(
                    self.unit.dwarf().debug_str.get_str(str_offset),
                    "failed to read const value string ref at {offset:#x}"
                )?;
                let s = cu::check!(
                    s.to_slice(),
                    "failed to read const value string bytes at {offset:#x}"
                )?;
                s.to_vec()
            }
            AttributeValue::Data1(x) => x.to_le_bytes().to_vec(),
            AttributeValue::Data2(x) => x.to_le_bytes().to_vec(),
            AttributeValue::Data4(x) => x.to_le_bytes().to_vec(),
            AttributeValue::Data8(x) => x.to_le_bytes().to_vec(),
            AttributeValue::Udata(x) => x.to_le_bytes().to_vec(),
            AttributeValue::Sdata(x) => x.to_le_bytes().to_vec(),
            other => cu::bail!("unsupported DW_AT_const_value form at {offset:#x}: {other:?}"),
        };
        Ok(Some(bytes))
    }

    /// Execute f on each direct child node (does not include the input node)
    pub fn for_each_child<F>(&self, f: F) -> cu::Result<()>
    where
        F: for<'t> FnMut(DieNode<'x, 't>) -> cu::Result<()>,
    {
        let mut tree = self.unit.tree_at(self.entry.offset().into())?;
        let node = tree.root()?;
        node.for_each_child(f)
    }
}
