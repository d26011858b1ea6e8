use gimli::constants::*;
use model::{DeclFile, Modifier, Type};

use crate::dwarf::{Die, Goff, Tag};
use crate::file_table::FileTable;
use crate::namespaces::NamespaceMap;
use crate::units::Units;

/// Walks a `DW_AT_type` reference chain to a terminal named type, collecting
/// pointer/const/volatile/reference qualifiers and array-ness along the way.
///
/// Qualifier and array tags are transparent: the walk continues through
/// their own `DW_AT_type`. Everything else (struct/class/union/enum/base
/// type/typedef, and subroutine/ptr-to-member types which this renders as
/// their own opaque names) is terminal: its own name is what's rendered, it
/// is never unwrapped further.
pub struct Resolver<'u> {
    units: &'u Units,
}

impl<'u> Resolver<'u> {
    pub fn new(units: &'u Units) -> Self {
        Self { units }
    }

    /// Resolve the type referenced by `attr` (usually `DW_AT_type`) on
    /// `die`. A DIE with no such attribute at all resolves to `void`.
    pub fn resolve(
        &self,
        die: &Die<'_, '_>,
        attr: gimli::DwAt,
        namespaces: &NamespaceMap,
        files: Option<&FileTable>,
    ) -> cu::Result<Type> {
        let Some(goff) = die.ref_goff(attr)? else {
            return Ok(Type {
                name: "void".into(),
                ..Default::default()
            });
        };
        self.resolve_goff(goff, namespaces, files)
    }

    fn resolve_goff(
        &self,
        goff: Goff,
        namespaces: &NamespaceMap,
        files: Option<&FileTable>,
    ) -> cu::Result<Type> {
        let mut ty = Type::default();
        let mut current = goff;
        loop {
            let Some(node) = self.units.die_at(current)? else {
                return Ok(Type::unresolved_at(current));
            };
            let tag = node.tag();
            // A named DIE is always terminal, even one tagged as a
            // qualifier/pointer (the synthesized `__vtbl_ptr_type` pointer
            // carries its own name and must not be unwrapped further).
            if node.name_opt()?.is_some() {
                self.fill_terminal(&node, tag, &mut ty, namespaces, files)?;
                return Ok(ty);
            }
            match tag {
                DW_TAG_pointer_type => ty.push_front_modifier(Modifier::Pointer),
                DW_TAG_reference_type | DW_TAG_rvalue_reference_type => {
                    ty.push_front_modifier(Modifier::Reference)
                }
                DW_TAG_const_type => ty.push_front_modifier(Modifier::Constant),
                DW_TAG_volatile_type => ty.push_front_modifier(Modifier::Volatile),
                DW_TAG_array_type => {
                    ty.array = true;
                    ty.array_size = self.array_size(&node)?;
                }
                _ => {
                    self.fill_terminal(&node, tag, &mut ty, namespaces, files)?;
                    return Ok(ty);
                }
            }
            match node.ref_goff(DW_AT_type)? {
                Some(next) => current = next,
                None => {
                    ty.name = "void".into();
                    return Ok(ty);
                }
            }
        }
    }

    fn fill_terminal(
        &self,
        node: &Die<'_, '_>,
        tag: Tag,
        ty: &mut Type,
        namespaces: &NamespaceMap,
        files: Option<&FileTable>,
    ) -> cu::Result<()> {
        let name = match node.name_opt()? {
            Some(name) => name,
            None => node.linkage_name_opt()?.unwrap_or("<<anonymous>>"),
        };
        ty.name = name.into();
        for segment in namespaces.get(node.goff()) {
            ty.push_front_namespace(segment.clone());
        }
        ty.byte_size = node.uint_opt(DW_AT_byte_size)?;
        ty.base = tag == DW_TAG_base_type;
        if let Some(file_id) = node.uint_opt(DW_AT_decl_file)? {
            ty.decl_file = self.decl_file(node, file_id, files)?;
        }
        Ok(())
    }

    fn decl_file(
        &self,
        node: &Die<'_, '_>,
        file_id: u64,
        files: Option<&FileTable>,
    ) -> cu::Result<Option<DeclFile>> {
        let Some(files) = files else {
            return Ok(None);
        };
        let unit = node.unit();
        let Some(file) = files.get(unit, file_id)? else {
            return Ok(None);
        };
        Ok(Some((unit.offset, file)))
    }

    fn array_size(&self, node: &Die<'_, '_>) -> cu::Result<Option<u64>> {
        let mut size = None;
        node.for_each_child(|child| {
            if child.entry().tag() != DW_TAG_subrange_type {
                return Ok(());
            }
            let entry = child.entry();
            if let Some(count) = entry.uint_opt(DW_AT_count)? {
                size = Some(count);
            } else if let Some(upper_bound) = entry.uint_opt(DW_AT_upper_bound)? {
                size = Some(upper_bound + 1);
            }
            Ok(())
        })?;
        Ok(size)
    }
}
