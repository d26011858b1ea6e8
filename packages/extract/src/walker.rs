use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use gimli::constants::*;
use model::{
    Accessibility, ArcStr, Class, Declaration, EnumerationType, Enumerator, Field, Inheritance,
    Member, Method, Namespace, Parameter, Struct, TypeDef, Union,
};
use regex::Regex;

use crate::dwarf::{Die, DieNode, Goff, Unit};
use crate::file_table::FileTable;
use crate::namespaces::NamespaceMap;
use crate::resolver::Resolver;
use crate::units::Units;

type MethodRef = Rc<RefCell<Method>>;

/// A member of a class/struct/union body while it's still being assembled:
/// `Method` entries are shared handles into the global method table so a
/// later out-of-line definition can fill in `low_pc`/named parameters
/// without having to re-walk the member list to find them.
enum WipMember {
    Field(Field),
    Method(MethodRef),
    AnonymousUnion(Vec<WipMember>),
    NestedEnum(EnumerationType),
}

enum WipDecl {
    Class {
        name: ArcStr,
        decl_file: Option<model::DeclFile>,
        accessibility: Accessibility,
        inheritance: Option<Inheritance>,
        members: Vec<WipMember>,
    },
    Struct {
        name: ArcStr,
        decl_file: Option<model::DeclFile>,
        accessibility: Accessibility,
        members: Vec<WipMember>,
    },
    Union {
        name: ArcStr,
        decl_file: Option<model::DeclFile>,
        accessibility: Accessibility,
        members: Vec<WipMember>,
    },
    Namespace {
        name: ArcStr,
        decl_file: Option<model::DeclFile>,
        entities: Vec<WipDecl>,
    },
    TypeDef(TypeDef),
    Enum(EnumerationType),
}

/// State shared across all compilation units during extraction.
struct Context<'u> {
    units: &'u Units,
    /// Every declaration-site method, keyed by the global offset of its own
    /// `DW_TAG_subprogram` DIE. Populated while assembling class/struct/
    /// union bodies, mutated later when out-of-line definitions are found.
    methods: HashMap<Goff, MethodRef>,
    /// Declaration-site methods grouped by name, used to propagate a
    /// definition's `low_pc` to sibling overloads that share it (and to the
    /// constructor-without-`DW_AT_specification` fallback).
    methods_by_name: HashMap<String, Vec<Goff>>,
    ctor_regex: Regex,
}

impl<'u> Context<'u> {
    fn new(units: &'u Units) -> Self {
        Self {
            units,
            methods: HashMap::new(),
            methods_by_name: HashMap::new(),
            ctor_regex: Regex::new(r"_ZN(?:\d+\w+)*(\d+)(\w+)C[1-3]").unwrap(),
        }
    }

    fn register_method(&mut self, goff: Goff, name: &str, method: Method) -> MethodRef {
        let method = Rc::new(RefCell::new(method));
        self.methods.insert(goff, Rc::clone(&method));
        self.methods_by_name
            .entry(name.to_string())
            .or_default()
            .push(goff);
        method
    }
}

/// Walks every compilation unit's DIE tree, producing the top-level
/// declarations it defines.
///
/// Two passes are needed because method declarations (inside a
/// class/struct/union body) and their out-of-line definitions (with
/// `DW_AT_low_pc`, living alongside free functions at namespace/CU scope)
/// are unrelated DIEs linked only by `DW_AT_specification`, which may point
/// into an entirely different compilation unit.
pub fn walk(units: &Units) -> cu::Result<Vec<Declaration>> {
    let mut ctx = Context::new(units);
    let mut roots = Vec::new();

    for unit in units.iter() {
        let namespaces = NamespaceMap::build(unit)?;
        let files = FileTable::parse(unit)?;
        let resolver = Resolver::new(units);
        let mut tree = unit.tree()?;
        let root = tree.root()?;
        root.for_each_child(|child| {
            let goff = child.goff();
            match build_decl(&mut ctx, unit, &namespaces, files.as_ref(), &resolver, child) {
                Ok(Some(decl)) => roots.push(decl),
                Ok(None) => {}
                Err(e) => cu::warn!("skipping entity at {goff:#x} in {unit}: {e:#}"),
            }
            Ok(())
        })?;
    }

    for unit in units.iter() {
        let namespaces = NamespaceMap::build(unit)?;
        let files = FileTable::parse(unit)?;
        let resolver = Resolver::new(units);
        if let Err(e) = apply_definitions(&mut ctx, unit, &namespaces, files.as_ref(), &resolver) {
            cu::warn!("error applying method definitions in {unit}: {e:#}");
        }
    }

    propagate_low_pc(&mut ctx);

    Ok(roots.into_iter().map(finalize_decl).collect())
}

fn build_decl(
    ctx: &mut Context<'_>,
    unit: &Unit,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
    node: DieNode<'_, '_>,
) -> cu::Result<Option<WipDecl>> {
    let entry = node.entry();
    let tag = entry.tag();
    match tag {
        DW_TAG_class_type => {
            let Some(name) = entry.name_opt()? else {
                return Ok(None);
            };
            let decl_file = decl_file_of(&entry, files, unit)?;
            let accessibility = accessibility_of(&entry)?;
            let mut members = Vec::new();
            let mut inheritance = None;
            entry.for_each_child(|child| {
                let child_entry = child.entry();
                if child_entry.tag() == DW_TAG_inheritance {
                    if inheritance.is_none() {
                        let base =
                            resolver.resolve(&child_entry, DW_AT_type, namespaces, files)?;
                        let acc = accessibility_of(&child_entry)?;
                        inheritance = Some(Inheritance {
                            class: base,
                            accessibility: acc,
                        });
                    }
                    return Ok(());
                }
                match build_member(ctx, unit, namespaces, files, resolver, child) {
                    Ok(Some(m)) => members.push(m),
                    Ok(None) => {}
                    Err(e) => cu::warn!("skipping member in {name}: {e:#}"),
                }
                Ok(())
            })?;
            Ok(Some(WipDecl::Class {
                name: name.into(),
                decl_file,
                accessibility,
                inheritance,
                members,
            }))
        }
        DW_TAG_structure_type => {
            let Some(name) = entry.name_opt()? else {
                return Ok(None);
            };
            let decl_file = decl_file_of(&entry, files, unit)?;
            let accessibility = accessibility_of(&entry)?;
            let mut members = Vec::new();
            entry.for_each_child(|child| {
                if child.entry().tag() == DW_TAG_inheritance {
                    return Ok(());
                }
                match build_member(ctx, unit, namespaces, files, resolver, child) {
                    Ok(Some(m)) => members.push(m),
                    Ok(None) => {}
                    Err(e) => cu::warn!("skipping member in {name}: {e:#}"),
                }
                Ok(())
            })?;
            Ok(Some(WipDecl::Struct {
                name: name.into(),
                decl_file,
                accessibility,
                members,
            }))
        }
        DW_TAG_union_type => {
            let Some(name) = entry.name_opt()? else {
                return Ok(None);
            };
            let decl_file = decl_file_of(&entry, files, unit)?;
            let accessibility = accessibility_of(&entry)?;
            let mut members = Vec::new();
            entry.for_each_child(|child| {
                match build_member(ctx, unit, namespaces, files, resolver, child) {
                    Ok(Some(m)) => members.push(m),
                    Ok(None) => {}
                    Err(e) => cu::warn!("skipping member in {name}: {e:#}"),
                }
                Ok(())
            })?;
            Ok(Some(WipDecl::Union {
                name: name.into(),
                decl_file,
                accessibility,
                members,
            }))
        }
        DW_TAG_namespace => {
            let name = entry.name_opt()?.unwrap_or("(anonymous namespace)");
            let decl_file = decl_file_of(&entry, files, unit)?;
            let mut entities = Vec::new();
            entry.for_each_child(|child| {
                let goff = child.goff();
                match build_decl(ctx, unit, namespaces, files, resolver, child) {
                    Ok(Some(d)) => entities.push(d),
                    Ok(None) => {}
                    Err(e) => cu::warn!("skipping entity at {goff:#x} in namespace {name}: {e:#}"),
                }
                Ok(())
            })?;
            Ok(Some(WipDecl::Namespace {
                name: name.into(),
                decl_file,
                entities,
            }))
        }
        DW_TAG_typedef => {
            let Some(name) = entry.name_opt()? else {
                return Ok(None);
            };
            let decl_file = decl_file_of(&entry, files, unit)?;
            let accessibility = accessibility_of(&entry)?;
            let target = resolver.resolve(&entry, DW_AT_type, namespaces, files)?;
            Ok(Some(WipDecl::TypeDef(TypeDef {
                name: name.into(),
                decl_file,
                accessibility,
                target,
            })))
        }
        DW_TAG_enumeration_type => Ok(Some(WipDecl::Enum(build_enum(
            &entry, unit, namespaces, files, resolver,
        )?))),
        _ => Ok(None),
    }
}

fn build_enum(
    entry: &Die<'_, '_>,
    unit: &Unit,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
) -> cu::Result<EnumerationType> {
    let name = entry.name_opt()?.unwrap_or("(anonymous enum)");
    let decl_file = decl_file_of(entry, files, unit)?;
    let accessibility = accessibility_of(entry)?;
    let backing_type = resolver.resolve(entry, DW_AT_type, namespaces, files)?;
    let mut enumerators = Vec::new();
    entry.for_each_child(|child| {
        let child_entry = child.entry();
        if child_entry.tag() != DW_TAG_enumerator {
            return Ok(());
        }
        let name = child_entry.name()?;
        let value = child_entry.int_opt(DW_AT_const_value)?.unwrap_or(0);
        enumerators.push(Enumerator {
            name: name.into(),
            value,
        });
        Ok(())
    })?;
    Ok(EnumerationType {
        name: name.into(),
        decl_file,
        accessibility,
        enumerators,
        backing_type,
    })
}

fn build_member(
    ctx: &mut Context<'_>,
    unit: &Unit,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
    node: DieNode<'_, '_>,
) -> cu::Result<Option<WipMember>> {
    let entry = node.entry();
    let tag = entry.tag();
    match tag {
        DW_TAG_member => {
            let Some(name) = entry.name_opt()? else {
                return build_anonymous_union(ctx, unit, namespaces, files, resolver, &entry);
            };
            let ty = resolver.resolve(&entry, DW_AT_type, namespaces, files)?;
            if ty.name.as_ref() == "__vtbl_ptr_type" {
                return Ok(None);
            }
            let accessibility = accessibility_of(&entry)?;
            let data_member_location = entry.uint_opt(DW_AT_data_member_location)?;
            let is_static = entry.flag(DW_AT_external)?;
            let const_value = entry.const_value_bytes()?;
            let array_size = ty.array_size;
            Ok(Some(WipMember::Field(Field {
                name: name.into(),
                ty,
                accessibility,
                is_static,
                const_value,
                array_size,
                data_member_location,
            })))
        }
        DW_TAG_variable => {
            let Some(name) = entry.name_opt()? else {
                return Ok(None);
            };
            let ty = resolver.resolve(&entry, DW_AT_type, namespaces, files)?;
            let accessibility = accessibility_of(&entry)?;
            let const_value = entry.const_value_bytes()?;
            let array_size = ty.array_size;
            Ok(Some(WipMember::Field(Field {
                name: name.into(),
                ty,
                accessibility,
                is_static: true,
                const_value,
                array_size,
                data_member_location: None,
            })))
        }
        DW_TAG_subprogram => {
            let goff = entry.goff();
            let name = entry.name_opt()?.unwrap_or("").to_string();
            let return_type = resolver.resolve(&entry, DW_AT_type, namespaces, files)?;
            let return_type = if return_type.name.as_ref() == "void" && !return_type.is_unresolved()
            {
                None
            } else {
                Some(return_type)
            };
            let accessibility = accessibility_of(&entry)?;
            let is_virtual = entry.is_virtual()?;
            let is_static = !entry.has_object_pointer()?;
            let direct_parameters = collect_parameters(&entry, namespaces, files, resolver)?;
            let decl_file = decl_file_of(&entry, files, unit)?;
            let linkage_name = entry.linkage_name_opt()?.map(ArcStr::from);
            let method = Method {
                name: name.clone().into(),
                return_type,
                accessibility,
                is_static,
                is_virtual,
                parameters: Vec::new(),
                direct_parameters,
                low_pc: None,
                offset: goff,
                decl_file,
                fully_defined: false,
                linkage_name,
            };
            let method = ctx.register_method(goff, &name, method);
            Ok(Some(WipMember::Method(method)))
        }
        DW_TAG_enumeration_type => Ok(Some(WipMember::NestedEnum(build_enum(
            &entry, unit, namespaces, files, resolver,
        )?))),
        _ => Ok(None),
    }
}

fn build_anonymous_union(
    ctx: &mut Context<'_>,
    unit: &Unit,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
    entry: &Die<'_, '_>,
) -> cu::Result<Option<WipMember>> {
    let Some(type_goff) = entry.ref_goff(DW_AT_type)? else {
        return Ok(None);
    };
    let Some(type_die) = ctx.units.die_at(type_goff)? else {
        return Ok(None);
    };
    if type_die.tag() != DW_TAG_union_type {
        return Ok(None);
    }
    let mut members = Vec::new();
    type_die.for_each_child(|child| {
        match build_member(ctx, unit, namespaces, files, resolver, child) {
            Ok(Some(m)) => members.push(m),
            Ok(None) => {}
            Err(e) => cu::warn!("skipping anonymous union member: {e:#}"),
        }
        Ok(())
    })?;
    Ok(Some(WipMember::AnonymousUnion(members)))
}

fn collect_parameters(
    entry: &Die<'_, '_>,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
) -> cu::Result<Vec<Parameter>> {
    let mut params = Vec::new();
    let mut index = 0usize;
    entry.for_each_child(|child| {
        let child_entry = child.entry();
        if child_entry.tag() != DW_TAG_formal_parameter {
            return Ok(());
        }
        if child_entry.flag(DW_AT_artificial)? {
            return Ok(());
        }
        let name = child_entry.name_opt()?.map(ArcStr::from);
        let ty = resolver.resolve(&child_entry, DW_AT_type, namespaces, files)?;
        params.push(Parameter {
            name,
            ty,
            offset: index,
        });
        index += 1;
        Ok(())
    })?;
    Ok(params)
}

/// Recursively walks a unit looking for out-of-line `DW_TAG_subprogram`
/// definitions (anywhere under the CU root or nested namespaces, the
/// places a compiler actually emits them) and unifies each with its
/// declaration-site method via `DW_AT_specification`.
fn apply_definitions(
    ctx: &mut Context<'_>,
    unit: &Unit,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
) -> cu::Result<()> {
    let mut tree = unit.tree()?;
    let root = tree.root()?;
    walk_for_definitions(ctx, unit, namespaces, files, resolver, root)
}

fn walk_for_definitions(
    ctx: &mut Context<'_>,
    unit: &Unit,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
    node: DieNode<'_, '_>,
) -> cu::Result<()> {
    let entry = node.entry();
    let tag = entry.tag();
    if tag == DW_TAG_subprogram {
        if let Err(e) = apply_definition(ctx, namespaces, files, resolver, &entry) {
            let goff = entry.goff();
            cu::warn!("skipping method definition at {goff:#x} in {unit}: {e:#}");
        }
        return Ok(());
    }
    if matches!(tag, DW_TAG_namespace | DW_TAG_compile_unit) {
        node.for_each_child(|child| {
            walk_for_definitions(ctx, unit, namespaces, files, resolver, child)
        })?;
    }
    Ok(())
}

fn apply_definition(
    ctx: &mut Context<'_>,
    namespaces: &NamespaceMap,
    files: Option<&FileTable>,
    resolver: &Resolver<'_>,
    entry: &Die<'_, '_>,
) -> cu::Result<()> {
    let Some(low_pc) = entry.uint_opt(DW_AT_low_pc)? else {
        return Ok(());
    };

    let method = if let Some(spec_goff) = entry.ref_goff(DW_AT_specification)? {
        ctx.methods.get(&spec_goff).cloned()
    } else {
        None
    };

    let method = match method {
        Some(m) => m,
        None => {
            // No specification: either a free function (not modeled) or a
            // constructor whose declaration-site DIE genuinely lacks one
            // (seen with some compilers). Detect the latter by mangled name
            // and hand off to the low_pc propagation pass instead of
            // fabricating a declaration with no class to attach it to.
            let Some(linkage_name) = entry.linkage_name_opt()? else {
                return Ok(());
            };
            let Some(caps) = ctx.ctor_regex.captures(linkage_name) else {
                return Ok(());
            };
            let class_name = caps.get(2).map(|m| m.as_str().to_string());
            let Some(class_name) = class_name else {
                return Ok(());
            };
            let goff = entry.goff();
            let linkage_name = linkage_name.to_string();
            ctx.register_method(
                goff,
                &format!("{class_name}\0pc-donor"),
                Method {
                    name: class_name.into(),
                    return_type: None,
                    accessibility: Accessibility::Public,
                    is_static: false,
                    is_virtual: false,
                    parameters: Vec::new(),
                    direct_parameters: Vec::new(),
                    low_pc: Some(low_pc),
                    offset: goff,
                    decl_file: None,
                    fully_defined: false,
                    linkage_name: Some(linkage_name.into()),
                },
            );
            return Ok(());
        }
    };

    let params = collect_parameters(entry, namespaces, files, resolver)?;
    let mut m = method.borrow_mut();
    m.low_pc = Some(low_pc);
    m.fully_defined = true;
    if !params.is_empty() {
        m.parameters = params;
    }
    Ok(())
}

/// Constructors without `DW_AT_specification` register a PC-donor entry
/// keyed by their mangled class name; this propagates that `low_pc` onto
/// the matching declaration-site method(s) that still have none.
fn propagate_low_pc(ctx: &mut Context<'_>) {
    let donor_pcs: HashMap<String, u64> = ctx
        .methods_by_name
        .iter()
        .filter_map(|(key, goffs)| {
            let class_name = key.strip_suffix("\0pc-donor")?;
            let pc = goffs
                .iter()
                .filter_map(|g| ctx.methods.get(g))
                .find_map(|m| m.borrow().low_pc);
            pc.map(|pc| (class_name.to_string(), pc))
        })
        .collect();

    for (name, goffs) in ctx.methods_by_name.iter() {
        if name.ends_with("\0pc-donor") {
            continue;
        }
        let Some(&pc) = donor_pcs.get(name) else {
            continue;
        };
        for goff in goffs {
            if let Some(method) = ctx.methods.get(goff) {
                let mut m = method.borrow_mut();
                if m.low_pc.is_none() {
                    m.low_pc = Some(pc);
                    m.fully_defined = true;
                }
            }
        }
    }
}

fn finalize_decl(decl: WipDecl) -> Declaration {
    match decl {
        WipDecl::Class {
            name,
            decl_file,
            accessibility,
            inheritance,
            members,
        } => Declaration::Class(Class {
            name,
            decl_file,
            accessibility,
            inheritance,
            members: members.into_iter().map(finalize_member).collect(),
        }),
        WipDecl::Struct {
            name,
            decl_file,
            accessibility,
            members,
        } => Declaration::Struct(Struct {
            name,
            decl_file,
            accessibility,
            members: members.into_iter().map(finalize_member).collect(),
        }),
        WipDecl::Union {
            name,
            decl_file,
            accessibility,
            members,
        } => Declaration::Union(Union {
            name,
            decl_file,
            accessibility,
            members: members.into_iter().map(finalize_member).collect(),
        }),
        WipDecl::Namespace {
            name,
            decl_file,
            entities,
        } => Declaration::Namespace(Namespace {
            name,
            decl_file,
            entities: entities.into_iter().map(finalize_decl).collect(),
        }),
        WipDecl::TypeDef(t) => Declaration::TypeDef(t),
        WipDecl::Enum(e) => Declaration::Enum(e),
    }
}

fn finalize_member(member: WipMember) -> Member {
    match member {
        WipMember::Field(f) => Member::Field(f),
        WipMember::Method(m) => {
            let method = Rc::try_unwrap(m)
                .map(RefCell::into_inner)
                .unwrap_or_else(|rc| rc.borrow().clone());
            Member::Method(method)
        }
        WipMember::AnonymousUnion(members) => {
            Member::AnonymousUnion(members.into_iter().map(finalize_member).collect())
        }
        WipMember::NestedEnum(e) => Member::NestedEnum(e),
    }
}

fn decl_file_of(
    entry: &Die<'_, '_>,
    files: Option<&FileTable>,
    unit: &Unit,
) -> cu::Result<Option<model::DeclFile>> {
    let Some(files) = files else {
        return Ok(None);
    };
    let Some(file_id) = entry.uint_opt(DW_AT_decl_file)? else {
        return Ok(None);
    };
    let Some(file) = files.get(unit, file_id)? else {
        return Ok(None);
    };
    Ok(Some((unit.offset, file)))
}

fn accessibility_of(entry: &Die<'_, '_>) -> cu::Result<Accessibility> {
    Ok(Accessibility::from_dwarf(
        entry.uint_opt(DW_AT_accessibility)?,
    ))
}
