use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use model::{Declaration, Member, Type};

/// Well-known external type names mapped to the angle-bracket include they
/// come from, applied when a type's own `decl_file` is absent (it lives in
/// a system header DWARF usually doesn't record a useful path for).
const EXTERNAL_INCLUDES: &[(&str, &str)] = &[
    ("string", "<string>"),
    ("basic_string", "<string>"),
    ("vector", "<vector>"),
    ("map", "<map>"),
    ("unordered_map", "<unordered_map>"),
    ("set", "<set>"),
    ("pair", "<utility>"),
    ("shared_ptr", "<memory>"),
    ("unique_ptr", "<memory>"),
];

/// Computes the `#include` lines a file containing `decls` needs, given the
/// path that file will be written to and the project base directory.
///
/// For every field, parameter, return, base-class and enum-backing type
/// reachable from `decls` whose `decl_file` differs from `own_path`, records
/// an include for that type's file (or, absent a `decl_file`, consults
/// `EXTERNAL_INCLUDES` for a handful of well-known standard-library names).
pub fn compute_includes(decls: &[&Declaration], own_path: &Path, base_dir: &Path) -> Vec<String> {
    let mut files = BTreeSet::new();
    let mut externals = BTreeSet::new();
    for decl in decls {
        collect_decl(decl, own_path, &mut files, &mut externals);
    }
    let mut lines: Vec<String> = files
        .into_iter()
        .map(|path: PathBuf| format_include(&path, base_dir))
        .collect();
    lines.extend(externals);
    lines
}

fn format_include(path: &Path, base_dir: &Path) -> String {
    if let Ok(rel) = path.strip_prefix(base_dir) {
        format!("#include \"{}\"", rel.to_string_lossy())
    } else {
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("#include <{basename}>")
    }
}

fn collect_decl(
    decl: &Declaration,
    own_path: &Path,
    files: &mut BTreeSet<PathBuf>,
    externals: &mut BTreeSet<String>,
) {
    match decl {
        Declaration::Class(c) => {
            if let Some(inh) = &c.inheritance {
                note_type(&inh.class, own_path, files, externals);
            }
            for m in &c.members {
                collect_member(m, own_path, files, externals);
            }
        }
        Declaration::Struct(s) => {
            for m in &s.members {
                collect_member(m, own_path, files, externals);
            }
        }
        Declaration::Union(u) => {
            for m in &u.members {
                collect_member(m, own_path, files, externals);
            }
        }
        Declaration::Namespace(ns) => {
            for child in &ns.entities {
                collect_decl(child, own_path, files, externals);
            }
        }
        Declaration::TypeDef(t) => note_type(&t.target, own_path, files, externals),
        Declaration::Enum(e) => note_type(&e.backing_type, own_path, files, externals),
    }
}

fn collect_member(
    member: &Member,
    own_path: &Path,
    files: &mut BTreeSet<PathBuf>,
    externals: &mut BTreeSet<String>,
) {
    match member {
        Member::Field(f) => note_type(&f.ty, own_path, files, externals),
        Member::Method(m) => {
            if let Some(rt) = &m.return_type {
                note_type(rt, own_path, files, externals);
            }
            for p in m.rendered_parameters() {
                note_type(&p.ty, own_path, files, externals);
            }
        }
        Member::AnonymousUnion(inner) => {
            for m in inner {
                collect_member(m, own_path, files, externals);
            }
        }
        Member::NestedEnum(e) => note_type(&e.backing_type, own_path, files, externals),
    }
}

fn note_type(
    ty: &Type,
    own_path: &Path,
    files: &mut BTreeSet<PathBuf>,
    externals: &mut BTreeSet<String>,
) {
    if ty.is_unresolved() || ty.base {
        return;
    }
    match &ty.decl_file {
        Some((_, file)) => {
            let path = file.full_path();
            if path != own_path {
                files.insert(path);
            }
        }
        None => {
            if let Some((_, include)) = EXTERNAL_INCLUDES
                .iter()
                .find(|(name, _)| *name == ty.name.as_ref())
            {
                externals.insert(format!("#include {include}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use model::{Accessibility, Field, Struct};

    use super::*;

    fn field_of_type(ty: Type) -> Member {
        Member::Field(Field {
            name: "x".into(),
            ty,
            accessibility: Accessibility::Public,
            is_static: false,
            const_value: None,
            array_size: None,
            data_member_location: Some(0),
        })
    }

    #[test]
    fn cross_file_field_adds_relative_include() {
        let other_file = model::File {
            id: 2,
            directory: "/proj/include".into(),
            name: "other.h".into(),
        };
        let decl = Declaration::Struct(Struct {
            name: "S".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            members: vec![field_of_type(Type {
                name: "Other".into(),
                decl_file: Some((0, other_file)),
                ..Default::default()
            })],
        });
        let lines = compute_includes(
            &[&decl],
            Path::new("/proj/include/s.h"),
            Path::new("/proj"),
        );
        assert_eq!(lines, vec!["#include \"include/other.h\"".to_string()]);
    }

    #[test]
    fn known_external_name_maps_to_angle_include() {
        let decl = Declaration::Struct(Struct {
            name: "S".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            members: vec![field_of_type(Type {
                name: "string".into(),
                ..Default::default()
            })],
        });
        let lines = compute_includes(&[&decl], Path::new("/proj/s.h"), Path::new("/proj"));
        assert_eq!(lines, vec!["#include <string>".to_string()]);
    }

    #[test]
    fn base_types_are_never_included() {
        let decl = Declaration::Struct(Struct {
            name: "S".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            members: vec![field_of_type(Type {
                name: "int".into(),
                base: true,
                ..Default::default()
            })],
        });
        let lines = compute_includes(&[&decl], Path::new("/proj/s.h"), Path::new("/proj"));
        assert!(lines.is_empty());
    }
}
