//! Declaration renderer: converts a reconstructed [`model::Declaration`]
//! forest into per-file textual headers, inferring `#include`s from
//! cross-file type usage and optionally synthesizing indirect-call
//! trampolines into the original binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use model::{Declaration, Namespace};

mod block;
mod entries;
mod includes;
mod trampoline;

use entries::EntriesStore;

/// Render-time knobs. Only one so far: whether to emit `#include`
/// directives at all (component F can be switched off while keeping the
/// rest of the renderer unchanged).
#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
    pub includes: bool,
}

/// Output format selector, dispatched by name (component I).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Plain declarations.
    Cpp,
    /// Declarations plus `PTR_<Class>` trampolines at recovered addresses.
    PointersCpp,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Cpp => "cpp",
            Format::PointersCpp => "pointers_cpp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cpp" => Some(Format::Cpp),
            "pointers_cpp" => Some(Format::PointersCpp),
            _ => None,
        }
    }
}

/// One rendered output file: the project-relative path it should be
/// written to beneath `output/`, and its full text.
pub struct RenderedFile {
    pub relative_path: PathBuf,
    pub text: String,
}

/// Render every in-project declaration from `entities` into one header per
/// source file, selecting synthesis by `format`.
///
/// Declarations are assigned to files by their own `decl_file`; a
/// namespace is split per-file into clones holding only the descendants
/// that belong there, so the same `namespace N { ... }` can appear (with
/// different contents) across several headers. Entities without a
/// resolvable in-project `decl_file` are dropped, matching the "only
/// in-project entities are rendered" rule.
pub fn render(entities: &[Declaration], base_dir: &Path, format: Format, config: Config) -> Vec<RenderedFile> {
    let mut order: Vec<PathBuf> = Vec::new();
    let mut stores: HashMap<PathBuf, EntriesStore> = HashMap::new();

    for decl in entities {
        for (path, placed) in partition(decl, base_dir) {
            if !stores.contains_key(&path) {
                order.push(path.clone());
            }
            stores.entry(path).or_default().insert(placed);
        }
    }

    order
        .into_iter()
        .map(|path| {
            let decls = stores.remove(&path).unwrap().into_entities();
            let text = render_file(&path, &decls, base_dir, format, config);
            RenderedFile {
                relative_path: path.strip_prefix(base_dir).unwrap_or(&path).to_path_buf(),
                text,
            }
        })
        .collect()
}

/// Splits `decl` into `(file_path, declaration-for-that-file)` pairs.
/// Leaf declarations map to their own `decl_file`, dropped if absent or
/// outside the project; namespaces recurse and re-group their children by
/// file, discarding the namespace entirely from files none of its
/// descendants belong to.
fn partition(decl: &Declaration, base_dir: &Path) -> Vec<(PathBuf, Declaration)> {
    match decl {
        Declaration::Namespace(ns) => {
            let mut order: Vec<PathBuf> = Vec::new();
            let mut by_file: HashMap<PathBuf, Vec<Declaration>> = HashMap::new();
            for child in &ns.entities {
                for (path, placed) in partition(child, base_dir) {
                    if !by_file.contains_key(&path) {
                        order.push(path.clone());
                    }
                    by_file.entry(path).or_default().push(placed);
                }
            }
            order
                .into_iter()
                .map(|path| {
                    let entities = by_file.remove(&path).unwrap();
                    let clone = Declaration::Namespace(Namespace {
                        name: ns.name.clone(),
                        decl_file: ns.decl_file.clone(),
                        entities,
                    });
                    (path, clone)
                })
                .collect()
        }
        other => match decl_file_path(other) {
            Some(path) if extract::is_in_project(&path, base_dir) => vec![(path, other.clone())],
            _ => Vec::new(),
        },
    }
}

fn decl_file_path(decl: &Declaration) -> Option<PathBuf> {
    decl.decl_file().map(|(_, file)| file.full_path())
}

fn render_file(
    path: &Path,
    decls: &[Declaration],
    base_dir: &Path,
    format: Format,
    config: Config,
) -> String {
    let relative = path.strip_prefix(base_dir).unwrap_or(path);
    let upper = relative.to_string_lossy().to_uppercase();
    let guard: String = upper
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let guard = format!("{guard}_H");

    let mut out = String::new();
    out.push_str(&format!("// Source file: {}\n", relative.to_string_lossy()));
    out.push_str(&format!("#ifndef {guard}\n#define {guard}\n\n"));

    if config.includes {
        let refs: Vec<&Declaration> = decls.iter().collect();
        let lines = includes::compute_includes(&refs, path, base_dir);
        if !lines.is_empty() {
            for line in &lines {
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }
    }

    // The `construct` member only belongs in the class block when the
    // trampoline section that defines it is also being emitted.
    let owned_decls;
    let decls: &[Declaration] = if format == Format::PointersCpp {
        owned_decls = trampoline::inject_constructs(decls);
        &owned_decls
    } else {
        decls
    };

    let bodies: Vec<String> = decls.iter().map(block::render_declaration).collect();
    out.push_str(&bodies.join("\n\n"));
    if !bodies.is_empty() {
        out.push('\n');
    }

    if format == Format::PointersCpp {
        let trampolines = trampoline::render_trampolines(decls);
        if !trampolines.is_empty() {
            out.push('\n');
            out.push_str(&trampolines);
            out.push('\n');
        }
    }

    out.push_str("\n#endif\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Accessibility, Class, DeclFile, File};

    fn file(id: u32, name: &str) -> DeclFile {
        (
            0,
            File {
                id,
                directory: "/proj/src".into(),
                name: name.into(),
            },
        )
    }

    #[test]
    fn class_is_placed_in_its_own_file() {
        let decl = Declaration::Class(Class {
            name: "C".into(),
            decl_file: Some(file(1, "c.cpp")),
            accessibility: Accessibility::Public,
            inheritance: None,
            members: Vec::new(),
        });
        let rendered = render(&[decl], Path::new("/proj"), Format::Cpp, Config { includes: true });
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].relative_path, PathBuf::from("src/c.cpp"));
        assert!(rendered[0].text.contains("#ifndef SRC_C_CPP_H"));
        assert!(rendered[0].text.contains("class C {"));
    }

    #[test]
    fn namespace_splits_per_file() {
        let a = Declaration::Class(Class {
            name: "A".into(),
            decl_file: Some(file(1, "a.cpp")),
            accessibility: Accessibility::Public,
            inheritance: None,
            members: Vec::new(),
        });
        let b = Declaration::Class(Class {
            name: "B".into(),
            decl_file: Some(file(2, "b.cpp")),
            accessibility: Accessibility::Public,
            inheritance: None,
            members: Vec::new(),
        });
        let ns = Declaration::Namespace(Namespace {
            name: "N".into(),
            decl_file: Some(file(1, "a.cpp")),
            entities: vec![a, b],
        });
        let rendered = render(&[ns], Path::new("/proj/src"), Format::Cpp, Config { includes: false });
        assert_eq!(rendered.len(), 2);
        let a_file = rendered.iter().find(|f| f.relative_path == Path::new("a.cpp")).unwrap();
        assert!(a_file.text.contains("class A"));
        assert!(!a_file.text.contains("class B"));
    }

    #[test]
    fn no_decl_file_is_dropped() {
        let decl = Declaration::Class(Class {
            name: "C".into(),
            decl_file: None,
            accessibility: Accessibility::Public,
            inheritance: None,
            members: Vec::new(),
        });
        let rendered = render(&[decl], Path::new("/proj"), Format::Cpp, Config { includes: true });
        assert!(rendered.is_empty());
    }
}
