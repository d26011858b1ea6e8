//! DWARF semantic extractor: loads an ELF binary's debug info and walks its
//! DIE graph into a declaration model independent of DWARF's own encoding
//! quirks (split declaration/definition DIEs, per-CU file tables, and so
//! on).
#![allow(non_upper_case_globals)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

mod dwarf;
mod file_table;
mod namespaces;
mod resolver;
mod units;
mod walker;

use units::Units;

/// Everything extracted from one ELF binary's DWARF: the declarations it
/// defines and the project root inferred from its first compilation unit,
/// used downstream to tell project headers from system/built-in ones.
pub struct ExtractResult {
    pub entities: Vec<model::Declaration>,
    pub base_dir: PathBuf,
}

/// Load and extract all declarations from the DWARF in an ELF image.
pub fn extract(buf: Arc<[u8]>) -> cu::Result<ExtractResult> {
    let dwarf = dwarf::Dwarf::try_parse(buf)?;
    let mut iter = dwarf::Dwarf::iter_units(&dwarf);
    let mut units = Vec::new();
    while let Some(unit) = iter.next_unit()? {
        units.push(unit);
    }
    let units = Units::new(units);
    let base_dir = detect_base_dir(&units)?;
    let entities = walker::walk(&units)?;
    Ok(ExtractResult { entities, base_dir })
}

/// Infers the project root as the first compilation unit's `DW_AT_comp_dir`,
/// widened to the common path prefix shared with that unit's primary
/// source file if that path is absolute.
fn detect_base_dir(units: &Units) -> cu::Result<PathBuf> {
    let Some(first) = units.iter().next() else {
        return Ok(PathBuf::new());
    };
    let mut base = PathBuf::from(first.comp_dir()?.unwrap_or_default());
    if let Some(name) = first.primary_source_name()? {
        let path = PathBuf::from(name);
        if path.is_absolute() {
            base = common_prefix(&base, &path);
        }
    }
    Ok(base)
}

fn common_prefix(a: &Path, b: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for (ca, cb) in a.components().zip(b.components()) {
        if ca == cb {
            out.push(ca.as_os_str());
        } else {
            break;
        }
    }
    out
}

/// True iff `path` should be treated as part of the project being analyzed
/// rather than a system header or compiler built-in: it must fall under
/// `base_dir` and not be one of the synthetic `<built-in>`-style paths
/// compilers emit for intrinsics.
pub fn is_in_project(path: &Path, base_dir: &Path) -> bool {
    if path.to_string_lossy().contains("<built-in>") {
        return false;
    }
    path.starts_with(base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_stops_at_divergence() {
        let a = Path::new("/home/proj/build");
        let b = Path::new("/home/proj/src/main.cpp");
        assert_eq!(common_prefix(a, b), PathBuf::from("/home/proj"));
    }

    #[test]
    fn built_in_paths_are_never_in_project() {
        let base = Path::new("/home/proj");
        assert!(!is_in_project(Path::new("<built-in>"), base));
    }

    #[test]
    fn paths_outside_base_dir_are_not_in_project() {
        let base = Path::new("/home/proj");
        assert!(!is_in_project(Path::new("/usr/include/stdio.h"), base));
        assert!(is_in_project(Path::new("/home/proj/src/main.cpp"), base));
    }
}
