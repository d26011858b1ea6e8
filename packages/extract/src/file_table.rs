use cu::pre::*;
use gimli::{AttributeValue, DebugLineOffset};
use model::File as ModelFile;

use crate::dwarf::{In, Unit};

/// Per-compilation-unit file-id -> `(directory, name)` table, parsed from the
/// line-program header at the CU's `DW_AT_stmt_list` offset.
///
/// A missing `DW_AT_stmt_list` means the CU has no file table at all; DIEs
/// in that CU are still walked and rendered, they just have no resolvable
/// file identity (spec component B).
pub struct FileTable {
    program: gimli::IncompleteLineProgram<In<'static>>,
    comp_dir: Option<String>,
    comp_name: Option<String>,
}

impl FileTable {
    pub fn parse(unit: &Unit) -> cu::Result<Option<Self>> {
        let Some(stmt_list) = unit.stmt_list_offset()? else {
            return Ok(None);
        };
        let comp_dir = unit.comp_dir()?;
        let comp_name = unit.primary_source_name()?;
        let address_size = unit.encoding().address_size;
        let program = cu::check!(
            unit.dwarf()
                .debug_line
                .program(DebugLineOffset(stmt_list as usize), address_size, None, None),
            "failed to parse line program for {unit}"
        )?;
        Ok(Some(Self {
            program,
            comp_dir,
            comp_name,
        }))
    }

    /// Resolve a `DW_AT_decl_file` index into a model `File`.
    pub fn get(&self, unit: &Unit, id: u64) -> cu::Result<Option<ModelFile>> {
        let header = self.program.header();
        if header.encoding().version <= 4 && id == 0 {
            return Ok(Some(ModelFile {
                id: 0,
                directory: self.comp_dir.clone().unwrap_or_default().into(),
                name: self.comp_name.clone().unwrap_or_default().into(),
            }));
        }
        let Some(entry) = header.file(id) else {
            return Ok(None);
        };
        let name = self.read_path(unit, entry.path_name())?;
        let directory = match entry.directory(header) {
            Some(attr) => self.read_path(unit, attr)?,
            None => self.comp_dir.clone().unwrap_or_default(),
        };
        // Directory-table entries may be relative to DW_AT_comp_dir rather
        // than fully resolved paths.
        let directory = if std::path::Path::new(&directory).is_relative() {
            match &self.comp_dir {
                Some(comp_dir) if !comp_dir.is_empty() => {
                    std::path::Path::new(comp_dir).join(&directory).to_string_lossy().into_owned()
                }
                _ => directory,
            }
        } else {
            directory
        };
        Ok(Some(ModelFile {
            id: id as u32,
            directory: directory.into(),
            name: name.into(),
        }))
    }

    fn read_path(&self, unit: &Unit, attr: AttributeValue<In<'static>>) -> cu::Result<String> {
        let dwarf = unit.dwarf();
        let slice = match attr {
            AttributeValue::String(s) => s,
            AttributeValue::DebugLineStrRef(offset) => cu::check!(
                dwarf.line_string(offset),
                "failed to read line-table path string"
            )?,
            AttributeValue::DebugStrRef(offset) => {
                cu::check!(dwarf.string(offset), "failed to read line-table path string")?
            }
            other => cu::bail!("unsupported line-table path attribute form: {other:?}"),
        };
        let s = cu::check!(slice.to_string(), "non-utf8 path in line table")?;
        Ok(s.to_string())
    }
}
