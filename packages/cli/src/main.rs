//! `dwarfscribe`: reconstructs compilable C++ declarations (classes,
//! structs, unions, namespaces, typedefs, enums) from the DWARF debug
//! info embedded in an ELF binary, optionally augmented with trampolines
//! that call into the original binary at recovered addresses.

use std::path::PathBuf;
use std::sync::Arc;

use cu::pre::*;
use render::{Config, Format};

/// Reconstruct C++ declarations from an ELF binary's DWARF debug info.
#[derive(clap::Parser, AsRef)]
#[command(version, about)]
struct Args {
    /// ELF binary containing DWARF debug info to extract from
    input: PathBuf,

    /// Output format: `cpp` for plain declarations, `pointers_cpp` to also
    /// synthesize trampolines at recovered function addresses
    #[clap(long, value_enum, default_value_t = FormatArg::Cpp)]
    format: FormatArg,

    /// Emit #include directives inferred from cross-file type usage
    #[clap(long, default_value_t = true, overrides_with = "no_includes")]
    includes: bool,
    /// Suppress #include directives (overrides --includes)
    #[clap(long, default_value_t = false, overrides_with = "includes", hide = true)]
    no_includes: bool,

    /// Directory to write the reconstructed headers under
    #[clap(long, default_value = "output")]
    out_dir: PathBuf,

    #[clap(flatten)]
    #[as_ref]
    flags: cu::cli::Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "snake_case")]
enum FormatArg {
    Cpp,
    PointersCpp,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Cpp => Format::Cpp,
            FormatArg::PointersCpp => Format::PointersCpp,
        }
    }
}

#[cu::cli(flags = "flags")]
fn main(args: Args) -> cu::Result<()> {
    let includes = args.includes && !args.no_includes;
    let format: Format = args.format.into();

    let bytes: Arc<[u8]> = cu::check!(cu::fs::read(&args.input), "failed to read input binary")?.into();
    let result = cu::check!(extract::extract(bytes), "failed to extract DWARF declarations")?;
    cu::info!(
        "extracted {} top-level declarations, base dir {}",
        result.entities.len(),
        result.base_dir.display()
    );

    let rendered = render::render(&result.entities, &result.base_dir, format, Config { includes });
    if rendered.is_empty() {
        cu::warn!("no in-project declarations found; nothing to render");
    }

    let mut concatenated = String::new();
    for file in &rendered {
        let out_path = args.out_dir.join(format!("{}.h", file.relative_path.display()));
        if let Some(parent) = out_path.parent() {
            cu::fs::make_dir(parent)?;
        }
        cu::check!(
            cu::fs::write(&out_path, &file.text),
            "failed to write {}",
            out_path.display()
        )?;
        concatenated.push_str(&file.text);
        concatenated.push('\n');
    }
    print!("{concatenated}");

    Ok(())
}
