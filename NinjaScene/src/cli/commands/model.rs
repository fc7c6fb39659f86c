//! Container CLI commands
//!
//! Commands for inspecting containers and extracting their textures.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;

use crate::cli::progress::{self, DISK, LOOKING_GLASS};
use crate::formats::container::{DecodeOptions, IssueScope, decode_model_with};
use crate::inspect::{ModelInfo, inspect_bytes};

fn read_and_inspect(path: &Path, options: &DecodeOptions, quiet: bool) -> anyhow::Result<ModelInfo> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let pb = progress::spinner(&format!("Decoding {}", path.display()), quiet);
    let info = inspect_bytes(&data, options);
    pb.finish_and_clear();

    Ok(info?)
}

/// Inspect a container and display its structure.
pub fn inspect(path: &Path, options: &DecodeOptions, quiet: bool) -> anyhow::Result<()> {
    let info = read_and_inspect(path, options, quiet)?;

    println!("Container: {} ({})", path.display(), info.kind);
    println!(
        "Chunks:    {} NJCM ({} objects), {} NJTL, {} GRND, {} NMDM",
        info.pools.njcm, info.njcm_objects, info.pools.njtl, info.pools.grnd, info.pools.nmdm
    );
    println!();

    println!("Entities ({}):", info.entities.len());
    for entity in &info.entities {
        println!(
            "  [{:3}] {:16} | {} meshes, {} triangles, {} textures",
            entity.index,
            entity.name,
            entity.meshes,
            entity.triangles,
            entity.texture_names.len()
        );
    }

    println!();
    println!("Textures ({}):", info.textures.len());
    for texture in &info.textures {
        println!("  - {} ({} bytes)", texture.name, texture.size);
    }

    if !info.issues.is_empty() {
        println!();
        println!("Issues ({}):", info.issues.len());
        for issue in &info.issues {
            match &issue.scope {
                IssueScope::Entity { slot, name } => println!(
                    "  - entity {} ({}): {}",
                    slot,
                    name.as_deref().unwrap_or("?"),
                    issue.message
                ),
                IssueScope::AssetTable { offset } => {
                    println!("  - asset table 0x{:x}: {}", offset, issue.message);
                }
            }
        }
    }

    Ok(())
}

/// Write the container summary as JSON to `output`, or stdout.
pub fn json(
    path: &Path,
    output: Option<&Path>,
    options: &DecodeOptions,
    quiet: bool,
) -> anyhow::Result<()> {
    let info = read_and_inspect(path, options, quiet)?;
    let json = serde_json::to_string_pretty(&info)?;

    match output {
        Some(output) => {
            std::fs::write(output, json)?;
            if !quiet {
                println!("Written to: {}", output.display());
            }
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Write every texture payload to `output/<name>.gvr`.
///
/// Returns the written paths in asset table order. Names that map to the
/// same file get a numeric suffix.
pub fn export_textures(
    path: &Path,
    output: &Path,
    options: &DecodeOptions,
    quiet: bool,
) -> anyhow::Result<Vec<PathBuf>> {
    let start = Instant::now();
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    if !quiet {
        progress::print_step(1, 2, &LOOKING_GLASS, &format!("Decoding {}...", path.display()));
    }
    let model = decode_model_with(&data, options)?;

    if !quiet {
        progress::print_step(
            2,
            2,
            &DISK,
            &format!("Writing {} textures...", model.textures.len()),
        );
    }
    std::fs::create_dir_all(output)?;

    let mut written = Vec::with_capacity(model.textures.len());
    for (name, bytes) in &model.textures {
        let target = unique_target(output, name, &written);
        std::fs::write(&target, bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        written.push(target);
    }

    if !quiet {
        progress::print_done(start.elapsed());
    }
    Ok(written)
}

/// Output path for `name`, suffixed with `_1`, `_2`, ... while it collides
/// with a path already written.
fn unique_target(output: &Path, name: &str, written: &[PathBuf]) -> PathBuf {
    let stem = file_name_for(name);
    let mut target = output.join(format!("{stem}.gvr"));
    let mut suffix = 1;
    while written.contains(&target) {
        target = output.join(format!("{stem}_{suffix}.gvr"));
        suffix += 1;
    }
    target
}

/// Asset names come from the container; keep them inside the output dir.
fn file_name_for(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        format!("texture_{}", cleaned.len())
    } else {
        cleaned
    }
}
