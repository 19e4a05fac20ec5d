//! Zip the exported story folders.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write every file under `root` into a deflated archive at `zip_path`.
///
/// Entry names are relative to `root` and `/`-separated. Returns the number
/// of files added.
pub fn zip_folder(root: &Path, zip_path: &Path) -> Result<usize> {
    if let Some(parent) = zip_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    let out = File::create(zip_path)
        .with_context(|| format!("creating {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let skip = zip_path.canonicalize().ok();

    let mut added = 0;
    for file in files {
        if skip.is_some() && file.canonicalize().ok() == skip {
            continue;
        }
        let rel = file.strip_prefix(root).unwrap_or(&file);
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        zip.start_file(name, options)?;
        let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        zip.write_all(&data)?;
        added += 1;
    }
    zip.finish()?;

    info!("wrote zip: {} ({added} files)", zip_path.display());
    Ok(added)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if path.is_file() {
            out.push(path);
        }
    }
    Ok(())
}
