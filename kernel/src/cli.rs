//! Command line and artifact output for the `trapgen` binary.
//!
//! Artifacts are replaced as a set. Every destination is checked and every
//! new file is written beside it before anything is renamed. If a rename
//! still fails, the files already replaced are restored from their backups.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use trapgen::codegen::Artifacts;

pub const DEFAULT_OUT_DIR: &str = "generated";
pub const USAGE: &str = "usage: trapgen generate [OUT_DIR]";

/// Output directory for `generate [OUT_DIR]`, or `None` on a usage error.
pub fn parse_args(mut args: impl Iterator<Item = String>) -> Option<PathBuf> {
    if args.next()? != "generate" {
        return None;
    }
    let out_dir = args.next().unwrap_or_else(|| DEFAULT_OUT_DIR.into());
    match args.next() {
        Some(_) => None,
        None => Some(PathBuf::from(out_dir)),
    }
}

/// One artifact on its way into `OUT_DIR`.
struct Staged {
    tmp: PathBuf,
    backup: PathBuf,
    dest: PathBuf,
}

impl Staged {
    fn new(out_dir: &Path, file_name: &str) -> Self {
        Staged {
            tmp: out_dir.join(format!(".{file_name}.tmp")),
            backup: out_dir.join(format!(".{file_name}.bak")),
            dest: out_dir.join(file_name),
        }
    }
}

/// Fails if some destination exists but is not a plain file.
fn check_destinations(staged: &[Staged]) -> io::Result<()> {
    for entry in staged {
        match fs::symlink_metadata(&entry.dest) {
            Ok(meta) if !meta.is_file() => {
                return Err(io::Error::other(format!(
                    "{} exists and is not a file",
                    entry.dest.display()
                )))
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Moves one staged file into place. Returns whether an old file was backed up.
fn replace(entry: &Staged) -> io::Result<bool> {
    let had_old = entry.dest.is_file();
    if had_old {
        fs::rename(&entry.dest, &entry.backup)?;
    }
    if let Err(err) = fs::rename(&entry.tmp, &entry.dest) {
        if had_old {
            let _ = fs::rename(&entry.backup, &entry.dest);
        }
        return Err(err);
    }
    Ok(had_old)
}

/// Renames every staged file into place, or none of them.
fn swap_in(staged: &[Staged]) -> io::Result<()> {
    let mut replaced = Vec::new();
    for entry in staged {
        match replace(entry) {
            Ok(had_old) => replaced.push((entry, had_old)),
            Err(err) => {
                for (done, had_old) in replaced.into_iter().rev() {
                    if had_old {
                        let _ = fs::rename(&done.backup, &done.dest);
                    } else {
                        let _ = fs::remove_file(&done.dest);
                    }
                }
                return Err(err);
            }
        }
    }
    for (done, had_old) in replaced {
        if had_old {
            let _ = fs::remove_file(&done.backup);
        }
    }
    Ok(())
}

/// Writes all artifacts into `out_dir`, replacing any previous set.
pub fn write_all(out_dir: &Path, artifacts: &Artifacts) -> io::Result<()> {
    fs::create_dir_all(out_dir)?;

    let staged: Vec<Staged> = artifacts
        .iter()
        .map(|artifact| Staged::new(out_dir, artifact.kind.file_name()))
        .collect();
    check_destinations(&staged)?;

    let result = artifacts
        .iter()
        .zip(&staged)
        .try_for_each(|(artifact, entry)| fs::write(&entry.tmp, &artifact.contents))
        .and_then(|()| swap_in(&staged));

    if result.is_err() {
        for entry in &staged {
            let _ = fs::remove_file(&entry.tmp);
        }
    }
    result
}
