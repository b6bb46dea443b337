//! Enumerating eligible images and driving the single ExifTool invocation.

use std::{
    ffi::OsString,
    fs, io,
    path::{Path, PathBuf},
    process::{Command, ExitStatus},
};
use thiserror::Error;

const SUFFIXES: [&str; 4] = ["jpg", "jpeg", "png", "tiff"];

fn has_image_suffix<P: AsRef<Path>>(file: P) -> bool {
    match file.as_ref().extension().and_then(|x| x.to_str()) {
        Some(ext) => SUFFIXES.iter().any(|s| ext.eq_ignore_ascii_case(s)),
        None => false,
    }
}

/// List the regular files directly inside `dir` whose extension marks them as
/// images, sorted so the tool invocation is deterministic. Subdirectories and
/// anything else are skipped, never descended into.
pub fn eligible_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|x| x.ok())
        .filter(|x| x.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|x| x.path())
        .filter(|p| has_image_suffix(p))
        .collect();
    files.sort();
    Ok(files)
}

/// Runs the resolved tool as a child process. The production implementation
/// is [`CommandRunner`]; tests substitute a recording fake.
pub trait ToolRunner {
    /// Run `tool` with `args`, blocking until it exits.
    fn run(&mut self, tool: &Path, args: &[OsString])
        -> io::Result<ExitStatus>;
}

/// [`ToolRunner`] backed by [`std::process::Command`].
pub struct CommandRunner;

impl ToolRunner for CommandRunner {
    fn run(
        &mut self, tool: &Path, args: &[OsString],
    ) -> io::Result<ExitStatus> {
        Command::new(tool).args(args).status()
    }
}

/// Strip metadata from `files` in one tool invocation, overwriting them in
/// place with no backups. A non-zero tool exit fails the whole batch; no
/// per-file retry.
pub fn strip_metadata(
    tool: &Path, files: &[PathBuf], runner: &mut dyn ToolRunner,
) -> Result<(), BatchError> {
    let mut args: Vec<OsString> =
        vec!["-all=".into(), "-overwrite_original".into()];
    args.extend(files.iter().map(|f| f.clone().into_os_string()));

    let status = runner.run(tool, &args)?;
    if !status.success() {
        return Err(BatchError::ToolFailure(status));
    }
    Ok(())
}

/// Errors that can happen while processing the batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The tool ran but reported failure.
    #[error("exiftool reported failure ({0})")]
    ToolFailure(ExitStatus),

    /// Wrapper around [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}
