#![warn(missing_docs)]
//! The main image scrub program: strips embedded metadata (EXIF/IPTC/XMP)
//! from every image directly inside a target directory by shelling out to
//! ExifTool, downloading ExifTool first on Windows if it is not already
//! unpacked next to the program.

use anyhow::{Context, Result};
use batch::{CommandRunner, ToolRunner};
use clap::Parser;
use resolver::{ArchiveFetcher, HttpFetcher, ToolStrategy};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

pub mod batch;
pub mod resolver;

/// Arguments to the image scrub program.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory containing the images to scrub (default: "target" next to
    /// the executable)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

/// Sink for progress messages. The production implementation is
/// [`StdoutReporter`]; tests substitute a collecting fake.
pub trait Reporter {
    /// Emit one line of progress output.
    fn report(&mut self, line: &str);
}

/// [`Reporter`] that prints to standard output.
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report(&mut self, line: &str) {
        println!("{line}");
    }
}

/// How a successful run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    /// The target directory did not exist; it was created and the run
    /// stopped so the user can populate it.
    CreatedTargetDir,

    /// The target directory holds no eligible images; nothing was invoked.
    NothingToDo,

    /// Metadata was stripped from this many files.
    Stripped(usize),
}

/// Run the image scrub program.
pub fn run(args: &Args) -> Result<()> {
    let base = base_dir()?;
    let target = match &args.dir {
        Some(dir) => dir.clone(),
        None => base.join("target"),
    };
    let strategy = ToolStrategy::for_host(base);

    run_with(
        &target,
        &strategy,
        &HttpFetcher,
        &mut CommandRunner,
        &mut StdoutReporter,
    )?;
    Ok(())
}

/// [`run`] with every outside boundary injectable: the tool strategy, the
/// archive download, the child-process invocation, and the output sink.
pub fn run_with(
    target: &Path, strategy: &ToolStrategy, fetcher: &dyn ArchiveFetcher,
    runner: &mut dyn ToolRunner, reporter: &mut dyn Reporter,
) -> Result<RunOutcome> {
    if !target.is_dir() {
        fs::create_dir_all(target).with_context(|| {
            format!("could not create target directory {}", target.display())
        })?;
        reporter.report(&format!(
            "Target directory created: {}",
            target.display()
        ));
        reporter
            .report("Place your images inside it and re-run the program.");
        return Ok(RunOutcome::CreatedTargetDir);
    }

    reporter
        .report(&format!("Processing images in: {}", target.display()));

    let files = batch::eligible_files(target)?;
    if files.is_empty() {
        reporter.report("No image files found to process.");
        return Ok(RunOutcome::NothingToDo);
    }

    // Resolve only once there is something to do, so an empty run never
    // touches the network.
    let tool = strategy.resolve(fetcher, reporter)?;

    reporter.report(&format!(
        "Removing metadata from {} files...",
        files.len()
    ));
    batch::strip_metadata(&tool, &files, runner)?;

    reporter.report("Metadata removal complete.");
    Ok(RunOutcome::Stripped(files.len()))
}

/// Directory holding the program's own executable. The default target
/// directory and the Windows tool tree both live here.
fn base_dir() -> Result<PathBuf> {
    let exe = env::current_exe()
        .context("could not determine the program's own location")?;
    let dir = exe
        .parent()
        .context("program executable has no parent directory")?;
    Ok(dir.to_path_buf())
}
