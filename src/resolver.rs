//! Locating or provisioning the ExifTool executable. [`ToolStrategy`] forms
//! the main interface: one variant per platform family, selected once at
//! startup, so the rest of the program never branches on the host OS.

use crate::Reporter;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

/// Version-pinned ExifTool archive for Windows.
const EXIFTOOL_URL: &str = "https://sourceforge.net/projects/exiftool/files/exiftool-13.33_64.zip/download";

/// Name the Windows archive ships the executable under. The `(-k)` suffix
/// makes ExifTool pause for a keypress on exit, which hangs non-interactive
/// invocations.
const SAFE_MODE_EXE: &str = "exiftool(-k).exe";

/// Conventional executable name on Windows.
const PLAIN_EXE: &str = "exiftool.exe";

/// Conventional command name on the system search path.
const COMMAND_NAME: &str = "exiftool";

/// Downloads a tool archive to a local path. The production implementation
/// is [`HttpFetcher`]; tests substitute their own.
pub trait ArchiveFetcher {
    /// Fetch `url` and write the response body to `dest`.
    fn fetch(&self, url: &str, dest: &Path) -> anyhow::Result<()>;
}

/// [`ArchiveFetcher`] backed by a blocking HTTP client.
pub struct HttpFetcher;

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        let mut response = reqwest::blocking::get(url)?.error_for_status()?;
        let mut out = fs::File::create(dest)?;
        response.copy_to(&mut out)?;
        Ok(())
    }
}

/// How to come up with an ExifTool executable on this host.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ToolStrategy {
    /// Reuse a copy unpacked under `root`, downloading and extracting the
    /// pinned archive first if none is there. Windows only.
    AcquireAndExtract {
        /// Directory searched for an unpacked tool and extracted into.
        root: PathBuf,
    },

    /// Look up the conventional command name on the system search path.
    /// No automatic acquisition; a miss is fatal.
    SearchSystemPath,
}

impl ToolStrategy {
    /// Pick the strategy for the current host OS. `root` is only used on
    /// Windows, as the search and extraction directory.
    pub fn for_host(root: PathBuf) -> Self {
        if cfg!(windows) {
            ToolStrategy::AcquireAndExtract { root }
        } else {
            ToolStrategy::SearchSystemPath
        }
    }

    /// Produce a path to an executable ExifTool, acquiring it if this
    /// strategy allows. Any failure here means no tool invocation happens.
    pub fn resolve(
        &self, fetcher: &dyn ArchiveFetcher, reporter: &mut dyn Reporter,
    ) -> Result<PathBuf, ResolveError> {
        match self {
            ToolStrategy::AcquireAndExtract { root } => {
                resolve_extracted(root, fetcher, reporter)
            }
            ToolStrategy::SearchSystemPath => resolve_on_path(reporter),
        }
    }
}

fn resolve_extracted(
    root: &Path, fetcher: &dyn ArchiveFetcher, reporter: &mut dyn Reporter,
) -> Result<PathBuf, ResolveError> {
    let safe_mode = match find_executable(root, SAFE_MODE_EXE) {
        Some(path) => path,
        None => {
            reporter.report("Downloading ExifTool for Windows...");
            let archive = root.join("exiftool.zip");
            fetcher
                .fetch(EXIFTOOL_URL, &archive)
                .map_err(ResolveError::Download)?;
            reporter.report("Download complete.");

            reporter.report("Extracting ExifTool...");
            extract_archive(&archive, root)?;
            fs::remove_file(&archive)?;

            find_executable(root, SAFE_MODE_EXE)
                .ok_or_else(|| ResolveError::MissingExecutable(root.into()))?
        }
    };

    // Duplicate under the plain name so invocations don't hit the keypress
    // pause. Subsequent runs find the copy already in place.
    let plain = safe_mode.parent().unwrap_or(root).join(PLAIN_EXE);
    if !plain.exists() {
        fs::copy(&safe_mode, &plain)?;
    }
    reporter
        .report(&format!("Using ExifTool executable at: {}", plain.display()));
    Ok(plain)
}

fn resolve_on_path(
    reporter: &mut dyn Reporter,
) -> Result<PathBuf, ResolveError> {
    match which::which(COMMAND_NAME) {
        Ok(path) => {
            reporter.report(&format!(
                "Using ExifTool executable at: {}",
                path.display()
            ));
            Ok(path)
        }
        Err(_) => {
            reporter.report(
                "ExifTool not found on your system. Please install it manually.",
            );
            reporter.report("On macOS: brew install exiftool");
            reporter.report(
                "On Linux (Debian/Ubuntu): sudo apt install libimage-exiftool-perl",
            );
            Err(ResolveError::NotInstalled)
        }
    }
}

/// Search `root` and all its subdirectories for a file called `name`,
/// case-insensitively. Used both for the pre-download check and for locating
/// the executable in a freshly extracted tree.
pub fn find_executable(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| {
            entry.file_type().is_file()
                && entry.file_name().to_string_lossy().eq_ignore_ascii_case(name)
        })
        .map(|entry| entry.into_path())
}

fn extract_archive(archive: &Path, dest: &Path) -> Result<(), ResolveError> {
    let file = fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    zip.extract(dest)?;
    Ok(())
}

/// Errors that can happen while resolving the tool.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The archive download failed.
    #[error("could not download ExifTool archive: {0}")]
    Download(#[source] anyhow::Error),

    /// The downloaded archive could not be read or unpacked.
    #[error("could not unpack ExifTool archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Extraction finished but the expected executable is nowhere in the
    /// extracted tree.
    #[error("extracted ExifTool executable not found under {}", .0.display())]
    MissingExecutable(PathBuf),

    /// No installed tool and this platform does not auto-acquire.
    #[error("exiftool is not installed")]
    NotInstalled,

    /// Wrapper around [`std::io::Error`].
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::{write::SimpleFileOptions, ZipWriter};

    struct Quiet;

    impl Reporter for Quiet {
        fn report(&mut self, _line: &str) {}
    }

    /// Writes a zip with the given entries to wherever it is told to fetch.
    struct ZipFetcher {
        entries: Vec<&'static str>,
    }

    impl ArchiveFetcher for ZipFetcher {
        fn fetch(&self, _url: &str, dest: &Path) -> anyhow::Result<()> {
            let file = fs::File::create(dest)?;
            let mut zip = ZipWriter::new(file);
            for name in &self.entries {
                zip.start_file(*name, SimpleFileOptions::default())?;
                zip.write_all(b"stand-in executable")?;
            }
            zip.finish()?;
            Ok(())
        }
    }

    /// Fails the test if the resolver goes to the network.
    struct NoFetch;

    impl ArchiveFetcher for NoFetch {
        fn fetch(&self, _url: &str, _dest: &Path) -> anyhow::Result<()> {
            panic!("unexpected fetch");
        }
    }

    #[test]
    fn find_executable_matches_case_insensitively_in_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exiftool-13.33_64");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("ExifTool(-k).EXE"), b"x").unwrap();

        let found = find_executable(dir.path(), SAFE_MODE_EXE).unwrap();
        assert_eq!(found, nested.join("ExifTool(-k).EXE"));
    }

    #[test]
    fn find_executable_ignores_directories_and_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(SAFE_MODE_EXE)).unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();

        assert!(find_executable(dir.path(), SAFE_MODE_EXE).is_none());
    }

    #[test]
    fn acquisition_extracts_and_duplicates_under_plain_name() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = ToolStrategy::AcquireAndExtract {
            root: dir.path().to_path_buf(),
        };
        let fetcher = ZipFetcher {
            entries: vec![
                "exiftool-13.33_64/exiftool(-k).exe",
                "exiftool-13.33_64/readme.txt",
            ],
        };

        let tool = strategy.resolve(&fetcher, &mut Quiet).unwrap();
        assert_eq!(
            tool,
            dir.path().join("exiftool-13.33_64").join(PLAIN_EXE)
        );
        assert!(tool.is_file());
        // Temporary archive is cleaned up, extracted tree stays.
        assert!(!dir.path().join("exiftool.zip").exists());
        assert!(dir
            .path()
            .join("exiftool-13.33_64")
            .join(SAFE_MODE_EXE)
            .is_file());
    }

    #[test]
    fn acquisition_fails_when_archive_lacks_the_executable() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = ToolStrategy::AcquireAndExtract {
            root: dir.path().to_path_buf(),
        };
        let fetcher = ZipFetcher {
            entries: vec!["exiftool-13.33_64/readme.txt"],
        };

        let err = strategy.resolve(&fetcher, &mut Quiet).unwrap_err();
        assert!(matches!(err, ResolveError::MissingExecutable(_)));
    }

    #[test]
    fn existing_tree_is_reused_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exiftool-13.33_64");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join(SAFE_MODE_EXE), b"x").unwrap();

        let strategy = ToolStrategy::AcquireAndExtract {
            root: dir.path().to_path_buf(),
        };
        let tool = strategy.resolve(&NoFetch, &mut Quiet).unwrap();
        assert_eq!(tool, nested.join(PLAIN_EXE));
        assert!(tool.is_file());

        // And again, now that the plain-named copy exists too.
        let tool = strategy.resolve(&NoFetch, &mut Quiet).unwrap();
        assert_eq!(tool, nested.join(PLAIN_EXE));
    }
}
