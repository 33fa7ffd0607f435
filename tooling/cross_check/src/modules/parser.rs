use std::path::{Path, PathBuf};

use clap::Args;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::modules::{
    error::RunnerError,
    types::{HeaderFixture, RawFixture, RootFixture},
};

const ROOTS_DIR: &str = "roots";
const RAW_DIR: &str = "raw";
const HEADERS_FILE: &str = "headers.json";

/// Command line flags selecting the fixtures to check.
#[derive(Args, Debug, Clone)]
pub struct RunnerOptions {
    /// Fixture directory, holding `roots/`, `raw/` and `headers.json`
    #[arg(short, long, value_name = "PATH", default_value = "test/fixtures")]
    pub path: PathBuf,
    /// Only check these .json files. File names, not paths.
    #[arg(short, long, value_name = "JSON_FILES", value_delimiter = ',')]
    pub json_files: Vec<PathBuf>,
    /// Skip these .json files
    #[arg(long, value_name = "SKIP_FILES", value_delimiter = ',')]
    pub skip_files: Vec<PathBuf>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        RunnerOptions {
            path: PathBuf::from("test/fixtures"),
            json_files: Vec::new(),
            skip_files: Vec::new(),
        }
    }
}

/// Fixtures remember the file they were read from
pub trait Fixture: DeserializeOwned + Send {
    fn set_path(&mut self, path: &Path);
}

impl Fixture for RootFixture {
    fn set_path(&mut self, path: &Path) {
        self.path = path.to_path_buf();
    }
}

impl Fixture for RawFixture {
    fn set_path(&mut self, path: &Path) {
        self.path = path.to_path_buf();
    }
}

/// Parse a `.json` file holding a single value.
pub fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, RunnerError> {
    debug!(?path, "Parsing fixture file");
    let contents = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| RunnerError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse every `.json` file of a directory, one fixture per file.
pub fn parse_dir<T: Fixture>(
    path: &Path,
    skipped_files: &[PathBuf],
    only_files: &[PathBuf],
) -> Result<Vec<T>, RunnerError> {
    debug!(?path, "Parsing fixture directory");
    let io_error = |source| RunnerError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir_entries = std::fs::read_dir(path)
        .map_err(io_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_error)?;

    let parsed: Vec<Result<Option<T>, RunnerError>> = dir_entries
        .into_par_iter()
        .map(|entry| {
            let file_name = PathBuf::from(entry.file_name());
            let entry_path = entry.path();
            let is_json_file = entry_path.extension().is_some_and(|ext| ext == "json");
            if !is_json_file
                || skipped_files.contains(&file_name)
                || (!only_files.is_empty() && !only_files.contains(&file_name))
            {
                return Ok(None);
            }
            let mut fixture: T = parse_file(&entry_path)?;
            fixture.set_path(&entry_path);
            Ok(Some(fixture))
        })
        .collect();

    parsed
        .into_iter()
        .filter_map(Result::transpose)
        .collect()
}

/// Every fixture a run checks
#[derive(Debug, Default)]
pub struct FixtureSet {
    pub roots: Vec<RootFixture>,
    pub headers: Vec<HeaderFixture>,
    pub raw: Vec<RawFixture>,
}

impl FixtureSet {
    /// Loads the fixtures under `options.path`. Missing parts of the layout are left empty.
    pub fn load(options: &RunnerOptions) -> Result<Self, RunnerError> {
        let roots_dir = options.path.join(ROOTS_DIR);
        let raw_dir = options.path.join(RAW_DIR);
        let headers_file = options.path.join(HEADERS_FILE);

        let mut roots: Vec<RootFixture> = if roots_dir.is_dir() {
            parse_dir(&roots_dir, &options.skip_files, &options.json_files)?
        } else {
            Vec::new()
        };
        let mut raw: Vec<RawFixture> = if raw_dir.is_dir() {
            parse_dir(&raw_dir, &options.skip_files, &options.json_files)?
        } else {
            Vec::new()
        };
        let headers_selected = options.json_files.is_empty()
            || options.json_files.contains(&PathBuf::from(HEADERS_FILE));
        let headers_skipped = options.skip_files.contains(&PathBuf::from(HEADERS_FILE));
        let headers: Vec<HeaderFixture> =
            if headers_file.is_file() && headers_selected && !headers_skipped {
                parse_file(&headers_file)?
            } else {
                Vec::new()
            };

        // directory order is platform dependent
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        raw.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            path = ?options.path,
            roots = roots.len(),
            headers = headers.len(),
            raw = raw.len(),
            "Loaded fixtures"
        );
        Ok(FixtureSet {
            roots,
            headers,
            raw,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.headers.is_empty() && self.raw.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ROOT_FIXTURE: &str = r#"{
        "name": "empty",
        "blockNumber": "0x1",
        "transactions": [],
        "transactionsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
        "receipts": [],
        "receiptsRoot": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"
    }"#;

    fn fixture_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let roots = dir.path().join(ROOTS_DIR);
        fs::create_dir(&roots).unwrap();
        fs::write(roots.join("b.json"), ROOT_FIXTURE.replace("empty", "b")).unwrap();
        fs::write(roots.join("a.json"), ROOT_FIXTURE.replace("empty", "a")).unwrap();
        fs::write(roots.join("notes.txt"), "not a fixture").unwrap();
        dir
    }

    #[test]
    fn load_sorts_and_records_paths() {
        let dir = fixture_dir();
        let options = RunnerOptions {
            path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let set = FixtureSet::load(&options).unwrap();
        let names: Vec<_> = set.roots.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(set.roots[0].path, dir.path().join(ROOTS_DIR).join("a.json"));
        assert!(set.headers.is_empty());
        assert!(set.raw.is_empty());
    }

    #[test]
    fn skip_and_only_filters_apply() {
        let dir = fixture_dir();
        let skipped = FixtureSet::load(&RunnerOptions {
            path: dir.path().to_path_buf(),
            skip_files: vec![PathBuf::from("a.json")],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(skipped.roots.len(), 1);
        assert_eq!(skipped.roots[0].name, "b");

        let only = FixtureSet::load(&RunnerOptions {
            path: dir.path().to_path_buf(),
            json_files: vec![PathBuf::from("a.json")],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(only.roots.len(), 1);
        assert_eq!(only.roots[0].name, "a");
    }

    #[test]
    fn malformed_fixture_names_its_file() {
        let dir = fixture_dir();
        let bad = dir.path().join(ROOTS_DIR).join("c.json");
        fs::write(&bad, "{").unwrap();
        let err = parse_dir::<RootFixture>(&dir.path().join(ROOTS_DIR), &[], &[]).unwrap_err();
        assert!(matches!(err, RunnerError::Json { path, .. } if path == bad));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let err = parse_dir::<RootFixture>(Path::new("/nonexistent/fixtures"), &[], &[]).unwrap_err();
        assert!(matches!(err, RunnerError::Io { .. }));
    }
}
