//! Solution catalog.
//!
//! Reads the project list of a `.sln` (text) or `.slnx` (XML) solution.
//! Only the project entries matter: configuration mappings and nested
//! solution folders are ignored.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::report::{ConversionReport, Warning};

/// `Project("{type}") = "Name", "path\to\Name.vcxproj", "{guid}"`
const SLN_PROJECT_PATTERN: &str =
    r#"Project\("\{[^}]+\}"\)\s*=\s*"([^"]+)"\s*,\s*"([^"]+)"\s*,\s*"\{([^}]+)\}""#;

static SLN_PROJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SLN_PROJECT_PATTERN).expect("SLN_PROJECT_PATTERN is a valid regex"));

/// One project listed by a solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionEntry {
    /// Name the solution gives the project.
    pub name: String,
    /// Project path as written in the solution, with forward slashes.
    pub relative_path: String,
    /// Resolved location of the project file.
    pub path: PathBuf,
    pub guid: Option<String>,
}

/// Projects of one solution, in declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Solution file stem.
    pub name: String,
    pub directory: PathBuf,
    pub entries: Vec<SolutionEntry>,
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn stem_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `(name, relative path, guid)` triples from `.sln` text.
pub fn parse_sln(content: &str) -> Vec<(String, String, Option<String>)> {
    SLN_PROJECT
        .captures_iter(content)
        .map(|cap| {
            (
                cap[1].trim().to_string(),
                cap[2].trim().replace('\\', "/"),
                Some(cap[3].to_ascii_uppercase()),
            )
        })
        .collect()
}

/// `(name, relative path, guid)` triples from `.slnx` XML.
pub fn parse_slnx(content: &str) -> std::result::Result<Vec<(String, String, Option<String>)>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(content)?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name("Project"))
        .filter_map(|n| {
            let path = n.attribute("Path")?.trim().replace('\\', "/");
            let name = n
                .attribute("DisplayName")
                .or_else(|| n.attribute("Name"))
                .map(str::to_string)
                .unwrap_or_else(|| stem_of(&path));
            let guid = n.attribute("Id").map(|id| {
                id.trim_matches(|c| c == '{' || c == '}').to_ascii_uppercase()
            });
            Some((name, path, guid))
        })
        .collect())
}

fn has_extension(path: &str, ext: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
}

impl Catalog {
    /// Read a `.sln` or `.slnx` solution.
    ///
    /// Entries that are not `.vcxproj` files are dropped: solution folders
    /// and other project kinds silently, legacy `.vcproj` files and
    /// missing files with a warning.
    pub fn read(path: &Path, report: &mut ConversionReport) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let content = content.trim_start_matches('\u{feff}');

        let raw = if has_extension(&path.to_string_lossy(), "slnx") {
            parse_slnx(content).map_err(|e| Error::xml(path, e))?
        } else {
            parse_sln(content)
        };

        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut entries: Vec<SolutionEntry> = Vec::new();

        for (name, relative_path, guid) in raw {
            let project_path = normalize_path(&directory.join(&relative_path));

            if has_extension(&relative_path, "vcproj") {
                report.warn(Warning::UnsupportedProject {
                    name,
                    path: project_path,
                });
                continue;
            }
            if !has_extension(&relative_path, "vcxproj") {
                tracing::debug!("skipping solution entry {name} ({relative_path})");
                continue;
            }
            if !project_path.is_file() {
                report.warn(Warning::MissingProjectFile {
                    name,
                    path: project_path,
                });
                continue;
            }
            if entries.iter().any(|e| e.path == project_path) {
                continue;
            }
            entries.push(SolutionEntry {
                name,
                relative_path,
                path: project_path,
                guid,
            });
        }

        tracing::info!("{}: {} projects", path.display(), entries.len());

        Ok(Self {
            name: stem_of(&path.to_string_lossy()),
            directory,
            entries,
        })
    }

    /// A catalog holding a single project file.
    pub fn single_project(path: &Path) -> Self {
        let name = stem_of(&path.to_string_lossy());
        let relative_path = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: name.clone(),
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            entries: vec![SolutionEntry {
                name,
                relative_path,
                path: path.to_path_buf(),
                guid: None,
            }],
        }
    }
}
