//! Non-fatal findings collected during a conversion run.

use std::fmt;
use std::path::PathBuf;

/// A problem that did not stop the run.
///
/// Every warning is also logged through `tracing` at the point it is raised;
/// the report lets callers inspect them programmatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A solution entry points at a file that does not exist.
    MissingProjectFile { name: String, path: PathBuf },
    /// A solution entry uses a project format this tool does not read.
    UnsupportedProject { name: String, path: PathBuf },
    /// A project document could not be read or parsed; it was converted
    /// with a filename-derived identity and no settings.
    MalformedProject { path: PathBuf, reason: String },
    /// The selected configuration does not exist in a project.
    UnknownConfiguration { project: String, configuration: String },
    /// Two projects claimed the same registry key; the first one kept it.
    NameCollision {
        key: String,
        kept: String,
        ignored: String,
    },
    /// Projects in an emission unit depend on each other in a cycle.
    DependencyCycle { unit: String, members: Vec<String> },
    /// A library reference uses a non-portable absolute path and was not
    /// linked.
    AbsoluteLibraryPath { project: String, path: String },
    /// A `<ProjectReference>` points at a project outside the catalog.
    UnresolvedProjectReference { project: String, reference: String },
    /// `WINVER` and `_WIN32_WINNT` carry different values.
    WindowsVersionMismatch {
        project: String,
        winver: String,
        win32_winnt: String,
    },
    /// A Windows-version symbol has different values across configurations.
    WindowsVersionDiverges {
        project: String,
        symbol: String,
        /// `Config=value` per configuration.
        values: Vec<String>,
    },
    /// A condition attribute could not be parsed; its block was ignored.
    UnparsedCondition { project: String, condition: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MissingProjectFile { name, path } => {
                write!(f, "project '{name}' skipped: {} does not exist", path.display())
            }
            Warning::UnsupportedProject { name, path } => {
                write!(f, "project '{name}' skipped: {} is not a .vcxproj", path.display())
            }
            Warning::MalformedProject { path, reason } => {
                write!(f, "{}: could not be parsed ({reason}); using file name only", path.display())
            }
            Warning::UnknownConfiguration {
                project,
                configuration,
            } => write!(
                f,
                "project '{project}' has no configuration '{configuration}'; converting it anyway"
            ),
            Warning::NameCollision { key, kept, ignored } => write!(
                f,
                "name '{key}' is claimed by both '{kept}' and '{ignored}'; '{kept}' keeps it"
            ),
            Warning::DependencyCycle { unit, members } => write!(
                f,
                "dependency cycle in '{unit}' between {}; falling back to discovery order",
                members.join(", ")
            ),
            Warning::AbsoluteLibraryPath { project, path } => write!(
                f,
                "project '{project}' links '{path}' by absolute path; left for manual review"
            ),
            Warning::UnresolvedProjectReference { project, reference } => write!(
                f,
                "project '{project}' references '{reference}', which is not part of the solution"
            ),
            Warning::WindowsVersionMismatch {
                project,
                winver,
                win32_winnt,
            } => write!(
                f,
                "project '{project}' defines WINVER={winver} but _WIN32_WINNT={win32_winnt}"
            ),
            Warning::WindowsVersionDiverges {
                project,
                symbol,
                values,
            } => write!(
                f,
                "project '{project}' defines {symbol} differently per configuration: {}",
                values.join(", ")
            ),
            Warning::UnparsedCondition { project, condition } => {
                write!(f, "project '{project}': ignoring block with condition \"{condition}\"")
            }
        }
    }
}

/// Warnings raised during one run, in the order they occurred.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    pub warnings: Vec<Warning>,
}

impl ConversionReport {
    /// Record a warning and log it.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for w in warnings {
            self.warn(w);
        }
    }

    /// Cycles found while ordering, for callers that treat them as hard
    /// warnings.
    pub fn cycles(&self) -> impl Iterator<Item = &Warning> {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::DependencyCycle { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
