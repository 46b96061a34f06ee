//! Library classification and dependency ordering.

use std::collections::{BTreeMap, BTreeSet};

use crate::project::Project;
use crate::registry::NameRegistry;
use crate::report::{ConversionReport, Warning};
use crate::settings::{push_unique, translate_macros};

// ═══════════════════════════════════════════════════════════════════════════════
//  Library references
// ═══════════════════════════════════════════════════════════════════════════════

/// One entry of a project's link list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryReference {
    /// Text as written in the project document, after evaluation.
    pub raw: String,
    /// Path with MSBuild macros translated and separators normalized.
    pub path: String,
}

impl LibraryReference {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            path: translate_macros(raw),
        }
    }

    /// File name without directory and `.lib` extension.
    pub fn stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(dot) if name[dot..].eq_ignore_ascii_case(".lib") => &name[..dot],
            _ => name,
        }
    }

    pub fn is_bare_name(&self) -> bool {
        !self.path.contains('/')
    }
}

/// Where an external library lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExternalCategory {
    Public,
    Common,
    Sdk,
    Other,
    /// Absolute filesystem path: not portable, never linked automatically.
    AbsolutePath,
}

/// Classification of a [`LibraryReference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryKind {
    /// Produced by another project of the solution (holds its identifier).
    InternalTarget(String),
    /// A well-known Windows SDK import library (holds the bare name).
    SystemLibrary(String),
    ExternalLibrary {
        path: String,
        category: ExternalCategory,
    },
    /// Anything else; linked as written.
    Unresolved(String),
}

impl LibraryKind {
    /// The text to hand to `target_link_libraries`.
    pub fn link_item(&self) -> &str {
        match self {
            LibraryKind::InternalTarget(name) | LibraryKind::SystemLibrary(name) => name,
            LibraryKind::ExternalLibrary { path, .. } | LibraryKind::Unresolved(path) => path,
        }
    }
}

/// Windows SDK import libraries linked by name.
const SYSTEM_LIBRARIES: &[&str] = &[
    "advapi32",
    "bcrypt",
    "comctl32",
    "comdlg32",
    "crypt32",
    "d3d11",
    "d3d9",
    "d3dcompiler",
    "dbghelp",
    "dwmapi",
    "dxgi",
    "gdi32",
    "glu32",
    "imm32",
    "iphlpapi",
    "kernel32",
    "legacy_stdio_definitions",
    "mpr",
    "msimg32",
    "netapi32",
    "normaliz",
    "ntdll",
    "odbc32",
    "odbccp32",
    "ole32",
    "oleaut32",
    "opengl32",
    "psapi",
    "rpcrt4",
    "secur32",
    "setupapi",
    "shcore",
    "shell32",
    "shlwapi",
    "user32",
    "userenv",
    "uuid",
    "uxtheme",
    "version",
    "winhttp",
    "wininet",
    "winmm",
    "winspool",
    "wldap32",
    "ws2_32",
    "wsock32",
    "wtsapi32",
];

pub fn is_system_library(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SYSTEM_LIBRARIES.binary_search(&name.as_str()).is_ok()
}

/// Drive-letter, rooted or UNC path.
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive = bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'/' || bytes[2] == b'\\');
    drive || path.starts_with('/') || path.starts_with('\\')
}

/// Directory segments that mark a library's origin.
fn category_of(path: &str) -> Option<ExternalCategory> {
    let segments: Vec<String> = path
        .split('/')
        .rev()
        .skip(1)
        .map(str::to_ascii_lowercase)
        .collect();
    for segment in &segments {
        let category = match segment.as_str() {
            "public" => ExternalCategory::Public,
            "common" => ExternalCategory::Common,
            "sdk" => ExternalCategory::Sdk,
            "third_party" | "thirdparty" | "3rdparty" | "vendor" => ExternalCategory::Other,
            _ => continue,
        };
        return Some(category);
    }
    None
}

/// Classify one library reference.
///
/// Precedence: solution target, Windows system library, recognized
/// directory marker, absolute path, unresolved.
pub fn classify(reference: &LibraryReference, registry: &NameRegistry) -> LibraryKind {
    let stem = reference.stem();

    if let Some(identifier) = registry.resolve(stem) {
        return LibraryKind::InternalTarget(identifier.to_string());
    }
    if is_system_library(stem) {
        return LibraryKind::SystemLibrary(stem.to_ascii_lowercase());
    }
    if !is_absolute(&reference.path) {
        if let Some(category) = category_of(&reference.path) {
            return LibraryKind::ExternalLibrary {
                path: reference.path.clone(),
                category,
            };
        }
    }
    if is_absolute(&reference.path) {
        return LibraryKind::ExternalLibrary {
            path: reference.path.clone(),
            category: ExternalCategory::AbsolutePath,
        };
    }
    if reference.is_bare_name() {
        return LibraryKind::Unresolved(stem.to_string());
    }
    LibraryKind::Unresolved(reference.path.clone())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Per-project link plan
// ═══════════════════════════════════════════════════════════════════════════════

/// Classified link inputs of one project.
#[derive(Debug, Clone, Default)]
pub struct ProjectLinks {
    /// Classified libraries per configuration, in link order.
    pub per_config: BTreeMap<String, Vec<LibraryKind>>,
    /// Targets named by `<ProjectReference>` items.
    pub project_references: Vec<String>,
}

impl ProjectLinks {
    /// Identifiers of every solution target this project links.
    pub fn internal_dependencies(&self) -> BTreeSet<&str> {
        let mut deps: BTreeSet<&str> = self.project_references.iter().map(String::as_str).collect();
        for kinds in self.per_config.values() {
            for kind in kinds {
                if let LibraryKind::InternalTarget(name) = kind {
                    deps.insert(name);
                }
            }
        }
        deps
    }
}

/// Classify every library a project links and resolve its project
/// references.
pub fn resolve_links(
    project: &Project,
    registry: &NameRegistry,
    report: &mut ConversionReport,
) -> ProjectLinks {
    let mut links = ProjectLinks::default();
    let mut absolute_seen: Vec<String> = Vec::new();

    for (config, settings) in &project.settings {
        let mut kinds = Vec::new();
        for reference in &settings.libraries {
            let kind = classify(reference, registry);
            match &kind {
                // A project may list its own import library.
                LibraryKind::InternalTarget(name) if *name == project.identifier => continue,
                LibraryKind::ExternalLibrary {
                    path,
                    category: ExternalCategory::AbsolutePath,
                } => {
                    if !absolute_seen.contains(path) {
                        absolute_seen.push(path.clone());
                        report.warn(Warning::AbsoluteLibraryPath {
                            project: project.name.clone(),
                            path: path.clone(),
                        });
                    }
                }
                _ => {}
            }
            tracing::debug!("{}: {} -> {:?}", project.name, reference.raw, kind);
            push_unique(&mut kinds, kind);
        }
        links.per_config.insert(config.clone(), kinds);
    }

    for reference in &project.project_references {
        match registry.resolve(reference) {
            Some(identifier) if identifier != project.identifier => {
                push_unique(&mut links.project_references, identifier.to_string());
            }
            Some(_) => {}
            None => report.warn(Warning::UnresolvedProjectReference {
                project: project.name.clone(),
                reference: reference.clone(),
            }),
        }
    }

    links
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Ordering
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of [`order_by_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOrder {
    /// Item indices, each placed after the dependencies that were placeable.
    pub order: Vec<usize>,
    /// Items that could not be ordered because of a cycle, in discovery
    /// order. They were appended to `order` unchanged.
    pub cycle: Vec<usize>,
}

/// Order `count` items so every item comes after its dependencies.
///
/// `dependencies(i)` lists the items `i` depends on; indices outside the set
/// and self-references are ignored. Each pass places, in discovery order,
/// every item whose dependencies are already placed. When a pass places
/// nothing, the remaining items are appended in discovery order.
pub fn order_by_dependencies<F>(count: usize, dependencies: F) -> DependencyOrder
where
    F: Fn(usize) -> Vec<usize>,
{
    let deps: Vec<Vec<usize>> = (0..count)
        .map(|i| {
            dependencies(i)
                .into_iter()
                .filter(|&d| d != i && d < count)
                .collect()
        })
        .collect();

    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);
    let mut cycle = Vec::new();

    while order.len() < count {
        let mut progress = false;
        for i in 0..count {
            if !placed[i] && deps[i].iter().all(|&d| placed[d]) {
                placed[i] = true;
                order.push(i);
                progress = true;
            }
        }
        if !progress {
            cycle = (0..count).filter(|&i| !placed[i]).collect();
            order.extend(&cycle);
            break;
        }
    }

    DependencyOrder { order, cycle }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
