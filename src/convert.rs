//! Conversion driver.
//!
//! Ties the stages together: catalog → project models → name registry →
//! link classification → ordering → emission.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::dependency::{self, ProjectLinks, order_by_dependencies};
use crate::emit::{self, EmitContext, EmitOptions, RootDocument, TargetEntry};
use crate::error::{Error, Result};
use crate::project::{LoadOptions, Project, TargetType};
use crate::registry::{NameRegistry, RegistryBuilder, registry_key};
use crate::report::{ConversionReport, Warning};
use crate::solution::Catalog;

/// File name of every generated document.
pub const CMAKE_LISTS: &str = "CMakeLists.txt";

// ═══════════════════════════════════════════════════════════════════════════════
//  ConverterBuilder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for a [`Converter`].
///
/// ```no_run
/// use std::path::Path;
/// use vcxproj_cmake::ConverterBuilder;
///
/// let conversion = ConverterBuilder::new()
///     .configuration("Release")
///     .env_var("BOOST_ROOT", "C:/boost")
///     .build()
///     .convert(Path::new("Game.sln"))?;
/// conversion.write()?;
/// # Ok::<(), vcxproj_cmake::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConverterBuilder {
    load: LoadOptions,
    emit: EmitOptions,
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert only this configuration instead of all of them.
    pub fn configuration(mut self, name: impl Into<String>) -> Self {
        self.load.configuration = Some(name.into());
        self
    }

    /// Evaluate projects for this platform instead of their first one.
    pub fn platform(mut self, name: impl Into<String>) -> Self {
        self.load.platform = Some(name.into());
        self
    }

    /// Merge an entire variable map into the MSBuild property environment.
    ///
    /// Later calls override earlier values for the same key.
    pub fn env(mut self, vars: HashMap<String, String>) -> Self {
        self.load.env.extend(vars);
        self
    }

    /// Set a single MSBuild property.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.load.env.insert(key.into(), value.into());
        self
    }

    /// Pull all current process environment variables into the map.
    pub fn system_env(mut self) -> Self {
        self.load.env.extend(std::env::vars());
        self
    }

    /// Value of `CMAKE_CXX_STANDARD` in the root document.
    pub fn cxx_standard(mut self, standard: impl Into<String>) -> Self {
        self.emit.cxx_standard = standard.into();
        self
    }

    pub fn cmake_minimum_version(mut self, version: impl Into<String>) -> Self {
        self.emit.cmake_minimum_version = version.into();
        self
    }

    pub fn build(self) -> Converter {
        Converter {
            load: self.load,
            emit: self.emit,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Results
// ═══════════════════════════════════════════════════════════════════════════════

/// A generated `CMakeLists.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub path: PathBuf,
    pub contents: String,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Generated documents, root first.
    pub documents: Vec<OutputDocument>,
    /// Loaded projects in catalog order.
    pub projects: Vec<Project>,
    /// Target identifiers in the order they are declared.
    pub build_order: Vec<String>,
    pub registry: NameRegistry,
    pub report: ConversionReport,
}

impl Conversion {
    /// Write every document to disk, replacing existing files.
    pub fn write(&self) -> Result<()> {
        for doc in &self.documents {
            if let Some(parent) = doc.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            std::fs::write(&doc.path, &doc.contents).map_err(|e| Error::io(&doc.path, e))?;
            tracing::info!("wrote {}", doc.path.display());
        }
        Ok(())
    }

    pub fn document(&self, path: &Path) -> Option<&OutputDocument> {
        self.documents.iter().find(|d| d.path == path)
    }

    pub fn project(&self, identifier: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.identifier == identifier)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Converter
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct Converter {
    load: LoadOptions,
    emit: EmitOptions,
}

/// Projects sharing one directory, and so one `CMakeLists.txt`.
#[derive(Debug)]
struct Unit {
    /// Directory relative to the root, `/`-separated; empty for the root.
    key: String,
    directory: PathBuf,
    /// Project indices in build order.
    members: Vec<usize>,
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn unit_key(directory: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(directory, root).unwrap_or_else(|| directory.to_path_buf());
    let key = relative.to_string_lossy().replace('\\', "/");
    let key = key.trim_end_matches('/');
    if key == "." { String::new() } else { key.to_string() }
}

fn target_entries<'a>(
    members: &[usize],
    projects: &'a [Project],
    links: &'a [ProjectLinks],
) -> Vec<TargetEntry<'a>> {
    members
        .iter()
        .map(|&i| TargetEntry {
            project: &projects[i],
            links: &links[i],
        })
        .collect()
}

impl Converter {
    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::new()
    }

    /// Convert a `.sln`, `.slnx` or `.vcxproj` file.
    ///
    /// Only an unreadable or unsupported input fails; problems with
    /// individual projects end up in [`Conversion::report`].
    pub fn convert(&self, input: &Path) -> Result<Conversion> {
        let mut report = ConversionReport::default();
        match extension_of(input).as_str() {
            "sln" | "slnx" => {
                let catalog = Catalog::read(input, &mut report)?;
                Ok(self.convert_catalog(&catalog, input, false, report))
            }
            "vcxproj" => {
                if !input.is_file() {
                    return Err(Error::io(
                        input,
                        std::io::Error::new(std::io::ErrorKind::NotFound, "project file not found"),
                    ));
                }
                let catalog = Catalog::single_project(input);
                Ok(self.convert_catalog(&catalog, input, true, report))
            }
            _ => Err(Error::UnsupportedInput {
                path: input.to_path_buf(),
            }),
        }
    }

    fn convert_catalog(
        &self,
        catalog: &Catalog,
        input: &Path,
        standalone: bool,
        mut report: ConversionReport,
    ) -> Conversion {
        // ── Load ─────────────────────────────────────────────────────────────
        let mut projects: Vec<Project> = catalog
            .entries
            .iter()
            .map(|entry| Project::load(&entry.path, &entry.name, &self.load, &mut report))
            .collect();

        // ── Register every name before resolving any ──────────────────────
        let mut builder = RegistryBuilder::new();
        for project in &mut projects {
            let identifier = builder.claim(&project.identifier);
            if identifier != project.identifier {
                tracing::debug!(
                    "target identifier '{}' of {} is taken, using '{identifier}'",
                    project.identifier,
                    project.path.display()
                );
                project.identifier = identifier;
            }
        }
        for project in &projects {
            builder.register(&project.identifier, &project.name);
        }
        for project in &projects {
            if registry_key(&project.identifier) != registry_key(&project.name) {
                builder.register(&project.identifier, &project.identifier);
            }
            for alias in project.aliases() {
                builder.register(&project.identifier, &alias);
            }
        }
        let (registry, collisions) = builder.build();
        report.extend(collisions);

        // ── Classify ─────────────────────────────────────────────────────────
        let links: Vec<ProjectLinks> = projects
            .iter()
            .map(|p| dependency::resolve_links(p, &registry, &mut report))
            .collect();

        let mut target_types: BTreeMap<String, TargetType> = BTreeMap::new();
        let mut owner: HashMap<&str, usize> = HashMap::new();
        for (idx, project) in projects.iter().enumerate() {
            target_types
                .entry(project.identifier.clone())
                .or_insert(project.target_type);
            owner.entry(project.identifier.as_str()).or_insert(idx);
        }
        let deps_of = |idx: usize| -> Vec<usize> {
            links[idx]
                .internal_dependencies()
                .into_iter()
                .filter_map(|id| owner.get(id).copied())
                .collect()
        };

        // ── Group and order ──────────────────────────────────────────────────
        let mut units: Vec<Unit> = Vec::new();
        for (idx, project) in projects.iter().enumerate() {
            let key = unit_key(&project.directory, &catalog.directory);
            match units.iter_mut().find(|u| u.key == key) {
                Some(unit) => unit.members.push(idx),
                None => units.push(Unit {
                    key,
                    directory: project.directory.clone(),
                    members: vec![idx],
                }),
            }
        }

        for unit in &mut units {
            let label = if unit.key.is_empty() { catalog.name.clone() } else { unit.key.clone() };
            let (libraries, executables): (Vec<usize>, Vec<usize>) = unit
                .members
                .iter()
                .copied()
                .partition(|&idx| projects[idx].target_type.is_library());

            let mut ordered = Vec::with_capacity(unit.members.len());
            for group in [libraries, executables] {
                let local = order_by_dependencies(group.len(), |i| {
                    deps_of(group[i])
                        .into_iter()
                        .filter_map(|dep| group.iter().position(|&g| g == dep))
                        .collect()
                });
                if !local.cycle.is_empty() {
                    report.warn(Warning::DependencyCycle {
                        unit: label.clone(),
                        members: local.cycle.iter().map(|&i| projects[group[i]].name.clone()).collect(),
                    });
                }
                ordered.extend(local.order.into_iter().map(|i| group[i]));
            }
            unit.members = ordered;
        }

        let unit_order = order_by_dependencies(units.len(), |u| {
            let mut deps = BTreeSet::new();
            for &member in &units[u].members {
                for dep in deps_of(member) {
                    if let Some(v) = units.iter().position(|unit| unit.members.contains(&dep)) {
                        deps.insert(v);
                    }
                }
            }
            deps.into_iter().collect()
        });
        if !unit_order.cycle.is_empty() {
            report.warn(Warning::DependencyCycle {
                unit: catalog.name.clone(),
                members: unit_order
                    .cycle
                    .iter()
                    .map(|&u| {
                        if units[u].key.is_empty() { ".".to_string() } else { units[u].key.clone() }
                    })
                    .collect(),
            });
        }

        let build_order: Vec<String> = unit_order
            .order
            .iter()
            .flat_map(|&u| units[u].members.iter().map(|&i| projects[i].identifier.clone()))
            .collect();
        tracing::debug!("build order: {}", build_order.join(", "));

        // ── Emit ─────────────────────────────────────────────────────────────
        let ctx = EmitContext {
            options: &self.emit,
            target_types: &target_types,
        };
        let configurations: Vec<String> = projects
            .iter()
            .flat_map(|p| p.settings.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let source_file = input
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut root = RootDocument {
            name: &catalog.name,
            source_file: &source_file,
            configurations,
            subdirectories: Vec::new(),
            targets: Vec::new(),
        };
        let mut subdocuments = Vec::new();
        for &u in &unit_order.order {
            let unit = &units[u];
            if unit.key.is_empty() || standalone {
                root.targets.extend(target_entries(&unit.members, &projects, &links));
                continue;
            }
            root.subdirectories.push(unit.key.clone());
            let label = format!("{source_file} ({})", unit.key);
            subdocuments.push(OutputDocument {
                path: unit.directory.join(CMAKE_LISTS),
                contents: emit::render_subdirectory(
                    &label,
                    &target_entries(&unit.members, &projects, &links),
                    ctx,
                ),
            });
        }

        let mut documents = vec![OutputDocument {
            path: catalog.directory.join(CMAKE_LISTS),
            contents: emit::render_root(&root, ctx),
        }];
        documents.extend(subdocuments);

        tracing::info!(
            "converted {} projects into {} documents ({} warnings)",
            projects.len(),
            documents.len(),
            report.warnings.len()
        );

        Conversion {
            documents,
            projects,
            build_order,
            registry,
            report,
        }
    }
}
