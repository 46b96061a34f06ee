//! Project model loader.
//!
//! Reads one `.vcxproj`, evaluates it for the selected configurations and
//! produces a [`Project`]: identity, target type, source/header files with
//! their per-file overrides, and normalized settings per configuration.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::condition;
use crate::msbuild::{FileItem, VcxDocument, VcxProject};
use crate::pch::{self, PchPartition};
use crate::registry::sanitize;
use crate::report::{ConversionReport, Warning};
use crate::settings::{
    self, CompileAs, ConfigurationSettings, PchMode, RuntimeLibrary, push_unique, split_list,
    translate_macros,
};
use crate::winver;

/// Platform assumed when a project declares none.
pub const DEFAULT_PLATFORM: &str = "Win32";

// ═══════════════════════════════════════════════════════════════════════════════
//  Types
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Executable,
    StaticLibrary,
    SharedLibrary,
}

impl TargetType {
    /// Map an MSBuild `ConfigurationType`.
    pub fn from_configuration_type(value: &str) -> Option<Self> {
        match value.trim() {
            "Application" => Some(Self::Executable),
            "StaticLibrary" => Some(Self::StaticLibrary),
            "DynamicLibrary" => Some(Self::SharedLibrary),
            _ => None,
        }
    }

    pub fn is_library(self) -> bool {
        !matches!(self, Self::Executable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Source,
    Header,
}

/// Per-file setting overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOverrides {
    pub compile_as: Option<CompileAs>,
    pub runtime_library: Option<RuntimeLibrary>,
    /// Warning-level flag, e.g. `/W4`.
    pub warning_level: Option<String>,
    pub defines: Vec<String>,
    pub compile_options: Vec<String>,
    pub pch_mode: PchMode,
    pub pch_header: Option<String>,
}

impl FileOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the project directory, with forward slashes.
    pub path: String,
    pub kind: FileKind,
    pub excluded_from_build: bool,
    pub overrides: FileOverrides,
}

/// Which configurations per-item conditions are evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum ConfigFilter<'a> {
    /// Exactly one configuration.
    Single(&'a str),
    /// Active if the condition holds in any of them.
    Any(&'a [String]),
}

impl ConfigFilter<'_> {
    fn holds(&self, condition: &str, platform: &str) -> crate::Result<bool> {
        match self {
            ConfigFilter::Single(config) => condition::holds_for(condition, config, platform),
            ConfigFilter::Any(configs) => {
                let expr = condition::parse_condition(condition)?;
                Ok(configs
                    .iter()
                    .any(|c| condition::evaluate(&expr, &condition::build_vars(c, platform))))
            }
        }
    }
}

/// Options that shape how a project is loaded.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Convert only this configuration. `None` converts all of them.
    pub configuration: Option<String>,
    /// Platform to evaluate. `None` picks the project's first platform.
    pub platform: Option<String>,
    /// Extra MSBuild properties (user macros, environment).
    pub env: HashMap<String, String>,
}

/// A loaded and normalized project.
#[derive(Debug, Clone)]
pub struct Project {
    /// Authoritative name: `<ProjectName>` or the file stem.
    pub name: String,
    /// Name the solution uses for the project.
    pub declared_name: String,
    /// CMake target name.
    pub identifier: String,
    pub path: PathBuf,
    pub directory: PathBuf,
    pub target_type: TargetType,
    pub platform: String,
    pub toolset: Option<String>,
    /// Configurations the project declares.
    pub configurations: BTreeSet<String>,
    /// Normalized settings of each converted configuration.
    pub settings: BTreeMap<String, ConfigurationSettings>,
    pub files: Vec<FileEntry>,
    /// File stems of `<ProjectReference>` targets.
    pub project_references: Vec<String>,
    /// `<TargetName>` values, used as registry aliases.
    pub target_names: Vec<String>,
    /// `WINVER`/`_WIN32_WINNT` defines to add, per configuration.
    pub windows_version_defines: BTreeMap<String, Vec<String>>,
    pub pch: Option<PchPartition>,
    /// The document could not be parsed.
    pub degraded: bool,
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Project {
    /// Names other than [`Project::name`] that refer to this project.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases = Vec::new();
        push_unique(&mut aliases, self.declared_name.clone());
        push_unique(&mut aliases, file_stem(&self.path));
        for name in &self.target_names {
            push_unique(&mut aliases, name.clone());
        }
        aliases.retain(|a| !a.is_empty() && *a != self.name);
        aliases
    }

    pub fn sources(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|f| f.kind == FileKind::Source)
    }

    pub fn headers(&self) -> impl Iterator<Item = &FileEntry> {
        self.files.iter().filter(|f| f.kind == FileKind::Header)
    }

    /// Identity of a project whose document could not be read.
    fn degraded(path: &Path, declared_name: &str) -> Self {
        let name = file_stem(path);
        Self {
            identifier: sanitize(&name),
            name,
            declared_name: declared_name.to_string(),
            path: path.to_path_buf(),
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            target_type: TargetType::Executable,
            platform: DEFAULT_PLATFORM.to_string(),
            toolset: None,
            configurations: BTreeSet::new(),
            settings: BTreeMap::new(),
            files: Vec::new(),
            project_references: Vec::new(),
            target_names: Vec::new(),
            windows_version_defines: BTreeMap::new(),
            pch: None,
            degraded: true,
        }
    }

    /// Load and normalize the project at `path`.
    ///
    /// Unreadable or malformed documents do not fail the run: they produce
    /// a degraded project and a [`Warning::MalformedProject`].
    pub fn load(
        path: &Path,
        declared_name: &str,
        options: &LoadOptions,
        report: &mut ConversionReport,
    ) -> Self {
        let doc = match VcxDocument::from_file(path) {
            Ok(doc) => doc,
            Err(e) => {
                report.warn(Warning::MalformedProject {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                return Self::degraded(path, declared_name);
            }
        };
        let vcx = &doc.project;
        let stem = file_stem(path);
        let name = vcx.project_name().map(str::to_string).unwrap_or_else(|| stem.clone());

        let configurations = vcx.configurations();
        let platform = options
            .platform
            .clone()
            .or_else(|| vcx.platforms().into_iter().next())
            .unwrap_or_else(|| DEFAULT_PLATFORM.to_string());

        let selected: Vec<String> = match &options.configuration {
            Some(requested) => {
                let declared = configurations
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(requested))
                    .cloned();
                if declared.is_none() {
                    report.warn(Warning::UnknownConfiguration {
                        project: name.clone(),
                        configuration: requested.clone(),
                    });
                }
                vec![declared.unwrap_or_else(|| requested.clone())]
            }
            None => configurations.iter().cloned().collect(),
        };

        let type_config = type_configuration(&selected);
        let type_eval = vcx.evaluate(&type_config, &platform, &stem, &options.env);
        let target_type = match type_eval.properties.configuration_type.as_deref() {
            Some(value) => TargetType::from_configuration_type(value).unwrap_or_else(|| {
                tracing::debug!("{name}: ConfigurationType={value} converted as an executable");
                TargetType::Executable
            }),
            None => TargetType::Executable,
        };
        let toolset = type_eval.properties.platform_toolset.clone();

        let mut unparsed: Vec<String> = type_eval.unparsed_conditions;
        let mut settings = BTreeMap::new();
        let mut target_names = Vec::new();
        for config in &selected {
            let eval = vcx.evaluate(config, &platform, &stem, &options.env);
            for cond in eval.unparsed_conditions.iter().cloned() {
                push_unique(&mut unparsed, cond);
            }
            let normalized = settings::normalize(&eval, target_type);
            if let Some(target) = &normalized.target_name {
                push_unique(&mut target_names, target.clone());
            }
            settings.insert(config.clone(), normalized);
        }

        let filter = match (&options.configuration, selected.first()) {
            (Some(_), Some(config)) => ConfigFilter::Single(config),
            _ => ConfigFilter::Any(&selected),
        };
        let files = collect_files(vcx, filter, &platform, &mut unparsed);

        let mut project_references = Vec::new();
        for reference in vcx.project_references() {
            if !is_active(reference.condition.as_deref(), filter, &platform, &mut unparsed) {
                continue;
            }
            let stem = file_stem(Path::new(&reference.include.replace('\\', "/")));
            if !stem.is_empty() {
                push_unique(&mut project_references, stem);
            }
        }

        for condition in unparsed {
            report.warn(Warning::UnparsedCondition {
                project: name.clone(),
                condition,
            });
        }

        let windows_version_defines = winver::infer(&name, &settings, toolset.as_deref(), report);
        let (pch_mode, pch_header) = pch::project_mode(&settings);
        let pch = pch::partition(pch_mode, pch_header.as_deref(), &files);

        tracing::debug!(
            "loaded {name}: {:?}, {} files, configurations {:?}",
            target_type,
            files.len(),
            selected
        );

        Self {
            identifier: sanitize(&name),
            name,
            declared_name: declared_name.to_string(),
            path: path.to_path_buf(),
            directory: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            target_type,
            platform,
            toolset,
            configurations,
            settings,
            files,
            project_references,
            target_names,
            windows_version_defines,
            pch,
            degraded: false,
        }
    }
}

/// Configuration whose `ConfigurationType` decides the target type:
/// the only selected one, else `Debug`, else the first.
fn type_configuration(selected: &[String]) -> String {
    if let [only] = selected {
        return only.clone();
    }
    selected
        .iter()
        .find(|c| c.eq_ignore_ascii_case("Debug"))
        .or_else(|| selected.first())
        .cloned()
        .unwrap_or_else(|| "Debug".to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Files and per-file overrides
// ═══════════════════════════════════════════════════════════════════════════════

/// Decide whether an optional condition is active, recording unparsable ones.
fn is_active(
    condition: Option<&str>,
    filter: ConfigFilter,
    platform: &str,
    unparsed: &mut Vec<String>,
) -> bool {
    let Some(cond) = condition else {
        return true;
    };
    match filter.holds(cond, platform) {
        Ok(active) => active,
        Err(e) => {
            tracing::debug!("{e}");
            push_unique(unparsed, cond.to_string());
            false
        }
    }
}

/// `Create` beats `NotUsing` beats `Use`.
fn pch_rank(mode: PchMode) -> u8 {
    match mode {
        PchMode::Create => 3,
        PchMode::NotUsing => 2,
        PchMode::Use => 1,
        PchMode::None => 0,
    }
}

fn file_entry(
    item: &FileItem,
    kind: FileKind,
    filter: ConfigFilter,
    platform: &str,
    unparsed: &mut Vec<String>,
) -> FileEntry {
    let mut entry = FileEntry {
        path: translate_macros(&item.include),
        kind,
        excluded_from_build: false,
        overrides: FileOverrides::default(),
    };
    let any = matches!(filter, ConfigFilter::Any(_));

    for meta in &item.metadata {
        if !is_active(meta.condition.as_deref(), filter, platform, unparsed) {
            continue;
        }
        let value = meta.value.trim();
        let o = &mut entry.overrides;
        match meta.name.as_str() {
            "ExcludedFromBuild" => {
                if value.eq_ignore_ascii_case("true") {
                    entry.excluded_from_build = true;
                }
            }
            "PreprocessorDefinitions" => {
                for define in split_list(value) {
                    push_unique(&mut o.defines, define);
                }
            }
            "AdditionalOptions" => {
                for option in value.split_whitespace().filter(|v| !v.starts_with("%(")) {
                    push_unique(&mut o.compile_options, option.to_string());
                }
            }
            "CompileAs" => {
                if let Some(lang) = CompileAs::parse(value) {
                    o.compile_as = Some(lang);
                }
            }
            "RuntimeLibrary" => {
                if let Some(runtime) = RuntimeLibrary::parse(value) {
                    o.runtime_library = Some(runtime);
                }
            }
            "WarningLevel" => {
                if let Some(flag) = settings::warning_level_flag(value) {
                    o.warning_level = Some(flag.to_string());
                }
            }
            "PrecompiledHeader" => {
                let mode = PchMode::parse(value);
                if !any || pch_rank(mode) > pch_rank(o.pch_mode) {
                    o.pch_mode = mode;
                }
            }
            "PrecompiledHeaderFile" if !value.is_empty() => {
                o.pch_header = Some(translate_macros(value));
            }
            other => tracing::debug!("{}: ignoring metadata {other}", item.include),
        }
    }

    entry
}

fn collect_files(
    vcx: &VcxProject,
    filter: ConfigFilter,
    platform: &str,
    unparsed: &mut Vec<String>,
) -> Vec<FileEntry> {
    let mut files: Vec<FileEntry> = Vec::new();
    let items = vcx
        .compile_items()
        .map(|i| (i, FileKind::Source))
        .chain(vcx.include_items().map(|i| (i, FileKind::Header)));

    for (item, kind) in items {
        if !is_active(item.condition.as_deref(), filter, platform, unparsed) {
            continue;
        }
        let entry = file_entry(item, kind, filter, platform, unparsed);
        if files.iter().any(|f| f.path == entry.path) {
            continue;
        }
        files.push(entry);
    }

    files
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
