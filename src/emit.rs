//! CMake script emitter.
//!
//! Renders loaded projects into `CMakeLists.txt` text. Settings shared by
//! every converted configuration are written plainly; settings that differ
//! are wrapped in `$<$<CONFIG:Name>:...>` generator expressions. Output is a
//! pure function of the inputs, so re-running a conversion is idempotent.

use std::collections::BTreeMap;

use crate::dependency::{ExternalCategory, LibraryKind, ProjectLinks};
use crate::pch::PchPartition;
use crate::project::{FileEntry, Project, TargetType};
use crate::registry::sanitize;
use crate::settings::{ConfigurationSettings, push_unique};

const INDENT: &str = "    ";

// ═══════════════════════════════════════════════════════════════════════════════
//  Inputs
// ═══════════════════════════════════════════════════════════════════════════════

/// Knobs for the generated scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub cmake_minimum_version: String,
    pub cxx_standard: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            cmake_minimum_version: "3.16".to_string(),
            cxx_standard: "20".to_string(),
        }
    }
}

/// Shared state for rendering the targets of one run.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    pub options: &'a EmitOptions,
    /// Target type of every project, by identifier.
    pub target_types: &'a BTreeMap<String, TargetType>,
}

/// A project with its classified link inputs.
#[derive(Debug, Clone, Copy)]
pub struct TargetEntry<'a> {
    pub project: &'a Project,
    pub links: &'a ProjectLinks,
}

/// The top-level document of a conversion.
#[derive(Debug, Clone)]
pub struct RootDocument<'a> {
    /// Name given to `project()`.
    pub name: &'a str,
    /// File the document was generated from, for the header comment.
    pub source_file: &'a str,
    /// Every configuration converted, sorted.
    pub configurations: Vec<String>,
    /// `add_subdirectory` paths relative to the root, in build order.
    pub subdirectories: Vec<String>,
    /// Targets defined directly in the root document, in build order.
    pub targets: Vec<TargetEntry<'a>>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Script writer
// ═══════════════════════════════════════════════════════════════════════════════

/// Quote a CMake argument when it would otherwise be split or
/// reinterpreted.
pub fn quote(arg: &str) -> String {
    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | ';' | '(' | ')' | '#' | '\\'));
    if !needs_quotes {
        return arg.to_string();
    }
    let escaped = arg.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// `$<$<CONFIG:config>:value>`
fn config_genex(config: &str, value: &str) -> String {
    format!("$<$<CONFIG:{config}>:{}>", value.replace('>', "$<ANGLE-R>"))
}

/// Upper-cased configuration name for `*_<CONFIG>` properties.
fn config_suffix(config: &str) -> String {
    sanitize(config).to_ascii_uppercase()
}

#[derive(Debug, Default)]
struct Script {
    out: String,
    depth: usize,
}

impl Script {
    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
            self.out.push_str(text);
        }
        self.out.push('\n');
    }

    /// Blank separator line, never doubled.
    fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    /// `head` followed by one item per line and a closing parenthesis.
    fn command(&mut self, head: &str, items: &[String]) {
        self.line(head);
        self.depth += 1;
        for item in items {
            self.line(item);
        }
        self.depth -= 1;
        self.line(")");
    }

    fn open(&mut self, head: &str) {
        self.line(head);
        self.depth += 1;
    }

    fn close(&mut self, tail: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(tail);
    }

    /// The script text, ending with exactly one newline.
    fn finish(self) -> String {
        let mut out = self.out.trim_end_matches('\n').to_string();
        out.push('\n');
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Per-configuration values
// ═══════════════════════════════════════════════════════════════════════════════

/// Collect one list setting from every configuration.
fn gather<F>(project: &Project, field: F) -> Vec<(&str, Vec<String>)>
where
    F: Fn(&ConfigurationSettings) -> Vec<String>,
{
    project
        .settings
        .iter()
        .map(|(config, settings)| (config.as_str(), field(settings)))
        .collect()
}

/// Items shared by every configuration first, then per-configuration extras
/// as generator expressions.
fn config_items(per_config: &[(&str, Vec<String>)]) -> Vec<String> {
    let Some((_, first)) = per_config.first() else {
        return Vec::new();
    };
    let common: Vec<&String> = first
        .iter()
        .filter(|item| per_config.iter().all(|(_, list)| list.contains(*item)))
        .collect();

    let mut items: Vec<String> = common.iter().map(|item| quote(item)).collect();
    for (config, list) in per_config {
        for item in list {
            if !common.contains(&item) {
                push_unique(&mut items, quote(&config_genex(config, item)));
            }
        }
    }
    items
}

/// A scalar setting: a plain value when all configurations agree,
/// otherwise concatenated generator expressions.
fn config_value(per_config: &[(&str, Option<String>)]) -> Option<String> {
    let values: Vec<(&str, &String)> = per_config
        .iter()
        .filter_map(|(config, value)| value.as_ref().map(|v| (*config, v)))
        .collect();
    let (_, first) = values.first()?;
    if values.len() == per_config.len() && values.iter().all(|(_, v)| v == first) {
        return Some(quote(first));
    }
    let joined: String = values
        .iter()
        .map(|(config, value)| config_genex(config, value))
        .collect();
    Some(quote(&joined))
}

fn split_path(path: &str) -> (Option<&str>, &str) {
    match path.rfind('/') {
        Some(idx) => (Some(&path[..idx]).filter(|d| !d.is_empty()), &path[idx + 1..]),
        None => (None, path),
    }
}

fn strip_extension(file: &str) -> &str {
    match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Targets
// ═══════════════════════════════════════════════════════════════════════════════

fn file_list(files: &[&FileEntry]) -> Vec<String> {
    files.iter().map(|f| quote(&f.path)).collect()
}

fn render_target(script: &mut Script, entry: TargetEntry, ctx: EmitContext) {
    let project = entry.project;
    let id = &project.identifier;
    let file_name = project
        .path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    script.blank();
    script.line(&format!("# {} ({file_name})", project.name));

    if project.degraded {
        script.line(&format!(
            "# {file_name} could not be parsed; no target was generated for it."
        ));
        return;
    }

    let sources: Vec<&FileEntry> = project.sources().filter(|f| !f.excluded_from_build).collect();
    let excluded: Vec<&FileEntry> = project.sources().filter(|f| f.excluded_from_build).collect();
    let headers: Vec<&FileEntry> = project.headers().collect();

    script.blank();
    script.command(&format!("set(SOURCE_FILES_{id}"), &file_list(&sources));
    if !headers.is_empty() {
        script.blank();
        script.command(&format!("set(HEADER_FILES_{id}"), &file_list(&headers));
    }
    if !excluded.is_empty() {
        script.blank();
        script.line("# Excluded from build:");
        for file in &excluded {
            script.line(&format!("#   {}", file.path));
        }
    }

    let mfc = project.settings.values().find_map(|s| s.mfc);
    if let Some(mfc) = mfc {
        script.blank();
        script.line(&format!("set(CMAKE_MFC_FLAG {})", mfc.cmake_flag()));
    }

    script.blank();
    let head = match project.target_type {
        TargetType::Executable => format!("add_executable({id}"),
        TargetType::StaticLibrary => format!("add_library({id} STATIC"),
        TargetType::SharedLibrary => format!("add_library({id} SHARED"),
    };
    let mut members = vec![format!("${{SOURCE_FILES_{id}}}")];
    if !headers.is_empty() {
        members.push(format!("${{HEADER_FILES_{id}}}"));
    }
    script.command(&head, &members);
    // Directory-scoped; later targets of the same document must not see it.
    if mfc.is_some() {
        script.line("unset(CMAKE_MFC_FLAG)");
    }

    render_compile_settings(script, project);
    render_runtime_library(script, project);
    render_links(script, entry, ctx);
    render_output_properties(script, project);
    if let Some(pch) = &project.pch {
        render_pch(script, project, pch);
    }
    render_file_properties(script, project);
}

fn render_compile_settings(script: &mut Script, project: &Project) {
    let id = &project.identifier;

    let includes = config_items(&gather(project, |s| s.include_dirs.clone()));
    if !includes.is_empty() {
        script.blank();
        script.command(&format!("target_include_directories({id} PRIVATE"), &includes);
    }

    let defines = config_items(&gather(project, |s| s.defines.clone()));
    if !defines.is_empty() {
        script.blank();
        script.command(&format!("target_compile_definitions({id} PRIVATE"), &defines);
    }

    let per_config: Vec<(&str, Vec<String>)> = project
        .windows_version_defines
        .iter()
        .map(|(config, defines)| (config.as_str(), defines.clone()))
        .collect();
    let windows_version = config_items(&per_config);
    if !windows_version.is_empty() {
        script.blank();
        script.open("if(WIN32)");
        script.command(&format!("target_compile_definitions({id} PRIVATE"), &windows_version);
        script.close("endif()");
    }

    let compile_options = config_items(&gather(project, |s| {
        let mut options = s.compile_options.clone();
        for include in &s.forced_includes {
            push_unique(&mut options, format!("/FI{include}"));
        }
        options
    }));
    let link_options = config_items(&gather(project, |s| s.link_options.clone()));
    if compile_options.is_empty() && link_options.is_empty() {
        return;
    }

    script.blank();
    script.open("if(MSVC)");
    if !compile_options.is_empty() {
        script.command(&format!("target_compile_options({id} PRIVATE"), &compile_options);
    }
    if !link_options.is_empty() {
        let head = match project.target_type {
            TargetType::StaticLibrary => {
                format!("set_property(TARGET {id} APPEND PROPERTY STATIC_LIBRARY_OPTIONS")
            }
            _ => format!("target_link_options({id} PRIVATE"),
        };
        script.command(&head, &link_options);
    }
    script.close("endif()");
}

fn render_runtime_library(script: &mut Script, project: &Project) {
    let per_config: Vec<(&str, Option<String>)> = project
        .settings
        .iter()
        .map(|(config, s)| {
            (
                config.as_str(),
                s.runtime_library.map(|r| r.cmake_name().to_string()),
            )
        })
        .collect();
    let Some(value) = config_value(&per_config) else {
        return;
    };
    script.blank();
    if project.settings.values().any(|s| s.runtime_forced_by_mfc) {
        script.line("# MFC as a shared DLL requires the DLL runtime.");
    }
    script.line(&format!(
        "set_property(TARGET {} PROPERTY MSVC_RUNTIME_LIBRARY {value})",
        project.identifier
    ));
}

// ─── Link libraries ──────────────────────────────────────────────────────────

fn render_links(script: &mut Script, entry: TargetEntry, ctx: EmitContext) {
    let project = entry.project;
    let id = &project.identifier;

    let library_dirs = config_items(&gather(project, |s| s.library_dirs.clone()));
    if !library_dirs.is_empty() {
        script.blank();
        script.command(&format!("target_link_directories({id} PRIVATE"), &library_dirs);
    }

    let is_library_target = |name: &str| {
        ctx.target_types
            .get(name)
            .is_some_and(|t| t.is_library())
    };

    // Project references: libraries are linked, anything else is only
    // built first.
    let mut build_order_only = Vec::new();
    let mut referenced = Vec::new();
    for reference in &entry.links.project_references {
        if is_library_target(reference) {
            referenced.push(reference.clone());
        } else {
            build_order_only.push(reference.clone());
        }
    }

    let links = entry.links;
    let mut internal = referenced;
    for item in config_items(&select_links(links, |k| matches!(k, LibraryKind::InternalTarget(_)))) {
        push_unique(&mut internal, item);
    }
    let system = config_items(&select_links(links, |k| matches!(k, LibraryKind::SystemLibrary(_))));
    let external = config_items(&select_links(links, |k| match k {
        LibraryKind::ExternalLibrary { category, .. } => *category != ExternalCategory::AbsolutePath,
        LibraryKind::Unresolved(_) => true,
        _ => false,
    }));
    let mut absolute: Vec<(String, Vec<&str>)> = Vec::new();
    for (config, kinds) in &entry.links.per_config {
        for kind in kinds {
            if let LibraryKind::ExternalLibrary {
                path,
                category: ExternalCategory::AbsolutePath,
            } = kind
            {
                match absolute.iter_mut().find(|(p, _)| p == path) {
                    Some((_, configs)) => configs.push(config.as_str()),
                    None => absolute.push((path.clone(), vec![config.as_str()])),
                }
            }
        }
    }

    for (comment, items) in [
        ("# Solution targets", &internal),
        ("# System libraries", &system),
        ("# External libraries", &external),
    ] {
        if items.is_empty() {
            continue;
        }
        script.blank();
        script.line(comment);
        script.command(&format!("target_link_libraries({id} PRIVATE"), items);
    }

    if !build_order_only.is_empty() {
        script.blank();
        let deps = build_order_only.join(" ");
        script.line(&format!("add_dependencies({id} {deps})"));
    }

    if !absolute.is_empty() {
        script.blank();
        script.line("# MANUAL REVIEW: these libraries are referenced by absolute path and");
        script.line("# were not linked. Provide them through find_library() or an imported");
        script.line("# target, then link them here.");
        for (path, configs) in &absolute {
            script.line(&format!("#   {path} ({})", configs.join(", ")));
        }
    }
}

/// Link items of the kinds `pick` accepts, per configuration.
fn select_links<'a>(
    links: &'a ProjectLinks,
    pick: impl Fn(&LibraryKind) -> bool,
) -> Vec<(&'a str, Vec<String>)> {
    links
        .per_config
        .iter()
        .map(|(config, kinds)| {
            let items = kinds
                .iter()
                .filter(|k| pick(k))
                .map(|k| k.link_item().to_string())
                .collect();
            (config.as_str(), items)
        })
        .collect()
}

// ─── Output locations ────────────────────────────────────────────────────────

fn render_output_properties(script: &mut Script, project: &Project) {
    let id = &project.identifier;
    let output_property = match project.target_type {
        TargetType::StaticLibrary => "ARCHIVE_OUTPUT_DIRECTORY",
        TargetType::Executable | TargetType::SharedLibrary => "RUNTIME_OUTPUT_DIRECTORY",
    };

    let mut properties = Vec::new();
    for (config, s) in &project.settings {
        let suffix = config_suffix(config);
        let (file_dir, file_name) = match s.output_file.as_deref() {
            Some(file) => split_path(file),
            None => (None, ""),
        };

        if let Some(dir) = file_dir.or(s.output_directory.as_deref()) {
            properties.push(format!("{output_property}_{suffix} {}", quote(dir)));
        }

        let file_stem = strip_extension(file_name);
        let output_name = Some(file_stem)
            .filter(|n| !n.is_empty() && !n.contains('$'))
            .or(s.target_name.as_deref());
        if let Some(name) = output_name.filter(|n| *n != id.as_str()) {
            properties.push(format!("OUTPUT_NAME_{suffix} {}", quote(name)));
        }

        if project.target_type == TargetType::SharedLibrary {
            if let (Some(dir), _) = s.import_library_path.as_deref().map(split_path).unwrap_or((None, "")) {
                properties.push(format!("ARCHIVE_OUTPUT_DIRECTORY_{suffix} {}", quote(dir)));
            }
        }

        if let Some(pdb) = s.pdb_path.as_deref() {
            let (dir, file) = split_path(pdb);
            if let Some(dir) = dir {
                properties.push(format!("PDB_OUTPUT_DIRECTORY_{suffix} {}", quote(dir)));
            }
            let pdb_name = strip_extension(file);
            if !pdb_name.is_empty() && !pdb_name.contains('$') {
                properties.push(format!("PDB_NAME_{suffix} {}", quote(pdb_name)));
            }
        }
    }

    if !properties.is_empty() {
        script.blank();
        script.command(&format!("set_target_properties({id} PROPERTIES"), &properties);
    }
}

// ─── Precompiled headers ─────────────────────────────────────────────────────

/// Locate the PCH header: a listed header with the same file name wins,
/// otherwise the name is taken relative to the project directory.
fn pch_header_path(project: &Project, header: &str) -> String {
    if header.starts_with("${") || header.starts_with("$ENV{") {
        return header.to_string();
    }
    let listed = project
        .headers()
        .find(|h| h.path.eq_ignore_ascii_case(header) || h.path.ends_with(&format!("/{header}")))
        .map(|h| h.path.as_str())
        .unwrap_or(header);
    if listed.starts_with("${") {
        listed.to_string()
    } else {
        format!("${{CMAKE_CURRENT_SOURCE_DIR}}/{listed}")
    }
}

fn render_pch(script: &mut Script, project: &Project, pch: &PchPartition) {
    let id = &project.identifier;
    let header = pch_header_path(project, &pch.header);

    script.blank();
    script.line(&format!(
        "target_precompile_headers({id} PRIVATE {})",
        quote(&format!("$<$<COMPILE_LANGUAGE:CXX>:{header}>"))
    ));

    let skipped: Vec<String> = pch.skipped().map(quote).collect();
    if !skipped.is_empty() {
        script.open("set_source_files_properties(");
        for file in &skipped {
            script.line(file);
        }
        script.line("PROPERTIES SKIP_PRECOMPILE_HEADERS ON");
        script.close(")");
    }
}

// ─── Per-file properties ─────────────────────────────────────────────────────

fn render_file_properties(script: &mut Script, project: &Project) {
    let files: Vec<&FileEntry> = project
        .sources()
        .filter(|f| !f.excluded_from_build && !f.overrides.is_empty())
        .collect();

    let mut msvc_lines = Vec::new();
    for file in &files {
        let o = &file.overrides;
        let path = quote(&file.path);
        if let Some(lang) = o.compile_as {
            script.blank();
            script.line(&format!(
                "set_source_files_properties({path} PROPERTIES LANGUAGE {})",
                lang.cmake_language()
            ));
        }
        if !o.defines.is_empty() {
            script.blank();
            script.line(&format!(
                "set_source_files_properties({path} PROPERTIES COMPILE_DEFINITIONS {})",
                quote(&o.defines.join(";"))
            ));
        }
        let mut options: Vec<String> = Vec::new();
        if let Some(level) = &o.warning_level {
            options.push(level.clone());
        }
        if let Some(runtime) = o.runtime_library {
            options.push(runtime.msvc_flag().to_string());
        }
        options.extend(o.compile_options.iter().cloned());
        if !options.is_empty() {
            msvc_lines.push(format!(
                "set_source_files_properties({path} PROPERTIES COMPILE_OPTIONS {})",
                quote(&options.join(";"))
            ));
        }
    }

    if !msvc_lines.is_empty() {
        script.blank();
        script.open("if(MSVC)");
        for line in &msvc_lines {
            script.line(line);
        }
        script.close("endif()");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Documents
// ═══════════════════════════════════════════════════════════════════════════════

/// `add_subdirectory` arguments for a path relative to the root. Paths that
/// leave the source tree need an explicit binary directory.
fn subdirectory_args(path: &str) -> String {
    if path.starts_with("../") || path == ".." {
        format!("{} {}", quote(path), quote(&sanitize(path.trim_start_matches("../"))))
    } else {
        quote(path)
    }
}

/// Render the root document: global settings, subdirectories, and the
/// targets that live next to the solution.
pub fn render_root(doc: &RootDocument, ctx: EmitContext) -> String {
    let options = ctx.options;
    let mut script = Script::default();

    script.line(&format!("# Generated by vcxproj2cmake from {}.", doc.source_file));
    script.line("# Edits are overwritten when the converter runs again.");
    script.blank();
    script.line(&format!(
        "cmake_minimum_required(VERSION {})",
        options.cmake_minimum_version
    ));

    let configurations = if doc.configurations.is_empty() {
        vec!["Debug".to_string(), "Release".to_string()]
    } else {
        doc.configurations.clone()
    };
    script.blank();
    script.line(&format!(
        "set(CMAKE_CONFIGURATION_TYPES {} CACHE STRING \"\" FORCE)",
        quote(&configurations.join(";"))
    ));

    script.blank();
    script.line(&format!("project({} LANGUAGES C CXX)", sanitize(doc.name)));

    let default_build_type = configurations
        .iter()
        .find(|c| c.eq_ignore_ascii_case("Debug"))
        .or_else(|| configurations.first())
        .map(String::as_str)
        .unwrap_or("Debug");
    script.blank();
    script.line("get_property(_is_multi_config GLOBAL PROPERTY GENERATOR_IS_MULTI_CONFIG)");
    script.open("if(NOT _is_multi_config AND NOT CMAKE_BUILD_TYPE)");
    script.line(&format!(
        "set(CMAKE_BUILD_TYPE {} CACHE STRING \"Build configuration\" FORCE)",
        quote(default_build_type)
    ));
    script.close("endif()");

    script.blank();
    script.line(&format!("set(CMAKE_CXX_STANDARD {})", options.cxx_standard));
    script.line("set(CMAKE_CXX_STANDARD_REQUIRED ON)");

    script.blank();
    script.command(
        "add_compile_definitions(",
        &[
            "$<$<CONFIG:Debug>:_DEBUG>".to_string(),
            "$<$<NOT:$<CONFIG:Debug>>:NDEBUG>".to_string(),
        ],
    );

    if !doc.subdirectories.is_empty() {
        script.blank();
        for dir in &doc.subdirectories {
            script.line(&format!("add_subdirectory({})", subdirectory_args(dir)));
        }
    }

    for entry in &doc.targets {
        render_target(&mut script, *entry, ctx);
    }

    script.finish()
}

/// Render the document of one subdirectory holding `targets`.
pub fn render_subdirectory(source_file: &str, targets: &[TargetEntry], ctx: EmitContext) -> String {
    let mut script = Script::default();
    script.line(&format!("# Generated by vcxproj2cmake from {source_file}."));
    script.line("# Edits are overwritten when the converter runs again.");
    for entry in targets {
        render_target(&mut script, *entry, ctx);
    }
    script.finish()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
