//! Owned, typed model of a `.vcxproj` document.
//!
//! Parsing goes through `roxmltree` into fully owned types. Tag names are
//! matched without their namespace, so both the 2003 MSBuild namespace and
//! namespace-less documents are accepted.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::condition;
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
//  Helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Expand `$(Var)` references in a raw string value using the given variable
/// map. Unknown variables are kept verbatim so a later pass can translate
/// them.
pub(crate) fn expand_msbuild_vars(s: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("$(") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(')') else {
            result.push_str(&rest[start..]);
            return result;
        };
        let var_name = &after[..end];
        match vars.get(var_name) {
            Some(val) => result.push_str(val),
            None => {
                result.push_str("$(");
                result.push_str(var_name);
                result.push(')');
            }
        }
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    result
}

/// Return the text content of the first child element with the given tag name.
fn find_child_text(parent: &roxmltree::Node, tag: &str) -> Option<String> {
    parent
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == tag)
        .and_then(|c| c.text())
        .map(|t| t.trim().to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  VcxDocument – top-level handle
// ═══════════════════════════════════════════════════════════════════════════════

/// A loaded `.vcxproj` document.
#[derive(Debug, Clone)]
pub struct VcxDocument {
    pub project: VcxProject,
}

impl VcxDocument {
    /// Parse a `.vcxproj` document from its XML source.
    pub fn parse(source: &str) -> std::result::Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(source)?;
        Ok(Self {
            project: VcxProject::parse(doc.root_element()),
        })
    }

    /// Load a `.vcxproj` document from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let source = source.trim_start_matches('\u{feff}');
        Self::parse(source).map_err(|e| Error::xml(path, e))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Type definitions
// ═══════════════════════════════════════════════════════════════════════════════

// Value fields are `Option<String>` regardless of their logical type, since
// Visual Studio writes booleans, enums and paths as plain text. Interpretation
// happens in the settings normalizer.

/// Root representation of a `.vcxproj` file (`<Project>`).
#[derive(Debug, Clone, Default)]
pub struct VcxProject {
    pub property_groups: Vec<PropertyGroup>,
    pub item_definition_groups: Vec<ItemDefinitionGroup>,
    pub item_groups: Vec<ItemGroup>,
}

/// A `<PropertyGroup>` element, optionally gated by a `Condition`.
#[derive(Debug, Clone, Default)]
pub struct PropertyGroup {
    pub condition: Option<String>,
    pub label: Option<String>,
    pub properties: ProjectProperties,
    /// Child elements not captured by the typed fields above.
    pub other: HashMap<String, String>,
}

/// Project-level properties that the converter reads.
#[derive(Debug, Clone, Default)]
pub struct ProjectProperties {
    pub project_name: Option<String>,
    pub root_namespace: Option<String>,
    pub configuration_type: Option<String>,
    pub use_debug_libraries: Option<String>,
    pub platform_toolset: Option<String>,
    pub character_set: Option<String>,
    pub use_of_mfc: Option<String>,
    pub whole_program_optimization: Option<String>,
    pub windows_target_platform_version: Option<String>,
    pub out_dir: Option<String>,
    pub int_dir: Option<String>,
    pub target_name: Option<String>,
    pub target_ext: Option<String>,
}

/// An `<ItemDefinitionGroup>`: per-configuration tool settings.
#[derive(Debug, Clone, Default)]
pub struct ItemDefinitionGroup {
    pub condition: Option<String>,
    pub cl_compile: ClCompileSettings,
    pub link: LinkSettings,
    pub lib: LibSettings,
}

/// `<ClCompile>` settings inside an item-definition group.
#[derive(Debug, Clone, Default)]
pub struct ClCompileSettings {
    pub additional_include_directories: Option<String>,
    pub preprocessor_definitions: Option<String>,
    pub forced_include_files: Option<String>,
    pub precompiled_header: Option<String>,
    pub precompiled_header_file: Option<String>,
    pub runtime_library: Option<String>,
    pub warning_level: Option<String>,
    pub treat_warning_as_error: Option<String>,
    pub optimization: Option<String>,
    pub debug_information_format: Option<String>,
    pub exception_handling: Option<String>,
    pub runtime_type_info: Option<String>,
    pub multi_processor_compilation: Option<String>,
    pub language_standard: Option<String>,
    pub language_standard_c: Option<String>,
    pub conformance_mode: Option<String>,
    pub function_level_linking: Option<String>,
    pub intrinsic_functions: Option<String>,
    pub buffer_security_check: Option<String>,
    pub floating_point_model: Option<String>,
    pub sdl_check: Option<String>,
    pub whole_program_optimization: Option<String>,
    pub compile_as: Option<String>,
    pub disable_specific_warnings: Option<String>,
    pub additional_options: Option<String>,
    /// Settings this converter does not translate.
    pub other: HashMap<String, String>,
}

/// `<Link>` settings inside an item-definition group.
#[derive(Debug, Clone, Default)]
pub struct LinkSettings {
    pub additional_dependencies: Option<String>,
    pub additional_library_directories: Option<String>,
    pub output_file: Option<String>,
    pub import_library: Option<String>,
    pub program_database_file: Option<String>,
    pub sub_system: Option<String>,
    pub generate_debug_information: Option<String>,
    pub optimize_references: Option<String>,
    pub enable_comdat_folding: Option<String>,
    pub link_time_code_generation: Option<String>,
    pub target_machine: Option<String>,
    pub module_definition_file: Option<String>,
    pub ignore_specific_default_libraries: Option<String>,
    pub additional_options: Option<String>,
    pub other: HashMap<String, String>,
}

/// `<Lib>` settings (static library projects).
#[derive(Debug, Clone, Default)]
pub struct LibSettings {
    pub additional_dependencies: Option<String>,
    pub additional_library_directories: Option<String>,
    pub output_file: Option<String>,
    pub additional_options: Option<String>,
    pub other: HashMap<String, String>,
}

/// An `<ItemGroup>` element.
#[derive(Debug, Clone, Default)]
pub struct ItemGroup {
    pub condition: Option<String>,
    pub label: Option<String>,
    pub project_configurations: Vec<ProjectConfiguration>,
    pub cl_compile: Vec<FileItem>,
    pub cl_include: Vec<FileItem>,
    pub project_references: Vec<ProjectReference>,
}

/// `<ProjectConfiguration Include="Debug|Win32">`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectConfiguration {
    pub include: String,
    pub configuration: Option<String>,
    pub platform: Option<String>,
}

/// A `<ClCompile>` or `<ClInclude>` item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileItem {
    pub include: String,
    /// The item's own condition combined with the enclosing `<ItemGroup>`'s.
    pub condition: Option<String>,
    pub metadata: Vec<ItemMetadata>,
}

/// One metadata child of an item, e.g.
/// `<ExcludedFromBuild Condition="...">true</ExcludedFromBuild>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMetadata {
    pub name: String,
    pub condition: Option<String>,
    pub value: String,
}

/// `<ProjectReference Include="..\Core\Core.vcxproj">`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectReference {
    pub include: String,
    pub project_guid: Option<String>,
    /// The item's own condition combined with the enclosing `<ItemGroup>`'s.
    pub condition: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Merging – combine groups by overriding non-None fields
// ═══════════════════════════════════════════════════════════════════════════════

/// Override `self.$field` with `other.$field` when the latter is `Some`.
macro_rules! merge_options {
    ($self:expr, $other:expr, $($field:ident),* $(,)?) => {
        $(
            if $other.$field.is_some() {
                $self.$field = $other.$field.clone();
            }
        )*
    };
}

/// Expand `$(Var)` references in every `Some` string field using the given
/// variable map.
macro_rules! expand_options {
    ($self:expr, $vars:expr, $($field:ident),* $(,)?) => {
        $(
            if let Some(ref mut v) = $self.$field {
                if v.contains("$(") {
                    *v = expand_msbuild_vars(v, $vars);
                }
            }
        )*
    };
}

/// Collect all `Some` string fields into a `HashMap<tag_name, value>`.
macro_rules! collect_tag_values {
    ($self:expr, $map:expr, $($tag:literal => $field:ident),* $(,)?) => {
        $(
            if let Some(v) = &$self.$field {
                $map.insert($tag.to_string(), v.clone());
            }
        )*
    };
}

impl ProjectProperties {
    pub fn merge_from(&mut self, o: &Self) {
        merge_options!(self, o,
            project_name, root_namespace, configuration_type, use_debug_libraries,
            platform_toolset, character_set, use_of_mfc, whole_program_optimization,
            windows_target_platform_version, out_dir, int_dir, target_name, target_ext,
        );
    }

    fn expand_vars(&mut self, vars: &HashMap<String, String>) {
        expand_options!(self, vars,
            project_name, root_namespace, configuration_type, use_debug_libraries,
            platform_toolset, character_set, use_of_mfc, whole_program_optimization,
            windows_target_platform_version, out_dir, int_dir, target_name, target_ext,
        );
    }

    fn collect_into_vars(&self, vars: &mut HashMap<String, String>) {
        collect_tag_values!(self, vars,
            "ProjectName" => project_name,
            "RootNamespace" => root_namespace,
            "ConfigurationType" => configuration_type,
            "UseDebugLibraries" => use_debug_libraries,
            "PlatformToolset" => platform_toolset,
            "CharacterSet" => character_set,
            "UseOfMfc" => use_of_mfc,
            "WholeProgramOptimization" => whole_program_optimization,
            "WindowsTargetPlatformVersion" => windows_target_platform_version,
            "OutDir" => out_dir,
            "IntDir" => int_dir,
            "TargetName" => target_name,
            "TargetExt" => target_ext,
        );
    }
}

impl ItemDefinitionGroup {
    /// Merge `other` into `self`: any field that is `Some` in `other`
    /// overwrites the corresponding field in `self`.
    pub fn merge_from(&mut self, other: &Self) {
        self.cl_compile.merge_from(&other.cl_compile);
        self.link.merge_from(&other.link);
        self.lib.merge_from(&other.lib);
    }

    fn expand_vars(&mut self, vars: &HashMap<String, String>) {
        self.cl_compile.expand_vars(vars);
        self.link.expand_vars(vars);
        self.lib.expand_vars(vars);
    }
}

impl ClCompileSettings {
    fn merge_from(&mut self, o: &Self) {
        merge_options!(self, o,
            additional_include_directories, preprocessor_definitions, forced_include_files,
            precompiled_header, precompiled_header_file, runtime_library, warning_level,
            treat_warning_as_error, optimization, debug_information_format,
            exception_handling, runtime_type_info, multi_processor_compilation,
            language_standard, language_standard_c, conformance_mode,
            function_level_linking, intrinsic_functions, buffer_security_check,
            floating_point_model, sdl_check, whole_program_optimization, compile_as,
            disable_specific_warnings, additional_options,
        );
        for (k, v) in &o.other {
            self.other.insert(k.clone(), v.clone());
        }
    }

    fn expand_vars(&mut self, vars: &HashMap<String, String>) {
        expand_options!(self, vars,
            additional_include_directories, preprocessor_definitions, forced_include_files,
            precompiled_header_file, additional_options,
        );
    }
}

impl LinkSettings {
    fn merge_from(&mut self, o: &Self) {
        merge_options!(self, o,
            additional_dependencies, additional_library_directories, output_file,
            import_library, program_database_file, sub_system, generate_debug_information,
            optimize_references, enable_comdat_folding, link_time_code_generation,
            target_machine, module_definition_file, ignore_specific_default_libraries,
            additional_options,
        );
        for (k, v) in &o.other {
            self.other.insert(k.clone(), v.clone());
        }
    }

    fn expand_vars(&mut self, vars: &HashMap<String, String>) {
        expand_options!(self, vars,
            additional_dependencies, additional_library_directories, output_file,
            import_library, program_database_file, module_definition_file,
            additional_options,
        );
    }
}

impl LibSettings {
    fn merge_from(&mut self, o: &Self) {
        merge_options!(self, o,
            additional_dependencies, additional_library_directories, output_file,
            additional_options,
        );
        for (k, v) in &o.other {
            self.other.insert(k.clone(), v.clone());
        }
    }

    fn expand_vars(&mut self, vars: &HashMap<String, String>) {
        expand_options!(self, vars,
            additional_dependencies, additional_library_directories, output_file,
            additional_options,
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Active group resolution
// ═══════════════════════════════════════════════════════════════════════════════

/// Effective settings of a project for one `(configuration, platform)` pair.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    pub properties: ProjectProperties,
    pub item_definitions: ItemDefinitionGroup,
    /// Variable map after all property groups were applied.
    pub vars: HashMap<String, String>,
    /// Conditions that could not be parsed; their groups were skipped.
    pub unparsed_conditions: Vec<String>,
}

/// Decide whether a group gated by `condition` applies under `vars`.
fn group_applies(
    condition: Option<&str>,
    vars: &HashMap<String, String>,
    unparsed: &mut Vec<String>,
) -> bool {
    let Some(cond) = condition else {
        return true;
    };
    match condition::parse_condition(cond) {
        Ok(expr) => condition::evaluate(&expr, vars),
        Err(e) => {
            tracing::debug!("{e}");
            if !unparsed.iter().any(|c| c == cond) {
                unparsed.push(cond.to_string());
            }
            false
        }
    }
}

impl VcxProject {
    /// All configuration names the project declares, sorted.
    ///
    /// Collected from `<ProjectConfiguration>` items and from the conditions
    /// of `<ItemDefinitionGroup>` elements.
    pub fn configurations(&self) -> BTreeSet<String> {
        let mut configs = BTreeSet::new();

        for pc in self.item_groups.iter().flat_map(|ig| &ig.project_configurations) {
            if let Some(name) = pc
                .configuration
                .clone()
                .or_else(|| pc.include.split('|').next().map(str::to_string))
                .filter(|n| !n.is_empty())
            {
                configs.insert(name);
            }
        }

        for idg in &self.item_definition_groups {
            let Some(cond) = &idg.condition else { continue };
            if let Some(name) = condition::parse_condition(cond)
                .ok()
                .as_ref()
                .and_then(condition::configuration_of)
            {
                configs.insert(name);
            }
        }

        configs
    }

    /// Platforms named by `<ProjectConfiguration>` items, in document order.
    pub fn platforms(&self) -> Vec<String> {
        let mut platforms: Vec<String> = Vec::new();
        for pc in self.item_groups.iter().flat_map(|ig| &ig.project_configurations) {
            let platform = pc
                .platform
                .clone()
                .or_else(|| pc.include.split('|').nth(1).map(str::to_string));
            if let Some(p) = platform.filter(|p| !p.is_empty()) {
                if !platforms.contains(&p) {
                    platforms.push(p);
                }
            }
        }
        platforms
    }

    /// The first `<ProjectName>` found in any property group.
    pub fn project_name(&self) -> Option<&str> {
        self.property_groups
            .iter()
            .find_map(|pg| pg.properties.project_name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }

    /// Compute the effective properties and item definitions for a
    /// configuration and platform.
    ///
    /// Property groups are evaluated in document order: groups without a
    /// `Condition` always contribute, conditional groups contribute when
    /// their condition holds. Later values override earlier ones, and every
    /// applied group feeds its values back into the variable map so later
    /// groups can reference them. Item-definition groups are then merged the
    /// same way and expanded against the final variable map.
    ///
    /// `env` seeds the variable map (user macros, process environment).
    pub fn evaluate(
        &self,
        configuration: &str,
        platform: &str,
        default_name: &str,
        env: &HashMap<String, String>,
    ) -> Evaluation {
        let build_vars = condition::build_vars(configuration, platform);
        let mut vars = env.clone();
        vars.insert("ProjectName".to_string(), default_name.to_string());
        vars.insert("MSBuildProjectName".to_string(), default_name.to_string());
        vars.insert("TargetName".to_string(), default_name.to_string());
        vars.extend(build_vars.clone());

        let mut eval = Evaluation::default();

        for pg in &self.property_groups {
            if !group_applies(pg.condition.as_deref(), &vars, &mut eval.unparsed_conditions) {
                continue;
            }
            let mut expanded = pg.properties.clone();
            expanded.expand_vars(&vars);
            eval.properties.merge_from(&expanded);
            eval.properties.collect_into_vars(&mut vars);
            for (k, v) in &pg.other {
                vars.insert(k.clone(), expand_msbuild_vars(v, &vars));
            }
            // The requested configuration/platform always win over values
            // a property group may assign to them.
            vars.extend(build_vars.clone());
        }

        if !vars.contains_key("TargetExt") {
            let ext = match eval.properties.configuration_type.as_deref() {
                Some("DynamicLibrary") => ".dll",
                Some("StaticLibrary") => ".lib",
                _ => ".exe",
            };
            vars.insert("TargetExt".to_string(), ext.to_string());
        }

        for idg in &self.item_definition_groups {
            if !group_applies(idg.condition.as_deref(), &vars, &mut eval.unparsed_conditions) {
                continue;
            }
            let mut expanded = idg.clone();
            expanded.expand_vars(&vars);
            eval.item_definitions.merge_from(&expanded);
        }

        eval.vars = vars;
        eval
    }

    /// All `<ClCompile>` items in document order.
    pub fn compile_items(&self) -> impl Iterator<Item = &FileItem> {
        self.item_groups.iter().flat_map(|ig| &ig.cl_compile)
    }

    /// All `<ClInclude>` items in document order.
    pub fn include_items(&self) -> impl Iterator<Item = &FileItem> {
        self.item_groups.iter().flat_map(|ig| &ig.cl_include)
    }

    /// All `<ProjectReference>` items in document order.
    pub fn project_references(&self) -> impl Iterator<Item = &ProjectReference> {
        self.item_groups.iter().flat_map(|ig| &ig.project_references)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Parsing – roxmltree → owned types
// ═══════════════════════════════════════════════════════════════════════════════

impl VcxProject {
    fn parse(root: roxmltree::Node) -> Self {
        let mut project = Self::default();

        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "PropertyGroup" => {
                    project.property_groups.push(PropertyGroup::parse(&child));
                }
                "ItemDefinitionGroup" => {
                    project
                        .item_definition_groups
                        .push(ItemDefinitionGroup::parse(&child));
                }
                "ItemGroup" => {
                    project.item_groups.push(ItemGroup::parse(&child));
                }
                _ => {}
            }
        }

        project
    }
}

// ─── PropertyGroup dispatch ──────────────────────────────────────────────────

impl PropertyGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut pg = Self {
            condition: node.attribute("Condition").map(String::from),
            label: node.attribute("Label").map(String::from),
            ..Default::default()
        };

        for child in node.children().filter(|n| n.is_element()) {
            let tag = child.tag_name().name();
            let text = child.text().unwrap_or("").trim().to_string();

            if set_project_property(tag, &text, &mut pg.properties) {
                continue;
            }
            pg.other.insert(tag.to_string(), text);
        }

        pg
    }
}

fn set_project_property(tag: &str, text: &str, p: &mut ProjectProperties) -> bool {
    let s = || Some(text.to_string());
    match tag {
        "ProjectName"                  => p.project_name = s(),
        "RootNamespace"                => p.root_namespace = s(),
        "ConfigurationType"            => p.configuration_type = s(),
        "UseDebugLibraries"            => p.use_debug_libraries = s(),
        "PlatformToolset"              => p.platform_toolset = s(),
        "CharacterSet"                 => p.character_set = s(),
        "UseOfMfc"                     => p.use_of_mfc = s(),
        "WholeProgramOptimization"     => p.whole_program_optimization = s(),
        "WindowsTargetPlatformVersion" => p.windows_target_platform_version = s(),
        "OutDir"                       => p.out_dir = s(),
        "IntDir"                       => p.int_dir = s(),
        "TargetName"                   => p.target_name = s(),
        "TargetExt"                    => p.target_ext = s(),
        _ => return false,
    }
    true
}

// ─── ItemDefinitionGroup dispatch ────────────────────────────────────────────

impl ItemDefinitionGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut idg = Self {
            condition: node.attribute("Condition").map(String::from),
            ..Default::default()
        };

        for tool in node.children().filter(|n| n.is_element()) {
            let tool_name = tool.tag_name().name();
            for child in tool.children().filter(|n| n.is_element()) {
                let tag = child.tag_name().name();
                let text = child.text().unwrap_or("").trim().to_string();
                match tool_name {
                    "ClCompile" => {
                        if !set_cl_option(tag, &text, &mut idg.cl_compile) {
                            idg.cl_compile.other.insert(tag.to_string(), text);
                        }
                    }
                    "Link" => {
                        if !set_link_option(tag, &text, &mut idg.link) {
                            idg.link.other.insert(tag.to_string(), text);
                        }
                    }
                    "Lib" => {
                        if !set_lib_option(tag, &text, &mut idg.lib) {
                            idg.lib.other.insert(tag.to_string(), text);
                        }
                    }
                    _ => {}
                }
            }
        }

        idg
    }
}

fn set_cl_option(tag: &str, text: &str, o: &mut ClCompileSettings) -> bool {
    let s = || Some(text.to_string());
    match tag {
        "AdditionalIncludeDirectories" => o.additional_include_directories = s(),
        "PreprocessorDefinitions"      => o.preprocessor_definitions = s(),
        "ForcedIncludeFiles"           => o.forced_include_files = s(),
        "PrecompiledHeader"            => o.precompiled_header = s(),
        "PrecompiledHeaderFile"        => o.precompiled_header_file = s(),
        "RuntimeLibrary"               => o.runtime_library = s(),
        "WarningLevel"                 => o.warning_level = s(),
        "TreatWarningAsError"          => o.treat_warning_as_error = s(),
        "Optimization"                 => o.optimization = s(),
        "DebugInformationFormat"       => o.debug_information_format = s(),
        "ExceptionHandling"            => o.exception_handling = s(),
        "RuntimeTypeInfo"              => o.runtime_type_info = s(),
        "MultiProcessorCompilation"    => o.multi_processor_compilation = s(),
        "LanguageStandard"             => o.language_standard = s(),
        "LanguageStandard_C"           => o.language_standard_c = s(),
        "ConformanceMode"              => o.conformance_mode = s(),
        "FunctionLevelLinking"         => o.function_level_linking = s(),
        "IntrinsicFunctions"           => o.intrinsic_functions = s(),
        "BufferSecurityCheck"          => o.buffer_security_check = s(),
        "FloatingPointModel"           => o.floating_point_model = s(),
        "SDLCheck"                     => o.sdl_check = s(),
        "WholeProgramOptimization"     => o.whole_program_optimization = s(),
        "CompileAs"                    => o.compile_as = s(),
        "DisableSpecificWarnings"      => o.disable_specific_warnings = s(),
        "AdditionalOptions"            => o.additional_options = s(),
        _ => return false,
    }
    true
}

fn set_link_option(tag: &str, text: &str, o: &mut LinkSettings) -> bool {
    let s = || Some(text.to_string());
    match tag {
        "AdditionalDependencies"         => o.additional_dependencies = s(),
        "AdditionalLibraryDirectories"   => o.additional_library_directories = s(),
        "OutputFile"                     => o.output_file = s(),
        "ImportLibrary"                  => o.import_library = s(),
        "ProgramDatabaseFile"            => o.program_database_file = s(),
        "SubSystem"                      => o.sub_system = s(),
        "GenerateDebugInformation"       => o.generate_debug_information = s(),
        "OptimizeReferences"             => o.optimize_references = s(),
        "EnableCOMDATFolding"            => o.enable_comdat_folding = s(),
        "LinkTimeCodeGeneration"         => o.link_time_code_generation = s(),
        "TargetMachine"                  => o.target_machine = s(),
        "ModuleDefinitionFile"           => o.module_definition_file = s(),
        "IgnoreSpecificDefaultLibraries" => o.ignore_specific_default_libraries = s(),
        "AdditionalOptions"              => o.additional_options = s(),
        _ => return false,
    }
    true
}

fn set_lib_option(tag: &str, text: &str, o: &mut LibSettings) -> bool {
    let s = || Some(text.to_string());
    match tag {
        "AdditionalDependencies"       => o.additional_dependencies = s(),
        "AdditionalLibraryDirectories" => o.additional_library_directories = s(),
        "OutputFile"                   => o.output_file = s(),
        "AdditionalOptions"            => o.additional_options = s(),
        _ => return false,
    }
    true
}

// ─── ItemGroup ───────────────────────────────────────────────────────────────

/// Both an `<ItemGroup>` and one of its items must hold.
fn combine_conditions(group: Option<&str>, item: Option<&str>) -> Option<String> {
    match (group, item) {
        (Some(g), Some(i)) => Some(format!("({g}) and ({i})")),
        (Some(c), None) | (None, Some(c)) => Some(c.to_string()),
        (None, None) => None,
    }
}

impl ItemGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut ig = Self {
            condition: node.attribute("Condition").map(String::from),
            label: node.attribute("Label").map(String::from),
            ..Default::default()
        };

        for child in node.children().filter(|n| n.is_element()) {
            let include = child.attribute("Include").unwrap_or("");
            let condition = combine_conditions(ig.condition.as_deref(), child.attribute("Condition"));
            match child.tag_name().name() {
                "ProjectConfiguration" => {
                    ig.project_configurations.push(ProjectConfiguration {
                        include: include.to_string(),
                        configuration: find_child_text(&child, "Configuration"),
                        platform: find_child_text(&child, "Platform"),
                    });
                }
                "ClCompile" => {
                    ig.cl_compile
                        .extend(FileItem::parse_all(&child, include, condition.as_deref()));
                }
                "ClInclude" => {
                    ig.cl_include
                        .extend(FileItem::parse_all(&child, include, condition.as_deref()));
                }
                "ProjectReference" => {
                    ig.project_references.push(ProjectReference {
                        include: include.to_string(),
                        project_guid: find_child_text(&child, "Project"),
                        condition,
                    });
                }
                _ => {}
            }
        }

        ig
    }
}

impl FileItem {
    /// One item element may list several files separated by `;`.
    fn parse_all(node: &roxmltree::Node, include: &str, condition: Option<&str>) -> Vec<Self> {
        let metadata: Vec<ItemMetadata> = node
            .children()
            .filter(|n| n.is_element())
            .map(|m| ItemMetadata {
                name: m.tag_name().name().to_string(),
                condition: m.attribute("Condition").map(String::from),
                value: m.text().unwrap_or("").trim().to_string(),
            })
            .collect();

        include
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|path| FileItem {
                include: path.to_string(),
                condition: condition.map(String::from),
                metadata: metadata.clone(),
            })
            .collect()
    }

    /// Metadata entries with the given name, in document order.
    pub fn metadata_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ItemMetadata> {
        self.metadata.iter().filter(move |m| m.name == name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup Label="ProjectConfigurations">
    <ProjectConfiguration Include="Debug|Win32">
      <Configuration>Debug</Configuration>
      <Platform>Win32</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Release|Win32">
      <Configuration>Release</Configuration>
      <Platform>Win32</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Release|x64">
      <Configuration>Release</Configuration>
      <Platform>x64</Platform>
    </ProjectConfiguration>
  </ItemGroup>
  <PropertyGroup Label="Globals">
    <ProjectName>Engine</ProjectName>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Debug|Win32'" Label="Configuration">
    <ConfigurationType>StaticLibrary</ConfigurationType>
    <PlatformToolset>v143</PlatformToolset>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Release|Win32'" Label="Configuration">
    <ConfigurationType>DynamicLibrary</ConfigurationType>
  </PropertyGroup>
  <PropertyGroup>
    <OutDir>$(SolutionDir)bin\$(Configuration)\</OutDir>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <ClCompile>
      <WarningLevel>Level3</WarningLevel>
    </ClCompile>
  </ItemDefinitionGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Debug|Win32'">
    <ClCompile>
      <PreprocessorDefinitions>_DEBUG;%(PreprocessorDefinitions)</PreprocessorDefinitions>
      <SomethingNew>yes</SomethingNew>
    </ClCompile>
    <Link>
      <OutputFile>$(OutDir)$(TargetName).dll</OutputFile>
    </Link>
  </ItemDefinitionGroup>
  <ItemDefinitionGroup Condition="'$(Configuration)|$(Platform)'=='Profile|Win32'">
    <ClCompile />
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="a.cpp;b.cpp" />
    <ClCompile Include="pch.cpp">
      <PrecompiledHeader Condition="'$(Configuration)|$(Platform)'=='Debug|Win32'">Create</PrecompiledHeader>
    </ClCompile>
    <ClInclude Include="pch.h" />
  </ItemGroup>
  <ItemGroup>
    <ProjectReference Include="..\Core\Core.vcxproj">
      <Project>{11111111-2222-3333-4444-555555555555}</Project>
    </ProjectReference>
  </ItemGroup>
</Project>"#;

    fn sample() -> VcxProject {
        VcxDocument::parse(SAMPLE).unwrap().project
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    #[test]
    fn expand_keeps_unknown_variables() {
        let vars = HashMap::from([("Configuration".to_string(), "Debug".to_string())]);
        assert_eq!(
            expand_msbuild_vars("$(SolutionDir)bin\\$(Configuration)\\", &vars),
            "$(SolutionDir)bin\\Debug\\"
        );
        assert_eq!(expand_msbuild_vars("broken $(Open", &vars), "broken $(Open");
    }

    // ── Parsing ──────────────────────────────────────────────────────────

    #[test]
    fn parses_groups_and_items() {
        let project = sample();
        assert_eq!(project.property_groups.len(), 4);
        assert_eq!(project.item_definition_groups.len(), 3);
        assert_eq!(project.project_name(), Some("Engine"));

        let sources: Vec<&str> = project.compile_items().map(|i| i.include.as_str()).collect();
        assert_eq!(sources, ["a.cpp", "b.cpp", "pch.cpp"]);
        let headers: Vec<&str> = project.include_items().map(|i| i.include.as_str()).collect();
        assert_eq!(headers, ["pch.h"]);

        let pch = project.compile_items().nth(2).unwrap();
        let meta: Vec<&ItemMetadata> = pch.metadata_named("PrecompiledHeader").collect();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].value, "Create");
        assert!(meta[0].condition.as_deref().unwrap().contains("Debug|Win32"));

        let refs: Vec<&ProjectReference> = project.project_references().collect();
        assert_eq!(refs[0].include, "..\\Core\\Core.vcxproj");
        assert!(refs[0].project_guid.is_some());
    }

    #[test]
    fn unknown_settings_land_in_other() {
        let project = sample();
        assert_eq!(
            project.item_definition_groups[1].cl_compile.other.get("SomethingNew").map(String::as_str),
            Some("yes")
        );
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(VcxDocument::parse("<Project><PropertyGroup></Project>").is_err());
    }

    #[test]
    fn from_file_reports_missing_path() {
        let err = VcxDocument::from_file("does/not/exist.vcxproj").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    // ── Configurations / platforms ───────────────────────────────────────

    #[test]
    fn configurations_include_definition_group_conditions() {
        let configs: Vec<String> = sample().configurations().into_iter().collect();
        assert_eq!(configs, ["Debug", "Profile", "Release"]);
    }

    #[test]
    fn platforms_in_document_order() {
        assert_eq!(sample().platforms(), ["Win32", "x64"]);
    }

    // ── Evaluation ───────────────────────────────────────────────────────

    #[test]
    fn evaluate_debug_applies_matching_groups() {
        let eval = sample().evaluate("Debug", "Win32", "Engine", &HashMap::new());
        assert_eq!(eval.properties.configuration_type.as_deref(), Some("StaticLibrary"));
        assert_eq!(eval.properties.platform_toolset.as_deref(), Some("v143"));
        assert_eq!(eval.properties.out_dir.as_deref(), Some("$(SolutionDir)bin\\Debug\\"));

        let cl = &eval.item_definitions.cl_compile;
        assert_eq!(cl.warning_level.as_deref(), Some("Level3"));
        assert_eq!(
            cl.preprocessor_definitions.as_deref(),
            Some("_DEBUG;%(PreprocessorDefinitions)")
        );
        assert_eq!(
            eval.item_definitions.link.output_file.as_deref(),
            Some("$(SolutionDir)bin\\Debug\\Engine.dll")
        );
    }

    #[test]
    fn evaluate_release_skips_debug_groups() {
        let eval = sample().evaluate("Release", "Win32", "Engine", &HashMap::new());
        assert_eq!(eval.properties.configuration_type.as_deref(), Some("DynamicLibrary"));
        assert!(eval.item_definitions.cl_compile.preprocessor_definitions.is_none());
        assert!(eval.item_definitions.link.output_file.is_none());
    }

    #[test]
    fn evaluate_seeds_environment() {
        let doc = VcxDocument::parse(
            r#"<Project>
                 <PropertyGroup><OutDir>$(BUILD_ROOT)\out\</OutDir></PropertyGroup>
               </Project>"#,
        )
        .unwrap();
        let env = HashMap::from([("BUILD_ROOT".to_string(), "D:\\b".to_string())]);
        let eval = doc.project.evaluate("Debug", "Win32", "x", &env);
        assert_eq!(eval.properties.out_dir.as_deref(), Some("D:\\b\\out\\"));
    }

    #[test]
    fn evaluate_records_unparsed_conditions() {
        let doc = VcxDocument::parse(
            r#"<Project>
                 <PropertyGroup Condition="$([MSBuild]::IsOSPlatform('Windows'))">
                   <ConfigurationType>DynamicLibrary</ConfigurationType>
                 </PropertyGroup>
               </Project>"#,
        )
        .unwrap();
        let eval = doc.project.evaluate("Debug", "Win32", "x", &HashMap::new());
        assert!(eval.properties.configuration_type.is_none());
        assert_eq!(eval.unparsed_conditions.len(), 1);
    }

    #[test]
    fn item_conditions_combine_with_group_condition() {
        let doc = VcxDocument::parse(
            r#"<Project>
                 <ItemGroup Condition="'$(Platform)'=='x64'">
                   <ClCompile Include="a.cpp" />
                   <ClCompile Include="b.cpp" Condition="'$(Configuration)'=='Debug'" />
                   <ProjectReference Include="..\Tools\Tools.vcxproj" Condition="'$(Configuration)'=='Release'" />
                 </ItemGroup>
                 <ItemGroup>
                   <ClInclude Include="c.h" Condition="'$(Configuration)'=='Debug'" />
                 </ItemGroup>
               </Project>"#,
        )
        .unwrap();
        let files: Vec<&FileItem> = doc.project.compile_items().collect();
        assert_eq!(files[0].condition.as_deref(), Some("'$(Platform)'=='x64'"));
        let combined = files[1].condition.as_deref().unwrap();
        assert_eq!(combined, "('$(Platform)'=='x64') and ('$(Configuration)'=='Debug')");
        assert!(condition::holds_for(combined, "Debug", "x64").unwrap());
        assert!(!condition::holds_for(combined, "Debug", "Win32").unwrap());

        let header = doc.project.include_items().next().unwrap();
        assert_eq!(header.condition.as_deref(), Some("'$(Configuration)'=='Debug'"));

        let reference = doc.project.project_references().next().unwrap();
        assert!(reference.condition.as_deref().unwrap().ends_with("('$(Configuration)'=='Release')"));
    }
}
