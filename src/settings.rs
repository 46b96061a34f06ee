//! Per-configuration settings normalizer.
//!
//! Turns the merged MSBuild tool settings of one configuration
//! ([`crate::msbuild::Evaluation`]) into a fixed-shape
//! [`ConfigurationSettings`] record: split lists, translated path macros,
//! MSVC compiler/linker flags and the cross-validated runtime library.

use crate::dependency::LibraryReference;
use crate::msbuild::{ClCompileSettings, Evaluation, LibSettings, LinkSettings};
use crate::project::TargetType;

// ═══════════════════════════════════════════════════════════════════════════════
//  Setting value types
// ═══════════════════════════════════════════════════════════════════════════════

/// Precompiled-header mode. `None` means the setting is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PchMode {
    #[default]
    None,
    Create,
    Use,
    NotUsing,
}

impl PchMode {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Create" => PchMode::Create,
            "Use" => PchMode::Use,
            "NotUsing" => PchMode::NotUsing,
            _ => PchMode::None,
        }
    }
}

/// MSVC C runtime library variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeLibrary {
    MultiThreaded,
    MultiThreadedDebug,
    MultiThreadedDll,
    MultiThreadedDebugDll,
}

impl RuntimeLibrary {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "MultiThreaded" => Some(Self::MultiThreaded),
            "MultiThreadedDebug" => Some(Self::MultiThreadedDebug),
            "MultiThreadedDLL" => Some(Self::MultiThreadedDll),
            "MultiThreadedDebugDLL" => Some(Self::MultiThreadedDebugDll),
            _ => None,
        }
    }

    pub fn is_debug(self) -> bool {
        matches!(self, Self::MultiThreadedDebug | Self::MultiThreadedDebugDll)
    }

    pub fn dll(debug: bool) -> Self {
        if debug {
            Self::MultiThreadedDebugDll
        } else {
            Self::MultiThreadedDll
        }
    }

    /// Value of CMake's `MSVC_RUNTIME_LIBRARY` property.
    pub fn cmake_name(self) -> &'static str {
        match self {
            Self::MultiThreaded => "MultiThreaded",
            Self::MultiThreadedDebug => "MultiThreadedDebug",
            Self::MultiThreadedDll => "MultiThreadedDLL",
            Self::MultiThreadedDebugDll => "MultiThreadedDebugDLL",
        }
    }

    /// Equivalent `cl.exe` switch.
    pub fn msvc_flag(self) -> &'static str {
        match self {
            Self::MultiThreaded => "/MT",
            Self::MultiThreadedDebug => "/MTd",
            Self::MultiThreadedDll => "/MD",
            Self::MultiThreadedDebugDll => "/MDd",
        }
    }
}

/// `UseOfMfc` project property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfcUsage {
    Static,
    Dynamic,
}

impl MfcUsage {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Static" => Some(Self::Static),
            "Dynamic" => Some(Self::Dynamic),
            _ => None,
        }
    }

    /// Value of CMake's `CMAKE_MFC_FLAG`.
    pub fn cmake_flag(self) -> u8 {
        match self {
            Self::Static => 1,
            Self::Dynamic => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    Unicode,
    MultiByte,
}

impl CharacterSet {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Unicode" => Some(Self::Unicode),
            "MultiByte" => Some(Self::MultiByte),
            _ => None,
        }
    }

    fn defines(self) -> &'static [&'static str] {
        match self {
            Self::Unicode => &["UNICODE", "_UNICODE"],
            Self::MultiByte => &["_MBCS"],
        }
    }
}

/// `CompileAs` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileAs {
    C,
    Cpp,
}

impl CompileAs {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "CompileAsC" => Some(Self::C),
            "CompileAsCpp" => Some(Self::Cpp),
            _ => None,
        }
    }

    pub fn cmake_language(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cpp => "CXX",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ConfigurationSettings
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalized settings of one project in one configuration.
///
/// List fields keep first-occurrence order and contain no duplicates.
/// Absent settings stay `None` or empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSettings {
    pub include_dirs: Vec<String>,
    pub defines: Vec<String>,
    pub forced_includes: Vec<String>,
    pub compile_options: Vec<String>,
    pub link_options: Vec<String>,
    pub libraries: Vec<LibraryReference>,
    pub library_dirs: Vec<String>,
    pub output_directory: Option<String>,
    pub output_file: Option<String>,
    pub target_name: Option<String>,
    pub import_library_path: Option<String>,
    pub pdb_path: Option<String>,
    pub pch_mode: PchMode,
    pub pch_header: Option<String>,
    pub runtime_library: Option<RuntimeLibrary>,
    /// The runtime library was forced by `UseOfMfc=Dynamic`.
    pub runtime_forced_by_mfc: bool,
    pub mfc: Option<MfcUsage>,
    pub character_set: Option<CharacterSet>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Value helpers
// ═══════════════════════════════════════════════════════════════════════════════

/// Push `item` unless it is already present.
pub(crate) fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

/// Split a `;`-delimited MSBuild list: trim items, drop empty ones and
/// `%(Inherited)` tokens, de-duplicate.
pub fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    for item in value.split(';').map(str::trim) {
        if item.is_empty() || item.starts_with("%(") {
            continue;
        }
        push_unique(&mut items, item.to_string());
    }
    items
}

fn is_true(value: Option<&String>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn is_false(value: Option<&String>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("false"))
}

/// Path macros with a fixed CMake translation.
const MACRO_TRANSLATIONS: &[(&str, &str)] = &[
    ("SolutionDir", "${CMAKE_SOURCE_DIR}/"),
    ("ProjectDir", "${CMAKE_CURRENT_SOURCE_DIR}/"),
    ("MSBuildProjectDirectory", "${CMAKE_CURRENT_SOURCE_DIR}/"),
    ("MSBuildThisFileDirectory", "${CMAKE_CURRENT_SOURCE_DIR}/"),
    ("OutDir", "${CMAKE_CURRENT_BINARY_DIR}/"),
    ("IntDir", "${CMAKE_CURRENT_BINARY_DIR}/"),
    ("Configuration", "$<CONFIG>"),
    ("Platform", "${CMAKE_GENERATOR_PLATFORM}"),
];

/// CMake path variables that repeated substitution can stack up.
const PATH_VARIABLES: &[&str] = &[
    "${CMAKE_SOURCE_DIR}/",
    "${CMAKE_CURRENT_SOURCE_DIR}/",
    "${CMAKE_CURRENT_BINARY_DIR}/",
];

/// Translate the MSBuild `$(Macro)` references left after evaluation into
/// CMake equivalents and normalize separators.
///
/// Known path macros map to CMake variables, anything else becomes an
/// environment reference. Backslashes become forward slashes, doubled
/// slashes and stacked path-variable prefixes are collapsed.
pub fn translate_macros(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value.trim();

    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(')') else {
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };
        let name = &after[..end];
        match MACRO_TRANSLATIONS.iter().find(|(m, _)| *m == name) {
            Some((_, cmake)) => out.push_str(cmake),
            None => {
                out.push_str("$ENV{");
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    let mut out = out.replace('\\', "/");

    // Keep a leading `//` (UNC path), collapse the rest.
    let (prefix, body) = if out.starts_with("//") {
        ("//", &out[2..])
    } else {
        ("", &out[..])
    };
    let mut body = body.to_string();
    while body.contains("//") {
        body = body.replace("//", "/");
    }
    out = format!("{prefix}{body}");

    loop {
        let before = out.len();
        for var in PATH_VARIABLES {
            let doubled = format!("{var}{var}");
            out = out.replace(&doubled, var);
        }
        // `$(SolutionDir)$(ProjectDir)` style stacking keeps the innermost root.
        for outer in PATH_VARIABLES {
            for inner in PATH_VARIABLES {
                if outer != inner {
                    let stacked = format!("{outer}{inner}");
                    out = out.replace(&stacked, inner);
                }
            }
        }
        if out.len() == before {
            break;
        }
    }

    out
}

/// Translate a path and drop a trailing separator.
fn translate_dir(value: &str) -> String {
    let dir = translate_macros(value);
    match dir.strip_suffix('/') {
        Some(stripped) if !stripped.is_empty() && !stripped.ends_with(':') => stripped.to_string(),
        _ => dir,
    }
}

fn translated_list(value: Option<&String>) -> Vec<String> {
    let mut items = Vec::new();
    for item in value.map(|v| split_list(v)).unwrap_or_default() {
        push_unique(&mut items, translate_dir(&item));
    }
    items
}

/// Split free-form `AdditionalOptions` on whitespace.
fn split_options(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split_whitespace()
                .filter(|o| !o.starts_with("%("))
                .map(translate_macros)
                .collect()
        })
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Compiler flags
// ═══════════════════════════════════════════════════════════════════════════════

/// `WarningLevel` → `/W*`.
pub fn warning_level_flag(value: &str) -> Option<&'static str> {
    match value.trim() {
        "TurnOffAllWarnings" | "Level0" => Some("/W0"),
        "Level1" => Some("/W1"),
        "Level2" => Some("/W2"),
        "Level3" => Some("/W3"),
        "Level4" => Some("/W4"),
        "EnableAllWarnings" => Some("/Wall"),
        _ => None,
    }
}

/// Look up `value` in a setting's value table; unknown values are dropped.
fn lookup(setting: &str, value: Option<&String>, table: &[(&str, &'static str)]) -> Option<&'static str> {
    let value = value?.trim();
    let flag = table
        .iter()
        .find(|(v, _)| v.eq_ignore_ascii_case(value))
        .map(|(_, f)| *f);
    if flag.is_none() {
        tracing::debug!("ignoring {setting}={value}");
    }
    flag.filter(|f| !f.is_empty())
}

fn compile_flags(cl: &ClCompileSettings) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    let mut add = |flag: Option<&str>| {
        if let Some(f) = flag {
            push_unique(&mut flags, f.to_string());
        }
    };

    if let Some(level) = &cl.warning_level {
        let flag = warning_level_flag(level);
        if flag.is_none() {
            tracing::debug!("ignoring WarningLevel={level}");
        }
        add(flag);
    }
    add(is_true(cl.treat_warning_as_error.as_ref()).then_some("/WX"));
    add(lookup("Optimization", cl.optimization.as_ref(), &[
        ("Disabled", "/Od"),
        ("MinSpace", "/O1"),
        ("MaxSpeed", "/O2"),
        ("Full", "/Ox"),
    ]));
    add(lookup("DebugInformationFormat", cl.debug_information_format.as_ref(), &[
        ("None", ""),
        ("OldStyle", "/Z7"),
        ("ProgramDatabase", "/Zi"),
        ("EditAndContinue", "/ZI"),
    ]));
    add(lookup("ExceptionHandling", cl.exception_handling.as_ref(), &[
        ("false", ""),
        ("Sync", "/EHsc"),
        ("SyncCThrow", "/EHs"),
        ("Async", "/EHa"),
    ]));
    if is_false(cl.runtime_type_info.as_ref()) {
        add(Some("/GR-"));
    } else if is_true(cl.runtime_type_info.as_ref()) {
        add(Some("/GR"));
    }
    add(is_true(cl.multi_processor_compilation.as_ref()).then_some("/MP"));
    add(lookup("LanguageStandard", cl.language_standard.as_ref(), &[
        ("Default", ""),
        ("stdcpp14", "/std:c++14"),
        ("stdcpp17", "/std:c++17"),
        ("stdcpp20", "/std:c++20"),
        ("stdcpplatest", "/std:c++latest"),
    ]));
    add(lookup("LanguageStandard_C", cl.language_standard_c.as_ref(), &[
        ("Default", ""),
        ("stdc11", "/std:c11"),
        ("stdc17", "/std:c17"),
    ]));
    add(is_true(cl.conformance_mode.as_ref()).then_some("/permissive-"));
    add(is_true(cl.function_level_linking.as_ref()).then_some("/Gy"));
    add(is_true(cl.intrinsic_functions.as_ref()).then_some("/Oi"));
    add(is_false(cl.buffer_security_check.as_ref()).then_some("/GS-"));
    add(lookup("FloatingPointModel", cl.floating_point_model.as_ref(), &[
        ("Precise", "/fp:precise"),
        ("Strict", "/fp:strict"),
        ("Fast", "/fp:fast"),
    ]));
    add(is_true(cl.sdl_check.as_ref()).then_some("/sdl"));
    add(is_true(cl.whole_program_optimization.as_ref()).then_some("/GL"));
    add(lookup("CompileAs", cl.compile_as.as_ref(), &[
        ("Default", ""),
        ("CompileAsC", "/TC"),
        ("CompileAsCpp", "/TP"),
    ]));

    for warning in cl.disable_specific_warnings.as_deref().map(split_list).unwrap_or_default() {
        push_unique(&mut flags, format!("/wd{warning}"));
    }
    for option in split_options(cl.additional_options.as_ref()) {
        push_unique(&mut flags, option);
    }

    for (tag, value) in &cl.other {
        tracing::debug!("ignoring ClCompile setting {tag}={value}");
    }

    flags
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Linker flags
// ═══════════════════════════════════════════════════════════════════════════════

fn link_flags(link: &LinkSettings) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    let mut add = |flag: Option<&str>| {
        if let Some(f) = flag {
            push_unique(&mut flags, f.to_string());
        }
    };

    add(lookup("SubSystem", link.sub_system.as_ref(), &[
        ("NotSet", ""),
        ("Console", "/SUBSYSTEM:CONSOLE"),
        ("Windows", "/SUBSYSTEM:WINDOWS"),
        ("Native", "/SUBSYSTEM:NATIVE"),
    ]));
    add(lookup("GenerateDebugInformation", link.generate_debug_information.as_ref(), &[
        ("false", ""),
        ("No", ""),
        ("true", "/DEBUG"),
        ("DebugFull", "/DEBUG:FULL"),
        ("DebugFastLink", "/DEBUG:FASTLINK"),
    ]));
    if is_true(link.optimize_references.as_ref()) {
        add(Some("/OPT:REF"));
    } else if is_false(link.optimize_references.as_ref()) {
        add(Some("/OPT:NOREF"));
    }
    if is_true(link.enable_comdat_folding.as_ref()) {
        add(Some("/OPT:ICF"));
    } else if is_false(link.enable_comdat_folding.as_ref()) {
        add(Some("/OPT:NOICF"));
    }
    add(lookup("LinkTimeCodeGeneration", link.link_time_code_generation.as_ref(), &[
        ("Default", ""),
        ("UseLinkTimeCodeGeneration", "/LTCG"),
        ("UseFastLinkTimeCodeGeneration", "/LTCG:incremental"),
    ]));
    add(lookup("TargetMachine", link.target_machine.as_ref(), &[
        ("MachineX86", "/MACHINE:X86"),
        ("MachineX64", "/MACHINE:X64"),
        ("MachineARM", "/MACHINE:ARM"),
        ("MachineARM64", "/MACHINE:ARM64"),
    ]));

    if let Some(def) = link.module_definition_file.as_deref().filter(|d| !d.trim().is_empty()) {
        push_unique(&mut flags, format!("/DEF:{}", translate_macros(def)));
    }
    for lib in link
        .ignore_specific_default_libraries
        .as_deref()
        .map(split_list)
        .unwrap_or_default()
    {
        push_unique(&mut flags, format!("/NODEFAULTLIB:{lib}"));
    }
    for option in split_options(link.additional_options.as_ref()) {
        push_unique(&mut flags, option);
    }

    for (tag, value) in &link.other {
        tracing::debug!("ignoring Link setting {tag}={value}");
    }

    flags
}

fn lib_flags(lib: &LibSettings) -> Vec<String> {
    for (tag, value) in &lib.other {
        tracing::debug!("ignoring Lib setting {tag}={value}");
    }
    split_options(lib.additional_options.as_ref())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Normalization
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalize one evaluated configuration.
pub fn normalize(eval: &Evaluation, target_type: TargetType) -> ConfigurationSettings {
    let props = &eval.properties;
    let cl = &eval.item_definitions.cl_compile;
    let link = &eval.item_definitions.link;
    let lib = &eval.item_definitions.lib;

    let mut settings = ConfigurationSettings {
        include_dirs: translated_list(cl.additional_include_directories.as_ref()),
        defines: cl
            .preprocessor_definitions
            .as_deref()
            .map(split_list)
            .unwrap_or_default(),
        forced_includes: translated_list(cl.forced_include_files.as_ref()),
        compile_options: compile_flags(cl),
        pch_mode: cl.precompiled_header.as_deref().map(PchMode::parse).unwrap_or_default(),
        pch_header: cl
            .precompiled_header_file
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .map(translate_macros),
        mfc: props.use_of_mfc.as_deref().and_then(MfcUsage::parse),
        character_set: props.character_set.as_deref().and_then(CharacterSet::parse),
        output_directory: props
            .out_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(translate_dir),
        target_name: props
            .target_name
            .clone()
            .filter(|n| !n.trim().is_empty() && !n.contains("$(")),
        ..Default::default()
    };

    // Static libraries are produced by lib.exe; everything else by link.exe.
    let (dependencies, library_dirs, output_file) = match target_type {
        TargetType::StaticLibrary => {
            settings.link_options = lib_flags(lib);
            (
                &lib.additional_dependencies,
                &lib.additional_library_directories,
                &lib.output_file,
            )
        }
        TargetType::Executable | TargetType::SharedLibrary => {
            settings.link_options = link_flags(link);
            settings.import_library_path = link
                .import_library
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(translate_macros);
            settings.pdb_path = link
                .program_database_file
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(translate_macros);
            (
                &link.additional_dependencies,
                &link.additional_library_directories,
                &link.output_file,
            )
        }
    };

    for raw in dependencies.as_deref().map(split_list).unwrap_or_default() {
        push_unique(&mut settings.libraries, LibraryReference::new(&raw));
    }
    settings.library_dirs = translated_list(library_dirs.as_ref());
    settings.output_file = output_file
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(translate_macros);

    if let Some(charset) = settings.character_set {
        for define in charset.defines() {
            push_unique(&mut settings.defines, define.to_string());
        }
    }

    apply_runtime_library(&mut settings, cl, props.use_debug_libraries.as_deref());

    settings
}

/// Resolve the runtime library, letting `UseOfMfc=Dynamic` override the
/// literal setting.
///
/// MFC linked as a DLL requires `_AFXDLL` and the DLL runtime. The debug
/// variant follows the configured runtime, then `UseDebugLibraries`, then
/// a `_DEBUG` define.
fn apply_runtime_library(
    settings: &mut ConfigurationSettings,
    cl: &ClCompileSettings,
    use_debug_libraries: Option<&str>,
) {
    let literal = cl.runtime_library.as_deref().and_then(RuntimeLibrary::parse);
    if literal.is_none() {
        if let Some(value) = cl.runtime_library.as_deref() {
            tracing::debug!("ignoring RuntimeLibrary={value}");
        }
    }

    if settings.mfc != Some(MfcUsage::Dynamic) {
        settings.runtime_library = literal;
        return;
    }

    let debug = match literal {
        Some(runtime) => runtime.is_debug(),
        None => match use_debug_libraries {
            Some(v) => v.trim().eq_ignore_ascii_case("true"),
            None => settings.defines.iter().any(|d| d == "_DEBUG"),
        },
    };
    let forced = RuntimeLibrary::dll(debug);
    if let Some(runtime) = literal.filter(|r| *r != forced) {
        tracing::debug!(
            "UseOfMfc=Dynamic overrides RuntimeLibrary={}",
            runtime.cmake_name()
        );
    }
    settings.runtime_library = Some(forced);
    settings.runtime_forced_by_mfc = true;
    push_unique(&mut settings.defines, "_AFXDLL".to_string());
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
