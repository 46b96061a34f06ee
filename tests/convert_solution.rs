//! End-to-end conversion of the sample solution through the library API.

mod common;

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use vcxproj_cmake::{Conversion, ConverterBuilder, Warning};

fn convert(sln: &Path) -> Conversion {
    ConverterBuilder::new().build().convert(sln).unwrap()
}

fn document<'a>(conversion: &'a Conversion, root: &Path, relative: &str) -> &'a str {
    let path = root.join(relative).join("CMakeLists.txt");
    match conversion.document(&path) {
        Some(doc) => &doc.contents,
        None => panic!("no document at {}", path.display()),
    }
}

// ============================================================================
// Catalog and ordering
// ============================================================================

#[test]
fn test_one_document_per_directory() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    let mut paths: Vec<_> = conversion.documents.iter().map(|d| d.path.clone()).collect();
    assert_eq!(paths[0], tmp.path().join("CMakeLists.txt"));
    paths.sort();
    let mut expected: Vec<_> = ["", "App", "Broken", "Core", "Net", "Tools"]
        .iter()
        .map(|d| tmp.path().join(d).join("CMakeLists.txt"))
        .collect();
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn test_dependencies_come_first() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    assert_eq!(
        conversion.build_order,
        ["Core", "Net_Lib", "Broken", "GenLib", "GenA", "App"]
    );

    let root = document(&conversion, tmp.path(), "");
    let position = |needle: &str| root.find(needle).unwrap();
    assert!(position("add_subdirectory(Core)") < position("add_subdirectory(Net)"));
    assert!(position("add_subdirectory(Net)") < position("add_subdirectory(App)"));

    let tools = document(&conversion, tmp.path(), "Tools");
    assert!(tools.find("add_library(GenLib STATIC").unwrap() < tools.find("add_executable(GenA").unwrap());
}

#[test]
fn test_problem_entries_are_reported_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    let warnings = &conversion.report.warnings;
    assert!(warnings.iter().any(|w| matches!(w, Warning::MissingProjectFile { name, .. } if name == "Gone")));
    assert!(warnings.iter().any(|w| matches!(w, Warning::MalformedProject { path, .. } if path.ends_with("Broken/Broken.vcxproj"))));
    assert_eq!(conversion.report.cycles().count(), 0);

    let broken = document(&conversion, tmp.path(), "Broken");
    assert!(broken.contains("# Broken.vcxproj could not be parsed"));
    assert!(!broken.contains("add_executable"));
}

#[test]
fn test_cycle_falls_back_to_discovery_order() {
    let tmp = TempDir::new().unwrap();
    let sln = common::cyclic_solution(&tmp);
    let conversion = convert(&sln);

    let cycles: Vec<_> = conversion.report.cycles().collect();
    assert_eq!(
        cycles,
        [&Warning::DependencyCycle {
            unit: "Loop".into(),
            members: vec!["A".into(), "B".into()],
        }]
    );
    assert_eq!(conversion.build_order, ["A", "B"]);

    let doc = document(&conversion, tmp.path(), "Loop");
    assert!(doc.contains("add_library(A STATIC"));
    assert!(doc.contains("add_library(B STATIC"));
}

// ============================================================================
// Link classification
// ============================================================================

#[test]
fn test_library_names_resolve_case_insensitively() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    assert_eq!(conversion.registry.resolve("net-lib"), Some("Net_Lib"));
    assert_eq!(conversion.registry.resolve("NET"), Some("Net_Lib"));

    let app = document(&conversion, tmp.path(), "App");
    assert!(app.contains("# Solution targets\ntarget_link_libraries(App PRIVATE\n    Core\n    Net_Lib\n)"));
    assert!(app.contains("# System libraries\ntarget_link_libraries(App PRIVATE\n    user32\n)"));
}

#[test]
fn test_colliding_identifiers_get_distinct_targets() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    let lib = |links: &str, source: &str| {
        common::vcxproj(&format!(
            r#"  <PropertyGroup Label="Configuration">
    <ConfigurationType>StaticLibrary</ConfigurationType>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <Lib>
      <AdditionalDependencies>{links}</AdditionalDependencies>
    </Lib>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="{source}" />
  </ItemGroup>"#
        ))
    };
    common::write(root, "A/Net-Lib.vcxproj", &lib("", "a.cpp"));
    common::write(root, "B/Net_Lib.vcxproj", &lib("Net-Lib.lib", "b.cpp"));
    let sln = common::write(
        root,
        "Clash.sln",
        &common::sln(&[("Net-Lib", "A\\Net-Lib.vcxproj"), ("Net_Lib", "B\\Net_Lib.vcxproj")]),
    );
    let conversion = convert(&sln);

    assert_eq!(conversion.build_order, ["Net_Lib", "Net_Lib_2"]);
    let collisions: Vec<_> = conversion
        .report
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::NameCollision { .. }))
        .collect();
    assert_eq!(
        collisions,
        [&Warning::NameCollision {
            key: "net_lib".into(),
            kept: "Net_Lib".into(),
            ignored: "Net_Lib_2".into(),
        }]
    );
    assert_eq!(conversion.registry.resolve("Net_Lib_2"), Some("Net_Lib_2"));

    let a = document(&conversion, root, "A");
    let b = document(&conversion, root, "B");
    assert!(a.contains("add_library(Net_Lib STATIC"));
    assert!(!a.contains("Net_Lib_2"));
    assert!(b.contains("add_library(Net_Lib_2 STATIC"));
    assert!(!b.contains("add_library(Net_Lib STATIC"));
    assert!(b.contains("target_link_libraries(Net_Lib_2 PRIVATE\n    Net_Lib\n)"));
}

#[test]
fn test_absolute_library_paths_are_left_for_review() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    assert!(conversion.report.warnings.contains(&Warning::AbsoluteLibraryPath {
        project: "Net-Lib".into(),
        path: "C:/External/foo.lib".into(),
    }));

    let net = document(&conversion, tmp.path(), "Net");
    assert!(net.contains("# MANUAL REVIEW"));
    assert!(net.contains("#   C:/External/foo.lib (Debug, Release)"));
    assert!(!net.contains("    C:/External/foo.lib\n"));
    assert!(net.contains("# External libraries\ntarget_link_libraries(Net_Lib PRIVATE\n    ../third_party/zlib/zlib.lib\n)"));
    assert!(net.contains("    ws2_32\n"));
    assert!(net.contains("    Core\n"));
}

// ============================================================================
// Compile settings
// ============================================================================

#[test]
fn test_precompiled_header_partition() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    let core = document(&conversion, tmp.path(), "Core");
    assert!(core.contains(
        "target_precompile_headers(Core PRIVATE $<$<COMPILE_LANGUAGE:CXX>:${CMAKE_CURRENT_SOURCE_DIR}/pch.h>)"
    ));
    assert!(core.contains(
        "set_source_files_properties(\n    pch.cpp\n    util.c\n    PROPERTIES SKIP_PRECOMPILE_HEADERS ON\n)"
    ));
}

#[test]
fn test_windows_version_is_completed() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    let core = conversion.project("Core").unwrap();
    for config in ["Debug", "Release"] {
        assert_eq!(core.windows_version_defines[config], ["_WIN32_WINNT=0x0A00"]);
    }

    let app = document(&conversion, tmp.path(), "App");
    assert!(app.contains(
        "if(WIN32)\n    target_compile_definitions(App PRIVATE\n        WINVER=0x0601\n        _WIN32_WINNT=0x0601\n    )\nendif()"
    ));
}

#[test]
fn test_mfc_dll_forces_dll_runtime() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);
    let conversion = convert(&sln);

    let net = document(&conversion, tmp.path(), "Net");
    assert!(net.contains("set(CMAKE_MFC_FLAG 2)"));
    assert!(net.contains("# MFC as a shared DLL requires the DLL runtime."));
    assert!(net.contains(
        "MSVC_RUNTIME_LIBRARY $<$<CONFIG:Debug>:MultiThreadedDebugDLL>$<$<CONFIG:Release>:MultiThreadedDLL>"
    ));
    assert!(net.contains("    _AFXDLL\n"));
}

#[test]
fn test_single_configuration_keeps_debug_only_sources() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);

    let all = convert(&sln);
    let app = document(&all, tmp.path(), "App");
    assert!(app.contains("# Excluded from build:\n#   debug_tools.cpp"));

    let debug = ConverterBuilder::new()
        .configuration("Debug")
        .build()
        .convert(&sln)
        .unwrap();
    let app = document(&debug, tmp.path(), "App");
    assert!(app.contains("set(SOURCE_FILES_App\n    main.cpp\n    debug_tools.cpp\n)"));
    assert!(!app.contains("Excluded from build"));
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn test_conversion_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let sln = common::sample_solution(&tmp);

    let first = convert(&sln);
    first.write().unwrap();
    let written: Vec<String> = first
        .documents
        .iter()
        .map(|d| fs::read_to_string(&d.path).unwrap())
        .collect();

    let second = convert(&sln);
    second.write().unwrap();
    assert_eq!(first.documents, second.documents);
    for (doc, before) in second.documents.iter().zip(&written) {
        assert_eq!(&fs::read_to_string(&doc.path).unwrap(), before);
    }
}
