//! Sample solution shared by the integration tests.
//!
//! ```text
//! Sample.sln
//! ├── App/App.vcxproj        exe, references Core, links NET-LIB.lib
//! ├── Core/Core.vcxproj      static lib, precompiled header, WINVER only
//! ├── Net/Net.vcxproj        "Net-Lib", DLL with MFC, mixed link inputs
//! ├── Broken/Broken.vcxproj  not well-formed
//! ├── Tools/GenA.vcxproj     exe linking GenLib.lib
//! ├── Tools/GenLib.vcxproj   static lib sharing the directory
//! └── Gone/Gone.vcxproj      listed, but missing on disk
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const CPP_PROJECT: &str = "8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942";

pub const SAMPLE_SLN_ENTRIES: &[(&str, &str)] = &[
    ("App", "App\\App.vcxproj"),
    ("Core", "Core\\Core.vcxproj"),
    ("Net", "Net\\Net.vcxproj"),
    ("Broken", "Broken\\Broken.vcxproj"),
    ("Gone", "Gone\\Gone.vcxproj"),
    ("GenA", "Tools\\GenA.vcxproj"),
    ("GenLib", "Tools\\GenLib.vcxproj"),
];

const CONFIGURATIONS: &str = r#"  <ItemGroup Label="ProjectConfigurations">
    <ProjectConfiguration Include="Debug|Win32">
      <Configuration>Debug</Configuration>
      <Platform>Win32</Platform>
    </ProjectConfiguration>
    <ProjectConfiguration Include="Release|Win32">
      <Configuration>Release</Configuration>
      <Platform>Win32</Platform>
    </ProjectConfiguration>
  </ItemGroup>"#;

pub const CORE: &str = r#"  <PropertyGroup Label="Configuration">
    <ConfigurationType>StaticLibrary</ConfigurationType>
    <CharacterSet>Unicode</CharacterSet>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <ClCompile>
      <PrecompiledHeader>Use</PrecompiledHeader>
      <PrecompiledHeaderFile>pch.h</PrecompiledHeaderFile>
      <PreprocessorDefinitions>WINVER=0x0A00;%(PreprocessorDefinitions)</PreprocessorDefinitions>
    </ClCompile>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="pch.cpp">
      <PrecompiledHeader>Create</PrecompiledHeader>
    </ClCompile>
    <ClCompile Include="core.cpp" />
    <ClCompile Include="util.c">
      <PrecompiledHeader>NotUsing</PrecompiledHeader>
    </ClCompile>
  </ItemGroup>
  <ItemGroup>
    <ClInclude Include="pch.h" />
    <ClInclude Include="core.h" />
  </ItemGroup>"#;

pub const NET: &str = r#"  <PropertyGroup Label="Globals">
    <ProjectName>Net-Lib</ProjectName>
  </PropertyGroup>
  <PropertyGroup Label="Configuration">
    <ConfigurationType>DynamicLibrary</ConfigurationType>
    <UseOfMfc>Dynamic</UseOfMfc>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Debug|Win32'">
    <UseDebugLibraries>true</UseDebugLibraries>
  </PropertyGroup>
  <PropertyGroup Condition="'$(Configuration)|$(Platform)'=='Release|Win32'">
    <UseDebugLibraries>false</UseDebugLibraries>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <Link>
      <AdditionalDependencies>core.lib;ws2_32.lib;C:\External\foo.lib;..\third_party\zlib\zlib.lib;%(AdditionalDependencies)</AdditionalDependencies>
    </Link>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="socket.cpp" />
  </ItemGroup>"#;

pub const APP: &str = r#"  <PropertyGroup Label="Configuration">
    <ConfigurationType>Application</ConfigurationType>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <Link>
      <AdditionalDependencies>NET-LIB.lib;user32.lib;%(AdditionalDependencies)</AdditionalDependencies>
    </Link>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="main.cpp" />
    <ClCompile Include="debug_tools.cpp">
      <ExcludedFromBuild Condition="'$(Configuration)|$(Platform)'=='Release|Win32'">true</ExcludedFromBuild>
    </ClCompile>
  </ItemGroup>
  <ItemGroup>
    <ProjectReference Include="..\Core\Core.vcxproj">
      <Project>{A0000000-0000-0000-0000-000000000002}</Project>
    </ProjectReference>
  </ItemGroup>"#;

pub const GEN_LIB: &str = r#"  <PropertyGroup Label="Configuration">
    <ConfigurationType>StaticLibrary</ConfigurationType>
  </PropertyGroup>
  <ItemGroup>
    <ClCompile Include="genlib.cpp" />
  </ItemGroup>"#;

pub const GEN_A: &str = r#"  <PropertyGroup Label="Configuration">
    <ConfigurationType>Application</ConfigurationType>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <Link>
      <AdditionalDependencies>GenLib.lib</AdditionalDependencies>
    </Link>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="gena.cpp" />
  </ItemGroup>"#;

/// Wrap a project body in a `.vcxproj` document with Debug and Release
/// configurations.
pub fn vcxproj(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <Project DefaultTargets=\"Build\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n\
         {CONFIGURATIONS}\n{body}\n</Project>\n"
    )
}

/// `.sln` text listing `(name, relative path)` entries.
pub fn sln(entries: &[(&str, &str)]) -> String {
    let mut out = String::from(
        "\u{feff}\nMicrosoft Visual Studio Solution File, Format Version 12.00\n# Visual Studio Version 17\n",
    );
    for (i, (name, path)) in entries.iter().enumerate() {
        out.push_str(&format!(
            "Project(\"{{{CPP_PROJECT}}}\") = \"{name}\", \"{path}\", \"{{A0000000-0000-0000-0000-{:012}}}\"\nEndProject\n",
            i + 1
        ));
    }
    out.push_str("Global\nEndGlobal\n");
    out
}

pub fn write(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Lay out the sample solution and return its `.sln` path.
pub fn sample_solution(tmp: &TempDir) -> PathBuf {
    let root = tmp.path();
    write(root, "App/App.vcxproj", &vcxproj(APP));
    write(root, "Core/Core.vcxproj", &vcxproj(CORE));
    write(root, "Net/Net.vcxproj", &vcxproj(NET));
    write(root, "Broken/Broken.vcxproj", "<Project><ItemGroup>");
    write(root, "Tools/GenA.vcxproj", &vcxproj(GEN_A));
    write(root, "Tools/GenLib.vcxproj", &vcxproj(GEN_LIB));
    write(root, "Sample.sln", &sln(SAMPLE_SLN_ENTRIES))
}

/// Two static libraries in one directory that link each other.
pub fn cyclic_solution(tmp: &TempDir) -> PathBuf {
    let root = tmp.path();
    let lib = |other: &str| {
        vcxproj(&format!(
            r#"  <PropertyGroup Label="Configuration">
    <ConfigurationType>StaticLibrary</ConfigurationType>
  </PropertyGroup>
  <ItemDefinitionGroup>
    <Lib>
      <AdditionalDependencies>{other}.lib</AdditionalDependencies>
    </Lib>
  </ItemDefinitionGroup>
  <ItemGroup>
    <ClCompile Include="{other}_user.cpp" />
  </ItemGroup>"#
        ))
    };
    write(root, "Loop/A.vcxproj", &lib("B"));
    write(root, "Loop/B.vcxproj", &lib("A"));
    write(root, "Loop.sln", &sln(&[("A", "Loop\\A.vcxproj"), ("B", "Loop\\B.vcxproj")]))
}
