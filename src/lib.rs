//! Convert Visual Studio `.sln` / `.vcxproj` native projects into
//! `CMakeLists.txt` build scripts.
//!
//! The pipeline is a single deterministic pass:
//!
//! 1. [`solution`] reads the project list,
//! 2. [`project`] loads each `.vcxproj` through the [`msbuild`] model and
//!    normalizes its per-configuration [`settings`],
//! 3. [`registry`] collects every project name before anything is resolved,
//! 4. [`dependency`] classifies link inputs and orders targets,
//! 5. [`emit`] renders the CMake documents.
//!
//! [`ConverterBuilder`] drives the whole thing.

pub mod condition;
pub mod convert;
pub mod dependency;
pub mod emit;
pub mod error;
pub mod msbuild;
pub mod pch;
pub mod project;
pub mod registry;
pub mod report;
pub mod settings;
pub mod solution;
pub mod winver;

pub use convert::{Conversion, Converter, ConverterBuilder, OutputDocument};
pub use dependency::{ExternalCategory, LibraryKind, LibraryReference, classify, order_by_dependencies};
pub use error::{Error, Result};
pub use project::{Project, TargetType};
pub use registry::{NameRegistry, RegistryBuilder, sanitize};
pub use report::{ConversionReport, Warning};
