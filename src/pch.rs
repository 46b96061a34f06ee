//! Precompiled-header partitioning.
//!
//! MSBuild marks one source as the PCH creator and lets each file opt in or
//! out. CMake instead attaches a header to the whole target and skips
//! individual files, so the per-file modes are folded into three groups.

use std::collections::BTreeMap;

use crate::project::{FileEntry, FileKind};
use crate::settings::{ConfigurationSettings, PchMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PchPartition {
    /// Header to precompile, as written in the project.
    pub header: String,
    /// Source that creates the PCH in MSBuild, if any.
    pub creator: Option<String>,
    /// Sources that must not use the PCH.
    pub opted_out: Vec<String>,
    /// Sources compiled with the PCH.
    pub consumers: Vec<String>,
}

impl PchPartition {
    /// Sources to mark `SKIP_PRECOMPILE_HEADERS`.
    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.creator
            .iter()
            .chain(&self.opted_out)
            .map(String::as_str)
    }
}

/// Project-level mode and header across configurations.
///
/// `Use` in any configuration wins, otherwise the first explicit mode.
pub fn project_mode(settings: &BTreeMap<String, ConfigurationSettings>) -> (PchMode, Option<String>) {
    let mode = if settings.values().any(|s| s.pch_mode == PchMode::Use) {
        PchMode::Use
    } else {
        settings
            .values()
            .map(|s| s.pch_mode)
            .find(|m| *m != PchMode::None)
            .unwrap_or_default()
    };
    let header = settings.values().find_map(|s| s.pch_header.clone());
    (mode, header)
}

/// Split the buildable sources into creator, opted-out and consumers.
///
/// With a project-level `Use` (or no project-level mode but a creator),
/// every source consumes the PCH unless it creates it or opts out. Otherwise
/// only sources that explicitly override to `Use` consume it. Returns `None`
/// when no source would consume a PCH or no header is known.
pub fn partition(mode: PchMode, header: Option<&str>, files: &[FileEntry]) -> Option<PchPartition> {
    let sources: Vec<&FileEntry> = files
        .iter()
        .filter(|f| f.kind == FileKind::Source && !f.excluded_from_build)
        .collect();

    let creator = sources
        .iter()
        .find(|f| f.overrides.pch_mode == PchMode::Create)
        .copied();
    let use_by_default = mode == PchMode::Use || (mode == PchMode::None && creator.is_some());

    let mut consumers = Vec::new();
    let mut opted_out = Vec::new();
    for file in &sources {
        if creator.is_some_and(|c| c.path == file.path) {
            continue;
        }
        let consumes = match file.overrides.pch_mode {
            PchMode::Use => true,
            PchMode::Create | PchMode::NotUsing => false,
            PchMode::None => use_by_default,
        };
        if consumes {
            consumers.push(file.path.clone());
        } else {
            opted_out.push(file.path.clone());
        }
    }

    if consumers.is_empty() {
        return None;
    }

    let header = header
        .map(str::to_string)
        .or_else(|| creator.and_then(|c| c.overrides.pch_header.clone()))
        .or_else(|| {
            sources
                .iter()
                .find_map(|f| f.overrides.pch_header.clone())
        });
    let Some(header) = header else {
        tracing::debug!("precompiled header requested but no header file named");
        return None;
    };

    Some(PchPartition {
        header,
        creator: creator.map(|c| c.path.clone()),
        opted_out,
        consumers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::FileOverrides;

    fn source(path: &str, mode: PchMode) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            kind: FileKind::Source,
            excluded_from_build: false,
            overrides: FileOverrides {
                pch_mode: mode,
                ..Default::default()
            },
        }
    }

    #[test]
    fn creator_and_opt_out_are_skipped() {
        let files = [
            source("a.cpp", PchMode::Create),
            source("b.cpp", PchMode::NotUsing),
            source("c.cpp", PchMode::None),
        ];
        let p = partition(PchMode::Use, Some("stdafx.h"), &files).unwrap();
        assert_eq!(p.creator.as_deref(), Some("a.cpp"));
        assert_eq!(p.opted_out, ["b.cpp"]);
        assert_eq!(p.consumers, ["c.cpp"]);
        assert_eq!(p.skipped().collect::<Vec<_>>(), ["a.cpp", "b.cpp"]);
    }

    #[test]
    fn creator_implies_use_without_project_mode() {
        let files = [
            source("a.cpp", PchMode::Create),
            source("b.cpp", PchMode::NotUsing),
            source("c.cpp", PchMode::None),
        ];
        let p = partition(PchMode::None, Some("pch.h"), &files).unwrap();
        assert_eq!(p.consumers, ["c.cpp"]);
    }

    #[test]
    fn explicit_use_overrides_only_when_project_does_not_use() {
        let files = [
            source("a.cpp", PchMode::None),
            source("b.cpp", PchMode::Use),
        ];
        let p = partition(PchMode::NotUsing, Some("pch.h"), &files).unwrap();
        assert_eq!(p.consumers, ["b.cpp"]);
        assert_eq!(p.opted_out, ["a.cpp"]);
        assert_eq!(p.creator, None);
    }

    #[test]
    fn no_consumers_means_no_pch() {
        let files = [source("a.cpp", PchMode::None)];
        assert_eq!(partition(PchMode::None, Some("pch.h"), &files), None);
        assert_eq!(partition(PchMode::NotUsing, Some("pch.h"), &files), None);
    }

    #[test]
    fn excluded_and_header_files_are_ignored() {
        let mut excluded = source("old.cpp", PchMode::None);
        excluded.excluded_from_build = true;
        let header = FileEntry {
            path: "stdafx.h".into(),
            kind: FileKind::Header,
            excluded_from_build: false,
            overrides: FileOverrides::default(),
        };
        let files = [excluded, header, source("main.cpp", PchMode::None)];
        let p = partition(PchMode::Use, Some("stdafx.h"), &files).unwrap();
        assert_eq!(p.consumers, ["main.cpp"]);
        assert!(p.opted_out.is_empty());
    }

    #[test]
    fn header_falls_back_to_creator_override() {
        let mut creator = source("pch.cpp", PchMode::Create);
        creator.overrides.pch_header = Some("pch.h".into());
        let files = [creator, source("x.cpp", PchMode::None)];
        let p = partition(PchMode::Use, None, &files).unwrap();
        assert_eq!(p.header, "pch.h");
    }

    #[test]
    fn project_mode_prefers_use() {
        let mut settings = BTreeMap::new();
        settings.insert(
            "Debug".to_string(),
            ConfigurationSettings {
                pch_mode: PchMode::NotUsing,
                ..Default::default()
            },
        );
        settings.insert(
            "Release".to_string(),
            ConfigurationSettings {
                pch_mode: PchMode::Use,
                pch_header: Some("stdafx.h".into()),
                ..Default::default()
            },
        );
        assert_eq!(project_mode(&settings), (PchMode::Use, Some("stdafx.h".to_string())));
    }
}
