//! Windows target-version defines.
//!
//! Windows SDK headers read `WINVER` and `_WIN32_WINNT` to decide which APIs
//! to declare. Visual Studio's toolsets imply a default; CMake does not, so
//! a converted project gets the missing symbols defined explicitly.

use std::collections::BTreeMap;

use crate::report::{ConversionReport, Warning};
use crate::settings::{ConfigurationSettings, push_unique};

/// Windows 7.
pub const DEFAULT_WINDOWS_VERSION: &str = "0x0601";
/// Windows XP, for `*_xp` platform toolsets.
pub const XP_WINDOWS_VERSION: &str = "0x0501";

const WINVER: &str = "WINVER";
const WIN32_WINNT: &str = "_WIN32_WINNT";
const NTDDI_VERSION: &str = "NTDDI_VERSION";

/// Split `NAME=VALUE` (or bare `NAME`).
fn split_define(define: &str) -> (&str, &str) {
    match define.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (define.trim(), ""),
    }
}

/// Value of `symbol` in one configuration's defines.
fn value_of<'a>(settings: &'a ConfigurationSettings, symbol: &str) -> Option<&'a str> {
    settings
        .defines
        .iter()
        .map(|d| split_define(d))
        .find(|(name, _)| *name == symbol)
        .map(|(_, value)| value)
}

/// Defines to add so `WINVER` and `_WIN32_WINNT` are both set, keyed by
/// configuration. Every configuration of `settings` gets an entry.
///
/// - no configuration defines either symbol (nor `NTDDI_VERSION`): both get
///   the toolset's default version everywhere,
/// - otherwise each configuration is completed on its own: when one symbol
///   is defined, the other is defined with the same value.
///
/// Configurations defining both symbols with different values are reported
/// as one mismatch. A symbol whose value differs between configurations
/// (including being absent from some) is reported as diverging.
pub fn infer(
    project: &str,
    settings: &BTreeMap<String, ConfigurationSettings>,
    toolset: Option<&str>,
    report: &mut ConversionReport,
) -> BTreeMap<String, Vec<String>> {
    let defined = |symbol: &str| settings.values().any(|s| value_of(s, symbol).is_some());

    if !defined(WINVER) && !defined(WIN32_WINNT) {
        if defined(NTDDI_VERSION) {
            return settings.keys().map(|config| (config.clone(), Vec::new())).collect();
        }
        let xp = toolset.is_some_and(|t| t.trim().to_ascii_lowercase().ends_with("_xp"));
        let version = if xp { XP_WINDOWS_VERSION } else { DEFAULT_WINDOWS_VERSION };
        let defaults = vec![format!("{WINVER}={version}"), format!("{WIN32_WINNT}={version}")];
        return settings.keys().map(|config| (config.clone(), defaults.clone())).collect();
    }

    for symbol in [WINVER, WIN32_WINNT] {
        if !defined(symbol) {
            continue;
        }
        let first = settings.values().next().and_then(|s| value_of(s, symbol));
        if settings.values().any(|s| value_of(s, symbol) != first) {
            report.warn(Warning::WindowsVersionDiverges {
                project: project.to_string(),
                symbol: symbol.to_string(),
                values: settings
                    .iter()
                    .map(|(config, s)| format!("{config}={}", value_of(s, symbol).unwrap_or("(undefined)")))
                    .collect(),
            });
        }
    }

    let mut added = BTreeMap::new();
    let mut mismatched_winver = Vec::new();
    let mut mismatched_winnt = Vec::new();
    for (config, s) in settings {
        let defines = match (value_of(s, WINVER), value_of(s, WIN32_WINNT)) {
            (Some(value), None) => complement(WIN32_WINNT, value),
            (None, Some(value)) => complement(WINVER, value),
            (Some(winver), Some(winnt)) => {
                if winver != winnt {
                    push_unique(&mut mismatched_winver, winver);
                    push_unique(&mut mismatched_winnt, winnt);
                }
                Vec::new()
            }
            (None, None) => Vec::new(),
        };
        added.insert(config.clone(), defines);
    }

    if !mismatched_winver.is_empty() {
        report.warn(Warning::WindowsVersionMismatch {
            project: project.to_string(),
            winver: mismatched_winver.join(", "),
            win32_winnt: mismatched_winnt.join(", "),
        });
    }
    added
}

fn complement(symbol: &str, value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        vec![format!("{symbol}={value}")]
    }
}
