//! CLI definitions using clap.

use std::path::PathBuf;

use clap::Parser;

/// Convert Visual Studio solutions and C++ projects into CMakeLists.txt files
#[derive(Parser)]
#[command(name = "vcxproj2cmake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Solution (.sln, .slnx) or project (.vcxproj) to convert
    pub input: PathBuf,

    /// Convert only this configuration (e.g. Release)
    #[arg(short, long)]
    pub configuration: Option<String>,

    /// Platform whose settings are read (e.g. x64)
    #[arg(short, long)]
    pub platform: Option<String>,

    /// MSBuild property used for $(NAME) substitution (repeatable)
    #[arg(short = 'D', long = "define", value_name = "NAME=VALUE", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Also substitute process environment variables
    #[arg(long)]
    pub env: bool,

    /// Print the generated documents instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with status 2 when a dependency cycle was found
    #[arg(long)]
    pub strict: bool,

    /// Value of CMAKE_CXX_STANDARD in the top-level document
    #[arg(long, default_value = "20")]
    pub cxx_standard: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_parsing() {
        assert_eq!(parse_define("BOOST_ROOT=C:/boost"), Ok(("BOOST_ROOT".into(), "C:/boost".into())));
        assert_eq!(parse_define("EMPTY="), Ok(("EMPTY".into(), String::new())));
        assert!(parse_define("novalue").is_err());
        assert!(parse_define("=x").is_err());
    }

    #[test]
    fn arguments() {
        let cli = Cli::try_parse_from([
            "vcxproj2cmake",
            "Game.sln",
            "-c",
            "Release",
            "-D",
            "A=1",
            "--define",
            "B=2",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.input, PathBuf::from("Game.sln"));
        assert_eq!(cli.configuration.as_deref(), Some("Release"));
        assert_eq!(cli.defines.len(), 2);
        assert!(cli.dry_run);
        assert_eq!(cli.cxx_standard, "20");
    }
}
