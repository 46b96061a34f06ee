//! vcxproj2cmake - convert Visual Studio C++ solutions into CMake projects

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vcxproj_cmake::ConverterBuilder;

mod cli;

use cli::Cli;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("vcxproj_cmake=debug,vcxproj2cmake=debug")
    } else {
        EnvFilter::new("vcxproj_cmake=info,vcxproj2cmake=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let mut builder = ConverterBuilder::new().cxx_standard(cli.cxx_standard);
    if cli.env {
        builder = builder.system_env();
    }
    for (name, value) in cli.defines {
        builder = builder.env_var(name, value);
    }
    if let Some(configuration) = cli.configuration {
        builder = builder.configuration(configuration);
    }
    if let Some(platform) = cli.platform {
        builder = builder.platform(platform);
    }

    let conversion = builder
        .build()
        .convert(&cli.input)
        .with_context(|| format!("failed to convert {}", cli.input.display()))?;

    if cli.dry_run {
        for doc in &conversion.documents {
            println!("# ==> {} <==", doc.path.display());
            print!("{}", doc.contents);
            println!();
        }
    } else {
        conversion.write().context("failed to write CMake files")?;
    }

    let warnings = conversion.report.warnings.len();
    if warnings > 0 {
        tracing::info!("finished with {warnings} warning(s)");
    }

    if cli.strict && conversion.report.cycles().next().is_some() {
        return Ok(2);
    }
    Ok(0)
}
