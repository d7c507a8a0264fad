//! The `wqb-validate` command-line interface.
//!
//! This module is the entry point for all CLI commands. It resolves settings, loads the
//! catalogs and hands expressions to the library; presentation lives in [`output`].

pub mod args;
pub mod output;

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use clap::Parser;
use miette::{miette, IntoDiagnostic, WrapErr};

use crate::{
    catalog::FieldCatalog,
    cli::{
        args::{Command, GlobalArgs, ValidatorArgs},
        output::BatchEntry,
    },
    config::{ConfigError, Settings},
    diagnostics::SourceContext,
    discovery::{ExpressionBlock, ExpressionDiscoverer},
};

/// Exit code when every expression is valid.
pub const EXIT_VALID: i32 = 0;
/// Exit code when at least one expression is invalid.
pub const EXIT_INVALID: i32 = 1;
/// Exit code for configuration, catalog and I/O failures.
pub const EXIT_FAILURE: i32 = 2;

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// Parses the process arguments, runs the command and returns the exit code.
pub fn run() -> i32 {
    let args = ValidatorArgs::parse();
    match execute(args) {
        Ok(true) => EXIT_VALID,
        Ok(false) => EXIT_INVALID,
        Err(report) => {
            eprintln!("{report:?}");
            EXIT_FAILURE
        }
    }
}

/// Runs a parsed command. `Ok(false)` means some expression failed validation.
pub fn execute(args: ValidatorArgs) -> miette::Result<bool> {
    let settings = load_settings(&args.global)?;

    match args.command {
        Command::Check {
            expression,
            file,
            json,
        } => check(&settings, read_expression(expression, file.as_deref())?, json),
        Command::Batch { path, json } => batch(&settings, &path, json),
        Command::Keys => {
            let fields = FieldCatalog::from_path(settings.fields_path())?;
            output::print_list(fields.keys().map(|key| key.to_string()));
            Ok(true)
        }
        Command::Fields => list_fields(&settings),
    }
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn check(settings: &Settings, source: SourceContext, json: bool) -> miette::Result<bool> {
    let validator = settings.validator()?;
    let result = validator.validate_source(&source, Some(&settings.context()));

    if json {
        output::print_json(&result).into_diagnostic()?;
    } else {
        output::print_reports(&result, &source);
        output::print_status(&source.name, &result);
    }
    Ok(result.ok)
}

fn batch(settings: &Settings, path: &Path, json: bool) -> miette::Result<bool> {
    let blocks = ExpressionDiscoverer::collect_blocks(path)?;
    let validator = settings.validator()?;
    let sources: Vec<SourceContext> = blocks.iter().map(ExpressionBlock::source).collect();
    let results = validator.validate_sources(&sources, Some(&settings.context()));
    let invalid = results.iter().filter(|(_, result)| !result.ok).count();

    if json {
        let entries: Vec<BatchEntry<'_>> = results
            .iter()
            .map(|(index, result)| BatchEntry {
                name: &blocks[*index].name,
                result,
            })
            .collect();
        output::print_json(&entries).into_diagnostic()?;
    } else {
        for (index, result) in &results {
            output::print_reports(result, &sources[*index]);
            output::print_status(&blocks[*index].name, result);
        }
        output::print_summary(results.len(), invalid);
    }
    Ok(invalid == 0)
}

fn list_fields(settings: &Settings) -> miette::Result<bool> {
    let fields = FieldCatalog::from_path(settings.fields_path())?;
    let key = settings.context().key();
    let Some(set) = fields.get(&key) else {
        return Err(miette!(
            help = format!("available combinations: {}", fields.describe_available()),
            "unknown market configuration `{}`",
            key
        ));
    };
    output::print_list(set.entries().map(|entry| match &entry.data_type {
        Some(data_type) => format!("{}\t{}", entry.name, data_type),
        None => entry.name.clone(),
    }));
    Ok(true)
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Settings from the config file and environment, with command-line flags applied last.
fn load_settings(global: &GlobalArgs) -> Result<Settings, ConfigError> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let data_dir = global.data_dir.clone();

    let mut settings = Settings::load_with(global.config.as_deref(), &cwd, |name| {
        match (name, &data_dir) {
            ("WQB_DATA_DIR", Some(dir)) => Some(dir.display().to_string()),
            _ => std::env::var(name).ok(),
        }
    })?;

    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    if let Some(region) = &global.region {
        settings.region = region.clone();
    }
    if let Some(delay) = &global.delay {
        settings.delay = delay.clone();
    }
    if let Some(universe) = &global.universe {
        settings.universe = universe.clone();
    }
    Ok(settings)
}

fn read_expression(expression: Option<String>, file: Option<&Path>) -> miette::Result<SourceContext> {
    if let Some(text) = expression {
        return Ok(SourceContext::expression(text));
    }

    if let Some(path) = file {
        let text = fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        return Ok(SourceContext::new(path.display().to_string(), text));
    }

    let mut text = String::new();
    io::stdin()
        .read_to_string(&mut text)
        .into_diagnostic()
        .wrap_err("failed to read the expression from stdin")?;
    Ok(SourceContext::new("<stdin>", text))
}
