use std::path::{Path, PathBuf};
use std::process;

use serde::Serialize;
use tagmod_document::WayDocument;
use tagmod_eval::{ApplyError, ApplyReport, RuleEngine};

use super::load_rules_or_exit;
use crate::config::Config;
use crate::template::substitute;
use crate::{report_error, OutputFormat};

/// Flags given to `tagmod apply`. Anything missing falls back to config.
pub(crate) struct ApplyOptions {
    pub rules: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub city: Option<String>,
    pub scenario: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, PartialEq)]
struct ResolvedPaths {
    rules: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

#[derive(Serialize)]
struct ApplySummary<'a> {
    rules_file: &'a Path,
    input: &'a Path,
    output: &'a Path,
    rules: usize,
    seed: Option<u64>,
    #[serde(flatten)]
    report: &'a ApplyReport,
}

pub(crate) fn cmd_apply(opts: ApplyOptions, config: &Config, output: OutputFormat, quiet: bool) {
    let paths = match resolve_paths(&opts, config) {
        Ok(p) => p,
        Err(msg) => fail(&msg, output, quiet),
    };
    tracing::info!(
        rules = %paths.rules.display(),
        input = %paths.input.display(),
        output = %paths.output.display(),
        "resolved paths"
    );

    // Rules are loaded before the document so a bad rule file costs nothing.
    let rules = load_rules_or_exit(&paths.rules, output, quiet);

    let mut doc = match WayDocument::read(&paths.input) {
        Ok(d) => d,
        Err(e) => fail(
            &format!("error reading document '{}': {}", paths.input.display(), e),
            output,
            quiet,
        ),
    };

    let seed = opts.seed.or(config.run.seed);
    let mut engine = match seed {
        Some(s) => RuleEngine::seeded(rules, s),
        None => RuleEngine::new(rules),
    };
    let rule_count = engine.rules().len();
    let report = match engine.apply(doc.records_mut()) {
        Ok(r) => r,
        Err(e) => {
            report_apply_error(&e, output, quiet);
            process::exit(1);
        }
    };

    if let Err(e) = doc.write_atomic(&paths.output) {
        fail(
            &format!("error writing '{}': {}", paths.output.display(), e),
            output,
            quiet,
        );
    }

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let summary = ApplySummary {
                rules_file: &paths.rules,
                input: &paths.input,
                output: &paths.output,
                rules: rule_count,
                seed,
                report: &report,
            };
            let json = serde_json::to_string_pretty(&summary)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!(
                "Applied {} rule(s) to {} way(s): {} modified, {} mutation(s), {} skipped by FREQ",
                rule_count,
                report.records,
                report.records_modified,
                report.mutations,
                report.skipped_by_frequency
            );
            if !report.diagnostics.is_empty() {
                println!("{} warning(s):", report.diagnostics.len());
                for d in &report.diagnostics {
                    println!("  way {} (line {}): {}", d.record_id, d.rule_line, d.message);
                }
            }
            println!("Wrote {}", paths.output.display());
        }
    }
}

fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

fn report_apply_error(e: &ApplyError, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "error": e.source.to_string(),
                "way": e.record_id,
                "line": e.rule_line,
                "rule": e.rule_text,
            });
            eprintln!("{}", value);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("evaluation error: {}", e);
            }
        }
    }
}

/// Flags win over config. Config templates see `CITY` and `SCENARIO` only
/// when the matching flag was given.
fn resolve_paths(opts: &ApplyOptions, config: &Config) -> Result<ResolvedPaths, String> {
    let mut vars: Vec<(&str, &str)> = Vec::new();
    if let Some(city) = &opts.city {
        vars.push(("CITY", city.as_str()));
    }
    if let Some(scenario) = &opts.scenario {
        vars.push(("SCENARIO", scenario.as_str()));
    }

    let resolve = |flag: &Option<PathBuf>, template: &str, what: &str, flag_name: &str| {
        match flag {
            Some(p) => Ok(p.clone()),
            None => substitute(template, &vars).map(PathBuf::from).map_err(|e| {
                format!(
                    "cannot resolve {} path: {} (pass --city/--scenario or --{})",
                    what, e, flag_name
                )
            }),
        }
    };

    Ok(ResolvedPaths {
        rules: opts.rules.clone().unwrap_or_else(|| config.rules_path()),
        input: resolve(&opts.input, config.input_template(), "input", "input")?,
        output: resolve(&opts.out, config.output_template(), "output", "out")?,
    })
}
