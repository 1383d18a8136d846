pub(crate) mod apply;
pub(crate) mod check;

use std::path::Path;
use std::process;

use tagmod_core::{LoadError, RuleSet};

use crate::{report_error, OutputFormat};

/// Load a rule file, or report the failure and exit 1.
pub(crate) fn load_rules_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> RuleSet {
    match tagmod_core::load_rules(path) {
        Ok(rules) => rules,
        Err(LoadError::Parse(e)) => {
            match output {
                OutputFormat::Json => {
                    let err_json = serde_json::to_string_pretty(&e.to_json_value())
                        .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
                    eprintln!("{}", err_json);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("rule error in '{}': {}", path.display(), e);
                    }
                }
            }
            process::exit(1);
        }
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
