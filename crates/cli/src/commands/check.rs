use std::path::Path;

use super::load_rules_or_exit;
use crate::OutputFormat;

pub(crate) fn cmd_check(file: &Path, output: OutputFormat, quiet: bool) {
    let rules = load_rules_or_exit(file, output, quiet);

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "file": file.display().to_string(),
                "count": rules.len(),
                "rules": rules,
            });
            let json = serde_json::to_string_pretty(&value)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for rule in &rules {
                let kind = if rule.is_conditional() {
                    "conditional"
                } else {
                    "unconditional"
                };
                let freq = rule
                    .frequency
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "-".to_owned());
                println!("{:>4}  {:<13}  {:<7}  {}", rule.line_no, kind, freq, rule.kind);
            }
            println!("{}: {} rule(s) OK", file.display(), rules.len());
        }
    }
}
