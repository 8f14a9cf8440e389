//! Human-readable output formatting

use crate::config::ReloadOutcome;
use crate::output::formatter::{CheckReport, Report};

pub fn format_human(report: &Report) -> String {
    match report {
        Report::Features(names) => {
            if names.is_empty() {
                return "No features found".to_string();
            }
            let mut output = String::from("Features\n--------\n");
            for name in names {
                output.push_str(&format!("  {}\n", name));
            }
            output
        }
        Report::Check(check) => format_check(check),
    }
}

fn format_check(check: &CheckReport) -> String {
    let mut output = String::from("Features\n--------\n");
    if check.features.is_empty() {
        output.push_str("  (none)\n");
    } else {
        output.push_str(&format!("{:<24} {:<12} {:<20}\n", "NAME", "SHAPE", "LOADED"));
        output.push_str(&"-".repeat(58));
        output.push('\n');
        for feature in &check.features {
            output.push_str(&format!(
                "{:<24} {:<12} {:<20}\n",
                truncate(&feature.name, 24),
                feature.shape.to_string(),
                feature.loaded_at.format("%Y-%m-%d %H:%M:%S").to_string()
            ));
        }
    }

    output.push_str("\nProviders\n---------\n");
    if check.providers.is_empty() {
        output.push_str("  (none)\n");
    }
    for provider in &check.providers {
        output.push_str(&format!("  {}\n", provider));
    }

    output.push_str("\nConfiguration\n-------------\n");
    match &check.reload {
        ReloadOutcome::MissingDirectory { dir } => {
            output.push_str(&format!("Directory not found: {}\n", dir.display()));
        }
        ReloadOutcome::NoFiles { dir } => {
            output.push_str(&format!("No configuration files in {}\n", dir.display()));
        }
        ReloadOutcome::Applied {
            evaluated,
            published,
        } => {
            output.push_str(&format!("Evaluated: {} file(s)\n", evaluated.len()));
            output.push_str(&format!("Published: {}\n", published.display()));
            if evaluated.len() > 1 {
                output.push_str(
                    "Note: only the last file's bindings are published; earlier files are not merged\n",
                );
            }
            if !check.bindings.is_empty() {
                output.push_str(&format!("Bindings:  {}\n", check.bindings.join(", ")));
            }
        }
    }

    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len.saturating_sub(3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_feature_list() {
        let output = format_human(&Report::Features(vec!["greet".to_string()]));
        assert!(output.contains("greet"));
        assert_eq!(format_human(&Report::Features(vec![])), "No features found");
    }

    #[test]
    fn test_format_check_warns_about_override() {
        let report = Report::Check(CheckReport {
            features: vec![],
            providers: vec!["db".to_string()],
            reload: ReloadOutcome::Applied {
                evaluated: vec![PathBuf::from("a.lua"), PathBuf::from("b.lua")],
                published: PathBuf::from("b.lua"),
            },
            bindings: vec!["port".to_string()],
        });
        let output = format_human(&report);
        assert!(output.contains("Published: b.lua"));
        assert!(output.contains("not merged"));
        assert!(output.contains("Bindings:  port"));
    }
}
