//! Offline classification of captured status and settings payloads.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::settings::{declared_kind, resolve_kind, settings_from_json, SettingsList};
use crate::status::{allowed_actions, try_classify, StatusSnapshot};
use crate::ui::phase_line;

use super::table::print_table;

pub(crate) fn run(snapshot: Option<&Path>, settings: Option<&Path>) -> Result<()> {
    if let Some(path) = snapshot {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let snapshot = StatusSnapshot::from_json(&raw)
            .with_context(|| format!("failed to parse status snapshot {}", path.display()))?;
        for line in describe_snapshot(&snapshot) {
            println!("{line}");
        }
    }

    if let Some(path) = settings {
        if snapshot.is_some() {
            println!();
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let fields = settings_from_json(&raw)
            .with_context(|| format!("failed to parse settings {}", path.display()))?;

        print_table(&["NAME", "KIND", "STATE"], &settings_rows(&fields));
        let problems = fields
            .iter()
            .filter(|field| resolve_kind(field).is_err())
            .count();
        if problems > 0 {
            anyhow::bail!("{problems} setting(s) in {} are misconfigured", path.display());
        }
    }

    Ok(())
}

fn describe_snapshot(snapshot: &StatusSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    match try_classify(snapshot) {
        Ok(phase) => {
            lines.push(format!("phase:   {}", phase.label()));
            lines.push(format!("detail:  {}", phase_line(&phase)));
            lines.push(format!("actions: {}", allowed_actions(&phase)));
        }
        Err(err) => {
            lines.push("phase:   Unknown".to_string());
            lines.push(format!("note:    {err}"));
            lines.push("actions: -".to_string());
        }
    }
    lines.push(format!("facets:  {}", snapshot.entries().len()));
    lines
}

fn settings_rows(fields: &SettingsList) -> Vec<Vec<String>> {
    fields
        .iter()
        .map(|field| {
            let state = match resolve_kind(field) {
                Ok(_) => "ok".to_string(),
                Err(err) => format!("disabled: {err}"),
            };
            vec![field.name.clone(), declared_kind(field).to_string(), state]
        })
        .collect()
}
