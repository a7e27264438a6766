use anyhow::{Context, Result};

use crate::backend::ControlPlane;
use crate::panel::ServicePanel;
use crate::status::LifecyclePhase;
use crate::ui::{label, paint, phase_code, phase_line};

pub(crate) async fn run<C: ControlPlane>(plane: &C, service: &str) -> Result<()> {
    let mut panel = ServicePanel::new(service);
    panel
        .refresh_status(plane)
        .await
        .with_context(|| format!("failed to read status of {service}"))?;

    for line in render(&panel) {
        println!("{line}");
    }
    Ok(())
}

fn render(panel: &ServicePanel) -> Vec<String> {
    let phase = panel.phase();
    let mut lines = vec![
        format!("{} {}", label("Service:    "), panel.service()),
        format!(
            "{} {}",
            label("Phase:      "),
            paint(&phase_line(phase), phase_code(phase))
        ),
    ];

    let actions = if phase.is_transitional() {
        format!("- (waiting for {})", phase.label().to_lowercase())
    } else {
        panel.available_actions().to_string()
    };
    lines.push(format!("{} {actions}", label("Actions:    ")));

    if *phase == LifecyclePhase::Unknown {
        lines.push(format!(
            "{} supervisor reported no Active facet",
            label("Note:       ")
        ));
    }

    let rows = panel.status_rows();
    if !rows.is_empty() {
        lines.push(String::new());
    }
    for row in rows {
        let value = match &row.phase {
            Some(phase) => phase_line(phase),
            None if row.terminal => paint(&row.value, "1;37;40"),
            None => row.value,
        };
        lines.push(format!("  {:<14} {value}", format!("{}:", row.key)));
    }
    lines
}
