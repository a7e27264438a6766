use anyhow::Result;
use tracing::warn;

use crate::backend::ControlPlane;
use crate::status::{allowed_actions, classify, LifecyclePhase};
use crate::ui::phase_line;

use super::table::print_table;

pub(crate) async fn run<C: ControlPlane>(plane: &C) -> Result<()> {
    let mut services = plane.services().await?;
    services.sort();

    if services.is_empty() {
        println!("No services reported by the supervisor.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(services.len());
    for service in services {
        let phase = match plane.status(&service).await {
            Ok(snapshot) => classify(&snapshot),
            Err(err) => {
                warn!(%service, "failed to read status: {err:#}");
                LifecyclePhase::Unknown
            }
        };
        rows.push(service_row(service, &phase));
    }

    print_table(&["NAME", "PHASE", "DETAIL", "ACTIONS"], &rows);
    Ok(())
}

fn service_row(service: String, phase: &LifecyclePhase) -> Vec<String> {
    let detail = match phase {
        LifecyclePhase::Starting | LifecyclePhase::Stopping => phase_line(phase),
        _ => phase.detail().unwrap_or("-").to_string(),
    };
    vec![
        service,
        phase.label().to_string(),
        detail,
        allowed_actions(phase).to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::service_row;
    use crate::status::LifecyclePhase;

    #[test]
    fn running_row_lists_stop_and_restart() {
        let row = service_row("api".into(), &LifecyclePhase::Running("2h".into()));
        assert_eq!(row, vec!["api", "Running", "2h", "stop, restart"]);
    }

    #[test]
    fn transitional_row_has_no_actions() {
        let row = service_row("api".into(), &LifecyclePhase::Stopping);
        assert_eq!(row, vec!["api", "Stopping", "Stopping…", "-"]);
    }
}
