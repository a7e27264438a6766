use anyhow::{Context, Result};

use crate::backend::ControlPlane;
use crate::panel::ServicePanel;
use crate::status::ServiceAction;
use crate::ui::phase_line;

/// Reads the current phase first so a request the phase does not allow is refused locally
/// instead of being sent.
pub(crate) async fn run<C: ControlPlane>(
    plane: &C,
    service: &str,
    action: ServiceAction,
) -> Result<()> {
    let mut panel = ServicePanel::new(service);
    panel
        .refresh_status(plane)
        .await
        .with_context(|| format!("failed to read status of {service}"))?;

    let before = phase_line(panel.phase());
    panel
        .run_action(plane, action)
        .await
        .with_context(|| format!("cannot {action} {service}"))?;

    println!("Requested {action} of {service} (was {before}).");
    Ok(())
}
