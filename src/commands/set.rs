use anyhow::{Context, Result};

use crate::backend::ControlPlane;
use crate::errors::DeckError;
use crate::panel::ServicePanel;
use crate::settings::parse_input;
use crate::ui::session_value;

pub(crate) async fn run<C: ControlPlane>(
    plane: &C,
    service: &str,
    field: &str,
    raw: &str,
) -> Result<()> {
    let mut panel = ServicePanel::new(service);
    panel
        .refresh_settings(plane)
        .await
        .with_context(|| format!("failed to read settings of {service}"))?;

    let session = panel
        .form()
        .session(field)
        .ok_or_else(|| DeckError::UnknownField(field.to_string()))?;
    if let Some(problem) = session.configuration_error() {
        return Err(problem.into());
    }
    let value = parse_input(session.field(), session.kind(), raw)?;

    panel.form_mut().edit(field, Some(value))?;
    let saved = panel.save_field(plane, field).await?;

    let shown = panel
        .form()
        .session(field)
        .map(session_value)
        .unwrap_or_default();
    if saved {
        println!("Saved {field} = {shown} for {service}.");
    } else {
        println!("{field} of {service} is already {shown}.");
    }
    Ok(())
}
