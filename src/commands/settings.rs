use anyhow::{Context, Result};

use crate::backend::ControlPlane;
use crate::form::SettingsForm;
use crate::panel::ServicePanel;
use crate::settings::declared_kind;
use crate::ui::{paint, session_value};

use super::table::render_table;

pub(crate) async fn run<C: ControlPlane>(plane: &C, service: &str) -> Result<()> {
    let mut panel = ServicePanel::new(service);
    panel
        .refresh_settings(plane)
        .await
        .with_context(|| format!("failed to read settings of {service}"))?;

    for line in render(panel.form()) {
        println!("{line}");
    }
    Ok(())
}

fn render(form: &SettingsForm) -> Vec<String> {
    if form.is_empty() {
        return vec![format!("{} has no settings.", form.service())];
    }

    let rows = form
        .sessions()
        .iter()
        .map(|session| {
            let options = session
                .field()
                .initial_values
                .iter()
                .map(|option| option.id.as_str())
                .collect::<Vec<_>>();
            vec![
                session.name().to_string(),
                declared_kind(session.field()).to_string(),
                session_value(session),
                if options.is_empty() {
                    "-".to_string()
                } else {
                    options.join(", ")
                },
            ]
        })
        .collect::<Vec<_>>();

    let mut lines = render_table(&["NAME", "KIND", "VALUE", "OPTIONS"], &rows);
    let problems = form.configuration_errors();
    if !problems.is_empty() {
        lines.push(String::new());
        for problem in problems {
            lines.push(paint(&format!("disabled: {problem}"), "1;31"));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::form::SettingsForm;
    use crate::settings::{SelectOption, SettingField, SettingValue};

    #[test]
    fn shows_kind_value_and_options() {
        let mut level = SettingField::new("level", Some(SettingValue::text("info")));
        level.selectable = true;
        level.initial_values = vec![
            SelectOption::new("info", "Info"),
            SelectOption::new("debug", "Debug"),
        ];
        let form = SettingsForm::new(
            "api",
            vec![SettingField::new("workers", Some(SettingValue::text("4"))), level],
        );

        let joined = render(&form).join("\n");

        assert!(joined.contains("| workers | text   | 4     | -           |"));
        assert!(joined.contains("| level   | select | Info  | info, debug |"));
        assert!(!joined.contains("disabled:"));
    }

    #[test]
    fn misconfigured_field_is_reported_as_disabled() {
        let mut broken = SettingField::new("mode", None);
        broken.multi = true;
        let form = SettingsForm::new("api", vec![broken]);

        let joined = render(&form).join("\n");

        assert!(joined.contains("multi-select"));
        assert!(joined.contains("disabled:"));
        assert!(joined.contains("mode"));
    }

    #[test]
    fn empty_form_says_so() {
        let form = SettingsForm::new("api", Vec::new());
        assert_eq!(render(&form), vec!["api has no settings."]);
    }
}
