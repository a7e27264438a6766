//! Settings field descriptors as delivered by the supervisor, and the rules that decide how a
//! field is edited.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::DeckError;

pub type SettingsList = Vec<SettingField>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub label: String,
}

#[cfg(test)]
impl SelectOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A field value. Selections hold option ids only; labels live on the field's option list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    Selection(Vec<String>),
}

impl SettingValue {
    pub fn text(value: impl Into<String>) -> Self {
        SettingValue::Text(value.into())
    }

    pub fn selection<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SettingValue::Selection(ids.into_iter().map(Into::into).collect())
    }

    fn from_json(raw: serde_json::Value) -> Result<Self, String> {
        match raw {
            serde_json::Value::Bool(flag) => Ok(SettingValue::Bool(flag)),
            serde_json::Value::Number(number) => Ok(SettingValue::Number(number)),
            serde_json::Value::String(text) => Ok(SettingValue::Text(text)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(selection_id)
                .collect::<Result<Vec<_>, _>>()
                .map(SettingValue::Selection),
            // A single selected option object, as some select widgets report it.
            serde_json::Value::Object(_) => {
                selection_id(raw).map(|id| SettingValue::Selection(vec![id]))
            }
            serde_json::Value::Null => Err("null is not a setting value".to_string()),
        }
    }
}

fn selection_id(item: serde_json::Value) -> Result<String, String> {
    match item {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        serde_json::Value::Object(mut object) => match object.remove("id") {
            Some(serde_json::Value::String(id)) => Ok(id),
            Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
            _ => Err("selected option has no id".to_string()),
        },
        other => Err(format!("unsupported selection entry: {other}")),
    }
}

impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        SettingValue::from_json(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(flag) => write!(f, "{flag}"),
            SettingValue::Number(number) => write!(f, "{number}"),
            SettingValue::Text(text) => f.write_str(text),
            SettingValue::Selection(ids) => f.write_str(&ids.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Toggle,
    SingleSelect,
    MultiSelect,
}

impl FieldKind {
    pub fn needs_options(self) -> bool {
        matches!(self, FieldKind::SingleSelect | FieldKind::MultiSelect)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            FieldKind::Text => "text",
            FieldKind::Toggle => "toggle",
            FieldKind::SingleSelect => "select",
            FieldKind::MultiSelect => "multi-select",
        };
        write!(f, "{value}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingField {
    pub name: String,
    #[serde(default)]
    pub value: Option<SettingValue>,
    #[serde(default)]
    pub multi: bool,
    #[serde(default)]
    pub selectable: bool,
    #[serde(default)]
    pub activable: bool,
    #[serde(default)]
    pub initial_values: Vec<SelectOption>,
    /// Explicit kind tag. When the source provides one it wins over the three flags.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<FieldKind>,
}

impl SettingField {
    #[cfg(test)]
    pub fn new(name: impl Into<String>, value: Option<SettingValue>) -> Self {
        Self {
            name: name.into(),
            value,
            multi: false,
            selectable: false,
            activable: false,
            initial_values: Vec::new(),
            kind: None,
        }
    }

    pub fn option(&self, id: &str) -> Option<&SelectOption> {
        self.initial_values.iter().find(|option| option.id == id)
    }

    pub fn option_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.option(id)
            .map(|option| option.label.as_str())
            .unwrap_or(id)
    }
}

pub fn settings_from_json(raw: &str) -> Result<SettingsList, DeckError> {
    Ok(serde_json::from_str(raw)?)
}

/// Picks the control a field is rendered with, ignoring whether its option list is usable.
/// Precedence: toggle, then multi-select, then single select, then free text.
pub fn declared_kind(field: &SettingField) -> FieldKind {
    if let Some(kind) = field.kind {
        return kind;
    }
    if field.activable {
        FieldKind::Toggle
    } else if field.multi {
        FieldKind::MultiSelect
    } else if field.selectable {
        FieldKind::SingleSelect
    } else {
        FieldKind::Text
    }
}

pub fn resolve_kind(field: &SettingField) -> Result<FieldKind, DeckError> {
    let kind = declared_kind(field);
    if kind.needs_options() && field.initial_values.is_empty() {
        return Err(DeckError::Configuration {
            field: field.name.clone(),
            reason: format!("{kind} field declares no options"),
        });
    }
    Ok(kind)
}

/// Whether two values are the same for a field of `kind`. Multi-select values compare as sets,
/// and an absent multi-select value equals an empty selection. A single-select choice is the
/// same whether it arrives as a bare id or as a one-element selection.
pub fn values_match(
    kind: FieldKind,
    left: Option<&SettingValue>,
    right: Option<&SettingValue>,
) -> bool {
    match kind {
        FieldKind::MultiSelect => {
            if let (Some(left), Some(right)) = (selection_set(left), selection_set(right)) {
                return left == right;
            }
        }
        FieldKind::SingleSelect => {
            if let (Some(left), Some(right)) =
                (left.and_then(single_choice), right.and_then(single_choice))
            {
                return left == right;
            }
        }
        FieldKind::Text | FieldKind::Toggle => {}
    }
    left == right
}

fn selection_set(value: Option<&SettingValue>) -> Option<BTreeSet<&str>> {
    match value {
        None => Some(BTreeSet::new()),
        Some(SettingValue::Selection(ids)) => Some(ids.iter().map(String::as_str).collect()),
        Some(_) => None,
    }
}

/// Checks a value before it is sent to the settings sink.
pub fn validate(
    field: &SettingField,
    kind: FieldKind,
    value: Option<&SettingValue>,
) -> Result<(), DeckError> {
    let invalid = |reason: &str| DeckError::Validation {
        field: field.name.clone(),
        reason: reason.to_string(),
    };

    match (kind, value) {
        (FieldKind::Text, Some(SettingValue::Text(text))) if text.trim().is_empty() => {
            Err(invalid("a value is required"))
        }
        (FieldKind::Text, Some(SettingValue::Text(_) | SettingValue::Number(_))) => Ok(()),
        (FieldKind::Text, None) => Err(invalid("a value is required")),
        (FieldKind::Text, Some(_)) => Err(invalid("expected text")),

        (FieldKind::Toggle, Some(SettingValue::Bool(_))) => Ok(()),
        (FieldKind::Toggle, _) => Err(invalid("expected on or off")),

        (FieldKind::SingleSelect, Some(value)) => match single_choice(value) {
            Some(id) if field.option(id).is_some() => Ok(()),
            Some(id) => Err(invalid(&format!("{id} is not one of the options"))),
            None => Err(invalid("exactly one option must be selected")),
        },
        (FieldKind::SingleSelect, None) => Err(invalid("an option must be selected")),

        (FieldKind::MultiSelect, None) => Ok(()),
        (FieldKind::MultiSelect, Some(SettingValue::Selection(ids))) => {
            match ids.iter().find(|id| field.option(id).is_none()) {
                Some(id) => Err(invalid(&format!("{id} is not one of the options"))),
                None => Ok(()),
            }
        }
        (FieldKind::MultiSelect, Some(_)) => Err(invalid("expected a list of options")),
    }
}

fn single_choice(value: &SettingValue) -> Option<&str> {
    match value {
        SettingValue::Text(id) => Some(id.as_str()),
        SettingValue::Selection(ids) if ids.len() == 1 => Some(ids[0].as_str()),
        _ => None,
    }
}

/// Turns operator input into a value for a field of `kind`. Text input keeps numbers numeric
/// when the stored value already was one.
pub fn parse_input(
    field: &SettingField,
    kind: FieldKind,
    raw: &str,
) -> Result<SettingValue, DeckError> {
    match kind {
        FieldKind::Toggle => parse_flag(raw).map(SettingValue::Bool).ok_or_else(|| {
            DeckError::Validation {
                field: field.name.clone(),
                reason: format!("expected on or off, got {raw:?}"),
            }
        }),
        FieldKind::MultiSelect => Ok(SettingValue::Selection(
            raw.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string)
                .collect(),
        )),
        FieldKind::SingleSelect => Ok(SettingValue::Text(raw.trim().to_string())),
        FieldKind::Text => {
            if matches!(field.value, Some(SettingValue::Number(_))) {
                if let Ok(number) = raw.trim().parse::<serde_json::Number>() {
                    return Ok(SettingValue::Number(number));
                }
            }
            Ok(SettingValue::Text(raw.to_string()))
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        declared_kind, parse_input, resolve_kind, settings_from_json, validate, values_match,
        FieldKind, SelectOption, SettingField, SettingValue,
    };
    use crate::errors::DeckError;

    fn field(name: &str, value: Option<SettingValue>) -> SettingField {
        SettingField::new(name, value)
    }

    fn options() -> Vec<SelectOption> {
        vec![
            SelectOption::new("info", "Info"),
            SelectOption::new("debug", "Debug"),
            SelectOption::new("trace", "Trace"),
        ]
    }

    #[test]
    fn plain_field_resolves_to_text() {
        let field = field("workers", Some(SettingValue::text("4")));
        assert_eq!(resolve_kind(&field).expect("expected kind"), FieldKind::Text);
    }

    #[test]
    fn activable_wins_over_multi_and_selectable() {
        let mut field = field("enabled", Some(SettingValue::Bool(true)));
        field.activable = true;
        field.multi = true;
        field.selectable = true;
        field.initial_values = options();

        assert_eq!(resolve_kind(&field).expect("expected kind"), FieldKind::Toggle);
    }

    #[test]
    fn multi_wins_over_selectable() {
        let mut field = field("levels", None);
        field.multi = true;
        field.selectable = true;
        field.initial_values = options();

        assert_eq!(
            resolve_kind(&field).expect("expected kind"),
            FieldKind::MultiSelect
        );
    }

    #[test]
    fn select_without_options_is_a_configuration_error() {
        let mut multi = field("levels", None);
        multi.multi = true;
        let err = resolve_kind(&multi).expect_err("expected configuration error");
        assert!(
            matches!(&err, DeckError::Configuration { field, .. } if field == "levels"),
            "unexpected error: {err}"
        );

        let mut single = field("level", None);
        single.selectable = true;
        assert!(matches!(
            resolve_kind(&single),
            Err(DeckError::Configuration { .. })
        ));
        assert_eq!(declared_kind(&single), FieldKind::SingleSelect);
    }

    #[test]
    fn explicit_kind_tag_overrides_flags() {
        let mut field = field("mode", Some(SettingValue::text("fast")));
        field.activable = true;
        field.kind = Some(FieldKind::Text);
        assert_eq!(resolve_kind(&field).expect("expected kind"), FieldKind::Text);
    }

    #[test]
    fn multi_select_values_compare_as_sets() {
        let left = SettingValue::selection(["info", "debug"]);
        let right = SettingValue::selection(["debug", "info"]);
        assert!(values_match(FieldKind::MultiSelect, Some(&left), Some(&right)));
        assert!(values_match(
            FieldKind::MultiSelect,
            None,
            Some(&SettingValue::Selection(Vec::new()))
        ));
        assert!(!values_match(FieldKind::SingleSelect, Some(&left), Some(&right)));
        assert!(!values_match(
            FieldKind::MultiSelect,
            Some(&SettingValue::text("a")),
            Some(&SettingValue::text("b"))
        ));
    }

    #[test]
    fn single_select_id_matches_one_element_selection() {
        assert!(values_match(
            FieldKind::SingleSelect,
            Some(&SettingValue::text("info")),
            Some(&SettingValue::selection(["info"]))
        ));
        assert!(!values_match(
            FieldKind::SingleSelect,
            Some(&SettingValue::text("info")),
            Some(&SettingValue::selection(["debug"]))
        ));
    }

    #[test]
    fn text_validation_requires_non_blank_value() {
        let field = field("workers", Some(SettingValue::text("4")));
        assert!(validate(&field, FieldKind::Text, Some(&SettingValue::text("8"))).is_ok());
        assert!(matches!(
            validate(&field, FieldKind::Text, Some(&SettingValue::text("  "))),
            Err(DeckError::Validation { .. })
        ));
        assert!(validate(&field, FieldKind::Text, None).is_err());
    }

    #[test]
    fn select_validation_rejects_unknown_ids() {
        let mut field = field("level", Some(SettingValue::text("info")));
        field.selectable = true;
        field.initial_values = options();

        assert!(validate(
            &field,
            FieldKind::SingleSelect,
            Some(&SettingValue::text("debug"))
        )
        .is_ok());
        assert!(validate(
            &field,
            FieldKind::SingleSelect,
            Some(&SettingValue::selection(["trace"]))
        )
        .is_ok());
        assert!(validate(
            &field,
            FieldKind::SingleSelect,
            Some(&SettingValue::text("loud"))
        )
        .is_err());
        assert!(validate(
            &field,
            FieldKind::MultiSelect,
            Some(&SettingValue::selection(["info", "loud"]))
        )
        .is_err());
        assert!(validate(&field, FieldKind::MultiSelect, None).is_ok());
    }

    #[test]
    fn parse_input_follows_kind() {
        let mut numeric = field("workers", Some(SettingValue::Number(4.into())));
        assert_eq!(
            parse_input(&numeric, FieldKind::Text, "8").expect("expected number"),
            SettingValue::Number(8.into())
        );
        numeric.value = Some(SettingValue::text("4"));
        assert_eq!(
            parse_input(&numeric, FieldKind::Text, "8").expect("expected text"),
            SettingValue::text("8")
        );

        let toggle = field("enabled", Some(SettingValue::Bool(true)));
        assert_eq!(
            parse_input(&toggle, FieldKind::Toggle, "off").expect("expected flag"),
            SettingValue::Bool(false)
        );
        assert!(parse_input(&toggle, FieldKind::Toggle, "maybe").is_err());

        assert_eq!(
            parse_input(&toggle, FieldKind::MultiSelect, "info, debug,,").expect("expected ids"),
            SettingValue::selection(["info", "debug"])
        );
    }

    #[test]
    fn settings_decode_from_daemon_json() {
        let raw = r#"[
            {"name":"workers","value":4,"multi":false,"selectable":false,"activable":false},
            {"name":"enabled","value":true,"activable":true},
            {"name":"levels","value":[{"id":"info","label":"Info"}],"multi":true,
             "initialValues":[{"id":"info","label":"Info"},{"id":"debug","label":"Debug"}]},
            {"name":"description","value":null}
        ]"#;

        let fields = settings_from_json(raw).expect("expected settings to decode");
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].value, Some(SettingValue::Number(4.into())));
        assert_eq!(fields[1].value, Some(SettingValue::Bool(true)));
        assert_eq!(fields[2].value, Some(SettingValue::selection(["info"])));
        assert_eq!(fields[2].option_label("debug"), "Debug");
        assert_eq!(fields[3].value, None);
        assert_eq!(resolve_kind(&fields[2]).expect("expected kind"), FieldKind::MultiSelect);
    }
}
