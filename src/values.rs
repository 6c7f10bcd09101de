//! Submitted values and the value extractor.
//!
//! A `ValueMap` holds whatever the issue form submitted, keyed by section id.
//! The extractor pulls one section's entry out of it and coerces it to the
//! shape that section's variant renders: a single text, a boolean, a list or a
//! positional run of booleans. Absence is always legal and never an error.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::SelectType;
use crate::template::{Section, SectionVariant};

/// Raw value(s) submitted for one section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SubmittedValue {
    Text(String),
    List(Vec<String>),
    /// Checkbox-set form fields keyed by their index.
    Flags(BTreeMap<String, String>),
}

/// Everything submitted for one section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionInput {
    #[serde(default)]
    pub text: Option<SubmittedValue>,
    /// Placeholder used when the submitted text is blank or missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_value: Option<String>,
}

/// Submitted values for a whole template, keyed by section id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValueMap {
    sections: BTreeMap<u64, SectionInput>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get(&self, section_id: u64) -> Option<&SectionInput> {
        self.sections.get(&section_id)
    }

    pub fn insert(&mut self, section_id: u64, input: SectionInput) {
        self.sections.insert(section_id, input);
    }

    pub fn remove(&mut self, section_id: u64) -> Option<SectionInput> {
        self.sections.remove(&section_id)
    }

    /// Replace a section's submission with a single text.
    pub fn set_text(&mut self, section_id: u64, text: impl Into<String>) {
        self.sections.entry(section_id).or_default().text =
            Some(SubmittedValue::Text(text.into()));
    }

    /// Replace a section's submission with a list.
    pub fn set_list(&mut self, section_id: u64, values: Vec<String>) {
        self.sections.entry(section_id).or_default().text = Some(SubmittedValue::List(values));
    }

    /// Append to a section's submission, turning a single text into a list.
    pub fn push(&mut self, section_id: u64, value: impl Into<String>) {
        let entry = self.sections.entry(section_id).or_default();
        let value = value.into();
        entry.text = Some(match entry.text.take() {
            None => SubmittedValue::Text(value),
            Some(SubmittedValue::Text(first)) => SubmittedValue::List(vec![first, value]),
            Some(SubmittedValue::List(mut list)) => {
                list.push(value);
                SubmittedValue::List(list)
            }
            Some(SubmittedValue::Flags(flags)) => {
                let mut list: Vec<String> = positional(&flags).into_iter().map(String::from).collect();
                list.push(value);
                SubmittedValue::List(list)
            }
        });
    }

    pub fn set_empty_value(&mut self, section_id: u64, placeholder: impl Into<String>) {
        self.sections.entry(section_id).or_default().empty_value = Some(placeholder.into());
    }

    /// Apply a command-line assignment of the form `SECTION_ID=VALUE`.
    /// Repeating an id builds a list.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<()> {
        let (id, value) = parse_assignment(assignment)?;
        self.push(id, value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Split `SECTION_ID=VALUE`; the value may be empty.
pub fn parse_assignment(s: &str) -> Result<(u64, String)> {
    let (id, value) = s.split_once('=').ok_or_else(|| Error::InvalidValue(s.to_string()))?;
    let id = id.trim().parse::<u64>().map_err(|_| Error::InvalidValue(s.to_string()))?;
    Ok((id, value.to_string()))
}

/// A section's submission coerced to the shape its variant renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<'a> {
    /// `None` means nothing usable was submitted and no placeholder was given.
    Text(Option<Cow<'a, str>>),
    Flag(bool),
    List(Vec<&'a str>),
    /// Positional booleans for a checkbox set.
    Flags(Vec<bool>),
    Nothing,
}

/// Pull `section`'s value(s) out of `values`.
pub fn extract<'a>(section: &Section, values: &'a ValueMap) -> Extracted<'a> {
    let input = values.get(section.id);
    match section.variant {
        SectionVariant::TextField | SectionVariant::TextArea | SectionVariant::Date { .. } => {
            Extracted::Text(text_value(input))
        }
        SectionVariant::Checkbox => {
            Extracted::Flag(flag_values(input).first().is_some_and(|raw| boolean_value(raw)))
        }
        SectionVariant::Select { select_type } => match select_type {
            SelectType::Radio | SelectType::MonovalueSelect => Extracted::Text(text_value(input)),
            SelectType::MultivalueSelect => Extracted::List(list_values(input)),
            SelectType::Checkbox => Extracted::Flags(
                flag_values(input).into_iter().map(boolean_value).collect(),
            ),
        },
        SectionVariant::Instruction { .. } => Extracted::Nothing,
    }
}

/// The submitted text if it is not blank, else the placeholder, else `None`.
pub fn text_value(input: Option<&SectionInput>) -> Option<Cow<'_, str>> {
    let input = input?;
    let submitted = match &input.text {
        Some(SubmittedValue::Text(s)) if !s.trim().is_empty() => Some(Cow::Borrowed(s.as_str())),
        Some(SubmittedValue::List(list)) if list.iter().any(|s| !s.trim().is_empty()) => {
            Some(Cow::Owned(list.join(", ")))
        }
        _ => None,
    };
    submitted.or_else(|| input.empty_value.as_deref().map(Cow::Borrowed))
}

/// A boolean-string is true only when it is exactly `"1"`.
pub fn boolean_value(raw: &str) -> bool {
    raw == "1"
}

/// Submitted values in submission order.
pub fn list_values(input: Option<&SectionInput>) -> Vec<&str> {
    match input.and_then(|i| i.text.as_ref()) {
        None => Vec::new(),
        Some(SubmittedValue::Text(s)) if s.is_empty() => Vec::new(),
        Some(SubmittedValue::Text(s)) => vec![s.as_str()],
        Some(SubmittedValue::List(list)) => list.iter().map(String::as_str).collect(),
        Some(SubmittedValue::Flags(flags)) => positional(flags),
    }
}

/// Submitted boolean-strings by position.
pub fn flag_values(input: Option<&SectionInput>) -> Vec<&str> {
    match input.and_then(|i| i.text.as_ref()) {
        None => Vec::new(),
        Some(SubmittedValue::Text(s)) => vec![s.as_str()],
        Some(SubmittedValue::List(list)) => list.iter().map(String::as_str).collect(),
        Some(SubmittedValue::Flags(flags)) => positional(flags),
    }
}

/// Map values ordered by numeric key; non-numeric keys follow in key order.
fn positional(flags: &BTreeMap<String, String>) -> Vec<&str> {
    let mut entries: Vec<(&String, &String)> = flags.iter().collect();
    entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    entries.into_iter().map(|(_, v)| v.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;

    fn section(id: u64, variant: SectionVariant) -> Section {
        Section {
            id,
            group_id: 1,
            title: "Title".to_string(),
            text: None,
            position: 0,
            display_mode: DisplayMode::AllValues,
            variant,
        }
    }

    #[test]
    fn test_missing_key_is_absent() {
        let values = ValueMap::new();
        let s = section(1, SectionVariant::TextField);
        assert_eq!(extract(&s, &values), Extracted::Text(None));
        let s = section(1, SectionVariant::Checkbox);
        assert_eq!(extract(&s, &values), Extracted::Flag(false));
        let s = section(1, SectionVariant::Select { select_type: SelectType::Checkbox });
        assert_eq!(extract(&s, &values), Extracted::Flags(vec![]));
    }

    #[test]
    fn test_blank_text_uses_placeholder() {
        let mut values = ValueMap::new();
        values.set_text(1, "   ");
        assert_eq!(text_value(values.get(1)), None);
        values.set_empty_value(1, "n/a");
        assert_eq!(text_value(values.get(1)).as_deref(), Some("n/a"));
        values.set_text(1, "Filled");
        assert_eq!(text_value(values.get(1)).as_deref(), Some("Filled"));
    }

    #[test]
    fn test_boolean_strings() {
        assert!(boolean_value("1"));
        assert!(!boolean_value("0"));
        assert!(!boolean_value("true"));
        assert!(!boolean_value(""));
    }

    #[test]
    fn test_flags_map_is_read_positionally() {
        let json = r#"{"4": {"text": {"0": "1", "2": "1", "10": "0", "1": "0"}}}"#;
        let values = ValueMap::from_json(json).unwrap();
        assert_eq!(flag_values(values.get(4)), vec!["1", "0", "1", "0"]);
    }

    #[test]
    fn test_value_file_shapes() {
        let json = r#"{
            "1": {"text": "High"},
            "2": {"text": ["X", "Y"]},
            "3": {"text": "", "empty_value": "none"}
        }"#;
        let values = ValueMap::from_json(json).unwrap();
        let multi = section(2, SectionVariant::Select { select_type: SelectType::MultivalueSelect });
        assert_eq!(extract(&multi, &values), Extracted::List(vec!["X", "Y"]));
        let field = section(3, SectionVariant::TextField);
        assert_eq!(extract(&field, &values), Extracted::Text(Some(Cow::Borrowed("none"))));
        let radio = section(1, SectionVariant::Select { select_type: SelectType::Radio });
        assert_eq!(extract(&radio, &values), Extracted::Text(Some(Cow::Borrowed("High"))));
    }

    #[test]
    fn test_assignments_build_lists() {
        let mut values = ValueMap::new();
        values.apply_assignment("5=X").unwrap();
        values.apply_assignment("5=Y").unwrap();
        values.apply_assignment("6=").unwrap();
        assert_eq!(list_values(values.get(5)), vec!["X", "Y"]);
        assert_eq!(values.get(6).unwrap().text, Some(SubmittedValue::Text(String::new())));
        assert!(matches!(values.apply_assignment("nope"), Err(Error::InvalidValue(_))));
        assert!(matches!(values.apply_assignment("x=1"), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_instruction_extracts_nothing() {
        let mut values = ValueMap::new();
        values.set_text(9, "ignored");
        let s = section(9, SectionVariant::Instruction { instruction_type: InstructionType::Info });
        assert_eq!(extract(&s, &values), Extracted::Nothing);
    }
}
