//! Enumerations for the section variant model.
//!
//! This module defines the closed set of section kinds and the small
//! configuration enums each kind carries: selection types, date
//! granularity, instruction severity and display mode.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The fixed set of section kinds a template can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    TextField,
    Checkbox,
    TextArea,
    Date,
    Select,
    Instruction,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::TextField,
        SectionKind::Checkbox,
        SectionKind::TextArea,
        SectionKind::Date,
        SectionKind::Select,
        SectionKind::Instruction,
    ];

    /// Short name used in listings and on the command line.
    pub fn short_name(self) -> &'static str {
        match self {
            SectionKind::TextField => "field",
            SectionKind::Checkbox => "checkbox",
            SectionKind::TextArea => "section",
            SectionKind::Date => "date",
            SectionKind::Select => "select",
            SectionKind::Instruction => "instruction",
        }
    }

    /// Whether sections of this kind must carry a title.
    pub fn requires_title(self) -> bool {
        !matches!(self, SectionKind::Instruction)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for SectionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "field" | "text_field" | "textfield" => Ok(SectionKind::TextField),
            "checkbox" => Ok(SectionKind::Checkbox),
            "section" | "text_area" | "textarea" => Ok(SectionKind::TextArea),
            "date" => Ok(SectionKind::Date),
            "select" => Ok(SectionKind::Select),
            "instruction" => Ok(SectionKind::Instruction),
            _ => Err(Error::UnknownVariant(s.to_string())),
        }
    }
}

/// How a select section collects its values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectType {
    /// A set of independent checkboxes, one per possible value.
    #[default]
    Checkbox,
    Radio,
    MonovalueSelect,
    MultivalueSelect,
}

/// Granularity of a date section.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateType {
    #[default]
    Date,
    Datetime,
}

/// Severity tag of an instruction section.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstructionType {
    Info,
    Warning,
    #[default]
    Note,
    Comment,
}

/// Whether unselected checkbox-set items appear in the rendered output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    AllValues,
    SelectedValuesOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_section_kind() {
        assert_eq!("field".parse::<SectionKind>().unwrap(), SectionKind::TextField);
        assert_eq!("Text-Area".parse::<SectionKind>().unwrap(), SectionKind::TextArea);
        assert_eq!("section".parse::<SectionKind>().unwrap(), SectionKind::TextArea);
        assert_eq!(" select ".parse::<SectionKind>().unwrap(), SectionKind::Select);
        for kind in SectionKind::ALL {
            assert_eq!(kind.short_name().parse::<SectionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_section_kind_is_rejected() {
        let err = "slider".parse::<SectionKind>().unwrap_err();
        assert!(matches!(err, Error::UnknownVariant(ref s) if s == "slider"));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SelectType::default(), SelectType::Checkbox);
        assert_eq!(DateType::default(), DateType::Date);
        assert_eq!(InstructionType::default(), InstructionType::Note);
        assert_eq!(DisplayMode::default(), DisplayMode::AllValues);
    }

    #[test]
    fn test_display_mode_serde_names() {
        let json = serde_json::to_string(&DisplayMode::SelectedValuesOnly).unwrap();
        assert_eq!(json, "\"selected_values_only\"");
        let mode: DisplayMode = serde_json::from_str("\"all_values\"").unwrap();
        assert_eq!(mode, DisplayMode::AllValues);
    }
}
