//! Issue template data structures.
//!
//! An `IssueTemplate` owns an ordered list of `SectionGroup`s, and each group
//! owns an ordered list of `Section`s. Groups and sections are kept sorted by
//! their dense `position`; see `crate::ordering` for the routines that keep
//! it that way.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::*;

/// A reusable definition that produces a pre-filled issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTemplate {
    pub id: u64,
    pub template_title: String,
    pub tracker: String,
    pub subject: Option<String>,
    /// Shown to people choosing a template, never rendered into the issue.
    pub template_description: Option<String>,
    /// Static issue description, used when the template has no sections.
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub template_enabled: bool,
    #[serde(default)]
    pub show_on_overview: bool,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub section_groups: Vec<SectionGroup>,
    pub created_at_utc: i64,
    pub updated_at_utc: i64,
}

fn default_enabled() -> bool {
    true
}

/// An ordered container of sections. Invisible in rendered output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionGroup {
    pub id: u64,
    pub template_id: u64,
    pub title: String,
    pub position: u32,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// One typed field definition within a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub group_id: u64,
    pub title: String,
    /// Variant-dependent payload: `;`-separated possible values for selects,
    /// the instruction text for instructions, a placeholder otherwise.
    pub text: Option<String>,
    pub position: u32,
    #[serde(default)]
    pub display_mode: DisplayMode,
    pub variant: SectionVariant,
}

/// Per-kind configuration. Every section is exactly one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionVariant {
    #[serde(alias = "field")]
    TextField,
    Checkbox,
    #[serde(alias = "section")]
    TextArea,
    Date {
        #[serde(default)]
        select_type: DateType,
    },
    Select {
        #[serde(default)]
        select_type: SelectType,
    },
    Instruction {
        #[serde(default)]
        instruction_type: InstructionType,
    },
}

impl SectionVariant {
    /// The variant for `kind` with its default configuration.
    pub fn with_defaults(kind: SectionKind) -> Self {
        match kind {
            SectionKind::TextField => SectionVariant::TextField,
            SectionKind::Checkbox => SectionVariant::Checkbox,
            SectionKind::TextArea => SectionVariant::TextArea,
            SectionKind::Date => SectionVariant::Date { select_type: DateType::default() },
            SectionKind::Select => SectionVariant::Select { select_type: SelectType::default() },
            SectionKind::Instruction => SectionVariant::Instruction {
                instruction_type: InstructionType::default(),
            },
        }
    }

    pub fn kind(&self) -> SectionKind {
        match self {
            SectionVariant::TextField => SectionKind::TextField,
            SectionVariant::Checkbox => SectionKind::Checkbox,
            SectionVariant::TextArea => SectionKind::TextArea,
            SectionVariant::Date { .. } => SectionKind::Date,
            SectionVariant::Select { .. } => SectionKind::Select,
            SectionVariant::Instruction { .. } => SectionKind::Instruction,
        }
    }
}

impl Section {
    /// Check the constraints a section must satisfy before it is stored.
    pub fn validate(&self) -> Result<()> {
        let kind = self.variant.kind();
        if kind.requires_title() && self.title.trim().is_empty() {
            return Err(Error::MissingTitle { kind: kind.short_name() });
        }
        Ok(())
    }

    /// Configured possible values of a select section, in order.
    /// Trailing empty values (`"A;B;"`) are dropped; inner ones are kept.
    pub fn possible_values(&self) -> Vec<&str> {
        let mut values: Vec<&str> = match self.text.as_deref() {
            Some(text) => text.split(';').collect(),
            None => Vec::new(),
        };
        while values.last().is_some_and(|v| v.is_empty()) {
            values.pop();
        }
        values
    }
}

impl SectionGroup {
    pub fn section(&self, id: u64) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

impl IssueTemplate {
    /// Tracker-prefixed title, e.g. `[Bug] Crash report`.
    /// Only the tracker is shown when the title just repeats it.
    pub fn title_with_tracker(&self) -> String {
        if self.template_title == self.tracker {
            format!("[{}]", self.tracker)
        } else {
            format!("[{}] {}", self.tracker, self.template_title)
        }
    }

    pub fn has_sections(&self) -> bool {
        self.section_groups.iter().any(|g| !g.sections.is_empty())
    }

    /// All sections in document order.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.section_groups.iter().flat_map(|g| g.sections.iter())
    }

    pub fn group(&self, id: u64) -> Option<&SectionGroup> {
        self.section_groups.iter().find(|g| g.id == id)
    }

    pub fn group_mut(&mut self, id: u64) -> Option<&mut SectionGroup> {
        self.section_groups.iter_mut().find(|g| g.id == id)
    }

    /// Locate a section and the group that owns it.
    pub fn find_section(&self, id: u64) -> Option<(&SectionGroup, &Section)> {
        self.section_groups
            .iter()
            .find_map(|g| g.section(id).map(|s| (g, s)))
    }

    /// Whether the template appears in the overview listing.
    pub fn on_overview(&self) -> bool {
        self.template_enabled && self.show_on_overview
    }
}
