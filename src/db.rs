//! Template store and display helpers.
//!
//! This module provides the `Database` struct holding every issue template,
//! its JSON persistence with atomic writes, the advisory lock that serialises
//! mutations across processes, the structural edit operations (which go
//! through `crate::ordering` to keep positions dense), and small formatting
//! helpers used by the command layer.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::*;
use crate::ordering;
use crate::template::{IssueTemplate, Section, SectionGroup, SectionVariant};

/// How long a command waits for another process to release the store.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_RETRY_DELAY: Duration = Duration::from_millis(25);

/// In-memory store of issue templates.
///
/// Ids are never reused: the counters only grow, so values saved against a
/// deleted section can't attach to a new one.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub next_template_id: u64,
    #[serde(default)]
    pub next_group_id: u64,
    #[serde(default)]
    pub next_section_id: u64,
    #[serde(default)]
    pub templates: Vec<IssueTemplate>,
}

/// Fields for a new template.
#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub template_title: String,
    pub tracker: String,
    pub subject: Option<String>,
    pub template_description: Option<String>,
    pub description: Option<String>,
    pub show_on_overview: bool,
    pub projects: Vec<String>,
}

/// Changes to a template. `None` leaves a field as it is; an empty string
/// clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateEdit {
    pub template_title: Option<String>,
    pub tracker: Option<String>,
    pub subject: Option<String>,
    pub template_description: Option<String>,
    pub description: Option<String>,
    pub show_on_overview: Option<bool>,
    pub projects: Option<Vec<String>>,
}

impl TemplateEdit {
    pub fn is_empty(&self) -> bool {
        *self == TemplateEdit::default()
    }
}

/// Changes to a section. The kind can't change: naming a different `kind`,
/// or a type option that belongs to another kind, is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionEdit {
    pub kind: Option<SectionKind>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub display_mode: Option<DisplayMode>,
    pub select_type: Option<SelectType>,
    pub date_type: Option<DateType>,
    pub instruction_type: Option<InstructionType>,
}

impl SectionEdit {
    pub fn is_empty(&self) -> bool {
        *self == SectionEdit::default()
    }

    fn apply(&self, section: &mut Section) -> Result<()> {
        let from = section.variant.kind();
        let kind_change = |to: SectionKind| Error::KindChange {
            from: from.short_name(),
            to: to.short_name(),
        };
        if let Some(kind) = self.kind {
            if kind != from {
                return Err(kind_change(kind));
            }
        }
        if let Some(t) = self.select_type {
            match &mut section.variant {
                SectionVariant::Select { select_type } => *select_type = t,
                _ => return Err(kind_change(SectionKind::Select)),
            }
        }
        if let Some(t) = self.date_type {
            match &mut section.variant {
                SectionVariant::Date { select_type } => *select_type = t,
                _ => return Err(kind_change(SectionKind::Date)),
            }
        }
        if let Some(t) = self.instruction_type {
            match &mut section.variant {
                SectionVariant::Instruction { instruction_type } => *instruction_type = t,
                _ => return Err(kind_change(SectionKind::Instruction)),
            }
        }
        if let Some(title) = &self.title {
            section.title = title.trim().to_string();
        }
        if let Some(text) = &self.text {
            section.text = non_empty(text);
        }
        if let Some(mode) = self.display_mode {
            section.display_mode = mode;
        }
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Fields for a new section. Type options that do not apply to `kind` are ignored.
#[derive(Debug, Clone)]
pub struct NewSection {
    pub kind: SectionKind,
    pub title: String,
    pub text: Option<String>,
    pub position: Option<u32>,
    pub display_mode: DisplayMode,
    pub select_type: Option<SelectType>,
    pub date_type: Option<DateType>,
    pub instruction_type: Option<InstructionType>,
}

impl NewSection {
    pub fn new(kind: SectionKind, title: &str) -> Self {
        Self {
            kind,
            title: title.to_string(),
            text: None,
            position: None,
            display_mode: DisplayMode::default(),
            select_type: None,
            date_type: None,
            instruction_type: None,
        }
    }

    fn variant(&self) -> SectionVariant {
        let mut variant = SectionVariant::with_defaults(self.kind);
        match &mut variant {
            SectionVariant::Select { select_type } => {
                if let Some(t) = self.select_type {
                    *select_type = t;
                }
            }
            SectionVariant::Date { select_type } => {
                if let Some(t) = self.date_type {
                    *select_type = t;
                }
            }
            SectionVariant::Instruction { instruction_type } => {
                if let Some(t) = self.instruction_type {
                    *instruction_type = t;
                }
            }
            _ => {}
        }
        let stray = match self.kind {
            SectionKind::Select => self.date_type.is_some() || self.instruction_type.is_some(),
            SectionKind::Date => self.select_type.is_some() || self.instruction_type.is_some(),
            SectionKind::Instruction => self.select_type.is_some() || self.date_type.is_some(),
            _ => self.select_type.is_some() || self.date_type.is_some() || self.instruction_type.is_some(),
        };
        if stray {
            warn!("Ignoring type options that do not apply to a {} section", self.kind);
        }
        variant
    }
}

/// Replace the file at `path` with `data` through a sibling temp file and a
/// rename, so readers see either the old or the new contents.
pub fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(data.as_bytes())?;
    f.flush()?;
    f.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}

/// Exclusive advisory lock on the store. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

/// Lock file guarding the store at `store_path`.
pub fn lock_path(store_path: &Path) -> PathBuf {
    store_path.with_extension("json.lock")
}

/// Take the exclusive store lock, retrying until `timeout`.
pub fn lock_store(store_path: &Path, timeout: Duration) -> Result<StoreLock> {
    let path = lock_path(store_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;

    let start = Instant::now();
    loop {
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!("Acquired store lock {}", path.display());
                return Ok(StoreLock { file, path });
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                if start.elapsed() >= timeout {
                    return Err(Error::LockTimeout { path });
                }
                thread::sleep(LOCK_RETRY_DELAY);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Load the store, apply `edit`, and save, all while holding the store lock.
/// Nothing is written if `edit` fails.
pub fn with_store<T>(store_path: &Path, edit: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
    let _lock = lock_store(store_path, LOCK_TIMEOUT)?;
    let mut db = Database::load(store_path)?;
    let out = edit(&mut db)?;
    db.save(store_path)?;
    Ok(out)
}

fn now_utc() -> i64 {
    Utc::now().timestamp()
}

impl Database {
    /// Load the store, returning an empty one if the file doesn't exist.
    ///
    /// Groups and sections are sorted by position and their ordering checked;
    /// malformed JSON, unknown section kinds and corrupt ordering are errors.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No store at {}, starting empty", path.display());
            return Ok(Database::default());
        }
        let content = fs::read_to_string(path)?;
        let mut db: Database = serde_json::from_str(&content)?;
        for template in &mut db.templates {
            ordering::sort_by_position(&mut template.section_groups);
            for group in &mut template.section_groups {
                ordering::sort_by_position(&mut group.sections);
            }
        }
        db.check()?;
        debug!("Loaded {} templates from {}", db.templates.len(), path.display());
        Ok(db)
    }

    /// Save the store to JSON using an atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_string_pretty(self)?)?;
        debug!("Saved {} templates to {}", self.templates.len(), path.display());
        Ok(())
    }

    /// Verify dense ordering of every template's groups and sections.
    pub fn check(&self) -> Result<()> {
        for template in &self.templates {
            ordering::validate(&template.section_groups, &format!("template {}", template.id))?;
            for group in &template.section_groups {
                ordering::validate(&group.sections, &format!("group {}", group.id))?;
            }
        }
        Ok(())
    }

    fn alloc_template_id(&mut self) -> u64 {
        let max = self.templates.iter().map(|t| t.id).max().unwrap_or(0);
        let id = self.next_template_id.max(max + 1);
        self.next_template_id = id + 1;
        id
    }

    fn alloc_group_id(&mut self) -> u64 {
        let max = self
            .templates
            .iter()
            .flat_map(|t| t.section_groups.iter())
            .map(|g| g.id)
            .max()
            .unwrap_or(0);
        let id = self.next_group_id.max(max + 1);
        self.next_group_id = id + 1;
        id
    }

    fn alloc_section_id(&mut self) -> u64 {
        let max = self.templates.iter().flat_map(|t| t.sections()).map(|s| s.id).max().unwrap_or(0);
        let id = self.next_section_id.max(max + 1);
        self.next_section_id = id + 1;
        id
    }

    pub fn get(&self, id: u64) -> Option<&IssueTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut IssueTemplate> {
        self.templates.iter_mut().find(|t| t.id == id)
    }

    pub fn template(&self, id: u64) -> Result<&IssueTemplate> {
        self.get(id).ok_or(Error::TemplateNotFound(id))
    }

    fn template_mut(&mut self, id: u64) -> Result<&mut IssueTemplate> {
        self.get_mut(id).ok_or(Error::TemplateNotFound(id))
    }

    /// The template owning group `group_id`.
    fn group_owner_mut(&mut self, group_id: u64) -> Result<&mut IssueTemplate> {
        self.templates
            .iter_mut()
            .find(|t| t.group(group_id).is_some())
            .ok_or(Error::GroupNotFound(group_id))
    }

    /// The template and group owning section `section_id`.
    fn section_owner_mut(&mut self, section_id: u64) -> Result<(&mut IssueTemplate, u64)> {
        let template = self
            .templates
            .iter_mut()
            .find(|t| t.find_section(section_id).is_some())
            .ok_or(Error::SectionNotFound(section_id))?;
        let group_id = template
            .find_section(section_id)
            .map(|(g, _)| g.id)
            .ok_or(Error::SectionNotFound(section_id))?;
        Ok((template, group_id))
    }

    pub fn create_template(&mut self, new: NewTemplate) -> u64 {
        let id = self.alloc_template_id();
        let now = now_utc();
        self.templates.push(IssueTemplate {
            id,
            template_title: new.template_title,
            tracker: new.tracker,
            subject: new.subject,
            template_description: new.template_description,
            description: new.description,
            template_enabled: true,
            show_on_overview: new.show_on_overview,
            projects: new.projects,
            section_groups: Vec::new(),
            created_at_utc: now,
            updated_at_utc: now,
        });
        info!("Created template {}", id);
        id
    }

    /// Delete a template together with its groups and sections.
    pub fn delete_template(&mut self, id: u64) -> Result<IssueTemplate> {
        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TemplateNotFound(id))?;
        info!("Deleted template {}", id);
        Ok(self.templates.remove(index))
    }

    /// Apply `edit` to a template's own fields. Title and tracker can't be blanked.
    pub fn edit_template(&mut self, id: u64, edit: TemplateEdit) -> Result<()> {
        let template = self.template_mut(id)?;
        for (field, value) in [("title", &edit.template_title), ("tracker", &edit.tracker)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::BlankTemplateField { field });
            }
        }
        if let Some(title) = edit.template_title {
            template.template_title = title.trim().to_string();
        }
        if let Some(tracker) = edit.tracker {
            template.tracker = tracker.trim().to_string();
        }
        if let Some(subject) = edit.subject {
            template.subject = non_empty(&subject);
        }
        if let Some(about) = edit.template_description {
            template.template_description = non_empty(&about);
        }
        if let Some(description) = edit.description {
            template.description = non_empty(&description);
        }
        if let Some(overview) = edit.show_on_overview {
            template.show_on_overview = overview;
        }
        if let Some(projects) = edit.projects {
            template.projects = projects;
        }
        template.updated_at_utc = now_utc();
        info!("Edited template {}", id);
        Ok(())
    }

    /// Templates sorted by id, optionally only those on the overview and/or
    /// assigned to `project`.
    pub fn list_templates(&self, overview: bool, project: Option<&str>) -> Vec<&IssueTemplate> {
        let mut templates: Vec<&IssueTemplate> = self
            .templates
            .iter()
            .filter(|t| !overview || t.on_overview())
            .filter(|t| project.map_or(true, |p| t.projects.iter().any(|tp| tp == p)))
            .collect();
        templates.sort_by_key(|t| t.id);
        templates
    }

    /// Flip `template_enabled`; returns the new state.
    pub fn toggle_template(&mut self, id: u64) -> Result<bool> {
        let template = self.template_mut(id)?;
        template.template_enabled = !template.template_enabled;
        template.updated_at_utc = now_utc();
        Ok(template.template_enabled)
    }

    /// Add a group at `position` (end when `None`). Returns its id and position.
    pub fn add_group(&mut self, template_id: u64, title: &str, position: Option<u32>) -> Result<(u64, u32)> {
        if title.trim().is_empty() {
            return Err(Error::BlankGroup);
        }
        self.template(template_id)?;
        let id = self.alloc_group_id();
        let template = self.template_mut(template_id)?;
        let group = SectionGroup {
            id,
            template_id,
            title: title.trim().to_string(),
            position: 0,
            sections: Vec::new(),
        };
        let at = match position {
            Some(p) => ordering::insert_at(&mut template.section_groups, group, p),
            None => ordering::push(&mut template.section_groups, group),
        };
        template.updated_at_utc = now_utc();
        info!("Added group {} to template {} at position {}", id, template_id, at);
        Ok((id, at))
    }

    pub fn move_group(&mut self, group_id: u64, position: u32) -> Result<u32> {
        let template = self.group_owner_mut(group_id)?;
        let at = ordering::move_to(&mut template.section_groups, group_id, position)
            .ok_or(Error::GroupNotFound(group_id))?;
        template.updated_at_utc = now_utc();
        Ok(at)
    }

    pub fn rename_group(&mut self, group_id: u64, title: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::BlankGroup);
        }
        let template = self.group_owner_mut(group_id)?;
        let group = template.group_mut(group_id).ok_or(Error::GroupNotFound(group_id))?;
        group.title = title.trim().to_string();
        template.updated_at_utc = now_utc();
        Ok(())
    }

    /// Delete a group and its sections.
    pub fn delete_group(&mut self, group_id: u64) -> Result<SectionGroup> {
        let template = self.group_owner_mut(group_id)?;
        let group = ordering::remove(&mut template.section_groups, group_id)
            .ok_or(Error::GroupNotFound(group_id))?;
        template.updated_at_utc = now_utc();
        info!("Deleted group {} with {} sections", group_id, group.sections.len());
        Ok(group)
    }

    /// Add a section to a group. Returns its id and position.
    pub fn add_section(&mut self, group_id: u64, new: NewSection) -> Result<(u64, u32)> {
        self.group_owner_mut(group_id)?;
        let id = self.alloc_section_id();
        let section = Section {
            id,
            group_id,
            title: new.title.trim().to_string(),
            text: new.text.clone(),
            position: 0,
            display_mode: new.display_mode,
            variant: new.variant(),
        };
        section.validate()?;

        let template = self.group_owner_mut(group_id)?;
        let group = template.group_mut(group_id).ok_or(Error::GroupNotFound(group_id))?;
        let at = match new.position {
            Some(p) => ordering::insert_at(&mut group.sections, section, p),
            None => ordering::push(&mut group.sections, section),
        };
        template.updated_at_utc = now_utc();
        info!("Added {} section {} to group {} at position {}", new.kind, id, group_id, at);
        Ok((id, at))
    }

    pub fn move_section(&mut self, section_id: u64, position: u32) -> Result<u32> {
        let (template, group_id) = self.section_owner_mut(section_id)?;
        let group = template.group_mut(group_id).ok_or(Error::GroupNotFound(group_id))?;
        let at = ordering::move_to(&mut group.sections, section_id, position)
            .ok_or(Error::SectionNotFound(section_id))?;
        template.updated_at_utc = now_utc();
        Ok(at)
    }

    /// Apply `edit` to a section. Nothing changes if the result fails validation.
    pub fn edit_section(&mut self, section_id: u64, edit: SectionEdit) -> Result<()> {
        let (template, group_id) = self.section_owner_mut(section_id)?;
        let group = template.group_mut(group_id).ok_or(Error::GroupNotFound(group_id))?;
        let section = group
            .sections
            .iter_mut()
            .find(|s| s.id == section_id)
            .ok_or(Error::SectionNotFound(section_id))?;
        let mut updated = section.clone();
        edit.apply(&mut updated)?;
        updated.validate()?;
        *section = updated;
        template.updated_at_utc = now_utc();
        info!("Edited section {}", section_id);
        Ok(())
    }

    /// Swap a group with its neighbour. Returns false when already at that end.
    pub fn shift_group(&mut self, group_id: u64, up: bool) -> Result<bool> {
        let template = self.group_owner_mut(group_id)?;
        let moved = if up {
            ordering::move_up(&mut template.section_groups, group_id)
        } else {
            ordering::move_down(&mut template.section_groups, group_id)
        };
        if moved {
            template.updated_at_utc = now_utc();
        }
        Ok(moved)
    }

    /// Swap a section with its neighbour within its group.
    pub fn shift_section(&mut self, section_id: u64, up: bool) -> Result<bool> {
        let (template, group_id) = self.section_owner_mut(section_id)?;
        let group = template.group_mut(group_id).ok_or(Error::GroupNotFound(group_id))?;
        let moved = if up {
            ordering::move_up(&mut group.sections, section_id)
        } else {
            ordering::move_down(&mut group.sections, section_id)
        };
        if moved {
            template.updated_at_utc = now_utc();
        }
        Ok(moved)
    }

    pub fn delete_section(&mut self, section_id: u64) -> Result<Section> {
        let (template, group_id) = self.section_owner_mut(section_id)?;
        let group = template.group_mut(group_id).ok_or(Error::GroupNotFound(group_id))?;
        let section = ordering::remove(&mut group.sections, section_id)
            .ok_or(Error::SectionNotFound(section_id))?;
        template.updated_at_utc = now_utc();
        info!("Deleted section {} from group {}", section_id, group_id);
        Ok(section)
    }
}

/// Describe a section's variant, e.g. `select (radio)`.
pub fn format_variant(variant: &SectionVariant) -> String {
    match variant {
        SectionVariant::Select { select_type } => format!("select ({})", format_select_type(*select_type)),
        SectionVariant::Date { select_type: DateType::Datetime } => "date (datetime)".to_string(),
        SectionVariant::Instruction { instruction_type } => {
            format!("instruction ({})", format_instruction_type(*instruction_type))
        }
        other => other.kind().short_name().to_string(),
    }
}

pub fn format_select_type(t: SelectType) -> &'static str {
    match t {
        SelectType::Checkbox => "checkbox",
        SelectType::Radio => "radio",
        SelectType::MonovalueSelect => "monovalue select",
        SelectType::MultivalueSelect => "multivalue select",
    }
}

pub fn format_instruction_type(t: InstructionType) -> &'static str {
    match t {
        InstructionType::Info => "info",
        InstructionType::Warning => "warning",
        InstructionType::Note => "note",
        InstructionType::Comment => "comment",
    }
}

pub fn format_display_mode(m: DisplayMode) -> &'static str {
    match m {
        DisplayMode::AllValues => "all values",
        DisplayMode::SelectedValuesOnly => "selected values only",
    }
}

/// Format a UTC timestamp as a local-independent date and time.
pub fn format_timestamp(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "-".to_string(),
    }
}

/// Print templates in a formatted table.
pub fn print_table(templates: &[&IssueTemplate]) {
    println!(
        "{:<5} {:<8} {:<8} {:<8} {}",
        "ID", "Enabled", "Groups", "Sections", "Template"
    );
    for t in templates {
        println!(
            "{:<5} {:<8} {:<8} {:<8} {}",
            t.id,
            if t.template_enabled { "yes" } else { "no" },
            t.section_groups.len(),
            t.sections().count(),
            truncate(&t.title_with_tracker(), 60)
        );
    }
}

/// Print one template's groups and sections as an indented outline.
pub fn print_outline(template: &IssueTemplate) {
    println!("{} (#{})", template.title_with_tracker(), template.id);
    if let Some(subject) = &template.subject {
        println!("Subject: {}", subject);
    }
    if let Some(desc) = &template.template_description {
        println!("About: {}", desc);
    }
    if !template.projects.is_empty() {
        println!("Projects: {}", template.projects.join(", "));
    }
    println!(
        "Enabled: {}  Overview: {}  Updated: {}",
        if template.template_enabled { "yes" } else { "no" },
        if template.show_on_overview { "yes" } else { "no" },
        format_timestamp(template.updated_at_utc)
    );
    for group in &template.section_groups {
        println!("  [{}] group {}: {}", group.position, group.id, group.title);
        for s in &group.sections {
            let mode = match s.variant {
                SectionVariant::Select { select_type: SelectType::Checkbox } => {
                    format!(", {}", format_display_mode(s.display_mode))
                }
                _ => String::new(),
            };
            let text = s
                .text
                .as_deref()
                .map(|t| format!(" \"{}\"", truncate(t, 40)))
                .unwrap_or_default();
            println!(
                "    [{}] section {}: {} ({}{}){}",
                s.position,
                s.id,
                s.title,
                format_variant(&s.variant),
                mode,
                text
            );
        }
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
