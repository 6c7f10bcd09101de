//! Command implementations for the CLI interface.
//!
//! This module contains the command handlers behind every subcommand: template,
//! group and section editing against the store, rendering an issue description
//! from submitted values, store checks, configuration and the TUI previewer.
//! Handlers report failures on stderr and exit with status 1.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use clap_complete::{generate, Shell};
use log::{info, warn};

use crate::compose::render_issue_description;
use crate::config::Config;
use crate::db::*;
use crate::error::Result;
use crate::fields::*;
use crate::render::RenderOptions;
use crate::tui::run::run_tui;
use crate::values::ValueMap;

#[derive(Subcommand)]
pub enum Commands {
    /// Preview a template interactively, filling values and reordering sections.
    Ui {
        /// Template ID. Defaults to the first enabled template.
        template: Option<u64>,
    },

    /// Manage issue templates.
    Template {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Manage section groups within a template.
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Manage sections within a group.
    Section {
        #[command(subcommand)]
        action: SectionAction,
    },

    /// Render the issue description a template produces for submitted values.
    Render {
        /// Template ID.
        template: u64,
        /// JSON file of submitted values keyed by section ID.
        #[arg(long)]
        values: Option<PathBuf>,
        /// Submit SECTION_ID=VALUE. Repeat an ID to submit a list.
        #[arg(long = "set", value_name = "ID=VALUE")]
        set: Vec<String>,
        /// Render plain text instead of Textile.
        #[arg(long)]
        plain: bool,
        /// Omit section titles and labels.
        #[arg(long)]
        value_only: bool,
    },

    /// Load the store and verify the ordering of every group and section.
    Check,

    /// Print the effective configuration as TOML.
    Config {
        /// Write a default config file if none exists.
        #[arg(long)]
        init: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// Create a new template.
    Create {
        /// Template title
        title: String,
        /// Tracker the issue is filed under, e.g. Bug or Feature
        #[arg(long)]
        tracker: String,
        /// Issue subject to pre-fill
        #[arg(long)]
        subject: Option<String>,
        /// Static issue description, used while the template has no sections
        #[arg(long)]
        description: Option<String>,
        /// Note shown when choosing a template; never rendered
        #[arg(long)]
        about: Option<String>,
        /// Project the template belongs to. May be repeated.
        #[arg(long = "project")]
        projects: Vec<String>,
        /// Show the template in the overview listing
        #[arg(long)]
        overview: bool,
    },
    /// Edit a template's fields. An empty value clears an optional field.
    Edit {
        /// Template ID
        id: u64,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New tracker
        #[arg(long)]
        tracker: Option<String>,
        /// Issue subject to pre-fill
        #[arg(long)]
        subject: Option<String>,
        /// Static issue description
        #[arg(long)]
        description: Option<String>,
        /// Note shown when choosing a template
        #[arg(long)]
        about: Option<String>,
        /// Replace the template's projects. May be repeated.
        #[arg(long = "project", conflicts_with = "clear_projects")]
        projects: Vec<String>,
        /// Remove the template from every project
        #[arg(long)]
        clear_projects: bool,
        /// Show the template in the overview listing (true/false)
        #[arg(long)]
        overview: Option<bool>,
    },
    /// List templates.
    List {
        /// Only templates shown on the overview (enabled and flagged).
        #[arg(long)]
        overview: bool,
        /// Only templates assigned to this project.
        #[arg(long)]
        project: Option<String>,
    },
    /// Show a template's groups and sections.
    Show {
        /// Template ID
        id: u64,
    },
    /// Enable or disable a template.
    Toggle {
        /// Template ID
        id: u64,
    },
    /// Delete a template with all its groups and sections.
    Delete {
        /// Template ID
        id: u64,
    },
}

#[derive(Subcommand)]
pub enum GroupAction {
    /// Add a group to a template.
    Add {
        /// Template ID
        template: u64,
        /// Group title
        title: String,
        /// Position among the template's groups. Defaults to the end.
        #[arg(long)]
        position: Option<u32>,
    },
    /// Rename a group.
    Rename {
        /// Group ID
        group: u64,
        /// New title
        title: String,
    },
    /// Move a group to a new position.
    Move {
        /// Group ID
        group: u64,
        /// Target position (clamped to the last slot)
        position: u32,
    },
    /// Delete a group and its sections.
    Delete {
        /// Group ID
        group: u64,
    },
}

#[derive(Subcommand)]
pub enum SectionAction {
    /// Add a section to a group.
    Add {
        /// Group ID
        group: u64,
        /// Section kind: field | checkbox | section | date | select | instruction
        kind: SectionKind,
        /// Section title. Required for every kind except instruction.
        #[arg(long)]
        title: Option<String>,
        /// Possible values separated by ';' for selects, the text for instructions
        #[arg(long)]
        text: Option<String>,
        /// Position among the group's sections. Defaults to the end.
        #[arg(long)]
        position: Option<u32>,
        /// Selection type for select sections
        #[arg(long, value_enum)]
        select_type: Option<SelectType>,
        /// Granularity for date sections
        #[arg(long, value_enum)]
        date_type: Option<DateType>,
        /// Severity for instruction sections
        #[arg(long, value_enum)]
        instruction_type: Option<InstructionType>,
        /// Whether unchecked checkbox-set items are rendered
        #[arg(long, value_enum, default_value_t = DisplayMode::AllValues)]
        display_mode: DisplayMode,
    },
    /// Edit a section in place. Its kind can't change.
    Edit {
        /// Section ID
        section: u64,
        /// Expected kind; rejected if it differs from the section's kind
        #[arg(long)]
        kind: Option<SectionKind>,
        /// New title
        #[arg(long)]
        title: Option<String>,
        /// New possible values or instruction text. Empty clears it.
        #[arg(long)]
        text: Option<String>,
        /// Selection type for select sections
        #[arg(long, value_enum)]
        select_type: Option<SelectType>,
        /// Granularity for date sections
        #[arg(long, value_enum)]
        date_type: Option<DateType>,
        /// Severity for instruction sections
        #[arg(long, value_enum)]
        instruction_type: Option<InstructionType>,
        /// Whether unchecked checkbox-set items are rendered
        #[arg(long, value_enum)]
        display_mode: Option<DisplayMode>,
    },
    /// Move a section to a new position within its group.
    Move {
        /// Section ID
        section: u64,
        /// Target position (clamped to the last slot)
        position: u32,
    },
    /// Delete a section.
    Delete {
        /// Section ID
        section: u64,
    },
}

/// Unwrap a result or report the error and exit.
fn or_exit<T, E: Display>(result: std::result::Result<T, E>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            eprintln!("{}: {}", context, e);
            std::process::exit(1);
        }
    }
}

/// Launch the terminal previewer.
pub fn cmd_ui(store_path: &Path, template: Option<u64>, opts: RenderOptions) {
    let db = or_exit(Database::load(store_path), "Failed to load store");
    let template_id = match template {
        Some(id) => id,
        None => match db.templates.iter().find(|t| t.template_enabled) {
            Some(t) => t.id,
            None => {
                eprintln!("No enabled templates found. Create one with `itpl template create`.");
                std::process::exit(1);
            }
        },
    };
    if db.get(template_id).is_none() {
        eprintln!("Template {} not found.", template_id);
        std::process::exit(1);
    }
    drop(db);

    if let Err(e) = run_tui(store_path, template_id, opts) {
        eprintln!("UI error: {e}");
        std::process::exit(1);
    }
}

/// Handle template management commands.
pub fn cmd_template(store_path: &Path, action: TemplateAction) {
    match action {
        TemplateAction::Create { title, tracker, subject, description, about, projects, overview } => {
            if title.trim().is_empty() || tracker.trim().is_empty() {
                eprintln!("Template title and tracker must not be empty.");
                std::process::exit(1);
            }
            let new = NewTemplate {
                template_title: title.trim().to_string(),
                tracker: tracker.trim().to_string(),
                subject,
                template_description: about,
                description,
                show_on_overview: overview,
                projects,
            };
            let id = or_exit(
                with_store(store_path, |db| Ok(db.create_template(new))),
                "Failed to create template",
            );
            println!("Created template {}", id);
        }

        TemplateAction::Edit {
            id, title, tracker, subject, description, about, projects, clear_projects, overview,
        } => {
            let edit = TemplateEdit {
                template_title: title,
                tracker,
                subject,
                template_description: about,
                description,
                show_on_overview: overview,
                projects: if clear_projects || !projects.is_empty() { Some(projects) } else { None },
            };
            if edit.is_empty() {
                eprintln!("Nothing to change.");
                std::process::exit(1);
            }
            or_exit(
                with_store(store_path, |db| db.edit_template(id, edit)),
                "Failed to edit template",
            );
            println!("Updated template {}", id);
        }

        TemplateAction::List { overview, project } => {
            let db = or_exit(Database::load(store_path), "Failed to load store");
            let templates = db.list_templates(overview, project.as_deref());
            if templates.is_empty() {
                println!("No templates found.");
                return;
            }
            print_table(&templates);
        }

        TemplateAction::Show { id } => {
            let db = or_exit(Database::load(store_path), "Failed to load store");
            let template = or_exit(db.template(id), "Error");
            print_outline(template);
        }

        TemplateAction::Toggle { id } => {
            let enabled = or_exit(
                with_store(store_path, |db| db.toggle_template(id)),
                "Failed to toggle template",
            );
            println!("Template {} {}", id, if enabled { "enabled" } else { "disabled" });
        }

        TemplateAction::Delete { id } => {
            let removed = or_exit(
                with_store(store_path, |db| db.delete_template(id)),
                "Failed to delete template",
            );
            println!(
                "Deleted template {} ({} groups, {} sections)",
                removed.title_with_tracker(),
                removed.section_groups.len(),
                removed.sections().count()
            );
        }
    }
}

/// Handle section group commands.
pub fn cmd_group(store_path: &Path, action: GroupAction) {
    match action {
        GroupAction::Add { template, title, position } => {
            let (id, at) = or_exit(
                with_store(store_path, |db| db.add_group(template, &title, position)),
                "Failed to add group",
            );
            println!("Added group {} at position {}", id, at);
        }
        GroupAction::Rename { group, title } => {
            or_exit(
                with_store(store_path, |db| db.rename_group(group, &title)),
                "Failed to rename group",
            );
            println!("Renamed group {} to '{}'", group, title.trim());
        }
        GroupAction::Move { group, position } => {
            let at = or_exit(
                with_store(store_path, |db| db.move_group(group, position)),
                "Failed to move group",
            );
            if at != position {
                info!("Requested position {} clamped to {}", position, at);
            }
            println!("Moved group {} to position {}", group, at);
        }
        GroupAction::Delete { group } => {
            let removed = or_exit(
                with_store(store_path, |db| db.delete_group(group)),
                "Failed to delete group",
            );
            println!("Deleted group '{}' ({} sections)", removed.title, removed.sections.len());
        }
    }
}

/// Handle section commands.
pub fn cmd_section(store_path: &Path, action: SectionAction) {
    match action {
        SectionAction::Add {
            group, kind, title, text, position, select_type, date_type, instruction_type, display_mode,
        } => {
            let new = NewSection {
                kind,
                title: title.unwrap_or_default(),
                text,
                position,
                display_mode,
                select_type,
                date_type,
                instruction_type,
            };
            let (id, at) = or_exit(
                with_store(store_path, |db| db.add_section(group, new)),
                "Failed to add section",
            );
            println!("Added {} section {} at position {}", kind, id, at);
        }
        SectionAction::Edit {
            section, kind, title, text, select_type, date_type, instruction_type, display_mode,
        } => {
            let edit = SectionEdit {
                kind,
                title,
                text,
                display_mode,
                select_type,
                date_type,
                instruction_type,
            };
            if edit.is_empty() {
                eprintln!("Nothing to change.");
                std::process::exit(1);
            }
            or_exit(
                with_store(store_path, |db| db.edit_section(section, edit)),
                "Failed to edit section",
            );
            println!("Updated section {}", section);
        }
        SectionAction::Move { section, position } => {
            let at = or_exit(
                with_store(store_path, |db| db.move_section(section, position)),
                "Failed to move section",
            );
            if at != position {
                info!("Requested position {} clamped to {}", position, at);
            }
            println!("Moved section {} to position {}", section, at);
        }
        SectionAction::Delete { section } => {
            let removed = or_exit(
                with_store(store_path, |db| db.delete_section(section)),
                "Failed to delete section",
            );
            println!("Deleted {} section {}", removed.variant.kind(), removed.id);
        }
    }
}

/// Collect submitted values from an optional JSON file and `--set` assignments.
/// Assignments are applied after the file, so they extend or replace its entries.
pub fn collect_values(values_file: Option<&Path>, assignments: &[String]) -> Result<ValueMap> {
    let mut values = match values_file {
        Some(path) => ValueMap::from_json(&fs::read_to_string(path)?)?,
        None => ValueMap::new(),
    };
    let mut replaced = std::collections::BTreeSet::new();
    for assignment in assignments {
        let (id, value) = crate::values::parse_assignment(assignment)?;
        // The first --set for an id replaces the file's entry; later ones append.
        if replaced.insert(id) {
            values.remove(id);
        }
        values.push(id, value);
    }
    Ok(values)
}

/// Render an issue description and print it.
pub fn cmd_render(
    store_path: &Path,
    mut opts: RenderOptions,
    template: u64,
    values_file: Option<PathBuf>,
    set: Vec<String>,
    plain: bool,
    value_only: bool,
) {
    let db = or_exit(Database::load(store_path), "Failed to load store");
    let template = or_exit(db.template(template), "Error");
    if !template.template_enabled {
        warn!("Template {} is disabled", template.id);
    }
    let values = or_exit(collect_values(values_file.as_deref(), &set), "Failed to read values");

    if plain {
        opts.textile = false;
    }
    if value_only {
        opts.value_only = true;
    }

    let text = render_issue_description(template, &values, &opts);
    if let Some(subject) = &template.subject {
        info!("Subject: {}", subject);
    }
    print!("{}", text);
    if !text.ends_with('\n') {
        println!();
    }
}

/// Verify the store loads and its ordering is dense.
pub fn cmd_check(store_path: &Path) {
    let db = or_exit(Database::load(store_path), "Store check failed");
    let groups: usize = db.templates.iter().map(|t| t.section_groups.len()).sum();
    let sections: usize = db.templates.iter().map(|t| t.sections().count()).sum();
    println!(
        "OK: {} templates, {} groups, {} sections in {}",
        db.templates.len(),
        groups,
        sections,
        store_path.display()
    );
}

/// Print the effective configuration, optionally writing a default file first.
pub fn cmd_config(config_path: Option<&Path>, config: &Config, init: bool) {
    if init {
        let Some(path) = config_path.map(Path::to_path_buf).or_else(Config::default_path) else {
            eprintln!("No config directory on this platform; pass --config.");
            std::process::exit(1);
        };
        if path.exists() {
            eprintln!("Config already exists at {}", path.display());
            std::process::exit(1);
        }
        or_exit(Config::default().save(&path), "Failed to write config");
        println!("# Wrote {}", path.display());
    }
    print!("{}", or_exit(config.to_toml(), "Failed to format config"));
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}
