use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::cmd::Commands;

/// Issue template composer.
/// The store defaults to the platform data directory or a path passed via --db.
#[derive(Parser)]
#[command(name = "itpl", version, about = "Compose issue descriptions from structured templates")]
pub struct Cli {
    /// Path to the JSON template store.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the TOML config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{GroupAction, SectionAction, TemplateAction};
    use crate::fields::{SectionKind, SelectType};
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_section_add() {
        let cli = Cli::try_parse_from([
            "itpl", "-vv", "section", "add", "3", "select", "--title", "OS", "--text", "Linux;macOS",
            "--select-type", "radio",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Section {
                action: SectionAction::Add { group, kind, title, select_type, .. },
            } => {
                assert_eq!(group, 3);
                assert_eq!(kind, SectionKind::Select);
                assert_eq!(title.as_deref(), Some("OS"));
                assert_eq!(select_type, Some(SelectType::Radio));
            }
            _ => panic!("expected section add"),
        }
    }

    #[test]
    fn test_parse_kind_aliases() {
        let cli = Cli::try_parse_from(["itpl", "section", "add", "1", "field", "--title", "A"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Section { action: SectionAction::Add { kind: SectionKind::TextField, .. } }
        ));
        assert!(Cli::try_parse_from(["itpl", "section", "add", "1", "slider"]).is_err());
    }

    #[test]
    fn test_parse_render_and_global_db() {
        let cli = Cli::try_parse_from([
            "itpl", "render", "1", "--set", "4=0", "--set", "4=1", "--plain", "--db", "/tmp/t.json",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/t.json")));
        match cli.command {
            Commands::Render { template, set, plain, value_only, .. } => {
                assert_eq!(template, 1);
                assert_eq!(set, vec!["4=0", "4=1"]);
                assert!(plain);
                assert!(!value_only);
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_parse_template_create() {
        let cli = Cli::try_parse_from([
            "itpl", "template", "create", "Crash report", "--tracker", "Bug", "--project", "web",
            "--project", "api", "--overview",
        ])
        .unwrap();
        match cli.command {
            Commands::Template { action: TemplateAction::Create { title, tracker, projects, overview, .. } } => {
                assert_eq!(title, "Crash report");
                assert_eq!(tracker, "Bug");
                assert_eq!(projects, vec!["web", "api"]);
                assert!(overview);
            }
            _ => panic!("expected template create"),
        }
    }

    #[test]
    fn test_parse_edit_commands() {
        let cli = Cli::try_parse_from([
            "itpl", "template", "edit", "3", "--subject", "", "--overview", "false", "--clear-projects",
        ])
        .unwrap();
        match cli.command {
            Commands::Template {
                action: TemplateAction::Edit { id, subject, overview, projects, clear_projects, title, .. },
            } => {
                assert_eq!(id, 3);
                assert_eq!(subject.as_deref(), Some(""));
                assert_eq!(overview, Some(false));
                assert!(projects.is_empty() && clear_projects);
                assert!(title.is_none());
            }
            _ => panic!("expected template edit"),
        }
        assert!(Cli::try_parse_from(["itpl", "template", "edit", "3", "--project", "web", "--clear-projects"]).is_err());

        let cli = Cli::try_parse_from(["itpl", "group", "rename", "2", "Environment"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Group { action: GroupAction::Rename { group: 2, ref title } } if title == "Environment"
        ));

        let cli = Cli::try_parse_from([
            "itpl", "section", "edit", "5", "--kind", "select", "--select-type", "radio", "--text", "A;B",
        ])
        .unwrap();
        match cli.command {
            Commands::Section { action: SectionAction::Edit { section, kind, select_type, text, .. } } => {
                assert_eq!(section, 5);
                assert_eq!(kind, Some(SectionKind::Select));
                assert_eq!(select_type, Some(SelectType::Radio));
                assert_eq!(text.as_deref(), Some("A;B"));
            }
            _ => panic!("expected section edit"),
        }
    }

    #[test]
    fn test_parse_template_list_project() {
        let cli = Cli::try_parse_from(["itpl", "template", "list", "--project", "web", "--overview"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Template { action: TemplateAction::List { overview: true, project: Some(ref p) } } if p == "web"
        ));
    }
}
