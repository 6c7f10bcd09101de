//! Template composition.
//!
//! Walks a template's groups and their sections in position order, renders
//! each section and concatenates the fragments into the issue description.
//! Groups have no visible decoration; a group whose sections all render empty
//! contributes nothing.

use crate::render::{render_section, RenderOptions};
use crate::template::IssueTemplate;
use crate::values::ValueMap;

/// The rendered text of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub group_id: u64,
    pub section_id: u64,
    pub text: String,
}

/// A composed issue description and the fragments it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub text: String,
    /// Non-empty fragments in document order.
    pub fragments: Vec<Fragment>,
}

/// Render every section of `template` in group-then-section order.
///
/// Groups and sections are expected to already be sorted by dense position;
/// this is not re-checked here.
pub fn render_template(template: &IssueTemplate, values: &ValueMap, opts: &RenderOptions) -> RenderedDocument {
    let mut doc = RenderedDocument::default();
    for group in &template.section_groups {
        debug_assert!(group.sections.windows(2).all(|w| w[0].position < w[1].position));
        for section in &group.sections {
            let text = render_section(section, values, opts);
            if text.is_empty() {
                continue;
            }
            doc.text.push_str(&text);
            doc.fragments.push(Fragment {
                group_id: group.id,
                section_id: section.id,
                text,
            });
        }
    }
    doc
}

/// The description an issue created from `template` should carry.
///
/// Templates without sections use their static description verbatim.
pub fn render_issue_description(template: &IssueTemplate, values: &ValueMap, opts: &RenderOptions) -> String {
    if template.has_sections() {
        render_template(template, values, opts).text
    } else {
        template.description.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;
    use crate::template::{Section, SectionGroup, SectionVariant};

    fn section(id: u64, group_id: u64, position: u32, title: &str, variant: SectionVariant) -> Section {
        Section {
            id,
            group_id,
            title: title.to_string(),
            text: None,
            position,
            display_mode: DisplayMode::AllValues,
            variant,
        }
    }

    fn group(id: u64, position: u32, title: &str, sections: Vec<Section>) -> SectionGroup {
        SectionGroup {
            id,
            template_id: 1,
            title: title.to_string(),
            position,
            sections,
        }
    }

    fn template(groups: Vec<SectionGroup>) -> IssueTemplate {
        IssueTemplate {
            id: 1,
            template_title: "Bug report".to_string(),
            tracker: "Bug".to_string(),
            subject: None,
            template_description: None,
            description: Some("Static description".to_string()),
            template_enabled: true,
            show_on_overview: false,
            projects: Vec::new(),
            section_groups: groups,
            created_at_utc: 0,
            updated_at_utc: 0,
        }
    }

    fn bug_report() -> IssueTemplate {
        let mut browsers = section(
            4,
            20,
            0,
            "Browsers",
            SectionVariant::Select { select_type: SelectType::Checkbox },
        );
        browsers.text = Some("Firefox;Chrome".to_string());
        browsers.display_mode = DisplayMode::SelectedValuesOnly;

        template(vec![
            group(
                10,
                0,
                "Summary",
                vec![
                    section(1, 10, 0, "Priority", SectionVariant::TextField),
                    section(2, 10, 1, "Notes", SectionVariant::TextArea),
                ],
            ),
            group(
                30,
                1,
                "Guidance",
                vec![section(
                    3,
                    30,
                    0,
                    "",
                    SectionVariant::Instruction { instruction_type: InstructionType::Info },
                )],
            ),
            group(20, 2, "Environment", vec![browsers]),
        ])
    }

    #[test]
    fn test_concatenates_in_group_then_section_order() {
        let mut values = ValueMap::new();
        values.set_text(1, "High");
        values.set_text(2, "Crashes on save");
        values.set_list(4, vec!["0".to_string(), "1".to_string()]);

        let doc = render_template(&bug_report(), &values, &RenderOptions::default());
        assert_eq!(
            doc.text,
            "\n*Priority :* High\n\n*Notes :* \nCrashes on save\n\n*Browsers :* \n* Chrome : Yes\n"
        );
        let ids: Vec<u64> = doc.fragments.iter().map(|f| f.section_id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_group_of_empty_fragments_contributes_nothing() {
        let doc = render_template(&bug_report(), &ValueMap::new(), &RenderOptions::default());
        assert!(doc.fragments.iter().all(|f| f.group_id != 30));
        assert!(!doc.text.contains("Guidance"));
    }

    #[test]
    fn test_value_only_document_has_no_titles() {
        let mut values = ValueMap::new();
        values.set_text(1, "High");
        values.set_text(2, "Crashes on save");
        values.set_list(4, vec!["1".to_string(), "1".to_string()]);
        let opts = RenderOptions {
            textile: false,
            value_only: true,
            ..RenderOptions::default()
        };
        let doc = render_template(&bug_report(), &values, &opts);
        assert_eq!(doc.text, "HighCrashes on saveFirefox : YesChrome : Yes");
        for title in ["Priority", "Notes", "Browsers", "Summary", "Environment"] {
            assert!(!doc.text.contains(title));
        }
    }

    #[test]
    fn test_fragments_concatenate_to_text() {
        let mut values = ValueMap::new();
        values.set_text(2, "Body");
        let doc = render_template(&bug_report(), &values, &RenderOptions::plain());
        let joined: String = doc.fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(joined, doc.text);
    }

    #[test]
    fn test_description_falls_back_without_sections() {
        let empty = template(vec![group(10, 0, "Empty", Vec::new())]);
        assert_eq!(
            render_issue_description(&empty, &ValueMap::new(), &RenderOptions::default()),
            "Static description"
        );

        let mut values = ValueMap::new();
        values.set_text(1, "Low");
        let rendered = render_issue_description(&bug_report(), &values, &RenderOptions::plain());
        assert!(rendered.starts_with("Priority : Low"));
    }
}
