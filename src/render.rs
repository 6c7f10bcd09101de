//! Section rendering.
//!
//! Each section variant turns its extracted value(s) into a text fragment.
//! Fragments are built from three primitives (`title`, `item`, `entry`) that
//! exist in a Textile flavour and a plain-text flavour. Rendering is pure: no
//! I/O, no shared state, and no error path.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::fields::DisplayMode;
use crate::template::{Section, SectionVariant};
use crate::values::{extract, Extracted, ValueMap};

/// Labels used for boolean values in rendered output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BooleanLabels {
    pub yes: String,
    pub no: String,
}

impl Default for BooleanLabels {
    fn default() -> Self {
        Self {
            yes: "Yes".to_string(),
            no: "No".to_string(),
        }
    }
}

impl BooleanLabels {
    pub fn label(&self, value: bool) -> &str {
        if value {
            &self.yes
        } else {
            &self.no
        }
    }
}

/// Flags applied uniformly to a whole render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Textile rich markup when true, plain text otherwise.
    pub textile: bool,
    /// Omit section titles and labels.
    pub value_only: bool,
    pub labels: BooleanLabels,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            textile: true,
            value_only: false,
            labels: BooleanLabels::default(),
        }
    }
}

impl RenderOptions {
    pub fn plain() -> Self {
        Self {
            textile: false,
            ..Self::default()
        }
    }
}

/// Formatting primitives shared by every variant.
#[derive(Debug, Clone, Copy)]
pub struct Markup {
    pub textile: bool,
}

impl Markup {
    /// A labelled line, with the value inline after the label.
    pub fn title(&self, label: &str, value: &str) -> String {
        if self.textile {
            format!("\n*{label} :* {value}\n")
        } else {
            format!("{label} : {value}")
        }
    }

    /// A list item, optionally followed by an inline value.
    pub fn item(&self, label: &str, inline_value: Option<&str>) -> String {
        let inline = match inline_value {
            Some(v) if !v.is_empty() => format!(" : {v}"),
            _ => String::new(),
        };
        if self.textile {
            format!("* {label}{inline}\n")
        } else {
            format!("{label}{inline}")
        }
    }

    /// A bare value.
    pub fn entry(&self, value: &str) -> String {
        if self.textile {
            format!("{value}\n")
        } else {
            value.to_string()
        }
    }
}

/// Whether a checkbox-set item is suppressed under `mode`.
pub fn hidden_by_display_mode(mode: DisplayMode, checked: bool) -> bool {
    mode == DisplayMode::SelectedValuesOnly && !checked
}

/// Render one section against the submitted values.
pub fn render_section(section: &Section, values: &ValueMap, opts: &RenderOptions) -> String {
    let extracted = extract(section, values);
    render_extracted(section, &extracted, opts)
}

/// Render one section from an already extracted value.
pub fn render_extracted(section: &Section, extracted: &Extracted<'_>, opts: &RenderOptions) -> String {
    let markup = Markup { textile: opts.textile };
    match extracted {
        Extracted::Nothing => String::new(),
        Extracted::Text(value) => {
            let value = value.as_deref().unwrap_or("");
            if opts.value_only {
                markup.entry(value)
            } else if section.variant == SectionVariant::TextArea {
                markup.title(&section.title, "") + &markup.entry(value)
            } else {
                markup.title(&section.title, value)
            }
        }
        Extracted::Flag(checked) => {
            let value = opts.labels.label(*checked);
            if opts.value_only {
                markup.entry(value)
            } else {
                markup.title(&section.title, value)
            }
        }
        Extracted::List(selected) => {
            let mut out = header(section, &markup, opts);
            for value in selected {
                out.push_str(&markup.item(value, None));
            }
            out
        }
        Extracted::Flags(flags) => {
            let mut out = header(section, &markup, opts);
            out.push_str(&render_checkbox_set(section, flags, &markup, opts));
            out
        }
    }
}

fn header(section: &Section, markup: &Markup, opts: &RenderOptions) -> String {
    if opts.value_only {
        String::new()
    } else {
        markup.title(&section.title, "")
    }
}

/// Pair configured labels with submitted booleans by position.
/// Positions with no submitted boolean count as unchecked.
fn render_checkbox_set(section: &Section, flags: &[bool], markup: &Markup, opts: &RenderOptions) -> String {
    let labels = section.possible_values();
    if labels.len() != flags.len() {
        debug!(
            "section {}: {} possible values but {} submitted flags",
            section.id,
            labels.len(),
            flags.len()
        );
    }

    let mut out = String::new();
    for (index, label) in labels.iter().enumerate() {
        let checked = flags.get(index).copied().unwrap_or(false);
        if hidden_by_display_mode(section.display_mode, checked) {
            continue;
        }
        out.push_str(&markup.item(label, Some(opts.labels.label(checked))));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::*;

    fn section(id: u64, title: &str, variant: SectionVariant) -> Section {
        Section {
            id,
            group_id: 1,
            title: title.to_string(),
            text: None,
            position: 0,
            display_mode: DisplayMode::AllValues,
            variant,
        }
    }

    fn checkbox_set(id: u64, possible: &str, mode: DisplayMode) -> Section {
        let mut s = section(id, "Browsers", SectionVariant::Select { select_type: SelectType::Checkbox });
        s.text = Some(possible.to_string());
        s.display_mode = mode;
        s
    }

    fn opts(textile: bool, value_only: bool) -> RenderOptions {
        RenderOptions {
            textile,
            value_only,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_text_field_rich() {
        let mut values = ValueMap::new();
        values.set_text(1, "High");
        let s = section(1, "Priority", SectionVariant::TextField);
        assert_eq!(render_section(&s, &values, &opts(true, false)), "\n*Priority :* High\n");
        assert_eq!(render_section(&s, &values, &opts(false, false)), "Priority : High");
        assert_eq!(render_section(&s, &values, &opts(true, true)), "High\n");
    }

    #[test]
    fn test_text_area_splits_title_and_body() {
        let mut values = ValueMap::new();
        values.set_text(2, "Check this");
        let s = section(2, "Notes", SectionVariant::TextArea);
        assert_eq!(render_section(&s, &values, &opts(false, false)), "Notes : Check this");
        assert_eq!(
            render_section(&s, &values, &opts(true, false)),
            "\n*Notes :* \nCheck this\n"
        );
        assert_eq!(render_section(&s, &values, &opts(false, true)), "Check this");
    }

    #[test]
    fn test_text_area_title_segment_has_no_value() {
        let mut values = ValueMap::new();
        values.set_text(2, "Check this");
        let s = section(2, "Notes", SectionVariant::TextArea);
        let markup = Markup { textile: false };
        let rendered = render_section(&s, &values, &opts(false, false));
        assert_eq!(rendered, markup.title("Notes", "") + &markup.entry("Check this"));
        assert!(rendered.starts_with("Notes : "));
    }

    #[test]
    fn test_placeholder_and_missing_values() {
        let mut values = ValueMap::new();
        values.set_text(3, "");
        values.set_empty_value(3, "n/a");
        let field = section(3, "Version", SectionVariant::TextField);
        assert_eq!(render_section(&field, &values, &opts(false, false)), "Version : n/a");
        let date = section(4, "Due", SectionVariant::Date { select_type: DateType::Date });
        assert_eq!(render_section(&date, &values, &opts(true, false)), "\n*Due :* \n");
    }

    #[test]
    fn test_date_value_passes_through() {
        let mut values = ValueMap::new();
        values.set_text(4, "01/01/2020");
        let date = section(4, "Due", SectionVariant::Date { select_type: DateType::Datetime });
        assert_eq!(render_section(&date, &values, &opts(false, false)), "Due : 01/01/2020");
    }

    #[test]
    fn test_checkbox_yes_no() {
        let mut values = ValueMap::new();
        values.set_text(5, "1");
        let s = section(5, "Reproducible", SectionVariant::Checkbox);
        assert_eq!(render_section(&s, &values, &opts(true, false)), "\n*Reproducible :* Yes\n");
        values.set_text(5, "0");
        assert_eq!(render_section(&s, &values, &opts(false, true)), "No");
        let empty = ValueMap::new();
        assert_eq!(render_section(&s, &empty, &opts(false, false)), "Reproducible : No");
    }

    #[test]
    fn test_custom_boolean_labels() {
        let mut values = ValueMap::new();
        values.set_text(5, "1");
        let s = section(5, "Reproductible", SectionVariant::Checkbox);
        let o = RenderOptions {
            textile: false,
            value_only: false,
            labels: BooleanLabels { yes: "Oui".to_string(), no: "Non".to_string() },
        };
        assert_eq!(render_section(&s, &values, &o), "Reproductible : Oui");
    }

    #[test]
    fn test_radio_and_monovalue_render_like_text_field() {
        let mut values = ValueMap::new();
        values.set_text(6, "Linux");
        for select_type in [SelectType::Radio, SelectType::MonovalueSelect] {
            let s = section(6, "OS", SectionVariant::Select { select_type });
            assert_eq!(render_section(&s, &values, &opts(true, false)), "\n*OS :* Linux\n");
            assert_eq!(render_section(&s, &values, &opts(false, true)), "Linux");
        }
    }

    #[test]
    fn test_multivalue_select_uses_submission_order() {
        let mut values = ValueMap::new();
        values.set_list(7, vec!["X".to_string(), "Y".to_string()]);
        let mut s = section(7, "Tags", SectionVariant::Select { select_type: SelectType::MultivalueSelect });
        s.text = Some("Y;X;Z".to_string());
        s.display_mode = DisplayMode::SelectedValuesOnly;
        assert_eq!(render_section(&s, &values, &opts(true, true)), "* X\n* Y\n");
        assert_eq!(render_section(&s, &values, &opts(true, false)), "\n*Tags :* \n* X\n* Y\n");
        assert_eq!(render_section(&s, &values, &opts(false, true)), "XY");
    }

    #[test]
    fn test_checkbox_set_pads_missing_flags_with_no() {
        let mut values = ValueMap::new();
        values.set_list(8, vec!["1".to_string(), "0".to_string()]);
        let s = checkbox_set(8, "A;B;C", DisplayMode::AllValues);
        assert_eq!(
            render_section(&s, &values, &opts(true, false)),
            "\n*Browsers :* \n* A : Yes\n* B : No\n* C : No\n"
        );
    }

    #[test]
    fn test_checkbox_set_selected_only_drops_unchecked() {
        let mut values = ValueMap::new();
        values.set_list(8, vec!["0".to_string(), "1".to_string()]);
        let s = checkbox_set(8, "A;B;C", DisplayMode::SelectedValuesOnly);
        assert_eq!(render_section(&s, &values, &opts(true, true)), "* B : Yes\n");
        assert_eq!(render_section(&s, &values, &opts(false, true)), "B : Yes");
    }

    #[test]
    fn test_checkbox_set_modes_over_many_shapes() {
        for n in 1..6usize {
            let possible: Vec<String> = (0..n).map(|i| format!("V{i}")).collect();
            for m in 0..=n {
                let flags: Vec<String> = (0..m).map(|i| if i % 2 == 0 { "1" } else { "0" }.to_string()).collect();
                let mut values = ValueMap::new();
                values.set_list(1, flags.clone());

                let all = checkbox_set(1, &possible.join(";"), DisplayMode::AllValues);
                let out = render_section(&all, &values, &opts(true, true));
                assert_eq!(out.lines().count(), n);

                let selected = checkbox_set(1, &possible.join(";"), DisplayMode::SelectedValuesOnly);
                let out = render_section(&selected, &values, &opts(true, true));
                assert!(!out.contains(": No"));
                let checked = flags.iter().filter(|f| f.as_str() == "1").count();
                assert_eq!(out.lines().count(), checked);
            }
        }
    }

    #[test]
    fn test_checkbox_set_trailing_separator_adds_no_item() {
        let mut values = ValueMap::new();
        values.set_list(8, vec!["1".to_string(), "0".to_string()]);
        let s = checkbox_set(8, "A;B;", DisplayMode::AllValues);
        assert_eq!(render_section(&s, &values, &opts(true, true)), "* A : Yes\n* B : No\n");
    }

    #[test]
    fn test_item_has_no_trailing_space() {
        let rich = Markup { textile: true };
        let plain = Markup { textile: false };
        assert_eq!(rich.item("A", Some("Yes")), "* A : Yes\n");
        assert_eq!(plain.item("A", Some("Yes")), "A : Yes");
        assert_eq!(rich.item("A", None), "* A\n");
    }

    #[test]
    fn test_checkbox_set_extra_flags_are_ignored() {
        let mut values = ValueMap::new();
        values.set_list(8, vec!["1".to_string(), "1".to_string(), "1".to_string()]);
        let s = checkbox_set(8, "A", DisplayMode::AllValues);
        assert_eq!(render_section(&s, &values, &opts(false, true)), "A : Yes");
    }

    #[test]
    fn test_instruction_renders_nothing() {
        let mut values = ValueMap::new();
        values.set_text(9, "anything");
        let mut s = section(9, "Read me", SectionVariant::Instruction { instruction_type: InstructionType::Warning });
        s.text = Some("Describe the steps precisely".to_string());
        assert_eq!(render_section(&s, &values, &opts(true, false)), "");
        assert_eq!(render_section(&s, &values, &opts(false, true)), "");
    }

    #[test]
    fn test_value_only_never_contains_title() {
        let mut values = ValueMap::new();
        for id in 1..=8 {
            values.set_list(id, vec!["1".to_string(), "v".to_string()]);
        }
        let variants = [
            SectionVariant::TextField,
            SectionVariant::Checkbox,
            SectionVariant::TextArea,
            SectionVariant::Date { select_type: DateType::Date },
            SectionVariant::Select { select_type: SelectType::Radio },
            SectionVariant::Select { select_type: SelectType::MultivalueSelect },
            SectionVariant::Select { select_type: SelectType::Checkbox },
            SectionVariant::Instruction { instruction_type: InstructionType::Note },
        ];
        for (i, variant) in variants.into_iter().enumerate() {
            let mut s = section(i as u64 + 1, "UniqueTitleMarker", variant);
            s.text = Some("A;B".to_string());
            for textile in [true, false] {
                let out = render_section(&s, &values, &opts(textile, true));
                assert!(!out.contains("UniqueTitleMarker"), "{:?} leaked its title", variant);
            }
        }
    }
}
