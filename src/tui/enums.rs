//! Enumerations for TUI state management.

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    Outline,
    EditValue,
    Help,
}

/// One line of the outline pane.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum OutlineRow {
    Group { id: u64 },
    Section { group_id: u64, id: u64 },
}

/// How the edit prompt interprets what was typed.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum ValueShape {
    /// Stored as a single text.
    Text,
    /// `;`-separated, stored as a list.
    List,
    /// `;`-separated booleans (`1` checked) for a checkbox set.
    Flags,
    /// Not editable.
    None,
}

impl ValueShape {
    pub fn hint(self) -> &'static str {
        match self {
            ValueShape::Text => "Type a value",
            ValueShape::List => "Values separated by ';'",
            ValueShape::Flags => "One 1/0 per option, separated by ';' (e.g. 1;0;1)",
            ValueShape::None => "",
        }
    }
}
