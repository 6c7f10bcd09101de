//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::{InstructionType, SectionKind};

/// Group rows and the status bar
pub const DARK_GREEN: Color = Color::Rgb(0, 80, 0);
/// Instruction warnings
pub const GOLD: Color = Color::Rgb(255, 215, 0);
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);
pub const DARK_PURPLE: Color = Color::Rgb(86, 60, 92);

/// Accent for a section kind in the outline.
pub fn kind_color(kind: SectionKind) -> Color {
    match kind {
        SectionKind::TextField | SectionKind::TextArea => Color::White,
        SectionKind::Checkbox | SectionKind::Select => Color::Cyan,
        SectionKind::Date => Color::LightBlue,
        SectionKind::Instruction => DARK_PURPLE,
    }
}

pub fn instruction_color(t: InstructionType) -> Color {
    match t {
        InstructionType::Info | InstructionType::Note => Color::Gray,
        InstructionType::Warning => GOLD,
        InstructionType::Comment => DARK_PURPLE,
    }
}
