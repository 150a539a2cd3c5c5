use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// What a piece of output means; the theme decides how it looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Heading,
    Passed,
    Failed,
    Warning,
    /// Field names in `label: value` lines
    Label,
    Muted,
    /// Benchmark, control, query and table ids
    Id,
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    colored: bool,
}

impl Theme {
    /// Colors follow `console`'s detection (tty, `NO_COLOR`, `CLICOLOR_FORCE`)
    pub fn detect() -> Self {
        Self {
            colored: console::colors_enabled(),
        }
    }

    pub fn plain() -> Self {
        Self { colored: false }
    }

    pub fn style(&self, role: Role) -> Style {
        if !self.colored {
            return Style::new();
        }
        match role {
            Role::Heading => Style::new().cyan().bold(),
            Role::Passed => Style::new().green().bold(),
            Role::Failed => Style::new().red().bold(),
            Role::Warning => Style::new().yellow().bold(),
            Role::Label => Style::new().white().dimmed(),
            Role::Muted => Style::new().bright_black(),
            Role::Id => Style::new().blue(),
        }
    }

    pub fn paint(&self, text: &str, role: Role) -> String {
        text.style(self.style(role)).to_string()
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
