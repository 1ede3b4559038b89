use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for resource output: status lines plus the parts of a resource
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    /// Attribute names and info labels
    pub attribute: Style,
    pub class: Style,
    pub id: Style,
    pub muted: Style,
}

impl Theme {
    /// Colored when stdout is a terminal and colors are not switched off
    /// (`NO_COLOR`, `CLICOLOR=0`)
    pub fn detect() -> Self {
        Self::new(console::Term::stdout().is_term() && console::colors_enabled())
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow()),
            attribute: pick(Style::new().magenta()),
            class: pick(Style::new().blue().italic()),
            id: pick(Style::new().bold()),
            muted: pick(Style::new().bright_black()),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let theme = Theme::new(false);
        assert_eq!("person".style(theme.class).to_string(), "person");
        assert_ne!("person".style(Theme::new(true).class).to_string(), "person");
    }
}
