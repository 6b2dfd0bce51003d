use colored::Color;
use feedgraph::PostStatus;
use once_cell::sync::Lazy;

/// Palette shared by status messages, help text and feed rendering.
pub struct ColorTheme {
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub primary: Color,
    pub secondary: Color,
    pub key: Color,
    pub value: Color,
    pub author: Color,
    pub draft: Color,
    pub published: Color,
}

impl ColorTheme {
    pub fn status(&self, status: PostStatus) -> Color {
        match status {
            PostStatus::Draft => self.draft,
            PostStatus::Published => self.published,
        }
    }
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
            highlight: Color::Cyan,
            muted: Color::BrightBlack,
            primary: Color::BrightBlue,
            secondary: Color::Magenta,
            key: Color::BrightCyan,
            value: Color::White,
            author: Color::BrightYellow,
            draft: Color::Yellow,
            published: Color::BrightGreen,
        }
    }
}

pub static THEME: Lazy<ColorTheme> = Lazy::new(ColorTheme::default);

pub struct Icons {
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
    pub arrow: &'static str,
    pub reply: &'static str,
    pub heart: &'static str,
    pub lock: &'static str,
    pub draft: &'static str,
    pub published: &'static str,
}

impl Icons {
    pub fn status(&self, status: PostStatus) -> &'static str {
        match status {
            PostStatus::Draft => self.draft,
            PostStatus::Published => self.published,
        }
    }
}

pub const ICONS: Icons = Icons {
    success: "✓",
    error: "✗",
    warning: "⚠",
    info: "ℹ",
    arrow: "→",
    reply: "↳",
    heart: "♥",
    lock: "🔒",
    draft: "✎",
    published: "●",
};
