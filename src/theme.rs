use std::fs;
use std::path::Path;

use ratatui::style::Color;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Theme {
    pub transcript_bg: Color,
    pub chat_bg: Color,
    pub results_bg: Color,
    pub input_bg: Color,
    pub status_bg: Color,
    pub text_fg: Color,
    pub muted_fg: Color,
    pub active_fg: Color,
    pub accent_fg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            transcript_bg: Color::Rgb(40, 42, 46),
            chat_bg: Color::Rgb(50, 52, 56),
            results_bg: Color::Rgb(44, 46, 50),
            input_bg: Color::Rgb(58, 60, 64),
            status_bg: Color::Rgb(32, 34, 38),
            text_fg: Color::Rgb(222, 222, 222),
            muted_fg: Color::Rgb(170, 175, 180),
            active_fg: Color::Rgb(255, 255, 255),
            accent_fg: Color::Rgb(130, 200, 160),
        }
    }
}

impl Theme {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(theme) => theme,
                Err(err) => {
                    eprintln!(
                        "Failed to parse theme file '{}': {err}. Using defaults.",
                        path_ref.display()
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let cfg: ThemeToml = toml::from_str(s)?;
        Ok(Self {
            transcript_bg: cfg.colors.transcript_bg.to_color(),
            chat_bg: cfg.colors.chat_bg.to_color(),
            results_bg: cfg.colors.results_bg.to_color(),
            input_bg: cfg.colors.input_bg.to_color(),
            status_bg: cfg.colors.status_bg.to_color(),
            text_fg: cfg.colors.text_fg.to_color(),
            muted_fg: cfg.colors.muted_fg.to_color(),
            active_fg: cfg.colors.active_fg.to_color(),
            accent_fg: cfg.colors.accent_fg.to_color(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ThemeToml {
    colors: ThemeColorsToml,
}

#[derive(Debug, Deserialize)]
struct ThemeColorsToml {
    transcript_bg: RgbToml,
    chat_bg: RgbToml,
    results_bg: RgbToml,
    input_bg: RgbToml,
    status_bg: RgbToml,
    text_fg: RgbToml,
    muted_fg: RgbToml,
    active_fg: RgbToml,
    accent_fg: RgbToml,
}

#[derive(Debug, Deserialize)]
struct RgbToml {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbToml {
    fn to_color(&self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}
