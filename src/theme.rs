//! Colours for piece ids and UI chrome; optional btop-style theme file.

use crate::piece::Shape;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Block colours for piece ids 1..=7 (index = id - 1).
    pub blocks: [Color; 7],
    /// Field background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Body text.
    pub main_fg: Color,
    /// Titles and labels.
    pub title: Color,
    /// Highest score.
    pub accent: Color,
    /// Game over banner.
    pub alert: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Default block colours: cyan, orange, blue, yellow, green, pink, red.
const DEFAULT_BLOCKS: [(u8, u8, u8); 7] = [
    (0x56, 0xB6, 0xC2),
    (0xD1, 0x9A, 0x66),
    (0x61, 0xAF, 0xEF),
    (0xE5, 0xC0, 0x7B),
    (0x98, 0xC3, 0x79),
    (0xF5, 0xA9, 0xD0),
    (0xE0, 0x6C, 0x75),
];

const HIGH_CONTRAST_BLOCKS: [(u8, u8, u8); 7] = [
    (0x00, 0xFF, 0xFF),
    (0xFF, 0x88, 0x00),
    (0x00, 0x66, 0xFF),
    (0xFF, 0xFF, 0x00),
    (0x00, 0xFF, 0x00),
    (0xFF, 0x66, 0xCC),
    (0xFF, 0x00, 0x00),
];

/// Paul Tol's bright scheme plus grey, avoiding red/green pairs.
const COLORBLIND_BLOCKS: [(u8, u8, u8); 7] = [
    (0x66, 0xCC, 0xEE),
    (0xEE, 0x77, 0x33),
    (0x44, 0x77, 0xAA),
    (0xCC, 0xBB, 0x44),
    (0x22, 0x88, 0x33),
    (0xAA, 0x33, 0x77),
    (0xBB, 0xBB, 0xBB),
];

/// Theme keys read per piece id; the first is ours, the rest are btop keys.
const BLOCK_KEYS: [&[&str]; 7] = [
    &["block_i", "hi_fg", "proc_misc"],
    &["block_j", "cpu_mid"],
    &["block_l", "cpu_box"],
    &["block_o", "title"],
    &["block_s", "mem_box", "cpu_start"],
    &["block_t", "net_box"],
    &["block_z", "cpu_end", "temp_end"],
];

const fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

const fn rgb_all(table: [(u8, u8, u8); 7]) -> [Color; 7] {
    [
        rgb(table[0]),
        rgb(table[1]),
        rgb(table[2]),
        rgb(table[3]),
        rgb(table[4]),
        rgb(table[5]),
        rgb(table[6]),
    ]
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            blocks: rgb_all(DEFAULT_BLOCKS),
            bg: Color::Rgb(0x28, 0x2C, 0x34),
            div_line: Color::Rgb(0xAB, 0xB2, 0xBF),
            main_fg: Color::Rgb(0xDC, 0xDF, 0xE4),
            title: Color::Rgb(0xAB, 0xB2, 0xBF),
            accent: Color::Rgb(0xFF, 0xD7, 0x00),
            alert: Color::Rgb(0xE0, 0x6C, 0x75),
        }
    }
}

impl Theme {
    /// Loads `path` if given, otherwise the defaults; then applies `palette`.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&text))?
            }
            None => Self::default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.blocks = rgb_all(HIGH_CONTRAST_BLOCKS);
                self.bg = Color::Black;
                self.main_fg = Color::White;
            }
            crate::Palette::Colorblind => self.blocks = rgb_all(COLORBLIND_BLOCKS),
        }
    }

    /// Missing keys keep their default; a present but malformed colour is an error.
    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let lookup = |keys: &[&str]| -> Result<Option<Color>, ThemeError> {
            keys.iter()
                .find_map(|k| map.get(*k))
                .map(|v| parse_hex(v))
                .transpose()
        };
        let mut theme = Self::default();
        for (slot, keys) in theme.blocks.iter_mut().zip(BLOCK_KEYS) {
            if let Some(c) = lookup(keys)? {
                *slot = c;
            }
        }
        let chrome: [(&mut Color, &[&str]); 6] = [
            (&mut theme.bg, &["main_bg", "meter_bg"]),
            (&mut theme.div_line, &["div_line"]),
            (&mut theme.main_fg, &["main_fg"]),
            (&mut theme.title, &["title"]),
            (&mut theme.accent, &["accent", "selected_bg"]),
            (&mut theme.alert, &["alert", "temp_end"]),
        ];
        for (slot, keys) in chrome {
            if let Some(c) = lookup(keys)? {
                *slot = c;
            }
        }
        Ok(theme)
    }

    /// Colour for a grid cell; `None` for empty (0) or unknown ids.
    #[inline]
    pub fn block_color(&self, id: u8) -> Option<Color> {
        let shape = Shape::from_id(id).ok()?;
        self.blocks.get(usize::from(shape.id() - 1)).copied()
    }
}

/// Collects `theme[key]="value"` lines; comments and blank lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let rest = l.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'').trim();
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parses `#RRGGBB` or `#RGB`.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let hex = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(invalid)
    };
    match hex.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_long_and_short() {
        assert!(matches!(parse_hex("#98C379"), Ok(Color::Rgb(0x98, 0xC3, 0x79))));
        assert!(matches!(parse_hex("#FFF"), Ok(Color::Rgb(255, 255, 255))));
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GG0000"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn theme_lines() {
        let map = parse_theme_file(
            "# comment\ntheme[main_bg]=\"#101010\"\n theme[block_t] = '#ff00ff'\nnoise\ntheme[empty]=\"\"",
        );
        assert_eq!(map.get("main_bg").map(String::as_str), Some("#101010"));
        assert_eq!(map.get("block_t").map(String::as_str), Some("#ff00ff"));
        assert!(!map.contains_key("empty"));
    }

    #[test]
    fn block_keys_fall_back_to_btop_names() {
        let map = parse_theme_file("theme[net_box]=\"#010203\"\ntheme[block_i]=\"#0A0B0C\"");
        let theme = Theme::from_map(&map).unwrap();
        assert_eq!(theme.block_color(6), Some(Color::Rgb(1, 2, 3)));
        assert_eq!(theme.block_color(1), Some(Color::Rgb(10, 11, 12)));
        assert_eq!(theme.block_color(2), Some(rgb(DEFAULT_BLOCKS[1])));
    }

    #[test]
    fn bad_colour_in_file_is_error() {
        let map = parse_theme_file("theme[div_line]=\"#zz\"");
        assert!(Theme::from_map(&map).is_err());
    }

    #[test]
    fn empty_and_unknown_ids_have_no_colour() {
        let theme = Theme::default();
        assert_eq!(theme.block_color(0), None);
        assert_eq!(theme.block_color(8), None);
        assert!(theme.block_color(7).is_some());
    }
}
