//! Colors and palette resolution
//!
//! Cells store symbolic colors; everything leaving the core is resolved to
//! concrete RGB through a [`Palette`].

use serde::{Deserialize, Serialize};

/// A concrete 24-bit color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Symbolic color as set by SGR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    #[default]
    Default,
    /// One of the 16 ANSI colors (SGR 30-37, 90-97 and their backgrounds)
    Named(u8),
    /// 256-color palette entry (SGR 38;5;N)
    Indexed(u8),
    /// 24-bit color (SGR 38;2;R;G;B)
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Color = Color::Named(0);
    pub const RED: Color = Color::Named(1);
    pub const GREEN: Color = Color::Named(2);
    pub const YELLOW: Color = Color::Named(3);
    pub const BLUE: Color = Color::Named(4);
    pub const MAGENTA: Color = Color::Named(5);
    pub const CYAN: Color = Color::Named(6);
    pub const WHITE: Color = Color::Named(7);
}

/// Color table used to resolve [`Color`] to [`Rgb`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Default foreground color
    pub foreground: Rgb,
    /// Default background color
    pub background: Rgb,
    /// The 16 ANSI colors (0-15)
    pub ansi: [Rgb; 16],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            foreground: Rgb::new(229, 229, 229),
            background: Rgb::new(0, 0, 0),
            // xterm defaults
            ansi: [
                Rgb::new(0, 0, 0),
                Rgb::new(205, 0, 0),
                Rgb::new(0, 205, 0),
                Rgb::new(205, 205, 0),
                Rgb::new(0, 0, 238),
                Rgb::new(205, 0, 205),
                Rgb::new(0, 205, 205),
                Rgb::new(229, 229, 229),
                Rgb::new(127, 127, 127),
                Rgb::new(255, 0, 0),
                Rgb::new(0, 255, 0),
                Rgb::new(255, 255, 0),
                Rgb::new(92, 92, 255),
                Rgb::new(255, 0, 255),
                Rgb::new(0, 255, 255),
                Rgb::new(255, 255, 255),
            ],
        }
    }
}

impl Palette {
    /// RGB for a 256-color index
    pub fn indexed(&self, index: u8) -> Rgb {
        match index {
            0..=15 => self.ansi[index as usize],
            // 6x6x6 color cube
            16..=231 => {
                let n = index - 16;
                let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
                Rgb::new(level(n / 36), level((n / 6) % 6), level(n % 6))
            },
            // Grayscale ramp
            232..=255 => {
                let gray = 8 + (index - 232) * 10;
                Rgb::new(gray, gray, gray)
            },
        }
    }

    /// Resolve a symbolic color; `foreground` selects which default applies
    pub fn resolve(&self, color: Color, foreground: bool) -> Rgb {
        match color {
            Color::Default if foreground => self.foreground,
            Color::Default => self.background,
            Color::Named(i) => self.ansi[(i & 0x0F) as usize],
            Color::Indexed(i) => self.indexed(i),
            Color::Rgb(r, g, b) => Rgb::new(r, g, b),
        }
    }
}
