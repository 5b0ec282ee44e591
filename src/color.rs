//! Pixel colours and the palettes pieces are drawn from.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelColor {
    Green,
    Yellow,
    Red,
    Blue,
    Magenta,
    Cyan,
}

impl PixelColor {
    /// Classic 4-colour palette (red, blue, yellow, green).
    pub const STANDARD: [Self; 4] = [Self::Red, Self::Blue, Self::Yellow, Self::Green];

    /// High-colour palette: all six.
    pub const EXTENDED: [Self; 6] = [
        Self::Green,
        Self::Yellow,
        Self::Red,
        Self::Blue,
        Self::Magenta,
        Self::Cyan,
    ];

    pub const COUNT: usize = 6;

    /// Stable index 0..=5; part of the layout checksum, never reorder.
    #[inline]
    pub const fn index(self) -> u8 {
        match self {
            Self::Green => 0,
            Self::Yellow => 1,
            Self::Red => 2,
            Self::Blue => 3,
            Self::Magenta => 4,
            Self::Cyan => 5,
        }
    }

    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Green),
            1 => Some(Self::Yellow),
            2 => Some(Self::Red),
            3 => Some(Self::Blue),
            4 => Some(Self::Magenta),
            5 => Some(Self::Cyan),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
        }
    }

    /// Palette for unseeded play.
    pub fn palette(high_color: bool) -> &'static [Self] {
        if high_color {
            &Self::EXTENDED
        } else {
            &Self::STANDARD
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for c in PixelColor::EXTENDED {
            assert_eq!(PixelColor::from_index(c.index()), Some(c));
        }
        assert_eq!(PixelColor::from_index(6), None);
    }

    #[test]
    fn test_palette_sizes() {
        assert_eq!(PixelColor::palette(false).len(), 4);
        assert_eq!(PixelColor::palette(true).len(), 6);
    }
}
