// SPDX-License-Identifier: Apache-2.0

//! 5x7 bitmap font. Letters render as capitals.

pub(crate) const GLYPH_HEIGHT: usize = 7;
pub(crate) const SPACE_WIDTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Glyph {
    pub width: u8,
    /// Top row first; bit `width - 1` is the leftmost column.
    pub rows: [u8; GLYPH_HEIGHT],
}

impl Glyph {
    const fn new(width: u8, rows: [u8; GLYPH_HEIGHT]) -> Self {
        Self { width, rows }
    }

    #[must_use]
    pub fn is_set(&self, row: usize, col: u8) -> bool {
        self.rows
            .get(row)
            .is_some_and(|bits| bits & (1 << (self.width - 1 - col)) != 0)
    }
}

#[must_use]
pub(crate) fn glyph(ch: char) -> Option<Glyph> {
    Some(match ch.to_ascii_uppercase() {
        'A' => Glyph::new(5, [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'B' => Glyph::new(5, [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
        'C' => Glyph::new(5, [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
        'D' => Glyph::new(5, [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100]),
        'E' => Glyph::new(5, [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111]),
        'F' => Glyph::new(5, [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000]),
        'G' => Glyph::new(5, [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
        'H' => Glyph::new(5, [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'I' => Glyph::new(3, [0b111, 0b010, 0b010, 0b010, 0b010, 0b010, 0b111]),
        'J' => Glyph::new(5, [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100]),
        'K' => Glyph::new(5, [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
        'L' => Glyph::new(5, [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
        'M' => Glyph::new(5, [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
        'N' => Glyph::new(5, [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001]),
        'O' => Glyph::new(5, [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'P' => Glyph::new(5, [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
        'Q' => Glyph::new(5, [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
        'R' => Glyph::new(5, [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
        'S' => Glyph::new(5, [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110]),
        'T' => Glyph::new(5, [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
        'U' => Glyph::new(5, [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'V' => Glyph::new(5, [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
        'W' => Glyph::new(5, [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
        'X' => Glyph::new(5, [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
        'Y' => Glyph::new(5, [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100]),
        'Z' => Glyph::new(5, [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
        '0' => Glyph::new(5, [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
        '1' => Glyph::new(5, [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        '2' => Glyph::new(5, [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
        '3' => Glyph::new(5, [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110]),
        '4' => Glyph::new(5, [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
        '5' => Glyph::new(5, [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
        '6' => Glyph::new(5, [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
        '7' => Glyph::new(5, [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
        '8' => Glyph::new(5, [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
        '9' => Glyph::new(5, [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
        '.' => Glyph::new(1, [0, 0, 0, 0, 0, 0, 1]),
        ':' => Glyph::new(1, [0, 0, 1, 0, 0, 1, 0]),
        ',' => Glyph::new(2, [0b00, 0b00, 0b00, 0b00, 0b00, 0b01, 0b10]),
        '-' => Glyph::new(3, [0b000, 0b000, 0b000, 0b111, 0b000, 0b000, 0b000]),
        '+' => Glyph::new(5, [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000]),
        '=' => Glyph::new(5, [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000]),
        '(' => Glyph::new(3, [0b001, 0b010, 0b100, 0b100, 0b100, 0b010, 0b001]),
        ')' => Glyph::new(3, [0b100, 0b010, 0b001, 0b001, 0b001, 0b010, 0b100]),
        '>' => Glyph::new(5, [0b10000, 0b01000, 0b00100, 0b00010, 0b00100, 0b01000, 0b10000]),
        '<' => Glyph::new(5, [0b00001, 0b00010, 0b00100, 0b01000, 0b00100, 0b00010, 0b00001]),
        '/' => Glyph::new(5, [0b00001, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000]),
        '_' => Glyph::new(5, [0, 0, 0, 0, 0, 0, 0b11111]),
        '%' => Glyph::new(5, [0b11001, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b10011]),
        _ => return None,
    })
}

/// Unscaled advance of `ch`, including the one-column gap.
#[must_use]
pub(crate) fn advance(ch: char) -> usize {
    glyph(ch).map_or(SPACE_WIDTH, |g| usize::from(g.width) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_row_fits_its_width() {
        let chars = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.:,-+=()<>/_%";
        for ch in chars.chars() {
            let g = glyph(ch).expect("glyph");
            for row in g.rows {
                assert!(u32::from(row) < (1 << g.width), "{ch} overflows");
            }
        }
    }

    #[test]
    fn lowercase_maps_to_capitals() {
        assert_eq!(glyph('w'), glyph('W'));
        assert!(glyph('w').is_some_and(|g| g.is_set(0, 0)));
    }

    #[test]
    fn unknown_characters_advance_like_space() {
        assert_eq!(glyph('\u{2192}'), None);
        assert_eq!(advance(' '), SPACE_WIDTH);
        assert_eq!(advance('.'), 2);
    }
}
