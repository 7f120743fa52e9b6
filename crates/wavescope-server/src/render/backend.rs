// SPDX-License-Identifier: Apache-2.0

use plotters_backend::{
    text_anchor, BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend,
    DrawingErrorKind,
};

use super::glyphs::{advance, glyph, GLYPH_HEIGHT};

/// Forwards shapes to `inner` and draws all text with the built-in bitmap
/// font, so no system font is needed.
pub(crate) struct GlyphBackend<DB> {
    inner: DB,
}

impl<DB> GlyphBackend<DB> {
    pub(crate) fn new(inner: DB) -> Self {
        Self { inner }
    }
}

/// Pixel scale of the bitmap font for a requested point size.
#[must_use]
pub(crate) fn glyph_scale(size: f64) -> i32 {
    ((size / 9.0).round() as i32).max(1)
}

/// Width and height in pixels of `text` at `scale`.
#[must_use]
pub(crate) fn text_extent(text: &str, scale: i32) -> (i32, i32) {
    let columns: usize = text.chars().map(advance).sum();
    let width = (columns as i32 * scale - scale).max(0);
    (width, GLYPH_HEIGHT as i32 * scale)
}

impl<DB: DrawingBackend> DrawingBackend for GlyphBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        let color = style.color();
        if color.alpha == 0.0 || text.trim().is_empty() {
            return Ok(());
        }
        let scale = glyph_scale(style.size());
        let (width, height) = text_extent(text, scale);
        let anchor = style.anchor();
        let dx = match anchor.h_pos {
            text_anchor::HPos::Left => 0,
            text_anchor::HPos::Right => -width,
            text_anchor::HPos::Center => -width / 2,
        };
        let dy = match anchor.v_pos {
            text_anchor::VPos::Top => 0,
            text_anchor::VPos::Center => -height / 2,
            text_anchor::VPos::Bottom => -height,
        };
        let transform = style.transform();

        let mut cursor = 0;
        for ch in text.chars() {
            if let Some(g) = glyph(ch) {
                for row in 0..GLYPH_HEIGHT {
                    for col in 0..g.width {
                        if !g.is_set(row, col) {
                            continue;
                        }
                        let x = dx + cursor + i32::from(col) * scale;
                        let y = dy + row as i32 * scale;
                        for sx in 0..scale {
                            for sy in 0..scale {
                                let (tx, ty) = transform.transform(x + sx, y + sy);
                                self.inner.draw_pixel((pos.0 + tx, pos.1 + ty), color)?;
                            }
                        }
                    }
                }
            }
            cursor += advance(ch) as i32 * scale;
        }
        Ok(())
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        let (w, h) = text_extent(text, glyph_scale(style.size()));
        Ok((w.unsigned_abs(), h.unsigned_abs()))
    }
}
