// SPDX-License-Identifier: Apache-2.0

//! PNG plots of waveform traces.

mod backend;
mod glyphs;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fmt::{Display, Formatter};
use wavescope_core::{format_clock_label, format_iso};
use wavescope_model::{TimeWindow, Waveform};

use backend::{glyph_scale, text_extent, GlyphBackend};

pub const PLOT_SIZE: (u32, u32) = (1495, 845);
pub const PLACEHOLDER_SIZE: (u32, u32) = (780, 260);
pub const PLACEHOLDER_TEXT: &str = "No waveforms in this window";
pub const LEGEND_TITLE: &str = "Time (hh:mm:ss.ffffff)";

const FONT: &str = "sans-serif";
const LEGEND_ROW: u32 = 16;
const LEGEND_HEADER: u32 = 26;
const LEGEND_PAD: u32 = 12;
const SWATCH: i32 = 20;

const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError(pub String);

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RenderError {}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        Self(format!("draw failed: {e}"))
    }
}

#[must_use]
pub fn plot_title(window: &TimeWindow) -> String {
    format!(
        "Waveforms ({} -> {})",
        format_iso(&window.start()),
        format_iso(&window.end())
    )
}

#[must_use]
pub fn legend_columns(traces: usize) -> usize {
    (traces / 10).clamp(1, 6)
}

/// Plot `traces` stacked by `i * yoffset`; an empty input gives the
/// placeholder image.
pub fn render_waveforms(
    traces: &[Waveform],
    title: &str,
    yoffset: f64,
) -> Result<Vec<u8>, RenderError> {
    if traces.is_empty() {
        return render_placeholder();
    }
    let (width, plot_height) = PLOT_SIZE;
    let columns = legend_columns(traces.len());
    let rows = traces.len().div_ceil(columns) as u32;
    let legend_height = LEGEND_PAD * 2 + LEGEND_HEADER + rows * LEGEND_ROW;
    let height = plot_height + legend_height;

    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = GlyphBackend::new(BitMapBackend::with_buffer(&mut pixels, (width, height)))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let (plot_area, legend_area) = root.split_vertically(plot_height);

        let (x_max, y_range) = axis_ranges(traces, yoffset);
        let mut chart = ChartBuilder::on(&plot_area)
            .caption(title, (FONT, 24))
            .margin(18)
            .x_label_area_size(54)
            .y_label_area_size(84)
            .build_cartesian_2d(0f64..x_max, y_range)?;
        chart
            .configure_mesh()
            .x_desc("Sample index")
            .y_desc("Amplitude")
            .label_style((FONT, 13))
            .axis_desc_style((FONT, 16))
            .bold_line_style(BLACK.mix(0.18))
            .light_line_style(BLACK.mix(0.06))
            .draw()?;

        for (i, trace) in traces.iter().enumerate() {
            let offset = i as f64 * yoffset;
            let color = PALETTE[i % PALETTE.len()];
            chart.draw_series(LineSeries::new(
                trace
                    .samples
                    .iter()
                    .enumerate()
                    .map(|(x, &y)| (x as f64, y as f64 + offset)),
                color.stroke_width(1),
            ))?;
        }

        let (x_pixels, y_pixels) = chart.plotting_area().get_pixel_range();
        root.draw(&Text::new(
            format!("{} waveform(s)", traces.len()),
            (x_pixels.start + 10, y_pixels.start + 10),
            (FONT, 14),
        ))?;

        draw_legend(&legend_area, traces, columns)?;
        root.present()?;
    }
    encode_png(&pixels, width, height)
}

/// Small image stating that the window holds no waveforms.
pub fn render_placeholder() -> Result<Vec<u8>, RenderError> {
    let (width, height) = PLACEHOLDER_SIZE;
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = GlyphBackend::new(BitMapBackend::with_buffer(&mut pixels, (width, height)))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let style = TextStyle::from((FONT, 20).into_font()).pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(
            PLACEHOLDER_TEXT,
            ((width / 2) as i32, (height / 2) as i32),
            style,
        ))?;
        root.present()?;
    }
    encode_png(&pixels, width, height)
}

fn axis_ranges(traces: &[Waveform], yoffset: f64) -> (f64, std::ops::Range<f64>) {
    let longest = traces.iter().map(|t| t.samples.len()).max().unwrap_or(0);
    let x_max = longest.saturating_sub(1).max(1) as f64;

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for (i, trace) in traces.iter().enumerate() {
        let offset = i as f64 * yoffset;
        for &y in &trace.samples {
            let v = y as f64 + offset;
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (x_max, 0.0..1.0);
    }
    if hi - lo < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    (x_max, (lo - pad)..(hi + pad))
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    traces: &[Waveform],
    columns: usize,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (width, _) = area.dim_in_pixel();
    let label_scale = glyph_scale(12.0);
    let (label_width, _) = text_extent("00:00:00.000000", label_scale);
    let cell = SWATCH + 6 + label_width + 24;
    let total = cell * columns as i32;
    let left = ((width as i32 - total) / 2).max(0);

    let (title_width, _) = text_extent(LEGEND_TITLE, glyph_scale(14.0));
    area.draw(&Text::new(
        LEGEND_TITLE,
        (((width as i32) - title_width) / 2, LEGEND_PAD as i32),
        (FONT, 14),
    ))?;

    let top = (LEGEND_PAD + LEGEND_HEADER) as i32;
    for (i, trace) in traces.iter().enumerate() {
        let row = (i / columns) as i32;
        let col = (i % columns) as i32;
        let x = left + col * cell;
        let y = top + row * LEGEND_ROW as i32;
        let color = PALETTE[i % PALETTE.len()];
        area.draw(&PathElement::new(
            vec![(x, y + 3), (x + SWATCH, y + 3)],
            color.stroke_width(2),
        ))?;
        area.draw(&Text::new(
            format_clock_label(&trace.time),
            (x + SWATCH + 6, y),
            (FONT, 12),
        ))?;
    }
    Ok(())
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RenderError(format!("png header failed: {e}")))?;
        writer
            .write_image_data(rgb)
            .map_err(|e| RenderError(format!("png encode failed: {e}")))?;
        writer
            .finish()
            .map_err(|e| RenderError(format!("png finish failed: {e}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    fn png_size(bytes: &[u8]) -> (u32, u32) {
        let w = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let h = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        (w, h)
    }

    fn trace(second: u32, samples: Vec<i64>) -> Waveform {
        let time = NaiveDate::from_ymd_opt(2025, 9, 8)
            .and_then(|d| d.and_hms_micro_opt(12, 0, second, 250))
            .expect("time");
        Waveform { time, samples }
    }

    #[test]
    fn empty_input_renders_placeholder() {
        let bytes = render_waveforms(&[], "Waveforms", 0.0).expect("png");
        assert_eq!(bytes[..8], PNG_MAGIC);
        assert_eq!(png_size(&bytes), PLACEHOLDER_SIZE);
    }

    #[test]
    fn traces_render_with_legend_below_plot() {
        let traces: Vec<Waveform> = (0..25)
            .map(|i| trace(i, vec![0, 10, 400, 120, i64::from(i)]))
            .collect();
        let bytes = render_waveforms(&traces, "Waveforms (a -> b)", 50.0).expect("png");
        assert_eq!(bytes[..8], PNG_MAGIC);
        let (w, h) = png_size(&bytes);
        assert_eq!(w, PLOT_SIZE.0);
        // 25 traces in 2 columns need 13 legend rows.
        assert_eq!(h, PLOT_SIZE.1 + LEGEND_PAD * 2 + LEGEND_HEADER + 13 * LEGEND_ROW);
    }

    #[test]
    fn flat_and_empty_traces_still_render() {
        let traces = vec![trace(1, vec![5, 5, 5]), trace(2, Vec::new())];
        assert!(render_waveforms(&traces, "flat", 0.0).is_ok());
    }

    #[test]
    fn legend_columns_follow_trace_count() {
        assert_eq!(legend_columns(1), 1);
        assert_eq!(legend_columns(19), 1);
        assert_eq!(legend_columns(25), 2);
        assert_eq!(legend_columns(500), 6);
    }

    #[test]
    fn axis_ranges_include_offsets() {
        let traces = vec![trace(1, vec![0, 10]), trace(2, vec![0, 10])];
        let (x_max, y) = axis_ranges(&traces, 100.0);
        assert_eq!(x_max, 1.0);
        assert!(y.start < 0.0 && y.end > 110.0);
    }

    #[test]
    fn title_uses_iso_bounds() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 8)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .expect("start");
        let end = NaiveDate::from_ymd_opt(2025, 9, 8)
            .and_then(|d| d.and_hms_micro_opt(13, 0, 0, 500))
            .expect("end");
        let window = TimeWindow::new(start, end).expect("window");
        assert_eq!(
            plot_title(&window),
            "Waveforms (2025-09-08T12:00:00 -> 2025-09-08T13:00:00.000500)"
        );
    }
}
