// SPDX-License-Identifier: AGPL-3.0-only

//! Log-log performance report
//!
//! One plot of time against dataset size, one curve per device, a legend in
//! the upper left and a text box with the run configuration at a chosen
//! [`Anchor`]. Rendering is a pure function of the results table, the
//! configuration and the options.

mod anchor;
mod axes;
mod style;
mod svg;

use std::path::Path;

use tracing::debug;

use crate::config::BenchmarkConfig;
use crate::error::{BenchError, Result};
use crate::results::ResultsTable;

pub use anchor::{Anchor, HAlign, Placement, VAlign, DEFAULT_MARGIN};
pub use axes::LogAxis;
pub use style::{BoxStyle, BoxStylePatch, Merge, TextBoxPatch, TextBoxStyle};

use svg::{Canvas, Stroke};

/// Name of the figure, also the default file stem
pub const FIGURE_NAME: &str = "benchmark-device";

/// Pixels per point at 100 dpi
const PX_PER_PT: f64 = 100.0 / 72.0;

/// Plot area margins in pixels: left, right, top, bottom
const MARGINS: (f64, f64, f64, f64) = (80.0, 20.0, 20.0, 56.0);

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const GRID_COLOR: &str = "#b0b0b0";

/// Rendering options
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Where the configuration text box goes
    pub anchor: Anchor,
    /// Overrides on top of the default text box style
    pub text_box: TextBoxPatch,
    /// Figure width in pixels
    pub width: f64,
    /// Figure height in pixels
    pub height: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            anchor: Anchor::LowerRight,
            text_box: TextBoxPatch::default(),
            width: 640.0,
            height: 480.0,
        }
    }
}

/// Rendered SVG document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Figure {
    name: String,
    svg: String,
}

impl Figure {
    /// Figure name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SVG source
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Write the SVG document to `path`.
    ///
    /// # Errors
    ///
    /// Returns `BenchError::Io` if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.svg).map_err(|e| BenchError::io(path, e))?;
        debug!("Saved {} to {}", self.name, path.display());
        Ok(())
    }
}

/// Plot area in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
struct Frame {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn new(width: f64, height: f64) -> Self {
        let (l, r, t, b) = MARGINS;
        Self {
            left: l,
            top: t,
            width: (width - l - r).max(1.0),
            height: (height - t - b).max(1.0),
        }
    }

    fn right(&self) -> f64 {
        self.left + self.width
    }

    fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Pixel position of an axes-fraction point, y pointing up
    fn at(&self, fx: f64, fy: f64) -> (f64, f64) {
        (self.left + fx * self.width, self.top + (1.0 - fy) * self.height)
    }
}

/// Text box geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TextBoxLayout {
    /// Text extents: left, top, width, height
    pub text: (f64, f64, f64, f64),
    /// Padding between text and box edge
    pub pad: f64,
    /// Line height
    pub line_height: f64,
}

fn layout_text_box(frame: &Frame, lines: &[&str], anchor: Anchor, style: &TextBoxStyle) -> TextBoxLayout {
    let font_px = style.font_size * PX_PER_PT;
    let line_height = 1.2 * font_px;
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (widest as f64 * 0.6 * font_px, lines.len() as f64 * line_height);

    let placement = anchor.placement(style.margin);
    let (ax, ay) = frame.at(placement.xy.0, placement.xy.1);
    let (px, py) = (ax + placement.offset.0 * PX_PER_PT, ay - placement.offset.1 * PX_PER_PT);

    let left = match placement.halign {
        HAlign::Left => px,
        HAlign::Center => px - w / 2.0,
        HAlign::Right => px - w,
    };
    let top = match placement.valign {
        VAlign::Top => py,
        VAlign::Center => py - h / 2.0,
        VAlign::Bottom => py - h,
    };
    TextBoxLayout {
        text: (left, top, w, h),
        pad: style.pad * font_px,
        line_height,
    }
}

/// Report renderer
pub struct Report;

impl Report {
    /// Render the table as a log-log plot annotated with `config`.
    pub fn render(table: &ResultsTable, config: &BenchmarkConfig, options: &ReportOptions) -> Figure {
        let frame = Frame::new(options.width, options.height);
        let series: Vec<(&str, Vec<(f64, f64)>)> = table
            .devices()
            .into_iter()
            .map(|device| {
                #[allow(clippy::cast_precision_loss)]
                let points = table
                    .series(device)
                    .into_iter()
                    .map(|(n, s)| (n as f64, s))
                    .filter(|&(_, s)| s.is_finite() && s > 0.0)
                    .collect();
                (device, points)
            })
            .collect();

        let x_axis = LogAxis::covering(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.0)));
        let y_axis = LogAxis::covering(series.iter().flat_map(|(_, pts)| pts.iter().map(|p| p.1)));

        let mut canvas = Canvas::new(options.width, options.height, FIGURE_NAME);
        draw_grid(&mut canvas, &frame, &x_axis, &y_axis);
        draw_axes(&mut canvas, &frame, &x_axis, &y_axis);

        for (i, (_, points)) in series.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let pixels: Vec<(f64, f64)> = points
                .iter()
                .map(|&(x, y)| frame.at(x_axis.fraction(x), y_axis.fraction(y)))
                .collect();
            canvas.polyline(&pixels, Stroke::solid(color, 1.5 * PX_PER_PT));
            for &(x, y) in &pixels {
                canvas.circle(x, y, 3.0, color);
            }
        }

        draw_legend(&mut canvas, &frame, &series);

        let style = TextBoxStyle::default().merged(options.text_box.clone());
        let text = config.annotation();
        let lines: Vec<&str> = text.lines().collect();
        draw_text_box(&mut canvas, &frame, &lines, options.anchor, &style);

        let svg = canvas.finish();
        debug!("Rendered {FIGURE_NAME}: {} series, {} bytes", series.len(), svg.len());
        Figure {
            name: FIGURE_NAME.to_string(),
            svg,
        }
    }
}

fn draw_grid(canvas: &mut Canvas, frame: &Frame, x_axis: &LogAxis, y_axis: &LogAxis) {
    let minor = Stroke::dashed(GRID_COLOR, 0.6, "1.0,1.65");
    let major = Stroke::dashed(GRID_COLOR, 0.8, "3.7,1.6");

    for v in x_axis.minor_ticks() {
        let (x, _) = frame.at(x_axis.fraction(v), 0.0);
        canvas.line(x, frame.top, x, frame.bottom(), minor);
    }
    for v in y_axis.minor_ticks() {
        let (_, y) = frame.at(0.0, y_axis.fraction(v));
        canvas.line(frame.left, y, frame.right(), y, minor);
    }
    for k in x_axis.major_ticks() {
        let (x, _) = frame.at(x_axis.fraction(10f64.powi(k)), 0.0);
        canvas.line(x, frame.top, x, frame.bottom(), major);
    }
    for k in y_axis.major_ticks() {
        let (_, y) = frame.at(0.0, y_axis.fraction(10f64.powi(k)));
        canvas.line(frame.left, y, frame.right(), y, major);
    }
}

fn draw_axes(canvas: &mut Canvas, frame: &Frame, x_axis: &LogAxis, y_axis: &LogAxis) {
    let black = Stroke::solid("black", 0.8);
    let font = 10.0 * PX_PER_PT;
    let (major_len, minor_len) = (3.5 * PX_PER_PT, 2.0 * PX_PER_PT);

    canvas.rect(
        frame.left,
        frame.top,
        frame.width,
        frame.height,
        "none",
        1.0,
        black,
        0.0,
    );

    for v in x_axis.minor_ticks() {
        let (x, _) = frame.at(x_axis.fraction(v), 0.0);
        canvas.line(x, frame.bottom(), x, frame.bottom() + minor_len, black);
    }
    for k in x_axis.major_ticks() {
        let (x, _) = frame.at(x_axis.fraction(10f64.powi(k)), 0.0);
        canvas.line(x, frame.bottom(), x, frame.bottom() + major_len, black);
        canvas.power_of_ten(x, frame.bottom() + major_len + font, k, "middle", font);
    }
    for v in y_axis.minor_ticks() {
        let (_, y) = frame.at(0.0, y_axis.fraction(v));
        canvas.line(frame.left - minor_len, y, frame.left, y, black);
    }
    for k in y_axis.major_ticks() {
        let (_, y) = frame.at(0.0, y_axis.fraction(10f64.powi(k)));
        canvas.line(frame.left - major_len, y, frame.left, y, black);
        canvas.power_of_ten(frame.left - major_len - 2.0, y + font * 0.35, k, "end", font);
    }

    let (cx, cy) = frame.at(0.5, 0.5);
    canvas.text(cx, frame.bottom() + major_len + 2.4 * font, "n", "middle", font, "");
    let label_x = frame.left - 3.6 * font;
    canvas.text(
        label_x,
        cy,
        "time (s)",
        "middle",
        font,
        &format!(" transform=\"rotate(-90 {label_x:.2} {cy:.2})\""),
    );
}

fn draw_legend(canvas: &mut Canvas, frame: &Frame, series: &[(&str, Vec<(f64, f64)>)]) {
    if series.is_empty() {
        return;
    }
    let font = 10.0 * PX_PER_PT;
    let row = 1.4 * font;
    let sample = 2.0 * font;
    let widest = series.iter().map(|(l, _)| l.chars().count()).max().unwrap_or(0);
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (
        sample + 1.2 * font + widest as f64 * 0.6 * font,
        series.len() as f64 * row + 0.6 * font,
    );
    let (x0, y0) = (frame.left + 8.0, frame.top + 8.0);

    canvas.rect(x0, y0, w, h, "white", 0.8, Stroke::solid("#ccc", 0.8), 0.3 * font);
    for (i, (label, _)) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        #[allow(clippy::cast_precision_loss)]
        let y = y0 + 0.3 * font + (i as f64 + 0.5) * row;
        let x = x0 + 0.4 * font;
        canvas.line(x, y, x + sample, y, Stroke::solid(color, 1.5 * PX_PER_PT));
        canvas.text(x + sample + 0.4 * font, y + 0.35 * font, label, "start", font, "");
    }
}

fn draw_text_box(canvas: &mut Canvas, frame: &Frame, lines: &[&str], anchor: Anchor, style: &TextBoxStyle) {
    let layout = layout_text_box(frame, lines, anchor, style);
    let (left, top, w, h) = layout.text;
    let pad = layout.pad;
    let radius = if style.bbox.rounded { pad } else { 0.0 };
    let font_px = style.font_size * PX_PER_PT;

    canvas.open_group("class=\"textbox\"");
    canvas.rect(
        left - pad,
        top - pad,
        w + 2.0 * pad,
        h + 2.0 * pad,
        &svg::escape(&style.bbox.facecolor),
        style.bbox.alpha,
        Stroke::solid(&svg::escape(&style.bbox.edgecolor), 0.8),
        radius,
    );
    let color = format!(" fill=\"{}\" font-family=\"monospace\"", svg::escape(&style.color));
    for (i, line) in lines.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let baseline = top + (i as f64 + 0.8) * layout.line_height;
        canvas.text(left, baseline, line, "start", font_px, &color);
    }
    canvas.close_group();
}
