// SPDX-License-Identifier: AGPL-3.0-only

//! Minimal SVG writer
//!
//! Every coordinate is written with two decimals so that equal inputs give
//! byte-identical documents.

use std::fmt::Write as _;

/// Stroke of a line or shape outline
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stroke<'a> {
    pub color: &'a str,
    pub width: f64,
    pub dash: Option<&'a str>,
}

impl<'a> Stroke<'a> {
    pub const fn solid(color: &'a str, width: f64) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub const fn dashed(color: &'a str, width: f64, dash: &'a str) -> Self {
        Self {
            color,
            width,
            dash: Some(dash),
        }
    }

    fn attrs(&self) -> String {
        let mut s = format!("stroke=\"{}\" stroke-width=\"{:.2}\"", self.color, self.width);
        if let Some(dash) = self.dash {
            let _ = write!(s, " stroke-dasharray=\"{dash}\"");
        }
        s
    }
}

/// SVG document under construction
pub(crate) struct Canvas {
    buf: String,
}

impl Canvas {
    pub fn new(width: f64, height: f64, title: &str) -> Self {
        let mut buf = String::new();
        let _ = writeln!(
            buf,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" \
             viewBox=\"0 0 {width:.0} {height:.0}\" font-family=\"DejaVu Sans,Arial,sans-serif\">"
        );
        let _ = writeln!(buf, "<title>{}</title>", escape(title));
        let _ = writeln!(buf, "<rect width=\"{width:.0}\" height=\"{height:.0}\" fill=\"white\"/>");
        Self { buf }
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, stroke: Stroke<'_>) {
        let _ = writeln!(
            self.buf,
            "<line x1=\"{x1:.2}\" y1=\"{y1:.2}\" x2=\"{x2:.2}\" y2=\"{y2:.2}\" {}/>",
            stroke.attrs()
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn rect(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: &str,
        opacity: f64,
        stroke: Stroke<'_>,
        radius: f64,
    ) {
        let _ = writeln!(
            self.buf,
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"{radius:.2}\" \
             fill=\"{fill}\" opacity=\"{opacity:.2}\" {}/>",
            stroke.attrs()
        );
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: Stroke<'_>) {
        let mut pts = String::new();
        for (i, (x, y)) in points.iter().enumerate() {
            if i > 0 {
                pts.push(' ');
            }
            let _ = write!(pts, "{x:.2},{y:.2}");
        }
        let _ = writeln!(
            self.buf,
            "<polyline points=\"{pts}\" fill=\"none\" stroke-linejoin=\"round\" {}/>",
            stroke.attrs()
        );
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) {
        let _ = writeln!(
            self.buf,
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{fill}\"/>"
        );
    }

    /// Text; `anchor` is `start`, `middle` or `end`. `content` is escaped.
    pub fn text(&mut self, x: f64, y: f64, content: &str, anchor: &str, size: f64, extra: &str) {
        let _ = writeln!(
            self.buf,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-size=\"{size:.2}\"{extra}>{}</text>",
            escape(content)
        );
    }

    /// `10^exponent` with a superscript exponent
    pub fn power_of_ten(&mut self, x: f64, y: f64, exponent: i32, anchor: &str, size: f64) {
        let _ = writeln!(
            self.buf,
            "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"{anchor}\" font-size=\"{size:.2}\">10\
             <tspan baseline-shift=\"super\" font-size=\"{:.2}\">{exponent}</tspan></text>",
            size * 0.7
        );
    }

    pub fn open_group(&mut self, attrs: &str) {
        let _ = writeln!(self.buf, "<g {attrs}>");
    }

    pub fn close_group(&mut self) {
        self.buf.push_str("</g>\n");
    }

    pub fn finish(mut self) -> String {
        self.buf.push_str("</svg>\n");
        self.buf
    }
}

/// Escape text for use inside SVG elements and attributes
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn document_is_closed() {
        let mut canvas = Canvas::new(100.0, 50.0, "t");
        canvas.line(0.0, 0.0, 1.0, 1.0, Stroke::dashed("#000", 1.0, "2,2"));
        let svg = canvas.finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("stroke-dasharray=\"2,2\""));
    }
}
