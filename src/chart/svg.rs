// src/chart/svg.rs
use std::fmt::Write;

use super::scale::{BandScale, LinearScale, TimeScale};
use super::{Chart, ChartKind, XAxis, XValue};

const PALETTE: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const Y_TICKS: usize = 8;
const X_TICKS: usize = 10;

pub fn color(idx: usize) -> &'static str {
    PALETTE[idx % PALETTE.len()]
}

/// Escape text for use inside SVG elements and attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Horizontal placement for the x axis, whichever kind of scale backs it.
enum XPlacement {
    Time(TimeScale),
    Linear(LinearScale),
    Band(BandScale),
}

impl XPlacement {
    /// Centre x pixel for `value`.
    fn center(&self, value: &XValue) -> Option<f64> {
        match (self, value) {
            (XPlacement::Time(s), XValue::Date(d)) => Some(s.map(*d)),
            (XPlacement::Linear(s), XValue::Number(n)) => Some(s.map(*n)),
            (XPlacement::Band(s), v) => s.map(&v.label()).map(|x| x + s.bandwidth() / 2.0),
            _ => None,
        }
    }

    fn ticks(&self) -> Vec<(f64, String)> {
        match self {
            XPlacement::Time(s) => s
                .tick_labels(X_TICKS)
                .into_iter()
                .map(|(d, l)| (s.map(d), l))
                .collect(),
            XPlacement::Linear(s) => s
                .tick_labels(X_TICKS)
                .into_iter()
                .map(|(v, l)| (s.map(v), l))
                .collect(),
            XPlacement::Band(s) => s
                .tick_indices(X_TICKS)
                .into_iter()
                .map(|i| (s.index_start(i) + s.bandwidth() / 2.0, s.domain()[i].clone()))
                .collect(),
        }
    }
}

fn x_placement(chart: &Chart, range: (f64, f64)) -> XPlacement {
    let xs = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|(x, _)| x));
    if chart.spec.kind == ChartKind::Bar {
        return XPlacement::Band(BandScale::new(chart.categories(), range));
    }
    match chart.x_axis {
        XAxis::Time => {
            let dates: Vec<_> = xs
                .filter_map(|x| match x {
                    XValue::Date(d) => Some(*d),
                    _ => None,
                })
                .collect();
            match (dates.iter().min(), dates.iter().max()) {
                (Some(&lo), Some(&hi)) => XPlacement::Time(TimeScale::new(lo, hi, range)),
                _ => XPlacement::Band(BandScale::new(Vec::new(), range)),
            }
        }
        XAxis::Linear => {
            let (lo, hi) = xs
                .filter_map(|x| match x {
                    XValue::Number(n) => Some(*n),
                    _ => None,
                })
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), n| {
                    (lo.min(n), hi.max(n))
                });
            let domain = if lo.is_finite() { (lo, hi) } else { (0.0, 1.0) };
            XPlacement::Linear(LinearScale::new(domain, range).nice(X_TICKS))
        }
        XAxis::Band => {
            XPlacement::Band(BandScale::new(chart.categories(), range).padding(0.0, 0.5))
        }
    }
}

/// Render `chart` as a standalone SVG document.
pub fn render(chart: &Chart) -> String {
    let spec = &chart.spec;
    let m = spec.margin;
    let left = m.left;
    let right = (spec.width - m.right).max(left + 1.0);
    let top = m.top;
    let bottom = (spec.height - m.bottom).max(top + 1.0);

    let y = LinearScale::new(chart.y_extent(), (bottom, top)).nice(Y_TICKS);
    let x = x_placement(chart, (left, right));

    let mut out = String::new();
    // writing into a String cannot fail
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="10">"#,
        w = spec.width,
        h = spec.height
    );

    // y axis with grid lines
    let _ = writeln!(out, r#"<g class="axis y">"#);
    let _ = writeln!(
        out,
        r#"<line x1="{left:.1}" y1="{top:.1}" x2="{left:.1}" y2="{bottom:.1}" stroke="currentColor"/>"#
    );
    for (value, label) in y.tick_labels(Y_TICKS) {
        let py = y.map(value);
        let _ = writeln!(
            out,
            r##"<line x1="{left:.1}" y1="{py:.1}" x2="{right:.1}" y2="{py:.1}" stroke="#e0e0e0"/><text x="{tx:.1}" y="{py:.1}" dy="0.32em" text-anchor="end">{label}</text>"##,
            tx = left - 6.0,
            label = escape(&label)
        );
    }
    let _ = writeln!(out, "</g>");

    // x axis
    let _ = writeln!(out, r#"<g class="axis x">"#);
    let _ = writeln!(
        out,
        r#"<line x1="{left:.1}" y1="{bottom:.1}" x2="{right:.1}" y2="{bottom:.1}" stroke="currentColor"/>"#
    );
    for (px, label) in x.ticks() {
        let _ = writeln!(
            out,
            r#"<line x1="{px:.1}" y1="{bottom:.1}" x2="{px:.1}" y2="{ty:.1}" stroke="currentColor"/><text x="{px:.1}" y="{ly:.1}" text-anchor="middle">{label}</text>"#,
            ty = bottom + 6.0,
            ly = bottom + 18.0,
            label = escape(&label)
        );
    }
    let _ = writeln!(
        out,
        r#"<text x="{cx:.1}" y="{ly:.1}" text-anchor="middle" font-weight="bold">{label}</text>"#,
        cx = (left + right) / 2.0,
        ly = spec.height - 6.0,
        label = escape(&chart.x_label)
    );
    let _ = writeln!(out, "</g>");

    match spec.kind {
        ChartKind::Bar => render_bars(&mut out, chart, &x, &y),
        _ => render_lines(&mut out, chart, &x, &y),
    }

    // legend
    let _ = writeln!(out, r#"<g class="legend">"#);
    for (i, series) in chart.series.iter().enumerate() {
        let ly = top + 14.0 * i as f64;
        let _ = writeln!(
            out,
            r#"<rect x="{lx:.1}" y="{ry:.1}" width="10" height="10" fill="{c}"/><text x="{tx:.1}" y="{ty:.1}">{name}</text>"#,
            lx = right + 10.0,
            ry = ly,
            c = color(i),
            tx = right + 24.0,
            ty = ly + 9.0,
            name = escape(&series.name)
        );
    }
    let _ = writeln!(out, "</g>");
    out.push_str("</svg>\n");
    out
}

fn render_lines(out: &mut String, chart: &Chart, x: &XPlacement, y: &LinearScale) {
    for (i, series) in chart.series.iter().enumerate() {
        let mut points: Vec<(f64, f64)> = series
            .points
            .iter()
            .filter_map(|(xv, yv)| Some((x.center(xv)?, y.map(*yv))))
            .collect();
        if points.is_empty() {
            continue;
        }
        if chart.x_axis != XAxis::Band {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        let mut d = String::new();
        for (j, (px, py)) in points.iter().enumerate() {
            let _ = write!(d, "{}{:.1},{:.1}", if j == 0 { "M" } else { "L" }, px, py);
        }
        let _ = writeln!(
            out,
            r#"<path class="series" data-name="{name}" fill="none" stroke="{c}" stroke-width="1.5" d="{d}"/>"#,
            name = escape(&series.name),
            c = color(i)
        );
    }
}

fn render_bars(out: &mut String, chart: &Chart, x: &XPlacement, y: &LinearScale) {
    let XPlacement::Band(band) = x else {
        return;
    };
    let groups = chart.series.len().max(1) as f64;
    let width = band.bandwidth() / groups;
    let zero = y.map(0.0);
    for (i, series) in chart.series.iter().enumerate() {
        let _ = writeln!(
            out,
            r#"<g class="series" data-name="{}" fill="{}">"#,
            escape(&series.name),
            color(i)
        );
        for (xv, yv) in &series.points {
            let Some(start) = band.map(&xv.label()) else {
                continue;
            };
            let py = y.map(*yv);
            let _ = writeln!(
                out,
                r#"<rect x="{bx:.1}" y="{by:.1}" width="{bw:.1}" height="{bh:.1}"><title>{t}: {v}</title></rect>"#,
                bx = start + width * i as f64,
                by = py.min(zero),
                bw = width,
                bh = (zero - py).abs(),
                t = escape(&xv.label()),
                v = yv
            );
        }
        let _ = writeln!(out, "</g>");
    }
}
