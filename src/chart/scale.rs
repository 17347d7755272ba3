// src/chart/scale.rs
use chrono::{Datelike, Months, NaiveDate};
use std::collections::HashMap;

/// Step for roughly `count` ticks across `[start, stop]`, snapped to 1, 2 or 5
/// times a power of ten.
pub fn tick_step(start: f64, stop: f64, count: usize) -> f64 {
    let span = (stop - start).abs();
    if span == 0.0 || !span.is_finite() || count == 0 {
        return 0.0;
    }
    let raw = span / count as f64;
    let power = raw.log10().floor();
    let base = 10f64.powf(power);
    let error = raw / base;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * base
}

/// Decimal places needed to print multiples of `step` exactly.
fn decimals_for(step: f64) -> usize {
    if step <= 0.0 || step >= 1.0 {
        0
    } else {
        (-step.log10().floor()) as usize
    }
}

/// Tick label for `value` on an axis ticking every `step`.
pub fn format_tick(value: f64, step: f64) -> String {
    let abs = value.abs();
    let (scaled, scaled_step, suffix) = if abs >= 1e9 && step >= 1e8 {
        (value / 1e9, step / 1e9, "G")
    } else if abs >= 1e6 && step >= 1e5 {
        (value / 1e6, step / 1e6, "M")
    } else if abs >= 1e3 && step >= 1e2 {
        (value / 1e3, step / 1e3, "k")
    } else {
        (value, step, "")
    };
    let text = format!("{:.*}", decimals_for(scaled_step), scaled);
    // avoid "-0"
    let text = if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        text.trim_start_matches('-').to_string()
    } else {
        text
    };
    format!("{}{}", text, suffix)
}

/// Continuous linear mapping from a data domain onto a pixel range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    pub fn invert(&self, px: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return (d0 + d1) / 2.0;
        }
        d0 + (px - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Widen the domain outward to whole tick steps.
    pub fn nice(mut self, count: usize) -> Self {
        let (mut lo, mut hi) = self.domain;
        let reversed = hi < lo;
        if reversed {
            std::mem::swap(&mut lo, &mut hi);
        }
        let mut prev = 0.0;
        for _ in 0..10 {
            let step = tick_step(lo, hi, count);
            if step == 0.0 || step == prev {
                break;
            }
            lo = (lo / step).floor() * step;
            hi = (hi / step).ceil() * step;
            prev = step;
        }
        self.domain = if reversed { (hi, lo) } else { (lo, hi) };
        self
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (d0, d1) = self.domain;
        let (lo, hi) = if d0 <= d1 { (d0, d1) } else { (d1, d0) };
        let step = tick_step(lo, hi, count);
        if step == 0.0 {
            return vec![lo];
        }
        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        (first..=last).map(|i| i as f64 * step).collect()
    }

    pub fn tick_labels(&self, count: usize) -> Vec<(f64, String)> {
        let (d0, d1) = self.domain;
        let step = tick_step(d0.min(d1), d0.max(d1), count);
        self.ticks(count)
            .into_iter()
            .map(|t| (t, format_tick(t, step)))
            .collect()
    }
}

/// Evenly sized bands for categorical values.
#[derive(Clone, Debug, PartialEq)]
pub struct BandScale {
    domain: Vec<String>,
    index: HashMap<String, usize>,
    pub range: (f64, f64),
    pub padding_inner: f64,
    pub padding_outer: f64,
}

impl BandScale {
    pub fn new(domain: Vec<String>, range: (f64, f64)) -> Self {
        let mut index = HashMap::with_capacity(domain.len());
        for (i, key) in domain.iter().enumerate() {
            index.entry(key.clone()).or_insert(i);
        }
        Self {
            domain,
            index,
            range,
            padding_inner: 0.1,
            padding_outer: 0.1,
        }
    }

    pub fn padding(mut self, inner: f64, outer: f64) -> Self {
        self.padding_inner = inner.clamp(0.0, 1.0);
        self.padding_outer = outer.max(0.0);
        self
    }

    /// Distance between the starts of adjacent bands.
    pub fn step(&self) -> f64 {
        let n = self.domain.len() as f64;
        let (r0, r1) = self.range;
        (r1 - r0) / (n - self.padding_inner + 2.0 * self.padding_outer).max(1.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding_inner)
    }

    pub fn index_start(&self, idx: usize) -> f64 {
        self.range.0 + self.step() * (self.padding_outer + idx as f64)
    }

    pub fn domain(&self) -> &[String] {
        &self.domain
    }

    /// Left edge of the band for `key`.
    pub fn map(&self, key: &str) -> Option<f64> {
        self.index.get(key).map(|&idx| self.index_start(idx))
    }

    /// Every n-th category so that at most `count` labels are drawn.
    pub fn tick_indices(&self, count: usize) -> Vec<usize> {
        let n = self.domain.len();
        if n == 0 {
            return Vec::new();
        }
        let every = n.div_ceil(count.max(1)).max(1);
        (0..n).step_by(every).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeInterval {
    Days(u32),
    Months(u32),
}

impl TimeInterval {
    fn approx_days(&self) -> f64 {
        match self {
            TimeInterval::Days(d) => *d as f64,
            TimeInterval::Months(m) => *m as f64 * 30.44,
        }
    }

    fn label_format(&self) -> &'static str {
        match self {
            TimeInterval::Days(_) => "%b %d",
            TimeInterval::Months(m) if *m >= 12 => "%Y",
            TimeInterval::Months(_) => "%b %Y",
        }
    }
}

const INTERVALS: &[TimeInterval] = &[
    TimeInterval::Days(1),
    TimeInterval::Days(2),
    TimeInterval::Days(7),
    TimeInterval::Days(14),
    TimeInterval::Months(1),
    TimeInterval::Months(2),
    TimeInterval::Months(3),
    TimeInterval::Months(6),
    TimeInterval::Months(12),
];

fn day_number(d: NaiveDate) -> f64 {
    d.num_days_from_ce() as f64
}

/// Linear scale over calendar days.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeScale {
    pub start: NaiveDate,
    pub end: NaiveDate,
    linear: LinearScale,
}

impl TimeScale {
    pub fn new(start: NaiveDate, end: NaiveDate, range: (f64, f64)) -> Self {
        Self {
            start,
            end,
            linear: LinearScale::new((day_number(start), day_number(end)), range),
        }
    }

    pub fn map(&self, d: NaiveDate) -> f64 {
        self.linear.map(day_number(d))
    }

    pub fn interval(&self, count: usize) -> TimeInterval {
        let span = (self.end - self.start).num_days().max(1) as f64;
        let target = span / count.max(1) as f64;
        INTERVALS
            .iter()
            .copied()
            .find(|iv| iv.approx_days() >= target)
            .unwrap_or_else(|| TimeInterval::Months(12 * (target / 365.0).ceil().max(1.0) as u32))
    }

    pub fn ticks(&self, count: usize) -> Vec<NaiveDate> {
        let mut out = Vec::new();
        match self.interval(count) {
            TimeInterval::Days(n) => {
                let n = n as i32;
                let first = self.start.num_days_from_ce();
                let aligned = first + (n - first.rem_euclid(n)) % n;
                let mut day = aligned;
                while let Some(d) = NaiveDate::from_num_days_from_ce_opt(day) {
                    if d > self.end {
                        break;
                    }
                    out.push(d);
                    day += n;
                }
            }
            TimeInterval::Months(m) => {
                let Some(mut d) = self.start.with_day(1) else {
                    return out;
                };
                if d < self.start {
                    d = match d.checked_add_months(Months::new(1)) {
                        Some(next) => next,
                        None => return out,
                    };
                }
                let month_index = |d: NaiveDate| d.year() as i64 * 12 + d.month0() as i64;
                while month_index(d) % m as i64 != 0 {
                    d = match d.checked_add_months(Months::new(1)) {
                        Some(next) => next,
                        None => return out,
                    };
                }
                while d <= self.end {
                    out.push(d);
                    d = match d.checked_add_months(Months::new(m)) {
                        Some(next) => next,
                        None => break,
                    };
                }
            }
        }
        out
    }

    pub fn tick_labels(&self, count: usize) -> Vec<(NaiveDate, String)> {
        let fmt = self.interval(count).label_format();
        self.ticks(count)
            .into_iter()
            .map(|d| (d, d.format(fmt).to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn linear_maps_and_inverts() {
        let s = LinearScale::new((0.0, 100.0), (400.0, 0.0));
        assert_eq!(s.map(0.0), 400.0);
        assert_eq!(s.map(25.0), 300.0);
        assert_eq!(s.invert(300.0), 25.0);
    }

    #[test]
    fn degenerate_domain_maps_to_middle() {
        let s = LinearScale::new((5.0, 5.0), (0.0, 100.0));
        assert_eq!(s.map(5.0), 50.0);
        assert_eq!(s.ticks(10), vec![5.0]);
    }

    #[test]
    fn steps_snap_to_1_2_5() {
        assert_eq!(tick_step(0.0, 10.0, 10), 1.0);
        assert_eq!(tick_step(0.0, 100.0, 5), 20.0);
        assert_eq!(tick_step(0.0, 1_000_000.0, 3), 500_000.0);
        assert_eq!(tick_step(0.0, 0.0, 10), 0.0);
    }

    #[test]
    fn nice_extends_to_round_numbers() {
        let s = LinearScale::new((0.0, 9_730.0), (0.0, 1.0)).nice(5);
        assert_eq!(s.domain, (0.0, 10_000.0));
        let s = LinearScale::new((3.2, 97.0), (0.0, 1.0)).nice(10);
        assert_eq!(s.domain, (0.0, 100.0));
    }

    #[test]
    fn ticks_cover_domain() {
        let s = LinearScale::new((0.0, 10_000.0), (0.0, 1.0));
        assert_eq!(
            s.ticks(5),
            vec![0.0, 2_000.0, 4_000.0, 6_000.0, 8_000.0, 10_000.0]
        );
    }

    #[test]
    fn tick_labels_use_suffixes() {
        assert_eq!(format_tick(2_000.0, 2_000.0), "2k");
        assert_eq!(format_tick(1_500_000.0, 500_000.0), "1.5M");
        assert_eq!(format_tick(0.30000000000000004, 0.1), "0.3");
        assert_eq!(format_tick(-0.0, 1.0), "0");
        assert_eq!(format_tick(40.0, 10.0), "40");
    }

    #[test]
    fn bands_split_range() {
        let b = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0)).padding(0.0, 0.0);
        assert_eq!(b.step(), 50.0);
        assert_eq!(b.bandwidth(), 50.0);
        assert_eq!(b.map("b"), Some(50.0));
        assert_eq!(b.map("z"), None);

        let padded = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0)).padding(0.5, 0.25);
        // step = 100 / (2 - 0.5 + 0.5)
        assert_eq!(padded.step(), 50.0);
        assert_eq!(padded.bandwidth(), 25.0);
        assert_eq!(padded.map("a"), Some(12.5));
    }

    #[test]
    fn band_lookup_scales_to_many_categories() {
        let domain: Vec<String> = (0..200_000).map(|i| format!("k{}", i)).collect();
        let b = BandScale::new(domain, (0.0, 200_000.0)).padding(0.0, 0.0);
        assert_eq!(b.map("k199999"), Some(199_999.0));
        assert_eq!(b.map("k0"), Some(0.0));
        assert_eq!(b.domain().len(), 200_000);
    }

    #[test]
    fn band_ticks_thin_out() {
        let domain = (0..30).map(|i| i.to_string()).collect();
        let b = BandScale::new(domain, (0.0, 300.0));
        assert_eq!(b.tick_indices(10), vec![0, 3, 6, 9, 12, 15, 18, 21, 24, 27]);
    }

    #[test]
    fn time_scale_maps_days() {
        let t = TimeScale::new(date("2020-03-01"), date("2020-03-11"), (0.0, 100.0));
        assert_eq!(t.map(date("2020-03-06")), 50.0);
    }

    #[test]
    fn short_spans_tick_daily() {
        let t = TimeScale::new(date("2020-03-01"), date("2020-03-05"), (0.0, 100.0));
        assert_eq!(t.interval(10), TimeInterval::Days(1));
        assert_eq!(t.ticks(10).len(), 5);
        assert_eq!(t.tick_labels(10)[0].1, "Mar 01");
    }

    #[test]
    fn long_spans_tick_on_month_starts() {
        let t = TimeScale::new(date("2020-01-21"), date("2020-12-31"), (0.0, 100.0));
        assert_eq!(t.interval(6), TimeInterval::Months(2));
        let ticks = t.ticks(6);
        assert_eq!(ticks.first().copied(), Some(date("2020-03-01")));
        assert!(ticks.iter().all(|d| d.day() == 1 && d.month0() % 2 == 0));
        assert_eq!(t.tick_labels(6)[0].1, "Mar 2020");
    }
}
