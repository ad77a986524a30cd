//! Yearly activity: bucketing daily contributions into 48 slots and laying
//! them out on the activity chart.

use crate::models::DailyContribution;
use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use std::collections::BTreeMap;

pub const SLOTS_PER_MONTH: usize = 4;
pub const SLOT_COUNT: usize = 12 * SLOTS_PER_MONTH;

pub const X_START: f64 = 60.0;
pub const X_END: f64 = 800.0;
pub const TOP: f64 = 80.0;
pub const BOTTOM: f64 = 350.0;
pub const GRID_COUNT: usize = 5;
pub const LABEL_Y: f64 = 372.0;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// How daily contributions are folded into the four slots of a month
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SlotStrategy {
    /// Split each month's recorded days into four even chunks
    #[default]
    Compressed,
    /// Fixed day ranges per slot; slots entirely in the future stay empty
    Calendar,
}

/// 48 slots of summed contributions; `None` marks slots without data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySeries {
    pub year: i32,
    pub values: Vec<Option<u64>>,
}

impl ActivitySeries {
    pub fn build(strategy: SlotStrategy, days: &[DailyContribution], year: i32, today: NaiveDate) -> Self {
        match strategy {
            SlotStrategy::Compressed => Self::compressed(days, year),
            SlotStrategy::Calendar => Self::calendar(days, year, today),
        }
    }

    /// Months after the last recorded day are left empty. `fallback_year`
    /// is used when there are no days at all.
    pub fn compressed(days: &[DailyContribution], fallback_year: i32) -> Self {
        let last = days.iter().map(|d| d.date).max();
        let (year, last_month) = match last {
            Some(date) => (date.year(), date.month()),
            None => (fallback_year, 0),
        };

        let months = group_by_month(days);
        let mut values = Vec::with_capacity(SLOT_COUNT);
        for month in 1..=12u32 {
            if month > last_month {
                values.extend([None; SLOTS_PER_MONTH]);
            } else {
                let counts = months.get(&month).map(Vec::as_slice).unwrap_or(&[]);
                values.extend(compress_month(counts, SLOTS_PER_MONTH));
            }
        }

        Self { year, values }
    }

    /// Days after `today` are ignored.
    pub fn calendar(days: &[DailyContribution], year: i32, today: NaiveDate) -> Self {
        let mut values = vec![None; SLOT_COUNT];

        for day in days.iter().filter(|d| d.date.year() == year && d.date <= today) {
            let month = day.date.month();
            let slot_size = days_in_month(year, month).div_ceil(SLOTS_PER_MONTH as u32);
            let slot = ((day.date.day() - 1) / slot_size).min(SLOTS_PER_MONTH as u32 - 1);
            let idx = (month as usize - 1) * SLOTS_PER_MONTH + slot as usize;
            *values[idx].get_or_insert(0) += day.count;
        }

        Self { year, values }
    }

    /// Largest value, never below 1 so scaling stays finite
    pub fn max_value(&self) -> u64 {
        self.values.iter().flatten().copied().max().unwrap_or(0).max(1)
    }
}

fn group_by_month(days: &[DailyContribution]) -> BTreeMap<u32, Vec<u64>> {
    let mut sorted: Vec<&DailyContribution> = days.iter().collect();
    sorted.sort_by_key(|d| d.date);

    let mut months: BTreeMap<u32, Vec<u64>> = BTreeMap::new();
    for day in sorted {
        months.entry(day.date.month()).or_default().push(day.count);
    }
    months
}

/// Folds a month of daily values into `slots` chunk sums.
///
/// Chunk `i` covers `[floor(i*n/slots), floor((i+1)*n/slots))`; an empty chunk
/// yields `None`.
pub fn compress_month(values: &[u64], slots: usize) -> Vec<Option<u64>> {
    if values.is_empty() {
        return vec![None; slots];
    }

    let n = values.len();
    (0..slots)
        .map(|i| {
            let start = i * n / slots;
            let end = (i + 1) * n / slots;
            let chunk = &values[start..end];
            if chunk.is_empty() {
                None
            } else {
                Some(chunk.iter().sum())
            }
        })
        .collect()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Horizontal distance between two slots
pub fn step() -> f64 {
    (X_END - X_START) / (SLOT_COUNT - 1) as f64
}

pub fn slot_x(index: usize) -> f64 {
    X_START + index as f64 * step()
}

/// Maps a value onto the chart's y axis, `max` at the top.
pub fn map_y(value: u64, max: u64) -> f64 {
    BOTTOM - (value as f64 / max.max(1) as f64) * (BOTTOM - TOP)
}

/// y coordinate of horizontal grid line `i`, 0 being the top
pub fn grid_y(i: usize) -> f64 {
    TOP + i as f64 * (BOTTOM - TOP) / GRID_COUNT as f64
}

/// Value written next to grid line `i`
pub fn y_label(max: u64, i: usize) -> u64 {
    max * (GRID_COUNT - i) as u64 / GRID_COUNT as u64
}

/// Present points of the series in chart coordinates
pub fn points(series: &ActivitySeries) -> Vec<(f64, f64)> {
    let max = series.max_value();
    series
        .values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (slot_x(i), map_y(v, max))))
        .collect()
}

/// Smooth cubic Bézier path through `points`, control points at the mid x.
pub fn bezier_path(points: &[(f64, f64)]) -> String {
    let Some(&(x0, y0)) = points.first() else {
        return String::new();
    };

    let mut d = format!("M{},{}", coord(x0), coord(y0));
    for pair in points.windows(2) {
        let (px, py) = pair[0];
        let (x, y) = pair[1];
        let cx = (px + x) / 2.0;
        d.push_str(&format!(
            "C{},{},{},{},{},{}",
            coord(cx),
            coord(py),
            coord(cx),
            coord(y),
            coord(x),
            coord(y)
        ));
    }
    d
}

/// Formats a coordinate with at most two decimals.
pub fn coord(value: f64) -> String {
    let formatted = format!("{:.2}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
