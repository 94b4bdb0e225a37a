//! Drawdown analysis over a return or cumulative-value series.
//!
//! Duration is measured peak-to-trough. Time to recovery is not computed.

use chrono::NaiveDateTime;
use std::fmt;

use super::error::TradesimError;

/// How the input values are to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesKind {
    /// Fractional period returns, e.g. `0.02` for +2%.
    #[default]
    Returns,
    /// Already-cumulative values such as an equity curve.
    Cumulative,
}

/// Peak-to-trough span of the maximum drawdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawdownDuration {
    Elapsed(chrono::Duration),
    Bars(usize),
}

impl fmt::Display for DrawdownDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawdownDuration::Bars(1) => write!(f, "1 bar"),
            DrawdownDuration::Bars(n) => write!(f, "{n} bars"),
            DrawdownDuration::Elapsed(d) => {
                let days = d.num_days();
                let hours = d.num_hours() - days * 24;
                let minutes = d.num_minutes() - d.num_hours() * 60;
                match (days, hours, minutes) {
                    (0, 0, m) => write!(f, "{m}m"),
                    (0, h, m) => write!(f, "{h}h {m}m"),
                    (1, 0, 0) => write!(f, "1 day"),
                    (d, 0, 0) => write!(f, "{d} days"),
                    (d, h, m) => write!(f, "{d}d {h}h {m}m"),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownPoint {
    pub timestamp: Option<NaiveDateTime>,
    pub cumulative: f64,
    pub peak: f64,
    pub drawdown: f64,
}

/// A position in the analysed series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownMark {
    pub index: usize,
    pub timestamp: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownReport {
    /// Most negative drawdown, as a fraction (`-0.04` is a 4% decline).
    pub max_drawdown: f64,
    pub duration: DrawdownDuration,
    /// Last peak before the trough that equals the peak in force at the trough.
    pub start: DrawdownMark,
    /// The trough.
    pub end: DrawdownMark,
    pub series: Vec<DrawdownPoint>,
}

/// Compute cumulative values, running peak and drawdown for `values`.
///
/// When `timestamps` is given it must be the same length as `values`, and the
/// duration is the elapsed time between start and trough; otherwise it is the
/// bar count.
pub fn calculate_drawdowns(
    values: &[f64],
    timestamps: Option<&[NaiveDateTime]>,
    kind: SeriesKind,
) -> Result<DrawdownReport, TradesimError> {
    if values.is_empty() {
        return Err(TradesimError::invalid_input(
            "drawdown requires at least one value",
        ));
    }
    if let Some(ts) = timestamps {
        if ts.len() != values.len() {
            return Err(TradesimError::invalid_input(format!(
                "drawdown got {} timestamps for {} values",
                ts.len(),
                values.len()
            )));
        }
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        return Err(TradesimError::invalid_input(format!(
            "drawdown value at index {i} is not finite"
        )));
    }

    let cumulative: Vec<f64> = match kind {
        SeriesKind::Returns => values
            .iter()
            .scan(1.0_f64, |acc, r| {
                *acc *= 1.0 + r;
                Some(*acc)
            })
            .collect(),
        SeriesKind::Cumulative => values.to_vec(),
    };

    let mut series = Vec::with_capacity(cumulative.len());
    let mut peak = f64::NEG_INFINITY;
    for (i, &value) in cumulative.iter().enumerate() {
        peak = peak.max(value);
        let drawdown = if peak > 0.0 { value / peak - 1.0 } else { 0.0 };
        series.push(DrawdownPoint {
            timestamp: timestamps.map(|ts| ts[i]),
            cumulative: value,
            peak,
            drawdown,
        });
    }

    // First index holding the minimum.
    let trough = series
        .iter()
        .enumerate()
        .fold(0, |best, (i, p)| {
            if p.drawdown < series[best].drawdown {
                i
            } else {
                best
            }
        });
    let peak_at_trough = series[trough].peak;
    let start = (0..=trough)
        .rev()
        .find(|&i| series[i].cumulative == peak_at_trough)
        .unwrap_or(trough);

    let duration = match timestamps {
        Some(ts) => DrawdownDuration::Elapsed(ts[trough] - ts[start]),
        None => DrawdownDuration::Bars(trough - start),
    };

    Ok(DrawdownReport {
        max_drawdown: series[trough].drawdown,
        duration,
        start: DrawdownMark {
            index: start,
            timestamp: series[start].timestamp,
        },
        end: DrawdownMark {
            index: trough,
            timestamp: series[trough].timestamp,
        },
        series,
    })
}
