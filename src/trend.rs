//! First-degree least-squares trend.

use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Trend line of a series.
///
/// A line is evaluated at every year of the series. An undefined trend is serialised as the
/// single-element sequence `[null]` rather than a sequence of the same length as the series.
#[derive(Clone, Debug, PartialEq)]
pub enum Trend {
    /// Fitted values, one per year
    Line(Vec<f64>),
    /// The series has missing values or is not suitable for a trend
    Undefined,
}

impl Trend {
    /// Fit a trend to `values` observed at `years`.
    ///
    /// The trend is undefined if any value is missing.
    pub fn fit(years: &[i32], values: &[Option<f64>]) -> Self {
        let values: Option<Vec<f64>> = values.iter().copied().collect();
        match values {
            Some(values) if !values.is_empty() && values.len() == years.len() => {
                let (slope, intercept) = linear_fit(years, &values);
                Trend::Line(
                    years
                        .iter()
                        .map(|year| intercept + slope * f64::from(*year))
                        .collect(),
                )
            }
            _ => Trend::Undefined,
        }
    }

    /// Number of serialised elements.
    pub fn len(&self) -> usize {
        match self {
            Trend::Line(line) => line.len(),
            Trend::Undefined => 1,
        }
    }

    /// Whether the serialised trend has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Least-squares slope and intercept of `y` against `x`.
///
/// `x` is centred before fitting, which keeps the sums small for calendar years. A single
/// distinct `x` gives a flat line through the mean.
pub fn linear_fit(x: &[i32], y: &[f64]) -> (f64, f64) {
    let n = x.len() as f64;
    let x_mean = x.iter().map(|x| f64::from(*x)).sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;
    let (sxx, sxy) = x
        .iter()
        .zip(y)
        .fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = f64::from(*x) - x_mean;
            (sxx + dx * dx, sxy + dx * (y - y_mean))
        });
    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    (slope, y_mean - slope * x_mean)
}

impl Serialize for Trend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Trend::Line(line) => line.serialize(serializer),
            Trend::Undefined => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(&None::<f64>)?;
                seq.end()
            }
        }
    }
}
