//! Time series of a variable at a point or over a box, with a linear trend.

use std::ops::Range;

use ndarray::{s, Array1};

use crate::catalog::VariableDescriptor;
use crate::dataset::{Dataset, Grid, BASE_YEAR};
use crate::error::MapMakerError;
use crate::models::{Selection, SeriesRecord, TimeSeriesRecord, YearRange};
use crate::operation::Operation;
use crate::operations::round_value;
use crate::trend::Trend;

/// Extract the time series of a variable, optionally paired with an environmental variable.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractSeries {
    /// Ecological variable
    pub primary: VariableDescriptor,
    /// Point or box
    pub selection: Selection,
    /// Years to extract
    pub years: YearRange,
    /// Environmental variable to extract over the same selection and years
    pub environmental: Option<VariableDescriptor>,
}

impl Operation for ExtractSeries {
    type Output = TimeSeriesRecord;

    fn execute(self) -> Result<TimeSeriesRecord, MapMakerError> {
        extract_series(
            &self.primary,
            self.selection,
            self.years,
            self.environmental.as_ref(),
        )
    }
}

/// Extract a time series record.
///
/// The year range defaults to the extent of the primary dataset. Each dataset is closed before
/// the next one is opened.
pub fn extract_series(
    primary: &VariableDescriptor,
    selection: Selection,
    years: YearRange,
    environmental: Option<&VariableDescriptor>,
) -> Result<TimeSeriesRecord, MapMakerError> {
    let grid = Dataset::open(&primary.path)?.grid(&primary.variable)?;
    let start = years.start.unwrap_or(BASE_YEAR);
    let end = years.end.unwrap_or_else(|| grid.last_year().max(start));
    grid.time_index(start)?;
    grid.time_index(end)?;
    if end < start {
        return Err(MapMakerError::YearOutOfRange {
            year: end,
            first: start,
            last: grid.last_year().max(start),
        });
    }
    let years: Vec<i32> = (start..=end).collect();
    let variable = series_record(&grid, selection, &years)?;
    drop(grid);

    let environmental_variable = environmental
        .map(|descriptor| {
            let grid = Dataset::open(&descriptor.path)?.grid(&descriptor.variable)?;
            series_record(&grid, selection, &years)
        })
        .transpose()?;

    Ok(TimeSeriesRecord {
        years,
        variable,
        environmental_variable,
    })
}

/// Series of one variable over a selection.
///
/// A point takes the nearest grid cell and has a zero standard deviation. A box takes the mean
/// and population standard deviation of its non-missing cells.
fn series_record(
    grid: &Grid,
    selection: Selection,
    years: &[i32],
) -> Result<SeriesRecord, MapMakerError> {
    let indices = grid.time_indices(years)?;

    let (values, std): (Vec<Option<f64>>, Vec<Option<f64>>) = match selection {
        Selection::Point { x, y } => {
            let lat =
                nearest_index(&grid.lats, y).ok_or(MapMakerError::EmptyAxis { axis: "lat" })?;
            let lon =
                nearest_index(&grid.lons, x).ok_or(MapMakerError::EmptyAxis { axis: "lon" })?;
            let values = indices
                .iter()
                .map(|t| round_value(grid.data[[*t, lat, lon]]))
                .collect();
            (values, vec![Some(0.0); indices.len()])
        }
        Selection::Area(bounds) => {
            let bounds = bounds.normalized();
            let lats = if is_descending(&grid.lats) {
                label_slice(&grid.lats, bounds.y_max, bounds.y_min)
            } else {
                label_slice(&grid.lats, bounds.y_min, bounds.y_max)
            };
            let lons = label_slice(&grid.lons, bounds.x_min, bounds.x_max);
            indices
                .iter()
                .map(|t| {
                    let field = grid.field(*t);
                    let cells = field.slice(s![lats.clone(), lons.clone()]);
                    let (mean, std) = mean_std_skipnan(cells.iter().copied());
                    (round_value(mean), round_value(std))
                })
                .unzip()
        }
    };

    let trend = if grid.name.contains("biomes") {
        Trend::Undefined
    } else {
        Trend::fit(years, &values)
    };

    Ok(SeriesRecord {
        name: grid.name.clone(),
        values,
        std,
        trend,
    })
}

/// Index of the coordinate nearest to `target`. The first is returned on a tie.
pub fn nearest_index(coords: &[f64], target: f64) -> Option<usize> {
    coords
        .iter()
        .map(|c| (c - target).abs())
        .enumerate()
        .filter(|(_, distance)| !distance.is_nan())
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}

/// Whether a coordinate axis is stored in descending order.
fn is_descending(coords: &[f64]) -> bool {
    matches!((coords.first(), coords.last()), (Some(first), Some(last)) if first > last)
}

/// Index range of a monotonic axis with coordinates from `start` to `stop` inclusive.
///
/// `start` and `stop` must follow the order of the axis: `start <= stop` for an ascending axis
/// and `start >= stop` for a descending one. Otherwise the range is empty.
pub fn label_slice(coords: &[f64], start: f64, stop: f64) -> Range<usize> {
    let descending = is_descending(coords);
    let from_start = |c: f64| if descending { c <= start } else { c >= start };
    let to_stop = |c: f64| if descending { c >= stop } else { c <= stop };
    let first = coords
        .iter()
        .position(|c| from_start(*c))
        .unwrap_or(coords.len());
    let end = coords.iter().rposition(|c| to_stop(*c)).map_or(0, |i| i + 1);
    first..end.max(first)
}

/// Mean and population standard deviation of the non-NaN `values`.
///
/// Both are NaN if there are no such values.
pub fn mean_std_skipnan(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let valid: Array1<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    match valid.mean() {
        Some(mean) => (mean, valid.std(0.0)),
        None => (f64::NAN, f64::NAN),
    }
}
