//! Grid snapshot of one year of a variable.

use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Data, Dimension};
use ndarray_stats::QuantileExt;

use crate::dataset::{Dataset, BASE_YEAR};
use crate::error::MapMakerError;
use crate::models::{ColorScale, GridSnapshot};
use crate::operation::Operation;
use crate::operations::round_value;

/// Read one year of a gridded variable, with colour scale bounds over all years.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadSnapshot {
    /// Path of the dataset
    pub path: PathBuf,
    /// Variable to read
    pub variable: String,
    /// Year to read, defaulting to [BASE_YEAR]
    pub year: Option<i32>,
}

impl Operation for ReadSnapshot {
    type Output = GridSnapshot;

    fn execute(self) -> Result<GridSnapshot, MapMakerError> {
        read_snapshot(&self.path, &self.variable, self.year)
    }
}

/// Read a snapshot of `variable` in the dataset at `path`.
///
/// The minimum and maximum are taken over the whole time axis so that the colour scale does not
/// change between years.
pub fn read_snapshot(
    path: &Path,
    variable: &str,
    year: Option<i32>,
) -> Result<GridSnapshot, MapMakerError> {
    let grid = Dataset::open(path)?.grid(variable)?;
    let index = grid.time_index(year.unwrap_or(BASE_YEAR))?;

    let colorscale = ColorScale::for_variable(variable);
    let (min_value, max_value) = value_bounds(&grid.data, colorscale);
    let values = grid
        .field(index)
        .outer_iter()
        .map(|row| row.iter().map(|value| round_value(*value)).collect())
        .collect();

    Ok(GridSnapshot {
        lats: grid.lats,
        lons: grid.lons,
        variable: values,
        colorscale,
        min_value,
        max_value,
    })
}

/// Rounded minimum and maximum of the non-missing values in `data`.
///
/// A diverging colour scale gets bounds symmetric around zero. Both bounds are `None` if every
/// value is missing.
pub fn value_bounds<S, D>(
    data: &ArrayBase<S, D>,
    colorscale: ColorScale,
) -> (Option<f64>, Option<f64>)
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let min = *data.min_skipnan();
    let max = *data.max_skipnan();
    if min.is_nan() || max.is_nan() {
        return (None, None);
    }
    let (min, max) = match colorscale {
        ColorScale::Diverging => {
            let m = min.abs().max(max.abs());
            (-m, m)
        }
        ColorScale::Sequential => (min, max),
    };
    (round_value(min), round_value(max))
}
