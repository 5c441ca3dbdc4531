//! Data types and associated functions and methods

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::dataset::BASE_YEAR;
use crate::error::MapMakerError;
use crate::trend::Trend;

fn default_year() -> i32 {
    BASE_YEAR
}

/// Treat an empty query parameter the same as an absent one.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

/// Data source of a globe snapshot
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Environmental parameters
    #[default]
    Env,
    /// Ecological indices of plankton diversity
    Plankton,
}

/// Query parameters of `/api/globe-data`
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct GlobeDataQuery {
    /// Data source
    #[serde(default)]
    pub source: Source,
    /// Year to display
    #[serde(default = "default_year")]
    pub year: i32,
    /// Scenario label or code
    #[validate(length(min = 1))]
    pub scenario: String,
    /// Earth system model label
    #[validate(length(min = 1))]
    pub model: String,
    /// Ecological index, or the environmental parameter when the source is [Source::Env]
    #[validate(length(min = 1))]
    pub index: String,
    /// Plankton group
    pub group: Option<String>,
}

impl GlobeDataQuery {
    /// Plankton group, if given.
    pub fn group(&self) -> Option<&str> {
        non_empty(&self.group)
    }
}

/// Query parameters of `/api/map-data`
#[derive(Debug, Deserialize, PartialEq, Validate)]
pub struct MapDataQuery {
    /// Year to display
    #[serde(default = "default_year")]
    pub year: i32,
    /// Ecological index
    #[validate(length(min = 1))]
    pub index: String,
    /// Plankton group
    pub group: Option<String>,
    /// Scenario label or code
    #[validate(length(min = 1))]
    pub scenario: String,
    /// Earth system model label
    #[validate(length(min = 1))]
    pub model: String,
}

impl MapDataQuery {
    /// Plankton group, if given.
    pub fn group(&self) -> Option<&str> {
        non_empty(&self.group)
    }
}

/// Query parameters of `/api/line-data`
///
/// Either a point (`x`, `y`) or a box (`xMin`, `xMax`, `yMin`, `yMax`) selects the series.
#[derive(Debug, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_line_data_query"))]
pub struct LineDataQuery {
    /// Longitude of a point
    pub x: Option<f64>,
    /// Latitude of a point
    pub y: Option<f64>,
    /// Western edge of a box
    pub x_min: Option<f64>,
    /// Eastern edge of a box
    pub x_max: Option<f64>,
    /// Southern edge of a box
    pub y_min: Option<f64>,
    /// Northern edge of a box
    pub y_max: Option<f64>,
    /// First year of the series
    #[validate(range(min = 1, max = 9999, message = "startYear must be between 1 and 9999"))]
    pub start_year: Option<i32>,
    /// Last year of the series (inclusive)
    #[validate(range(min = 1, max = 9999, message = "endYear must be between 1 and 9999"))]
    pub end_year: Option<i32>,
    /// Ecological index
    #[validate(length(min = 1))]
    pub index: String,
    /// Plankton group
    pub group: Option<String>,
    /// Scenario label or code
    #[validate(length(min = 1))]
    pub scenario: String,
    /// Earth system model label
    #[validate(length(min = 1))]
    pub model: String,
    /// Environmental parameter to pair with the ecological series
    pub env_param: Option<String>,
}

impl LineDataQuery {
    /// Plankton group, if given.
    pub fn group(&self) -> Option<&str> {
        non_empty(&self.group)
    }

    /// Environmental parameter, if given.
    pub fn env_param(&self) -> Option<&str> {
        non_empty(&self.env_param)
    }

    /// Requested year range.
    pub fn years(&self) -> YearRange {
        YearRange {
            start: self.start_year,
            end: self.end_year,
        }
    }
}

/// Validate a line data query
fn validate_line_data_query(query: &LineDataQuery) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (query.start_year, query.end_year) {
        if start > end {
            return Err(ValidationError::new("startYear must not be after endYear"));
        }
    }
    Ok(())
}

/// An inclusive range of years. Open ends default to the extent of the dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct YearRange {
    /// First year, defaulting to the first year of the dataset
    pub start: Option<i32>,
    /// Last year, defaulting to the last year of the dataset
    pub end: Option<i32>,
}

/// A rectangular region in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Return the box with each pair of bounds in ascending order.
    pub fn normalized(self) -> Self {
        Self {
            x_min: self.x_min.min(self.x_max),
            x_max: self.x_min.max(self.x_max),
            y_min: self.y_min.min(self.y_max),
            y_max: self.y_min.max(self.y_max),
        }
    }
}

/// Spatial selection of a time series
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Selection {
    /// Nearest grid point to a longitude (`x`) and latitude (`y`)
    Point { x: f64, y: f64 },
    /// All grid points within a box
    Area(BoundingBox),
}

impl TryFrom<&LineDataQuery> for Selection {
    type Error = MapMakerError;

    fn try_from(query: &LineDataQuery) -> Result<Self, Self::Error> {
        let selection = match (
            query.x,
            query.y,
            query.x_min,
            query.x_max,
            query.y_min,
            query.y_max,
        ) {
            (Some(x), Some(y), None, None, None, None) => Selection::Point { x, y },
            (None, None, Some(x_min), Some(x_max), Some(y_min), Some(y_max)) => {
                Selection::Area(BoundingBox {
                    x_min,
                    x_max,
                    y_min,
                    y_max,
                })
            }
            _ => return Err(MapMakerError::InvalidSelection),
        };
        let finite = match selection {
            Selection::Point { x, y } => x.is_finite() && y.is_finite(),
            Selection::Area(b) => [b.x_min, b.x_max, b.y_min, b.y_max]
                .iter()
                .all(|v| v.is_finite()),
        };
        if finite {
            Ok(selection)
        } else {
            Err(MapMakerError::InvalidSelection)
        }
    }
}

/// Colour scale hint for the front end
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum ColorScale {
    /// Diverging around zero
    #[serde(rename = "Picnic")]
    Diverging,
    /// Sequential
    #[serde(rename = "Viridis")]
    Sequential,
}

impl ColorScale {
    /// Select the colour scale for a variable by its naming convention.
    pub fn for_variable(name: &str) -> Self {
        if name.contains("div") {
            ColorScale::Diverging
        } else {
            ColorScale::Sequential
        }
    }
}

/// One year of a gridded variable with colour scale bounds
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSnapshot {
    /// Latitude coordinates
    pub lats: Vec<f64>,
    /// Longitude coordinates
    pub lons: Vec<f64>,
    /// Values indexed by (lat, lon), rounded to 2 decimals, `null` where missing
    pub variable: Vec<Vec<Option<f64>>>,
    /// Colour scale hint
    pub colorscale: ColorScale,
    /// Lower bound over all years
    pub min_value: Option<f64>,
    /// Upper bound over all years
    pub max_value: Option<f64>,
}

/// Series of one variable over a selection
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SeriesRecord {
    /// Variable name
    pub name: String,
    /// Point value or box mean per year
    pub values: Vec<Option<f64>>,
    /// Box standard deviation per year, zero for a point
    pub std: Vec<Option<f64>>,
    /// Trend of `values`
    pub trend: Trend,
}

/// Time series of an ecological variable, optionally paired with an environmental one
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeSeriesRecord {
    /// Years of the series
    pub years: Vec<i32>,
    /// Ecological variable
    pub variable: SeriesRecord,
    /// Environmental variable, if requested
    pub environmental_variable: Option<SeriesRecord>,
}
