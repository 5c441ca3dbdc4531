//! NetCDF dataset access.
//!
//! Model output is stored as NetCDF files with an annual `time` axis starting in [BASE_YEAR] and
//! regular `lat`/`lon` axes. Variables are decoded the way CF-aware readers do: missing data
//! becomes NaN and packed values are unpacked with `scale_factor` and `add_offset`.

use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayView2, Axis};
use netcdf::types::{FloatType, IntType, NcVariableType};

use crate::error::MapMakerError;
use crate::types::Missing;

/// Year of the first step of every time axis.
pub const BASE_YEAR: i32 = 2012;

const LAT_NAMES: [&str; 2] = ["lat", "latitude"];
const LON_NAMES: [&str; 2] = ["lon", "longitude"];

/// An open, read-only NetCDF dataset.
///
/// The underlying file handle is closed when the dataset is dropped.
pub struct Dataset {
    file: netcdf::File,
    path: PathBuf,
}

impl Dataset {
    /// Open the dataset at `path`.
    pub fn open(path: &Path) -> Result<Self, MapMakerError> {
        let file = netcdf::open(path).map_err(|source| MapMakerError::DatasetUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Path of the dataset.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a gridded variable together with its latitude and longitude coordinates.
    ///
    /// Variables must be laid out as (time, lat, lon), or (lat, lon) for a field that does not
    /// vary in time.
    pub fn grid(&self, name: &str) -> Result<Grid, MapMakerError> {
        let variable = self
            .file
            .variable(name)
            .ok_or_else(|| MapMakerError::VariableNotFound {
                variable: name.to_string(),
                path: self.path.clone(),
            })?;
        let dimensions: Vec<(String, usize)> = variable
            .dimensions()
            .iter()
            .map(|dimension| (dimension.name(), dimension.len()))
            .collect();

        let unsupported = || MapMakerError::UnsupportedVariable {
            variable: name.to_string(),
        };
        let (time_steps, (lat_name, lat_len), (lon_name, lon_len)) = match dimensions.as_slice() {
            [(_, time), lat, lon] => (Some(*time), lat, lon),
            [lat, lon] => (None, lat, lon),
            _ => return Err(unsupported()),
        };
        if !LAT_NAMES.contains(&lat_name.as_str()) || !LON_NAMES.contains(&lon_name.as_str()) {
            return Err(unsupported());
        }

        let lats = self.coordinate(lat_name)?;
        let lons = self.coordinate(lon_name)?;

        let missing = Missing::from_attributes(&variable);
        let scale_factor = attribute_f64(&variable, "scale_factor");
        let add_offset = attribute_f64(&variable, "add_offset");
        let values: Vec<f64> = read_f64(&variable)?
            .into_iter()
            .map(|value| {
                let value = missing.iter().fold(value, |value, m| m.mask(value));
                let value = scale_factor.map_or(value, |scale| value * scale);
                add_offset.map_or(value, |offset| value + offset)
            })
            .collect();
        let shape = (time_steps.unwrap_or(1), *lat_len, *lon_len);
        let data = Array3::from_shape_vec(shape, values)?;

        Ok(Grid {
            name: name.to_string(),
            lats,
            lons,
            data,
            time_invariant: time_steps.is_none(),
        })
    }

    /// Read a 1-D coordinate variable.
    fn coordinate(&self, name: &str) -> Result<Vec<f64>, MapMakerError> {
        let variable = self
            .file
            .variable(name)
            .ok_or_else(|| MapMakerError::VariableNotFound {
                variable: name.to_string(),
                path: self.path.clone(),
            })?;
        read_f64(&variable)
    }
}

/// Read all values of a numeric variable, converting from its stored type to f64.
fn read_f64(variable: &netcdf::Variable) -> Result<Vec<f64>, MapMakerError> {
    macro_rules! read_as {
        ($t:ty) => {{
            let values: Vec<$t> = variable.get_values(..)?;
            values.into_iter().map(|x| x as f64).collect()
        }};
    }

    let values = match variable.vartype() {
        NcVariableType::Float(FloatType::F64) => variable.get_values(..)?,
        NcVariableType::Float(FloatType::F32) => read_as!(f32),
        NcVariableType::Int(IntType::I64) => read_as!(i64),
        NcVariableType::Int(IntType::I32) => read_as!(i32),
        NcVariableType::Int(IntType::I16) => read_as!(i16),
        NcVariableType::Int(IntType::I8) => read_as!(i8),
        NcVariableType::Int(IntType::U64) => read_as!(u64),
        NcVariableType::Int(IntType::U32) => read_as!(u32),
        NcVariableType::Int(IntType::U16) => read_as!(u16),
        NcVariableType::Int(IntType::U8) => read_as!(u8),
        _ => {
            return Err(MapMakerError::UnsupportedVariable {
                variable: variable.name(),
            })
        }
    };
    Ok(values)
}

/// Read a numeric scalar attribute, if present.
fn attribute_f64(variable: &netcdf::Variable, name: &str) -> Option<f64> {
    variable
        .attribute_value(name)
        .and_then(|value| value.ok())
        .and_then(|value| match value {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            _ => None,
        })
}

/// A decoded variable on a latitude/longitude grid.
#[derive(Clone, Debug)]
pub struct Grid {
    /// Variable name
    pub name: String,
    /// Latitude coordinates
    pub lats: Vec<f64>,
    /// Longitude coordinates
    pub lons: Vec<f64>,
    /// Values indexed by (time, lat, lon). Missing cells are NaN.
    pub data: Array3<f64>,
    /// Whether the variable has no time axis, in which case `data` holds a single field.
    pub time_invariant: bool,
}

impl Grid {
    /// Number of time steps.
    pub fn time_steps(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Last year covered by the time axis.
    pub fn last_year(&self) -> i32 {
        BASE_YEAR + self.time_steps() as i32 - 1
    }

    /// Index along the time axis of `year`.
    ///
    /// A time-invariant field is returned for every year.
    pub fn time_index(&self, year: i32) -> Result<usize, MapMakerError> {
        if self.time_invariant {
            return Ok(0);
        }
        year.checked_sub(BASE_YEAR)
            .and_then(|offset| usize::try_from(offset).ok())
            .filter(|index| *index < self.time_steps())
            .ok_or(MapMakerError::YearOutOfRange {
                year,
                first: BASE_YEAR,
                last: self.last_year(),
            })
    }

    /// Indices along the time axis of each of `years`.
    pub fn time_indices(&self, years: &[i32]) -> Result<Vec<usize>, MapMakerError> {
        years.iter().map(|year| self.time_index(*year)).collect()
    }

    /// The 2-D field at a time index.
    pub fn field(&self, index: usize) -> ArrayView2<f64> {
        self.data.index_axis(Axis(0), index)
    }
}
