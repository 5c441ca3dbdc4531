//! Missing data descriptors
//!
//! Model output marks cells without data (land, ice) in several ways. The CF conventions used by
//! NetCDF files allow:
//!
//! * A single missing value (`_FillValue` or `missing_value`)
//! * Multiple missing values (`missing_value` as a list)
//! * A valid minimum value (`valid_min`)
//! * A valid maximum value (`valid_max`)
//! * A valid range of values (`valid_range`)
//!
//! Missing cells are decoded to NaN when a variable is read.

use num_traits::Float;

/// Missing data
///
/// This enum can represent all known descriptions of missing data used in NetCDF4 files.
/// It is generic over the type of missing data values.
#[derive(Clone, Debug, PartialEq)]
pub enum Missing<T> {
    /// A single missing value
    MissingValue(T),
    /// Multple missing values
    MissingValues(Vec<T>),
    /// Valid minimum
    ValidMin(T),
    /// Valid maxiumum
    ValidMax(T),
    /// Valid range
    ValidRange(T, T),
}

impl<T: PartialOrd> Missing<T> {
    /// Filter function to check whether the provided value is a 'missing' value
    pub fn is_missing(&self, x: &T) -> bool {
        match self {
            Missing::MissingValue(value) => x == value,
            Missing::MissingValues(values) => values.contains(x),
            Missing::ValidMin(min) => x < min,
            Missing::ValidMax(max) => x > max,
            Missing::ValidRange(min, max) => x < min || x > max,
        }
    }
}

impl<T: Float> Missing<T> {
    /// Replace a missing value with NaN.
    pub fn mask(&self, x: T) -> T {
        if self.is_missing(&x) {
            T::nan()
        } else {
            x
        }
    }
}

impl Missing<f64> {
    /// Collect the missing data descriptors declared by a variable's attributes.
    ///
    /// Attributes that are absent, non-numeric or malformed (e.g. a `valid_range` whose minimum
    /// is not less than its maximum) are ignored.
    pub fn from_attributes(variable: &netcdf::Variable) -> Vec<Self> {
        let values = |name: &str| {
            variable
                .attribute_value(name)
                .and_then(|value| value.ok())
                .and_then(numeric_values)
        };

        let mut descriptors = vec![];
        if let Some(fill) = values("_FillValue").and_then(|v| v.first().copied()) {
            descriptors.push(Missing::MissingValue(fill));
        }
        match values("missing_value").as_deref() {
            Some([value]) => descriptors.push(Missing::MissingValue(*value)),
            Some(values) if !values.is_empty() => {
                descriptors.push(Missing::MissingValues(values.to_vec()))
            }
            _ => (),
        }
        match values("valid_range").as_deref() {
            Some([min, max]) if min < max => descriptors.push(Missing::ValidRange(*min, *max)),
            _ => {
                if let Some(min) = values("valid_min").and_then(|v| v.first().copied()) {
                    descriptors.push(Missing::ValidMin(min));
                }
                if let Some(max) = values("valid_max").and_then(|v| v.first().copied()) {
                    descriptors.push(Missing::ValidMax(max));
                }
            }
        }
        descriptors
    }
}

/// Convert a numeric attribute value to a list of f64.
fn numeric_values(value: netcdf::AttributeValue) -> Option<Vec<f64>> {
    use netcdf::AttributeValue as A;

    let values = match value {
        A::Uchar(x) => vec![x as f64],
        A::Uchars(x) => x.into_iter().map(f64::from).collect(),
        A::Schar(x) => vec![x as f64],
        A::Schars(x) => x.into_iter().map(f64::from).collect(),
        A::Ushort(x) => vec![x as f64],
        A::Ushorts(x) => x.into_iter().map(f64::from).collect(),
        A::Short(x) => vec![x as f64],
        A::Shorts(x) => x.into_iter().map(f64::from).collect(),
        A::Uint(x) => vec![x as f64],
        A::Uints(x) => x.into_iter().map(f64::from).collect(),
        A::Int(x) => vec![x as f64],
        A::Ints(x) => x.into_iter().map(f64::from).collect(),
        A::Ulonglong(x) => vec![x as f64],
        A::Ulonglongs(x) => x.into_iter().map(|x| x as f64).collect(),
        A::Longlong(x) => vec![x as f64],
        A::Longlongs(x) => x.into_iter().map(|x| x as f64).collect(),
        A::Float(x) => vec![x as f64],
        A::Floats(x) => x.into_iter().map(f64::from).collect(),
        A::Double(x) => vec![x],
        A::Doubles(x) => x,
        _ => return None,
    };
    Some(values)
}
