//! NetCDF fixtures for tests.
//!
//! Each fixture is a small file written below a temporary directory, named the way the
//! [Catalog](crate::catalog::Catalog) expects so that the same files serve dataset, operation
//! and router tests.

use std::path::{Path, PathBuf};

/// Fill value used by fixture variables.
pub(crate) const FILL_VALUE: f64 = -999.0;

/// Number of annual time steps in fixture variables (2012-2015).
pub(crate) const YEARS: usize = 4;

/// Ascending latitude axis.
pub(crate) const LATS: [f64; 3] = [-10.0, 0.0, 10.0];

/// Longitude axis.
pub(crate) const LONS: [f64; 4] = [0.0, 10.0, 20.0, 30.0];

/// Habitat suitability file for the model mean under RCP 2.6.
pub(crate) const HSI_FILE: &str = "Species_Data_for_App_Model_Mean_RCP26.nc";

/// Create a NetCDF file `name` below `dir` and populate it with `build`.
pub(crate) fn write_dataset<F>(dir: &Path, name: &str, build: F) -> PathBuf
where
    F: FnOnce(&mut netcdf::FileMut) -> Result<(), netcdf::Error>,
{
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = netcdf::create(&path).unwrap();
    build(&mut file).unwrap();
    path
}

/// Add `time`, `lat` and `lon` dimensions and the lat/lon coordinate variables.
///
/// No time dimension is added when `time` is zero.
pub(crate) fn add_axes(
    file: &mut netcdf::FileMut,
    time: usize,
    lats: &[f64],
    lons: &[f64],
) -> Result<(), netcdf::Error> {
    if time > 0 {
        file.add_dimension("time", time)?;
    }
    file.add_dimension("lat", lats.len())?;
    file.add_dimension("lon", lons.len())?;
    file.add_variable::<f64>("lat", &["lat"])?
        .put_values(lats, ..)?;
    file.add_variable::<f64>("lon", &["lon"])?
        .put_values(lons, ..)?;
    Ok(())
}

/// Add a (time, lat, lon) f64 variable. NaN values are written as [FILL_VALUE].
pub(crate) fn add_series(
    file: &mut netcdf::FileMut,
    name: &str,
    values: &[f64],
) -> Result<(), netcdf::Error> {
    let values: Vec<f64> = values
        .iter()
        .map(|v| if v.is_nan() { FILL_VALUE } else { *v })
        .collect();
    let mut var = file.add_variable::<f64>(name, &["time", "lat", "lon"])?;
    var.put_attribute("_FillValue", FILL_VALUE)?;
    var.put_values(&values, ..)?;
    Ok(())
}

/// Generate (time, lat, lon) values in C order.
fn generate(lats: usize, lons: usize, f: impl Fn(usize, usize, usize) -> f64) -> Vec<f64> {
    let mut values = Vec::with_capacity(YEARS * lats * lons);
    for t in 0..YEARS {
        for i in 0..lats {
            for j in 0..lons {
                values.push(f(t, i, j));
            }
        }
    }
    values
}

/// Value of `hsiTot` at a time step and lat/lon index of [write_ascending].
pub(crate) fn ascending_value(t: usize, lat: usize, lon: usize) -> f64 {
    0.25 + t as f64 + 10.0 * lat as f64 + 100.0 * lon as f64
}

/// Value of `hsi_hotspot_div_changeTot` at a time step and lat/lon index.
pub(crate) fn diverging_value(t: usize, _lat: usize, lon: usize) -> f64 {
    t as f64 - 3.0 + 0.5 * lon as f64
}

/// Write [HSI_FILE] on an ascending latitude axis.
///
/// `hsiTot` follows [ascending_value] except at (2012, -10, 0), which is missing.
/// `hsi_hotspot_div_changeTot` follows [diverging_value].
pub(crate) fn write_ascending(dir: &Path) -> PathBuf {
    write_dataset(dir, HSI_FILE, |file| {
        add_axes(file, YEARS, &LATS, &LONS)?;
        let hsi = generate(LATS.len(), LONS.len(), |t, i, j| {
            if (t, i, j) == (0, 0, 0) {
                f64::NAN
            } else {
                ascending_value(t, i, j)
            }
        });
        add_series(file, "hsiTot", &hsi)?;
        let div = generate(LATS.len(), LONS.len(), diverging_value);
        add_series(file, "hsi_hotspot_div_changeTot", &div)?;
        Ok(())
    })
}

/// Write the same `hsiTot` field as [write_ascending], stored on a descending latitude axis,
/// without the missing cell.
pub(crate) fn write_descending(dir: &Path) -> PathBuf {
    let lats: Vec<f64> = LATS.iter().rev().copied().collect();
    write_dataset(dir, "descending.nc", |file| {
        add_axes(file, YEARS, &lats, &LONS)?;
        let hsi = generate(lats.len(), LONS.len(), |t, i, j| {
            ascending_value(t, LATS.len() - 1 - i, j)
        });
        add_series(file, "hsiTot", &hsi)?;
        Ok(())
    })
}

/// Value of `SST` in the base environmental file.
pub(crate) fn temperature_value(t: usize, lat: usize, _lon: usize) -> f64 {
    20.0 + t as f64 + 0.5 * lat as f64
}

/// Write the base and difference environmental files for the model mean.
///
/// The base file (RCP 2.6) stores `SST` as f32 following [temperature_value]. The difference
/// file (RCP 8.5 - RCP 2.6) stores a constant warming of 1.5 per year elapsed.
pub(crate) fn write_environmental(dir: &Path) -> (PathBuf, PathBuf) {
    let base = write_dataset(dir, "Env_var_annual_mean_Model_Mean_RCP26.nc", |file| {
        add_axes(file, YEARS, &LATS, &LONS)?;
        let sst: Vec<f32> = generate(LATS.len(), LONS.len(), temperature_value)
            .into_iter()
            .map(|v| v as f32)
            .collect();
        file.add_variable::<f32>("SST", &["time", "lat", "lon"])?
            .put_values(&sst, ..)?;
        Ok(())
    });
    let diff = write_dataset(
        dir,
        "env_diff/Env_var_annual_mean_Model_Mean_RCP85-RCP26.nc",
        |file| {
            add_axes(file, YEARS, &LATS, &LONS)?;
            let sst = generate(LATS.len(), LONS.len(), |t, _, _| 1.5 * t as f64);
            add_series(file, "SST", &sst)?;
            Ok(())
        },
    );
    (base, diff)
}

/// Write the biomes file with a time-invariant i32 classification for RCP 2.6.
pub(crate) fn write_biomes(dir: &Path) -> PathBuf {
    write_dataset(dir, "MAPMAKER_Biomes_Data_file_v2.nc", |file| {
        add_axes(file, 0, &LATS, &LONS)?;
        let biomes: Vec<i32> = (0..LATS.len() * LONS.len())
            .map(|n| (n % 3) as i32 + 1)
            .collect();
        file.add_variable::<i32>("annual_biomes_RCP26", &["lat", "lon"])?
            .put_values(&biomes, ..)?;
        Ok(())
    })
}

/// Write every fixture into `dir`.
pub(crate) fn write_catalog(dir: &Path) {
    write_ascending(dir);
    write_environmental(dir);
    write_biomes(dir);
}
