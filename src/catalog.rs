//! Catalog of model output files.
//!
//! Maps the human-facing selector strings used by the front end (index, plankton group,
//! scenario, Earth system model and environmental parameter) to a NetCDF file and the name of a
//! variable inside it. Resolution is a pure function over static tables: no file is touched.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use strum_macros::{Display, EnumIter, EnumString};

use crate::error::MapMakerError;

const BIOMES_FILE: &str = "MAPMAKER_Biomes_Data_file_v2.nc";
const RICHNESS_FILE_PREFIX: &str = "Presence_Data_for_App";
const HSI_FILE_PREFIX: &str = "Species_Data_for_App";
const TURNOVER_FILE_PREFIX: &str = "jaccardIndex";
const ENVIRONMENTAL_FILE_PREFIX: &str = "Env_var_annual_mean";

/// Directory, relative to the data directory, holding scenario difference files.
pub const DIFFERENCE_DIR: &str = "env_diff";

/// The kind of a selector, used in error reporting.
#[derive(Clone, Copy, Debug, Display, PartialEq)]
pub enum SelectorKind {
    #[strum(serialize = "index")]
    Index,
    #[strum(serialize = "group")]
    Group,
    #[strum(serialize = "scenario")]
    Scenario,
    #[strum(serialize = "model")]
    Model,
    #[strum(serialize = "environmental parameter")]
    EnvParameter,
}

/// Ecological index
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq)]
pub enum Index {
    #[strum(serialize = "Biomes")]
    Biomes,
    #[strum(serialize = "Species Richness")]
    SpeciesRichness,
    #[strum(serialize = "Hotspots of Change in Diversity")]
    DiversityHotspots,
    #[strum(serialize = "Habitat Suitability Index (HSI)")]
    HabitatSuitability,
    #[strum(serialize = "Change in HSI")]
    HabitatSuitabilityChange,
    #[strum(serialize = "Species Turnover")]
    SpeciesTurnover,
}

impl Index {
    /// File name prefix and variable name prefix for indices other than biomes.
    fn file_and_variable_prefix(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Biomes => None,
            Self::SpeciesRichness => Some((RICHNESS_FILE_PREFIX, "spRich")),
            Self::DiversityHotspots => Some((RICHNESS_FILE_PREFIX, "hotspot_div_change")),
            Self::HabitatSuitability => Some((HSI_FILE_PREFIX, "hsi")),
            Self::HabitatSuitabilityChange => Some((HSI_FILE_PREFIX, "hsi_hotspot_div_change")),
            Self::SpeciesTurnover => Some((TURNOVER_FILE_PREFIX, "jaccard")),
        }
    }
}

/// Plankton group
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq)]
pub enum Group {
    #[strum(serialize = "Total Plankton")]
    TotalPlankton,
    #[strum(serialize = "Phytoplankton")]
    Phytoplankton,
    #[strum(serialize = "Zooplankton")]
    Zooplankton,
    #[strum(serialize = "Coccolithophores")]
    Coccolithophores,
    #[strum(serialize = "Copepods")]
    Copepods,
    #[strum(serialize = "Diatoms")]
    Diatoms,
    #[strum(serialize = "Dinoflagellates")]
    Dinoflagellates,
}

impl Group {
    /// Variable name suffix
    pub fn suffix(self) -> &'static str {
        match self {
            Self::TotalPlankton => "Tot",
            Self::Phytoplankton => "Phyto",
            Self::Zooplankton => "Zoo",
            Self::Coccolithophores => "Coccolith",
            Self::Copepods => "Copepods",
            Self::Diatoms => "Diat",
            Self::Dinoflagellates => "Dinofl",
        }
    }
}

/// Emission scenario, or the difference between two scenarios
///
/// Parses from the display label, the internal code, and the label spellings used by the front
/// end.
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq)]
pub enum Scenario {
    #[strum(to_string = "RCP 2.6 (Paris Agreement)", serialize = "RCP26")]
    Rcp26,
    #[strum(to_string = "RCP 4.5", serialize = "RCP45")]
    Rcp45,
    #[strum(to_string = "RCP 8.5 (Business as Usual)", serialize = "RCP85")]
    Rcp85,
    #[strum(
        to_string = "RCP 8.5 - RCP 2.6",
        serialize = "RCP 8.5 - RCP2.6",
        serialize = "RCP85-RCP26"
    )]
    Rcp85MinusRcp26,
    #[strum(to_string = "RCP 8.5 - RCP 4.5", serialize = "RCP85-RCP45")]
    Rcp85MinusRcp45,
    #[strum(to_string = "RCP 4.5 - RCP 2.6", serialize = "RCP45-RCP26")]
    Rcp45MinusRcp26,
}

impl Scenario {
    /// Code used in file and variable names.
    ///
    /// Difference scenarios are coded `{high}-{low}`.
    pub fn code(self) -> &'static str {
        match self {
            Self::Rcp26 => "RCP26",
            Self::Rcp45 => "RCP45",
            Self::Rcp85 => "RCP85",
            Self::Rcp85MinusRcp26 => "RCP85-RCP26",
            Self::Rcp85MinusRcp45 => "RCP85-RCP45",
            Self::Rcp45MinusRcp26 => "RCP45-RCP26",
        }
    }

    /// Whether the scenario is the difference between two scenarios.
    pub fn is_difference(self) -> bool {
        self.code().contains('-')
    }
}

/// Earth system model
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq)]
pub enum Model {
    #[strum(serialize = "Model Mean")]
    ModelMean,
    #[strum(serialize = "CNRM-CM5")]
    CnrmCm5,
    #[strum(serialize = "GFDL-ESM2M")]
    GfdlEsm2m,
    #[strum(serialize = "IPSL-CMSA-LR")]
    IpslCm5aLr,
}

impl Model {
    /// Code used in ecological index file names, naming the coupled biogeochemical model.
    pub fn ecological_code(self) -> &'static str {
        match self {
            Self::ModelMean => "Model_Mean",
            Self::CnrmCm5 => "CNRM-PISCES",
            Self::GfdlEsm2m => "GFDL-TOPAZ",
            Self::IpslCm5aLr => "IPSL-PISCES",
        }
    }

    /// Code used in environmental file names.
    pub fn environmental_code(self) -> &'static str {
        match self {
            Self::ModelMean => "Model_Mean",
            Self::CnrmCm5 => "CNRM-CM5",
            Self::GfdlEsm2m => "GFDL-ESM2M",
            Self::IpslCm5aLr => "IPSL-CM5A-LR",
        }
    }
}

/// Environmental parameter
#[derive(Clone, Copy, Debug, Display, EnumIter, EnumString, PartialEq)]
pub enum EnvParameter {
    #[strum(serialize = "Temperature")]
    Temperature,
    #[strum(serialize = "Oxygen")]
    Oxygen,
    #[strum(serialize = "Change in Temperature")]
    TemperatureChange,
    #[strum(serialize = "Chlorophyll-a Concentration")]
    Chlorophyll,
}

impl EnvParameter {
    /// Name of the variable within the environmental file.
    pub fn variable(self) -> &'static str {
        match self {
            Self::Temperature => "SST",
            Self::Oxygen => "dO2",
            Self::TemperatureChange => "dSST",
            Self::Chlorophyll => "logChl",
        }
    }
}

/// A file and the variable to read from it.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDescriptor {
    /// Path to the NetCDF file
    pub path: PathBuf,
    /// Name of the variable within the file
    pub variable: String,
}

/// Parse a selector string, failing with [MapMakerError::UnknownSelector].
fn parse_selector<T: FromStr>(kind: SelectorKind, value: &str) -> Result<T, MapMakerError> {
    T::from_str(value).map_err(|_| MapMakerError::UnknownSelector {
        kind,
        value: value.to_string(),
    })
}

/// Resolves selectors to [VariableDescriptor]s below a data directory.
#[derive(Clone, Debug)]
pub struct Catalog {
    data_dir: PathBuf,
}

impl Catalog {
    /// Return a new Catalog rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve an ecological index.
    ///
    /// `Biomes` does not depend on the model or group and reads a single shared file, but the
    /// model must still be a known one. Every other index requires a group.
    ///
    /// # Arguments
    ///
    /// * `index`: Ecological index label
    /// * `group`: Plankton group label
    /// * `scenario`: Scenario label or code
    /// * `model`: Earth system model label
    pub fn resolve_grid(
        &self,
        index: &str,
        group: Option<&str>,
        scenario: &str,
        model: &str,
    ) -> Result<VariableDescriptor, MapMakerError> {
        let index: Index = parse_selector(SelectorKind::Index, index)?;
        let scenario: Scenario = parse_selector(SelectorKind::Scenario, scenario)?;
        let model: Model = parse_selector(SelectorKind::Model, model)?;

        let Some((file_prefix, variable_prefix)) = index.file_and_variable_prefix() else {
            // Biome classifications exist per base scenario only.
            if scenario.is_difference() {
                return Err(MapMakerError::UnknownSelector {
                    kind: SelectorKind::Scenario,
                    value: scenario.to_string(),
                });
            }
            return Ok(VariableDescriptor {
                path: self.data_dir.join(BIOMES_FILE),
                variable: format!("annual_biomes_{}", scenario.code()),
            });
        };

        let group = group.ok_or(MapMakerError::MissingSelector {
            kind: SelectorKind::Group,
        })?;
        let group: Group = parse_selector(SelectorKind::Group, group)?;
        let file_name = format!(
            "{}_{}_{}.nc",
            file_prefix,
            model.ecological_code(),
            scenario.code()
        );
        Ok(VariableDescriptor {
            path: self.data_dir.join(file_name),
            variable: format!("{}{}", variable_prefix, group.suffix()),
        })
    }

    /// Resolve an environmental parameter.
    ///
    /// Difference scenarios resolve to the precomputed delta file in [DIFFERENCE_DIR], which has
    /// the same layout as the base file.
    ///
    /// # Arguments
    ///
    /// * `parameter`: Environmental parameter label
    /// * `scenario`: Scenario label or code
    /// * `model`: Earth system model label
    pub fn resolve_environmental(
        &self,
        parameter: &str,
        scenario: &str,
        model: &str,
    ) -> Result<VariableDescriptor, MapMakerError> {
        let parameter: EnvParameter = parse_selector(SelectorKind::EnvParameter, parameter)?;
        let scenario: Scenario = parse_selector(SelectorKind::Scenario, scenario)?;
        let model: Model = parse_selector(SelectorKind::Model, model)?;

        let file_name = format!(
            "{}_{}_{}.nc",
            ENVIRONMENTAL_FILE_PREFIX,
            model.environmental_code(),
            scenario.code()
        );
        let path = if scenario.is_difference() {
            self.data_dir.join(DIFFERENCE_DIR).join(file_name)
        } else {
            self.data_dir.join(file_name)
        };
        Ok(VariableDescriptor {
            path,
            variable: parameter.variable().to_string(),
        })
    }
}
