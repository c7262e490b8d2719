//! Photometric filter bank.
//!
//! Each supported filter is stored as `<FilterName>Filter.csv`: two columns,
//! wavelength (um) and quantum efficiency, optionally preceded by a header row.
//! The bank is loaded once and shared read-only.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::SedError;
use crate::math::{interp_many, trapz};
use crate::physics::frequency_hz;

/// The fixed set of supported instrument filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterName {
    Irac1,
    Irac2,
    Irac3,
    Irac4,
    WiseW1,
    WiseW2,
    WiseW3,
    WiseW4,
    Iras12,
    Iras60,
    Iras100,
    Mips24,
    Mips70,
    Mips160,
    Pacs70,
    Pacs100,
    Pacs160,
    Spire250,
    Spire350,
    Spire500,
}

impl FilterName {
    pub const ALL: [FilterName; 20] = [
        FilterName::Irac1,
        FilterName::Irac2,
        FilterName::Irac3,
        FilterName::Irac4,
        FilterName::WiseW1,
        FilterName::WiseW2,
        FilterName::WiseW3,
        FilterName::WiseW4,
        FilterName::Iras12,
        FilterName::Iras60,
        FilterName::Iras100,
        FilterName::Mips24,
        FilterName::Mips70,
        FilterName::Mips160,
        FilterName::Pacs70,
        FilterName::Pacs100,
        FilterName::Pacs160,
        FilterName::Spire250,
        FilterName::Spire350,
        FilterName::Spire500,
    ];

    /// Name as used in observation tables and resource file names.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterName::Irac1 => "IRAC1",
            FilterName::Irac2 => "IRAC2",
            FilterName::Irac3 => "IRAC3",
            FilterName::Irac4 => "IRAC4",
            FilterName::WiseW1 => "WISE_W1",
            FilterName::WiseW2 => "WISE_W2",
            FilterName::WiseW3 => "WISE_W3",
            FilterName::WiseW4 => "WISE_W4",
            FilterName::Iras12 => "IRAS12",
            FilterName::Iras60 => "IRAS60",
            FilterName::Iras100 => "IRAS100",
            FilterName::Mips24 => "MIPS24",
            FilterName::Mips70 => "MIPS70",
            FilterName::Mips160 => "MIPS160",
            FilterName::Pacs70 => "PACS70",
            FilterName::Pacs100 => "PACS100",
            FilterName::Pacs160 => "PACS160",
            FilterName::Spire250 => "SPIRE250ps",
            FilterName::Spire350 => "SPIRE350ps",
            FilterName::Spire500 => "SPIRE500ps",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}Filter.csv", self.as_str())
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterName {
    type Err = SedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        FilterName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| SedError::UnknownFilter(s.to_string()))
    }
}

/// A photometric passband (observed-frame microns).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: FilterName,
    wavelength: Vec<f64>,
    qe: Vec<f64>,
}

impl Filter {
    /// Build a filter, checking ordering, sign and a non-zero `∫QE dν`.
    pub fn new(name: FilterName, wavelength: Vec<f64>, qe: Vec<f64>) -> Result<Self, SedError> {
        if wavelength.len() != qe.len() {
            return Err(SedError::resource(format!(
                "filter {name}: wavelength ({}) and QE ({}) lengths differ",
                wavelength.len(),
                qe.len()
            )));
        }
        if wavelength.len() < 2 {
            return Err(SedError::resource(format!("filter {name}: needs at least 2 points")));
        }
        if wavelength.iter().chain(&qe).any(|v| !v.is_finite()) {
            return Err(SedError::resource(format!("filter {name}: non-finite value")));
        }
        if wavelength.windows(2).any(|w| w[1] <= w[0]) || wavelength[0] <= 0.0 {
            return Err(SedError::resource(format!(
                "filter {name}: wavelengths must be positive and in ascending order"
            )));
        }
        if qe.iter().any(|&v| v < 0.0) {
            return Err(SedError::resource(format!("filter {name}: negative QE")));
        }

        let filter = Self {
            name,
            wavelength,
            qe,
        };
        let (nu, qe_nu) = filter.frequency_grid();
        if trapz(&nu, &qe_nu) <= 0.0 {
            return Err(SedError::resource(format!("filter {name}: QE integrates to zero")));
        }
        Ok(filter)
    }

    pub fn name(&self) -> FilterName {
        self.name
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    /// Wavelength range where the QE is non-zero.
    pub fn sensitive_range(&self) -> (f64, f64) {
        let first = self.qe.iter().position(|&q| q > 0.0).unwrap_or(0);
        let last = self
            .qe
            .iter()
            .rposition(|&q| q > 0.0)
            .unwrap_or(self.qe.len() - 1);
        (self.wavelength[first], self.wavelength[last])
    }

    /// QE-weighted mean wavelength (um), used as the nominal point wavelength.
    pub fn mean_wavelength(&self) -> f64 {
        let weighted: Vec<f64> = self.wavelength.iter().zip(&self.qe).map(|(l, q)| l * q).collect();
        trapz(&self.wavelength, &weighted) / trapz(&self.wavelength, &self.qe)
    }

    /// Passband in ascending frequency order.
    fn frequency_grid(&self) -> (Vec<f64>, Vec<f64>) {
        let nu = self.wavelength.iter().rev().map(|&l| frequency_hz(l)).collect();
        let qe = self.qe.iter().rev().copied().collect();
        (nu, qe)
    }

    /// QE-weighted mean over frequency of an observed-frame curve.
    ///
    /// `wavelength` (um, ascending) and `flux` describe the curve; it is
    /// linearly interpolated onto the passband and `∫F·QE dν / ∫QE dν` is
    /// returned. The sensitive part of the passband must lie inside the curve.
    pub fn band_average(&self, wavelength: &[f64], flux: &[f64]) -> Result<f64, SedError> {
        let (lo, hi) = self.sensitive_range();
        let (Some(&grid_lo), Some(&grid_hi)) = (wavelength.first(), wavelength.last()) else {
            return Err(SedError::numerical("empty model grid for synthetic photometry"));
        };
        if lo < grid_lo || hi > grid_hi {
            return Err(SedError::FilterOutOfRange {
                filter: self.name.to_string(),
                lo,
                hi,
                grid_lo,
                grid_hi,
            });
        }

        let flux_on_band = interp_many(&self.wavelength, wavelength, flux);
        let (nu, qe) = self.frequency_grid();
        let weighted: Vec<f64> = flux_on_band.iter().rev().zip(&qe).map(|(f, q)| f * q).collect();
        Ok(trapz(&nu, &weighted) / trapz(&nu, &qe))
    }
}

/// All filters available to a run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FilterBank {
    filters: BTreeMap<FilterName, Filter>,
}

impl FilterBank {
    pub fn from_filters(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            filters: filters.into_iter().map(|f| (f.name, f)).collect(),
        }
    }

    /// Load every `<FilterName>Filter.csv` present in `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, SedError> {
        let mut filters = BTreeMap::new();
        for name in FilterName::ALL {
            let path = dir.join(name.file_name());
            if !path.is_file() {
                debug!(filter = %name, "no passband file");
                continue;
            }
            filters.insert(name, read_filter_csv(name, &path)?);
        }
        if filters.is_empty() {
            return Err(SedError::resource(format!(
                "no filter passbands found in '{}'",
                dir.display()
            )));
        }
        info!(count = filters.len(), dir = %dir.display(), "loaded filter bank");
        Ok(Self { filters })
    }

    /// Look up a filter by its table name.
    pub fn get(&self, name: &str) -> Result<&Filter, SedError> {
        let key = FilterName::from_str(name)?;
        self.filters
            .get(&key)
            .ok_or_else(|| SedError::UnknownFilter(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    pub fn names(&self) -> impl Iterator<Item = FilterName> + '_ {
        self.filters.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

fn read_filter_csv(name: FilterName, path: &Path) -> Result<Filter, SedError> {
    let file = File::open(path).map_err(|e| SedError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut wavelength = Vec::new();
    let mut qe = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let parsed = (
            record.get(0).and_then(|s| s.parse::<f64>().ok()),
            record.get(1).and_then(|s| s.parse::<f64>().ok()),
        );
        match parsed {
            (Some(l), Some(q)) => {
                wavelength.push(l);
                qe.push(q);
            }
            // Optional header row.
            _ if idx == 0 => continue,
            _ => {
                return Err(SedError::resource(format!(
                    "'{}' line {}: expected two numeric columns",
                    path.display(),
                    idx + 1
                )));
            }
        }
    }
    Filter::new(name, wavelength, qe)
}
