use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

/// The closed set of pollutant columns the dashboard knows about.
///
/// Which of these actually exist in a given file is decided once at load
/// time (the capability set on [`Dataset`]); every aggregator consults that
/// set instead of probing columns ad hoc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pollutant {
    Pm25,
    Pm10,
    No,
    No2,
    Nox,
    Nh3,
    So2,
    O3,
    Co,
    Aqi,
}

pub const POLLUTANT_COUNT: usize = 10;

impl Pollutant {
    pub const ALL: [Pollutant; POLLUTANT_COUNT] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No,
        Pollutant::No2,
        Pollutant::Nox,
        Pollutant::Nh3,
        Pollutant::So2,
        Pollutant::O3,
        Pollutant::Co,
        Pollutant::Aqi,
    ];

    /// Column header as it appears in the source file.
    pub fn column_name(self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::No => "NO",
            Pollutant::No2 => "NO2",
            Pollutant::Nox => "NOx",
            Pollutant::Nh3 => "NH3",
            Pollutant::So2 => "SO2",
            Pollutant::O3 => "O3",
            Pollutant::Co => "CO",
            Pollutant::Aqi => "AQI",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Concentration columns, i.e. everything except the (possibly derived)
    /// AQI proxy. The snapshot and correlation panels work over this subset.
    pub fn is_concentration(self) -> bool {
        self != Pollutant::Aqi
    }
}

/// One line of the source CSV, exactly as serde hands it to us. Every field
/// is optional; real exports have blanks, stray text and missing columns.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "PM2.5")]
    pub pm25: Option<String>,
    #[serde(rename = "PM10")]
    pub pm10: Option<String>,
    #[serde(rename = "NO")]
    pub no: Option<String>,
    #[serde(rename = "NO2")]
    pub no2: Option<String>,
    #[serde(rename = "NOx")]
    pub nox: Option<String>,
    #[serde(rename = "NH3")]
    pub nh3: Option<String>,
    #[serde(rename = "SO2")]
    pub so2: Option<String>,
    #[serde(rename = "O3")]
    pub o3: Option<String>,
    #[serde(rename = "CO")]
    pub co: Option<String>,
    #[serde(rename = "AQI")]
    pub aqi: Option<String>,
}

impl RawRow {
    pub fn pollutant_field(&self, p: Pollutant) -> Option<&str> {
        match p {
            Pollutant::Pm25 => self.pm25.as_deref(),
            Pollutant::Pm10 => self.pm10.as_deref(),
            Pollutant::No => self.no.as_deref(),
            Pollutant::No2 => self.no2.as_deref(),
            Pollutant::Nox => self.nox.as_deref(),
            Pollutant::Nh3 => self.nh3.as_deref(),
            Pollutant::So2 => self.so2.as_deref(),
            Pollutant::O3 => self.o3.as_deref(),
            Pollutant::Co => self.co.as_deref(),
            Pollutant::Aqi => self.aqi.as_deref(),
        }
    }
}

/// One (City, Date) observation after parsing.
///
/// `date` stays `None` when the source value did not parse; Year and Month
/// are missing exactly when the date is. Pollutant values are optional
/// until the cleaner has imputed column means, after which every pollutant
/// in the dataset's capability set is guaranteed present.
#[derive(Debug, Clone)]
pub struct Measurement {
    pub city: String,
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    values: [Option<f64>; POLLUTANT_COUNT],
}

impl Measurement {
    pub fn new(city: String, date: Option<NaiveDate>) -> Self {
        Measurement {
            city,
            year: date.map(|d| d.year()),
            month: date.map(|d| d.month()),
            date,
            values: [None; POLLUTANT_COUNT],
        }
    }

    pub fn value(&self, p: Pollutant) -> Option<f64> {
        self.values[p.index()]
    }

    pub fn set_value(&mut self, p: Pollutant, v: Option<f64>) {
        self.values[p.index()] = v;
    }
}

/// The loaded table: ordered measurement rows plus the two facts every
/// consumer needs, computed once at load time.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rows: Vec<Measurement>,
    /// Capability set: pollutants whose column exists in the source header
    /// (plus AQI when derived), in [`Pollutant::ALL`] order.
    pub pollutants: Vec<Pollutant>,
    /// Distinct city names, sorted.
    pub cities: Vec<String>,
}

impl Dataset {
    pub fn has(&self, p: Pollutant) -> bool {
        self.pollutants.contains(&p)
    }

    /// Present concentration pollutants (capability set minus AQI).
    pub fn concentration_pollutants(&self) -> Vec<Pollutant> {
        self.pollutants
            .iter()
            .copied()
            .filter(|p| p.is_concentration())
            .collect()
    }
}

// Aggregate views. All of these are transient: produced by one reports::*
// call, handed to the charting facility, dropped.

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub pm25: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub pollutant: Pollutant,
    pub concentration: f64,
}

/// Per-year means for a list of pollutants, already filtered to one city.
/// `rows[i].means` is parallel to `pollutants`.
#[derive(Debug, Clone, PartialEq)]
pub struct YearlyTrend {
    pub pollutants: Vec<Pollutant>,
    pub rows: Vec<YearlyTrendRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearlyTrendRow {
    pub year: i32,
    pub means: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyMean {
    pub month: u32,
    pub pm25: f64,
}

/// Pairwise Pearson correlations; `values` is square and parallel to
/// `pollutants` on both axes.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub pollutants: Vec<Pollutant>,
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub pm10: f64,
    pub pm25: f64,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityRank {
    pub city: String,
    pub avg_pm25: f64,
}
