use crate::types::{Dataset, Measurement, Pollutant, RawRow};
use crate::util::{mean, parse_date_safe, parse_f64_safe};
use csv::ReaderBuilder;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Columns the dashboard cannot work without. Their absence is the one
/// fatal load error; everything else degrades row by row.
const REQUIRED_COLUMNS: [&str; 3] = ["City", "Date", "PM2.5"];

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub skipped_no_city: usize,
    pub missing_dates: usize,
    pub imputed_values: usize,
    pub derived_aqi: bool,
}

/// Read the delimited file into a cleaned [`Dataset`].
///
/// The pipeline runs over the whole table, in this order:
/// 1. header check (required columns) and capability set detection,
/// 2. row parsing: date to calendar date or missing marker, numeric fields
///    to optional values,
/// 3. AQI derivation from raw PM2.5 when the file carries no AQI column,
/// 4. mean imputation of every remaining missing value.
/// Filtering by city never happens here; subsets are borrowed views built
/// per selection in `reports`.
pub fn load(path: &str) -> Result<(Dataset, LoadReport), Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h.trim() == required) {
            return Err(format!("required column '{}' not found in {}", required, path).into());
        }
    }

    // Capability set: which pollutant columns this file actually has.
    let mut pollutants: Vec<Pollutant> = Pollutant::ALL
        .iter()
        .copied()
        .filter(|p| headers.iter().any(|h| h.trim() == p.column_name()))
        .collect();

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    let mut skipped_no_city = 0usize;
    let mut missing_dates = 0usize;
    let mut rows: Vec<Measurement> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        total_rows += 1;
        let raw = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };

        // A row without a city can never be selected or grouped.
        let city = match raw.city.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => {
                skipped_no_city += 1;
                continue;
            }
        };

        let date = parse_date_safe(raw.date.as_deref());
        if date.is_none() {
            missing_dates += 1;
        }

        let mut m = Measurement::new(city, date);
        for p in &pollutants {
            m.set_value(*p, parse_f64_safe(raw.pollutant_field(*p)));
        }
        rows.push(m);
    }

    let derived_aqi = !pollutants.contains(&Pollutant::Aqi);
    if derived_aqi {
        derive_aqi(&mut rows);
        pollutants.push(Pollutant::Aqi);
    }

    let imputed_values = clean(&mut rows, &pollutants);

    let cities: Vec<String> = rows
        .iter()
        .map(|m| m.city.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let report = LoadReport {
        total_rows,
        loaded_rows: rows.len(),
        parse_errors,
        skipped_no_city,
        missing_dates,
        imputed_values,
        derived_aqi,
    };
    info!(
        "loaded {} of {} rows from {} ({} cities, {} pollutant columns)",
        report.loaded_rows,
        report.total_rows,
        path,
        cities.len(),
        pollutants.len()
    );
    if report.parse_errors > 0 || report.skipped_no_city > 0 {
        warn!(
            "skipped {} malformed rows and {} rows without a city",
            report.parse_errors, report.skipped_no_city
        );
    }
    if report.missing_dates > 0 {
        info!("{} rows carry an unparseable date", report.missing_dates);
    }
    if report.imputed_values > 0 {
        info!("imputed {} missing values with column means", report.imputed_values);
    }

    Ok((
        Dataset {
            rows,
            pollutants,
            cities,
        },
        report,
    ))
}

/// Synthesize the AQI proxy when the file does not carry one:
/// 1.2 x PM2.5 per row, 0 where PM2.5 is missing.
///
/// Runs on raw values, before imputation, so a missing reading maps to 0
/// rather than to the column mean.
pub fn derive_aqi(rows: &mut [Measurement]) {
    for m in rows {
        let pm25 = m.value(Pollutant::Pm25).unwrap_or(0.0);
        m.set_value(Pollutant::Aqi, Some(pm25 * 1.2));
    }
}

/// Replace every missing value with its column mean, computed over the
/// observed values of the full table.
///
/// A column with no observed values at all imputes to 0.0. Returns the
/// number of cells filled; a second run over the same rows returns 0.
pub fn clean(rows: &mut [Measurement], pollutants: &[Pollutant]) -> usize {
    let mut imputed = 0usize;
    for p in pollutants {
        let observed: Vec<f64> = rows.iter().filter_map(|m| m.value(*p)).collect();
        let fill = mean(&observed).unwrap_or(0.0);
        for m in rows.iter_mut() {
            if m.value(*p).is_none() {
                m.set_value(*p, Some(fill));
                imputed += 1;
            }
        }
    }
    imputed
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

// Process-wide read-only dataset cache. Written once per (path, mtime),
// only read afterwards; a changed file shows up as a new key on restart of
// the selection loop, not as mutation of a cached entry.
static LOAD_CACHE: Lazy<Mutex<HashMap<CacheKey, Arc<Dataset>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Memoized [`load`]: repeated renders reuse the dataset parsed at startup.
pub fn load_cached(path: &str) -> Result<Arc<Dataset>, Box<dyn Error>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
    let key = CacheKey {
        path: PathBuf::from(path),
        modified,
    };
    let mut cache = LOAD_CACHE.lock().unwrap();
    if let Some(dataset) = cache.get(&key) {
        debug!("dataset cache hit for {}", path);
        return Ok(Arc::clone(dataset));
    }
    let (dataset, _report) = load(path)?;
    let dataset = Arc::new(dataset);
    cache.insert(key, Arc::clone(&dataset));
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(city: &str, date: &str, pm25: Option<f64>) -> Measurement {
        let mut m = Measurement::new(city.to_string(), parse_date_safe(Some(date)));
        m.set_value(Pollutant::Pm25, pm25);
        m
    }

    #[test]
    fn aqi_derivation_scales_and_zeroes() {
        let mut rows = vec![
            row("Delhi", "2020-01-01", Some(50.0)),
            row("Delhi", "2020-01-02", None),
        ];
        derive_aqi(&mut rows);
        assert_eq!(rows[0].value(Pollutant::Aqi), Some(60.0));
        assert_eq!(rows[1].value(Pollutant::Aqi), Some(0.0));
    }

    #[test]
    fn clean_imputes_column_mean() {
        let mut rows = vec![
            row("Delhi", "2020-01-01", Some(10.0)),
            row("Delhi", "2020-01-02", None),
            row("Delhi", "2020-01-03", Some(30.0)),
        ];
        let imputed = clean(&mut rows, &[Pollutant::Pm25]);
        assert_eq!(imputed, 1);
        assert_eq!(rows[1].value(Pollutant::Pm25), Some(20.0));
    }

    #[test]
    fn clean_is_idempotent() {
        let mut rows = vec![
            row("Delhi", "2020-01-01", Some(10.0)),
            row("Delhi", "2020-01-02", None),
        ];
        clean(&mut rows, &[Pollutant::Pm25]);
        let snapshot: Vec<Option<f64>> =
            rows.iter().map(|m| m.value(Pollutant::Pm25)).collect();
        let second = clean(&mut rows, &[Pollutant::Pm25]);
        assert_eq!(second, 0);
        let after: Vec<Option<f64>> =
            rows.iter().map(|m| m.value(Pollutant::Pm25)).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn fully_missing_column_imputes_to_zero() {
        let mut rows = vec![row("Delhi", "2020-01-01", None)];
        rows[0].set_value(Pollutant::So2, None);
        clean(&mut rows, &[Pollutant::So2]);
        assert_eq!(rows[0].value(Pollutant::So2), Some(0.0));
    }
}
