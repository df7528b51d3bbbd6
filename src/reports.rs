//! The aggregate views behind each dashboard panel.
//!
//! Everything here is a pure function of the loaded dataset and the city
//! selection: no side effects, recomputed on every render, results handed
//! straight to the charting facility and dropped.

use crate::types::{
    CityRank, CorrelationMatrix, Dataset, Measurement, MonthlyMean, Pollutant, ScatterPoint,
    SnapshotEntry, TrendPoint, YearlyTrend, YearlyTrendRow,
};
use crate::util::{mean, pearson};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Borrowed view of the rows for one city. An unknown city yields an empty
/// subset, not an error; the panels then render empty.
pub fn city_subset<'a>(data: &'a Dataset, city: &str) -> Vec<&'a Measurement> {
    data.rows.iter().filter(|m| m.city == city).collect()
}

/// (Date, PM2.5) pairs ordered by date. Rows with a missing date have no
/// place on a time axis and are left out.
pub fn pm25_trend(subset: &[&Measurement]) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = subset
        .iter()
        .filter_map(|m| {
            let date = m.date?;
            let pm25 = m.value(Pollutant::Pm25)?;
            Some(TrendPoint { date, pm25 })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

/// Pollutant concentrations from the most recent dated row of the subset.
/// Ties on the date resolve to the later row in file order.
pub fn latest_snapshot(subset: &[&Measurement], pollutants: &[Pollutant]) -> Vec<SnapshotEntry> {
    let mut latest: Option<&Measurement> = None;
    for &m in subset {
        let Some(date) = m.date else { continue };
        if latest.and_then(|l| l.date).map_or(true, |best| date >= best) {
            latest = Some(m);
        }
    }
    let Some(row) = latest else {
        return Vec::new();
    };
    pollutants
        .iter()
        .filter(|p| p.is_concentration())
        .filter_map(|p| {
            Some(SnapshotEntry {
                pollutant: *p,
                concentration: row.value(*p)?,
            })
        })
        .collect()
}

/// Mean of each requested pollutant grouped by (City, Year) over the whole
/// table, then narrowed to the selected city and ordered by year.
///
/// Grouping by the (City, Year) pair keeps two cities' rows out of each
/// other's buckets even though only one city survives to the result.
/// Requested pollutants outside the capability set are dropped.
pub fn yearly_means(data: &Dataset, city: &str, wanted: &[Pollutant]) -> YearlyTrend {
    let pollutants: Vec<Pollutant> = wanted.iter().copied().filter(|p| data.has(*p)).collect();

    let mut groups: HashMap<(&str, i32), Vec<Vec<f64>>> = HashMap::new();
    for m in &data.rows {
        let Some(year) = m.year else { continue };
        let sums = groups
            .entry((m.city.as_str(), year))
            .or_insert_with(|| vec![Vec::new(); pollutants.len()]);
        for (i, p) in pollutants.iter().enumerate() {
            if let Some(v) = m.value(*p) {
                sums[i].push(v);
            }
        }
    }

    let mut rows: Vec<YearlyTrendRow> = groups
        .into_iter()
        .filter(|((c, _), _)| *c == city)
        .map(|((_, year), cols)| YearlyTrendRow {
            year,
            means: cols.iter().map(|vs| mean(vs).unwrap_or(0.0)).collect(),
        })
        .collect();
    rows.sort_by_key(|r| r.year);
    YearlyTrend { pollutants, rows }
}

/// Mean PM2.5 per calendar month within the subset. Only months with data
/// appear; output is ordered 1..=12.
pub fn monthly_means(subset: &[&Measurement]) -> Vec<MonthlyMean> {
    let mut groups: HashMap<u32, Vec<f64>> = HashMap::new();
    for m in subset {
        let (Some(month), Some(pm25)) = (m.month, m.value(Pollutant::Pm25)) else {
            continue;
        };
        groups.entry(month).or_default().push(pm25);
    }
    let mut rows: Vec<MonthlyMean> = groups
        .into_iter()
        .map(|(month, vs)| MonthlyMean {
            month,
            pm25: mean(&vs).unwrap_or(0.0),
        })
        .collect();
    rows.sort_by_key(|r| r.month);
    rows
}

/// Pairwise Pearson correlation over the present concentration pollutants,
/// computed on the city subset. Symmetric with a fixed 1.0 diagonal; a
/// zero-variance column produces NaN off-diagonal cells.
pub fn correlation_matrix(subset: &[&Measurement], pollutants: &[Pollutant]) -> CorrelationMatrix {
    let pollutants: Vec<Pollutant> = pollutants
        .iter()
        .copied()
        .filter(|p| p.is_concentration())
        .collect();
    let columns: Vec<Vec<f64>> = pollutants
        .iter()
        .map(|p| subset.iter().filter_map(|m| m.value(*p)).collect())
        .collect();

    let n = pollutants.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson(&columns[i], &columns[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    CorrelationMatrix { pollutants, values }
}

/// (PM10, PM2.5, Year) triples for the subset, in file order. The year is
/// missing for rows whose date did not parse; the facility colors those as
/// unlabeled.
pub fn scatter_pairs(subset: &[&Measurement]) -> Vec<ScatterPoint> {
    subset
        .iter()
        .filter_map(|m| {
            Some(ScatterPoint {
                pm10: m.value(Pollutant::Pm10)?,
                pm25: m.value(Pollutant::Pm25)?,
                year: m.year,
            })
        })
        .collect()
}

/// Raw AQI values for the subset; bucketing into equal-width bins is the
/// charting facility's job.
pub fn aqi_values(subset: &[&Measurement]) -> Vec<f64> {
    subset
        .iter()
        .filter_map(|m| m.value(Pollutant::Aqi))
        .collect()
}

/// Cities ranked by mean PM2.5 over the whole (unfiltered) table,
/// descending, first `limit`. Ties break on the city name so the ranking
/// is deterministic.
pub fn top_polluted_cities(data: &Dataset, limit: usize) -> Vec<CityRank> {
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
    for m in &data.rows {
        if let Some(v) = m.value(Pollutant::Pm25) {
            groups.entry(m.city.as_str()).or_default().push(v);
        }
    }
    let mut ranks: Vec<CityRank> = groups
        .into_iter()
        .map(|(city, vs)| CityRank {
            city: city.to_string(),
            avg_pm25: mean(&vs).unwrap_or(0.0),
        })
        .collect();
    ranks.sort_by(|a, b| {
        b.avg_pm25
            .partial_cmp(&a.avg_pm25)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.city.cmp(&b.city))
    });
    ranks.truncate(limit);
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::parse_date_safe;

    fn meas(city: &str, date: &str, values: &[(Pollutant, f64)]) -> Measurement {
        let mut m = Measurement::new(city.to_string(), parse_date_safe(Some(date)));
        for (p, v) in values {
            m.set_value(*p, Some(*v));
        }
        m
    }

    fn dataset(rows: Vec<Measurement>, pollutants: Vec<Pollutant>) -> Dataset {
        let mut cities: Vec<String> = rows.iter().map(|m| m.city.clone()).collect();
        cities.sort();
        cities.dedup();
        Dataset {
            rows,
            pollutants,
            cities,
        }
    }

    #[test]
    fn unknown_city_yields_empty_subset() {
        let data = dataset(
            vec![meas("Delhi", "2020-01-01", &[(Pollutant::Pm25, 50.0)])],
            vec![Pollutant::Pm25],
        );
        assert!(city_subset(&data, "Atlantis").is_empty());
    }

    #[test]
    fn trend_orders_by_date_and_drops_undated_rows() {
        let data = dataset(
            vec![
                meas("Delhi", "2020-03-01", &[(Pollutant::Pm25, 30.0)]),
                meas("Delhi", "bad date", &[(Pollutant::Pm25, 99.0)]),
                meas("Delhi", "2020-01-01", &[(Pollutant::Pm25, 10.0)]),
            ],
            vec![Pollutant::Pm25],
        );
        let trend = pm25_trend(&city_subset(&data, "Delhi"));
        let values: Vec<f64> = trend.iter().map(|p| p.pm25).collect();
        assert_eq!(values, vec![10.0, 30.0]);
    }

    #[test]
    fn snapshot_takes_most_recent_row() {
        let data = dataset(
            vec![
                meas("Delhi", "2020-01-01", &[(Pollutant::Pm25, 10.0)]),
                meas("Delhi", "2020-06-01", &[(Pollutant::Pm25, 70.0)]),
                meas("Delhi", "2020-03-01", &[(Pollutant::Pm25, 40.0)]),
            ],
            vec![Pollutant::Pm25],
        );
        let snap = latest_snapshot(&city_subset(&data, "Delhi"), &data.pollutants);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].pollutant, Pollutant::Pm25);
        assert_eq!(snap[0].concentration, 70.0);
    }

    #[test]
    fn snapshot_excludes_aqi() {
        let data = dataset(
            vec![meas(
                "Delhi",
                "2020-01-01",
                &[(Pollutant::Pm25, 10.0), (Pollutant::Aqi, 12.0)],
            )],
            vec![Pollutant::Pm25, Pollutant::Aqi],
        );
        let snap = latest_snapshot(&city_subset(&data, "Delhi"), &data.pollutants);
        assert!(snap.iter().all(|e| e.pollutant != Pollutant::Aqi));
    }

    #[test]
    fn yearly_means_keep_cities_apart() {
        let data = dataset(
            vec![
                meas("Delhi", "2020-01-01", &[(Pollutant::Pm25, 100.0)]),
                meas("Mumbai", "2020-01-01", &[(Pollutant::Pm25, 10.0)]),
                meas("Delhi", "2020-06-01", &[(Pollutant::Pm25, 50.0)]),
            ],
            vec![Pollutant::Pm25],
        );
        let trend = yearly_means(&data, "Delhi", &[Pollutant::Pm25, Pollutant::Pm10]);
        // PM10 not in the capability set, so only PM2.5 survives.
        assert_eq!(trend.pollutants, vec![Pollutant::Pm25]);
        assert_eq!(trend.rows.len(), 1);
        assert_eq!(trend.rows[0].year, 2020);
        assert_eq!(trend.rows[0].means, vec![75.0]);
    }

    #[test]
    fn monthly_mean_of_january_pair() {
        let data = dataset(
            vec![
                meas("X", "2020-01-05", &[(Pollutant::Pm25, 10.0)]),
                meas("X", "2021-01-20", &[(Pollutant::Pm25, 20.0)]),
                meas("X", "2020-02-01", &[(Pollutant::Pm25, 99.0)]),
            ],
            vec![Pollutant::Pm25],
        );
        let rows = monthly_means(&city_subset(&data, "X"));
        assert_eq!(rows[0].month, 1);
        assert_eq!(rows[0].pm25, 15.0);
    }

    #[test]
    fn correlation_is_symmetric_with_unit_diagonal() {
        let data = dataset(
            vec![
                meas(
                    "Delhi",
                    "2020-01-01",
                    &[(Pollutant::Pm25, 10.0), (Pollutant::Pm10, 20.0)],
                ),
                meas(
                    "Delhi",
                    "2020-01-02",
                    &[(Pollutant::Pm25, 30.0), (Pollutant::Pm10, 35.0)],
                ),
                meas(
                    "Delhi",
                    "2020-01-03",
                    &[(Pollutant::Pm25, 50.0), (Pollutant::Pm10, 80.0)],
                ),
            ],
            vec![Pollutant::Pm25, Pollutant::Pm10],
        );
        let corr = correlation_matrix(&city_subset(&data, "Delhi"), &data.pollutants);
        for i in 0..corr.pollutants.len() {
            assert_eq!(corr.values[i][i], 1.0);
            for j in 0..corr.pollutants.len() {
                let a = corr.values[i][j];
                let b = corr.values[j][i];
                assert!(a == b || (a.is_nan() && b.is_nan()));
            }
        }
    }

    #[test]
    fn ranking_orders_by_descending_mean() {
        let data = dataset(
            vec![
                meas("C", "2020-01-01", &[(Pollutant::Pm25, 40.0)]),
                meas("A", "2020-01-01", &[(Pollutant::Pm25, 80.0)]),
                meas("B", "2020-01-01", &[(Pollutant::Pm25, 60.0)]),
            ],
            vec![Pollutant::Pm25],
        );
        let ranks = top_polluted_cities(&data, 10);
        let order: Vec<&str> = ranks.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[test]
    fn ranking_truncates_to_limit() {
        let rows = (0..15)
            .map(|i| {
                meas(
                    &format!("City{:02}", i),
                    "2020-01-01",
                    &[(Pollutant::Pm25, i as f64)],
                )
            })
            .collect();
        let data = dataset(rows, vec![Pollutant::Pm25]);
        assert_eq!(top_polluted_cities(&data, 10).len(), 10);
    }
}
