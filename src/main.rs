// Entry point and interaction loop.
//
// Startup loads and cleans the dataset exactly once (memoized by the
// loader); every city selection then triggers one synchronous render pass
// over the fixed panel sequence. There is no other state: aggregates are
// recomputed per render and dropped after the charting handoff.
use air_quality_dashboard::charts::{self, ChartKind, ChartSpec, ChartTable};
use air_quality_dashboard::types::{self, Dataset, Pollutant};
use air_quality_dashboard::{loader, reports, util};
use std::io::{self, Write};

const DEFAULT_DATA_PATH: &str = "data/air_quality_india.csv";

/// Pollutants shown in the multi-pollutant yearly trend panel, intersected
/// with the capability set at render time.
const TREND_POLLUTANTS: [Pollutant; 5] = [
    Pollutant::Pm25,
    Pollutant::Pm10,
    Pollutant::No2,
    Pollutant::So2,
    Pollutant::O3,
];

fn data_path() -> String {
    std::env::var("AIR_QUALITY_DATA").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string())
}

/// Read a single line of input after printing the common prompt.
/// `None` means stdin closed; the caller should stop asking.
fn read_choice() -> Option<String> {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Single selection control: pick one of the distinct cities by list index
/// or exact name. Loops until the input matches; `None` on closed stdin.
fn select_city(cities: &[String]) -> Option<String> {
    println!("Select City:");
    for (i, city) in cities.iter().enumerate() {
        println!("[{}] {}", i + 1, city);
    }
    loop {
        let choice = read_choice()?;
        if let Ok(idx) = choice.parse::<usize>() {
            if idx >= 1 && idx <= cities.len() {
                return Some(cities[idx - 1].clone());
            }
        }
        if let Some(city) = cities.iter().find(|c| c.as_str() == choice) {
            return Some(city.clone());
        }
        println!("Invalid choice. Enter a number 1-{} or a city name.", cities.len());
    }
}

/// Ask whether to pick another city after a render pass.
fn prompt_another_city() -> bool {
    loop {
        print!("Select another city (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        match io::stdin().read_line(&mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// One full render pass: the nine panels in fixed order. Panels derived
/// from the city subset carry the city name in their title; the whole-table
/// ranking keeps its global title.
fn render_dashboard(data: &Dataset, city: &str) {
    let subset = reports::city_subset(data, city);

    // 1. PM2.5 time series
    let trend = reports::pm25_trend(&subset);
    let mut table = ChartTable::new(vec!["Date".into(), "PM2.5".into()]);
    for point in &trend {
        table.push_row(vec![
            point.date.to_string(),
            util::format_number(point.pm25, 2),
        ]);
    }
    charts::render(
        &ChartSpec::new(
            ChartKind::Line,
            format!("PM2.5 Over Time in {}", city),
            "Date",
            "PM2.5",
        ),
        &table,
    );

    // 2. Latest pollutant snapshot
    let snapshot = reports::latest_snapshot(&subset, &data.pollutants);
    let mut table = ChartTable::new(vec!["Pollutant".into(), "Concentration".into()]);
    for entry in &snapshot {
        table.push_row(vec![
            entry.pollutant.column_name().to_string(),
            util::format_number(entry.concentration, 2),
        ]);
    }
    charts::render(
        &ChartSpec::new(
            ChartKind::Bar,
            format!("Latest Pollutant Levels in {}", city),
            "Pollutant",
            "Concentration",
        )
        .with_color("Concentration"),
        &table,
    );

    // 3. Yearly PM2.5/PM10 means
    let yearly = reports::yearly_means(data, city, &[Pollutant::Pm25, Pollutant::Pm10]);
    charts::render(
        &ChartSpec::new(
            ChartKind::Line,
            format!("Average PM2.5 Over Years in {}", city),
            "Year",
            "PM2.5",
        ),
        &yearly_table(&yearly),
    );

    // 4. Correlation heatmap
    let corr = reports::correlation_matrix(&subset, &data.pollutants);
    let mut columns = vec![String::new()];
    columns.extend(corr.pollutants.iter().map(|p| p.column_name().to_string()));
    let mut table = ChartTable::new(columns);
    for (i, p) in corr.pollutants.iter().enumerate() {
        let mut row = vec![p.column_name().to_string()];
        row.extend(corr.values[i].iter().map(|v| util::format_number(*v, 2)));
        table.push_row(row);
    }
    charts::render(
        &ChartSpec::new(
            ChartKind::Heatmap,
            format!("Pollutant Correlation Matrix ({})", city),
            "Pollutant",
            "Pollutant",
        ),
        &table,
    );

    // 5. Monthly PM2.5 means
    let monthly = reports::monthly_means(&subset);
    let mut table = ChartTable::new(vec!["Month".into(), "PM2.5".into()]);
    for row in &monthly {
        table.push_row(vec![row.month.to_string(), util::format_number(row.pm25, 2)]);
    }
    charts::render(
        &ChartSpec::new(
            ChartKind::Bar,
            format!("Average PM2.5 by Month in {}", city),
            "Month (1=Jan, 12=Dec)",
            "Average PM2.5",
        )
        .with_color("PM2.5"),
        &table,
    );

    // 6. PM2.5 vs PM10 scatter, only when the file carries PM10
    if data.has(Pollutant::Pm10) {
        let points = reports::scatter_pairs(&subset);
        let mut table = ChartTable::new(vec!["PM10".into(), "PM2.5".into(), "Year".into()]);
        for p in &points {
            table.push_row(vec![
                util::format_number(p.pm10, 2),
                util::format_number(p.pm25, 2),
                p.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
            ]);
        }
        charts::render(
            &ChartSpec::new(
                ChartKind::Scatter,
                format!("PM2.5 vs PM10 Scatter Plot ({})", city),
                "PM10",
                "PM2.5",
            )
            .with_color("Year"),
            &table,
        );
    }

    // 7. Multi-pollutant yearly trend
    let multi = reports::yearly_means(data, city, &TREND_POLLUTANTS);
    let y_label = multi
        .pollutants
        .iter()
        .map(|p| p.column_name())
        .collect::<Vec<_>>()
        .join(", ");
    charts::render(
        &ChartSpec::new(
            ChartKind::Line,
            format!("Yearly Pollutant Trends in {}", city),
            "Year",
            &y_label,
        ),
        &yearly_table(&multi),
    );

    // 8. AQI histogram
    let aqi = reports::aqi_values(&subset);
    let bins = charts::histogram_bins(&aqi, 30);
    let mut table = ChartTable::new(vec!["AQI Range".into(), "Count".into()]);
    for bin in &bins {
        table.push_row(vec![
            format!(
                "{} to {}",
                util::format_number(bin.lower, 1),
                util::format_number(bin.upper, 1)
            ),
            util::format_int(bin.count as i64),
        ]);
    }
    charts::render(
        &ChartSpec::new(
            ChartKind::Histogram,
            format!("Distribution of AQI in {}", city),
            "AQI",
            "Count",
        ),
        &table,
    );

    // 9. Top 10 ranking over the whole table
    let ranking = reports::top_polluted_cities(data, 10);
    let mut table = ChartTable::new(vec!["City".into(), "PM2.5".into()]);
    for rank in &ranking {
        table.push_row(vec![rank.city.clone(), util::format_number(rank.avg_pm25, 2)]);
    }
    charts::render(
        &ChartSpec::new(
            ChartKind::Bar,
            "Top 10 Polluted Cities (Average PM2.5)",
            "City",
            "PM2.5",
        )
        .with_color("PM2.5"),
        &table,
    );
}

fn yearly_table(trend: &types::YearlyTrend) -> ChartTable {
    let mut columns = vec!["Year".to_string()];
    columns.extend(trend.pollutants.iter().map(|p| p.column_name().to_string()));
    let mut table = ChartTable::new(columns);
    for row in &trend.rows {
        let mut cells = vec![row.year.to_string()];
        cells.extend(row.means.iter().map(|m| util::format_number(*m, 2)));
        table.push_row(cells);
    }
    table
}

fn main() {
    env_logger::init();
    println!("India Air Quality Dashboard");
    println!("Visualizing CPCB air quality measurements\n");

    let path = data_path();
    let data = match loader::load_cached(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Failed to load {}: {}", path, e);
            std::process::exit(1);
        }
    };
    println!(
        "Processing dataset... ({} rows loaded, {} cities, {} pollutant columns)\n",
        util::format_int(data.rows.len() as i64),
        util::format_int(data.cities.len() as i64),
        data.pollutants.len()
    );
    if data.cities.is_empty() {
        eprintln!("No cities present in {}", path);
        std::process::exit(1);
    }

    loop {
        let Some(city) = select_city(&data.cities) else {
            break;
        };
        println!();
        render_dashboard(&data, &city);
        if !prompt_another_city() {
            break;
        }
        println!();
    }
    println!("Exiting the dashboard.");
}
