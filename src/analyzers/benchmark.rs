use tracing::info;

use crate::analyzers::annual::annual_averages;
use crate::analyzers::types::{AnnualMetric, HierarchyAverage, HierarchyBenchmark};
use crate::analyzers::utility::MeanAccumulator;
use crate::daily::DailyTotalRule;
use crate::filter::UNKNOWN_HIERARCHY;
use crate::model::{HourlyCountRow, StationIndex};

/// Averages the per-station annual metric of `year` across each road
/// hierarchy. Stations with an undefined annual value are counted but
/// do not contribute to the mean.
pub fn hierarchy_benchmark<'a, I>(
    rows: I,
    stations: &StationIndex,
    year: i32,
    metric: AnnualMetric,
    rule: &DailyTotalRule,
) -> HierarchyBenchmark
where
    I: IntoIterator<Item = &'a HourlyCountRow>,
{
    let per_station = annual_averages(rows.into_iter().filter(|r| r.year == year), metric, rule);

    let mut hierarchies: Vec<(String, usize, MeanAccumulator)> = Vec::new();
    let mut faults = Vec::new();

    for average in per_station {
        let hierarchy = stations
            .hierarchy(average.station_key)
            .unwrap_or(UNKNOWN_HIERARCHY);

        let idx = match hierarchies.iter().position(|(h, _, _)| h == hierarchy) {
            Some(idx) => idx,
            None => {
                hierarchies.push((hierarchy.to_string(), 0, MeanAccumulator::default()));
                hierarchies.len() - 1
            }
        };
        let entry = &mut hierarchies[idx];
        entry.1 += 1;
        if let Some(value) = average.value.value() {
            entry.2.push(value);
        }
        faults.extend(average.faults);
    }

    info!(
        year,
        ?metric,
        hierarchies = hierarchies.len(),
        "Hierarchy benchmark computed"
    );

    HierarchyBenchmark {
        year,
        metric,
        hierarchies: hierarchies
            .into_iter()
            .map(|(hierarchy, stations, acc)| HierarchyAverage {
                hierarchy,
                stations,
                defined_stations: acc.count(),
                mean: acc.measure(),
            })
            .collect(),
        faults,
    }
}
