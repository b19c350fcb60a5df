use std::collections::HashMap;

use serde::Serialize;

use crate::analysis::{Mean, compare_station_ids, is_pollutant};
use crate::merge::station_key;
use crate::model::Measurement;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationRank {
    pub station_id: String,
    pub station_name: String,
    pub mean: f64,
    pub count: usize,
}

/// Stations ordered by mean `pollutant` value, highest first; ties are
/// broken by station id in `compare_station_ids` order. At most `top_n`
/// entries.
pub fn station_ranking(measurements: &[Measurement], pollutant: &str, top_n: usize) -> Vec<StationRank> {
    let mut by_station: HashMap<String, (&Measurement, Mean)> = HashMap::new();
    for m in measurements.iter().filter(|m| is_pollutant(m, pollutant)) {
        by_station
            .entry(station_key(&m.station_id))
            .or_insert((m, Mean::default()))
            .1
            .add(m.value);
    }

    let mut ranking: Vec<StationRank> = by_station
        .into_values()
        .map(|(first, mean)| StationRank {
            station_id: first.station_id.clone(),
            station_name: first.station_name.clone(),
            mean: mean.value(),
            count: mean.count(),
        })
        .collect();
    ranking.sort_by(|a, b| {
        b.mean
            .total_cmp(&a.mean)
            .then_with(|| compare_station_ids(&a.station_id, &b.station_id))
    });
    ranking.truncate(top_n);
    ranking
}
