use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::experiment::TrialRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub plan_calls: usize,
    pub expansions: usize,
    pub vertex_updates: usize,
    pub time_us: u64,
}

impl Stats {
    pub fn average_time_us(&self) -> f64 {
        if self.plan_calls == 0 {
            return 0.0;
        }
        self.time_us as f64 / self.plan_calls as f64
    }

    // Saturates instead of wrapping on absurd durations.
    pub fn record_time(&mut self, elapsed: Duration) {
        let micros = elapsed.as_micros().try_into().unwrap_or(u64::MAX);
        self.time_us = self.time_us.saturating_add(micros);
    }

    pub fn print(&self, planner: &str) {
        info!(
            "{planner}: plan calls {:?} Time(microseconds) {:?} expanded nodes {:?} vertex updates {:?}",
            self.plan_calls, self.time_us, self.expansions, self.vertex_updates
        );
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub lambda: f64,
    pub r: usize,
    pub capture_rate: f64,
    pub reached_rate: f64,
    pub mean_cost: f64,
    pub mean_plan_time: f64,
    pub trials: usize,
}

pub fn summarize(records: &[TrialRecord]) -> Vec<SummaryRow> {
    let mut groups: Vec<(f64, usize, Vec<&TrialRecord>)> = Vec::new();
    for record in records {
        match groups
            .iter_mut()
            .find(|(lambda, r, _)| *lambda == record.lambda && *r == record.r)
        {
            Some((_, _, group)) => group.push(record),
            None => groups.push((record.lambda, record.r, vec![record])),
        }
    }
    groups.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    groups
        .into_iter()
        .map(|(lambda, r, group)| {
            let trials = group.len() as f64;
            let mean = |value: fn(&TrialRecord) -> f64| {
                group.iter().map(|record| value(record)).sum::<f64>() / trials
            };
            SummaryRow {
                lambda,
                r,
                capture_rate: mean(|record| record.caught as u8 as f64),
                reached_rate: mean(|record| record.reached as u8 as f64),
                mean_cost: mean(|record| record.path_cost),
                mean_plan_time: mean(|record| record.avg_plan_time),
                trials: group.len(),
            }
        })
        .collect()
}

pub fn print_summary(rows: &[SummaryRow]) {
    for row in rows {
        info!(
            "lambda {} r {}: capture rate {:.3} reached rate {:.3} mean cost {:.2} mean plan time {:.6}s over {} trials",
            row.lambda,
            row.r,
            row.capture_rate,
            row.reached_rate,
            row.mean_cost,
            row.mean_plan_time,
            row.trials
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(map: &str, lambda: f64, r: usize, caught: bool, cost: f64) -> TrialRecord {
        TrialRecord {
            map: map.to_string(),
            lambda,
            r,
            steps: 10,
            caught,
            reached: !caught,
            path_cost: cost,
            avg_plan_time: 0.002,
        }
    }

    #[test]
    fn test_summarize_groups_by_setting() {
        let records = vec![
            record("a", 2.0, 3, true, 10.0),
            record("a", 1.0, 3, false, 20.0),
            record("b", 1.0, 3, true, 30.0),
            record("b", 2.0, 3, true, 14.0),
            record("a", 1.0, 2, false, 8.0),
        ];
        let rows = summarize(&records);

        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].lambda, rows[0].r), (1.0, 2));
        assert_eq!((rows[1].lambda, rows[1].r), (1.0, 3));
        assert_eq!(rows[1].trials, 2);
        assert_eq!(rows[1].capture_rate, 0.5);
        assert_eq!(rows[1].reached_rate, 0.5);
        assert_eq!(rows[1].mean_cost, 25.0);
        assert_eq!(rows[2].capture_rate, 1.0);
        assert_eq!(rows[2].mean_cost, 12.0);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn test_average_time() {
        let stats = Stats {
            plan_calls: 4,
            time_us: 10,
            ..Stats::default()
        };
        assert_eq!(stats.average_time_us(), 2.5);
        assert_eq!(Stats::default().average_time_us(), 0.0);
    }

    #[test]
    fn test_record_time_saturates() {
        let mut stats = Stats::default();
        stats.record_time(Duration::from_micros(7));
        stats.record_time(Duration::from_millis(2));
        assert_eq!(stats.time_us, 2007);

        stats.record_time(Duration::MAX);
        assert_eq!(stats.time_us, u64::MAX);
        stats.record_time(Duration::from_secs(1));
        assert_eq!(stats.time_us, u64::MAX);
    }
}
