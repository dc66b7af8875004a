use crate::models::{AlignedRecord, RepresentativeWeeks, WeekWindow};
use crate::stats::{mean, population_std_dev, ratio_or_zero, round_money, round_to};
use log::debug;

pub const HOURS_PER_WEEK: usize = 7 * 24;
/// A trailing partial week shorter than this is discarded.
pub const MIN_PARTIAL_WEEK_HOURS: usize = 120;

/// Picks typical, most volatile and most negative weeks for charting.
#[derive(Default)]
pub struct WeekSelector;

impl WeekSelector {
    pub fn new() -> Self {
        Self
    }

    /// Cut the series into consecutive weekly windows with their metrics.
    pub fn windows(&self, records: &[AlignedRecord]) -> Vec<WeekWindow> {
        self.raw_windows(records)
            .into_iter()
            .map(round_window)
            .collect()
    }

    /// Windows with unrounded volatility, used for ranking.
    fn raw_windows(&self, records: &[AlignedRecord]) -> Vec<WeekWindow> {
        records
            .chunks(HOURS_PER_WEEK)
            .filter(|chunk| chunk.len() == HOURS_PER_WEEK || chunk.len() >= MIN_PARTIAL_WEEK_HOURS)
            .enumerate()
            .map(|(index, chunk)| week_window(index, chunk))
            .collect()
    }

    /// Returns `None` when the series does not hold a single eligible week.
    ///
    /// Ranking uses full-precision volatility. Ties on the highest volatility
    /// or the most negative hours go to the earliest window. That tie order
    /// is an assumption, not an established rule.
    pub fn select(&self, records: &[AlignedRecord]) -> Option<RepresentativeWeeks> {
        let windows = self.raw_windows(records);
        if windows.is_empty() {
            debug!("No eligible week in {} hours", records.len());
            return None;
        }

        let mut by_volatility: Vec<&WeekWindow> = windows.iter().collect();
        by_volatility.sort_by(|a, b| a.volatility.total_cmp(&b.volatility));
        let typical = by_volatility[by_volatility.len() / 2];

        let volatile = windows
            .iter()
            .fold(&windows[0], |best, w| if w.volatility > best.volatility { w } else { best });
        let negative = windows.iter().fold(&windows[0], |best, w| {
            if w.negative_hours > best.negative_hours {
                w
            } else {
                best
            }
        });

        Some(RepresentativeWeeks {
            typical: round_window(typical.clone()),
            volatile: round_window(volatile.clone()),
            negative: round_window(negative.clone()),
            windows_considered: windows.len(),
        })
    }
}

fn round_window(window: WeekWindow) -> WeekWindow {
    WeekWindow {
        volatility: round_money(window.volatility),
        ..window
    }
}

fn week_window(index: usize, chunk: &[AlignedRecord]) -> WeekWindow {
    let prices: Vec<f64> = chunk.iter().map(|r| r.price).collect();
    let mean_price = mean(prices.iter().copied());
    let production: f64 = chunk.iter().map(|r| r.output).sum();
    let revenue: f64 = chunk.iter().map(AlignedRecord::revenue).sum();
    let capture_price = ratio_or_zero(revenue, production);

    WeekWindow {
        index,
        start: chunk[0].timestamp,
        end: chunk[chunk.len() - 1].timestamp,
        hours: chunk.len(),
        volatility: population_std_dev(&prices),
        mean_price: round_money(mean_price),
        negative_hours: chunk.iter().filter(|r| r.is_negative_exposure()).count(),
        capture_ratio: round_to(ratio_or_zero(capture_price, mean_price), 3),
        records: chunk.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    // 2024-03-04T00:00:00Z, a Monday
    const MAR_4: i64 = 1_709_510_400;

    /// One week per amplitude, prices alternating around 50 by that amplitude.
    fn weekly_series(amplitudes: &[f64], negatives: &[usize], extra_hours: usize) -> Vec<AlignedRecord> {
        let total = amplitudes.len() * HOURS_PER_WEEK + extra_hours;
        (0..total)
            .map(|i| {
                let week = (i / HOURS_PER_WEEK).min(amplitudes.len() - 1);
                let hour_of_week = i % HOURS_PER_WEEK;
                let amplitude = amplitudes[week];
                let mut price = 50.0 + if i % 2 == 0 { amplitude } else { -amplitude };
                let output = if (8..17).contains(&(i % 24)) { 4.0 } else { 0.0 };
                // Force negative producing hours at the start of each week's middays
                if hour_of_week / 24 < negatives[week] && i % 24 == 12 {
                    price = -1.0;
                }
                AlignedRecord::new(MAR_4 + i as i64 * 3600, price, output, Tz::UTC).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_partial_week_rules() {
        let selector = WeekSelector::new();

        let short_tail = weekly_series(&[5.0, 10.0], &[0, 0], 119);
        assert_eq!(selector.windows(&short_tail).len(), 2);

        let long_tail = weekly_series(&[5.0, 10.0], &[0, 0], 120);
        let windows = selector.windows(&long_tail);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2].hours, 120);
        assert!(windows.iter().all(|w| w.hours >= MIN_PARTIAL_WEEK_HOURS));

        assert!(selector.select(&weekly_series(&[5.0], &[0], 0)[..119]).is_none());
    }

    #[test]
    fn test_selection() {
        let amplitudes = [10.0, 40.0, 5.0, 20.0, 30.0];
        let negatives = [0, 2, 5, 5, 1];
        let records = weekly_series(&amplitudes, &negatives, 0);
        let weeks = WeekSelector::new().select(&records).unwrap();

        assert_eq!(weeks.windows_considered, 5);
        // Ascending volatility puts week 3 (amplitude 20) in the middle
        assert_eq!(weeks.typical.index, 3);
        assert_eq!(weeks.volatile.index, 1);
        // Weeks 2 and 3 tie on negative hours, the earlier one wins
        assert_eq!(weeks.negative.index, 2);
        assert_eq!(weeks.negative.negative_hours, 5);
        assert!(weeks.volatile.volatility >= weeks.typical.volatility);
        assert_eq!(weeks.typical.records.len(), HOURS_PER_WEEK);
        assert_eq!(weeks.typical.start, MAR_4 + 3 * HOURS_PER_WEEK as i64 * 3600);
    }

    #[test]
    fn test_even_count_uses_half_index() {
        let records = weekly_series(&[1.0, 4.0, 2.0, 3.0], &[0, 0, 0, 0], 0);
        let weeks = WeekSelector::new().select(&records).unwrap();
        // Sorted: 1, 2, 3, 4 -> floor(4 / 2) = 2 -> amplitude 3 (week 3)
        assert_eq!(weeks.typical.index, 3);
    }

    #[test]
    fn test_near_equal_volatility_is_ranked_unrounded() {
        let records = weekly_series(&[10.001, 10.004], &[0, 0], 0);
        let weeks = WeekSelector::new().select(&records).unwrap();

        // Both print as 10.0 but the second week is more volatile
        assert_eq!(weeks.volatile.index, 1);
        assert_eq!(weeks.volatile.volatility, 10.0);
        assert_eq!(weeks.typical.index, 1);
        let emitted: Vec<f64> = WeekSelector::new()
            .windows(&records)
            .iter()
            .map(|w| w.volatility)
            .collect();
        assert_eq!(emitted, vec![10.0, 10.0]);
    }

    #[test]
    fn test_capture_ratio() {
        let records = weekly_series(&[0.0], &[0], 0);
        let week = &WeekSelector::new().windows(&records)[0];
        assert_eq!(week.volatility, 0.0);
        assert_eq!(week.mean_price, 50.0);
        assert_eq!(week.capture_ratio, 1.0);

        let idle: Vec<AlignedRecord> = records
            .iter()
            .map(|r| AlignedRecord { output: 0.0, ..*r })
            .collect();
        assert_eq!(WeekSelector::new().windows(&idle)[0].capture_ratio, 0.0);
    }
}
