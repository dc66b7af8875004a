use crate::error::{EngineError, Result};
use crate::models::{AlignedRecord, OutputPoint, PricePoint};
use chrono_tz::Tz;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Inner-joins a price series and a PV output series on their timestamps.
pub struct Aligner {
    timezone: Tz,
}

impl Aligner {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Join both series into an ascending, de-duplicated list of records.
    ///
    /// Timestamps present in only one of the inputs are dropped. Within one
    /// input the last point for a timestamp wins.
    pub fn align(&self, prices: &[PricePoint], outputs: &[OutputPoint]) -> Vec<AlignedRecord> {
        let price_by_ts: BTreeMap<i64, f64> = prices.iter().map(|p| (p.timestamp, p.price)).collect();
        let output_by_ts: BTreeMap<i64, f64> =
            outputs.iter().map(|o| (o.timestamp, o.output)).collect();

        let mut records = Vec::with_capacity(price_by_ts.len().min(output_by_ts.len()));
        let mut invalid = 0usize;

        for (&timestamp, &price) in &price_by_ts {
            let Some(&output) = output_by_ts.get(&timestamp) else {
                continue;
            };
            match AlignedRecord::new(timestamp, price, output, self.timezone) {
                Ok(record) => records.push(record),
                Err(_) => invalid += 1,
            }
        }

        if invalid > 0 {
            warn!("Dropped {} hours with unrepresentable timestamps", invalid);
        }
        debug!(
            "Aligned {} hours ({} price points unmatched, {} output points unmatched)",
            records.len(),
            price_by_ts.len() - records.len() - invalid,
            output_by_ts.len() - records.len() - invalid,
        );

        records
    }

    /// Same as [`Aligner::align`], but an empty intersection is an error.
    pub fn align_checked(
        &self,
        prices: &[PricePoint],
        outputs: &[OutputPoint],
    ) -> Result<Vec<AlignedRecord>> {
        let records = self.align(prices, outputs);
        if records.is_empty() {
            return Err(EngineError::InsufficientData(
                "price and PV series share no timestamps",
            ));
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(points: &[(i64, f64)]) -> Vec<PricePoint> {
        points
            .iter()
            .map(|&(timestamp, price)| PricePoint { timestamp, price })
            .collect()
    }

    fn outputs(points: &[(i64, f64)]) -> Vec<OutputPoint> {
        points
            .iter()
            .map(|&(timestamp, output)| OutputPoint { timestamp, output })
            .collect()
    }

    #[test]
    fn test_disjoint_series_align_to_nothing() {
        let aligner = Aligner::new(Tz::UTC);
        let p = prices(&[(0, 10.0), (3600, 20.0)]);
        let o = outputs(&[(7200, 1.0), (10800, 2.0)]);

        assert!(aligner.align(&p, &o).is_empty());
        assert!(matches!(
            aligner.align_checked(&p, &o),
            Err(EngineError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_alignment_is_sorted_and_unique() {
        let aligner = Aligner::new(Tz::UTC);
        // Unsorted, with a gap in each series and a duplicate price
        let p = prices(&[(7200, 30.0), (0, 10.0), (3600, 20.0), (7200, 35.0), (14400, 50.0)]);
        let o = outputs(&[(14400, 4.0), (0, 1.0), (7200, 3.0), (10800, 9.0)]);

        let records = aligner.align(&p, &o);
        let timestamps: Vec<i64> = records.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![0, 7200, 14400]);
        assert!(records.len() <= p.len().min(o.len()));

        // Last duplicate wins
        assert_eq!(records[1].price, 35.0);
        assert_eq!(records[1].output, 3.0);
        assert_eq!(records[2].hour, 4);
    }

    #[test]
    fn test_unrepresentable_timestamp_is_dropped() {
        let aligner = Aligner::new(Tz::UTC);
        let p = prices(&[(i64::MAX, 10.0), (0, 20.0)]);
        let o = outputs(&[(i64::MAX, 1.0), (0, 2.0)]);

        let records = aligner.align(&p, &o);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, 0);
    }
}
