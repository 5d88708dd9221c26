//! Per-candidate source data consumed by the feature schema.

use std::collections::BTreeMap;

use crate::error::SchemaError;

/// Timestamp of one candidate observation.
pub type Timestamp = chrono::NaiveDateTime;

/// A `(longitude, latitude)` pair in degrees.
pub type Position = (f64, f64);

/// Named time series describing one candidate storm track.
///
/// Scalar fields (`"pmins"`, `"t995s"`, ...) and position fields
/// (`"vmax_positions"`, `"max_windspeed_positions"`) are stored separately and
/// keyed by timestamp.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateRecord {
    scalars: BTreeMap<String, BTreeMap<Timestamp, f64>>,
    positions: BTreeMap<String, BTreeMap<Timestamp, Position>>,
}

impl CandidateRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scalar observation, replacing any previous value at `timestamp`.
    pub fn insert_scalar(&mut self, field: impl Into<String>, timestamp: Timestamp, value: f64) {
        self.scalars
            .entry(field.into())
            .or_default()
            .insert(timestamp, value);
    }

    /// Insert a position observation, replacing any previous value at `timestamp`.
    pub fn insert_position(
        &mut self,
        field: impl Into<String>,
        timestamp: Timestamp,
        position: Position,
    ) {
        self.positions
            .entry(field.into())
            .or_default()
            .insert(timestamp, position);
    }

    /// Builder form of [`CandidateRecord::insert_scalar`].
    #[must_use]
    pub fn with_scalar(mut self, field: impl Into<String>, timestamp: Timestamp, value: f64) -> Self {
        self.insert_scalar(field, timestamp, value);
        self
    }

    /// Builder form of [`CandidateRecord::insert_position`].
    #[must_use]
    pub fn with_position(
        mut self,
        field: impl Into<String>,
        timestamp: Timestamp,
        position: Position,
    ) -> Self {
        self.insert_position(field, timestamp, position);
        self
    }

    /// Read a scalar field at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingTimestamp`] when the field or the timestamp is absent.
    pub fn scalar(&self, field: &str, timestamp: Timestamp) -> Result<f64, SchemaError> {
        self.scalars
            .get(field)
            .and_then(|series| series.get(&timestamp))
            .copied()
            .ok_or_else(|| missing(field, timestamp))
    }

    /// Read a position field at `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingTimestamp`] when the field or the timestamp is absent.
    pub fn position(&self, field: &str, timestamp: Timestamp) -> Result<Position, SchemaError> {
        self.positions
            .get(field)
            .and_then(|series| series.get(&timestamp))
            .copied()
            .ok_or_else(|| missing(field, timestamp))
    }
}

fn missing(field: &str, timestamp: Timestamp) -> SchemaError {
    SchemaError::MissingTimestamp {
        field: field.to_string(),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ts(hour: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2005, 8, 25)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .unwrap()
    }

    #[test]
    fn scalar_lookup_by_timestamp() {
        let record = CandidateRecord::new()
            .with_scalar("pmins", ts(0), 990.0)
            .with_scalar("pmins", ts(6), 985.0);
        assert_eq!(record.scalar("pmins", ts(6)).unwrap(), 985.0);
    }

    #[test]
    fn missing_timestamp_names_field() {
        let record = CandidateRecord::new().with_scalar("pmins", ts(0), 990.0);
        let err = record.scalar("pmins", ts(12)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingTimestamp {
                field: "pmins".to_string(),
                timestamp: ts(12),
            }
        );
    }

    #[test]
    fn missing_field_is_missing_timestamp() {
        let record = CandidateRecord::new();
        assert!(matches!(
            record.position("vmax_positions", ts(0)),
            Err(SchemaError::MissingTimestamp { .. })
        ));
    }

    #[test]
    fn insert_replaces_value() {
        let mut record = CandidateRecord::new();
        record.insert_position("vmax_positions", ts(0), (-60.0, 15.0));
        record.insert_position("vmax_positions", ts(0), (-61.0, 16.0));
        assert_eq!(record.position("vmax_positions", ts(0)).unwrap(), (-61.0, 16.0));
    }
}
