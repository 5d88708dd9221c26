//! Ordered registry of named features and how to extract them.

use std::collections::HashMap;
use std::fmt;

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    error::SchemaError,
    geo::{bearing, geo_dist},
    record::{CandidateRecord, Timestamp},
};

/// Computes a feature value from a record at one timestamp.
pub type DeriveFn = fn(&CandidateRecord, Timestamp) -> Result<f64, SchemaError>;

/// How a feature's value is obtained from a [`CandidateRecord`].
#[derive(Clone)]
pub enum Extraction {
    /// Read the named scalar series at the row's timestamp.
    DirectField(String),
    /// Compute from one or more record fields.
    Derived(DeriveFn),
}

impl fmt::Debug for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::DirectField(field) => f.debug_tuple("DirectField").field(field).finish(),
            Extraction::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// A named feature bound to its column in the feature vector.
#[derive(Debug, Clone)]
pub struct FeatureDescriptor {
    name: String,
    column_index: usize,
    extraction: Extraction,
}

impl FeatureDescriptor {
    /// Return the feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the zero-based column index.
    #[must_use]
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// Return the extraction rule.
    #[must_use]
    pub fn extraction(&self) -> &Extraction {
        &self.extraction
    }

    fn extract(&self, record: &CandidateRecord, timestamp: Timestamp) -> Result<f64, SchemaError> {
        match &self.extraction {
            Extraction::DirectField(field) => record.scalar(field, timestamp),
            Extraction::Derived(derive) => derive(record, timestamp),
        }
    }
}

/// Record field names read by [`FeatureSchema::standard`].
pub mod fields {
    /// Vorticity maximum of the tracked vortex.
    pub const VORTMAX: &str = "vortmax";
    /// Minimum surface pressure.
    pub const PMINS: &str = "pmins";
    /// Ambient minus central pressure.
    pub const P_AMBIENT_DIFFS: &str = "p_ambient_diffs";
    /// Distance to the nearest pressure minimum.
    pub const MIN_DISTS: &str = "min_dists";
    /// Temperature at sigma 0.995.
    pub const T995S: &str = "t995s";
    /// Temperature at 850 hPa.
    pub const T850S: &str = "t850s";
    /// Maximum windspeed near the vortex.
    pub const MAX_WINDSPEEDS: &str = "max_windspeeds";
    /// Position of the maximum windspeed.
    pub const MAX_WINDSPEED_POSITIONS: &str = "max_windspeed_positions";
    /// Position of the vorticity maximum.
    pub const VMAX_POSITIONS: &str = "vmax_positions";
    /// Convective available potential energy.
    pub const CAPES: &str = "capes";
    /// Precipitable water.
    pub const PWATS: &str = "pwats";
    /// Relative humidity at sigma 0.995.
    pub const RH995S: &str = "rh995s";
}

/// Name of the column that bounds the default "all features" selection.
pub const LON_FEATURE: &str = "lon";

/// The fixed-width feature vector layout every classifier operates on.
///
/// Column indices form a dense `0..len()` range in registration order.
/// Name resolution happens once, at [`FeatureSchemaBuilder::build`].
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    features: Vec<FeatureDescriptor>,
    by_name: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Start building a schema.
    #[must_use]
    pub fn builder() -> FeatureSchemaBuilder {
        FeatureSchemaBuilder::default()
    }

    /// The 15-column hurricane layout.
    ///
    /// | Index | Feature | Source |
    /// |---|---|---|
    /// | 0 | `vort` | `vortmax` |
    /// | 1 | `pmin` | `pmins` |
    /// | 2 | `pambdiff` | `p_ambient_diffs` |
    /// | 3 | `mindist` | `min_dists` |
    /// | 4 | `t995` | `t995s` |
    /// | 5 | `t850` | `t850s` |
    /// | 6 | `tanom` | `t850s - t995s` |
    /// | 7 | `maxwindspeed` | `max_windspeeds` |
    /// | 8 | `maxwindspeeddist` | distance from max-windspeed to vortmax position (km) |
    /// | 9 | `maxwindspeeddir` | bearing from max-windspeed to vortmax position (rad) |
    /// | 10 | `cape` | `capes` |
    /// | 11 | `pwat` | `pwats` |
    /// | 12 | `rh995` | `rh995s` |
    /// | 13 | `lon` | vortmax longitude |
    /// | 14 | `lat` | vortmax latitude |
    #[must_use]
    pub fn standard() -> Self {
        let builder = Self::builder()
            .direct("vort", fields::VORTMAX)
            .direct("pmin", fields::PMINS)
            .direct("pambdiff", fields::P_AMBIENT_DIFFS)
            .direct("mindist", fields::MIN_DISTS)
            .direct("t995", fields::T995S)
            .direct("t850", fields::T850S)
            .derived("tanom", temperature_anomaly)
            .direct("maxwindspeed", fields::MAX_WINDSPEEDS)
            .derived("maxwindspeeddist", windspeed_distance)
            .derived("maxwindspeeddir", windspeed_direction)
            .direct("cape", fields::CAPES)
            .direct("pwat", fields::PWATS)
            .direct("rh995", fields::RH995S)
            .derived(LON_FEATURE, vortmax_lon)
            .derived("lat", vortmax_lat);
        builder
            .build()
            .expect("standard feature names are distinct")
    }

    /// Return the column index of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownFeature`] if `name` is not registered.
    pub fn index_of(&self, name: &str) -> Result<usize, SchemaError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::UnknownFeature {
                name: name.to_string(),
            })
    }

    /// Return the feature name at `index`, if any.
    #[must_use]
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.features.get(index).map(FeatureDescriptor::name)
    }

    /// Return feature names in column order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(FeatureDescriptor::name).collect()
    }

    /// Return the descriptors in column order.
    #[must_use]
    pub fn descriptors(&self) -> &[FeatureDescriptor] {
        &self.features
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Return `true` if no features are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Every column before `lon`, or every column if `lon` is not registered.
    #[must_use]
    pub fn default_indices(&self) -> Vec<usize> {
        let end = self.index_of(LON_FEATURE).unwrap_or(self.features.len());
        (0..end).collect()
    }

    /// Return the value of feature `name` for `record` at `timestamp`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SchemaError::UnknownFeature`] | `name` is not registered |
    /// | [`SchemaError::MissingTimestamp`] | a field the feature reads has no data at `timestamp` |
    pub fn value(
        &self,
        record: &CandidateRecord,
        name: &str,
        timestamp: Timestamp,
    ) -> Result<f64, SchemaError> {
        let index = self.index_of(name)?;
        self.features[index].extract(record, timestamp)
    }

    /// Extract the full feature vector for one record and timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::MissingTimestamp`] for the first feature that cannot be read.
    pub fn extract_row(
        &self,
        record: &CandidateRecord,
        timestamp: Timestamp,
    ) -> Result<Vec<f64>, SchemaError> {
        self.features
            .iter()
            .map(|feature| feature.extract(record, timestamp))
            .collect()
    }

    /// Extract feature vectors for many `(record, timestamp)` pairs in parallel.
    ///
    /// Output rows are in input order.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] from one of the failing rows.
    #[instrument(skip_all, fields(n_rows = rows.len(), n_features = self.len()))]
    pub fn extract_rows(
        &self,
        rows: &[(&CandidateRecord, Timestamp)],
    ) -> Result<Vec<Vec<f64>>, SchemaError> {
        let matrix = rows
            .par_iter()
            .map(|(record, timestamp)| self.extract_row(record, *timestamp))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("feature rows extracted");
        Ok(matrix)
    }
}

/// Builder for [`FeatureSchema`]; columns are assigned in call order.
#[derive(Debug, Default)]
pub struct FeatureSchemaBuilder {
    features: Vec<(String, Extraction)>,
}

impl FeatureSchemaBuilder {
    /// Register a feature read directly from a scalar record field.
    #[must_use]
    pub fn direct(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.features
            .push((name.into(), Extraction::DirectField(field.into())));
        self
    }

    /// Register a feature computed by `derive`.
    #[must_use]
    pub fn derived(mut self, name: impl Into<String>, derive: DeriveFn) -> Self {
        self.features.push((name.into(), Extraction::Derived(derive)));
        self
    }

    /// Assign column indices and resolve names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateFeature`] if a name was registered twice.
    pub fn build(self) -> Result<FeatureSchema, SchemaError> {
        let mut by_name = HashMap::with_capacity(self.features.len());
        let mut features = Vec::with_capacity(self.features.len());
        for (column_index, (name, extraction)) in self.features.into_iter().enumerate() {
            if by_name.insert(name.clone(), column_index).is_some() {
                return Err(SchemaError::DuplicateFeature { name });
            }
            features.push(FeatureDescriptor {
                name,
                column_index,
                extraction,
            });
        }
        Ok(FeatureSchema { features, by_name })
    }
}

fn temperature_anomaly(record: &CandidateRecord, timestamp: Timestamp) -> Result<f64, SchemaError> {
    Ok(record.scalar(fields::T850S, timestamp)? - record.scalar(fields::T995S, timestamp)?)
}

fn windspeed_distance(record: &CandidateRecord, timestamp: Timestamp) -> Result<f64, SchemaError> {
    let windspeed = record.position(fields::MAX_WINDSPEED_POSITIONS, timestamp)?;
    let vortmax = record.position(fields::VMAX_POSITIONS, timestamp)?;
    Ok(geo_dist(windspeed, vortmax))
}

fn windspeed_direction(record: &CandidateRecord, timestamp: Timestamp) -> Result<f64, SchemaError> {
    let windspeed = record.position(fields::MAX_WINDSPEED_POSITIONS, timestamp)?;
    let vortmax = record.position(fields::VMAX_POSITIONS, timestamp)?;
    Ok(bearing(windspeed, vortmax))
}

fn vortmax_lon(record: &CandidateRecord, timestamp: Timestamp) -> Result<f64, SchemaError> {
    Ok(record.position(fields::VMAX_POSITIONS, timestamp)?.0)
}

fn vortmax_lat(record: &CandidateRecord, timestamp: Timestamp) -> Result<f64, SchemaError> {
    Ok(record.position(fields::VMAX_POSITIONS, timestamp)?.1)
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

    fn full_record(t: Timestamp) -> CandidateRecord {
        CandidateRecord::new()
            .with_scalar(fields::VORTMAX, t, 0.00012)
            .with_scalar(fields::PMINS, t, 99_000.0)
            .with_scalar(fields::P_AMBIENT_DIFFS, t, 700.0)
            .with_scalar(fields::MIN_DISTS, t, 50.0)
            .with_scalar(fields::T995S, t, 298.0)
            .with_scalar(fields::T850S, t, 288.5)
            .with_scalar(fields::MAX_WINDSPEEDS, t, 22.0)
            .with_scalar(fields::CAPES, t, 1500.0)
            .with_scalar(fields::PWATS, t, 55.0)
            .with_scalar(fields::RH995S, t, 85.0)
            .with_position(fields::VMAX_POSITIONS, t, (-75.0, 25.0))
            .with_position(fields::MAX_WINDSPEED_POSITIONS, t, (-75.0, 24.0))
    }

    #[test]
    fn standard_layout_is_dense_and_ordered() {
        let schema = FeatureSchema::standard();
        assert_eq!(schema.len(), 15);
        for (i, d) in schema.descriptors().iter().enumerate() {
            assert_eq!(d.column_index(), i);
        }
        assert_eq!(schema.index_of("vort").unwrap(), 0);
        assert_eq!(schema.index_of("maxwindspeeddir").unwrap(), 9);
        assert_eq!(schema.index_of("lat").unwrap(), 14);
        assert_eq!(schema.name_of(13), Some("lon"));
    }

    #[test]
    fn default_indices_stop_before_lon() {
        let schema = FeatureSchema::standard();
        assert_eq!(schema.default_indices(), (0..13).collect::<Vec<_>>());
    }

    #[test]
    fn default_indices_without_lon_take_everything() {
        let schema = FeatureSchema::builder()
            .direct("a", "a")
            .direct("b", "b")
            .build()
            .unwrap();
        assert_eq!(schema.default_indices(), vec![0, 1]);
    }

    #[test]
    fn derived_features_read_two_fields() {
        let schema = FeatureSchema::standard();
        let record = full_record(ts(0));
        let tanom = schema.value(&record, "tanom", ts(0)).unwrap();
        assert!((tanom - (288.5 - 298.0)).abs() < 1e-12);

        let dist = schema.value(&record, "maxwindspeeddist", ts(0)).unwrap();
        assert!((dist - 111.195).abs() < 0.01);

        let dir = schema.value(&record, "maxwindspeeddir", ts(0)).unwrap();
        assert!((dir - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        assert_eq!(schema.value(&record, "lon", ts(0)).unwrap(), -75.0);
        assert_eq!(schema.value(&record, "lat", ts(0)).unwrap(), 25.0);
    }

    #[test]
    fn unknown_feature_rejected() {
        let schema = FeatureSchema::standard();
        let err = schema.value(&full_record(ts(0)), "shear", ts(0)).unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownFeature {
                name: "shear".to_string()
            }
        );
    }

    #[test]
    fn derived_feature_reports_missing_field() {
        let schema = FeatureSchema::standard();
        let record = CandidateRecord::new().with_scalar(fields::T850S, ts(0), 288.0);
        let err = schema.value(&record, "tanom", ts(0)).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::MissingTimestamp { ref field, .. } if field == fields::T995S
        ));
    }

    #[test]
    fn duplicate_feature_rejected() {
        let err = FeatureSchema::builder()
            .direct("pmin", "pmins")
            .direct("pmin", "pmins")
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateFeature { .. }));
    }

    #[test]
    fn extract_rows_preserves_order() {
        let schema = FeatureSchema::standard();
        let records: Vec<CandidateRecord> = (0..32u32)
            .map(|h| full_record(ts(h % 24)).with_scalar(fields::PMINS, ts(h % 24), f64::from(h)))
            .collect();
        let rows: Vec<(&CandidateRecord, Timestamp)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r, ts(i as u32 % 24)))
            .collect();
        let matrix = schema.extract_rows(&rows).unwrap();
        assert_eq!(matrix.len(), 32);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row.len(), 15);
            assert_eq!(row[1], i as f64);
        }
    }

    #[test]
    fn extract_rows_propagates_missing_data() {
        let schema = FeatureSchema::standard();
        let good = full_record(ts(0));
        let bad = CandidateRecord::new();
        let rows = vec![(&good, ts(0)), (&bad, ts(0))];
        assert!(schema.extract_rows(&rows).is_err());
    }
}
