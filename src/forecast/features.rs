//! Feature engineering for load forecasting
//!
//! The same code path turns a timestamp and a load history into model inputs
//! for both the offline training set and online requests. Columns are always
//! addressed through a [`FeatureSchema`], so the order persisted next to a
//! model is the only order that exists.

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;

/// First hour of business hours (inclusive)
pub const BUSINESS_HOURS_START: u32 = 9;
/// End of business hours (exclusive)
pub const BUSINESS_HOURS_END: u32 = 17;

/// A named model input column
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureName {
    HourOfDay,
    DayOfWeek,
    Month,
    IsWeekend,
    IsBusinessHours,
    #[serde(rename = "load_1h_ago")]
    #[strum(to_string = "load_1h_ago")]
    Load1hAgo,
    #[serde(rename = "load_24h_ago")]
    #[strum(to_string = "load_24h_ago")]
    Load24hAgo,
    #[serde(rename = "avg_load_7d", alias = "avg_load_last_7d")]
    #[strum(to_string = "avg_load_7d", serialize = "avg_load_last_7d")]
    AvgLoad7d,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("feature schema is empty")]
    Empty,

    #[error("unknown feature '{0}'")]
    Unknown(String),

    #[error("feature '{0}' listed more than once")]
    Duplicate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("invalid timestamp '{0}': expected ISO-8601 like 2024-01-07T14:30:00")]
    InvalidTimestamp(String),
}

/// Ordered list of model input columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema(Vec<FeatureName>);

impl Default for FeatureSchema {
    /// All known features in their canonical order
    fn default() -> Self {
        Self(FeatureName::iter().collect())
    }
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureName>) -> Result<Self, SchemaError> {
        if features.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, feature) in features.iter().enumerate() {
            if features[..i].contains(feature) {
                return Err(SchemaError::Duplicate(feature.to_string()));
            }
        }
        Ok(Self(features))
    }

    /// Parse a persisted column list. Names must be known and unique.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, SchemaError> {
        let features = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                name.parse::<FeatureName>()
                    .map_err(|_| SchemaError::Unknown(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(features)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureName> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, feature: FeatureName) -> bool {
        self.0.contains(&feature)
    }

    pub fn position(&self, feature: FeatureName) -> Option<usize> {
        self.0.iter().position(|f| *f == feature)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|f| f.to_string()).collect()
    }

    /// Lay out a feature set in schema order
    pub fn vectorize(&self, features: &LoadFeatures) -> FeatureVector {
        FeatureVector {
            values: self.iter().map(|name| features.value(name)).collect(),
            schema: self.clone(),
        }
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = SchemaError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names()
    }
}

/// Model input values together with the schema they were laid out with
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub values: Vec<f64>,
    pub schema: FeatureSchema,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, feature: FeatureName) -> Option<f64> {
        self.schema.position(feature).map(|i| self.values[i])
    }

    pub fn with_values(&self, values: Vec<f64>) -> Self {
        Self {
            values,
            schema: self.schema.clone(),
        }
    }
}

/// Load history derived features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagFeatures {
    pub load_1h_ago: f64,
    pub load_24h_ago: f64,
    pub avg_load_7d: f64,
}

impl LagFeatures {
    /// Lags available to an online request.
    ///
    /// Requests only carry a short, oldest-first history, so:
    /// - `load_1h_ago` is the newest historical value, or `current_load` when empty
    /// - `avg_load_7d` is the mean of the history, or `current_load` when empty
    /// - `load_24h_ago` is always `current_load`; the true value is not available
    ///   online and this column is a degraded approximation
    pub fn from_recent(current_load: f64, historical_loads: &[f64]) -> Self {
        let load_1h_ago = historical_loads.last().copied().unwrap_or(current_load);
        let avg_load_7d = if historical_loads.is_empty() {
            current_load
        } else {
            historical_loads.iter().sum::<f64>() / historical_loads.len() as f64
        };

        Self {
            load_1h_ago,
            load_24h_ago: current_load,
            avg_load_7d,
        }
    }
}

/// Every feature a model could consume, by name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadFeatures {
    /// Hour of day (0-23)
    pub hour_of_day: u32,
    /// Day of week (0=Monday, 6=Sunday)
    pub day_of_week: u32,
    /// Month (1-12)
    pub month: u32,
    pub is_weekend: bool,
    /// Hour in [9, 17)
    pub is_business_hours: bool,
    pub load_1h_ago: f64,
    pub load_24h_ago: f64,
    pub avg_load_7d: f64,
}

impl LoadFeatures {
    pub fn new(timestamp: NaiveDateTime, lags: LagFeatures) -> Self {
        let hour_of_day = timestamp.hour();
        let weekday = timestamp.weekday();

        Self {
            hour_of_day,
            day_of_week: weekday.num_days_from_monday(),
            month: timestamp.month(),
            is_weekend: is_weekend(weekday),
            is_business_hours: is_business_hour(hour_of_day),
            load_1h_ago: lags.load_1h_ago,
            load_24h_ago: lags.load_24h_ago,
            avg_load_7d: lags.avg_load_7d,
        }
    }

    pub fn value(&self, feature: FeatureName) -> f64 {
        match feature {
            FeatureName::HourOfDay => self.hour_of_day as f64,
            FeatureName::DayOfWeek => self.day_of_week as f64,
            FeatureName::Month => self.month as f64,
            FeatureName::IsWeekend => flag(self.is_weekend),
            FeatureName::IsBusinessHours => flag(self.is_business_hours),
            FeatureName::Load1hAgo => self.load_1h_ago,
            FeatureName::Load24hAgo => self.load_24h_ago,
            FeatureName::AvgLoad7d => self.avg_load_7d,
        }
    }
}

/// Turns requests and training rows into schema-ordered vectors
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    schema: FeatureSchema,
}

impl FeatureExtractor {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Features for an online request
    pub fn extract(
        &self,
        timestamp: NaiveDateTime,
        current_load: f64,
        historical_loads: &[f64],
    ) -> FeatureVector {
        let lags = LagFeatures::from_recent(current_load, historical_loads);
        self.schema.vectorize(&LoadFeatures::new(timestamp, lags))
    }

    /// Features for a training row whose lags come from the full series
    pub fn extract_with_lags(&self, timestamp: NaiveDateTime, lags: LagFeatures) -> FeatureVector {
        self.schema.vectorize(&LoadFeatures::new(timestamp, lags))
    }
}

pub fn is_weekend(weekday: Weekday) -> bool {
    matches!(weekday, Weekday::Sat | Weekday::Sun)
}

pub fn is_business_hour(hour: u32) -> bool {
    (BUSINESS_HOURS_START..BUSINESS_HOURS_END).contains(&hour)
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Parse a request timestamp into wall-clock time.
///
/// Calendar fields are read from the timestamp's own clock: an explicit offset
/// (`Z`, `+02:00`) is kept, not converted to UTC. Offset-less values are taken
/// as-is, matching the naive timestamps produced by the workload simulator.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FeatureError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    const NAIVE_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| FeatureError::InvalidTimestamp(raw.to_string()))
}
