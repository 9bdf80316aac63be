//! # Storage Workload Simulation
//!
//! Generates an hourly request-load series for a file storage service with
//! realistic structure:
//!
//! - diurnal buckets (night baseline, morning ramp, business hours, lunch peak,
//!   evening decline)
//! - weekend reduction
//! - linear month-over-month growth
//! - multiplicative noise
//! - rare viral spikes
//!
//! The series only feeds training-data synthesis. A fixed seed makes it
//! reproducible run to run.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::domain::LoadSample;
use crate::forecast::features::{is_business_hour, is_weekend, LagFeatures};

pub const HOURS_PER_DAY: usize = 24;
/// Months are simulated as 30 days
pub const DAYS_PER_MONTH: usize = 30;
/// Trailing window for `avg_load_7d`
pub const WEEK_HOURS: usize = 24 * 7;

/// Half-open uniform range `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadRange {
    pub min: f64,
    pub max: f64,
}

impl LoadRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn sample(&self, rng: &mut impl Rng) -> f64 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }
}

/// Part of the day that selects the base load range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    /// 22:00-06:00
    Night,
    /// 06:00-09:00
    MorningRamp,
    /// 12:00-13:00
    LunchPeak,
    /// 09:00-17:00 outside the lunch hour
    Business,
    /// 17:00-22:00
    Evening,
}

impl TimeBucket {
    pub fn for_hour(hour: u32) -> Self {
        if hour < 6 || hour >= 22 {
            Self::Night
        } else if hour < 9 {
            Self::MorningRamp
        } else if is_business_hour(hour) {
            if hour == 12 {
                Self::LunchPeak
            } else {
                Self::Business
            }
        } else {
            Self::Evening
        }
    }
}

/// Shape of the synthetic workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadProfile {
    pub night: LoadRange,
    pub morning_ramp: LoadRange,
    pub lunch_peak: LoadRange,
    pub business: LoadRange,
    pub evening: LoadRange,
    /// Applied to the bucket load on Saturdays and Sundays
    pub weekend_multiplier: f64,
    /// Growth per 30 elapsed days (0.05 = +5%)
    pub monthly_growth: f64,
    /// Noise amplitude as a fraction of load (0.2 = ±20%)
    pub noise_fraction: f64,
    /// Chance per hour of a viral spike
    pub spike_probability: f64,
    pub spike_multiplier: LoadRange,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            night: LoadRange::new(50.0, 100.0),
            morning_ramp: LoadRange::new(200.0, 400.0),
            lunch_peak: LoadRange::new(1100.0, 1300.0),
            business: LoadRange::new(500.0, 1000.0),
            evening: LoadRange::new(150.0, 350.0),
            weekend_multiplier: 0.3,
            monthly_growth: 0.05,
            noise_fraction: 0.2,
            spike_probability: 0.02,
            spike_multiplier: LoadRange::new(3.0, 5.0),
        }
    }
}

impl WorkloadProfile {
    pub fn range_for(&self, bucket: TimeBucket) -> LoadRange {
        match bucket {
            TimeBucket::Night => self.night,
            TimeBucket::MorningRamp => self.morning_ramp,
            TimeBucket::LunchPeak => self.lunch_peak,
            TimeBucket::Business => self.business,
            TimeBucket::Evening => self.evening,
        }
    }

    /// A profile with no randomness beyond the bucket draw
    pub fn without_perturbations(self) -> Self {
        Self {
            monthly_growth: 0.0,
            noise_fraction: 0.0,
            spike_probability: 0.0,
            ..self
        }
    }
}

/// Workload simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadSimulatorConfig {
    /// First simulated hour
    pub start: NaiveDateTime,
    /// Length of the series in 30-day months
    pub months: u32,
    pub seed: u64,
    pub profile: WorkloadProfile,
}

impl Default for WorkloadSimulatorConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            months: 6,
            seed: 42,
            profile: WorkloadProfile::default(),
        }
    }
}

impl WorkloadSimulatorConfig {
    pub fn total_hours(&self) -> usize {
        HOURS_PER_DAY * DAYS_PER_MONTH * self.months as usize
    }
}

pub struct WorkloadSimulator {
    config: WorkloadSimulatorConfig,
    rng: StdRng,
    spikes: usize,
}

impl WorkloadSimulator {
    pub fn new(config: WorkloadSimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            spikes: 0,
        }
    }

    pub fn config(&self) -> &WorkloadSimulatorConfig {
        &self.config
    }

    /// Generate the full hourly series
    pub fn generate(mut self) -> Vec<LoadSample> {
        let total = self.config.total_hours();
        let start = self.config.start;
        let mut series = Vec::with_capacity(total);

        for i in 0..total {
            let timestamp = start + Duration::hours(i as i64);
            let load = self.load_at(timestamp);
            series.push(LoadSample::new(timestamp, load));
        }

        tracing::debug!(
            hours = total,
            seed = self.config.seed,
            spikes = self.spikes,
            "workload series generated"
        );
        series
    }

    fn load_at(&mut self, timestamp: NaiveDateTime) -> f64 {
        let profile = &self.config.profile;

        let bucket = TimeBucket::for_hour(timestamp.hour());
        let mut load = profile.range_for(bucket).sample(&mut self.rng);

        if is_weekend(timestamp.weekday()) {
            load *= profile.weekend_multiplier;
        }

        let elapsed_days = (timestamp - self.config.start).num_days() as f64;
        load *= 1.0 + profile.monthly_growth * (elapsed_days / DAYS_PER_MONTH as f64);

        if profile.noise_fraction > 0.0 {
            let noise = Uniform::new(-profile.noise_fraction, profile.noise_fraction);
            load *= 1.0 + noise.sample(&mut self.rng);
        }

        let spike_chance = profile.spike_probability.clamp(0.0, 1.0);
        if spike_chance > 0.0 && self.rng.gen_bool(spike_chance) {
            load *= profile.spike_multiplier.sample(&mut self.rng);
            self.spikes += 1;
        }

        load.max(0.0)
    }
}

/// A series sample with past-only lags and the next hour as target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaggedSample {
    pub sample: LoadSample,
    pub lags: LagFeatures,
    /// Load one step ahead
    pub target: f64,
}

/// Attach lag features and targets to a series.
///
/// Lags only look backwards: `load_1h_ago` is the previous sample,
/// `load_24h_ago` the sample 24 steps back and `avg_load_7d` the mean of up to
/// 168 prior samples. The first 24 samples lack a full lag history and the last
/// one lacks a target, so neither appears in the output.
pub fn lagged_samples(series: &[LoadSample]) -> Vec<LaggedSample> {
    if series.len() <= HOURS_PER_DAY + 1 {
        return Vec::new();
    }

    let mut rows = Vec::with_capacity(series.len() - HOURS_PER_DAY - 1);
    // Running sum of series[window_start..i]
    let mut window_sum: f64 = series[..HOURS_PER_DAY].iter().map(|s| s.load).sum();
    let mut window_start = 0;

    for i in HOURS_PER_DAY..series.len() - 1 {
        if i - window_start > WEEK_HOURS {
            window_sum -= series[window_start].load;
            window_start += 1;
        }
        let window_len = i - window_start;

        rows.push(LaggedSample {
            sample: series[i],
            lags: LagFeatures {
                load_1h_ago: series[i - 1].load,
                load_24h_ago: series[i - HOURS_PER_DAY].load,
                avg_load_7d: window_sum / window_len as f64,
            },
            target: series[i + 1].load,
        });

        window_sum += series[i].load;
    }

    rows
}

/// Descriptive statistics of a generated series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub min_load: f64,
    pub max_load: f64,
    pub mean_load: f64,
    pub std_dev: f64,
    pub business_hours_mean: f64,
    pub off_hours_mean: f64,
    pub weekday_mean: f64,
    pub weekend_mean: f64,
}

impl SeriesSummary {
    pub fn from_series(series: &[LoadSample]) -> Option<Self> {
        if series.is_empty() {
            return None;
        }

        let loads: Vec<f64> = series.iter().map(|s| s.load).collect();
        let n = loads.len() as f64;
        let mean_load = loads.iter().sum::<f64>() / n;
        let variance = loads.iter().map(|l| (l - mean_load).powi(2)).sum::<f64>() / n;

        let mean_where = |pred: &dyn Fn(&LoadSample) -> bool| {
            let (sum, count) = series
                .iter()
                .filter(|s| pred(s))
                .fold((0.0, 0usize), |(sum, count), s| (sum + s.load, count + 1));
            if count == 0 {
                0.0
            } else {
                sum / count as f64
            }
        };

        Some(Self {
            samples: series.len(),
            min_load: loads.iter().cloned().fold(f64::INFINITY, f64::min),
            max_load: loads.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            mean_load,
            std_dev: variance.sqrt(),
            business_hours_mean: mean_where(&|s| is_business_hour(s.timestamp.hour())),
            off_hours_mean: mean_where(&|s| !is_business_hour(s.timestamp.hour())),
            weekday_mean: mean_where(&|s| !is_weekend(s.timestamp.weekday())),
            weekend_mean: mean_where(&|s| is_weekend(s.timestamp.weekday())),
        })
    }

    /// Business-hours mean over off-hours mean
    pub fn peak_ratio(&self) -> f64 {
        if self.off_hours_mean > 0.0 {
            self.business_hours_mean / self.off_hours_mean
        } else {
            0.0
        }
    }

    /// Fractional drop of weekend load relative to weekdays
    pub fn weekend_reduction(&self) -> f64 {
        if self.weekday_mean > 0.0 {
            1.0 - self.weekend_mean / self.weekday_mean
        } else {
            0.0
        }
    }
}
