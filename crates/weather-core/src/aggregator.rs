//! Rolling aggregation between telemetry uploads
//!
//! The aggregator keeps running sums and counts per channel (outdoor
//! temperature, indoor temperature, indoor humidity) since the last reset
//! and turns them into period means when the uploader asks. It is owned by
//! the station and mutated only from the single control loop, so it needs no
//! locking.

use core::fmt;

use crate::sensors::{Reading, ReadingKind};

/// Running sums and counts since the last reset.
///
/// Counts only grow between resets. A mean is never computed for a channel
/// whose count is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollingAggregate {
    pub sum_outdoor_temp: f32,
    pub sum_indoor_temp: f32,
    pub sum_humidity: f32,
    pub count_outdoor: u32,
    pub count_indoor: u32,
    pub count_humidity: u32,
}

/// Per-channel means of one aggregation period; `None` means no data.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateMeans {
    pub outdoor_temperature: Option<f32>,
    pub indoor_temperature: Option<f32>,
    pub humidity: Option<f32>,
}

impl AggregateMeans {
    pub fn is_empty(&self) -> bool {
        self.outdoor_temperature.is_none()
            && self.indoor_temperature.is_none()
            && self.humidity.is_none()
    }
}

impl fmt::Display for AggregateMeans {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn channel(f: &mut fmt::Formatter<'_>, name: &str, value: Option<f32>) -> fmt::Result {
            match value {
                Some(v) => write!(f, "{}={:.2}", name, v),
                None => write!(f, "{}=n/a", name),
            }
        }
        channel(f, "outdoor", self.outdoor_temperature)?;
        f.write_str(" ")?;
        channel(f, "indoor", self.indoor_temperature)?;
        f.write_str(" ")?;
        channel(f, "humidity", self.humidity)
    }
}

fn mean(sum: f32, count: u32) -> Option<f32> {
    if count == 0 {
        None
    } else {
        Some(sum / count as f32)
    }
}

#[derive(Debug, Default)]
pub struct Aggregator {
    aggregate: RollingAggregate,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading to its channel. Invalid readings are dropped; the
    /// sampler has already logged them.
    pub fn accumulate(&mut self, reading: &Reading) {
        if !reading.valid {
            return;
        }

        let agg = &mut self.aggregate;
        match reading.kind {
            ReadingKind::Outdoor => {
                agg.sum_outdoor_temp += reading.temperature;
                agg.count_outdoor = agg.count_outdoor.saturating_add(1);
            }
            ReadingKind::Indoor => {
                agg.sum_indoor_temp += reading.temperature;
                agg.count_indoor = agg.count_indoor.saturating_add(1);
            }
        }

        if let Some(humidity) = reading.humidity {
            agg.sum_humidity += humidity;
            agg.count_humidity = agg.count_humidity.saturating_add(1);
        }
    }

    /// Current means without resetting.
    pub fn means(&self) -> AggregateMeans {
        let agg = &self.aggregate;
        AggregateMeans {
            outdoor_temperature: mean(agg.sum_outdoor_temp, agg.count_outdoor),
            indoor_temperature: mean(agg.sum_indoor_temp, agg.count_indoor),
            humidity: mean(agg.sum_humidity, agg.count_humidity),
        }
    }

    /// Zero all sums and counts.
    pub fn reset(&mut self) {
        self.aggregate = RollingAggregate::default();
    }

    /// Compute the means and reset in one step.
    ///
    /// Takes `&mut self`, so no accumulate can interleave between the
    /// snapshot and the reset.
    pub fn flush(&mut self) -> AggregateMeans {
        let means = self.means();
        self.reset();
        means
    }

    pub fn aggregate(&self) -> &RollingAggregate {
        &self.aggregate
    }
}
