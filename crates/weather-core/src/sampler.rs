//! Multi-rate sensor sampling
//!
//! The indoor sensor and the outdoor probe have different physical limits,
//! so each gets its own cadence instead of sharing one timer. Each call to
//! [`SensorSampler::tick`] does at most one unit of work per sensor and
//! returns; the outdoor conversion is split across ticks so the ~750 ms
//! conversion never holds up the loop.

use log::{debug, warn};

use crate::aggregator::Aggregator;
use crate::config::TimingConfig;
use crate::sensors::{IndoorSensor, OutdoorProbe, Reading, ReadingKind, SensorError};
use crate::timer::{Cadence, ElapsedTimer, Millis};

/// Bus index of the outdoor probe to read.
pub const OUTDOOR_PROBE_INDEX: u8 = 0;

/// Most recent valid values, shown by the display.
///
/// Invalid readings never overwrite these; the display keeps the last known
/// good value instead.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatestReadings {
    pub indoor_temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub outdoor_temperature: Option<f32>,
}

impl LatestReadings {
    fn record(&mut self, reading: &Reading) {
        if !reading.valid {
            return;
        }
        match reading.kind {
            ReadingKind::Indoor => {
                self.indoor_temperature = Some(reading.temperature);
                self.humidity = reading.humidity;
            }
            ReadingKind::Outdoor => self.outdoor_temperature = Some(reading.temperature),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutdoorPhase {
    Idle,
    Converting(ElapsedTimer),
}

/// Readings taken during one tick; `None` where the sensor was not due.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleReport {
    pub indoor: Option<Reading>,
    pub outdoor: Option<Reading>,
}

pub struct SensorSampler<I, O> {
    indoor: I,
    outdoor: O,
    indoor_cadence: Cadence,
    outdoor_cadence: Cadence,
    conversion_time: Millis,
    outdoor_phase: OutdoorPhase,
    latest: LatestReadings,
}

impl<I, O> SensorSampler<I, O>
where
    I: IndoorSensor,
    O: OutdoorProbe,
{
    pub fn new(indoor: I, outdoor: O, timing: &TimingConfig, now: Millis) -> Self {
        Self {
            indoor,
            outdoor,
            indoor_cadence: Cadence::new(now, timing.indoor_period),
            outdoor_cadence: Cadence::new(now, timing.outdoor_period),
            conversion_time: timing.outdoor_conversion,
            outdoor_phase: OutdoorPhase::Idle,
            latest: LatestReadings::default(),
        }
    }

    pub fn latest(&self) -> &LatestReadings {
        &self.latest
    }

    /// Whether an outdoor conversion has been requested but not read back.
    pub fn is_converting(&self) -> bool {
        matches!(self.outdoor_phase, OutdoorPhase::Converting(_))
    }

    /// Run whichever sensor steps are due and feed valid readings to the
    /// aggregator.
    pub async fn tick(&mut self, now: Millis, aggregator: &mut Aggregator) -> SampleReport {
        let mut report = SampleReport::default();

        if self.indoor_cadence.is_due(now) {
            let reading = self.sample_indoor(now).await;
            aggregator.accumulate(&reading);
            report.indoor = Some(reading);
        }

        if let Some(reading) = self.sample_outdoor(now).await {
            aggregator.accumulate(&reading);
            report.outdoor = Some(reading);
        }

        report
    }

    /// Read the indoor sensor once.
    ///
    /// The indoor cadence restarts after every attempt, valid or not, so a
    /// failing sensor is still never polled faster than its period.
    pub async fn sample_indoor(&mut self, now: Millis) -> Reading {
        let reading = match self.indoor.measure().await {
            Ok(m) => {
                let reading = Reading::indoor(m.temperature_celsius, m.humidity_percent);
                if reading.valid {
                    debug!(
                        "Indoor: {:.2} C, {:.2} %",
                        m.temperature_celsius, m.humidity_percent
                    );
                } else {
                    warn!(
                        "Failed to read from indoor sensor: {}",
                        SensorError::NotANumber {
                            sensor: ReadingKind::Indoor.label()
                        }
                    );
                }
                reading
            }
            Err(e) => {
                warn!("Failed to read from indoor sensor: {}", e);
                Reading::invalid(ReadingKind::Indoor)
            }
        };
        self.indoor_cadence.restart(now);

        self.latest.record(&reading);
        reading
    }

    /// Advance the outdoor probe by one step.
    ///
    /// When the outdoor cadence is due a conversion is requested; once the
    /// conversion time has passed the value is read back and returned. A
    /// failed request is returned immediately as an invalid reading.
    pub async fn sample_outdoor(&mut self, now: Millis) -> Option<Reading> {
        match self.outdoor_phase {
            OutdoorPhase::Idle => {
                if !self.outdoor_cadence.is_due(now) {
                    return None;
                }
                self.outdoor_cadence.restart(now);

                match self.outdoor.request_conversion().await {
                    Ok(()) => {
                        self.outdoor_phase = OutdoorPhase::Converting(ElapsedTimer::new(now));
                        None
                    }
                    Err(e) => {
                        warn!("Failed to start outdoor conversion: {}", e);
                        Some(Reading::invalid(ReadingKind::Outdoor))
                    }
                }
            }
            OutdoorPhase::Converting(timer) => {
                if timer.elapsed(now) < self.conversion_time {
                    return None;
                }
                self.outdoor_phase = OutdoorPhase::Idle;

                let reading = match self.outdoor.read_celsius(OUTDOOR_PROBE_INDEX).await {
                    Ok(celsius) => {
                        let reading = Reading::outdoor(celsius);
                        if reading.valid {
                            debug!("Outdoor: {:.2} C", celsius);
                        } else {
                            warn!(
                                "Failed to read from outdoor probe: {}",
                                SensorError::NotANumber {
                                    sensor: ReadingKind::Outdoor.label()
                                }
                            );
                        }
                        reading
                    }
                    Err(e) => {
                        warn!("Failed to read from outdoor probe: {}", e);
                        Reading::invalid(ReadingKind::Outdoor)
                    }
                };

                self.latest.record(&reading);
                Some(reading)
            }
        }
    }
}
