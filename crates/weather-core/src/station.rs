//! The cooperative control loop
//!
//! [`WeatherStation`] owns every component and the collaborators they talk
//! to. One call to [`WeatherStation::tick`] gives each component at most one
//! unit of work, in a fixed order:
//!
//! 1. sensor sampler (indoor read and/or one outdoor phase step),
//! 2. display multiplexer (rotate if the dwell expired, redraw if changed),
//! 3. network step: forecast refresh then telemetry upload, each only when
//!    its own cadence is due, and skipped as a whole while disconnected or
//!    after [`WeatherStation::disable_network`].
//!
//! Nothing in a tick waits on a timer, so no activity can hold up another
//! for longer than one bounded sensor or network call.

use core::fmt::Debug;

use log::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::config::{StationConfig, WeatherServiceConfig};
use crate::display::views::render_status;
use crate::display::{DisplayMultiplexer, DisplayView, Panel, RenderOutcome};
use crate::forecast::{FetchError, Forecast, ForecastFetcher};
use crate::net::HttpClient;
use crate::sampler::{LatestReadings, SampleReport, SensorSampler};
use crate::sensors::{IndoorSensor, OutdoorProbe};
use crate::timer::{Cadence, Millis};
use crate::uploader::{UploadOutcome, Uploader};

/// Result of the forecast step of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastOutcome {
    NotDue,
    /// Due, but the network is down.
    Skipped,
    Updated { slots: usize },
    /// The previous forecast was kept.
    Failed(FetchError),
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub samples: SampleReport,
    pub render: RenderOutcome,
    pub forecast: ForecastOutcome,
    pub upload: UploadOutcome,
}

pub struct WeatherStation<'a, I, O, N, P> {
    sampler: SensorSampler<I, O>,
    aggregator: Aggregator,
    display: DisplayMultiplexer<P>,
    net: N,
    weather: WeatherServiceConfig<'a>,
    fetcher: ForecastFetcher<'a>,
    forecast_cadence: Cadence,
    forecast: Forecast,
    uploader: Uploader<'a>,
    network_enabled: bool,
}

impl<'a, I, O, N, P> WeatherStation<'a, I, O, N, P>
where
    I: IndoorSensor,
    O: OutdoorProbe,
    N: HttpClient,
    P: Panel,
    P::Error: Debug,
{
    /// Assemble a station whose timers all start at `now`.
    ///
    /// The forecast is due immediately so the first connected tick fetches
    /// it; sensors and upload wait one full period.
    pub fn new(
        config: &StationConfig<'a>,
        indoor: I,
        outdoor: O,
        net: N,
        panel: P,
        now: Millis,
    ) -> Self {
        let timing = &config.timing;
        Self {
            sampler: SensorSampler::new(indoor, outdoor, timing, now),
            aggregator: Aggregator::new(),
            display: DisplayMultiplexer::new(panel, timing, now),
            net,
            weather: config.weather.clone(),
            fetcher: ForecastFetcher::new(config.weather.base_url, config.weather.api_key),
            forecast_cadence: Cadence::due_immediately(now, timing.forecast_period),
            forecast: Forecast::new(),
            uploader: Uploader::new(
                config.telemetry.base_url,
                config.telemetry.api_key,
                timing.upload_period,
                now,
            ),
            network_enabled: true,
        }
    }

    /// Run without the network step, e.g. when the service keys are
    /// missing. Sampling, aggregation and the display are unaffected.
    pub fn disable_network(&mut self) {
        self.network_enabled = false;
    }

    pub async fn tick(&mut self, now: Millis) -> TickReport {
        let samples = self.sampler.tick(now, &mut self.aggregator).await;
        let render = self
            .display
            .tick(now, self.sampler.latest(), &self.forecast);

        let (forecast, upload) = if self.network_enabled && self.net.is_connected() {
            let forecast = self.refresh_forecast(now).await;
            let upload = self
                .uploader
                .maybe_upload(now, &mut self.net, &mut self.aggregator)
                .await;
            (forecast, upload)
        } else {
            let forecast = if self.forecast_cadence.is_due(now) {
                ForecastOutcome::Skipped
            } else {
                ForecastOutcome::NotDue
            };
            let upload = if self.uploader.is_due(now) {
                UploadOutcome::Skipped
            } else {
                UploadOutcome::NotDue
            };
            if forecast == ForecastOutcome::Skipped || upload == UploadOutcome::Skipped {
                debug!("Network unavailable, skipping network work");
            }
            (forecast, upload)
        };

        TickReport {
            samples,
            render,
            forecast,
            upload,
        }
    }

    /// Fetch a new forecast if the refresh period has elapsed.
    ///
    /// A failed fetch leaves the current forecast untouched and waits a
    /// full period before trying again.
    async fn refresh_forecast(&mut self, now: Millis) -> ForecastOutcome {
        if !self.forecast_cadence.is_due(now) {
            return ForecastOutcome::NotDue;
        }

        let result = self
            .fetcher
            .fetch(
                &mut self.net,
                self.weather.city,
                self.weather.country_code,
                self.weather.slot_count,
            )
            .await;
        self.forecast_cadence.restart(now);

        match result {
            Ok(forecast) => {
                info!(
                    "Forecast updated: {} slots for {}",
                    forecast.len(),
                    self.weather.city
                );
                for slot in &forecast {
                    debug!(
                        "  {} {} C {}",
                        slot.time_label,
                        slot.temperature_celsius,
                        slot.icon().label()
                    );
                }
                self.forecast = forecast;
                ForecastOutcome::Updated {
                    slots: self.forecast.len(),
                }
            }
            Err(e) => {
                warn!("Forecast fetch failed, keeping previous: {}", e);
                ForecastOutcome::Failed(e)
            }
        }
    }

    /// Draw a full-screen status message outside the view rotation.
    pub fn show_status(&mut self, message: &str) {
        if let Err(e) = render_status(self.display.panel_mut(), message) {
            warn!("Failed to show status {:?}: {:?}", message, e);
        }
    }

    pub fn latest(&self) -> &LatestReadings {
        self.sampler.latest()
    }

    pub fn forecast(&self) -> &Forecast {
        &self.forecast
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn current_view(&self) -> DisplayView {
        self.display.current()
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut N {
        &mut self.net
    }

    pub fn panel_mut(&mut self) -> &mut P {
        self.display.panel_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TelemetryConfig, TimingConfig};
    use crate::forecast::ParseError;
    use crate::mocks::{ScriptedIndoor, ScriptedNet, ScriptedProbe, TestPanel};
    use crate::net::NetError;
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    const FORECAST: &str = r#"{"list": [
        {"main": {"temp": 275.4}, "weather": [{"id": 800}], "dt_txt": "2024-03-01 12:00:00"},
        {"main": {"temp": 274.0}, "weather": [{"id": 803}], "dt_txt": "2024-03-01 15:00:00"},
        {"main": {"temp": 271.9}, "weather": [{"id": 601}], "dt_txt": "2024-03-01 18:00:00"}
    ]}"#;

    type TestStation =
        WeatherStation<'static, ScriptedIndoor, ScriptedProbe, ScriptedNet, TestPanel>;

    fn config(timing: TimingConfig) -> StationConfig<'static> {
        StationConfig {
            weather: WeatherServiceConfig {
                base_url: "http://weather.test",
                api_key: "wkey",
                ..Default::default()
            },
            telemetry: TelemetryConfig {
                base_url: "http://telemetry.test",
                api_key: "tkey",
            },
            timing,
            ..Default::default()
        }
    }

    fn station(timing: TimingConfig, net: ScriptedNet) -> TestStation {
        WeatherStation::new(
            &config(timing),
            ScriptedIndoor::steady(21.0, 40.0),
            ScriptedProbe::steady(-2.0),
            net,
            TestPanel::new(),
            0,
        )
    }

    fn run(station: &mut TestStation, until: Millis, step: Millis) -> Vec<TickReport> {
        (0..=until)
            .step_by(step as usize)
            .map(|now| block_on(station.tick(now)))
            .collect()
    }

    #[test]
    fn test_every_activity_makes_progress() {
        let mut net = ScriptedNet::connected();
        net.respond(200, FORECAST);
        let mut s = station(TimingConfig::default(), net);

        let reports = run(&mut s, 30_000, 50);

        let indoor = reports.iter().filter(|r| r.samples.indoor.is_some()).count();
        let outdoor = reports.iter().filter(|r| r.samples.outdoor.is_some()).count();
        // 2.05 s effective indoor cadence, request-to-request outdoor cadence
        assert_eq!(indoor, 14);
        assert!(outdoor >= 27, "outdoor reads: {}", outdoor);

        assert_eq!(reports[0].forecast, ForecastOutcome::Updated { slots: 3 });
        let views: Vec<DisplayView> = reports
            .iter()
            .filter_map(|r| match r.render {
                RenderOutcome::Rendered(view) => Some(view),
                _ => None,
            })
            .collect();
        for view in [
            DisplayView::Indoor,
            DisplayView::Outdoor,
            DisplayView::Forecast(0),
            DisplayView::Forecast(1),
            DisplayView::Forecast(2),
        ] {
            assert!(views.contains(&view), "{:?} never rendered", view);
        }

        assert_eq!(s.latest().outdoor_temperature, Some(-2.0));
        assert_eq!(s.latest().humidity, Some(40.0));
    }

    #[test]
    fn test_failed_fetch_keeps_forecast() {
        let timing = TimingConfig {
            forecast_period: 1_000,
            ..TimingConfig::default()
        };
        let mut net = ScriptedNet::connected();
        net.respond(200, FORECAST);
        net.respond(503, "");
        net.respond(200, r#"{"list": []}"#);
        let mut s = station(timing, net);

        assert_eq!(
            block_on(s.tick(0)).forecast,
            ForecastOutcome::Updated { slots: 3 }
        );
        let first = s.forecast().clone();

        assert_eq!(block_on(s.tick(500)).forecast, ForecastOutcome::NotDue);
        assert_eq!(
            block_on(s.tick(1_001)).forecast,
            ForecastOutcome::Failed(FetchError::Transport(NetError::Status(503)))
        );
        assert_eq!(s.forecast(), &first);

        assert_eq!(
            block_on(s.tick(2_002)).forecast,
            ForecastOutcome::Failed(FetchError::Parse(ParseError::TooFewSlots {
                expected: 3,
                found: 0
            }))
        );
        assert_eq!(s.forecast(), &first);
    }

    #[test]
    fn test_disconnected_skips_network_step() {
        let mut s = station(TimingConfig::default(), ScriptedNet::disconnected());

        let first = block_on(s.tick(0));
        assert_eq!(first.forecast, ForecastOutcome::Skipped);
        assert_eq!(first.upload, UploadOutcome::NotDue);

        let reports = run(&mut s, 310_000, 1_000);
        assert!(s.net().requests.is_empty());
        assert!(reports.iter().any(|r| r.upload == UploadOutcome::Skipped));
        assert!(s.forecast().is_empty());
        // sampling and display carry on regardless
        assert_eq!(s.latest().indoor_temperature, Some(21.0));
        assert!(s.aggregator().aggregate().count_outdoor > 0);
    }

    #[test]
    fn test_disabled_network_keeps_sampling_and_display() {
        let mut net = ScriptedNet::connected();
        net.respond(200, FORECAST);
        let mut s = station(TimingConfig::default(), net);
        s.disable_network();

        let first = block_on(s.tick(0));
        assert_eq!(first.forecast, ForecastOutcome::Skipped);

        let reports = run(&mut s, 310_000, 1_000);
        assert!(s.net().requests.is_empty());
        assert!(reports.iter().any(|r| r.upload == UploadOutcome::Skipped));
        assert!(
            reports
                .iter()
                .any(|r| r.render == RenderOutcome::Rendered(DisplayView::Outdoor))
        );
        assert_eq!(s.latest().indoor_temperature, Some(21.0));
        assert!(s.aggregator().aggregate().count_indoor > 0);
    }

    #[test]
    fn test_upload_only_when_due_and_connected() {
        let timing = TimingConfig {
            upload_period: 10_000,
            ..TimingConfig::default()
        };
        let mut net = ScriptedNet::connected();
        net.respond(200, FORECAST);
        let mut s = station(timing, net);

        run(&mut s, 10_000, 50);
        assert_eq!(s.net().count_matching("/update?"), 0);

        s.net_mut().connected = false;
        assert_eq!(block_on(s.tick(10_001)).upload, UploadOutcome::Skipped);
        assert_eq!(s.net().count_matching("/update?"), 0);

        s.net_mut().connected = true;
        s.net_mut().respond(200, "12");
        let report = block_on(s.tick(10_050));
        assert_eq!(report.upload, UploadOutcome::Sent { status: 200 });
        assert_eq!(s.net().count_matching("/update?"), 1);

        let url = s.net().requests.last().unwrap();
        assert!(url.starts_with("http://telemetry.test/update?api_key=tkey&field1=-2.00"));
        assert!(url.contains("&field2=21.00&field3=40.00"));
        assert!(s.aggregator().means().is_empty());
    }

    #[test]
    fn test_status_screen_forces_redraw() {
        let mut s = station(TimingConfig::default(), ScriptedNet::disconnected());
        block_on(s.tick(0));
        s.show_status("Connecting...");
        assert_eq!(
            block_on(s.tick(50)).render,
            RenderOutcome::Rendered(DisplayView::Indoor)
        );
        assert_eq!(s.panel_mut().presents, 3);
    }
}
