//! Time-sliced rotation over the display views
//!
//! One panel shows one view at a time. Each view has a dwell time; once it
//! has been on screen that long the multiplexer moves to the next view in
//! fixed order. Within a dwell the panel is redrawn only when the content
//! of the current view changes, so an idle station does not push identical
//! frames over the bus every tick.

use core::fmt::Debug;

use log::{debug, warn};

use super::views::render;
use super::{DisplayView, Panel, ViewContent};
use crate::config::TimingConfig;
use crate::forecast::ForecastSlot;
use crate::sampler::LatestReadings;
use crate::timer::{ElapsedTimer, Millis};

/// What happened to the panel during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The frame on screen is already current.
    Unchanged,
    Rendered(DisplayView),
    /// Drawing or presenting failed; the view is retried next tick.
    Failed(DisplayView),
}

#[derive(Debug, Clone, Copy)]
struct DwellTimes {
    indoor: Millis,
    outdoor: Millis,
    forecast: Millis,
}

pub struct DisplayMultiplexer<P> {
    panel: P,
    current: DisplayView,
    timer: ElapsedTimer,
    dwell: DwellTimes,
    /// Content of the last frame presented for `current`; `None` forces a
    /// redraw.
    shown: Option<ViewContent>,
}

impl<P> DisplayMultiplexer<P>
where
    P: Panel,
    P::Error: Debug,
{
    pub fn new(panel: P, timing: &TimingConfig, now: Millis) -> Self {
        Self {
            panel,
            current: DisplayView::Indoor,
            timer: ElapsedTimer::new(now),
            dwell: DwellTimes {
                indoor: timing.indoor_dwell,
                outdoor: timing.outdoor_dwell,
                forecast: timing.forecast_dwell,
            },
            shown: None,
        }
    }

    pub fn current(&self) -> DisplayView {
        self.current
    }

    pub fn dwell_for(&self, view: DisplayView) -> Millis {
        match view {
            DisplayView::Indoor => self.dwell.indoor,
            DisplayView::Outdoor => self.dwell.outdoor,
            DisplayView::Forecast(_) => self.dwell.forecast,
        }
    }

    /// Direct access for screens shown outside the rotation, such as the
    /// startup status. The next tick redraws the current view.
    pub fn panel_mut(&mut self) -> &mut P {
        self.shown = None;
        &mut self.panel
    }

    /// Move to the next view and restart its dwell.
    pub fn advance(&mut self, now: Millis, forecast_len: usize) {
        let next = self.current.next(forecast_len);
        debug!("Display: {:?} -> {:?}", self.current, next);
        self.current = next;
        self.timer.reset(now);
        self.shown = None;
    }

    /// Rotate if the dwell has expired, then redraw if what the current
    /// view shows differs from what is on screen.
    pub fn tick(
        &mut self,
        now: Millis,
        latest: &LatestReadings,
        forecast: &[ForecastSlot],
    ) -> RenderOutcome {
        if self.timer.elapsed(now) >= self.dwell_for(self.current) {
            self.advance(now, forecast.len());
        }

        let content = match ViewContent::for_view(self.current, latest, forecast) {
            Some(content) => content,
            None => {
                // the forecast shrank under a forecast view
                self.advance(now, forecast.len());
                match ViewContent::for_view(self.current, latest, forecast) {
                    Some(content) => content,
                    None => return RenderOutcome::Unchanged,
                }
            }
        };

        if self.shown.as_ref() == Some(&content) {
            return RenderOutcome::Unchanged;
        }

        match render(&content, &mut self.panel) {
            Ok(()) => {
                self.shown = Some(content);
                RenderOutcome::Rendered(self.current)
            }
            Err(e) => {
                warn!("Failed to render {:?}: {:?}", self.current, e);
                RenderOutcome::Failed(self.current)
            }
        }
    }
}
