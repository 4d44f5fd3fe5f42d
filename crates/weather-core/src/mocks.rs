//! Scripted collaborators for unit tests

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::display::{DISPLAY_HEIGHT_PX, DISPLAY_WIDTH_PX, Panel};
use crate::net::{HttpClient, HttpResponse, NetError};
use crate::sensors::{IndoorMeasurement, IndoorSensor, OutdoorProbe, SensorError};

/// Network that replays queued responses and records every URL requested.
///
/// An exhausted queue answers with [`NetError::Timeout`].
pub struct ScriptedNet {
    pub connected: bool,
    pub requests: Vec<String>,
    responses: VecDeque<Result<HttpResponse, NetError>>,
}

impl ScriptedNet {
    pub fn connected() -> Self {
        Self {
            connected: true,
            requests: Vec::new(),
            responses: VecDeque::new(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::connected()
        }
    }

    pub fn respond(&mut self, status: u16, body: &str) {
        self.responses.push_back(Ok(HttpResponse {
            status,
            body: body.as_bytes().to_vec(),
        }));
    }

    pub fn fail(&mut self, error: NetError) {
        self.responses.push_back(Err(error));
    }

    /// Requests whose URL contains `needle`.
    pub fn count_matching(&self, needle: &str) -> usize {
        self.requests.iter().filter(|r| r.contains(needle)).count()
    }
}

impl HttpClient for ScriptedNet {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn get(&mut self, url: &str) -> Result<HttpResponse, NetError> {
        self.requests.push(url.to_string());
        self.responses.pop_front().unwrap_or(Err(NetError::Timeout))
    }
}

/// Indoor sensor returning queued results, then repeating `fallback`.
pub struct ScriptedIndoor {
    pub calls: usize,
    script: VecDeque<Result<IndoorMeasurement, SensorError>>,
    fallback: Result<IndoorMeasurement, SensorError>,
}

impl ScriptedIndoor {
    pub fn steady(temperature_celsius: f32, humidity_percent: f32) -> Self {
        Self {
            calls: 0,
            script: VecDeque::new(),
            fallback: Ok(IndoorMeasurement {
                temperature_celsius,
                humidity_percent,
            }),
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: 0,
            script: VecDeque::new(),
            fallback: Err(SensorError::ReadFailed {
                sensor: "indoor",
                details: "scripted failure",
            }),
        }
    }

    pub fn then(mut self, result: Result<IndoorMeasurement, SensorError>) -> Self {
        self.script.push_back(result);
        self
    }
}

impl IndoorSensor for ScriptedIndoor {
    async fn measure(&mut self) -> Result<IndoorMeasurement, SensorError> {
        self.calls += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

/// Outdoor probe with counters for both phases.
pub struct ScriptedProbe {
    pub requests: usize,
    pub reads: usize,
    pub fail_request: bool,
    script: VecDeque<Result<f32, SensorError>>,
    fallback: Result<f32, SensorError>,
}

impl ScriptedProbe {
    pub fn steady(celsius: f32) -> Self {
        Self {
            requests: 0,
            reads: 0,
            fail_request: false,
            script: VecDeque::new(),
            fallback: Ok(celsius),
        }
    }

    pub fn then(mut self, result: Result<f32, SensorError>) -> Self {
        self.script.push_back(result);
        self
    }
}

impl OutdoorProbe for ScriptedProbe {
    async fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.requests += 1;
        if self.fail_request {
            Err(SensorError::NoDevice { sensor: "outdoor" })
        } else {
            Ok(())
        }
    }

    async fn read_celsius(&mut self, _probe_index: u8) -> Result<f32, SensorError> {
        self.reads += 1;
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelFault;

/// In-memory 128x64 panel that counts frames.
pub struct TestPanel {
    pub clears: usize,
    pub presents: usize,
    pub fail_present: bool,
    pixels: Vec<bool>,
}

impl TestPanel {
    pub fn new() -> Self {
        Self {
            clears: 0,
            presents: 0,
            fail_present: false,
            pixels: vec![false; (DISPLAY_WIDTH_PX * DISPLAY_HEIGHT_PX) as usize],
        }
    }

    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    pub fn is_lit(&self, point: Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as u32) < DISPLAY_WIDTH_PX
            && (point.y as u32) < DISPLAY_HEIGHT_PX
            && self.pixels[point.y as usize * DISPLAY_WIDTH_PX as usize + point.x as usize]
    }
}

impl OriginDimensions for TestPanel {
    fn size(&self) -> Size {
        Size::new(DISPLAY_WIDTH_PX, DISPLAY_HEIGHT_PX)
    }
}

impl DrawTarget for TestPanel {
    type Color = BinaryColor;
    type Error = PanelFault;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && point.y >= 0
                && (point.x as u32) < DISPLAY_WIDTH_PX
                && (point.y as u32) < DISPLAY_HEIGHT_PX
            {
                let index = point.y as usize * DISPLAY_WIDTH_PX as usize + point.x as usize;
                self.pixels[index] = color.is_on();
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clears += 1;
        self.pixels.fill(color.is_on());
        Ok(())
    }
}

impl Panel for TestPanel {
    fn present(&mut self) -> Result<(), Self::Error> {
        if self.fail_present {
            return Err(PanelFault);
        }
        self.presents += 1;
        Ok(())
    }
}
