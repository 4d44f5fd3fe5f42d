use embassy_time::Instant;
use weather_core::{Clock, Millis};

/// Station clock backed by the embassy time driver.
///
/// Truncates to 32 bits; the core timers use wrapping arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> Millis {
        Instant::now().as_millis() as Millis
    }
}
