//! DS18B20 outdoor probe over a bit-banged 1-Wire bus
//!
//! The bus needs one open-drain pin with a pull-up that can be both driven
//! low and sampled, plus a microsecond delay. Probes must be externally
//! powered; parasite power needs a strong pull-up during conversion that
//! this driver does not provide.
//!
//! The part of each slot between the falling edge and the sample (or the
//! release) runs inside a critical section so radio interrupts cannot
//! stretch it. Recovery time after a slot runs with interrupts enabled.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;
use log::{debug, info};

use super::{OutdoorProbe, SensorError};

const SENSOR: &str = "DS18B20";

/// Maximum number of probes remembered by [`Ds18b20::discover`].
pub const MAX_PROBES: usize = 4;

/// 64-bit ROM code: family byte, 48-bit serial, CRC.
pub type Rom = [u8; 8];

const FAMILY_CODE: u8 = 0x28;

const SEARCH_ROM: u8 = 0xF0;
const MATCH_ROM: u8 = 0x55;
const SKIP_ROM: u8 = 0xCC;
const CONVERT_T: u8 = 0x44;
const READ_SCRATCHPAD: u8 = 0xBE;

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Temperature from a 9-byte scratchpad, after checking its CRC.
pub fn decode_scratchpad(scratchpad: &[u8; 9]) -> Result<f32, SensorError> {
    if crc8(&scratchpad[..8]) != scratchpad[8] {
        return Err(SensorError::CrcMismatch { sensor: SENSOR });
    }
    // 12-bit resolution: 1/16 °C per LSB, two's complement
    let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
    Ok(f32::from(raw) / 16.0)
}

fn pin_error() -> SensorError {
    SensorError::ReadFailed {
        sensor: SENSOR,
        details: "1-Wire pin access failed",
    }
}

/// Slot-level 1-Wire master.
pub struct OneWireBus<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> OneWireBus<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| pin_error())
    }

    fn pull_low(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| pin_error())
    }

    /// Reset pulse; returns whether any device answered with a presence
    /// pulse.
    pub fn reset(&mut self) -> Result<bool, SensorError> {
        // a longer low pulse is harmless, so only the sample is protected
        self.pull_low()?;
        self.delay.delay_us(480);
        let present = critical_section::with(|_| {
            self.release()?;
            self.delay.delay_us(70);
            self.pin.is_low().map_err(|_| pin_error())
        })?;
        self.delay.delay_us(410);
        Ok(present)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorError> {
        let (low_us, recovery_us) = if bit { (6, 64) } else { (60, 10) };
        critical_section::with(|_| {
            self.pull_low()?;
            self.delay.delay_us(low_us);
            self.release()
        })?;
        self.delay.delay_us(recovery_us);
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, SensorError> {
        let bit = critical_section::with(|_| {
            self.pull_low()?;
            self.delay.delay_us(6);
            self.release()?;
            self.delay.delay_us(9);
            self.pin.is_high().map_err(|_| pin_error())
        })?;
        self.delay.delay_us(55);
        Ok(bit)
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    fn reset_expecting_device(&mut self) -> Result<(), SensorError> {
        if self.reset()? {
            Ok(())
        } else {
            Err(SensorError::NoDevice { sensor: SENSOR })
        }
    }

    /// Enumerate every ROM on the bus with the binary-tree search, keeping
    /// up to `N` of them.
    pub fn search<const N: usize>(&mut self) -> Result<Vec<Rom, N>, SensorError> {
        let mut roms = Vec::new();
        let mut rom: Rom = [0; 8];
        let mut last_discrepancy = 0u8;

        loop {
            if !self.reset()? {
                break;
            }
            self.write_byte(SEARCH_ROM)?;

            let mut last_zero = 0u8;
            for bit_number in 1..=64u8 {
                let id_bit = self.read_bit()?;
                let complement = self.read_bit()?;
                if id_bit && complement {
                    // nobody answered this bit
                    return Err(SensorError::NoDevice { sensor: SENSOR });
                }

                let byte = usize::from((bit_number - 1) / 8);
                let mask = 1u8 << ((bit_number - 1) % 8);
                let direction = if id_bit != complement {
                    id_bit
                } else {
                    let take_one = if bit_number < last_discrepancy {
                        rom[byte] & mask != 0
                    } else {
                        bit_number == last_discrepancy
                    };
                    if !take_one {
                        last_zero = bit_number;
                    }
                    take_one
                };

                if direction {
                    rom[byte] |= mask;
                } else {
                    rom[byte] &= !mask;
                }
                self.write_bit(direction)?;
            }

            if crc8(&rom[..7]) != rom[7] {
                return Err(SensorError::CrcMismatch { sensor: SENSOR });
            }
            if roms.push(rom).is_err() {
                break;
            }

            last_discrepancy = last_zero;
            if last_discrepancy == 0 {
                break;
            }
        }

        Ok(roms)
    }
}

/// One or more DS18B20 probes sharing a bus.
///
/// Before [`Ds18b20::discover`] finds anything, probe index 0 is addressed
/// with Skip ROM, which works as long as a single probe is attached.
pub struct Ds18b20<P, D> {
    bus: OneWireBus<P, D>,
    probes: Vec<Rom, MAX_PROBES>,
}

impl<P, D> Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self {
            bus: OneWireBus::new(pin, delay),
            probes: Vec::new(),
        }
    }

    /// Search the bus and remember every DS18B20 found.
    pub fn discover(&mut self) -> Result<usize, SensorError> {
        let roms = self.bus.search::<MAX_PROBES>()?;
        self.probes = roms
            .into_iter()
            .filter(|rom| rom[0] == FAMILY_CODE)
            .collect();
        info!("Found {} DS18B20 probe(s)", self.probes.len());
        for rom in &self.probes {
            debug!("DS18B20 ROM {:02X?}", rom);
        }
        Ok(self.probes.len())
    }

    fn select(&mut self, probe_index: u8) -> Result<(), SensorError> {
        let rom = match self.probes.get(usize::from(probe_index)) {
            Some(rom) => Some(*rom),
            None if self.probes.is_empty() && probe_index == 0 => None,
            None => return Err(SensorError::NoDevice { sensor: SENSOR }),
        };

        self.bus.reset_expecting_device()?;
        match rom {
            Some(rom) => {
                self.bus.write_byte(MATCH_ROM)?;
                for byte in rom {
                    self.bus.write_byte(byte)?;
                }
            }
            None => self.bus.write_byte(SKIP_ROM)?,
        }
        Ok(())
    }
}

impl<P, D> OutdoorProbe for Ds18b20<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    async fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.bus.reset_expecting_device()?;
        self.bus.write_byte(SKIP_ROM)?;
        self.bus.write_byte(CONVERT_T)
    }

    async fn read_celsius(&mut self, probe_index: u8) -> Result<f32, SensorError> {
        self.select(probe_index)?;
        self.bus.write_byte(READ_SCRATCHPAD)?;

        let mut scratchpad = [0u8; 9];
        for byte in scratchpad.iter_mut() {
            *byte = self.bus.read_byte()?;
        }
        decode_scratchpad(&scratchpad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use embassy_futures::block_on;
    use embedded_hal::digital::ErrorType;

    /// Bus with only the pull-up: every sample reads high.
    struct FloatingPin;

    impl ErrorType for FloatingPin {
        type Error = Infallible;
    }

    impl InputPin for FloatingPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(true)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(false)
        }
    }

    impl OutputPin for FloatingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn scratchpad(lsb: u8, msb: u8) -> [u8; 9] {
        let mut pad = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, 0x0F, 0x10, 0];
        pad[8] = crc8(&pad[..8]);
        pad
    }

    #[test]
    fn test_crc8_known_rom() {
        assert_eq!(crc8(&[0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0x00]), 0xA2);
    }

    #[test]
    fn test_crc8_of_data_with_crc_is_zero() {
        let data = [0x28, 0xFF, 0x4B, 0x3E, 0x61, 0x15, 0x02];
        let mut with_crc = [0u8; 8];
        with_crc[..7].copy_from_slice(&data);
        with_crc[7] = crc8(&data);
        assert_eq!(crc8(&with_crc), 0);
    }

    #[test]
    fn test_decode_datasheet_values() {
        assert_eq!(decode_scratchpad(&scratchpad(0x91, 0x01)), Ok(25.0625));
        assert_eq!(decode_scratchpad(&scratchpad(0x5E, 0xFF)), Ok(-10.125));
        assert_eq!(decode_scratchpad(&scratchpad(0x00, 0x00)), Ok(0.0));
    }

    #[test]
    fn test_decode_rejects_bad_crc() {
        let mut pad = scratchpad(0x91, 0x01);
        pad[8] ^= 0x01;
        assert_eq!(
            decode_scratchpad(&pad),
            Err(SensorError::CrcMismatch { sensor: SENSOR })
        );
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum BusEvent {
        Low,
        High,
        Sample,
        Wait(u32),
    }

    type BusLog = Rc<RefCell<Vec<BusEvent>>>;

    /// Floating bus that records every edge, sample and wait in order.
    struct RecordingPin(BusLog);

    impl ErrorType for RecordingPin {
        type Error = Infallible;
    }

    impl InputPin for RecordingPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.0.borrow_mut().push(BusEvent::Sample);
            Ok(true)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            self.0.borrow_mut().push(BusEvent::Sample);
            Ok(false)
        }
    }

    impl OutputPin for RecordingPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(BusEvent::Low);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.borrow_mut().push(BusEvent::High);
            Ok(())
        }
    }

    struct RecordingDelay(BusLog);

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(BusEvent::Wait(ns / 1_000));
        }

        fn delay_us(&mut self, us: u32) {
            self.0.borrow_mut().push(BusEvent::Wait(us));
        }
    }

    fn recording_bus() -> (OneWireBus<RecordingPin, RecordingDelay>, BusLog) {
        let log = BusLog::default();
        let bus = OneWireBus::new(RecordingPin(log.clone()), RecordingDelay(log.clone()));
        (bus, log)
    }

    #[test]
    fn test_read_slot_samples_15us_after_falling_edge() {
        use BusEvent::*;
        let (mut bus, log) = recording_bus();

        assert_eq!(bus.read_byte(), Ok(0xFF));

        let events = log.borrow();
        assert_eq!(events.len(), 8 * 6);
        assert_eq!(
            &events[..6],
            &[Low, Wait(6), High, Wait(9), Sample, Wait(55)]
        );
    }

    #[test]
    fn test_write_slots_and_reset_timing() {
        use BusEvent::*;
        let (mut bus, log) = recording_bus();

        bus.write_byte(0b10).unwrap();
        assert_eq!(
            &log.borrow()[..8],
            &[Low, Wait(60), High, Wait(10), Low, Wait(6), High, Wait(64)]
        );

        log.borrow_mut().clear();
        assert_eq!(bus.reset(), Ok(false));
        assert_eq!(
            *log.borrow(),
            [Low, Wait(480), High, Wait(70), Sample, Wait(410)]
        );
    }

    #[test]
    fn test_empty_bus_reports_no_device() {
        let mut probe = Ds18b20::new(FloatingPin, NoDelay);
        assert_eq!(
            block_on(probe.request_conversion()),
            Err(SensorError::NoDevice { sensor: SENSOR })
        );
        assert_eq!(probe.discover(), Ok(0));
        assert!(block_on(probe.read_celsius(1)).is_err());
    }
}
