//! Decoding of the controller's general status.
//!
//! The payload of a successful [`Command::GeneralStatusQuery`](crate::Command::GeneralStatusQuery)
//! is decoded into a [`StatusRecord`]. Field offsets and bit masks are fixed by the
//! controller's firmware. Apart from the length requirement, no validation is performed,
//! so a garbled payload of sufficient length yields a record with meaningless values.

use bitflags_derive::{FlagsDebug, FlagsDisplay};
use core::fmt::{Display, Formatter};
use strum::{EnumString, FromRepr, VariantNames};

/// Minimum length of a general status payload.
pub const STATUS_PAYLOAD_LEN: usize = 28;

const OFFSET_VERSION: usize = 1;
const OFFSET_HOUR: usize = 2;
const OFFSET_MINUTE: usize = 3;
const OFFSET_SECOND: usize = 4;
const OFFSET_DAY: usize = 5;
const OFFSET_MONTH: usize = 6;
const OFFSET_YEAR: usize = 7;
const OFFSET_MODE: usize = 8;
const OFFSET_STATE: usize = 9;
const OFFSET_STATUS: usize = 10;
const OFFSET_ALARMS: usize = 13;
const OFFSET_SET_TEMPERATURE: usize = 16;
const OFFSET_BOILER_TEMPERATURE: usize = 17;
const OFFSET_DHW_TEMPERATURE: usize = 18;
const OFFSET_FLAME: usize = 20;
const OFFSET_OUTPUTS: usize = 21;
const OFFSET_FAN: usize = 23;
const OFFSET_POWER: usize = 24;
const OFFSET_THERMOSTAT: usize = 25;
const OFFSET_FEEDER_WORK_TIME: usize = 27;

const THERMOSTAT_STOP: u8 = 0x80;

/// Burner operating mode.
#[derive(FromRepr, strum::Display, EnumString, VariantNames, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Mode {
    /// Burner is in standby and does not heat.
    #[strum(to_string = "Standby", serialize = "standby")]
    Standby = 0x00,
    /// Burner heats automatically according to its set temperature.
    #[strum(to_string = "Auto", serialize = "auto")]
    Auto = 0x01,
    /// Burner heats according to its internal timer.
    #[strum(to_string = "Timer", serialize = "timer")]
    Timer = 0x02,
}

/// Heating circuit priority, reported as the operating state.
#[derive(FromRepr, strum::Display, EnumString, VariantNames, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum Priority {
    /// Central heating has priority.
    #[strum(to_string = "CH Priority", serialize = "ch_priority")]
    ChPriority = 0x00,
    /// Domestic hot water has priority.
    #[strum(to_string = "DHW Priority", serialize = "dhw_priority")]
    DhwPriority = 0x01,
    /// Both circulation pumps run in parallel.
    #[strum(to_string = "Parallel Pumps", serialize = "parallel_pumps")]
    ParallelPumps = 0x02,
    /// Only domestic hot water is heated.
    #[strum(to_string = "Summer Mode", serialize = "summer_mode")]
    SummerMode = 0x03,
}

/// Burner combustion phase.
#[derive(FromRepr, strum::Display, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum BurnerStatus {
    /// Idle.
    Idle = 0x00,
    /// Fan cleaning the combustion chamber.
    #[strum(to_string = "Fan Cleaning")]
    FanCleaning = 0x01,
    /// Mechanical cleaner running.
    Cleaner = 0x02,
    /// Waiting.
    Wait = 0x03,
    /// Loading pellets for ignition.
    Loading = 0x04,
    /// Heating the igniter.
    Heating = 0x05,
    /// First ignition phase.
    #[strum(to_string = "Ignition 1")]
    Ignition1 = 0x06,
    /// Second ignition phase.
    #[strum(to_string = "Ignition 2")]
    Ignition2 = 0x07,
    /// Flame stabilizing after ignition.
    Unfolding = 0x08,
    /// Burning.
    Burning = 0x09,
    /// Flame is being extinguished.
    Extinction = 0x0a,
    /// Flame extinguished, burner in standby.
    #[strum(to_string = "Standby/Extinct")]
    StandbyExtinct = 0x0b,
}

/// Burner power level.
#[derive(FromRepr, strum::Display, PartialEq, Eq, Copy, Clone, Debug)]
#[repr(u8)]
pub enum PowerLevel {
    /// Off.
    Off = 0x00,
    /// Suspended.
    Suspend = 0x01,
    /// Lowest power level.
    #[strum(to_string = "Power 1")]
    Power1 = 0x02,
    /// Medium power level.
    #[strum(to_string = "Power 2")]
    Power2 = 0x03,
    /// Highest power level.
    #[strum(to_string = "Power 3")]
    Power3 = 0x04,
}

bitflags::bitflags! {
    /// Burner alarm.
    ///
    /// Multiple alarms may be active simultaneously.
    #[derive(FlagsDisplay, FlagsDebug, PartialEq, Eq, Copy, Clone)]
    pub struct Alarm: u8 {
        /// Ignition failed.
        const IgnitionFailure = 0x01;
        /// Pellet feed is jammed.
        const PelletJam = 0x20;
    }
}

bitflags::bitflags! {
    /// Actuator driven by the controller.
    #[derive(FlagsDisplay, FlagsDebug, PartialEq, Eq, Copy, Clone)]
    pub struct Output: u8 {
        /// Igniter heater.
        const Heater = 0x02;
        /// Domestic hot water pump.
        const DhwPump = 0x04;
        /// Central heating pump.
        const ChPump = 0x08;
        /// Boiler feed.
        const BoilerFeed = 0x10;
        /// Pellet feeder.
        const Feeder = 0x20;
    }
}

/// Controller firmware version.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Version {
    /// Major version, from the high nibble.
    pub major: u8,
    /// Minor version, from the low nibble.
    pub minor: u8,
}

impl From<u8> for Version {
    fn from(val: u8) -> Self {
        Self {
            major: val >> 4,
            minor: val & 0x0f,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Date and time of the controller's real-time clock.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct Timestamp {
    /// Year value.
    pub year: u16,
    /// Month value.
    pub month: u8,
    /// Day value.
    pub day: u8,
    /// Hour value.
    pub hour: u8,
    /// Minute value.
    pub minute: u8,
    /// Second value.
    pub second: u8,
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// Snapshot of the controller's operating state.
///
/// Produced by a successful general status query. Raw codes are kept as-is;
/// use the accessor methods to interpret them.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub struct StatusRecord {
    /// Firmware version.
    pub version: Version,
    /// Controller clock.
    pub timestamp: Timestamp,
    /// Raw operating mode, see [`StatusRecord::mode`].
    pub mode: u8,
    /// Raw operating state, see [`StatusRecord::priority`].
    pub state: u8,
    /// Raw burner status code, see [`StatusRecord::burner_status`].
    pub status: u8,
    /// Active alarms.
    pub alarms: Alarm,
    /// Set boiler temperature.
    pub set_temperature: u8,
    /// Boiler temperature.
    pub boiler_temperature: u8,
    /// Domestic hot water temperature.
    pub dhw_temperature: u8,
    /// Flame level.
    pub flame: u8,
    /// Active outputs.
    pub outputs: Output,
    /// Fan level.
    pub fan: u8,
    /// Raw power level, see [`StatusRecord::power_level`].
    pub power: u8,
    /// Heating stopped by the room thermostat.
    pub thermostat_stop: bool,
    /// Accumulated feeder work time since the last counter reset.
    pub feeder_work_time: u8,
}

impl StatusRecord {
    /// Decodes a general status payload.
    #[must_use]
    pub fn decode(payload: &[u8; STATUS_PAYLOAD_LEN]) -> Self {
        Self {
            version: payload[OFFSET_VERSION].into(),
            timestamp: Timestamp {
                year: 2000 + u16::from(decode_bcd(payload[OFFSET_YEAR])),
                month: decode_bcd(payload[OFFSET_MONTH]),
                day: decode_bcd(payload[OFFSET_DAY]),
                hour: decode_bcd(payload[OFFSET_HOUR]),
                minute: decode_bcd(payload[OFFSET_MINUTE]),
                second: decode_bcd(payload[OFFSET_SECOND]),
            },
            mode: payload[OFFSET_MODE],
            state: payload[OFFSET_STATE],
            status: payload[OFFSET_STATUS],
            alarms: Alarm::from_bits_truncate(payload[OFFSET_ALARMS]),
            set_temperature: payload[OFFSET_SET_TEMPERATURE],
            boiler_temperature: payload[OFFSET_BOILER_TEMPERATURE],
            dhw_temperature: payload[OFFSET_DHW_TEMPERATURE],
            flame: payload[OFFSET_FLAME],
            outputs: Output::from_bits_truncate(payload[OFFSET_OUTPUTS]),
            fan: payload[OFFSET_FAN],
            power: payload[OFFSET_POWER],
            thermostat_stop: payload[OFFSET_THERMOSTAT] & THERMOSTAT_STOP != 0,
            feeder_work_time: payload[OFFSET_FEEDER_WORK_TIME],
        }
    }

    /// Returns the operating mode, if known.
    #[must_use]
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_repr(self.mode)
    }

    /// Returns the heating circuit priority, if known.
    #[must_use]
    pub fn priority(&self) -> Option<Priority> {
        Priority::from_repr(self.state)
    }

    /// Returns the burner status, if known.
    #[must_use]
    pub fn burner_status(&self) -> Option<BurnerStatus> {
        BurnerStatus::from_repr(self.status)
    }

    /// Returns the power level, if known.
    #[must_use]
    pub fn power_level(&self) -> Option<PowerLevel> {
        PowerLevel::from_repr(self.power)
    }
}

/// Decodes a two-digit BCD value.
fn decode_bcd(val: u8) -> u8 {
    (val >> 4) * 10 + (val & 0x0f)
}
