//! Controller (EasyTouch/IntelliTouch class) payload decoding.

use num_enum::{FromPrimitive, IntoPrimitive};
use poolbus_frame::Frame;
use strum_macros::Display;
use tracing::debug;

use crate::address::DeviceFamily;
use crate::decoder::DeviceDecoder;
use crate::error::DecodeError;
use crate::fields::{decode_flags, expect_len, minutes_of_day, FlagSpec};
use crate::value::{ChannelSpec, ChannelValue, ScaledValue, TemperatureUnit, ValueKind};

pub const CIRCUIT_COUNT: u8 = 18;
pub const SCHEDULE_COUNT: u8 = 9;

/// Circuit that gates the pool temperature sensor.
const POOL_CIRCUIT: u8 = 6;
/// Circuit that gates the spa temperature sensor.
const SPA_CIRCUIT: u8 = 1;

const CMD_ACK: u8 = 0x01;
const CMD_STATUS: u8 = 0x02;
const CMD_CLOCK: u8 = 0x05;
const CMD_HEAT: u8 = 0x08;
const CMD_CIRCUIT: u8 = 0x0B;
const CMD_SCHEDULE: u8 = 0x11;
const CMD_VALVES: u8 = 0x1D;
const CMD_LIGHT_GROUPS: u8 = 0x27;
const CMD_VERSION: u8 = 0xFC;

const STATUS_LEN: usize = 29;
const HEAT_LEN: usize = 13;
const CLOCK_LEN: usize = 8;
const CIRCUIT_LEN: usize = 5;
const SCHEDULE_LEN: usize = 7;
const VERSION_LEN: usize = 17;

const STATUS_FLAGS: [FlagSpec; 3] = [
    FlagSpec::bit(9, 0, "status#servicemode"),
    FlagSpec::any(10, 0x0C, "status#heateron"),
    FlagSpec::any(10, 0x30, "status#solaron"),
];

const MODE_CELSIUS: u8 = 0x04;

/// Schedule start hour that marks an egg timer.
const EGG_TIMER_HOUR: u8 = 25;
/// Schedule end hour that marks a run-once schedule.
const ONCE_ONLY_HOUR: u8 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum HeatMode {
    Off = 0,
    Heater = 1,
    #[strum(to_string = "Solar Preferred")]
    SolarPreferred = 2,
    Solar = 3,
    #[num_enum(default)]
    Unknown = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum CircuitFunction {
    Generic = 0,
    Spa = 1,
    Pool = 2,
    #[strum(to_string = "Master Cleaner")]
    MasterCleaner = 5,
    Light = 7,
    #[strum(to_string = "SAM Light")]
    SamLight = 9,
    #[strum(to_string = "SAL Light")]
    SalLight = 10,
    #[strum(to_string = "Photon Gen")]
    PhotonGen = 11,
    #[strum(to_string = "Color Wheel")]
    ColorWheel = 12,
    Valves = 13,
    Spillway = 14,
    #[strum(to_string = "Floor Cleaner")]
    FloorCleaner = 15,
    IntelliBrite = 16,
    MagicStream = 17,
    #[strum(to_string = "Not Used")]
    NotUsed = 19,
    #[num_enum(default)]
    Unknown = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum CircuitName {
    #[strum(to_string = "Not Used")]
    NotUsed = 0,
    Aerator = 1,
    #[strum(to_string = "Air Blower")]
    AirBlower = 2,
    #[strum(to_string = "Aux 1")]
    Aux1 = 3,
    #[strum(to_string = "Aux 2")]
    Aux2 = 4,
    #[strum(to_string = "Aux 3")]
    Aux3 = 5,
    #[strum(to_string = "Aux 4")]
    Aux4 = 6,
    #[strum(to_string = "Aux 5")]
    Aux5 = 7,
    #[strum(to_string = "Aux 6")]
    Aux6 = 8,
    #[strum(to_string = "Aux 7")]
    Aux7 = 9,
    #[strum(to_string = "Aux 8")]
    Aux8 = 10,
    #[strum(to_string = "Aux 9")]
    Aux9 = 11,
    #[strum(to_string = "Aux 10")]
    Aux10 = 12,
    Backwash = 13,
    #[strum(to_string = "Back Light")]
    BackLight = 14,
    #[strum(to_string = "BBQ Light")]
    BbqLight = 15,
    #[strum(to_string = "Beach Light")]
    BeachLight = 16,
    #[strum(to_string = "Booster Pump")]
    BoosterPump = 17,
    #[strum(to_string = "Bug Light")]
    BugLight = 18,
    #[strum(to_string = "Cabana Lights")]
    CabanaLights = 19,
    #[strum(to_string = "Chem Feeder")]
    ChemFeeder = 20,
    Chlorinator = 21,
    Cleaner = 22,
    #[num_enum(default)]
    Unknown = 255,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive)]
#[repr(u8)]
pub enum ScheduleType {
    None = 0,
    Normal = 1,
    #[strum(to_string = "Egg Timer")]
    EggTimer = 2,
    #[strum(to_string = "Once Only")]
    OnceOnly = 3,
}

/// One controller program slot as last seen on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub kind: ScheduleType,
    pub circuit: u8,
    /// Minutes after midnight.
    pub start: u16,
    /// Minutes after midnight, or the run duration for egg timers.
    pub end: u16,
    pub days: u8,
}

impl Schedule {
    fn parse(payload: &[u8]) -> Self {
        let (circuit, start_h, start_m, end_h, end_m, days) = (
            payload[1], payload[2], payload[3], payload[4], payload[5], payload[6],
        );
        let kind = if start_h == EGG_TIMER_HOUR {
            ScheduleType::EggTimer
        } else if end_h == ONCE_ONLY_HOUR {
            ScheduleType::OnceOnly
        } else if circuit == 0 {
            ScheduleType::None
        } else {
            ScheduleType::Normal
        };
        Self {
            kind,
            circuit,
            start: u16::from(start_h) * 60 + u16::from(start_m),
            end: u16::from(end_h) * 60 + u16::from(end_m),
            days,
        }
    }

    fn channels(&self, id: u8, out: &mut Vec<ChannelValue>) {
        out.push(ChannelValue::new(
            format!("schedule{id}#type"),
            ScaledValue::enumerated(self.kind),
        ));
        out.push(ChannelValue::new(
            format!("schedule{id}#circuit"),
            ScaledValue::Number(f64::from(self.circuit)),
        ));
        out.push(ChannelValue::new(
            format!("schedule{id}#start"),
            ScaledValue::Number(f64::from(self.start)),
        ));
        out.push(ChannelValue::new(
            format!("schedule{id}#end"),
            ScaledValue::Number(f64::from(self.end)),
        ));
        out.push(ChannelValue::new(
            format!("schedule{id}#days"),
            ScaledValue::BitFlags(u32::from(self.days)),
        ));
    }
}

/// Decoder state for one controller.
///
/// The temperature unit comes from the most recent status frame and applies to
/// heat frames that follow it. Schedules are kept so unchanged slots stay quiet.
#[derive(Debug, Default)]
pub struct ControllerDecoder {
    unit: TemperatureUnit,
    schedules: [Option<Schedule>; SCHEDULE_COUNT as usize],
}

impl ControllerDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit reported by the last status frame.
    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    fn temperature(&self, raw: u8) -> ScaledValue {
        ScaledValue::Temperature(f64::from(raw), self.unit)
    }

    fn decode_status(&mut self, payload: &[u8]) -> Vec<ChannelValue> {
        self.unit = if payload[9] & MODE_CELSIUS != 0 {
            TemperatureUnit::Celsius
        } else {
            TemperatureUnit::Fahrenheit
        };

        let circuit_on = |circuit: u8| {
            let index = usize::from(circuit - 1);
            payload[2 + index / 8] & (1 << (index % 8)) != 0
        };

        let mut out = Vec::with_capacity(usize::from(CIRCUIT_COUNT) + 12);
        for circuit in 1..=CIRCUIT_COUNT {
            out.push(ChannelValue::new(
                format!("circuit{circuit}#switch"),
                ScaledValue::OnOff(circuit_on(circuit)),
            ));
        }

        let gated = |on: bool, raw: u8| {
            if on {
                self.temperature(raw)
            } else {
                ScaledValue::Undefined
            }
        };
        out.push(ChannelValue::new(
            "poolheat#temperature",
            gated(circuit_on(POOL_CIRCUIT), payload[14]),
        ));
        out.push(ChannelValue::new(
            "spaheat#temperature",
            gated(circuit_on(SPA_CIRCUIT), payload[15]),
        ));
        out.push(ChannelValue::new(
            "status#airtemperature",
            self.temperature(payload[18]),
        ));
        out.push(ChannelValue::new(
            "status#solartemperature",
            self.temperature(payload[19]),
        ));
        out.push(ChannelValue::new(
            "status#unit",
            ScaledValue::enumerated(self.unit),
        ));
        decode_flags(payload, &STATUS_FLAGS, &mut out);
        out.push(ChannelValue::new(
            "status#time",
            ScaledValue::Number(minutes_of_day(payload[0], payload[1])),
        ));
        push_heat_modes(payload[22], &mut out);
        out
    }

    fn decode_heat(&self, payload: &[u8]) -> Vec<ChannelValue> {
        let mut out = vec![
            ChannelValue::new("poolheat#setpoint", self.temperature(payload[3])),
            ChannelValue::new("spaheat#setpoint", self.temperature(payload[4])),
        ];
        push_heat_modes(payload[5], &mut out);
        out
    }

    fn decode_schedule(&mut self, payload: &[u8]) -> Vec<ChannelValue> {
        let id = payload[0];
        if !(1..=SCHEDULE_COUNT).contains(&id) {
            debug!(schedule = id, "ignoring schedule outside program slots");
            return Vec::new();
        }

        let schedule = Schedule::parse(payload);
        let slot = &mut self.schedules[usize::from(id - 1)];
        if *slot == Some(schedule) {
            return Vec::new();
        }

        debug!(schedule = id, kind = %schedule.kind, circuit = schedule.circuit, "schedule changed");
        *slot = Some(schedule);
        let mut out = Vec::with_capacity(5);
        schedule.channels(id, &mut out);
        out
    }
}

fn push_heat_modes(byte: u8, out: &mut Vec<ChannelValue>) {
    out.push(ChannelValue::new(
        "poolheat#heatmode",
        ScaledValue::enumerated(HeatMode::from(byte & 0x03)),
    ));
    out.push(ChannelValue::new(
        "spaheat#heatmode",
        ScaledValue::enumerated(HeatMode::from((byte >> 2) & 0x03)),
    ));
}

fn decode_clock(payload: &[u8]) -> Vec<ChannelValue> {
    let (day, month, year) = (payload[3], payload[4], payload[5]);
    vec![
        ChannelValue::new(
            "status#time",
            ScaledValue::Number(minutes_of_day(payload[0], payload[1])),
        ),
        ChannelValue::new(
            "status#date",
            ScaledValue::Text(format!("20{year:02}-{month:02}-{day:02}")),
        ),
    ]
}

fn decode_circuit(payload: &[u8]) -> Vec<ChannelValue> {
    let circuit = payload[0];
    if !(1..=CIRCUIT_COUNT).contains(&circuit) {
        return Vec::new();
    }
    vec![
        ChannelValue::new(
            format!("circuit{circuit}#function"),
            ScaledValue::enumerated(CircuitFunction::from(payload[1])),
        ),
        ChannelValue::new(
            format!("circuit{circuit}#name"),
            ScaledValue::enumerated(CircuitName::from(payload[2])),
        ),
    ]
}

fn decode_version(payload: &[u8]) -> Vec<ChannelValue> {
    vec![ChannelValue::new(
        "status#firmware",
        ScaledValue::Text(format!("{}.{}", payload[1], payload[2])),
    )]
}

impl DeviceDecoder for ControllerDecoder {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::Controller
    }

    fn decode(&mut self, frame: &Frame) -> Result<Vec<ChannelValue>, DecodeError> {
        let command = frame.command();
        let payload = frame.payload().as_ref();

        match command {
            CMD_STATUS => {
                expect_len(command, payload, STATUS_LEN)?;
                Ok(self.decode_status(payload))
            }
            CMD_HEAT => {
                expect_len(command, payload, HEAT_LEN)?;
                Ok(self.decode_heat(payload))
            }
            CMD_CLOCK => {
                expect_len(command, payload, CLOCK_LEN)?;
                Ok(decode_clock(payload))
            }
            CMD_CIRCUIT => {
                expect_len(command, payload, CIRCUIT_LEN)?;
                Ok(decode_circuit(payload))
            }
            CMD_SCHEDULE => {
                expect_len(command, payload, SCHEDULE_LEN)?;
                Ok(self.decode_schedule(payload))
            }
            CMD_VERSION => {
                expect_len(command, payload, VERSION_LEN)?;
                Ok(decode_version(payload))
            }
            CMD_ACK | CMD_VALVES | CMD_LIGHT_GROUPS => Ok(Vec::new()),
            other => {
                debug!(command = other, "controller command not interpreted");
                Ok(Vec::new())
            }
        }
    }

    /// A controller is only online once it has produced a status frame.
    fn confirms_online(&self, command: u8) -> bool {
        command == CMD_STATUS
    }

    fn channel_schema(&self) -> Vec<ChannelSpec> {
        let mut schema = Vec::new();
        for circuit in 1..=CIRCUIT_COUNT {
            schema.push(ChannelSpec::new(format!("circuit{circuit}#switch"), ValueKind::OnOff));
            schema.push(ChannelSpec::new(format!("circuit{circuit}#function"), ValueKind::Enum));
            schema.push(ChannelSpec::new(format!("circuit{circuit}#name"), ValueKind::Enum));
        }
        for group in ["poolheat", "spaheat"] {
            schema.push(ChannelSpec::new(format!("{group}#temperature"), ValueKind::Temperature));
            schema.push(ChannelSpec::new(format!("{group}#setpoint"), ValueKind::Temperature));
            schema.push(ChannelSpec::new(format!("{group}#heatmode"), ValueKind::Enum));
        }
        schema.extend([
            ChannelSpec::new("status#airtemperature", ValueKind::Temperature),
            ChannelSpec::new("status#solartemperature", ValueKind::Temperature),
            ChannelSpec::new("status#unit", ValueKind::Enum),
            ChannelSpec::new("status#time", ValueKind::Number),
            ChannelSpec::new("status#date", ValueKind::Text),
            ChannelSpec::new("status#firmware", ValueKind::Text),
        ]);
        schema.extend(
            STATUS_FLAGS
                .iter()
                .map(|flag| ChannelSpec::new(flag.channel_id, ValueKind::OnOff)),
        );
        for id in 1..=SCHEDULE_COUNT {
            schema.push(ChannelSpec::new(format!("schedule{id}#type"), ValueKind::Enum));
            schema.push(ChannelSpec::new(format!("schedule{id}#circuit"), ValueKind::Number));
            schema.push(ChannelSpec::new(format!("schedule{id}#start"), ValueKind::Number));
            schema.push(ChannelSpec::new(format!("schedule{id}#end"), ValueKind::Number));
            schema.push(ChannelSpec::new(format!("schedule{id}#days"), ValueKind::BitFlags));
        }
        schema
    }
}
