use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::error::ParseAddressError;

/// Bus address of the controller acting as bus master.
pub const BUS_MASTER: u8 = 0x00;

/// Destination used by the controller for broadcast status frames.
pub const BROADCAST: u8 = 0x0F;

const PUMP_SOURCES: std::ops::RangeInclusive<u8> = 0x60..=0x6F;
const CHEM_SOURCES: std::ops::RangeInclusive<u8> = 0x90..=0x9F;

const PUMP_COMMANDS: [u8; 4] = [0x01, 0x04, 0x06, 0x07];
const CHEM_STATUS: u8 = 0x12;
const CONTROLLER_COMMANDS: [u8; 9] = [0x01, 0x02, 0x05, 0x08, 0x0B, 0x11, 0x1D, 0x27, 0xFC];

/// Category of physical device; determines payload layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceFamily {
    Controller,
    Pump,
    ChemController,
    ChlorineGenerator,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 4] = [
        DeviceFamily::Controller,
        DeviceFamily::Pump,
        DeviceFamily::ChemController,
        DeviceFamily::ChlorineGenerator,
    ];

    /// Family implied by a Standard frame's source address and command.
    ///
    /// `None` means the frame is not a status frame any decoder handles.
    pub fn implied_by(source: u8, command: u8) -> Option<Self> {
        if PUMP_SOURCES.contains(&source) {
            return PUMP_COMMANDS.contains(&command).then_some(Self::Pump);
        }
        if CHEM_SOURCES.contains(&source) {
            return (command == CHEM_STATUS).then_some(Self::ChemController);
        }
        CONTROLLER_COMMANDS
            .contains(&command)
            .then_some(Self::Controller)
    }
}

impl FromStr for DeviceFamily {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "controller" => Ok(Self::Controller),
            "pump" => Ok(Self::Pump),
            "chem-controller" | "chem" => Ok(Self::ChemController),
            "chlorine-generator" | "chlorinator" => Ok(Self::ChlorineGenerator),
            _ => Err(ParseAddressError {
                input: s.to_string(),
                reason: "unknown device family",
            }),
        }
    }
}

/// Registry key: one configured device on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceAddress {
    #[serde(rename = "address")]
    pub bus_address: u8,
    pub family: DeviceFamily,
}

impl DeviceAddress {
    pub const fn new(family: DeviceFamily, bus_address: u8) -> Self {
        Self {
            bus_address,
            family,
        }
    }

    /// Whether the address can hold a registered device.
    pub fn is_assignable(&self) -> bool {
        self.bus_address != BUS_MASTER && self.bus_address != BROADCAST
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#04x}", self.family, self.bus_address)
    }
}

/// Parses `family@address`, with the address in decimal or `0x` hex.
impl FromStr for DeviceAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ParseAddressError {
            input: s.to_string(),
            reason,
        };

        let (family, address) = s.split_once('@').ok_or_else(|| invalid("expected family@address"))?;
        let family = family.parse::<DeviceFamily>().map_err(|_| invalid("unknown device family"))?;

        let address = address.trim();
        let bus_address = match address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
        {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => address.parse::<u8>(),
        }
        .map_err(|_| invalid("address must be 0..=255"))?;

        Ok(Self::new(family, bus_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implied_family_by_source_range() {
        assert_eq!(DeviceFamily::implied_by(0x10, 0x02), Some(DeviceFamily::Controller));
        assert_eq!(DeviceFamily::implied_by(0x60, 0x07), Some(DeviceFamily::Pump));
        assert_eq!(DeviceFamily::implied_by(0x6F, 0x01), Some(DeviceFamily::Pump));
        assert_eq!(
            DeviceFamily::implied_by(0x90, 0x12),
            Some(DeviceFamily::ChemController)
        );
        assert_eq!(DeviceFamily::implied_by(0x10, 0x01), Some(DeviceFamily::Controller));
    }

    #[test]
    fn unhandled_commands_imply_nothing() {
        assert_eq!(DeviceFamily::implied_by(0x60, 0x02), None);
        assert_eq!(DeviceFamily::implied_by(0x90, 0x13), None);
        assert_eq!(DeviceFamily::implied_by(0x10, 0x86), None);
    }

    #[test]
    fn parses_family_at_address() {
        assert_eq!(
            "pump@0x60".parse::<DeviceAddress>().unwrap(),
            DeviceAddress::new(DeviceFamily::Pump, 0x60)
        );
        assert_eq!(
            "chlorine-generator@80".parse::<DeviceAddress>().unwrap(),
            DeviceAddress::new(DeviceFamily::ChlorineGenerator, 0x50)
        );
        assert!("pump".parse::<DeviceAddress>().is_err());
        assert!("heater@0x10".parse::<DeviceAddress>().is_err());
        assert!("pump@0x160".parse::<DeviceAddress>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let address = DeviceAddress::new(DeviceFamily::ChemController, 0x90);
        assert_eq!(address.to_string(), "chem-controller@0x90");
        assert_eq!(address.to_string().parse::<DeviceAddress>().unwrap(), address);
    }

    #[test]
    fn master_and_broadcast_are_not_assignable() {
        assert!(!DeviceAddress::new(DeviceFamily::Controller, BUS_MASTER).is_assignable());
        assert!(!DeviceAddress::new(DeviceFamily::Controller, BROADCAST).is_assignable());
        assert!(DeviceAddress::new(DeviceFamily::Controller, 0x10).is_assignable());
    }
}
