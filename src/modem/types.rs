//! Value types of the modem library API.
//!
//! Raw discriminants match the modem library's C enums so the `lbm` FFI layer
//! can convert without lookup tables.

use std::fmt;

/// 64-bit LoRaWAN extended unique identifier (DevEUI / JoinEUI).
pub type Eui = [u8; 8];

/// 128-bit LoRaWAN root key.
pub type Key = [u8; 16];

/// Maximum LoRaWAN application payload the modem can hand out.
pub const MAX_LORAWAN_PAYLOAD_LENGTH: usize = 255;

/// Return codes of the modem library, excluding `OK`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemError {
    /// Modem not initialized.
    NotInit,
    /// Invalid parameter or state for the command.
    Invalid,
    /// Command cannot be executed now.
    Busy,
    /// Command failed.
    Fail,
    /// Time is not synchronized.
    NoTime,
    /// Unknown stack id.
    InvalidStackId,
    /// No event available.
    NoEvent,
    /// Code not known to this crate.
    Unknown(u8),
}

impl ModemError {
    /// Convert a raw library return code into a `Result`.
    pub fn check(code: u8) -> Result<(), ModemError> {
        match code {
            0x00 => Ok(()),
            0x01 => Err(Self::NotInit),
            0x02 => Err(Self::Invalid),
            0x03 => Err(Self::Busy),
            0x04 => Err(Self::Fail),
            0x05 => Err(Self::NoTime),
            0x06 => Err(Self::InvalidStackId),
            0x07 => Err(Self::NoEvent),
            other => Err(Self::Unknown(other)),
        }
    }

    /// Raw library return code.
    pub fn code(self) -> u8 {
        match self {
            Self::NotInit => 0x01,
            Self::Invalid => 0x02,
            Self::Busy => 0x03,
            Self::Fail => 0x04,
            Self::NoTime => 0x05,
            Self::InvalidStackId => 0x06,
            Self::NoEvent => 0x07,
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInit => write!(f, "SMTC_MODEM_RC_NOT_INIT"),
            Self::Invalid => write!(f, "SMTC_MODEM_RC_INVALID"),
            Self::Busy => write!(f, "SMTC_MODEM_RC_BUSY"),
            Self::Fail => write!(f, "SMTC_MODEM_RC_FAIL"),
            Self::NoTime => write!(f, "SMTC_MODEM_RC_NO_TIME"),
            Self::InvalidStackId => write!(f, "SMTC_MODEM_RC_INVALID_STACK_ID"),
            Self::NoEvent => write!(f, "SMTC_MODEM_RC_NO_EVENT"),
            Self::Unknown(code) => write!(f, "unknown return code {}", code),
        }
    }
}

impl std::error::Error for ModemError {}

/// LoRaWAN regional parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// EU 863-870 MHz
    Eu868,
    /// AS 923 MHz group 1
    As923Grp1,
    /// US 902-928 MHz
    Us915,
    /// Australia 915-928 MHz
    Au915,
    /// China 470-510 MHz
    Cn470,
    /// Worldwide 2.4 GHz
    Ww2g4,
    /// AS 923 MHz group 2
    As923Grp2,
    /// AS 923 MHz group 3
    As923Grp3,
    /// India 865-867 MHz
    In865,
    /// Korea 920-923 MHz
    Kr920,
    /// Russia 864-870 MHz
    Ru864,
}

impl Region {
    /// Raw `smtc_modem_region_t` value.
    pub fn raw(self) -> u8 {
        match self {
            Self::Eu868 => 1,
            Self::As923Grp1 => 2,
            Self::Us915 => 3,
            Self::Au915 => 4,
            Self::Cn470 => 5,
            Self::Ww2g4 => 6,
            Self::As923Grp2 => 7,
            Self::As923Grp3 => 8,
            Self::In865 => 9,
            Self::Kr920 => 10,
            Self::Ru864 => 11,
        }
    }

    /// Name as printed by the modem library.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eu868 => "SMTC_MODEM_REGION_EU_868",
            Self::As923Grp1 => "SMTC_MODEM_REGION_AS_923_GRP1",
            Self::Us915 => "SMTC_MODEM_REGION_US_915",
            Self::Au915 => "SMTC_MODEM_REGION_AU_915",
            Self::Cn470 => "SMTC_MODEM_REGION_CN_470",
            Self::Ww2g4 => "SMTC_MODEM_REGION_WW2G4",
            Self::As923Grp2 => "SMTC_MODEM_REGION_AS_923_GRP2",
            Self::As923Grp3 => "SMTC_MODEM_REGION_AS_923_GRP3",
            Self::In865 => "SMTC_MODEM_REGION_IN_865",
            Self::Kr920 => "SMTC_MODEM_REGION_KR_920",
            Self::Ru864 => "SMTC_MODEM_REGION_RU_864",
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        #[cfg(feature = "region-us915")]
        return Self::Us915;
        #[cfg(feature = "region-au915")]
        return Self::Au915;
        #[cfg(feature = "region-as923")]
        return Self::As923Grp1;
        #[cfg(not(any(
            feature = "region-us915",
            feature = "region-au915",
            feature = "region-as923"
        )))]
        Self::Eu868
    }
}

/// LoRaWAN device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    /// Class A (uplink-initiated receive windows only)
    #[default]
    A,
    /// Class B (beacon-synchronized ping slots)
    B,
    /// Class C (continuous receive)
    C,
}

impl DeviceClass {
    /// Raw `smtc_modem_class_t` value.
    pub fn raw(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }

    /// Name as printed by the modem library.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "SMTC_MODEM_CLASS_A",
            Self::B => "SMTC_MODEM_CLASS_B",
            Self::C => "SMTC_MODEM_CLASS_C",
        }
    }
}

/// Modem library firmware version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl fmt::Display for ModemVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Receive window a downlink arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownlinkWindow {
    Rx1,
    Rx2,
    RxC,
    RxB,
    RxBeacon,
    /// Multicast or other windows, by raw value.
    Other(u8),
}

impl DownlinkWindow {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Rx1,
            1 => Self::Rx2,
            2 => Self::RxC,
            7 => Self::RxB,
            12 => Self::RxBeacon,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Rx1 => 0,
            Self::Rx2 => 1,
            Self::RxC => 2,
            Self::RxB => 7,
            Self::RxBeacon => 12,
            Self::Other(raw) => raw,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rx1 => "SMTC_MODEM_EVENT_DOWNDATA_WINDOW_RX1",
            Self::Rx2 => "SMTC_MODEM_EVENT_DOWNDATA_WINDOW_RX2",
            Self::RxC => "SMTC_MODEM_EVENT_DOWNDATA_WINDOW_RXC",
            Self::RxB => "SMTC_MODEM_EVENT_DOWNDATA_WINDOW_RXB",
            Self::RxBeacon => "SMTC_MODEM_EVENT_DOWNDATA_WINDOW_RXBEACON",
            Self::Other(_) => "SMTC_MODEM_EVENT_DOWNDATA_WINDOW_OTHER",
        }
    }
}

/// Metadata reported alongside a downlink payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownlinkMetadata {
    /// Stack the downlink belongs to.
    pub stack_id: u8,
    /// Receive window.
    pub window: DownlinkWindow,
    /// LoRaWAN port.
    pub fport: u8,
    /// RSSI in dBm + 64.
    pub rssi: i16,
    /// SNR in 0.25 dB steps.
    pub snr: i8,
    /// Downlink frequency.
    pub frequency_hz: u32,
    /// Downlink datarate.
    pub datarate: u8,
    /// Frame pending bit.
    pub fpending: bool,
}

impl DownlinkMetadata {
    /// RSSI in dBm.
    pub fn rssi_dbm(&self) -> i16 {
        self.rssi - 64
    }

    /// SNR in whole dB.
    pub fn snr_db(&self) -> i8 {
        self.snr / 4
    }
}

impl Default for DownlinkMetadata {
    fn default() -> Self {
        Self {
            stack_id: 0,
            window: DownlinkWindow::Rx1,
            fport: 0,
            rssi: 0,
            snr: 0,
            frequency_hz: 0,
            datarate: 0,
            fpending: false,
        }
    }
}

/// Result of a downlink fetch: sizes plus metadata. The payload itself lands
/// in the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DownlinkInfo {
    /// Number of payload bytes written into the buffer.
    pub size: u8,
    /// Downlink metadata.
    pub metadata: DownlinkMetadata,
    /// Downlinks still held by the modem.
    pub remaining: u8,
}

/// ADR profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdrProfile {
    NetworkControlled,
    MobileLongRange,
    MobileLowPower,
}

impl AdrProfile {
    pub fn raw(self) -> u8 {
        match self {
            Self::NetworkControlled => 0,
            Self::MobileLongRange => 1,
            Self::MobileLowPower => 2,
        }
    }
}

/// Class B ping slot periodicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingSlotPeriodicity {
    S1,
    S2,
    S4,
    S8,
    S16,
    S32,
    S64,
    S128,
}

impl PingSlotPeriodicity {
    pub fn raw(self) -> u8 {
        match self {
            Self::S1 => 0,
            Self::S2 => 1,
            Self::S4 => 2,
            Self::S8 => 3,
            Self::S16 => 4,
            Self::S32 => 5,
            Self::S64 => 6,
            Self::S128 => 7,
        }
    }
}

/// Time synchronization service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSyncService {
    /// DeviceTimeReq MAC command.
    MacSync,
    /// Application layer clock sync.
    AlcSync,
}

impl TimeSyncService {
    pub fn raw(self) -> u8 {
        match self {
            Self::MacSync => 0,
            Self::AlcSync => 1,
        }
    }
}
