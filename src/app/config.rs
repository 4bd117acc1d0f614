//! LoRaWAN credential configuration.
//!
//! Credentials come from a JSON file so they stay out of the binary:
//!
//! ```json
//! {
//!   "dev_eui": "b509b453fa125879",
//!   "join_eui": "e096b01da5bf494a",
//!   "app_key": "da87ec9c3ef74352492d67082f2ea2e6",
//!   "region": "EU868",
//!   "class": "A"
//! }
//! ```
//!
//! The file is read from `$LORA_MODEM_CONFIG` if set, otherwise from
//! `~/.lora-modem-hal/lorawan.json`. Without a file the well-known sample
//! credentials are used.

use crate::modem::{DeviceClass, Eui, Key, Region};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable overriding the credential file path.
pub const CONFIG_ENV_VAR: &str = "LORA_MODEM_CONFIG";

/// AppKey (LoRaWAN 1.0.x root key, handed to the modem as NwkKey).
///
/// Wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AppKey(Key);

impl AppKey {
    pub fn new(key: Key) -> Self {
        Self(key)
    }

    pub fn expose(&self) -> &Key {
        &self.0
    }
}

impl fmt::Debug for AppKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AppKey(<redacted>)")
    }
}

/// Credential set handed to the modem after every reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LorawanConfig {
    /// Read the DevEUI from the radio instead of `dev_eui`.
    pub use_chip_eui_as_dev_eui: bool,
    pub dev_eui: Eui,
    pub join_eui: Eui,
    pub app_key: AppKey,
    pub region: Region,
    pub class: DeviceClass,
}

impl LorawanConfig {
    /// Well-known sample credentials. Register them on your network server
    /// or replace them with a credential file.
    pub fn sample() -> Self {
        Self {
            use_chip_eui_as_dev_eui: false,
            dev_eui: [0xb5, 0x09, 0xb4, 0x53, 0xfa, 0x12, 0x58, 0x79],
            join_eui: [0xe0, 0x96, 0xb0, 0x1d, 0xa5, 0xbf, 0x49, 0x4a],
            app_key: AppKey::new([
                0xda, 0x87, 0xec, 0x9c, 0x3e, 0xf7, 0x43, 0x52, 0x49, 0x2d, 0x67, 0x08, 0x2f,
                0x2e, 0xa2, 0xe6,
            ]),
            region: Region::default(),
            class: DeviceClass::A,
        }
    }

    /// Parse a JSON credential document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        file.to_config()
    }

    /// Load credentials from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::from_json(&json)?;
        info!("Loaded LoRaWAN credentials from {:?}", path);
        Ok(config)
    }

    /// Load credentials from `$LORA_MODEM_CONFIG`, the default file, or fall
    /// back to [`sample`](Self::sample).
    ///
    /// An explicitly configured file that cannot be loaded is an error.
    pub fn load_or_sample() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load_from(Path::new(&path));
        }

        match default_config_path() {
            Ok(path) if path.is_file() => Self::load_from(&path),
            Ok(path) => {
                debug!("No credential file at {:?}", path);
                warn!("Using sample LoRaWAN credentials");
                Ok(Self::sample())
            }
            Err(e) => {
                debug!("No default credential path: {}", e);
                warn!("Using sample LoRaWAN credentials");
                Ok(Self::sample())
            }
        }
    }
}

/// Get the default credential file path.
///
/// Returns `~/.lora-modem-hal/lorawan.json`
pub fn default_config_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home)
        .join(".lora-modem-hal")
        .join("lorawan.json"))
}

/// On-disk representation. Wiped on drop since it holds the key in hex.
#[derive(Deserialize, Zeroize, ZeroizeOnDrop)]
struct ConfigFile {
    #[serde(default)]
    #[zeroize(skip)]
    use_chip_eui_as_dev_eui: bool,
    #[serde(default)]
    dev_eui: String,
    join_eui: String,
    app_key: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    class: Option<String>,
}

impl ConfigFile {
    fn to_config(&self) -> Result<LorawanConfig, ConfigError> {
        let dev_eui = if self.use_chip_eui_as_dev_eui && self.dev_eui.is_empty() {
            [0; 8]
        } else {
            parse_hex("dev_eui", &self.dev_eui)?
        };

        let region = match &self.region {
            Some(name) => parse_region(name)?,
            None => Region::default(),
        };
        let class = match &self.class {
            Some(name) => parse_class(name)?,
            None => DeviceClass::A,
        };

        Ok(LorawanConfig {
            use_chip_eui_as_dev_eui: self.use_chip_eui_as_dev_eui,
            dev_eui,
            join_eui: parse_hex("join_eui", &self.join_eui)?,
            app_key: AppKey::new(parse_hex("app_key", &self.app_key)?),
            region,
            class,
        })
    }
}

/// Parse a fixed-length hex string. Separators `:`, `-` and spaces are
/// ignored.
pub fn parse_hex<const N: usize>(field: &'static str, text: &str) -> Result<[u8; N], ConfigError> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !matches!(b, b':' | b'-' | b' '))
        .collect();

    if digits.len() != N * 2 {
        return Err(ConfigError::InvalidHex {
            field,
            reason: format!("expected {} hex digits, got {}", N * 2, digits.len()),
        });
    }

    let mut out = [0u8; N];
    for (i, pair) in digits.chunks(2).enumerate() {
        let hi = hex_value(pair[0]);
        let lo = hex_value(pair[1]);
        match (hi, lo) {
            (Some(hi), Some(lo)) => out[i] = (hi << 4) | lo,
            _ => {
                return Err(ConfigError::InvalidHex {
                    field,
                    reason: format!("invalid digit at position {}", i * 2),
                })
            }
        }
    }
    Ok(out)
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Lowercase hex rendering used in logs.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Parse a region name such as `EU868`, `eu_868` or `AS923-GRP2`.
pub fn parse_region(name: &str) -> Result<Region, ConfigError> {
    let normalized: String = name
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .collect::<String>()
        .to_uppercase();

    match normalized.as_str() {
        "EU868" => Ok(Region::Eu868),
        "AS923" | "AS923GRP1" => Ok(Region::As923Grp1),
        "US915" => Ok(Region::Us915),
        "AU915" => Ok(Region::Au915),
        "CN470" => Ok(Region::Cn470),
        "WW2G4" => Ok(Region::Ww2g4),
        "AS923GRP2" => Ok(Region::As923Grp2),
        "AS923GRP3" => Ok(Region::As923Grp3),
        "IN865" => Ok(Region::In865),
        "KR920" => Ok(Region::Kr920),
        "RU864" => Ok(Region::Ru864),
        _ => Err(ConfigError::UnknownRegion(name.to_string())),
    }
}

/// Parse a device class name (`A`, `B`, `C`, optionally prefixed `class`).
pub fn parse_class(name: &str) -> Result<DeviceClass, ConfigError> {
    let trimmed = name.trim().to_uppercase();
    let letter = trimmed
        .strip_prefix("CLASS")
        .map(|s| s.trim_start_matches(['_', ' ']))
        .unwrap_or(trimmed.as_str());
    match letter {
        "A" => Ok(DeviceClass::A),
        "B" => Ok(DeviceClass::B),
        "C" => Ok(DeviceClass::C),
        _ => Err(ConfigError::UnknownClass(name.to_string())),
    }
}

/// Errors that can occur while loading credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The credential file could not be read.
    Io { path: PathBuf, reason: String },
    /// The credential file is not valid JSON for this schema.
    Json(String),
    /// A hex field has the wrong length or contains a non-hex digit.
    InvalidHex { field: &'static str, reason: String },
    /// Unknown region name.
    UnknownRegion(String),
    /// Unknown device class.
    UnknownClass(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "cannot read {:?}: {}", path, reason),
            Self::Json(msg) => write!(f, "invalid credential file: {}", msg),
            Self::InvalidHex { field, reason } => write!(f, "invalid {}: {}", field, reason),
            Self::UnknownRegion(name) => write!(f, "unknown region: {}", name),
            Self::UnknownClass(name) => write!(f, "unknown device class: {}", name),
        }
    }
}

impl std::error::Error for ConfigError {}
