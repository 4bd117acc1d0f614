//! Board hooks the modem library's geolocation services call around scans.
//!
//! The scan algorithms themselves live in the modem library; the board only
//! switches the GNSS LNA and reports its clock, regulator and power figures.

use log::debug;
use std::sync::Arc;

/// LR11xx low-frequency clock source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LfClockConfig {
    /// Internal RC oscillator.
    Rc,
    /// External 32.768 kHz crystal.
    #[default]
    Xtal,
    /// External clock on DIO11.
    External,
}

impl LfClockConfig {
    /// Raw `lr11xx_system_lfclk_cfg_t` value.
    pub fn raw(self) -> u8 {
        match self {
            Self::Rc => 0,
            Self::Xtal => 1,
            Self::External => 2,
        }
    }
}

/// LR11xx power regulator mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegMode {
    Ldo,
    #[default]
    DcDc,
}

impl RegMode {
    /// Raw `lr11xx_system_reg_mode_t` value.
    pub fn raw(self) -> u8 {
        match self {
            Self::Ldo => 0,
            Self::DcDc => 1,
        }
    }
}

/// Static LR11xx board configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lr11xxBoardConfig {
    pub lf_clock: LfClockConfig,
    pub reg_mode: RegMode,
    pub tcxo_startup_delay_ms: u32,
}

impl Default for Lr11xxBoardConfig {
    fn default() -> Self {
        Self {
            lf_clock: LfClockConfig::Xtal,
            reg_mode: RegMode::DcDc,
            tcxo_startup_delay_ms: crate::host::DEFAULT_TCXO_STARTUP_DELAY_MS,
        }
    }
}

/// Instantaneous GNSS power consumption, used by the modem library to
/// account scan energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnssPowerConsumption {
    pub board_voltage_mv: u16,
    pub init_ua: u16,
    pub phase1_gps_capture_ua: u16,
    pub phase1_gps_process_ua: u16,
    pub multiscan_gps_capture_ua: u16,
    pub multiscan_gps_process_ua: u16,
    pub phase1_beidou_capture_ua: u16,
    pub phase1_beidou_process_ua: u16,
    pub multiscan_beidou_capture_ua: u16,
    pub multiscan_beidou_process_ua: u16,
    pub sleep_32k_ua: u16,
    pub demod_sleep_32m_ua: u16,
}

impl GnssPowerConsumption {
    /// EVK in DC-DC mode with a 32 kHz crystal and a 32 MHz TCXO.
    pub const EVK_DCDC: Self = Self {
        board_voltage_mv: 3300,
        init_ua: 3150,
        phase1_gps_capture_ua: 11900,
        phase1_gps_process_ua: 3340,
        multiscan_gps_capture_ua: 10700,
        multiscan_gps_process_ua: 4180,
        phase1_beidou_capture_ua: 13500,
        phase1_beidou_process_ua: 3190,
        multiscan_beidou_capture_ua: 12600,
        multiscan_beidou_process_ua: 3430,
        sleep_32k_ua: 1210,
        demod_sleep_32m_ua: 2530,
    };
}

/// GNSS low-noise amplifier enable line.
pub trait LnaSwitch: Send + Sync {
    fn set_lna(&self, on: bool);
}

/// Geolocation board hooks for an LR11xx board.
pub struct GeolocationBsp {
    lna: Arc<dyn LnaSwitch>,
    config: Lr11xxBoardConfig,
}

impl GeolocationBsp {
    pub fn new(lna: Arc<dyn LnaSwitch>, config: Lr11xxBoardConfig) -> Self {
        Self { lna, config }
    }

    pub fn gnss_prescan_actions(&self) {
        debug!("GNSS prescan: LNA on");
        self.lna.set_lna(true);
    }

    pub fn gnss_postscan_actions(&self) {
        debug!("GNSS postscan: LNA off");
        self.lna.set_lna(false);
    }

    pub fn wifi_prescan_actions(&self) {}

    pub fn wifi_postscan_actions(&self) {}

    pub fn lf_clock_config(&self) -> LfClockConfig {
        self.config.lf_clock
    }

    pub fn reg_mode(&self) -> RegMode {
        self.config.reg_mode
    }

    pub fn config(&self) -> &Lr11xxBoardConfig {
        &self.config
    }

    pub fn gnss_consumption(&self) -> GnssPowerConsumption {
        GnssPowerConsumption::EVK_DCDC
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLna(Mutex<Vec<bool>>);

    impl LnaSwitch for RecordingLna {
        fn set_lna(&self, on: bool) {
            self.0.lock().unwrap().push(on);
        }
    }

    #[test]
    fn test_gnss_scan_toggles_lna() {
        let lna = Arc::new(RecordingLna::default());
        let bsp = GeolocationBsp::new(lna.clone(), Lr11xxBoardConfig::default());
        bsp.gnss_prescan_actions();
        bsp.wifi_prescan_actions();
        bsp.wifi_postscan_actions();
        bsp.gnss_postscan_actions();
        assert_eq!(*lna.0.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_board_config_passthrough() {
        let config = Lr11xxBoardConfig {
            lf_clock: LfClockConfig::Rc,
            reg_mode: RegMode::Ldo,
            tcxo_startup_delay_ms: 10,
        };
        let bsp = GeolocationBsp::new(Arc::new(RecordingLna::default()), config);
        assert_eq!(bsp.lf_clock_config().raw(), 0);
        assert_eq!(bsp.reg_mode().raw(), 0);
    }

    #[test]
    fn test_evk_consumption_table() {
        let bsp = GeolocationBsp::new(
            Arc::new(RecordingLna::default()),
            Lr11xxBoardConfig::default(),
        );
        let table = bsp.gnss_consumption();
        assert_eq!(table.board_voltage_mv, 3300);
        assert_eq!(table.init_ua, 3150);
        assert_eq!(table.phase1_beidou_capture_ua, 13500);
        assert_eq!(table.demod_sleep_32m_ua, 2530);
    }
}
