//! GPS to UTC conversion.

/// Seconds between the Unix epoch and the GPS epoch (1980-01-06).
pub const GPS_EPOCH_OFFSET_S: u32 = 315_964_800;

/// Leap seconds between GPS and UTC as of 2021-09-15.
pub const LEAP_SECONDS: u32 = 18;

/// Convert GPS seconds to Unix UTC seconds. Wraps at 32 bits like the
/// modem library's own time arithmetic.
pub fn gps_to_utc(gps_time_s: u32) -> u32 {
    gps_time_s
        .wrapping_add(GPS_EPOCH_OFFSET_S)
        .wrapping_sub(LEAP_SECONDS)
}
