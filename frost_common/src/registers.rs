//! Holding register layout and fixed-point scaling.
//!
//! | HR | Field          | Scale            | Writable |
//! |----|----------------|------------------|----------|
//! | 0  | inside_temp    | ×10, signed      | no       |
//! | 1  | valve_cmd      | identity         | yes      |
//! | 2  | setpoint       | ×10              | yes      |
//! | 3  | mode           | identity         | yes      |
//! | 4  | outside_temp   | ×10, signed      | no       |
//! | 5  | status         | identity         | no       |
//! | 6  | valve_actual   | identity         | no       |
//! | 7  | supply_temp    | ×10              | no       |
//! | 8  | runtime        | low 16 bits      | no       |
//! | 9  | heater_power   | ×10              | no       |

use crate::consts::REGISTER_COUNT;
use static_assertions::const_assert;

/// Snapshot of the register file.
pub type RegisterFile = [u16; REGISTER_COUNT];

/// Indoor temperature (×10, signed).
pub const HR_INSIDE_TEMP: usize = 0;
/// Valve command [%].
pub const HR_VALVE_CMD: usize = 1;
/// Setpoint (×10).
pub const HR_SETPOINT: usize = 2;
/// Control mode (0 manual, 1 auto).
pub const HR_MODE: usize = 3;
/// Outdoor temperature (×10, signed).
pub const HR_OUTSIDE_TEMP: usize = 4;
/// Process status code.
pub const HR_STATUS: usize = 5;
/// Actual valve position [%].
pub const HR_VALVE_ACTUAL: usize = 6;
/// Supply temperature (×10).
pub const HR_SUPPLY_TEMP: usize = 7;
/// Runtime, low 16 bits.
pub const HR_RUNTIME: usize = 8;
/// Heater power (×10).
pub const HR_HEATER_POWER: usize = 9;

/// Registers a client may write.
pub const WRITABLE_REGISTERS: [usize; 3] = [HR_VALVE_CMD, HR_SETPOINT, HR_MODE];

const_assert!(HR_HEATER_POWER < REGISTER_COUNT);
const_assert!(REGISTER_COUNT <= u16::MAX as usize);

/// Values this close to an integer count as that integer before truncation,
/// so that exact tenths (22.5, 2.3, ...) survive the ×10 round trip.
const SCALE_EPSILON: f64 = 1e-6;

/// Multiply by ten and truncate toward zero.
fn tenths(value: f64) -> f64 {
    let scaled = value * 10.0;
    let nearest = scaled.round();
    if (scaled - nearest).abs() < SCALE_EPSILON {
        nearest
    } else {
        scaled.trunc()
    }
}

/// Encode a signed quantity as ×10 fixed point in 16-bit two's complement.
#[inline]
pub fn encode_tenths_signed(value: f64) -> u16 {
    (tenths(value) as i16) as u16
}

/// Encode a non-negative quantity as ×10 fixed point.
///
/// Negative inputs saturate to 0, values beyond range to `u16::MAX`.
#[inline]
pub fn encode_tenths(value: f64) -> u16 {
    tenths(value) as u16
}

/// Decode an unsigned ×10 fixed-point register.
#[inline]
pub fn decode_tenths(raw: u16) -> f64 {
    raw as f64 / 10.0
}
