//! Register bridge: `ProcessState` ⇄ holding registers.
//!
//! Reads are a pure scale/truncate of the state. Writes touch only the three
//! writable slots and drop out-of-range values per field without reporting
//! them. The protocol has no channel for a partial rejection.
//!
//! A client write reaches the state slot by slot, so fields it did not write
//! keep their full precision instead of being re-read from their ×10 encoding.

use frost_common::consts::{SETPOINT_RAW_MAX, VALVE_MAX};
use frost_common::process::{ControlMode, ProcessState};
use frost_common::registers::{
    HR_HEATER_POWER, HR_INSIDE_TEMP, HR_MODE, HR_OUTSIDE_TEMP, HR_RUNTIME, HR_SETPOINT,
    HR_STATUS, HR_SUPPLY_TEMP, HR_VALVE_ACTUAL, HR_VALVE_CMD, RegisterFile, WRITABLE_REGISTERS,
    decode_tenths, encode_tenths, encode_tenths_signed,
};

/// Publish the state as a register file.
pub fn to_registers(state: &ProcessState) -> RegisterFile {
    let mut regs = RegisterFile::default();
    regs[HR_INSIDE_TEMP] = encode_tenths_signed(state.inside_temp);
    regs[HR_VALVE_CMD] = state.valve_cmd as u16;
    regs[HR_SETPOINT] = encode_tenths(state.setpoint);
    regs[HR_MODE] = state.mode.code();
    regs[HR_OUTSIDE_TEMP] = encode_tenths_signed(state.outside_temp);
    regs[HR_STATUS] = state.status.code();
    regs[HR_VALVE_ACTUAL] = state.valve_actual as u16;
    regs[HR_SUPPLY_TEMP] = encode_tenths(state.supply_temp);
    regs[HR_RUNTIME] = (state.runtime & 0xFFFF) as u16;
    regs[HR_HEATER_POWER] = encode_tenths(state.heater_power);
    regs
}

/// Apply one written register to the state.
///
/// - HR1 `valve_cmd` accepted iff ≤ 100
/// - HR2 `setpoint` accepted iff raw ≤ 400 (40.0 °C)
/// - HR3 `mode` accepted iff raw ∈ {0, 1}
///
/// Read-only and out-of-range indices are ignored.
pub fn write_register(state: &mut ProcessState, index: usize, raw: u16) {
    match index {
        HR_VALVE_CMD if raw <= VALVE_MAX as u16 => state.valve_cmd = raw as u8,
        HR_SETPOINT if raw <= SETPOINT_RAW_MAX => state.setpoint = decode_tenths(raw),
        HR_MODE => {
            if let Some(mode) = ControlMode::from_raw(raw) {
                state.mode = mode;
            }
        }
        _ => {}
    }
}

/// Apply a block of registers written from `start` onwards.
pub fn write_registers(state: &mut ProcessState, start: usize, values: &[u16]) {
    for (offset, raw) in values.iter().enumerate() {
        write_register(state, start + offset, *raw);
    }
}

/// Apply the writable slots of a whole register file to the state.
pub fn from_registers(state: &mut ProcessState, incoming: &RegisterFile) {
    for index in WRITABLE_REGISTERS {
        write_register(state, index, incoming[index]);
    }
}
