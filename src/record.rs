// sfpd-align/src/record.rs
//! The display pixel alignment record and the shifts derived from it.

use log::warn;

use crate::error::{CalibrationError, Result};

/// Which side of the device a display panel sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelSide {
    #[default]
    Unknown,
    Left,
    Right,
    /// A value outside the known range, kept so the record round-trips.
    Unrecognized(u32),
}

impl PanelSide {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => PanelSide::Unknown,
            1 => PanelSide::Left,
            2 => PanelSide::Right,
            other => PanelSide::Unrecognized(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            PanelSide::Unknown => 0,
            PanelSide::Left => 1,
            PanelSide::Right => 2,
            PanelSide::Unrecognized(raw) => raw,
        }
    }
}

/// Fixed 24-byte little-endian record, no header or version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalibrationRecord {
    pub reserved0: u32,
    pub reserved1: u32,
    pub panel0_side: PanelSide,
    pub panel1_side: PanelSide,
    pub panel0_shift: u32,
    pub panel1_shift: u32,
}

impl CalibrationRecord {
    pub const SIZE: usize = 24;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: &[u8; Self::SIZE] =
            bytes.try_into().map_err(|_| CalibrationError::Corrupt {
                expected: Self::SIZE as u64,
                actual: bytes.len() as u64,
            })?;
        let field = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };

        Ok(CalibrationRecord {
            reserved0: field(0),
            reserved1: field(1),
            panel0_side: PanelSide::from_raw(field(2)),
            panel1_side: PanelSide::from_raw(field(3)),
            panel0_shift: field(4),
            panel1_shift: field(5),
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let fields = [
            self.reserved0,
            self.reserved1,
            self.panel0_side.to_raw(),
            self.panel1_side.to_raw(),
            self.panel0_shift,
            self.panel1_shift,
        ];
        let mut bytes = [0u8; Self::SIZE];
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Per-side shifts, applying panel 0 and then panel 1.
    ///
    /// When both panels claim the same side, panel 1 overwrites panel 0.
    /// Panels on an unknown side contribute nothing.
    pub fn shift_assignment(&self) -> ShiftAssignment {
        let mut assignment = ShiftAssignment::default();
        for (side, shift) in [
            (self.panel0_side, self.panel0_shift),
            (self.panel1_side, self.panel1_shift),
        ] {
            let slot = match side {
                PanelSide::Left => &mut assignment.left,
                PanelSide::Right => &mut assignment.right,
                PanelSide::Unknown | PanelSide::Unrecognized(_) => continue,
            };
            if let Some(previous) = slot.replace(shift) {
                warn!(
                    "shift_assignment: both panels claim the {:?} side, {} replaces {}",
                    side, shift, previous
                );
            }
        }
        assignment
    }
}

/// Pixel shift for each side, if some panel declared that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftAssignment {
    pub left: Option<u32>,
    pub right: Option<u32>,
}
