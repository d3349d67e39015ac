// sfpd-align/src/layout.rs
//! Partition layout queries with a growing result buffer.

use std::{fmt, io};

use log::debug;
use uuid::Uuid;

use crate::error::{CalibrationError, Result};
use crate::gpt::GptPartitionName;

/// Partitioning scheme reported for a disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionStyle {
    Mbr,
    Gpt,
    /// No recognizable partition table.
    Raw,
}

/// Scheme-specific part of a partition entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionDetail {
    Gpt {
        partition_type: Uuid,
        partition_id: Uuid,
        attributes: u64,
        name: GptPartitionName,
    },
    Mbr {
        partition_type: u8,
        boot_indicator: bool,
    },
}

/// One partition as reported by a layout query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// 1-based, stable within the table.
    pub partition_number: u32,
    pub starting_offset: u64,
    pub length: u64,
    pub detail: PartitionDetail,
}

impl PartitionInfo {
    /// The fixed-width GPT name field, if this is a GPT entry.
    pub fn gpt_name(&self) -> Option<&GptPartitionName> {
        match &self.detail {
            PartitionDetail::Gpt { name, .. } => Some(name),
            PartitionDetail::Mbr { .. } => None,
        }
    }
}

/// Snapshot of a disk's partition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveLayout {
    pub style: PartitionStyle,
    pub partitions: Vec<PartitionInfo>,
}

impl DriveLayout {
    pub fn raw() -> Self {
        DriveLayout {
            style: PartitionStyle::Raw,
            partitions: Vec::new(),
        }
    }

    pub fn partition(&self, partition_number: u32) -> Option<&PartitionInfo> {
        self.partitions
            .iter()
            .find(|info| info.partition_number == partition_number)
    }
}

/// Outcome of a single layout query that did not produce a layout.
#[derive(Debug)]
pub enum LayoutQueryError {
    /// The table holds more entries than the request made room for.
    BufferTooSmall { required: usize },
    /// The backend could not allocate the request.
    InsufficientResources,
    Io(io::Error),
}

impl LayoutQueryError {
    /// Whether a larger request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LayoutQueryError::BufferTooSmall { .. } | LayoutQueryError::InsufficientResources
        )
    }
}

impl fmt::Display for LayoutQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutQueryError::BufferTooSmall { required } => {
                write!(f, "layout buffer too small, {} entries required", required)
            }
            LayoutQueryError::InsufficientResources => write!(f, "insufficient resources"),
            LayoutQueryError::Io(err) => write!(f, "{}", err),
        }
    }
}

impl From<io::Error> for LayoutQueryError {
    fn from(err: io::Error) -> Self {
        LayoutQueryError::Io(err)
    }
}

/// A target that can report its partition table.
pub trait DriveLayoutQuery {
    /// Returns the layout if it fits in `capacity` entries.
    fn query_drive_layout(
        &mut self,
        capacity: usize,
    ) -> std::result::Result<DriveLayout, LayoutQueryError>;
}

/// Queries the layout, doubling the entry capacity on every retryable
/// outcome as long as the current guess has not passed `max_guess`.
pub fn fetch_drive_layout<D: DriveLayoutQuery + ?Sized>(
    device: &mut D,
    initial_guess: usize,
    max_guess: usize,
) -> Result<DriveLayout> {
    if initial_guess == 0 {
        return Err(CalibrationError::InvalidArgument("partition count guess is zero"));
    }

    let mut guess = initial_guess;
    loop {
        match device.query_drive_layout(guess) {
            Ok(layout) => {
                debug!(
                    "fetch_drive_layout: {:?} table with {} partitions (capacity {})",
                    layout.style,
                    layout.partitions.len(),
                    guess
                );
                return Ok(layout);
            }
            Err(err) if err.is_retryable() && guess <= max_guess => {
                debug!("fetch_drive_layout: {} at capacity {}, doubling", err, guess);
                guess *= 2;
            }
            Err(err) if err.is_retryable() => {
                return Err(CalibrationError::ResourceExhausted(format!(
                    "partition layout does not fit in {} entries: {}",
                    guess, err
                )));
            }
            Err(LayoutQueryError::Io(err)) => return Err(err.into()),
            Err(err) => return Err(CalibrationError::Io(io::Error::other(err.to_string()))),
        }
    }
}
