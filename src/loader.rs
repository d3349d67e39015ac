// sfpd-align/src/loader.rs
//! Entry point: locate the sfpd volume, validate and read the alignment
//! record, and optionally persist the derived shifts.

use log::{debug, warn};

use crate::device::{BlockDeviceProvider, RawDiskProvider};
use crate::error::{CalibrationError, Result};
use crate::fat::FatVolumes;
use crate::options::ScanOptions;
use crate::reader::{VolumeFileSystem, item_size, read_item};
use crate::record::CalibrationRecord;
use crate::store::{ConfigStore, persist_shift_assignment};
use crate::volume::resolve_volume;

/// Progress of the most recent [`CalibrationLoader::load`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Start,
    PathResolved,
    SizeValidated,
    Loaded,
    Failed,
}

/// Loads the pixel alignment record from the disks of `provider`.
///
/// Nothing is cached between calls: every load scans the disks again.
pub struct CalibrationLoader<P, V> {
    provider: P,
    volumes: V,
    options: ScanOptions,
    state: LoadState,
}

impl<P, V> CalibrationLoader<P, V>
where
    P: BlockDeviceProvider,
    V: VolumeFileSystem,
{
    pub fn new(provider: P, volumes: V, options: ScanOptions) -> Self {
        CalibrationLoader {
            provider,
            volumes,
            options,
            state: LoadState::Start,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn load(&mut self) -> Result<CalibrationRecord> {
        self.state = LoadState::Start;
        match self.run() {
            Ok(record) => {
                self.advance(LoadState::Loaded);
                Ok(record)
            }
            Err(err) => {
                warn!("load: failed in state {:?}: {}", self.state, err);
                self.state = LoadState::Failed;
                Err(err)
            }
        }
    }

    /// Loads the record and writes its shift assignment to `store`.
    /// The store is not touched unless loading succeeds.
    pub fn apply<S: ConfigStore + ?Sized>(&mut self, store: &mut S) -> Result<CalibrationRecord> {
        let record = self.load()?;
        persist_shift_assignment(store, &record.shift_assignment())?;
        Ok(record)
    }

    fn run(&mut self) -> Result<CalibrationRecord> {
        let volume = resolve_volume(&self.provider, &self.options)?;
        self.advance(LoadState::PathResolved);

        let expected = CalibrationRecord::SIZE as u64;
        let actual = item_size(&self.volumes, &volume, &self.options.item_path)?;
        if actual != expected {
            return Err(CalibrationError::Corrupt { expected, actual });
        }
        self.advance(LoadState::SizeValidated);

        let mut buf = [0u8; CalibrationRecord::SIZE];
        read_item(&self.volumes, &volume, &self.options.item_path, &mut buf)?;
        CalibrationRecord::from_bytes(&buf)
    }

    fn advance(&mut self, next: LoadState) {
        debug!("load: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl CalibrationLoader<RawDiskProvider, FatVolumes<RawDiskProvider>> {
    /// Reads raw disks and parses the FAT volume on the sfpd partition.
    pub fn raw_disks(provider: RawDiskProvider, options: ScanOptions) -> Self {
        let volumes = FatVolumes::new(provider.clone(), options.clone());
        CalibrationLoader::new(provider, volumes, options)
    }
}
