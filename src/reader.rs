// sfpd-align/src/reader.rs
//! Two-phase reads of fixed-size items from a located volume.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::{CalibrationError, Result};
use crate::volume::VolumeLocation;

/// File access on located volumes. Each call opens the item afresh and
/// releases it before returning.
pub trait VolumeFileSystem {
    /// End-of-file offset of `item_path`, without reading its contents.
    fn item_len(&self, volume: &VolumeLocation, item_path: &str) -> io::Result<u64>;

    /// Fills `buf` from the start of `item_path`.
    fn read_item(&self, volume: &VolumeLocation, item_path: &str, buf: &mut [u8])
    -> io::Result<()>;
}

/// Size of an item as stored on the volume.
pub fn item_size<V: VolumeFileSystem + ?Sized>(
    volumes: &V,
    volume: &VolumeLocation,
    item_path: &str,
) -> Result<u64> {
    if item_path.is_empty() {
        return Err(CalibrationError::InvalidArgument("item path is empty"));
    }
    let size = volumes.item_len(volume, item_path)?;
    debug!("item_size: {}{} is {} bytes", volume, item_path, size);
    Ok(size)
}

/// Reads an item whose size must equal `buf.len()` exactly.
///
/// The size is checked before any content is read; a mismatch is reported as
/// corruption and `buf` is left untouched.
pub fn read_item<V: VolumeFileSystem + ?Sized>(
    volumes: &V,
    volume: &VolumeLocation,
    item_path: &str,
    buf: &mut [u8],
) -> Result<()> {
    if buf.is_empty() {
        return Err(CalibrationError::InvalidArgument("read buffer is empty"));
    }
    let actual = item_size(volumes, volume, item_path)?;
    let expected = buf.len() as u64;
    if actual != expected {
        return Err(CalibrationError::Corrupt { expected, actual });
    }
    volumes.read_item(volume, item_path, buf)?;
    Ok(())
}

/// Volumes that are already mounted somewhere on the host.
pub struct DirectoryVolumes<F> {
    root_of: F,
}

impl<F: Fn(&VolumeLocation) -> PathBuf> DirectoryVolumes<F> {
    /// `root_of` maps a located volume to the directory it is mounted at.
    pub fn new(root_of: F) -> Self {
        DirectoryVolumes { root_of }
    }

    pub fn item_path(&self, volume: &VolumeLocation, item_path: &str) -> PathBuf {
        let mut path = (self.root_of)(volume);
        for component in item_path.split(['/', '\\']).filter(|c| !c.is_empty()) {
            path.push(component);
        }
        path
    }
}

#[cfg(windows)]
impl DirectoryVolumes<fn(&VolumeLocation) -> PathBuf> {
    /// Reaches the partition through the `\\?\GLOBALROOT` namespace.
    pub fn global_root() -> Self {
        fn root_of(volume: &VolumeLocation) -> PathBuf {
            PathBuf::from(format!(r"\\?\GLOBALROOT{}", volume.volume_path()))
        }
        Self::new(root_of)
    }
}

impl<F: Fn(&VolumeLocation) -> PathBuf> VolumeFileSystem for DirectoryVolumes<F> {
    fn item_len(&self, volume: &VolumeLocation, item_path: &str) -> io::Result<u64> {
        let mut file = open_regular_file(&self.item_path(volume, item_path))?;
        file.seek(SeekFrom::End(0))
    }

    fn read_item(
        &self,
        volume: &VolumeLocation,
        item_path: &str,
        buf: &mut [u8],
    ) -> io::Result<()> {
        let mut file = open_regular_file(&self.item_path(volume, item_path))?;
        file.read_exact(buf)
    }
}

fn open_regular_file(path: &Path) -> io::Result<File> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not a regular file", path.display()),
        ));
    }
    Ok(file)
}
