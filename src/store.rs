// sfpd-align/src/store.rs
//! Where the derived panel shifts end up.

use std::{
    collections::BTreeMap,
    fs,
    io,
    path::PathBuf,
};

use log::{debug, info};

use crate::constants::{
    HEAT_LEFT_SHIFT, HEAT_RIGHT_SHIFT, REGISTRY_PARAMETER_HEAT,
    REGISTRY_PARAMETER_VENDOR_SPECIFIC,
};
use crate::record::ShiftAssignment;

/// A hierarchical store of named binary values.
pub trait ConfigStore {
    /// Creates the keys along `key_path` as needed and sets `value_name`,
    /// replacing any previous data.
    fn write_binary(&mut self, key_path: &[&str], value_name: &str, data: &[u8])
    -> io::Result<()>;
}

/// Values kept in memory, keyed by `(key path, value name)`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStore {
    values: BTreeMap<(Vec<String>, String), Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key_path: &[&str], value_name: &str) -> Option<&[u8]> {
        let key: (Vec<String>, String) = (
            key_path.iter().map(|k| k.to_string()).collect(),
            value_name.to_string(),
        );
        self.values.get(&key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigStore for MemoryStore {
    fn write_binary(
        &mut self,
        key_path: &[&str],
        value_name: &str,
        data: &[u8],
    ) -> io::Result<()> {
        let key = (
            key_path.iter().map(|k| k.to_string()).collect(),
            value_name.to_string(),
        );
        self.values.insert(key, data.to_vec());
        Ok(())
    }
}

/// One directory per key and one file per value, below `root`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    pub fn value_path(&self, key_path: &[&str], value_name: &str) -> PathBuf {
        let mut path = self.root.clone();
        path.extend(key_path);
        path.push(value_name);
        path
    }

    pub fn read_binary(&self, key_path: &[&str], value_name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.value_path(key_path, value_name))
    }
}

impl ConfigStore for DirectoryStore {
    fn write_binary(
        &mut self,
        key_path: &[&str],
        value_name: &str,
        data: &[u8],
    ) -> io::Result<()> {
        let path = self.value_path(key_path, value_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;
        debug!("write_binary: {} bytes to {}", data.len(), path.display());
        Ok(())
    }
}

/// Key under which the shifts are stored.
pub const SHIFT_KEY_PATH: [&str; 2] = [REGISTRY_PARAMETER_HEAT, REGISTRY_PARAMETER_VENDOR_SPECIFIC];

/// Writes each present shift as a 4-byte little-endian value. Absent sides
/// are left alone; writing the same assignment twice gives the same store.
pub fn persist_shift_assignment<S: ConfigStore + ?Sized>(
    store: &mut S,
    assignment: &ShiftAssignment,
) -> io::Result<()> {
    for (value_name, shift) in [
        (HEAT_LEFT_SHIFT, assignment.left),
        (HEAT_RIGHT_SHIFT, assignment.right),
    ] {
        if let Some(shift) = shift {
            store.write_binary(&SHIFT_KEY_PATH, value_name, &shift.to_le_bytes())?;
            info!("persist_shift_assignment: {} = {}", value_name, shift);
        }
    }
    Ok(())
}
