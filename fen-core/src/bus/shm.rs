//! POSIX shared-memory mapping for the bus.
//!
//! The bus lives at `/dev/shm/<name>` so the strategy process can map the
//! same bytes. The gateway creates (and on exit unlinks) the object; tools
//! and tests attach without resetting.

use std::fs::OpenOptions;
use std::mem::size_of;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use memmap2::MmapMut;
use tracing::info;

use crate::bus::layout::BusLayout;
use crate::config::constants::SHM_NAME;

/// A mapped bus region. Creator instances unlink the backing object on
/// drop; attached instances leave it alone.
pub struct Bus {
    map: MmapMut,
    path: PathBuf,
    owns: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from(format!("/dev/shm/{}", SHM_NAME))
}

impl Bus {
    /// Create (or reuse) the gateway's bus object and map it read/write.
    /// The caller is expected to `reset()` the layout before use.
    pub fn create() -> Result<Self> {
        Self::create_at(default_path())
    }

    /// Create at an explicit path (tests map into a tempdir).
    pub fn create_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .with_context(|| format!("shm: cannot open {}", path.display()))?;
        file.set_len(size_of::<BusLayout>() as u64)
            .context("shm: cannot size bus object")?;

        let map = unsafe { MmapMut::map_mut(&file) }.context("shm: mmap failed")?;
        Self::verify(&map)?;

        info!(
            "shm: mapped {} bytes at {} (creator)",
            map.len(),
            path.display()
        );
        Ok(Self {
            map,
            path,
            owns: true,
        })
    }

    /// Attach to an existing bus without resetting it (dump tool, tests).
    pub fn attach() -> Result<Self> {
        Self::attach_at(default_path())
    }

    pub fn attach_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("shm: cannot open {}", path.display()))?;

        let map = unsafe { MmapMut::map_mut(&file) }.context("shm: mmap failed")?;
        Self::verify(&map)?;

        Ok(Self {
            map,
            path,
            owns: false,
        })
    }

    fn verify(map: &MmapMut) -> Result<()> {
        if map.len() < size_of::<BusLayout>() {
            bail!(
                "shm: object is {} bytes, bus needs {}",
                map.len(),
                size_of::<BusLayout>()
            );
        }
        let addr = map.as_ptr() as usize;
        if addr % 64 != 0 {
            bail!("shm: mapping not cache-line aligned (addr {:#x})", addr);
        }
        Ok(())
    }

    /// The mapped layout. Valid for the lifetime of the `Bus`.
    #[inline(always)]
    pub fn layout(&self) -> &BusLayout {
        // SAFETY: size and alignment verified at map time; BusLayout is
        // valid for any byte content (atomics + Copy frames).
        unsafe { &*(self.map.as_ptr() as *const BusLayout) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Bus {
    fn drop(&mut self) {
        if self.owns {
            self.layout()
                .account
                .gateway_alive
                .store(false, std::sync::atomic::Ordering::Release);
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("shm: unlink {} failed: {}", self.path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_reset_attach_share_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fen_bus_test");

        let bus = Bus::create_at(&path).unwrap();
        bus.layout().reset();
        bus.layout().account.set_usdt_balance(1234.5);

        let other = Bus::attach_at(&path).unwrap();
        assert_eq!(other.layout().account.usdt_balance(), 1234.5);
    }

    #[test]
    fn creator_unlinks_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fen_bus_unlink");
        {
            let _bus = Bus::create_at(&path).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn attach_does_not_unlink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fen_bus_keep");
        let bus = Bus::create_at(&path).unwrap();
        {
            let _peer = Bus::attach_at(&path).unwrap();
        }
        assert!(path.exists());
        drop(bus);
    }

    #[test]
    fn attach_to_missing_object_fails() {
        assert!(Bus::attach_at("/dev/shm/fen_definitely_missing_bus").is_err());
    }
}
