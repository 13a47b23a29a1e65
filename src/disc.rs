//! Disc interface handed to the FAT layer.
//!
//! The filesystem sees six synchronous calls that report success as a bool.
//! [`DiscInterface`] is that contract for Rust callers; the `_EZFO_*`
//! functions and [`EZFO_DISC_INTERFACE`] expose the same calls over the C ABI
//! on top of a single global driver instance.

use core::ffi::{c_ulong, c_void};

use bitflags::bitflags;
use log::warn;
use spin::Mutex;

use crate::omega::{MmioPort, OmegaConfig, OmegaHost, OmegaPort, sector_bytes};

pub const DEVICE_TYPE_EZFO: u32 = u32::from_le_bytes(*b"EZFO");

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DiscFeatures: u32 {
        const CAN_READ = 0x0000_0001;
        const CAN_WRITE = 0x0000_0002;
        const SLOT_GBA = 0x0000_0010;
        const SLOT_NDS = 0x0000_0020;
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "nds")] {
        const SLOT: DiscFeatures = DiscFeatures::SLOT_NDS;
    } else {
        const SLOT: DiscFeatures = DiscFeatures::SLOT_GBA;
    }
}

impl DiscFeatures {
    pub const fn platform() -> Self {
        Self::CAN_READ.union(Self::CAN_WRITE).union(SLOT)
    }
}

pub trait DiscInterface {
    fn start_up(&mut self) -> bool;
    fn is_inserted(&mut self) -> bool;
    fn read_sectors(&mut self, sector: u32, count: u32, buffer: &mut [u8]) -> bool;
    fn write_sectors(&mut self, sector: u32, count: u32, buffer: &[u8]) -> bool;
    fn clear_status(&mut self) -> bool;
    fn shutdown(&mut self) -> bool;
}

impl<P: OmegaPort> DiscInterface for OmegaHost<P> {
    fn start_up(&mut self) -> bool {
        match OmegaHost::start_up(self) {
            Ok(()) => true,
            Err(e) => {
                warn!("start_up failed: {}", e);
                false
            }
        }
    }

    fn is_inserted(&mut self) -> bool {
        OmegaHost::is_inserted(self)
    }

    fn read_sectors(&mut self, sector: u32, count: u32, buffer: &mut [u8]) -> bool {
        match OmegaHost::read_sectors(self, sector, count, buffer) {
            Ok(()) => true,
            Err(e) => {
                warn!("read_sectors({:#x}, {}) failed: {}", sector, count, e);
                false
            }
        }
    }

    fn write_sectors(&mut self, sector: u32, count: u32, buffer: &[u8]) -> bool {
        match OmegaHost::write_sectors(self, sector, count, buffer) {
            Ok(()) => true,
            Err(e) => {
                warn!("write_sectors({:#x}, {}) failed: {}", sector, count, e);
                false
            }
        }
    }

    fn clear_status(&mut self) -> bool {
        OmegaHost::clear_status(self).is_ok()
    }

    fn shutdown(&mut self) -> bool {
        OmegaHost::shutdown(self).is_ok()
    }
}

static OMEGA: Mutex<Option<OmegaHost<MmioPort>>> = Mutex::new(None);

fn with_host<R>(f: impl FnOnce(&mut OmegaHost<MmioPort>) -> R) -> R {
    let mut guard = OMEGA.lock();
    let host = guard.get_or_insert_with(|| {
        // SAFETY: the global driver is the only owner of the command window
        OmegaHost::new(unsafe { MmioPort::new() }, OmegaConfig::platform())
    });
    f(host)
}

#[unsafe(export_name = "_EZFO_startUp")]
pub extern "C" fn ezfo_start_up() -> bool {
    with_host(|host| DiscInterface::start_up(host))
}

#[unsafe(export_name = "_EZFO_isInserted")]
pub extern "C" fn ezfo_is_inserted() -> bool {
    with_host(|host| DiscInterface::is_inserted(host))
}

/// # Safety
///
/// `buffer` must be valid for writes of `count * 512` bytes.
#[unsafe(export_name = "_EZFO_readSectors")]
pub unsafe extern "C" fn ezfo_read_sectors(sector: u32, count: u32, buffer: *mut c_void) -> bool {
    let Ok(len) = sector_bytes(count) else {
        return false;
    };
    if buffer.is_null() {
        return false;
    }
    let buffer = unsafe { core::slice::from_raw_parts_mut(buffer as *mut u8, len) };
    with_host(|host| DiscInterface::read_sectors(host, sector, count, buffer))
}

/// # Safety
///
/// `buffer` must be valid for reads of `count * 512` bytes.
#[unsafe(export_name = "_EZFO_writeSectors")]
pub unsafe extern "C" fn ezfo_write_sectors(sector: u32, count: u32, buffer: *const c_void) -> bool {
    let Ok(len) = sector_bytes(count) else {
        return false;
    };
    if buffer.is_null() {
        return false;
    }
    let buffer = unsafe { core::slice::from_raw_parts(buffer as *const u8, len) };
    with_host(|host| DiscInterface::write_sectors(host, sector, count, buffer))
}

#[unsafe(export_name = "_EZFO_clearStatus")]
pub extern "C" fn ezfo_clear_status() -> bool {
    with_host(|host| DiscInterface::clear_status(host))
}

#[unsafe(export_name = "_EZFO_shutdown")]
pub extern "C" fn ezfo_shutdown() -> bool {
    with_host(|host| DiscInterface::shutdown(host))
}

/// Layout of libfat's `DISC_INTERFACE`.
#[repr(C)]
pub struct DiscInterfaceTable {
    pub io_type: c_ulong,
    pub features: c_ulong,
    pub startup: extern "C" fn() -> bool,
    pub is_inserted: extern "C" fn() -> bool,
    pub read_sectors: unsafe extern "C" fn(u32, u32, *mut c_void) -> bool,
    pub write_sectors: unsafe extern "C" fn(u32, u32, *const c_void) -> bool,
    pub clear_status: extern "C" fn() -> bool,
    pub shutdown: extern "C" fn() -> bool,
}

#[unsafe(export_name = "_io_ezfo")]
pub static EZFO_DISC_INTERFACE: DiscInterfaceTable = DiscInterfaceTable {
    io_type: DEVICE_TYPE_EZFO as c_ulong,
    features: DiscFeatures::platform().bits() as c_ulong,
    startup: ezfo_start_up,
    is_inserted: ezfo_is_inserted,
    read_sectors: ezfo_read_sectors,
    write_sectors: ezfo_write_sectors,
    clear_status: ezfo_clear_status,
    shutdown: ezfo_shutdown,
};
