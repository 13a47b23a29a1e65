//! EZ Flash Omega SD interface.
//!
//! The cart hides its SD slot behind a command window on the cartridge bus.
//! Every configuration write has to be preceded by the unlock sequence and
//! followed by a commit write; sector data moves through a fixed staging
//! window of four sectors.

mod block;
mod cmd;
mod config;
mod regs;

pub mod constant;

use core::fmt::Display;

use log::{debug, info};

use crate::err::SdError;

pub use block::{Burst, Bursts, sector_bytes};
pub use cmd::{
    DeviceMode, Direction, PollState, ResponsePoller, SdControl, SdControlBits, TransferCommand,
};
pub use config::{OmegaConfig, RegisterMap};
pub use regs::{MmioPort, OmegaPort};

/// Snapshot of what the driver last wrote to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaStatus {
    pub mode: DeviceMode,
    pub control: SdControl,
    pub identified: bool,
}

#[derive(Debug)]
pub struct OmegaHost<P: OmegaPort> {
    port: P,
    config: OmegaConfig,
    mode: DeviceMode,
    control: SdControl,
    identified: bool,
}

impl<P: OmegaPort> Display for OmegaHost<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Omega SD {{ mode: {:?}, control: {:?}, identified: {}, mode_switch: {} }}",
            self.mode, self.control, self.identified, self.config.needs_mode_switch
        )
    }
}

impl<P: OmegaPort> OmegaHost<P> {
    pub fn new(port: P, config: OmegaConfig) -> Self {
        Self {
            port,
            config,
            mode: DeviceMode::Storage,
            control: SdControl::Disabled,
            identified: false,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn config(&self) -> &OmegaConfig {
        &self.config
    }

    pub fn into_port(self) -> P {
        self.port
    }

    pub fn status(&self) -> MediaStatus {
        MediaStatus {
            mode: self.mode,
            control: self.control,
            identified: self.identified,
        }
    }

    /// Identify the cart by its NOR flash id.
    ///
    /// Enters the kernel page, waits for it to settle and runs the autoselect
    /// sequence. A mismatch always restores the storage page; on a match it
    /// is restored only when storage and command spaces overlap.
    pub fn start_up(&mut self) -> Result<(), SdError> {
        self.set_mode(DeviceMode::Kernel);
        self.port.spin(self.config.startup_settle);

        let id = self.read_flash_id();
        self.identified = id == self.config.regs.flash_id;
        debug!("flash id {:#06x}, expected {:#06x}", id, self.config.regs.flash_id);

        if self.identified && !self.config.needs_mode_switch {
            self.set_sd_control(SdControl::Enabled);
        }
        if self.config.needs_mode_switch || !self.identified {
            self.set_mode(DeviceMode::Storage);
        }

        if !self.identified {
            return Err(SdError::Identification(id));
        }
        info!("{}", self);
        Ok(())
    }

    /// Always true: the cart has no card-detect line, so this only means the
    /// cart answered at start-up (or was never asked).
    pub fn is_inserted(&self) -> bool {
        true
    }

    /// There is no error latch to clear.
    pub fn clear_status(&mut self) -> Result<(), SdError> {
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<(), SdError> {
        self.set_sd_control(SdControl::Disabled);
        self.set_mode(DeviceMode::Storage);
        info!("Omega SD shut down");
        Ok(())
    }
}
