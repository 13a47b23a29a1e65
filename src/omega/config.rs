use super::constant::*;

/// Bus addresses and magic values of the cart's command window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub unlock: [(usize, u16); 4],
    pub commit: (usize, u16),
    pub rom_page: usize,
    pub sd_control: usize,
    pub sector_lo: usize,
    pub sector_hi: usize,
    pub block_count: usize,
    pub response: usize,
    pub staging: usize,
    pub flash_base: usize,
    pub flash_id: u16,
}

impl RegisterMap {
    pub const OMEGA: Self = Self {
        unlock: [
            (OMEGA_UNLOCK_ADDR_0, OMEGA_MAGIC_A),
            (OMEGA_UNLOCK_ADDR_1, OMEGA_MAGIC_B),
            (OMEGA_UNLOCK_ADDR_2, OMEGA_MAGIC_A),
            (OMEGA_UNLOCK_ADDR_3, OMEGA_MAGIC_B),
        ],
        commit: (OMEGA_COMMIT_ADDR, OMEGA_COMMIT_VALUE),
        rom_page: OMEGA_ROM_PAGE,
        sd_control: OMEGA_SD_CONTROL,
        sector_lo: OMEGA_SD_SECTOR_LO,
        sector_hi: OMEGA_SD_SECTOR_HI,
        block_count: OMEGA_SD_BLOCK_COUNT,
        response: OMEGA_SD_RESPONSE,
        staging: OMEGA_STAGING_WINDOW,
        flash_base: FLASH_BASE_S98,
        flash_id: OMEGA_FLASH_ID,
    };
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::OMEGA
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "nds")] {
        const PLATFORM: OmegaConfig = OmegaConfig::NDS;
    } else {
        const PLATFORM: OmegaConfig = OmegaConfig::GBA;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OmegaConfig {
    /// Storage and command spaces overlap, so every operation has to flip
    /// into the kernel page and back.
    pub needs_mode_switch: bool,
    pub poll_limit: u32,
    pub burst_attempts: u32,
    pub startup_settle: u32,
    pub retry_settle: u32,
    pub write_settle: u32,
    pub regs: RegisterMap,
}

impl OmegaConfig {
    /// Cart plugged into the GBA slot (or a GBA itself).
    pub const GBA: Self = Self {
        needs_mode_switch: true,
        poll_limit: POLL_LIMIT,
        burst_attempts: BURST_ATTEMPTS,
        startup_settle: STARTUP_SETTLE_CYCLES,
        retry_settle: RETRY_SETTLE_CYCLES,
        write_settle: WRITE_SETTLE_CYCLES,
        regs: RegisterMap::OMEGA,
    };

    /// Cart accessed from a DS, where the kernel page stays mapped.
    pub const NDS: Self = Self {
        needs_mode_switch: false,
        ..Self::GBA
    };

    /// Configuration of the platform this crate was built for.
    pub const fn platform() -> Self {
        PLATFORM
    }

    pub fn with_poll_limit(mut self, poll_limit: u32) -> Self {
        self.poll_limit = poll_limit;
        self
    }
}

impl Default for OmegaConfig {
    fn default() -> Self {
        Self::platform()
    }
}
