// EZ Flash Omega command window, all registers are 16 bits wide.

// Unlock sequence, written in order before any configuration register
pub const OMEGA_UNLOCK_ADDR_0: usize = 0x09FE_0000;
pub const OMEGA_UNLOCK_ADDR_1: usize = 0x0800_0000;
pub const OMEGA_UNLOCK_ADDR_2: usize = 0x0802_0000;
pub const OMEGA_UNLOCK_ADDR_3: usize = 0x0804_0000;
pub const OMEGA_MAGIC_A: u16 = 0xD200;
pub const OMEGA_MAGIC_B: u16 = 0x1500;

// Commit write that closes the command window
pub const OMEGA_COMMIT_ADDR: usize = 0x09FC_0000;
pub const OMEGA_COMMIT_VALUE: u16 = OMEGA_MAGIC_B;

// Configuration registers
pub const OMEGA_ROM_PAGE: usize = 0x0988_0000;
pub const OMEGA_SD_CONTROL: usize = 0x0940_0000;
pub const OMEGA_SD_SECTOR_LO: usize = 0x0960_0000;
pub const OMEGA_SD_SECTOR_HI: usize = 0x0962_0000;
pub const OMEGA_SD_BLOCK_COUNT: usize = 0x0964_0000;

// The response register aliases the first halfword of the staging window
pub const OMEGA_SD_RESPONSE: usize = 0x09E0_0000;
pub const OMEGA_STAGING_WINDOW: usize = 0x09E0_0000;

// ROM page values
pub const OMEGA_ROM_PAGE_KERNEL: u16 = 0x8002;
pub const OMEGA_ROM_PAGE_PSRAM: u16 = 0x0200;

// Block count register
pub const OMEGA_SD_COUNT_WRITE: u16 = 0x8000;

pub const OMEGA_SD_BUSY: u16 = 0xEEE1;

// S98 NOR flash autoselect
pub const FLASH_BASE_S98: usize = 0x0900_0000;
pub const FLASH_CMD_RESET: u16 = 0x00F0;
pub const FLASH_CMD_UNLOCK_1: u16 = 0x00AA;
pub const FLASH_CMD_UNLOCK_2: u16 = 0x0055;
pub const FLASH_CMD_AUTOSELECT: u16 = 0x0090;
pub const FLASH_ADDR_UNLOCK_1: usize = 0x555 * 2;
pub const FLASH_ADDR_UNLOCK_2: usize = 0x2AA * 2;
pub const FLASH_ADDR_DEVICE_ID: usize = 0x0E * 2;
pub const OMEGA_FLASH_ID: u16 = 0x223D;

// Transfer geometry
pub const SECTOR_SIZE: usize = 512;
pub const MAX_BURST_BLOCKS: u16 = 4;
pub const STAGING_WINDOW_SIZE: usize = SECTOR_SIZE * MAX_BURST_BLOCKS as usize;

// Timing, counted in loop iterations rather than wall-clock time
pub const POLL_LIMIT: u32 = 0x10_0000;
pub const BURST_ATTEMPTS: u32 = 2;
pub const STARTUP_SETTLE_CYCLES: u32 = 5000;
pub const RETRY_SETTLE_CYCLES: u32 = 5000;
pub const WRITE_SETTLE_CYCLES: u32 = 3000;
