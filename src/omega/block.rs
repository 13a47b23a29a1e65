// ===== Block Device Interface =====

use core::ops::Range;

use log::{debug, warn};

use crate::err::SdError;

use super::{
    OmegaHost,
    cmd::{DeviceMode, Direction, PollState, SdControl, TransferCommand},
    constant::*,
    regs::OmegaPort,
};

/// One hardware command worth of sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    pub sector: u32,
    pub blocks: u16,
    /// Byte offset of this burst in the caller's buffer.
    pub offset: usize,
}

impl Burst {
    pub fn byte_range(&self) -> Range<usize> {
        self.offset..self.offset + self.blocks as usize * SECTOR_SIZE
    }
}

/// Splits `[sector, sector + count)` into bursts of at most four sectors.
#[derive(Debug, Clone)]
pub struct Bursts {
    next: u32,
    remaining: u32,
    offset: usize,
}

impl Bursts {
    pub fn new(sector: u32, count: u32) -> Result<Self, SdError> {
        if sector as u64 + count as u64 > u32::MAX as u64 + 1 {
            return Err(SdError::InvalidArgument);
        }
        Ok(Self { next: sector, remaining: count, offset: 0 })
    }
}

impl Iterator for Bursts {
    type Item = Burst;

    fn next(&mut self) -> Option<Burst> {
        if self.remaining == 0 {
            return None;
        }
        let blocks = self.remaining.min(MAX_BURST_BLOCKS as u32) as u16;
        let burst = Burst { sector: self.next, blocks, offset: self.offset };

        // the last burst may end exactly at 2^32
        self.next = self.next.wrapping_add(blocks as u32);
        self.remaining -= blocks as u32;
        self.offset += blocks as usize * SECTOR_SIZE;
        Some(burst)
    }
}

/// Byte length of `count` sectors, `usize` is 32 bits on the cart's hosts.
pub fn sector_bytes(count: u32) -> Result<usize, SdError> {
    (count as usize).checked_mul(SECTOR_SIZE).ok_or(SdError::InvalidArgument)
}

fn check_buffer(count: u32, len: usize) -> Result<(), SdError> {
    let expected = sector_bytes(count)?;
    if len < expected {
        return Err(SdError::BufferSize { expected, actual: len });
    }
    Ok(())
}

impl<P: OmegaPort> OmegaHost<P> {
    /// Read `count` sectors starting at `sector` into `buffer`.
    pub fn read_sectors(&mut self, sector: u32, count: u32, buffer: &mut [u8]) -> Result<(), SdError> {
        let bursts = Bursts::new(sector, count)?;
        check_buffer(count, buffer.len())?;
        if count == 0 {
            return Ok(());
        }

        debug!("read_sectors: sector {:#x}, count {}", sector, count);
        self.enter_transfer();
        let mut result = Ok(());
        for burst in bursts {
            result = self.read_burst(&burst, &mut buffer[burst.byte_range()]);
            if result.is_err() {
                break;
            }
        }
        self.leave_transfer();
        result
    }

    /// Write `count` sectors from `buffer` starting at `sector`.
    pub fn write_sectors(&mut self, sector: u32, count: u32, buffer: &[u8]) -> Result<(), SdError> {
        let bursts = Bursts::new(sector, count)?;
        check_buffer(count, buffer.len())?;
        if count == 0 {
            return Ok(());
        }

        debug!("write_sectors: sector {:#x}, count {}", sector, count);
        self.enter_transfer();
        let mut result = Ok(());
        for burst in bursts {
            result = self.write_burst(&burst, &buffer[burst.byte_range()]);
            if result.is_err() {
                break;
            }
        }
        self.port.spin(self.config.write_settle);
        self.leave_transfer();
        result
    }

    fn read_burst(&mut self, burst: &Burst, chunk: &mut [u8]) -> Result<(), SdError> {
        let cmd = TransferCommand::new(burst.sector, burst.blocks, Direction::Read);
        self.run_command(&cmd, None)?;
        let staging = self.config.regs.staging;
        self.port.read_staging(staging, chunk);
        Ok(())
    }

    fn write_burst(&mut self, burst: &Burst, chunk: &[u8]) -> Result<(), SdError> {
        let cmd = TransferCommand::new(burst.sector, burst.blocks, Direction::Write);
        self.run_command(&cmd, Some(chunk))
    }

    /// Issue `cmd` up to `burst_attempts` times until the cart answers.
    /// Write data is staged again before every attempt.
    fn run_command(&mut self, cmd: &TransferCommand, stage: Option<&[u8]>) -> Result<(), SdError> {
        let attempts = self.config.burst_attempts;
        for attempt in 1..=attempts {
            if let Some(data) = stage {
                let staging = self.config.regs.staging;
                self.port.write_staging(staging, data);
            }
            self.issue(cmd);

            match self.await_response() {
                PollState::Completed(response) => {
                    debug!(
                        "{:?} burst at {:#x} x{} done, response {:#06x}",
                        cmd.direction, cmd.sector, cmd.blocks, response
                    );
                    return Ok(());
                }
                state => {
                    warn!(
                        "{:?} burst at {:#x} x{} attempt {}/{}: {:?}",
                        cmd.direction, cmd.sector, cmd.blocks, attempt, attempts, state
                    );
                    if attempt < attempts {
                        self.port.spin(self.config.retry_settle);
                    }
                }
            }
        }
        Err(SdError::Timeout { sector: cmd.sector, blocks: cmd.blocks })
    }

    fn enter_transfer(&mut self) {
        // shutdown leaves the storage page mapped even where no switch is needed
        if self.config.needs_mode_switch || self.mode != DeviceMode::Kernel {
            self.set_mode(DeviceMode::Kernel);
        }
        if self.control == SdControl::Disabled {
            self.set_sd_control(SdControl::Enabled);
        }
    }

    fn leave_transfer(&mut self) {
        if self.config.needs_mode_switch {
            self.set_sd_control(SdControl::Disabled);
            self.set_mode(DeviceMode::Storage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(sector: u32, count: u32) -> Vec<Burst> {
        Bursts::new(sector, count).unwrap().collect()
    }

    #[test]
    fn bursts_cover_range_in_order() {
        for count in 0..=41u32 {
            let bursts = collect(100, count);
            let mut next = 100;
            let mut offset = 0;
            for burst in &bursts {
                assert!(burst.blocks >= 1 && burst.blocks <= MAX_BURST_BLOCKS);
                assert_eq!(burst.sector, next);
                assert_eq!(burst.offset, offset);
                next += burst.blocks as u32;
                offset += burst.blocks as usize * SECTOR_SIZE;
            }
            assert_eq!(next, 100 + count);
            assert_eq!(bursts.len() as u32, count.div_ceil(4));
        }
    }

    #[test]
    fn five_sectors_split_four_one() {
        let bursts = collect(7, 5);
        assert_eq!(
            bursts,
            vec![
                Burst { sector: 7, blocks: 4, offset: 0 },
                Burst { sector: 11, blocks: 1, offset: 4 * SECTOR_SIZE },
            ]
        );
        assert_eq!(bursts[1].byte_range(), 2048..2560);
    }

    #[test]
    fn range_may_end_at_top_of_sector_space() {
        let bursts = collect(u32::MAX - 4, 5);
        assert_eq!(bursts.len(), 2);
        assert_eq!(bursts[1].sector, u32::MAX);
    }

    #[test]
    fn overflowing_range_is_rejected() {
        assert_eq!(Bursts::new(u32::MAX, 2).unwrap_err(), SdError::InvalidArgument);
    }

    #[test]
    fn short_buffer_is_rejected() {
        assert_eq!(
            check_buffer(2, 1000),
            Err(SdError::BufferSize { expected: 1024, actual: 1000 })
        );
        assert_eq!(check_buffer(2, 1024), Ok(()));
    }

    #[test]
    fn largest_count_never_wraps() {
        assert!(check_buffer(u32::MAX, 4096).is_err());

        #[cfg(target_pointer_width = "32")]
        assert_eq!(sector_bytes(u32::MAX), Err(SdError::InvalidArgument));
        #[cfg(target_pointer_width = "32")]
        assert_eq!(check_buffer(0x80_0000, 0), Err(SdError::InvalidArgument));

        #[cfg(target_pointer_width = "64")]
        assert_eq!(sector_bytes(u32::MAX), Ok(u32::MAX as usize * SECTOR_SIZE));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            check_buffer(0x80_0000, 0),
            Err(SdError::BufferSize { expected: 0x80_0000 * SECTOR_SIZE, actual: 0 })
        );
    }
}
