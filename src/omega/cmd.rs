use bitflags::bitflags;
use log::debug;

use super::{OmegaHost, constant::*, regs::OmegaPort};

bitflags! {
    /// Bits of the SD control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SdControlBits: u16 {
        const ENABLE = 1 << 0;
        const READ_STATE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdControl {
    Disabled,
    Enabled,
    /// Response register is live; only valid on top of `Enabled`.
    ReadState,
}

impl SdControl {
    pub fn bits(self) -> SdControlBits {
        match self {
            SdControl::Disabled => SdControlBits::empty(),
            SdControl::Enabled => SdControlBits::ENABLE,
            SdControl::ReadState => SdControlBits::ENABLE | SdControlBits::READ_STATE,
        }
    }
}

/// Which register map the cart currently decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// Kernel page, command registers reachable.
    Kernel,
    /// PSRAM page, the normal storage mapping.
    Storage,
}

impl DeviceMode {
    pub fn page(self) -> u16 {
        match self {
            DeviceMode::Kernel => OMEGA_ROM_PAGE_KERNEL,
            DeviceMode::Storage => OMEGA_ROM_PAGE_PSRAM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Parameters of one burst as written to the transfer registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub sector: u32,
    pub blocks: u16,
    pub direction: Direction,
}

impl TransferCommand {
    pub fn new(sector: u32, blocks: u16, direction: Direction) -> Self {
        Self { sector, blocks, direction }
    }

    pub fn sector_lo(&self) -> u16 {
        (self.sector & 0xFFFF) as u16
    }

    pub fn sector_hi(&self) -> u16 {
        (self.sector >> 16) as u16
    }

    /// Block count register value, bit 15 marks a write.
    pub fn count_field(&self) -> u16 {
        match self.direction {
            Direction::Read => self.blocks,
            Direction::Write => OMEGA_SD_COUNT_WRITE | self.blocks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    AwaitingResponse { spins: u32 },
    /// The response register dropped the busy sentinel.
    Completed(u16),
    TimedOut,
}

/// Bounded wait for the response register to leave [`OMEGA_SD_BUSY`].
#[derive(Debug)]
pub struct ResponsePoller {
    state: PollState,
    limit: u32,
}

impl ResponsePoller {
    pub fn new(limit: u32) -> Self {
        Self { state: PollState::Idle, limit }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn start(&mut self) {
        self.state = if self.limit == 0 {
            PollState::TimedOut
        } else {
            PollState::AwaitingResponse { spins: 0 }
        };
    }

    /// Feed one response register read; a no-op once finished.
    pub fn observe(&mut self, response: u16) -> PollState {
        if let PollState::AwaitingResponse { spins } = self.state {
            self.state = if response != OMEGA_SD_BUSY {
                PollState::Completed(response)
            } else if spins + 1 >= self.limit {
                PollState::TimedOut
            } else {
                PollState::AwaitingResponse { spins: spins + 1 }
            };
        }
        self.state
    }
}

impl<P: OmegaPort> OmegaHost<P> {
    fn unlock(&mut self) {
        for (addr, magic) in self.config.regs.unlock {
            self.port.write_reg16(addr, magic);
        }
    }

    fn commit(&mut self) {
        let (addr, value) = self.config.regs.commit;
        self.port.write_reg16(addr, value);
    }

    /// Open the command window, write `writes` in order, then close it.
    fn configure(&mut self, writes: &[(usize, u16)]) {
        self.unlock();
        for &(addr, value) in writes {
            self.port.write_reg16(addr, value);
        }
        self.commit();
    }

    pub fn set_mode(&mut self, mode: DeviceMode) {
        debug!("rom page -> {:?} ({:#06x})", mode, mode.page());
        self.configure(&[(self.config.regs.rom_page, mode.page())]);
        self.mode = mode;
    }

    pub fn set_sd_control(&mut self, control: SdControl) {
        self.configure(&[(self.config.regs.sd_control, control.bits().bits())]);
        self.control = control;
    }

    pub(crate) fn issue(&mut self, cmd: &TransferCommand) {
        let regs = self.config.regs;
        self.configure(&[
            (regs.sector_lo, cmd.sector_lo()),
            (regs.sector_hi, cmd.sector_hi()),
            (regs.block_count, cmd.count_field()),
        ]);
    }

    /// Switch control into read state, poll the response register and drop
    /// back to enabled.
    pub(crate) fn await_response(&mut self) -> PollState {
        self.set_sd_control(SdControl::ReadState);

        let response = self.config.regs.response;
        let mut poller = ResponsePoller::new(self.config.poll_limit);
        poller.start();
        while let PollState::AwaitingResponse { .. } = poller.state() {
            let value = self.port.read_reg16(response);
            poller.observe(value);
        }

        self.set_sd_control(SdControl::Enabled);
        poller.state()
    }

    /// Read the S98 NOR device id through the autoselect sequence.
    pub fn read_flash_id(&mut self) -> u16 {
        let base = self.config.regs.flash_base;
        self.port.write_reg16(base, FLASH_CMD_RESET);
        self.port.write_reg16(base + FLASH_ADDR_UNLOCK_1, FLASH_CMD_UNLOCK_1);
        self.port.write_reg16(base + FLASH_ADDR_UNLOCK_2, FLASH_CMD_UNLOCK_2);
        self.port.write_reg16(base + FLASH_ADDR_UNLOCK_1, FLASH_CMD_AUTOSELECT);
        self.port.read_reg16(base + FLASH_ADDR_DEVICE_ID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_field_marks_writes() {
        assert_eq!(TransferCommand::new(0, 4, Direction::Read).count_field(), 4);
        assert_eq!(TransferCommand::new(0, 3, Direction::Write).count_field(), 0x8003);
    }

    #[test]
    fn sector_split() {
        let cmd = TransferCommand::new(0x1234_5678, 1, Direction::Read);
        assert_eq!(cmd.sector_lo(), 0x5678);
        assert_eq!(cmd.sector_hi(), 0x1234);
    }

    #[test]
    fn control_bits() {
        assert_eq!(SdControl::Disabled.bits().bits(), 0);
        assert_eq!(SdControl::Enabled.bits().bits(), 1);
        assert_eq!(SdControl::ReadState.bits().bits(), 3);
    }

    #[test]
    fn poller_completes_on_first_non_busy() {
        let mut poller = ResponsePoller::new(8);
        assert_eq!(poller.state(), PollState::Idle);
        poller.start();
        assert_eq!(poller.observe(OMEGA_SD_BUSY), PollState::AwaitingResponse { spins: 1 });
        assert_eq!(poller.observe(0x0000), PollState::Completed(0));
        // finished pollers ignore further reads
        assert_eq!(poller.observe(OMEGA_SD_BUSY), PollState::Completed(0));
    }

    #[test]
    fn poller_times_out_after_limit_reads() {
        let mut poller = ResponsePoller::new(3);
        poller.start();
        let mut reads = 0;
        while let PollState::AwaitingResponse { .. } = poller.state() {
            poller.observe(OMEGA_SD_BUSY);
            reads += 1;
        }
        assert_eq!(reads, 3);
        assert_eq!(poller.state(), PollState::TimedOut);
    }

    #[test]
    fn zero_limit_never_polls() {
        let mut poller = ResponsePoller::new(0);
        poller.start();
        assert_eq!(poller.state(), PollState::TimedOut);
    }
}
