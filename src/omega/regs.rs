//! Register access for the Omega command window.
//!
//! The protocol code only ever talks to an [`OmegaPort`], so it runs the same
//! against the memory-mapped cart and against a simulated one.

/// Typed access to the cart's 16-bit bus.
pub trait OmegaPort {
    fn read_reg16(&mut self, addr: usize) -> u16;

    fn write_reg16(&mut self, addr: usize, value: u16);

    /// Bulk copy out of the staging window at `addr` into `buf`.
    fn read_staging(&mut self, addr: usize, buf: &mut [u8]);

    /// Bulk copy `buf` into the staging window at `addr`.
    fn write_staging(&mut self, addr: usize, buf: &[u8]);

    /// Busy-wait for `cycles` iterations.
    fn spin(&mut self, cycles: u32);
}

impl<P: OmegaPort + ?Sized> OmegaPort for &mut P {
    fn read_reg16(&mut self, addr: usize) -> u16 {
        (**self).read_reg16(addr)
    }

    fn write_reg16(&mut self, addr: usize, value: u16) {
        (**self).write_reg16(addr, value)
    }

    fn read_staging(&mut self, addr: usize, buf: &mut [u8]) {
        (**self).read_staging(addr, buf)
    }

    fn write_staging(&mut self, addr: usize, buf: &[u8]) {
        (**self).write_staging(addr, buf)
    }

    fn spin(&mut self, cycles: u32) {
        (**self).spin(cycles)
    }
}

/// The cart as mapped into the GBA cartridge bus.
#[derive(Debug)]
pub struct MmioPort {
    _private: (),
}

impl MmioPort {
    /// # Safety
    ///
    /// The Omega command window must be mapped at its bus addresses and no
    /// other code may drive it while this port is alive.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl MmioPort {
    fn pio_read(&mut self, addr: usize, buf: &mut [u8]) {
        for (i, chunk) in buf.chunks_mut(2).enumerate() {
            let half = self.read_reg16(addr + i * 2).to_le_bytes();
            chunk.copy_from_slice(&half[..chunk.len()]);
        }
    }

    fn pio_write(&mut self, addr: usize, buf: &[u8]) {
        for (i, chunk) in buf.chunks(2).enumerate() {
            let mut half = [0u8; 2];
            half[..chunk.len()].copy_from_slice(chunk);
            self.write_reg16(addr + i * 2, u16::from_le_bytes(half));
        }
    }
}

impl OmegaPort for MmioPort {
    fn read_reg16(&mut self, addr: usize) -> u16 {
        unsafe { core::ptr::read_volatile(addr as *const u16) }
    }

    fn write_reg16(&mut self, addr: usize, value: u16) {
        unsafe { core::ptr::write_volatile(addr as *mut u16, value) }
    }

    fn read_staging(&mut self, addr: usize, buf: &mut [u8]) {
        cfg_if::cfg_if! {
            if #[cfg(feature = "dma")] {
                if dma::usable(buf.as_ptr(), buf.len()) {
                    unsafe { dma::copy16(addr as *const u8, buf.as_mut_ptr(), buf.len()) };
                } else {
                    // unaligned caller buffers fall back to halfword copies
                    self.pio_read(addr, buf);
                }
            } else if #[cfg(feature = "pio")] {
                self.pio_read(addr, buf);
            } else {
                compile_error!("enable the `dma` or `pio` feature");
            }
        }
    }

    fn write_staging(&mut self, addr: usize, buf: &[u8]) {
        cfg_if::cfg_if! {
            if #[cfg(feature = "dma")] {
                if dma::usable(buf.as_ptr(), buf.len()) {
                    unsafe { dma::copy16(buf.as_ptr(), addr as *mut u8, buf.len()) };
                } else {
                    self.pio_write(addr, buf);
                }
            } else if #[cfg(feature = "pio")] {
                self.pio_write(addr, buf);
            } else {
                compile_error!("enable the `dma` or `pio` feature");
            }
        }
    }

    fn spin(&mut self, cycles: u32) {
        crate::spin_cycles(cycles);
    }
}

#[cfg(feature = "dma")]
mod dma {
    const REG_DMA3SAD: usize = 0x0400_00D4;
    const REG_DMA3DAD: usize = 0x0400_00D8;
    const REG_DMA3CNT: usize = 0x0400_00DC;

    const DMA_ENABLE: u32 = 1 << 31;
    const DMA_16: u32 = 0;
    const DMA_MAX_UNITS: usize = 0xFFFF;

    /// Channel 3 moves halfwords, so both ends have to be halfword aligned.
    pub fn usable(ptr: *const u8, len: usize) -> bool {
        ptr as usize % 2 == 0 && len % 2 == 0 && len / 2 <= DMA_MAX_UNITS
    }

    /// # Safety
    ///
    /// `src` and `dst` must be valid for `len` bytes and halfword aligned.
    pub unsafe fn copy16(src: *const u8, dst: *mut u8, len: usize) {
        unsafe {
            core::ptr::write_volatile(REG_DMA3SAD as *mut u32, src as usize as u32);
            core::ptr::write_volatile(REG_DMA3DAD as *mut u32, dst as usize as u32);
            core::ptr::write_volatile(REG_DMA3CNT as *mut u32, DMA_ENABLE | DMA_16 | (len / 2) as u32);
            // wait for the enable bit to drop
            while core::ptr::read_volatile(REG_DMA3CNT as *const u32) & DMA_ENABLE != 0 {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // plain memory stands in for the staging window
    #[cfg(all(feature = "pio", not(feature = "dma")))]
    #[test]
    fn pio_copies_halfwords_little_endian() {
        let mut window = [0u16; 4];
        let addr = window.as_mut_ptr() as usize;
        let mut port = unsafe { MmioPort::new() };

        port.write_staging(addr, &[0x34, 0x12, 0x78, 0x56, 0xBC, 0x9A]);
        assert_eq!(window, [0x1234, 0x5678, 0x9ABC, 0]);

        let mut back = [0u8; 6];
        port.read_staging(addr, &mut back);
        assert_eq!(back, [0x34, 0x12, 0x78, 0x56, 0xBC, 0x9A]);
    }
}
