#![cfg_attr(not(test), no_std)]

use core::sync::atomic::{Ordering, fence};

pub mod disc;
pub mod omega;
mod err;

pub use disc::{DiscFeatures, DiscInterface};
pub use err::SdError;
pub use omega::OmegaHost;

/// Burn `cycles` loop iterations for hardware settle time.
pub fn spin_cycles(cycles: u32) {
    for _ in 0..cycles {
        // 防止编译器优化掉的内存屏障
        fence(Ordering::SeqCst);
    }
}
