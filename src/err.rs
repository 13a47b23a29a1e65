// ===== Types and Structures =====

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdError {
    /// NOR flash ID did not match; carries the value read back.
    Identification(u16),
    Timeout { sector: u32, blocks: u16 },
    BufferSize { expected: usize, actual: usize },
    InvalidArgument,
}

impl fmt::Display for SdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdError::Identification(id) => write!(f, "Unsupported cart, flash id 0x{:04X}", id),
            SdError::Timeout { sector, blocks } => {
                write!(f, "Transfer timeout at sector {:#x} ({} blocks)", sector, blocks)
            }
            SdError::BufferSize { expected, actual } => {
                write!(f, "Buffer too small: need {} bytes, got {}", expected, actual)
            }
            SdError::InvalidArgument => write!(f, "Invalid argument"),
        }
    }
}
