//! Error type for PTP/IP decoding and encoding.

/// Errors raised while decoding or encoding PTP/IP byte buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before a field could be read.
    UnexpectedEnd {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },
    /// A packet header declared a length that can't hold the header itself.
    InvalidLength { declared: u32 },
    /// A string has more UTF-16 units than a one-byte count can describe.
    StringTooLong { units: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEnd {
                context,
                needed,
                remaining,
            } => {
                write!(
                    f,
                    "Unexpected end of data reading {context}: needed {needed} byte(s), {remaining} left"
                )
            }
            Self::InvalidLength { declared } => {
                write!(f, "Invalid packet length {declared} (shorter than the 8-byte header)")
            }
            Self::StringTooLong { units } => {
                write!(f, "String of {units} UTF-16 units doesn't fit a PTP string")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
