use std::{error, fmt};

use crate::tag::TagType;

/// A malformed program detected while building or evaluating it.
///
/// Runtime data problems (bad pointers, parse failures, division by zero) are
/// never reported through this type: they set fault tags instead and the scan
/// carries on. See [`crate::system::Fault`].
#[derive(Debug, Clone, PartialEq)]
pub enum LadderError {
    /// A tag of the wrong type was handed to a condition or an instruction.
    TagType {
        tag: String,
        expected: &'static str,
        found: TagType,
    },
    /// A literal address lies outside a block (or outside its valid windows).
    AddressOutOfBlock { block: String, address: i64 },
    /// A range whose start comes after its end.
    InvalidRange { block: String, start: i64, end: i64 },
    /// Source and destination of a block operation do not line up.
    LengthMismatch { expected: usize, found: usize },
    /// CALL to a subroutine that the program does not define.
    UnknownSubroutine(String),
    /// RETURN outside of any subroutine.
    ReturnOutsideSubroutine,
    /// A terminal instruction (drum) followed by more work in the same flow.
    TerminalNotLast(&'static str),
    /// Nested subroutine calls went deeper than the configured limit.
    CallDepthExceeded(usize),
    /// Any other argument combination an instruction cannot work with.
    InvalidInstruction(String),
}

impl LadderError {
    pub fn invalid<S: ToString>(msg: S) -> Self {
        LadderError::InvalidInstruction(msg.to_string())
    }
}

impl fmt::Display for LadderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderError::TagType {
                tag,
                expected,
                found,
            } => write!(f, "tag '{}' is {}, expected {}", tag, found, expected),
            LadderError::AddressOutOfBlock { block, address } => {
                write!(f, "address {} is not part of block '{}'", address, block)
            }
            LadderError::InvalidRange { block, start, end } => write!(
                f,
                "invalid range {}..={} on block '{}' (start after end)",
                start, end, block
            ),
            LadderError::LengthMismatch { expected, found } => write!(
                f,
                "length mismatch: expected {} elements, found {}",
                expected, found
            ),
            LadderError::UnknownSubroutine(name) => write!(f, "unknown subroutine '{}'", name),
            LadderError::ReturnOutsideSubroutine => {
                write!(f, "return used outside of a subroutine")
            }
            LadderError::TerminalNotLast(kind) => write!(
                f,
                "{} must be the last instruction of its execution flow",
                kind
            ),
            LadderError::CallDepthExceeded(depth) => {
                write!(f, "subroutine call depth exceeded ({})", depth)
            }
            LadderError::InvalidInstruction(msg) => write!(f, "invalid instruction: {}", msg),
        }
    }
}

impl error::Error for LadderError {}

pub type Result<T> = std::result::Result<T, LadderError>;
