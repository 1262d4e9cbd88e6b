//! Reserved system tags: the fixed set of fault bits and the scan status
//! points a program can reference like any other tag.

use crate::tag::Tag;

pub const FAULT_OUT_OF_RANGE: &str = "system.fault.out_of_range";
pub const FAULT_DIVISION_ERROR: &str = "system.fault.division_error";
pub const FAULT_ADDRESS_ERROR: &str = "system.fault.address_error";

pub const ALWAYS_ON: &str = "system.sys.always_on";
pub const FIRST_SCAN: &str = "system.sys.first_scan";
pub const SCAN_COUNTER: &str = "system.sys.scan_counter";

/// Runtime data fault. Setting one never aborts the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Parse failure or a value the destination cannot represent.
    OutOfRange,
    /// Division by zero, non-finite or out-of-domain math.
    DivisionError,
    /// Pointer outside its block or outside the block's valid windows.
    AddressError,
}

impl Fault {
    pub const ALL: [Fault; 3] = [Fault::OutOfRange, Fault::DivisionError, Fault::AddressError];

    pub fn tag_name(self) -> &'static str {
        match self {
            Fault::OutOfRange => FAULT_OUT_OF_RANGE,
            Fault::DivisionError => FAULT_DIVISION_ERROR,
            Fault::AddressError => FAULT_ADDRESS_ERROR,
        }
    }

    pub fn tag(self) -> Tag {
        Tag::bool(self.tag_name())
    }
}

pub fn always_on() -> Tag {
    Tag::bool(ALWAYS_ON)
}

pub fn first_scan() -> Tag {
    Tag::bool(FIRST_SCAN)
}

pub fn scan_counter() -> Tag {
    Tag::dint(SCAN_COUNTER).retentive(false)
}
