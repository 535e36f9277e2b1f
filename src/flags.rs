//! Request info flags — three independent bitsets that modulate server
//! behavior for an operation message.
//!
//! Bit positions are wire-stable and transmitted verbatim; unnamed bits
//! are reserved. Flags compose with bitwise OR.

use bitflags::bitflags;

bitflags! {
    /// Read-family flags (`info1`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Info1Flags: u8 {
        const READ = 1 << 0;
        const GET_ALL = 1 << 1;
        // bit 2 reserved
        const BATCH_INDEX = 1 << 3;
        const XDR = 1 << 4;
        const DONT_GET_BIN_DATA = 1 << 5;
        const READ_MODE_AP_ALL = 1 << 6;
    }

    /// Write-family flags (`info2`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Info2Flags: u8 {
        const WRITE = 1 << 0;
        const DELETE = 1 << 1;
        const GENERATION = 1 << 2;
        /// Apply the write only if the new generation is greater; useful
        /// for restores.
        const GENERATION_GT = 1 << 3;
        const DURABLE_DELETE = 1 << 4;
        const CREATE_ONLY = 1 << 5;
        // bit 6 reserved
        const RESPOND_ALL_OPS = 1 << 7;
    }

    /// Control flags (`info3`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Info3Flags: u8 {
        const LAST = 1 << 0;
        const COMMIT_MASTER = 1 << 1;
        // bit 2 reserved
        const UPDATE_ONLY = 1 << 3;
        const CREATE_OR_REPLACE = 1 << 4;
        const REPLACE_ONLY = 1 << 5;
        const SC_READ_TYPE = 1 << 6;
        const SC_READ_RELAX = 1 << 7;
    }
}
