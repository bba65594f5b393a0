//! Error types for card access and track parsing
//!
//! The taxonomy separates fatal outcomes (selection refused, transport
//! failure) from expected ones (a record address holding nothing readable,
//! track data that does not parse). Only the expected outcomes may be
//! absorbed during enumeration.

use std::time::Duration;

use thiserror::Error;

use crate::apdu::StatusWord;

/// Failures originating in the PC/SC transport layer.
///
/// These are fatal: callers propagate them unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No card was presented within the wait deadline.
    #[error("no card presented within {timeout:?}")]
    NoCard { timeout: Duration },

    /// The card reply was too short to carry a status word.
    #[error("card reply too short for a status word ({len} bytes)")]
    TruncatedResponse { len: usize },

    /// Underlying PC/SC failure.
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),
}

/// Application selection failed.
///
/// Fatal: no record read is meaningful without a selected application,
/// and a refused SELECT is not transient, so there is no retry.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The card answered SELECT with a non-success status word.
    #[error("SELECT refused, status word {status_word}, response {}", hex::encode_upper(.response))]
    Refused {
        status_word: StatusWord,
        response: Vec<u8>,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A single READ RECORD did not produce a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The address holds nothing readable. Expected over a sparse file
    /// layout; enumeration skips it and moves on.
    #[error("record not readable (sfi {sfi}, record {record_number}, status word {status_word})")]
    NotReadable {
        sfi: u8,
        record_number: u8,
        status_word: StatusWord,
    },

    /// The address is outside the 5-bit SFI / 4-bit record encoding.
    #[error("address out of range (sfi {sfi}, record {record_number}); sfi must be 1-31, record 1-15")]
    InvalidAddress { sfi: u8, record_number: u8 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Outcome of a full address-space scan that found no answer.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Every address was tried and none carried a PAN. A terminal
    /// outcome, not a defect.
    #[error("no PAN-bearing record found on the card")]
    PanNotFound,

    /// The caller's stop check ended the scan between addresses.
    #[error("scan stopped by caller")]
    Cancelled,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Track data did not yield the requested field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The field layout is positional and the data ends before the field.
    #[error("track data too short: field ends at hex offset {needed}, data has {have}")]
    Truncated { needed: usize, have: usize },

    /// The expiration field holds characters outside 0-9.
    #[error("expiration field {field:?} is not decimal")]
    NonDecimal { field: String },
}
