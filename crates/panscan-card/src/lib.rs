//! Panscan Card - Smart card reading and PAN discovery
//!
//! This crate provides functionality to communicate with payment cards
//! via PC/SC readers: it selects the VISA payment application, enumerates
//! the card's SFI/record address space, and extracts the PAN and
//! expiration date from track-equivalent record data.

pub mod apdu;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod track;
pub mod transport;

pub use error::{ParseError, RecordError, ScanError, SelectionError, TransportError};
pub use protocol::{CardSession, Record};
pub use reader::CardReader;
pub use track::{ExpirationDate, PanStrategy};
pub use transport::{CardTransport, PcscTransport};

/// Re-export commonly used types
pub use pcsc::{Card, Context, Error as PcscError};
