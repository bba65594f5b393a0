//! Payment application protocol: selection, record reads, enumeration

use std::ops::RangeInclusive;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::apdu::{commands, StatusWord};
use crate::error::{ParseError, RecordError, ScanError, SelectionError, TransportError};
use crate::track::{self, ExpirationDate, PanStrategy};
use crate::transport::CardTransport;

/// Known payment application identifiers
pub mod aids {
    /// Visa debit/credit
    pub const VISA: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10];
}

/// Legal SFI values under the 5-bit P2 encoding, 1-based.
pub const SFI_RANGE: RangeInclusive<u8> = 1..=31;

/// Legal record numbers, 1-based.
pub const RECORD_RANGE: RangeInclusive<u8> = 1..=15;

/// One successfully read record.
///
/// Created only on a 9000 status word and never mutated afterwards. The
/// derived fields are pure functions of the raw bytes, computed on first
/// use and memoized.
#[derive(Debug)]
pub struct Record {
    sfi: u8,
    record_number: u8,
    raw: Vec<u8>,
    status_word: StatusWord,
    strategy: PanStrategy,
    hex_text: OnceCell<String>,
    pan: OnceCell<Result<Option<String>, ParseError>>,
}

impl Record {
    fn new(
        sfi: u8,
        record_number: u8,
        raw: Vec<u8>,
        status_word: StatusWord,
        strategy: PanStrategy,
    ) -> Self {
        Self {
            sfi,
            record_number,
            raw,
            status_word,
            strategy,
            hex_text: OnceCell::new(),
            pan: OnceCell::new(),
        }
    }

    /// Short File Identifier the record was read from (1-31)
    pub fn sfi(&self) -> u8 {
        self.sfi
    }

    /// Record number within the file (1-15)
    pub fn record_number(&self) -> u8 {
        self.record_number
    }

    /// Full response payload
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn status_word(&self) -> StatusWord {
        self.status_word
    }

    /// Raw bytes as a contiguous uppercase hex string, no separators
    pub fn hex_text(&self) -> &str {
        self.hex_text.get_or_init(|| hex::encode_upper(&self.raw))
    }

    /// The PAN, extracted under the strategy the record was read with.
    pub fn pan(&self) -> Result<Option<&str>, ParseError> {
        self.pan
            .get_or_init(|| track::find_pan(self.hex_text(), self.strategy))
            .as_ref()
            .map(|pan| pan.as_deref())
            .map_err(|err| err.clone())
    }

    /// Whether a PAN could be extracted; parse failures count as absent.
    pub fn pan_present(&self) -> bool {
        matches!(self.pan(), Ok(Some(_)))
    }

    /// The expiration date. `None` whenever the PAN is absent; never
    /// guessed from the bytes.
    pub fn expiration(&self) -> Result<Option<ExpirationDate>, ParseError> {
        if self.pan()?.is_none() {
            return Ok(None);
        }
        track::expiration(self.hex_text()).map(Some)
    }
}

/// A payment application session over a card transport.
///
/// Strictly sequential: every exchange completes before the next one is
/// issued. `select_application` must succeed before any record is read.
pub struct CardSession<T: CardTransport> {
    transport: T,
    strategy: PanStrategy,
}

impl<T: CardTransport> CardSession<T> {
    pub fn new(transport: T, strategy: PanStrategy) -> Self {
        Self {
            transport,
            strategy,
        }
    }

    /// SELECT the VISA payment application.
    pub fn select_application(&mut self) -> Result<(), SelectionError> {
        self.select(aids::VISA)
    }

    /// SELECT an application by AID.
    ///
    /// Any status word other than 9000 is fatal: nothing can be read
    /// without a selected application, and a refused SELECT is not
    /// transient, so there is no retry.
    pub fn select(&mut self, aid: &[u8]) -> Result<(), SelectionError> {
        let response = self.transport.transmit(&commands::select(aid).build())?;

        if !response.is_success() {
            return Err(SelectionError::Refused {
                status_word: response.status_word,
                response: response.data,
            });
        }

        debug!(aid = %hex::encode_upper(aid), "application selected");
        Ok(())
    }

    /// READ RECORD at one (sfi, record number) address.
    ///
    /// A non-9000 status word means the address holds nothing readable,
    /// an expected outcome over a sparse file layout. No retry: a negative
    /// answer for an address is deterministic.
    pub fn read_record(&mut self, sfi: u8, record_number: u8) -> Result<Record, RecordError> {
        if !SFI_RANGE.contains(&sfi) || !RECORD_RANGE.contains(&record_number) {
            return Err(RecordError::InvalidAddress { sfi, record_number });
        }

        let command = commands::read_record(record_number, sfi).build();
        let response = self.transport.transmit(&command)?;

        if !response.is_success() {
            return Err(RecordError::NotReadable {
                sfi,
                record_number,
                status_word: response.status_word,
            });
        }

        trace!(sfi, record_number, data = %hex::encode_upper(&response.data), "record read");
        Ok(Record::new(
            sfi,
            record_number,
            response.data,
            response.status_word,
            self.strategy,
        ))
    }

    /// Scan the address space for the first PAN-bearing record.
    ///
    /// Traversal is sfi 1..=31 outer, record 1..=15 inner, both ascending;
    /// the first record whose PAN extracts is the canonical answer when
    /// several files hold PAN-shaped data.
    pub fn find_first_pan(&mut self) -> Result<Record, ScanError> {
        self.find_first_pan_while(|_, _| true)
    }

    /// Scan with a cooperative stop check, evaluated once per address.
    ///
    /// There is no mid-exchange cancellation: each transmit runs to
    /// completion and the check is consulted between addresses only.
    pub fn find_first_pan_while(
        &mut self,
        mut keep_scanning: impl FnMut(u8, u8) -> bool,
    ) -> Result<Record, ScanError> {
        for sfi in SFI_RANGE {
            for record_number in RECORD_RANGE {
                if !keep_scanning(sfi, record_number) {
                    return Err(ScanError::Cancelled);
                }

                match self.read_record(sfi, record_number) {
                    Ok(record) => {
                        if record.pan_present() {
                            debug!(sfi, record_number, "PAN-bearing record found");
                            return Ok(record);
                        }
                        if let Err(err) = record.pan() {
                            debug!(sfi, record_number, error = %err, "track data unusable, skipping");
                        }
                    }
                    Err(RecordError::Transport(err)) => return Err(err.into()),
                    Err(err) => debug!(error = %err, "skipping address"),
                }
            }
        }

        Err(ScanError::PanNotFound)
    }

    /// Read every record in the address space, in traversal order.
    ///
    /// No early termination: the whole space is scanned and every
    /// successfully read record is collected, PAN-bearing or not.
    pub fn read_all(&mut self) -> Result<Vec<Record>, TransportError> {
        let mut records = Vec::new();

        for sfi in SFI_RANGE {
            for record_number in RECORD_RANGE {
                match self.read_record(sfi, record_number) {
                    Ok(record) => records.push(record),
                    Err(RecordError::Transport(err)) => return Err(err),
                    Err(err) => debug!(error = %err, "skipping address"),
                }
            }
        }

        Ok(records)
    }
}
