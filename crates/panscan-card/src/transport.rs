//! Transport seam between the protocol layer and PC/SC

use pcsc::{Card, MAX_BUFFER_SIZE};

use crate::apdu::{ApduResponse, StatusWord};
use crate::error::TransportError;

/// Synchronous, half-duplex APDU exchange with a card.
///
/// One command at a time: each transmit blocks until the card answers,
/// and the implementation holds exclusive access to the session for its
/// whole duration.
pub trait CardTransport {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, TransportError>;
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, TransportError> {
        (**self).transmit(command)
    }
}

/// Transport over a connected PC/SC card.
///
/// Dropping it releases the card session.
pub struct PcscTransport {
    card: Card,
}

impl PcscTransport {
    pub fn new(card: Card) -> Self {
        Self { card }
    }
}

impl CardTransport for PcscTransport {
    fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, TransportError> {
        let mut rapdu_buf = [0; MAX_BUFFER_SIZE];
        let rapdu = self.card.transmit(command, &mut rapdu_buf)?;

        if rapdu.len() < 2 {
            return Err(TransportError::TruncatedResponse { len: rapdu.len() });
        }

        let (data, trailer) = rapdu.split_at(rapdu.len() - 2);
        Ok(ApduResponse {
            data: data.to_vec(),
            status_word: StatusWord::new(trailer[0], trailer[1]),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Scripted in-memory transport: answers SELECT with a configured
    /// status word and READ RECORD from a (sfi, record) -> bytes table.
    pub(crate) struct MockTransport {
        select_status: StatusWord,
        records: HashMap<(u8, u8), Vec<u8>>,
        pub(crate) transmitted: Vec<Vec<u8>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self {
                select_status: StatusWord::SUCCESS,
                records: HashMap::new(),
                transmitted: Vec::new(),
            }
        }

        pub(crate) fn refusing_select(sw1: u8, sw2: u8) -> Self {
            Self {
                select_status: StatusWord::new(sw1, sw2),
                ..Self::new()
            }
        }

        pub(crate) fn with_record(mut self, sfi: u8, record_number: u8, data: &[u8]) -> Self {
            self.records.insert((sfi, record_number), data.to_vec());
            self
        }

        /// Addresses queried by READ RECORD, in transmit order.
        pub(crate) fn reads(&self) -> Vec<(u8, u8)> {
            self.transmitted
                .iter()
                .filter(|cmd| cmd.get(1) == Some(&0xB2))
                .map(|cmd| (cmd[3] >> 3, cmd[2]))
                .collect()
        }
    }

    impl CardTransport for MockTransport {
        fn transmit(&mut self, command: &[u8]) -> Result<ApduResponse, TransportError> {
            self.transmitted.push(command.to_vec());
            match command.get(1) {
                Some(&0xA4) => Ok(ApduResponse {
                    data: Vec::new(),
                    status_word: self.select_status,
                }),
                Some(&0xB2) => {
                    let record_number = command[2];
                    let sfi = command[3] >> 3;
                    match self.records.get(&(sfi, record_number)) {
                        Some(data) => Ok(ApduResponse {
                            data: data.clone(),
                            status_word: StatusWord::SUCCESS,
                        }),
                        // record not found
                        None => Ok(ApduResponse {
                            data: Vec::new(),
                            status_word: StatusWord::new(0x6A, 0x83),
                        }),
                    }
                }
                // instruction not supported
                _ => Ok(ApduResponse {
                    data: Vec::new(),
                    status_word: StatusWord::new(0x6D, 0x00),
                }),
            }
        }
    }
}
