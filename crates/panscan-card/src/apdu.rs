//! APDU (Application Protocol Data Unit) command handling

use std::fmt;

/// Two-byte status word trailing every card response.
///
/// `9000` means the command completed as requested. Any other value means
/// it did not; during record enumeration that is "this address does not
/// exist or is not readable", never a process failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusWord {
    /// Status word SW1
    pub sw1: u8,
    /// Status word SW2
    pub sw2: u8,
}

impl StatusWord {
    /// The success status word (9000)
    pub const SUCCESS: StatusWord = StatusWord { sw1: 0x90, sw2: 0x00 };

    pub fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Check if the status word indicates success (9000)
    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    /// Get the full status word as a 16-bit value
    pub fn to_u16(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// APDU response containing data and status word
#[derive(Debug, Clone)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    /// Trailing status word
    pub status_word: StatusWord,
}

impl ApduResponse {
    /// Check if the response indicates success (9000)
    pub fn is_success(&self) -> bool {
        self.status_word.is_success()
    }
}

/// APDU command builder
pub struct ApduCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    /// Create a new APDU command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Set command data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Set expected response length
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Build the APDU command bytes
    pub fn build(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }
}

/// Command constructors for the payment application
pub mod commands {
    use super::ApduCommand;

    /// SELECT command (by name/AID)
    pub fn select(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x00)
            .data(aid.to_vec())
            .le(0x00)
    }

    /// READ RECORD command.
    ///
    /// P2 carries the SFI in its upper 5 bits; the low 3 bits are the
    /// fixed addressing mode 100b (read by record number, SFI given).
    pub fn read_record(record_number: u8, sfi: u8) -> ApduCommand {
        let p2 = (sfi << 3) | 0x04;
        ApduCommand::new(0x00, 0xB2, record_number, p2).le(0x00)
    }
}
