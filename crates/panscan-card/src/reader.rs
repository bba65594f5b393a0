//! PC/SC card reader management

use std::ffi::CString;
use std::time::{Duration, Instant};

use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State};
use tracing::debug;

use crate::error::TransportError;

/// Card reader wrapper for managing PC/SC connections
pub struct CardReader {
    context: Context,
}

impl CardReader {
    /// Create a new CardReader by establishing a PC/SC context
    pub fn new() -> Result<Self, TransportError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<String>, TransportError> {
        let mut readers_buf = [0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;

        Ok(readers
            .map(|r| r.to_str().unwrap_or("Unknown").to_string())
            .collect())
    }

    /// Connect to the first available reader
    pub fn connect_first(&self) -> Result<(Card, String), TransportError> {
        let mut readers_buf = [0; 2048];
        let mut readers = self.context.list_readers(&mut readers_buf)?;

        if let Some(reader) = readers.next() {
            let reader_name = reader.to_str().unwrap_or("Unknown").to_string();
            let card = self
                .context
                .connect(reader, ShareMode::Shared, Protocols::ANY)?;
            Ok((card, reader_name))
        } else {
            Err(TransportError::Pcsc(pcsc::Error::NoReadersAvailable))
        }
    }

    /// Block until a card is present on any reader, then connect to it.
    ///
    /// The returned card owns the session; dropping it disconnects. Fails
    /// with [`TransportError::NoCard`] once `timeout` elapses without a
    /// card appearing.
    pub fn wait_for_card(&self, timeout: Duration) -> Result<(Card, String), TransportError> {
        let deadline = Instant::now() + timeout;

        let mut readers_buf = [0; 2048];
        let names: Vec<CString> = self
            .context
            .list_readers(&mut readers_buf)?
            .map(|r| r.to_owned())
            .collect();

        if names.is_empty() {
            return Err(TransportError::Pcsc(pcsc::Error::NoReadersAvailable));
        }

        let mut reader_states: Vec<ReaderState> = names
            .iter()
            .map(|name| ReaderState::new(name.clone(), State::UNAWARE))
            .collect();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::NoCard { timeout });
            }

            match self.context.get_status_change(remaining, &mut reader_states) {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => return Err(TransportError::NoCard { timeout }),
                Err(err) => return Err(err.into()),
            }

            for reader_state in &mut reader_states {
                if reader_state.event_state().contains(State::PRESENT) {
                    let name = reader_state.name().to_owned();
                    let display_name = name.to_string_lossy().into_owned();
                    debug!(reader = %display_name, "card present");
                    let card = self
                        .context
                        .connect(&name, ShareMode::Shared, Protocols::ANY)?;
                    return Ok((card, display_name));
                }
                reader_state.sync_current_state();
            }
        }
    }
}
