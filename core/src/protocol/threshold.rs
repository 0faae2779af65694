use cipherscreen_engine::Ciphertext;

use super::error::ProtocolError;

/// The single current encrypted threshold. Overwritten, never versioned.
#[derive(Debug, Default)]
pub struct ThresholdStore {
    current: Option<Ciphertext>,
}

impl ThresholdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn replace(&mut self, ciphertext: Ciphertext) {
        self.current = Some(ciphertext);
    }

    /// The current threshold; an unset slot is an error, never a zero.
    pub fn current(&self) -> Result<&Ciphertext, ProtocolError> {
        self.current
            .as_ref()
            .ok_or(ProtocolError::ThresholdNotConfigured)
    }
}
