//! Dialogs and dialog token bookkeeping.

use std::collections::BTreeMap;

use crate::core::{FIRST_DIALOG_TOKEN, NO_DIALOG};

/// Timestamps of one FTM exchange, in 48-bit picoseconds. 0 means not yet captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FtmDialog {
    /// Dialog token.
    pub token: u8,
    /// Departure of the FTM frame from the responder.
    pub t1: u64,
    /// Arrival of the FTM frame at the initiator.
    pub t2: u64,
    /// Departure of the ack from the initiator.
    pub t3: u64,
    /// Arrival of the ack at the responder.
    pub t4: u64,
}

impl FtmDialog {
    /// Empty dialog for `token`.
    pub fn new(token: u8) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Whether the responder-side timestamps are both captured.
    pub fn has_departure_pair(&self) -> bool {
        self.t1 != 0 && self.t4 != 0
    }

    /// Whether all four timestamps are captured.
    pub fn is_complete(&self) -> bool {
        self.has_departure_pair() && self.t2 != 0 && self.t3 != 0
    }
}

/// Live dialogs of a session, keyed by token.
///
/// Tokens run 1..=255 and skip 0. Once the counter has wrapped, advancing
/// onto a token evicts the stale dialog that still holds it.
#[derive(Debug, Clone, Default)]
pub struct DialogTable {
    dialogs: BTreeMap<u8, FtmDialog>,
    current: u8,
    previous: u8,
    wrapped: bool,
}

impl DialogTable {
    /// Empty table with the counter at the first token.
    pub fn new() -> Self {
        let mut table = Self::default();
        table.reset();
        table
    }

    /// Restart token numbering. Existing dialogs are kept.
    pub fn reset(&mut self) {
        self.current = FIRST_DIALOG_TOKEN;
        self.previous = NO_DIALOG;
        self.wrapped = false;
    }

    /// Token of the newest dialog.
    pub fn current_token(&self) -> u8 {
        self.current
    }

    /// Token of the dialog before the newest one.
    pub fn previous_token(&self) -> u8 {
        self.previous
    }

    /// Whether the counter has wrapped past 255.
    pub fn has_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Move to the next token, evicting its stale dialog after a wrap.
    pub fn advance(&mut self) -> u8 {
        self.previous = self.current;
        self.current = self.current.wrapping_add(1);
        if self.current == NO_DIALOG {
            self.current = FIRST_DIALOG_TOKEN;
            self.wrapped = true;
        }
        if self.wrapped {
            self.dialogs.remove(&self.current);
        }
        self.current
    }

    /// Insert a fresh dialog for `token`, replacing any existing one.
    pub fn insert_new(&mut self, token: u8) -> &mut FtmDialog {
        let slot = self.dialogs.entry(token).or_default();
        *slot = FtmDialog::new(token);
        slot
    }

    /// Dialog for `token`, created if missing.
    pub fn get_or_insert(&mut self, token: u8) -> &mut FtmDialog {
        self.dialogs.entry(token).or_insert_with(|| FtmDialog::new(token))
    }

    /// Look up a dialog.
    pub fn get(&self, token: u8) -> Option<&FtmDialog> {
        self.dialogs.get(&token)
    }

    /// Look up a dialog mutably.
    pub fn get_mut(&mut self, token: u8) -> Option<&mut FtmDialog> {
        self.dialogs.get_mut(&token)
    }

    /// Remove a dialog.
    pub fn remove(&mut self, token: u8) -> Option<FtmDialog> {
        self.dialogs.remove(&token)
    }

    /// Drop every dialog.
    pub fn clear(&mut self) {
        self.dialogs.clear();
    }

    /// Number of live dialogs.
    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    /// Whether there are no live dialogs.
    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// Dialogs in token order.
    pub fn iter(&self) -> impl Iterator<Item = &FtmDialog> {
        self.dialogs.values()
    }
}
