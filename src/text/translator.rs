use std::rc::Rc;

use log::debug;

use super::alphabet::{Alphabet, AlphabetTable, ESCAPE};

/// Shift state for decoding one string
///
/// Never shared between strings: reset it before each decode and give
/// abbreviation expansion its own copy via `fresh`.
#[derive(Clone)]
pub struct ZCharTranslator {
    table: Rc<dyn AlphabetTable>,
    current_alphabet: Alphabet,
    lock_alphabet: Option<Alphabet>,
    shift_lock: bool,
}

impl ZCharTranslator {
    pub fn new(table: Rc<dyn AlphabetTable>) -> Self {
        ZCharTranslator {
            table,
            current_alphabet: Alphabet::A0,
            lock_alphabet: None,
            shift_lock: false,
        }
    }

    pub fn reset(&mut self) {
        self.current_alphabet = Alphabet::A0;
        self.lock_alphabet = None;
        self.shift_lock = false;
    }

    /// A reset copy sharing the same table
    pub fn fresh(&self) -> Self {
        let mut translator = self.clone();
        translator.reset();
        translator
    }

    /// Drop a temporary shift, returning to the locked alphabet or A0
    pub fn reset_to_last_alphabet(&mut self) {
        self.current_alphabet = self.lock_alphabet.unwrap_or(Alphabet::A0);
    }

    pub fn current_alphabet(&self) -> Alphabet {
        self.current_alphabet
    }

    pub fn lock_alphabet(&self) -> Option<Alphabet> {
        self.lock_alphabet
    }

    pub fn table(&self) -> &Rc<dyn AlphabetTable> {
        &self.table
    }

    pub fn is_abbreviation(&self, zchar: u8) -> bool {
        self.table.is_abbreviation(zchar)
    }

    /// True when `zchar` starts a 10-bit ZSCII escape
    pub fn will_escape_a2(&self, zchar: u8) -> bool {
        self.current_alphabet == Alphabet::A2 && zchar == ESCAPE
    }

    /// Translate one Z-char to ZSCII
    ///
    /// Shift codes update the state and produce 0.
    pub fn translate(&mut self, zchar: u8) -> u8 {
        if self.shift(zchar) {
            return 0;
        }
        let result = self.table.character(self.current_alphabet, zchar);
        if !self.shift_lock {
            self.reset_to_last_alphabet();
        }
        result
    }

    fn shift(&mut self, zchar: u8) -> bool {
        if !self.table.is_shift(zchar) {
            return false;
        }
        self.current_alphabet = if self.table.is_shift1(zchar) {
            self.current_alphabet.shift1()
        } else {
            self.current_alphabet.shift2()
        };
        self.shift_lock = self.table.is_shift_lock(zchar);
        if self.shift_lock {
            self.lock_alphabet = Some(self.current_alphabet);
        }
        debug!(
            "Shift {} -> {:?} (lock: {})",
            zchar, self.current_alphabet, self.shift_lock
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::alphabet::{AlphabetTableV1, AlphabetTableV2, DefaultAlphabetTable};

    fn default_translator() -> ZCharTranslator {
        ZCharTranslator::new(Rc::new(DefaultAlphabetTable))
    }

    #[test]
    fn test_plain_characters() {
        let mut translator = default_translator();
        assert_eq!(translator.translate(6), b'a');
        assert_eq!(translator.translate(0), b' ');
        assert_eq!(translator.current_alphabet(), Alphabet::A0);
    }

    #[test]
    fn test_reset_always_returns_a0() {
        let mut translator = ZCharTranslator::new(Rc::new(AlphabetTableV2));
        translator.translate(4);
        assert_eq!(translator.current_alphabet(), Alphabet::A1);
        translator.reset();
        assert_eq!(translator.current_alphabet(), Alphabet::A0);
        assert_eq!(translator.lock_alphabet(), None);
        translator.reset();
        assert_eq!(translator.current_alphabet(), Alphabet::A0);
    }

    #[test]
    fn test_non_locking_shift_reverts() {
        let mut translator = default_translator();
        assert_eq!(translator.translate(4), 0);
        assert_eq!(translator.current_alphabet(), Alphabet::A1);
        assert_eq!(translator.translate(6), b'A');
        assert_eq!(translator.current_alphabet(), Alphabet::A0);

        translator.translate(5);
        assert_eq!(translator.translate(8), b'0');
        assert_eq!(translator.current_alphabet(), Alphabet::A0);
    }

    #[test]
    fn test_v1_low_shift_codes() {
        let mut translator = ZCharTranslator::new(Rc::new(AlphabetTableV1));
        assert_eq!(translator.translate(2), 0);
        assert_eq!(translator.translate(6), b'A');
        assert_eq!(translator.translate(6), b'a');

        assert_eq!(translator.translate(3), 0);
        assert_eq!(translator.translate(7), b'0');
        assert_eq!(translator.current_alphabet(), Alphabet::A0);
    }

    #[test]
    fn test_shift_lock_persists() {
        let mut translator = ZCharTranslator::new(Rc::new(AlphabetTableV2));
        translator.translate(4);
        assert_eq!(translator.translate(6), b'A');
        assert_eq!(translator.translate(7), b'B');
        assert_eq!(translator.current_alphabet(), Alphabet::A1);

        // a temporary shift from the locked alphabet returns to it
        translator.translate(2);
        assert_eq!(translator.current_alphabet(), Alphabet::A2);
        assert_eq!(translator.translate(8), b'0');
        assert_eq!(translator.current_alphabet(), Alphabet::A1);

        translator.reset();
        assert_eq!(translator.translate(6), b'a');
    }

    #[test]
    fn test_fresh_copy_is_independent() {
        let mut translator = ZCharTranslator::new(Rc::new(AlphabetTableV2));
        translator.translate(5);
        let mut inner = translator.fresh();
        assert_eq!(inner.current_alphabet(), Alphabet::A0);
        inner.translate(4);
        assert_eq!(translator.current_alphabet(), Alphabet::A2);
    }

    #[test]
    fn test_escape_only_in_a2() {
        let mut translator = default_translator();
        assert!(!translator.will_escape_a2(6));
        translator.translate(5);
        assert!(translator.will_escape_a2(6));
        assert!(!translator.will_escape_a2(7));
    }
}
