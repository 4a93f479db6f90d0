use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::layout::{Lba, LBA_COUNT, MAX_ERASE_SPAN};

/// A 32-bit block value in its textual form: `0x` followed by 8 hex digits.
///
/// The digits are kept exactly as issued, so a value reads back with the
/// same casing it was written with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Word(String);

impl Word {
    pub const ZERO_TEXT: &'static str = "0x00000000";

    pub fn zero() -> Self {
        Word(Self::ZERO_TEXT.to_string())
    }

    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let digits = text
            .strip_prefix("0x")
            .ok_or_else(|| ValidationError::MalformedHex(text.to_string()))?;
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::MalformedHex(text.to_string()));
        }
        Ok(Word(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }
}

impl TryFrom<String> for Word {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Word::parse(&value)
    }
}

impl From<Word> for String {
    fn from(word: Word) -> Self {
        word.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Read { lba: Lba },
    Write { lba: Lba, data: Word },
    Erase { lba: Lba, size: usize },
    Flush,
}

impl Command {
    /// Validates raw tokens (`mode` first) into a command.
    ///
    /// Checks run in a fixed order: mode, argument count, LBA, then the
    /// value or erase size.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, ValidationError> {
        let (mode, args) = match tokens.split_first() {
            Some((mode, args)) => (mode.as_ref(), args),
            None => return Err(ValidationError::InvalidMode(String::new())),
        };

        let (tag, arity) = match mode {
            "R" => ('R', 1),
            "W" => ('W', 2),
            "E" => ('E', 2),
            "F" => ('F', 0),
            other => return Err(ValidationError::InvalidMode(other.to_string())),
        };
        if args.len() != arity {
            return Err(ValidationError::ArityMismatch {
                mode: tag,
                expected: arity,
                got: args.len(),
            });
        }

        match tag {
            'R' => Ok(Command::Read {
                lba: parse_lba(args[0].as_ref())?,
            }),
            'W' => {
                let lba = parse_lba(args[0].as_ref())?;
                let data = Word::parse(args[1].as_ref())?;
                Ok(Command::Write { lba, data })
            }
            'E' => {
                let lba = parse_lba(args[0].as_ref())?;
                let size = parse_erase_size(lba, args[1].as_ref())?;
                Ok(Command::Erase { lba, size })
            }
            _ => Ok(Command::Flush),
        }
    }

    pub fn mode(&self) -> char {
        match self {
            Command::Read { .. } => 'R',
            Command::Write { .. } => 'W',
            Command::Erase { .. } => 'E',
            Command::Flush => 'F',
        }
    }
}

fn parse_decimal(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_lba(text: &str) -> Result<Lba, ValidationError> {
    parse_decimal(text)
        .filter(|lba| *lba < LBA_COUNT)
        .ok_or_else(|| ValidationError::IndexOutOfRange(text.to_string()))
}

fn parse_erase_size(lba: Lba, text: &str) -> Result<usize, ValidationError> {
    parse_decimal(text)
        .filter(|size| (1..=MAX_ERASE_SPAN).contains(size) && lba + size <= LBA_COUNT)
        .ok_or_else(|| ValidationError::SizeOutOfRange(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, ValidationError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        Command::parse(&tokens)
    }

    #[test]
    fn accepts_each_mode() {
        assert_eq!(parse("R 0"), Ok(Command::Read { lba: 0 }));
        assert_eq!(
            parse("W 99 0xAABBccdd"),
            Ok(Command::Write {
                lba: 99,
                data: Word::parse("0xAABBccdd").unwrap()
            })
        );
        assert_eq!(parse("E 90 10"), Ok(Command::Erase { lba: 90, size: 10 }));
        assert_eq!(parse("F"), Ok(Command::Flush));
    }

    #[test]
    fn rejects_unknown_modes() {
        assert!(matches!(parse("X 1"), Err(ValidationError::InvalidMode(_))));
        assert!(matches!(parse("r 1"), Err(ValidationError::InvalidMode(_))));
        assert!(matches!(parse(""), Err(ValidationError::InvalidMode(_))));
    }

    #[test]
    fn arity_must_match_mode() {
        assert_eq!(
            parse("R"),
            Err(ValidationError::ArityMismatch {
                mode: 'R',
                expected: 1,
                got: 0
            })
        );
        assert!(matches!(
            parse("W 1"),
            Err(ValidationError::ArityMismatch { mode: 'W', .. })
        ));
        assert!(matches!(
            parse("F 1"),
            Err(ValidationError::ArityMismatch { mode: 'F', .. })
        ));
        assert!(matches!(
            parse("E 1 2 3"),
            Err(ValidationError::ArityMismatch { mode: 'E', .. })
        ));
    }

    #[test]
    fn lba_must_be_in_range() {
        for bad in ["100", "-1", "+5", "abc", "1.0"] {
            assert_eq!(
                parse(&format!("R {bad}")),
                Err(ValidationError::IndexOutOfRange(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn write_value_must_be_eight_hex_digits() {
        for bad in ["0x1234567", "0x123456789", "1234ABCD", "0X1234ABCD", "0x1234ABCG"] {
            assert_eq!(
                parse(&format!("W 3 {bad}")),
                Err(ValidationError::MalformedHex(bad.to_string())),
                "{bad}"
            );
        }
    }

    #[test]
    fn erase_size_and_bound() {
        assert!(matches!(parse("E 0 0"), Err(ValidationError::SizeOutOfRange(_))));
        assert!(matches!(parse("E 0 11"), Err(ValidationError::SizeOutOfRange(_))));
        assert!(matches!(parse("E 95 6"), Err(ValidationError::SizeOutOfRange(_))));
        assert!(matches!(parse("E 5 x"), Err(ValidationError::SizeOutOfRange(_))));
        assert_eq!(parse("E 95 5"), Ok(Command::Erase { lba: 95, size: 5 }));
    }

    #[test]
    fn lba_is_checked_before_the_payload() {
        assert!(matches!(
            parse("W 120 nothex"),
            Err(ValidationError::IndexOutOfRange(_))
        ));
    }

    #[test]
    fn zero_word() {
        assert!(Word::zero().is_zero());
        assert!(!Word::parse("0x00000001").unwrap().is_zero());
        assert_eq!(Word::zero().as_str(), "0x00000000");
    }
}
