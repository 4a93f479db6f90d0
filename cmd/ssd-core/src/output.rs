use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::Word;
use crate::error::Result;

pub const ERROR_TEXT: &str = "ERROR";

/// The single value every command leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultRegister {
    /// Success without a payload (write, erase, flush).
    Done,
    Data(Word),
    Error,
}

impl ResultRegister {
    pub fn is_error(&self) -> bool {
        matches!(self, ResultRegister::Error)
    }
}

impl fmt::Display for ResultRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultRegister::Done => Ok(()),
            ResultRegister::Data(word) => write!(f, "{word}"),
            ResultRegister::Error => f.write_str(ERROR_TEXT),
        }
    }
}

/// `ssd_output.txt`: overwritten with the register text after each command.
#[derive(Debug)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn emit(&self, register: &ResultRegister) -> Result<()> {
        fs::write(&self.path, register.to_string())?;
        Ok(())
    }

    pub fn read(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_text() {
        assert_eq!(ResultRegister::Done.to_string(), "");
        assert_eq!(ResultRegister::Error.to_string(), "ERROR");
        assert_eq!(
            ResultRegister::Data(Word::parse("0x1298CDEF").unwrap()).to_string(),
            "0x1298CDEF"
        );
    }

    #[test]
    fn emit_overwrites_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputFile::new(dir.path().join("out.txt"));
        out.emit(&ResultRegister::Error).unwrap();
        assert_eq!(out.read().unwrap(), "ERROR");
        out.emit(&ResultRegister::Done).unwrap();
        assert_eq!(out.read().unwrap(), "");
    }
}
