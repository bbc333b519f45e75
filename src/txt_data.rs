use crate::error::{Error, Result};
use std::io::prelude::*;
use std::path::Path;
use std::str::FromStr;

pub const RECORD_LEN: usize = 132;

#[derive(Debug)]
pub struct DataFile {
    buf: String,
}

impl DataFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DataFile> {
        let mut file = std::fs::File::open(path)?;
        Self::from_reader(&mut file)
    }

    pub fn from_reader<B: Read>(reader: &mut B) -> Result<DataFile> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(DataFile {
            buf: String::from_utf8_lossy(&buf).into_owned(),
        })
    }

    pub fn from_string(buf: String) -> DataFile {
        DataFile { buf }
    }

    pub fn lines(&self) -> impl Iterator<Item = RecordLine<'_>> {
        self.buf
            .lines()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| RecordLine::new(i + 1, text))
    }
}

/// What a line describes, from its section and subsection codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Header,
    VhfNavaid,
    NdbNavaid,
    EnrouteWaypoint,
    AirwayFix,
    Airport,
    TerminalWaypoint,
    Sid,
    Star,
    Approach,
    Runway,
    Msa,
    ControlledAirspace,
    RestrictiveAirspace,
    Unsupported(char, char),
}

/// One fixed-width line. Columns are 1-based, as in the ARINC 424 layout.
#[derive(Clone, Copy, Debug)]
pub struct RecordLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl<'a> RecordLine<'a> {
    pub fn new(number: usize, text: &'a str) -> Self {
        RecordLine {
            number,
            text: text.trim_end_matches(|c| c == '\r' || c == '\n'),
        }
    }

    pub fn error<S: Into<String>>(&self, reason: S) -> Error {
        Error::Format {
            line: self.number,
            reason: reason.into(),
        }
    }

    /// Raw field starting at `col`, `len` characters wide. Out of range or
    /// non-ASCII slices read as blank.
    pub fn field(&self, col: usize, len: usize) -> &'a str {
        self.text.get(col - 1..col - 1 + len).unwrap_or("")
    }

    pub fn trimmed(&self, col: usize, len: usize) -> &'a str {
        self.field(col, len).trim()
    }

    /// Trimmed field, `None` when blank.
    pub fn optional(&self, col: usize, len: usize) -> Option<&'a str> {
        Some(self.trimmed(col, len)).filter(|s| !s.is_empty())
    }

    pub fn char_at(&self, col: usize) -> char {
        self.field(col, 1).chars().next().unwrap_or(' ')
    }

    pub fn literal(&self, col: usize, expected: &str) -> Result<()> {
        let found = self.field(col, expected.len());
        if found == expected {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {:?} at column {}, found {:?}",
                expected, col, found
            )))
        }
    }

    pub fn numeric<T: FromStr>(&self, col: usize, len: usize) -> Result<T> {
        let raw = self.trimmed(col, len);
        raw.parse()
            .map_err(|_| self.error(format!("non-numeric {:?} at column {}", raw, col)))
    }

    pub fn optional_numeric<T: FromStr>(&self, col: usize, len: usize) -> Result<Option<T>> {
        match self.optional(col, len) {
            None => Ok(None),
            Some(_) => self.numeric(col, len).map(Some),
        }
    }

    /// Classify by section code (column 5) and subsection code (column 6, or
    /// column 13 for airport and heliport sections).
    pub fn kind(&self) -> Result<RecordKind> {
        if self.text.starts_with("HDR") {
            return Ok(RecordKind::Header);
        }
        if self.text.len() != RECORD_LEN || !self.text.is_ascii() {
            return Err(self.error(format!("record is {} columns wide", self.text.len())));
        }
        match self.char_at(1) {
            'S' | 'T' => {}
            c => return Err(self.error(format!("unknown record type {:?}", c))),
        }

        let section = self.char_at(5);
        let subsection = match section {
            'P' | 'H' => self.char_at(13),
            _ => self.char_at(6),
        };

        Ok(match (section, subsection) {
            ('D', ' ') => RecordKind::VhfNavaid,
            ('D', 'B') => RecordKind::NdbNavaid,
            ('E', 'A') => RecordKind::EnrouteWaypoint,
            ('E', 'R') => RecordKind::AirwayFix,
            ('P', 'A') => RecordKind::Airport,
            ('P', 'C') => RecordKind::TerminalWaypoint,
            ('P', 'D') => RecordKind::Sid,
            ('P', 'E') => RecordKind::Star,
            ('P', 'F') => RecordKind::Approach,
            ('P', 'G') => RecordKind::Runway,
            ('P', 'S') => RecordKind::Msa,
            ('U', 'C') => RecordKind::ControlledAirspace,
            ('U', 'R') => RecordKind::RestrictiveAirspace,
            (s, ss) => RecordKind::Unsupported(s, ss),
        })
    }
}

/// Build a blank-padded line with `fields` placed at their 1-based columns.
#[cfg(test)]
pub fn compose(fields: &[(usize, &str)]) -> String {
    let mut line = vec![b' '; RECORD_LEN];
    for &(col, text) in fields {
        line[col - 1..col - 1 + text.len()].copy_from_slice(text.as_bytes());
    }
    String::from_utf8(line).unwrap()
}
