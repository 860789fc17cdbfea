//! `LIST` response parser.
//!
//! Supports the two dialects servers actually send:
//! 1. **Unix-style** (`ls -l`): `-rw-r--r--   1 ftp  ftp   409 Aug 19 09:01 file.txt`
//! 2. **Windows/IIS-style**: `05-23-15  12:09PM       684 file.txt`
//!
//! The dialect is decided once, from the first entry line the parser sees,
//! unless the connection options force one.

use crate::permissions::VisibilityConverter;
use crate::types::SystemType;
use chrono::{Datelike, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use stowage_core::{
    DirectoryAttributes, FileAttributes, FilesystemError, FilesystemResult, StorageAttributes,
};

lazy_static! {
    static ref WINDOWS_DATE_RE: Regex = Regex::new(r"^[0-9]{2,4}-[0-9]{2}-[0-9]{2}").unwrap();
}

const WINDOWS_DIRECTORY_MARKER: &str = "<DIR>";

/// What a raw listing line turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Blank, `total N`, `.` or `..`.
    Ignored,
    /// `some/dir:` in a recursive listing; carries the text before the colon.
    Header(&'a str),
    Entry,
}

/// `recursive` is set for `-R` output, the only place headers appear.
pub fn classify_line(line: &str, recursive: bool) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.ends_with(" .")
        || trimmed.ends_with(" ..")
        || trimmed.starts_with("total")
    {
        return LineKind::Ignored;
    }
    match trimmed.strip_suffix(':') {
        Some(dir) if recursive && !looks_like_entry(trimmed) => LineKind::Header(dir),
        _ => LineKind::Entry,
    }
}

/// Entry shape in either dialect: a Windows date or nine Unix fields.
fn looks_like_entry(line: &str) -> bool {
    WINDOWS_DATE_RE.is_match(line) || split_fields(line, 9).len() == 9
}

/// Stateful parser: remembers the detected dialect.
pub struct ListingParser {
    converter: Arc<dyn VisibilityConverter>,
    system_type: Option<SystemType>,
    timestamps_on_unix: bool,
}

impl ListingParser {
    pub fn new(
        converter: Arc<dyn VisibilityConverter>,
        forced_system_type: Option<SystemType>,
        timestamps_on_unix: bool,
    ) -> Self {
        Self {
            converter,
            system_type: forced_system_type,
            timestamps_on_unix,
        }
    }

    /// The dialect in use, once known.
    pub fn system_type(&self) -> Option<SystemType> {
        self.system_type
    }

    fn detect_system_type(&mut self, line: &str) -> SystemType {
        *self.system_type.get_or_insert_with(|| {
            let detected = if WINDOWS_DATE_RE.is_match(line.trim_start()) {
                SystemType::Windows
            } else {
                SystemType::Unix
            };
            log::debug!("Detected {} listing dialect", detected);
            detected
        })
    }

    /// Parse one entry line; `base` is the directory it was listed from.
    pub fn parse_line(&mut self, base: &str, line: &str) -> FilesystemResult<StorageAttributes> {
        if line.contains(char::REPLACEMENT_CHARACTER) {
            return Err(FilesystemError::malformed_listing(
                line,
                "the entry name is not valid UTF-8",
            ));
        }
        match self.detect_system_type(line) {
            SystemType::Unix => self.parse_unix(base, line),
            SystemType::Windows => parse_windows(base, line),
        }
    }

    // ─── Unix-style parser ───────────────────────────────────────

    /// ```text
    /// drwxr-xr-x   4 ftp      ftp          4096 Nov 24 13:58 folder
    /// -rw-r--r--   1 ftp      ftp           409 Aug 19  2014 file1.txt
    /// ```
    fn parse_unix(&self, base: &str, line: &str) -> FilesystemResult<StorageAttributes> {
        let fields = split_fields(line, 9);
        if fields.len() < 9 {
            return Err(FilesystemError::malformed_listing(
                line,
                "expected 9 whitespace separated fields",
            ));
        }
        let (permissions, size, name) = (fields[0], fields[4], fields[8]);
        let path = join_path(base, name);

        let last_modified = if self.timestamps_on_unix {
            let ts = parse_unix_timestamp(fields[5], fields[6], fields[7])
                .ok_or_else(|| FilesystemError::malformed_listing(line, "invalid timestamp"))?;
            Some(ts)
        } else {
            None
        };

        let mode = normalize_permissions(permissions);
        if permissions.starts_with('d') {
            let visibility = self.converter.inverse_for_directory(mode);
            return Ok(DirectoryAttributes::new(path)
                .with_visibility(Some(visibility))
                .with_last_modified(last_modified)
                .into());
        }

        let size = size
            .parse::<u64>()
            .map_err(|_| FilesystemError::malformed_listing(line, "the size is not numeric"))?;
        let visibility = self.converter.inverse_for_file(mode);
        Ok(FileAttributes::new(path)
            .with_file_size(size)
            .with_visibility(Some(visibility))
            .with_last_modified(last_modified)
            .into())
    }
}

// ─── Windows-style parser ────────────────────────────────────────────

/// ```text
/// 2015-05-23  12:09       <DIR>          dir1
/// 05-23-15  12:09PM                  684 file2.txt
/// ```
fn parse_windows(base: &str, line: &str) -> FilesystemResult<StorageAttributes> {
    let fields = split_fields(line, 4);
    if fields.len() < 4 {
        return Err(FilesystemError::malformed_listing(
            line,
            "expected 4 whitespace separated fields",
        ));
    }
    let (date, time, size_or_dir, name) = (fields[0], fields[1], fields[2], fields[3]);
    let path = join_path(base, name);
    let last_modified = parse_windows_timestamp(date, time);

    if size_or_dir == WINDOWS_DIRECTORY_MARKER {
        return Ok(DirectoryAttributes::new(path)
            .with_last_modified(last_modified)
            .into());
    }

    let size = size_or_dir
        .parse::<u64>()
        .map_err(|_| FilesystemError::malformed_listing(line, "the size is not numeric"))?;
    Ok(FileAttributes::new(path)
        .with_file_size(size)
        .with_last_modified(last_modified)
        .into())
}

fn parse_windows_timestamp(date: &str, time: &str) -> Option<i64> {
    let format = if date.len() == 8 {
        "%m-%d-%y%I:%M%p"
    } else {
        "%Y-%m-%d%H:%M"
    };
    NaiveDateTime::parse_from_str(&format!("{}{}", date, time), format)
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

// ─── Helpers ─────────────────────────────────────────────────────────

/// Split on the first `count - 1` runs of whitespace; the remainder
/// (which may contain spaces) becomes the last field.
fn split_fields(line: &str, count: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(count);
    let mut rest = line.trim();
    while fields.len() + 1 < count {
        match rest.find(char::is_whitespace) {
            Some(idx) => {
                fields.push(&rest[..idx]);
                rest = rest[idx..].trim_start();
            }
            None => break,
        }
    }
    if !rest.is_empty() {
        fields.push(rest);
    }
    fields
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), name)
    }
}

/// `ls -l` prints either `HH:MM` (within the last six months, year
/// implied) or a year (time implied as midnight).
fn parse_unix_timestamp(month: &str, day: &str, time_or_year: &str) -> Option<i64> {
    let (year, time) = if time_or_year.chars().all(|c| c.is_ascii_digit()) {
        (time_or_year.to_string(), "00:00".to_string())
    } else {
        (Utc::now().year().to_string(), time_or_year.to_string())
    };
    NaiveDateTime::parse_from_str(
        &format!("{}-{}-{} {}:00", year, month, day, time),
        "%Y-%b-%d %H:%M:%S",
    )
    .ok()
    .map(|dt| dt.and_utc().timestamp())
}

/// `-rwxr-x---` → `0o750`; numeric strings are taken as octal.
pub fn normalize_permissions(permissions: &str) -> u32 {
    if !permissions.is_empty() && permissions.chars().all(|c| c.is_ascii_digit()) {
        return u32::from_str_radix(permissions, 8).unwrap_or(0) & 0o777;
    }

    let bits: Vec<u32> = permissions
        .chars()
        .skip(1)
        .take(9)
        .map(|c| match c {
            'r' => 4,
            'w' => 2,
            'x' => 1,
            _ => 0,
        })
        .collect();
    bits.chunks(3)
        .fold(0, |mode, group| mode * 8 + group.iter().sum::<u32>())
}
