//! Byte unit conversion and formatting for display layers.

use alloc::format;
use alloc::string::String;
use core::fmt;
use core::str::FromStr;

const KIB: usize = 1024;

/// Binary size units (1 KB = 1024 B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SizeUnit {
    #[default]
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
}

impl SizeUnit {
    /// All units from the smallest to the largest
    pub const ALL: [SizeUnit; 4] = [
        SizeUnit::Bytes,
        SizeUnit::Kilobytes,
        SizeUnit::Megabytes,
        SizeUnit::Gigabytes,
    ];

    /// Number of bytes in one unit
    pub const fn factor(self) -> usize {
        match self {
            SizeUnit::Bytes => 1,
            SizeUnit::Kilobytes => KIB,
            SizeUnit::Megabytes => KIB * KIB,
            SizeUnit::Gigabytes => KIB * KIB * KIB,
        }
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            SizeUnit::Bytes => "B",
            SizeUnit::Kilobytes => "KB",
            SizeUnit::Megabytes => "MB",
            SizeUnit::Gigabytes => "GB",
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unknown unit symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown size unit")]
pub struct ParseUnitError;

impl FromStr for SizeUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeUnit::ALL
            .into_iter()
            .find(|unit| unit.symbol().eq_ignore_ascii_case(s.trim()))
            .ok_or(ParseUnitError)
    }
}

/// Convert `value` expressed in `unit` to bytes; `None` on overflow
pub const fn to_bytes(value: usize, unit: SizeUnit) -> Option<usize> {
    value.checked_mul(unit.factor())
}

/// Render `bytes` in the largest unit that keeps the integer part >= 1.
///
/// Values are truncated, so `1536` renders as `"1 KB"`.
pub fn format_size(bytes: usize) -> String {
    let unit = SizeUnit::ALL
        .into_iter()
        .rev()
        .find(|unit| bytes >= unit.factor())
        .unwrap_or(SizeUnit::Bytes);
    format!("{} {}", bytes / unit.factor(), unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes() {
        assert_eq!(to_bytes(3, SizeUnit::Bytes), Some(3));
        assert_eq!(to_bytes(2, SizeUnit::Kilobytes), Some(2048));
        assert_eq!(to_bytes(1, SizeUnit::Megabytes), Some(1 << 20));
        assert_eq!(to_bytes(4, SizeUnit::Gigabytes), Some(4 << 30));
        assert_eq!(to_bytes(usize::MAX, SizeUnit::Kilobytes), None);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1 KB");
        assert_eq!(format_size(3 << 20), "3 MB");
        assert_eq!(format_size(2048 << 20), "2 GB");
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!("KB".parse::<SizeUnit>(), Ok(SizeUnit::Kilobytes));
        assert_eq!(" gb ".parse::<SizeUnit>(), Ok(SizeUnit::Gigabytes));
        assert_eq!("b".parse::<SizeUnit>(), Ok(SizeUnit::Bytes));
        assert_eq!("TB".parse::<SizeUnit>(), Err(ParseUnitError));
        assert_eq!(alloc::string::ToString::to_string(&SizeUnit::Megabytes), "MB");
    }
}
