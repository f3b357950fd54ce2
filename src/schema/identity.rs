//! Author identifiers, console filenames and timestamps.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

use crate::error::ValidationError;

/// Maximum author name length in UTF-16 code units.
pub const NAME_UNITS: usize = 11;

/// Size of a raw filename block.
pub const FILENAME_SIZE: usize = 18;

/// Length of the human-readable filename form with a 3-digit edit counter.
pub const FILENAME_TEXT_LEN: usize = 24;

/// Length of the human-readable filename form with a 5-digit edit counter.
pub const FILENAME_TEXT_MAX_LEN: usize = FILENAME_TEXT_LEN + 2;

/// Seconds between the Unix epoch and 2000-01-01T00:00:00Z.
pub const EPOCH_2000_UNIX: u64 = 946_684_800;

/// An author: display name and console id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: String,
    id: u64,
}

impl Identifier {
    pub fn new(name: impl Into<String>, id: u64) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::EmptyAuthorName);
        }
        let units = name.encode_utf16().count();
        if units > NAME_UNITS {
            return Err(ValidationError::NameTooLong(units));
        }
        if id == 0 {
            return Err(ValidationError::ZeroAuthorId);
        }
        Ok(Self { name, id })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:016X})", self.name, self.id)
    }
}

/// Raw 18-byte filename block.
///
/// Layout: 3-byte MAC fragment, 13 ASCII session characters, u16 edit
/// counter (little-endian). The text form is `XXXXXX_SSSSSSSSSSSSS_NNN`,
/// with the counter padded to at least three digits. It parses back to the
/// same bytes whenever the session is ASCII alphanumeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filename([u8; FILENAME_SIZE]);

impl Filename {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let buf: [u8; FILENAME_SIZE] = bytes
            .try_into()
            .map_err(|_| ValidationError::FilenameLength(bytes.len()))?;
        Ok(Self(buf))
    }

    /// Build from parts; `session` must be 13 ASCII alphanumeric characters.
    pub fn from_parts(
        mac_fragment: [u8; 3],
        session: &str,
        edit_count: u16,
    ) -> Result<Self, ValidationError> {
        if session.len() != 13 || !session.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ValidationError::FilenamePattern(session.to_string()));
        }
        let mut buf = [0u8; FILENAME_SIZE];
        buf[..3].copy_from_slice(&mac_fragment);
        buf[3..16].copy_from_slice(session.as_bytes());
        buf[16..].copy_from_slice(&edit_count.to_le_bytes());
        Ok(Self(buf))
    }

    pub fn as_bytes(&self) -> &[u8; FILENAME_SIZE] {
        &self.0
    }

    pub fn mac_fragment(&self) -> [u8; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Session characters, lossy for non-UTF-8 bytes.
    pub fn session(&self) -> String {
        String::from_utf8_lossy(&self.0[3..16]).into_owned()
    }

    pub fn edit_count(&self) -> u16 {
        u16::from_le_bytes([self.0[16], self.0[17]])
    }
}

impl fmt::Display for Filename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.mac_fragment() {
            write!(f, "{:02X}", b)?;
        }
        write!(f, "_{}_{:03}", self.session(), self.edit_count())
    }
}

impl FromStr for Filename {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !(FILENAME_TEXT_LEN..=FILENAME_TEXT_MAX_LEN).contains(&s.len()) {
            return Err(ValidationError::FilenameLength(s.len()));
        }
        let bad = || ValidationError::FilenamePattern(s.to_string());

        let bytes = s.as_bytes();
        let is_hex = |b: &u8| b.is_ascii_digit() || (b'A'..=b'F').contains(b);
        if bytes[6] != b'_'
            || bytes[20] != b'_'
            || !bytes[..6].iter().all(is_hex)
            || !bytes[7..20].iter().all(u8::is_ascii_alphanumeric)
            || !bytes[21..].iter().all(u8::is_ascii_digit)
        {
            return Err(bad());
        }

        let mut mac = [0u8; 3];
        for (i, byte) in mac.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16).map_err(|_| bad())?;
        }
        let edits: u16 = s[21..].parse().map_err(|_| bad())?;
        Self::from_parts(mac, &s[7..20], edits)
    }
}

/// Seconds since 2000-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    pub seconds: u32,
}

impl Timestamp {
    pub fn new(seconds: u32) -> Self {
        Self { seconds }
    }

    /// Current time, saturating outside the representable range.
    pub fn now() -> Self {
        Self::from_unix(Utc::now().timestamp())
    }

    /// From Unix seconds, saturating outside the representable range.
    pub fn from_unix(unix: i64) -> Self {
        let seconds = unix
            .saturating_sub(EPOCH_2000_UNIX as i64)
            .clamp(0, i64::from(u32::MAX));
        Self {
            seconds: seconds as u32,
        }
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        let unix = time
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self::from_unix(unix)
    }

    pub fn to_system_time(self) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(EPOCH_2000_UNIX + u64::from(self.seconds))
    }
}

impl fmt::Display for Timestamp {
    /// `MM/DD/YYYY hh:mm:ss` in UTC.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unix = EPOCH_2000_UNIX as i64 + i64::from(self.seconds);
        let time = DateTime::<Utc>::from_timestamp(unix, 0).ok_or(fmt::Error)?;
        write!(f, "{}", time.format("%m/%d/%Y %H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identifier_validation() {
        assert!(Identifier::new("Ada", 1).is_ok());
        assert_eq!(Identifier::new("", 1), Err(ValidationError::EmptyAuthorName));
        assert_eq!(Identifier::new("Ada", 0), Err(ValidationError::ZeroAuthorId));
        assert_eq!(
            Identifier::new("abcdefghijkl", 1),
            Err(ValidationError::NameTooLong(12))
        );
        assert!(Identifier::new("abcdefghijk", 1).is_ok());
    }

    #[test]
    fn test_filename_text_round_trip() {
        let name: Filename = "D0A1B2_0ACE55A1B2C3D_012".parse().unwrap();
        assert_eq!(name.mac_fragment(), [0xD0, 0xA1, 0xB2]);
        assert_eq!(name.session(), "0ACE55A1B2C3D");
        assert_eq!(name.edit_count(), 12);
        assert_eq!(name.as_bytes()[16..], [12, 0]);
        assert_eq!(name.to_string(), "D0A1B2_0ACE55A1B2C3D_012");
    }

    #[test]
    fn test_filename_rejects_bad_input() {
        assert_eq!(
            Filename::from_bytes(&[0u8; 17]),
            Err(ValidationError::FilenameLength(17))
        );
        assert_eq!(
            "D0A1B2_0ACE55A1B2C3D_01".parse::<Filename>(),
            Err(ValidationError::FilenameLength(23))
        );
        assert!(matches!(
            "D0A1B2-0ACE55A1B2C3D_012".parse::<Filename>(),
            Err(ValidationError::FilenamePattern(_))
        ));
        assert!(matches!(
            "D0A1G2_0ACE55A1B2C3D_012".parse::<Filename>(),
            Err(ValidationError::FilenamePattern(_))
        ));
        assert!(matches!(
            "D0A1B2_0ACE55A1B2C3D_0x2".parse::<Filename>(),
            Err(ValidationError::FilenamePattern(_))
        ));
    }

    #[test]
    fn test_filename_edit_count_is_little_endian() {
        let mut raw = [0u8; FILENAME_SIZE];
        raw[3..16].copy_from_slice(b"0123456789ABC");
        raw[16] = 0x2C;
        raw[17] = 0x01;
        let name = Filename::from_bytes(&raw).unwrap();
        assert_eq!(name.edit_count(), 300);
    }

    #[test]
    fn test_filename_wide_edit_count_round_trip() {
        let name = Filename::from_parts([0, 0, 0], "0123456789ABC", 1000).unwrap();
        assert_eq!(name.to_string(), "000000_0123456789ABC_1000");
        assert_eq!(name.to_string().parse::<Filename>(), Ok(name));

        let max = Filename::from_parts([0xFF, 0x01, 0x10], "0123456789ABC", u16::MAX).unwrap();
        assert_eq!(max.to_string(), "FF0110_0123456789ABC_65535");
        assert_eq!(max.to_string().parse::<Filename>(), Ok(max));

        assert!(matches!(
            "000000_0123456789ABC_65536".parse::<Filename>(),
            Err(ValidationError::FilenamePattern(_))
        ));
        assert_eq!(
            "000000_0123456789ABC_100000".parse::<Filename>(),
            Err(ValidationError::FilenameLength(27))
        );
    }

    #[test]
    fn test_filename_preserves_session_case() {
        let mut raw = [0u8; FILENAME_SIZE];
        raw[3..16].copy_from_slice(b"0123456789abc");
        raw[16] = 5;
        let name = Filename::from_bytes(&raw).unwrap();
        assert_eq!(name.to_string(), "000000_0123456789abc_005");
        assert_eq!(name.to_string().parse::<Filename>().unwrap().as_bytes(), &raw);
    }

    #[test]
    fn test_filename_rejects_non_alphanumeric_session() {
        assert!(matches!(
            Filename::from_parts([0; 3], "0123_56789ABC", 0),
            Err(ValidationError::FilenamePattern(_))
        ));
    }

    #[test]
    fn test_timestamp_epoch() {
        let ts = Timestamp::new(0);
        assert_eq!(ts.to_system_time(), UNIX_EPOCH + Duration::from_secs(946_684_800));
        assert_eq!(ts.to_string(), "01/01/2000 00:00:00");
        assert_eq!(Timestamp::from_system_time(UNIX_EPOCH), Timestamp::new(0));
    }

    #[test]
    fn test_timestamp_display() {
        // 2009-02-13 23:31:30 UTC is unix 1234567890.
        let ts = Timestamp::new((1_234_567_890 - EPOCH_2000_UNIX) as u32);
        assert_eq!(ts.to_string(), "02/13/2009 23:31:30");
        assert_eq!(Timestamp::from_system_time(ts.to_system_time()), ts);
    }

    #[test]
    fn test_timestamp_now_after_2020() {
        assert!(Timestamp::now().seconds > 630_000_000);
    }

    #[test]
    fn test_timestamp_from_unix_saturates() {
        assert_eq!(Timestamp::from_unix(0), Timestamp::new(0));
        assert_eq!(Timestamp::from_unix(i64::MIN), Timestamp::new(0));
        assert_eq!(Timestamp::from_unix(i64::MAX), Timestamp::new(u32::MAX));
        assert_eq!(Timestamp::from_unix(946_684_801), Timestamp::new(1));
    }

    #[test]
    fn test_timestamp_display_upper_bound() {
        // u32::MAX seconds after 2000 lands in 2136.
        assert_eq!(Timestamp::new(u32::MAX).to_string(), "02/07/2136 06:28:15");
    }

    proptest! {
        #[test]
        fn prop_filename_text_round_trip(
            mac in any::<[u8; 3]>(),
            session in "[0-9A-Za-z]{13}",
            edits in any::<u16>(),
        ) {
            let name = Filename::from_parts(mac, &session, edits).unwrap();
            let parsed: Filename = name.to_string().parse().unwrap();
            prop_assert_eq!(parsed.as_bytes(), name.as_bytes());
        }
    }
}
