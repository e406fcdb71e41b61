use crate::errors::DomainError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// オフセットなし日時として受け付ける書式
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const OFFSET_OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// 正規化済みの期限日時（ISO-8601 文字列）
///
/// 入力は日付のみ・オフセットなし日時・オフセット付き日時のいずれか。
/// 保存時は常に `YYYY-MM-DDTHH:MM:SS[.f][+HH:MM]` へ揃える。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DueDate(String);

impl DueDate {
    /// 文字列を解釈して正規化する
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(dt.format(OFFSET_OUTPUT_FORMAT).to_string()));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self(dt.format(NAIVE_OUTPUT_FORMAT).to_string()));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
                DomainError::InvalidDueDate(input.to_string())
            })?;
            return Ok(Self(midnight.format(NAIVE_OUTPUT_FORMAT).to_string()));
        }

        Err(DomainError::InvalidDueDate(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DueDate {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DueDate {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DueDate> for String {
    fn from(value: DueDate) -> Self {
        value.0
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_only_is_normalized_to_midnight() {
        let due = DueDate::parse("2024-01-15").unwrap();
        assert_eq!(due.as_str(), "2024-01-15T00:00:00");
    }

    #[test]
    fn test_naive_datetime_variants() {
        assert_eq!(
            DueDate::parse("2024-01-15T10:30:00").unwrap().as_str(),
            "2024-01-15T10:30:00"
        );
        assert_eq!(
            DueDate::parse("2024-01-15 10:30").unwrap().as_str(),
            "2024-01-15T10:30:00"
        );
        assert_eq!(
            DueDate::parse(" 2024-01-15T10:30:00.250 ").unwrap().as_str(),
            "2024-01-15T10:30:00.250"
        );
    }

    #[test]
    fn test_offset_datetime_keeps_offset() {
        assert_eq!(
            DueDate::parse("2024-01-15T10:30:00Z").unwrap().as_str(),
            "2024-01-15T10:30:00+00:00"
        );
        assert_eq!(
            DueDate::parse("2024-01-15T10:30:00+09:00").unwrap().as_str(),
            "2024-01-15T10:30:00+09:00"
        );
    }

    #[test]
    fn test_normalized_form_parses_to_itself() {
        for raw in ["2024-01-15", "2024-01-15T10:30:00.5", "2024-01-15T10:30:00Z"] {
            let once = DueDate::parse(raw).unwrap();
            let twice = DueDate::parse(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_invalid_inputs_are_rejected() {
        for raw in ["", "tomorrow", "2024-13-01", "2024-02-30", "15/01/2024"] {
            assert_eq!(
                DueDate::parse(raw),
                Err(DomainError::InvalidDueDate(raw.to_string())),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: DueDate = serde_json::from_str("\"2024-01-15\"").unwrap();
        assert_eq!(ok.as_str(), "2024-01-15T00:00:00");

        let err = serde_json::from_str::<DueDate>("\"not a date\"");
        assert!(err.is_err());
    }
}
