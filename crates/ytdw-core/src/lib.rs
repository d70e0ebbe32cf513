//! Core domain model and duration codec for YTDW.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const CRATE_NAME: &str = "ytdw-core";

/// Length of a well-formed external video id.
pub const VIDEO_ID_LEN: usize = 11;

/// One channel extraction cycle as produced by the external listing client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub channel_handle: String,
    pub channel_id: String,
    pub extraction_date: DateTime<Utc>,
    pub total_videos: i64,
    pub videos: Vec<RawVideoRecord>,
}

/// One video as reported by the listing API. Count fields arrive as JSON
/// numbers, numeric strings, null, or are absent entirely (counters can be
/// disabled per video), so they deserialize through [`de_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideoRecord {
    pub video_id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub duration: String,
    pub duration_readable: String,
    #[serde(default, deserialize_with = "de_count")]
    pub view_count: Option<i64>,
    #[serde(default, deserialize_with = "de_count")]
    pub like_count: Option<i64>,
    #[serde(default, deserialize_with = "de_count")]
    pub comment_count: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Int(i64),
    Text(String),
}

fn de_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<CountRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(CountRepr::Int(n)) => Ok(Some(n)),
        Some(CountRepr::Text(s)) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("non-numeric count {s:?}"))),
    }
}

/// Categorical duration label attached to core rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationLabel {
    Short,
    Long,
}

impl DurationLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationLabel::Short => "short",
            DurationLabel::Long => "long",
        }
    }
}

impl std::str::FromStr for DurationLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(DurationLabel::Short),
            "long" => Ok(DurationLabel::Long),
            other => Err(format!("unknown duration label {other:?}")),
        }
    }
}

/// Enriched persisted video representation derived from staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreVideo {
    pub video_id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub duration: String,
    pub duration_readable: String,
    pub duration_seconds: i64,
    pub duration_label: DurationLabel,
    pub channel_id: String,
    pub channel_handle: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable per-run metric fact, keyed by (video_id, recorded_at).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSample {
    pub video_id: String,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub recorded_at: DateTime<Utc>,
}

pub mod duration {
    //! Pure conversions for ISO 8601 video durations (`PT22M26S`).

    use super::DurationLabel;

    /// Strict parse of an ISO 8601 duration into total seconds. Supports
    /// day/hour/minute/second designators; anything else is rejected.
    pub fn try_parse_seconds(input: &str) -> Option<i64> {
        let mut chars = input.chars();
        if chars.next() != Some('P') {
            return None;
        }

        let mut total: i64 = 0;
        let mut number: Option<i64> = None;
        let mut in_time = false;
        let mut any_component = false;

        for c in chars {
            match c {
                '0'..='9' => {
                    let digit = (c as u8 - b'0') as i64;
                    number = Some(number.unwrap_or(0).checked_mul(10)?.checked_add(digit)?);
                }
                'T' if !in_time && number.is_none() => in_time = true,
                'D' if !in_time => {
                    total = total.checked_add(number.take()?.checked_mul(86_400)?)?;
                    any_component = true;
                }
                'H' if in_time => {
                    total = total.checked_add(number.take()?.checked_mul(3_600)?)?;
                    any_component = true;
                }
                'M' if in_time => {
                    total = total.checked_add(number.take()?.checked_mul(60)?)?;
                    any_component = true;
                }
                'S' if in_time => {
                    total = total.checked_add(number.take()?)?;
                    any_component = true;
                }
                _ => return None,
            }
        }

        if number.is_some() || !any_component {
            return None;
        }
        Some(total)
    }

    /// Fail-soft parse: unparseable input yields 0, never an error.
    pub fn parse_seconds(input: &str) -> i64 {
        try_parse_seconds(input).unwrap_or(0)
    }

    /// `H:MM:SS` when hours are present, `M:SS` otherwise. The leading
    /// component is unpadded.
    pub fn format_readable(seconds: i64) -> String {
        let seconds = seconds.max(0);
        let (minutes, secs) = (seconds / 60, seconds % 60);
        let (hours, mins) = (minutes / 60, minutes % 60);
        if hours > 0 {
            format!("{hours}:{mins:02}:{secs:02}")
        } else {
            format!("{mins}:{secs:02}")
        }
    }

    /// Inclusive boundary at one minute: 60 seconds is already `Long`.
    pub fn classify(seconds: i64) -> DurationLabel {
        if seconds < 60 {
            DurationLabel::Short
        } else {
            DurationLabel::Long
        }
    }
}

#[cfg(test)]
mod tests {
    use super::duration::*;
    use super::*;

    #[test]
    fn parses_minute_second_durations() {
        assert_eq!(try_parse_seconds("PT22M26S"), Some(1346));
        assert_eq!(try_parse_seconds("PT26S"), Some(26));
        assert_eq!(try_parse_seconds("PT58S"), Some(58));
    }

    #[test]
    fn parses_hour_and_day_durations() {
        assert_eq!(try_parse_seconds("PT1H15M3S"), Some(4503));
        assert_eq!(try_parse_seconds("PT2H"), Some(7200));
        assert_eq!(try_parse_seconds("P1DT2H"), Some(93_600));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(try_parse_seconds(""), None);
        assert_eq!(try_parse_seconds("22:26"), None);
        assert_eq!(try_parse_seconds("PT"), None);
        assert_eq!(try_parse_seconds("PT5"), None);
        assert_eq!(try_parse_seconds("P5M"), None);
        assert_eq!(try_parse_seconds("PTXS"), None);
    }

    #[test]
    fn parse_is_fail_soft() {
        assert_eq!(parse_seconds("not-a-duration"), 0);
        assert_eq!(parse_seconds("PT1M1S"), 61);
    }

    #[test]
    fn readable_format_matches_reference_vectors() {
        assert_eq!(format_readable(26), "0:26");
        assert_eq!(format_readable(1346), "22:26");
        assert_eq!(format_readable(4503), "1:15:03");
        assert_eq!(format_readable(0), "0:00");
    }

    #[test]
    fn classification_boundary_is_inclusive_at_sixty() {
        assert_eq!(classify(0), DurationLabel::Short);
        assert_eq!(classify(59), DurationLabel::Short);
        assert_eq!(classify(60), DurationLabel::Long);
        assert_eq!(classify(4503), DurationLabel::Long);
    }

    #[test]
    fn counts_accept_number_string_and_absent() {
        let json = r#"{
            "video_id": "AAAAAAAAAAA",
            "title": "t",
            "published_at": "2025-09-01T00:00:00Z",
            "duration": "PT58S",
            "duration_readable": "0:58",
            "view_count": "54506132",
            "like_count": 1833636,
            "comment_count": null
        }"#;
        let record: RawVideoRecord = serde_json::from_str(json).expect("record");
        assert_eq!(record.view_count, Some(54_506_132));
        assert_eq!(record.like_count, Some(1_833_636));
        assert_eq!(record.comment_count, None);

        let json_absent = r#"{
            "video_id": "BBBBBBBBBBB",
            "title": "t",
            "published_at": "2025-09-01T00:00:00Z",
            "duration": "PT1M",
            "duration_readable": "1:00"
        }"#;
        let record: RawVideoRecord = serde_json::from_str(json_absent).expect("record");
        assert_eq!(record.view_count, None);
    }

    #[test]
    fn counts_reject_non_numeric_strings() {
        let json = r#"{
            "video_id": "CCCCCCCCCCC",
            "title": "t",
            "published_at": "2025-09-01T00:00:00Z",
            "duration": "PT1M",
            "duration_readable": "1:00",
            "view_count": "many"
        }"#;
        assert!(serde_json::from_str::<RawVideoRecord>(json).is_err());
    }

    #[test]
    fn label_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&DurationLabel::Short).expect("json"),
            "\"short\""
        );
        assert_eq!(DurationLabel::Long.as_str(), "long");
    }

    #[test]
    fn label_round_trips_through_str() {
        assert_eq!("short".parse::<DurationLabel>(), Ok(DurationLabel::Short));
        assert_eq!("long".parse::<DurationLabel>(), Ok(DurationLabel::Long));
        assert!("medium".parse::<DurationLabel>().is_err());
    }
}
