use std::str::FromStr;
use std::time::Duration;

use anyhow::bail;
use chrono::{DateTime, SecondsFormat, Utc};
use railspeed_speed_data::{time_ago, OrchestratorResult};
use serde::Serialize;

/// How readings are written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("text") {
            Ok(Self::Text)
        } else if s.trim().eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            bail!("unknown output format '{s}' (expected text or json)")
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadingLine<'a> {
    observed_at: String,
    #[serde(flatten)]
    result: &'a OrchestratorResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_reading: Option<String>,
}

/// Render one round as a single output line.
///
/// `last_reading` is the age of the most recent successful reading and is
/// only shown for failed rounds.
pub fn render_line(
    format: OutputFormat,
    result: &OrchestratorResult,
    last_reading: Option<Duration>,
    observed_at: DateTime<Utc>,
) -> String {
    let last_reading = match result {
        OrchestratorResult::Success { .. } => None,
        OrchestratorResult::Failure { .. } => last_reading.map(time_ago),
    };

    match format {
        OutputFormat::Text => match result {
            OrchestratorResult::Success {
                speed,
                provider,
                latency_ms,
                ..
            } => format!("🚆 {speed} km/h ({provider}, {latency_ms}ms)"),
            OrchestratorResult::Failure { next_wake_secs } => match last_reading {
                Some(ago) => format!("no reading (last {ago}), retrying in {next_wake_secs}s"),
                None => format!("no reading, retrying in {next_wake_secs}s"),
            },
        },
        OutputFormat::Json => {
            let line = ReadingLine {
                observed_at: observed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                result,
                last_reading,
            };
            serde_json::to_string(&line).unwrap_or_else(|err| {
                tracing::error!("Failed to serialize reading: {}", err);
                String::new()
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn success() -> OrchestratorResult {
        OrchestratorResult::Success {
            speed: 164.0,
            provider: "ICEPortal".into(),
            latency_ms: 87,
            timestamp_us: 5_000_000,
        }
    }

    fn observed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!(
            " json ".parse::<OutputFormat>().unwrap(),
            OutputFormat::Json
        );
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_text_success() {
        let line = render_line(OutputFormat::Text, &success(), None, observed_at());
        assert_eq!(line, "🚆 164 km/h (ICEPortal, 87ms)");
    }

    #[test]
    fn test_text_success_ignores_last_reading() {
        let line = render_line(
            OutputFormat::Text,
            &success(),
            Some(Duration::from_secs(300)),
            observed_at(),
        );
        assert!(!line.contains("ago"));
    }

    #[test]
    fn test_text_failure_with_and_without_history() {
        let failure = OrchestratorResult::Failure { next_wake_secs: 8 };

        assert_eq!(
            render_line(OutputFormat::Text, &failure, None, observed_at()),
            "no reading, retrying in 8s"
        );
        assert_eq!(
            render_line(
                OutputFormat::Text,
                &failure,
                Some(Duration::from_secs(180)),
                observed_at()
            ),
            "no reading (last 3 minutes ago), retrying in 8s"
        );
    }

    #[test]
    fn test_json_success() {
        let line = render_line(OutputFormat::Json, &success(), None, observed_at());
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["speed"], 164.0);
        assert_eq!(value["provider"], "ICEPortal");
        assert_eq!(value["latencyMs"], 87);
        assert_eq!(value["observedAt"], "2024-05-01T12:30:00.000Z");
        assert!(value.get("lastReading").is_none());
    }

    #[test]
    fn test_json_failure() {
        let failure = OrchestratorResult::Failure { next_wake_secs: 4 };
        let line = render_line(
            OutputFormat::Json,
            &failure,
            Some(Duration::from_secs(1)),
            observed_at(),
        );
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["status"], "failure");
        assert_eq!(value["nextWakeSecs"], 4);
        assert_eq!(value["lastReading"], "1 second ago");
    }
}
