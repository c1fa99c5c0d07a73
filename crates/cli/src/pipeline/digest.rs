//! Stats digest - text of the scheduled cross-platform post

use std::fmt::{Display, Write};

use chrono::{DateTime, TimeZone};
use router::RouterMetricsSnapshot;

/// Render the digest for `snapshot` stamped with `at`
pub fn build_digest<Tz>(snapshot: &RouterMetricsSnapshot, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut text = format!("📊 Bridge stats — {}\n", at.format("%Y-%m-%d %H:%M"));

    // Writing into a String cannot fail
    let _ = writeln!(text, "Forwarded: {}", snapshot.forwarded);
    let _ = writeln!(
        text,
        "Dropped: {} (flood: {}, duplicates: {}, echoes: {})",
        snapshot.dropped(),
        snapshot.rate_limited,
        snapshot.duplicates,
        snapshot.loop_dropped
    );
    let _ = write!(text, "Failed: {}", snapshot.send_failed);

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_digest_text() {
        let snapshot = RouterMetricsSnapshot {
            forwarded: 12,
            loop_dropped: 12,
            rate_limited: 3,
            duplicates: 1,
            send_failed: 2,
            ..Default::default()
        };
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        let text = build_digest(&snapshot, &at);
        assert_eq!(
            text,
            "📊 Bridge stats — 2026-01-01 12:00\n\
             Forwarded: 12\n\
             Dropped: 16 (flood: 3, duplicates: 1, echoes: 12)\n\
             Failed: 2"
        );
    }
}
