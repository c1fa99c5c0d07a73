//! NDJSON listener - stands in for the platform clients' event streams

use contracts::BridgeMessage;

/// Parse one input line into a message
///
/// Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<BridgeMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}
