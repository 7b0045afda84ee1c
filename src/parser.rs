use tracing::debug;

use crate::models::Reading;

const RAW_MARKER: &str = "Raw:";
const ARROW: &str = "->";

/// Parses a firmware status line such as `Raw: 512 -> 48% | status: moderate`.
///
/// Lines that do not have this shape yield `None`; they are never an error.
pub fn parse_line(line: &str) -> Option<Reading> {
    if !line.contains(RAW_MARKER) || !line.contains('%') {
        return None;
    }

    let mut parts = line.split(ARROW);
    let raw_part = parts.next()?;
    let percent_part = parts.next()?;

    let raw_text = raw_part.rsplit(RAW_MARKER).next()?.trim();
    let percent_text = percent_part.split('%').next()?.trim();

    match (raw_text.parse::<i64>(), percent_text.parse::<i64>()) {
        (Ok(raw_value), Ok(percentage)) => Some(Reading { raw_value, percentage }),
        _ => {
            debug!("Unparseable sensor line: {:?}", line);
            None
        }
    }
}
