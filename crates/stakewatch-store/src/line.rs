//! Line-protocol encoding for snapshot points.
//!
//! One record per line:
//!
//! ```text
//! moe_network_info,staker_address=<id> worker_address="<id>",start_date=<f>,\
//! end_date=<f>,stake=<f>,locked_stake=<f>,current_period=<n>i,\
//! last_confirmed_period=<n>i <unix_seconds>
//! ```
//!
//! The measurement and tag set are comma-separated, the field set follows a
//! space, the timestamp follows another space. Integer fields carry an `i`
//! suffix to disambiguate them from floats. `staker_address` is the only tag
//! (indexed); everything else is a field.
//!
//! Values are escaped per component instead of interpolated blindly: a staker
//! identifier containing `,`, `=` or a space degrades to an escaped tag value
//! instead of corrupting the line.

use stakewatch_types::NetworkSnapshotPoint;

use crate::MEASUREMENT;

/// Escape a measurement name (`,` and space).
pub fn escape_measurement(name: &str) -> String {
    escape(name, &[',', ' '])
}

/// Escape a tag key or tag value (`,`, `=` and space).
pub fn escape_tag_value(value: &str) -> String {
    escape(value, &[',', '=', ' '])
}

/// Escape the contents of a double-quoted string field (`\` and `"`).
pub fn escape_string_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Render one snapshot point as a line-protocol record.
pub fn encode_point(point: &NetworkSnapshotPoint) -> String {
    format!(
        "{measurement},staker_address={staker} \
         worker_address=\"{worker}\",\
         start_date={start},\
         end_date={end},\
         stake={stake},\
         locked_stake={locked},\
         current_period={current}i,\
         last_confirmed_period={confirmed}i \
         {timestamp}",
        measurement = escape_measurement(MEASUREMENT),
        staker = escape_tag_value(&point.staker_address),
        worker = escape_string_field(&point.worker_address),
        start = point.start_date,
        end = point.end_date,
        stake = point.stake,
        locked = point.locked_stake,
        current = point.current_period,
        confirmed = point.last_confirmed_period,
        timestamp = point.sample_time,
    )
}
