//! Row builder for call-log entries.

use calldock_core::surface::RowItem;
use calldock_core::types::{format_duration, CallDirection, CallRecord, EndReason};

/// Two-line list row for one finished call. Missed inbound calls render dim.
pub fn call_log_row(record: &CallRecord) -> RowItem {
    let arrow = match record.direction {
        CallDirection::Outbound => "↗",
        CallDirection::Inbound => "↙",
    };
    let primary = format!(
        "{} {} · {}",
        arrow,
        record.peer.display_name(),
        record.kind
    );

    let when = record.started_at.format("%b %d %H:%M");
    let secondary = if record.end_reason == EndReason::Completed {
        format!("{} · {}", when, format_duration(record.duration_secs))
    } else {
        format!("{} · {}", when, record.end_reason)
    };

    let row = RowItem::new(primary, secondary);
    if record.is_missed_inbound() {
        row.dim()
    } else {
        row
    }
}
