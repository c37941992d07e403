use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{ClassifiedSlot, Recommendation};
use crate::session::AnalysisSession;

pub fn describe_recommendation(recommendation: &Recommendation) -> String {
    match recommendation {
        Recommendation::Found { slot, tier } => format!(
            "{} via {} (signal {:.1})",
            slot.time().format("%H:%M"),
            tier.label(),
            if slot.wifi_usable {
                slot.summary.avg_wifi_signal_strength
            } else {
                slot.summary.avg_mobile_signal_strength
            }
        ),
        Recommendation::NoneToday => "no good connection time left today".to_string(),
    }
}

fn write_slots(output: &mut String, slots: &[ClassifiedSlot], wifi: bool) {
    if slots.is_empty() {
        let _ = writeln!(output, "No usable slots remain today.");
        return;
    }

    for slot in slots {
        let summary = &slot.summary;
        if wifi {
            let _ = writeln!(
                output,
                "- {}: {:.0} B/s, link {:.1}, signal {:.1}",
                slot.time().format("%H:%M"),
                summary.avg_wifi_bytes_per_second,
                summary.avg_wifi_link_speed,
                summary.avg_wifi_signal_strength
            );
        } else {
            let _ = writeln!(
                output,
                "- {}: {:.0} B/s, signal {:.1}",
                slot.time().format("%H:%M"),
                summary.avg_mobile_bytes_per_second,
                summary.avg_mobile_signal_strength
            );
        }
    }
}

pub fn build_report(
    session: &AnalysisSession,
    now: NaiveDateTime,
    recommendation: &Recommendation,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Network Fetch Window Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) at {}, {} minute buckets",
        session.date,
        session.date.format("%A"),
        now.format("%H:%M"),
        session.delta_time_minutes
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendation");
    let _ = writeln!(output, "{}", describe_recommendation(recommendation));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Wi-Fi Slots");
    write_slots(&mut output, &session.wifi_slots, true);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Mobile Fallback Slots");
    write_slots(&mut output, &session.mobile_slots, false);

    if !session.corrupt_buckets.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Buckets");
        let list: Vec<String> = session
            .corrupt_buckets
            .iter()
            .map(|index| index.to_string())
            .collect();
        let _ = writeln!(
            output,
            "Buckets {} had no samples and were left out.",
            list.join(", ")
        );
    }

    output
}
