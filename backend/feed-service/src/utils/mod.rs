use chrono::{DateTime, Utc};

/// Compact relative label for a post timestamp: `1m`, `17m`, `5h`, `1d`, `3d`, `2w`,
/// or an absolute short date (`Jan 2`) once the post is 30 days old.
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - created_at;
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();

    if hours < 1 {
        if minutes <= 1 {
            return "1m".to_string();
        }
        return format!("{}m", minutes);
    }
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    match days {
        1 => "1d".to_string(),
        d if d < 7 => format!("{}d", d),
        d if d < 30 => format!("{}w", d / 7),
        _ => created_at.format("%b %-d").to_string(),
    }
}
