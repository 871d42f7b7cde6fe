use unicode_width::UnicodeWidthChar;

/// Format whole seconds as `m:ss`, or `h:mm:ss` past an hour
pub fn format_clock(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// Short relative form used for the up-next list: `now`, `45s`, `3m`, `3m 20s`
pub fn format_countdown(secs: u64) -> String {
    match (secs / 60, secs % 60) {
        (0, 0) => "now".to_string(),
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

/// Fraction of the session elapsed, clamped to [0, 1]
pub fn progress_ratio(elapsed_secs: u64, total_secs: u64) -> f64 {
    match total_secs {
        0 => 0.0,
        total => (elapsed_secs as f64 / total as f64).clamp(0.0, 1.0),
    }
}

/// Cut `text` to at most `max_width` terminal columns, ending in `…` when cut
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    let total: usize = text.chars().map(|c| c.width().unwrap_or(0)).sum();
    if total <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(61), "1:01");
        assert_eq!(format_clock(900), "15:00");
        assert_eq!(format_clock(3725), "1:02:05");
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(0), "now");
        assert_eq!(format_countdown(45), "45s");
        assert_eq!(format_countdown(180), "3m");
        assert_eq!(format_countdown(200), "3m 20s");
    }

    #[test]
    fn test_progress_ratio() {
        assert_eq!(progress_ratio(0, 0), 0.0);
        assert_eq!(progress_ratio(450, 900), 0.5);
        assert_eq!(progress_ratio(2000, 900), 1.0);
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_to_width("a longer sentence", 8), "a longe…");
        assert_eq!(truncate_to_width("anything", 0), "");
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK char takes two columns
        assert_eq!(truncate_to_width("寿司寿司", 5), "寿司…");
    }
}
