use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn truncate_unicode(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut width = 0;
    for ch in s.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if width + ch_width > max_width.saturating_sub(1) {
            result.push('\u{2026}');
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

/// Formats a kilobyte count, as reported by procfs, with a binary unit.
pub fn format_kb(kb: u64) -> String {
    const MB: u64 = 1024;
    const GB: u64 = 1024 * 1024;

    if kb >= GB {
        format!("{:.1} GB", kb as f64 / GB as f64)
    } else if kb >= MB {
        format!("{:.1} MB", kb as f64 / MB as f64)
    } else {
        format!("{kb} KB")
    }
}

/// Formats a throughput in KB/s.
pub fn format_rate(kbps: f64) -> String {
    if kbps >= 1024.0 * 1024.0 {
        format!("{:.1}G/s", kbps / (1024.0 * 1024.0))
    } else if kbps >= 1024.0 {
        format!("{:.1}M/s", kbps / 1024.0)
    } else {
        format!("{kbps:.1}K/s")
    }
}

/// Formats an age in hours as `3d04h`, `5h12m` or `42m`.
pub fn format_age(hours: f64) -> String {
    let minutes = (hours.max(0.0) * 60.0) as u64;
    let (days, rest) = (minutes / 1440, minutes % 1440);
    if days > 0 {
        format!("{days}d{:02}h", rest / 60)
    } else if rest >= 60 {
        format!("{}h{:02}m", rest / 60, rest % 60)
    } else {
        format!("{rest}m")
    }
}

/// Pads or truncates `s` to exactly `width` display columns.
pub fn fit_width(s: &str, width: usize) -> String {
    let truncated = truncate_unicode(s, width);
    let pad = width.saturating_sub(truncated.width());
    format!("{truncated}{}", " ".repeat(pad))
}
