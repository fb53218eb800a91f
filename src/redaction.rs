use once_cell::sync::Lazy;
use regex::Regex;

const PREVIEW_LIMIT: usize = 48;

static SECRET_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)(passcode|password|secret|token)\s*[:=]\s*["']?([^\s"']{4,})["']?"#)
            .expect("valid regex"),
        Regex::new(r"\b([A-Fa-f0-9]{32,})\b").expect("valid regex"),
    ]
});

/// Masks secret-looking spans in free text before it reaches the logs.
pub fn redact(input: &str) -> String {
    let mut result = input.to_string();
    for pattern in SECRET_PATTERNS.iter() {
        if pattern.find(&result).is_none() {
            continue;
        }
        result = pattern
            .replace_all(&result, |caps: &regex::Captures<'_>| {
                let key = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .unwrap_or("secret")
                    .to_ascii_lowercase();
                format!("{}=[REDACTED]", key)
            })
            .to_string();
    }
    result
}

/// Bounded, redacted preview of a journal body for debug logging. Entry text
/// is personal; full bodies never belong in log files.
pub fn preview(body: &str) -> String {
    let redacted = redact(body);
    if redacted.chars().count() <= PREVIEW_LIMIT {
        return redacted;
    }
    let clipped: String = redacted.chars().take(PREVIEW_LIMIT).collect();
    format!("{}…", clipped)
}
