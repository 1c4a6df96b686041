/// Code point ranges rendered two columns wide (CJK, Hangul, fullwidth forms).
const WIDE_RANGES: &[(char, char)] = &[
    ('\u{1100}', '\u{115F}'),
    ('\u{2E80}', '\u{303F}'),
    ('\u{3040}', '\u{33FF}'),
    ('\u{3400}', '\u{4DBF}'),
    ('\u{4E00}', '\u{9FFF}'),
    ('\u{A000}', '\u{A4CF}'),
    ('\u{AC00}', '\u{D7AF}'),
    ('\u{F900}', '\u{FAFF}'),
    ('\u{FE10}', '\u{FE19}'),
    ('\u{FE30}', '\u{FE6F}'),
    ('\u{FF00}', '\u{FF60}'),
    ('\u{FFE0}', '\u{FFE6}'),
    ('\u{1F300}', '\u{1F64F}'),
    ('\u{1F900}', '\u{1F9FF}'),
    ('\u{20000}', '\u{2FFFD}'),
];

pub fn char_width(c: char) -> usize {
    if WIDE_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&c)) {
        2
    } else {
        1
    }
}

/// Terminal column width of a string.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Wrap one line to `max_width` columns, preferring to break at spaces.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut remaining = text;

    while display_width(remaining) > max_width {
        let mut width = 0;
        let mut fit_end = 0;
        let mut last_space = None;
        for (pos, ch) in remaining.char_indices() {
            width += char_width(ch);
            if width > max_width {
                break;
            }
            if ch == ' ' {
                last_space = Some(pos);
            }
            fit_end = pos + ch.len_utf8();
        }

        match last_space {
            Some(pos) if pos > 0 => {
                lines.push(remaining[..pos].to_string());
                remaining = remaining[pos + 1..].trim_start();
            }
            _ => {
                // a single wide char wider than the limit still has to go somewhere
                let end = if fit_end == 0 {
                    remaining.chars().next().map_or(0, char::len_utf8)
                } else {
                    fit_end
                };
                lines.push(remaining[..end].to_string());
                remaining = &remaining[end..];
            }
        }
    }

    if !remaining.is_empty() || lines.is_empty() {
        lines.push(remaining.to_string());
    }
    lines
}

/// Cut `text` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}
