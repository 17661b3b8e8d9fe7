//! Text measurement, truncation and wrapping for labels laid out without a font engine.

/// Width factor of a glyph relative to the font size.
fn glyph_factor(ch: char) -> f64 {
    match ch {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '|' | '\'' => 0.3,
        'f' | 't' | 'r' | ' ' | '(' | ')' | '-' => 0.4,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.9,
        c if c.is_ascii_uppercase() => 0.68,
        c if c.is_ascii() => 0.56,
        _ => 1.0,
    }
}

/// Approximate rendered width of `text` in pixels.
pub fn text_width(text: &str, font_px: f64) -> f64 {
    text.chars().map(glyph_factor).sum::<f64>() * font_px
}

/// Cut `text` to `max_px`, ending in an ellipsis when anything was dropped.
pub fn truncate_to_width(text: &str, font_px: f64, max_px: f64) -> String {
    if text_width(text, font_px) <= max_px {
        return text.to_string();
    }
    let budget = max_px - text_width("…", font_px);
    let mut out = String::new();
    let mut used = 0.0;
    for ch in text.chars() {
        let w = glyph_factor(ch) * font_px;
        if used + w > budget {
            break;
        }
        used += w;
        out.push(ch);
    }
    if out.is_empty() {
        return String::new();
    }
    out.push('…');
    out
}

/// Greedy word wrap to `max_px`. Words wider than a line are hard-broken.
pub fn wrap_text(text: &str, font_px: f64, max_px: f64) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let candidate = if cur.is_empty() {
            word.to_string()
        } else {
            format!("{cur} {word}")
        };
        if text_width(&candidate, font_px) <= max_px {
            cur = candidate;
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        if text_width(word, font_px) <= max_px {
            cur = word.to_string();
            continue;
        }
        for ch in word.chars() {
            let next = format!("{cur}{ch}");
            if text_width(&next, font_px) > max_px && !cur.is_empty() {
                lines.push(std::mem::replace(&mut cur, ch.to_string()));
            } else {
                cur = next;
            }
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_adds_single_ellipsis() {
        let t = truncate_to_width("kernel_thread_scheduler", 10.0, 60.0);
        assert!(t.ends_with('…'));
        assert!(text_width(&t, 10.0) <= 60.0);
        assert_eq!(truncate_to_width("io", 10.0, 60.0), "io");
    }

    #[test]
    fn wraps_on_words_and_breaks_long_ones() {
        let lines = wrap_text("read write open", 10.0, 40.0);
        assert_eq!(lines, vec!["read", "write", "open"]);
        let long = wrap_text("aaaaaaaaaaaaaaaa", 10.0, 30.0);
        assert!(long.len() > 1);
    }
}
