/// Terminal columns taken by `c`: CJK and fullwidth forms take two.
fn char_width(c: char) -> usize {
    match c {
        '\u{1100}'..='\u{115F}'
        | '\u{2E80}'..='\u{303E}'
        | '\u{3041}'..='\u{33FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{A000}'..='\u{A4CF}'
        | '\u{AC00}'..='\u{D7A3}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FE30}'..='\u{FE4F}'
        | '\u{FF00}'..='\u{FF60}'
        | '\u{FFE0}'..='\u{FFE6}'
        | '\u{1F300}'..='\u{1F64F}'
        | '\u{1F900}'..='\u{1F9FF}'
        | '\u{20000}'..='\u{2FFFD}' => 2,
        _ => 1,
    }
}

/// Display width of a string in terminal columns.
pub fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Greedy word wrap to `max_width` columns. Words wider than a line are split.
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut width = 0;

        for word in paragraph.split_whitespace() {
            let word_width = display_width(word);
            if width > 0 && width + 1 + word_width <= max_width {
                line.push(' ');
                line.push_str(word);
                width += 1 + word_width;
                continue;
            }
            if width > 0 {
                lines.push(std::mem::take(&mut line));
                width = 0;
            }
            for c in word.chars() {
                let w = char_width(c);
                if width + w > max_width && width > 0 {
                    lines.push(std::mem::take(&mut line));
                    width = 0;
                }
                line.push(c);
                width += w;
            }
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_width_counts_wide_chars() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("日本"), 4);
    }

    #[test]
    fn test_wrap_breaks_on_spaces() {
        assert_eq!(
            wrap_text("the unexamined life is not worth living", 16),
            vec!["the unexamined", "life is not", "worth living"]
        );
    }

    #[test]
    fn test_wrap_splits_long_words_and_keeps_blank_lines() {
        assert_eq!(wrap_text("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }
}
