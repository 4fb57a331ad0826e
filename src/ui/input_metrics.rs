use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

/// Soft-wraps `text` at `width` display columns, honouring explicit newlines.
/// Always returns at least one (possibly empty) row.
pub fn wrap_rows(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = vec![String::new()];
    let mut used = 0usize;
    for ch in text.chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                rows.push(String::new());
                used = 0;
            }
            _ => {
                let ch_width = char_display_width(ch);
                if used + ch_width > width && used > 0 {
                    rows.push(String::new());
                    used = 0;
                }
                if let Some(row) = rows.last_mut() {
                    row.push(ch);
                }
                used += ch_width;
            }
        }
    }
    rows
}

/// Row and column of the cursor at `cursor_byte` once `input` is wrapped.
pub fn cursor_row_col(input: &str, cursor_byte: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);
    let mut row = 0usize;
    let mut col = 0usize;

    for ch in input[..cursor_byte].chars() {
        match ch {
            '\r' => continue,
            '\n' => {
                row += 1;
                col = 0;
            }
            _ => {
                let ch_width = char_display_width(ch);
                if col + ch_width > width && col > 0 {
                    row += 1;
                    col = 0;
                }
                col += ch_width;
            }
        }
    }

    if col >= width {
        (row + 1, 0)
    } else {
        (row, col)
    }
}

pub fn truncate_to_display_width(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

pub fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}
