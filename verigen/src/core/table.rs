//! Markdown table alignment for generated test matrices.

/// Re-align the first Markdown table found in `text`.
///
/// Rows are padded to the widest cell in each column plus a small margin,
/// separator rows are redrawn as dashes and short rows gain empty cells.
/// Lines outside the table are kept verbatim. Text without a table (fewer
/// than two consecutive `|` lines) is returned unchanged.
pub fn align_markdown_table(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| is_table_line(l)) else {
        return text.to_string();
    };
    let end = lines[start..]
        .iter()
        .position(|l| !is_table_line(l))
        .map_or(lines.len(), |offset| start + offset);
    if end - start < 2 {
        return text.to_string();
    }

    let rows: Vec<Vec<String>> = lines[start..end].iter().map(|l| split_cells(l)).collect();
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        if is_separator(row) {
            continue;
        }
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width += (*width / 10).max(3);
    }

    let mut out: Vec<String> = lines[..start].iter().map(|l| l.to_string()).collect();
    for row in &rows {
        let separator = is_separator(row);
        let cells: Vec<String> = (0..columns)
            .map(|idx| {
                if separator {
                    "-".repeat(widths[idx])
                } else {
                    let cell = row.get(idx).map_or("", String::as_str);
                    pad(cell, widths[idx])
                }
            })
            .collect();
        out.push(format!("| {} |", cells.join(" | ")));
    }
    out.extend(lines[end..].iter().map(|l| l.to_string()));

    let mut rendered = out.join("\n");
    if text.ends_with('\n') {
        rendered.push('\n');
    }
    rendered
}

/// Whether `text` contains at least a header and a separator row.
pub fn contains_table(text: &str) -> bool {
    text.lines()
        .filter(|l| is_table_line(l))
        .any(|l| is_separator(&split_cells(l)))
}

fn is_table_line(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

fn is_separator(row: &[String]) -> bool {
    !row.is_empty()
        && row.iter().all(|cell| {
            let core = cell.trim_matches(':');
            core.len() >= 3 && core.chars().all(|c| c == '-')
        })
}

fn pad(cell: &str, width: usize) -> String {
    let len = cell.chars().count();
    format!("{cell}{}", " ".repeat(width.saturating_sub(len)))
}
