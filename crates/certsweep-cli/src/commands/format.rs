//! Table output

/// Print rows as a column-aligned table with headers.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

/// Render rows as a column-aligned table, one line per row plus the header.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let num_cols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(num_cols) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let render_line = |cells: Vec<&str>| {
        let line: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:<width$}", cell, width = w)
            })
            .collect();
        format!("{}\n", line.join("  ").trim_end())
    };

    let mut out = render_line(headers.to_vec());
    for row in rows {
        out.push_str(&render_line(row.iter().map(String::as_str).collect()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_columns_to_widest_cell() {
        let rows = vec![
            vec!["production".to_string(), "default".to_string()],
            vec!["dev".to_string(), "kube-system".to_string()],
        ];
        let table = render_table(&["NAME", "NAMESPACE"], &rows);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines[0], "NAME        NAMESPACE");
        assert_eq!(lines[1], "production  default");
        assert_eq!(lines[2], "dev         kube-system");
    }

    #[test]
    fn headers_only_when_no_rows() {
        assert_eq!(render_table(&["NAME", "NAMESPACE"], &[]), "NAME  NAMESPACE\n");
    }
}
