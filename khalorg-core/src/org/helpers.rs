use crate::timestamp::Timestamp;

/// Drop lines that hold nothing but active timestamps, then dedent.
///
/// Timestamps inside running text stay where they are.
pub fn remove_timestamps(body: &str) -> String {
    let lines: Vec<&str> = body
        .lines()
        .filter(|line| !is_timestamp_line(line))
        .collect();

    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let dedented: Vec<&str> = lines
        .iter()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect();

    dedented
        .join("\n")
        .trim_start_matches('\n')
        .trim_start()
        .trim_end()
        .to_string()
}

/// Whether `line` consists of active timestamps and whitespace only.
pub fn is_timestamp_line(line: &str) -> bool {
    let found = Timestamp::scan(line);
    if found.is_empty() || found.iter().any(|(_, ts)| !ts.active) {
        return false;
    }

    let mut rest = String::new();
    let mut last = 0;
    for (range, _) in &found {
        rest.push_str(&line[last..range.start]);
        last = range.end;
    }
    rest.push_str(&line[last..]);
    rest.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_lines_are_removed() {
        let body = "  <2023-01-01 Sun 10:00>--<2023-01-01 Sun 11:00>\n  <2023-01-08 Sun 10:00>\n  Agenda:\n    - item";
        assert_eq!(remove_timestamps(body), "Agenda:\n  - item");
    }

    #[test]
    fn test_inline_timestamps_stay() {
        let body = "  Moved from <2023-01-01 Sun> to today.";
        assert_eq!(remove_timestamps(body), "Moved from <2023-01-01 Sun> to today.");
    }

    #[test]
    fn test_inactive_timestamp_line_is_text() {
        assert!(!is_timestamp_line("[2023-01-01 Sun]"));
        assert!(is_timestamp_line("  <2023-01-01 Sun> <2023-01-02 Mon>  "));
        assert!(!is_timestamp_line(""));
    }

    #[test]
    fn test_empty_body_is_empty() {
        assert_eq!(remove_timestamps(""), "");
        assert_eq!(remove_timestamps("  <2023-01-01 Sun>\n"), "");
    }
}
