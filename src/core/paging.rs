// LogRelay - core/paging.rs
//
// Reverse-and-paginate step of the query path.
// Out-of-range pages are not an error; they yield an empty slice with the
// correct totals so clients can still render page counts.

/// One page of lines plus the totals of the full filtered sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub lines: Vec<String>,
    pub total_lines: usize,
    pub total_pages: usize,
    pub current_page: usize,
}

/// Optionally reverse `lines` in place, then cut page `page` (1-based) of
/// `page_size` lines.
///
/// Callers validate `page >= 1` and `page_size >= 1`; a zero `page_size` is
/// treated as an empty result rather than a division by zero.
pub fn paginate(mut lines: Vec<String>, page: usize, page_size: usize, reverse: bool) -> Page {
    if reverse {
        lines.reverse();
    }

    let total_lines = lines.len();
    if page_size == 0 {
        return Page {
            lines: Vec::new(),
            total_lines,
            total_pages: 0,
            current_page: page,
        };
    }

    let total_pages = total_lines.div_ceil(page_size);
    let start = page.saturating_sub(1).saturating_mul(page_size);
    let page_lines = if start >= total_lines {
        Vec::new()
    } else {
        let end = start.saturating_add(page_size).min(total_lines);
        lines.drain(start..end).collect()
    };

    Page {
        lines: page_lines,
        total_lines,
        total_pages,
        current_page: page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_pages_over_2500_lines() {
        let page = paginate(numbered(2500), 1, 1000, false);
        assert_eq!(page.total_lines, 2500);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.lines.len(), 1000);
        assert_eq!(page.lines[0], "line 1");

        let last = paginate(numbered(2500), 3, 1000, false);
        assert_eq!(last.lines.len(), 500);
        assert_eq!(last.lines[499], "line 2500");

        let beyond = paginate(numbered(2500), 4, 1000, false);
        assert!(beyond.lines.is_empty());
        assert_eq!(beyond.total_lines, 2500);
        assert_eq!(beyond.total_pages, 3);
        assert_eq!(beyond.current_page, 4);
    }

    #[test]
    fn test_reverse_before_slicing() {
        let page = paginate(numbered(5), 1, 2, true);
        assert_eq!(page.lines, vec!["line 5", "line 4"]);
        let page = paginate(numbered(5), 3, 2, true);
        assert_eq!(page.lines, vec!["line 1"]);
    }

    #[test]
    fn test_unreversed_single_page_is_identity() {
        let lines = numbered(10);
        let page = paginate(lines.clone(), 1, 1000, false);
        assert_eq!(page.lines, lines);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_empty_input() {
        let page = paginate(Vec::new(), 1, 10, true);
        assert!(page.lines.is_empty());
        assert_eq!(page.total_lines, 0);
        assert_eq!(page.total_pages, 0);
    }
}
