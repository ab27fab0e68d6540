//! Filename ordering for comic pages.
//!
//! Pages are ordered by the number embedded in their name (`page_2` before
//! `page_10`), falling back to a natural, case-insensitive comparison.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Number(&'a str),
    Text(String),
}

fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(dot) if dot + 1 < filename.len() => &filename[..dot],
        _ => filename,
    }
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = input;
    while let Some(first) = rest.chars().next() {
        let digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        tokens.push(if digit { Token::Number(run) } else { Token::Text(run.to_lowercase()) });
        rest = tail;
    }
    tokens
}

/// Compare two digit runs by numeric value without parsing them.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// The last run of digits in the name without extension, if any.
#[must_use]
pub fn parse_sequence_number(filename: &str) -> Option<u64> {
    tokenize(strip_extension(filename))
        .into_iter()
        .rev()
        .find_map(|token| match token {
            Token::Number(digits) => digits.parse().ok(),
            Token::Text(_) => None,
        })
}

/// Natural ordering: digit runs compare numerically, text runs
/// case-insensitively, a number sorts before text, then shorter first.
#[must_use]
pub fn natural_compare(a: &str, b: &str) -> Ordering {
    let left = tokenize(a);
    let right = tokenize(b);
    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = match (l, r) {
            (Token::Number(x), Token::Number(y)) => compare_digits(x, y),
            (Token::Number(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Number(_)) => Ordering::Greater,
            (Token::Text(x), Token::Text(y)) => x.cmp(y),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len())
}

/// Ordering used when pages are first loaded.
#[must_use]
pub fn compare_by_sequence(a: &str, b: &str) -> Ordering {
    match (parse_sequence_number(a), parse_sequence_number(b)) {
        (Some(x), Some(y)) if x != y => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => natural_compare(a, b),
    }
}

/// Stable sort of `items` by the filename `name_of` extracts.
pub fn sort_by_sequence<T, F>(items: &mut [T], name_of: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| compare_by_sequence(name_of(a), name_of(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut names: Vec<String> = names.iter().map(ToString::to_string).collect();
        sort_by_sequence(&mut names, String::as_str);
        names
    }

    #[test]
    fn parses_trailing_and_leading_numbers() {
        assert_eq!(parse_sequence_number("page_001.png"), Some(1));
        assert_eq!(parse_sequence_number("foo-12.png"), Some(12));
        assert_eq!(parse_sequence_number("001_cover.png"), Some(1));
        assert_eq!(parse_sequence_number("ch2-page7.jpg"), Some(7));
    }

    #[test]
    fn no_number_yields_none() {
        assert_eq!(parse_sequence_number("cover-final.png"), None);
        // Extension digits do not count.
        assert_eq!(parse_sequence_number("cover.mp4"), None);
    }

    #[test]
    fn natural_order_compares_digit_runs_numerically() {
        let mut names = vec!["file2", "file10", "file1"];
        names.sort_by(|a, b| natural_compare(a, b));
        assert_eq!(names, ["file1", "file2", "file10"]);
    }

    #[test]
    fn natural_order_handles_huge_digit_runs() {
        assert_eq!(
            natural_compare("p99999999999999999999999", "p100000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(natural_compare("A", "a"), Ordering::Equal);
        assert_eq!(natural_compare("1a", "a"), Ordering::Less);
    }

    #[test]
    fn sorts_by_sequence_number() {
        assert_eq!(sorted(&["foo_10.png", "foo_2.png", "foo_1.png"]), ["foo_1.png", "foo_2.png", "foo_10.png"]);
    }

    #[test]
    fn numbered_pages_precede_unnumbered() {
        assert_eq!(sorted(&["cover.png", "page2.png"]), ["page2.png", "cover.png"]);
    }

    #[test]
    fn falls_back_to_natural_order() {
        assert_eq!(sorted(&["b.png", "a.png", "aa.png"]), ["a.png", "aa.png", "b.png"]);
    }
}
