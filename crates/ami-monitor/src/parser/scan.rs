//! Token-level scanners shared by the table parsers.
//!
//! The CLI output has no grammar as a whole, but a handful of fragments inside
//! it are regular enough to parse strictly: `HH:MM:SS` durations, the
//! `has N calls` queue header, `... was N secs ago` ages and `SIP/<digits>`
//! interfaces. Each scanner returns `None` on a miss so callers can skip the
//! field without giving up on the line.

use nom::{
    bytes::complete::{tag, tag_no_case, take_till, take_till1, take_while_m_n},
    character::complete::{char, digit1, space1},
    combinator::{all_consuming, map_res},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

type ParseResult<'a, O> = IResult<&'a str, O>;

fn two_digits(input: &str) -> ParseResult<u64> {
    map_res(take_while_m_n(2, 2, |c: char| c.is_ascii_digit()), |digits: &str| {
        digits.parse::<u64>()
    })(input)
}

fn number(input: &str) -> ParseResult<u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>())(input)
}

fn hms(input: &str) -> ParseResult<(u64, u64, u64)> {
    let (rest, (hours, _, minutes, _, seconds)) =
        tuple((two_digits, char(':'), two_digits, char(':'), two_digits))(input)?;
    Ok((rest, (hours, minutes, seconds)))
}

/// Total seconds of a `DD:DD:DD` token; the whole token must match.
pub fn hms_seconds(token: &str) -> Option<u64> {
    all_consuming(hms)(token)
        .ok()
        .map(|(_, (hours, minutes, seconds))| hours * 3600 + minutes * 60 + seconds)
}

/// First whitespace token of the line that reads as a duration
pub fn find_duration<'a>(mut tokens: impl Iterator<Item = &'a str>) -> Option<u64> {
    tokens.find_map(hms_seconds)
}

fn header(input: &str) -> ParseResult<(&str, u64)> {
    let (rest, name) = take_till1(char::is_whitespace)(input)?;
    let (rest, calls) = preceded(
        tuple((space1, tag("has"), space1)),
        terminated(number, tuple((space1, tag("call")))),
    )(rest)?;
    Ok((rest, (name, calls)))
}

/// `Q1 has 3 calls (max unlimited) ...` → `("Q1", 3)`
pub fn queue_header(line: &str) -> Option<(&str, u64)> {
    header(line.trim_start()).ok().map(|(_, found)| found)
}

fn age(input: &str) -> ParseResult<u64> {
    terminated(number, preceded(space1, tag_no_case("sec")))(input)
}

/// `N` out of `<keyword> was N secs ago`, matched case-insensitively
pub fn secs_ago(line: &str, keyword: &str) -> Option<u64> {
    let needle = format!("{} was ", keyword);
    let mut from = 0;
    while let Some(offset) = find_ignore_case(&line[from..], &needle) {
        let start = from + offset + needle.len();
        if let Ok((_, secs)) = age(&line[start..]) {
            return Some(secs);
        }
        from = start;
    }
    None
}

/// Digits following the first `<prefix><digits>` occurrence
pub fn interface_extension<'a>(line: &'a str, technology_prefix: &str) -> Option<&'a str> {
    line.match_indices(technology_prefix).find_map(|(index, _)| {
        let rest = &line[index + technology_prefix.len()..];
        digit1::<_, nom::error::Error<&str>>(rest).ok().map(|(_, digits)| digits)
    })
}

fn paren_group(input: &str) -> ParseResult<&str> {
    delimited(char('('), take_till(|c: char| c == ')'), char(')'))(input)
}

/// Contents of every closed `(...)` group, left to right. An unterminated
/// group ends the scan.
pub fn paren_groups(line: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find('(') {
        match paren_group(&rest[open..]) {
            Ok((after, inner)) => {
                groups.push(inner);
                rest = after;
            }
            Err(_) => break,
        }
    }
    groups
}

/// Byte offset of `needle` in `haystack`, ASCII case-insensitive
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    let hay = haystack.as_bytes();
    let pin = needle.as_bytes();
    hay.windows(pin.len())
        .position(|window| window.eq_ignore_ascii_case(pin))
        .filter(|&index| haystack.is_char_boundary(index))
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    find_ignore_case(haystack, needle).is_some()
}

pub fn starts_with_ignore_case(line: &str, prefix: &str) -> bool {
    line.len() >= prefix.len() && line.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hms_seconds() {
        assert_eq!(hms_seconds("00:01:23"), Some(83));
        assert_eq!(hms_seconds("02:00:05"), Some(7205));
        assert_eq!(hms_seconds("1:01:23"), None);
        assert_eq!(hms_seconds("00:01:23x"), None);
        assert_eq!(hms_seconds("Q1,t"), None);
    }

    #[test]
    fn test_find_duration_takes_first_match() {
        let line = "SIP/2020-00000001 from-internal 00:00:07 00:01:23";
        assert_eq!(find_duration(line.split_whitespace()), Some(7));
        assert_eq!(find_duration("SIP/2020 Up Queue".split_whitespace()), None);
    }

    #[test]
    fn test_queue_header() {
        assert_eq!(
            queue_header("Q1 has 3 calls (max unlimited) in 'rrmemory' strategy"),
            Some(("Q1", 3))
        );
        assert_eq!(queue_header("  Q17 has 1 call (max 10)"), Some(("Q17", 1)));
        assert_eq!(queue_header("Members:"), None);
        assert_eq!(queue_header("Q1 has many calls"), None);
    }

    #[test]
    fn test_secs_ago() {
        let line = "Ana (SIP/3001) (Not in use) has taken 4 calls (last was 120 secs ago) (login was 3600 secs ago)";
        assert_eq!(secs_ago(line, "last"), Some(120));
        assert_eq!(secs_ago(line, "login"), Some(3600));
        assert_eq!(secs_ago("(Login Was 9 Secs ago)", "login"), Some(9));
        assert_eq!(secs_ago("has taken no calls yet", "last"), None);
        assert_eq!(secs_ago("last was never, last was 5 secs ago", "last"), Some(5));
    }

    #[test]
    fn test_interface_extension() {
        assert_eq!(interface_extension("Ana (SIP/3001) (dynamic)", "SIP/"), Some("3001"));
        assert_eq!(interface_extension("SIP/3002 (Unavailable)", "SIP/"), Some("3002"));
        assert_eq!(interface_extension("SIP/trunk SIP/4001", "SIP/"), Some("4001"));
        assert_eq!(interface_extension("Local/3001@agents", "SIP/"), None);
    }

    #[test]
    fn test_paren_groups() {
        assert_eq!(
            paren_groups("Ana (SIP/3001) (paused:Lunch was 5 secs ago) (Not in use) has taken 1 calls"),
            ["SIP/3001", "paused:Lunch was 5 secs ago", "Not in use"]
        );
        assert_eq!(paren_groups("SIP/3002 () (Busy"), [""]);
        assert!(paren_groups("no groups here").is_empty());
    }

    #[test]
    fn test_case_helpers() {
        assert!(starts_with_ignore_case("MEMBERS:", "members:"));
        assert!(!starts_with_ignore_case("Mem", "members:"));
        assert_eq!(find_ignore_case("Ana (NOT IN USE)", "not in use"), Some(5));
        assert!(contains_ignore_case("(On Hold)", "on hold"));
    }
}
