//! Redis `KEYS` glob semantics: `*`, `?`, `[set]`, `[^set]`, `[a-z]` and
//! backslash escapes.

pub fn glob_match(pattern: &str, input: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = input.chars().collect();

    let mut p = 0;
    let mut i = 0;
    let mut star_idx: Option<usize> = None;
    let mut match_idx = 0;

    while i < input.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star_idx = Some(p);
            match_idx = i;
            p += 1;
            continue;
        }

        if p < pattern.len()
            && let Some(next) = match_single(&pattern, p, input[i])
        {
            p = next;
            i += 1;
        } else if let Some(star) = star_idx {
            p = star + 1;
            match_idx += 1;
            i = match_idx;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}

/// Matches one input character against the pattern token at `p`, returning
/// the index of the next token on success.
fn match_single(pattern: &[char], p: usize, ch: char) -> Option<usize> {
    match pattern[p] {
        '?' => Some(p + 1),
        '\\' if p + 1 < pattern.len() => (pattern[p + 1] == ch).then_some(p + 2),
        '[' => match_class(pattern, p, ch),
        literal => (literal == ch).then_some(p + 1),
    }
}

fn match_class(pattern: &[char], start: usize, ch: char) -> Option<usize> {
    let mut p = start + 1;
    let negate = p < pattern.len() && pattern[p] == '^';
    if negate {
        p += 1;
    }

    let mut matched = false;
    while p < pattern.len() && pattern[p] != ']' {
        if pattern[p] == '\\' && p + 1 < pattern.len() {
            matched |= pattern[p + 1] == ch;
            p += 2;
        } else if p + 2 < pattern.len() && pattern[p + 1] == '-' && pattern[p + 2] != ']' {
            let (low, high) = if pattern[p] <= pattern[p + 2] {
                (pattern[p], pattern[p + 2])
            } else {
                (pattern[p + 2], pattern[p])
            };
            matched |= low <= ch && ch <= high;
            p += 3;
        } else {
            matched |= pattern[p] == ch;
            p += 1;
        }
    }

    // An unterminated class is treated as a literal '['.
    if p >= pattern.len() {
        return (ch == '[').then_some(start + 1);
    }

    (matched != negate).then_some(p + 1)
}

#[cfg(test)]
mod tests {
    use super::glob_match;

    #[test]
    fn star_matches_any_suffix() {
        assert!(glob_match("FAN_INFO|*", "FAN_INFO|PSU1-Fan1"));
        assert!(glob_match("PSU_INFO|PSU*", "PSU_INFO|PSU 1"));
        assert!(!glob_match("PSU_INFO|PSU*", "FAN_INFO|PSU1"));
        assert!(glob_match("CRM:ACL_STATS:*", "CRM:ACL_STATS:INGRESS:PORT"));
    }

    #[test]
    fn question_mark_and_classes() {
        assert!(glob_match("h?llo", "hello"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("Ethernet[0-4]", "Ethernet3"));
        assert!(!glob_match("Ethernet[0-4]", "Ethernet8"));
    }

    #[test]
    fn escaped_metacharacters_are_literal() {
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
    }
}
