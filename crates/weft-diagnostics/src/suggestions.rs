// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Did-you-mean suggestions for misspelled protocol members.

/// Levenshtein distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, a_ch) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != *b_ch);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest name to `name` among `candidates`, if one is close enough.
pub fn closest<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    // Protocol member names are long; allow a few typos.
    let max_distance = match name.len() {
        0..=2 => 1,
        3..=5 => 2,
        6..=12 => 3,
        _ => 4,
    };

    let mut best: Option<(&str, usize)> = None;
    for candidate in candidates {
        if name.len().abs_diff(candidate.len()) > max_distance {
            continue;
        }
        let dist = edit_distance(name, candidate);
        if dist <= max_distance && best.map_or(true, |(_, d)| dist < d) {
            best = Some((candidate, dist));
        }
    }
    best.map(|(closest, _)| closest)
}

/// `did you mean `closest`?` for a near miss.
pub fn did_you_mean<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    closest(name, candidates).map(|c| format!("did you mean `{}`?", c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_misses_are_suggested() {
        let members = ["GetAsyncEnumerater", "ToString", "Count"];
        assert_eq!(
            did_you_mean("GetAsyncEnumerator", members.iter().copied()),
            Some("did you mean `GetAsyncEnumerater`?".to_string())
        );
        assert_eq!(did_you_mean("MoveNextAsync", members.iter().copied()), None);
    }

    #[test]
    fn distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("Current", "Current"), 0);
    }
}
