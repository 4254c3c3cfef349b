//! Longest-matching-blocks similarity (Ratcliff/Obershelp).

/// Similarity of two strings in `[0.0, 1.0]`.
///
/// Computed as `2 * M / T`, where `T` is the total number of characters in
/// both strings and `M` the number of characters in matching blocks, found by
/// recursively taking the longest common substring and matching what is left
/// on either side of it. Two empty strings are identical (`1.0`).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_characters(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Among equally long blocks the one starting earliest in `a` wins, then the
/// one starting earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run[j + 1] = length of the common run ending at a[i - 1], b[j]
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            current[j + 1] = if a[i] == b[j] { previous[j] + 1 } else { 0 };
            let k = current[j + 1];
            if k > best_size {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_size = k;
            }
        }
        std::mem::swap(&mut previous, &mut current);
        current[blo..=bhi].iter_mut().for_each(|v| *v = 0);
    }

    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_identical() {
        assert!(approx(similarity_ratio("radiohead ok computer", "radiohead ok computer"), 1.0));
        assert!(approx(similarity_ratio("", ""), 1.0));
    }

    #[test]
    fn test_disjoint() {
        assert!(approx(similarity_ratio("abc", "xyz"), 0.0));
        assert!(approx(similarity_ratio("abc", ""), 0.0));
    }

    #[test]
    fn test_known_ratios() {
        // "abcd" vs "bcde": block "bcd" -> 2 * 3 / 8
        assert!(approx(similarity_ratio("abcd", "bcde"), 0.75));
        // classic example: "abxcd" vs "abcd" -> "ab" + "cd" -> 2 * 4 / 9
        assert!(approx(similarity_ratio("abxcd", "abcd"), 8.0 / 9.0));
    }

    #[test]
    fn test_blocks_do_not_cross() {
        // after matching "ab", the trailing "a" of the second string has no
        // partner left on the right side of the first string
        assert!(approx(similarity_ratio("ab", "aba"), 0.8));
    }

    #[test]
    fn test_symmetric_for_simple_inputs() {
        let forward = similarity_ratio("the wall", "pink floyd the wall");
        let backward = similarity_ratio("pink floyd the wall", "the wall");
        assert!(approx(forward, backward));
        assert!(forward > 0.5 && forward < 1.0);
    }

    #[test]
    fn test_unicode_counts_characters() {
        assert!(approx(similarity_ratio("björk", "björk"), 1.0));
        assert!(approx(similarity_ratio("ö", "o"), 0.0));
    }
}
