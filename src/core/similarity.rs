/// Symbols that carry meaning in skill names (C++, C#, Node.js, Objective-C)
const ALLOWED_SYMBOLS: [char; 4] = ['+', '#', '.', '-'];

/// Normalize a skill name for comparison
///
/// Lowercases, drops every character outside letters, digits, whitespace and
/// `+ # . -`, then collapses runs of whitespace and trims.
///
/// # Examples
/// ```
/// use skillsync::core::similarity::normalize;
///
/// assert_eq!(normalize("  Node.JS  "), "node.js");
/// assert_eq!(normalize("C++ (Modern)"), "c++ modern");
/// ```
pub fn normalize(name: &str) -> String {
    let filtered: String = name
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_alphanumeric() || ALLOWED_SYMBOLS.contains(&c) {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Similarity of two skill names in [0, 1]
///
/// Insertion/deletion edit distance over the normalized forms, scaled by the
/// combined length: `1 - indel / (len_a + len_b)`, equivalently
/// `2 * lcs / (len_a + len_b)`. Symmetric; identical normalized strings
/// score 1.0.
pub fn fuzzy_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = normalize(a).chars().collect();
    let b: Vec<char> = normalize(b).chars().collect();

    if a == b {
        return 1.0;
    }

    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let lcs = longest_common_subsequence(&a, &b);
    (2.0 * lcs as f64 / total as f64).clamp(0.0, 1.0)
}

/// Length of the longest common subsequence, two-row dynamic programming
fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
