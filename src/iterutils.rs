use std::collections::HashSet;
use std::hash::Hash;

/// Interleave `delim` between items, wrapping non-empty output in the
/// optional `prefix` and `suffix`.
pub fn tween<I, T>(items: I, delim: T, prefix: Option<T>, suffix: Option<T>) -> impl Iterator<Item = T>
where
    I: IntoIterator<Item = T>,
    T: Clone,
{
    let mut out = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i == 0 {
            if let Some(p) = &prefix {
                out.push(p.clone());
            }
        } else {
            out.push(delim.clone());
        }
        out.push(item);
    }
    if !out.is_empty()
        && let Some(s) = suffix
    {
        out.push(s);
    }
    out.into_iter()
}

/// Deduplicate while keeping first-seen order.
pub fn uniques<I, T>(items: I) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tween_with_prefix_and_suffix() {
        let out: Vec<&str> = tween(["a", "b"], ",", Some("("), Some(")")).collect();
        assert_eq!(out, ["(", "a", ",", "b", ")"]);
    }

    #[test]
    fn test_tween_empty_skips_affixes() {
        let out: Vec<&str> = tween(Vec::<&str>::new(), ",", Some("("), Some(")")).collect();
        assert!(out.is_empty());
    }

    #[test]
    fn test_uniques_keeps_order() {
        assert_eq!(uniques([3, 1, 3, 2, 1]), vec![3, 1, 2]);
    }
}
