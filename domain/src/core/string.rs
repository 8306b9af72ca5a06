//! String utilities for the domain layer.

/// Reduce free text to a lowercase, hyphen-separated slug of at most
/// `max_len` bytes.
///
/// Non-alphanumeric runs collapse to a single hyphen; leading and trailing
/// hyphens are stripped. Used for memory context keys, where goals must map
/// to stable, comparable identifiers.
pub fn slugify(s: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(s.len().min(max_len));
    let mut last_was_hyphen = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
        if slug.len() >= max_len {
            break;
        }
    }
    slug.truncate(max_len);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(
            slugify("Search for wireless headphones", 50),
            "search-for-wireless-headphones"
        );
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Add to cart!!!  (now)", 50), "add-to-cart-now");
    }

    #[test]
    fn test_slugify_caps_length() {
        let slug = slugify("a very long goal description that keeps going on", 10);
        assert!(slug.len() <= 10);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_slugify_empty() {
        assert_eq!(slugify("", 50), "");
        assert_eq!(slugify("---", 50), "");
    }
}
