//! Cart helpers shared by the API and the cart page.

/// Variant of the "Skip the Line" priority-processing upsell.
pub const SKIP_THE_LINE_VARIANT_ID: &str = "gid://shopify/ProductVariant/skip-the-line";

/// Whether a cart line is the Skip the Line upsell, judged by its product.
#[must_use]
pub fn is_skip_the_line(product_title: &str, product_handle: &str) -> bool {
    product_title.to_lowercase().contains("skip the line")
        || product_handle.to_lowercase().contains("skip-the-line")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_title_case_insensitively() {
        assert!(is_skip_the_line("SKIP THE LINE", "priority"));
        assert!(is_skip_the_line("Skip the Line - Priority", ""));
    }

    #[test]
    fn test_matches_handle() {
        assert!(is_skip_the_line("Priority processing", "skip-the-line"));
        assert!(!is_skip_the_line("Custom Pet Portrait", "custom-pet-portrait"));
    }
}
