//! Support chat content that does not depend on the completion provider.

/// Instructions prepended to every completion request.
pub const SYSTEM_PROMPT: &str = "You are a friendly customer support assistant for La Vistique, a company that creates custom hand-painted pet portraits.

Key information:
- 100% satisfaction guarantee with unlimited revisions
- Full refund if not satisfied
- Free worldwide shipping
- 2-3 weeks delivery (hand-crafted)
- \"Skip the Line\" for priority processing
- Sizes: Small ($59.99), Medium ($79.99), Large ($109.99), Extra Large ($149.99)
- Optional frames: $24.99-$39.99

Be helpful, friendly, and concise (under 150 words).";

const REFUND_REPLY: &str = "We offer a 100% satisfaction guarantee! If you're not happy with your portrait, we'll work with you on unlimited revisions until you love it. If you're still not satisfied, we'll provide a full refund. Is there something specific about your order you'd like help with?";

const SHIPPING_REPLY: &str = "We offer free shipping on all orders! Standard delivery takes 2-3 weeks as each portrait is hand-crafted by our artists. Need it sooner? You can add our 'Skip the Line' option at checkout for priority processing.";

const HUMAN_REPLY: &str = "I'd be happy to connect you with our support team! Please provide your email address and a brief description of your question, and someone will get back to you within 24 hours.";

const PROCESS_REPLY: &str = "Our process is simple! 1) Choose a portrait style (Royal, Military, Renaissance, etc.) 2) Select your size and optional frame 3) Upload a clear photo of your pet 4) Our artists create your portrait 5) You'll receive a preview for approval 6) We ship it to you with free worldwide shipping!";

const PRICING_REPLY: &str = "Our portraits start at $59.99 for a Small (8\"x10\") canvas. Medium (12\"x16\") is $79.99, Large (18\"x24\") is $109.99, and Extra Large (24\"x36\") is $149.99. Optional frames range from $24.99 to $39.99. Free shipping included!";

const MENU_REPLY: &str = "Thanks for your message! I'm here to help with questions about our pet portraits. You can ask me about:\n\n\u{2022} Shipping and delivery times\n\u{2022} Returns and refunds\n\u{2022} How our process works\n\u{2022} Pricing and sizes\n\nHow can I help you today?";

/// Canned reply used when no completion provider is configured or it fails.
///
/// Keywords are checked in a fixed order and the first match wins.
#[must_use]
pub fn fallback_reply(message: &str) -> &'static str {
    let text = message.to_lowercase();
    let has = |word: &str| text.contains(word);

    if has("return") || has("refund") {
        REFUND_REPLY
    } else if has("shipping") || has("delivery") {
        SHIPPING_REPLY
    } else if has("human") || has("person") || has("agent") || has("speak") {
        HUMAN_REPLY
    } else if has("how") && has("work") {
        PROCESS_REPLY
    } else if has("price") || has("cost") {
        PRICING_REPLY
    } else {
        MENU_REPLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_keywords() {
        assert!(fallback_reply("Can I get a REFUND?").contains("satisfaction guarantee"));
        assert!(fallback_reply("how do returns work").contains("satisfaction guarantee"));
    }

    #[test]
    fn test_shipping_before_human() {
        let reply = fallback_reply("can a person tell me the delivery time");
        assert!(reply.contains("free shipping"));
    }

    #[test]
    fn test_human_handoff() {
        assert!(fallback_reply("I want to speak to someone").contains("support team"));
    }

    #[test]
    fn test_process_needs_both_words() {
        assert!(fallback_reply("How does this work?").starts_with("Our process is simple"));
        assert!(fallback_reply("how are you").starts_with("Thanks for your message"));
    }

    #[test]
    fn test_pricing() {
        assert!(fallback_reply("what does it cost").contains("$59.99"));
    }

    #[test]
    fn test_default_menu() {
        let reply = fallback_reply("");
        assert!(reply.contains("\u{2022} Pricing and sizes"));
    }

    #[test]
    fn test_system_prompt_is_short() {
        assert!(SYSTEM_PROMPT.split_whitespace().count() < 150);
    }
}
