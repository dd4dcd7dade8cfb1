//! Portrait configurator.
//!
//! Shoppers build a custom portrait in four steps: pick a costume style, pick
//! a size and optional frame, upload a photo of their pet, then review. The
//! state is kept per visitor and turned into a cart line (variant plus line
//! attributes) at the end.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Line attribute holding the chosen costume style.
pub const ATTR_COSTUME: &str = "_costume_style";
/// Line attribute holding the chosen frame.
pub const ATTR_FRAME: &str = "_frame_option";
/// Line attribute holding the uploaded photo URL.
pub const ATTR_IMAGE: &str = "_customization_image";
/// Visible attribute shown at checkout.
pub const ATTR_CUSTOMIZATION: &str = "Customization";
/// Value of [`ATTR_CUSTOMIZATION`].
pub const CUSTOMIZATION_LABEL: &str = "Custom pet portrait";

/// A configurator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStep {
    #[default]
    Costume,
    SizeFrame,
    Photo,
    Review,
}

impl WizardStep {
    /// Steps in the order shoppers walk through them.
    pub const ORDER: [Self; 4] = [Self::Costume, Self::SizeFrame, Self::Photo, Self::Review];

    /// Zero-based position.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Costume => 0,
            Self::SizeFrame => 1,
            Self::Photo => 2,
            Self::Review => 3,
        }
    }

    /// One-based position for display ("Step 2 of 4").
    #[must_use]
    pub const fn number(self) -> usize {
        self.index() + 1
    }

    const fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Costume,
            1 => Self::SizeFrame,
            2 => Self::Photo,
            _ => Self::Review,
        }
    }
}

/// Number of configurator steps.
pub const TOTAL_STEPS: usize = WizardStep::ORDER.len();

/// Canvas size choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeOption {
    pub id: String,
    pub label: String,
    pub dimensions: String,
    pub price: Decimal,
}

/// Frame choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameOption {
    pub id: String,
    pub label: String,
    pub price: Decimal,
    /// Swatch color (hex).
    pub color: Option<String>,
}

/// Costume style choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostumeOption {
    pub id: String,
    pub label: String,
    pub image_url: String,
}

/// Product the shopper is configuring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub base_price: Decimal,
}

/// Uploaded pet photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub url: String,
    pub name: String,
}

/// A `key`/`value` line attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAttribute {
    pub key: String,
    pub value: String,
}

impl LineAttribute {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Configurator state for one visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    pub current_step: WizardStep,
    pub product: Option<WizardProduct>,
    pub costume: Option<CostumeOption>,
    pub size: Option<SizeOption>,
    pub frame: Option<FrameOption>,
    pub image: Option<UploadedImage>,
    pub total_price: Decimal,
}

impl WizardState {
    /// Jump directly to a step.
    pub const fn go_to(&mut self, step: WizardStep) {
        self.current_step = step;
    }

    /// Advance one step; stays on the last step.
    pub const fn next(&mut self) {
        let index = self.current_step.index() + 1;
        let last = TOTAL_STEPS - 1;
        self.current_step = WizardStep::from_index(if index > last { last } else { index });
    }

    /// Go back one step; stays on the first step.
    pub const fn previous(&mut self) {
        self.current_step = WizardStep::from_index(self.current_step.index().saturating_sub(1));
    }

    /// Whether the current step has what it needs to move on.
    #[must_use]
    pub const fn can_go_next(&self) -> bool {
        match self.current_step {
            WizardStep::Costume => self.costume.is_some(),
            WizardStep::SizeFrame => self.size.is_some(),
            WizardStep::Photo => self.image.is_some(),
            WizardStep::Review => false,
        }
    }

    #[must_use]
    pub const fn can_go_previous(&self) -> bool {
        self.current_step.index() > 0
    }

    #[must_use]
    pub const fn step_index(&self) -> usize {
        self.current_step.index()
    }

    /// Start configuring a product. The total resets to its base price.
    pub fn set_product(&mut self, product: WizardProduct) {
        self.total_price = product.base_price;
        self.product = Some(product);
    }

    pub fn select_costume(&mut self, costume: CostumeOption) {
        self.costume = Some(costume);
    }

    pub fn select_size(&mut self, size: SizeOption) {
        self.size = Some(size);
        self.total_price = self.calculate_total();
    }

    /// Choose a frame, or `None` for no frame.
    pub fn select_frame(&mut self, frame: Option<FrameOption>) {
        self.frame = frame;
        self.total_price = self.calculate_total();
    }

    pub fn set_uploaded_image(&mut self, url: String, name: String) {
        self.image = Some(UploadedImage { url, name });
    }

    pub fn clear_uploaded_image(&mut self) {
        self.image = None;
    }

    /// Throw away every choice and return to the first step.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Size price (or the product base price) plus the frame price.
    #[must_use]
    pub fn calculate_total(&self) -> Decimal {
        let base = self.size.as_ref().map_or_else(
            || self.product.as_ref().map_or(Decimal::ZERO, |p| p.base_price),
            |s| s.price,
        );
        base + self.frame.as_ref().map_or(Decimal::ZERO, |f| f.price)
    }

    /// Merchandise to add to the cart, once a product and size are chosen.
    #[must_use]
    pub fn variant_id(&self) -> Option<&str> {
        match (&self.product, &self.size) {
            (Some(product), Some(_)) => Some(product.id.as_str()),
            _ => None,
        }
    }

    /// Line attributes describing the customization.
    #[must_use]
    pub fn cart_attributes(&self) -> Vec<LineAttribute> {
        let mut attributes = Vec::with_capacity(4);
        if let Some(costume) = &self.costume {
            attributes.push(LineAttribute::new(ATTR_COSTUME, &costume.id));
        }
        if let Some(frame) = &self.frame {
            attributes.push(LineAttribute::new(ATTR_FRAME, &frame.id));
        }
        if let Some(image) = &self.image {
            attributes.push(LineAttribute::new(ATTR_IMAGE, &image.url));
        }
        attributes.push(LineAttribute::new(ATTR_CUSTOMIZATION, CUSTOMIZATION_LABEL));
        attributes
    }
}

/// Costume, size, and frame choices offered on product pages.
#[derive(Debug, Clone, Serialize)]
pub struct WizardOptions {
    pub costumes: Vec<CostumeOption>,
    pub sizes: Vec<SizeOption>,
    pub frames: Vec<FrameOption>,
}

impl WizardOptions {
    /// Find a costume by id.
    #[must_use]
    pub fn costume(&self, id: &str) -> Option<&CostumeOption> {
        self.costumes.iter().find(|c| c.id == id)
    }

    /// Find a size by id.
    #[must_use]
    pub fn size(&self, id: &str) -> Option<&SizeOption> {
        self.sizes.iter().find(|s| s.id == id)
    }

    /// Find a frame by id.
    #[must_use]
    pub fn frame(&self, id: &str) -> Option<&FrameOption> {
        self.frames.iter().find(|f| f.id == id)
    }
}

impl Default for WizardOptions {
    fn default() -> Self {
        let costume = |id: &str, label: &str| CostumeOption {
            id: id.to_string(),
            label: label.to_string(),
            image_url: format!("/static/costumes/{id}.jpg"),
        };
        let size = |id: &str, label: &str, dimensions: &str, cents: i64| SizeOption {
            id: id.to_string(),
            label: label.to_string(),
            dimensions: dimensions.to_string(),
            price: Decimal::new(cents, 2),
        };
        let frame = |id: &str, label: &str, cents: i64, color: &str| FrameOption {
            id: id.to_string(),
            label: label.to_string(),
            price: Decimal::new(cents, 2),
            color: Some(color.to_string()),
        };

        Self {
            costumes: vec![
                costume("royal-king", "Royal King"),
                costume("royal-queen", "Royal Queen"),
                costume("general", "General"),
                costume("duke", "Duke"),
                costume("renaissance", "Renaissance"),
                costume("victorian", "Victorian"),
            ],
            sizes: vec![
                size("small", "Small", "8\" x 10\"", 5999),
                size("medium", "Medium", "12\" x 16\"", 7999),
                size("large", "Large", "18\" x 24\"", 10999),
                size("xl", "Extra Large", "24\" x 36\"", 14999),
            ],
            frames: vec![
                frame("black", "Classic Black", 2499, "#1a1a1a"),
                frame("gold", "Gold Ornate", 3999, "#c9a227"),
                frame("white", "Modern White", 2499, "#f5f5f5"),
                frame("walnut", "Walnut Wood", 3499, "#5d4037"),
            ],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> WizardProduct {
        WizardProduct {
            id: "gid://shopify/ProductVariant/1".to_string(),
            handle: "custom-pet-portrait".to_string(),
            title: "Custom Pet Portrait".to_string(),
            base_price: Decimal::new(4999, 2),
        }
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut state = WizardState::default();
        state.previous();
        assert_eq!(state.current_step, WizardStep::Costume);
        assert!(!state.can_go_previous());

        for _ in 0..10 {
            state.next();
        }
        assert_eq!(state.current_step, WizardStep::Review);
        assert_eq!(state.step_index(), 3);
        assert_eq!(state.current_step.number(), TOTAL_STEPS);
    }

    #[test]
    fn test_can_go_next_per_step() {
        let options = WizardOptions::default();
        let mut state = WizardState::default();
        assert!(!state.can_go_next());

        state.select_costume(options.costume("duke").unwrap().clone());
        assert!(state.can_go_next());

        state.next();
        assert!(!state.can_go_next());
        state.select_size(options.size("small").unwrap().clone());
        assert!(state.can_go_next());

        state.next();
        assert!(!state.can_go_next());
        state.set_uploaded_image("https://cdn.example/rex.jpg".into(), "rex.jpg".into());
        assert!(state.can_go_next());

        state.next();
        assert!(!state.can_go_next());
    }

    #[test]
    fn test_total_uses_size_or_base_price_plus_frame() {
        let options = WizardOptions::default();
        let mut state = WizardState::default();
        state.set_product(product());
        assert_eq!(state.total_price, Decimal::new(4999, 2));

        state.select_frame(options.frame("gold").cloned());
        assert_eq!(state.total_price, Decimal::new(8998, 2));

        state.select_size(options.size("large").unwrap().clone());
        assert_eq!(state.total_price, Decimal::new(14998, 2));

        state.select_frame(None);
        assert_eq!(state.total_price, Decimal::new(10999, 2));
    }

    #[test]
    fn test_variant_requires_product_and_size() {
        let options = WizardOptions::default();
        let mut state = WizardState::default();
        state.select_size(options.size("small").unwrap().clone());
        assert_eq!(state.variant_id(), None);

        state.set_product(product());
        assert_eq!(state.variant_id(), Some("gid://shopify/ProductVariant/1"));
    }

    #[test]
    fn test_cart_attributes() {
        let options = WizardOptions::default();
        let mut state = WizardState::default();
        assert_eq!(
            state.cart_attributes(),
            vec![LineAttribute::new(ATTR_CUSTOMIZATION, CUSTOMIZATION_LABEL)]
        );

        state.select_costume(options.costume("victorian").unwrap().clone());
        state.select_frame(options.frame("walnut").cloned());
        state.set_uploaded_image("https://cdn.example/rex.jpg".into(), "rex.jpg".into());

        let keys: Vec<_> = state
            .cart_attributes()
            .into_iter()
            .map(|a| (a.key, a.value))
            .collect();
        assert_eq!(
            keys,
            vec![
                (ATTR_COSTUME.to_string(), "victorian".to_string()),
                (ATTR_FRAME.to_string(), "walnut".to_string()),
                (ATTR_IMAGE.to_string(), "https://cdn.example/rex.jpg".to_string()),
                (ATTR_CUSTOMIZATION.to_string(), CUSTOMIZATION_LABEL.to_string()),
            ]
        );
    }

    #[test]
    fn test_reset_and_clear_image() {
        let mut state = WizardState::default();
        state.set_product(product());
        state.set_uploaded_image("u".into(), "n".into());
        state.clear_uploaded_image();
        assert!(state.image.is_none());

        state.next();
        state.reset();
        assert_eq!(state, WizardState::default());
    }

    #[test]
    fn test_step_serializes_kebab_case() {
        let json = serde_json::to_string(&WizardStep::SizeFrame).unwrap();
        assert_eq!(json, "\"size-frame\"");
    }
}
