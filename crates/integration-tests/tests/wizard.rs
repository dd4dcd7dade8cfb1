//! Portrait configurator flows.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use lavistique_core::wizard::{
    ATTR_COSTUME, ATTR_CUSTOMIZATION, ATTR_FRAME, ATTR_IMAGE, TOTAL_STEPS, WizardOptions,
    WizardProduct, WizardState, WizardStep,
};

fn portrait() -> WizardProduct {
    WizardProduct {
        id: "gid://shopify/ProductVariant/42".to_string(),
        handle: "royal-pet-portrait".to_string(),
        title: "Royal Pet Portrait".to_string(),
        base_price: Decimal::new(5999, 2),
    }
}

#[test]
fn test_full_flow_to_cart_attributes() {
    let options = WizardOptions::default();
    let mut wizard = WizardState::default();
    wizard.set_product(portrait());
    assert_eq!(wizard.total_price, Decimal::new(5999, 2));

    // Costume
    assert!(!wizard.can_go_next());
    let costume = options.costumes.first().cloned().unwrap();
    wizard.select_costume(costume.clone());
    assert!(wizard.can_go_next());
    wizard.next();
    assert_eq!(wizard.current_step, WizardStep::SizeFrame);

    // Size and frame
    assert!(wizard.variant_id().is_none());
    let size = options.sizes.last().cloned().unwrap();
    let frame = options.frames.first().cloned().unwrap();
    wizard.select_size(size.clone());
    wizard.select_frame(Some(frame.clone()));
    assert_eq!(wizard.total_price, size.price + frame.price);
    assert_eq!(wizard.variant_id(), Some("gid://shopify/ProductVariant/42"));
    wizard.next();

    // Photo
    assert!(!wizard.can_go_next());
    wizard.set_uploaded_image("https://cdn.example.com/rex.jpg".to_string(), "rex.jpg".to_string());
    wizard.next();
    assert_eq!(wizard.current_step, WizardStep::Review);
    assert_eq!(wizard.current_step.number(), TOTAL_STEPS);
    assert!(!wizard.can_go_next());

    let attributes = wizard.cart_attributes();
    let value = |key: &str| {
        attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    };
    assert_eq!(value(ATTR_COSTUME), Some(costume.id.as_str()));
    assert_eq!(value(ATTR_FRAME), Some(frame.id.as_str()));
    assert_eq!(value(ATTR_IMAGE), Some("https://cdn.example.com/rex.jpg"));
    assert!(value(ATTR_CUSTOMIZATION).is_some());
}

#[test]
fn test_removing_frame_lowers_total() {
    let options = WizardOptions::default();
    let mut wizard = WizardState::default();
    wizard.set_product(portrait());

    let size = options.sizes.first().cloned().unwrap();
    wizard.select_size(size.clone());
    wizard.select_frame(options.frames.first().cloned());
    assert!(wizard.total_price > size.price);

    wizard.select_frame(None);
    assert_eq!(wizard.total_price, size.price);
    assert!(
        wizard
            .cart_attributes()
            .iter()
            .all(|a| a.key != ATTR_FRAME)
    );
}

#[test]
fn test_navigation_is_clamped() {
    let mut wizard = WizardState::default();
    assert!(!wizard.can_go_previous());
    wizard.previous();
    assert_eq!(wizard.current_step, WizardStep::Costume);

    wizard.go_to(WizardStep::Review);
    wizard.next();
    assert_eq!(wizard.current_step, WizardStep::Review);
    assert!(wizard.can_go_previous());
}

#[test]
fn test_reset_clears_everything() {
    let options = WizardOptions::default();
    let mut wizard = WizardState::default();
    wizard.set_product(portrait());
    wizard.select_costume(options.costumes.first().cloned().unwrap());
    wizard.go_to(WizardStep::Photo);

    wizard.reset();
    assert_eq!(wizard, WizardState::default());
}

#[test]
fn test_session_json_shape() {
    let mut wizard = WizardState::default();
    wizard.go_to(WizardStep::SizeFrame);

    let json = serde_json::to_value(&wizard).unwrap();
    assert_eq!(json["currentStep"], "size-frame");
    assert_eq!(json["totalPrice"], "0");

    let back: WizardState = serde_json::from_value(json).unwrap();
    assert_eq!(back, wizard);
}

#[test]
fn test_option_lookup() {
    let options = WizardOptions::default();
    let first = options.sizes.first().unwrap();
    assert_eq!(options.size(&first.id), Some(first));
    assert!(options.size("poster").is_none());
    assert!(options.frame("none").is_none());
}
