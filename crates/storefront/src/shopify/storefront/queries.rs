//! GraphQL documents for the Shopify Storefront API.
//!
//! Fragments are concatenated into each document at compile time. Operation
//! names must stay in the `query Name(` / `mutation Name(` form so
//! [`super::with_context`] can localize them.

macro_rules! money_fragment {
    () => {
        r"
fragment MoneyFragment on MoneyV2 {
  amount
  currencyCode
}
"
    };
}

macro_rules! image_fragment {
    () => {
        r"
fragment ImageFragment on Image {
  id
  url
  altText
  width
  height
}
"
    };
}

macro_rules! variant_fragment {
    () => {
        r"
fragment ProductVariantFragment on ProductVariant {
  id
  title
  availableForSale
  price { ...MoneyFragment }
  compareAtPrice { ...MoneyFragment }
  selectedOptions { name value }
  image { ...ImageFragment }
  sku
}
"
    };
}

macro_rules! product_card_fields {
    () => {
        r"
  id
  handle
  title
  availableForSale
  featuredImage { ...ImageFragment }
  priceRange {
    minVariantPrice { ...MoneyFragment }
    maxVariantPrice { ...MoneyFragment }
  }
  compareAtPriceRange {
    minVariantPrice { ...MoneyFragment }
    maxVariantPrice { ...MoneyFragment }
  }
  collections(first: 10) { nodes { id } }
"
    };
}

macro_rules! cart_fragment {
    () => {
        r"
fragment CartFragment on Cart {
  id
  checkoutUrl
  totalQuantity
  lines(first: 100) {
    nodes {
      id
      quantity
      merchandise {
        ... on ProductVariant {
          id
          title
          product {
            id
            handle
            title
            featuredImage { ...ImageFragment }
          }
          price { ...MoneyFragment }
          compareAtPrice { ...MoneyFragment }
          selectedOptions { name value }
          image { ...ImageFragment }
        }
      }
      attributes { key value }
      cost {
        totalAmount { ...MoneyFragment }
        compareAtAmountPerQuantity { ...MoneyFragment }
      }
    }
  }
  cost {
    subtotalAmount { ...MoneyFragment }
    totalAmount { ...MoneyFragment }
    totalTaxAmount { ...MoneyFragment }
  }
  discountCodes { code applicable }
  discountAllocations {
    discountedAmount { ...MoneyFragment }
    ... on CartAutomaticDiscountAllocation { title }
    ... on CartCodeDiscountAllocation { code }
  }
  buyerIdentity { email countryCode }
  attributes { key value }
  note
}
"
    };
}

macro_rules! cart_mutation {
    ($name:literal, $args:literal, $field:literal, $call:literal) => {
        concat!(
            "mutation ",
            $name,
            "(",
            $args,
            ") {\n  ",
            $field,
            "(",
            $call,
            ") {\n    cart { ...CartFragment }\n    userErrors { field message code }\n  }\n}\n",
            cart_fragment!(),
            money_fragment!(),
            image_fragment!()
        )
    };
}

// =============================================================================
// Products
// =============================================================================

pub const GET_PRODUCTS: &str = concat!(
    r"
query GetProducts($first: Int = 20, $after: String) {
  products(first: $first, after: $after) {
    nodes {
",
    product_card_fields!(),
    r"
    }
    pageInfo { hasNextPage endCursor }
  }
}
",
    money_fragment!(),
    image_fragment!()
);

pub const GET_PRODUCT_BY_HANDLE: &str = concat!(
    r"
query GetProductByHandle($handle: String!) {
  product(handle: $handle) {
    id
    handle
    title
    description
    descriptionHtml
    availableForSale
    featuredImage { ...ImageFragment }
    images(first: 10) { nodes { ...ImageFragment } }
    options { id name optionValues { name } }
    variants(first: 100) { nodes { ...ProductVariantFragment } }
    priceRange {
      minVariantPrice { ...MoneyFragment }
      maxVariantPrice { ...MoneyFragment }
    }
    compareAtPriceRange {
      minVariantPrice { ...MoneyFragment }
      maxVariantPrice { ...MoneyFragment }
    }
    collections(first: 10) { nodes { id handle title } }
    seo { title description }
    tags
    vendor
    productType
    createdAt
    updatedAt
  }
}
",
    variant_fragment!(),
    money_fragment!(),
    image_fragment!()
);

pub const SEARCH_PRODUCTS: &str = concat!(
    r"
query SearchProducts($query: String!, $first: Int = 20, $after: String) {
  search(query: $query, first: $first, after: $after, types: [PRODUCT]) {
    nodes {
      ... on Product {
",
    product_card_fields!(),
    r"
      }
    }
    pageInfo { hasNextPage endCursor }
  }
}
",
    money_fragment!(),
    image_fragment!()
);

// =============================================================================
// Collections
// =============================================================================

pub const GET_COLLECTIONS: &str = concat!(
    r"
query GetCollections($first: Int = 20) {
  collections(first: $first) {
    nodes {
      id
      handle
      title
      image { ...ImageFragment }
    }
    pageInfo { hasNextPage endCursor }
  }
}
",
    image_fragment!()
);

pub const GET_COLLECTION_BY_HANDLE: &str = concat!(
    r"
query GetCollectionByHandle($handle: String!, $first: Int = 20, $after: String) {
  collection(handle: $handle) {
    id
    handle
    title
    description
    descriptionHtml
    image { ...ImageFragment }
    products(first: $first, after: $after) {
      nodes {
",
    product_card_fields!(),
    r"
      }
      pageInfo { hasNextPage endCursor }
    }
    seo { title description }
    updatedAt
  }
}
",
    money_fragment!(),
    image_fragment!()
);

// =============================================================================
// Cart
// =============================================================================

pub const GET_CART: &str = concat!(
    r"
query GetCart($cartId: ID!) {
  cart(id: $cartId) { ...CartFragment }
}
",
    cart_fragment!(),
    money_fragment!(),
    image_fragment!()
);

pub const CREATE_CART: &str =
    cart_mutation!("CreateCart", "$input: CartInput!", "cartCreate", "input: $input");

pub const ADD_CART_LINES: &str = cart_mutation!(
    "AddCartLines",
    "$cartId: ID!, $lines: [CartLineInput!]!",
    "cartLinesAdd",
    "cartId: $cartId, lines: $lines"
);

pub const UPDATE_CART_LINES: &str = cart_mutation!(
    "UpdateCartLines",
    "$cartId: ID!, $lines: [CartLineUpdateInput!]!",
    "cartLinesUpdate",
    "cartId: $cartId, lines: $lines"
);

pub const REMOVE_CART_LINES: &str = cart_mutation!(
    "RemoveCartLines",
    "$cartId: ID!, $lineIds: [ID!]!",
    "cartLinesRemove",
    "cartId: $cartId, lineIds: $lineIds"
);

pub const UPDATE_CART_DISCOUNT_CODES: &str = cart_mutation!(
    "UpdateCartDiscountCodes",
    "$cartId: ID!, $discountCodes: [String!]!",
    "cartDiscountCodesUpdate",
    "cartId: $cartId, discountCodes: $discountCodes"
);

pub const UPDATE_CART_BUYER_IDENTITY: &str = cart_mutation!(
    "UpdateCartBuyerIdentity",
    "$cartId: ID!, $buyerIdentity: CartBuyerIdentityInput!",
    "cartBuyerIdentityUpdate",
    "cartId: $cartId, buyerIdentity: $buyerIdentity"
);

pub const UPDATE_CART_NOTE: &str = cart_mutation!(
    "UpdateCartNote",
    "$cartId: ID!, $note: String!",
    "cartNoteUpdate",
    "cartId: $cartId, note: $note"
);

pub const UPDATE_CART_ATTRIBUTES: &str = cart_mutation!(
    "UpdateCartAttributes",
    "$cartId: ID!, $attributes: [AttributeInput!]!",
    "cartAttributesUpdate",
    "cartId: $cartId, attributes: $attributes"
);
