#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub identifier: String,
    pub localized_title: String,
    pub localized_description: String,
    /// Decimal price as formatted by the store, e.g. "0.99".
    pub price: String,
    pub price_locale: Option<String>,
    pub is_downloadable: bool,
}

impl Product {
    pub fn new(identifier: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            localized_title: String::new(),
            localized_description: String::new(),
            price: price.into(),
            price_locale: None,
            is_downloadable: false,
        }
    }
}

/// Answer to a product-info request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    /// Identifiers the store did not recognize.
    pub invalid_product_identifiers: Vec<String>,
}
