use super::product::Product;

/// Request to purchase a product, handed to the payment queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub product_identifier: String,
    pub quantity: u32,
    /// Opaque identifier for the user's account in the app.
    pub application_username: Option<String>,
}

impl Payment {
    pub fn new(product_identifier: impl Into<String>) -> Self {
        Self {
            product_identifier: product_identifier.into(),
            quantity: 1,
            application_username: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_application_username(mut self, username: impl Into<String>) -> Self {
        self.application_username = Some(username.into());
        self
    }
}

impl From<&Product> for Payment {
    fn from(product: &Product) -> Self {
        Payment::new(product.identifier.clone())
    }
}

impl From<&str> for Payment {
    fn from(product_identifier: &str) -> Self {
        Payment::new(product_identifier)
    }
}
