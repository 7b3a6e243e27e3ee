//! Cart line items.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product the shopper wants to put in the cart.
///
/// This is a [`CartItem`] without a quantity; the cart assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
}

impl NewCartItem {
    /// Turn this product into a cart line with the given quantity.
    #[must_use]
    pub fn with_quantity(self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity,
        }
    }
}

/// One product line in the cart.
///
/// Field names match the persisted JSON blob:
/// `{"id":"1","title":"A","image_url":"u","price":10,"quantity":1}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
    pub quantity: u32,
}

impl CartItem {
    /// Copy of this line with quantity raised by one.
    #[must_use]
    pub fn incremented(&self) -> Self {
        Self {
            quantity: self.quantity.saturating_add(1),
            ..self.clone()
        }
    }

    /// Copy of this line with quantity lowered by one, stopping at zero.
    #[must_use]
    pub fn decremented(&self) -> Self {
        Self {
            quantity: self.quantity.saturating_sub(1),
            ..self.clone()
        }
    }
}
