use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
}

/// Locally held view of the remote cart.
///
/// Lines keep first-add order and never share a product id. The only mutators are
/// [`Cart::merge`], [`Cart::remove`] and [`Cart::clear`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    pub fn total_quantity(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Folds an accepted add into the cart and returns the resulting line.
    ///
    /// A repeated product id accumulates quantity and keeps the name it was first added with.
    pub fn merge(
        &mut self,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
    ) -> &CartLine {
        let index = match self.lines.iter().position(|line| line.product_id == product_id) {
            Some(index) => {
                let existing = &mut self.lines[index];
                existing.quantity = existing.quantity.saturating_add(quantity);
                index
            }
            None => {
                self.lines.push(CartLine {
                    product_id,
                    product_name: product_name.into(),
                    quantity,
                });
                self.lines.len() - 1
            }
        };
        &self.lines[index]
    }

    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self.lines.iter().position(|line| &line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
