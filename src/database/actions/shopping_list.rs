use std::{collections::BTreeMap, vec};

use log::debug;
use serde::Serialize;

use crate::{
    constants::SHOPPING_LIST_HEADING,
    document::{Document, DocumentRenderer},
    error::RecipeError,
    schema::{CartPart, UserId},
    store::CartRepository,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub total_amount: i64,
}

/// Ingredient totals across a user's cart, ordered by name then unit.
/// Consumed once; call [`aggregate`] again for a fresh copy.
#[derive(Debug)]
pub struct ShoppingList {
    items: vec::IntoIter<ShoppingListItem>,
}

impl ShoppingList {
    /// Sums amounts per (name, unit). Same name with a different unit stays a separate line.
    pub fn from_parts(parts: Vec<CartPart>) -> Self {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for part in parts {
            *totals.entry((part.name, part.measurement_unit)).or_default() += i64::from(part.amount);
        }

        let items: Vec<ShoppingListItem> = totals
            .into_iter()
            .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
                name,
                measurement_unit,
                total_amount,
            })
            .collect();

        Self {
            items: items.into_iter(),
        }
    }
}

impl Iterator for ShoppingList {
    type Item = ShoppingListItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for ShoppingList {}

pub async fn aggregate<S>(store: &S, user: UserId) -> Result<ShoppingList, RecipeError>
where
    S: CartRepository + ?Sized,
{
    let parts = store.list_cart_parts(user).await?;
    debug!("Aggregating {} cart lines for user {user}", parts.len());

    Ok(ShoppingList::from_parts(parts))
}

pub async fn export_shopping_list<S, R>(
    store: &S,
    user: UserId,
    renderer: &R,
) -> Result<Document, RecipeError>
where
    S: CartRepository + ?Sized,
    R: DocumentRenderer + ?Sized,
{
    let list = aggregate(store, user).await?;
    let body = renderer.render(SHOPPING_LIST_HEADING, list)?;

    Ok(Document::new(renderer, body))
}
