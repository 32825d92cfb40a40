//! Request-scoped operations. Each one is a single unit of work against a [`Store`](crate::store::Store).

pub mod favorites;
pub mod recipes;
pub mod shopping_list;
pub mod subscriptions;

pub use favorites::{add_favorite, add_to_cart, remove_favorite, remove_from_cart};
pub use recipes::{create_recipe, delete_recipe, get_recipe, list_recipes, replace_recipe};
pub use shopping_list::{aggregate, export_shopping_list, ShoppingList, ShoppingListItem};
pub use subscriptions::{list_subscriptions, subscribe, unsubscribe};
