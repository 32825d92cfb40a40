//! Persistence seams used by the recipe core.
//!
//! Every method that writes more than one row runs inside a single store
//! transaction: either all rows become visible or none do. Dropping the
//! returned future before it resolves rolls the transaction back.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    pagination::PageRequest,
    schema::{
        CartPart, Ingredient, IngredientId, MarkKind, Recipe, RecipeId, RecipePart, Tag, TagId,
        User, UserId,
    },
};

/// Ingredient line of a recipe about to be written, in insertion order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartRecord {
    pub ingredient_id: IngredientId,
    pub amount: i32,
}

/// Full write set of a recipe: the row itself plus every junction row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeRecord {
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub image: Option<String>,
    pub cooking_time: i32,
    pub parts: Vec<PartRecord>,
    pub tags: Vec<TagId>,
}

/// Recipe list filter with the viewer already resolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author: Option<UserId>,
    pub tags: Vec<String>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
}

/// Existence checks the validator depends on.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn ingredient_exists(&self, id: IngredientId) -> Result<bool, StoreError>;

    async fn tag_exists(&self, id: TagId) -> Result<bool, StoreError>;

    /// `except` skips the recipe being replaced.
    async fn recipe_name_taken(
        &self,
        author: UserId,
        name: &str,
        except: Option<RecipeId>,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait RecipeRepository: ReferenceLookup {
    async fn get_ingredients(&self, ids: &[IngredientId]) -> Result<Vec<Ingredient>, StoreError>;

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError>;

    /// Junction rows in insertion order.
    async fn list_recipe_parts(&self, id: RecipeId) -> Result<Vec<RecipePart>, StoreError>;

    async fn list_recipe_tags(&self, id: RecipeId) -> Result<Vec<Tag>, StoreError>;

    async fn insert_recipe(&self, record: &RecipeRecord) -> Result<Recipe, StoreError>;

    /// Deletes every junction row of `id` and inserts the ones in `record`.
    /// Returns `None` when the recipe no longer exists.
    async fn replace_recipe(
        &self,
        id: RecipeId,
        record: &RecipeRecord,
    ) -> Result<Option<Recipe>, StoreError>;

    /// Removes the recipe with its junction, favorite and cart rows.
    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError>;

    /// Newest first; returns the page and the total match count.
    async fn fetch_recipes(
        &self,
        query: &RecipeQuery,
        page: &PageRequest,
    ) -> Result<(Vec<Recipe>, i64), StoreError>;

    async fn list_author_recipes(
        &self,
        author: UserId,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, StoreError>;

    async fn count_author_recipes(&self, author: UserId) -> Result<i64, StoreError>;
}

#[async_trait]
pub trait MarkRepository: Send + Sync {
    async fn has_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError>;

    /// Insert-if-absent; `false` when the mark was already present.
    async fn insert_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError>;

    /// `false` when there was nothing to delete.
    async fn delete_mark(
        &self,
        kind: MarkKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn is_subscribed(&self, subscriber: UserId, author: UserId) -> Result<bool, StoreError>;

    async fn insert_subscription(
        &self,
        subscriber: UserId,
        author: UserId,
    ) -> Result<bool, StoreError>;

    async fn delete_subscription(
        &self,
        subscriber: UserId,
        author: UserId,
    ) -> Result<bool, StoreError>;

    /// Authors `subscriber` follows, ordered by username.
    async fn fetch_subscriptions(
        &self,
        subscriber: UserId,
        page: &PageRequest,
    ) -> Result<(Vec<User>, i64), StoreError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Every ingredient line of every recipe in `user`'s cart, unaggregated.
    async fn list_cart_parts(&self, user: UserId) -> Result<Vec<CartPart>, StoreError>;
}

pub trait Store: RecipeRepository + MarkRepository + SubscriptionRepository + CartRepository {}

impl<T> Store for T where T: RecipeRepository + MarkRepository + SubscriptionRepository + CartRepository
{}
