use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = i32;
pub type UserId = Id;
pub type TagId = Id;
pub type IngredientId = Id;
pub type RecipeId = Id;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,

    pub count: i64,
}

impl From<UserRow> for User {
    fn from(value: UserRow) -> Self {
        Self {
            id: value.id,
            email: value.email,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct RecipeRow {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,

    pub count: i64,
}

impl From<RecipeRow> for Recipe {
    fn from(value: RecipeRow) -> Self {
        Self {
            id: value.id,
            author_id: value.author_id,
            name: value.name,
            text: value.text,
            cooking_time: value.cooking_time,
            pub_date: value.pub_date,
            image: value.image,
        }
    }
}

/// Junction row joined with its ingredient.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipePart {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// One ingredient line of a carted recipe, before aggregation.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct CartPart {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Presence-only relations between a user and a recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Favorite,
    ShoppingCart,
}

impl MarkKind {
    pub fn table(&self) -> &'static str {
        match self {
            MarkKind::Favorite => "favorites",
            MarkKind::ShoppingCart => "shopping_cart",
        }
    }

    pub fn entity(&self) -> &'static str {
        match self {
            MarkKind::Favorite => "favorite",
            MarkKind::ShoppingCart => "shopping_cart_entry",
        }
    }
}
