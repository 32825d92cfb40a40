//! Read-side projections returned to the HTTP layer.
//!
//! Every per-viewer flag is computed against the store; for an anonymous
//! viewer all of them are `false`.

use serde::{Deserialize, Serialize};

use crate::{
    constants::RECIPES_LIMIT_QUERY_PARAM,
    error::{RecipeError, TypeError},
    form::Form,
    schema::{IngredientId, MarkKind, Recipe, RecipeId, Tag, User, UserId},
    session::Viewer,
    store::{RecipeQuery, Store},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorView {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeIngredientView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeView {
    pub id: RecipeId,
    pub tags: Vec<Tag>,
    pub author: AuthorView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact recipe used by toggles and subscription listings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ShortRecipe {
    pub id: RecipeId,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i32,
}

impl From<Recipe> for ShortRecipe {
    fn from(value: Recipe) -> Self {
        Self {
            id: value.id,
            name: value.name,
            image: value.image,
            cooking_time: value.cooking_time,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: AuthorView,
    pub recipes: Vec<ShortRecipe>,
    pub recipes_count: i64,
}

/// Recipe list filter as read from the query string.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    /// Tag slugs; a recipe matches when it carries any of them.
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_form(form: &Form) -> Result<Self, TypeError> {
        Ok(Self {
            author: form.get_number("author")?,
            tags: form.get_list("tags")?,
            is_favorited: form.get_flag("is_favorited")?,
            is_in_shopping_cart: form.get_flag("is_in_shopping_cart")?,
        })
    }

    /// Binds the viewer-relative flags. They have no meaning for anonymous viewers and are dropped.
    pub fn resolve(&self, viewer: Viewer) -> RecipeQuery {
        let user = viewer.user_id();

        RecipeQuery {
            author: self.author,
            tags: self.tags.to_owned(),
            favorited_by: user.filter(|_| self.is_favorited),
            in_cart_of: user.filter(|_| self.is_in_shopping_cart),
        }
    }
}

/// Optional cap on recipes listed per author in subscription views.
pub fn recipes_limit(form: &Form) -> Result<Option<i64>, TypeError> {
    match form.get_number::<i64>(RECIPES_LIMIT_QUERY_PARAM)? {
        Some(limit) if limit < 0 => Err(TypeError::new("Invalid recipes_limit")),
        limit => Ok(limit),
    }
}

pub async fn author_view<S>(store: &S, viewer: Viewer, user: User) -> Result<AuthorView, RecipeError>
where
    S: Store + ?Sized,
{
    let is_subscribed = match viewer.user_id() {
        Some(id) => store.is_subscribed(id, user.id).await?,
        None => false,
    };

    Ok(AuthorView {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed,
    })
}

async fn has_mark<S>(
    store: &S,
    kind: MarkKind,
    viewer: Viewer,
    recipe: RecipeId,
) -> Result<bool, RecipeError>
where
    S: Store + ?Sized,
{
    match viewer.user_id() {
        Some(user) => Ok(store.has_mark(kind, user, recipe).await?),
        None => Ok(false),
    }
}

pub async fn recipe_view<S>(store: &S, viewer: Viewer, recipe: Recipe) -> Result<RecipeView, RecipeError>
where
    S: Store + ?Sized,
{
    let author = store
        .get_user(recipe.author_id)
        .await?
        .ok_or(RecipeError::NotFound {
            entity: "user",
            id: recipe.author_id,
        })?;

    let ingredients = store
        .list_recipe_parts(recipe.id)
        .await?
        .into_iter()
        .map(|part| RecipeIngredientView {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        })
        .collect();

    Ok(RecipeView {
        id: recipe.id,
        tags: store.list_recipe_tags(recipe.id).await?,
        author: author_view(store, viewer, author).await?,
        ingredients,
        is_favorited: has_mark(store, MarkKind::Favorite, viewer, recipe.id).await?,
        is_in_shopping_cart: has_mark(store, MarkKind::ShoppingCart, viewer, recipe.id).await?,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
    })
}

/// `recipes_limit` truncates the listed recipes; `recipes_count` is always the full count.
pub async fn subscription_view<S>(
    store: &S,
    viewer: Viewer,
    author: User,
    recipes_limit: Option<i64>,
) -> Result<SubscriptionView, RecipeError>
where
    S: Store + ?Sized,
{
    let recipes = store
        .list_author_recipes(author.id, recipes_limit)
        .await?
        .into_iter()
        .map(ShortRecipe::from)
        .collect();
    let recipes_count = store.count_author_recipes(author.id).await?;

    Ok(SubscriptionView {
        author: author_view(store, viewer, author).await?,
        recipes,
        recipes_count,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::store::{
        MarkRepository, MemoryStore, PartRecord, RecipeRecord, RecipeRepository,
        SubscriptionRepository,
    };

    #[test]
    fn anonymous_viewer_drops_personal_filters() {
        let filter = RecipeFilter {
            author: Some(2),
            tags: vec!["breakfast".to_string()],
            is_favorited: true,
            is_in_shopping_cart: true,
        };

        let query = filter.resolve(Viewer::Anonymous);
        assert_eq!(query.author, Some(2));
        assert_eq!(query.favorited_by, None);
        assert_eq!(query.in_cart_of, None);

        let query = filter.resolve(Viewer::User(5));
        assert_eq!(query.favorited_by, Some(5));
        assert_eq!(query.in_cart_of, Some(5));
    }

    #[test]
    fn filter_reads_query_parameters() {
        let query = HashMap::from([
            ("author".to_string(), "3".to_string()),
            ("tags".to_string(), "lunch".to_string()),
            ("is_favorited".to_string(), "1".to_string()),
        ]);
        let filter = RecipeFilter::from_form(&Form::from_query(query)).unwrap();

        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.tags, vec!["lunch"]);
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn recipes_limit_must_not_be_negative() {
        let query = HashMap::from([("recipes_limit".to_string(), "3".to_string())]);
        assert_eq!(recipes_limit(&Form::from_query(query)).unwrap(), Some(3));

        let query = HashMap::from([("recipes_limit".to_string(), "-1".to_string())]);
        assert!(recipes_limit(&Form::from_query(query)).is_err());

        assert_eq!(recipes_limit(&Form::from_query(HashMap::new())).unwrap(), None);
    }

    #[tokio::test]
    async fn recipe_view_reports_viewer_flags() {
        let store = MemoryStore::new();
        let author = store.add_user("chef").await.unwrap();
        let reader = store.add_user("reader").await.unwrap();
        let tag = store.add_tag("Lunch", "#E26C2D", "lunch").await.unwrap();
        let salt = store.add_ingredient("Salt", "g").await.unwrap();
        let recipe = store
            .insert_recipe(&RecipeRecord {
                author_id: author.id,
                name: "Soup".to_string(),
                text: "Boil.".to_string(),
                image: None,
                cooking_time: 30,
                parts: vec![PartRecord {
                    ingredient_id: salt.id,
                    amount: 5,
                }],
                tags: vec![tag.id],
            })
            .await
            .unwrap();
        store
            .insert_mark(MarkKind::Favorite, reader.id, recipe.id)
            .await
            .unwrap();
        store.insert_subscription(reader.id, author.id).await.unwrap();

        let view = recipe_view(&store, Viewer::User(reader.id), recipe.clone())
            .await
            .unwrap();
        assert!(view.is_favorited);
        assert!(!view.is_in_shopping_cart);
        assert!(view.author.is_subscribed);
        assert_eq!(view.tags, vec![tag]);
        assert_eq!(view.ingredients[0].amount, 5);

        let anonymous = recipe_view(&store, Viewer::Anonymous, recipe).await.unwrap();
        assert!(!anonymous.is_favorited);
        assert!(!anonymous.author.is_subscribed);
    }

    #[test]
    fn subscription_view_flattens_the_author() {
        let view = SubscriptionView {
            author: AuthorView {
                email: "chef@example.com".to_string(),
                id: 1,
                username: "chef".to_string(),
                first_name: "Chef".to_string(),
                last_name: String::new(),
                is_subscribed: true,
            },
            recipes: vec![],
            recipes_count: 0,
        };

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["username"], json!("chef"));
        assert_eq!(value["recipes_count"], json!(0));
    }
}
