use std::collections::HashSet;

use crate::{
    error::RecipeError,
    payload::{IngredientEntry, RecipePayload},
    schema::{RecipeId, TagId, UserId},
    store::ReferenceLookup,
};

/// A payload that passed [`validate_recipe`]. Only the validator builds one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidRecipe {
    author: UserId,
    name: String,
    text: String,
    image: Option<String>,
    cooking_time: i32,
    ingredients: Vec<IngredientEntry>,
    tags: Vec<TagId>,
}

impl ValidRecipe {
    pub fn author(&self) -> UserId {
        self.author
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn cooking_time(&self) -> i32 {
        self.cooking_time
    }

    pub fn ingredients(&self) -> &[IngredientEntry] {
        &self.ingredients
    }

    pub fn tags(&self) -> &[TagId] {
        &self.tags
    }
}

/// Checks a candidate recipe of `author`. Rules run in a fixed order and the
/// first violation is returned; `replacing` names the recipe being updated.
pub async fn validate_recipe<L>(
    lookup: &L,
    author: UserId,
    payload: RecipePayload,
    replacing: Option<RecipeId>,
) -> Result<ValidRecipe, RecipeError>
where
    L: ReferenceLookup + ?Sized,
{
    let RecipePayload {
        name,
        text,
        image,
        cooking_time,
        ingredients,
        tags,
    } = payload;

    if ingredients.is_empty() {
        return Err(RecipeError::EmptyCollection {
            field: "ingredients",
        });
    }
    if ingredients.iter().any(|entry| entry.amount < 1) {
        return Err(RecipeError::OutOfRange { field: "amount" });
    }
    let mut seen = HashSet::with_capacity(ingredients.len());
    if !ingredients.iter().all(|entry| seen.insert(entry.id)) {
        return Err(RecipeError::DuplicateEntry {
            field: "ingredients",
        });
    }
    for entry in &ingredients {
        if !lookup.ingredient_exists(entry.id).await? {
            return Err(RecipeError::NotFound {
                entity: "ingredient",
                id: entry.id,
            });
        }
    }

    if tags.is_empty() {
        return Err(RecipeError::EmptyCollection { field: "tags" });
    }
    for id in &tags {
        if !lookup.tag_exists(*id).await? {
            return Err(RecipeError::NotFound {
                entity: "tag",
                id: *id,
            });
        }
    }
    let mut seen = HashSet::with_capacity(tags.len());
    if !tags.iter().all(|id| seen.insert(*id)) {
        return Err(RecipeError::DuplicateEntry { field: "tags" });
    }

    if cooking_time < 1 {
        return Err(RecipeError::OutOfRange {
            field: "cooking_time",
        });
    }

    if lookup.recipe_name_taken(author, &name, replacing).await? {
        return Err(RecipeError::Conflict {
            entity: "recipe",
            key: name,
        });
    }

    Ok(ValidRecipe {
        author,
        name,
        text,
        image,
        cooking_time,
        ingredients,
        tags,
    })
}
