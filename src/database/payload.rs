use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::TypeError,
    schema::{IngredientId, TagId},
};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientEntry {
    pub id: IngredientId,
    pub amount: i32,
}

/// Write-side projection of a recipe, as submitted on create and update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientEntry>,
    pub tags: Vec<TagId>,
}

impl TryFrom<Value> for RecipePayload {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value).map_err(|e| TypeError::new(&format!("Malformed recipe: {e}")))
    }
}
