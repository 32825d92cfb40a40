use foodgram_sdk::{
    actions::{
        add_favorite, add_to_cart, aggregate, create_recipe, delete_recipe, export_shopping_list,
        get_recipe, list_recipes, remove_favorite, replace_recipe, subscribe, ShoppingListItem,
    },
    error::RecipeError,
    pagination::PageRequest,
    payload::{IngredientEntry, RecipePayload},
    schema::{IngredientId, TagId, UserId},
    session::Viewer,
    store::MemoryStore,
    views::RecipeFilter,
    PdfRenderer, TextRenderer,
};

struct Fixture {
    store: MemoryStore,
    chef: UserId,
    reader: UserId,
    salt: IngredientId,
    sugar: IngredientId,
    milk: IngredientId,
    lunch: TagId,
    dessert: TagId,
}

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let chef = store.add_user("chef").await.unwrap().id;
    let reader = store.add_user("reader").await.unwrap().id;
    let salt = store.add_ingredient("Salt", "g").await.unwrap().id;
    let sugar = store.add_ingredient("Sugar", "g").await.unwrap().id;
    let milk = store.add_ingredient("Milk", "ml").await.unwrap().id;
    let lunch = store.add_tag("Lunch", "#E26C2D", "lunch").await.unwrap().id;
    let dessert = store.add_tag("Dessert", "#8775D2", "dessert").await.unwrap().id;

    Fixture {
        store,
        chef,
        reader,
        salt,
        sugar,
        milk,
        lunch,
        dessert,
    }
}

fn recipe(name: &str, ingredients: &[(IngredientId, i32)], tags: &[TagId]) -> RecipePayload {
    RecipePayload {
        name: name.to_string(),
        text: format!("How to make {name}."),
        image: None,
        cooking_time: 15,
        ingredients: ingredients
            .iter()
            .map(|(id, amount)| IngredientEntry {
                id: *id,
                amount: *amount,
            })
            .collect(),
        tags: tags.to_vec(),
    }
}

#[tokio::test]
async fn create_then_read_returns_the_same_sets() {
    let f = fixture().await;
    let created = create_recipe(
        &f.store,
        f.chef,
        recipe("Porridge", &[(f.milk, 250), (f.sugar, 10)], &[f.lunch, f.dessert]),
    )
    .await
    .unwrap();

    let view = get_recipe(&f.store, Viewer::Anonymous, created.id)
        .await
        .unwrap();

    let mut ingredients: Vec<_> = view.ingredients.iter().map(|i| (i.id, i.amount)).collect();
    ingredients.sort();
    let mut expected = vec![(f.milk, 250), (f.sugar, 10)];
    expected.sort();
    assert_eq!(ingredients, expected);

    let mut tags: Vec<_> = view.tags.iter().map(|t| t.id).collect();
    tags.sort();
    let mut expected = vec![f.lunch, f.dessert];
    expected.sort();
    assert_eq!(tags, expected);
}

#[tokio::test]
async fn replace_drops_omitted_ingredients() {
    let f = fixture().await;
    let created = create_recipe(
        &f.store,
        f.chef,
        recipe("Porridge", &[(f.milk, 250), (f.sugar, 10)], &[f.lunch]),
    )
    .await
    .unwrap();

    replace_recipe(
        &f.store,
        Viewer::User(f.chef),
        created.id,
        recipe("Porridge", &[(f.milk, 300)], &[f.dessert]),
    )
    .await
    .unwrap();

    let view = get_recipe(&f.store, Viewer::Anonymous, created.id)
        .await
        .unwrap();
    assert_eq!(view.ingredients.len(), 1);
    assert_eq!(view.ingredients[0].id, f.milk);
    assert_eq!(view.ingredients[0].amount, 300);
    assert_eq!(view.tags.len(), 1);
    assert_eq!(view.tags[0].id, f.dessert);
}

#[tokio::test]
async fn invalid_payloads_are_rejected_before_writing() {
    let f = fixture().await;

    let error = create_recipe(
        &f.store,
        f.chef,
        recipe("Brine", &[(f.salt, 5), (f.salt, 50)], &[f.lunch]),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        error,
        RecipeError::DuplicateEntry {
            field: "ingredients"
        }
    ));

    let error = create_recipe(&f.store, f.chef, recipe("Brine", &[(f.salt, 0)], &[f.lunch]))
        .await
        .unwrap_err();
    assert!(matches!(error, RecipeError::OutOfRange { field: "amount" }));
    assert_eq!(error.status().as_u16(), 400);

    let error = create_recipe(&f.store, f.chef, recipe("Brine", &[(777, 1)], &[f.lunch]))
        .await
        .unwrap_err();
    assert_eq!(error.status().as_u16(), 404);

    let page = list_recipes(
        &f.store,
        Viewer::Anonymous,
        &RecipeFilter::default(),
        &PageRequest::default(),
    )
    .await
    .unwrap();
    assert_eq!(page.count, 0);
}

#[tokio::test]
async fn shopping_list_sums_shared_ingredients() {
    let f = fixture().await;
    let soup = create_recipe(&f.store, f.chef, recipe("Soup", &[(f.salt, 10)], &[f.lunch]))
        .await
        .unwrap();
    let stew = create_recipe(
        &f.store,
        f.chef,
        recipe("Stew", &[(f.salt, 15), (f.milk, 100)], &[f.lunch]),
    )
    .await
    .unwrap();
    add_to_cart(&f.store, f.reader, soup.id).await.unwrap();
    add_to_cart(&f.store, f.reader, stew.id).await.unwrap();

    let first: Vec<ShoppingListItem> = aggregate(&f.store, f.reader).await.unwrap().collect();
    let second: Vec<ShoppingListItem> = aggregate(&f.store, f.reader).await.unwrap().collect();

    assert_eq!(first, second);
    assert_eq!(
        first,
        vec![
            ShoppingListItem {
                name: "Milk".to_string(),
                measurement_unit: "ml".to_string(),
                total_amount: 100,
            },
            ShoppingListItem {
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
                total_amount: 25,
            },
        ]
    );

    let document = export_shopping_list(&f.store, f.reader, &TextRenderer)
        .await
        .unwrap();
    assert_eq!(document.file_name, "shopping_cart.txt");
    assert_eq!(
        String::from_utf8(document.body).unwrap(),
        "Ingredient list:\n1. Milk - 100ml\n2. Salt - 25g\n"
    );

    let document = export_shopping_list(&f.store, f.reader, &PdfRenderer)
        .await
        .unwrap();
    assert_eq!(document.file_name, "shopping_cart.pdf");
    assert_eq!(document.content_type, "application/pdf");
    assert!(document.body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn favorite_toggle_sequence() {
    let f = fixture().await;
    let soup = create_recipe(&f.store, f.chef, recipe("Soup", &[(f.salt, 10)], &[f.lunch]))
        .await
        .unwrap();

    assert!(add_favorite(&f.store, f.reader, soup.id).await.is_ok());
    assert!(matches!(
        add_favorite(&f.store, f.reader, soup.id).await,
        Err(RecipeError::Conflict { .. })
    ));
    assert!(remove_favorite(&f.store, f.reader, soup.id).await.is_ok());
    assert!(matches!(
        remove_favorite(&f.store, f.reader, soup.id).await,
        Err(RecipeError::NotFound { .. })
    ));
}

#[tokio::test]
async fn deleting_a_recipe_clears_favorites_and_cart() {
    let f = fixture().await;
    let soup = create_recipe(&f.store, f.chef, recipe("Soup", &[(f.salt, 10)], &[f.lunch]))
        .await
        .unwrap();
    add_favorite(&f.store, f.reader, soup.id).await.unwrap();
    add_to_cart(&f.store, f.reader, soup.id).await.unwrap();

    delete_recipe(&f.store, Viewer::User(f.chef), soup.id)
        .await
        .unwrap();

    assert_eq!(aggregate(&f.store, f.reader).await.unwrap().count(), 0);
    let favorites = list_recipes(
        &f.store,
        Viewer::User(f.reader),
        &RecipeFilter {
            is_favorited: true,
            ..Default::default()
        },
        &PageRequest::default(),
    )
    .await
    .unwrap();
    assert_eq!(favorites.count, 0);
}

#[tokio::test]
async fn injected_failure_leaves_no_partial_recipe() {
    let f = fixture().await;
    f.store.fail_writes_after(2).await;

    let error = create_recipe(
        &f.store,
        f.chef,
        recipe("Cake", &[(f.sugar, 200), (f.milk, 100)], &[f.dessert]),
    )
    .await
    .unwrap_err();
    assert_eq!(error.status().as_u16(), 500);

    // The failure is one-shot; the same recipe can be written afterwards.
    let created = create_recipe(
        &f.store,
        f.chef,
        recipe("Cake", &[(f.sugar, 200), (f.milk, 100)], &[f.dessert]),
    )
    .await
    .unwrap();
    assert_eq!(created.ingredients.len(), 2);
}

#[tokio::test]
async fn self_subscription_is_invalid() {
    let f = fixture().await;

    let error = subscribe(&f.store, f.chef, f.chef, None).await.unwrap_err();

    assert!(matches!(error, RecipeError::InvalidOperation(_)));
    assert_eq!(error.status().as_u16(), 400);
}

#[tokio::test]
async fn listing_is_newest_first_and_paginated() {
    let f = fixture().await;
    for name in ["One", "Two", "Three"] {
        create_recipe(&f.store, f.chef, recipe(name, &[(f.salt, 1)], &[f.lunch]))
            .await
            .unwrap();
    }

    let first = list_recipes(
        &f.store,
        Viewer::Anonymous,
        &RecipeFilter::default(),
        &PageRequest::new(1, 2),
    )
    .await
    .unwrap();
    assert_eq!(first.count, 3);
    assert_eq!(first.next, Some(2));
    assert_eq!(first.results[0].name, "Three");

    let second = list_recipes(
        &f.store,
        Viewer::Anonymous,
        &RecipeFilter::default(),
        &PageRequest::new(2, 2),
    )
    .await
    .unwrap();
    assert_eq!(second.results.len(), 1);
    assert_eq!(second.results[0].name, "One");
    assert_eq!(second.next, None);
}
