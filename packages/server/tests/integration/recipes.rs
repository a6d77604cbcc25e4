use serde_json::{Value, json};

use crate::common::{TestApp, recipe_body, routes};

/// Tag ids and (ingredient id, amount) pairs of a recipe response, sorted.
fn composition(body: &Value) -> (Vec<i64>, Vec<(i64, i64)>) {
    let mut tags: Vec<i64> = body["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    tags.sort();
    let mut ingredients: Vec<(i64, i64)> = body["ingredients"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| (i["id"].as_i64().unwrap(), i["amount"].as_i64().unwrap()))
        .collect();
    ingredients.sort();
    (tags, ingredients)
}

mod create {
    use super::*;

    #[tokio::test]
    async fn created_recipe_carries_tags_and_ingredients() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let breakfast = app.tag_id("breakfast").await;
        let flour = app.ingredient_id("flour", "g").await;
        let milk = app.ingredient_id("milk", "ml").await;

        let res = app
            .post(
                routes::RECIPES,
                &recipe_body("Pancakes", &[breakfast], &[(flour, 200), (milk, 300)]),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Pancakes");
        assert_eq!(res.body["author"]["id"], alice.id);
        assert_eq!(res.body["is_favorited"], false);
        assert_eq!(res.body["is_in_shopping_cart"], false);
        let (tags, ingredients) = composition(&res.body);
        assert_eq!(tags, vec![breakfast as i64]);
        let mut expected = vec![(flour as i64, 200), (milk as i64, 300)];
        expected.sort();
        assert_eq!(ingredients, expected);
        let line = &res.body["ingredients"][0];
        assert!(line["name"].is_string());
        assert!(line["measurement_unit"].is_string());
    }

    #[tokio::test]
    async fn duplicate_tag_ids_are_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;

        let res = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[lunch, lunch], &[(flour, 500)]),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn duplicate_ingredient_ids_are_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;

        let res = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[lunch], &[(flour, 500), (flour, 100)]),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn empty_tags_or_ingredients_are_rejected() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;

        let no_tags = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[], &[(flour, 500)]),
                Some(&alice.token),
            )
            .await;
        assert_eq!(no_tags.status, 400);

        let no_ingredients = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[lunch], &[]),
                Some(&alice.token),
            )
            .await;
        assert_eq!(no_ingredients.status, 400);
    }

    #[tokio::test]
    async fn cooking_time_must_be_at_least_one_minute() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;

        let mut body = recipe_body("Bread", &[lunch], &[(flour, 500)]);
        body["cooking_time"] = json!(0);
        let zero = app.post(routes::RECIPES, &body, Some(&alice.token)).await;
        assert_eq!(zero.status, 400);
        assert_eq!(zero.body["code"], "VALIDATION_ERROR");

        body["cooking_time"] = json!(1);
        let one = app.post(routes::RECIPES, &body, Some(&alice.token)).await;
        assert_eq!(one.status, 201, "{}", one.text);
        assert_eq!(one.body["cooking_time"], 1);
    }

    #[tokio::test]
    async fn unknown_tag_or_ingredient_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;

        let bad_tag = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[9999], &[(flour, 500)]),
                Some(&alice.token),
            )
            .await;
        assert_eq!(bad_tag.status, 404);

        let bad_ingredient = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[lunch], &[(9999, 1)]),
                Some(&alice.token),
            )
            .await;
        assert_eq!(bad_ingredient.status, 404);

        let list = app.get(routes::RECIPES, None).await;
        assert_eq!(list.body["pagination"]["total"], 0);
    }

    #[tokio::test]
    async fn duplicate_recipe_name_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        app.create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;

        let res = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[lunch], &[(flour, 400)]),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn anonymous_users_cannot_create() {
        let app = TestApp::spawn().await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;

        let res = app
            .post(
                routes::RECIPES,
                &recipe_body("Bread", &[lunch], &[(flour, 500)]),
                None,
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn author_replaces_tags_and_ingredients() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let dinner = app.tag_id("dinner").await;
        let flour = app.ingredient_id("flour", "g").await;
        let egg = app.ingredient_id("egg", "pcs").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;

        let res = app
            .patch(
                &routes::recipe(id),
                &json!({
                    "tags": [dinner],
                    "ingredients": [{"id": egg, "amount": 2}],
                    "cooking_time": 40,
                }),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Bread");
        assert_eq!(res.body["cooking_time"], 40);
        assert_eq!(
            composition(&res.body),
            (vec![dinner as i64], vec![(egg as i64, 2)])
        );

        let fetched = app.get(&routes::recipe(id), None).await;
        assert_eq!(composition(&fetched.body), composition(&res.body));
    }

    #[tokio::test]
    async fn non_author_is_denied_and_links_are_unchanged() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let lunch = app.tag_id("lunch").await;
        let dinner = app.tag_id("dinner").await;
        let flour = app.ingredient_id("flour", "g").await;
        let egg = app.ingredient_id("egg", "pcs").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;
        let before = app.get(&routes::recipe(id), None).await;

        let res = app
            .patch(
                &routes::recipe(id),
                &json!({
                    "tags": [dinner],
                    "ingredients": [{"id": egg, "amount": 2}],
                    "name": "Stolen bread",
                }),
                Some(&bob.token),
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
        let after = app.get(&routes::recipe(id), None).await;
        assert_eq!(composition(&after.body), composition(&before.body));
        assert_eq!(after.body["name"], "Bread");
    }

    #[tokio::test]
    async fn update_without_tags_is_rejected_and_keeps_existing_links() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;

        let res = app
            .patch(
                &routes::recipe(id),
                &json!({"tags": [], "ingredients": [{"id": flour, "amount": 1}]}),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 400);
        let after = app.get(&routes::recipe(id), None).await;
        assert_eq!(
            composition(&after.body),
            (vec![lunch as i64], vec![(flour as i64, 500)])
        );
    }

    #[tokio::test]
    async fn unknown_recipe_is_not_found_before_permission_check() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;

        let res = app
            .patch(
                &routes::recipe(9999),
                &json!({"tags": [], "ingredients": []}),
                Some(&alice.token),
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn author_deletes_and_the_recipe_leaves_every_list() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;
        assert_eq!(app.post(&routes::favorite(id), &json!({}), Some(&bob.token)).await.status, 201);
        assert_eq!(
            app.post(&routes::shopping_cart(id), &json!({}), Some(&bob.token))
                .await
                .status,
            201
        );

        let res = app.delete(&routes::recipe(id), Some(&alice.token)).await;
        assert_eq!(res.status, 204, "{}", res.text);

        assert_eq!(app.get(&routes::recipe(id), None).await.status, 404);
        let favorites = app
            .get(&format!("{}?is_favorited=1", routes::RECIPES), Some(&bob.token))
            .await;
        assert_eq!(favorites.body["pagination"]["total"], 0);
        let list = app
            .get(routes::DOWNLOAD_SHOPPING_CART, Some(&bob.token))
            .await;
        assert_eq!(list.text, "");
    }

    #[tokio::test]
    async fn non_author_cannot_delete() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 500)])
            .await;

        let res = app.delete(&routes::recipe(id), Some(&bob.token)).await;

        assert_eq!(res.status, 403);
        assert_eq!(app.get(&routes::recipe(id), None).await.status, 200);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn page_beyond_the_offset_range_falls_back_to_the_first() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 1)])
            .await;

        let res = app
            .get(&format!("{}?page=9223372036854775807", routes::RECIPES), None)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data_ids(), vec![id]);
        assert_eq!(res.body["pagination"]["page"], 1);
    }

    #[tokio::test]
    async fn newest_recipes_come_first() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let first = app
            .create_recipe(&alice.token, "First", &[lunch], &[(flour, 1)])
            .await;
        let second = app
            .create_recipe(&alice.token, "Second", &[lunch], &[(flour, 1)])
            .await;

        let res = app.get(routes::RECIPES, None).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data_ids(), vec![second, first]);
    }

    #[tokio::test]
    async fn anonymous_listing_has_every_flag_false() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let id = app
            .create_recipe(&alice.token, "Bread", &[lunch], &[(flour, 1)])
            .await;
        app.post(&routes::favorite(id), &json!({}), Some(&alice.token))
            .await;
        app.post(&routes::shopping_cart(id), &json!({}), Some(&alice.token))
            .await;

        let res = app
            .get(
                &format!("{}?is_favorited=1&is_in_shopping_cart=1", routes::RECIPES),
                None,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        for recipe in data {
            assert_eq!(recipe["is_favorited"], false);
            assert_eq!(recipe["is_in_shopping_cart"], false);
            assert_eq!(recipe["author"]["is_subscribed"], false);
        }
    }

    #[tokio::test]
    async fn tag_filter_matches_any_of_the_given_slugs() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let breakfast = app.tag_id("breakfast").await;
        let lunch = app.tag_id("lunch").await;
        let dinner = app.tag_id("dinner").await;
        let flour = app.ingredient_id("flour", "g").await;
        let morning = app
            .create_recipe(&alice.token, "Porridge", &[breakfast], &[(flour, 1)])
            .await;
        let noon = app
            .create_recipe(&alice.token, "Sandwich", &[lunch], &[(flour, 1)])
            .await;
        app.create_recipe(&alice.token, "Stew", &[dinner], &[(flour, 1)])
            .await;

        let res = app
            .get(
                &format!("{}?tags=breakfast&tags=lunch", routes::RECIPES),
                None,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.data_ids(), vec![noon, morning]);
    }

    #[tokio::test]
    async fn author_and_favorite_filters_combine() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let lunch = app.tag_id("lunch").await;
        let flour = app.ingredient_id("flour", "g").await;
        let alices = app
            .create_recipe(&alice.token, "Alice bread", &[lunch], &[(flour, 1)])
            .await;
        let bobs = app
            .create_recipe(&bob.token, "Bob bread", &[lunch], &[(flour, 1)])
            .await;
        app.post(&routes::favorite(alices), &json!({}), Some(&bob.token))
            .await;
        app.post(&routes::favorite(bobs), &json!({}), Some(&bob.token))
            .await;

        let by_alice = app
            .get(&format!("{}?author={}", routes::RECIPES, alice.id), None)
            .await;
        assert_eq!(by_alice.data_ids(), vec![alices]);

        let favorites_by_bob = app
            .get(
                &format!("{}?is_favorited=1&author={}", routes::RECIPES, bob.id),
                Some(&bob.token),
            )
            .await;
        assert_eq!(favorites_by_bob.data_ids(), vec![bobs]);
        assert_eq!(favorites_by_bob.body["data"][0]["is_favorited"], true);

        let ignored = app
            .get(&format!("{}?author=abc", routes::RECIPES), None)
            .await;
        assert_eq!(ignored.body["pagination"]["total"], 2);
    }
}
