use crate::common::{TestApp, routes};

#[tokio::test]
async fn tags_are_listed_by_name() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::TAGS, None).await;

    assert_eq!(res.status, 200, "{}", res.text);
    let names: Vec<&str> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Breakfast", "Dinner", "Lunch"]);
}

#[tokio::test]
async fn single_tag_and_missing_tag() {
    let app = TestApp::spawn().await;
    let id = app.tag_id("lunch").await;

    let res = app.get(&routes::tag(id), None).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["slug"], "lunch");
    assert_eq!(res.body["color"], "#49B64E");

    let missing = app.get(&routes::tag(9999), None).await;
    assert_eq!(missing.status, 404);
    assert_eq!(missing.body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn ingredient_search_is_a_case_insensitive_prefix_match() {
    let app = TestApp::spawn().await;

    let res = app
        .get(&format!("{}?name=SA", routes::INGREDIENTS), None)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    let found: Vec<(String, String)> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| {
            (
                i["name"].as_str().unwrap().to_lowercase(),
                i["measurement_unit"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|(name, _)| name == "salt"));
}

#[tokio::test]
async fn ingredient_search_does_not_match_in_the_middle() {
    let app = TestApp::spawn().await;

    let res = app
        .get(&format!("{}?name=our", routes::INGREDIENTS), None)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn like_wildcards_in_the_search_term_are_literal() {
    let app = TestApp::spawn().await;

    let res = app
        .get(&format!("{}?name=%25", routes::INGREDIENTS), None)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unfiltered_ingredient_list_returns_everything() {
    let app = TestApp::spawn().await;

    let res = app.get(routes::INGREDIENTS, None).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn single_ingredient_and_missing_ingredient() {
    let app = TestApp::spawn().await;
    let id = app.ingredient_id("milk", "ml").await;

    let res = app.get(&routes::ingredient(id), None).await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["name"], "milk");

    let missing = app.get(&routes::ingredient(9999), None).await;
    assert_eq!(missing.status, 404);
}
