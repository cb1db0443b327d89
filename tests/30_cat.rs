mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn create_returns_id_and_timestamp() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = server.register("owner@example.com", "Cat Owner").await?;

    let res = server
        .client
        .post(server.url("/v1/cat"))
        .bearer_auth(&token)
        .json(&common::cat_body("Tom", "male"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "success");
    assert!(body["data"]["id"].is_string());
    assert!(body["data"]["createdAt"].as_str().is_some_and(|s| s.ends_with('Z')));
    Ok(())
}

#[tokio::test]
async fn invalid_cat_is_rejected_with_fields() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = server.register("owner@example.com", "Cat Owner").await?;

    let res = server
        .client
        .post(server.url("/v1/cat"))
        .bearer_auth(&token)
        .json(&json!({
            "name": "",
            "race": "Tabby",
            "sex": "unknown",
            "ageInMonth": 0,
            "description": "x",
            "imageUrls": ["ftp://example.com/cat.jpg"]
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await?;
    for field in ["name", "race", "sex", "ageInMonth", "imageUrls"] {
        assert!(body["fields"][field].is_string(), "missing field error for {}", field);
    }
    Ok(())
}

#[tokio::test]
async fn list_filters_and_pages() -> Result<()> {
    let server = common::ensure_server().await?;
    let alice = server.register("alice@example.com", "Alice Cooper").await?;
    let bob = server.register("bob@example.com", "Bob Marley").await?;

    server.create_cat(&alice, "Tom", "male").await?;
    server.create_cat(&alice, "Kitty", "female").await?;
    server.create_cat(&bob, "Garfield", "male").await?;

    let (status, body) = server.get_json(&alice, "/v1/cat").await?;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Garfield", "Kitty", "Tom"]);

    let (_, body) = server.get_json(&alice, "/v1/cat?owned=true&sex=male").await?;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Tom");

    let (_, body) = server.get_json(&alice, "/v1/cat?owned=false").await?;
    assert_eq!(body["data"][0]["name"], "Garfield");

    let (_, body) = server.get_json(&alice, "/v1/cat?search=KIT").await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = server.get_json(&alice, "/v1/cat?limit=1&offset=1").await?;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Kitty");

    let (status, _) = server.get_json(&alice, "/v1/cat?hasMatched=maybe").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn age_filter_accepts_comparisons() -> Result<()> {
    let server = common::ensure_server().await?;
    let token = server.register("ages@example.com", "Age Tester").await?;
    server.create_cat(&token, "Twelve", "male").await?;

    let mut older = common::cat_body("Thirty", "female");
    older["ageInMonth"] = json!(30);
    server
        .client
        .post(server.url("/v1/cat"))
        .bearer_auth(&token)
        .json(&older)
        .send()
        .await?;

    let res = server
        .client
        .get(server.url("/v1/cat"))
        .query(&[("ageInMonth", ">20")])
        .bearer_auth(&token)
        .send()
        .await?;
    let body: Value = res.json().await?;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["name"], "Thirty");
    Ok(())
}

#[tokio::test]
async fn update_and_delete_respect_ownership() -> Result<()> {
    let server = common::ensure_server().await?;
    let alice = server.register("alice@example.com", "Alice Cooper").await?;
    let bob = server.register("bob@example.com", "Bob Marley").await?;
    let tom = server.create_cat(&alice, "Tom", "male").await?;

    let foreign = server
        .client
        .put(server.url(&format!("/v1/cat/{}", tom)))
        .bearer_auth(&bob)
        .json(&common::cat_body("Stolen", "male"))
        .send()
        .await?;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let res = server
        .client
        .put(server.url(&format!("/v1/cat/{}", tom)))
        .bearer_auth(&alice)
        .json(&common::cat_body("Thomas", "male"))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["name"], "Thomas");

    let missing = server
        .client
        .delete(server.url("/v1/cat/999"))
        .bearer_auth(&alice)
        .send()
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let not_numeric = server
        .client
        .delete(server.url("/v1/cat/abc"))
        .bearer_auth(&alice)
        .send()
        .await?;
    assert_eq!(not_numeric.status(), StatusCode::NOT_FOUND);

    let res = server
        .client
        .delete(server.url(&format!("/v1/cat/{}", tom)))
        .bearer_auth(&alice)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["data"]["id"], tom.as_str());

    let (_, body) = server.get_json(&alice, "/v1/cat").await?;
    assert!(body["data"].as_array().unwrap().is_empty());

    let again = server
        .client
        .delete(server.url(&format!("/v1/cat/{}", tom)))
        .bearer_auth(&alice)
        .send()
        .await?;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
    Ok(())
}
