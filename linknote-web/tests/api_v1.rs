mod common;

use chrono::{Duration, Local};
use common::*;
use linknote::BackendPreference;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

async fn create_note_helper(client: &Client, address: &str, note: Value) -> String {
    let response = client
        .post(&format!("{}/api/v1/note", address))
        .json(&note)
        .send()
        .await
        .expect("Failed to execute request.")
        .json::<Value>()
        .await
        .expect("Failed to parse response");
    response["id"].as_str().unwrap().to_owned()
}

async fn list_titles(client: &Client, address: &str, query: &str) -> Vec<String> {
    client
        .get(&format!("{}/api/v1/notes", address))
        .query(&[("q", query)])
        .send()
        .await
        .expect("Failed to execute request.")
        .json::<Vec<Value>>()
        .await
        .expect("Failed to parse response")
        .into_iter()
        .map(|n| n["title"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn new_note() {
    for backend in [BackendPreference::Flat, BackendPreference::Indexed] {
        let app = spawn_app_with(backend).await;
        let client = Client::new();

        let id = create_note_helper(
            &client,
            &app.address,
            json!({"title": "My title", "content": "body text"}),
        )
        .await;
        let response = client
            .get(&format!("{}/api/v1/note/{}", &app.address, id))
            .send()
            .await
            .expect("Failed to execute request.")
            .json::<Value>()
            .await
            .expect("Failed to parse response");

        assert_eq!(response["id"], id.as_str());
        assert_eq!(response["title"], "My title");
        assert_eq!(response["content"], "body text");
        assert!(response.get("reminder").is_none());
        assert!(response["createdAt"].is_string());
        assert!(response["updatedAt"].is_string());
    }
}

#[tokio::test]
async fn update_note() {
    let app = spawn_app().await;
    let client = Client::new();

    let id = create_note_helper(&client, &app.address, json!({"title": "old"})).await;
    let again = create_note_helper(
        &client,
        &app.address,
        json!({"id": id, "title": "new", "reminder": "2030-01-01T09:30"}),
    )
    .await;
    assert_eq!(id, again);
    let response = client
        .get(&format!("{}/api/v1/note/{}", &app.address, id))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(response["title"], "new");
    assert_eq!(response["reminder"], "2030-01-01T09:30");
}

#[tokio::test]
async fn empty_note_rejected() {
    let app = spawn_app().await;
    let response = Client::new()
        .post(&format!("{}/api/v1/note", &app.address))
        .json(&json!({"title": "", "content": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn past_due_first_and_search() {
    let app = spawn_app().await;
    let client = Client::new();

    create_note_helper(&client, &app.address, json!({"title": "A", "content": "x"})).await;
    let an_hour_ago = (Local::now().naive_local() - Duration::hours(1))
        .format("%Y-%m-%dT%H:%M")
        .to_string();
    create_note_helper(
        &client,
        &app.address,
        json!({"title": "B", "content": "y", "reminder": an_hour_ago}),
    )
    .await;
    assert_eq!(list_titles(&client, &app.address, "").await, vec!["B", "A"]);
    assert_eq!(list_titles(&client, &app.address, "X").await, vec!["A"]);
}

#[tokio::test]
async fn delete_note() {
    let app = spawn_app().await;
    let client = Client::new();

    let id = create_note_helper(&client, &app.address, json!({"title": "gone"})).await;
    let response = client
        .delete(&format!("{}/api/v1/note/{}", &app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = client
        .get(&format!("{}/api/v1/note/{}", &app.address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn links() {
    let app = spawn_app_with(BackendPreference::Indexed).await;
    let client = Client::new();

    let save = |title: &'static str, url: &'static str| {
        client
            .post(&format!("{}/api/v1/link", &app.address))
            .json(&json!({"title": title, "url": url}))
            .send()
    };
    let first = save("Example", "example.com").await.unwrap().json::<Value>().await.unwrap();
    let again = save("Renamed", "http://example.com")
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(first["id"], again["id"]);
    let other = save("Other", "other.org").await.unwrap().json::<Value>().await.unwrap();

    let links = client
        .get(&format!("{}/api/v1/links", &app.address))
        .send()
        .await
        .unwrap()
        .json::<Vec<Value>>()
        .await
        .unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["title"], "Other");
    assert_eq!(links[1]["url"], "http://example.com");

    let response = client
        .put(&format!(
            "{}/api/v1/link/{}",
            &app.address,
            other["id"].as_str().unwrap()
        ))
        .json(&json!({"title": "Other", "url": "example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .put(&format!("{}/api/v1/link/999", &app.address))
        .json(&json!({"title": "Nothing", "url": "nothing.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .delete(&format!(
            "{}/api/v1/link/{}",
            &app.address,
            other["id"].as_str().unwrap()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = client
        .get(&format!(
            "{}/api/v1/link/{}",
            &app.address,
            other["id"].as_str().unwrap()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_import() {
    let source = spawn_app().await;
    let target = spawn_app_with(BackendPreference::Indexed).await;
    let client = Client::new();

    create_note_helper(&client, &source.address, json!({"title": "Secret", "content": "s"}))
        .await;
    let file = client
        .post(&format!("{}/api/v1/export", &source.address))
        .json(&json!({"password": "hunter2"}))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let envelope: Value = serde_json::from_str(&file).unwrap();
    assert_eq!(envelope["encrypted"], true);

    let import = |password: Option<&'static str>| {
        client
            .post(&format!("{}/api/v1/import", &target.address))
            .json(&json!({"file": file, "password": password}))
            .send()
    };
    assert_eq!(import(Some("wrong")).await.unwrap().status(), StatusCode::FORBIDDEN);
    assert_eq!(import(None).await.unwrap().status(), StatusCode::BAD_REQUEST);
    assert!(list_titles(&client, &target.address, "").await.is_empty());

    let response = import(Some("hunter2")).await.unwrap().json::<Value>().await.unwrap();
    assert_eq!(response["imported"], 1);
    assert_eq!(list_titles(&client, &target.address, "").await, vec!["Secret"]);
}

#[tokio::test]
async fn plaintext_export_without_body() {
    let app = spawn_app().await;
    let client = Client::new();

    create_note_helper(&client, &app.address, json!({"title": "Plain"})).await;
    let export = client
        .post(&format!("{}/api/v1/export", &app.address))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert!(export["exportDate"].is_string());
    assert_eq!(export["notes"][0]["title"], "Plain");
}

#[tokio::test]
async fn reminders() {
    let app = spawn_app().await;
    let client = Client::new();

    let soon = (Local::now().naive_local() + Duration::seconds(40))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    let past = (Local::now().naive_local() - Duration::days(1))
        .format("%Y-%m-%dT%H:%M")
        .to_string();
    create_note_helper(&client, &app.address, json!({"title": "Soon", "reminder": soon})).await;
    let past_id =
        create_note_helper(&client, &app.address, json!({"title": "Past", "reminder": past}))
            .await;
    create_note_helper(&client, &app.address, json!({"title": "None"})).await;

    let response = client
        .get(&format!("{}/api/v1/reminders", &app.address))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let due: Vec<&str> = response["due"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(due, vec!["Soon"]);
    assert_eq!(response["pastDue"], json!([past_id]));
}
