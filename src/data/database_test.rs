//! Database tests

use super::*;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        name: "Tester".to_string(),
        password: "secret".to_string(),
    }
}

fn new_map(name: &str, creator_email: &str) -> NewMap {
    NewMap {
        name: name.to_string(),
        creator_email: creator_email.to_string(),
        config: vec![0, 1, 2, 3],
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_create_user_applies_defaults() {
    let (db, _temp_dir) = create_test_db().await;

    let user = db.create_user(&new_user("a@example.com")).await.unwrap();

    assert!(user.id > 0);
    assert_eq!(user.email, "a@example.com");
    assert_eq!(user.keys, default_keys());
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let (db, _temp_dir) = create_test_db().await;

    let first = db.create_user(&new_user("dup@example.com")).await.unwrap();
    let mut second = new_user("dup@example.com");
    second.name = "Impostor".to_string();

    let result = db.create_user(&second).await;
    assert!(matches!(result, Err(crate::error::AppError::Database(_))));

    let stored = db
        .find_user_by_email("dup@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn test_find_user_by_email_missing_is_none() {
    let (db, _temp_dir) = create_test_db().await;

    let found = db.find_user_by_email("nobody@example.com").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_find_or_create_user_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;

    let created = db
        .find_or_create_user(&new_user("kakao@example.com"))
        .await
        .unwrap();
    let mut again = new_user("kakao@example.com");
    again.name = "Other".to_string();
    let found = db.find_or_create_user(&again).await.unwrap();

    assert_eq!(created.id, found.id);
    assert_eq!(found.name, "Tester");
}

#[tokio::test]
async fn test_update_user_keys_replaces_list() {
    let (db, _temp_dir) = create_test_db().await;
    db.create_user(&new_user("keys@example.com")).await.unwrap();

    let keys = vec!["KeyA".to_string(), "KeyD".to_string()];
    let updated = db.update_user_keys("keys@example.com", &keys).await.unwrap();
    assert_eq!(updated, keys);

    let stored = db
        .find_user_by_email("keys@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.keys, keys);
}

#[tokio::test]
async fn test_update_user_keys_unknown_email_fails() {
    let (db, _temp_dir) = create_test_db().await;

    let result = db
        .update_user_keys("ghost@example.com", &["KeyA".to_string()])
        .await;
    assert!(matches!(
        result,
        Err(crate::error::AppError::Database(sqlx::Error::RowNotFound))
    ));
}

#[tokio::test]
async fn test_map_crud_and_filters() {
    let (db, _temp_dir) = create_test_db().await;
    db.create_user(&new_user("a@example.com")).await.unwrap();
    db.create_user(&new_user("b@example.com")).await.unwrap();

    let first = db.create_map(&new_map("one", "a@example.com")).await.unwrap();
    db.create_map(&new_map("two", "a@example.com")).await.unwrap();
    db.create_map(&new_map("three", "b@example.com")).await.unwrap();

    assert_eq!(first.rating, 0);
    assert_eq!(first.config, vec![0, 1, 2, 3]);

    assert_eq!(db.list_maps(None).await.unwrap().len(), 3);
    let a_maps = db.list_maps(Some("a@example.com")).await.unwrap();
    assert_eq!(a_maps.len(), 2);
    assert!(a_maps.iter().all(|m| m.creator_email == "a@example.com"));
    assert!(db.list_maps(Some("c@example.com")).await.unwrap().is_empty());

    assert_eq!(db.count_maps(None).await.unwrap(), 3);
    assert_eq!(db.count_maps(Some("b@example.com")).await.unwrap(), 1);

    let fetched = db.get_map(first.id).await.unwrap().unwrap();
    assert_eq!(fetched, first);
    assert!(db.get_map(9_999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_map_requires_existing_creator() {
    let (db, _temp_dir) = create_test_db().await;

    let result = db.create_map(&new_map("orphan", "ghost@example.com")).await;
    assert!(matches!(result, Err(crate::error::AppError::Database(_))));
    assert_eq!(db.count_maps(None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_users_attaches_maps() {
    let (db, _temp_dir) = create_test_db().await;
    db.create_user(&new_user("a@example.com")).await.unwrap();
    db.create_user(&new_user("b@example.com")).await.unwrap();
    db.create_map(&new_map("one", "a@example.com")).await.unwrap();

    let users = db.list_users_with_maps().await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].user.email, "a@example.com");
    assert_eq!(users[0].maps.len(), 1);
    assert!(users[1].maps.is_empty());
}

#[tokio::test]
async fn test_increment_map_rating() {
    let (db, _temp_dir) = create_test_db().await;
    db.create_user(&new_user("a@example.com")).await.unwrap();
    let map = db.create_map(&new_map("one", "a@example.com")).await.unwrap();

    db.increment_map_rating(map.id, 5).await.unwrap();
    let updated = db.increment_map_rating(map.id, -2).await.unwrap().unwrap();
    assert_eq!(updated.rating, 3);

    assert!(db.increment_map_rating(9_999, 1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    let (db, _temp_dir) = create_test_db().await;
    let db = std::sync::Arc::new(db);
    db.create_user(&new_user("a@example.com")).await.unwrap();
    let map_id = db
        .create_map(&new_map("one", "a@example.com"))
        .await
        .unwrap()
        .id;

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.increment_map_rating(map_id, 1).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = db.get_map(map_id).await.unwrap().unwrap();
    assert_eq!(stored.rating, 20);
}

#[tokio::test]
async fn test_overflowing_increment_leaves_map_readable() {
    let (db, _temp_dir) = create_test_db().await;
    db.create_user(&new_user("a@example.com")).await.unwrap();
    let map = db.create_map(&new_map("one", "a@example.com")).await.unwrap();

    let topped = db
        .increment_map_rating(map.id, i64::MAX)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topped.rating, i64::MAX);

    let result = db.increment_map_rating(map.id, 1).await;
    assert!(matches!(result, Err(crate::error::AppError::Database(_))));

    let stored = db.get_map(map.id).await.unwrap().unwrap();
    assert_eq!(stored.rating, i64::MAX);
    assert_eq!(db.list_maps(None).await.unwrap().len(), 1);
    assert_eq!(db.list_users_with_maps().await.unwrap()[0].maps.len(), 1);
}
