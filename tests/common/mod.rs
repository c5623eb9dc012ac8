//! Shared fixtures: a blog schema bound to a `MockExecutor`.

#![allow(dead_code)]

use lux_model::mock::MockExecutor;
use lux_model::{Database, DatabaseConfig, Model, ModelDef};
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub fn write_migrations(dir: &Path, files: &[&str]) {
    for file in files {
        fs::write(dir.join(file), "").expect("write migration file");
    }
}

pub fn database(migrations: &Path, mock: &Arc<MockExecutor>) -> Database {
    let config = DatabaseConfig {
        migrations_path: migrations.to_path_buf(),
        debug: true,
        ..DatabaseConfig::default()
    };
    Database::new(config, mock.clone()).expect("memory cache store")
}

pub fn blog_defs() -> Vec<ModelDef> {
    vec![
        ModelDef::builder("Post")
            .attribute("id")
            .attribute("title")
            .attribute("body")
            .attribute("authorId")
            .attribute("createdAt")
            .attribute("updatedAt")
            .belongs_to("author", "User", "authorId")
            .has_one("image", "Image", "postId")
            .has_many("comments", "Comment", "postId")
            .validates("title", "must be present", |v| {
                v.as_str().is_some_and(|s| !s.is_empty())
            })
            .build(),
        ModelDef::builder("User")
            .attribute("id")
            .attribute("name")
            .attribute("email")
            .has_many("posts", "Post", "authorId")
            .build(),
        ModelDef::builder("Image")
            .attribute("id")
            .attribute("url")
            .attribute("postId")
            .belongs_to("post", "Post", "postId")
            .build(),
        ModelDef::builder("Comment")
            .attribute("id")
            .attribute("message")
            .attribute("postId")
            .belongs_to("post", "Post", "postId")
            .build(),
    ]
}

/// A booted blog database with an up-to-date (empty) migrations directory.
pub fn blog(mock: &Arc<MockExecutor>) -> (tempfile::TempDir, Database, Model) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = database(dir.path(), mock);
    db.define(blog_defs()).expect("define blog models");
    let posts = db.model_for("Post").expect("Post is defined");
    mock.clear();
    (dir, db, posts)
}
