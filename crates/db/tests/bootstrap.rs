use sqlx::PgPool;

/// Connect, migrate, verify the schema is in place.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    musicclub_db::health_check(&pool).await.unwrap();

    let tables = [
        "users",
        "user_permissions",
        "songs",
        "song_roles",
        "song_role_assignments",
        "song_topics",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should start empty");
    }
}

/// The topic column only accepts NULL, the sentinel, or a positive id.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_topic_id_check_constraint(pool: PgPool) {
    let song_id: (i64,) = sqlx::query_as(
        "INSERT INTO songs (title, artist) VALUES ('t', 'a') RETURNING id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let result = sqlx::query("INSERT INTO song_topics (song_id, topic_id) VALUES ($1, -5)")
        .bind(song_id.0)
        .execute(&pool)
        .await;
    assert!(result.is_err(), "negative non-sentinel topic id must be rejected");
}
