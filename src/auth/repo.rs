use crate::auth::dto::ProfileUpdate;
use crate::auth::repo_types::{Identity, Profile};
use sqlx::PgPool;

impl Identity {
    /// Find an identity by (already lowercased) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Identity>> {
        let identity = sqlx::query_as::<_, Identity>(
            r#"
            SELECT id, email, user_name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(identity)
    }

    /// Create the identity and its empty profile in one transaction, so a
    /// profile can never exist without an identity and vice versa.
    pub async fn create_with_profile(
        db: &PgPool,
        email: &str,
        user_name: &str,
        password_hash: &str,
    ) -> anyhow::Result<Identity> {
        let mut tx = db.begin().await?;

        let identity = sqlx::query_as::<_, Identity>(
            r#"
            INSERT INTO users (email, user_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, user_name, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(user_name)
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(r#"INSERT INTO profiles (email) VALUES ($1)"#)
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(identity)
    }
}

impl Profile {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT email, first_name, last_name, phone_number, gender, date_of_birth
            FROM profiles
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Overwrite the mutable fields from the patch. An absent date of birth
    /// clears any stored value. Returns `None` when no profile exists.
    pub async fn update(
        db: &PgPool,
        email: &str,
        patch: &ProfileUpdate,
    ) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles
            SET first_name = $2,
                last_name = $3,
                phone_number = $4,
                gender = $5,
                date_of_birth = $6
            WHERE email = $1
            RETURNING email, first_name, last_name, phone_number, gender, date_of_birth
            "#,
        )
        .bind(email)
        .bind(&patch.first_name)
        .bind(&patch.last_name)
        .bind(&patch.phone_number)
        .bind(&patch.gender)
        .bind(patch.date_of_birth)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}
