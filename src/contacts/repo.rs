use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Contact, ContactPatch, NewContact};

/// Contacts are always addressed through their owner; another user's id
/// behaves exactly like a missing one.
#[async_trait]
pub trait ContactRepo: Send + Sync {
    async fn list(&self, owner: Uuid) -> anyhow::Result<Vec<Contact>>;
    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>>;
    async fn create(&self, owner: Uuid, contact: NewContact) -> anyhow::Result<Contact>;
    async fn update(&self, owner: Uuid, id: Uuid, patch: ContactPatch) -> anyhow::Result<Option<Contact>>;
    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>>;
}

#[derive(Clone)]
pub struct PgContacts {
    db: PgPool,
}

impl PgContacts {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ContactRepo for PgContacts {
    async fn list(&self, owner: Uuid) -> anyhow::Result<Vec<Contact>> {
        let rows = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, owner, name, email, phone, favorite, created_at, updated_at
              FROM contacts
             WHERE owner = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await
        .context("list contacts")?;
        Ok(rows)
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(
            r#"
            SELECT id, owner, name, email, phone, favorite, created_at, updated_at
              FROM contacts
             WHERE id = $1 AND owner = $2
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("get contact")?;
        Ok(row)
    }

    async fn create(&self, owner: Uuid, contact: NewContact) -> anyhow::Result<Contact> {
        let row = sqlx::query_as::<_, Contact>(
            r#"
            INSERT INTO contacts (id, owner, name, email, phone, favorite)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner, name, email, phone, favorite, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(contact.name)
        .bind(contact.email)
        .bind(contact.phone)
        .bind(contact.favorite)
        .fetch_one(&self.db)
        .await
        .context("insert contact")?;
        Ok(row)
    }

    async fn update(&self, owner: Uuid, id: Uuid, patch: ContactPatch) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(
            r#"
            UPDATE contacts
               SET name       = COALESCE($3, name),
                   email      = COALESCE($4, email),
                   phone      = COALESCE($5, phone),
                   favorite   = COALESCE($6, favorite),
                   updated_at = now()
             WHERE id = $1 AND owner = $2
            RETURNING id, owner, name, email, phone, favorite, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.phone)
        .bind(patch.favorite)
        .fetch_optional(&self.db)
        .await
        .context("update contact")?;
        Ok(row)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>> {
        let row = sqlx::query_as::<_, Contact>(
            r#"
            DELETE FROM contacts
             WHERE id = $1 AND owner = $2
            RETURNING id, owner, name, email, phone, favorite, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await
        .context("delete contact")?;
        Ok(row)
    }
}
