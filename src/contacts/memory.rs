use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    repo::ContactRepo,
    repo_types::{Contact, ContactPatch, NewContact},
};

#[derive(Default)]
pub struct MemoryContacts {
    contacts: Mutex<HashMap<Uuid, Contact>>,
}

impl MemoryContacts {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactRepo for MemoryContacts {
    async fn list(&self, owner: Uuid) -> anyhow::Result<Vec<Contact>> {
        let mut rows: Vec<Contact> = self
            .contacts
            .lock()
            .await
            .values()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>> {
        let contacts = self.contacts.lock().await;
        Ok(contacts.get(&id).filter(|c| c.owner == owner).cloned())
    }

    async fn create(&self, owner: Uuid, new: NewContact) -> anyhow::Result<Contact> {
        let now = OffsetDateTime::now_utc();
        let contact = Contact {
            id: Uuid::new_v4(),
            owner,
            name: new.name,
            email: new.email,
            phone: new.phone,
            favorite: new.favorite,
            created_at: now,
            updated_at: now,
        };
        self.contacts.lock().await.insert(contact.id, contact.clone());
        Ok(contact)
    }

    async fn update(&self, owner: Uuid, id: Uuid, patch: ContactPatch) -> anyhow::Result<Option<Contact>> {
        let mut contacts = self.contacts.lock().await;
        let Some(contact) = contacts.get_mut(&id).filter(|c| c.owner == owner) else {
            return Ok(None);
        };
        patch.apply(contact);
        contact.updated_at = OffsetDateTime::now_utc();
        Ok(Some(contact.clone()))
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> anyhow::Result<Option<Contact>> {
        let mut contacts = self.contacts.lock().await;
        if contacts.get(&id).map_or(true, |c| c.owner != owner) {
            return Ok(None);
        }
        Ok(contacts.remove(&id))
    }
}
