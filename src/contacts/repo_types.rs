use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub favorite: bool,
}

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub favorite: Option<bool>,
}

impl ContactPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.favorite.is_none()
    }

    pub fn apply(self, contact: &mut Contact) {
        if let Some(name) = self.name {
            contact.name = name;
        }
        if let Some(email) = self.email {
            contact.email = email;
        }
        if let Some(phone) = self.phone {
            contact.phone = phone;
        }
        if let Some(favorite) = self.favorite {
            contact.favorite = favorite;
        }
    }
}
