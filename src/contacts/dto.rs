use serde::Deserialize;

use super::repo_types::{ContactPatch, NewContact};
use crate::{auth::dto::is_valid_email, error::AppError};

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(format!("missing required field {field}")))
}

fn check_email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::bad_request("Invalid email"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub favorite: bool,
}

impl CreateContactRequest {
    pub fn validate(self) -> Result<NewContact, AppError> {
        let contact = NewContact {
            name: required("name", self.name)?,
            email: required("email", self.email)?,
            phone: required("phone", self.phone)?,
            favorite: self.favorite,
        };
        check_email(&contact.email)?;
        Ok(contact)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub favorite: Option<bool>,
}

impl UpdateContactRequest {
    pub fn validate(self) -> Result<ContactPatch, AppError> {
        let patch = ContactPatch {
            name: self.name.map(|v| v.trim().to_string()),
            email: self.email.map(|v| v.trim().to_string()),
            phone: self.phone.map(|v| v.trim().to_string()),
            favorite: self.favorite,
        };
        if patch.is_empty() {
            return Err(AppError::bad_request("Body must have at least one field"));
        }
        if let Some(email) = &patch.email {
            check_email(email)?;
        }
        for (field, value) in [("name", &patch.name), ("phone", &patch.phone)] {
            if value.as_deref() == Some("") {
                return Err(AppError::bad_request(format!("{field} must not be empty")));
            }
        }
        Ok(patch)
    }
}

#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub favorite: Option<bool>,
}

impl FavoriteRequest {
    pub fn validate(self) -> Result<ContactPatch, AppError> {
        let favorite = self
            .favorite
            .ok_or_else(|| AppError::bad_request("missing required field favorite"))?;
        Ok(ContactPatch {
            favorite: Some(favorite),
            ..Default::default()
        })
    }
}
