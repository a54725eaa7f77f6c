//! User provisioning. Credentials are checked by the access layer in front of
//! this service; only the resulting password hash is stored here.

use water_client::{
    domain::{NewUser, User, UserId},
    store::{USERS_EMAIL_KEY, USERS_USERNAME_KEY},
    StoreError, WaterStore,
};

#[derive(thiserror::Error, Debug)]
pub enum AccountError {
    #[error("Field '{0}' is required.")]
    MissingField(&'static str),

    #[error("Username {0} already exists.")]
    UsernameTaken(String),

    #[error("Email {0} already registered.")]
    EmailTaken(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

fn required(field: &'static str, value: &str) -> Result<String, AccountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AccountError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

pub async fn register(
    store: &dyn WaterStore,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AccountError> {
    let username = required("username", username)?;
    let email = required("email", email)?;
    let password_hash = required("password_hash", password_hash)?;

    if store.find_user_by_username(&username).await?.is_some() {
        return Err(AccountError::UsernameTaken(username));
    }
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AccountError::EmailTaken(email));
    }

    let user = store
        .insert_user(NewUser {
            username: username.clone(),
            email: email.clone(),
            password_hash,
        })
        .await
        .map_err(|e| {
            if e.violates(USERS_USERNAME_KEY) {
                AccountError::UsernameTaken(username)
            } else if e.violates(USERS_EMAIL_KEY) {
                AccountError::EmailTaken(email)
            } else {
                e.into()
            }
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Delete a user together with all of its readings.
pub async fn remove_user(store: &dyn WaterStore, id: UserId) -> Result<(), AccountError> {
    if store.delete_user(id).await? {
        tracing::info!(user_id = id, "user removed");
    }
    Ok(())
}
