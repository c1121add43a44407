use base64ct::{Base64, Encoding};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::auth::password;
use crate::error::AuthError;
use crate::state::AppState;
use crate::users::dto::AvatarUploadRequest;
use crate::users::model::PublicUser;
use crate::users::store::UserStore;

pub async fn get_profile(state: &AppState, id: Uuid) -> Result<PublicUser, AuthError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotExists)?;
    Ok(user.public())
}

pub async fn update_profile(
    state: &AppState,
    id: Uuid,
    full_name: &str,
) -> Result<PublicUser, AuthError> {
    let user = state
        .users
        .set_full_name(id, full_name)
        .await?
        .ok_or(AuthError::UserNotExists)?;
    Ok(user.public())
}

/// Change the password of a logged-in user; the old one must still match.
pub async fn update_password(
    state: &AppState,
    id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), AuthError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotExists)?;

    let matches = match user.password_hash.as_deref() {
        Some(hash) => password::verify_password(old_password, hash)?,
        None => false,
    };
    if !matches {
        return Err(AuthError::InvalidOldPassword);
    }

    let password_hash = password::hash_password(new_password)?;
    state.users.set_password(id, &password_hash).await?;
    info!(user_id = %id, "password updated");
    Ok(())
}

/// Decode the uploaded image, push it to object storage and persist the
/// public URL on the user.
pub async fn update_avatar(
    state: &AppState,
    id: Uuid,
    upload: AvatarUploadRequest,
) -> Result<PublicUser, AuthError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AuthError::UserNotExists)?;

    let bytes = Base64::decode_vec(&upload.base64_data)
        .map_err(|_| AuthError::Validation("Invalid base64 image data".into()))?;

    let year = OffsetDateTime::now_utc().year();
    let key = format!(
        "{year}/{id}/images/profile/{}.{}",
        upload.file_name, upload.file_type
    );
    let content_type = format!("image/{}", upload.file_type);

    let url = state
        .storage
        .upload_file(&key, Bytes::from(bytes), &content_type)
        .await?;

    let user = state
        .users
        .set_avatar(id, &url)
        .await?
        .ok_or(AuthError::UserNotExists)?;
    info!(user_id = %id, url = %url, "avatar updated");
    Ok(user.public())
}
