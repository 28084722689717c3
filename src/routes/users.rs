/// Profile Routes
///
/// CRUD over principals. Every route here sits behind the admission
/// middleware; identifiers come from the path.

use actix_web::{web, HttpResponse};

use crate::auth::{validate_profile, ProfilePayload};
use crate::error::AppError;
use crate::store::PrincipalStore;

/// GET /users
pub async fn list_users(
    principals: web::Data<dyn PrincipalStore>,
) -> Result<HttpResponse, AppError> {
    let users = principals.list_principals().await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /users/{id}
pub async fn get_user(
    path: web::Path<i64>,
    principals: web::Data<dyn PrincipalStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let user = principals
        .find_principal_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(HttpResponse::Ok().json(user))
}

/// PUT /users/{id}
///
/// Updates profile fields; the password cannot be changed here.
pub async fn update_user(
    path: web::Path<i64>,
    form: web::Json<ProfilePayload>,
    principals: web::Data<dyn PrincipalStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let update = validate_profile(&form)?;

    let user = principals
        .update_principal(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    tracing::info!(user_id = id, "Profile updated");
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /users/{id}
pub async fn delete_user(
    path: web::Path<i64>,
    principals: web::Data<dyn PrincipalStore>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    if !principals.delete_principal(id).await? {
        return Err(AppError::NotFound("User".to_string()));
    }

    tracing::info!(user_id = id, "Principal deleted");
    Ok(HttpResponse::NoContent().finish())
}
