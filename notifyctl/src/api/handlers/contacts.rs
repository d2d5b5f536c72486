use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::{
        models::{
            common::MessageResponse,
            contacts::{ContactCreate, ContactListResponse, ContactResponse, ContactUpdate, ListContactsQuery},
            envelope::{Success, ok},
        },
        validation::ValidatedJson,
    },
    auth::permissions::{RequiresPermission, feature},
    db::{
        handlers::{Contacts, Repository, contacts::ContactFilter},
        models::contacts::{ContactCreateDBRequest, ContactUpdateDBRequest},
    },
    errors::{Error, Result},
    types::ContactId,
};

fn contact_not_found(id: ContactId) -> Error {
    Error::NotFound {
        resource: "Contact".to_string(),
        id: id.to_string(),
    }
}

/// List contacts, optionally searching name, phone and email
#[utoipa::path(
    get,
    path = "/contacts",
    tag = "contacts",
    params(ListContactsQuery),
    responses(
        (status = 200, description = "Contacts, newest first", body = ContactListResponse),
        (status = 403, description = "Contact access not granted"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_contacts(
    State(state): State<AppState>,
    Query(query): Query<ListContactsQuery>,
    permission: RequiresPermission<feature::ContactsView>,
) -> Result<Json<Success<ContactListResponse>>> {
    let (skip, limit) = query.pagination.params();
    let filter = ContactFilter::new(skip, limit).with_search(query.search);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Contacts::scoped(&mut conn, permission.user.scope());
    let contacts = repo.list(&filter).await?;
    let total_count = repo.count(&filter).await?;

    Ok(ok(ContactListResponse {
        contacts: contacts.into_iter().map(ContactResponse::from).collect(),
        total_count,
        skip,
        limit,
    }))
}

/// Get a contact
#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = "contacts",
    params(("id" = uuid::Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact", body = ContactResponse),
        (status = 404, description = "Contact not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn get_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    permission: RequiresPermission<feature::ContactsView>,
) -> Result<Json<Success<ContactResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::scoped(&mut conn, permission.user.scope())
        .get_by_id(id)
        .await?
        .ok_or_else(|| contact_not_found(id))?;
    Ok(ok(ContactResponse::from(contact)))
}

/// Create a contact
#[utoipa::path(
    post,
    path = "/contacts",
    tag = "contacts",
    request_body = ContactCreate,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Phone number already in this account's contacts"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_contact(
    State(state): State<AppState>,
    permission: RequiresPermission<feature::ContactsManage>,
    ValidatedJson(create): ValidatedJson<ContactCreate>,
) -> Result<(StatusCode, Json<Success<ContactResponse>>)> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::scoped(&mut conn, permission.user.scope())
        .create(&ContactCreateDBRequest::new(permission.user.id, create))
        .await?;
    Ok((StatusCode::CREATED, ok(ContactResponse::from(contact))))
}

/// Update a contact (partial)
#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = "contacts",
    request_body = ContactUpdate,
    params(("id" = uuid::Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Updated contact", body = ContactResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Contact not found"),
        (status = 409, description = "Phone number already in this account's contacts"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    permission: RequiresPermission<feature::ContactsManage>,
    ValidatedJson(update): ValidatedJson<ContactUpdate>,
) -> Result<Json<Success<ContactResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let contact = Contacts::scoped(&mut conn, permission.user.scope())
        .update(id, &ContactUpdateDBRequest::from(update))
        .await?;
    Ok(ok(ContactResponse::from(contact)))
}

/// Delete a contact
#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "contacts",
    params(("id" = uuid::Uuid, Path, description = "Contact ID")),
    responses(
        (status = 200, description = "Contact deleted", body = MessageResponse),
        (status = 404, description = "Contact not found"),
    ),
    security(("BearerAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_contact(
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    permission: RequiresPermission<feature::ContactsManage>,
) -> Result<Json<Success<MessageResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    if !Contacts::scoped(&mut conn, permission.user.scope()).delete(id).await? {
        return Err(contact_not_found(id));
    }
    Ok(ok(MessageResponse::new("Contact deleted successfully")))
}

#[cfg(test)]
mod tests {
    use crate::{api::models::users::Role, test_utils::*};
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_phone_in_one_account_conflicts(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;
        let other = create_test_user(&pool, Role::User).await;

        let ada = json!({ "name": "Ada", "phone": "+1 555 0100", "tags": ["vip"] });
        let created = server.post("/contacts").add_header("authorization", bearer(&user)).json(&ada).await;
        created.assert_status(StatusCode::CREATED);
        assert_eq!(created.json::<Value>()["phone"], "+15550100");

        let duplicate = server.post("/contacts").add_header("authorization", bearer(&user)).json(&ada).await;
        duplicate.assert_status(StatusCode::CONFLICT);
        assert_eq!(duplicate.json::<Value>()["message"], "A contact with this phone number already exists");

        server
            .post("/contacts")
            .add_header("authorization", bearer(&other))
            .json(&ada)
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_search_and_pagination(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool, Role::User).await;

        for (name, phone) in [("Ada Lovelace", "+15550100"), ("Grace Hopper", "+15550101"), ("Alan Turing", "+15550102")] {
            server
                .post("/contacts")
                .add_header("authorization", bearer(&user))
                .json(&json!({ "name": name, "phone": phone }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let found: Value = server
            .get("/contacts?search=HOPPER")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(found["total_count"], 1);
        assert_eq!(found["contacts"][0]["name"], "Grace Hopper");

        let page: Value = server
            .get("/contacts?skip=1&limit=1")
            .add_header("authorization", bearer(&user))
            .await
            .json();
        assert_eq!(page["total_count"], 3);
        assert_eq!(page["skip"], 1);
        assert_eq!(page["contacts"].as_array().unwrap().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_delete_and_isolation(pool: PgPool) {
        let server = create_test_app(pool.clone()).await;
        let owner = create_test_user(&pool, Role::User).await;
        let stranger = create_test_user(&pool, Role::User).await;

        let created: Value = server
            .post("/contacts")
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "name": "Ada", "phone": "+15550100", "email": "ada@example.com" }))
            .await
            .json();
        let id = created["id"].as_str().unwrap();

        let updated: Value = server
            .put(&format!("/contacts/{id}"))
            .add_header("authorization", bearer(&owner))
            .json(&json!({ "tags": ["engine", "poet"] }))
            .await
            .json();
        assert_eq!(updated["tags"], json!(["engine", "poet"]));
        assert_eq!(updated["email"], "ada@example.com");

        server
            .get(&format!("/contacts/{id}"))
            .add_header("authorization", bearer(&stranger))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/contacts/{id}"))
            .add_header("authorization", bearer(&stranger))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .delete(&format!("/contacts/{id}"))
            .add_header("authorization", bearer(&owner))
            .await
            .assert_status_ok();
    }
}
