//! gRPC surface of the service.
//!
//! [`UsersRpc`] is a thin adaptor: it converts between wire and domain
//! shapes and maps the domain error taxonomy onto status codes. All call
//! handling logic lives in [`UserService`].

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{info, warn};

use userd_proto::proto;
use userd_service::{NewUser, SanitizedUser, UserError, UserQuery, UserRef, UserService, UserUpdate};

/// Message sent in place of internal error details.
const MSG_INTERNAL_SERVER_ERROR: &str = "internal server error";

/// Implementation of the `users.v1.Users` service.
pub struct UsersRpc {
    service: Arc<UserService>,
}

impl UsersRpc {
    pub fn new(service: Arc<UserService>) -> Self {
        Self { service }
    }
}

fn status_from(err: UserError) -> Status {
    match err {
        UserError::AlreadyExists => Status::already_exists(err.to_string()),
        UserError::Invalid => Status::invalid_argument(err.to_string()),
        UserError::NotFound => Status::not_found(err.to_string()),
        UserError::InvalidVersion => Status::failed_precondition(err.to_string()),
        UserError::Internal(_) => Status::internal(MSG_INTERNAL_SERVER_ERROR),
    }
}

fn user_to_proto(user: SanitizedUser) -> proto::User {
    proto::User {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        nickname: user.nickname,
        email: user.email,
        country: user.country,
        created_at: user.created_at,
        updated_at: user.updated_at,
        version: user.version,
    }
}

#[tonic::async_trait]
impl userd_proto::Users for UsersRpc {
    async fn create_user(
        &self,
        request: Request<proto::NewUser>,
    ) -> Result<Response<proto::User>, Status> {
        let new_user = request.into_inner();
        info!(nickname = %new_user.nickname, "creating user");

        let user = self
            .service
            .create(&NewUser {
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                nickname: new_user.nickname,
                password: new_user.password,
                confirm_password: new_user.confirm_password,
                email: new_user.email,
                country: new_user.country,
            })
            .await
            .map_err(|err| {
                warn!(error = %err, "error creating user");
                status_from(err)
            })?;

        Ok(Response::new(user_to_proto(user)))
    }

    async fn update_user(
        &self,
        request: Request<proto::Update>,
    ) -> Result<Response<proto::User>, Status> {
        let update = request.into_inner();
        info!(id = %update.id, "updating user");

        let user = self
            .service
            .update(&UserUpdate {
                id: update.id,
                first_name: update.first_name,
                last_name: update.last_name,
                password: update.password,
                confirm_password: update.confirm_password,
                country: update.country,
                version: update.version,
            })
            .await
            .map_err(|err| {
                warn!(error = %err, "error updating user");
                status_from(err)
            })?;

        Ok(Response::new(user_to_proto(user)))
    }

    async fn delete_user(
        &self,
        request: Request<proto::Ref>,
    ) -> Result<Response<proto::Empty>, Status> {
        let user_ref = request.into_inner();
        info!(id = %user_ref.id, "deleting user");

        self.service
            .delete(&UserRef { id: user_ref.id })
            .await
            .map_err(|err| {
                warn!(error = %err, "error deleting user");
                status_from(err)
            })?;

        Ok(Response::new(proto::Empty {}))
    }

    async fn find_users(
        &self,
        request: Request<proto::Query>,
    ) -> Result<Response<proto::Page>, Status> {
        let query = request.into_inner();
        info!(
            page = query.page,
            country = %query.country,
            created_after = %query.created_after,
            "finding users"
        );

        let page = self
            .service
            .find(&UserQuery {
                created_after: query.created_after,
                country: query.country,
                length: query.length,
                page: query.page,
            })
            .await
            .map_err(|err| {
                warn!(error = %err, "error finding users");
                status_from(err)
            })?;

        Ok(Response::new(proto::Page {
            page: page.page,
            total: page.total,
            items: page.items.into_iter().map(user_to_proto).collect(),
        }))
    }
}
