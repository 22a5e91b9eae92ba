use std::collections::BTreeSet;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, DeleteMany,
    EntityTrait, Insert, LoaderTrait, QueryFilter, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use keeper_auth_schema::{one_time_codes, refresh_tokens, roles, user_roles, users};

use crate::domain::repository::{OneTimeCodeRepository, RefreshTokenRepository, UserDirectory};
use crate::domain::types::{NewUser, OneTimeCode, Redemption, RefreshToken, UserAccount};
use crate::error::AuthServiceError;

// ── User directory ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserDirectory {
    pub db: DatabaseConnection,
}

impl DbUserDirectory {
    async fn find_one(
        &self,
        filter: sea_orm::sea_query::SimpleExpr,
    ) -> Result<Option<UserAccount>, AuthServiceError> {
        let Some(model) = users::Entity::find()
            .filter(filter)
            .one(&self.db)
            .await
            .context("find user")?
        else {
            return Ok(None);
        };
        let roles = vec![model.clone()]
            .load_many_to_many(roles::Entity, user_roles::Entity, &self.db)
            .await
            .context("load user roles")?
            .pop()
            .unwrap_or_default();
        Ok(Some(account_from_model(model, roles)))
    }
}

impl UserDirectory for DbUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>, AuthServiceError> {
        self.find_one(users::Column::Id.eq(id)).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, AuthServiceError> {
        self.find_one(users::Column::Email.eq(email)).await
    }

    async fn create(&self, user: &NewUser) -> Result<UserAccount, AuthServiceError> {
        let txn = self.db.begin().await.context("begin create user")?;

        let role = roles::Entity::find()
            .filter(roles::Column::Name.eq(&user.role))
            .one(&txn)
            .await
            .context("find role")?
            .ok_or(AuthServiceError::RoleNotFound)?;

        let now = Utc::now();
        let model = users::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            picture: Set(user.picture.clone()),
            active: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AuthServiceError::EmailAlreadyExists,
            _ => AuthServiceError::Internal(anyhow::Error::new(e).context("insert user")),
        })?;

        user_roles::Entity::insert(user_roles::ActiveModel {
            user_id: Set(model.id),
            role_id: Set(role.id),
        })
        .exec_without_returning(&txn)
        .await
        .context("insert user role")?;

        one_time_codes::Entity::insert(one_time_codes::ActiveModel {
            user_id: Set(model.id),
            code: Set(code_to_column(user.first_code.code)),
            expires_at: Set(user.first_code.expires_at),
        })
        .exec_without_returning(&txn)
        .await
        .context("insert first one-time code")?;

        txn.commit().await.context("commit create user")?;
        Ok(account_from_model(model, vec![role]))
    }

    async fn save(&self, user: &UserAccount) -> Result<(), AuthServiceError> {
        let txn = self.db.begin().await.context("begin save user")?;

        let roles = roles::Entity::find()
            .filter(roles::Column::Name.is_in(user.roles.iter().cloned()))
            .all(&txn)
            .await
            .context("resolve roles")?;
        if roles.len() != user.roles.len() {
            return Err(AuthServiceError::RoleNotFound);
        }

        let updated = users::ActiveModel {
            id: Set(user.id),
            name: Set(user.name.clone()),
            email: Set(user.email.clone()),
            password_hash: Set(user.password_hash.clone()),
            picture: Set(user.picture.clone()),
            active: Set(user.active),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(&txn)
        .await;
        match updated {
            Ok(_) => {}
            Err(DbErr::RecordNotUpdated) => return Err(AuthServiceError::UserNotFound),
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    return Err(AuthServiceError::EmailAlreadyExists);
                }
                _ => return Err(anyhow::Error::new(e).context("update user").into()),
            },
        }

        user_roles::Entity::delete_many()
            .filter(user_roles::Column::UserId.eq(user.id))
            .exec(&txn)
            .await
            .context("clear user roles")?;
        if !roles.is_empty() {
            user_roles::Entity::insert_many(roles.iter().map(|role| user_roles::ActiveModel {
                user_id: Set(user.id),
                role_id: Set(role.id),
            }))
            .exec_without_returning(&txn)
            .await
            .context("insert user roles")?;
        }

        txn.commit().await.context("commit save user")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AuthServiceError> {
        let result = users::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("delete user")?;
        Ok(result.rows_affected > 0)
    }
}

fn account_from_model(model: users::Model, roles: Vec<roles::Model>) -> UserAccount {
    UserAccount {
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        picture: model.picture,
        active: model.active,
        roles: roles.into_iter().map(|r| r.name).collect::<BTreeSet<_>>(),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── One-time code repository ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOneTimeCodeRepository {
    pub db: DatabaseConnection,
}

impl OneTimeCodeRepository for DbOneTimeCodeRepository {
    async fn upsert(
        &self,
        user_id: Uuid,
        code: u32,
        fresh_expires_at: DateTime<Utc>,
        reissue_expires_at: DateTime<Utc>,
    ) -> Result<OneTimeCode, AuthServiceError> {
        let model = otp_upsert(user_id, code, fresh_expires_at, reissue_expires_at)
            .exec_with_returning(&self.db)
        .await
        .context("upsert one-time code")?;
        otp_from_model(model)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<OneTimeCode>, AuthServiceError> {
        one_time_codes::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .context("find one-time code")?
            .map(otp_from_model)
            .transpose()
    }

    async fn redeem(
        &self,
        user_id: Uuid,
        code: u32,
        redemption: &Redemption,
    ) -> Result<bool, AuthServiceError> {
        let redemption = redemption.clone();
        let redeemed = self
            .db
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    let deleted = otp_redeem_delete(user_id, code).exec(txn).await?;
                    if deleted.rows_affected == 0 {
                        return Ok(false);
                    }

                    let mut user = users::ActiveModel {
                        id: Set(user_id),
                        updated_at: Set(Utc::now()),
                        ..Default::default()
                    };
                    match redemption {
                        Redemption::Activate => user.active = Set(true),
                        Redemption::SetPasswordHash(hash) => user.password_hash = Set(hash),
                    }
                    user.update(txn).await?;
                    Ok(true)
                })
            })
            .await
            .context("redeem one-time code")?;
        Ok(redeemed)
    }
}

/// A new row gets `fresh_expires_at`; an existing row keeps its key and takes
/// the new code with `reissue_expires_at`.
fn otp_upsert(
    user_id: Uuid,
    code: u32,
    fresh_expires_at: DateTime<Utc>,
    reissue_expires_at: DateTime<Utc>,
) -> Insert<one_time_codes::ActiveModel> {
    one_time_codes::Entity::insert(one_time_codes::ActiveModel {
        user_id: Set(user_id),
        code: Set(code_to_column(code)),
        expires_at: Set(fresh_expires_at),
    })
    .on_conflict(
        OnConflict::column(one_time_codes::Column::UserId)
            .update_column(one_time_codes::Column::Code)
            .value(one_time_codes::Column::ExpiresAt, Expr::value(reissue_expires_at))
            .to_owned(),
    )
}

/// Deletes the row only while it still holds `code`.
fn otp_redeem_delete(user_id: Uuid, code: u32) -> DeleteMany<one_time_codes::Entity> {
    one_time_codes::Entity::delete_many()
        .filter(one_time_codes::Column::UserId.eq(user_id))
        .filter(one_time_codes::Column::Code.eq(code_to_column(code)))
}

fn code_to_column(code: u32) -> i32 {
    // Codes are six digits; the column is a plain INTEGER.
    code as i32
}

fn otp_from_model(model: one_time_codes::Model) -> Result<OneTimeCode, AuthServiceError> {
    let code = u32::try_from(model.code).context("negative one-time code in storage")?;
    Ok(OneTimeCode {
        user_id: model.user_id,
        code,
        expires_at: model.expires_at,
    })
}

// ── Refresh token repository ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenRepository {
    pub db: DatabaseConnection,
}

impl RefreshTokenRepository for DbRefreshTokenRepository {
    async fn upsert(&self, token: &RefreshToken) -> Result<(), AuthServiceError> {
        refresh_upsert(token)
            .exec_without_returning(&self.db)
            .await
            .context("upsert refresh token")?;
        Ok(())
    }

    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshToken>, AuthServiceError> {
        let model = refresh_tokens::Entity::find()
            .filter(refresh_tokens::Column::Token.eq(token))
            .one(&self.db)
            .await
            .context("find refresh token")?;
        Ok(model.map(|m| RefreshToken {
            user_id: m.user_id,
            token: m.token,
            expires_at: m.expires_at,
        }))
    }

    async fn delete_by_token(&self, token: &str) -> Result<bool, AuthServiceError> {
        let result = refresh_tokens::Entity::delete_many()
            .filter(refresh_tokens::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .context("delete refresh token")?;
        Ok(result.rows_affected > 0)
    }
}

fn refresh_upsert(token: &RefreshToken) -> Insert<refresh_tokens::ActiveModel> {
    refresh_tokens::Entity::insert(refresh_tokens::ActiveModel {
        user_id: Set(token.user_id),
        token: Set(token.token.clone()),
        expires_at: Set(token.expires_at),
    })
    .on_conflict(
        OnConflict::column(refresh_tokens::Column::UserId)
            .update_columns([
                refresh_tokens::Column::Token,
                refresh_tokens::Column::ExpiresAt,
            ])
            .to_owned(),
    )
}
