//! Group repository.

use std::collections::HashMap;
use std::sync::Arc;

use super::{PAGE_SIZE, page_offset};
use crate::entities::{Event, Group, GroupMember, event, group, group_member};
use huddle_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

#[derive(Debug, FromQueryResult)]
struct MemberCount {
    group_id: String,
    count: i64,
}

/// Group repository for database operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group::Model>> {
        Group::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a group by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {id} not found")))
    }

    /// List groups, newest first, optionally filtered by name.
    pub async fn search(&self, query: Option<&str>) -> AppResult<Vec<group::Model>> {
        let mut select = Group::find();
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            select = select.filter(group::Column::Name.contains(query.trim()));
        }

        select
            .order_by_desc(group::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Groups the user is a member of.
    pub async fn find_by_member(&self, user_id: &str) -> AppResult<Vec<group::Model>> {
        let group_ids: Vec<String> = GroupMember::find()
            .filter(group_member::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .into_iter()
            .map(|m| m.group_id)
            .collect();

        if group_ids.is_empty() {
            return Ok(vec![]);
        }

        Group::find()
            .filter(group::Column::Id.is_in(group_ids))
            .order_by_desc(group::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a group together with its creator's admin membership.
    ///
    /// Both rows are written in one transaction.
    pub async fn create_with_admin(
        &self,
        group: group::Model,
        admin: group_member::Model,
    ) -> AppResult<group::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Group::insert(group::ActiveModel::from(group.clone()))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        GroupMember::insert(group_member::ActiveModel::from(admin))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(group)
    }

    /// Update a group.
    pub async fn update(&self, model: group::ActiveModel) -> AppResult<group::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a group, its memberships, and detach its events.
    ///
    /// Events survive with `group_id` cleared.
    pub async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        GroupMember::delete_many()
            .filter(group_member::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Event::update_many()
            .col_expr(event::Column::GroupId, Expr::value(Option::<String>::None))
            .filter(event::Column::GroupId.eq(id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Group::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Members ====================

    /// Find a user's membership in a group.
    pub async fn find_membership(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> AppResult<Option<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a membership. An existing `(user, group)` row yields `Conflict`.
    pub async fn add_member(
        &self,
        model: group_member::Model,
    ) -> AppResult<group_member::Model> {
        let inserted = GroupMember::insert(group_member::ActiveModel::from(model.clone()))
            .on_conflict(
                OnConflict::columns([
                    group_member::Column::UserId,
                    group_member::Column::GroupId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if inserted == 0 {
            return Err(AppError::Conflict(
                "Already a member of this group".to_string(),
            ));
        }

        Ok(model)
    }

    /// Remove a membership. Returns whether a row was deleted.
    pub async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let result = GroupMember::delete_many()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// One page of a group's members, oldest membership first.
    pub async fn find_members_page(
        &self,
        group_id: &str,
        page: u64,
    ) -> AppResult<Vec<group_member::Model>> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .order_by_asc(group_member::Column::JoinedAt)
            .order_by_asc(group_member::Column::Id)
            .offset(page_offset(page)?)
            .limit(PAGE_SIZE)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of members in a group.
    pub async fn count_members(&self, group_id: &str) -> AppResult<u64> {
        GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Member counts for several groups. Groups without members are absent.
    pub async fn member_counts(&self, group_ids: &[String]) -> AppResult<HashMap<String, u64>> {
        if group_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = GroupMember::find()
            .select_only()
            .column(group_member::Column::GroupId)
            .column_as(group_member::Column::Id.count(), "count")
            .filter(group_member::Column::GroupId.is_in(group_ids.iter().cloned()))
            .group_by(group_member::Column::GroupId)
            .into_model::<MemberCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| (row.group_id, u64::try_from(row.count).unwrap_or(0)))
            .collect())
    }
}
