use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use crate::models::{
    RepoError,
    project::{NewProject, Project},
    project_member::{ProjectMember, ProjectRole},
};

pub struct ProjectRepository;

impl ProjectRepository {
    pub async fn create(pool: &SqlitePool, new: NewProject, owner_id: Uuid) -> Result<Project, RepoError> {
        let id = Uuid::new_v4();
        let mut tx = pool.begin().await.map_err(RepoError::Database)?;

        let project = sqlx::query_as::<Sqlite, Project>(
            r#"
            INSERT INTO projects (id, slug, name, settings, created_at, updated_at)
            VALUES (?, ?, ?, ?, datetime('now'), datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(&new.slug)
        .bind(&new.name)
        .bind(sqlx::types::Json(new.settings))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict(format!("slug already in use: {}", new.slug))
            }
            other => RepoError::Database(other),
        })?;

        sqlx::query(
            "INSERT INTO project_members (id, project_id, user_id, role, granted_at) VALUES (?, ?, ?, ?, datetime('now'))",
        )
        .bind(Uuid::new_v4().as_bytes().as_slice())
        .bind(id.as_bytes().as_slice())
        .bind(owner_id.as_bytes().as_slice())
        .bind(ProjectRole::Owner.to_string())
        .execute(&mut *tx)
        .await
        .map_err(RepoError::Database)?;

        tx.commit().await.map_err(RepoError::Database)?;
        Ok(project)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Project>, RepoError> {
        sqlx::query_as::<Sqlite, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Project>, RepoError> {
        sqlx::query_as::<Sqlite, Project>("SELECT * FROM projects WHERE slug = ?")
            .bind(slug)
            .fetch_optional(pool)
            .await
            .map_err(RepoError::Database)
    }

    pub async fn list_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Project>, RepoError> {
        sqlx::query_as::<Sqlite, Project>(
            r#"
            SELECT p.* FROM projects p
            JOIN project_members pm ON pm.project_id = p.id
            WHERE pm.user_id = ?
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(user_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}

pub struct ProjectMemberRepository;

impl ProjectMemberRepository {
    pub async fn add(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<ProjectMember, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query_as::<Sqlite, ProjectMember>(
            r#"
            INSERT INTO project_members (id, project_id, user_id, role, granted_at)
            VALUES (?, ?, ?, ?, datetime('now'))
            RETURNING *
            "#,
        )
        .bind(id.as_bytes().as_slice())
        .bind(project_id.as_bytes().as_slice())
        .bind(user_id.as_bytes().as_slice())
        .bind(role.to_string())
        .fetch_one(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Conflict("user is already a member of this project".to_string())
            }
            other => RepoError::Database(other),
        })
    }

    pub async fn find(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMember>, RepoError> {
        sqlx::query_as::<Sqlite, ProjectMember>(
            "SELECT * FROM project_members WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id.as_bytes().as_slice())
        .bind(user_id.as_bytes().as_slice())
        .fetch_optional(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn list_for_project(pool: &SqlitePool, project_id: Uuid) -> Result<Vec<ProjectMember>, RepoError> {
        sqlx::query_as::<Sqlite, ProjectMember>(
            "SELECT * FROM project_members WHERE project_id = ? ORDER BY granted_at ASC",
        )
        .bind(project_id.as_bytes().as_slice())
        .fetch_all(pool)
        .await
        .map_err(RepoError::Database)
    }

    pub async fn update_role(
        pool: &SqlitePool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE project_members SET role = ? WHERE project_id = ? AND user_id = ?")
            .bind(role.to_string())
            .bind(project_id.as_bytes().as_slice())
            .bind(user_id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound("project_member"));
        }
        Ok(())
    }

    pub async fn remove(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
            .bind(project_id.as_bytes().as_slice())
            .bind(user_id.as_bytes().as_slice())
            .execute(pool)
            .await
            .map_err(RepoError::Database)?;
        Ok(())
    }
}
