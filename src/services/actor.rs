use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::mentor::Mentor;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    LeadMentor,
    SchoolAdmin,
    Mentor,
    Student,
    Guest,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.to_ascii_lowercase().as_str() {
            "superadmin" => Some(Role::SuperAdmin),
            "leadmentor" => Some(Role::LeadMentor),
            "schooladmin" => Some(Role::SchoolAdmin),
            "mentor" => Some(Role::Mentor),
            "student" => Some(Role::Student),
            "guest" => Some(Role::Guest),
            _ => None,
        }
    }

    /// Top-level roles see every school.
    pub fn is_top_level(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::LeadMentor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    CreateAssessments,
    ManageAssessments,
}

/// Resolved per-request actor: identity, role, school scope and derived
/// capabilities. Operations assert the capability they need instead of
/// re-branching on roles.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    /// Schools the actor is restricted to. Empty for top-level roles, which
    /// are unrestricted.
    pub school_ids: Vec<Uuid>,
}

impl Actor {
    pub async fn resolve(pool: &PgPool, claims: &Claims) -> Result<Actor> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))?;
        let role = claims
            .role
            .as_deref()
            .and_then(Role::parse)
            .ok_or_else(|| Error::Forbidden("Unknown role".to_string()))?;

        let school_ids = if role == Role::Mentor {
            let mentor = sqlx::query_as::<_, Mentor>(
                r#"SELECT * FROM mentors WHERE user_id = $1 AND is_active = TRUE"#,
            )
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
            mentor.map(|m| m.assigned_schools).unwrap_or_default()
        } else {
            Vec::new()
        };

        Ok(Actor {
            user_id,
            role,
            school_ids,
        })
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateAssessments | Capability::ManageAssessments => matches!(
                self.role,
                Role::SuperAdmin | Role::LeadMentor | Role::Mentor
            ),
        }
    }

    /// Whether the actor may touch resources of the given school.
    pub fn in_scope(&self, school_id: Uuid) -> bool {
        self.role.is_top_level() || self.school_ids.contains(&school_id)
    }

    /// The owning school for resources a mentor creates: their first
    /// assigned school.
    pub fn primary_school(&self) -> Option<Uuid> {
        self.school_ids.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role, school_ids: Vec<Uuid>) -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            role,
            school_ids,
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!(Role::parse("SuperAdmin"), Some(Role::SuperAdmin));
        assert_eq!(Role::parse("mentor"), Some(Role::Mentor));
        assert_eq!(Role::parse("unknown"), None);
    }

    #[test]
    fn creation_capability_matches_role_set() {
        assert!(actor(Role::SuperAdmin, vec![]).has(Capability::CreateAssessments));
        assert!(actor(Role::LeadMentor, vec![]).has(Capability::CreateAssessments));
        assert!(actor(Role::Mentor, vec![]).has(Capability::CreateAssessments));
        assert!(!actor(Role::SchoolAdmin, vec![]).has(Capability::CreateAssessments));
        assert!(!actor(Role::Student, vec![]).has(Capability::ManageAssessments));
    }

    #[test]
    fn top_level_roles_are_unrestricted() {
        let school = Uuid::new_v4();
        assert!(actor(Role::SuperAdmin, vec![]).in_scope(school));
        let mentor = actor(Role::Mentor, vec![school]);
        assert!(mentor.in_scope(school));
        assert!(!mentor.in_scope(Uuid::new_v4()));
    }
}
