//! Role-derived permission sets.

use serde::Serialize;

use super::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ArticlesRead,
    ArticlesWrite,
    ArticlesPublish,
    ArticlesDelete,
    SchedulerManage,
    MonitorRun,
    AnalyticsRead,
    NewsletterManage,
    UsersManage,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ArticlesRead => "articles_read",
            Self::ArticlesWrite => "articles_write",
            Self::ArticlesPublish => "articles_publish",
            Self::ArticlesDelete => "articles_delete",
            Self::SchedulerManage => "scheduler_manage",
            Self::MonitorRun => "monitor_run",
            Self::AnalyticsRead => "analytics_read",
            Self::NewsletterManage => "newsletter_manage",
            Self::UsersManage => "users_manage",
        }
    }

    pub fn all() -> &'static [Permission] {
        &[
            Self::ArticlesRead,
            Self::ArticlesWrite,
            Self::ArticlesPublish,
            Self::ArticlesDelete,
            Self::SchedulerManage,
            Self::MonitorRun,
            Self::AnalyticsRead,
            Self::NewsletterManage,
            Self::UsersManage,
        ]
    }
}

impl Role {
    pub fn permissions(self) -> Vec<Permission> {
        match self {
            Role::Admin => Permission::all().to_vec(),
            Role::Editor => vec![
                Permission::ArticlesRead,
                Permission::ArticlesWrite,
                Permission::ArticlesPublish,
                Permission::ArticlesDelete,
                Permission::SchedulerManage,
                Permission::MonitorRun,
                Permission::AnalyticsRead,
                Permission::NewsletterManage,
            ],
            Role::Writer => vec![
                Permission::ArticlesRead,
                Permission::ArticlesWrite,
                Permission::AnalyticsRead,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admins_manage_users() {
        assert!(Role::Admin.permissions().contains(&Permission::UsersManage));
        assert!(!Role::Editor.permissions().contains(&Permission::UsersManage));
        assert!(!Role::Writer.permissions().contains(&Permission::UsersManage));
    }

    #[test]
    fn writers_cannot_publish() {
        let writer = Role::Writer.permissions();
        assert!(writer.contains(&Permission::ArticlesWrite));
        assert!(!writer.contains(&Permission::ArticlesPublish));
        assert!(!writer.contains(&Permission::MonitorRun));
    }
}
