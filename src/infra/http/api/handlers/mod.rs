mod admin;
mod articles;
mod auth;
mod monitor;
mod newsletter;
mod scheduled;

pub use admin::{analytics, create_user, list_subscribers, list_users};
pub use articles::{
    create_article, delete_article, generate_article, get_admin_article, get_article,
    list_admin_articles, list_articles, list_categories, list_tags, record_view, update_article,
    update_article_status,
};
pub use auth::{login, me};
pub use monitor::{
    add_keyword, list_candidates, list_keywords, remove_keyword, replace_keywords, run_monitor,
};
pub use newsletter::{subscribe, unsubscribe};
pub use scheduled::{cancel_scheduled, create_scheduled, list_scheduled, run_scheduled};
