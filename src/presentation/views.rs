use crate::application::error::{ErrorReport, HttpError};
use crate::application::pagination::Page;
use crate::domain::{categories::Category, entities::ArticleRecord};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

pub const SITE_TITLE: &str = "Peoples Thread";
pub const SITE_DESCRIPTION: &str =
    "Independent news on working people, democracy and the economy.";

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response() -> Response {
    let view = LayoutContext::new(
        LayoutChrome::new("Page not found", None),
        ErrorPageView::not_found(),
    );
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct NavigationLinkView {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct NavigationView {
    pub entries: Vec<NavigationLinkView>,
}

impl NavigationView {
    /// Category links, with `active` highlighted.
    pub fn categories(active: Option<Category>) -> Self {
        let entries = Category::all()
            .iter()
            .map(|category| NavigationLinkView {
                label: category.display_name().to_string(),
                href: format!("/category/{}", category.slug()),
                is_active: active == Some(*category),
            })
            .collect();
        Self { entries }
    }
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub navigation: NavigationView,
    pub meta: PageMetaView,
    pub year: i32,
}

impl LayoutChrome {
    pub fn new(title: &str, active: Option<Category>) -> Self {
        let title = if title.is_empty() {
            SITE_TITLE.to_string()
        } else {
            format!("{title} | {SITE_TITLE}")
        };
        Self {
            navigation: NavigationView::categories(active),
            meta: PageMetaView {
                title,
                description: SITE_DESCRIPTION.to_string(),
            },
            year: OffsetDateTime::now_utc().year(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        if !description.trim().is_empty() {
            self.meta.description = description.trim().to_string();
        }
        self
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub site_title: &'static str,
    pub navigation: NavigationView,
    pub meta: PageMetaView,
    pub year: i32,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: SITE_TITLE,
            navigation: chrome.navigation,
            meta: chrome.meta,
            year: chrome.year,
            content,
        }
    }
}

#[derive(Clone)]
pub struct TagBadge {
    pub label: String,
}

#[derive(Clone)]
pub struct ArticleCard {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub category_label: String,
    pub category_href: String,
    pub author: String,
    pub published: String,
    pub iso_date: String,
}

impl From<&ArticleRecord> for ArticleCard {
    fn from(article: &ArticleRecord) -> Self {
        let time = article.primary_time();
        Self {
            slug: article.slug.clone(),
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            category_label: article.category.display_name().to_string(),
            category_href: format!("/category/{}", article.category.slug()),
            author: article.author.clone(),
            published: display_date(time),
            iso_date: iso_date(time),
        }
    }
}

pub struct HomeView {
    pub breaking: Option<ArticleCard>,
    pub featured: Vec<ArticleCard>,
    pub latest: Vec<ArticleCard>,
}

impl HomeView {
    pub fn is_empty(&self) -> bool {
        self.breaking.is_none() && self.featured.is_empty() && self.latest.is_empty()
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<HomeView>,
}

pub struct CategoryPageView {
    pub name: String,
    pub articles: Vec<ArticleCard>,
    pub page: u32,
    pub total_pages: u32,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

impl CategoryPageView {
    pub fn new(category: Category, page: Page<ArticleRecord>) -> Self {
        let base = format!("/category/{}", category.slug());
        let prev_href = (page.page > 1).then(|| format!("{base}?page={}", page.page - 1));
        let next_href = page
            .has_next()
            .then(|| format!("{base}?page={}", page.page + 1));
        Self {
            name: category.display_name().to_string(),
            articles: page.items.iter().map(ArticleCard::from).collect(),
            page: page.page,
            total_pages: page.total_pages(),
            prev_href,
            next_href,
        }
    }

    pub fn has_articles(&self) -> bool {
        !self.articles.is_empty()
    }
}

#[derive(Template)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub view: LayoutContext<CategoryPageView>,
}

pub struct SourceLinkView {
    pub title: String,
    pub href: String,
}

pub struct ArticleDetailView {
    pub card: ArticleCard,
    pub paragraphs: Vec<String>,
    pub tags: Vec<TagBadge>,
    pub breaking: bool,
    pub ai_generated: bool,
    pub view_count: i64,
    pub source: Option<SourceLinkView>,
    pub related: Vec<ArticleCard>,
}

impl ArticleDetailView {
    pub fn new(article: &ArticleRecord, related: &[ArticleRecord]) -> Self {
        let source = article.source_url.as_ref().map(|href| SourceLinkView {
            title: article
                .source_title
                .clone()
                .unwrap_or_else(|| href.clone()),
            href: href.clone(),
        });
        Self {
            card: ArticleCard::from(article),
            paragraphs: split_paragraphs(&article.body),
            tags: article
                .tags
                .iter()
                .map(|tag| TagBadge {
                    label: format!("#{tag}"),
                })
                .collect(),
            breaking: article.breaking,
            ai_generated: article.ai_generated,
            view_count: article.view_count,
            source,
            related: related.iter().map(ArticleCard::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub view: LayoutContext<ArticleDetailView>,
}

#[derive(Default)]
pub struct NewsletterView {
    pub email: String,
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "newsletter.html")]
pub struct NewsletterTemplate {
    pub view: LayoutContext<NewsletterView>,
}

pub struct StaticPageView {
    pub heading: &'static str,
    pub paragraphs: &'static [&'static str],
}

impl StaticPageView {
    pub fn about() -> Self {
        Self {
            heading: "About Peoples Thread",
            paragraphs: &[
                "Peoples Thread is an independent newsroom covering the stories that shape \
                 working lives: wages, housing, health care, elections and the climate.",
                "Our editors publish original reporting alongside drafts prepared with AI \
                 assistance. Every AI-assisted piece is labelled and reviewed by a person \
                 before it reaches the front page.",
            ],
        }
    }

    pub fn support() -> Self {
        Self {
            heading: "Support independent news",
            paragraphs: &[
                "Peoples Thread has no paywall and no corporate owner. Reader support keeps \
                 the reporting free for everyone.",
                "Subscribing to the newsletter is the simplest way to help: it tells us which \
                 stories matter to you and keeps you in the thread.",
            ],
        }
    }
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct StaticPageTemplate {
    pub view: LayoutContext<StaticPageView>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try the front page for the latest \
                      stories."
                .to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

/// Body text split on blank lines; each paragraph is escaped by the template.
pub fn split_paragraphs(body: &str) -> Vec<String> {
    body.replace("\r\n", "\n")
        .split("\n\n")
        .map(|paragraph| paragraph.trim())
        .filter(|paragraph| !paragraph.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn display_date(time: OffsetDateTime) -> String {
    time.format(format_description!("[month repr:long] [day padding:none], [year]"))
        .unwrap_or_default()
}

pub fn iso_date(time: OffsetDateTime) -> String {
    time.format(&Rfc3339).unwrap_or_default()
}
