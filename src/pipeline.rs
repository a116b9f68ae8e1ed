//! Slug to HTML: fetch the page, check visibility, resolve featured classes,
//! render blocks in order and wrap them in the site chrome

use log::debug;
use sqlx::sqlite::SqlitePool;

use crate::auth::Viewer;
use crate::block::{Block, BlockContent, BlockInstance};
use crate::catalog::list_classes;
use crate::db::now_ms;
use crate::error::AppError;
use crate::pages::{get_page, Page};
use crate::queries::catalog::ClassFilter;
use crate::render::{render_blocks, render_document, DocumentMeta, RenderContext};
use crate::site::{load_site_settings, SiteSettings};

/// Upper bound on class cards per featured block regardless of its `limit` prop
const MAX_FEATURED_CLASSES: u32 = 24;

/// Load class cards for every `FeaturedClasses` block on the page
pub async fn resolve_render_context(
    pool: &SqlitePool,
    blocks: &[BlockInstance],
    editor_preview: bool,
) -> Result<RenderContext, AppError> {
    let mut ctx = RenderContext {
        editor_preview,
        ..Default::default()
    };
    for instance in blocks {
        if let BlockContent::Typed(Block::FeaturedClasses(props)) = &instance.content {
            let filter = ClassFilter {
                category_slug: props.category.as_deref(),
                published_only: true,
                limit: Some(u64::from(props.limit.min(MAX_FEATURED_CLASSES))),
                ..Default::default()
            };
            let classes = list_classes(pool, &filter).await?;
            ctx.featured.insert(instance.id.clone(), classes);
        }
    }
    Ok(ctx)
}

/// Render an already loaded page with the given chrome
pub fn render_loaded_page(page: &Page, site: &SiteSettings, ctx: &RenderContext) -> String {
    let body = render_blocks(&page.blocks, ctx);
    let meta = DocumentMeta {
        title: page.seo.title.as_deref().unwrap_or(&page.title),
        description: page.seo.description.as_deref(),
        keywords: &page.seo.keywords,
    };
    render_document(&meta, site, &body)
}

/// Render the page at `slug` for `viewer`
///
/// Missing pages and pages the viewer may not see are both [`AppError::NotFound`].
pub async fn render_page(
    pool: &SqlitePool,
    slug: &str,
    viewer: &Viewer,
) -> Result<String, AppError> {
    let page = get_page(pool, slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("page '{}'", slug)))?;

    if !page.is_publicly_visible(now_ms()) && !viewer.is_editor() {
        debug!("Hiding {} page '{}' from non-editor", page.status, slug);
        return Err(AppError::NotFound(format!("page '{}'", slug)));
    }

    let site = load_site_settings(pool).await?;
    let ctx = resolve_render_context(pool, &page.blocks, false).await?;
    Ok(render_loaded_page(&page, &site, &ctx))
}
