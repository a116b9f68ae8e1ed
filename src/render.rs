//! HTML rendering for blocks and the shared page chrome
//!
//! Rendering never fails: every block variant has markup, and blocks that did
//! not parse render as a comment (public) or a visible placeholder (editor
//! preview). All text goes through `html_escape`.

use std::collections::HashMap;
use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::block::{
    Block, BlockContent, BlockInstance, BlogTeasersProps, ContentSplitProps, CtaSectionProps,
    FaqAccordionProps, FeaturedClassesProps, FooterColumn, FooterProps, HeroSearchProps,
    ImagePosition, Link, NavBarProps, TeacherSpotlightProps, TestimonialsProps, TrustBadgesProps,
};
use crate::catalog::{format_price, ClassSummary};
use crate::site::SiteSettings;

/// Data the renderer reads but does not fetch
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    /// Class cards for each `FeaturedClasses` block, keyed by block id
    pub featured: HashMap<String, Vec<ClassSummary>>,
    /// Show placeholders for unsupported blocks instead of hiding them
    pub editor_preview: bool,
}

/// Document-level metadata for the `<head>`
#[derive(Debug, Clone, Default)]
pub struct DocumentMeta<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub keywords: &'a [String],
}

/// Only allow relative links and http(s)/mailto/tel schemes
pub(crate) fn safe_href(href: &str) -> &str {
    let trimmed = href.trim();
    let lower = trimmed.to_ascii_lowercase();
    let allowed = trimmed.starts_with('/')
        || trimmed.starts_with('#')
        || trimmed.starts_with('?')
        || lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:");
    if allowed {
        trimmed
    } else {
        "#"
    }
}

fn link_html(out: &mut String, link: &Link, class: &str) {
    let _ = write!(
        out,
        r#"<a class="{}" href="{}">{}</a>"#,
        class,
        encode_double_quoted_attribute(safe_href(&link.href)),
        encode_text(&link.label)
    );
}

fn image_html(out: &mut String, src: &str, alt: &str) {
    let _ = write!(
        out,
        r#"<img src="{}" alt="{}" loading="lazy">"#,
        encode_double_quoted_attribute(safe_href(src)),
        encode_double_quoted_attribute(alt)
    );
}

/// Paragraphs from blank-line separated text
fn paragraphs_html(out: &mut String, text: &str) {
    for para in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let _ = write!(out, "<p>{}</p>", encode_text(para));
    }
}

fn section_open(out: &mut String, class: &str, block_id: &str) {
    let _ = write!(
        out,
        r#"<section class="block {}" data-block-id="{}">"#,
        class,
        encode_double_quoted_attribute(block_id)
    );
}

fn heading(out: &mut String, tag: &str, text: &str) {
    if !text.is_empty() {
        let _ = write!(out, "<{tag}>{}</{tag}>", encode_text(text));
    }
}

/// A class card, shared by the featured-classes block and the listing pages
pub fn class_card_html(out: &mut String, class: &ClassSummary) {
    out.push_str(r#"<article class="class-card">"#);
    if let Some(image) = &class.image_url {
        image_html(out, image, &class.title);
    }
    let _ = write!(
        out,
        r#"<h3><a href="/class/{}">{}</a></h3>"#,
        class.id,
        encode_text(&class.title)
    );
    let _ = write!(
        out,
        r#"<p class="class-meta">{} &middot; ages {}&ndash;{} &middot; {}</p>"#,
        encode_text(&class.category_name),
        class.min_age,
        class.max_age,
        encode_text(&class.city)
    );
    let _ = write!(
        out,
        r#"<p class="class-instructor">with <a href="/instructor/{}">{}</a></p>"#,
        class.instructor_id,
        encode_text(&class.instructor_name)
    );
    let _ = write!(
        out,
        r#"<p class="class-price">{}</p>"#,
        format_price(class.price_cents)
    );
    out.push_str("</article>");
}

fn render_hero_search(out: &mut String, id: &str, props: &HeroSearchProps) {
    section_open(out, "hero-search", id);
    if let Some(bg) = &props.background_image {
        image_html(out, bg, "");
    }
    heading(out, "h1", &props.headline);
    heading(out, "p", &props.subheadline);
    let _ = write!(
        out,
        r#"<form action="/search" method="get"><input type="search" name="q" placeholder="{}"><button type="submit">Search</button></form>"#,
        encode_double_quoted_attribute(&props.search_placeholder)
    );
    if !props.popular_searches.is_empty() {
        out.push_str(r#"<ul class="popular-searches">"#);
        for term in &props.popular_searches {
            let _ = write!(
                out,
                r#"<li><a href="/search?q={}">{}</a></li>"#,
                encode_double_quoted_attribute(&urlencoding::encode(term)),
                encode_text(term)
            );
        }
        out.push_str("</ul>");
    }
    out.push_str("</section>");
}

fn render_featured_classes(
    out: &mut String,
    id: &str,
    props: &FeaturedClassesProps,
    ctx: &RenderContext,
) {
    section_open(out, "featured-classes", id);
    heading(out, "h2", &props.title);
    heading(out, "p", &props.subtitle);
    match ctx.featured.get(id) {
        Some(classes) if !classes.is_empty() => {
            out.push_str(r#"<div class="class-grid">"#);
            for class in classes {
                class_card_html(out, class);
            }
            out.push_str("</div>");
        }
        _ => out.push_str(r#"<p class="empty">New classes are coming soon.</p>"#),
    }
    out.push_str("</section>");
}

fn render_teacher_spotlight(out: &mut String, id: &str, props: &TeacherSpotlightProps) {
    section_open(out, "teacher-spotlight", id);
    heading(out, "h2", &props.title);
    if let Some(image) = &props.image_url {
        image_html(out, image, &props.name);
    }
    match props.instructor_id {
        Some(instructor_id) => {
            let _ = write!(
                out,
                r#"<h3><a href="/instructor/{}">{}</a></h3>"#,
                instructor_id,
                encode_text(&props.name)
            );
        }
        None => heading(out, "h3", &props.name),
    }
    paragraphs_html(out, &props.bio);
    if let Some(quote) = &props.quote {
        let _ = write!(out, "<blockquote>{}</blockquote>", encode_text(quote));
    }
    if let Some(link) = &props.link {
        link_html(out, link, "button");
    }
    out.push_str("</section>");
}

fn render_trust_badges(out: &mut String, id: &str, props: &TrustBadgesProps) {
    section_open(out, "trust-badges", id);
    heading(out, "h2", &props.title);
    out.push_str("<ul>");
    for badge in &props.badges {
        let _ = write!(
            out,
            r#"<li class="badge"><span class="icon" data-icon="{}"></span><strong>{}</strong><span>{}</span></li>"#,
            encode_double_quoted_attribute(&badge.icon),
            encode_text(&badge.label),
            encode_text(&badge.description)
        );
    }
    out.push_str("</ul></section>");
}

fn render_testimonials(out: &mut String, id: &str, props: &TestimonialsProps) {
    section_open(out, "testimonials", id);
    heading(out, "h2", &props.title);
    for item in &props.items {
        out.push_str(r#"<figure class="testimonial">"#);
        let _ = write!(out, "<blockquote>{}</blockquote>", encode_text(&item.quote));
        let _ = write!(out, "<figcaption>{}", encode_text(&item.author));
        if let Some(role) = &item.role {
            let _ = write!(out, ", <span>{}</span>", encode_text(role));
        }
        out.push_str("</figcaption></figure>");
    }
    out.push_str("</section>");
}

fn render_content_split(out: &mut String, id: &str, props: &ContentSplitProps) {
    let class = match props.image_position {
        ImagePosition::Left => "content-split image-left",
        ImagePosition::Right => "content-split image-right",
    };
    section_open(out, class, id);
    let image = |out: &mut String| {
        if let Some(src) = &props.image_url {
            out.push_str(r#"<div class="split-image">"#);
            image_html(out, src, &props.title);
            out.push_str("</div>");
        }
    };
    if props.image_position == ImagePosition::Left {
        image(out);
    }
    out.push_str(r#"<div class="split-text">"#);
    heading(out, "h2", &props.title);
    paragraphs_html(out, &props.body);
    if let Some(cta) = &props.cta {
        link_html(out, cta, "button");
    }
    out.push_str("</div>");
    if props.image_position == ImagePosition::Right {
        image(out);
    }
    out.push_str("</section>");
}

fn render_faq_accordion(out: &mut String, id: &str, props: &FaqAccordionProps) {
    section_open(out, "faq-accordion", id);
    heading(out, "h2", &props.title);
    for item in &props.items {
        let _ = write!(
            out,
            r#"<details class="faq-item"><summary>{}</summary><div class="faq-answer">"#,
            encode_text(&item.question)
        );
        paragraphs_html(out, &item.answer);
        out.push_str("</div></details>");
    }
    out.push_str("</section>");
}

fn render_blog_teasers(out: &mut String, id: &str, props: &BlogTeasersProps) {
    section_open(out, "blog-teasers", id);
    heading(out, "h2", &props.title);
    out.push_str(r#"<div class="teaser-grid">"#);
    for post in &props.posts {
        out.push_str(r#"<article class="teaser">"#);
        if let Some(image) = &post.image_url {
            image_html(out, image, &post.title);
        }
        let _ = write!(
            out,
            r#"<h3><a href="{}">{}</a></h3><p>{}</p>"#,
            encode_double_quoted_attribute(safe_href(&post.href)),
            encode_text(&post.title),
            encode_text(&post.excerpt)
        );
        out.push_str("</article>");
    }
    out.push_str("</div></section>");
}

fn render_cta_section(out: &mut String, id: &str, props: &CtaSectionProps) {
    section_open(out, "cta-section", id);
    heading(out, "h2", &props.headline);
    paragraphs_html(out, &props.body);
    if let Some(primary) = &props.primary {
        link_html(out, primary, "button primary");
    }
    if let Some(secondary) = &props.secondary {
        link_html(out, secondary, "button secondary");
    }
    out.push_str("</section>");
}

fn nav_html(out: &mut String, class: &str, links: &[Link], cta: Option<&Link>) {
    let _ = write!(out, r#"<nav class="{}"><ul>"#, class);
    for link in links {
        out.push_str("<li>");
        link_html(out, link, "nav-link");
        out.push_str("</li>");
    }
    out.push_str("</ul>");
    if let Some(cta) = cta {
        link_html(out, cta, "button nav-cta");
    }
    out.push_str("</nav>");
}

fn footer_columns_html(out: &mut String, columns: &[FooterColumn], note: &str) {
    out.push_str(r#"<div class="footer-columns">"#);
    for column in columns {
        out.push_str(r#"<div class="footer-column">"#);
        heading(out, "h4", &column.title);
        out.push_str("<ul>");
        for link in &column.links {
            out.push_str("<li>");
            link_html(out, link, "footer-link");
            out.push_str("</li>");
        }
        out.push_str("</ul></div>");
    }
    out.push_str("</div>");
    if !note.is_empty() {
        let _ = write!(out, r#"<p class="footer-note">{}</p>"#, encode_text(note));
    }
}

fn render_nav_bar(out: &mut String, id: &str, props: &NavBarProps) {
    section_open(out, "nav-bar", id);
    nav_html(out, "block-nav", &props.links, props.cta.as_ref());
    out.push_str("</section>");
}

fn render_footer_block(out: &mut String, id: &str, props: &FooterProps) {
    section_open(out, "footer", id);
    footer_columns_html(out, &props.columns, &props.note);
    out.push_str("</section>");
}

/// Comment text may not contain `--`
fn comment_safe(text: &str) -> String {
    text.replace("--", "- -").replace('>', "")
}

/// Append the markup of one block
pub fn render_block(out: &mut String, instance: &BlockInstance, ctx: &RenderContext) {
    let id = instance.id.as_str();
    match &instance.content {
        BlockContent::Typed(block) => match block {
            Block::HeroSearch(props) => render_hero_search(out, id, props),
            Block::FeaturedClasses(props) => render_featured_classes(out, id, props, ctx),
            Block::TeacherSpotlight(props) => render_teacher_spotlight(out, id, props),
            Block::TrustBadges(props) => render_trust_badges(out, id, props),
            Block::Testimonials(props) => render_testimonials(out, id, props),
            Block::ContentSplit(props) => render_content_split(out, id, props),
            Block::FaqAccordion(props) => render_faq_accordion(out, id, props),
            Block::BlogTeasers(props) => render_blog_teasers(out, id, props),
            Block::CtaSection(props) => render_cta_section(out, id, props),
            Block::NavBar(props) => render_nav_bar(out, id, props),
            Block::Footer(props) => render_footer_block(out, id, props),
        },
        BlockContent::Unsupported { type_name, reason, .. } => {
            let name = type_name.as_deref().unwrap_or("untyped");
            if ctx.editor_preview {
                let _ = write!(
                    out,
                    r#"<div class="block unsupported" data-block-id="{}"><strong>Unsupported block: {}</strong><p>{}</p></div>"#,
                    encode_double_quoted_attribute(id),
                    encode_text(name),
                    encode_text(reason)
                );
            } else {
                let _ = write!(
                    out,
                    "<!-- unsupported block {}: {} -->",
                    comment_safe(id),
                    comment_safe(name)
                );
            }
        }
    }
}

/// Render blocks in order
pub fn render_blocks(blocks: &[BlockInstance], ctx: &RenderContext) -> String {
    let mut out = String::new();
    for block in blocks {
        render_block(&mut out, block, ctx);
    }
    out
}

pub fn render_site_header(out: &mut String, site: &SiteSettings) {
    out.push_str(r#"<header class="site-header">"#);
    out.push_str(r#"<a class="brand" href="/">"#);
    if let Some(logo) = &site.logo_url {
        image_html(out, logo, &site.site_name);
    }
    let _ = write!(out, "<span>{}</span></a>", encode_text(&site.site_name));
    nav_html(out, "site-nav", &site.nav_links, site.nav_cta.as_ref());
    out.push_str("</header>");
}

pub fn render_site_footer(out: &mut String, site: &SiteSettings) {
    out.push_str(r#"<footer class="site-footer">"#);
    footer_columns_html(out, &site.footer_columns, &site.footer_note);
    out.push_str("</footer>");
}

/// Full HTML document: head, navbar, `body_html` inside `<main>`, footer
pub fn render_document(meta: &DocumentMeta<'_>, site: &SiteSettings, body_html: &str) -> String {
    let mut out = String::with_capacity(body_html.len() + 2048);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">");
    out.push_str(r#"<meta name="viewport" content="width=device-width, initial-scale=1">"#);
    let _ = write!(
        out,
        "<title>{} | {}</title>",
        encode_text(meta.title),
        encode_text(&site.site_name)
    );
    if let Some(description) = meta.description {
        let _ = write!(
            out,
            r#"<meta name="description" content="{}">"#,
            encode_double_quoted_attribute(description)
        );
    }
    if !meta.keywords.is_empty() {
        let _ = write!(
            out,
            r#"<meta name="keywords" content="{}">"#,
            encode_double_quoted_attribute(&meta.keywords.join(", "))
        );
    }
    out.push_str(r#"<link rel="stylesheet" href="/static/site.css"></head><body>"#);
    render_site_header(&mut out, site);
    out.push_str("<main>");
    out.push_str(body_html);
    out.push_str("</main>");
    render_site_footer(&mut out, site);
    out.push_str("</body></html>");
    out
}
