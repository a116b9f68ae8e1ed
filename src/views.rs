//! Server-rendered pages for the static routes and the admin editor

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Deserialize;

use crate::block::BlockKind;
use crate::booking::{Booking, BookingStatus};
use crate::catalog::{format_price, Category, ClassDetail, ClassSummary, InstructorDetail};
use crate::editor::EditOp;
use crate::error::AppError;
use crate::pages::{Page, PageStatus};
use crate::payment::PaymentForm;
use crate::render::{class_card_html, render_document, safe_href, DocumentMeta};
use crate::search::SearchResults;
use crate::site::SiteSettings;

/// e.g. "Sat 14 Mar 2026, 10:00 UTC"
pub fn format_timestamp(ms: i64) -> String {
    match chrono::DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%a %d %b %Y, %H:%M UTC").to_string(),
        None => ms.to_string(),
    }
}

fn page(site: &SiteSettings, title: &str, body: &str) -> String {
    let meta = DocumentMeta {
        title,
        ..Default::default()
    };
    render_document(&meta, site, body)
}

fn class_grid(out: &mut String, classes: &[ClassSummary]) {
    if classes.is_empty() {
        out.push_str(r#"<p class="empty">No classes found.</p>"#);
        return;
    }
    out.push_str(r#"<div class="class-grid">"#);
    for class in classes {
        class_card_html(out, class);
    }
    out.push_str("</div>");
}

pub fn classes_page(
    site: &SiteSettings,
    classes: &[ClassSummary],
    categories: &[Category],
    selected_category: Option<&str>,
) -> String {
    let mut body = String::from(r#"<section class="listing"><h1>Classes</h1>"#);
    body.push_str(r#"<nav class="category-filter"><a href="/classes">All</a>"#);
    for category in categories {
        let selected = if selected_category == Some(category.slug.as_str()) {
            r#" aria-current="page""#
        } else {
            ""
        };
        let _ = write!(
            body,
            r#"<a href="/classes?category={}"{}>{}</a>"#,
            encode_double_quoted_attribute(&urlencoding::encode(&category.slug)),
            selected,
            encode_text(&category.name)
        );
    }
    body.push_str("</nav>");
    class_grid(&mut body, classes);
    body.push_str("</section>");
    page(site, "Classes", &body)
}

pub fn class_detail_page(site: &SiteSettings, detail: &ClassDetail) -> String {
    let class = &detail.class;
    let mut body = String::from(r#"<article class="class-detail">"#);
    if let Some(image) = &class.image_url {
        let _ = write!(
            body,
            r#"<img src="{}" alt="{}">"#,
            encode_double_quoted_attribute(safe_href(image)),
            encode_double_quoted_attribute(&class.title)
        );
    }
    let _ = write!(
        body,
        r#"<h1>{}</h1><p class="class-meta">{} &middot; ages {}&ndash;{} &middot; {}</p>"#,
        encode_text(&class.title),
        encode_text(&class.category_name),
        class.min_age,
        class.max_age,
        format_price(class.price_cents)
    );
    let _ = write!(
        body,
        r#"<p class="class-instructor">Taught by <a href="/instructor/{}">{}</a></p>"#,
        class.instructor_id,
        encode_text(&class.instructor_name)
    );
    let _ = write!(body, "<div class=\"description\"><p>{}</p></div>", encode_text(&class.description));
    let _ = write!(
        body,
        r#"<address class="venue"><strong>{}</strong><br>{}<br>{}</address>"#,
        encode_text(&detail.venue.name),
        encode_text(&detail.venue.address),
        encode_text(&detail.venue.city)
    );

    body.push_str(r#"<section class="schedules"><h2>Upcoming sessions</h2>"#);
    if detail.schedules.is_empty() {
        body.push_str(r#"<p class="empty">No upcoming sessions.</p>"#);
    } else {
        body.push_str("<ul>");
        for schedule in &detail.schedules {
            let _ = write!(
                body,
                r#"<li class="schedule"><time>{}</time> <span class="seats">{} of {} seats left</span>"#,
                format_timestamp(schedule.starts_at_ms),
                schedule.seats_remaining,
                schedule.seats_total
            );
            if schedule.is_full() {
                body.push_str(r#" <span class="sold-out">Sold out</span>"#);
            } else {
                let _ = write!(
                    body,
                    r#"<form method="post" action="/booking/reserve"><input type="hidden" name="schedule_id" value="{}"><button type="submit">Book</button></form>"#,
                    schedule.id
                );
            }
            body.push_str("</li>");
        }
        body.push_str("</ul>");
    }
    body.push_str("</section></article>");
    page(site, &class.title, &body)
}

pub fn instructor_page(site: &SiteSettings, detail: &InstructorDetail) -> String {
    let profile = &detail.profile;
    let mut body = String::from(r#"<article class="instructor">"#);
    if let Some(avatar) = &profile.avatar_url {
        let _ = write!(
            body,
            r#"<img class="avatar" src="{}" alt="{}">"#,
            encode_double_quoted_attribute(safe_href(avatar)),
            encode_double_quoted_attribute(&profile.display_name)
        );
    }
    let _ = write!(body, "<h1>{}</h1>", encode_text(&profile.display_name));
    let specialties = profile.specialty_list();
    if !specialties.is_empty() {
        body.push_str(r#"<ul class="specialties">"#);
        for specialty in specialties {
            let _ = write!(body, "<li>{}</li>", encode_text(specialty));
        }
        body.push_str("</ul>");
    }
    let _ = write!(body, r#"<p class="bio">{}</p>"#, encode_text(&profile.bio));
    body.push_str("<h2>Classes</h2>");
    class_grid(&mut body, &detail.classes);
    body.push_str("</article>");
    page(site, &profile.display_name, &body)
}

pub fn search_page(site: &SiteSettings, query: &str, results: &SearchResults) -> String {
    let mut body = String::from(r#"<section class="search">"#);
    let _ = write!(
        body,
        r#"<form action="/search" method="get"><input type="search" name="q" value="{}"><button type="submit">Search</button></form>"#,
        encode_double_quoted_attribute(query)
    );
    let query = query.trim();
    if query.is_empty() {
        body.push_str(r#"<p class="hint">Search for a class or an instructor.</p>"#);
    } else if results.is_empty() {
        let _ = write!(
            body,
            r#"<p class="empty">Nothing matched &ldquo;{}&rdquo;.</p>"#,
            encode_text(query)
        );
    } else {
        body.push_str("<h2>Classes</h2>");
        class_grid(&mut body, &results.classes);
        body.push_str(r#"<h2>Instructors</h2><ul class="instructor-results">"#);
        for instructor in &results.instructors {
            let _ = write!(
                body,
                r#"<li><a href="/instructor/{}">{}</a> <span>{}</span></li>"#,
                instructor.id,
                encode_text(&instructor.display_name),
                encode_text(&instructor.specialties)
            );
        }
        body.push_str("</ul>");
    }
    body.push_str("</section>");
    page(site, "Search", &body)
}

fn booking_summary(body: &mut String, booking: &Booking) {
    let _ = write!(
        body,
        r#"<dl class="booking-summary"><dt>Reference</dt><dd>{}</dd><dt>Class</dt><dd><a href="/class/{}">{}</a></dd><dt>Session</dt><dd>{}</dd><dt>Amount</dt><dd>{}</dd><dt>Status</dt><dd class="status">{}</dd></dl>"#,
        encode_text(&booking.reference),
        booking.class_id,
        encode_text(&booking.class_title),
        format_timestamp(booking.starts_at_ms),
        format_price(booking.amount_cents),
        booking.status
    );
}

pub fn payment_page(site: &SiteSettings, booking: &Booking, form: &PaymentForm) -> String {
    let mut body = String::from(r#"<section class="payment"><h1>Complete your booking</h1>"#);
    booking_summary(&mut body, booking);
    if booking.status == BookingStatus::Reserved {
        let _ = write!(
            body,
            r#"<div id="payment-form" data-booking-id="{}" data-reference="{}" data-amount="{}" data-currency="{}" data-publishable-key="{}" data-return-url="{}"></div>"#,
            form.booking_id,
            encode_double_quoted_attribute(&form.reference),
            form.amount_cents,
            encode_double_quoted_attribute(&form.currency),
            encode_double_quoted_attribute(&form.publishable_key),
            encode_double_quoted_attribute(&form.confirmation_url)
        );
        let _ = write!(
            body,
            r#"<form method="post" action="/booking/{}/cancel"><button type="submit">Cancel reservation</button></form>"#,
            booking.id
        );
    } else {
        let _ = write!(
            body,
            r#"<p>This booking is {} and needs no payment. <a href="/booking/{}/confirmation">View confirmation</a></p>"#,
            booking.status, booking.id
        );
    }
    body.push_str("</section>");
    page(site, "Payment", &body)
}

pub fn confirmation_page(site: &SiteSettings, booking: &Booking) -> String {
    let headline = match booking.status {
        BookingStatus::Paid => "You're booked!",
        BookingStatus::Reserved => "Waiting for payment",
        BookingStatus::Cancelled => "Booking cancelled",
        BookingStatus::Refunded => "Booking refunded",
    };
    let mut body = format!(
        r#"<section class="confirmation"><h1>{}</h1>"#,
        encode_text(headline)
    );
    booking_summary(&mut body, booking);
    if booking.status == BookingStatus::Reserved {
        let _ = write!(
            body,
            r#"<p><a class="button" href="/booking/{}/payment">Pay now</a></p>"#,
            booking.id
        );
    }
    body.push_str("</section>");
    page(site, "Booking confirmation", &body)
}

pub fn error_page(site: &SiteSettings, error: &AppError) -> String {
    let status = error.status_code();
    let message = match error {
        AppError::NotFound(_) => "We couldn't find that page.".to_string(),
        AppError::Database(_) | AppError::Serialization(_) | AppError::CorruptData(_) => {
            "Something went wrong on our side.".to_string()
        }
        other => other.to_string(),
    };
    let body = format!(
        r#"<section class="error"><h1>{}</h1><p>{}</p><p><a href="/">Back to home</a></p></section>"#,
        status.as_u16(),
        encode_text(&message)
    );
    page(site, status.canonical_reason().unwrap_or("Error"), &body)
}

// ============================================================================
// Admin
// ============================================================================

pub fn admin_index_page(site: &SiteSettings, pages: &[Page]) -> String {
    let mut body = String::from(
        r#"<section class="admin"><h1>Pages</h1><table><thead><tr><th>Slug</th><th>Title</th><th>Status</th><th>Blocks</th></tr></thead><tbody>"#,
    );
    for p in pages {
        let _ = write!(
            body,
            r#"<tr><td><a href="/admin/pages/{slug}">{slug_text}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            encode_text(&p.title),
            p.status,
            p.blocks.len(),
            slug = encode_double_quoted_attribute(&p.slug),
            slug_text = encode_text(&p.slug),
        );
    }
    body.push_str("</tbody></table></section>");
    page(site, "Admin", &body)
}

fn op_button(body: &mut String, action: &str, op: &str, id: &str, label: &str) {
    let _ = write!(
        body,
        r#"<form method="post" action="{}"><input type="hidden" name="op" value="{}"><input type="hidden" name="id" value="{}"><button type="submit">{}</button></form>"#,
        encode_double_quoted_attribute(action),
        op,
        encode_double_quoted_attribute(id),
        encode_text(label)
    );
}

/// Editor page: one row of controls per block, an add form and a live preview
pub fn admin_editor_page(
    site: &SiteSettings,
    page_record: &Page,
    preview_html: &str,
    message: Option<&str>,
) -> String {
    let action = format!("/admin/pages/{}/ops", page_record.slug);
    let mut body = format!(
        r#"<section class="admin editor"><h1>Editing {} <small>({})</small></h1>"#,
        encode_text(&page_record.title),
        page_record.status
    );
    if page_record.status != PageStatus::Published {
        body.push_str(r#"<p class="notice">This page is not publicly visible.</p>"#);
    }
    if let Some(message) = message {
        let _ = write!(body, r#"<p class="flash">{}</p>"#, encode_text(message));
    }

    body.push_str(r#"<ol class="block-list">"#);
    for instance in &page_record.blocks {
        let _ = write!(
            body,
            r#"<li class="block-row" data-block-id="{}"><strong>{}</strong>"#,
            encode_double_quoted_attribute(&instance.id),
            encode_text(instance.type_name().unwrap_or("untyped"))
        );
        op_button(&mut body, &action, "move_up", &instance.id, "Up");
        op_button(&mut body, &action, "move_down", &instance.id, "Down");
        op_button(&mut body, &action, "duplicate", &instance.id, "Duplicate");
        op_button(&mut body, &action, "remove", &instance.id, "Remove");

        // The textarea holds the whole props object and is saved as a replacement
        let props = instance
            .editable_props()
            .ok()
            .and_then(|v| serde_json::to_string_pretty(&v).ok())
            .unwrap_or_default();
        let _ = write!(
            body,
            r#"<form method="post" action="{}"><input type="hidden" name="op" value="replace_props"><input type="hidden" name="id" value="{}"><textarea name="props" rows="8">{}</textarea><button type="submit">Save props</button></form>"#,
            encode_double_quoted_attribute(&action),
            encode_double_quoted_attribute(&instance.id),
            encode_text(&props)
        );
        body.push_str("</li>");
    }
    body.push_str("</ol>");

    let _ = write!(
        body,
        r#"<form class="add-block" method="post" action="{}"><input type="hidden" name="op" value="add"><select name="type">"#,
        encode_double_quoted_attribute(&action)
    );
    for kind in BlockKind::ALL {
        let _ = write!(body, r#"<option value="{0}">{0}</option>"#, kind.as_str());
    }
    body.push_str(r#"</select><button type="submit">Add block</button></form>"#);

    body.push_str(r#"<section class="preview"><h2>Preview</h2>"#);
    body.push_str(preview_html);
    body.push_str("</section></section>");
    page(site, &format!("Edit {}", page_record.slug), &body)
}

/// Form fields posted by the admin editor buttons
#[derive(Debug, Clone, Deserialize)]
pub struct EditForm {
    pub op: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub block_type: Option<String>,
    /// JSON text from the props textarea
    #[serde(default)]
    pub props: Option<String>,
}

impl EditForm {
    fn props_json(&self) -> Result<serde_json::Value, AppError> {
        let text = self.props.as_deref().unwrap_or("{}");
        serde_json::from_str(text)
            .map_err(|e| AppError::Validation(format!("props are not valid JSON: {}", e)))
    }

    pub fn into_op(self) -> Result<EditOp, AppError> {
        let id = || {
            self.id
                .clone()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| AppError::Validation(format!("'{}' needs a block id", self.op)))
        };
        match self.op.as_str() {
            "add" => Ok(EditOp::Add {
                block_type: self
                    .block_type
                    .clone()
                    .ok_or_else(|| AppError::Validation("'add' needs a type".to_string()))?,
            }),
            "remove" => Ok(EditOp::Remove { id: id()? }),
            "move_up" => Ok(EditOp::MoveUp { id: id()? }),
            "move_down" => Ok(EditOp::MoveDown { id: id()? }),
            "duplicate" => Ok(EditOp::Duplicate { id: id()? }),
            "update_props" => Ok(EditOp::UpdateProps {
                id: id()?,
                props: self.props_json()?,
            }),
            "replace_props" => Ok(EditOp::ReplaceProps {
                id: id()?,
                props: self.props_json()?,
            }),
            other => Err(AppError::Validation(format!("Unknown operation '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "Thu 01 Jan 1970, 00:00 UTC");
    }

    #[test]
    fn test_edit_form_into_op() {
        let form = EditForm {
            op: "update_props".to_string(),
            id: Some("b1".to_string()),
            block_type: None,
            props: Some(r#"{"title": "Hi"}"#.to_string()),
        };
        match form.into_op().unwrap() {
            EditOp::UpdateProps { id, props } => {
                assert_eq!(id, "b1");
                assert_eq!(props["title"], "Hi");
            }
            other => panic!("unexpected op: {:?}", other),
        }

        let missing_id = EditForm {
            op: "remove".to_string(),
            id: Some(String::new()),
            block_type: None,
            props: None,
        };
        assert!(matches!(missing_id.into_op(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_edit_form_replace_props() {
        let form = EditForm {
            op: "replace_props".to_string(),
            id: Some("b1".to_string()),
            block_type: None,
            props: Some(r#"{"headline": "Join"}"#.to_string()),
        };
        assert_eq!(
            form.into_op().unwrap(),
            EditOp::ReplaceProps {
                id: "b1".to_string(),
                props: serde_json::json!({"headline": "Join"}),
            }
        );

        let bad_json = EditForm {
            op: "replace_props".to_string(),
            id: Some("b1".to_string()),
            block_type: None,
            props: Some("{not json".to_string()),
        };
        assert!(matches!(bad_json.into_op(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_editor_textarea_replaces_props() {
        let page_record = Page {
            id: 1,
            slug: "home".to_string(),
            title: "Home".to_string(),
            status: PageStatus::Draft,
            seo: Default::default(),
            publish_at_ms: None,
            blocks: vec![crate::block::BlockInstance::from_value(serde_json::json!({
                "id": "h1",
                "type": "HeroSearch",
                "headline": "Hi",
                "ctaColor": "red"
            }))],
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let html = admin_editor_page(&SiteSettings::default(), &page_record, "", None);
        assert!(html.contains(r#"name="op" value="replace_props""#));
        assert!(html.contains("ctaColor"));
        assert!(!html.contains(r#"value="update_props""#));
    }

    #[test]
    fn test_image_urls_are_sanitized() {
        let class = ClassSummary {
            id: 1,
            title: "Clay".to_string(),
            description: String::new(),
            price_cents: 1000,
            min_age: 5,
            max_age: 9,
            image_url: Some("javascript:alert(1)".to_string()),
            is_published: true,
            category_slug: "clay".to_string(),
            category_name: "Clay".to_string(),
            instructor_id: 2,
            instructor_name: "Marta".to_string(),
            venue_id: 3,
            venue_name: "Oak Studio".to_string(),
            city: "Riverton".to_string(),
        };
        let detail = ClassDetail {
            class: class.clone(),
            venue: crate::catalog::Venue {
                id: 3,
                name: "Oak Studio".to_string(),
                address: "5 Oak Rd".to_string(),
                city: "Riverton".to_string(),
            },
            schedules: Vec::new(),
        };
        let html = class_detail_page(&SiteSettings::default(), &detail);
        assert!(!html.contains("javascript:"));
        assert!(html.contains(r##"<img src="#""##));

        let instructor = InstructorDetail {
            profile: crate::catalog::InstructorProfile {
                id: 2,
                user_id: None,
                display_name: "Marta".to_string(),
                bio: String::new(),
                avatar_url: Some(" JavaScript:alert(1)".to_string()),
                specialties: String::new(),
            },
            classes: vec![class],
        };
        let html = instructor_page(&SiteSettings::default(), &instructor);
        assert!(!html.to_ascii_lowercase().contains("javascript:"));
        assert!(html.contains(r##"<img class="avatar" src="#""##));
    }

    #[test]
    fn test_error_page_hides_internal_details() {
        let html = error_page(
            &SiteSettings::default(),
            &AppError::Database(sqlx::Error::RowNotFound),
        );
        assert!(html.contains("500"));
        assert!(!html.contains("RowNotFound"));

        let html = error_page(
            &SiteSettings::default(),
            &AppError::CorruptData("page 3 has status 'bogus'".into()),
        );
        assert!(html.contains("500"));
        assert!(!html.contains("bogus"));
    }
}
