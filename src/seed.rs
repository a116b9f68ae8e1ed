//! Demo content for a fresh install
//!
//! Every write is an upsert keyed on a slug, name or title, so running the seed
//! twice leaves one copy of everything. A failing item is logged and skipped.

use log::{info, warn};
use sqlx::sqlite::SqlitePool;
use std::fmt::Display;

use crate::block::{
    Badge, BlogTeaser, Block, BlockInstance, BlogTeasersProps, ContentSplitProps,
    CtaSectionProps, FaqAccordionProps, FaqItem, FeaturedClassesProps, FooterColumn,
    HeroSearchProps, ImagePosition, Link, TeacherSpotlightProps, Testimonial, TestimonialsProps,
    TrustBadgesProps,
};
use crate::catalog::{ensure_schedule, upsert_category, upsert_class, upsert_instructor, upsert_venue};
use crate::db::now_ms;
use crate::pages::{upsert_page, NewPage, PageStatus, Seo};
use crate::queries::catalog::{self as catalog_queries, ClassRow};
use crate::queries::metadata;
use crate::site::{save_site_settings, SiteSettings};

const DAY_MS: i64 = 86_400_000;
const HOUR_MS: i64 = 3_600_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub written: usize,
    pub failed: usize,
}

impl SeedReport {
    fn record<T, E: Display>(&mut self, what: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => {
                self.written += 1;
                Some(value)
            }
            Err(e) => {
                warn!("Seed: failed to write {}: {}", what, e);
                self.failed += 1;
                None
            }
        }
    }
}

fn block(id: &str, block: Block) -> BlockInstance {
    BlockInstance::with_id(id, block)
}

fn faq(question: &str, answer: &str) -> FaqItem {
    FaqItem {
        question: question.to_string(),
        answer: answer.to_string(),
    }
}

pub fn seed_site_settings() -> SiteSettings {
    SiteSettings {
        site_name: "Crafty Kid".to_string(),
        logo_url: Some("/static/logo.svg".to_string()),
        nav_links: vec![
            Link::new("Classes", "/classes"),
            Link::new("Search", "/search"),
            Link::new("About", "/about"),
            Link::new("FAQ", "/faq"),
        ],
        nav_cta: Some(Link::new("Find a class", "/classes")),
        footer_columns: vec![
            FooterColumn {
                title: "Explore".to_string(),
                links: vec![
                    Link::new("All classes", "/classes"),
                    Link::new("Pottery", "/classes?category=pottery"),
                    Link::new("Painting", "/classes?category=painting"),
                ],
            },
            FooterColumn {
                title: "Company".to_string(),
                links: vec![Link::new("About us", "/about"), Link::new("FAQ", "/faq")],
            },
        ],
        footer_note: "Made with glue and glitter.".to_string(),
    }
}

fn home_page() -> NewPage {
    NewPage {
        slug: "home".to_string(),
        title: "Creative classes for curious kids".to_string(),
        status: PageStatus::Published,
        seo: Seo {
            title: Some("Crafty Kid: craft classes for children".to_string()),
            description: Some(
                "Book pottery, painting, sewing and paper craft classes with local instructors."
                    .to_string(),
            ),
            keywords: vec!["kids crafts".to_string(), "art classes".to_string()],
        },
        publish_at_ms: None,
        blocks: vec![
            block(
                "home-hero",
                Block::HeroSearch(HeroSearchProps {
                    headline: "Find a craft class your kids will love".to_string(),
                    subheadline: "Small groups, patient teachers, messy fun.".to_string(),
                    background_image: Some("/static/hero.jpg".to_string()),
                    search_placeholder: "Try \"clay\" or \"watercolour\"".to_string(),
                    popular_searches: vec![
                        "pottery".to_string(),
                        "painting".to_string(),
                        "sewing".to_string(),
                    ],
                }),
            ),
            block(
                "home-featured",
                Block::FeaturedClasses(FeaturedClassesProps {
                    title: "This month's favourites".to_string(),
                    subtitle: "Spots fill up fast".to_string(),
                    limit: 6,
                    category: None,
                }),
            ),
            block(
                "home-trust",
                Block::TrustBadges(TrustBadgesProps {
                    title: "Why parents trust us".to_string(),
                    badges: vec![
                        Badge {
                            icon: "shield".to_string(),
                            label: "Vetted instructors".to_string(),
                            description: "Every teacher is background checked.".to_string(),
                        },
                        Badge {
                            icon: "users".to_string(),
                            label: "Small groups".to_string(),
                            description: "No more than eight children per class.".to_string(),
                        },
                        Badge {
                            icon: "refresh".to_string(),
                            label: "Easy refunds".to_string(),
                            description: "Cancel a paid booking and get your money back."
                                .to_string(),
                        },
                    ],
                }),
            ),
            block(
                "home-spotlight",
                Block::TeacherSpotlight(TeacherSpotlightProps {
                    title: "Meet an instructor".to_string(),
                    instructor_id: None,
                    name: "Mia Torres".to_string(),
                    bio: "Mia has taught hand-building and wheel throwing to children for ten years."
                        .to_string(),
                    image_url: Some("/static/instructors/mia.jpg".to_string()),
                    quote: Some("Clay is the most patient teacher I know.".to_string()),
                    link: Some(Link::new("See Mia's classes", "/search?q=Mia")),
                }),
            ),
            block(
                "home-testimonials",
                Block::Testimonials(TestimonialsProps {
                    title: "What families say".to_string(),
                    items: vec![
                        Testimonial {
                            quote: "My daughter came home covered in paint and beaming.".to_string(),
                            author: "Priya".to_string(),
                            role: Some("Parent of a 7 year old".to_string()),
                        },
                        Testimonial {
                            quote: "The booking took a minute and the class was wonderful."
                                .to_string(),
                            author: "Sam".to_string(),
                            role: None,
                        },
                    ],
                }),
            ),
            block(
                "home-blog",
                Block::BlogTeasers(BlogTeasersProps {
                    title: "From the studio".to_string(),
                    posts: vec![
                        BlogTeaser {
                            title: "Five rainy-day crafts".to_string(),
                            excerpt: "Cardboard, tape and a little imagination.".to_string(),
                            image_url: None,
                            href: "/blog/rainy-day-crafts".to_string(),
                        },
                        BlogTeaser {
                            title: "Why clay calms kids down".to_string(),
                            excerpt: "A potter on focus and slow making.".to_string(),
                            image_url: None,
                            href: "/blog/clay-and-calm".to_string(),
                        },
                    ],
                }),
            ),
            block(
                "home-cta",
                Block::CtaSection(CtaSectionProps {
                    headline: "Ready to make something?".to_string(),
                    body: "Browse upcoming sessions near you.".to_string(),
                    primary: Some(Link::new("Browse classes", "/classes")),
                    secondary: Some(Link::new("Read the FAQ", "/faq")),
                }),
            ),
        ],
    }
}

/// Three accordions holding 5, 4 and 3 questions
fn faq_page() -> NewPage {
    NewPage {
        slug: "faq".to_string(),
        title: "Frequently asked questions".to_string(),
        status: PageStatus::Published,
        seo: Seo {
            title: Some("FAQ".to_string()),
            description: Some("Answers about booking, payment and classes.".to_string()),
            keywords: Vec::new(),
        },
        publish_at_ms: None,
        blocks: vec![
            block(
                "faq-booking",
                Block::FaqAccordion(FaqAccordionProps {
                    title: "Booking".to_string(),
                    items: vec![
                        faq("How do I book a class?", "Pick a session on the class page and press Book."),
                        faq("Is my seat held while I pay?", "Yes, for 30 minutes after you reserve."),
                        faq("Can I book for two children?", "Make one booking per child."),
                        faq("Do I need an account?", "Yes, sign in so we can send your confirmation."),
                        faq("Where do I find my booking?", "Your confirmation page lists the reference."),
                    ],
                }),
            ),
            block(
                "faq-payment",
                Block::FaqAccordion(FaqAccordionProps {
                    title: "Payment".to_string(),
                    items: vec![
                        faq("Which cards do you accept?", "All major debit and credit cards."),
                        faq("When am I charged?", "When you complete the payment form."),
                        faq("What if my payment fails?", "Your seat stays reserved until the hold expires."),
                        faq("How do refunds work?", "Cancel a paid booking and the full amount is refunded."),
                    ],
                }),
            ),
            block(
                "faq-classes",
                Block::FaqAccordion(FaqAccordionProps {
                    title: "Classes".to_string(),
                    items: vec![
                        faq("What should my child wear?", "Clothes that can get messy."),
                        faq("Are materials included?", "Yes, everything is provided."),
                        faq("Can parents stay?", "Parents are welcome to wait nearby."),
                    ],
                }),
            ),
        ],
    }
}

fn about_page() -> NewPage {
    NewPage {
        slug: "about".to_string(),
        title: "About Crafty Kid".to_string(),
        status: PageStatus::Published,
        seo: Seo::default(),
        publish_at_ms: None,
        blocks: vec![
            block(
                "about-story",
                Block::ContentSplit(ContentSplitProps {
                    title: "Our story".to_string(),
                    body: "Crafty Kid started as a Saturday pottery club.\n\nToday we connect families with instructors across the city."
                        .to_string(),
                    image_url: Some("/static/about.jpg".to_string()),
                    image_position: ImagePosition::Right,
                    cta: Some(Link::new("Meet our instructors", "/search?q=")),
                }),
            ),
            block(
                "about-cta",
                Block::CtaSection(CtaSectionProps {
                    headline: "Teach with us".to_string(),
                    body: "We are always looking for patient, playful makers.".to_string(),
                    primary: Some(Link::new("Get in touch", "mailto:hello@craftykid.example")),
                    secondary: None,
                }),
            ),
        ],
    }
}

/// The content pages written by the seed command
pub fn seed_pages() -> Vec<NewPage> {
    vec![home_page(), faq_page(), about_page()]
}

struct SeedInstructor {
    user_id: &'static str,
    email: &'static str,
    name: &'static str,
    bio: &'static str,
    specialties: &'static str,
}

const INSTRUCTORS: [SeedInstructor; 3] = [
    SeedInstructor {
        user_id: "seed-instructor-mia",
        email: "mia@craftykid.example",
        name: "Mia Torres",
        bio: "Potter and former primary school teacher.",
        specialties: "pottery, clay modelling",
    },
    SeedInstructor {
        user_id: "seed-instructor-leo",
        email: "leo@craftykid.example",
        name: "Leo Park",
        bio: "Illustrator who loves big brushes and bright colours.",
        specialties: "painting, watercolour",
    },
    SeedInstructor {
        user_id: "seed-instructor-ada",
        email: "ada@craftykid.example",
        name: "Ada Okafor",
        bio: "Costume maker teaching first stitches.",
        specialties: "sewing, paper crafts",
    },
];

struct SeedClass {
    title: &'static str,
    description: &'static str,
    category: usize,
    instructor: usize,
    venue: usize,
    price_cents: i64,
    min_age: i32,
    max_age: i32,
    seats: i32,
}

const CATEGORIES: [(&str, &str); 4] = [
    ("pottery", "Pottery"),
    ("painting", "Painting"),
    ("sewing", "Sewing"),
    ("paper-crafts", "Paper crafts"),
];

const VENUES: [(&str, &str, &str); 2] = [
    ("Riverside Studio", "12 Mill Lane", "Springfield"),
    ("Oak Street Community Hall", "48 Oak Street", "Springfield"),
];

const CLASSES: [SeedClass; 5] = [
    SeedClass {
        title: "Little Potters",
        description: "Pinch pots, coil bowls and a first go on the wheel.",
        category: 0,
        instructor: 0,
        venue: 0,
        price_cents: 3500,
        min_age: 6,
        max_age: 10,
        seats: 8,
    },
    SeedClass {
        title: "Watercolour Adventures",
        description: "Wet-on-wet skies, salt textures and painted postcards.",
        category: 1,
        instructor: 1,
        venue: 1,
        price_cents: 2500,
        min_age: 5,
        max_age: 9,
        seats: 10,
    },
    SeedClass {
        title: "Big Brush Painting",
        description: "Large paper, big brushes and bold colour for little hands.",
        category: 1,
        instructor: 1,
        venue: 0,
        price_cents: 2000,
        min_age: 3,
        max_age: 5,
        seats: 6,
    },
    SeedClass {
        title: "First Stitches",
        description: "Threading needles, running stitch and a felt keyring to take home.",
        category: 2,
        instructor: 2,
        venue: 1,
        price_cents: 3000,
        min_age: 7,
        max_age: 12,
        seats: 6,
    },
    SeedClass {
        title: "Pop-up Cards",
        description: "Fold, cut and glue cards that spring to life.",
        category: 3,
        instructor: 2,
        venue: 1,
        price_cents: 1800,
        min_age: 5,
        max_age: 11,
        seats: 12,
    },
];

async fn seed_catalog(pool: &SqlitePool, report: &mut SeedReport) {
    let mut category_ids = Vec::with_capacity(CATEGORIES.len());
    for (slug, name) in CATEGORIES {
        let id = report.record(
            &format!("category '{}'", slug),
            upsert_category(pool, slug, name).await,
        );
        category_ids.push(id);
    }

    let mut venue_ids = Vec::with_capacity(VENUES.len());
    for (name, address, city) in VENUES {
        let id = report.record(
            &format!("venue '{}'", name),
            upsert_venue(pool, name, address, city).await,
        );
        venue_ids.push(id);
    }

    let now = now_ms();
    let mut instructor_ids = Vec::with_capacity(INSTRUCTORS.len());
    for instructor in &INSTRUCTORS {
        let user = sqlx::query(&catalog_queries::upsert_user(
            instructor.user_id,
            instructor.email,
            instructor.name,
            "INSTRUCTOR",
            now,
        ))
        .execute(pool)
        .await;
        let user_id = report
            .record(&format!("user '{}'", instructor.user_id), user)
            .map(|_| instructor.user_id);
        let id = report.record(
            &format!("instructor '{}'", instructor.name),
            upsert_instructor(
                pool,
                user_id,
                instructor.name,
                instructor.bio,
                None,
                instructor.specialties,
            )
            .await,
        );
        instructor_ids.push(id);
    }

    // Sessions at 10:00 UTC, 2, 9 and 16 days from today
    let today = now / DAY_MS * DAY_MS;
    for class in &CLASSES {
        let (Some(category_id), Some(instructor_id), Some(venue_id)) = (
            category_ids[class.category],
            instructor_ids[class.instructor],
            venue_ids[class.venue],
        ) else {
            warn!("Seed: skipping class '{}' with missing references", class.title);
            report.failed += 1;
            continue;
        };
        let row = ClassRow {
            title: class.title,
            description: class.description,
            category_id,
            instructor_id,
            venue_id,
            price_cents: class.price_cents,
            min_age: class.min_age,
            max_age: class.max_age,
            image_url: None,
            is_published: true,
        };
        let Some(class_id) = report.record(
            &format!("class '{}'", class.title),
            upsert_class(pool, &row).await,
        ) else {
            continue;
        };
        for day in [2, 9, 16] {
            let starts = today + day * DAY_MS + 10 * HOUR_MS;
            report.record(
                &format!("session of '{}' on day {}", class.title, day),
                ensure_schedule(pool, class_id, starts, starts + 90 * 60_000, class.seats).await,
            );
        }
    }
}

/// Write site settings, content pages and the demo catalog
pub async fn run_seed(pool: &SqlitePool) -> SeedReport {
    let mut report = SeedReport::default();

    report.record(
        "site settings",
        save_site_settings(pool, &seed_site_settings()).await,
    );
    for page in seed_pages() {
        let label = format!("page '{}'", page.slug);
        report.record(&label, upsert_page(pool, &page).await);
    }
    seed_catalog(pool, &mut report).await;

    let marker = sqlx::query(&metadata::upsert("seeded_at_ms", &now_ms().to_string()))
        .execute(pool)
        .await;
    report.record("seed marker", marker);

    info!(
        "Seed finished: {} written, {} failed",
        report.written, report.failed
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockContent;

    #[test]
    fn test_faq_page_has_five_four_three_items() {
        let faq = seed_pages()
            .into_iter()
            .find(|p| p.slug == "faq")
            .unwrap();
        let counts: Vec<usize> = faq
            .blocks
            .iter()
            .map(|b| match &b.content {
                BlockContent::Typed(Block::FaqAccordion(props)) => props.items.len(),
                other => panic!("unexpected block: {:?}", other),
            })
            .collect();
        assert_eq!(counts, vec![5, 4, 3]);
    }

    #[test]
    fn test_seed_block_ids_are_unique() {
        let mut ids: Vec<String> = seed_pages()
            .iter()
            .flat_map(|p| p.blocks.iter().map(|b| b.id.clone()))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_seed_site_settings_valid() {
        assert!(seed_site_settings().validate().is_ok());
    }
}
