//! Page content blocks
//!
//! A page body is an ordered list of [`BlockInstance`]s. Each instance is stored
//! as a flat JSON object `{"id": "...", "type": "<Tag>", ...props}`. Known tags
//! deserialize into the typed [`Block`] enum; anything else (unknown tag, props
//! of the wrong shape, a non-object) is kept verbatim as
//! [`BlockContent::Unsupported`] so a load/save cycle never loses content.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A labelled hyperlink used by navigation, footers and call-to-action buttons
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub label: String,
    pub href: String,
}

impl Link {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
        }
    }
}

/// A titled column of footer links
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterColumn {
    pub title: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeroSearchProps {
    pub headline: String,
    pub subheadline: String,
    pub background_image: Option<String>,
    pub search_placeholder: String,
    pub popular_searches: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeaturedClassesProps {
    pub title: String,
    pub subtitle: String,
    /// Maximum number of class cards shown
    pub limit: u32,
    /// Restrict to a category slug
    pub category: Option<String>,
}

impl Default for FeaturedClassesProps {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            limit: 6,
            category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeacherSpotlightProps {
    pub title: String,
    pub instructor_id: Option<i64>,
    pub name: String,
    pub bio: String,
    pub image_url: Option<String>,
    pub quote: Option<String>,
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Badge {
    pub icon: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustBadgesProps {
    pub title: String,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Testimonial {
    pub quote: String,
    pub author: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestimonialsProps {
    pub title: String,
    pub items: Vec<Testimonial>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePosition {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentSplitProps {
    pub title: String,
    pub body: String,
    pub image_url: Option<String>,
    pub image_position: ImagePosition,
    pub cta: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqAccordionProps {
    pub title: String,
    pub items: Vec<FaqItem>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlogTeaser {
    pub title: String,
    pub excerpt: String,
    pub image_url: Option<String>,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogTeasersProps {
    pub title: String,
    pub posts: Vec<BlogTeaser>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CtaSectionProps {
    pub headline: String,
    pub body: String,
    pub primary: Option<Link>,
    pub secondary: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NavBarProps {
    pub links: Vec<Link>,
    pub cta: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FooterProps {
    pub columns: Vec<FooterColumn>,
    pub note: String,
}

/// The closed set of block types with their typed props
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    HeroSearch(HeroSearchProps),
    FeaturedClasses(FeaturedClassesProps),
    TeacherSpotlight(TeacherSpotlightProps),
    TrustBadges(TrustBadgesProps),
    Testimonials(TestimonialsProps),
    ContentSplit(ContentSplitProps),
    #[serde(rename = "FAQAccordion")]
    FaqAccordion(FaqAccordionProps),
    BlogTeasers(BlogTeasersProps),
    #[serde(rename = "CTASection")]
    CtaSection(CtaSectionProps),
    NavBar(NavBarProps),
    Footer(FooterProps),
}

/// Block type tag, used by the editor's "add block" action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    HeroSearch,
    FeaturedClasses,
    TeacherSpotlight,
    TrustBadges,
    Testimonials,
    ContentSplit,
    FaqAccordion,
    BlogTeasers,
    CtaSection,
    NavBar,
    Footer,
}

impl BlockKind {
    pub const ALL: [BlockKind; 11] = [
        BlockKind::HeroSearch,
        BlockKind::FeaturedClasses,
        BlockKind::TeacherSpotlight,
        BlockKind::TrustBadges,
        BlockKind::Testimonials,
        BlockKind::ContentSplit,
        BlockKind::FaqAccordion,
        BlockKind::BlogTeasers,
        BlockKind::CtaSection,
        BlockKind::NavBar,
        BlockKind::Footer,
    ];

    /// Tag as written in stored JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::HeroSearch => "HeroSearch",
            BlockKind::FeaturedClasses => "FeaturedClasses",
            BlockKind::TeacherSpotlight => "TeacherSpotlight",
            BlockKind::TrustBadges => "TrustBadges",
            BlockKind::Testimonials => "Testimonials",
            BlockKind::ContentSplit => "ContentSplit",
            BlockKind::FaqAccordion => "FAQAccordion",
            BlockKind::BlogTeasers => "BlogTeasers",
            BlockKind::CtaSection => "CTASection",
            BlockKind::NavBar => "NavBar",
            BlockKind::Footer => "Footer",
        }
    }

    /// A new block of this kind with default props
    pub fn default_block(&self) -> Block {
        match self {
            BlockKind::HeroSearch => Block::HeroSearch(HeroSearchProps {
                headline: "Find a craft class your kids will love".to_string(),
                search_placeholder: "Search classes or instructors".to_string(),
                ..Default::default()
            }),
            BlockKind::FeaturedClasses => Block::FeaturedClasses(FeaturedClassesProps {
                title: "Featured classes".to_string(),
                ..Default::default()
            }),
            BlockKind::TeacherSpotlight => Block::TeacherSpotlight(Default::default()),
            BlockKind::TrustBadges => Block::TrustBadges(Default::default()),
            BlockKind::Testimonials => Block::Testimonials(Default::default()),
            BlockKind::ContentSplit => Block::ContentSplit(Default::default()),
            BlockKind::FaqAccordion => Block::FaqAccordion(FaqAccordionProps {
                title: "Frequently asked questions".to_string(),
                items: Vec::new(),
            }),
            BlockKind::BlogTeasers => Block::BlogTeasers(Default::default()),
            BlockKind::CtaSection => Block::CtaSection(Default::default()),
            BlockKind::NavBar => Block::NavBar(Default::default()),
            BlockKind::Footer => Block::Footer(Default::default()),
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown block type '{}'", s))
    }
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::HeroSearch(_) => BlockKind::HeroSearch,
            Block::FeaturedClasses(_) => BlockKind::FeaturedClasses,
            Block::TeacherSpotlight(_) => BlockKind::TeacherSpotlight,
            Block::TrustBadges(_) => BlockKind::TrustBadges,
            Block::Testimonials(_) => BlockKind::Testimonials,
            Block::ContentSplit(_) => BlockKind::ContentSplit,
            Block::FaqAccordion(_) => BlockKind::FaqAccordion,
            Block::BlogTeasers(_) => BlockKind::BlogTeasers,
            Block::CtaSection(_) => BlockKind::CtaSection,
            Block::NavBar(_) => BlockKind::NavBar,
            Block::Footer(_) => BlockKind::Footer,
        }
    }
}

/// Body of a stored block: typed, or preserved as-is
#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Typed(Block),
    Unsupported {
        /// The `type` tag if one was present
        type_name: Option<String>,
        /// Why the typed parse failed
        reason: String,
        /// Original JSON without the `id` field
        raw: Value,
    },
}

/// One positioned block on a page
#[derive(Debug, Clone, PartialEq)]
pub struct BlockInstance {
    pub id: String,
    pub content: BlockContent,
    /// Stored keys of a typed block that its props record does not declare;
    /// written back unchanged on save
    pub extra: Map<String, Value>,
}

pub fn new_block_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Keys of `original` that the typed serialization does not produce
fn undeclared_keys(original: &Map<String, Value>, typed: &Value) -> Map<String, Value> {
    let Value::Object(typed) = typed else {
        return Map::new();
    };
    original
        .iter()
        .filter(|(key, _)| key.as_str() != "id" && !typed.contains_key(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl BlockInstance {
    pub fn new(block: Block) -> Self {
        Self::with_id(new_block_id(), block)
    }

    pub fn with_id(id: impl Into<String>, block: Block) -> Self {
        Self {
            id: id.into(),
            content: BlockContent::Typed(block),
            extra: Map::new(),
        }
    }

    /// Interpret one stored JSON element; never fails
    pub fn from_value(value: Value) -> Self {
        let mut value = value;
        let id = match &mut value {
            Value::Object(map) => match map.remove("id") {
                Some(Value::String(id)) if !id.is_empty() => id,
                _ => new_block_id(),
            },
            _ => new_block_id(),
        };

        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);

        let parsed = serde_json::from_value::<Block>(value.clone()).and_then(|block| {
            let typed = serde_json::to_value(&block)?;
            Ok((block, typed))
        });
        match parsed {
            Ok((block, typed)) => {
                let extra = match &value {
                    Value::Object(original) => undeclared_keys(original, &typed),
                    _ => Map::new(),
                };
                Self {
                    id,
                    content: BlockContent::Typed(block),
                    extra,
                }
            }
            Err(e) => Self {
                id,
                content: BlockContent::Unsupported {
                    type_name,
                    reason: e.to_string(),
                    raw: value,
                },
                extra: Map::new(),
            },
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let mut value = match &self.content {
            BlockContent::Typed(block) => serde_json::to_value(block)?,
            BlockContent::Unsupported { raw, .. } => raw.clone(),
        };
        // A non-object element has nowhere to keep the id
        if let Value::Object(map) = &mut value {
            for (key, extra) in &self.extra {
                map.entry(key.clone()).or_insert_with(|| extra.clone());
            }
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        Ok(value)
    }

    /// Props as edited in the admin: declared props plus undeclared stored keys,
    /// without `id` and `type`
    pub fn editable_props(&self) -> Result<Value, serde_json::Error> {
        let mut value = self.to_value()?;
        if let Value::Object(map) = &mut value {
            map.remove("id");
            map.remove("type");
        }
        Ok(value)
    }

    /// Tag for display, `None` for untagged garbage
    pub fn type_name(&self) -> Option<&str> {
        match &self.content {
            BlockContent::Typed(block) => Some(block.kind().as_str()),
            BlockContent::Unsupported { type_name, .. } => type_name.as_deref(),
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self.content, BlockContent::Typed(_))
    }
}

impl Serialize for BlockInstance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockInstance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(BlockInstance::from_value(value))
    }
}

/// Parse the `blocks` column; the top level must be a JSON array
pub fn parse_block_list(json: &str) -> Result<Vec<BlockInstance>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn block_list_to_json(blocks: &[BlockInstance]) -> Result<String, serde_json::Error> {
    serde_json::to_string(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_block_parses_typed() {
        let instance = BlockInstance::from_value(json!({
            "id": "b1",
            "type": "FAQAccordion",
            "title": "Questions",
            "items": [{"question": "Q1", "answer": "A1"}]
        }));
        assert_eq!(instance.id, "b1");
        match instance.content {
            BlockContent::Typed(Block::FaqAccordion(props)) => {
                assert_eq!(props.title, "Questions");
                assert_eq!(props.items.len(), 1);
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_missing_props_take_defaults() {
        let instance = BlockInstance::from_value(json!({"type": "FeaturedClasses"}));
        match instance.content {
            BlockContent::Typed(Block::FeaturedClasses(props)) => assert_eq!(props.limit, 6),
            other => panic!("unexpected content: {:?}", other),
        }
        assert!(!instance.id.is_empty());
    }

    #[test]
    fn test_unknown_type_is_preserved() {
        let raw = json!({"id": "x", "type": "Carousel", "slides": [1, 2, 3]});
        let instance = BlockInstance::from_value(raw.clone());
        assert!(!instance.is_supported());
        assert_eq!(instance.type_name(), Some("Carousel"));
        assert_eq!(instance.to_value().unwrap(), raw);
    }

    #[test]
    fn test_undeclared_keys_of_known_type_are_kept() {
        let instance = BlockInstance::from_value(json!({
            "id": "h1",
            "type": "HeroSearch",
            "headline": "x",
            "ctaColor": "red",
            "layout": {"columns": 2}
        }));
        assert!(instance.is_supported());
        assert_eq!(instance.extra.len(), 2);

        let value = instance.to_value().unwrap();
        assert_eq!(value["ctaColor"], "red");
        assert_eq!(value["layout"]["columns"], 2);
        assert_eq!(value["headline"], "x");

        // A second load/save pass is stable
        let again = BlockInstance::from_value(value.clone());
        assert_eq!(again, instance);
        assert_eq!(again.to_value().unwrap(), value);
    }

    #[test]
    fn test_malformed_props_are_unsupported() {
        let instance = BlockInstance::from_value(json!({
            "type": "FAQAccordion",
            "items": "not a list"
        }));
        assert!(!instance.is_supported());
        assert_eq!(instance.type_name(), Some("FAQAccordion"));
    }

    #[test]
    fn test_non_object_element_is_unsupported() {
        let list = parse_block_list(r#"[42, {"type": "NavBar"}]"#).unwrap();
        assert_eq!(list.len(), 2);
        assert!(!list[0].is_supported());
        assert_eq!(list[0].type_name(), None);
        assert!(list[1].is_supported());
    }

    #[test]
    fn test_serialized_shape_is_flat() {
        let instance = BlockInstance::with_id(
            "cta",
            Block::CtaSection(CtaSectionProps {
                headline: "Join us".to_string(),
                primary: Some(Link::new("Browse", "/classes")),
                ..Default::default()
            }),
        );
        let value = instance.to_value().unwrap();
        assert_eq!(value["id"], "cta");
        assert_eq!(value["type"], "CTASection");
        assert_eq!(value["headline"], "Join us");
        assert_eq!(value["primary"]["href"], "/classes");
    }

    #[test]
    fn test_editable_props_drop_id_and_type() {
        let instance = BlockInstance::with_id(
            "split",
            Block::ContentSplit(ContentSplitProps {
                title: "About".to_string(),
                image_position: ImagePosition::Right,
                ..Default::default()
            }),
        );
        let props = instance.editable_props().unwrap();
        assert!(props.get("type").is_none());
        assert!(props.get("id").is_none());
        assert_eq!(props["imagePosition"], "right");
    }

    #[test]
    fn test_kind_round_trips_through_tag() {
        for kind in BlockKind::ALL {
            assert_eq!(kind.as_str().parse::<BlockKind>().unwrap(), kind);
            assert_eq!(kind.default_block().kind(), kind);
        }
        assert!("Carousel".parse::<BlockKind>().is_err());
    }
}
