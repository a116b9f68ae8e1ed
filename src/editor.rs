//! In-memory block list editing for the admin
//!
//! An editor is loaded from a page, mutated by a sequence of operations and
//! saved back as one full-list write. Concurrent editors of the same page
//! overwrite each other; the last save wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePool;

use crate::block::{new_block_id, BlockContent, BlockInstance, BlockKind};
use crate::error::AppError;
use crate::pages::{save_blocks, Page};

/// One editor operation as posted by the JSON API or the HTML forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    Add {
        /// Block type tag, e.g. `FAQAccordion`
        #[serde(rename = "type")]
        block_type: String,
    },
    Remove {
        id: String,
    },
    MoveUp {
        id: String,
    },
    MoveDown {
        id: String,
    },
    Duplicate {
        id: String,
    },
    UpdateProps {
        id: String,
        props: Value,
    },
    ReplaceProps {
        id: String,
        props: Value,
    },
}

/// RFC 7396 JSON merge patch: objects merge recursively, `null` deletes,
/// anything else replaces
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockEditor {
    blocks: Vec<BlockInstance>,
}

impl BlockEditor {
    pub fn load(page: &Page) -> Self {
        Self::from_blocks(page.blocks.clone())
    }

    pub fn from_blocks(blocks: Vec<BlockInstance>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<BlockInstance> {
        self.blocks
    }

    fn position(&self, id: &str) -> Result<usize, AppError> {
        self.blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| AppError::BlockNotFound(id.to_string()))
    }

    /// Append a block of `kind` with default props and return its id
    pub fn add(&mut self, kind: BlockKind) -> String {
        let instance = BlockInstance::new(kind.default_block());
        let id = instance.id.clone();
        self.blocks.push(instance);
        id
    }

    pub fn remove(&mut self, id: &str) -> Result<BlockInstance, AppError> {
        let index = self.position(id)?;
        Ok(self.blocks.remove(index))
    }

    /// No-op for the first block
    pub fn move_up(&mut self, id: &str) -> Result<(), AppError> {
        let index = self.position(id)?;
        if index > 0 {
            self.blocks.swap(index, index - 1);
        }
        Ok(())
    }

    /// No-op for the last block
    pub fn move_down(&mut self, id: &str) -> Result<(), AppError> {
        let index = self.position(id)?;
        if index + 1 < self.blocks.len() {
            self.blocks.swap(index, index + 1);
        }
        Ok(())
    }

    /// Insert a copy with a fresh id right after the original
    pub fn duplicate(&mut self, id: &str) -> Result<String, AppError> {
        let index = self.position(id)?;
        let mut copy = self.blocks[index].clone();
        copy.id = new_block_id();
        let new_id = copy.id.clone();
        self.blocks.insert(index + 1, copy);
        Ok(new_id)
    }

    /// Re-read a block from a props object, keeping its id and type
    ///
    /// A typed block must still parse as the same type, otherwise it is left
    /// untouched and [`AppError::Validation`] is returned. An unsupported block
    /// is re-read as-is, which may turn it into a typed block.
    fn rebuild(&mut self, index: usize, mut props: Map<String, Value>) -> Result<(), AppError> {
        let instance = &self.blocks[index];
        let typed_kind = match &instance.content {
            BlockContent::Typed(block) => Some(block.kind()),
            BlockContent::Unsupported { .. } => None,
        };
        match (typed_kind, instance.type_name()) {
            (Some(kind), _) => {
                props.insert("type".to_string(), Value::String(kind.as_str().to_string()));
            }
            (None, Some(name)) => {
                props
                    .entry("type".to_string())
                    .or_insert_with(|| Value::String(name.to_string()));
            }
            (None, None) => {}
        }
        props.insert("id".to_string(), Value::String(instance.id.clone()));

        let updated = BlockInstance::from_value(Value::Object(props));
        if let (Some(kind), BlockContent::Unsupported { reason, .. }) =
            (typed_kind, &updated.content)
        {
            return Err(AppError::Validation(format!(
                "Invalid props for {}: {}",
                kind, reason
            )));
        }
        self.blocks[index] = updated;
        Ok(())
    }

    /// Merge `partial` into the block's props (RFC 7396) and re-validate
    ///
    /// Undeclared stored keys take part in the merge like declared props.
    pub fn update_props(&mut self, id: &str, partial: &Value) -> Result<(), AppError> {
        if !partial.is_object() {
            return Err(AppError::Validation(
                "props patch must be a JSON object".to_string(),
            ));
        }
        let index = self.position(id)?;
        let mut props = self.blocks[index].editable_props()?;
        merge_patch(&mut props, partial);
        let props = match props {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.rebuild(index, props)
    }

    /// Replace the block's props outright; keys left out fall back to defaults
    pub fn replace_props(&mut self, id: &str, props: &Value) -> Result<(), AppError> {
        let Value::Object(props) = props else {
            return Err(AppError::Validation(
                "props must be a JSON object".to_string(),
            ));
        };
        let index = self.position(id)?;
        let mut props = props.clone();
        props.remove("id");
        if self.blocks[index].is_supported() {
            props.remove("type");
        }
        self.rebuild(index, props)
    }

    /// Apply one operation; returns the id of a created block, if any
    pub fn apply(&mut self, op: &EditOp) -> Result<Option<String>, AppError> {
        match op {
            EditOp::Add { block_type } => {
                let kind = block_type
                    .parse::<BlockKind>()
                    .map_err(AppError::Validation)?;
                Ok(Some(self.add(kind)))
            }
            EditOp::Remove { id } => self.remove(id).map(|_| None),
            EditOp::MoveUp { id } => self.move_up(id).map(|_| None),
            EditOp::MoveDown { id } => self.move_down(id).map(|_| None),
            EditOp::Duplicate { id } => self.duplicate(id).map(Some),
            EditOp::UpdateProps { id, props } => self.update_props(id, props).map(|_| None),
            EditOp::ReplaceProps { id, props } => self.replace_props(id, props).map(|_| None),
        }
    }

    /// Persist the whole list to the page at `slug`
    pub async fn save(&self, pool: &SqlitePool, slug: &str) -> Result<Page, AppError> {
        save_blocks(pool, slug, &self.blocks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use serde_json::json;

    fn ids(editor: &BlockEditor) -> Vec<String> {
        editor.blocks().iter().map(|b| b.id.clone()).collect()
    }

    fn editor_with_three() -> (BlockEditor, String, String, String) {
        let mut editor = BlockEditor::default();
        let a = editor.add(BlockKind::HeroSearch);
        let b = editor.add(BlockKind::FaqAccordion);
        let c = editor.add(BlockKind::CtaSection);
        (editor, a, b, c)
    }

    #[test]
    fn test_add_appends_with_defaults() {
        let (editor, a, _, c) = editor_with_three();
        assert_eq!(editor.blocks().len(), 3);
        assert_eq!(editor.blocks()[0].id, a);
        assert_eq!(editor.blocks()[2].id, c);
        assert_eq!(editor.blocks()[1].type_name(), Some("FAQAccordion"));
    }

    #[test]
    fn test_moves_are_noops_at_edges() {
        let (mut editor, a, b, c) = editor_with_three();
        editor.move_up(&a).unwrap();
        editor.move_down(&c).unwrap();
        assert_eq!(ids(&editor), vec![a.clone(), b.clone(), c.clone()]);

        editor.move_up(&c).unwrap();
        assert_eq!(ids(&editor), vec![a.clone(), c.clone(), b.clone()]);
        editor.move_down(&a).unwrap();
        assert_eq!(ids(&editor), vec![c, a, b]);
    }

    #[test]
    fn test_duplicate_inserts_after_original() {
        let (mut editor, a, b, c) = editor_with_three();
        let copy = editor.duplicate(&b).unwrap();
        assert_ne!(copy, b);
        assert_eq!(ids(&editor), vec![a, b.clone(), copy.clone(), c]);
        assert_eq!(editor.blocks()[1].content, editor.blocks()[2].content);
    }

    #[test]
    fn test_unknown_id_is_block_not_found() {
        let (mut editor, ..) = editor_with_three();
        assert!(matches!(
            editor.remove("missing"),
            Err(AppError::BlockNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            editor.move_up("missing"),
            Err(AppError::BlockNotFound(_))
        ));
        assert!(matches!(
            editor.update_props("missing", &json!({})),
            Err(AppError::BlockNotFound(_))
        ));
    }

    #[test]
    fn test_update_props_merges() {
        let mut editor = BlockEditor::default();
        let id = editor.add(BlockKind::FaqAccordion);
        editor
            .update_props(
                &id,
                &json!({"items": [{"question": "Ages?", "answer": "5 to 12"}]}),
            )
            .unwrap();
        match &editor.blocks()[0].content {
            BlockContent::Typed(Block::FaqAccordion(props)) => {
                assert_eq!(props.title, "Frequently asked questions");
                assert_eq!(props.items.len(), 1);
                assert_eq!(props.items[0].question, "Ages?");
            }
            other => panic!("unexpected content: {:?}", other),
        }
    }

    #[test]
    fn test_update_props_rejects_wrong_shape() {
        let mut editor = BlockEditor::default();
        let id = editor.add(BlockKind::FeaturedClasses);
        let before = editor.blocks()[0].clone();
        let result = editor.update_props(&id, &json!({"limit": "lots"}));
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(editor.blocks()[0], before);
    }

    #[test]
    fn test_apply_parses_ops() {
        let ops: Vec<EditOp> = serde_json::from_value(json!([
            {"op": "add", "type": "Testimonials"},
            {"op": "add", "type": "TrustBadges"}
        ]))
        .unwrap();
        let mut editor = BlockEditor::default();
        let first = editor.apply(&ops[0]).unwrap().unwrap();
        editor.apply(&ops[1]).unwrap();
        editor
            .apply(&EditOp::MoveDown { id: first.clone() })
            .unwrap();
        assert_eq!(editor.blocks()[1].id, first);

        let bad = EditOp::Add {
            block_type: "Carousel".to_string(),
        };
        assert!(matches!(editor.apply(&bad), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_update_props_keeps_undeclared_keys() {
        let mut editor = BlockEditor::from_blocks(vec![BlockInstance::from_value(json!({
            "id": "h1",
            "type": "HeroSearch",
            "headline": "Old",
            "ctaColor": "red"
        }))]);
        editor
            .update_props("h1", &json!({"headline": "New", "badge": "beta"}))
            .unwrap();
        let value = editor.blocks()[0].to_value().unwrap();
        assert_eq!(value["headline"], "New");
        assert_eq!(value["ctaColor"], "red");
        assert_eq!(value["badge"], "beta");
        assert_eq!(value["type"], "HeroSearch");

        // null removes an undeclared key like any other
        editor.update_props("h1", &json!({"ctaColor": null})).unwrap();
        assert!(editor.blocks()[0].extra.get("ctaColor").is_none());
    }

    #[test]
    fn test_replace_props_drops_omitted_keys() {
        let mut editor = BlockEditor::default();
        let id = editor.add(BlockKind::CtaSection);
        editor
            .update_props(
                &id,
                &json!({"headline": "Join", "primary": {"label": "Go", "href": "/classes"}, "tone": "warm"}),
            )
            .unwrap();

        // The textarea shows every prop; deleting `primary` and `tone` there removes them
        editor
            .apply(&EditOp::ReplaceProps {
                id: id.clone(),
                props: json!({"headline": "Join now"}),
            })
            .unwrap();
        match &editor.blocks()[0].content {
            BlockContent::Typed(Block::CtaSection(props)) => {
                assert_eq!(props.headline, "Join now");
                assert!(props.primary.is_none());
            }
            other => panic!("unexpected content: {:?}", other),
        }
        assert!(editor.blocks()[0].extra.is_empty());
        assert_eq!(editor.blocks()[0].id, id);
    }

    #[test]
    fn test_replace_props_rejects_wrong_shape() {
        let mut editor = BlockEditor::default();
        let id = editor.add(BlockKind::FeaturedClasses);
        let before = editor.blocks()[0].clone();
        assert!(matches!(
            editor.replace_props(&id, &json!({"limit": "lots"})),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            editor.replace_props(&id, &json!([1, 2])),
            Err(AppError::Validation(_))
        ));
        assert_eq!(editor.blocks()[0], before);
    }

    #[test]
    fn test_merge_patch_null_removes() {
        let mut target = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge_patch(&mut target, &json!({"a": null, "b": {"c": 5}}));
        assert_eq!(target, json!({"b": {"c": 5, "d": 3}}));
    }
}
