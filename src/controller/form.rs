use serde_json::{Value, json};

use crate::content::Reference;
use crate::services::{FieldMap, Record};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(String),
}

/// In-memory state of the add/edit dialog. Values survive a failed submit so the editor
/// can retry without retyping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditForm {
    mode: Option<FormMode>,
    fields: FieldMap,
}

impl EditForm {
    pub fn open_create(&mut self, defaults: FieldMap) {
        self.mode = Some(FormMode::Create);
        self.fields = defaults;
    }

    pub fn open_edit(&mut self, record: &Record) {
        self.mode = Some(FormMode::Edit(record.id.clone()));
        self.fields = record.fields.clone();
    }

    pub fn close(&mut self) {
        self.mode = None;
        self.fields.clear();
    }

    pub fn is_open(&self) -> bool {
        self.mode.is_some()
    }

    pub fn mode(&self) -> Option<&FormMode> {
        self.mode.as_ref()
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Stores a single reference as `<prefix>Id` / `<prefix>Name`.
    pub fn set_reference(&mut self, prefix: &str, reference: &Reference) {
        self.set(format!("{prefix}Id"), reference.id.clone());
        self.set(format!("{prefix}Name"), reference.name.clone());
    }

    /// Appends to a list of references, ignoring one whose id is already present.
    pub fn push_reference(&mut self, key: &str, reference: &Reference) -> bool {
        self.update_list(key, |list| {
            let present = list.iter().any(|item| {
                item.get("id").and_then(Value::as_str) == Some(reference.id.as_str())
            });
            if !present {
                list.push(json!({ "id": reference.id, "name": reference.name }));
            }
            !present
        })
    }

    pub fn remove_reference(&mut self, key: &str, id: &str) {
        self.update_list(key, |list| {
            list.retain(|item| item.get("id").and_then(Value::as_str) != Some(id))
        });
    }

    /// Adds `value` to a string list when absent, removes it when present.
    pub fn toggle_list_item(&mut self, key: &str, value: &str) {
        self.update_list(key, |list| {
            match list.iter().position(|item| item.as_str() == Some(value)) {
                Some(index) => {
                    list.remove(index);
                }
                None => list.push(Value::from(value)),
            }
        });
    }

    pub fn references(&self, key: &str) -> Vec<Reference> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| serde_json::from_value(item.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Runs `f` over the list stored at `key`; a missing or non-list value starts empty.
    fn update_list<R>(&mut self, key: &str, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        let mut items = match self.fields.remove(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let result = f(&mut items);
        self.fields.insert(key.to_string(), Value::Array(items));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn celeb(id: &str, name: &str) -> Reference {
        Reference {
            id: id.into(),
            name: name.into(),
        }
    }

    #[test]
    fn cast_references_dedupe_by_id() {
        let mut form = EditForm::default();
        form.open_create(FieldMap::new());
        assert!(form.push_reference("cast", &celeb("c1", "Prabhas")));
        assert!(!form.push_reference("cast", &celeb("c1", "Prabhas")));
        assert!(form.push_reference("cast", &celeb("c2", "Prashanth Neel")));
        form.remove_reference("cast", "c1");
        assert_eq!(form.references("cast"), vec![celeb("c2", "Prashanth Neel")]);
    }

    #[test]
    fn platforms_toggle() {
        let mut form = EditForm::default();
        form.toggle_list_item("ottPlatforms", "netflix");
        form.toggle_list_item("ottPlatforms", "prime");
        form.toggle_list_item("ottPlatforms", "netflix");
        assert_eq!(form.get("ottPlatforms"), Some(&json!(["prime"])));
    }

    #[test]
    fn single_reference_fills_id_and_name() {
        let mut form = EditForm::default();
        form.set_reference("celebrity", &celeb("c9", "Samantha Ruth Prabhu"));
        assert_eq!(form.get("celebrityId"), Some(&json!("c9")));
        assert_eq!(form.get("celebrityName"), Some(&json!("Samantha Ruth Prabhu")));
    }
}
