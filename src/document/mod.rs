//! Documents and the per-worker document builder
//!
//! A [`Document`] is an ordered list of `(field, value)` entries. The `id`
//! entry always comes first; single-valued fields follow in declaration
//! order and multi-valued fields contribute a contiguous run of entries
//! under the same name.
//!
//! On the wire a document is a flat JSON object. Fields filled through
//! [`Document::add_field`] are always JSON arrays, even with one value.

use crate::field::{FieldSpec, FieldValue, MAX_MULTI_VALUES};
use rand::Rng;
use serde_json::{Map, Value as JsonValue};

/// Name of the unique key field
pub const ID_FIELD: &str = "id";

/// One generated record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: Vec<(String, FieldValue)>,
    multi_valued: Vec<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding only its id
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.set_field(ID_FIELD, FieldValue::Str(id.into()));
        doc
    }

    /// Set a single-valued field, replacing any earlier value in place
    pub fn set_field(&mut self, name: &str, value: FieldValue) {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    /// Append a value, keeping earlier values under the same name
    pub fn add_field(&mut self, name: &str, value: FieldValue) {
        if !self.is_multi_valued(name) {
            self.multi_valued.push(name.to_string());
        }
        self.entries.push((name.to_string(), value));
    }

    pub fn is_multi_valued(&self, name: &str) -> bool {
        self.multi_valued.iter().any(|existing| existing == name)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(FieldValue::as_str)
    }

    /// First value stored under `name`
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Every value stored under `name`, in insertion order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.entries
            .iter()
            .filter(move |(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Number of entries, counting each value of a multi-valued field
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Flat JSON object; multi-valued fields become arrays
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::new();
        for (name, value) in &self.entries {
            let json = value.to_json();
            if !self.is_multi_valued(name) {
                object.insert(name.clone(), json);
                continue;
            }
            match object.get_mut(name) {
                Some(JsonValue::Array(values)) => values.push(json),
                _ => {
                    object.insert(name.clone(), JsonValue::Array(vec![json]));
                }
            }
        }
        JsonValue::Object(object)
    }
}

/// JSON array body for a batch
pub fn batch_to_json(batch: &[Document]) -> JsonValue {
    JsonValue::Array(batch.iter().map(Document::to_json).collect())
}

/// Builds documents from a worker's own field set
#[derive(Debug)]
pub struct DocumentBuilder {
    fields: Vec<FieldSpec>,
}

impl DocumentBuilder {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Build one document
    ///
    /// Multi-valued fields draw between 1 and 20 values and keep only the
    /// non-null ones; every other field draws once and is left out when
    /// null.
    pub fn build<R: Rng + ?Sized>(&mut self, id: &str, rng: &mut R) -> Document {
        let mut doc = Document::with_id(id);
        for field in &mut self.fields {
            if field.is_multi_valued() {
                let count = rng.gen_range(1..=MAX_MULTI_VALUES);
                for _ in 0..count {
                    if let Some(value) = field.next(rng) {
                        doc.add_field(field.name(), value);
                    }
                }
            } else if let Some(value) = field.next(rng) {
                doc.set_field(field.name(), value);
            }
        }
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::WordCorpus;
    use crate::field::{instantiate_all, FieldDefinition};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;
    use serde_json::json;
    use std::sync::Arc;

    fn builder(fields: &[(&str, &str, Option<u32>)]) -> DocumentBuilder {
        let corpus = Arc::new(WordCorpus::from_words((0..100).map(|i| format!("w{}", i))).unwrap());
        let definitions: Vec<FieldDefinition> = fields
            .iter()
            .map(|(name, spec, words)| FieldDefinition::parse(name, spec, *words).unwrap())
            .collect();
        DocumentBuilder::new(instantiate_all(&definitions, &corpus).unwrap())
    }

    #[test]
    fn test_build_sets_id_first_and_keeps_order() {
        let mut builder = builder(&[
            ("a_i", "i:1:10:u:0", None),
            ("b_l", "l:1:10:u:0", None),
            ("c_s", "s:3:10:u:0", None),
        ]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let doc = builder.build("id-0_1", &mut rng);

        assert_eq!(doc.id(), Some("id-0_1"));
        let names: Vec<&str> = doc.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "a_i", "b_l", "c_s"]);
    }

    #[test]
    fn test_null_fields_are_omitted() {
        let mut builder = builder(&[("always_i", "i:1:10:u:0", None), ("never_i", "i:1:10:u:100", None)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        for n in 0..100 {
            let doc = builder.build(&format!("d{}", n), &mut rng);
            assert!(doc.get("always_i").is_some());
            assert!(doc.get("never_i").is_none());
        }
    }

    #[test]
    fn test_multi_valued_count() {
        let mut builder = builder(&[("tags_ss", "s:3:100:u:0", None), ("after_i", "i:1:10:u:0", None)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);

        let mut saw_several = false;
        for n in 0..200 {
            let doc = builder.build(&format!("d{}", n), &mut rng);
            let count = doc.get_all("tags_ss").count();
            assert!((1..=MAX_MULTI_VALUES).contains(&count), "count={}", count);
            saw_several |= count > 1;

            // Values of a multi-valued field are contiguous
            let names: Vec<&str> = doc.iter().map(|(name, _)| name).collect();
            assert_eq!(names[0], "id");
            assert!(names[1..=count].iter().all(|name| *name == "tags_ss"));
            assert_eq!(names[count + 1], "after_i");
        }
        assert!(saw_several);
    }

    #[test]
    fn test_multi_valued_skips_nulls() {
        let mut builder = builder(&[("tags_ss", "s:3:100:u:100", None)]);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(4);
        let doc = builder.build("d", &mut rng);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_set_field_replaces() {
        let mut doc = Document::with_id("x");
        doc.set_field("n_i", FieldValue::Int(1));
        doc.set_field("n_i", FieldValue::Int(2));
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("n_i"), Some(&FieldValue::Int(2)));
    }

    #[test]
    fn test_to_json_groups_repeated_fields() {
        let mut doc = Document::with_id("x");
        doc.add_field("tags_ss", FieldValue::Str("red".into()));
        doc.add_field("tags_ss", FieldValue::Str("blue".into()));
        doc.set_field("n_i", FieldValue::Int(3));
        doc.add_field("one_ss", FieldValue::Str("solo".into()));

        assert_eq!(
            doc.to_json(),
            json!({"id": "x", "tags_ss": ["red", "blue"], "n_i": 3, "one_ss": ["solo"]})
        );
        let keys: Vec<String> = doc.to_json().as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["id", "tags_ss", "n_i", "one_ss"]);
    }

    #[test]
    fn test_batch_to_json() {
        let batch = vec![Document::with_id("a"), Document::with_id("b")];
        assert_eq!(batch_to_json(&batch), json!([{"id": "a"}, {"id": "b"}]));
    }
}
