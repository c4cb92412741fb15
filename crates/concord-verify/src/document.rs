//! JSON Schema documents derived from Concord schemas.
//!
//! The document is a structural pre-check only. Integer fields are declared
//! as `number` so that `8.0` reaches the field checks, which coerce it; the
//! field checks also reject fractional values.

use serde_json::{json, Map, Value};

use concord_contracts::schema::{FieldKind, Schema};

/// Build the draft 2020-12 document describing `schema`'s payload.
pub fn structural_document(schema: &Schema) -> Value {
    let mut properties = Map::new();
    for field in schema.fields() {
        properties.insert(field.name.clone(), kind_document(&field.kind));
    }
    let required: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": schema.schema_id(),
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn kind_document(kind: &FieldKind) -> Value {
    match kind {
        FieldKind::Integer { min, max } => json!({ "type": "number", "minimum": min, "maximum": max }),
        FieldKind::Enum { allowed } => json!({ "type": "string", "enum": allowed }),
        FieldKind::Text => json!({ "type": "string" }),
        FieldKind::TextList => json!({ "type": "array", "items": { "type": "string" } }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use concord_contracts::schema::{FieldSpec, ResponseFormat, Schema};

    use super::structural_document;

    #[test]
    fn document_lists_every_field_as_required() {
        let schema = Schema::new(
            "arbitration-v1",
            vec![
                FieldSpec::one_of("winner", &["party_a", "party_b", "split"]),
                FieldSpec::integer("party_a_score", 0, 40),
                FieldSpec::text_list("key_factors"),
            ],
            ResponseFormat::Structured,
            json!({ "winner": "split", "party_a_score": 0, "key_factors": [] }),
        )
        .unwrap();

        let doc = structural_document(&schema);

        assert_eq!(doc["title"], "arbitration-v1");
        assert_eq!(doc["required"], json!(["winner", "party_a_score", "key_factors"]));
        assert_eq!(doc["properties"]["party_a_score"], json!({ "type": "number", "minimum": 0, "maximum": 40 }));
        assert_eq!(doc["properties"]["winner"]["enum"], json!(["party_a", "party_b", "split"]));
        assert_eq!(doc["properties"]["key_factors"]["items"]["type"], "string");
    }

    #[test]
    fn document_compiles() {
        let schema = Schema::new(
            "vibe-v1",
            vec![FieldSpec::one_of("vibe_status", &["PASS", "FAIL"]), FieldSpec::integer("vibe_score", 0, 10)],
            ResponseFormat::Structured,
            json!({ "vibe_status": "FAIL", "vibe_score": 0 }),
        )
        .unwrap();

        assert!(jsonschema::validator_for(&structural_document(&schema)).is_ok());
    }
}
