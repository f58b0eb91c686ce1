use fixturist_core::{Datamodel, Field, FieldKind, Model};

#[test]
fn serializes_datamodel_deterministically() {
    let datamodel = Datamodel {
        models: vec![Model::new("User", vec![Field::scalar("id", "Int").id()])],
        enums: Vec::new(),
    };

    let json = serde_json::to_string_pretty(&datamodel).expect("serialize datamodel");
    let expected = r#"{
  "models": [
    {
      "name": "User",
      "fields": [
        {
          "name": "id",
          "kind": "scalar",
          "type": "Int",
          "is_list": false,
          "is_required": true,
          "is_id": true,
          "has_default": false
        }
      ],
      "id_fields": []
    }
  ],
  "enums": []
}"#;
    assert_eq!(json, expected);
}

#[test]
fn deserializes_minimal_field_with_defaults() {
    let json = r#"{
      "models": [
        {
          "name": "Post",
          "mapping": "Article",
          "fields": [
            { "name": "id", "kind": "scalar", "type": "String", "is_id": true, "has_default": true },
            { "name": "tags", "kind": "scalar", "type": "String", "is_list": true }
          ]
        }
      ]
    }"#;

    let datamodel: Datamodel = serde_json::from_str(json).expect("parse datamodel");
    let post = datamodel.model("Post").expect("post model");
    assert_eq!(post.delegate_name(), "article");
    let tags = post.field("tags").expect("tags field");
    assert_eq!(tags.kind, FieldKind::Scalar);
    assert!(tags.is_list);
    assert!(!tags.is_required);
    assert!(datamodel.enums.is_empty());
}
