use fixturist_core::Datamodel;
use schemars::schema_for;

#[test]
fn json_schema_describes_models_and_fields() {
    let generated = schema_for!(Datamodel);
    let json = serde_json::to_value(&generated).expect("serialize generated schema");

    let definitions = json
        .get("definitions")
        .and_then(|value| value.as_object())
        .expect("definitions");
    for name in ["Model", "Field", "FieldKind", "EnumType"] {
        assert!(definitions.contains_key(name), "missing definition {name}");
    }

    let field_props = definitions["Field"]["properties"]
        .as_object()
        .expect("field properties");
    assert!(field_props.contains_key("type"));
    assert!(field_props.contains_key("relation_name"));
}
