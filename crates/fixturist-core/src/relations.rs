use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::schema::{Datamodel, Field, Model};

/// Location of a field inside the datamodel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub model: String,
    pub field: String,
}

impl FieldRef {
    pub fn new(model: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            field: field.into(),
        }
    }
}

/// Both sides of a named relation. Self-references with a single field
/// store the same location twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationPair {
    pub name: String,
    pub left: FieldRef,
    pub right: FieldRef,
}

/// Precomputed back-reference lookup for every relation field.
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    pairs: Vec<RelationPair>,
    back: BTreeMap<FieldRef, FieldRef>,
}

impl RelationIndex {
    pub fn build(datamodel: &Datamodel) -> Result<Self> {
        let mut groups: BTreeMap<&str, Vec<(&Model, &Field)>> = BTreeMap::new();

        for model in &datamodel.models {
            for field in model.relation_fields() {
                let Some(relation_name) = field.relation_name.as_deref() else {
                    return Err(CoreError::InvalidSchema(format!(
                        "relation field {}.{} has no relation name",
                        model.name, field.name
                    )));
                };
                if datamodel.model(&field.field_type).is_none() {
                    return Err(CoreError::InvalidSchema(format!(
                        "relation field {}.{} targets unknown model {}",
                        model.name, field.name, field.field_type
                    )));
                }
                groups.entry(relation_name).or_default().push((model, field));
            }
        }

        let mut index = RelationIndex::default();
        for (name, sides) in groups {
            let (left, right) = match sides.as_slice() {
                [(model, field)] if field.field_type == model.name => {
                    let side = FieldRef::new(&model.name, &field.name);
                    (side.clone(), side)
                }
                [(model, field)] => {
                    return Err(CoreError::InvalidSchema(format!(
                        "relation {name} declared only on {}.{}",
                        model.name, field.name
                    )));
                }
                [(a_model, a_field), (b_model, b_field)] => {
                    if a_field.field_type != b_model.name || b_field.field_type != a_model.name {
                        return Err(CoreError::InvalidSchema(format!(
                            "relation {name} sides {}.{} and {}.{} do not point at each other",
                            a_model.name, a_field.name, b_model.name, b_field.name
                        )));
                    }
                    (
                        FieldRef::new(&a_model.name, &a_field.name),
                        FieldRef::new(&b_model.name, &b_field.name),
                    )
                }
                _ => {
                    return Err(CoreError::InvalidSchema(format!(
                        "relation {name} has {} sides, expected at most 2",
                        sides.len()
                    )));
                }
            };

            index.back.insert(left.clone(), right.clone());
            index.back.insert(right.clone(), left.clone());
            index.pairs.push(RelationPair {
                name: name.to_string(),
                left,
                right,
            });
        }

        Ok(index)
    }

    pub fn pairs(&self) -> &[RelationPair] {
        &self.pairs
    }

    /// Opposite side of `model.field`.
    pub fn back_reference(&self, model: &str, field: &str) -> Option<&FieldRef> {
        self.back.get(&FieldRef::new(model, field))
    }

    /// Resolves the back-reference to its field definition.
    pub fn back_field<'a>(
        &self,
        datamodel: &'a Datamodel,
        model: &str,
        field: &str,
    ) -> Option<&'a Field> {
        let back = self.back_reference(model, field)?;
        datamodel.model(&back.model)?.field(&back.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Model};

    fn blog_datamodel() -> Datamodel {
        Datamodel {
            models: vec![
                Model::new(
                    "Blog",
                    vec![
                        Field::scalar("id", "Int").id(),
                        Field::relation("authors", "Author", "AuthorToBlog").list(),
                    ],
                ),
                Model::new(
                    "Author",
                    vec![
                        Field::scalar("id", "Int").id(),
                        Field::relation("blogs", "Blog", "AuthorToBlog").list(),
                    ],
                ),
            ],
            enums: Vec::new(),
        }
    }

    #[test]
    fn pairs_relation_sides_by_name() {
        let datamodel = blog_datamodel();
        let index = RelationIndex::build(&datamodel).expect("index");

        assert_eq!(index.pairs().len(), 1);
        let back = index.back_reference("Blog", "authors").expect("back ref");
        assert_eq!(back, &FieldRef::new("Author", "blogs"));
        let field = index
            .back_field(&datamodel, "Author", "blogs")
            .expect("back field");
        assert_eq!(field.name, "authors");
    }

    #[test]
    fn single_sided_self_reference_points_at_itself() {
        let datamodel = Datamodel {
            models: vec![Model::new(
                "Node",
                vec![
                    Field::scalar("id", "Int").id(),
                    Field::relation("next", "Node", "NodeChain").optional(),
                ],
            )],
            enums: Vec::new(),
        };
        let index = RelationIndex::build(&datamodel).expect("index");
        assert_eq!(
            index.back_reference("Node", "next"),
            Some(&FieldRef::new("Node", "next"))
        );
    }

    #[test]
    fn rejects_dangling_relation() {
        let mut datamodel = blog_datamodel();
        datamodel.models[1].fields.pop();
        let err = RelationIndex::build(&datamodel).expect_err("dangling");
        assert!(err.to_string().contains("AuthorToBlog"));
    }

    #[test]
    fn rejects_unknown_target() {
        let datamodel = Datamodel {
            models: vec![Model::new(
                "Post",
                vec![Field::relation("author", "Ghost", "GhostToPost")],
            )],
            enums: Vec::new(),
        };
        let err = RelationIndex::build(&datamodel).expect_err("unknown target");
        assert!(err.to_string().contains("Ghost"));
    }
}
