use std::fmt;

use fixturist_core::Field;

use crate::errors::SeedError;
use crate::seed_models::RelationConstraint;

/// Cardinality of a relation seen from the declaring field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::OneToOne => "1-1",
            RelationKind::OneToMany => "1-to-many",
            RelationKind::ManyToOne => "many-to-1",
            RelationKind::ManyToMany => "many-to-many",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a relation is created first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Direction {
    pub from: String,
    /// The order is a free choice and may be re-pinned by the scheduler.
    pub optional: bool,
}

/// Side played by the declaring model once the direction is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Created first; its identifiers feed the pool.
    Producer,
    /// Created later; draws identifiers from the pool.
    Consumer,
}

/// What the materializer does with a relation field for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationAction {
    /// Create the related record inline and read it back.
    CreateNested,
    /// Emit nothing and touch no pool entry.
    Skip,
    /// Emit nothing now; insert `copies` identifiers after persistence.
    Provide { copies: u64 },
    /// Draw between `min` and `max` identifiers from the pool.
    Connect { min: u64, max: u64 },
    /// Connect to at most `max` earlier records of the same model, then
    /// offer this record `copies` times to later ones.
    ConnectEarlier { max: u64, copies: u64 },
}

/// A classified relation with resolved connection bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub kind: RelationKind,
    pub direction: Direction,
    pub min: u64,
    pub max: u64,
    /// Model declaring `field`.
    pub model: String,
    pub field: Field,
    pub back_field: Field,
    pub constraint: RelationConstraint,
    /// Planned amount of `model`.
    pub amount: u64,
    /// Planned amount of the target model.
    pub target_amount: u64,
}

/// Cardinality and static direction; a pure function of the two field shapes.
pub fn classify(model: &str, field: &Field, back_field: &Field) -> (RelationKind, Direction) {
    let kind = match (field.is_list, back_field.is_list) {
        (true, true) => RelationKind::ManyToMany,
        (false, true) => RelationKind::ManyToOne,
        (true, false) => RelationKind::OneToMany,
        (false, false) => RelationKind::OneToOne,
    };

    let target = field.field_type.as_str();
    let flexible = || Direction {
        from: model.min(target).to_string(),
        optional: true,
    };
    let fixed = |from: &str| Direction {
        from: from.to_string(),
        optional: false,
    };

    let direction = if field.is_required_single() {
        if back_field.is_required_single() {
            flexible()
        } else {
            fixed(target)
        }
    } else if back_field.is_required_single() {
        fixed(model)
    } else {
        flexible()
    };

    (kind, direction)
}

impl Relation {
    pub fn new(
        model: &str,
        field: &Field,
        back_field: &Field,
        constraint: RelationConstraint,
        amount: u64,
        target_amount: u64,
    ) -> Result<Self, SeedError> {
        let (kind, direction) = classify(model, field, back_field);
        let mut relation = Relation {
            kind,
            direction,
            min: 0,
            max: 0,
            model: model.to_string(),
            field: field.clone(),
            back_field: back_field.clone(),
            constraint,
            amount,
            target_amount,
        };
        relation.resolve_bounds()?;
        Ok(relation)
    }

    pub fn target(&self) -> &str {
        &self.field.field_type
    }

    pub fn is_self_reference(&self) -> bool {
        self.target() == self.model
    }

    /// 1-1 with both sides required: the producer creates the other side inline.
    pub fn is_compound_create(&self) -> bool {
        self.kind == RelationKind::OneToOne
            && self.field.is_required_single()
            && self.back_field.is_required_single()
    }

    pub fn role(&self) -> Role {
        if self.direction.from == self.model {
            Role::Producer
        } else {
            Role::Consumer
        }
    }

    pub fn action(&self) -> RelationAction {
        if self.is_self_reference() {
            return self.self_action();
        }
        match (self.is_compound_create(), self.role()) {
            (true, Role::Producer) => RelationAction::CreateNested,
            (true, Role::Consumer) => RelationAction::Skip,
            (false, Role::Producer) => RelationAction::Provide {
                copies: self.max.max(1),
            },
            (false, Role::Consumer) => RelationAction::Connect {
                min: self.min,
                max: self.max,
            },
        }
    }

    /// Only the optional single side of a self-reference connects; a list
    /// side is filled in by those connects.
    fn self_action(&self) -> RelationAction {
        if self.field.is_list || self.field.is_required || self.max == 0 {
            return RelationAction::Skip;
        }
        let copies = if self.back_field.is_list {
            self.amount.max(1)
        } else {
            1
        };
        RelationAction::ConnectEarlier {
            max: self.max,
            copies,
        }
    }

    /// Cap a consumer's bounds to the identifiers its producer will insert.
    /// Fails when the records cannot all reach their minimum.
    pub fn limit_supply(&mut self, supply: u64) -> Result<(), SeedError> {
        let required = self.min * self.amount;
        if required > supply {
            return Err(self.insufficient(required, supply));
        }
        self.max = self.max.min(supply);
        Ok(())
    }

    /// Fix a flexible direction and resolve the bounds for the new role.
    pub fn pin(&mut self, from: &str) -> Result<(), SeedError> {
        self.direction = Direction {
            from: from.to_string(),
            optional: false,
        };
        self.resolve_bounds()
    }

    fn resolve_bounds(&mut self) -> Result<(), SeedError> {
        let constraint = self.constraint;
        if let (Some(min), Some(max)) = (constraint.min, constraint.max) {
            if min > max {
                return Err(self.invalid_range(min, max));
            }
        }

        if self.is_self_reference() {
            let min = constraint.min.unwrap_or(0);
            if min > 0 && !self.field.is_list {
                return Err(self.insufficient(min, 0));
            }
            self.min = 0;
            self.max = if self.field.is_list || self.field.is_required {
                0
            } else {
                constraint.max.unwrap_or(1).min(1)
            };
            return Ok(());
        }

        let (min, max) = if self.field.is_list {
            self.list_bounds()?
        } else if self.field.is_required {
            self.required_single_bounds()?
        } else {
            self.optional_single_bounds()?
        };
        self.min = min;
        self.max = max;
        Ok(())
    }

    fn required_single_bounds(&self) -> Result<(u64, u64), SeedError> {
        let (a, b) = (self.amount, self.target_amount);
        match self.kind {
            RelationKind::OneToOne if self.back_field.is_required_single() => {
                if a != b {
                    return Err(SeedError::RelationAmountMismatch {
                        model: self.model.clone(),
                        field: self.field.name.clone(),
                        target: self.target().to_string(),
                        amount: a,
                        target_amount: b,
                    });
                }
            }
            RelationKind::OneToOne if self.role() == Role::Consumer && a > b => {
                return Err(self.insufficient(a, b));
            }
            RelationKind::ManyToOne if b == 0 && a > 0 => {
                return Err(self.insufficient(1, 0));
            }
            _ => {}
        }
        Ok((1, 1))
    }

    fn optional_single_bounds(&self) -> Result<(u64, u64), SeedError> {
        let (a, b) = (self.amount, self.target_amount);
        let producer = self.role() == Role::Producer;
        let min = self.constraint.min.unwrap_or(0);
        let default_max = match (producer, self.kind) {
            (true, _) => 1,
            (false, RelationKind::OneToOne) => u64::from(a <= b),
            (false, _) => u64::from(b > 0),
        };
        let max = self.constraint.max.unwrap_or(default_max.max(min)).min(1);
        if min > max {
            return Err(self.invalid_range(min, max));
        }

        match self.kind {
            RelationKind::OneToOne if producer => {
                if self.back_field.is_required_single() && b > a {
                    return Err(self.insufficient(b, a));
                }
            }
            RelationKind::OneToOne => {
                if min * a > b {
                    return Err(self.insufficient(min * a, b));
                }
            }
            _ if !producer && min > 0 && b == 0 => {
                return Err(self.insufficient(min, 0));
            }
            _ => {}
        }
        Ok((min, max))
    }

    fn list_bounds(&self) -> Result<(u64, u64), SeedError> {
        let (a, b) = (self.amount, self.target_amount);
        let producer = self.role() == Role::Producer;
        let min = self.constraint.min.unwrap_or(0);
        let default_max = match self.kind {
            RelationKind::OneToMany if !producer && a > 0 => b / a,
            _ => b,
        };
        let max = self.constraint.max.unwrap_or(default_max.max(min));
        if min > max {
            return Err(self.invalid_range(min, max));
        }
        if max > b {
            return Err(self.insufficient(max, b));
        }

        if self.kind == RelationKind::OneToMany {
            if min * a > b {
                return Err(self.insufficient(min * a, b));
            }
            let copies = a * max.max(1);
            if producer && self.back_field.is_required_single() && copies < b {
                return Err(self.insufficient(b, copies));
            }
        }
        Ok((min, max))
    }

    fn invalid_range(&self, min: u64, max: u64) -> SeedError {
        SeedError::InvalidRelationRange {
            model: self.model.clone(),
            field: self.field.name.clone(),
            min,
            max,
        }
    }

    fn insufficient(&self, required: u64, available: u64) -> SeedError {
        SeedError::InsufficientRelationInstances {
            model: self.model.clone(),
            field: self.field.name.clone(),
            target: self.target().to_string(),
            required,
            available,
            missing: required.saturating_sub(available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(
        field: Field,
        back: Field,
        constraint: RelationConstraint,
        a: u64,
        b: u64,
    ) -> Result<Relation, SeedError> {
        let model = back.field_type.clone();
        Relation::new(&model, &field, &back, constraint, a, b)
    }

    #[test]
    fn classifies_cardinality_from_list_flags() {
        let list = Field::relation("bs", "B", "AB").list();
        let single = Field::relation("a", "A", "AB").optional();
        assert_eq!(classify("A", &list, &single).0, RelationKind::OneToMany);
        assert_eq!(classify("B", &single, &list).0, RelationKind::ManyToOne);
        assert_eq!(classify("A", &list, &list).0, RelationKind::ManyToMany);
        assert_eq!(classify("A", &single, &single).0, RelationKind::OneToOne);
    }

    #[test]
    fn direction_follows_requiredness() {
        let required = Field::relation("b", "B", "AB");
        let optional = Field::relation("a", "A", "AB").optional();
        let list = Field::relation("as", "A", "AB").list();

        let (_, direction) = classify("A", &required, &optional);
        assert_eq!(direction, Direction { from: "B".into(), optional: false });

        let (_, direction) = classify("B", &list, &required);
        assert_eq!(direction, Direction { from: "B".into(), optional: false });

        let (_, direction) = classify("B", &optional, &required);
        assert_eq!(direction, Direction { from: "B".into(), optional: false });

        let (_, direction) = classify("Z", &Field::relation("y", "Y", "YZ"), &Field::relation("z", "Z", "YZ"));
        assert_eq!(direction, Direction { from: "Y".into(), optional: true });

        let (_, direction) = classify("Z", &Field::relation("ys", "Y", "YZ").list(), &list);
        assert_eq!(direction.from, "Y");
        assert!(direction.optional);
    }

    #[test]
    fn classification_is_idempotent() {
        let field = Field::relation("authors", "Author", "AuthorToBlog").list();
        let back = Field::relation("blogs", "Blog", "AuthorToBlog").list();
        assert_eq!(classify("Blog", &field, &back), classify("Blog", &field, &back));
    }

    #[test]
    fn min_greater_than_max_is_rejected_first() {
        let field = Field::relation("authors", "Author", "AuthorToBlog").list();
        let back = Field::relation("blogs", "Blog", "AuthorToBlog").list();
        let err = relation(field, back, RelationConstraint::between(5, 2), 3, 1)
            .expect_err("range");
        assert!(matches!(
            err,
            SeedError::InvalidRelationRange { min: 5, max: 2, .. }
        ));
    }

    #[test]
    fn list_max_above_target_amount_reports_shortfall() {
        let field = Field::relation("authors", "Author", "AuthorToBlog").list();
        let back = Field::relation("blogs", "Blog", "AuthorToBlog").list();
        let err = relation(field, back, RelationConstraint::at_most(10), 3, 5)
            .expect_err("insufficient");
        match err {
            SeedError::InsufficientRelationInstances {
                required,
                available,
                missing,
                ..
            } => {
                assert_eq!((required, available, missing), (10, 5, 5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_one_to_one_needs_equal_amounts() {
        let field = Field::relation("profile", "Profile", "ProfileToUser");
        let back = Field::relation("user", "User", "ProfileToUser");
        let err = relation(field.clone(), back.clone(), RelationConstraint::default(), 3, 2)
            .expect_err("mismatch");
        assert!(matches!(err, SeedError::RelationAmountMismatch { .. }));

        let ok = relation(field, back, RelationConstraint::default(), 2, 2).expect("relation");
        assert!(ok.is_compound_create());
        assert_eq!((ok.min, ok.max), (1, 1));
        assert_eq!(ok.direction.from, "Profile");
        assert_eq!(ok.action(), RelationAction::Skip);
    }

    #[test]
    fn list_defaults_depend_on_role() {
        let residents = Field::relation("residents", "User", "HouseToUser").list();
        let house = Field::relation("house", "House", "HouseToUser").optional();

        let producer = relation(residents.clone(), house.clone(), RelationConstraint::default(), 3, 5)
            .expect("producer");
        assert_eq!(producer.role(), Role::Producer);
        assert_eq!((producer.min, producer.max), (0, 5));
        assert_eq!(producer.action(), RelationAction::Provide { copies: 5 });

        let mut consumer = producer.clone();
        consumer.pin("User").expect("pin");
        assert_eq!(consumer.role(), Role::Consumer);
        assert_eq!((consumer.min, consumer.max), (0, 1));
        assert_eq!(consumer.action(), RelationAction::Connect { min: 0, max: 1 });
    }

    #[test]
    fn optional_single_consumer_bounds() {
        let house = Field::relation("house", "House", "HouseToUser").optional();
        let residents = Field::relation("residents", "User", "HouseToUser").list();
        let mut relation = relation(house, residents, RelationConstraint::between(1, 1), 5, 3)
            .expect("relation");
        relation.pin("House").expect("pin");
        assert_eq!(relation.action(), RelationAction::Connect { min: 1, max: 1 });
    }

    #[test]
    fn optional_self_reference_connects_to_earlier_records() {
        let next = Field::relation("next", "Node", "Chain").optional();
        let relation = Relation::new("Node", &next, &next, RelationConstraint::default(), 4, 4)
            .expect("relation");
        assert!(relation.is_self_reference());
        assert_eq!(relation.action(), RelationAction::ConnectEarlier { max: 1, copies: 1 });

        let manager = Field::relation("manager", "Employee", "Reports").optional();
        let reports = Field::relation("reports", "Employee", "Reports").list();
        let up = Relation::new("Employee", &manager, &reports, RelationConstraint::default(), 5, 5)
            .expect("manager");
        assert_eq!(up.action(), RelationAction::ConnectEarlier { max: 1, copies: 5 });
        let down = Relation::new("Employee", &reports, &manager, RelationConstraint::default(), 5, 5)
            .expect("reports");
        assert_eq!(down.action(), RelationAction::Skip);

        let none = Relation::new("Node", &next, &next, RelationConstraint::at_most(0), 4, 4)
            .expect("relation");
        assert_eq!(none.action(), RelationAction::Skip);
    }

    #[test]
    fn required_self_reference_cannot_reach_earlier_records() {
        let next = Field::relation("next", "Node", "Chain").optional();
        let err = Relation::new("Node", &next, &next, RelationConstraint::between(1, 1), 4, 4)
            .expect_err("first node has nothing to point at");
        assert!(matches!(
            err,
            SeedError::InsufficientRelationInstances { required: 1, available: 0, .. }
        ));
    }

    #[test]
    fn consumer_bounds_follow_producer_supply() {
        let house = Field::relation("house", "House", "HouseToUser").optional();
        let residents = Field::relation("residents", "User", "HouseToUser").list();

        let mut open = relation(house.clone(), residents.clone(), RelationConstraint::default(), 5, 3)
            .expect("relation");
        open.pin("House").expect("pin");
        open.limit_supply(3).expect("optional draws adapt");
        assert_eq!((open.min, open.max), (0, 1));

        let mut strict = relation(house, residents, RelationConstraint::between(1, 1), 5, 3)
            .expect("relation");
        strict.pin("House").expect("pin");
        let err = strict.limit_supply(3).expect_err("five users need a house each");
        match err {
            SeedError::InsufficientRelationInstances { required, available, missing, .. } => {
                assert_eq!((required, available, missing), (5, 3, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
