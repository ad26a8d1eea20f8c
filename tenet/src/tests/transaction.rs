use crate::model::{ClassDeclaration, ComponentId, System};
use crate::quantity::{FieldType, Quantity};
use crate::TenetError;
use std::str::FromStr;

fn garage() -> System {
    let mut system = System::new();
    system
        .declare_class(
            ClassDeclaration::new("Wheel")
                .with_field("radius", FieldType::Number)
                .with_field("spokes", FieldType::Integer),
        )
        .unwrap();
    system
        .declare_class(ClassDeclaration::new("Engine").with_field("power", FieldType::Number))
        .unwrap();
    system
        .declare_class(
            ClassDeclaration::new("Car")
                .with_field("mass", FieldType::Number)
                .with_group("wheels", "Wheel", 0, Some(2))
                .with_group("engines", "Engine", 1, None),
        )
        .unwrap();
    system
}

fn wheels(system: &mut System, count: usize) -> Vec<ComponentId> {
    (0..count)
        .map(|_| system.create_component("Wheel", None).unwrap())
        .collect()
}

#[test]
fn test_commit_applies_memberships() {
    let mut system = garage();
    let car = system.create_component("Car", Some("car")).unwrap();
    let ids = wheels(&mut system, 2);

    let mut transaction = system.transaction();
    transaction.add_to_group(car, "wheels", ids[0]);
    transaction.add_to_group(car, "wheels", ids[1]);
    transaction.commit().unwrap();

    let group = system.get_subcomponent_group(car, "wheels").unwrap();
    assert_eq!(group.members(), ids.as_slice());
    assert_eq!(system.container_of(ids[1]), Some((car, "wheels")));
}

#[test]
fn test_group_max_is_enforced_atomically() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();
    let ids = wheels(&mut system, 3);

    let mut transaction = system.transaction();
    for wheel in &ids {
        transaction.add_to_group(car, "wheels", *wheel);
    }
    let result = transaction.commit();
    assert!(matches!(
        result,
        Err(TenetError::GroupBounds { size: 3, max: 2, .. })
    ));

    assert!(system.get_subcomponent_group(car, "wheels").unwrap().is_empty());
    assert_eq!(system.container_of(ids[0]), None);
}

#[test]
fn test_group_min_is_enforced_on_removal() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();
    let engine = system.create_component("Engine", None).unwrap();

    let mut transaction = system.transaction();
    transaction.add_to_group(car, "engines", engine);
    transaction.commit().unwrap();

    let mut transaction = system.transaction();
    transaction.remove_from_group(car, "engines", engine);
    let result = transaction.commit();
    assert!(matches!(result, Err(TenetError::GroupBounds { min: 1, .. })));
    assert!(system.get_subcomponent_group(car, "engines").unwrap().contains(engine));
}

#[test]
fn test_replacing_a_member_in_one_transaction() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();
    let old = system.create_component("Engine", None).unwrap();
    let new = system.create_component("Engine", None).unwrap();

    let mut transaction = system.transaction();
    transaction.add_to_group(car, "engines", old);
    transaction.commit().unwrap();

    let mut transaction = system.transaction();
    transaction.remove_from_group(car, "engines", old);
    transaction.add_to_group(car, "engines", new);
    transaction.commit().unwrap();

    let group = system.get_subcomponent_group(car, "engines").unwrap();
    assert_eq!(group.members(), &[new]);
    assert_eq!(system.container_of(old), None);
}

#[test]
fn test_member_class_must_match() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();
    let engine = system.create_component("Engine", None).unwrap();

    let mut transaction = system.transaction();
    transaction.add_to_group(car, "wheels", engine);
    assert!(matches!(transaction.commit(), Err(TenetError::Declaration(_))));
}

#[test]
fn test_component_belongs_to_one_group() {
    let mut system = garage();
    let first = system.create_component("Car", None).unwrap();
    let second = system.create_component("Car", None).unwrap();
    let wheel = wheels(&mut system, 1)[0];

    let mut transaction = system.transaction();
    transaction.add_to_group(first, "wheels", wheel);
    transaction.add_to_group(second, "wheels", wheel);
    assert!(matches!(transaction.commit(), Err(TenetError::Declaration(_))));
    assert_eq!(system.container_of(wheel), None);
}

#[test]
fn test_containment_cycles_are_rejected() {
    let mut system = System::new();
    system
        .declare_class(ClassDeclaration::new("Node").with_group("children", "Node", 0, None))
        .unwrap();
    let a = system.create_component("Node", Some("a")).unwrap();
    let b = system.create_component("Node", Some("b")).unwrap();

    let mut transaction = system.transaction();
    transaction.add_to_group(a, "children", b);
    transaction.commit().unwrap();

    let mut transaction = system.transaction();
    transaction.add_to_group(b, "children", a);
    assert!(matches!(transaction.commit(), Err(TenetError::Declaration(_))));

    let mut transaction = system.transaction();
    transaction.add_to_group(a, "children", a);
    assert!(matches!(transaction.commit(), Err(TenetError::Declaration(_))));
}

#[test]
fn test_dropped_transaction_changes_nothing() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();
    let wheel = wheels(&mut system, 1)[0];

    {
        let mut transaction = system.transaction();
        transaction.add_to_group(car, "wheels", wheel);
        transaction.set_field(car, "mass", Quantity::from(1200));
        assert!(!transaction.is_empty());
    }

    assert!(system.get_subcomponent_group(car, "wheels").unwrap().is_empty());
    assert!(!system.component(car).unwrap().is_known("mass"));
}

#[test]
fn test_fields_are_written_once() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();

    let mut transaction = system.transaction();
    transaction.set_field(car, "mass", Quantity::from(1200));
    transaction.commit().unwrap();

    let mut transaction = system.transaction();
    transaction.set_field(car, "mass", Quantity::from(1300));
    assert!(matches!(
        transaction.commit(),
        Err(TenetError::FieldAlreadyKnown { .. })
    ));
    assert_eq!(
        system.component(car).unwrap().value("mass"),
        Some(&Quantity::from(1200))
    );
}

#[test]
fn test_values_are_cast_to_field_type() {
    let mut system = garage();
    let wheel = wheels(&mut system, 1)[0];

    let mut transaction = system.transaction();
    transaction.set_field(wheel, "spokes", Quantity::from_str("31.6").unwrap());
    transaction.commit().unwrap();

    let field = system.get_field(wheel, "spokes").unwrap();
    assert_eq!(field.value(), Some(&Quantity::from(32)));
    assert!(field.provenance().is_none());
}

#[test]
fn test_unknown_field_fails_the_commit() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();

    let mut transaction = system.transaction();
    transaction.set_field(car, "colour", Quantity::from(1));
    assert!(matches!(
        transaction.commit(),
        Err(TenetError::UnknownField { .. })
    ));
}

#[test]
fn test_flattened_order_follows_containment() {
    let mut system = garage();
    let car = system.create_component("Car", None).unwrap();
    let ids = wheels(&mut system, 2);
    let engine = system.create_component("Engine", None).unwrap();

    let mut transaction = system.transaction();
    transaction.add_to_group(car, "wheels", ids[1]);
    transaction.add_to_group(car, "engines", engine);
    transaction.commit().unwrap();

    // engines before wheels, then the loose wheel
    assert_eq!(system.flattened(), vec![car, engine, ids[1], ids[0]]);
}
