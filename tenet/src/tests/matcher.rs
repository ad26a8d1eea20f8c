use crate::matcher::{Binding, Matcher};
use crate::model::{ClassDeclaration, ComponentId, System};
use crate::quantity::{FieldType, Quantity};
use crate::requirement::{Location, Predicate, Requirement};
use crate::{ResourceLimits, TenetError};

struct Garage {
    system: System,
    car: ComponentId,
    wheels: Vec<ComponentId>,
}

/// A car with three wheels; loads known on the first and last wheel
fn garage() -> Garage {
    let mut system = System::new();
    system
        .declare_class(
            ClassDeclaration::new("Wheel")
                .with_field("load", FieldType::Number)
                .with_field("radius", FieldType::Number),
        )
        .unwrap();
    system
        .declare_class(
            ClassDeclaration::new("Car")
                .with_field("mass", FieldType::Number)
                .with_group("wheels", "Wheel", 0, None),
        )
        .unwrap();

    let car = system.create_component("Car", Some("car")).unwrap();
    let wheels: Vec<ComponentId> = (1..=3)
        .map(|n| {
            system
                .create_component("Wheel", Some(&format!("wheel{}", n)))
                .unwrap()
        })
        .collect();

    let mut transaction = system.transaction();
    transaction.set_field(car, "mass", Quantity::from(1200));
    for (n, wheel) in wheels.iter().enumerate() {
        transaction.add_to_group(car, "wheels", *wheel);
        transaction.set_field(*wheel, "radius", Quantity::from(n as i64 + 1));
    }
    transaction.set_field(wheels[0], "load", Quantity::from(300));
    transaction.set_field(wheels[2], "load", Quantity::from(500));
    transaction.commit().unwrap();

    Garage {
        system,
        car,
        wheels,
    }
}

fn requirement(system: &System, alias: &str, class: &str) -> Requirement {
    let class = system.classes().find(class).unwrap();
    Requirement::new(alias, class).unwrap()
}

fn series(system: &System, alias: &str, class: &str) -> Requirement {
    let class = system.classes().find(class).unwrap();
    Requirement::select_all(alias, class).unwrap()
}

#[test]
fn test_owner_is_inferred_from_bound_member() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![
        requirement(&garage.system, "w", "Wheel")
            .with_location(Location::at("c", "wheels"))
            .with_variable("l", "load")
            .unwrap(),
        requirement(&garage.system, "c", "Car")
            .with_variable("m", "mass")
            .unwrap(),
    ];

    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::anchored("w", garage.wheels[2]))
        .unwrap();
    assert_eq!(binding.get("w"), Some(garage.wheels[2]));
    assert_eq!(binding.get("c"), Some(garage.car));
    assert_eq!(binding.len(), 2);
}

#[test]
fn test_first_admissible_candidate_wins() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![requirement(&garage.system, "w", "Wheel")
        .with_variable("l", "load")
        .unwrap()];

    let matcher = Matcher::new(&garage.system, &limits);
    let binding = matcher.bind(&requirements, Binding::new()).unwrap();
    assert_eq!(binding.get("w"), Some(garage.wheels[0]));

    let again = matcher.bind(&requirements, Binding::new()).unwrap();
    assert_eq!(binding, again);
}

#[test]
fn test_select_all_binds_admissible_members_in_order() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![
        series(&garage.system, "w#", "Wheel")
            .with_location(Location::at("c", "wheels"))
            .with_variable("l#", "load")
            .unwrap(),
        requirement(&garage.system, "c", "Car"),
    ];

    let matcher = Matcher::new(&garage.system, &limits);
    let binding = matcher
        .bind(&requirements, Binding::anchored("c", garage.car))
        .unwrap();
    assert_eq!(binding.series("w#"), vec![garage.wheels[0], garage.wheels[2]]);
    assert_eq!(binding.get("w3"), None);

    let arguments = matcher.arguments(&requirements, &binding).unwrap();
    assert_eq!(arguments.get("l1"), Some(&Quantity::from(300)));
    assert_eq!(arguments.get("l2"), Some(&Quantity::from(500)));
    assert!(!arguments.contains_key("l3"));
}

#[test]
fn test_select_all_respects_series_limit() {
    let garage = garage();
    let limits = ResourceLimits {
        max_series_length: 2,
        ..ResourceLimits::default()
    };
    let requirements = vec![series(&garage.system, "w#", "Wheel")
        .with_variable("r#", "radius")
        .unwrap()];

    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::new())
        .unwrap();
    assert_eq!(binding.series("w#").len(), 2);
}

#[test]
fn test_select_all_may_bind_nothing() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![series(&garage.system, "w#", "Wheel")
        .with_predicate(Predicate::FieldEquals {
            field: "radius".to_string(),
            value: Quantity::from(9),
        })];

    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::new())
        .unwrap();
    assert!(binding.is_empty());
}

#[test]
fn test_distinct_aliases_bind_different_components() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![
        requirement(&garage.system, "a", "Wheel")
            .with_variable("r", "radius")
            .unwrap(),
        requirement(&garage.system, "b", "Wheel")
            .with_variable("s", "radius")
            .unwrap()
            .distinct_from("a"),
    ];

    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::new())
        .unwrap();
    assert_eq!(binding.get("a"), Some(garage.wheels[0]));
    assert_eq!(binding.get("b"), Some(garage.wheels[1]));
}

#[test]
fn test_distinctness_holds_when_declaring_alias_is_bound_first() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![
        requirement(&garage.system, "a", "Wheel")
            .with_variable("r", "radius")
            .unwrap(),
        requirement(&garage.system, "b", "Wheel")
            .with_variable("s", "radius")
            .unwrap()
            .distinct_from("a"),
    ];

    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::anchored("b", garage.wheels[0]))
        .unwrap();
    assert_eq!(binding.get("b"), Some(garage.wheels[0]));
    assert_eq!(binding.get("a"), Some(garage.wheels[1]));
}

#[test]
fn test_distinct_aliases_anchored_together_are_unresolved() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![
        requirement(&garage.system, "a", "Wheel")
            .with_variable("r", "radius")
            .unwrap(),
        requirement(&garage.system, "b", "Wheel")
            .with_variable("s", "radius")
            .unwrap()
            .distinct_from("a"),
    ];

    let mut initial = Binding::anchored("a", garage.wheels[2]);
    initial.bind("b", garage.wheels[2]).unwrap();
    let result = Matcher::new(&garage.system, &limits).bind(&requirements, initial);
    assert!(matches!(result, Err(TenetError::Unresolved { .. })));
}

#[test]
fn test_predicates_filter_candidates() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![requirement(&garage.system, "w", "Wheel").with_predicate(
        Predicate::FieldEquals {
            field: "radius".to_string(),
            value: Quantity::from(2),
        },
    )];

    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::new())
        .unwrap();
    assert_eq!(binding.get("w"), Some(garage.wheels[1]));

    let requirements = vec![requirement(&garage.system, "w", "Wheel").with_predicate(
        Predicate::FieldUnknown {
            field: "load".to_string(),
        },
    )];
    let binding = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::new())
        .unwrap();
    assert_eq!(binding.get("w"), Some(garage.wheels[1]));
}

#[test]
fn test_unresolved_reports_missing_fields() {
    let mut garage = garage();
    let spare = garage.system.create_component("Wheel", Some("spare")).unwrap();
    let limits = ResourceLimits::default();
    let requirements = vec![requirement(&garage.system, "w", "Wheel")
        .with_variable("l", "load")
        .unwrap()];

    let result = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::anchored("w", spare));
    match result {
        Err(TenetError::Unresolved { alias, missing, .. }) => {
            assert_eq!(alias, "w");
            assert_eq!(missing, vec!["load".to_string()]);
        }
        other => panic!("Expected Unresolved, got {:?}", other),
    }
}

#[test]
fn test_anchor_of_wrong_class_is_unresolved() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![requirement(&garage.system, "w", "Wheel")];

    let result = Matcher::new(&garage.system, &limits)
        .bind(&requirements, Binding::anchored("w", garage.car));
    assert!(matches!(result, Err(TenetError::Unresolved { .. })));
}

#[test]
fn test_binding_rejects_alias_collisions() {
    let garage = garage();
    let mut binding = Binding::new();
    binding.bind("w", garage.wheels[0]).unwrap();
    binding.bind("w", garage.wheels[0]).unwrap();

    let result = binding.bind("w", garage.wheels[1]);
    assert!(matches!(result, Err(TenetError::AliasCollision { .. })));
    assert_eq!(binding.to_string(), format!("{{w={}}}", garage.wheels[0]));
}

#[test]
fn test_arguments_require_known_fields() {
    let garage = garage();
    let limits = ResourceLimits::default();
    let requirements = vec![requirement(&garage.system, "w", "Wheel")
        .with_variable("l", "load")
        .unwrap()];

    let result = Matcher::new(&garage.system, &limits)
        .arguments(&requirements, &Binding::anchored("w", garage.wheels[1]));
    assert!(matches!(result, Err(TenetError::Unresolved { .. })));
}
