use std::str::FromStr;
use tenet::{
    ClassDeclaration, Engine, Expression, FieldType, Formula, Output, Provenance, Quantity,
    TenetError,
};

fn q(text: &str) -> Quantity {
    Quantity::from_str(text).unwrap()
}

/// Bodies on earth: weight = mass * g
fn earth() -> Engine {
    let mut engine = Engine::new();
    engine
        .declare_class(
            ClassDeclaration::new("Body")
                .with_field("mass", FieldType::Measure("kg".parse().unwrap()))
                .with_field("weight", FieldType::Measure("kg m s^-2".parse().unwrap())),
        )
        .unwrap();

    let body = engine
        .requirement("b", "Body")
        .unwrap()
        .with_variable("m", "mass")
        .unwrap()
        .with_variable("w", "weight")
        .unwrap();
    engine
        .add_formula(
            Formula::new(
                "weight",
                vec![body],
                Output::new("w", "b", "weight"),
                Expression::var("m") * Expression::constant(q("9.81 m s^-2")),
            )
            .unwrap(),
        )
        .unwrap();
    engine
}

#[test]
fn test_weight_from_mass() {
    let mut engine = earth();
    let rock = engine.create_component("Body", Some("rock")).unwrap();
    let mut transaction = engine.transaction();
    transaction.set_field(rock, "mass", q("2 kg"));
    transaction.commit().unwrap();

    let resolution = engine.fill(rock, "weight").unwrap();
    assert_eq!(resolution.value, q("19.62 kg m s^-2"));

    let field = engine.get_field(rock, "weight").unwrap();
    assert!(matches!(field.provenance(), Some(Provenance::Formula(_))));
}

#[test]
fn test_mass_from_weight() {
    let mut engine = earth();
    let rock = engine.create_component("Body", Some("rock")).unwrap();
    let mut transaction = engine.transaction();
    transaction.set_field(rock, "weight", q("19.62 kg m s^-2"));
    transaction.commit().unwrap();

    let resolution = engine.fill(rock, "mass").unwrap();
    assert_eq!(resolution.value, q("2 kg"));
    assert_eq!(resolution.formula, "weight");
    assert!(resolution.equation.starts_with("m = w / 9.81"));
}

#[test]
fn test_values_of_the_wrong_unit_do_not_fill() {
    let mut engine = earth();
    let rock = engine.create_component("Body", Some("rock")).unwrap();
    let mut transaction = engine.transaction();
    transaction.set_field(rock, "mass", q("2 kg"));
    transaction.commit().unwrap();

    let mut transaction = engine.transaction();
    transaction.set_field(rock, "weight", q("3 s"));
    assert!(matches!(
        transaction.commit(),
        Err(TenetError::Cast { .. })
    ));
}

#[test]
fn test_solve_fills_every_body() {
    let mut engine = earth();
    let light = engine.create_component("Body", Some("light")).unwrap();
    let heavy = engine.create_component("Body", Some("heavy")).unwrap();
    let unknown = engine.create_component("Body", Some("unknown")).unwrap();

    let mut transaction = engine.transaction();
    transaction.set_field(light, "mass", q("1 kg"));
    transaction.set_field(heavy, "weight", q("98.1 kg m s^-2"));
    transaction.commit().unwrap();

    let filled = engine.solve().unwrap();
    assert_eq!(filled.len(), 2);
    assert_eq!(
        engine.component(light).unwrap().value("weight"),
        Some(&q("9.81 kg m s^-2"))
    );
    assert_eq!(
        engine.component(heavy).unwrap().value("mass"),
        Some(&q("10 kg"))
    );
    assert!(!engine.component(unknown).unwrap().is_known("mass"));
}
