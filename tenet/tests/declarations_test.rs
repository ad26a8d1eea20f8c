use tenet::{Declarations, Engine, Quantity, TenetError};

const FLEET: &str = r#"{
    "classes": [
        { "name": "Vehicle", "abstract": true, "fields": { "load": "number" } },
        { "name": "Wheel", "fields": { "load": "number", "pressure": "number" } },
        {
            "name": "Truck",
            "parents": ["Vehicle"],
            "groups": { "wheels": { "class": "Wheel", "min": 0, "max": 6 } }
        }
    ],
    "formulas": [{
        "name": "axle load",
        "requirements": [
            { "alias": "v", "class": "Vehicle", "variables": { "total": "load" } },
            {
                "alias": "w#",
                "class": "Wheel",
                "location": "v.wheels",
                "select_all": true,
                "variables": { "l#": "load" },
                "predicates": [{ "kind": "field_known", "field": "pressure" }]
            }
        ],
        "output": { "variable": "total", "alias": "v", "field": "load" },
        "expression": { "generic_sum": { "var": "l#" } }
    }],
    "components": [{
        "label": "truck",
        "class": "Truck",
        "groups": {
            "wheels": [
                { "label": "front", "class": "Wheel", "fields": { "load": 1200, "pressure": "8.5" } },
                { "label": "rear", "class": "Wheel", "fields": { "load": "1800.5", "pressure": 9 } },
                { "label": "flat", "class": "Wheel", "fields": { "load": 40 } }
            ]
        }
    }]
}"#;

#[test]
fn test_load_builds_graph_and_knowledge() {
    let mut engine = Engine::new();
    engine.load_json(FLEET).unwrap();

    assert_eq!(engine.knowledge().len(), 1);
    let truck = engine.component_by_label("truck").unwrap();
    let wheels = engine.get_subcomponent_group(truck, "wheels").unwrap();
    assert_eq!(wheels.len(), 3);

    let front = engine.component_by_label("front").unwrap();
    assert_eq!(
        engine.component(front).unwrap().value("pressure"),
        Some(&"8.5".parse::<Quantity>().unwrap())
    );
}

#[test]
fn test_loaded_formula_fills_inherited_field() {
    let mut engine = Engine::new();
    engine.load_json(FLEET).unwrap();
    let truck = engine.component_by_label("truck").unwrap();

    let resolution = engine.fill(truck, "load").unwrap();
    assert_eq!(resolution.value, "3000.5".parse::<Quantity>().unwrap());
    assert_eq!(resolution.binding.len(), 3);
}

#[test]
fn test_invalid_declarations() {
    assert!(matches!(
        Declarations::from_json("{ \"classes\": 3 }"),
        Err(TenetError::Declaration(_))
    ));

    let mut engine = Engine::new();
    let unknown_class = r#"{ "components": [{ "label": "x", "class": "Nothing" }] }"#;
    assert!(matches!(
        engine.load_json(unknown_class),
        Err(TenetError::UnknownClass(_))
    ));

    let mut engine = Engine::new();
    let bad_location = r#"{
        "classes": [{ "name": "Wheel", "fields": { "load": "number" } }],
        "formulas": [{
            "name": "bad",
            "requirements": [{ "alias": "w", "class": "Wheel", "location": "nowhere", "variables": { "l": "load" } }],
            "output": { "variable": "l", "alias": "w", "field": "load" },
            "expression": { "const": { "value": "1" } }
        }]
    }"#;
    assert!(matches!(
        engine.load_json(bad_location),
        Err(TenetError::Declaration(_))
    ));
}

#[test]
fn test_abstract_classes_cannot_be_instantiated() {
    let mut engine = Engine::new();
    let json = r#"{
        "classes": [{ "name": "Vehicle", "abstract": true }],
        "components": [{ "label": "v", "class": "Vehicle" }]
    }"#;
    assert!(matches!(
        engine.load_json(json),
        Err(TenetError::Declaration(_))
    ));
}
