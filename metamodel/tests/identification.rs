//! Preferred identifiers across reference modes, subtypes and objectification.

#![allow(clippy::unwrap_used)]

use orm_metamodel::{Assimilation, MetamodelError, ObjectTypeId, RoleId, Schema};

fn reference_mode(schema: &mut Schema, entity: &str, value: &str) -> (ObjectTypeId, RoleId) {
    let e = schema.add_entity_type(entity);
    let v = schema.add_value_type(value);
    let ft = schema.add_fact_type(&[e, v]).unwrap();
    let roles = schema.fact_type(ft).roles.clone();
    schema.add_reading(ft, [roles[0], roles[1]], "{0} has {1}").unwrap();
    schema.add_uniqueness_constraint(&roles[..1], false).unwrap();
    schema.add_mandatory_constraint(roles[0]).unwrap();
    schema.add_uniqueness_constraint(&roles[1..], true).unwrap();
    (e, roles[1])
}

#[test]
fn objectified_binary_is_identified_by_its_spanning_uniqueness() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("orm::pi=trace"))
        .with_test_writer()
        .try_init();
    let mut schema = Schema::new();
    let (student, _) = reference_mode(&mut schema, "Student", "StudentNr");
    let (course, _) = reference_mode(&mut schema, "Course", "CourseCode");
    let enrols = schema.add_fact_type(&[student, course]).unwrap();
    let roles = schema.fact_type(enrols).roles.clone();
    let spanning = schema.add_uniqueness_constraint(&roles, true).unwrap();
    let enrolment = schema.add_entity_type("Enrolment");
    schema.objectify(enrolment, enrols).unwrap();

    assert_eq!(schema.preferred_identifier(enrolment).unwrap(), spanning);
    assert_eq!(schema.preferred_identifier_roles(enrolment).unwrap(), roles);
    assert_eq!(
        schema.rank_in_preferred_identifier(enrolment, roles[1]).unwrap(),
        Some(1)
    );
}

#[test]
fn link_fact_types_mirror_every_objectified_role() {
    let mut schema = Schema::new();
    let (student, _) = reference_mode(&mut schema, "Student", "StudentNr");
    let (course, _) = reference_mode(&mut schema, "Course", "CourseCode");
    let enrols = schema.add_fact_type(&[student, course]).unwrap();
    let roles = schema.fact_type(enrols).roles.clone();
    schema.add_uniqueness_constraint(&roles, true).unwrap();
    let enrolment = schema.add_entity_type("Enrolment");
    schema.objectify(enrolment, enrols).unwrap();

    let links = schema.create_link_fact_types(enrolment).unwrap();
    assert_eq!(links.len(), 2);
    for (&link, &role) in links.iter().zip(&roles) {
        let [objectification, mirror] = [schema.fact_type(link).roles[0], schema.fact_type(link).roles[1]];
        assert!(schema.is_objectification_role(objectification));
        assert!(schema.is_mirror_role(mirror));
        assert_eq!(schema.base_role(mirror), role);
        assert!(schema.is_unique(mirror));
        assert!(schema.is_mandatory(mirror));
    }
    assert!(schema.create_link_fact_types(enrolment).unwrap().is_empty());
}

#[test]
fn objectifying_twice_is_rejected() {
    let mut schema = Schema::new();
    let a = schema.add_entity_type("A");
    let b = schema.add_entity_type("B");
    let ft = schema.add_fact_type(&[a]).unwrap();
    schema.objectify(a, ft).unwrap();
    assert!(matches!(
        schema.objectify(b, ft),
        Err(MetamodelError::AlreadyObjectified(_, ref by)) if by == "A"
    ));
}

#[test]
fn deep_subtypes_inherit_the_identifier_of_their_identifying_supertype() {
    let mut schema = Schema::new();
    let (person, _) = reference_mode(&mut schema, "Person", "PersonName");
    let employee = schema.add_entity_type("Employee");
    let manager = schema.add_entity_type("Manager");
    schema
        .add_supertype(employee, person, true, Some(Assimilation::Absorbed))
        .unwrap();
    let ti = schema
        .add_supertype(manager, employee, true, Some(Assimilation::Separate))
        .unwrap();

    let roles = schema.preferred_identifier_roles(manager).unwrap();
    assert_eq!(roles, vec![schema.fact_type(ti).roles[1]]);
    assert!(schema.is_separate(manager));
    assert!(!schema.is_separate(employee));
    assert_eq!(schema.supertypes_transitive(manager), vec![manager, employee, person]);
    assert_eq!(schema.common_supertype(manager, person), Some(person));
}

#[test]
fn entity_without_identifier_is_an_error() {
    let mut schema = Schema::new();
    let thing = schema.add_entity_type("Thing");
    assert_eq!(
        schema.preferred_identifier(thing),
        Err(MetamodelError::NoPreferredIdentifier("Thing".into()))
    );
    let value = schema.add_value_type("Name");
    assert!(matches!(
        schema.preferred_identifier(value),
        Err(MetamodelError::NotAnEntityType(_))
    ));
}

#[test]
fn first_unique_role_keeps_its_identifier() {
    let mut schema = Schema::new();
    let (person, name) = reference_mode(&mut schema, "Person", "PersonName");
    assert_eq!(schema.preferred_identifier_roles(person).unwrap(), vec![name]);

    let nr = schema.add_value_type("PersonNr");
    let ft = schema.add_fact_type(&[nr, person]).unwrap();
    let roles = schema.fact_type(ft).roles.clone();
    schema.add_uniqueness_constraint(&roles[1..], false).unwrap();
    schema.add_uniqueness_constraint(&roles[..1], true).unwrap();
    // Person's first unique role still leads to PersonName.
    assert_eq!(schema.preferred_identifier_roles(person).unwrap(), vec![name]);
}
