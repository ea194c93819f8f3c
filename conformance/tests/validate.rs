//! Validation of hand-built and composed compositions.

#![allow(clippy::unwrap_used)]

use orm_composer::{Compositor, CompositorOptions};
use orm_conformance::{validate, validate_with, Severity, Subject, ValidationReport};
use orm_metamodel::{
    fixtures, Absorption, Component, ComponentId, ComponentKind, CompositeId, Composition,
    DiscriminatedRole, Discriminator, Indicator, Nesting, RoleId, Schema, Value,
};

fn roles_of(schema: &Schema, reading: &str) -> (RoleId, RoleId) {
    let (_, ft) = schema
        .fact_types()
        .find(|(id, _)| schema.default_reading(*id).as_deref() == Some(reading))
        .unwrap();
    (ft.roles[0], ft.roles[1])
}

fn absorb(
    schema: &Schema,
    composition: &mut Composition,
    parent: ComponentId,
    (parent_role, child_role): (RoleId, RoleId),
    name: &str,
) -> ComponentId {
    composition.add(
        Some(parent),
        Component::new(ComponentKind::Absorption(Absorption::new(parent_role, child_role)))
            .named(name)
            .of(schema.role(child_role).player),
    )
}

/// `Company(CompanyName)` with its primary index.
fn company_table(schema: &Schema, composition: &mut Composition) -> (CompositeId, ComponentId) {
    let company = schema.object_type_by_name("Company").unwrap();
    let root = composition.add(None, Component::new(ComponentKind::Mapping).named("Company").of(company));
    let composite = composition.add_composite(root);
    let name = absorb(
        schema,
        composition,
        root,
        roles_of(schema, "Company has CompanyName"),
        "Company Name",
    );
    let index = composition.add_index(composite, None, true, None, vec![name.into()]);
    composition.composite_mut(composite).primary_index = Some(index);
    (composite, name)
}

/// `Person(CompanyName)`, referencing `Company`, without the foreign key.
fn person_table(schema: &Schema, composition: &mut Composition) -> (CompositeId, ComponentId, ComponentId) {
    let person = schema.object_type_by_name("Person").unwrap();
    let root = composition.add(None, Component::new(ComponentKind::Mapping).named("Person").of(person));
    let composite = composition.add_composite(root);
    let works_for = absorb(
        schema,
        composition,
        root,
        roles_of(schema, "Person works for Company"),
        "Company",
    );
    let name = absorb(
        schema,
        composition,
        works_for,
        roles_of(schema, "Company has CompanyName"),
        "Company Name",
    );
    (composite, works_for, name)
}

fn messages(report: &ValidationReport, subject: impl Into<Subject>) -> Vec<&str> {
    report.about(subject).map(|p| p.message.as_str()).collect()
}

#[test]
fn hand_built_composite_is_clean() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    company_table(&schema, &mut composition);

    let report = validate(&schema, &composition);
    assert!(report.is_clean(), "{:?}", report.problems);
}

#[test]
fn foreign_key_field_count_mismatch_is_one_problem() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, company_name) = company_table(&schema, &mut composition);
    let (person, works_for, _) = person_table(&schema, &mut composition);
    let fk = composition.add_foreign_key(company, person, Some(works_for), vec![company_name.into()], Vec::new());

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1, "{:?}", report.problems);
    assert_eq!(report.problems[0].subject, Subject::AccessPath(fk));
    assert_eq!(report.problems[0].message, "has 1 index fields but 0 ForeignKeyField");
    assert_eq!(report.failure_count(), 1);
}

#[test]
fn mismatched_field_kinds_are_reported_once() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, company_name) = company_table(&schema, &mut composition);
    let (person, works_for, _) = person_table(&schema, &mut composition);
    let person_root = composition.composite(person).mapping;
    let (_, smokes) = schema
        .fact_types()
        .find(|(id, _)| schema.default_reading(*id).as_deref() == Some("Person smokes"))
        .map(|(id, ft)| (id, ft.roles[0]))
        .unwrap();
    let indicator = composition.add(
        Some(person_root),
        Component::new(ComponentKind::Indicator(Indicator {
            role: smokes,
            true_value: None,
            false_value: None,
        }))
        .named("Smokes"),
    );
    composition.add_foreign_key(
        company,
        person,
        Some(works_for),
        vec![company_name.into()],
        vec![indicator.into()],
    );

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1, "{:?}", report.problems);
    assert!(report.problems[0].message.starts_with("Column Smokes(Indicator) does not match"));
}

#[test]
fn structural_problems_are_all_collected() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, company_name) = company_table(&schema, &mut composition);
    let root = composition.composite(company).mapping;

    let duplicate = absorb(
        &schema,
        &mut composition,
        root,
        roles_of(&schema, "Company has CompanyName"),
        "Company Name",
    );
    let bare = composition.add(Some(root), Component::new(ComponentKind::Mapping).named("Bare"));
    let (works_for, employer) = roles_of(&schema, "Person works for Company");
    let misplaced = absorb(&schema, &mut composition, root, (works_for, employer), "Employer");
    let scoping = composition.add(Some(root), Component::new(ComponentKind::Scoping).named("Scope"));

    let mut collected = Vec::new();
    validate_with(&schema, &composition, |problem| collected.push(problem));

    let about = |subject: Subject| collected.iter().filter(move |p| p.subject == subject);
    assert_eq!(about(Subject::Component(root)).count(), 1);
    assert!(about(Subject::Component(root))
        .any(|p| p.message == r#"Contains duplicated names "Company Name""#));
    assert!(about(Subject::Component(bare))
        .any(|p| p.message == "A child Component should not be a bare Mapping"));
    assert!(about(Subject::Component(misplaced))
        .any(|p| p.message.starts_with("Parent mapping object type Company should play the parent role")));
    assert!(about(Subject::Component(scoping)).all(|p| p.severity == Severity::Warning));
    assert_eq!(about(Subject::Component(duplicate)).count(), 0);
    assert_eq!(about(Subject::Component(company_name)).count(), 0);

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), collected.len());
    assert_eq!(report.about(bare).count(), 1);
    let grouped = report.by_subject();
    assert_eq!(grouped[&Subject::Component(scoping)], ["Unexpected and unchecked Scoping"]);
    assert!(report.failure_count() < report.len());
}

#[test]
fn composed_fixtures_are_clean() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut all = ValidationReport::new();
    for fixture in [fixtures::company, fixtures::employees, fixtures::enrolment] {
        for surrogate_keys in [false, true] {
            let mut schema = fixture().unwrap();
            let composition = Compositor::compose(&mut schema, CompositorOptions { surrogate_keys }).unwrap();
            let report = validate(&schema, &composition);
            assert!(report.is_clean(), "{}", report.to_json(&schema, &composition));
            all.extend(report);
        }
    }
    assert!(all.is_empty());
}

#[test]
fn root_mapping_needs_an_object_type_and_a_name() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let root = composition.add(None, Component::new(ComponentKind::Mapping));
    composition.add_composite(root);

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 2);
    assert_eq!(messages(&report, root), ["Has no ObjectType", "Has no Name"]);
}

#[test]
fn root_mapping_has_no_ordinal() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, _) = company_table(&schema, &mut composition);
    let root = composition.composite(company).mapping;
    composition.component_mut(root).ordinal = Some(0);

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1);
    assert_eq!(messages(&report, root), ["Should not have an Ordinal rank"]);
}

#[test]
fn root_mapping_has_no_parent() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, _) = company_table(&schema, &mut composition);
    let root = composition.composite(company).mapping;
    let company_type = schema.object_type_by_name("Company").unwrap();
    let nested = composition.add(Some(root), Component::new(ComponentKind::Mapping).named("Company").of(company_type));
    composition.add_composite(nested);

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 2);
    assert_eq!(
        messages(&report, nested),
        ["A child Component should not be a bare Mapping", "Should not have a parent mapping"]
    );
}

#[test]
fn root_mapping_is_the_root_of_its_own_composite() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, _) = company_table(&schema, &mut composition);
    let root = composition.composite(company).mapping;
    let usurper = composition.add_composite(root);
    assert_eq!(composition.component(root).composite, Some(usurper));

    let report = validate(&schema, &composition);
    assert_eq!(messages(&report, root), ["Should be the root of its mapping"]);
}

#[test]
fn absorbed_roles_belong_to_one_fact_type() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, _) = company_table(&schema, &mut composition);
    let root = composition.composite(company).mapping;
    let (company_role, _) = roles_of(&schema, "Company has CompanyName");
    let (_, person_name) = roles_of(&schema, "Person has PersonName");
    let stray = absorb(&schema, &mut composition, root, (company_role, person_name), "Person Name");

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1);
    let expected = format!(
        "Roles should belong to the same fact type, but instead we have {} in {} and {} in {}",
        schema.role_name(company_role),
        schema.describe_fact_type(schema.role(company_role).fact_type),
        schema.role_name(person_name),
        schema.describe_fact_type(schema.role(person_name).fact_type)
    );
    assert_eq!(messages(&report, stray), [expected.as_str()]);
}

#[test]
fn mirrored_absorptions_swap_their_roles() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (_, company_name) = company_table(&schema, &mut composition);
    let (_, works_for, _) = person_table(&schema, &mut composition);
    composition.absorption_mut(works_for).unwrap().reverse_absorption = Some(company_name);

    let report = validate(&schema, &composition);
    let (person_role, company_role) = roles_of(&schema, "Person works for Company");
    let (has_role, name_role) = roles_of(&schema, "Company has CompanyName");
    assert_eq!(report.len(), 2, "{:?}", report.problems);
    assert_eq!(
        messages(&report, works_for),
        [
            format!(
                "Opposite absorption's child role {} should match parent role {}",
                schema.role_name(name_role),
                schema.role_name(person_role)
            ),
            format!(
                "Opposite absorption's parent role {} should match child role {}",
                schema.role_name(has_role),
                schema.role_name(company_role)
            ),
        ]
    );
}

#[test]
fn nestings_need_a_nesting_mode() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (_, company_name) = company_table(&schema, &mut composition);
    let (_, name_role) = roles_of(&schema, "Company has CompanyName");
    composition.absorption_mut(company_name).unwrap().nestings.push(Nesting {
        index_role: name_role,
        key_name: None,
    });

    let report = validate(&schema, &composition);
    assert_eq!(
        messages(&report, company_name),
        ["Unexpected and unchecked Nesting", "Nesting Mode must be specified"]
    );
    assert_eq!(report.failure_count(), 1);

    composition.absorption_mut(company_name).unwrap().nesting_mode = Some("keyed".to_owned());
    let report = validate(&schema, &composition);
    assert_eq!(messages(&report, company_name), ["Unexpected and unchecked Nesting"]);
    assert_eq!(report.failure_count(), 0);
}

#[test]
fn discriminators_need_roles_played_by_their_parent() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, _) = company_table(&schema, &mut composition);
    let root = composition.composite(company).mapping;
    let empty = composition.add(
        Some(root),
        Component::new(ComponentKind::Discriminator(Discriminator { roles: Vec::new() })).named("Kind"),
    );
    let (_, smokes) = schema
        .fact_types()
        .find(|(id, _)| schema.default_reading(*id).as_deref() == Some("Person smokes"))
        .map(|(id, ft)| (id, ft.roles[0]))
        .unwrap();
    let foreign = composition.add(
        Some(root),
        Component::new(ComponentKind::Discriminator(Discriminator {
            roles: vec![DiscriminatedRole {
                role: smokes,
                value: Value::string("S"),
            }],
        }))
        .named("Status"),
    );

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 2);
    assert_eq!(messages(&report, empty), ["Discriminator requires at least one Discriminated Role"]);
    assert_eq!(
        messages(&report, foreign),
        [format!(
            "Discriminated Role {} is not played by parent object type Company",
            schema.role_name(smokes)
        )]
    );
}

#[test]
fn index_fields_lie_within_their_composite() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (_, company_name) = company_table(&schema, &mut composition);
    let (person, _, _) = person_table(&schema, &mut composition);
    let index = composition.add_index(person, None, true, None, vec![company_name.into()]);

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1);
    assert_eq!(
        messages(&report, index),
        [format!(
            "{} must be within its composite",
            composition.inspect_index_field(&schema, index, 0)
        )]
    );
}

#[test]
fn access_paths_have_fields() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, _) = company_table(&schema, &mut composition);
    let index = composition.add_index(company, None, false, None, Vec::new());

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1);
    assert_eq!(messages(&report, index), ["Must contain at least one IndexField"]);
}

#[test]
fn foreign_key_fields_lie_within_the_source_composite() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, company_name) = company_table(&schema, &mut composition);
    let (person, works_for, _) = person_table(&schema, &mut composition);
    let fk = composition.add_foreign_key(
        company,
        person,
        Some(works_for),
        vec![company_name.into()],
        vec![company_name.into()],
    );

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1, "{:?}", report.problems);
    assert_eq!(
        messages(&report, fk),
        [format!(
            "{} must be within the source composite",
            composition.inspect_foreign_key_field(&schema, fk, 0)
        )]
    );
}

#[test]
fn foreign_key_fields_match_the_target_type() {
    let schema = fixtures::company().unwrap();
    let mut composition = Composition::new("test");
    let (company, company_name) = company_table(&schema, &mut composition);
    let (person, works_for, _) = person_table(&schema, &mut composition);
    let fk = composition.add_foreign_key(
        company,
        person,
        Some(works_for),
        vec![company_name.into()],
        vec![works_for.into()],
    );

    let report = validate(&schema, &composition);
    assert_eq!(report.len(), 1, "{:?}", report.problems);
    assert_eq!(
        messages(&report, fk),
        [format!(
            "{} must have matching target type",
            composition.inspect_index_field(&schema, fk, 0)
        )]
    );
}
