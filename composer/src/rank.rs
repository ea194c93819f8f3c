//! Column ordering.
//!
//! Each member of a mapping gets a [`RankKey`]; sorting siblings by key and
//! numbering them from zero gives the column order. Keys are cached on the
//! component until the mapping's membership changes.

use orm_metamodel::{
    ComponentId, ComponentKind, Composition, FactTypeId, Injection, ObjectTypeId, RankCategory,
    RankKey, RoleId, Schema,
};
use tracing::trace;

use crate::absorption::is_supertype_absorption;
use crate::error::ComposeError;

/// The rank key of a member component, computed once and cached.
///
/// # Errors
///
/// Returns [`ComposeError::UnrankableComponent`] for roots and bare
/// mappings, and propagates preferred identifier failures.
pub fn rank_key(schema: &Schema, composition: &Composition, id: ComponentId) -> Result<RankKey, ComposeError> {
    let component = composition.component(id);
    if let Some(key) = component.cached_rank_key() {
        return Ok(key.clone());
    }
    let key = compute(schema, composition, id)?;
    trace!(
        target: "orm::rank",
        component = %composition.inspect(schema, id),
        category = key.category.label(),
        position = key.position,
        "ranked"
    );
    Ok(component.cache_rank_key(key).clone())
}

fn compute(schema: &Schema, composition: &Composition, id: ComponentId) -> Result<RankKey, ComposeError> {
    let component = composition.component(id);
    let unrankable = || ComposeError::UnrankableComponent(composition.inspect(schema, id));
    let parent = component.parent.map(|p| composition.component(p)).ok_or_else(unrankable)?;
    let parent_entity = parent
        .object_type
        .filter(|&t| schema.object_type(t).is_entity_type());
    let named = |fallback: String| component.name.clone().unwrap_or(fallback);
    let key = |category, position, name, secondary| RankKey {
        category,
        position,
        name,
        secondary,
        tiebreak: id,
    };

    Ok(match &component.kind {
        ComponentKind::Mapping => return Err(unrankable()),
        ComponentKind::Injection(Injection::SurrogateKey) if parent.parent.is_none() => {
            key(RankCategory::Surrogate, 0, String::new(), String::new())
        }
        ComponentKind::Injection(Injection::SurrogateKey) => {
            key(RankCategory::Mandatory, 0, named(String::new()), String::new())
        }
        ComponentKind::Injection(Injection::ValueField) => {
            key(RankCategory::Value, 0, String::new(), String::new())
        }
        ComponentKind::Injection(Injection::ValidFrom) => {
            key(RankCategory::Injection, 0, named(String::new()), String::new())
        }
        ComponentKind::Scoping => {
            let fallback = component
                .object_type
                .map(|t| schema.name(t).to_owned())
                .unwrap_or_default();
            key(RankCategory::Scoping, 0, named(fallback), String::new())
        }
        ComponentKind::Discriminator(d) => {
            let fallback = d
                .roles
                .first()
                .map(|dr| schema.role_name(dr.role))
                .unwrap_or_default();
            key(RankCategory::Discriminator, 0, named(fallback), String::new())
        }
        ComponentKind::Indicator(indicator) => {
            match identifying_position(schema, parent_entity, indicator.role)? {
                Some(position) => key(RankCategory::Identifying, position, String::new(), String::new()),
                None => key(
                    RankCategory::Indicator,
                    0,
                    named(schema.role_name(indicator.role)),
                    String::new(),
                ),
            }
        }
        ComponentKind::Absorption(a) => {
            let child_fact_type = schema.role(a.child_role).fact_type;
            if let Some(ti) = schema.type_inheritance(child_fact_type) {
                if is_supertype_absorption(schema, composition, id) {
                    let position = if ti.provides_identification {
                        0
                    } else {
                        parent_entity
                            .map(|e| {
                                schema
                                    .supertype_inheritances(e)
                                    .into_iter()
                                    .filter(|&ft| {
                                        schema
                                            .type_inheritance(ft)
                                            .is_some_and(|t| !t.provides_identification)
                                    })
                                    .position(|ft| ft == child_fact_type)
                                    .map_or(0, |p| p + 1)
                            })
                            .unwrap_or(0)
                    };
                    key(RankCategory::Supertype, position, String::new(), String::new())
                } else {
                    let position = parent_entity
                        .and_then(|e| subtype_position(schema, e, child_fact_type))
                        .unwrap_or(0);
                    key(RankCategory::Subtype, position, String::new(), String::new())
                }
            } else if let Some(position) =
                identifying_position(schema, parent_entity, schema.base_role(a.child_role))?
            {
                key(RankCategory::Identifying, position, String::new(), String::new())
            } else if schema.is_unique(a.parent_role) {
                let category = if schema.is_mandatory(a.parent_role) {
                    RankCategory::Mandatory
                } else {
                    RankCategory::Optional
                };
                key(category, 0, named(schema.role_name(a.child_role)), String::new())
            } else {
                key(
                    RankCategory::Multiple,
                    0,
                    named(schema.role_name(a.child_role)),
                    schema.role_name(a.parent_role),
                )
            }
        }
    })
}

fn identifying_position(
    schema: &Schema,
    entity: Option<ObjectTypeId>,
    role: RoleId,
) -> Result<Option<usize>, ComposeError> {
    match entity {
        Some(entity) => Ok(schema.rank_in_preferred_identifier(entity, role)?),
        None => Ok(None),
    }
}

/// Position among the entity's subtype inheritances, identifying ones
/// first, otherwise in declaration order.
fn subtype_position(
    schema: &Schema,
    entity: ObjectTypeId,
    fact_type: FactTypeId,
) -> Option<usize> {
    let mut tis = schema.entity_type(entity).ok()?.subtype_inheritances.clone();
    tis.sort_by_key(|&ft| {
        !schema
            .type_inheritance(ft)
            .is_some_and(|ti| ti.provides_identification)
    });
    tis.iter().position(|&ft| ft == fact_type)
}

/// Recomputes the rank keys of a mapping's members and numbers them from
/// zero in key order.
///
/// # Errors
///
/// Fails as [`rank_key`] does for any member.
pub fn re_rank(schema: &Schema, composition: &mut Composition, mapping: ComponentId) -> Result<(), ComposeError> {
    composition.uncache_member_ranks(mapping);
    let mut keyed = composition
        .component(mapping)
        .members
        .iter()
        .map(|&m| Ok((rank_key(schema, composition, m)?, m)))
        .collect::<Result<Vec<_>, ComposeError>>()?;
    keyed.sort();
    for (ordinal, (_, member)) in keyed.into_iter().enumerate() {
        composition.component_mut(member).ordinal = Some(ordinal);
    }
    Ok(())
}

/// Re-ranks `mapping` and every mapping below it.
///
/// # Errors
///
/// Fails as [`re_rank`] does.
pub fn re_rank_all(schema: &Schema, composition: &mut Composition, mapping: ComponentId) -> Result<(), ComposeError> {
    re_rank(schema, composition, mapping)?;
    for member in composition.component(mapping).members.clone() {
        if !composition.component(member).members.is_empty() {
            re_rank_all(schema, composition, member)?;
        }
    }
    Ok(())
}

/// The leaf columns under `id` in rank order, re-ranking on the way.
///
/// # Errors
///
/// Fails as [`re_rank`] does.
pub fn leaves(schema: &Schema, composition: &mut Composition, id: ComponentId) -> Result<Vec<ComponentId>, ComposeError> {
    if !composition.component(id).members.is_empty() {
        re_rank_all(schema, composition, id)?;
    }
    Ok(composition.leaves(id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orm_metamodel::{
        fixtures, Absorption, Component, DiscriminatedRole, Discriminator, Indicator, Value,
    };

    use super::*;

    fn named(composition: &Composition, members: Vec<ComponentId>) -> Vec<String> {
        members
            .into_iter()
            .map(|m| composition.component(m).name.clone().unwrap_or_default())
            .collect()
    }

    /// Adds an absorption from `parent` through the roles of `fact_type`,
    /// the first role on the parent's side unless `reversed`.
    fn absorb(
        schema: &Schema,
        composition: &mut Composition,
        parent: ComponentId,
        fact_type: FactTypeId,
        reversed: bool,
        name: &str,
    ) -> ComponentId {
        let roles = &schema.fact_type(fact_type).roles;
        let (parent_role, child_role) = if reversed { (roles[1], roles[0]) } else { (roles[0], roles[1]) };
        composition.add(
            Some(parent),
            Component::new(ComponentKind::Absorption(Absorption::new(parent_role, child_role)))
                .named(name)
                .of(schema.role(child_role).player),
        )
    }

    #[test]
    fn categories_follow_the_fixed_order() {
        let mut schema = Schema::new();
        let person = schema.add_entity_type("Person");
        let name = schema.add_value_type("Name");
        let ft = schema.add_fact_type(&[person, name]).unwrap();
        let [p, n] = [schema.fact_type(ft).roles[0], schema.fact_type(ft).roles[1]];
        schema.add_uniqueness_constraint(&[p], false).unwrap();
        schema.add_uniqueness_constraint(&[n], true).unwrap();
        let smokes = schema.add_fact_type(&[person]).unwrap();
        let smokes_role = schema.fact_type(smokes).roles[0];
        schema.add_reading(smokes, [smokes_role], "{0} smokes").unwrap();

        let mut composition = Composition::new("test");
        let root = composition.add(None, Component::new(ComponentKind::Mapping).named("Person").of(person));
        let indicator = composition.add(
            Some(root),
            Component::new(ComponentKind::Indicator(Indicator {
                role: smokes_role,
                true_value: None,
                false_value: None,
            }))
            .named("Smokes"),
        );
        let surrogate = composition.add(
            Some(root),
            Component::new(ComponentKind::Injection(Injection::SurrogateKey)).named("Person ID"),
        );
        let name_column = composition.add(
            Some(root),
            Component::new(ComponentKind::Absorption(Absorption::new(p, n))).named("Name").of(name),
        );

        re_rank(&schema, &mut composition, root).unwrap();
        assert_eq!(composition.members_in_order(root), vec![surrogate, name_column, indicator]);
        assert_eq!(composition.component(name_column).rank_kind(), "existential");
        assert_eq!(
            leaves(&schema, &mut composition, root).unwrap(),
            vec![surrogate, name_column, indicator]
        );

        let bare = composition.add(Some(root), Component::new(ComponentKind::Mapping));
        assert!(matches!(
            re_rank(&schema, &mut composition, root),
            Err(ComposeError::UnrankableComponent(_))
        ));
        assert!(matches!(
            rank_key(&schema, &composition, root),
            Err(ComposeError::UnrankableComponent(_))
        ));
        composition.reparent(bare, None);
        re_rank(&schema, &mut composition, root).unwrap();
        assert_eq!(composition.component(indicator).ordinal, Some(2));
    }

    #[test]
    fn every_category_has_its_place() {
        let mut schema = Schema::new();
        let thing = schema.add_entity_type("Thing");
        let thing_name = schema.add_value_type("ThingName");
        let (_, name_role) = fixtures::identified_by(&mut schema, thing, thing_name).unwrap();
        let code = schema.add_value_type("Code");
        let size = schema.add_value_type("Size");
        let tag = schema.add_value_type("Tag");
        let (_, code_role) = fixtures::binary(&mut schema, thing, code, "{0} has {1}", true, true).unwrap();
        let (_, size_role) = fixtures::binary(&mut schema, thing, size, "{0} has {1}", true, false).unwrap();
        let (_, tag_role) = fixtures::binary(&mut schema, thing, tag, "{0} is tagged {1}", false, false).unwrap();
        let active = fixtures::unary(&mut schema, thing, "{0} is active").unwrap();
        let retired = fixtures::unary(&mut schema, thing, "{0} is retired").unwrap();
        let base = schema.add_entity_type("Base");
        let special = schema.add_entity_type("Special");
        let to_base = schema.add_supertype(thing, base, false, None).unwrap();
        let to_special = schema.add_supertype(special, thing, false, None).unwrap();

        let mut composition = Composition::new("test");
        let root = composition.add(None, Component::new(ComponentKind::Mapping).named("Thing").of(thing));
        let add = |composition: &mut Composition, kind, name: &str| {
            composition.add(Some(root), Component::new(kind).named(name))
        };
        let scoping = add(&mut composition, ComponentKind::Scoping, "Scope");
        let subtype = absorb(&schema, &mut composition, root, to_special, true, "Special");
        let tagged = absorb(&schema, &mut composition, root, schema.role(tag_role).fact_type, false, "Tag");
        let sized = absorb(&schema, &mut composition, root, schema.role(size_role).fact_type, false, "Size");
        let coded = absorb(&schema, &mut composition, root, schema.role(code_role).fact_type, false, "Code");
        let indicator = add(
            &mut composition,
            ComponentKind::Indicator(Indicator {
                role: active,
                true_value: None,
                false_value: None,
            }),
            "Active",
        );
        let discriminator = add(
            &mut composition,
            ComponentKind::Discriminator(Discriminator {
                roles: vec![DiscriminatedRole {
                    role: retired,
                    value: Value::string("R"),
                }],
            }),
            "Status",
        );
        let valid_from = add(&mut composition, ComponentKind::Injection(Injection::ValidFrom), "Valid From");
        let value = add(&mut composition, ComponentKind::Injection(Injection::ValueField), "Value");
        let identifying = absorb(&schema, &mut composition, root, schema.role(name_role).fact_type, false, "Name");
        let supertype = absorb(&schema, &mut composition, root, to_base, false, "Base");
        let surrogate = add(&mut composition, ComponentKind::Injection(Injection::SurrogateKey), "Thing ID");

        re_rank(&schema, &mut composition, root).unwrap();
        let expected = vec![
            surrogate, supertype, identifying, value, valid_from, discriminator, indicator, coded, sized, tagged,
            subtype, scoping,
        ];
        assert_eq!(composition.members_in_order(root), expected);
        let kinds: Vec<_> = expected.iter().map(|&m| composition.component(m).rank_kind()).collect();
        assert_eq!(
            kinds,
            [
                "surrogate",
                "supertype",
                "existential",
                "self-value",
                "injection",
                "discriminator",
                "indicator",
                "mandatory",
                "optional",
                "multiple",
                "subtype",
                "scoping",
            ]
        );
        let multiple = rank_key(&schema, &composition, tagged).unwrap();
        assert_eq!(multiple.secondary, schema.role_name(schema.fact_type(schema.role(tag_role).fact_type).roles[0]));
    }

    #[test]
    fn inheritances_rank_identifying_first() {
        let mut schema = Schema::new();
        let thing = schema.add_entity_type("Thing");
        let supertypes: Vec<_> = [("Zeta", false), ("Alpha", false), ("Ident", true)]
            .into_iter()
            .map(|(name, identifying)| {
                let supertype = schema.add_entity_type(name);
                (name, schema.add_supertype(thing, supertype, identifying, None).unwrap())
            })
            .collect();
        let subtypes: Vec<_> = [("B", false), ("A", true)]
            .into_iter()
            .map(|(name, identifying)| {
                let subtype = schema.add_entity_type(name);
                (name, schema.add_supertype(subtype, thing, identifying, None).unwrap())
            })
            .collect();

        let mut composition = Composition::new("test");
        let root = composition.add(None, Component::new(ComponentKind::Mapping).named("Thing").of(thing));
        for (name, ti) in &supertypes {
            absorb(&schema, &mut composition, root, *ti, false, name);
        }
        for (name, ti) in &subtypes {
            absorb(&schema, &mut composition, root, *ti, true, name);
        }

        re_rank(&schema, &mut composition, root).unwrap();
        let members = composition.members_in_order(root);
        assert_eq!(named(&composition, members.clone()), ["Ident", "Alpha", "Zeta", "A", "B"]);
        let positions: Vec<_> = members
            .iter()
            .map(|&m| rank_key(&schema, &composition, m).unwrap().position)
            .collect();
        assert_eq!(positions, [0, 1, 2, 0, 1]);
    }
}
