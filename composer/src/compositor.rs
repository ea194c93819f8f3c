//! Builds a relational composition from a conceptual schema.
//!
//! Composition runs in two passes. The first builds a *binary mapping* per
//! object type: a mapping holding one absorption per binary fact type the
//! type plays in (mirrored in the other player's mapping, oriented by
//! [`is_preferred_direction`]) and one indicator per unary. The second
//! chooses the object types that become composites and populates each
//! composite's tree from the forward absorptions of the binary mappings,
//! descending through full absorptions of subtypes and through preferred
//! identifiers of referenced entities.

use std::collections::{BTreeMap, BTreeSet};

use orm_metamodel::{
    Absorption, Component, ComponentId, ComponentKind, CompositeId, Composition, ConstraintId,
    IndexField, Indicator, Injection, ObjectTypeId, ObjectTypeKind, RoleId, Schema,
};
use tracing::debug;

use crate::absorption::{add_mirrored_pair, flip, is_forward, is_preferred_direction};
use crate::error::ComposeError;
use crate::rank::re_rank_all;

/// Options steering composition.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositorOptions {
    /// Inject a surrogate primary key into every entity composite.
    pub surrogate_keys: bool,
}

/// Maps a schema onto composites.
#[derive(Debug)]
pub struct Compositor<'s> {
    schema: &'s Schema,
    options: CompositorOptions,
    binary: Composition,
    binary_mappings: BTreeMap<ObjectTypeId, ComponentId>,
    composition: Composition,
    composites: BTreeMap<ObjectTypeId, CompositeId>,
    references: Vec<(ComponentId, ObjectTypeId)>,
}

impl<'s> Compositor<'s> {
    /// Composes `schema`, first creating the link fact types of every
    /// objectified fact type.
    ///
    /// # Errors
    ///
    /// Fails if an entity type reached during composition has no preferred
    /// identifier, if identification is circular, or if ranking fails.
    pub fn compose(schema: &mut Schema, options: CompositorOptions) -> Result<Composition, ComposeError> {
        let objectifying: Vec<ObjectTypeId> = schema
            .object_types()
            .filter(|(_, ot)| ot.as_entity().is_some_and(|e| e.objectified_fact_type.is_some()))
            .map(|(id, _)| id)
            .collect();
        for entity in objectifying {
            schema.create_link_fact_types(entity)?;
        }

        let mut compositor = Compositor::new(schema, options);
        compositor.build_binary_mappings()?;
        compositor.populate_composites()?;
        compositor.add_foreign_keys();
        compositor.rank()?;
        debug!(
            target: "orm::compose",
            composites = compositor.composition.composites().count(),
            components = compositor.composition.components().count(),
            "composed"
        );
        Ok(compositor.composition)
    }

    fn new(schema: &'s Schema, options: CompositorOptions) -> Self {
        Self {
            schema,
            options,
            binary: Composition::new("binary"),
            binary_mappings: BTreeMap::new(),
            composition: Composition::new("relational"),
            composites: BTreeMap::new(),
            references: Vec::new(),
        }
    }

    fn build_binary_mappings(&mut self) -> Result<(), ComposeError> {
        let schema = self.schema;
        for (id, ot) in schema.object_types() {
            let mapping = self
                .binary
                .add(None, Component::new(ComponentKind::Mapping).named(ot.name.clone()).of(id));
            self.binary_mappings.insert(id, mapping);
        }

        for (fact_type_id, fact_type) in schema.fact_types() {
            match fact_type.roles.as_slice() {
                [role] => {
                    let player = schema.role(*role).player;
                    let mapping = self.binary_mapping(player)?;
                    self.binary.add(
                        Some(mapping),
                        Component::new(ComponentKind::Indicator(Indicator {
                            role: *role,
                            true_value: None,
                            false_value: None,
                        }))
                        .named(schema.role_name(*role)),
                    );
                }
                [first, second] if fact_type.entity_type.is_none() => {
                    let (first, second) = (*first, *second);
                    let first_mapping = self.binary_mapping(schema.role(first).player)?;
                    let second_mapping = self.binary_mapping(schema.role(second).player)?;
                    let (forward, _) = add_mirrored_pair(
                        schema,
                        &mut self.binary,
                        first_mapping,
                        second_mapping,
                        first,
                        second,
                    );
                    if !is_preferred_direction(schema, first, second)? {
                        flip(&mut self.binary, forward)?;
                    }
                }
                [_, _] => {}
                _ if fact_type.entity_type.is_none() => {
                    debug!(
                        target: "orm::compose",
                        fact_type = %schema.describe_fact_type(fact_type_id),
                        "skipping unobjectified n-ary fact type"
                    );
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn binary_mapping(&self, object_type: ObjectTypeId) -> Result<ComponentId, ComposeError> {
        self.binary_mappings
            .get(&object_type)
            .copied()
            .ok_or_else(|| ComposeError::UnsupportedComponent(self.schema.name(object_type).to_owned()))
    }

    /// Entity types get a composite unless fully absorbed into their
    /// identifying supertype; value types only when independent.
    fn is_composite(&self, object_type: ObjectTypeId) -> bool {
        let schema = self.schema;
        match &schema.object_type(object_type).kind {
            ObjectTypeKind::Entity(_) => {
                schema.identifying_type_inheritance(object_type).is_none() || schema.is_separate(object_type)
            }
            ObjectTypeKind::Value(_) => schema.object_type(object_type).is_independent,
        }
    }

    /// The composite holding `object_type`'s instances: its own, or that of
    /// the supertype it is absorbed into.
    fn composite_of(&self, object_type: ObjectTypeId) -> Option<CompositeId> {
        let mut current = object_type;
        for _ in 0..=self.composites.len() {
            if let Some(&c) = self.composites.get(&current) {
                return Some(c);
            }
            current = self.schema.identifying_supertype(current)?;
        }
        None
    }

    fn populate_composites(&mut self) -> Result<(), ComposeError> {
        let schema = self.schema;
        let chosen: Vec<ObjectTypeId> = schema
            .object_types()
            .map(|(id, _)| id)
            .filter(|&id| self.is_composite(id))
            .collect();
        for &object_type in &chosen {
            let root = self.composition.add(
                None,
                Component::new(ComponentKind::Mapping)
                    .named(schema.name(object_type))
                    .of(object_type),
            );
            let composite = self.composition.add_composite(root);
            self.composites.insert(object_type, composite);
        }

        for object_type in chosen {
            let Some(&composite) = self.composites.get(&object_type) else {
                continue;
            };
            let root = self.composition.composite(composite).mapping;
            debug!(target: "orm::compose", composite = %schema.name(object_type), "populating");
            let surrogate = (self.options.surrogate_keys && schema.object_type(object_type).is_entity_type())
                .then(|| {
                    self.composition.add(
                        Some(root),
                        Component::new(ComponentKind::Injection(Injection::SurrogateKey))
                            .named(format!("{} ID", schema.name(object_type))),
                    )
                });
            self.populate(root, object_type, &mut vec![object_type])?;
            self.add_indices(composite, object_type, surrogate)?;
        }
        Ok(())
    }

    fn populate(
        &mut self,
        parent: ComponentId,
        object_type: ObjectTypeId,
        stack: &mut Vec<ObjectTypeId>,
    ) -> Result<(), ComposeError> {
        let schema = self.schema;
        if schema.object_type(object_type).is_value_type() {
            self.composition.add(
                Some(parent),
                Component::new(ComponentKind::Injection(Injection::ValueField))
                    .named(schema.name(object_type))
                    .of(object_type),
            );
            return Ok(());
        }
        let mapping = self.binary_mapping(object_type)?;
        for member in self.binary.component(mapping).members.clone() {
            let component = self.binary.component(member);
            match &component.kind {
                ComponentKind::Indicator(indicator) => {
                    let copy = Component::new(ComponentKind::Indicator(indicator.clone()));
                    let copy = match &component.name {
                        Some(name) => copy.named(name.clone()),
                        None => copy,
                    };
                    self.composition.add(Some(parent), copy);
                }
                ComponentKind::Absorption(a) if is_forward(&self.binary, member) => {
                    let (parent_role, child_role) = (a.parent_role, a.child_role);
                    self.absorb(parent, parent_role, child_role, stack)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn absorb(
        &mut self,
        parent: ComponentId,
        parent_role: RoleId,
        child_role: RoleId,
        stack: &mut Vec<ObjectTypeId>,
    ) -> Result<(), ComposeError> {
        let schema = self.schema;
        let child_type = schema.role(child_role).player;
        let absorption = self.composition.add(
            Some(parent),
            Component::new(ComponentKind::Absorption(Absorption::new(parent_role, child_role)))
                .named(schema.role_name(child_role))
                .of(child_type),
        );
        if schema.object_type(child_type).is_value_type() {
            return Ok(());
        }

        let absorbs_subtype = schema
            .type_inheritance(schema.role(child_role).fact_type)
            .is_some_and(|ti| ti.subtype == child_type);
        if absorbs_subtype && !self.is_composite(child_type) {
            if stack.contains(&child_type) {
                return Err(ComposeError::IdentificationCycle(schema.name(child_type).to_owned()));
            }
            self.composition.add_full_absorption(child_type, absorption);
            stack.push(child_type);
            let populated = self.populate(absorption, child_type, stack);
            stack.pop();
            return populated;
        }

        self.identify(absorption, child_type, &mut Vec::new())?;
        self.references.push((absorption, child_type));
        Ok(())
    }

    /// Populates `parent` with the preferred identifier of `entity`.
    fn identify(
        &mut self,
        parent: ComponentId,
        entity: ObjectTypeId,
        stack: &mut Vec<ObjectTypeId>,
    ) -> Result<(), ComposeError> {
        let schema = self.schema;
        if stack.contains(&entity) {
            return Err(ComposeError::IdentificationCycle(schema.name(entity).to_owned()));
        }
        stack.push(entity);
        for pi_role in schema.preferred_identifier_roles(entity)? {
            if schema.is_unary(schema.role(pi_role).fact_type) {
                self.composition.add(
                    Some(parent),
                    Component::new(ComponentKind::Indicator(Indicator {
                        role: pi_role,
                        true_value: None,
                        false_value: None,
                    }))
                    .named(schema.role_name(pi_role)),
                );
                continue;
            }
            let (parent_role, child_role) = self.identifying_pair(entity, pi_role)?;
            let child_type = schema.role(child_role).player;
            let component = self.composition.add(
                Some(parent),
                Component::new(ComponentKind::Absorption(Absorption::new(parent_role, child_role)))
                    .named(schema.role_name(child_role))
                    .of(child_type),
            );
            if schema.object_type(child_type).is_entity_type() {
                self.identify(component, child_type, stack)?;
            }
        }
        stack.pop();
        Ok(())
    }

    /// The role `entity` plays opposite an identifying role, and the role
    /// to absorb through. Roles of an objectified fact type are reached
    /// through their mirrors.
    fn identifying_pair(&self, entity: ObjectTypeId, pi_role: RoleId) -> Result<(RoleId, RoleId), ComposeError> {
        let schema = self.schema;
        let child_role = schema.role(pi_role).mirror_role.unwrap_or(pi_role);
        schema
            .counterpart(child_role)
            .filter(|&r| r != child_role)
            .map(|parent_role| (parent_role, child_role))
            .ok_or_else(|| {
                ComposeError::UnsupportedComponent(format!(
                    "identifying role {} of {}",
                    schema.role_name(pi_role),
                    schema.name(entity)
                ))
            })
    }

    /// The member of `root` that maps an identifying role.
    fn identifying_member(&self, root: ComponentId, pi_role: RoleId) -> Option<ComponentId> {
        let schema = self.schema;
        self.composition
            .component(root)
            .members
            .iter()
            .copied()
            .find(|&m| match &self.composition.component(m).kind {
                ComponentKind::Absorption(a) => schema.base_role(a.child_role) == pi_role,
                ComponentKind::Indicator(i) => i.role == pi_role,
                _ => false,
            })
    }

    /// The members of `root` whose leaves make up `entity`'s natural key. An
    /// objectified unary is identified through its link to the unary's player.
    fn identifying_members(&self, root: ComponentId, entity: ObjectTypeId) -> Result<Vec<ComponentId>, ComposeError> {
        let schema = self.schema;
        let unary_role = schema
            .entity_type(entity)?
            .objectified_fact_type
            .filter(|&ft| schema.is_unary(ft))
            .and_then(|ft| schema.fact_type(ft).roles.first().copied());
        if let Some(role) = unary_role {
            return Ok(self.identifying_member(root, role).into_iter().collect());
        }
        Ok(schema
            .preferred_identifier_roles(entity)?
            .into_iter()
            .filter_map(|pi_role| self.identifying_member(root, pi_role))
            .collect())
    }

    /// Leaves below `id` in creation order.
    fn leaves_in_creation_order(&self, id: ComponentId) -> Vec<IndexField> {
        let members = &self.composition.component(id).members;
        if members.is_empty() {
            return vec![id.into()];
        }
        members
            .iter()
            .flat_map(|&m| self.leaves_in_creation_order(m))
            .collect()
    }

    fn add_indices(
        &mut self,
        composite: CompositeId,
        object_type: ObjectTypeId,
        surrogate: Option<ComponentId>,
    ) -> Result<(), ComposeError> {
        let schema = self.schema;
        let root = self.composition.composite(composite).mapping;
        let natural_constraint = match &schema.object_type(object_type).kind {
            ObjectTypeKind::Entity(_) => {
                let pi = schema.preferred_identifier(object_type)?;
                let fields: Vec<IndexField> = self
                    .identifying_members(root, object_type)?
                    .into_iter()
                    .flat_map(|member| self.leaves_in_creation_order(member))
                    .collect();
                if fields.is_empty() {
                    return Err(ComposeError::EmptyIndex(schema.name(object_type).to_owned()));
                }
                let natural = self.composition.add_index(composite, None, true, Some(pi), fields);
                self.composition.composite_mut(composite).natural_index = Some(natural);
                Some(pi)
            }
            ObjectTypeKind::Value(_) => {
                let fields = self.leaves_in_creation_order(root);
                let natural = self.composition.add_index(composite, None, true, None, fields);
                self.composition.composite_mut(composite).natural_index = Some(natural);
                None
            }
        };

        let primary = match surrogate {
            Some(key) => self.composition.add_index(composite, None, true, None, vec![key.into()]),
            None => self
                .composition
                .composite(composite)
                .natural_index
                .ok_or_else(|| ComposeError::UnsupportedComponent(schema.name(object_type).to_owned()))?,
        };
        self.composition.composite_mut(composite).primary_index = Some(primary);

        let references: BTreeSet<ComponentId> = self.references.iter().map(|&(c, _)| c).collect();
        for (leaf, constraint) in self.secondary_keys(root, &references) {
            if Some(constraint) != natural_constraint {
                self.composition
                    .add_index(composite, None, true, Some(constraint), vec![leaf.into()]);
            }
        }
        Ok(())
    }

    /// Value leaves outside references whose role is unique, with the
    /// uniqueness constraint.
    fn secondary_keys(&self, id: ComponentId, references: &BTreeSet<ComponentId>) -> Vec<(ComponentId, ConstraintId)> {
        let mut found = Vec::new();
        for &member in &self.composition.component(id).members {
            if references.contains(&member) {
                continue;
            }
            let component = self.composition.component(member);
            if let ComponentKind::Absorption(a) = &component.kind {
                if component.members.is_empty() {
                    if let Some(pc) = self.schema.uniqueness_constraint(a.child_role) {
                        found.push((member, pc));
                    }
                    continue;
                }
            }
            found.extend(self.secondary_keys(member, references));
        }
        found
    }

    fn add_foreign_keys(&mut self) {
        for (absorption, target_type) in std::mem::take(&mut self.references) {
            let Some(source) = self.composition.root(absorption) else {
                continue;
            };
            let Some(target) = self.composite_of(target_type) else {
                debug!(
                    target: "orm::compose",
                    object_type = %self.schema.name(target_type),
                    "no composite to reference"
                );
                continue;
            };
            let Some(index) = self.composition.composite(target).natural_index else {
                continue;
            };
            let index_fields = self.composition.access_path(index).index_fields.clone();
            let foreign_key_fields = self.leaves_in_creation_order(absorption);
            self.composition
                .add_foreign_key(target, source, Some(absorption), index_fields, foreign_key_fields);
        }
    }

    fn rank(&mut self) -> Result<(), ComposeError> {
        let roots: Vec<ComponentId> = self
            .composition
            .composites()
            .map(|(_, c)| c.mapping)
            .collect();
        for root in roots {
            re_rank_all(self.schema, &mut self.composition, root)?;
            if let Some(composite) = self.composition.component(root).composite {
                self.composition.show_trace(self.schema, composite);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use orm_metamodel::{fixtures, AccessPathKind};

    use super::*;
    use crate::absorption::{is_subtype_absorption, is_supertype_absorption};

    fn composite_named(composition: &Composition, name: &str) -> CompositeId {
        composition
            .composites()
            .find(|(id, _)| composition.composite_name(*id) == name)
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn surrogate_keys_become_the_primary_index() {
        let mut schema = fixtures::company().unwrap();
        let composition =
            Compositor::compose(&mut schema, CompositorOptions { surrogate_keys: true }).unwrap();
        let person = composite_named(&composition, "Person");
        let root = composition.composite(person).mapping;

        let first = composition.members_in_order(root)[0];
        assert_eq!(composition.column_name(first), "PersonID");
        let primary = composition.composite(person).primary_index.unwrap();
        let natural = composition.composite(person).natural_index.unwrap();
        assert_ne!(primary, natural);
        assert_eq!(composition.access_path(primary).index_fields[0].component, first);

        // References still target the natural key.
        let fk = composition.composite(person).foreign_keys_as_source[0];
        let company = composite_named(&composition, "Company");
        assert_eq!(
            composition.access_path(fk).index_fields,
            composition
                .access_path(composition.composite(company).natural_index.unwrap())
                .index_fields
        );
    }

    #[test]
    fn unobjectified_ternaries_are_skipped() {
        let mut schema = fixtures::company().unwrap();
        let person = schema.object_type_by_name("Person").unwrap();
        let company = schema.object_type_by_name("Company").unwrap();
        let date = schema.object_type_by_name("Date").unwrap();
        schema.add_fact_type(&[person, company, date]).unwrap();

        let composition = Compositor::compose(&mut schema, CompositorOptions::default()).unwrap();
        let names: Vec<_> = composition
            .all_composite_by_name()
            .into_iter()
            .map(|c| composition.composite_name(c).to_owned())
            .collect();
        assert_eq!(names, ["Company", "Person"]);
    }

    #[test]
    fn every_composite_has_a_unique_primary_index() {
        let mut schema = fixtures::enrolment().unwrap();
        let composition = Compositor::compose(&mut schema, CompositorOptions::default()).unwrap();
        for (_, composite) in composition.composites() {
            let primary = composition.access_path(composite.primary_index.unwrap());
            assert!(matches!(primary.kind, AccessPathKind::Index { is_unique: true, .. }));
            assert!(!primary.index_fields.is_empty());
        }
    }

    #[test]
    fn objectified_unaries_are_keyed_by_their_players_identifier() {
        let mut schema = fixtures::company().unwrap();
        let person = schema.object_type_by_name("Person").unwrap();
        let heavy = fixtures::unary(&mut schema, person, "{0} is a heavy smoker").unwrap();
        let smoker = schema.add_entity_type("Smoker");
        schema.objectify(smoker, schema.role(heavy).fact_type).unwrap();

        let composition = Compositor::compose(&mut schema, CompositorOptions::default()).unwrap();
        let composite = composite_named(&composition, "Smoker");
        let root = composition.composite(composite).mapping;
        let link = composition.members_in_order(root)[0];
        assert!(matches!(
            &composition.component(link).kind,
            ComponentKind::Absorption(a) if schema.base_role(a.child_role) == heavy
        ));

        let natural = composition.composite(composite).natural_index.unwrap();
        assert_eq!(composition.composite(composite).primary_index, Some(natural));
        let fields: Vec<_> = composition
            .access_path(natural)
            .index_fields
            .iter()
            .map(|f| f.component)
            .collect();
        assert_eq!(fields, composition.leaves(link));
        assert_eq!(fields.len(), 1);

        let report = orm_conformance::validate(&schema, &composition);
        assert!(report.is_clean(), "{}", report.to_json(&schema, &composition));
    }

    #[test]
    fn subtypes_are_absorbed_in_the_direction_of_their_assimilation() {
        let mut schema = fixtures::employees().unwrap();
        let composition = Compositor::compose(&mut schema, CompositorOptions::default()).unwrap();

        let person = composition.composite(composite_named(&composition, "Person")).mapping;
        let employee = composition.members_in_order(person)[1];
        assert!(is_subtype_absorption(&schema, &composition, employee));
        assert!(composition.absorption(employee).unwrap().full_absorption.is_some());

        let manager = composition.composite(composite_named(&composition, "Manager")).mapping;
        let supertype = composition.members_in_order(manager)[0];
        assert!(is_supertype_absorption(&schema, &composition, supertype));
        assert!(!is_subtype_absorption(&schema, &composition, supertype));
        assert!(composition.absorption(supertype).unwrap().foreign_key.is_some());
    }
}
