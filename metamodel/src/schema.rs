//! The conceptual schema arena.
//!
//! [`Schema`] owns every object type, fact type, role, role sequence,
//! constraint and reading. Construction methods keep both ends of each
//! relationship consistent (a role is listed on its fact type and on its
//! player, a role sequence on each referenced role, and so on).

use std::collections::BTreeMap;

use crate::error::MetamodelError;
use crate::ids::{
    ConstraintId, FactTypeId, ObjectTypeId, ReadingId, RoleId, RoleSequenceId, ValueConstraintId,
};
use crate::model::{
    EntityType, FactType, FactTypeKind, ObjectType, ObjectTypeKind, PresenceConstraint, Reading,
    Role, RoleRef, RoleSequence, ValueConstraint, ValueType,
};

/// A conceptual schema held as an arena of nodes addressed by id.
///
/// Ids are only meaningful for the schema that issued them.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    object_types: Vec<ObjectType>,
    fact_types: Vec<FactType>,
    roles: Vec<Role>,
    role_sequences: Vec<RoleSequence>,
    constraints: Vec<PresenceConstraint>,
    value_constraints: Vec<ValueConstraint>,
    readings: Vec<Reading>,
    by_name: BTreeMap<String, ObjectTypeId>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object type with the given id.
    #[must_use]
    pub fn object_type(&self, id: ObjectTypeId) -> &ObjectType {
        &self.object_types[id.index()]
    }

    /// Returns the object type with the given id, mutably.
    pub fn object_type_mut(&mut self, id: ObjectTypeId) -> &mut ObjectType {
        &mut self.object_types[id.index()]
    }

    /// Returns the fact type with the given id.
    #[must_use]
    pub fn fact_type(&self, id: FactTypeId) -> &FactType {
        &self.fact_types[id.index()]
    }

    /// Returns the role with the given id.
    #[must_use]
    pub fn role(&self, id: RoleId) -> &Role {
        &self.roles[id.index()]
    }

    /// Returns the role sequence with the given id.
    #[must_use]
    pub fn role_sequence(&self, id: RoleSequenceId) -> &RoleSequence {
        &self.role_sequences[id.index()]
    }

    /// Returns the presence constraint with the given id.
    #[must_use]
    pub fn constraint(&self, id: ConstraintId) -> &PresenceConstraint {
        &self.constraints[id.index()]
    }

    /// Returns the value constraint with the given id.
    #[must_use]
    pub fn value_constraint(&self, id: ValueConstraintId) -> &ValueConstraint {
        &self.value_constraints[id.index()]
    }

    /// Returns the reading with the given id.
    #[must_use]
    pub fn reading(&self, id: ReadingId) -> &Reading {
        &self.readings[id.index()]
    }

    /// Iterates all object types in creation order.
    pub fn object_types(&self) -> impl Iterator<Item = (ObjectTypeId, &ObjectType)> {
        self.object_types
            .iter()
            .enumerate()
            .map(|(i, o)| (ObjectTypeId::from_index(i), o))
    }

    /// Iterates all fact types in creation order.
    pub fn fact_types(&self) -> impl Iterator<Item = (FactTypeId, &FactType)> {
        self.fact_types
            .iter()
            .enumerate()
            .map(|(i, f)| (FactTypeId::from_index(i), f))
    }

    /// Iterates all presence constraints in creation order.
    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintId, &PresenceConstraint)> {
        self.constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (ConstraintId::from_index(i), c))
    }

    /// Looks up an object type by name.
    #[must_use]
    pub fn object_type_by_name(&self, name: &str) -> Option<ObjectTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the name of an object type.
    #[must_use]
    pub fn name(&self, id: ObjectTypeId) -> &str {
        &self.object_type(id).name
    }

    /// Returns the entity payload of an object type.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAnEntityType`] for value types.
    pub fn entity_type(&self, id: ObjectTypeId) -> Result<&EntityType, MetamodelError> {
        self.object_type(id)
            .as_entity()
            .ok_or_else(|| MetamodelError::NotAnEntityType(self.name(id).to_owned()))
    }

    /// Returns the value payload of an object type.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAValueType`] for entity types.
    pub fn value_type(&self, id: ObjectTypeId) -> Result<&ValueType, MetamodelError> {
        self.object_type(id)
            .as_value()
            .ok_or_else(|| MetamodelError::NotAValueType(self.name(id).to_owned()))
    }

    /// Returns the value payload of an object type, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAValueType`] for entity types.
    pub fn value_type_mut(&mut self, id: ObjectTypeId) -> Result<&mut ValueType, MetamodelError> {
        let name = self.name(id).to_owned();
        match &mut self.object_type_mut(id).kind {
            ObjectTypeKind::Value(v) => Ok(v),
            ObjectTypeKind::Entity(_) => Err(MetamodelError::NotAValueType(name)),
        }
    }

    pub(crate) fn entity_type_mut(
        &mut self,
        id: ObjectTypeId,
    ) -> Result<&mut EntityType, MetamodelError> {
        let name = self.name(id).to_owned();
        match &mut self.object_type_mut(id).kind {
            ObjectTypeKind::Entity(e) => Ok(e),
            ObjectTypeKind::Value(_) => Err(MetamodelError::NotAnEntityType(name)),
        }
    }

    fn push_object_type(&mut self, name: String, kind: ObjectTypeKind) -> ObjectTypeId {
        let id = ObjectTypeId::from_index(self.object_types.len());
        self.by_name.insert(name.clone(), id);
        self.object_types.push(ObjectType {
            name,
            is_independent: false,
            mapping_annotations: Vec::new(),
            roles: Vec::new(),
            kind,
        });
        id
    }

    /// Adds an entity type.
    pub fn add_entity_type(&mut self, name: impl Into<String>) -> ObjectTypeId {
        self.push_object_type(name.into(), ObjectTypeKind::Entity(EntityType::default()))
    }

    /// Adds a value type with no supertype.
    pub fn add_value_type(&mut self, name: impl Into<String>) -> ObjectTypeId {
        self.push_object_type(name.into(), ObjectTypeKind::Value(ValueType::default()))
    }

    /// Adds a value type refining `supertype`.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAValueType`] if `supertype` is an entity type.
    pub fn add_value_subtype(
        &mut self,
        name: impl Into<String>,
        supertype: ObjectTypeId,
    ) -> Result<ObjectTypeId, MetamodelError> {
        self.value_type(supertype)?;
        let id = self.push_object_type(
            name.into(),
            ObjectTypeKind::Value(ValueType {
                supertype: Some(supertype),
                ..ValueType::default()
            }),
        );
        self.value_type_mut(supertype)?.subtypes.push(id);
        Ok(id)
    }

    /// Marks an object type as independent.
    pub fn set_independent(&mut self, id: ObjectTypeId, is_independent: bool) {
        self.object_type_mut(id).is_independent = is_independent;
    }

    /// Attaches a mapping annotation such as `"separate"` to an object type.
    pub fn annotate(&mut self, id: ObjectTypeId, annotation: impl Into<String>) {
        self.object_type_mut(id)
            .mapping_annotations
            .push(annotation.into());
    }

    pub(crate) fn push_fact_type(
        &mut self,
        kind: FactTypeKind,
        players: &[ObjectTypeId],
    ) -> Result<FactTypeId, MetamodelError> {
        if players.is_empty() {
            return Err(MetamodelError::NoRoles);
        }
        let fact_type = FactTypeId::from_index(self.fact_types.len());
        let mut roles = Vec::with_capacity(players.len());
        for (ordinal, &player) in players.iter().enumerate() {
            let role = RoleId::from_index(self.roles.len());
            self.roles.push(Role {
                fact_type,
                ordinal,
                player,
                role_name: None,
                sequences: Vec::new(),
                base_role: None,
                mirror_role: None,
                value_constraint: None,
            });
            self.object_type_mut(player).roles.push(role);
            roles.push(role);
        }
        self.fact_types.push(FactType {
            roles,
            readings: Vec::new(),
            entity_type: None,
            derived_from: None,
            kind,
        });
        Ok(fact_type)
    }

    /// Adds a plain fact type with one role per player, in order.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NoRoles`] if `players` is empty.
    pub fn add_fact_type(&mut self, players: &[ObjectTypeId]) -> Result<FactTypeId, MetamodelError> {
        self.push_fact_type(FactTypeKind::Plain, players)
    }

    /// Records that a fact type is derived from the named query.
    pub fn set_derived_from(&mut self, fact_type: FactTypeId, query: impl Into<String>) {
        self.fact_types[fact_type.index()].derived_from = Some(query.into());
    }

    /// Gives a role an explicit name.
    pub fn set_role_name(&mut self, role: RoleId, name: impl Into<String>) {
        self.roles[role.index()].role_name = Some(name.into());
    }

    pub(crate) fn set_mirror(&mut self, base: RoleId, mirror: RoleId) {
        self.roles[base.index()].mirror_role = Some(mirror);
        self.roles[mirror.index()].base_role = Some(base);
    }

    /// Makes `entity` the objectification of `fact_type`.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAnEntityType`] if `entity` is a value type,
    /// or [`MetamodelError::AlreadyObjectified`] if either side is already
    /// involved in an objectification.
    pub fn objectify(
        &mut self,
        entity: ObjectTypeId,
        fact_type: FactTypeId,
    ) -> Result<(), MetamodelError> {
        let described = self.describe_fact_type(fact_type);
        if let Some(existing) = self.fact_type(fact_type).entity_type {
            return Err(MetamodelError::AlreadyObjectified(
                described,
                self.name(existing).to_owned(),
            ));
        }
        let name = self.name(entity).to_owned();
        let et = self.entity_type_mut(entity)?;
        if et.objectified_fact_type.is_some() {
            return Err(MetamodelError::AlreadyObjectified(described, name));
        }
        et.objectified_fact_type = Some(fact_type);
        et.preferred_identifier.set(None);
        self.fact_types[fact_type.index()].entity_type = Some(entity);
        Ok(())
    }

    /// Adds a role sequence over the given references.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::EmptyRoleSequence`] if no references are given.
    pub fn add_role_sequence<I>(&mut self, refs: I) -> Result<RoleSequenceId, MetamodelError>
    where
        I: IntoIterator,
        I::Item: Into<RoleRef>,
    {
        let refs: Vec<RoleRef> = refs.into_iter().map(Into::into).collect();
        if refs.is_empty() {
            return Err(MetamodelError::EmptyRoleSequence);
        }
        let id = RoleSequenceId::from_index(self.role_sequences.len());
        for r in &refs {
            let sequences = &mut self.roles[r.role.index()].sequences;
            if !sequences.contains(&id) {
                sequences.push(id);
            }
        }
        self.role_sequences.push(RoleSequence {
            refs,
            constraints: Vec::new(),
        });
        Ok(id)
    }

    /// Adds a reading of `fact_type`. `text` uses `{n}` placeholders indexing `refs`.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::EmptyRoleSequence`] if no references are given.
    pub fn add_reading<I>(
        &mut self,
        fact_type: FactTypeId,
        refs: I,
        text: impl Into<String>,
    ) -> Result<ReadingId, MetamodelError>
    where
        I: IntoIterator,
        I::Item: Into<RoleRef>,
    {
        let role_sequence = self.add_role_sequence(refs)?;
        Ok(self.push_reading(fact_type, role_sequence, text.into()))
    }

    pub(crate) fn push_reading(
        &mut self,
        fact_type: FactTypeId,
        role_sequence: RoleSequenceId,
        text: String,
    ) -> ReadingId {
        let id = ReadingId::from_index(self.readings.len());
        let readings = &mut self.fact_types[fact_type.index()].readings;
        let ordinal = readings.len();
        readings.push(id);
        self.readings.push(Reading {
            fact_type,
            ordinal,
            role_sequence,
            text,
            is_negative: false,
        });
        id
    }

    /// Adds a presence constraint.
    ///
    /// Adding a preferred identifier discards every cached preferred identifier.
    pub fn add_presence_constraint(&mut self, constraint: PresenceConstraint) -> ConstraintId {
        let id = ConstraintId::from_index(self.constraints.len());
        if constraint.is_preferred_identifier {
            self.invalidate_preferred_identifiers();
        }
        self.role_sequences[constraint.role_sequence.index()]
            .constraints
            .push(id);
        self.constraints.push(constraint);
        id
    }

    /// Adds an alethic uniqueness constraint spanning `roles`.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::EmptyRoleSequence`] if `roles` is empty.
    pub fn add_uniqueness_constraint(
        &mut self,
        roles: &[RoleId],
        is_preferred_identifier: bool,
    ) -> Result<ConstraintId, MetamodelError> {
        let role_sequence = self.add_role_sequence(roles.iter().copied())?;
        Ok(self.add_presence_constraint(PresenceConstraint {
            max_frequency: Some(1),
            is_preferred_identifier,
            ..PresenceConstraint::over(role_sequence)
        }))
    }

    /// Adds a simple mandatory constraint on one role.
    ///
    /// # Errors
    ///
    /// Fails only if the role sequence cannot be created.
    pub fn add_mandatory_constraint(&mut self, role: RoleId) -> Result<ConstraintId, MetamodelError> {
        let role_sequence = self.add_role_sequence([role])?;
        Ok(self.add_presence_constraint(PresenceConstraint {
            min_frequency: Some(1),
            is_mandatory: true,
            ..PresenceConstraint::over(role_sequence)
        }))
    }

    /// Stores a value constraint.
    pub fn add_value_constraint(&mut self, constraint: ValueConstraint) -> ValueConstraintId {
        let id = ValueConstraintId::from_index(self.value_constraints.len());
        self.value_constraints.push(constraint);
        id
    }

    /// Restricts the values of a value type.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAValueType`] for entity types.
    pub fn restrict_value_type(
        &mut self,
        value_type: ObjectTypeId,
        constraint: ValueConstraint,
    ) -> Result<ValueConstraintId, MetamodelError> {
        self.value_type(value_type)?;
        let id = self.add_value_constraint(constraint);
        self.value_type_mut(value_type)?.value_constraint = Some(id);
        Ok(id)
    }

    /// Restricts the values played in a role.
    pub fn restrict_role(&mut self, role: RoleId, constraint: ValueConstraint) -> ValueConstraintId {
        let id = self.add_value_constraint(constraint);
        self.roles[role.index()].value_constraint = Some(id);
        id
    }

    /// Forgets the cached preferred identifier of one entity type.
    pub fn invalidate_preferred_identifier(&self, entity: ObjectTypeId) {
        if let Some(et) = self.object_type(entity).as_entity() {
            et.preferred_identifier.set(None);
        }
    }

    /// Forgets every cached preferred identifier.
    pub fn invalidate_preferred_identifiers(&self) {
        for ot in &self.object_types {
            if let Some(et) = ot.as_entity() {
                et.preferred_identifier.set(None);
            }
        }
    }
}

impl From<RoleId> for RoleRef {
    fn from(role: RoleId) -> Self {
        RoleRef::plain(role)
    }
}
