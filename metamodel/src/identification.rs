//! Preferred identifier resolution.
//!
//! Every entity type is identified by exactly one presence constraint whose
//! role sequence names the identifying roles. The search result is cached on
//! the entity until [`Schema::invalidate_preferred_identifier`] is called.

use tracing::{debug, trace};

use crate::error::MetamodelError;
use crate::ids::{ConstraintId, FactTypeId, ObjectTypeId, RoleId, RoleSequenceId};
use crate::schema::Schema;

impl Schema {
    /// The presence constraint that identifies `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAnEntityType`] for value types and
    /// [`MetamodelError::NoPreferredIdentifier`] when the schema offers no
    /// qualifying constraint.
    pub fn preferred_identifier(&self, entity: ObjectTypeId) -> Result<ConstraintId, MetamodelError> {
        let et = self.entity_type(entity)?;
        if let Some(pi) = et.preferred_identifier.get() {
            return Ok(pi);
        }
        let pi = self.find_preferred_identifier(entity)?;
        et.preferred_identifier.set(Some(pi));
        Ok(pi)
    }

    /// The roles of `entity`'s preferred identifier, in order.
    ///
    /// # Errors
    ///
    /// Fails as [`preferred_identifier`](Self::preferred_identifier) does.
    pub fn preferred_identifier_roles(&self, entity: ObjectTypeId) -> Result<Vec<RoleId>, MetamodelError> {
        let pi = self.preferred_identifier(entity)?;
        Ok(self
            .role_sequence(self.constraint(pi).role_sequence)
            .roles()
            .collect())
    }

    /// The position of `role` in `entity`'s preferred identifier.
    ///
    /// # Errors
    ///
    /// Fails as [`preferred_identifier`](Self::preferred_identifier) does.
    pub fn rank_in_preferred_identifier(
        &self,
        entity: ObjectTypeId,
        role: RoleId,
    ) -> Result<Option<usize>, MetamodelError> {
        Ok(self
            .preferred_identifier_roles(entity)?
            .iter()
            .position(|&r| r == role))
    }

    fn find_preferred_identifier(&self, entity: ObjectTypeId) -> Result<ConstraintId, MetamodelError> {
        let name = self.name(entity);
        let objectified = self.entity_type(entity)?.objectified_fact_type;

        if let Some(fact_type) = objectified {
            let roles = &self.fact_type(fact_type).roles;
            if let [only] = roles.as_slice() {
                let player = self.role(*only).player;
                trace!(target: "orm::pi", entity = name, player = self.name(player), "objectified unary");
                return self.preferred_identifier(player);
            }
            if let Some(pi) = self.nested_identifier(entity, fact_type) {
                trace!(target: "orm::pi", entity = name, constraint = %pi, "identifier for nested fact type");
                return Ok(pi);
            }
            trace!(target: "orm::pi", entity = name, "looking for identifier on the objectifying entity");
        }

        if let Some(pi) = self.ordinary_identifier(entity) {
            trace!(target: "orm::pi", entity = name, constraint = %pi, "found identifier");
            return Ok(pi);
        }

        if self.identifying_supertype(entity).is_none() {
            if let Some(pi) = objectified.and_then(|ft| self.internal_unique_constraint(ft)) {
                debug!(target: "orm::pi", entity = name, constraint = %pi, "using an existing uniqueness constraint as identifier");
                return Ok(pi);
            }
        }
        debug!(target: "orm::pi", entity = name, "no identifier");
        Err(MetamodelError::NoPreferredIdentifier(name.to_owned()))
    }

    /// An identifier for an objectified n-ary: a preferred uniqueness constraint
    /// over N or N-1 roles touching one of the first two roles, where any role
    /// outside the fact type belongs to a unary played by the objectifier or a
    /// binary whose other role it plays.
    fn nested_identifier(&self, entity: ObjectTypeId, fact_type: FactTypeId) -> Option<ConstraintId> {
        let fact_roles = &self.fact_type(fact_type).roles;
        let arity = fact_roles.len();
        fact_roles
            .iter()
            .take(2)
            .flat_map(|&r| self.role(r).sequences.iter().copied())
            .filter(|&rs| {
                let size = self.role_sequence(rs).refs.len();
                size + 1 >= arity && size <= arity
            })
            .filter(|&rs| {
                !self
                    .role_sequence(rs)
                    .roles()
                    .any(|r| self.is_foreign_to_nested(r, fact_type, entity))
            })
            .find_map(|rs| {
                self.role_sequence(rs).constraints.iter().copied().find(|&pc| {
                    let pc = self.constraint(pc);
                    pc.max_frequency == Some(1) && pc.is_preferred_identifier
                })
            })
    }

    fn is_foreign_to_nested(&self, role: RoleId, fact_type: FactTypeId, entity: ObjectTypeId) -> bool {
        let other = self.role(role).fact_type;
        if other == fact_type {
            return false;
        }
        match self.fact_type(other).roles.as_slice() {
            [_] => self.role(role).player != entity,
            [a, b] => {
                let residual = if *a == role { *b } else { *a };
                self.role(residual).player != entity
            }
            _ => true,
        }
    }

    /// The first preferred-identifier constraint reached from a unique role
    /// of the entity (or a supertype) in a binary fact type, through a role
    /// sequence that touches no alien object types.
    fn ordinary_identifier(&self, entity: ObjectTypeId) -> Option<ConstraintId> {
        let supertypes = self.supertypes_transitive(entity);
        let objectified = self
            .object_type(entity)
            .as_entity()
            .and_then(|e| e.objectified_fact_type)
            .is_some();

        for role in self.all_role_transitive(entity) {
            if !(objectified || self.is_unique(role)) {
                continue;
            }
            let fact_roles = &self.fact_type(self.role(role).fact_type).roles;
            let [first, second] = fact_roles.as_slice() else {
                continue;
            };
            let pi_role = if *first != role { *first } else { *second };
            if self.role(pi_role).player == entity {
                continue;
            }
            trace!(
                target: "orm::pi",
                entity = self.name(entity),
                candidate = self.name(self.role(pi_role).player),
                "considering identifying role"
            );
            for &rs in &self.role(pi_role).sequences {
                if self.touches_alien_types(rs, &supertypes) {
                    trace!(target: "orm::pi", sequence = %self.describe_role_sequence(rs), "sequence includes alien roles");
                    continue;
                }
                if let Some(pc) = self
                    .role_sequence(rs)
                    .constraints
                    .iter()
                    .copied()
                    .find(|&pc| self.constraint(pc).is_preferred_identifier)
                {
                    return Some(pc);
                }
            }
        }
        None
    }

    fn touches_alien_types(&self, role_sequence: RoleSequenceId, supertypes: &[ObjectTypeId]) -> bool {
        self.role_sequence(role_sequence).roles().any(|r| {
            self.fact_type(self.role(r).fact_type)
                .roles
                .iter()
                .filter(|&&other| other != r)
                .any(|&other| !supertypes.contains(&self.role(other).player))
        })
    }

    /// A uniqueness constraint wholly inside the fact type, preferring one
    /// already flagged as a preferred identifier.
    fn internal_unique_constraint(&self, fact_type: FactTypeId) -> Option<ConstraintId> {
        let mut fallback = None;
        for &role in &self.fact_type(fact_type).roles {
            for &rs in &self.role(role).sequences {
                if !self.sequence_within(rs, fact_type) {
                    continue;
                }
                for &pc in &self.role_sequence(rs).constraints {
                    let c = self.constraint(pc);
                    if c.max_frequency != Some(1) {
                        continue;
                    }
                    if c.is_preferred_identifier {
                        return Some(pc);
                    }
                    fallback.get_or_insert(pc);
                }
            }
        }
        fallback
    }
}
