//! Subtyping, value type chains and objectification links.

use tracing::trace;

use crate::error::MetamodelError;
use crate::ids::{FactTypeId, ObjectTypeId, RoleId, ValueConstraintId};
use crate::model::{Assimilation, FactTypeKind, ObjectTypeKind, PresenceConstraint, TypeInheritance};
use crate::schema::Schema;

impl Schema {
    /// Type inheritances in which `entity` is the subtype, identifying one
    /// first and the rest by supertype name.
    #[must_use]
    pub fn supertype_inheritances(&self, entity: ObjectTypeId) -> Vec<FactTypeId> {
        let Some(et) = self.object_type(entity).as_entity() else {
            return Vec::new();
        };
        let mut tis = et.supertype_inheritances.clone();
        tis.sort_by_cached_key(|&ft| match self.type_inheritance(ft) {
            Some(ti) => (!ti.provides_identification, self.name(ti.supertype).to_owned()),
            None => (true, String::new()),
        });
        tis
    }

    /// Direct supertypes: the identifying supertype first, the rest by name.
    #[must_use]
    pub fn supertypes(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        match &self.object_type(object_type).kind {
            ObjectTypeKind::Entity(_) => self
                .supertype_inheritances(object_type)
                .into_iter()
                .filter_map(|ft| self.type_inheritance(ft).map(|ti| ti.supertype))
                .collect(),
            ObjectTypeKind::Value(v) => v.supertype.into_iter().collect(),
        }
    }

    /// The object type followed by all of its supertypes, without repeats.
    #[must_use]
    pub fn supertypes_transitive(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        let mut all = vec![object_type];
        let mut next = 0;
        while let Some(&current) = all.get(next) {
            for supertype in self.supertypes(current) {
                if !all.contains(&supertype) {
                    all.push(supertype);
                }
            }
            next += 1;
        }
        all
    }

    /// Direct subtypes in declaration order.
    #[must_use]
    pub fn subtypes(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        match &self.object_type(object_type).kind {
            ObjectTypeKind::Entity(et) => et
                .subtype_inheritances
                .iter()
                .filter_map(|&ft| self.type_inheritance(ft).map(|ti| ti.subtype))
                .collect(),
            ObjectTypeKind::Value(v) => v.subtypes.clone(),
        }
    }

    /// The object type followed by all of its subtypes, without repeats.
    #[must_use]
    pub fn subtypes_transitive(&self, object_type: ObjectTypeId) -> Vec<ObjectTypeId> {
        let mut all = vec![object_type];
        let mut next = 0;
        while let Some(&current) = all.get(next) {
            for subtype in self.subtypes(current) {
                if !all.contains(&subtype) {
                    all.push(subtype);
                }
            }
            next += 1;
        }
        all
    }

    /// The type inheritance through which `entity` is identified, if any.
    #[must_use]
    pub fn identifying_type_inheritance(&self, entity: ObjectTypeId) -> Option<FactTypeId> {
        self.object_type(entity)
            .as_entity()?
            .supertype_inheritances
            .iter()
            .copied()
            .find(|&ft| {
                self.type_inheritance(ft)
                    .is_some_and(|ti| ti.provides_identification)
            })
    }

    /// The supertype that identifies `entity`, if it does not define its own identifier.
    #[must_use]
    pub fn identifying_supertype(&self, entity: ObjectTypeId) -> Option<ObjectTypeId> {
        self.identifying_type_inheritance(entity)
            .and_then(|ft| self.type_inheritance(ft))
            .map(|ti| ti.supertype)
    }

    /// The nearest supertype shared by two object types of the same kind.
    #[must_use]
    pub fn common_supertype(&self, a: ObjectTypeId, b: ObjectTypeId) -> Option<ObjectTypeId> {
        if self.object_type(a).is_entity_type() != self.object_type(b).is_entity_type() {
            return None;
        }
        let theirs = self.supertypes_transitive(b);
        self.supertypes_transitive(a)
            .into_iter()
            .find(|t| theirs.contains(t))
    }

    /// The assimilation of the identifying type inheritance.
    #[must_use]
    pub fn assimilation(&self, entity: ObjectTypeId) -> Option<Assimilation> {
        self.identifying_type_inheritance(entity)
            .and_then(|ft| self.type_inheritance(ft))
            .and_then(|ti| ti.assimilation)
    }

    /// True if the object type wants its own table.
    #[must_use]
    pub fn is_separate(&self, object_type: ObjectTypeId) -> bool {
        let ot = self.object_type(object_type);
        ot.is_independent
            || ot.has_annotation("separate")
            || (ot.is_entity_type()
                && self
                    .assimilation(object_type)
                    .is_some_and(Assimilation::is_separating))
    }

    /// Every role played by the object type or one of its supertypes.
    #[must_use]
    pub fn all_role_transitive(&self, object_type: ObjectTypeId) -> Vec<RoleId> {
        self.supertypes_transitive(object_type)
            .into_iter()
            .flat_map(|t| self.object_type(t).roles.iter().copied())
            .collect()
    }

    /// The transaction phase at which values of this type are assigned
    /// automatically, if they are.
    ///
    /// A type named `Auto...` without an explicit phase is assigned on commit.
    #[must_use]
    pub fn is_auto_assigned(&self, value_type: ObjectTypeId) -> Option<&str> {
        let mut current = Some(value_type);
        while let Some(id) = current {
            let ot = self.object_type(id);
            let vt = ot.as_value()?;
            if let Some(phase) = &vt.transaction_phase {
                return Some(phase);
            }
            if ot.name.starts_with("Auto") {
                return Some("commit");
            }
            current = vt.supertype;
        }
        None
    }

    /// The value constraint governing a value type: its own, else the
    /// nearest one up the supertype chain.
    #[must_use]
    pub fn effective_value_constraint(&self, value_type: ObjectTypeId) -> Option<ValueConstraintId> {
        let mut current = Some(value_type);
        while let Some(id) = current {
            let vt = self.object_type(id).as_value()?;
            if vt.value_constraint.is_some() {
                return vt.value_constraint;
            }
            current = vt.supertype;
        }
        None
    }

    /// Declares `supertype` as a supertype of `subtype`.
    ///
    /// Creates the type inheritance fact type, its two readings, a mandatory
    /// one-to-one constraint on the subtype role and an optional at-most-one
    /// constraint on the supertype role. The latter is the subtype's preferred
    /// identifier when `is_identifying` is set.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotAnEntityType`] unless both are entity types.
    pub fn add_supertype(
        &mut self,
        subtype: ObjectTypeId,
        supertype: ObjectTypeId,
        is_identifying: bool,
        assimilation: Option<Assimilation>,
    ) -> Result<FactTypeId, MetamodelError> {
        self.entity_type(subtype)?;
        self.entity_type(supertype)?;
        let fact_type = self.push_fact_type(
            FactTypeKind::TypeInheritance(TypeInheritance {
                subtype,
                supertype,
                provides_identification: is_identifying,
                assimilation,
            }),
            &[subtype, supertype],
        )?;
        let (sub_role, super_role) = {
            let roles = &self.fact_type(fact_type).roles;
            (roles[0], roles[1])
        };

        let sub_name = self.name(subtype).to_owned();
        let super_name = self.name(supertype).to_owned();
        self.add_reading(fact_type, [sub_role, super_role], "{0} is a kind of {1}")?;
        let article = match sub_name.chars().next().map(|c| c.to_ascii_lowercase()) {
            Some(c) if "aeioh".contains(c) => "n",
            _ => "",
        };
        self.add_reading(
            fact_type,
            [super_role, sub_role],
            format!("{{0}} is a{article} {{1}}"),
        )?;

        let must_have = self.add_role_sequence([sub_role])?;
        self.add_presence_constraint(PresenceConstraint {
            name: Some(format!("{sub_name}MustHaveSupertype{super_name}")),
            min_frequency: Some(1),
            max_frequency: Some(1),
            is_mandatory: true,
            ..PresenceConstraint::over(must_have)
        });
        let may_be = self.add_role_sequence([super_role])?;
        self.add_presence_constraint(PresenceConstraint {
            name: Some(format!("{super_name}MayBeA{sub_name}")),
            min_frequency: Some(0),
            max_frequency: Some(1),
            is_preferred_identifier: is_identifying,
            ..PresenceConstraint::over(may_be)
        });

        self.entity_type_mut(subtype)?
            .supertype_inheritances
            .push(fact_type);
        self.entity_type_mut(supertype)?
            .subtype_inheritances
            .push(fact_type);
        self.invalidate_preferred_identifier(subtype);
        trace!(
            target: "orm::pi",
            subtype = %sub_name,
            supertype = %super_name,
            is_identifying,
            "added supertype"
        );
        Ok(fact_type)
    }

    /// Creates a link fact type for every role of the fact type `entity`
    /// objectifies that has no mirror yet. Returns the link fact types created.
    ///
    /// Each link fact type has an objectification role played by `entity` and
    /// a mirror role played by the original role's player.
    ///
    /// # Errors
    ///
    /// Returns [`MetamodelError::NotObjectified`] if `entity` objectifies nothing.
    pub fn create_link_fact_types(
        &mut self,
        entity: ObjectTypeId,
    ) -> Result<Vec<FactTypeId>, MetamodelError> {
        let objectified = self
            .entity_type(entity)?
            .objectified_fact_type
            .ok_or_else(|| MetamodelError::NotObjectified(self.name(entity).to_owned()))?;
        let mut created = Vec::new();
        for role in self.fact_type(objectified).roles.clone() {
            if self.role(role).mirror_role.is_some() {
                continue;
            }
            let player = self.role(role).player;
            let link = self.push_fact_type(FactTypeKind::Link { implying_role: role }, &[entity, player])?;
            let (objectification_role, mirror_role) = {
                let roles = &self.fact_type(link).roles;
                (roles[0], roles[1])
            };
            self.set_mirror(role, mirror_role);
            let rs = self.add_role_sequence([objectification_role, mirror_role])?;
            self.push_reading(link, rs, "{0} involves {1}".to_owned());
            self.push_reading(link, rs, "{1} is involved in {0}".to_owned());
            created.push(link);
        }
        trace!(
            target: "orm::pi",
            entity = %self.name(entity),
            created = created.len(),
            "created link fact types"
        );
        Ok(created)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn add_supertype_builds_readings_and_constraints() {
        let mut schema = Schema::new();
        let person = schema.add_entity_type("Person");
        let employee = schema.add_entity_type("Employee");
        let ft = schema
            .add_supertype(employee, person, true, Some(Assimilation::Absorbed))
            .unwrap();
        let readings: Vec<_> = schema
            .fact_type(ft)
            .readings
            .iter()
            .map(|&r| schema.reading(r).text.clone())
            .collect();
        assert_eq!(readings, ["{0} is a kind of {1}", "{0} is an {1}"]);

        let [sub_role, super_role] = [schema.fact_type(ft).roles[0], schema.fact_type(ft).roles[1]];
        let must = schema.uniqueness_constraint(sub_role).unwrap();
        assert!(schema.constraint(must).is_mandatory);
        assert!(!schema.constraint(must).is_preferred_identifier);
        assert_eq!(
            schema.constraint(must).name.as_deref(),
            Some("EmployeeMustHaveSupertypePerson")
        );
        let may = schema.uniqueness_constraint(super_role).unwrap();
        assert!(schema.constraint(may).is_preferred_identifier);
        assert_eq!(schema.constraint(may).min_frequency, Some(0));
        assert_eq!(schema.identifying_supertype(employee), Some(person));
        assert_eq!(schema.supertypes_transitive(employee), vec![employee, person]);
        assert_eq!(schema.subtypes(person), vec![employee]);
    }

    #[test]
    fn article_follows_the_subtype_initial() {
        let mut schema = Schema::new();
        let person = schema.add_entity_type("Person");
        let manager = schema.add_entity_type("Manager");
        let ft = schema.add_supertype(manager, person, false, None).unwrap();
        let second = schema.fact_type(ft).readings[1];
        assert_eq!(schema.reading(second).text, "{0} is a {1}");
    }

    #[test]
    fn separate_assimilation_marks_the_subtype_separate() {
        let mut schema = Schema::new();
        let party = schema.add_entity_type("Party");
        let company = schema.add_entity_type("Company");
        assert!(!schema.is_separate(company));
        schema
            .add_supertype(company, party, true, Some(Assimilation::Partitioned))
            .unwrap();
        assert!(schema.is_separate(company));
        assert!(!schema.is_separate(party));
    }

    #[test]
    fn link_fact_types_are_created_once() {
        let mut schema = Schema::new();
        let student = schema.add_entity_type("Student");
        let course = schema.add_entity_type("Course");
        let enrolment = schema.add_entity_type("Enrolment");
        let ft = schema.add_fact_type(&[student, course]).unwrap();
        schema.objectify(enrolment, ft).unwrap();
        let links = schema.create_link_fact_types(enrolment).unwrap();
        assert_eq!(links.len(), 2);
        assert!(schema.create_link_fact_types(enrolment).unwrap().is_empty());

        let base = schema.fact_type(ft).roles[0];
        let mirror = schema.role(base).mirror_role.unwrap();
        assert_eq!(schema.base_role(mirror), base);
        assert_eq!(schema.role(mirror).player, student);
        let objectification = schema.fact_type(links[0]).roles[0];
        assert!(schema.is_objectification_role(objectification));
        assert!(schema.is_unique(objectification));
        assert!(schema.is_mandatory(objectification));
        assert_eq!(
            schema.default_reading(links[0]).unwrap(),
            "Enrolment involves Student"
        );
    }

    #[test]
    fn value_type_chains() {
        let mut schema = Schema::new();
        let counter = schema.add_value_type("AutoCounter");
        let id = schema.add_value_subtype("PersonID", counter).unwrap();
        assert_eq!(schema.is_auto_assigned(id), Some("commit"));
        let text = schema.add_value_type("String");
        let name = schema.add_value_subtype("Name", text).unwrap();
        assert_eq!(schema.is_auto_assigned(name), None);
        let vc = schema
            .restrict_value_type(text, crate::model::ValueConstraint::default())
            .unwrap();
        assert_eq!(schema.effective_value_constraint(name), Some(vc));
        assert_eq!(schema.common_supertype(name, text), Some(text));
        assert_eq!(schema.common_supertype(name, id), None);
    }
}
