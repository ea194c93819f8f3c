//! Absorption direction, mirrored pairs and flipping.
//!
//! Every binary fact type yields a mirrored pair of absorptions, one in the
//! mapping of each player. The *forward* absorption holds the pair's
//! `reverse_absorption`; the other side holds `forward_absorption`.

use orm_metamodel::{
    Absorption, Component, ComponentId, ComponentKind, Composition, RoleId, Schema,
};
use tracing::{debug, trace};

use crate::error::ComposeError;

/// True if the object playing `parent_role` should absorb the object
/// playing `child_role`, rather than the reverse.
///
/// The first decisive rule wins:
/// 1. a mirror role is absorbed into its objectification;
/// 2. the side whose role is unique absorbs the other;
/// 3. across a type inheritance, the supertype absorbs the subtype unless
///    the subtype is mapped separately;
/// 4. in a one-to-one, entities absorb values, an identifying role is
///    absorbed, then a mandatory role is absorbed;
/// 5. between entities, the one whose identifier involves the other absorbs it;
/// 6. otherwise role names decide.
///
/// # Errors
///
/// Fails when rule 5 needs a preferred identifier the schema lacks.
pub fn is_preferred_direction(
    schema: &Schema,
    parent_role: RoleId,
    child_role: RoleId,
) -> Result<bool, ComposeError> {
    let decided = |rule: u8, preferred: bool| -> Result<bool, ComposeError> {
        trace!(
            target: "orm::absorption",
            parent = %schema.role_name(parent_role),
            child = %schema.role_name(child_role),
            rule,
            preferred,
            "direction decided"
        );
        Ok(preferred)
    };

    let (parent_mirror, child_mirror) = (schema.is_mirror_role(parent_role), schema.is_mirror_role(child_role));
    if parent_mirror != child_mirror {
        return decided(1, child_mirror);
    }

    let (parent_unique, child_unique) = (schema.is_unique(parent_role), schema.is_unique(child_role));
    if parent_unique != child_unique {
        return decided(2, parent_unique);
    }

    let fact_type = schema.role(child_role).fact_type;
    if let Some(ti) = schema.type_inheritance(fact_type) {
        let is_subtype = schema.fact_type(fact_type).roles.first() == Some(&child_role);
        let subtype = schema.object_type(ti.subtype);
        let child_separate = ti.assimilation.is_some_and(|a| a.is_separating())
            || subtype.is_independent
            || subtype.has_annotation("separate");
        return decided(3, is_subtype != child_separate);
    }

    let parent_type = schema.role(parent_role).player;
    let child_type = schema.role(child_role).player;
    if parent_unique && child_unique {
        let parent_value = schema.object_type(parent_type).is_value_type();
        let child_value = schema.object_type(child_type).is_value_type();
        if parent_value != child_value {
            return decided(4, child_value);
        }
        if !parent_value {
            if schema.is_identifying(schema.base_role(child_role)) {
                return decided(4, true);
            }
            if schema.is_identifying(schema.base_role(parent_role)) {
                return decided(4, false);
            }
        }
        let (parent_mandatory, child_mandatory) =
            (schema.is_mandatory(parent_role), schema.is_mandatory(child_role));
        if parent_mandatory != child_mandatory {
            return decided(4, child_mandatory);
        }
    }

    let both_entities = schema.object_type(parent_type).is_entity_type()
        && schema.object_type(child_type).is_entity_type();
    if both_entities {
        let played_by = |roles: Vec<RoleId>, player| roles.into_iter().any(|r| schema.role(r).player == player);
        if played_by(schema.preferred_identifier_roles(parent_type)?, child_type) {
            return decided(5, true);
        }
        if played_by(schema.preferred_identifier_roles(child_type)?, parent_type) {
            return decided(5, false);
        }
    }

    decided(6, schema.role_name(parent_role) < schema.role_name(child_role))
}

/// Adds an absorption of `child_role`'s player under `parent_mapping` and
/// its mirror under `child_mapping`. The first returned absorption is
/// forward.
pub fn add_mirrored_pair(
    schema: &Schema,
    composition: &mut Composition,
    parent_mapping: ComponentId,
    child_mapping: ComponentId,
    parent_role: RoleId,
    child_role: RoleId,
) -> (ComponentId, ComponentId) {
    let forward = composition.add(
        Some(parent_mapping),
        Component::new(ComponentKind::Absorption(Absorption::new(parent_role, child_role)))
            .named(schema.role_name(child_role))
            .of(schema.role(child_role).player),
    );
    let mut reverse = Absorption::new(child_role, parent_role);
    reverse.forward_absorption = Some(forward);
    let reverse = composition.add(
        Some(child_mapping),
        Component::new(ComponentKind::Absorption(reverse))
            .named(schema.role_name(parent_role))
            .of(schema.role(parent_role).player),
    );
    if let Some(a) = composition.absorption_mut(forward) {
        a.reverse_absorption = Some(reverse);
    }
    (forward, reverse)
}

/// True if `id` is the forward side of its pair.
#[must_use]
pub fn is_forward(composition: &Composition, id: ComponentId) -> bool {
    composition
        .absorption(id)
        .is_some_and(|a| a.reverse_absorption.is_some())
}

/// Swaps which side of a mirrored pair is forward, on both sides.
///
/// # Errors
///
/// Returns [`ComposeError::FullAbsorptionNotFlippable`] if either side is a
/// full absorption and [`ComposeError::NoMirror`] if `id` is unpaired or
/// not an absorption.
pub fn flip(composition: &mut Composition, id: ComponentId) -> Result<(), ComposeError> {
    let describe = |composition: &Composition| {
        composition
            .component(id)
            .name
            .clone()
            .unwrap_or_else(|| id.to_string())
    };
    let Some(absorption) = composition.absorption(id) else {
        return Err(ComposeError::NoMirror(describe(composition)));
    };
    let mirror = absorption.mirror();
    let mirror_full = mirror
        .and_then(|m| composition.absorption(m))
        .is_some_and(|m| m.full_absorption.is_some());
    if absorption.full_absorption.is_some() || mirror_full {
        return Err(ComposeError::FullAbsorptionNotFlippable(describe(composition)));
    }
    let (was_forward, mirror) = match (absorption.forward_absorption, absorption.reverse_absorption) {
        (Some(forward), _) => (false, forward),
        (None, Some(reverse)) => (true, reverse),
        (None, None) => return Err(ComposeError::NoMirror(describe(composition))),
    };

    if let Some(a) = composition.absorption_mut(id) {
        if was_forward {
            a.reverse_absorption = None;
            a.forward_absorption = Some(mirror);
        } else {
            a.forward_absorption = None;
            a.reverse_absorption = Some(mirror);
        }
    }
    if let Some(m) = composition.absorption_mut(mirror) {
        if was_forward {
            m.forward_absorption = None;
            m.reverse_absorption = Some(id);
        } else {
            m.reverse_absorption = None;
            m.forward_absorption = Some(id);
        }
    }
    debug!(target: "orm::absorption", absorption = %id, mirror = %mirror, now_forward = !was_forward, "flipped");
    Ok(())
}

/// True if the absorption crosses a type inheritance.
#[must_use]
pub fn is_type_inheritance(schema: &Schema, composition: &Composition, id: ComponentId) -> bool {
    composition
        .absorption(id)
        .is_some_and(|a| schema.type_inheritance(schema.role(a.child_role).fact_type).is_some())
}

/// True if the absorption brings in a supertype of the parent.
#[must_use]
pub fn is_supertype_absorption(schema: &Schema, composition: &Composition, id: ComponentId) -> bool {
    let component = composition.component(id);
    component
        .as_absorption()
        .and_then(|a| schema.type_inheritance(schema.role(a.child_role).fact_type))
        .is_some_and(|ti| component.object_type == Some(ti.supertype))
}

/// True if the absorption brings in a subtype of the parent.
#[must_use]
pub fn is_subtype_absorption(schema: &Schema, composition: &Composition, id: ComponentId) -> bool {
    is_type_inheritance(schema, composition, id) && !is_supertype_absorption(schema, composition, id)
}
