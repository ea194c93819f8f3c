//! Role and fact type navigation.
//!
//! Mirror roles (the second role of a link fact type) answer uniqueness,
//! mandatory and functional questions on behalf of the role they mirror.
//! Objectification roles (the first role of a link fact type) are always
//! unique, mandatory and functional.

use crate::ids::{ConstraintId, FactTypeId, ReadingId, RoleId, RoleSequenceId};
use crate::model::{FactTypeKind, TypeInheritance};
use crate::schema::Schema;
use crate::support::Words;

impl Schema {
    /// The type inheritance payload of a fact type, if it is one.
    #[must_use]
    pub fn type_inheritance(&self, fact_type: FactTypeId) -> Option<&TypeInheritance> {
        match &self.fact_type(fact_type).kind {
            FactTypeKind::TypeInheritance(ti) => Some(ti),
            _ => None,
        }
    }

    /// True if the role belongs to a link fact type.
    #[must_use]
    pub fn is_link_role(&self, role: RoleId) -> bool {
        matches!(
            self.fact_type(self.role(role).fact_type).kind,
            FactTypeKind::Link { .. }
        )
    }

    /// True if the role mirrors a role of an objectified fact type.
    #[must_use]
    pub fn is_mirror_role(&self, role: RoleId) -> bool {
        self.role(role).base_role.is_some()
    }

    /// True for the role played by the objectifying entity in a link fact type.
    #[must_use]
    pub fn is_objectification_role(&self, role: RoleId) -> bool {
        self.is_link_role(role) && !self.is_mirror_role(role)
    }

    /// The mirrored role for a mirror role; otherwise the role itself.
    #[must_use]
    pub fn base_role(&self, role: RoleId) -> RoleId {
        self.role(role).base_role.unwrap_or(role)
    }

    /// The fact type's other role: the role itself for a unary, none for an n-ary.
    #[must_use]
    pub fn counterpart(&self, role: RoleId) -> Option<RoleId> {
        let roles = &self.fact_type(self.role(role).fact_type).roles;
        match roles.as_slice() {
            [only] => Some(*only),
            [a, b] => Some(if *a == role { *b } else { *a }),
            _ => None,
        }
    }

    /// The alethic single-role uniqueness constraint over this role, if any.
    #[must_use]
    pub fn uniqueness_constraint(&self, role: RoleId) -> Option<ConstraintId> {
        let base = self.base_role(role);
        self.role(base)
            .sequences
            .iter()
            .map(|&rs| self.role_sequence(rs))
            .filter(|rs| rs.refs.len() == 1)
            .flat_map(|rs| rs.constraints.iter().copied())
            .find(|&pc| self.constraint(pc).is_uniqueness())
    }

    /// True if each player instance plays this role at most once.
    #[must_use]
    pub fn is_unique(&self, role: RoleId) -> bool {
        if let Some(base) = self.role(role).base_role {
            return self.is_unique(base);
        }
        self.is_link_role(role)
            || self.fact_type(self.role(role).fact_type).roles.len() == 1
            || self.uniqueness_constraint(role).is_some()
    }

    /// True if every player instance must play this role.
    #[must_use]
    pub fn is_mandatory(&self, role: RoleId) -> bool {
        if let Some(base) = self.role(role).base_role {
            return self.is_mandatory(base);
        }
        if self.is_link_role(role) {
            return true;
        }
        self.role(role)
            .sequences
            .iter()
            .map(|&rs| self.role_sequence(rs))
            .filter(|rs| rs.refs.len() == 1)
            .flat_map(|rs| rs.constraints.iter())
            .map(|&pc| self.constraint(pc))
            .any(|pc| pc.is_mandatory && pc.min_frequency.is_some_and(|m| m >= 1))
    }

    /// True if the role has at most one instance per player instance.
    ///
    /// Roles of objectified fact types refer to the implicit objectification
    /// role and so are functional.
    #[must_use]
    pub fn is_functional(&self, role: RoleId) -> bool {
        if let Some(base) = self.role(role).base_role {
            return self.is_functional(base);
        }
        if self.is_link_role(role) {
            return true;
        }
        let fact_type = self.fact_type(self.role(role).fact_type);
        fact_type.entity_type.is_some()
            || fact_type.roles.len() != 2
            || self.uniqueness_constraint(role).is_some()
    }

    /// True if the role's uniqueness constraint is a preferred identifier.
    #[must_use]
    pub fn is_identifying(&self, role: RoleId) -> bool {
        self.uniqueness_constraint(role)
            .is_some_and(|pc| self.constraint(pc).is_preferred_identifier)
    }

    /// The display name of a role.
    ///
    /// Uses, in order: an explicit role name, a mirror's base role name, the
    /// title-cased text of a unary reading, the adjectives and player name from
    /// the preferred reading, and finally the player's name.
    #[must_use]
    pub fn role_name(&self, role: RoleId) -> String {
        let r = self.role(role);
        if let Some(name) = &r.role_name {
            return name.clone();
        }
        if let Some(name) = r.base_role.and_then(|b| self.role(b).role_name.clone()) {
            return name;
        }
        if self.is_unary(r.fact_type) && !self.is_link_role(role) {
            if let Some(name) = self.unary_name(r.fact_type) {
                return name;
            }
        }
        let player = &self.object_type(r.player).name;
        let Some(reference) = self.preferred_reading(r.fact_type).and_then(|reading| {
            self.role_sequence(self.reading(reading).role_sequence)
                .refs
                .iter()
                .find(|rr| rr.role == role)
        }) else {
            return player.clone();
        };
        let phrase = [
            reference.leading_adjective.as_deref(),
            Some(player.as_str()),
            reference.trailing_adjective.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
        Words::new(&phrase).capwords().join(" ")
    }

    fn unary_name(&self, fact_type: FactTypeId) -> Option<String> {
        let reading = self.reading(self.preferred_reading(fact_type)?);
        let text = strip_placeholders(&reading.text);
        let words = Words::new(&text);
        (!words.is_empty()).then(|| words.titlewords().join(" "))
    }

    /// True if the fact type has a single role.
    #[must_use]
    pub fn is_unary(&self, fact_type: FactTypeId) -> bool {
        self.fact_type(fact_type).roles.len() == 1
    }

    /// True if a role of this unary or binary fact type takes part in a preferred identifier.
    #[must_use]
    pub fn is_existential(&self, fact_type: FactTypeId) -> bool {
        let roles = &self.fact_type(fact_type).roles;
        roles.len() <= 2
            && roles.iter().any(|&role| {
                self.role(role).sequences.iter().any(|&rs| {
                    self.role_sequence(rs)
                        .constraints
                        .iter()
                        .any(|&pc| self.constraint(pc).is_preferred_identifier)
                })
            })
    }

    /// Presence constraints whose role sequences lie wholly within this fact type.
    #[must_use]
    pub fn internal_presence_constraints(&self, fact_type: FactTypeId) -> Vec<ConstraintId> {
        let mut found = Vec::new();
        for &role in &self.fact_type(fact_type).roles {
            for &rs in &self.role(role).sequences {
                if self.sequence_within(rs, fact_type) {
                    for &pc in &self.role_sequence(rs).constraints {
                        if !found.contains(&pc) {
                            found.push(pc);
                        }
                    }
                }
            }
        }
        found
    }

    /// True if every role of the sequence belongs to `fact_type`.
    #[must_use]
    pub fn sequence_within(&self, role_sequence: RoleSequenceId, fact_type: FactTypeId) -> bool {
        self.role_sequence(role_sequence)
            .roles()
            .all(|r| self.role(r).fact_type == fact_type)
    }

    /// The first positive reading by ordinal.
    #[must_use]
    pub fn preferred_reading(&self, fact_type: FactTypeId) -> Option<ReadingId> {
        self.fact_type(fact_type)
            .readings
            .iter()
            .copied()
            .filter(|&r| !self.reading(r).is_negative)
            .min_by_key(|&r| self.reading(r).ordinal)
    }

    /// A positive reading that starts with `role`, else the preferred reading.
    #[must_use]
    pub fn reading_starting_with(&self, role: RoleId) -> Option<ReadingId> {
        let fact_type = self.role(role).fact_type;
        let mut readings = self.fact_type(fact_type).readings.clone();
        readings.sort_by_key(|&r| self.reading(r).ordinal);
        readings
            .into_iter()
            .find(|&r| {
                let reading = self.reading(r);
                !reading.is_negative
                    && first_placeholder(&reading.text)
                        .and_then(|n| self.role_sequence(reading.role_sequence).refs.get(n))
                        .is_some_and(|rr| self.base_role(rr.role) == role)
            })
            .or_else(|| self.preferred_reading(fact_type))
    }

    /// Expands a reading's placeholders into player names with adjectives.
    #[must_use]
    pub fn expand_reading(&self, reading: ReadingId) -> String {
        let reading = self.reading(reading);
        let refs = &self.role_sequence(reading.role_sequence).refs;
        let mut out = String::new();
        let mut rest = reading.text.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let expanded = after.find('}').and_then(|close| {
                let n: usize = after[..close].parse().ok()?;
                let rr = refs.get(n)?;
                let name = &self.object_type(self.role(rr.role).player).name;
                let phrase = [
                    rr.leading_adjective.as_deref(),
                    Some(name.as_str()),
                    rr.trailing_adjective.as_deref(),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
                Some((phrase, close))
            });
            match expanded {
                Some((phrase, close)) => {
                    out.push_str(&phrase);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// The expanded text of the preferred reading.
    #[must_use]
    pub fn default_reading(&self, fact_type: FactTypeId) -> Option<String> {
        self.preferred_reading(fact_type)
            .map(|r| self.expand_reading(r))
    }

    /// Describes a fact type as `Objectifier(Player, Player)`.
    #[must_use]
    pub fn describe_fact_type(&self, fact_type: FactTypeId) -> String {
        let ft = self.fact_type(fact_type);
        let objectifier = ft.entity_type.map(|e| self.name(e)).unwrap_or_default();
        let players = ft
            .roles
            .iter()
            .map(|&r| self.name(self.role(r).player))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{objectifier}({players})")
    }

    /// Describes a role sequence as `(Player, Player)`.
    #[must_use]
    pub fn describe_role_sequence(&self, role_sequence: RoleSequenceId) -> String {
        let names = self
            .role_sequence(role_sequence)
            .roles()
            .map(|r| self.role_name(r))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({names})")
    }

    /// Describes a presence constraint and its frequency.
    #[must_use]
    pub fn describe_constraint(&self, constraint: ConstraintId) -> String {
        let pc = self.constraint(constraint);
        let plural = pc.min_frequency.is_some_and(|m| m > 1) || pc.max_frequency.is_some_and(|m| m > 1);
        format!(
            "PresenceConstraint over {} occurs {} time{}",
            self.describe_role_sequence(pc.role_sequence),
            pc.frequency(),
            if plural { "s" } else { "" }
        )
    }

    /// True if the constraint's role sequence includes `role`.
    #[must_use]
    pub fn covers_role(&self, constraint: ConstraintId, role: RoleId) -> bool {
        self.role_sequence(self.constraint(constraint).role_sequence)
            .roles()
            .any(|r| r == role)
    }
}

fn strip_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' && chars.peek().is_some_and(char::is_ascii_digit) {
            while chars.next().is_some_and(|c| c != '}') {}
        } else {
            out.push(c);
        }
    }
    out
}

fn first_placeholder(text: &str) -> Option<usize> {
    let open = text.find('{')?;
    let close = text[open..].find('}')? + open;
    text[open + 1..close].parse().ok()
}
