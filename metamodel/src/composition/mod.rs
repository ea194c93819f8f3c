//! The composite (relational) schema arena.
//!
//! A [`Composition`] holds one [`Composite`] per physical table. Each
//! composite's root [`Component`] heads a tree of mapped elements; access
//! paths (indices and foreign keys) refer to components by id.

mod inspect;

use std::cell::OnceCell;

use crate::ids::{
    AccessPathId, ComponentId, CompositeId, ConstraintId, FullAbsorptionId, ObjectTypeId, RoleId,
};
use crate::model::Value;
use crate::support::{elide_repeated_subsequences, Words};

/// A physical table root.
#[derive(Debug, Clone)]
pub struct Composite {
    /// The root mapping.
    pub mapping: ComponentId,
    /// Indices on, and foreign keys into, this composite.
    pub access_paths: Vec<AccessPathId>,
    /// The index used as primary key.
    pub primary_index: Option<AccessPathId>,
    /// The index over the natural (preferred) identifier.
    pub natural_index: Option<AccessPathId>,
    /// Foreign keys from this composite to others.
    pub foreign_keys_as_source: Vec<AccessPathId>,
}

/// The closed set of component kinds.
#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// A plain mapping; the root of every composite is one.
    Mapping,
    /// Embeds the object reached through a role.
    Absorption(Absorption),
    /// A mapping introduced by the compositor rather than the schema.
    Injection(Injection),
    /// A mapping that scopes its members.
    Scoping,
    /// A boolean column for a unary role.
    Indicator(Indicator),
    /// A column holding which of several unary roles applies.
    Discriminator(Discriminator),
}

impl ComponentKind {
    /// The kind's display name.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ComponentKind::Mapping => "Mapping",
            ComponentKind::Absorption(_) => "Absorption",
            ComponentKind::Injection(Injection::SurrogateKey) => "SurrogateKey",
            ComponentKind::Injection(Injection::ValueField) => "ValueField",
            ComponentKind::Injection(Injection::ValidFrom) => "ValidFrom",
            ComponentKind::Scoping => "Scoping",
            ComponentKind::Indicator(_) => "Indicator",
            ComponentKind::Discriminator(_) => "Discriminator",
        }
    }

    /// True for kinds that map an object type and may have members.
    #[must_use]
    pub fn is_mapping(&self) -> bool {
        matches!(
            self,
            ComponentKind::Mapping
                | ComponentKind::Absorption(_)
                | ComponentKind::Injection(_)
                | ComponentKind::Scoping
        )
    }
}

/// Injected mapping kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injection {
    /// A generated key column.
    SurrogateKey,
    /// The value of a value type composite itself.
    ValueField,
    /// A temporal validity column.
    ValidFrom,
}

/// One level of nesting within a multi-valued absorption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nesting {
    /// The role whose player indexes the nested collection.
    pub index_role: RoleId,
    /// Key name used in the nested structure.
    pub key_name: Option<String>,
}

/// Absorption of the object reached through `child_role` into the object
/// playing `parent_role`.
#[derive(Debug, Clone)]
pub struct Absorption {
    /// Role played by the enclosing mapping's object type.
    pub parent_role: RoleId,
    /// Role played by the absorbed object type.
    pub child_role: RoleId,
    /// Members are flattened into the parent without a name prefix.
    pub flattens: bool,
    /// How nested collections are represented.
    pub nesting_mode: Option<String>,
    /// Nesting levels in order.
    pub nestings: Vec<Nesting>,
    /// Set on a reverse absorption: its forward counterpart.
    pub forward_absorption: Option<ComponentId>,
    /// Set on a forward absorption: its reverse counterpart.
    pub reverse_absorption: Option<ComponentId>,
    /// The foreign key this absorption gives rise to.
    pub foreign_key: Option<AccessPathId>,
    /// The full absorption this absorption creates.
    pub full_absorption: Option<FullAbsorptionId>,
}

impl Absorption {
    /// An unpaired absorption.
    #[must_use]
    pub fn new(parent_role: RoleId, child_role: RoleId) -> Self {
        Self {
            parent_role,
            child_role,
            flattens: false,
            nesting_mode: None,
            nestings: Vec::new(),
            forward_absorption: None,
            reverse_absorption: None,
            foreign_key: None,
            full_absorption: None,
        }
    }

    /// The mirrored counterpart, in whichever direction it is linked.
    #[must_use]
    pub fn mirror(&self) -> Option<ComponentId> {
        self.forward_absorption.or(self.reverse_absorption)
    }
}

/// A boolean column recording whether a unary role is played.
#[derive(Debug, Clone)]
pub struct Indicator {
    /// The unary role.
    pub role: RoleId,
    /// Stored value when the role is played.
    pub true_value: Option<Value>,
    /// Stored value when it is not.
    pub false_value: Option<Value>,
}

/// A unary role distinguished by a discriminator, with its stored value.
#[derive(Debug, Clone)]
pub struct DiscriminatedRole {
    /// The unary role.
    pub role: RoleId,
    /// Stored value when this role applies.
    pub value: Value,
}

/// A column whose value selects one of several mutually exclusive unary roles.
#[derive(Debug, Clone, Default)]
pub struct Discriminator {
    /// The roles distinguished.
    pub roles: Vec<DiscriminatedRole>,
}

/// Rank categories in ascending column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "lowercase"))]
pub enum RankCategory {
    /// An injected primary key.
    Surrogate,
    /// Supertype absorptions, identifying supertype first.
    Supertype,
    /// Components of the preferred identifier, in identifier order.
    Identifying,
    /// A value field.
    Value,
    /// Other injections.
    Injection,
    /// Discriminators.
    Discriminator,
    /// Reserved for foreign key components.
    Foreign,
    /// Indicators of non-identifying unaries.
    Indicator,
    /// Mandatory unique absorptions.
    Mandatory,
    /// Optional unique absorptions.
    Optional,
    /// Multi-valued absorptions.
    Multiple,
    /// Subtype absorptions.
    Subtype,
    /// Scopings.
    Scoping,
}

impl RankCategory {
    /// The category's display name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            RankCategory::Surrogate => "surrogate",
            RankCategory::Supertype => "supertype",
            RankCategory::Identifying => "existential",
            RankCategory::Value => "self-value",
            RankCategory::Injection => "injection",
            RankCategory::Discriminator => "discriminator",
            RankCategory::Foreign => "foreignkey",
            RankCategory::Indicator => "indicator",
            RankCategory::Mandatory => "mandatory",
            RankCategory::Optional => "optional",
            RankCategory::Multiple => "multiple",
            RankCategory::Subtype => "subtype",
            RankCategory::Scoping => "scoping",
        }
    }
}

/// A component's sort key among its siblings.
///
/// Fields compare in declaration order. The trailing component id makes the
/// order total.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RankKey {
    /// Leading category.
    pub category: RankCategory,
    /// Position within the category (identifier position, supertype rank, ...).
    pub position: usize,
    /// Name within the category.
    pub name: String,
    /// Secondary name (the parent role name for multi-valued absorptions).
    pub secondary: String,
    /// Final tie-break.
    pub tiebreak: ComponentId,
}

/// A member of a composite's mapping tree.
#[derive(Debug, Clone)]
pub struct Component {
    /// Column or group name.
    pub name: Option<String>,
    /// Rank among siblings, assigned by re-ranking.
    pub ordinal: Option<usize>,
    /// Enclosing component; `None` for a composite root.
    pub parent: Option<ComponentId>,
    /// Set on a composite's root mapping.
    pub composite: Option<CompositeId>,
    /// The object type mapped (mapping kinds only).
    pub object_type: Option<ObjectTypeId>,
    /// Child components.
    pub members: Vec<ComponentId>,
    /// The component's kind and payload.
    pub kind: ComponentKind,
    rank_key: OnceCell<RankKey>,
}

impl Component {
    /// A detached component of the given kind.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            name: None,
            ordinal: None,
            parent: None,
            composite: None,
            object_type: None,
            members: Vec::new(),
            kind,
            rank_key: OnceCell::new(),
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the mapped object type.
    #[must_use]
    pub fn of(mut self, object_type: ObjectTypeId) -> Self {
        self.object_type = Some(object_type);
        self
    }

    /// The absorption payload, if this is an absorption.
    #[must_use]
    pub fn as_absorption(&self) -> Option<&Absorption> {
        match &self.kind {
            ComponentKind::Absorption(a) => Some(a),
            _ => None,
        }
    }

    /// The cached rank key, if computed.
    #[must_use]
    pub fn cached_rank_key(&self) -> Option<&RankKey> {
        self.rank_key.get()
    }

    /// Caches `key` unless a key is already cached, and returns the cached key.
    pub fn cache_rank_key(&self, key: RankKey) -> &RankKey {
        self.rank_key.get_or_init(|| key)
    }

    /// Discards the cached rank key.
    pub fn uncache_rank_key(&mut self) {
        self.rank_key.take();
    }

    /// The rank category label, `"top"` for a root.
    #[must_use]
    pub fn rank_kind(&self) -> &'static str {
        if self.parent.is_none() {
            return "top";
        }
        self.cached_rank_key()
            .map_or("unranked", |k| k.category.label())
    }
}

/// One position of an index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexField {
    /// The indexed component.
    pub component: ComponentId,
    /// Discriminating value, if the field filters by value.
    pub value: Option<Value>,
}

impl From<ComponentId> for IndexField {
    fn from(component: ComponentId) -> Self {
        Self {
            component,
            value: None,
        }
    }
}

/// The two access path kinds.
#[derive(Debug, Clone)]
pub enum AccessPathKind {
    /// A unique or non-unique index.
    Index {
        /// No two rows share the indexed values.
        is_unique: bool,
        /// The constraint the index enforces.
        presence_constraint: Option<ConstraintId>,
    },
    /// A reference from another composite.
    ForeignKey {
        /// The referencing composite.
        source_composite: CompositeId,
        /// Referencing fields in the source composite, paired by position
        /// with the access path's index fields.
        foreign_key_fields: Vec<IndexField>,
        /// The absorption that gives rise to this foreign key.
        absorption: Option<ComponentId>,
    },
}

/// An index on, or foreign key into, a composite.
#[derive(Debug, Clone)]
pub struct AccessPath {
    /// The indexed (or referenced) composite.
    pub composite: CompositeId,
    /// Optional name.
    pub name: Option<String>,
    /// Indexed fields in order.
    pub index_fields: Vec<IndexField>,
    /// Index or foreign key payload.
    pub kind: AccessPathKind,
}

impl AccessPath {
    /// True for foreign keys.
    #[must_use]
    pub fn is_foreign_key(&self) -> bool {
        matches!(self.kind, AccessPathKind::ForeignKey { .. })
    }

    /// The position of `component` among the index fields.
    #[must_use]
    pub fn position_in_index(&self, component: ComponentId) -> Option<usize> {
        self.index_fields
            .iter()
            .position(|f| f.component == component)
    }
}

/// Records that an object type is wholly absorbed through one absorption.
#[derive(Debug, Clone)]
pub struct FullAbsorption {
    /// The absorbed object type.
    pub object_type: ObjectTypeId,
    /// The absorbing absorption.
    pub absorption: ComponentId,
}

/// A set of composites derived from one schema.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    /// Composition name.
    pub name: String,
    composites: Vec<Composite>,
    components: Vec<Component>,
    access_paths: Vec<AccessPath>,
    full_absorptions: Vec<FullAbsorption>,
}

impl Composition {
    /// Creates an empty composition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a composite.
    #[must_use]
    pub fn composite(&self, id: CompositeId) -> &Composite {
        &self.composites[id.index()]
    }

    /// Returns a composite, mutably.
    pub fn composite_mut(&mut self, id: CompositeId) -> &mut Composite {
        &mut self.composites[id.index()]
    }

    /// Returns a component.
    #[must_use]
    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.index()]
    }

    /// Returns a component, mutably.
    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.index()]
    }

    /// Returns an access path.
    #[must_use]
    pub fn access_path(&self, id: AccessPathId) -> &AccessPath {
        &self.access_paths[id.index()]
    }

    /// Returns an access path, mutably.
    pub fn access_path_mut(&mut self, id: AccessPathId) -> &mut AccessPath {
        &mut self.access_paths[id.index()]
    }

    /// Returns a full absorption.
    #[must_use]
    pub fn full_absorption(&self, id: FullAbsorptionId) -> &FullAbsorption {
        &self.full_absorptions[id.index()]
    }

    /// Iterates composites in creation order.
    pub fn composites(&self) -> impl Iterator<Item = (CompositeId, &Composite)> {
        self.composites
            .iter()
            .enumerate()
            .map(|(i, c)| (CompositeId::from_index(i), c))
    }

    /// Iterates components in creation order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> {
        self.components
            .iter()
            .enumerate()
            .map(|(i, c)| (ComponentId::from_index(i), c))
    }

    /// Iterates full absorptions in creation order.
    pub fn full_absorptions(&self) -> impl Iterator<Item = (FullAbsorptionId, &FullAbsorption)> {
        self.full_absorptions
            .iter()
            .enumerate()
            .map(|(i, f)| (FullAbsorptionId::from_index(i), f))
    }

    /// Adds `component` under `parent` (or detached, for a root).
    pub fn add(&mut self, parent: Option<ComponentId>, mut component: Component) -> ComponentId {
        let id = ComponentId::from_index(self.components.len());
        component.parent = parent;
        self.components.push(component);
        if let Some(parent) = parent {
            self.component_mut(parent).members.push(id);
            self.uncache_member_ranks(parent);
        }
        id
    }

    /// Moves `component` under a new parent, or detaches it.
    pub fn reparent(&mut self, component: ComponentId, parent: Option<ComponentId>) {
        if let Some(old) = self.component(component).parent {
            self.component_mut(old).members.retain(|&m| m != component);
            self.uncache_member_ranks(old);
        }
        let c = self.component_mut(component);
        c.parent = parent;
        c.ordinal = None;
        c.uncache_rank_key();
        if let Some(parent) = parent {
            self.component_mut(parent).members.push(component);
            self.uncache_member_ranks(parent);
        }
    }

    /// Discards the cached rank keys of a mapping's members.
    pub fn uncache_member_ranks(&mut self, mapping: ComponentId) {
        for member in self.component(mapping).members.clone() {
            self.component_mut(member).uncache_rank_key();
        }
    }

    /// Makes a root mapping the head of a new composite.
    pub fn add_composite(&mut self, mapping: ComponentId) -> CompositeId {
        let id = CompositeId::from_index(self.composites.len());
        self.composites.push(Composite {
            mapping,
            access_paths: Vec::new(),
            primary_index: None,
            natural_index: None,
            foreign_keys_as_source: Vec::new(),
        });
        self.component_mut(mapping).composite = Some(id);
        id
    }

    /// Adds an index on `composite`.
    pub fn add_index(
        &mut self,
        composite: CompositeId,
        name: Option<String>,
        is_unique: bool,
        presence_constraint: Option<ConstraintId>,
        fields: Vec<IndexField>,
    ) -> AccessPathId {
        let id = AccessPathId::from_index(self.access_paths.len());
        self.access_paths.push(AccessPath {
            composite,
            name,
            index_fields: fields,
            kind: AccessPathKind::Index {
                is_unique,
                presence_constraint,
            },
        });
        self.composite_mut(composite).access_paths.push(id);
        id
    }

    /// Adds a foreign key from `source` into `target`.
    ///
    /// `index_fields` lie in `target`, `foreign_key_fields` in `source`.
    pub fn add_foreign_key(
        &mut self,
        target: CompositeId,
        source: CompositeId,
        absorption: Option<ComponentId>,
        index_fields: Vec<IndexField>,
        foreign_key_fields: Vec<IndexField>,
    ) -> AccessPathId {
        let id = AccessPathId::from_index(self.access_paths.len());
        self.access_paths.push(AccessPath {
            composite: target,
            name: None,
            index_fields,
            kind: AccessPathKind::ForeignKey {
                source_composite: source,
                foreign_key_fields,
                absorption,
            },
        });
        self.composite_mut(target).access_paths.push(id);
        self.composite_mut(source).foreign_keys_as_source.push(id);
        if let Some(a) = absorption.and_then(|a| self.absorption_mut(a)) {
            a.foreign_key = Some(id);
        }
        id
    }

    /// Records that `absorption` fully absorbs `object_type`.
    pub fn add_full_absorption(
        &mut self,
        object_type: ObjectTypeId,
        absorption: ComponentId,
    ) -> FullAbsorptionId {
        let id = FullAbsorptionId::from_index(self.full_absorptions.len());
        self.full_absorptions.push(FullAbsorption {
            object_type,
            absorption,
        });
        if let Some(a) = self.absorption_mut(absorption) {
            a.full_absorption = Some(id);
        }
        id
    }

    /// The absorption payload of a component.
    #[must_use]
    pub fn absorption(&self, id: ComponentId) -> Option<&Absorption> {
        self.component(id).as_absorption()
    }

    /// The absorption payload of a component, mutably.
    pub fn absorption_mut(&mut self, id: ComponentId) -> Option<&mut Absorption> {
        match &mut self.component_mut(id).kind {
            ComponentKind::Absorption(a) => Some(a),
            _ => None,
        }
    }

    /// The topmost ancestor of a component.
    #[must_use]
    pub fn root_mapping(&self, id: ComponentId) -> ComponentId {
        let mut current = id;
        while let Some(parent) = self.component(current).parent {
            current = parent;
        }
        current
    }

    /// The composite a component is rooted in, if its tree is a composite.
    #[must_use]
    pub fn root(&self, id: ComponentId) -> Option<CompositeId> {
        self.component(self.root_mapping(id)).composite
    }

    /// The components from the root down to `id`.
    #[must_use]
    pub fn path(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut path = vec![id];
        let mut current = id;
        while let Some(parent) = self.component(current).parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// The ordinals along the path from the root down to `id`.
    #[must_use]
    pub fn rank_path(&self, id: ComponentId) -> Vec<Option<usize>> {
        self.path(id)
            .into_iter()
            .map(|c| self.component(c).ordinal)
            .collect()
    }

    /// Number of ancestors.
    #[must_use]
    pub fn depth(&self, id: ComponentId) -> usize {
        self.path(id).len() - 1
    }

    /// Members ordered by ordinal, then name.
    #[must_use]
    pub fn members_in_order(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut members = self.component(id).members.clone();
        members.sort_by(|&a, &b| {
            let (a, b) = (self.component(a), self.component(b));
            (a.ordinal, &a.name).cmp(&(b.ordinal, &b.name))
        });
        members
    }

    /// The leaf components under `id` in ordinal order, descending through
    /// nested mappings. A component with no members is its own leaf.
    #[must_use]
    pub fn leaves(&self, id: ComponentId) -> Vec<ComponentId> {
        let component = self.component(id);
        if component.members.is_empty() {
            return vec![id];
        }
        self.members_in_order(id)
            .into_iter()
            .flat_map(|m| self.leaves(m))
            .collect()
    }

    /// A column name from the names along the path below the root, with
    /// immediately repeated words removed: `Company` / `Company Name` gives
    /// `CompanyName`.
    #[must_use]
    pub fn column_name(&self, id: ComponentId) -> String {
        let mut words: Vec<String> = self
            .path(id)
            .into_iter()
            .skip(1)
            .filter_map(|c| self.component(c).name.as_deref())
            .flat_map(|name| Words::new(name).as_slice().to_vec())
            .collect();
        elide_repeated_subsequences(&mut words, |a, b| a.eq_ignore_ascii_case(b));
        Words::from_words(words).capcase()
    }

    /// Composites sorted by their root mapping's name.
    #[must_use]
    pub fn all_composite_by_name(&self) -> Vec<CompositeId> {
        let mut ids: Vec<_> = self.composites().map(|(id, _)| id).collect();
        ids.sort_by_key(|&id| self.component(self.composite(id).mapping).name.clone());
        ids
    }

    /// A composite's indices (not foreign keys) in the order of their fields' rank paths.
    #[must_use]
    pub fn all_indices_by_rank(&self, composite: CompositeId) -> Vec<AccessPathId> {
        let mut indices: Vec<_> = self
            .composite(composite)
            .access_paths
            .iter()
            .copied()
            .filter(|&ap| !self.access_path(ap).is_foreign_key())
            .collect();
        indices.sort_by_cached_key(|&ap| {
            self.access_path(ap)
                .index_fields
                .iter()
                .flat_map(|f| self.rank_path(f.component))
                .flatten()
                .collect::<Vec<_>>()
        });
        indices
    }

    /// The name of a composite's root mapping.
    #[must_use]
    pub fn composite_name(&self, composite: CompositeId) -> &str {
        self.component(self.composite(composite).mapping)
            .name
            .as_deref()
            .unwrap_or_default()
    }
}
