//! Column data types.

use orm_metamodel::datatypes::normalize_integer_length;
use orm_metamodel::{
    ComponentId, ComponentKind, Composition, DataTypeContext, Injection, ObjectTypeId, Schema,
    SemanticType, ValueType,
};

use crate::error::ComposeError;

/// The data type of a leaf column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// The semantic type, if the value type chain names one.
    pub semantic: Option<SemanticType>,
    /// Host type name, e.g. `VARCHAR` or `SMALLINT`.
    pub host_type: String,
    /// Length in characters, bytes or bits.
    pub length: Option<u32>,
    /// Fractional digits.
    pub scale: Option<u32>,
}

impl ColumnType {
    fn of(semantic: SemanticType, context: &dyn DataTypeContext) -> Self {
        Self {
            semantic: Some(semantic),
            host_type: context.host_type(semantic).to_owned(),
            length: None,
            scale: None,
        }
    }
}

/// Resolves the type of a leaf column.
///
/// Value types are resolved up their supertype chain: the first name that
/// normalises gives the semantic type, and the nearest declared length and
/// scale apply. Integers are narrowed with the effective value constraint.
/// Indicators take the context's boolean type and surrogate keys its
/// surrogate type.
///
/// # Errors
///
/// Returns [`ComposeError::UnsupportedComponent`] for mappings, scopings and
/// absorptions of entity types, which are not columns.
pub fn column_type(
    schema: &Schema,
    composition: &Composition,
    id: ComponentId,
    context: &dyn DataTypeContext,
) -> Result<ColumnType, ComposeError> {
    let component = composition.component(id);
    let unsupported = || ComposeError::UnsupportedComponent(composition.inspect(schema, id));
    match &component.kind {
        ComponentKind::Indicator(_) => Ok(ColumnType::of(SemanticType::Boolean, context)),
        ComponentKind::Discriminator(d) => Ok(ColumnType {
            length: d
                .roles
                .iter()
                .map(|dr| u32::try_from(dr.value.literal.chars().count()).unwrap_or(u32::MAX))
                .max(),
            ..ColumnType::of(SemanticType::String, context)
        }),
        ComponentKind::Injection(Injection::SurrogateKey) => Ok(ColumnType {
            host_type: context.surrogate_type().to_owned(),
            length: Some(64),
            ..ColumnType::of(SemanticType::Integer, context)
        }),
        ComponentKind::Injection(Injection::ValidFrom) => Ok(ColumnType::of(SemanticType::Timestamp, context)),
        ComponentKind::Injection(Injection::ValueField) | ComponentKind::Absorption(_) => {
            match component.object_type {
                Some(t) if schema.object_type(t).is_value_type() => Ok(value_column(schema, t, context)),
                _ => Err(unsupported()),
            }
        }
        ComponentKind::Mapping | ComponentKind::Scoping => Err(unsupported()),
    }
}

fn value_column(schema: &Schema, value_type: ObjectTypeId, context: &dyn DataTypeContext) -> ColumnType {
    let chain = schema.supertypes_transitive(value_type);
    let declared = |f: fn(&ValueType) -> Option<u32>| {
        chain
            .iter()
            .find_map(|&t| schema.object_type(t).as_value().and_then(f))
    };
    let length = declared(|v| v.length);
    let scale = declared(|v| v.scale);

    let Some((name, semantic)) = chain
        .iter()
        .find_map(|&t| SemanticType::normalize(schema.name(t)).map(|s| (schema.name(t), s)))
    else {
        let base = chain.last().map_or("", |&t| schema.name(t));
        return ColumnType {
            semantic: None,
            host_type: base.to_owned(),
            length,
            scale,
        };
    };

    if semantic == SemanticType::Integer {
        let constraint = schema
            .effective_value_constraint(value_type)
            .map(|vc| schema.value_constraint(vc));
        if let Some(int) = normalize_integer_length(name, length, constraint, context) {
            return ColumnType {
                semantic: Some(semantic),
                host_type: int.name,
                length: Some(int.bits),
                scale: None,
            };
        }
    }
    ColumnType {
        length: length.or_else(|| context.default_length(semantic, name)),
        scale,
        ..ColumnType::of(semantic, context)
    }
}
