use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::plan::{Operator, Property, QueryPlan, Value};

/// Filter triple as sent by clients, e.g. `("MONTH", "GT", "6")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// One of `CITY`, `TOPIC`, `MONTH`, `MAX_ATTENDEES`.
    pub field: String,
    /// One of `EQ`, `GT`, `GTEQ`, `LT`, `LTEQ`, `NE`.
    pub operator: String,
    pub value: String,
}

impl FilterSpec {
    /// Convenience constructor.
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }
}

/// Client-filterable conference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// `CITY`
    City,
    /// `TOPIC`
    Topic,
    /// `MONTH`
    Month,
    /// `MAX_ATTENDEES`
    MaxAttendees,
}

impl Field {
    /// Parses the wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "CITY" => Some(Self::City),
            "TOPIC" => Some(Self::Topic),
            "MONTH" => Some(Self::Month),
            "MAX_ATTENDEES" => Some(Self::MaxAttendees),
            _ => None,
        }
    }

    /// Store property the field filters on.
    pub fn property(self) -> Property {
        match self {
            Self::City => Property::City,
            Self::Topic => Property::Topics,
            Self::Month => Property::Month,
            Self::MaxAttendees => Property::MaxAttendees,
        }
    }

    /// Integer-typed fields have their operand coerced.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Month | Self::MaxAttendees)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.property().name())
    }
}

impl Operator {
    /// Parses the wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "EQ" => Some(Self::Eq),
            "GT" => Some(Self::Gt),
            "GTEQ" => Some(Self::Ge),
            "LT" => Some(Self::Lt),
            "LTEQ" => Some(Self::Le),
            "NE" => Some(Self::Ne),
            _ => None,
        }
    }
}

/// Filter compilation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Unknown field or operator name.
    #[error("filter contains invalid field or operator: {field:?} {operator:?}")]
    InvalidFilter {
        field: String,
        operator: String,
    },
    /// Operand cannot be coerced to the field's type.
    #[error("filter value {value:?} is not valid for {field}")]
    InvalidValue {
        field: Field,
        value: String,
    },
    /// A second field carries an inequality.
    #[error("inequality filter is allowed on only one field (found {first} and {second})")]
    MultipleInequalityFields {
        first: Field,
        second: Field,
    },
}

/// A filter after parsing; only valid field/operator pairs exist at this point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFilter {
    pub field: Field,
    pub op: Operator,
    pub value: Value,
}

/// Parses one triple and coerces its operand.
pub fn parse_filter(spec: &FilterSpec) -> Result<ParsedFilter, FilterError> {
    let (Some(field), Some(op)) = (Field::from_wire(&spec.field), Operator::from_wire(&spec.operator))
    else {
        return Err(FilterError::InvalidFilter {
            field: spec.field.clone(),
            operator: spec.operator.clone(),
        });
    };

    let value = if field.is_numeric() {
        spec.value
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| FilterError::InvalidValue {
                field,
                value: spec.value.clone(),
            })?
    } else {
        Value::Text(spec.value.clone())
    };

    Ok(ParsedFilter { field, op, value })
}

/// Compiles client filters into a conference [`QueryPlan`].
///
/// The first field used with an inequality becomes the leading sort key, as
/// ordered-index engines require; conference name always follows. Equality
/// predicates carry no ordering constraint.
pub fn compile(filters: &[FilterSpec]) -> Result<QueryPlan, FilterError> {
    let mut inequality_field: Option<Field> = None;
    let mut parsed = Vec::with_capacity(filters.len());

    for spec in filters {
        let filter = parse_filter(spec)?;
        if filter.op.is_inequality() {
            match inequality_field {
                Some(first) if first != filter.field => {
                    return Err(FilterError::MultipleInequalityFields {
                        first,
                        second: filter.field,
                    });
                }
                Some(_) => {}
                None => inequality_field = Some(filter.field),
            }
        }
        parsed.push(filter);
    }

    let mut plan = QueryPlan::new();
    if let Some(field) = inequality_field {
        plan = plan.order(field.property());
    }
    plan = plan.order(Property::Name);

    for filter in parsed {
        plan = plan.filter(filter.field.property(), filter.op, filter.value);
    }
    Ok(plan)
}
