use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Conference;

/// Queryable conference property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Property {
    /// `name`
    Name,
    /// `city`
    City,
    /// `topics` (multi-valued)
    Topics,
    /// `month`
    Month,
    /// `maxAttendees`
    MaxAttendees,
    /// `seatsAvailable`
    SeatsAvailable,
    /// `startDate`
    StartDate,
    /// `organizerUserId`
    OrganizerUserId,
}

impl Property {
    /// Store-native property name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::City => "city",
            Self::Topics => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "maxAttendees",
            Self::SeatsAvailable => "seatsAvailable",
            Self::StartDate => "startDate",
            Self::OrganizerUserId => "organizerUserId",
        }
    }

    /// Indexed values of this property on `conf`; empty when the property is unset.
    pub fn values_of(self, conf: &Conference) -> Vec<Value> {
        match self {
            Self::Name => vec![Value::Text(conf.name.clone())],
            Self::City => vec![Value::Text(conf.city.clone())],
            Self::Topics => conf.topics.iter().cloned().map(Value::Text).collect(),
            Self::Month => vec![Value::Int(i64::from(conf.month))],
            Self::MaxAttendees => vec![Value::Int(i64::from(conf.max_attendees))],
            Self::SeatsAvailable => vec![Value::Int(i64::from(conf.seats_available))],
            Self::StartDate => conf.start_date.map(Value::Date).into_iter().collect(),
            Self::OrganizerUserId => vec![Value::Text(conf.organizer_user_id.clone())],
        }
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed predicate operand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    /// Compares same-typed values; values of different types never compare.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `!=`
    Ne,
}

impl Operator {
    /// Store-native symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Ne => "!=",
        }
    }

    /// Everything but `=` constrains index order.
    pub fn is_inequality(self) -> bool {
        self != Self::Eq
    }

    /// Whether `lhs <op> rhs` holds given `lhs.cmp(rhs)`.
    pub fn accepts(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
            Self::Ne => ord != Ordering::Equal,
        }
    }
}

/// `property <op> value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub property: Property,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    /// Multi-valued properties match when any element does.
    pub fn matches(&self, conf: &Conference) -> bool {
        self.property
            .values_of(conf)
            .iter()
            .any(|v| v.compare(&self.value).is_some_and(|ord| self.op.accepts(ord)))
    }
}

/// Executable conference query: conjunctive predicates plus ascending sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    predicates: Vec<Predicate>,
    order: Vec<Property>,
}

impl QueryPlan {
    /// Unfiltered, unordered plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate.
    pub fn filter(mut self, property: Property, op: Operator, value: Value) -> Self {
        self.predicates.push(Predicate {
            property,
            op,
            value,
        });
        self
    }

    /// Appends an ascending sort key.
    pub fn order(mut self, property: Property) -> Self {
        if !self.order.contains(&property) {
            self.order.push(property);
        }
        self
    }

    /// Predicates in insertion order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Sort keys, most significant first.
    pub fn sort_keys(&self) -> &[Property] {
        &self.order
    }

    /// True when `conf` satisfies every predicate.
    pub fn matches(&self, conf: &Conference) -> bool {
        self.predicates.iter().all(|p| p.matches(conf))
    }

    /// Filters and orders `candidates`.
    ///
    /// Entities with no value for a sort property are left out, and
    /// multi-valued properties sort by their smallest element, as an ordered
    /// index would. Ties fall back to key order.
    pub fn execute<'a>(&self, candidates: impl Iterator<Item = &'a Conference>) -> Vec<Conference> {
        let mut rows: Vec<(Vec<Value>, &Conference)> = candidates
            .filter(|c| self.matches(c))
            .filter_map(|c| {
                let keys = self
                    .order
                    .iter()
                    .map(|p| p.values_of(c).into_iter().min())
                    .collect::<Option<Vec<_>>>()?;
                Some((keys, c))
            })
            .collect();

        rows.sort_by(|(ka, a), (kb, b)| ka.cmp(kb).then_with(|| a.key.cmp(&b.key)));
        rows.into_iter().map(|(_, c)| c.clone()).collect()
    }
}
