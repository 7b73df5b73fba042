//! Argument bundles for reads and aggregates.

use crate::sql::filter::{OrderBy, Where};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindArgs {
    pub where_: Where,
    pub order_by: Vec<OrderBy>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
    /// Relation names to embed in each returned row.
    pub include: Vec<String>,
}

impl FindArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(mut self, filter: Where) -> Self {
        self.where_ = filter;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn take(mut self, n: i64) -> Self {
        self.take = Some(n);
        self
    }

    pub fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn include(mut self, relation: impl Into<String>) -> Self {
        self.include.push(relation.into());
        self
    }
}

impl From<Where> for FindArgs {
    fn from(filter: Where) -> Self {
        Self::new().where_(filter)
    }
}

/// Which aggregates to compute over the rows matching `where_`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateArgs {
    pub where_: Where,
    pub count: bool,
    pub sum: Vec<String>,
    pub avg: Vec<String>,
    pub min: Vec<String>,
    pub max: Vec<String>,
}

impl AggregateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_(mut self, filter: Where) -> Self {
        self.where_ = filter;
        self
    }

    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn sum(mut self, column: impl Into<String>) -> Self {
        self.sum.push(column.into());
        self
    }

    pub fn avg(mut self, column: impl Into<String>) -> Self {
        self.avg.push(column.into());
        self
    }

    pub fn min(mut self, column: impl Into<String>) -> Self {
        self.min.push(column.into());
        self
    }

    pub fn max(mut self, column: impl Into<String>) -> Self {
        self.max.push(column.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupByArgs {
    pub by: Vec<String>,
    /// Aggregates per group; its `where_` filters rows before grouping.
    pub aggregate: AggregateArgs,
    pub order_by: Vec<OrderBy>,
    pub take: Option<i64>,
    pub skip: Option<i64>,
}

impl GroupByArgs {
    pub fn by<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            by: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn aggregate(mut self, aggregate: AggregateArgs) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn where_(mut self, filter: Where) -> Self {
        self.aggregate.where_ = filter;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn take(mut self, n: i64) -> Self {
        self.take = Some(n);
        self
    }

    pub fn skip(mut self, n: i64) -> Self {
        self.skip = Some(n);
        self
    }
}
