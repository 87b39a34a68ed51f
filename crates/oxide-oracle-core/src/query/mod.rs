//! The dialect-agnostic query tree.
//!
//! A [`Statement`] is a select, insert, update or delete. Selects are
//! described by [`QueryExpression`], which is also what nested queries,
//! views and `jsonArray` subqueries use. The tree is a closed AST: every
//! function the dialect can render is a variant of [`Function`].

pub mod json;

use crate::value::{SqlValue, ToSqlValue};

/// The table (or view) a query reads from or writes to.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Table or view name.
    pub name: String,
    /// Optional alias used in the `FROM` clause.
    pub alias: Option<String>,
}

impl Entity {
    /// Creates an entity without an alias.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A reference to a column, optionally qualified by a table or alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias.
    pub table: Option<String>,
    /// Column name, or `*`.
    pub name: String,
}

impl ColumnRef {
    /// Parses `column` or `table.column`.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.rsplit_once('.') {
            Some((table, column)) => Self {
                table: Some(table.to_string()),
                name: column.to_string(),
            },
            None => Self {
                table: None,
                name: name.to_string(),
            },
        }
    }

    /// Returns the dotted form of the reference.
    #[must_use]
    pub fn qualified(&self) -> String {
        match &self.table {
            Some(table) => format!("{table}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column reference.
    Column(ColumnRef),
    /// A literal value.
    Value(SqlValue),
    /// A dialect function call.
    Function(Box<Function>),
    /// A nested select.
    Select(Box<QueryExpression>),
}

impl Expr {
    /// A column reference, `name` or `table.name`.
    #[must_use]
    pub fn column(name: &str) -> Self {
        Self::Column(ColumnRef::parse(name))
    }

    /// A literal value.
    #[must_use]
    pub fn value<T: ToSqlValue>(value: T) -> Self {
        Self::Value(value.to_sql_value())
    }

    /// A function call.
    #[must_use]
    pub fn function(function: Function) -> Self {
        Self::Function(Box::new(function))
    }

    /// A nested select.
    #[must_use]
    pub fn select(query: QueryExpression) -> Self {
        Self::Select(Box::new(query))
    }

    /// Whether this node extracts a value from a JSON document.
    #[must_use]
    pub fn is_json_get(&self) -> bool {
        matches!(self, Self::Function(f) if matches!(**f, Function::JsonGet(_)))
    }
}

impl From<SqlValue> for Expr {
    fn from(value: SqlValue) -> Self {
        Self::Value(value)
    }
}

impl From<Function> for Expr {
    fn from(function: Function) -> Self {
        Self::function(function)
    }
}

/// A projected expression with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The projected expression.
    pub expr: Expr,
    /// Output column name.
    pub alias: Option<String>,
}

impl Field {
    /// A field without alias.
    #[must_use]
    pub const fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    /// A column field, `name` or `table.name`.
    #[must_use]
    pub fn column(name: &str) -> Self {
        Self::new(Expr::column(name))
    }

    /// A field with an alias.
    #[must_use]
    pub fn aliased(alias: impl Into<String>, expr: Expr) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }

    /// Sets the alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name the field has in a result row: its alias, or the column
    /// name for plain column references.
    #[must_use]
    pub fn output_name(&self) -> Option<&str> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias),
            (None, Expr::Column(column)) => Some(&column.name),
            _ => None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// The sort key.
    pub expr: Expr,
    /// Sort direction.
    pub direction: Direction,
}

impl OrderBy {
    /// Ascending order on an expression.
    #[must_use]
    pub const fn asc(expr: Expr) -> Self {
        Self {
            expr,
            direction: Direction::Asc,
        }
    }

    /// Descending order on an expression.
    #[must_use]
    pub const fn desc(expr: Expr) -> Self {
        Self {
            expr,
            direction: Direction::Desc,
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// A joined entity (`$expand`).
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Join type.
    pub kind: JoinKind,
    /// Joined entity.
    pub entity: Entity,
    /// Join condition.
    pub on: Predicate,
}

impl Join {
    /// Creates a join.
    #[must_use]
    pub const fn new(kind: JoinKind, entity: Entity, on: Predicate) -> Self {
        Self { kind, entity, on }
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    /// Returns the SQL operator.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A filter condition (`$where`).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// None of the conditions hold.
    Nor(Vec<Predicate>),
    Compare {
        left: Expr,
        op: ComparisonOp,
        right: Expr,
    },
    /// `expr [NOT] IN (values)`. A single `Expr::Select` value renders as a subquery.
    In {
        expr: Expr,
        values: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Expr,
        low: Expr,
        high: Expr,
    },
    /// A boolean-valued function used directly as a condition.
    Expr(Expr),
}

impl Predicate {
    fn compare(left: Expr, op: ComparisonOp, right: Expr) -> Self {
        Self::Compare { left, op, right }
    }

    #[must_use]
    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::compare(left, ComparisonOp::Eq, right)
    }

    #[must_use]
    pub fn ne(left: Expr, right: Expr) -> Self {
        Self::compare(left, ComparisonOp::Ne, right)
    }

    #[must_use]
    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::compare(left, ComparisonOp::Gt, right)
    }

    #[must_use]
    pub fn gte(left: Expr, right: Expr) -> Self {
        Self::compare(left, ComparisonOp::Gte, right)
    }

    #[must_use]
    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::compare(left, ComparisonOp::Lt, right)
    }

    #[must_use]
    pub fn lte(left: Expr, right: Expr) -> Self {
        Self::compare(left, ComparisonOp::Lte, right)
    }

    #[must_use]
    pub fn is_in(expr: Expr, values: Vec<Expr>) -> Self {
        Self::In {
            expr,
            values,
            negated: false,
        }
    }

    #[must_use]
    pub fn not_in(expr: Expr, values: Vec<Expr>) -> Self {
        Self::In {
            expr,
            values,
            negated: true,
        }
    }

    #[must_use]
    pub fn between(expr: Expr, low: Expr, high: Expr) -> Self {
        Self::Between { expr, low, high }
    }

    /// Combines this predicate with another using `AND`.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut items) => {
                items.push(other);
                Self::And(items)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Combines this predicate with another using `OR`.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Or(mut items) => {
                items.push(other);
                Self::Or(items)
            }
            first => Self::Or(vec![first, other]),
        }
    }

    /// Negates the predicate.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// Which notion of "now" `getDate` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateKind {
    /// The current day, time truncated.
    Date,
    /// The current date and time.
    DateTime,
    /// The current timestamp in the session time zone.
    #[default]
    Timestamp,
}

/// The functions the dialect knows how to render.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    // string
    IndexOf(Expr, Expr),
    Substring {
        source: Expr,
        /// Zero-based start position.
        start: i64,
        length: Option<i64>,
    },
    Length(Expr),
    StartsWith(Expr, Expr),
    Contains(Expr, Expr),
    EndsWith(Expr, Expr),
    Regex(Expr, Expr),
    Text(Expr, Expr),
    Concat(Vec<Expr>),
    ToString(Expr),
    ToLower(Expr),
    ToUpper(Expr),
    Trim(Expr),

    // date
    Day(Expr),
    Month(Expr),
    Year(Expr),
    Hour(Expr),
    Minute(Expr),
    Second(Expr),
    Date(Expr),
    Now,
    GetDate(DateKind),

    // numeric
    Ceiling(Expr),
    Floor(Expr),
    Round(Expr, Option<Expr>),
    ToInt(Expr),
    ToDouble(Expr),
    ToDecimal {
        expr: Expr,
        precision: Option<u32>,
        scale: Option<u32>,
    },
    ToLong(Expr),
    BitAnd(Expr, Expr),
    Add(Expr, Expr),
    Subtract(Expr, Expr),
    Multiply(Expr, Expr),
    Divide(Expr, Expr),
    Modulo(Expr, Expr),

    // json
    /// `Table.column.path.to.property`.
    JsonGet(String),
    JsonObject(Vec<Field>),
    JsonArray(Expr),
    JsonGroupArray(Expr),
    JsonEach(Expr),

    // control
    IfNull(Expr, Expr),
    Cond {
        condition: Predicate,
        then: Expr,
        otherwise: Expr,
    },
    Uuid,
    ToGuid(Expr),

    // aggregates
    Count(Expr),
    Min(Expr),
    Max(Expr),
    Sum(Expr),
    Avg(Expr),

    // ranking
    RowIndex(Vec<OrderBy>),
}

/// A select query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryExpression {
    /// The source entity. `None` only for fixed selects.
    pub entity: Option<Entity>,
    /// Projection. Empty means every column.
    pub fields: Vec<Field>,
    /// Constant select with no source table.
    pub fixed: bool,
    pub distinct: bool,
    pub filter: Option<Predicate>,
    pub joins: Vec<Join>,
    pub order: Vec<OrderBy>,
    pub group: Vec<Expr>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl QueryExpression {
    /// Starts a select over an entity.
    #[must_use]
    pub fn from_entity(name: impl Into<String>) -> Self {
        Self {
            entity: Some(Entity::new(name)),
            ..Self::default()
        }
    }

    /// Starts a constant select (`FROM DUAL`).
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            fixed: true,
            ..Self::default()
        }
    }

    /// Sets the entity alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let Some(entity) = self.entity.take() {
            self.entity = Some(entity.alias(alias));
        }
        self
    }

    /// Appends projected fields.
    #[must_use]
    pub fn select(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Sets `DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a filter. Repeated calls are combined with `AND`.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Adds an `ORDER BY` term.
    #[must_use]
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    /// Adds a `GROUP BY` term.
    #[must_use]
    pub fn group_by(mut self, expr: Expr) -> Self {
        self.group.push(expr);
        self
    }

    /// Skips the first `n` rows.
    #[must_use]
    pub const fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    /// Returns at most `n` rows.
    #[must_use]
    pub const fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }

    /// Whether the query is paged.
    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.take.is_some_and(|take| take > 0)
    }
}

/// Column assignments of an insert or update.
pub type Assignments = Vec<(String, Expr)>;

/// A statement the dialect can compile.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(QueryExpression),
    Insert {
        entity: String,
        values: Assignments,
    },
    Update {
        entity: String,
        values: Assignments,
        filter: Option<Predicate>,
    },
    Delete {
        entity: String,
        filter: Option<Predicate>,
    },
}

impl Statement {
    /// The projection of a select, empty for mutations.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        match self {
            Self::Select(query) => &query.fields,
            _ => &[],
        }
    }
}

impl From<QueryExpression> for Statement {
    fn from(query: QueryExpression) -> Self {
        Self::Select(query)
    }
}
