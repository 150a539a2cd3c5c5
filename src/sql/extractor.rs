//! Table-reference extraction
//!
//! Walks the statement AST and collects every table a statement reads from or
//! writes to. Only the node kinds matched below contribute; anything else is
//! skipped, so CTE bodies and table-valued function calls are not seen.

use sqlparser::ast::{
    Delete, Expr, FromTable, Function, FunctionArg, FunctionArgExpr, FunctionArguments,
    GroupByExpr, Insert, Join, JoinConstraint, JoinOperator, ObjectName, Query, Select,
    SelectItem, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::{dialect_from_str, Dialect, PostgreSqlDialect};
use sqlparser::parser::{Parser, ParserError};
use std::collections::BTreeSet;

/// Dialect used when none is configured
pub const DEFAULT_DIALECT: &str = "postgresql";

/// SQL text that could not be parsed for the configured dialect
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(#[from] ParserError);

/// Parses statements and extracts referenced table names.
#[derive(Debug)]
pub struct TableExtractor {
    dialect: Box<dyn Dialect>,
}

impl Default for TableExtractor {
    fn default() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }
}

impl TableExtractor {
    /// Create an extractor for a named dialect (`postgresql`, `mysql`, `generic`, ...)
    pub fn new(dialect: &str) -> crate::Result<Self> {
        let dialect = dialect_from_str(dialect)
            .ok_or_else(|| crate::Error::UnknownDialect(dialect.to_string()))?;
        Ok(Self { dialect })
    }

    /// Every table referenced by `sql`, duplicates included, in traversal order.
    pub fn extract_tables(&self, sql: &str) -> Result<Vec<String>, ParseError> {
        let statements = Parser::parse_sql(&*self.dialect, sql)?;
        let mut tables = Vec::new();
        for statement in &statements {
            visit_statement(statement, &mut tables);
        }
        Ok(tables)
    }

    /// Deduplicated, sorted table set
    pub fn extract_table_set(&self, sql: &str) -> Result<BTreeSet<String>, ParseError> {
        Ok(self.extract_tables(sql)?.into_iter().collect())
    }
}

fn table_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn visit_statement(statement: &Statement, out: &mut Vec<String>) {
    match statement {
        Statement::Query(query) => visit_query(query, out),
        Statement::Insert(insert) => visit_insert(insert, out),
        Statement::Update {
            table,
            from,
            selection,
            ..
        } => {
            visit_table_with_joins(table, out);
            if let Some(from) = from {
                visit_table_with_joins(from, out);
            }
            if let Some(selection) = selection {
                visit_expr(selection, out);
            }
        }
        Statement::Delete(delete) => visit_delete(delete, out),
        _ => {}
    }
}

fn visit_insert(insert: &Insert, out: &mut Vec<String>) {
    out.push(table_name(&insert.table_name));
    if let Some(source) = &insert.source {
        visit_query(source, out);
    }
}

fn visit_delete(delete: &Delete, out: &mut Vec<String>) {
    for name in &delete.tables {
        out.push(table_name(name));
    }

    let from = match &delete.from {
        FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
    };
    for table in from {
        visit_table_with_joins(table, out);
    }

    if let Some(using) = &delete.using {
        for table in using {
            visit_table_with_joins(table, out);
        }
    }
    if let Some(selection) = &delete.selection {
        visit_expr(selection, out);
    }
}

fn visit_query(query: &Query, out: &mut Vec<String>) {
    visit_set_expr(&query.body, out);
}

fn visit_set_expr(body: &SetExpr, out: &mut Vec<String>) {
    match body {
        SetExpr::Select(select) => visit_select(select, out),
        SetExpr::Query(query) => visit_query(query, out),
        SetExpr::SetOperation { left, right, .. } => {
            visit_set_expr(left, out);
            visit_set_expr(right, out);
        }
        SetExpr::Insert(statement) | SetExpr::Update(statement) => visit_statement(statement, out),
        _ => {}
    }
}

fn visit_select(select: &Select, out: &mut Vec<String>) {
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                visit_expr(expr, out)
            }
            _ => {}
        }
    }

    for table in &select.from {
        visit_table_with_joins(table, out);
    }

    if let Some(selection) = &select.selection {
        visit_expr(selection, out);
    }

    if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
        for expr in exprs {
            visit_expr(expr, out);
        }
    }

    if let Some(having) = &select.having {
        visit_expr(having, out);
    }
}

fn visit_table_with_joins(table: &TableWithJoins, out: &mut Vec<String>) {
    visit_table_factor(&table.relation, out);
    for join in &table.joins {
        visit_join(join, out);
    }
}

fn visit_join(join: &Join, out: &mut Vec<String>) {
    visit_table_factor(&join.relation, out);
    if let Some(JoinConstraint::On(condition)) = join_constraint(&join.join_operator) {
        visit_expr(condition, out);
    }
}

fn join_constraint(operator: &JoinOperator) -> Option<&JoinConstraint> {
    match operator {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint)
        | JoinOperator::LeftSemi(constraint)
        | JoinOperator::RightSemi(constraint)
        | JoinOperator::LeftAnti(constraint)
        | JoinOperator::RightAnti(constraint) => Some(constraint),
        _ => None,
    }
}

fn visit_table_factor(factor: &TableFactor, out: &mut Vec<String>) {
    match factor {
        TableFactor::Table { name, .. } => out.push(table_name(name)),
        TableFactor::Derived { subquery, .. } => visit_query(subquery, out),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => visit_table_with_joins(table_with_joins, out),
        _ => {}
    }
}

fn visit_expr(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => visit_query(subquery, out),
        Expr::InSubquery { expr, subquery, .. } => {
            visit_expr(expr, out);
            visit_query(subquery, out);
        }
        Expr::BinaryOp { left, right, .. }
        | Expr::AnyOp { left, right, .. }
        | Expr::AllOp { left, right, .. }
        | Expr::IsDistinctFrom(left, right)
        | Expr::IsNotDistinctFrom(left, right) => {
            visit_expr(left, out);
            visit_expr(right, out);
        }
        Expr::Like { expr, pattern, .. }
        | Expr::ILike { expr, pattern, .. }
        | Expr::SimilarTo { expr, pattern, .. }
        | Expr::RLike { expr, pattern, .. } => {
            visit_expr(expr, out);
            visit_expr(pattern, out);
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr)
        | Expr::IsTrue(expr)
        | Expr::IsNotTrue(expr)
        | Expr::IsFalse(expr)
        | Expr::IsNotFalse(expr)
        | Expr::IsUnknown(expr)
        | Expr::IsNotUnknown(expr)
        | Expr::Cast { expr, .. } => visit_expr(expr, out),
        Expr::InList { expr, list, .. } => {
            visit_expr(expr, out);
            for item in list {
                visit_expr(item, out);
            }
        }
        Expr::Tuple(items) => {
            for item in items {
                visit_expr(item, out);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            visit_expr(expr, out);
            visit_expr(low, out);
            visit_expr(high, out);
        }
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => {
            if let Some(operand) = operand {
                visit_expr(operand, out);
            }
            for item in conditions.iter().chain(results) {
                visit_expr(item, out);
            }
            if let Some(else_result) = else_result {
                visit_expr(else_result, out);
            }
        }
        Expr::Function(function) => visit_function(function, out),
        _ => {}
    }
}

fn visit_function(function: &Function, out: &mut Vec<String>) {
    for arguments in [&function.parameters, &function.args] {
        match arguments {
            FunctionArguments::Subquery(query) => visit_query(query, out),
            FunctionArguments::List(list) => {
                for arg in &list.args {
                    let (FunctionArg::Named { arg, .. } | FunctionArg::Unnamed(arg)) = arg;
                    if let FunctionArgExpr::Expr(expr) = arg {
                        visit_expr(expr, out);
                    }
                }
            }
            FunctionArguments::None => {}
        }
    }
    if let Some(filter) = &function.filter {
        visit_expr(filter, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(sql: &str) -> BTreeSet<String> {
        TableExtractor::default().extract_table_set(sql).unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_select() {
        assert_eq!(
            tables("SELECT arn, name FROM aws_s3_bucket WHERE region = 'us-east-1'"),
            set(&["aws_s3_bucket"])
        );
    }

    #[test]
    fn test_join_and_condition_subquery() {
        let sql = "SELECT b.name FROM aws_s3_bucket b \
                   LEFT JOIN aws_account a ON a.account_id = b.account_id \
                   AND a.id IN (SELECT account_id FROM aws_organization_member)";
        assert_eq!(
            tables(sql),
            set(&["aws_account", "aws_organization_member", "aws_s3_bucket"])
        );
    }

    #[test]
    fn test_union_and_exists() {
        let sql = "SELECT id FROM azure_vm \
                   UNION ALL \
                   SELECT id FROM azure_disk d WHERE EXISTS (SELECT 1 FROM azure_snapshot s WHERE s.disk = d.id)";
        assert_eq!(tables(sql), set(&["azure_disk", "azure_snapshot", "azure_vm"]));
    }

    #[test]
    fn test_derived_table_projection_and_having() {
        let sql = "SELECT x.region, (SELECT count(*) FROM aws_iam_user) AS users \
                   FROM (SELECT region FROM aws_ec2_instance) AS x \
                   GROUP BY x.region \
                   HAVING count(*) > (SELECT 1 FROM aws_limits)";
        assert_eq!(
            tables(sql),
            set(&["aws_ec2_instance", "aws_iam_user", "aws_limits"])
        );
    }

    #[test]
    fn test_case_expression_subqueries() {
        let sql = "SELECT CASE WHEN EXISTS (SELECT 1 FROM aws_kms_key k WHERE k.arn = b.key_arn) \
                   THEN 'encrypted' ELSE (SELECT label FROM labels LIMIT 1) END \
                   FROM aws_s3_bucket b";
        assert_eq!(
            tables(sql),
            set(&["aws_kms_key", "aws_s3_bucket", "labels"])
        );
    }

    #[test]
    fn test_function_argument_subqueries() {
        let sql = "SELECT coalesce((SELECT max(size) FROM aws_ebs_volume), 0) AS largest, \
                   count(*) FILTER (WHERE id IN (SELECT id FROM flagged)) \
                   FROM aws_ec2_instance";
        assert_eq!(
            tables(sql),
            set(&["aws_ebs_volume", "aws_ec2_instance", "flagged"])
        );
    }

    #[test]
    fn test_any_and_all_subqueries() {
        assert_eq!(
            tables("SELECT id FROM users WHERE id = ANY ((SELECT user_id FROM admins))"),
            set(&["admins", "users"])
        );
        assert_eq!(
            tables("SELECT id FROM users WHERE age > ALL ((SELECT min_age FROM policies))"),
            set(&["policies", "users"])
        );
    }

    #[test]
    fn test_predicate_subqueries() {
        assert_eq!(
            tables("SELECT id FROM users WHERE name LIKE (SELECT pattern FROM patterns LIMIT 1)"),
            set(&["patterns", "users"])
        );
        assert_eq!(
            tables("SELECT id FROM users WHERE name ILIKE (SELECT pattern FROM ipatterns LIMIT 1)"),
            set(&["ipatterns", "users"])
        );
        assert_eq!(
            tables("SELECT id FROM users WHERE name SIMILAR TO (SELECT pattern FROM regexes LIMIT 1)"),
            set(&["regexes", "users"])
        );
        assert_eq!(
            tables("SELECT id FROM users WHERE (SELECT enabled FROM flags LIMIT 1) IS TRUE"),
            set(&["flags", "users"])
        );
        assert_eq!(
            tables("SELECT id FROM users WHERE (SELECT locked FROM locks LIMIT 1) IS FALSE"),
            set(&["locks", "users"])
        );
        assert_eq!(
            tables("SELECT id FROM users WHERE region IS DISTINCT FROM (SELECT region FROM home LIMIT 1)"),
            set(&["home", "users"])
        );
    }

    #[test]
    fn test_tuple_subqueries() {
        assert_eq!(
            tables("SELECT id FROM users WHERE (id, (SELECT max(id) FROM archived)) IN ((1, 2))"),
            set(&["archived", "users"])
        );
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(tables("SELECT * FROM public.\"accounts\""), set(&["public.accounts"]));
    }

    #[test]
    fn test_insert_update_delete() {
        assert_eq!(
            tables("INSERT INTO findings (id) SELECT id FROM aws_s3_bucket"),
            set(&["aws_s3_bucket", "findings"])
        );
        assert_eq!(
            tables("UPDATE findings SET state = 'ok' FROM resources r WHERE findings.id = r.id AND r.kind IN (SELECT kind FROM kinds)"),
            set(&["findings", "kinds", "resources"])
        );
        assert_eq!(
            tables("DELETE FROM findings USING resources r WHERE findings.id = r.id"),
            set(&["findings", "resources"])
        );
    }

    #[test]
    fn test_duplicates_kept_in_raw_result() {
        let raw = TableExtractor::default()
            .extract_tables("SELECT * FROM a JOIN a AS a2 ON a.id = a2.id")
            .unwrap();
        assert_eq!(raw, vec!["a".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_cte_bodies_are_not_walked() {
        let found = tables("WITH recent AS (SELECT * FROM aws_cloudtrail) SELECT * FROM recent");
        assert!(found.contains("recent"));
        assert!(!found.contains("aws_cloudtrail"));
    }

    #[test]
    fn test_parse_error() {
        assert!(TableExtractor::default().extract_tables("SELEC * FORM").is_err());
    }

    #[test]
    fn test_unknown_dialect() {
        assert!(TableExtractor::new("postgresql").is_ok());
        assert!(matches!(
            TableExtractor::new("cobol"),
            Err(crate::Error::UnknownDialect(_))
        ));
    }
}
