//! The in-memory statement engine.
//!
//! This engine interprets exactly the SQL subset the workspace's statement
//! builders emit — CREATE TABLE IF NOT EXISTS, INSERT ... RETURNING id,
//! positional UPDATE, DELETE and SELECT by id, full-table SELECT, and
//! BEGIN/COMMIT/ROLLBACK. Anything else fails loudly with a query error; it
//! is a test double for a relational backend, not a SQL database.
//!
//! Values arrive through the parameter list, never embedded in statement
//! text, so the interpreter only ever parses identifiers, placeholders, and
//! keywords.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use activerow_core::{ColumnInfo, Error, Result, Row, Value};

/// One stored table: declared columns (excluding id) and rows keyed by id.
#[derive(Debug, Clone)]
pub(crate) struct MemTable {
    columns: Vec<String>,
    rows: BTreeMap<i64, Vec<Value>>,
    next_id: i64,
}

/// What one interpreted statement produced.
#[derive(Debug, Default)]
pub(crate) struct ExecResult {
    pub rows: Vec<Row>,
    pub affected: u64,
    pub inserted_id: Option<i64>,
}

/// Engine state: live tables plus an optional pre-transaction snapshot.
#[derive(Debug, Default)]
pub(crate) struct Engine {
    tables: HashMap<String, MemTable>,
    snapshot: Option<HashMap<String, MemTable>>,
    closed: bool,
    database: String,
}

impl Engine {
    pub(crate) fn new(database: String) -> Self {
        Self {
            database,
            ..Self::default()
        }
    }

    pub(crate) fn database(&self) -> &str {
        &self.database
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    /// Flip into the closed state. Repeat closes are no-ops.
    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(Error::connection(
                activerow_core::ConnectionErrorKind::Closed,
                format!("gateway to '{}' is closed", self.database),
            ))
        } else {
            Ok(())
        }
    }

    /// Interpret one statement.
    pub(crate) fn execute_sql(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.ensure_open()?;
        let stmt = sql.trim().trim_end_matches(';').trim();
        tracing::trace!(sql = stmt, params = params.len(), "Interpreting statement");

        if let Some(rest) = strip_keyword(stmt, "CREATE TABLE IF NOT EXISTS") {
            self.create_table(rest, sql)
        } else if let Some(rest) = strip_keyword(stmt, "INSERT INTO") {
            self.insert(rest, params, sql)
        } else if let Some(rest) = strip_keyword(stmt, "UPDATE") {
            self.update(rest, params, sql)
        } else if let Some(rest) = strip_keyword(stmt, "DELETE FROM") {
            self.delete(rest, params, sql)
        } else if let Some(rest) = strip_keyword(stmt, "SELECT") {
            self.select(rest, params, sql)
        } else if strip_keyword(stmt, "BEGIN").is_some_and(str::is_empty) {
            self.begin().map(|()| ExecResult::default())
        } else if strip_keyword(stmt, "COMMIT").is_some_and(str::is_empty) {
            self.commit().map(|()| ExecResult::default())
        } else if strip_keyword(stmt, "ROLLBACK").is_some_and(str::is_empty) {
            self.rollback().map(|()| ExecResult::default())
        } else {
            Err(Error::query_sql("unsupported statement", sql))
        }
    }

    pub(crate) fn begin(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(Error::query("transaction already open"));
        }
        self.snapshot = Some(self.tables.clone());
        Ok(())
    }

    pub(crate) fn commit(&mut self) -> Result<()> {
        if self.snapshot.take().is_none() {
            return Err(Error::query("no transaction open"));
        }
        Ok(())
    }

    pub(crate) fn rollback(&mut self) -> Result<()> {
        match self.snapshot.take() {
            Some(tables) => {
                self.tables = tables;
                Ok(())
            }
            None => Err(Error::query("no transaction open")),
        }
    }

    /// Roll back an open transaction if one exists; used on handle drop.
    pub(crate) fn rollback_if_open(&mut self) {
        if self.snapshot.is_some() {
            let _ = self.rollback();
        }
    }

    fn table(&self, name: &str, sql: &str) -> Result<&MemTable> {
        self.tables.get(name).ok_or_else(|| {
            Error::query_sql(
                format!("no such table '{name}' in '{}'", self.database),
                sql,
            )
        })
    }

    fn table_mut(&mut self, name: &str, sql: &str) -> Result<&mut MemTable> {
        let database = self.database.clone();
        self.tables.get_mut(name).ok_or_else(|| {
            Error::query_sql(format!("no such table '{name}' in '{database}'"), sql)
        })
    }

    fn create_table(&mut self, rest: &str, sql: &str) -> Result<ExecResult> {
        let (table, rest) = parse_ident(rest)?;
        let (inner, _) = paren_group(rest)?;
        let mut defs = split_top_level(inner).into_iter();

        let first = defs
            .next()
            .ok_or_else(|| Error::query_sql("empty column list", sql))?;
        let (first_name, _) = parse_ident(first)?;
        if first_name != "id" {
            return Err(Error::query_sql(
                "first column must be the surrogate id",
                sql,
            ));
        }

        let mut columns = Vec::new();
        for def in defs {
            let (name, _) = parse_ident(def)?;
            columns.push(name);
        }

        // IF NOT EXISTS: an existing table wins, whatever its columns. There
        // is no reconciliation against a drifted declaration.
        self.tables.entry(table).or_insert(MemTable {
            columns,
            rows: BTreeMap::new(),
            next_id: 1,
        });
        Ok(ExecResult::default())
    }

    fn insert(&mut self, rest: &str, params: &[Value], sql: &str) -> Result<ExecResult> {
        let (table_name, rest) = parse_ident(rest)?;
        let (cols_inner, rest) = paren_group(rest)?;
        let rest = strip_keyword(rest, "VALUES")
            .ok_or_else(|| Error::query_sql("expected VALUES", sql))?;
        let (vals_inner, rest) = paren_group(rest)?;
        let rest = strip_keyword(rest, "RETURNING")
            .ok_or_else(|| Error::query_sql("INSERT must carry RETURNING id", sql))?;
        let (returned, _) = parse_ident(rest)?;
        if returned != "id" {
            return Err(Error::query_sql("only RETURNING id is supported", sql));
        }

        let mut stmt_columns = Vec::new();
        for part in split_top_level(cols_inner) {
            let (name, _) = parse_ident(part)?;
            stmt_columns.push(name);
        }
        let placeholders = parse_placeholder_list(vals_inner, params.len(), sql)?;
        if placeholders.len() != stmt_columns.len() {
            return Err(Error::query_sql(
                "column/value count mismatch in INSERT",
                sql,
            ));
        }

        let table = self.table_mut(&table_name, sql)?;
        let mut values = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let position = stmt_columns.iter().position(|c| c == column).ok_or_else(|| {
                Error::query_sql(format!("INSERT provides no value for column '{column}'"), sql)
            })?;
            values.push(params[placeholders[position] - 1].clone());
        }
        for column in &stmt_columns {
            if !table.columns.contains(column) {
                return Err(Error::query_sql(
                    format!("no such column '{column}' in table '{table_name}'"),
                    sql,
                ));
            }
        }

        let id = table.next_id;
        table.next_id += 1;
        table.rows.insert(id, values);

        let columns = Arc::new(ColumnInfo::new(vec!["id".to_string()]));
        Ok(ExecResult {
            rows: vec![Row::with_columns(columns, vec![Value::BigInt(id)])],
            affected: 1,
            inserted_id: Some(id),
        })
    }

    fn update(&mut self, rest: &str, params: &[Value], sql: &str) -> Result<ExecResult> {
        let (table_name, rest) = parse_ident(rest)?;
        let rest =
            strip_keyword(rest, "SET").ok_or_else(|| Error::query_sql("expected SET", sql))?;
        let (cols_inner, rest) = paren_group(rest)?;
        let rest = expect_symbol(rest, '=', sql)?;
        let (vals_inner, rest) = paren_group(rest)?;
        let rest =
            strip_keyword(rest, "WHERE").ok_or_else(|| Error::query_sql("expected WHERE", sql))?;
        let id = parse_id_predicate(rest, params, sql)?;

        let mut stmt_columns = Vec::new();
        for part in split_top_level(cols_inner) {
            let (name, _) = parse_ident(part)?;
            stmt_columns.push(name);
        }
        let placeholders = parse_placeholder_list(vals_inner, params.len(), sql)?;
        if placeholders.len() != stmt_columns.len() {
            return Err(Error::query_sql(
                "column/value count mismatch in UPDATE",
                sql,
            ));
        }

        let table = self.table_mut(&table_name, sql)?;
        let column_indices: Vec<usize> = stmt_columns
            .iter()
            .map(|c| {
                table.columns.iter().position(|tc| tc == c).ok_or_else(|| {
                    Error::query_sql(
                        format!("no such column '{c}' in table '{table_name}'"),
                        sql,
                    )
                })
            })
            .collect::<Result<_>>()?;

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(ExecResult::default());
        };
        for (stmt_pos, column_index) in column_indices.into_iter().enumerate() {
            row[column_index] = params[placeholders[stmt_pos] - 1].clone();
        }
        Ok(ExecResult {
            affected: 1,
            ..ExecResult::default()
        })
    }

    fn delete(&mut self, rest: &str, params: &[Value], sql: &str) -> Result<ExecResult> {
        let (table_name, rest) = parse_ident(rest)?;
        let rest =
            strip_keyword(rest, "WHERE").ok_or_else(|| Error::query_sql("expected WHERE", sql))?;
        let id = parse_id_predicate(rest, params, sql)?;

        let table = self.table_mut(&table_name, sql)?;
        let affected = u64::from(table.rows.remove(&id).is_some());
        Ok(ExecResult {
            affected,
            ..ExecResult::default()
        })
    }

    fn select(&mut self, rest: &str, params: &[Value], sql: &str) -> Result<ExecResult> {
        let (select_list, rest) = split_at_keyword(rest, "FROM")
            .ok_or_else(|| Error::query_sql("expected FROM", sql))?;
        let (table_name, tail) = parse_ident(rest)?;
        let tail = tail.trim();

        let mut listed = Vec::new();
        for part in select_list.split(',') {
            let (name, _) = parse_ident(part)?;
            listed.push(name);
        }

        let table = self.table(&table_name, sql)?;
        let mut expected = vec!["id".to_string()];
        expected.extend(table.columns.iter().cloned());
        if listed != expected {
            return Err(Error::query_sql(
                "SELECT list must be id followed by the declared columns",
                sql,
            ));
        }

        let columns = Arc::new(ColumnInfo::new(expected));
        let make_row = |id: i64, values: &[Value]| {
            let mut out = Vec::with_capacity(1 + values.len());
            out.push(Value::BigInt(id));
            out.extend(values.iter().cloned());
            Row::with_columns(Arc::clone(&columns), out)
        };

        let rows = if tail.is_empty() || strip_keyword(tail, "ORDER BY id").is_some_and(str::is_empty)
        {
            // BTreeMap iteration is already id-ascending.
            table
                .rows
                .iter()
                .map(|(id, v)| make_row(*id, v.as_slice()))
                .collect()
        } else if let Some(pred) = strip_keyword(tail, "WHERE") {
            let id = parse_id_predicate(pred, params, sql)?;
            table
                .rows
                .get(&id)
                .map(|v| make_row(id, v.as_slice()))
                .into_iter()
                .collect()
        } else {
            return Err(Error::query_sql("unsupported SELECT clause", sql));
        };

        Ok(ExecResult {
            rows,
            ..ExecResult::default()
        })
    }
}

// ==================== Statement text helpers ====================

/// Strip a leading keyword (ASCII case-insensitive, word-boundary aware),
/// returning the trimmed remainder.
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    let input = input.trim_start();
    if input.len() < keyword.len() {
        return None;
    }
    let (head, rest) = input.split_at(keyword.len());
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    if rest
        .chars()
        .next()
        .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
    {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Split `input` at the first occurrence of a standalone keyword, returning
/// the text before it and the trimmed text after it.
fn split_at_keyword<'a>(input: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let upper = input.to_ascii_uppercase();
    let needle = format!(" {keyword} ");
    let pos = upper.find(&needle)?;
    Some((&input[..pos], input[pos + needle.len()..].trim_start()))
}

/// Parse one identifier, quoted or bare.
fn parse_ident(input: &str) -> Result<(String, &str)> {
    let input = input.trim_start();
    if let Some(rest) = input.strip_prefix('"') {
        let end = rest
            .find('"')
            .ok_or_else(|| Error::query("unterminated quoted identifier"))?;
        Ok((rest[..end].to_string(), &rest[end + 1..]))
    } else {
        let end = input
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(input.len());
        if end == 0 {
            return Err(Error::query(format!("expected identifier at '{input}'")));
        }
        Ok((input[..end].to_string(), &input[end..]))
    }
}

/// Consume a balanced parenthesized group, returning the inner text and the
/// trimmed remainder.
fn paren_group(input: &str) -> Result<(&str, &str)> {
    let input = input.trim_start();
    let rest = input
        .strip_prefix('(')
        .ok_or_else(|| Error::query(format!("expected '(' at '{input}'")))?;
    let mut depth = 1usize;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&rest[..i], rest[i + 1..].trim_start()));
                }
            }
            _ => {}
        }
    }
    Err(Error::query("unbalanced parentheses"))
}

/// Split on commas that sit outside any parentheses.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = input[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

fn expect_symbol<'a>(input: &'a str, symbol: char, sql: &str) -> Result<&'a str> {
    let input = input.trim_start();
    input
        .strip_prefix(symbol)
        .map(str::trim_start)
        .ok_or_else(|| Error::query_sql(format!("expected '{symbol}'"), sql))
}

/// Parse one `$n` placeholder, validating the index against the parameter
/// count.
fn parse_placeholder<'a>(input: &'a str, param_count: usize, sql: &str) -> Result<(usize, &'a str)> {
    let input = input.trim_start();
    let rest = input
        .strip_prefix('$')
        .ok_or_else(|| Error::query_sql(format!("expected placeholder at '{input}'"), sql))?;
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let index: usize = rest[..end]
        .parse()
        .map_err(|_| Error::query_sql("malformed placeholder", sql))?;
    if index == 0 || index > param_count {
        return Err(Error::query_sql(
            format!("placeholder ${index} has no matching parameter"),
            sql,
        ));
    }
    Ok((index, &rest[end..]))
}

/// Parse a comma-separated list of placeholders.
fn parse_placeholder_list(input: &str, param_count: usize, sql: &str) -> Result<Vec<usize>> {
    split_top_level(input)
        .into_iter()
        .map(|part| parse_placeholder(part, param_count, sql).map(|(i, _)| i))
        .collect()
}

/// Parse an `id = $n` predicate and resolve it to the parameter's integer.
fn parse_id_predicate(input: &str, params: &[Value], sql: &str) -> Result<i64> {
    let (column, rest) = parse_ident(input)?;
    if column != "id" {
        return Err(Error::query_sql("only id predicates are supported", sql));
    }
    let rest = expect_symbol(rest, '=', sql)?;
    let (index, _) = parse_placeholder(rest, params.len(), sql)?;
    params[index - 1]
        .as_i64()
        .ok_or_else(|| Error::query_sql("id parameter must be an integer", sql))
}
