use crate::ast::*;
use crate::data_type::DataType;
use crate::error::{EngineError, Result};
use crate::table::{ColumnDef, TableConstraint};
use crate::tokenizer::{Token, Tokenizer};
use crate::value::Value;

/// How many tokens a syntax error quotes back.
const FRAGMENT_TOKENS: usize = 8;

/// Parses one statement of the dialect.
///
/// Empty or whitespace-only input gives [Statement::Unknown]; anything else
/// that does not match a supported grammar is an [EngineError::Syntax].
///
/// # Example
/// ```
/// use minidb::parse;
/// use minidb::ast::Statement;
///
/// let stmt = parse("DELETE FROM users WHERE id = 1;").unwrap();
/// assert!(matches!(stmt, Statement::Delete(_)));
/// assert_eq!(parse("   ").unwrap(), Statement::Unknown);
/// ```
pub fn parse(sql: &str) -> Result<Statement> {
    let tokens = Tokenizer::new(sql).tokenize()?;
    Parser::new(tokens).parse()
}

/// One entry of a `CREATE TABLE` column list.
enum TableItem {
    Column(ColumnDef),
    Constraint(TableConstraint),
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn parse(&mut self) -> Result<Statement> {
        if self.is_at_end() {
            return Ok(Statement::Unknown);
        }

        let statement = match self.current_token() {
            Token::Create => self.parse_create_table(),
            Token::Drop => self.parse_drop_table(),
            Token::Insert => self.parse_insert(),
            Token::Select => self.parse_select(),
            Token::Update => self.parse_update(),
            Token::Delete => self.parse_delete(),
            _ => Err(self.error("a statement keyword")),
        }?;

        // semicolon is optional so skip it
        if matches!(self.current_token(), Token::Semicolon) {
            self.advance();
        }

        // Check we are at the end of the statement
        if !self.is_at_end() {
            return Err(EngineError::Syntax(format!(
                "unexpected input after statement: '{}'",
                self.fragment()
            )));
        }

        Ok(statement)
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_is(&self, expected: &Token) -> bool {
        self.tokens.get(self.position + 1) == Some(expected)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token(), Token::Eof)
    }

    /// The next few tokens rendered back as text, for error messages.
    fn fragment(&self) -> String {
        let rest = &self.tokens[self.position..];
        if matches!(rest.first(), None | Some(Token::Eof)) {
            return Token::Eof.to_string();
        }
        render(
            rest.iter()
                .take_while(|t| **t != Token::Eof)
                .take(FRAGMENT_TOKENS),
        )
    }

    fn error(&self, expected: &str) -> EngineError {
        EngineError::Syntax(format!("expected {expected}, found '{}'", self.fragment()))
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        if *self.current_token() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&expected.to_string()))
        }
    }

    /// Consumes `expected` if it is the current token.
    fn eat(&mut self, expected: &Token) -> bool {
        if self.current_token() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume_ident(&mut self) -> Result<String> {
        match self.current_token() {
            Token::Ident(string) => {
                let string = string.clone(); // Get the name
                self.advance();
                Ok(string)
            }
            _ => Err(self.error("identifier")),
        }
    }

    /// `name` or `table.name`.
    fn consume_column_ref(&mut self) -> Result<String> {
        let mut name = self.consume_ident()?;
        if self.eat(&Token::Dot) {
            name.push('.');
            name.push_str(&self.consume_ident()?);
        }
        Ok(name)
    }

    fn consume_data_type(&mut self) -> Result<DataType> {
        let Token::Ident(name) = self.current_token() else {
            return Err(self.error("column type"));
        };
        let data_type = DataType::from_name(name).ok_or_else(|| {
            EngineError::Syntax(format!("unknown column type '{name}'"))
        })?;
        self.advance();
        Ok(data_type)
    }

    /// Parses a comma separated list enclosed in parentheses.
    fn parse_parenthesized<T, F>(&mut self, mut item: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        self.consume(Token::LeftParen)?;
        let mut items = vec![];
        loop {
            items.push(item(self)?);
            match self.current_token() {
                Token::RightParen => {
                    self.advance();
                    break;
                }
                Token::Comma => {
                    self.advance();
                    continue;
                }
                _ => return Err(self.error("',' or ')'")),
            }
        }
        Ok(items)
    }

    /// A literal: quoted string, bare number or word, `NULL`, or a
    /// parenthesized group kept as one value.
    fn parse_value(&mut self) -> Result<Value> {
        let value = match self.current_token() {
            Token::String(s) | Token::Number(s) | Token::Ident(s) => Value::Text(s.clone()),
            Token::Null => Value::Null,
            Token::LeftParen => return self.parse_group_value(),
            _ => return Err(self.error("value")),
        };
        self.advance();
        Ok(value)
    }

    /// Takes a balanced `( ... )` group verbatim. Commas inside it belong to
    /// the value and do not split the enclosing list.
    fn parse_group_value(&mut self) -> Result<Value> {
        let start = self.position;
        let mut depth = 0usize;
        loop {
            match self.current_token() {
                Token::LeftParen => depth += 1,
                Token::RightParen => depth -= 1,
                Token::Eof => {
                    return Err(EngineError::Syntax(format!(
                        "unbalanced parenthesis in '{}'",
                        render(&self.tokens[start..self.position])
                    )));
                }
                _ => {}
            }
            self.advance();
            if depth == 0 {
                break;
            }
        }
        Ok(Value::Text(render(&self.tokens[start..self.position])))
    }

    fn parse_condition(&mut self) -> Result<Condition> {
        let column = self.consume_column_ref()?;
        self.consume(Token::Equal)?;
        let value = self.parse_value()?;
        Ok(Condition { column, value })
    }

    fn parse_where(&mut self) -> Result<Option<Condition>> {
        if self.eat(&Token::Where) {
            Ok(Some(self.parse_condition()?))
        } else {
            Ok(None)
        }
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.consume_ident()?;
        let data_type = self.consume_data_type()?;
        let mut column = ColumnDef::new(name, data_type);

        loop {
            match self.current_token() {
                Token::Primary => {
                    self.advance();
                    self.consume(Token::Key)?;
                    column.primary_key = true;
                }
                Token::Unique => {
                    self.advance();
                    column.unique = true;
                }
                _ => break,
            }
        }

        Ok(column)
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.consume(Token::Create)?; // advance if CREATE
        self.consume(Token::Table)?; // advance if TABLE
        let name = self.consume_ident()?;

        let mut columns = vec![];
        let mut table_constraints = vec![];
        let items = self.parse_parenthesized(|p| {
            if *p.current_token() == Token::Unique && p.peek_is(&Token::LeftParen) {
                p.advance();
                let names = p.parse_parenthesized(Self::consume_ident)?;
                Ok(TableItem::Constraint(TableConstraint::unique(names)))
            } else {
                Ok(TableItem::Column(p.parse_column_def()?))
            }
        })?;
        for item in items {
            match item {
                TableItem::Column(column) => columns.push(column),
                TableItem::Constraint(constraint) => table_constraints.push(constraint),
            }
        }

        Ok(Statement::CreateTable(CreateTable {
            name,
            columns,
            table_constraints,
        }))
    }

    fn parse_drop_table(&mut self) -> Result<Statement> {
        self.consume(Token::Drop)?;
        self.consume(Token::Table)?;
        let if_exists = self.eat(&Token::If);
        if if_exists {
            self.consume(Token::Exists)?;
        }
        let name = self.consume_ident()?;
        Ok(Statement::DropTable(DropTable { name, if_exists }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.consume(Token::Insert)?;
        self.consume(Token::Into)?;
        let table = self.consume_ident()?;

        let columns = if *self.current_token() == Token::LeftParen {
            Some(self.parse_parenthesized(Self::consume_ident)?)
        } else {
            None
        };

        self.consume(Token::Values)?;
        let values = self.parse_parenthesized(Self::parse_value)?;

        if let Some(columns) = &columns
            && columns.len() != values.len()
        {
            return Err(EngineError::Syntax(format!(
                "{} columns but {} values in INSERT INTO {table}",
                columns.len(),
                values.len()
            )));
        }

        Ok(Statement::InsertInto(InsertInto {
            table,
            columns,
            values,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.consume(Token::Select)?;

        let columns = if self.eat(&Token::Star) {
            ColumnsSelect::Star
        } else {
            let mut names = vec![self.consume_column_ref()?];
            while self.eat(&Token::Comma) {
                names.push(self.consume_column_ref()?);
            }
            ColumnsSelect::ColumnsNames(names)
        };

        self.consume(Token::From)?;
        let table = self.consume_ident()?;

        let joined = self.eat(&Token::Inner);
        if joined || *self.current_token() == Token::Join {
            self.consume(Token::Join)?;
            let right_table = self.consume_ident()?;
            self.consume(Token::On)?;
            let left = self.consume_column_ref()?;
            self.consume(Token::Equal)?;
            let right = self.consume_column_ref()?;
            let condition = self.parse_where()?;

            return Ok(Statement::SelectJoin(SelectJoin {
                columns,
                left_table: table,
                right_table,
                on: JoinOn { left, right },
                condition,
            }));
        }

        let condition = self.parse_where()?;
        Ok(Statement::Select(Select {
            columns,
            table,
            condition,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.consume(Token::Update)?;
        let table = self.consume_ident()?;
        self.consume(Token::Set)?;

        let mut assignments = vec![];
        loop {
            let column = self.consume_ident()?;
            self.consume(Token::Equal)?;
            assignments.push((column, self.parse_value()?));
            if !self.eat(&Token::Comma) {
                break;
            }
        }

        self.consume(Token::Where)?;
        let condition = self.parse_condition()?;
        Ok(Statement::Update(Update {
            table,
            assignments,
            condition,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.consume(Token::Delete)?;
        self.consume(Token::From)?;
        let table = self.consume_ident()?;
        self.consume(Token::Where)?;
        let condition = self.parse_condition()?;
        Ok(Statement::Delete(Delete { table, condition }))
    }
}

/// Renders tokens back to SQL text with conventional spacing.
fn render<'a, I>(tokens: I) -> String
where
    I: IntoIterator<Item = &'a Token>,
{
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        let glued = matches!(token, Token::RightParen | Token::Comma | Token::Dot)
            || matches!(prev, None | Some(Token::LeftParen) | Some(Token::Dot));
        if !glued {
            out.push(' ');
        }
        out.push_str(&token.to_string());
        prev = Some(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ConstraintKind;

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    #[test]
    fn test_parse_create_table() {
        let statement =
            parse("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT UNIQUE);").unwrap();

        match statement {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.name, "users");
                assert_eq!(ct.columns.len(), 2);
                assert_eq!(ct.columns[0].name, "id");
                assert_eq!(ct.columns[0].data_type, DataType::Integer);
                assert!(ct.columns[0].primary_key);
                assert!(!ct.columns[0].unique);
                assert_eq!(ct.columns[1].name, "name");
                assert!(ct.columns[1].unique);
                assert!(ct.table_constraints.is_empty());
            }
            _ => panic!("Expected CreateTable"),
        }
    }

    #[test]
    fn test_parse_create_table_with_composite_unique() {
        let statement =
            parse("CREATE TABLE orders (order_id INTEGER, buyer TEXT, UNIQUE(order_id, buyer));")
                .unwrap();

        let Statement::CreateTable(ct) = statement else {
            panic!("Expected CreateTable");
        };
        assert_eq!(ct.columns.len(), 2);
        assert_eq!(ct.table_constraints.len(), 1);
        assert_eq!(ct.table_constraints[0].kind, ConstraintKind::Unique);
        assert_eq!(ct.table_constraints[0].columns, vec!["order_id", "buyer"]);
    }

    #[test]
    fn test_type_names_are_not_reserved() {
        let statement = parse("create table events (id int, date date, title text)").unwrap();

        let Statement::CreateTable(ct) = statement else {
            panic!("Expected CreateTable");
        };
        assert_eq!(ct.columns[1].name, "date");
        assert_eq!(ct.columns[1].data_type, DataType::Date);
    }

    #[test]
    fn test_unknown_column_type() {
        let err = parse("CREATE TABLE t (id VARCHAR)").unwrap_err();

        assert!(matches!(err, EngineError::Syntax(_)));
        assert!(err.to_string().contains("VARCHAR"));
    }

    #[test]
    fn test_parse_insert_with_quotes_and_commas() {
        let statement = parse(
            "INSERT INTO users (id, name, email) VALUES (1, 'O''Brien', 'a, b@example.com');",
        )
        .unwrap();

        assert_eq!(
            statement,
            Statement::InsertInto(InsertInto {
                table: "users".into(),
                columns: Some(vec!["id".into(), "name".into(), "email".into()]),
                values: vec![text("1"), text("O'Brien"), text("a, b@example.com")],
            })
        );
    }

    #[test]
    fn test_parse_insert_positional_and_null() {
        let statement = parse("insert into t values (TRUE, NULL, 2024-01-31)").unwrap();

        let Statement::InsertInto(insert) = statement else {
            panic!("Expected InsertInto");
        };
        assert_eq!(insert.columns, None);
        assert_eq!(insert.values, vec![text("TRUE"), Value::Null, text("2024-01-31")]);
    }

    #[test]
    fn test_parenthesized_value_is_one_value() {
        let statement = parse("INSERT INTO t (a, b) VALUES ((1, 2), 'x')").unwrap();

        let Statement::InsertInto(insert) = statement else {
            panic!("Expected InsertInto");
        };
        assert_eq!(insert.values, vec![text("(1, 2)"), text("x")]);
    }

    #[test]
    fn test_insert_count_mismatch() {
        let err = parse("INSERT INTO t (a, b) VALUES (1)").unwrap_err();

        assert!(matches!(err, EngineError::Syntax(_)));
    }

    #[test]
    fn test_parse_select_simple() {
        let statement = parse("SELECT * FROM users WHERE id=1;").unwrap();

        assert_eq!(
            statement,
            Statement::Select(Select {
                columns: ColumnsSelect::Star,
                table: "users".into(),
                condition: Some(Condition {
                    column: "id".into(),
                    value: text("1"),
                }),
            })
        );
    }

    #[test]
    fn test_parse_select_projection_without_where() {
        let statement = parse("SELECT name, email FROM users").unwrap();

        let Statement::Select(select) = statement else {
            panic!("Expected Select");
        };
        assert_eq!(
            select.columns,
            ColumnsSelect::ColumnsNames(vec!["name".into(), "email".into()])
        );
        assert_eq!(select.condition, None);
    }

    #[test]
    fn test_parse_select_join_with_condition() {
        let statement = parse(
            "SELECT users.name, events.title FROM users \
             INNER JOIN events ON users.id = events.user_id \
             WHERE events.title='Meetup';",
        )
        .unwrap();

        assert_eq!(
            statement,
            Statement::SelectJoin(SelectJoin {
                columns: ColumnsSelect::ColumnsNames(vec![
                    "users.name".into(),
                    "events.title".into()
                ]),
                left_table: "users".into(),
                right_table: "events".into(),
                on: JoinOn {
                    left: "users.id".into(),
                    right: "events.user_id".into(),
                },
                condition: Some(Condition {
                    column: "events.title".into(),
                    value: text("Meetup"),
                }),
            })
        );
    }

    #[test]
    fn test_parse_update_multiple_assignments() {
        let statement =
            parse("UPDATE users SET name='Alice', email='alice@example.com' WHERE id=1;").unwrap();

        assert_eq!(
            statement,
            Statement::Update(Update {
                table: "users".into(),
                assignments: vec![
                    ("name".into(), text("Alice")),
                    ("email".into(), text("alice@example.com")),
                ],
                condition: Condition {
                    column: "id".into(),
                    value: text("1"),
                },
            })
        );
    }

    #[test]
    fn test_parse_delete() {
        let statement = parse("DELETE FROM users WHERE id=1;").unwrap();

        assert_eq!(
            statement,
            Statement::Delete(Delete {
                table: "users".into(),
                condition: Condition {
                    column: "id".into(),
                    value: text("1"),
                },
            })
        );
    }

    #[test]
    fn test_delete_requires_where() {
        assert!(matches!(
            parse("DELETE FROM users"),
            Err(EngineError::Syntax(_))
        ));
    }

    #[test]
    fn test_parse_drop_table() {
        assert_eq!(
            parse("DROP TABLE users").unwrap(),
            Statement::DropTable(DropTable {
                name: "users".into(),
                if_exists: false,
            })
        );
        assert_eq!(
            parse("drop table if exists users;").unwrap(),
            Statement::DropTable(DropTable {
                name: "users".into(),
                if_exists: true,
            })
        );
    }

    #[test]
    fn test_empty_input_is_unknown() {
        assert_eq!(parse("").unwrap(), Statement::Unknown);
        assert_eq!(parse("  \n\t ").unwrap(), Statement::Unknown);
    }

    #[test]
    fn test_unrecognized_keyword_is_syntax_error() {
        let err = parse("EXPLAIN SELECT * FROM t").unwrap_err();

        assert!(matches!(err, EngineError::Syntax(_)));
        assert!(err.to_string().contains("EXPLAIN SELECT * FROM t"));
    }

    #[test]
    fn test_trailing_garbage() {
        let err = parse("SELECT * FROM users WHERE id = 1 extra").unwrap_err();

        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn test_where_supports_single_equality_only() {
        assert!(parse("SELECT * FROM users WHERE id = 1 AND name = 'x'").is_err());
    }
}
