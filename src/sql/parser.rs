//! Command Parser
//!
//! This module parses command tokens into a [`Statement`].

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::error::{Error, Result};

/// Recursive-descent command parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a command string
    pub fn new(command: &str) -> Result<Self> {
        let mut lexer = Lexer::new(command);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Tokenize and parse one command
    pub fn parse_command(command: &str) -> Result<Statement> {
        Parser::new(command)?.parse()
    }

    /// Parse a single command, which must span the whole input
    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            return Err(self.unexpected("end of command"));
        }

        Ok(stmt)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Create => self.parse_create(),
            Token::Drop => self.parse_drop(),
            Token::Use => {
                self.advance();
                Ok(Statement::Use(self.expect_identifier()?))
            }
            Token::List => self.parse_list(),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Select => self.parse_select().map(Statement::Select),
            _ => Err(self.unexpected("CREATE, DROP, USE, LIST, INSERT, DELETE or SELECT")),
        }
    }

    // ========== DDL Statements ==========

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;

        match self.current() {
            Token::Database => {
                self.advance();
                Ok(Statement::CreateDatabase(self.expect_identifier()?))
            }
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            Token::Unique => {
                self.advance();
                self.parse_create_index(true).map(Statement::CreateIndex)
            }
            Token::Index => self.parse_create_index(false).map(Statement::CreateIndex),
            _ => Err(self.unexpected("DATABASE, TABLE, INDEX or UNIQUE INDEX")),
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Table)?;
        let name = self.expect_identifier()?;

        let parenthesized = self.check(&Token::LParen);
        if parenthesized {
            self.advance();
        }

        let mut columns = Vec::new();
        if !self.at_statement_end() {
            loop {
                columns.push(self.parse_column_def()?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
        }

        if parenthesized {
            self.expect(&Token::RParen)?;
        }

        Ok(CreateTableStatement { name, columns })
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier()?;
        let type_name = self.expect_identifier()?;

        // Length: `varchar 20` or `varchar(20)`
        let length = match self.current() {
            Token::IntegerLiteral(n) => {
                let n = *n;
                self.advance();
                Some(n)
            }
            Token::LParen => {
                self.advance();
                let n = self.expect_integer()?;
                self.expect(&Token::RParen)?;
                Some(n)
            }
            _ => None,
        };

        let mut modifiers = Vec::new();
        while !self.check(&Token::Comma) && !self.check(&Token::RParen) && !self.at_statement_end()
        {
            modifiers.push(self.parse_column_modifier()?);
        }

        Ok(ColumnDef {
            name,
            type_name,
            length,
            modifiers,
        })
    }

    fn parse_column_modifier(&mut self) -> Result<ColumnModifier> {
        let modifier = match self.current().clone() {
            Token::Primary => ColumnModifier::Primary,
            Token::Unique => ColumnModifier::Unique,
            Token::Foreign => {
                self.advance();
                self.expect(&Token::Eq)?;
                let table = self.expect_identifier()?;
                self.expect(&Token::Dot)?;
                let column = self.expect_identifier()?;
                return Ok(ColumnModifier::Foreign { table, column });
            }
            Token::Identifier(word) => ColumnModifier::Unknown(word),
            other => ColumnModifier::Unknown(other.to_string()),
        };
        self.advance();
        Ok(modifier)
    }

    fn parse_create_index(&mut self, unique: bool) -> Result<CreateIndexStatement> {
        self.expect(&Token::Index)?;
        let name = self.expect_identifier()?;
        self.expect(&Token::On)?;
        let table = self.expect_identifier()?;

        let parenthesized = self.check(&Token::LParen);
        if parenthesized {
            self.advance();
        }
        let columns = self.parse_identifier_list()?;
        if parenthesized {
            self.expect(&Token::RParen)?;
        }

        Ok(CreateIndexStatement {
            name,
            table,
            columns,
            unique,
        })
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(&Token::Drop)?;

        match self.current() {
            Token::Database => {
                self.advance();
                Ok(Statement::DropDatabase(self.expect_identifier()?))
            }
            Token::Table => {
                self.advance();
                Ok(Statement::DropTable(self.expect_identifier()?))
            }
            _ => Err(self.unexpected("DATABASE or TABLE")),
        }
    }

    fn parse_list(&mut self) -> Result<Statement> {
        self.expect(&Token::List)?;

        match self.current() {
            Token::Databases => {
                self.advance();
                Ok(Statement::ListDatabases)
            }
            Token::Tables => {
                self.advance();
                Ok(Statement::ListTables)
            }
            _ => Err(self.unexpected("DATABASES or TABLES")),
        }
    }

    // ========== INSERT / DELETE Statements ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;
        let table = self.expect_identifier()?;

        let mut assignments = Vec::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(&Token::Eq)?;
            let value = self.parse_literal()?;
            assignments.push((column, value));

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(InsertStatement { table, assignments })
    }

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;
        let table = self.expect_identifier()?;

        let conditions = if self.check(&Token::Where) {
            self.advance();
            self.parse_conditions()?
        } else {
            Vec::new()
        };

        Ok(DeleteStatement { table, conditions })
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let mut stmt = SelectStatement::default();

        if self.check(&Token::Distinct) {
            self.advance();
            stmt.distinct = true;
        }

        stmt.items = self.parse_select_list()?;

        // FROM clause: one or more comma-separated tables
        self.expect(&Token::From)?;
        loop {
            stmt.from.push(self.parse_table_ref()?);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        while self.is_join_keyword() {
            stmt.joins.push(self.parse_join()?);
        }

        if self.check(&Token::Where) {
            self.advance();
            stmt.where_clause = self.parse_conditions()?;
        }

        if self.check(&Token::Group) {
            self.advance();
            self.expect(&Token::By)?;
            loop {
                stmt.group_by.push(self.parse_column_ref()?);
                if !self.check(&Token::Comma) {
                    break;
                }
                self.advance();
            }
        }

        if self.check(&Token::Having) {
            self.advance();
            loop {
                let aggregate = self.parse_aggregate()?;
                let op = self.parse_compare_op()?;
                let value = self.parse_literal()?;
                stmt.having.push(HavingCondition {
                    aggregate,
                    op,
                    value,
                });
                if !self.check(&Token::And) {
                    break;
                }
                self.advance();
            }
        }

        if self.check(&Token::Order) {
            self.advance();
            self.expect(&Token::By)?;
            stmt.order_by = self.parse_order_by_list()?;
        }

        Ok(stmt)
    }

    fn parse_select_list(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();

        loop {
            items.push(self.parse_select_item()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    fn parse_select_item(&mut self) -> Result<SelectItem> {
        if self.check(&Token::Asterisk) {
            self.advance();
            return Ok(SelectItem::Wildcard);
        }

        if self.at_aggregate() {
            return self.parse_aggregate().map(SelectItem::Aggregate);
        }

        self.parse_column_ref().map(SelectItem::Column)
    }

    /// Is the parser looking at `name(` where `name` is an aggregate function?
    fn at_aggregate(&self) -> bool {
        match self.current() {
            Token::Identifier(name) => {
                AggregateFunc::from_name(name).is_some() && self.peek() == Some(&Token::LParen)
            }
            _ => false,
        }
    }

    fn parse_aggregate(&mut self) -> Result<Aggregate> {
        let name = self.expect_identifier()?;
        let func = AggregateFunc::from_name(&name)
            .ok_or_else(|| Error::ParseError(format!("unknown aggregate function '{}'", name)))?;
        self.expect(&Token::LParen)?;

        let arg = if self.check(&Token::Asterisk) {
            if func != AggregateFunc::Count {
                return Err(Error::ParseError(format!("{}(*) is not supported", func)));
            }
            self.advance();
            None
        } else {
            Some(self.parse_column_ref()?)
        };

        self.expect(&Token::RParen)?;
        Ok(Aggregate { func, arg })
    }

    fn parse_table_ref(&mut self) -> Result<TableRef> {
        let name = self.expect_identifier()?;

        let alias = match self.current() {
            Token::Identifier(alias) => {
                let alias = alias.clone();
                self.advance();
                Some(alias)
            }
            _ => None,
        };

        Ok(TableRef { name, alias })
    }

    fn is_join_keyword(&self) -> bool {
        matches!(
            self.current(),
            Token::Join | Token::Inner | Token::Left | Token::Right | Token::Full
        )
    }

    fn parse_join(&mut self) -> Result<Join> {
        let join_type = self.parse_join_type();
        self.expect(&Token::Join)?;
        let table = self.parse_table_ref()?;
        self.expect(&Token::On)?;

        let mut on = Vec::new();
        loop {
            let left = self.parse_column_ref()?;
            self.expect(&Token::Eq)?;
            let right = self.parse_column_ref()?;
            on.push((left, right));

            if !self.check(&Token::And) {
                break;
            }
            self.advance();
        }

        Ok(Join {
            join_type,
            table,
            on,
        })
    }

    fn parse_join_type(&mut self) -> JoinType {
        let join_type = match self.current() {
            Token::Inner => JoinType::Inner,
            Token::Left => JoinType::Left,
            Token::Right => JoinType::Right,
            Token::Full => JoinType::Full,
            // Just JOIN means INNER JOIN
            _ => return JoinType::Inner,
        };
        self.advance();
        if join_type != JoinType::Inner && self.check(&Token::Outer) {
            self.advance();
        }
        join_type
    }

    fn parse_order_by_list(&mut self) -> Result<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let column = self.parse_column_ref()?;
            let descending = if self.check(&Token::Desc) {
                self.advance();
                true
            } else {
                if self.check(&Token::Asc) {
                    self.advance();
                }
                false
            };

            items.push(OrderByItem { column, descending });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(items)
    }

    // ========== Shared Pieces ==========

    /// `cond [and cond]*`
    fn parse_conditions(&mut self) -> Result<Vec<Condition>> {
        let mut conditions = Vec::new();

        loop {
            let column = self.parse_column_ref()?;
            let op = self.parse_compare_op()?;
            let value = self.parse_literal()?;
            conditions.push(Condition { column, op, value });

            if !self.check(&Token::And) {
                break;
            }
            self.advance();
        }

        Ok(conditions)
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Like => CompareOp::Like,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();
        Ok(op)
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier()?;
        if self.check(&Token::Dot) {
            self.advance();
            let name = self.expect_identifier()?;
            Ok(ColumnRef::qualified(first, name))
        } else {
            Ok(ColumnRef::new(first))
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let literal = match self.current().clone() {
            Token::IntegerLiteral(n) => Literal::Integer(n),
            Token::FloatLiteral(n) => Literal::Float(n),
            Token::StringLiteral(s) => Literal::String(s),
            Token::Identifier(word) => Literal::Word(word),
            _ => return Err(self.unexpected("value")),
        };
        self.advance();
        Ok(literal)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = Vec::new();

        loop {
            identifiers.push(self.expect_identifier()?);
            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(identifiers)
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position + 1)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn at_statement_end(&self) -> bool {
        self.is_at_end() || self.check(&Token::Semicolon)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn unexpected(&self, expected: &str) -> Error {
        if self.is_at_end() {
            Error::UnexpectedEof(expected.to_string())
        } else {
            Error::UnexpectedToken {
                expected: expected.to_string(),
                found: format!("{}", self.current()),
            }
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_integer(&mut self) -> Result<i64> {
        match self.current().clone() {
            Token::IntegerLiteral(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("integer")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(command: &str) -> Statement {
        Parser::parse_command(command).unwrap()
    }

    #[test]
    fn test_parse_database_commands() {
        assert_eq!(
            parse("create database School"),
            Statement::CreateDatabase("School".to_string())
        );
        assert_eq!(parse("DROP DATABASE School;"), Statement::DropDatabase("School".into()));
        assert_eq!(parse("use School"), Statement::Use("School".to_string()));
        assert_eq!(parse("list databases"), Statement::ListDatabases);
        assert_eq!(parse("list tables"), Statement::ListTables);
        assert_eq!(parse("drop table Students"), Statement::DropTable("Students".into()));
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse(
            "create table Grades id int primary, sid int foreign=Students.id, note varchar 20 unique",
        );

        match stmt {
            Statement::CreateTable(t) => {
                assert_eq!(t.name, "Grades");
                assert_eq!(t.columns.len(), 3);
                assert_eq!(t.columns[0].modifiers, vec![ColumnModifier::Primary]);
                assert_eq!(
                    t.columns[1].modifiers,
                    vec![ColumnModifier::Foreign {
                        table: "Students".to_string(),
                        column: "id".to_string()
                    }]
                );
                assert_eq!(t.columns[2].type_name, "varchar");
                assert_eq!(t.columns[2].length, Some(20));
                assert_eq!(t.columns[2].modifiers, vec![ColumnModifier::Unique]);
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_table_parenthesized() {
        match parse("create table T (a char(3) primary, b float bogus)") {
            Statement::CreateTable(t) => {
                assert_eq!(t.columns[0].length, Some(3));
                assert_eq!(
                    t.columns[1].modifiers,
                    vec![ColumnModifier::Unknown("bogus".to_string())]
                );
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_index() {
        assert_eq!(
            parse("create unique index by_name on Students name, email"),
            Statement::CreateIndex(CreateIndexStatement {
                name: "by_name".to_string(),
                table: "Students".to_string(),
                columns: vec!["name".to_string(), "email".to_string()],
                unique: true,
            })
        );
    }

    #[test]
    fn test_parse_insert() {
        match parse("insert into Students id=1, name='Ann', active=true") {
            Statement::Insert(i) => {
                assert_eq!(i.table, "Students");
                assert_eq!(
                    i.assignments,
                    vec![
                        ("id".to_string(), Literal::Integer(1)),
                        ("name".to_string(), Literal::String("Ann".to_string())),
                        ("active".to_string(), Literal::Word("true".to_string())),
                    ]
                );
            }
            _ => panic!("Expected INSERT statement"),
        }
    }

    #[test]
    fn test_parse_delete() {
        match parse("delete from Enroll where course = 'db' and sid = 3") {
            Statement::Delete(d) => {
                assert_eq!(d.conditions.len(), 2);
                assert_eq!(d.conditions[1].column, ColumnRef::new("sid"));
                assert_eq!(d.conditions[1].value, Literal::Integer(3));
            }
            _ => panic!("Expected DELETE statement"),
        }
    }

    #[test]
    fn test_parse_full_select() {
        let stmt = parse(
            "select distinct s.name, count(*), avg(g.mark) from Students s \
             left outer join Grades g on s.id = g.sid and s.year = g.year \
             where s.name like 'A%' and g.mark >= 5 \
             group by s.name having count(*) > 1 order by s.name desc, g.mark",
        );

        match stmt {
            Statement::Select(s) => {
                assert!(s.distinct);
                assert_eq!(s.items.len(), 3);
                assert_eq!(
                    s.items[1],
                    SelectItem::Aggregate(Aggregate {
                        func: AggregateFunc::Count,
                        arg: None
                    })
                );
                assert_eq!(s.from[0].binding(), "s");
                assert_eq!(s.joins[0].join_type, JoinType::Left);
                assert_eq!(s.joins[0].on.len(), 2);
                assert_eq!(s.where_clause[0].op, CompareOp::Like);
                assert_eq!(s.group_by, vec![ColumnRef::qualified("s", "name")]);
                assert_eq!(s.having[0].op, CompareOp::Gt);
                assert!(s.order_by[0].descending);
                assert!(!s.order_by[1].descending);
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_comma_tables() {
        match parse("select * from A a, B") {
            Statement::Select(s) => {
                assert_eq!(s.from.len(), 2);
                assert_eq!(s.from[1].binding(), "B");
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Parser::parse_command("create database"),
            Err(Error::UnexpectedEof(_))
        ));
        assert!(matches!(
            Parser::parse_command("update T set a = 1"),
            Err(Error::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Parser::parse_command("select sum(*) from T"),
            Err(Error::ParseError(_))
        ));
        assert!(matches!(
            Parser::parse_command("use A B"),
            Err(Error::UnexpectedToken { .. })
        ));
    }
}
