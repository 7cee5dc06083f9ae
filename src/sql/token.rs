//! Command token definitions
//!
//! This module defines all tokens that can appear in a command.

use std::fmt;

/// Command token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // ========== Keywords ==========
    // DDL Keywords
    Create,
    Drop,
    Database,
    Databases,
    Table,
    Tables,
    Index,
    Use,
    List,

    // DML Keywords
    Insert,
    Into,
    Delete,
    Select,
    Distinct,
    From,
    Where,
    And,
    Like,

    // Joins
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    On,

    // Ordering & Grouping
    Group,
    Order,
    By,
    Having,
    Asc,
    Desc,

    // Column Modifiers
    Primary,
    Unique,
    Foreign,

    // ========== Literals ==========
    /// Integer literal
    IntegerLiteral(i64),
    /// Float literal
    FloatLiteral(f64),
    /// String literal (single-quoted)
    StringLiteral(String),
    /// Identifier (table name, column name, type name, ...)
    Identifier(String),

    // ========== Operators ==========
    /// =
    Eq,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Lte,
    /// >=
    Gte,
    /// *
    Asterisk,

    // ========== Delimiters ==========
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,

    // ========== Special ==========
    /// End of input
    Eof,
}

impl Token {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        !matches!(
            self,
            Token::IntegerLiteral(_)
                | Token::FloatLiteral(_)
                | Token::StringLiteral(_)
                | Token::Identifier(_)
                | Token::Eq
                | Token::Lt
                | Token::Gt
                | Token::Lte
                | Token::Gte
                | Token::Asterisk
                | Token::LParen
                | Token::RParen
                | Token::Comma
                | Token::Semicolon
                | Token::Dot
                | Token::Eof
        )
    }

    /// Try to parse a keyword from a string
    pub fn from_keyword(s: &str) -> Option<Token> {
        match s.to_uppercase().as_str() {
            // DDL
            "CREATE" => Some(Token::Create),
            "DROP" => Some(Token::Drop),
            "DATABASE" => Some(Token::Database),
            "DATABASES" => Some(Token::Databases),
            "TABLE" => Some(Token::Table),
            "TABLES" => Some(Token::Tables),
            "INDEX" => Some(Token::Index),
            "USE" => Some(Token::Use),
            "LIST" => Some(Token::List),

            // DML
            "INSERT" => Some(Token::Insert),
            "INTO" => Some(Token::Into),
            "DELETE" => Some(Token::Delete),
            "SELECT" => Some(Token::Select),
            "DISTINCT" => Some(Token::Distinct),
            "FROM" => Some(Token::From),
            "WHERE" => Some(Token::Where),
            "AND" => Some(Token::And),
            "LIKE" => Some(Token::Like),

            // Joins
            "JOIN" => Some(Token::Join),
            "INNER" => Some(Token::Inner),
            "LEFT" => Some(Token::Left),
            "RIGHT" => Some(Token::Right),
            "FULL" => Some(Token::Full),
            "OUTER" => Some(Token::Outer),
            "ON" => Some(Token::On),

            // Ordering & Grouping
            "GROUP" => Some(Token::Group),
            "ORDER" => Some(Token::Order),
            "BY" => Some(Token::By),
            "HAVING" => Some(Token::Having),
            "ASC" => Some(Token::Asc),
            "DESC" => Some(Token::Desc),

            // Column Modifiers
            "PRIMARY" => Some(Token::Primary),
            "UNIQUE" => Some(Token::Unique),
            "FOREIGN" => Some(Token::Foreign),

            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Create => write!(f, "CREATE"),
            Token::Drop => write!(f, "DROP"),
            Token::Database => write!(f, "DATABASE"),
            Token::Databases => write!(f, "DATABASES"),
            Token::Table => write!(f, "TABLE"),
            Token::Tables => write!(f, "TABLES"),
            Token::Index => write!(f, "INDEX"),
            Token::Use => write!(f, "USE"),
            Token::List => write!(f, "LIST"),
            Token::Insert => write!(f, "INSERT"),
            Token::Into => write!(f, "INTO"),
            Token::Delete => write!(f, "DELETE"),
            Token::Select => write!(f, "SELECT"),
            Token::Distinct => write!(f, "DISTINCT"),
            Token::From => write!(f, "FROM"),
            Token::Where => write!(f, "WHERE"),
            Token::And => write!(f, "AND"),
            Token::Like => write!(f, "LIKE"),
            Token::Join => write!(f, "JOIN"),
            Token::Inner => write!(f, "INNER"),
            Token::Left => write!(f, "LEFT"),
            Token::Right => write!(f, "RIGHT"),
            Token::Full => write!(f, "FULL"),
            Token::Outer => write!(f, "OUTER"),
            Token::On => write!(f, "ON"),
            Token::Group => write!(f, "GROUP"),
            Token::Order => write!(f, "ORDER"),
            Token::By => write!(f, "BY"),
            Token::Having => write!(f, "HAVING"),
            Token::Asc => write!(f, "ASC"),
            Token::Desc => write!(f, "DESC"),
            Token::Primary => write!(f, "PRIMARY"),
            Token::Unique => write!(f, "UNIQUE"),
            Token::Foreign => write!(f, "FOREIGN"),
            Token::IntegerLiteral(n) => write!(f, "{}", n),
            Token::FloatLiteral(n) => write!(f, "{}", n),
            Token::StringLiteral(s) => write!(f, "'{}'", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Eq => write!(f, "="),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::Lte => write!(f, "<="),
            Token::Gte => write!(f, ">="),
            Token::Asterisk => write!(f, "*"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Semicolon => write!(f, ";"),
            Token::Dot => write!(f, "."),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parsing() {
        assert_eq!(Token::from_keyword("SELECT"), Some(Token::Select));
        assert_eq!(Token::from_keyword("select"), Some(Token::Select));
        assert_eq!(Token::from_keyword("DataBases"), Some(Token::Databases));
        assert_eq!(Token::from_keyword("varchar"), None);
        assert_eq!(Token::from_keyword("count"), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(Token::Select.is_keyword());
        assert!(Token::Foreign.is_keyword());
        assert!(!Token::Asterisk.is_keyword());
        assert!(!Token::IntegerLiteral(42).is_keyword());
    }
}
