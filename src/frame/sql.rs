//! Tokenizer and recursive-descent parser for Spark SQL expressions and
//! simple single-table queries.

use crate::domain::model::{DataType, Value};
use crate::frame::aggregate::AggFunc;
use crate::frame::expr::{BinaryOp, Expr, ScalarFn, SortExpr};
use crate::frame::value;
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(String),
    Str(String),
    Symbol(&'static str),
    Eof,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    pos: usize,
}

fn parse_error(pos: usize, message: impl Into<String>) -> EtlError {
    EtlError::ParseError {
        position: pos,
        message: message.into(),
    }
}

const SYMBOLS: [&str; 15] = [
    "<>", "!=", ">=", "<=", "==", "=", ">", "<", "+", "-", "*", "/", "(", ")", ",",
];

fn tokenize(text: &str) -> Result<Vec<Spanned>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c == '\'' {
            // '' 代表字串中的單引號
            let mut s = String::new();
            i += 1;
            loop {
                match text[i..].chars().next() {
                    None => return Err(parse_error(start, "unterminated string literal")),
                    Some('\'') if bytes.get(i + 1) == Some(&b'\'') => {
                        s.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(ch) => {
                        s.push(ch);
                        i += ch.len_utf8();
                    }
                }
            }
            tokens.push(Spanned {
                token: Token::Str(s),
                pos: start,
            });
        } else if c == '`' {
            let end = text[i + 1..]
                .find('`')
                .ok_or_else(|| parse_error(start, "unterminated quoted identifier"))?;
            tokens.push(Spanned {
                token: Token::Ident(text[i + 1..i + 1 + end].to_string()),
                pos: start,
            });
            i += end + 2;
        } else if c.is_ascii_digit()
            || (c == '.' && bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()))
        {
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            tokens.push(Spanned {
                token: Token::Number(text[start..i].to_string()),
                pos: start,
            });
        } else if c.is_ascii_alphabetic() || c == '_' {
            // 點號連接的識別字視為巢狀欄位路徑
            while i < bytes.len()
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                i += 1;
            }
            tokens.push(Spanned {
                token: Token::Ident(text[start..i].to_string()),
                pos: start,
            });
        } else {
            let symbol = SYMBOLS
                .iter()
                .find(|s| text[i..].starts_with(**s))
                .ok_or_else(|| parse_error(start, format!("unexpected character '{}'", c)))?;
            tokens.push(Spanned {
                token: Token::Symbol(symbol),
                pos: start,
            });
            i += symbol.len();
        }
    }
    tokens.push(Spanned {
        token: Token::Eof,
        pos: text.len(),
    });
    Ok(tokens)
}

/// A parsed `SELECT` statement over one view.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub distinct: bool,
    pub projection: Vec<Expr>,
    pub from: String,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<SortExpr>,
    pub limit: Option<usize>,
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

const RESERVED: [&str; 17] = [
    "select", "from", "where", "group", "by", "order", "limit", "and", "or", "not", "as", "asc",
    "desc", "when", "then", "else", "end",
];

impl Parser {
    fn new(text: &str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].pos
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(parse_error(
                self.position(),
                format!("expected {}", keyword.to_uppercase()),
            ))
        }
    }

    fn eat_symbol(&mut self, symbol: &str) -> bool {
        if matches!(self.peek(), Token::Symbol(s) if *s == symbol) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: &str) -> Result<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(parse_error(self.position(), format!("expected '{}'", symbol)))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        match self.peek() {
            Token::Eof => Ok(()),
            other => Err(parse_error(
                self.position(),
                format!("unexpected trailing input {:?}", other),
            )),
        }
    }

    fn identifier(&mut self) -> Result<String> {
        let pos = self.position();
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(parse_error(pos, format!("expected identifier, found {:?}", other))),
        }
    }

    fn expression(&mut self) -> Result<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            left = left.or(self.and_expr()?);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("and") {
            left = left.and(self.not_expr()?);
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            return Ok(!self.not_expr()?);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.additive()?;
        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(if negated {
                left.is_not_null()
            } else {
                left.is_null()
            });
        }
        let op = match self.peek() {
            Token::Symbol("=") | Token::Symbol("==") => BinaryOp::Eq,
            Token::Symbol("!=") | Token::Symbol("<>") => BinaryOp::NotEq,
            Token::Symbol(">") => BinaryOp::Gt,
            Token::Symbol(">=") => BinaryOp::GtEq,
            Token::Symbol("<") => BinaryOp::Lt,
            Token::Symbol("<=") => BinaryOp::LtEq,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            if self.eat_symbol("+") {
                left = left + self.multiplicative()?;
            } else if self.eat_symbol("-") {
                left = left - self.multiplicative()?;
            } else {
                return Ok(left);
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        loop {
            if self.eat_symbol("*") {
                left = left * self.unary()?;
            } else if self.eat_symbol("/") {
                left = left / self.unary()?;
            } else {
                return Ok(left);
            }
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_symbol("-") {
            return Ok(match self.unary()? {
                Expr::Literal(v) if value::as_f64(&v).is_some() => {
                    Expr::Literal(value::negate(&v))
                }
                other => -other,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        let pos = self.position();
        match self.advance() {
            Token::Number(text) => {
                if let Ok(i) = text.parse::<i64>() {
                    Ok(Expr::Literal(value::int(i)))
                } else {
                    text.parse::<f64>()
                        .map(|f| Expr::Literal(value::double(f)))
                        .map_err(|_| parse_error(pos, format!("invalid number '{}'", text)))
                }
            }
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Symbol("*") => Ok(Expr::Wildcard),
            Token::Symbol("(") => {
                let inner = self.expression()?;
                self.expect_symbol(")")?;
                Ok(inner)
            }
            Token::Ident(name) => self.identifier_expr(name, pos),
            other => Err(parse_error(pos, format!("unexpected token {:?}", other))),
        }
    }

    fn identifier_expr(&mut self, name: String, pos: usize) -> Result<Expr> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "null" => return Ok(Expr::Literal(Value::Null)),
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "case" => return self.case_expr(),
            _ => {}
        }
        if RESERVED.contains(&lower.as_str()) {
            return Err(parse_error(pos, format!("unexpected keyword {}", name)));
        }
        if !self.eat_symbol("(") {
            return Ok(Expr::Column(name));
        }

        if lower == "cast" {
            let inner = self.expression()?;
            self.expect_keyword("as")?;
            let type_pos = self.position();
            let type_name = self.identifier()?;
            let data_type = DataType::parse(&type_name)
                .map_err(|e| parse_error(type_pos, e.to_string()))?;
            self.expect_symbol(")")?;
            return Ok(inner.cast(data_type));
        }

        if let Some(func) = AggFunc::from_name(&lower) {
            let func = if func == AggFunc::Count && self.eat_keyword("distinct") {
                AggFunc::CountDistinct
            } else {
                func
            };
            let arg = self.expression()?;
            self.expect_symbol(")")?;
            // count(1) 與 count(*) 相同
            let input = match arg {
                Expr::Wildcard => None,
                Expr::Literal(ref v) if func == AggFunc::Count && !v.is_null() => None,
                other => Some(Box::new(other)),
            };
            return Ok(Expr::Aggregate { func, input });
        }

        let func = ScalarFn::from_name(&lower)
            .ok_or_else(|| parse_error(pos, format!("unknown function '{}'", name)))?;
        let mut args = Vec::new();
        if !self.eat_symbol(")") {
            loop {
                args.push(self.expression()?);
                if self.eat_symbol(")") {
                    break;
                }
                self.expect_symbol(",")?;
            }
        }
        Ok(Expr::Function(func, args))
    }

    fn case_expr(&mut self) -> Result<Expr> {
        let mut branches = Vec::new();
        while self.eat_keyword("when") {
            let condition = self.expression()?;
            self.expect_keyword("then")?;
            branches.push((condition, self.expression()?));
        }
        if branches.is_empty() {
            return Err(parse_error(self.position(), "CASE needs at least one WHEN"));
        }
        let otherwise = if self.eat_keyword("else") {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.expect_keyword("end")?;
        Ok(Expr::Case {
            branches,
            otherwise,
        })
    }

    /// `expr [[AS] alias]`
    fn select_item(&mut self) -> Result<Expr> {
        let e = self.expression()?;
        if self.eat_keyword("as") {
            return Ok(e.alias(self.identifier()?));
        }
        match self.peek() {
            Token::Ident(name) if !RESERVED.contains(&name.to_ascii_lowercase().as_str()) => {
                let name = name.clone();
                self.advance();
                Ok(e.alias(name))
            }
            _ => Ok(e),
        }
    }

    fn comma_list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        let mut items = vec![item(self)?];
        while self.eat_symbol(",") {
            items.push(item(self)?);
        }
        Ok(items)
    }

    fn query(&mut self) -> Result<Query> {
        self.expect_keyword("select")?;
        let distinct = self.eat_keyword("distinct");
        let projection = self.comma_list(Self::select_item)?;
        self.expect_keyword("from")?;
        let from = self.identifier()?;

        let selection = if self.eat_keyword("where") {
            Some(self.expression()?)
        } else {
            None
        };

        let group_by = if self.eat_keyword("group") {
            self.expect_keyword("by")?;
            self.comma_list(Self::expression)?
        } else {
            Vec::new()
        };

        let order_by = if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            self.comma_list(|p| {
                let e = p.expression()?;
                Ok(if p.eat_keyword("desc") {
                    e.desc()
                } else {
                    p.eat_keyword("asc");
                    e.asc()
                })
            })?
        } else {
            Vec::new()
        };

        let limit = if self.eat_keyword("limit") {
            let pos = self.position();
            match self.advance() {
                Token::Number(n) => Some(
                    n.parse::<usize>()
                        .map_err(|_| parse_error(pos, format!("invalid LIMIT '{}'", n)))?,
                ),
                other => return Err(parse_error(pos, format!("expected a number, found {:?}", other))),
            }
        } else {
            None
        };

        self.expect_eof()?;
        Ok(Query {
            distinct,
            projection,
            from,
            selection,
            group_by,
            order_by,
            limit,
        })
    }
}

/// Parses one expression such as `salary * 2` or `address = 'JAPAN' and salary > 70000`.
pub fn parse_expression(text: &str) -> Result<Expr> {
    let mut parser = Parser::new(text)?;
    let e = parser.expression()?;
    parser.expect_eof()?;
    Ok(e)
}

/// Parses a `selectExpr` item, which may carry an alias.
pub fn parse_select_item(text: &str) -> Result<Expr> {
    let mut parser = Parser::new(text)?;
    let e = parser.select_item()?;
    parser.expect_eof()?;
    Ok(e)
}

pub fn parse_query(text: &str) -> Result<Query> {
    Parser::new(text.trim().trim_end_matches(';'))?.query()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::functions::{col, lit};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_precedence() {
        let e = parse_expression("id + 5 * 2").unwrap();
        assert_eq!(e, col("id") + (lit(5) * 2));
        assert_eq!(e.name(), "(id + (5 * 2))");
    }

    #[test]
    fn test_predicate_with_and() {
        let e = parse_expression("address = 'JAPAN' and salary > 70000").unwrap();
        assert_eq!(e, col("address").eq("JAPAN").and(col("salary").gt(70000)));
    }

    #[test]
    fn test_function_and_cast() {
        let e = parse_expression("concat(name, address)").unwrap();
        assert_eq!(e.name(), "concat(name, address)");
        let c = parse_expression("cast(id as string)").unwrap();
        assert_eq!(c, col("id").cast(DataType::String));
    }

    #[test]
    fn test_is_not_null_and_escaped_quote() {
        assert_eq!(
            parse_expression("name is not null").unwrap(),
            col("name").is_not_null()
        );
        assert_eq!(parse_expression("'it''s'").unwrap(), lit("it's"));
    }

    #[test]
    fn test_select_item_alias() {
        let e = parse_select_item("id + 5 as id_plus_5").unwrap();
        assert_eq!(e.name(), "id_plus_5");
        let bare = parse_select_item("salary*2 doubled").unwrap();
        assert_eq!(bare.name(), "doubled");
    }

    #[test]
    fn test_parse_error_reports_position() {
        match parse_expression("salary > ") {
            Err(EtlError::ParseError { position, .. }) => assert_eq!(position, 9),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse_expression("salary $ 2").is_err());
        assert!(parse_expression("frobnicate(x)").is_err());
    }

    #[test]
    fn test_query_clauses() {
        let q = parse_query(
            "select department, count(*) as n from employee_tbl where salary > 70000 \
             group by department order by n desc limit 3",
        )
        .unwrap();
        assert!(!q.distinct);
        assert_eq!(q.from, "employee_tbl");
        assert_eq!(q.projection.len(), 2);
        assert_eq!(q.group_by, vec![col("department")]);
        assert_eq!(q.order_by, vec![col("n").desc()]);
        assert_eq!(q.limit, Some(3));
    }

    #[test]
    fn test_count_distinct_in_sql() {
        let e = parse_expression("count(distinct address)").unwrap();
        assert_eq!(e.name(), "count(DISTINCT address)");
    }
}
