//! Recursive-descent parser producing the shared condition AST, and a
//! second entry point producing the update-expression AST (spec §4.8).

use super::ast::{CmpOp, Condition, Operand, Path, PathSegment};
use super::lexer::{tokenize, Token, TokenKind};
use super::update::{AddClause, DelClause, RemoveClause, SetClause, SetValue, UpdateExpr};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(expression: &str) -> Result<Self, String> {
        Ok(Parser { tokens: tokenize(expression)?, pos: 0 })
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn expect(&mut self, expected: &TokenKind) -> Result<(), String> {
        let pos = self.tokens[self.pos].pos;
        let actual = self.advance();
        if std::mem::discriminant(&actual) != std::mem::discriminant(expected) {
            return Err(format!("expected {expected:?} at pos {pos}, got {actual:?}"));
        }
        Ok(())
    }

    fn ident_matches(&self, word: &str) -> bool {
        matches!(self.peek(), TokenKind::Ident(name) if name.eq_ignore_ascii_case(word))
    }

    fn consume_ident_keyword(&mut self, word: &str) -> bool {
        if self.ident_matches(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ---- condition / filter expression grammar ----

    pub fn parse_condition(&mut self) -> Result<Condition, String> {
        let cond = self.parse_or()?;
        if *self.peek() != TokenKind::Eof {
            return Err(format!("unexpected trailing tokens at pos {}", self.tokens[self.pos].pos));
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Condition, String> {
        let mut lhs = self.parse_and()?;
        while self.consume_ident_keyword("OR") {
            let rhs = self.parse_and()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Condition, String> {
        let mut lhs = self.parse_not()?;
        while self.consume_ident_keyword("AND") {
            let rhs = self.parse_not()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Condition, String> {
        if self.consume_ident_keyword("NOT") {
            return Ok(Condition::Not(Box::new(self.parse_not()?)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Condition, String> {
        if *self.peek() == TokenKind::LParen {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(inner);
        }
        if self.ident_matches("attribute_exists") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Condition::AttributeExists(path));
        }
        if self.ident_matches("attribute_not_exists") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Condition::AttributeNotExists(path));
        }
        if self.ident_matches("attribute_type") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::Comma)?;
            let operand = self.parse_operand()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Condition::AttributeType(path, operand));
        }
        if self.ident_matches("begins_with") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::Comma)?;
            let operand = self.parse_operand()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Condition::BeginsWith(path, operand));
        }
        if self.ident_matches("contains") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::Comma)?;
            let operand = self.parse_operand()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Condition::Contains(path, operand));
        }

        let lhs = self.parse_operand()?;
        if self.consume_ident_keyword("BETWEEN") {
            let low = self.parse_operand()?;
            if !self.consume_ident_keyword("AND") {
                return Err(format!("expected AND in BETWEEN at pos {}", self.tokens[self.pos].pos));
            }
            let high = self.parse_operand()?;
            return Ok(Condition::Between(lhs, low, high));
        }
        if self.consume_ident_keyword("IN") {
            self.expect(&TokenKind::LParen)?;
            let mut values = vec![self.parse_operand()?];
            while *self.peek() == TokenKind::Comma {
                self.advance();
                values.push(self.parse_operand()?);
            }
            self.expect(&TokenKind::RParen)?;
            return Ok(Condition::In(lhs, values));
        }
        let op = match self.peek() {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::Ne => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            other => return Err(format!("expected comparison operator at pos {}, got {other:?}", self.tokens[self.pos].pos)),
        };
        self.advance();
        let rhs = self.parse_operand()?;
        Ok(Condition::Cmp(lhs, op, rhs))
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        if let TokenKind::ValueRef(name) = self.peek().clone() {
            self.advance();
            return Ok(Operand::Value(name));
        }
        if self.ident_matches("size") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Operand::Size(path));
        }
        if self.ident_matches("if_not_exists") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let path = self.parse_path()?;
            self.expect(&TokenKind::Comma)?;
            let fallback = self.parse_operand()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Operand::IfNotExists(path, Box::new(fallback)));
        }
        if self.ident_matches("list_append") {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let lhs = self.parse_operand()?;
            self.expect(&TokenKind::Comma)?;
            let rhs = self.parse_operand()?;
            self.expect(&TokenKind::RParen)?;
            return Ok(Operand::ListAppend(Box::new(lhs), Box::new(rhs)));
        }
        Ok(Operand::Path(self.parse_path()?))
    }

    fn parse_path(&mut self) -> Result<Path, String> {
        let mut path = vec![self.parse_path_segment()?];
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    path.push(self.parse_path_segment()?);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = match self.advance() {
                        TokenKind::Int(n) if n >= 0 => n as usize,
                        other => return Err(format!("expected non-negative index, got {other:?}")),
                    };
                    self.expect(&TokenKind::RBracket)?;
                    path.push(PathSegment::Index(index));
                }
                _ => break,
            }
        }
        Ok(path)
    }

    fn parse_path_segment(&mut self) -> Result<PathSegment, String> {
        match self.advance() {
            TokenKind::Ident(name) => Ok(PathSegment::Attribute(name)),
            TokenKind::NameRef(name) => Ok(PathSegment::Attribute(format!("#{name}"))),
            other => Err(format!("expected attribute name, got {other:?}")),
        }
    }

    // ---- update expression grammar ----

    pub fn parse_update(&mut self) -> Result<UpdateExpr, String> {
        let mut update = UpdateExpr::default();
        loop {
            if self.consume_ident_keyword("SET") {
                update.set.push(self.parse_set_clause()?);
                while *self.peek() == TokenKind::Comma {
                    self.advance();
                    update.set.push(self.parse_set_clause()?);
                }
            } else if self.consume_ident_keyword("REMOVE") {
                update.remove.push(RemoveClause { path: self.parse_path()? });
                while *self.peek() == TokenKind::Comma {
                    self.advance();
                    update.remove.push(RemoveClause { path: self.parse_path()? });
                }
            } else if self.consume_ident_keyword("ADD") {
                update.add.push(self.parse_path_operand_clause()?.into_add());
                while *self.peek() == TokenKind::Comma {
                    self.advance();
                    update.add.push(self.parse_path_operand_clause()?.into_add());
                }
            } else if self.consume_ident_keyword("DELETE") {
                update.delete.push(self.parse_path_operand_clause()?.into_delete());
                while *self.peek() == TokenKind::Comma {
                    self.advance();
                    update.delete.push(self.parse_path_operand_clause()?.into_delete());
                }
            } else if *self.peek() == TokenKind::Eof {
                break;
            } else {
                return Err(format!("expected SET/REMOVE/ADD/DELETE at pos {}", self.tokens[self.pos].pos));
            }
        }
        Ok(update)
    }

    fn parse_path_operand_clause(&mut self) -> Result<PathOperandClause, String> {
        let path = self.parse_path()?;
        let operand = self.parse_operand()?;
        Ok(PathOperandClause { path, operand })
    }

    fn parse_set_clause(&mut self) -> Result<SetClause, String> {
        let path = self.parse_path()?;
        self.expect(&TokenKind::Eq)?;
        let value = self.parse_set_value()?;
        Ok(SetClause { path, value })
    }

    fn parse_set_value(&mut self) -> Result<SetValue, String> {
        let lhs = self.parse_operand()?;
        match self.peek() {
            TokenKind::Plus => {
                self.advance();
                let rhs = self.parse_operand()?;
                Ok(SetValue::Add(lhs, rhs))
            }
            TokenKind::Minus => {
                self.advance();
                let rhs = self.parse_operand()?;
                Ok(SetValue::Sub(lhs, rhs))
            }
            _ => Ok(SetValue::Operand(lhs)),
        }
    }
}

struct PathOperandClause {
    path: Path,
    operand: Operand,
}

impl PathOperandClause {
    fn into_add(self) -> AddClause {
        AddClause { path: self.path, operand: self.operand }
    }
    fn into_delete(self) -> DelClause {
        DelClause { path: self.path, operand: self.operand }
    }
}

pub fn parse_condition_expression(expression: &str) -> Result<Condition, String> {
    Parser::new(expression)?.parse_condition()
}

pub fn parse_update_expression(expression: &str) -> Result<UpdateExpr, String> {
    Parser::new(expression)?.parse_update()
}
