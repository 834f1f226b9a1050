/// Expression parsing (precedence ladder).
///
/// ```text
/// expression_list := expression (',' expression)* [',']
/// expression      := and_expr ('or' and_expr)*
/// and_expr        := not_expr ('and' not_expr)*
/// not_expr        := 'not' not_expr | comparison
/// comparison      := additive (comp_op additive)*
/// additive        := multiplicative (('+' | '-') multiplicative)*
/// multiplicative  := unary (('*' | '/' | '//' | '%') unary)*
/// unary           := ('-' | '+') unary | power
/// power           := atom ['**' unary]
/// atom            := literal | name | '(' [expression_list] ')' | '[' [items] ']'
/// ```
impl<'a> Parser<'a> {
    /// A bare comma list at the top of a condition forms a tuple, like Python's `eval`.
    fn expression_list(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let first = self.expression()?;
        if !self.check_punct(PunctuationId::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.expression()?);
        }
        let span = items[0].span.merge(self.previous_span());
        Ok(Spanned::new(Expr::Tuple(items), span))
    }

    fn expression(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut lhs = self.and_expr()?;
        while self.match_op(OperatorId::Or) {
            let rhs = self.and_expr()?;
            lhs = binary(lhs, BinaryOp::Or, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut lhs = self.not_expr()?;
        while self.match_op(OperatorId::And) {
            let rhs = self.not_expr()?;
            lhs = binary(lhs, BinaryOp::And, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Spanned<Expr>, CompileError> {
        if self.check_op(OperatorId::Not) {
            let start = self.advance().span;
            let operand = self.not_expr()?;
            let span = start.merge(operand.span);
            return Ok(Spanned::new(Expr::Unary(UnaryOp::Not, Box::new(operand)), span));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let first = self.additive()?;
        let mut rest = Vec::new();
        while let Some(op) = self.compare_op()? {
            rest.push((op, self.additive()?));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        let span = rest.iter().fold(first.span, |acc, (_, e)| acc.merge(e.span));
        Ok(Spanned::new(Expr::Compare(Box::new(first), rest), span))
    }

    /// Consume a comparison operator, including the two-word `not in` / `is not`.
    fn compare_op(&mut self) -> Result<Option<CompareOp>, CompileError> {
        let Some(id) = self.peek().operator_id() else {
            return Ok(None);
        };
        let op = match id {
            OperatorId::EqEq => CompareOp::Eq,
            OperatorId::NotEq => CompareOp::NotEq,
            OperatorId::Lt => CompareOp::Lt,
            OperatorId::LtEq => CompareOp::LtEq,
            OperatorId::Gt => CompareOp::Gt,
            OperatorId::GtEq => CompareOp::GtEq,
            OperatorId::In => CompareOp::In,
            OperatorId::Is => {
                self.advance();
                return Ok(Some(if self.match_op(OperatorId::Not) { CompareOp::IsNot } else { CompareOp::Is }));
            }
            OperatorId::Not => {
                self.advance();
                self.expect_op(OperatorId::In, "'in' after 'not'")?;
                return Ok(Some(CompareOp::NotIn));
            }
            OperatorId::Eq => {
                return Err(CompileError::syntax(
                    "assignment is not allowed in a condition".to_string(),
                    self.peek().span,
                )
                .with_hint("use '==' to compare"));
            }
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(op))
    }

    fn additive(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = if self.match_op(OperatorId::Plus) {
                BinaryOp::Add
            } else if self.match_op(OperatorId::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.multiplicative()?;
            lhs = binary(lhs, op, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.match_op(OperatorId::Star) {
                BinaryOp::Mul
            } else if self.match_op(OperatorId::Slash) {
                BinaryOp::Div
            } else if self.match_op(OperatorId::SlashSlash) {
                BinaryOp::FloorDiv
            } else if self.match_op(OperatorId::Percent) {
                BinaryOp::Mod
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = binary(lhs, op, rhs);
        }
    }

    fn unary(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let op = if self.check_op(OperatorId::Minus) {
            UnaryOp::Neg
        } else if self.check_op(OperatorId::Plus) {
            UnaryOp::Pos
        } else {
            return self.power();
        };
        let start = self.advance().span;
        let operand = self.unary()?;
        let span = start.merge(operand.span);
        Ok(Spanned::new(Expr::Unary(op, Box::new(operand)), span))
    }

    fn power(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let base = self.atom()?;
        if self.match_op(OperatorId::StarStar) {
            let exponent = self.unary()?;
            return Ok(binary(base, BinaryOp::Pow, exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::Int(i) => Expr::Literal(Literal::Int(i)),
            TokenKind::Float(x) => Expr::Literal(Literal::Float(x)),
            TokenKind::String(s) => Expr::Literal(Literal::Str(s)),
            TokenKind::Keyword(KeywordId::True) => Expr::Literal(Literal::Bool(true)),
            TokenKind::Keyword(KeywordId::False) => Expr::Literal(Literal::Bool(false)),
            TokenKind::Keyword(KeywordId::None) => Expr::Literal(Literal::None),
            TokenKind::Ident(name) => Expr::Name(name),
            TokenKind::Punctuation(PunctuationId::LParen) => return self.paren(),
            TokenKind::Punctuation(PunctuationId::LBracket) => return self.list(),
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();
        Ok(Spanned::new(expr, token.span))
    }

    /// `()` is the empty tuple, `(x)` a group, `(x,)` / `(x, y)` a tuple.
    fn paren(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.advance().span;
        if self.match_punct(PunctuationId::RParen) {
            return Ok(Spanned::new(Expr::Tuple(Vec::new()), start.merge(self.previous_span())));
        }
        let first = self.expression()?;
        if !self.check_punct(PunctuationId::Comma) {
            self.expect_punct(PunctuationId::RParen, "')'")?;
            return Ok(Spanned::new(first.node, start.merge(self.previous_span())));
        }
        let mut items = vec![first];
        while self.match_punct(PunctuationId::Comma) {
            if self.check_punct(PunctuationId::RParen) {
                break;
            }
            items.push(self.expression()?);
        }
        self.expect_punct(PunctuationId::RParen, "')'")?;
        Ok(Spanned::new(Expr::Tuple(items), start.merge(self.previous_span())))
    }

    fn list(&mut self) -> Result<Spanned<Expr>, CompileError> {
        let start = self.advance().span;
        let mut items = Vec::new();
        while !self.check_punct(PunctuationId::RBracket) {
            items.push(self.expression()?);
            if !self.match_punct(PunctuationId::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuationId::RBracket, "']'")?;
        Ok(Spanned::new(Expr::List(items), start.merge(self.previous_span())))
    }

    fn starts_expression(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::String(_)
            | TokenKind::Ident(_)
            | TokenKind::Keyword(_) => true,
            TokenKind::Punctuation(id) => matches!(id, PunctuationId::LParen | PunctuationId::LBracket),
            TokenKind::Operator(id) => matches!(id, OperatorId::Not | OperatorId::Minus | OperatorId::Plus),
            TokenKind::Newline | TokenKind::Eof => false,
        }
    }
}

fn binary(lhs: Spanned<Expr>, op: BinaryOp, rhs: Spanned<Expr>) -> Spanned<Expr> {
    let span = lhs.span.merge(rhs.span);
    Spanned::new(Expr::Binary(Box::new(lhs), op, Box::new(rhs)), span)
}
