/// Declaration-block parsing.
///
/// Allowed-value lines (`name: v1, v2`) and assignment lines (`name = v`) only accept literal values:
/// booleans, (optionally signed) numbers, and quoted strings.
impl<'a> Parser<'a> {
    /// `name ':' literal (',' literal)* [',']`
    fn allowed_decl(&mut self) -> Result<Spanned<AllowedDecl>, CompileError> {
        let name = self.identifier("a tag or parameter name")?;
        self.expect_punct(PunctuationId::Colon, "':' after the name")?;
        let mut values = vec![self.decl_literal()?];
        while self.match_punct(PunctuationId::Comma) {
            if matches!(self.peek().kind, TokenKind::Newline | TokenKind::Eof) {
                break;
            }
            values.push(self.decl_literal()?);
        }
        let span = name.span.merge(self.previous_span());
        Ok(Spanned::new(AllowedDecl { name, values }, span))
    }

    /// `name '=' literal`
    fn assignment(&mut self) -> Result<Spanned<Assignment>, CompileError> {
        let name = self.identifier("a tag or parameter name")?;
        self.expect_op(OperatorId::Eq, "'=' after the name")?;
        let value = self.decl_literal()?;
        let span = name.span.merge(value.span);
        Ok(Spanned::new(Assignment { name, value }, span))
    }

    fn decl_literal(&mut self) -> Result<Spanned<Literal>, CompileError> {
        let start = self.peek().span;
        let negate = if self.match_op(OperatorId::Minus) {
            Some(true)
        } else if self.match_op(OperatorId::Plus) {
            Some(false)
        } else {
            None
        };

        let token = self.peek().clone();
        let literal = match token.kind {
            TokenKind::Int(i) => {
                let value = if negate == Some(true) { i.checked_neg() } else { Some(i) };
                Literal::Int(value.ok_or_else(|| {
                    CompileError::syntax("integer literal out of range".to_string(), token.span)
                })?)
            }
            TokenKind::Float(x) => Literal::Float(if negate == Some(true) { -x } else { x }),
            _ if negate.is_some() => return Err(self.unexpected("a number after the sign")),
            TokenKind::String(s) => Literal::Str(s),
            TokenKind::Keyword(KeywordId::True) => Literal::Bool(true),
            TokenKind::Keyword(KeywordId::False) => Literal::Bool(false),
            TokenKind::Keyword(KeywordId::None) => {
                return Err(CompileError::syntax(
                    "allowed values must be boolean, numeric or string literals, not None".to_string(),
                    token.span,
                ));
            }
            TokenKind::Ident(name) => {
                return Err(CompileError::syntax(
                    "string values must be quoted".to_string(),
                    token.span,
                )
                .with_hint(format!("write \"{name}\" instead of {name}")));
            }
            _ => return Err(self.unexpected("a boolean, numeric or string literal")),
        };
        self.advance();
        Ok(Spanned::new(literal, start.merge(token.span)))
    }
}
