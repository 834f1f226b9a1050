/// Parse a run-if condition.
///
/// ## Errors
/// Returns `Err(Vec<CompileError>)` (a single error; expressions do not recover).
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse_expression(tokens: &[Token]) -> Result<Spanned<Expr>, Vec<CompileError>> {
    Parser::new(tokens).parse_expression()
}

/// Parse an allowed-value block: one `name: v1, v2, ...` declaration per logical line.
///
/// An empty block parses to an empty list; callers decide whether that is an error.
///
/// ## Errors
/// Returns one error per malformed line.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse_allowed_block(tokens: &[Token]) -> Result<Vec<Spanned<AllowedDecl>>, Vec<CompileError>> {
    Parser::new(tokens).parse_lines(Parser::allowed_decl)
}

/// Parse a current-value block: one `name = value` assignment per logical line.
///
/// ## Errors
/// Returns one error per malformed line.
#[tracing::instrument(skip_all, fields(token_count = tokens.len()))]
pub fn parse_assignment_block(tokens: &[Token]) -> Result<Vec<Spanned<Assignment>>, Vec<CompileError>> {
    Parser::new(tokens).parse_lines(Parser::assignment)
}

/// Lex and parse a condition in one step.
pub fn expression_from_source(source: &str) -> Result<Spanned<Expr>, Vec<CompileError>> {
    let tokens = crate::lexer::lex(source)?;
    parse_expression(&tokens)
}

/// Lex and parse an allowed-value block in one step.
pub fn allowed_block_from_source(source: &str) -> Result<Vec<Spanned<AllowedDecl>>, Vec<CompileError>> {
    let tokens = crate::lexer::lex(source)?;
    parse_allowed_block(&tokens)
}

/// Lex and parse a current-value block in one step.
pub fn assignment_block_from_source(source: &str) -> Result<Vec<Spanned<Assignment>>, Vec<CompileError>> {
    let tokens = crate::lexer::lex(source)?;
    parse_assignment_block(&tokens)
}
