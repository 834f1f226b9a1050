/// Parser core type.
///
/// ## Notes
/// - This file is `include!`'d into `crate::parser` to keep all parser methods in a
///   single module.
/// - Declaration blocks recover at line boundaries so one pass reports every malformed line.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<CompileError>,
}

impl<'a> Parser<'a> {
    /// Create a new parser for a token stream.
    ///
    /// ## Parameters
    /// - `tokens`: Token stream produced by `nbvalx_syntax::lexer` (must end with `Eof`).
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Parse a single condition; trailing newlines are allowed, anything else is an error.
    pub fn parse_expression(mut self) -> Result<Spanned<Expr>, Vec<CompileError>> {
        self.skip_newlines();
        if self.is_at_end() {
            return Err(vec![CompileError::syntax(
                "expected a condition, found end of input".to_string(),
                self.peek().span,
            )]);
        }
        let result = self.expression_list().and_then(|expr| {
            self.skip_newlines();
            if self.is_at_end() {
                Ok(expr)
            } else {
                Err(self.unexpected("end of condition"))
            }
        });
        result.map_err(|e| vec![e])
    }

    /// Parse one item per logical line with `item`, collecting errors and resynchronizing at newlines.
    fn parse_lines<T>(
        mut self,
        mut item: impl FnMut(&mut Self) -> Result<T, CompileError>,
    ) -> Result<Vec<T>, Vec<CompileError>> {
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.is_at_end() {
            match item(&mut self).and_then(|v| self.end_of_line().map(|_| v)) {
                Ok(v) => items.push(v),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
            self.skip_newlines();
        }
        if self.errors.is_empty() {
            Ok(items)
        } else {
            Err(self.errors)
        }
    }
}
