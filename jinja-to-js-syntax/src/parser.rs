//! Recursive descent parser
//!
//! Operator precedence, loosest first:
//! ternary, `or`, `and`, `not`, comparisons, `~`, `+ -`, `* / // %`, `**`,
//! unary `- +`, then postfix (attribute, subscript, call) followed by
//! filters and tests.

use crate::ast::*;
use crate::error::{ParseError, SyntaxError, TemplateSource, UnclosedError};
use crate::lexer::{Tok, Token};

/// Names that close a nested body, e.g. `endif`.
type EndTags = &'static [&'static str];

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: TemplateSource,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>, source: TemplateSource) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
        }
    }

    pub(crate) fn parse_template(mut self) -> Result<Vec<Node>, ParseError> {
        let (body, _) = self.parse_body(&[], None)?;
        Ok(body)
    }

    // ------------------------------------------------------------------
    // token helpers

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with `Eof`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_nth(&self, n: usize) -> &Tok {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].tok
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(&self.peek().tok, Tok::Op(o) if *o == op)
    }

    fn at_name(&self, name: &str) -> bool {
        matches!(&self.peek().tok, Tok::Name(n) if n == name)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn eat_name(&mut self, name: &str) -> bool {
        let found = self.at_name(name);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Result<Span, ParseError> {
        if self.at_op(op) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("`{op}`")))
        }
    }

    fn expect_name(&mut self, name: &str) -> Result<Span, ParseError> {
        if self.at_name(name) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("`{name}`")))
        }
    }

    fn expect_block_end(&mut self) -> Result<Span, ParseError> {
        if self.peek().tok == Tok::BlockEnd {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected("`%}`"))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        match &self.peek().tok {
            Tok::Name(name) => {
                let name = name.clone();
                let span = self.advance().span;
                Ok(Ident { name, span })
            }
            _ => Err(self.unexpected("a name")),
        }
    }

    fn expect_string(&mut self) -> Result<StringLit, ParseError> {
        match &self.peek().tok {
            Tok::Str(value) => {
                let value = value.clone();
                let span = self.advance().span;
                Ok(StringLit { value, span })
            }
            _ => Err(self.unexpected("a string literal")),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.peek();
        SyntaxError {
            found: token.tok.describe(),
            expected: expected.to_string(),
            span: token.span,
            src: self.source.named_source(),
        }
        .into()
    }

    /// Span from `start` to the end of the previously consumed token.
    fn span_from(&self, start: Span) -> Span {
        let prev = &self.tokens[self.pos.saturating_sub(1)];
        join(start, prev.span)
    }

    // ------------------------------------------------------------------
    // statements

    /// Parse nodes until one of `end_tags` opens a statement tag. The end
    /// tag name is consumed and returned; the rest of that tag is left to
    /// the caller.
    fn parse_body(
        &mut self,
        end_tags: EndTags,
        open: Option<(&str, Span)>,
    ) -> Result<(Vec<Node>, Option<Ident>), ParseError> {
        let mut nodes = Vec::new();

        loop {
            let token = self.peek().clone();
            match token.tok {
                Tok::Eof => {
                    return match open {
                        Some((kind, open_span)) => Err(UnclosedError {
                            kind: format!("`{kind}` block"),
                            close_delim: format!("{{% {} %}}", end_tags.last().copied().unwrap_or("end")),
                            open_span,
                            src: self.source.named_source(),
                        }
                        .into()),
                        None => Ok((nodes, None)),
                    };
                }
                Tok::Text(text) => {
                    self.advance();
                    nodes.push(Node::Text(TextNode {
                        text,
                        span: token.span,
                    }));
                }
                Tok::VarStart => {
                    self.advance();
                    let expr = self.parse_expr()?;
                    if self.peek().tok != Tok::VarEnd {
                        return Err(self.unexpected("`}}`"));
                    }
                    self.advance();
                    nodes.push(Node::Print(PrintNode {
                        expr,
                        span: self.span_from(token.span),
                    }));
                }
                Tok::BlockStart => {
                    self.advance();
                    if let Tok::Name(name) = &self.peek().tok
                        && end_tags.contains(&name.as_str())
                    {
                        let end = self.expect_ident()?;
                        return Ok((nodes, Some(end)));
                    }
                    nodes.push(self.parse_statement(token.span)?);
                }
                _ => return Err(self.unexpected("template text or a tag")),
            }
        }
    }

    fn parse_statement(&mut self, start: Span) -> Result<Node, ParseError> {
        let keyword = match &self.peek().tok {
            Tok::Name(n) => n.clone(),
            _ => return Err(self.unexpected("a statement name")),
        };

        match keyword.as_str() {
            "if" => {
                self.advance();
                Ok(Node::If(self.parse_if_rest(start)?))
            }
            "for" => self.parse_for(start),
            "set" => self.parse_set(start),
            "with" => self.parse_with(start),
            "include" => {
                self.advance();
                let template = self.expect_string()?;
                self.skip_include_modifiers();
                self.expect_block_end()?;
                Ok(Node::Include(IncludeNode {
                    template,
                    span: self.span_from(start),
                }))
            }
            "extends" => {
                self.advance();
                let template = self.expect_string()?;
                self.expect_block_end()?;
                Ok(Node::Extends(ExtendsNode {
                    template,
                    span: self.span_from(start),
                }))
            }
            "block" => self.parse_block(start),
            "macro" => self.parse_macro(start),
            _ => Err(self.unexpected(
                "a statement (if, for, set, with, include, extends, block or macro)",
            )),
        }
    }

    /// `ignore missing` and `with context` / `without context` do not change
    /// what gets compiled, so they are accepted and dropped.
    fn skip_include_modifiers(&mut self) {
        if self.at_name("ignore") && matches!(self.peek_nth(1), Tok::Name(n) if n == "missing") {
            self.advance();
            self.advance();
        }
        if (self.at_name("with") || self.at_name("without"))
            && matches!(self.peek_nth(1), Tok::Name(n) if n == "context")
        {
            self.advance();
            self.advance();
        }
    }

    /// Everything after `if`/`elif`: test, body and the chain that follows.
    fn parse_if_rest(&mut self, start: Span) -> Result<IfNode, ParseError> {
        let test = self.parse_expr()?;
        self.expect_block_end()?;
        let (body, end) = self.parse_body(&["elif", "else", "endif"], Some(("if", start)))?;

        let otherwise = match end.as_ref().map(|e| e.name.as_str()) {
            Some("elif") => {
                let elif_start = end.as_ref().map_or(start, |e| e.span);
                vec![Node::If(self.parse_if_rest(elif_start)?)]
            }
            Some("else") => {
                self.expect_block_end()?;
                let (otherwise, _) = self.parse_body(&["endif"], Some(("if", start)))?;
                self.expect_block_end()?;
                otherwise
            }
            _ => {
                self.expect_block_end()?;
                Vec::new()
            }
        };

        Ok(IfNode {
            test,
            body,
            otherwise,
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self, start: Span) -> Result<Node, ParseError> {
        self.expect_name("for")?;
        let target = self.parse_for_target()?;
        self.expect_name("in")?;
        let iter = self.parse_or()?;
        let filter = if self.eat_name("if") {
            Some(self.parse_expr()?)
        } else {
            None
        };
        if self.at_name("recursive") {
            return Err(self.unexpected("`%}`"));
        }
        self.expect_block_end()?;

        let (body, end) = self.parse_body(&["else", "endfor"], Some(("for", start)))?;
        if let Some(end) = end
            && end.name == "else"
        {
            return Err(SyntaxError {
                found: "`else` in a for loop".to_string(),
                expected: "`endfor`".to_string(),
                span: end.span,
                src: self.source.named_source(),
            }
            .into());
        }
        self.expect_block_end()?;

        Ok(Node::For(ForNode {
            target,
            iter,
            filter,
            body,
            span: self.span_from(start),
        }))
    }

    /// `x`, `k, v` or `(k, v)`.
    fn parse_for_target(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek().span;
        let parenthesized = self.eat_op("(");
        let mut items = vec![Expr::Var(self.expect_ident()?)];
        while self.eat_op(",") {
            if self.at_name("in") || self.at_op(")") {
                break;
            }
            items.push(Expr::Var(self.expect_ident()?));
        }
        if parenthesized {
            self.expect_op(")")?;
        }

        if items.len() == 1 && !parenthesized {
            return Ok(items.remove(0));
        }
        Ok(Expr::Tuple(ListExpr {
            items,
            span: self.span_from(start),
        }))
    }

    fn parse_set(&mut self, start: Span) -> Result<Node, ParseError> {
        self.expect_name("set")?;
        let target = self.expect_ident()?;
        self.expect_op("=")?;
        let value = self.parse_expr()?;
        self.expect_block_end()?;
        Ok(Node::Set(SetNode {
            target,
            value,
            span: self.span_from(start),
        }))
    }

    fn parse_with(&mut self, start: Span) -> Result<Node, ParseError> {
        self.expect_name("with")?;

        let mut body = Vec::new();
        while self.peek().tok != Tok::BlockEnd {
            if !body.is_empty() {
                self.expect_op(",")?;
            }
            let target = self.expect_ident()?;
            self.expect_op("=")?;
            let value = self.parse_expr()?;
            let span = join(target.span, value.span());
            body.push(Node::Set(SetNode {
                target,
                value,
                span,
            }));
        }
        self.expect_block_end()?;

        let (inner, _) = self.parse_body(&["endwith"], Some(("with", start)))?;
        self.expect_block_end()?;
        body.extend(inner);

        Ok(Node::With(WithNode {
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_block(&mut self, start: Span) -> Result<Node, ParseError> {
        self.expect_name("block")?;
        let name = self.expect_ident()?;
        self.eat_name("scoped");
        self.expect_block_end()?;

        let (body, _) = self.parse_body(&["endblock"], Some(("block", start)))?;
        if let Tok::Name(closing) = &self.peek().tok {
            if *closing != name.name {
                return Err(self.unexpected(&format!("`{}` or `%}}`", name.name)));
            }
            self.advance();
        }
        self.expect_block_end()?;

        Ok(Node::Block(BlockNode {
            name,
            body,
            span: self.span_from(start),
        }))
    }

    fn parse_macro(&mut self, start: Span) -> Result<Node, ParseError> {
        self.expect_name("macro")?;
        let name = self.expect_ident()?;
        self.expect_op("(")?;
        let mut params = Vec::new();
        while !self.at_op(")") {
            if !params.is_empty() {
                self.expect_op(",")?;
                if self.at_op(")") {
                    break;
                }
            }
            params.push(self.expect_ident()?);
        }
        self.expect_op(")")?;
        self.expect_block_end()?;

        let (body, _) = self.parse_body(&["endmacro"], Some(("macro", start)))?;
        self.expect_block_end()?;

        Ok(Node::Macro(MacroNode {
            name,
            params,
            body,
            span: self.span_from(start),
        }))
    }

    // ------------------------------------------------------------------
    // expressions

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let value = self.parse_or()?;
        if !self.eat_name("if") {
            return Ok(value);
        }

        let condition = self.parse_or()?;
        let otherwise = if self.eat_name("else") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let span = self.span_from(value.span());
        Ok(Expr::Ternary(TernaryExpr {
            condition: Box::new(condition),
            value: Box::new(value),
            otherwise,
            span,
        }))
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_name("or") {
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.eat_name("and") {
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.at_name("not") {
            let start = self.advance().span;
            let expr = self.parse_not()?;
            return Ok(Expr::Unary(UnaryExpr {
                op: UnaryOp::Not,
                span: join(start, expr.span()),
                expr: Box::new(expr),
            }));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_concat()?;
        let mut ops = Vec::new();

        loop {
            let op = match &self.peek().tok {
                Tok::Op("==") => CompareOp::Eq,
                Tok::Op("!=") => CompareOp::Ne,
                Tok::Op("<") => CompareOp::Lt,
                Tok::Op("<=") => CompareOp::Le,
                Tok::Op(">") => CompareOp::Gt,
                Tok::Op(">=") => CompareOp::Ge,
                Tok::Name(n) if n == "in" => CompareOp::In,
                Tok::Name(n) if n == "not" && matches!(self.peek_nth(1), Tok::Name(m) if m == "in") => {
                    CompareOp::NotIn
                }
                _ => break,
            };
            if op == CompareOp::NotIn {
                self.advance();
            }
            self.advance();
            ops.push((op, self.parse_concat()?));
        }

        if ops.is_empty() {
            return Ok(left);
        }
        let span = self.span_from(left.span());
        Ok(Expr::Compare(CompareExpr {
            left: Box::new(left),
            ops,
            span,
        }))
    }

    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.eat_op("~") {
            let right = self.parse_additive()?;
            left = binary(BinaryOp::Concat, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_op("+") {
                BinaryOp::Add
            } else if self.eat_op("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_pow()?;
        loop {
            let op = if self.eat_op("*") {
                BinaryOp::Mul
            } else if self.eat_op("//") {
                BinaryOp::FloorDiv
            } else if self.eat_op("/") {
                BinaryOp::Div
            } else if self.eat_op("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_pow()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_pow(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary(true)?;
        while self.eat_op("**") {
            let right = self.parse_unary(true)?;
            left = binary(BinaryOp::Pow, left, right);
        }
        Ok(left)
    }

    /// A sign binds tighter than filters: `-x|abs` is `(-x)|abs`.
    fn parse_unary(&mut self, with_filters: bool) -> Result<Expr, ParseError> {
        let start = self.peek().span;
        let sign = if self.eat_op("-") {
            Some(UnaryOp::Neg)
        } else if self.eat_op("+") {
            Some(UnaryOp::Pos)
        } else {
            None
        };

        let mut expr = match sign {
            Some(op) => {
                let operand = self.parse_unary(false)?;
                Expr::Unary(UnaryExpr {
                    op,
                    span: join(start, operand.span()),
                    expr: Box::new(operand),
                })
            }
            None => self.parse_primary()?,
        };
        expr = self.parse_postfix(expr)?;
        if with_filters {
            expr = self.parse_filters(expr)?;
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            if self.eat_op(".") {
                let token = self.advance();
                expr = match token.tok {
                    Tok::Name(name) => Expr::Field(FieldExpr {
                        span: join(expr.span(), token.span),
                        base: Box::new(expr),
                        field: Ident {
                            name,
                            span: token.span,
                        },
                    }),
                    Tok::Int(i) => Expr::Index(IndexExpr {
                        span: join(expr.span(), token.span),
                        base: Box::new(expr),
                        index: Box::new(Expr::Literal(Literal {
                            value: LiteralValue::Int(i),
                            span: token.span,
                        })),
                    }),
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("an attribute name"));
                    }
                };
            } else if self.at_op("[") {
                self.advance();
                expr = self.parse_subscript(expr)?;
            } else if self.at_op("(") {
                self.advance();
                let args = self.parse_call_args()?;
                expr = Expr::Call(CallExpr {
                    span: self.span_from(expr.span()),
                    func: Box::new(expr),
                    args,
                });
            } else {
                return Ok(expr);
            }
        }
    }

    /// After `[`: either an index or a slice.
    fn parse_subscript(&mut self, base: Expr) -> Result<Expr, ParseError> {
        let start = if self.at_op(":") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };

        if !self.eat_op(":") {
            self.expect_op("]")?;
            let index = start.ok_or_else(|| self.unexpected("an index"))?;
            return Ok(Expr::Index(IndexExpr {
                span: self.span_from(base.span()),
                base: Box::new(base),
                index,
            }));
        }

        let stop = if self.at_op(":") || self.at_op("]") {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let step = if self.eat_op(":") && !self.at_op("]") {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect_op("]")?;

        Ok(Expr::Slice(SliceExpr {
            span: self.span_from(base.span()),
            base: Box::new(base),
            start,
            stop,
            step,
        }))
    }

    /// After `(`: positional arguments up to the closing paren.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        while !self.at_op(")") {
            if !args.is_empty() {
                self.expect_op(",")?;
                if self.at_op(")") {
                    break;
                }
            }
            if matches!(self.peek().tok, Tok::Name(_)) && matches!(self.peek_nth(1), Tok::Op("=")) {
                return Err(SyntaxError {
                    found: "keyword argument".to_string(),
                    expected: "a positional argument".to_string(),
                    span: self.peek().span,
                    src: self.source.named_source(),
                }
                .into());
            }
            args.push(self.parse_expr()?);
        }
        self.expect_op(")")?;
        Ok(args)
    }

    fn parse_filters(&mut self, mut expr: Expr) -> Result<Expr, ParseError> {
        loop {
            if self.eat_op("|") {
                let name = self.expect_ident()?;
                let args = if self.eat_op("(") {
                    self.parse_call_args()?
                } else {
                    Vec::new()
                };
                expr = Expr::Filter(FilterExpr {
                    span: self.span_from(expr.span()),
                    expr: Box::new(expr),
                    name,
                    args,
                });
            } else if self.eat_name("is") {
                let negated = self.eat_name("not");
                let name = self.expect_ident()?;
                let args = if self.eat_op("(") {
                    self.parse_call_args()?
                } else if self.starts_bare_test_arg() {
                    let arg = self.parse_primary()?;
                    vec![self.parse_postfix(arg)?]
                } else {
                    Vec::new()
                };
                expr = Expr::Test(TestExpr {
                    span: self.span_from(expr.span()),
                    expr: Box::new(expr),
                    name,
                    args,
                    negated,
                });
            } else {
                return Ok(expr);
            }
        }
    }

    /// `x is divisibleby 3` passes `3` without parentheses.
    fn starts_bare_test_arg(&self) -> bool {
        match &self.peek().tok {
            Tok::Name(n) => !matches!(
                n.as_str(),
                "else" | "or" | "and" | "if" | "is" | "in" | "not"
            ),
            Tok::Str(_) | Tok::Int(_) | Tok::Float(_) => true,
            Tok::Op(op) => matches!(*op, "[" | "{"),
            _ => false,
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let literal = |value| Expr::Literal(Literal {
            value,
            span: token.span,
        });

        match &token.tok {
            Tok::Name(name) => Ok(match name.as_str() {
                "true" | "True" => literal(LiteralValue::Bool(true)),
                "false" | "False" => literal(LiteralValue::Bool(false)),
                "none" | "None" => literal(LiteralValue::None),
                _ => Expr::Var(Ident {
                    name: name.clone(),
                    span: token.span,
                }),
            }),
            Tok::Str(s) => {
                // Adjacent string literals are joined: `"a" "b"`.
                let mut value = s.clone();
                while let Tok::Str(next) = &self.peek().tok {
                    value.push_str(next);
                    self.advance();
                }
                Ok(Expr::Literal(Literal {
                    value: LiteralValue::String(value),
                    span: self.span_from(token.span),
                }))
            }
            Tok::Int(i) => Ok(literal(LiteralValue::Int(*i))),
            Tok::Float(f) => Ok(literal(LiteralValue::Float(*f))),
            Tok::Op("(") => self.parse_paren(token.span),
            Tok::Op("[") => {
                let items = self.parse_sequence("]")?;
                Ok(Expr::List(ListExpr {
                    items,
                    span: self.span_from(token.span),
                }))
            }
            Tok::Op("{") => self.parse_dict(token.span),
            _ => {
                self.pos -= 1;
                Err(self.unexpected("an expression"))
            }
        }
    }

    /// After `(`: a grouped expression or a tuple.
    fn parse_paren(&mut self, start: Span) -> Result<Expr, ParseError> {
        if self.eat_op(")") {
            return Ok(Expr::Tuple(ListExpr {
                items: Vec::new(),
                span: self.span_from(start),
            }));
        }

        let first = self.parse_expr()?;
        if self.eat_op(")") {
            return Ok(first);
        }

        self.expect_op(",")?;
        let mut items = vec![first];
        items.extend(self.parse_sequence(")")?);
        Ok(Expr::Tuple(ListExpr {
            items,
            span: self.span_from(start),
        }))
    }

    /// Comma separated expressions up to `close`, trailing comma allowed.
    fn parse_sequence(&mut self, close: &str) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.at_op(close) {
            if !items.is_empty() {
                self.expect_op(",")?;
                if self.at_op(close) {
                    break;
                }
            }
            items.push(self.parse_expr()?);
        }
        self.expect_op(close)?;
        Ok(items)
    }

    fn parse_dict(&mut self, start: Span) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        while !self.at_op("}") {
            if !entries.is_empty() {
                self.expect_op(",")?;
                if self.at_op("}") {
                    break;
                }
            }
            let key = self.parse_expr()?;
            self.expect_op(":")?;
            let value = self.parse_expr()?;
            entries.push((key, value));
        }
        self.expect_op("}")?;
        Ok(Expr::Dict(DictExpr {
            entries,
            span: self.span_from(start),
        }))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary(BinaryExpr {
        op,
        span: join(left.span(), right.span()),
        left: Box::new(left),
        right: Box::new(right),
    })
}
