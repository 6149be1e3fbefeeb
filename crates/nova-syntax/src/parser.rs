use crate::ast;
use crate::lexer::{Token, TokenKind};
use crate::Span;

/// Words that never start a type reference or name a declaration.
fn is_reserved(text: &str) -> bool {
    matches!(
        text,
        "abstract"
            | "assert"
            | "break"
            | "case"
            | "catch"
            | "class"
            | "continue"
            | "default"
            | "do"
            | "else"
            | "enum"
            | "extends"
            | "false"
            | "final"
            | "finally"
            | "for"
            | "if"
            | "implements"
            | "import"
            | "instanceof"
            | "interface"
            | "native"
            | "new"
            | "null"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "return"
            | "static"
            | "strictfp"
            | "super"
            | "switch"
            | "synchronized"
            | "this"
            | "throw"
            | "throws"
            | "transient"
            | "true"
            | "try"
            | "volatile"
            | "while"
    )
}

/// Nesting budget shared by statements, expressions, type arguments and type
/// bodies. Anything deeper is kept as a `Missing` or `Empty` node, so the tree
/// handed to later passes has bounded depth.
const MAX_NESTING: usize = 128;

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    eof: Token,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>, len: usize) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            eof: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                range: Span::new(len, len),
            },
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> &Token {
        self.peek_n(0)
    }

    fn peek_n(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    fn nth_kind(&self, n: usize) -> TokenKind {
        self.peek_n(n).kind
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn nth_is_keyword(&self, n: usize, keyword: &str) -> bool {
        let token = self.peek_n(n);
        token.kind == TokenKind::Ident && token.text == keyword
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.nth_is_keyword(0, keyword)
    }

    fn at_name(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Ident && !is_reserved(&token.text)
    }

    fn bump(&mut self) -> Token {
        if self.is_eof() {
            return self.eof.clone();
        }
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at_kind(kind) {
            Some(self.bump())
        } else {
            None
        }
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|tok| tok.range.end)
            .unwrap_or(0)
    }

    /// Consumes `kind` if present; otherwise returns an empty placeholder and
    /// leaves the stream untouched so enclosing constructs can recover.
    fn expect_kind(&mut self, kind: TokenKind) -> Token {
        if let Some(tok) = self.eat(kind) {
            return tok;
        }
        let at = self.prev_end();
        Token {
            kind,
            text: String::new(),
            range: Span::new(at, at),
        }
    }

    fn expect_ident(&mut self) -> Token {
        self.expect_kind(TokenKind::Ident)
    }

    fn empty_span_here(&self) -> Span {
        let at = self.prev_end();
        Span::new(at, at)
    }

    fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING {
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Skips the rest of an expression, stopping before the token that ends it.
    fn skip_expr_tail(&mut self) -> Span {
        let start = self.peek().range.start;
        let mut end = start;
        loop {
            match self.peek().kind {
                TokenKind::Eof
                | TokenKind::Semi
                | TokenKind::Comma
                | TokenKind::Colon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace => break,
                TokenKind::LParen => self.skip_balanced(TokenKind::LParen, TokenKind::RParen),
                TokenKind::LBracket => self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket),
                TokenKind::LBrace => self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace),
                _ => {
                    self.bump();
                }
            }
            end = self.prev_end();
        }
        Span::new(start, end)
    }

    /// Skips one statement: up to and including `;`, or through a braced body.
    fn skip_stmt_tail(&mut self) -> Span {
        let start = self.peek().range.start;
        let mut end = start;
        loop {
            match self.peek().kind {
                TokenKind::Eof | TokenKind::RBrace => break,
                TokenKind::Semi => {
                    end = self.bump().range.end;
                    break;
                }
                TokenKind::LBrace => {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    end = self.prev_end();
                    break;
                }
                TokenKind::LParen => self.skip_balanced(TokenKind::LParen, TokenKind::RParen),
                TokenKind::LBracket => self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket),
                _ => {
                    self.bump();
                }
            }
            end = self.prev_end();
        }
        Span::new(start, end)
    }

    pub(crate) fn parse_compilation_unit(&mut self) -> ast::CompilationUnit {
        let package = if self.at_keyword("package") {
            Some(self.parse_package_decl())
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.at_keyword("import") {
            imports.push(self.parse_import_decl());
        }

        let mut types = Vec::new();
        while !self.is_eof() {
            let before = self.pos;
            if let Some(decl) = self.parse_type_decl() {
                types.push(decl);
            }
            if self.pos == before {
                self.bump();
            }
        }

        ast::CompilationUnit {
            package,
            imports,
            types,
            range: Span::new(0, self.eof.range.end),
        }
    }

    fn parse_package_decl(&mut self) -> ast::PackageDecl {
        let kw = self.bump();
        let (name, name_range) = self.parse_qualified_name();
        let end = self
            .eat(TokenKind::Semi)
            .map(|semi| semi.range.end)
            .unwrap_or(name_range.end);
        ast::PackageDecl {
            name,
            range: Span::new(kw.range.start, end),
        }
    }

    fn parse_import_decl(&mut self) -> ast::ImportDecl {
        let kw = self.bump();
        let mut is_static = false;
        if self.at_keyword("static") {
            is_static = true;
            self.bump();
        }

        let mut parts = Vec::new();
        let first = self.expect_ident();
        parts.push(first.text);

        let mut is_star = false;
        while self.at_kind(TokenKind::Dot) {
            self.bump();
            if self.eat(TokenKind::Star).is_some() {
                is_star = true;
                break;
            }
            let part = self.expect_ident();
            parts.push(part.text);
        }

        let end = match self.eat(TokenKind::Semi) {
            Some(semi) => semi.range.end,
            None => self.prev_end(),
        };

        ast::ImportDecl {
            is_static,
            is_star,
            path: parts.join("."),
            range: Span::new(kw.range.start, end),
        }
    }

    fn parse_qualified_name(&mut self) -> (String, Span) {
        let first = self.expect_ident();
        let start = first.range.start;
        let mut end = first.range.end;
        let mut parts = vec![first.text];

        while self.at_kind(TokenKind::Dot) && self.nth_kind(1) == TokenKind::Ident {
            self.bump();
            let part = self.bump();
            end = part.range.end;
            parts.push(part.text);
        }

        (parts.join("."), Span::new(start, end))
    }

    fn parse_modifiers(&mut self) -> ast::Modifiers {
        let start = self.peek().range.start;
        let mut end = start;
        let mut modifiers = ast::Modifiers::default();

        loop {
            if self.at_kind(TokenKind::At) && !self.nth_is_keyword(1, "interface") {
                let at = self.bump();
                let (name, name_range) = self.parse_qualified_name();
                let mut text = format!("@{name}");
                end = name_range.end;
                if self.at_kind(TokenKind::LParen) {
                    let (args, args_end) = self.collect_balanced(TokenKind::LParen, TokenKind::RParen);
                    text.push_str(&args);
                    end = args_end;
                }
                modifiers.annotations.push(ast::Annotation {
                    name,
                    text,
                    range: Span::new(at.range.start, end),
                });
                continue;
            }

            if !self.at_kind(TokenKind::Ident) {
                break;
            }
            match self.peek().text.as_str() {
                "public" => modifiers.visibility = ast::Visibility::Public,
                "protected" => modifiers.visibility = ast::Visibility::Protected,
                "private" => modifiers.visibility = ast::Visibility::Private,
                "static" => modifiers.is_static = true,
                "final" => modifiers.is_final = true,
                "abstract" => modifiers.is_abstract = true,
                "default" if self.nth_kind(1) != TokenKind::Colon => modifiers.is_default = true,
                "synchronized" if self.nth_kind(1) != TokenKind::LParen => {}
                "native" | "transient" | "volatile" | "strictfp" | "sealed" => {}
                "non" if self.nth_kind(1) == TokenKind::Minus && self.nth_is_keyword(2, "sealed") => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
            end = self.bump().range.end;
        }

        modifiers.range = Span::new(start, end.max(start));
        modifiers
    }

    /// Parses a class-like declaration, rewinding when the tokens do not start one.
    fn parse_type_decl(&mut self) -> Option<ast::ClassDecl> {
        let start_pos = self.pos;
        let start = self.peek().range.start;
        let modifiers = self.parse_modifiers();

        let kind = if self.at_kind(TokenKind::At) && self.nth_is_keyword(1, "interface") {
            self.bump();
            ast::ClassKind::Annotation
        } else if self.at_keyword("class") {
            ast::ClassKind::Class
        } else if self.at_keyword("interface") {
            ast::ClassKind::Interface
        } else if self.at_keyword("enum") {
            ast::ClassKind::Enum
        } else if self.at_keyword("record")
            && self.nth_kind(1) == TokenKind::Ident
            && matches!(self.nth_kind(2), TokenKind::LParen | TokenKind::Lt)
        {
            ast::ClassKind::Record
        } else {
            self.pos = start_pos;
            return None;
        };
        self.bump();

        let name = self.expect_ident();
        if self.at_kind(TokenKind::Lt) {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt);
        }
        if kind == ast::ClassKind::Record && self.at_kind(TokenKind::LParen) {
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
        }

        let mut extends = Vec::new();
        let mut implements = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::LBrace) {
            if self.at_keyword("extends") {
                self.bump();
                extends = self.parse_type_list();
            } else if self.at_keyword("implements") {
                self.bump();
                implements = self.parse_type_list();
            } else if self.at_kind(TokenKind::Semi) || self.at_kind(TokenKind::RBrace) {
                break;
            } else {
                // `permits` lists and stray tokens.
                self.bump();
            }
        }

        let (enum_constants, members, body_range) = self.parse_type_body(&name.text, kind);
        Some(ast::ClassDecl {
            kind,
            modifiers,
            name: name.text,
            name_range: name.range,
            extends,
            implements,
            enum_constants,
            members,
            body_range,
            range: Span::new(start, body_range.end.max(start)),
        })
    }

    fn parse_type_list(&mut self) -> Vec<ast::TypeRef> {
        let mut types = Vec::new();
        while let Some(ty) = self.parse_type_ref() {
            types.push(ty);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        types
    }

    fn parse_type_body(
        &mut self,
        type_name: &str,
        kind: ast::ClassKind,
    ) -> (Vec<ast::EnumConstant>, Vec<ast::MemberDecl>, Span) {
        if !self.at_kind(TokenKind::LBrace) {
            return (Vec::new(), Vec::new(), self.empty_span_here());
        }
        if !self.enter() {
            let start = self.peek().range.start;
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            return (Vec::new(), Vec::new(), Span::new(start, self.prev_end()));
        }
        let lbrace = self.bump();
        let enum_constants = if kind == ast::ClassKind::Enum {
            self.parse_enum_constants()
        } else {
            Vec::new()
        };
        let members = self.parse_members(type_name);
        let rbrace = self.expect_kind(TokenKind::RBrace);
        self.leave();
        (
            enum_constants,
            members,
            Span::new(lbrace.range.start, rbrace.range.end),
        )
    }

    fn parse_members(&mut self, type_name: &str) -> Vec<ast::MemberDecl> {
        let mut members = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RBrace) {
            let before = self.pos;
            self.parse_member_decl(type_name, &mut members);
            if self.pos == before {
                self.bump();
            }
        }
        members
    }

    fn parse_enum_constants(&mut self) -> Vec<ast::EnumConstant> {
        let mut constants = Vec::new();
        loop {
            if self.eat(TokenKind::Semi).is_some() || self.at_kind(TokenKind::RBrace) || self.is_eof() {
                break;
            }
            let before = self.pos;
            self.parse_modifiers();
            if self.at_name() {
                let name = self.bump();
                let args = if self.at_kind(TokenKind::LParen) {
                    self.parse_arg_list().0
                } else {
                    Vec::new()
                };
                if self.at_kind(TokenKind::LBrace) {
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                }
                constants.push(ast::EnumConstant {
                    range: Span::new(name.range.start, self.prev_end()),
                    name: name.text,
                    name_range: name.range,
                    args,
                });
            }
            if self.eat(TokenKind::Comma).is_none() && self.pos == before {
                self.bump();
            }
        }
        constants
    }

    fn parse_member_decl(&mut self, type_name: &str, out: &mut Vec<ast::MemberDecl>) {
        let start = self.peek().range.start;

        if self.eat(TokenKind::Semi).is_some() {
            return;
        }

        if self.at_kind(TokenKind::LBrace)
            || (self.at_keyword("static") && self.nth_kind(1) == TokenKind::LBrace)
        {
            let is_static = self.eat(TokenKind::Ident).is_some();
            let body = self.parse_block();
            out.push(ast::MemberDecl::Initializer(ast::InitializerDecl {
                is_static,
                range: Span::new(start, body.range.end),
                body,
            }));
            return;
        }

        if let Some(decl) = self.parse_type_decl() {
            out.push(ast::MemberDecl::Type(decl));
            return;
        }

        let modifiers = self.parse_modifiers();
        if self.at_kind(TokenKind::Lt) {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt);
        }

        if !type_name.is_empty()
            && self.at_kind(TokenKind::Ident)
            && self.peek().text == type_name
            && self.nth_kind(1) == TokenKind::LParen
        {
            let name = self.bump();
            let params = self.parse_param_list();
            self.skip_throws_clause();
            let body = self.parse_block();
            if body.range.is_empty() {
                self.eat(TokenKind::Semi);
            }
            out.push(ast::MemberDecl::Constructor(ast::ConstructorDecl {
                modifiers,
                name: name.text,
                name_range: name.range,
                params,
                range: Span::new(start, self.prev_end()),
                body,
            }));
            return;
        }

        let Some(ty) = self.parse_type_ref() else {
            return;
        };
        if !self.at_name() {
            return;
        }
        let name = self.bump();

        if self.at_kind(TokenKind::LParen) {
            let params = self.parse_param_list();
            let mut return_ty = ty;
            while self.at_kind(TokenKind::LBracket) && self.nth_kind(1) == TokenKind::RBracket {
                self.bump();
                self.bump();
                return_ty.array_dims = return_ty.array_dims.saturating_add(1);
            }
            self.skip_throws_clause();
            if self.at_keyword("default") {
                while !self.is_eof() && !self.at_kind(TokenKind::Semi) && !self.at_kind(TokenKind::RBrace) {
                    self.bump();
                }
            }
            let body = if self.at_kind(TokenKind::LBrace) {
                Some(self.parse_block())
            } else {
                self.eat(TokenKind::Semi);
                None
            };
            out.push(ast::MemberDecl::Method(ast::MethodDecl {
                modifiers,
                return_ty,
                name: name.text,
                name_range: name.range,
                params,
                body,
                range: Span::new(start, self.prev_end()),
            }));
            return;
        }

        // Fields: one declaration per declarator.
        let mut name = name;
        let mut decl_start = start;
        loop {
            let mut field_ty = ty.clone();
            while self.at_kind(TokenKind::LBracket) && self.nth_kind(1) == TokenKind::RBracket {
                self.bump();
                self.bump();
                field_ty.array_dims = field_ty.array_dims.saturating_add(1);
            }
            let initializer = if self.eat(TokenKind::Eq).is_some() {
                Some(self.parse_var_initializer())
            } else {
                None
            };
            out.push(ast::MemberDecl::Field(ast::FieldDecl {
                modifiers: modifiers.clone(),
                ty: field_ty,
                name: name.text,
                name_range: name.range,
                initializer,
                range: Span::new(decl_start, self.prev_end()),
            }));

            if self.at_kind(TokenKind::Comma) && self.nth_kind(1) == TokenKind::Ident {
                self.bump();
                name = self.bump();
                decl_start = name.range.start;
                continue;
            }
            break;
        }

        if let Some(semi) = self.eat(TokenKind::Semi) {
            if let Some(ast::MemberDecl::Field(last)) = out.last_mut() {
                last.range.end = semi.range.end;
            }
        }
    }

    fn skip_throws_clause(&mut self) {
        if !self.at_keyword("throws") {
            return;
        }
        self.bump();
        while !self.is_eof()
            && !self.at_kind(TokenKind::LBrace)
            && !self.at_kind(TokenKind::Semi)
            && !self.at_kind(TokenKind::RBrace)
        {
            self.bump();
        }
    }

    fn parse_type_ref(&mut self) -> Option<ast::TypeRef> {
        if !self.at_name() {
            return None;
        }
        let first = self.bump();
        let start = first.range.start;
        let mut end = first.range.end;
        let mut name = first.text;
        let mut type_args = Vec::new();

        loop {
            if self.at_kind(TokenKind::Lt) {
                let (args, args_end) = self.parse_type_args();
                type_args = args;
                end = args_end;
            }
            if self.at_kind(TokenKind::Dot)
                && self.nth_kind(1) == TokenKind::Ident
                && !is_reserved(&self.peek_n(1).text)
            {
                self.bump();
                let part = self.bump();
                name.push('.');
                name.push_str(&part.text);
                end = part.range.end;
                type_args.clear();
                continue;
            }
            break;
        }

        let mut array_dims = 0u8;
        while self.at_kind(TokenKind::LBracket) && self.nth_kind(1) == TokenKind::RBracket {
            self.bump();
            let rb = self.bump();
            array_dims = array_dims.saturating_add(1);
            end = rb.range.end;
        }

        Some(ast::TypeRef {
            name,
            type_args,
            array_dims,
            range: Span::new(start, end),
        })
    }

    fn parse_type_args(&mut self) -> (Vec<ast::TypeRef>, usize) {
        if !self.enter() {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt);
            return (Vec::new(), self.prev_end());
        }
        let lt = self.bump();
        let mut args = Vec::new();
        let mut end = lt.range.end;
        while !self.is_eof() && !self.at_kind(TokenKind::Gt) {
            let before = self.pos;
            self.parse_modifiers();
            if let Some(q) = self.eat(TokenKind::Question) {
                let mut wildcard = ast::TypeRef::simple("?", q.range);
                if self.at_keyword("extends") || self.at_keyword("super") {
                    self.bump();
                    if let Some(bound) = self.parse_type_ref() {
                        wildcard.range = Span::new(q.range.start, bound.range.end);
                    }
                }
                args.push(wildcard);
            } else if let Some(arg) = self.parse_type_ref() {
                args.push(arg);
            }
            if self.eat(TokenKind::Comma).is_none() && self.pos == before {
                break;
            }
        }
        if let Some(gt) = self.eat(TokenKind::Gt) {
            end = gt.range.end;
        }
        self.leave();
        (args, end)
    }

    fn parse_param_list(&mut self) -> Vec<ast::ParamDecl> {
        self.expect_kind(TokenKind::LParen);
        let mut params = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RParen) {
            let before = self.pos;
            let start = self.peek().range.start;
            let is_final = self.skip_variable_modifiers_and_annotations();
            if let Some(mut ty) = self.parse_type_ref() {
                let is_varargs = self.eat(TokenKind::Ellipsis).is_some();
                let name = self.expect_ident();
                while self.at_kind(TokenKind::LBracket) && self.nth_kind(1) == TokenKind::RBracket {
                    self.bump();
                    self.bump();
                    ty.array_dims = ty.array_dims.saturating_add(1);
                }
                params.push(ast::ParamDecl {
                    is_final,
                    ty,
                    is_varargs,
                    name: name.text,
                    name_range: name.range,
                    range: Span::new(start, self.prev_end()),
                });
            }

            if self.eat(TokenKind::Comma).is_none() && self.pos == before {
                if self.at_kind(TokenKind::LBrace) || self.at_kind(TokenKind::Semi) {
                    break;
                }
                self.bump();
            }
        }
        self.expect_kind(TokenKind::RParen);
        params
    }

    /// Skips annotations and `final`, reporting whether `final` was present.
    fn skip_variable_modifiers_and_annotations(&mut self) -> bool {
        let mut is_final = false;
        loop {
            if self.at_kind(TokenKind::At) && !self.nth_is_keyword(1, "interface") {
                self.bump();
                if self.at_kind(TokenKind::Ident) {
                    self.parse_qualified_name();
                }
                if self.at_kind(TokenKind::LParen) {
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                }
                continue;
            }

            if self.at_keyword("final") {
                is_final = true;
                self.bump();
                continue;
            }

            break;
        }
        is_final
    }

    fn parse_block(&mut self) -> ast::Block {
        let Some(lbrace) = self.eat(TokenKind::LBrace) else {
            return ast::Block {
                statements: Vec::new(),
                range: self.empty_span_here(),
            };
        };
        let mut statements = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RBrace) {
            let before = self.pos;
            if let Some(locals) = self.try_parse_local_vars() {
                statements.extend(locals);
            } else if let Some(stmt) = self.parse_stmt() {
                statements.push(stmt);
            }
            if self.pos == before {
                self.bump();
            }
        }
        let rbrace = self.expect_kind(TokenKind::RBrace);
        ast::Block {
            statements,
            range: Span::new(lbrace.range.start, rbrace.range.end),
        }
    }

    fn parse_sub_stmt(&mut self) -> Box<ast::Stmt> {
        let stmt = self
            .parse_stmt()
            .unwrap_or_else(|| ast::Stmt::Empty(self.empty_span_here()));
        Box::new(stmt)
    }

    fn parse_stmt(&mut self) -> Option<ast::Stmt> {
        if !self.enter() {
            return Some(ast::Stmt::Empty(self.skip_stmt_tail()));
        }
        let stmt = self.parse_stmt_at_depth();
        self.leave();
        stmt
    }

    fn parse_stmt_at_depth(&mut self) -> Option<ast::Stmt> {
        let start = self.peek().range.start;

        if let Some(semi) = self.eat(TokenKind::Semi) {
            return Some(ast::Stmt::Empty(semi.range));
        }

        if self.at_kind(TokenKind::LBrace) {
            return Some(ast::Stmt::Block(self.parse_block()));
        }

        if self.at_kind(TokenKind::Ident) {
            match self.peek().text.as_str() {
                "return" => {
                    self.bump();
                    let expr = if self.at_kind(TokenKind::Semi) {
                        None
                    } else {
                        Some(self.parse_expr())
                    };
                    let end = self.expect_kind(TokenKind::Semi).range.end.max(self.prev_end());
                    return Some(ast::Stmt::Return(ast::ReturnStmt {
                        expr,
                        range: Span::new(start, end),
                    }));
                }
                "if" => {
                    self.bump();
                    let condition = self.parse_paren_expr();
                    let then_branch = self.parse_sub_stmt();
                    let mut else_ifs = Vec::new();
                    let mut else_branch = None;
                    while self.eat_keyword("else") {
                        if !self.at_keyword("if") {
                            else_branch = Some(self.parse_sub_stmt());
                            break;
                        }
                        let branch_start = self.bump().range.start;
                        let condition = self.parse_paren_expr();
                        let body = self.parse_sub_stmt();
                        else_ifs.push(ast::ElseIf {
                            condition,
                            body,
                            range: Span::new(branch_start, self.prev_end()),
                        });
                    }
                    return Some(ast::Stmt::If(ast::IfStmt {
                        condition,
                        then_branch,
                        else_ifs,
                        else_branch,
                        range: Span::new(start, self.prev_end()),
                    }));
                }
                "while" => {
                    self.bump();
                    let condition = self.parse_paren_expr();
                    let body = self.parse_sub_stmt();
                    return Some(ast::Stmt::While(ast::WhileStmt {
                        condition,
                        body,
                        range: Span::new(start, self.prev_end()),
                    }));
                }
                "do" => {
                    self.bump();
                    let body = self.parse_sub_stmt();
                    let condition = if self.eat_keyword("while") {
                        self.parse_paren_expr()
                    } else {
                        ast::Expr::Missing(self.empty_span_here())
                    };
                    self.eat(TokenKind::Semi);
                    return Some(ast::Stmt::While(ast::WhileStmt {
                        condition,
                        body,
                        range: Span::new(start, self.prev_end()),
                    }));
                }
                "for" => return Some(self.parse_for_stmt()),
                "try" => return Some(self.parse_try_stmt()),
                "throw" => {
                    self.bump();
                    let expr = self.parse_expr();
                    self.eat(TokenKind::Semi);
                    return Some(ast::Stmt::Expr(ast::ExprStmt {
                        expr,
                        range: Span::new(start, self.prev_end()),
                    }));
                }
                "switch" => {
                    self.bump();
                    let selector = self.parse_paren_expr();
                    self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                    return Some(ast::Stmt::Expr(ast::ExprStmt {
                        expr: selector,
                        range: Span::new(start, self.prev_end()),
                    }));
                }
                "synchronized" => {
                    self.bump();
                    let lock = self.parse_paren_expr();
                    let mut block = self.parse_block();
                    block.statements.insert(
                        0,
                        ast::Stmt::Expr(ast::ExprStmt {
                            range: lock.range(),
                            expr: lock,
                        }),
                    );
                    return Some(ast::Stmt::Block(block));
                }
                "break" | "continue" | "assert" | "yield" => {
                    while !self.is_eof() && !self.at_kind(TokenKind::Semi) && !self.at_kind(TokenKind::RBrace) {
                        self.bump();
                    }
                    self.eat(TokenKind::Semi);
                    return Some(ast::Stmt::Empty(Span::new(start, self.prev_end())));
                }
                "else" | "catch" | "finally" | "case" => return None,
                _ => {}
            }

            // Labels.
            if self.at_name() && self.nth_kind(1) == TokenKind::Colon {
                self.bump();
                self.bump();
                return self.parse_stmt();
            }
        }

        if matches!(self.peek().kind, TokenKind::Ident | TokenKind::At) {
            if let Some(decl) = self.parse_type_decl() {
                return Some(ast::Stmt::LocalClass(decl));
            }
        }

        if let Some(mut locals) = self.try_parse_local_vars() {
            if !locals.is_empty() {
                return Some(locals.swap_remove(0));
            }
        }

        let expr = self.parse_expr();
        let start = expr.range().start.min(start);
        self.eat(TokenKind::Semi);
        Some(ast::Stmt::Expr(ast::ExprStmt {
            expr,
            range: Span::new(start, self.prev_end().max(start)),
        }))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn parse_for_stmt(&mut self) -> ast::Stmt {
        let kw = self.bump();
        self.expect_kind(TokenKind::LParen);

        let mut init = Vec::new();
        let mut condition = None;
        let mut updates = Vec::new();
        let mut iterable = None;

        let locals = self.try_parse_local_vars();
        let is_enhanced = locals.is_some() && self.at_kind(TokenKind::Colon);
        if let Some(locals) = locals {
            init.extend(locals);
        }

        if is_enhanced {
            self.bump();
            iterable = Some(self.parse_expr());
        } else {
            if init.is_empty() {
                while !self.is_eof() && !self.at_kind(TokenKind::Semi) && !self.at_kind(TokenKind::RParen) {
                    let before = self.pos;
                    let expr = self.parse_expr();
                    init.push(ast::Stmt::Expr(ast::ExprStmt {
                        range: expr.range(),
                        expr,
                    }));
                    if self.eat(TokenKind::Comma).is_none() && self.pos == before {
                        break;
                    }
                }
                self.eat(TokenKind::Semi);
            }
            if !self.at_kind(TokenKind::Semi) && !self.at_kind(TokenKind::RParen) {
                condition = Some(self.parse_expr());
            }
            self.eat(TokenKind::Semi);
            while !self.is_eof() && !self.at_kind(TokenKind::RParen) {
                let before = self.pos;
                let expr = self.parse_expr();
                if self.pos != before {
                    updates.push(expr);
                }
                if self.eat(TokenKind::Comma).is_none() && self.pos == before {
                    break;
                }
            }
        }
        self.expect_kind(TokenKind::RParen);
        let body = self.parse_sub_stmt();

        ast::Stmt::For(ast::ForStmt {
            init,
            condition,
            updates,
            iterable,
            body,
            range: Span::new(kw.range.start, self.prev_end()),
        })
    }

    fn parse_try_stmt(&mut self) -> ast::Stmt {
        let kw = self.bump();
        if self.at_kind(TokenKind::LParen) {
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
        }
        let body = self.parse_block();

        let mut catches = Vec::new();
        while self.at_keyword("catch") {
            let catch_kw = self.bump();
            self.expect_kind(TokenKind::LParen);
            let param_start = self.peek().range.start;
            let is_final = self.skip_variable_modifiers_and_annotations();
            let mut ty = self
                .parse_type_ref()
                .unwrap_or_else(|| ast::TypeRef::simple("", self.empty_span_here()));
            // Multi-catch: the first alternative stands for the parameter type.
            while self.at_kind(TokenKind::Unknown) && self.peek().text == "|" {
                self.bump();
                if let Some(alt) = self.parse_type_ref() {
                    ty.range.end = alt.range.end;
                }
            }
            let name = self.expect_ident();
            let param = ast::ParamDecl {
                is_final,
                ty,
                is_varargs: false,
                name: name.text,
                name_range: name.range,
                range: Span::new(param_start, self.prev_end()),
            };
            self.expect_kind(TokenKind::RParen);
            let catch_body = self.parse_block();
            catches.push(ast::CatchClause {
                param,
                range: Span::new(catch_kw.range.start, catch_body.range.end),
                body: catch_body,
            });
        }

        let finally = if self.eat_keyword("finally") {
            Some(self.parse_block())
        } else {
            None
        };

        ast::Stmt::Try(ast::TryStmt {
            body,
            catches,
            finally,
            range: Span::new(kw.range.start, self.prev_end()),
        })
    }

    /// Parses `Type name [= init] {, name [= init]} [;]`, rewinding when the
    /// tokens do not form a declaration.
    fn try_parse_local_vars(&mut self) -> Option<Vec<ast::Stmt>> {
        let start_pos = self.pos;
        let start = self.peek().range.start;

        let is_final = self.skip_variable_modifiers_and_annotations();
        let Some(ty) = self.parse_type_ref() else {
            self.pos = start_pos;
            return None;
        };
        if !self.at_name() {
            self.pos = start_pos;
            return None;
        }

        let mut locals: Vec<ast::Stmt> = Vec::new();
        let mut decl_start = start;
        loop {
            let name = self.bump();
            let mut var_ty = ty.clone();
            while self.at_kind(TokenKind::LBracket) && self.nth_kind(1) == TokenKind::RBracket {
                self.bump();
                self.bump();
                var_ty.array_dims = var_ty.array_dims.saturating_add(1);
            }
            let follows_declarator = matches!(
                self.peek().kind,
                TokenKind::Eq | TokenKind::Semi | TokenKind::Comma | TokenKind::Colon | TokenKind::RParen
            );
            if !follows_declarator && locals.is_empty() {
                self.pos = start_pos;
                return None;
            }

            let initializer = if self.eat(TokenKind::Eq).is_some() {
                Some(self.parse_var_initializer())
            } else {
                None
            };
            locals.push(ast::Stmt::LocalVar(ast::LocalVarStmt {
                is_final,
                ty: var_ty,
                name: name.text,
                name_range: name.range,
                initializer,
                range: Span::new(decl_start, self.prev_end()),
            }));

            if self.at_kind(TokenKind::Comma) && self.nth_kind(1) == TokenKind::Ident {
                self.bump();
                decl_start = self.peek().range.start;
                continue;
            }
            break;
        }

        if let Some(semi) = self.eat(TokenKind::Semi) {
            if let Some(ast::Stmt::LocalVar(last)) = locals.last_mut() {
                last.range.end = semi.range.end;
            }
        }
        Some(locals)
    }

    fn parse_var_initializer(&mut self) -> ast::Expr {
        if self.at_kind(TokenKind::LBrace) {
            let start = self.peek().range.start;
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            return ast::Expr::Missing(Span::new(start, self.prev_end()));
        }
        self.parse_expr()
    }

    fn parse_paren_expr(&mut self) -> ast::Expr {
        self.expect_kind(TokenKind::LParen);
        let expr = self.parse_expr();
        self.expect_kind(TokenKind::RParen);
        expr
    }

    fn parse_expr(&mut self) -> ast::Expr {
        self.parse_assignment_expr()
    }

    fn parse_assignment_expr(&mut self) -> ast::Expr {
        if !self.enter() {
            return ast::Expr::Missing(self.skip_expr_tail());
        }
        let expr = self.parse_assignment_expr_at_depth();
        self.leave();
        expr
    }

    fn parse_assignment_expr_at_depth(&mut self) -> ast::Expr {
        let lhs = self.parse_conditional_expr();
        let op = match self.peek().kind {
            TokenKind::Eq => ast::AssignOp::Assign,
            TokenKind::OpEq => ast::AssignOp::Compound,
            _ => return lhs,
        };
        self.bump();
        let rhs = self.parse_assignment_expr();
        let range = Span::new(lhs.range().start, rhs.range().end.max(lhs.range().end));
        ast::Expr::Assign(ast::AssignExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            range,
        })
    }

    fn parse_conditional_expr(&mut self) -> ast::Expr {
        if !self.enter() {
            return ast::Expr::Missing(self.skip_expr_tail());
        }
        let expr = self.parse_conditional_expr_at_depth();
        self.leave();
        expr
    }

    fn parse_conditional_expr_at_depth(&mut self) -> ast::Expr {
        let condition = self.parse_binary_expr(0);
        if self.eat(TokenKind::Question).is_none() {
            return condition;
        }
        let then_expr = self.parse_expr();
        self.expect_kind(TokenKind::Colon);
        let else_expr = self.parse_conditional_expr();
        let range = Span::new(condition.range().start, self.prev_end());
        ast::Expr::Conditional(ast::ConditionalExpr {
            condition: Box::new(condition),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            range,
        })
    }

    fn parse_binary_expr(&mut self, min_prec: u8) -> ast::Expr {
        let depth = self.depth;
        let mut lhs = self.parse_unary_expr();
        loop {
            if self.at_keyword("instanceof") && 40 >= min_prec {
                self.bump();
                let ty = self
                    .parse_type_ref()
                    .unwrap_or_else(|| ast::TypeRef::simple("", self.empty_span_here()));
                // Pattern binding name.
                if self.at_name() {
                    self.bump();
                }
                let range = Span::new(lhs.range().start, self.prev_end());
                lhs = ast::Expr::InstanceOf(ast::InstanceOfExpr {
                    expr: Box::new(lhs),
                    ty,
                    range,
                });
                if !self.enter() {
                    lhs = self.fold_tail(lhs);
                    break;
                }
                continue;
            }

            let (op, prec) = match self.peek().kind {
                TokenKind::PipePipe => (ast::BinaryOp::Or, 10),
                TokenKind::AmpAmp => (ast::BinaryOp::And, 20),
                TokenKind::EqEq => (ast::BinaryOp::Eq, 30),
                TokenKind::BangEq => (ast::BinaryOp::Ne, 30),
                TokenKind::Lt => (ast::BinaryOp::Lt, 40),
                TokenKind::Gt => (ast::BinaryOp::Gt, 40),
                TokenKind::Le => (ast::BinaryOp::Le, 40),
                TokenKind::Ge => (ast::BinaryOp::Ge, 40),
                TokenKind::Plus => (ast::BinaryOp::Add, 50),
                TokenKind::Minus => (ast::BinaryOp::Sub, 50),
                TokenKind::Star => (ast::BinaryOp::Mul, 60),
                TokenKind::Slash => (ast::BinaryOp::Div, 60),
                TokenKind::Percent => (ast::BinaryOp::Rem, 60),
                _ => break,
            };

            if prec < min_prec {
                break;
            }
            self.bump();
            if !self.enter() {
                let tail = self.skip_expr_tail();
                let range = Span::new(lhs.range().start, tail.end.max(lhs.range().end));
                lhs = ast::Expr::Binary(ast::BinaryExpr {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(ast::Expr::Missing(tail)),
                    range,
                });
                break;
            }
            let rhs = self.parse_binary_expr(prec + 1);
            let range = Span::new(lhs.range().start, rhs.range().end.max(lhs.range().end));
            lhs = ast::Expr::Binary(ast::BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                range,
            });
        }
        self.depth = depth;
        lhs
    }

    /// Replaces the remainder of an over-long chain with one `Missing` node.
    fn fold_tail(&mut self, lhs: ast::Expr) -> ast::Expr {
        let tail = self.skip_expr_tail();
        if tail.is_empty() {
            return lhs;
        }
        ast::Expr::Missing(Span::new(lhs.range().start, tail.end))
    }

    fn parse_unary_expr(&mut self) -> ast::Expr {
        if !self.enter() {
            return ast::Expr::Missing(self.skip_expr_tail());
        }
        let expr = self.parse_unary_expr_at_depth();
        self.leave();
        expr
    }

    fn parse_unary_expr_at_depth(&mut self) -> ast::Expr {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(ast::UnaryOp::Not),
            TokenKind::Minus => Some(ast::UnaryOp::Neg),
            TokenKind::Plus => Some(ast::UnaryOp::Plus),
            TokenKind::PlusPlus | TokenKind::MinusMinus => Some(ast::UnaryOp::Step),
            _ => None,
        };
        if let Some(op) = op {
            let tok = self.bump();
            let expr = self.parse_unary_expr();
            let range = Span::new(tok.range.start, expr.range().end.max(tok.range.end));
            return ast::Expr::Unary(ast::UnaryExpr {
                op,
                expr: Box::new(expr),
                range,
            });
        }

        if self.at_kind(TokenKind::LParen) && self.is_cast() {
            let lparen = self.bump();
            let ty = self
                .parse_type_ref()
                .unwrap_or_else(|| ast::TypeRef::simple("", lparen.range));
            self.expect_kind(TokenKind::RParen);
            let expr = self.parse_unary_expr();
            let range = Span::new(lparen.range.start, expr.range().end);
            return ast::Expr::Cast(ast::CastExpr {
                ty,
                expr: Box::new(expr),
                range,
            });
        }

        self.parse_postfix_expr()
    }

    fn is_cast(&mut self) -> bool {
        let start_pos = self.pos;
        self.bump();
        let ty = self.parse_type_ref();
        let is_cast = match ty {
            Some(ty) if self.at_kind(TokenKind::RParen) => {
                let next = self.peek_n(1);
                let operand_follows = match next.kind {
                    TokenKind::Ident => next.text != "instanceof",
                    TokenKind::IntLiteral
                    | TokenKind::LongLiteral
                    | TokenKind::FloatLiteral
                    | TokenKind::DoubleLiteral
                    | TokenKind::CharLiteral
                    | TokenKind::StringLiteral
                    | TokenKind::LParen
                    | TokenKind::Bang => true,
                    TokenKind::Minus | TokenKind::Plus => ty.is_primitive(),
                    _ => false,
                };
                operand_follows
            }
            _ => false,
        };
        self.pos = start_pos;
        is_cast
    }

    fn parse_postfix_expr(&mut self) -> ast::Expr {
        let depth = self.depth;
        let mut expr = self.parse_primary_expr();
        loop {
            let chained = matches!(
                self.peek().kind,
                TokenKind::Dot
                    | TokenKind::LParen
                    | TokenKind::LBracket
                    | TokenKind::PlusPlus
                    | TokenKind::MinusMinus
                    | TokenKind::ColonColon
            );
            if !chained {
                break;
            }
            if !self.enter() {
                expr = self.fold_tail(expr);
                break;
            }

            if self.at_kind(TokenKind::Dot) {
                self.bump();
                if self.at_kind(TokenKind::Lt) {
                    self.skip_balanced(TokenKind::Lt, TokenKind::Gt);
                }
                let name = self.expect_ident();
                let range = Span::new(expr.range().start, name.range.end.max(expr.range().end));
                expr = ast::Expr::FieldAccess(ast::FieldAccessExpr {
                    receiver: Box::new(expr),
                    name: name.text,
                    name_range: name.range,
                    range,
                });
                continue;
            }

            if self.at_kind(TokenKind::LParen)
                && matches!(expr, ast::Expr::Name(_) | ast::Expr::FieldAccess(_))
            {
                let (args, rparen_end) = self.parse_arg_list();
                let range = Span::new(expr.range().start, rparen_end);
                expr = ast::Expr::Call(ast::CallExpr {
                    callee: Box::new(expr),
                    args,
                    range,
                });
                continue;
            }

            if self.at_kind(TokenKind::LBracket) {
                self.bump();
                let index = self.parse_expr();
                let rbracket = self.expect_kind(TokenKind::RBracket);
                let range = Span::new(expr.range().start, rbracket.range.end.max(index.range().end));
                expr = ast::Expr::Index(ast::IndexExpr {
                    target: Box::new(expr),
                    index: Box::new(index),
                    range,
                });
                continue;
            }

            if matches!(self.peek().kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
                let tok = self.bump();
                let range = Span::new(expr.range().start, tok.range.end);
                expr = ast::Expr::Unary(ast::UnaryExpr {
                    op: ast::UnaryOp::Step,
                    expr: Box::new(expr),
                    range,
                });
                continue;
            }

            if self.at_kind(TokenKind::ColonColon) {
                self.bump();
                let name = self.bump();
                expr = ast::Expr::Missing(Span::new(expr.range().start, name.range.end));
                continue;
            }

            break;
        }
        self.depth = depth;
        expr
    }

    fn parse_primary_expr(&mut self) -> ast::Expr {
        let kind = self.peek().kind;
        match kind {
            TokenKind::Ident => {
                if self.nth_kind(1) == TokenKind::Arrow {
                    return self.parse_lambda();
                }
                let literal = match self.peek().text.as_str() {
                    "true" | "false" => Some(ast::LiteralKind::Bool),
                    "null" => Some(ast::LiteralKind::Null),
                    "this" => return ast::Expr::This(self.bump().range),
                    "new" => return self.parse_new_expr(),
                    "switch" => {
                        let start = self.bump().range.start;
                        self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
                        self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                        return ast::Expr::Missing(Span::new(start, self.prev_end()));
                    }
                    _ => None,
                };
                let tok = self.bump();
                match literal {
                    Some(kind) => ast::Expr::Literal(ast::LiteralExpr {
                        kind,
                        value: tok.text,
                        range: tok.range,
                    }),
                    None => ast::Expr::Name(ast::NameExpr {
                        name: tok.text,
                        range: tok.range,
                    }),
                }
            }
            TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral => {
                let tok = self.bump();
                let kind = match tok.kind {
                    TokenKind::IntLiteral => ast::LiteralKind::Int,
                    TokenKind::LongLiteral => ast::LiteralKind::Long,
                    TokenKind::FloatLiteral => ast::LiteralKind::Float,
                    TokenKind::DoubleLiteral => ast::LiteralKind::Double,
                    TokenKind::CharLiteral => ast::LiteralKind::Char,
                    _ => ast::LiteralKind::String,
                };
                ast::Expr::Literal(ast::LiteralExpr {
                    kind,
                    value: tok.text,
                    range: tok.range,
                })
            }
            TokenKind::LParen => {
                if self.is_paren_lambda() {
                    return self.parse_lambda();
                }
                self.bump();
                let expr = self.parse_expr();
                self.expect_kind(TokenKind::RParen);
                expr
            }
            TokenKind::LBrace => {
                let start = self.peek().range.start;
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
                ast::Expr::Missing(Span::new(start, self.prev_end()))
            }
            TokenKind::RBrace
            | TokenKind::Semi
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::Comma
            | TokenKind::Colon
            | TokenKind::Eof => ast::Expr::Missing(Span::new(self.peek().range.start, self.peek().range.start)),
            _ => ast::Expr::Missing(self.bump().range),
        }
    }

    fn parse_new_expr(&mut self) -> ast::Expr {
        let kw = self.bump();
        if self.at_kind(TokenKind::Lt) {
            self.skip_balanced(TokenKind::Lt, TokenKind::Gt);
        }
        let mut ty = self
            .parse_type_ref()
            .unwrap_or_else(|| ast::TypeRef::simple("", kw.range));

        if ty.array_dims > 0 || self.at_kind(TokenKind::LBracket) {
            while self.at_kind(TokenKind::LBracket) {
                self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket);
                ty.array_dims = ty.array_dims.saturating_add(1);
            }
            if self.at_kind(TokenKind::LBrace) {
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
            }
            return ast::Expr::New(ast::NewExpr {
                ty,
                args: Vec::new(),
                body: None,
                range: Span::new(kw.range.start, self.prev_end()),
            });
        }

        let args = if self.at_kind(TokenKind::LParen) {
            self.parse_arg_list().0
        } else {
            Vec::new()
        };
        let body = if let Some(lbrace) = self.eat(TokenKind::LBrace) {
            let members = self.parse_members("");
            let rbrace = self.expect_kind(TokenKind::RBrace);
            Some(ast::AnonymousBody {
                members,
                range: Span::new(lbrace.range.start, rbrace.range.end.max(lbrace.range.end)),
            })
        } else {
            None
        };
        ast::Expr::New(ast::NewExpr {
            ty,
            args,
            body,
            range: Span::new(kw.range.start, self.prev_end()),
        })
    }

    fn is_paren_lambda(&self) -> bool {
        let mut depth = 0usize;
        let mut idx = self.pos;
        while let Some(tok) = self.tokens.get(idx) {
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return self
                            .tokens
                            .get(idx + 1)
                            .is_some_and(|next| next.kind == TokenKind::Arrow);
                    }
                }
                TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace => return false,
                _ => {}
            }
            idx += 1;
        }
        false
    }

    /// Lambdas are skipped; their bodies refer to parameters we do not model.
    fn parse_lambda(&mut self) -> ast::Expr {
        let start = self.peek().range.start;
        if self.at_kind(TokenKind::LParen) {
            self.skip_balanced(TokenKind::LParen, TokenKind::RParen);
        } else {
            self.bump();
        }
        self.expect_kind(TokenKind::Arrow);
        if self.at_kind(TokenKind::LBrace) {
            self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace);
        } else {
            self.parse_expr();
        }
        ast::Expr::Missing(Span::new(start, self.prev_end()))
    }

    fn parse_arg_list(&mut self) -> (Vec<ast::Expr>, usize) {
        let lparen = self.expect_kind(TokenKind::LParen);
        let mut args = Vec::new();
        while !self.is_eof() && !self.at_kind(TokenKind::RParen) {
            let before = self.pos;
            let arg = self.parse_expr();
            if self.pos != before {
                args.push(arg);
            }
            if self.eat(TokenKind::Comma).is_none() && self.pos == before {
                break;
            }
        }
        let end = match self.eat(TokenKind::RParen) {
            Some(rparen) => rparen.range.end,
            None => self.prev_end().max(lparen.range.end),
        };
        (args, end)
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) {
        if !self.at_kind(open) {
            return;
        }
        self.bump();
        let mut depth = 1usize;
        while !self.is_eof() && depth > 0 {
            let kind = self.peek().kind;
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
            }
            self.bump();
        }
    }

    fn collect_balanced(&mut self, open: TokenKind, close: TokenKind) -> (String, usize) {
        let mut text = String::new();
        let mut end = self.prev_end();
        if !self.at_kind(open) {
            return (text, end);
        }
        let mut depth = 0usize;
        while !self.is_eof() {
            let tok = self.bump();
            if tok.kind == open {
                depth += 1;
            } else if tok.kind == close {
                depth = depth.saturating_sub(1);
            }
            text.push_str(&tok.text);
            end = tok.range.end;
            if depth == 0 {
                break;
            }
        }
        (text, end)
    }
}
