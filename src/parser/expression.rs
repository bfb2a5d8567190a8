//! 绑定表达式解析器 - 词法分析 + 递归下降，生成 AST

use crate::binding::Value;
use crate::error::ExpressionError;

/// 表达式 AST
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    /// `this`，指向组件状态（跳过局部变量）
    This,
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Punct(&'static str),
    Eof,
}

/// 词法分析器
struct Lexer {
    input: Vec<char>,
    pos: usize,
}

const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "<", ">", "!",
    "?", ":", ".", ",", "(", ")", "[", "]",
];

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ExpressionError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            if self.pos >= self.input.len() {
                tokens.push((Token::Eof, start));
                return Ok(tokens);
            }

            let c = self.current_char();
            let token = if c.is_ascii_digit() || (c == '.' && self.peek(1).is_ascii_digit()) {
                self.read_number()?
            } else if c == '"' || c == '\'' {
                self.read_string(c)?
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                self.read_ident()
            } else {
                self.read_punct()?
            };
            tokens.push((token, start));
        }
    }

    fn read_number(&mut self) -> Result<Token, ExpressionError> {
        let start = self.pos;
        while self.pos < self.input.len()
            && (self.current_char().is_ascii_digit() || self.current_char() == '.')
        {
            self.advance();
        }
        // 指数部分
        if matches!(self.current_char(), 'e' | 'E') {
            self.advance();
            if matches!(self.current_char(), '+' | '-') {
                self.advance();
            }
            while self.current_char().is_ascii_digit() {
                self.advance();
            }
        }
        let text: String = self.input[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExpressionError::new(format!("invalid number `{}`", text), start))
    }

    fn read_string(&mut self, quote: char) -> Result<Token, ExpressionError> {
        let start = self.pos;
        self.advance(); // skip opening quote

        let mut value = String::new();
        while self.pos < self.input.len() && self.current_char() != quote {
            let c = self.current_char();
            if c == '\\' {
                self.advance();
                let escaped = match self.current_char() {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                };
                value.push(escaped);
            } else {
                value.push(c);
            }
            self.advance();
        }

        if self.pos >= self.input.len() {
            return Err(ExpressionError::new("unterminated string literal", start));
        }
        self.advance(); // skip closing quote
        Ok(Token::Str(value))
    }

    fn read_ident(&mut self) -> Token {
        let mut name = String::new();
        while self.pos < self.input.len() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '_' || c == '$' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::Ident(name)
    }

    fn read_punct(&mut self) -> Result<Token, ExpressionError> {
        for p in PUNCTUATORS {
            if self.starts_with(p) {
                self.pos += p.chars().count();
                return Ok(Token::Punct(*p));
            }
        }
        Err(ExpressionError::new(
            format!("unexpected character '{}'", self.current_char()),
            self.pos,
        ))
    }

    fn current_char(&self) -> char {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> char {
        self.input.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == c)
    }
}

/// AST 最大嵌套深度，求值和析构都按深度递归
const MAX_DEPTH: usize = 128;

/// 表达式解析器
pub struct ExpressionParser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl ExpressionParser {
    /// 解析一条完整表达式
    pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Self { tokens, pos: 0, depth: 0 };
        if parser.check_eof() {
            return Err(ExpressionError::new("empty expression", 0));
        }
        let expr = parser.parse_conditional()?;
        if !parser.check_eof() {
            return Err(parser.unexpected());
        }
        Ok(expr)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.nest()?;
        let test = self.parse_or()?;
        if !self.eat("?") {
            self.depth = base;
            return Ok(test);
        }
        let consequent = self.parse_conditional()?;
        self.expect(":")?;
        let alternate = self.parse_conditional()?;
        self.depth = base;
        Ok(Expr::Conditional(Box::new(test), Box::new(consequent), Box::new(alternate)))
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_and()?;
        while self.eat("||") {
            self.nest()?;
            let right = self.parse_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_equality()?;
        while self.eat("&&") {
            self.nest()?;
            let right = self.parse_equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        self.depth = base;
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.eat("===") {
                BinaryOp::StrictEq
            } else if self.eat("!==") {
                BinaryOp::StrictNotEq
            } else if self.eat("==") {
                BinaryOp::Eq
            } else if self.eat("!=") {
                BinaryOp::NotEq
            } else {
                self.depth = base;
                return Ok(left);
            };
            self.nest()?;
            let right = self.parse_relational()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat("<=") {
                BinaryOp::LtEq
            } else if self.eat(">=") {
                BinaryOp::GtEq
            } else if self.eat("<") {
                BinaryOp::Lt
            } else if self.eat(">") {
                BinaryOp::Gt
            } else {
                self.depth = base;
                return Ok(left);
            };
            self.nest()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat("+") {
                BinaryOp::Add
            } else if self.eat("-") {
                BinaryOp::Sub
            } else {
                self.depth = base;
                return Ok(left);
            };
            self.nest()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat("*") {
                BinaryOp::Mul
            } else if self.eat("/") {
                BinaryOp::Div
            } else if self.eat("%") {
                BinaryOp::Rem
            } else {
                self.depth = base;
                return Ok(left);
            };
            self.nest()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = if self.eat("!") {
            UnaryOp::Not
        } else if self.eat("-") {
            UnaryOp::Neg
        } else if self.eat("+") {
            UnaryOp::Plus
        } else {
            return self.parse_postfix();
        };
        let base = self.nest()?;
        let operand = self.parse_unary()?;
        self.depth = base;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.depth;
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(".") {
                self.nest()?;
                match self.next_token() {
                    Token::Ident(name) => expr = Expr::Member(Box::new(expr), name),
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected());
                    }
                }
            } else if self.eat("[") {
                self.nest()?;
                let index = self.parse_conditional()?;
                self.expect("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                self.depth = base;
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat("(") {
            let inner = self.parse_conditional()?;
            self.expect(")")?;
            return Ok(inner);
        }
        if self.eat("[") {
            let mut items = Vec::new();
            if !self.eat("]") {
                loop {
                    items.push(self.parse_conditional()?);
                    if self.eat("]") {
                        break;
                    }
                    self.expect(",")?;
                }
            }
            return Ok(Expr::Array(items));
        }

        let expr = match self.next_token() {
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::Str(s) => Expr::Literal(Value::String(s)),
            Token::Ident(name) => match name.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                "undefined" => Expr::Literal(Value::Undefined),
                "this" => Expr::This,
                _ => Expr::Ident(name),
            },
            _ => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
        };
        Ok(expr)
    }

    /// 进入一层嵌套，返回进入前的深度
    fn nest(&mut self) -> Result<usize, ExpressionError> {
        let base = self.depth;
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::new("expression nested too deeply", self.position()));
        }
        Ok(base)
    }

    fn next_token(&mut self) -> Token {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone()).unwrap_or(Token::Eof);
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some((Token::Punct(p), _)) if *p == punct => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), ExpressionError> {
        if self.eat(punct) {
            Ok(())
        } else {
            let position = self.position();
            Err(ExpressionError::new(format!("expected '{}'", punct), position))
        }
    }

    fn check_eof(&self) -> bool {
        matches!(self.tokens.get(self.pos), Some((Token::Eof, _)) | None)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, p)| *p)
            .unwrap_or(0)
    }

    fn unexpected(&self) -> ExpressionError {
        let found = match self.tokens.get(self.pos) {
            Some((Token::Number(n), _)) => format!("number {}", n),
            Some((Token::Str(s), _)) => format!("string \"{}\"", s),
            Some((Token::Ident(i), _)) => format!("identifier `{}`", i),
            Some((Token::Punct(p), _)) => format!("'{}'", p),
            Some((Token::Eof, _)) | None => "end of expression".to_string(),
        };
        ExpressionError::new(format!("unexpected {}", found), self.position())
    }
}
