use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

use super::CasError;

/// Maximum depth of the parsed tree. Chained `+ - * /` operands count
/// one level each, since they build left-deep trees.
const MAX_DEPTH: usize = 256;

/// Longest input accepted by [`parse`], in characters.
pub const MAX_INPUT_LEN: usize = 4096;

/// Multi-letter names that are kept as a single symbol instead of being
/// split into a product of single-letter symbols.
const NAMED_SYMBOLS: &[&str] = &[
    "pi", "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lambda", "mu", "nu", "xi", "omicron", "rho", "sigma", "tau", "upsilon", "phi", "chi", "psi",
    "omega",
];

/// Unary functions understood by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Func {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Exp,
    Log,
    Abs,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Func::Sqrt),
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            "exp" => Some(Func::Exp),
            "log" | "ln" => Some(Func::Log),
            "abs" | "Abs" => Some(Func::Abs),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Exp => "exp",
            Func::Log => "log",
            Func::Abs => "Abs",
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(BigRational),
    Sym(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Free symbols in first-occurrence order, deduplicated.
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(name) => {
                if !out.iter().any(|s| s == name) {
                    out.push(name.clone());
                }
            }
            Expr::Neg(e) | Expr::Call(_, e) => e.collect_symbols(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(n) => write!(f, "{n}"),
            Expr::Sym(s) => write!(f, "{s}"),
            Expr::Neg(e) => write!(f, "(-{e})"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "({a}*{b})"),
            Expr::Div(a, b) => write!(f, "({a}/{b})"),
            Expr::Pow(a, b) => write!(f, "({a}**{b})"),
            Expr::Call(func, e) => write!(f, "{}({e})", func.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(BigRational),
    Ident(String),
    Func(Func),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

impl Token {
    /// Whether this token can begin an operand, which is what triggers
    /// implicit multiplication after a complete factor.
    fn starts_operand(&self) -> bool {
        matches!(
            self,
            Token::Num(_) | Token::Ident(_) | Token::Func(_) | Token::LParen
        )
    }
}

fn parse_decimal(text: &str) -> Result<BigRational, CasError> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    let digits = format!("{int_part}{frac_part}");
    let numer: BigInt = if digits.is_empty() {
        BigInt::zero()
    } else {
        digits
            .parse()
            .map_err(|_| CasError::Parse(format!("invalid number '{text}'")))?
    };
    let denom = num_traits::pow(BigInt::from(10u32), frac_part.len());
    Ok(BigRational::new(numer, denom))
}

/// Push the tokens for an identifier, splitting plain letter runs into
/// single-letter symbols (`xy` is `x*y`).
fn push_identifier(word: &str, tokens: &mut Vec<Token>) {
    if let Some(func) = Func::from_name(word) {
        tokens.push(Token::Func(func));
    } else if word.len() == 1
        || NAMED_SYMBOLS.contains(&word)
        || word.chars().any(|c| c.is_ascii_digit() || c == '_')
    {
        tokens.push(Token::Ident(word.to_string()));
    } else {
        tokens.extend(word.chars().map(|c| Token::Ident(c.to_string())));
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CasError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                let mut seen_dot = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot)) {
                    seen_dot |= chars[i] == '.';
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if text == "." {
                    return Err(CasError::Parse("stray '.'".into()));
                }
                tokens.push(Token::Num(parse_decimal(&text)?));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                push_identifier(&word, &mut tokens);
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' | '−' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 2;
            }
            '*' | '·' | '×' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' | '÷' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '²' | '³' => {
                tokens.push(Token::Caret);
                tokens.push(Token::Num(BigRational::from_integer(BigInt::from(
                    if c == '²' { 2 } else { 3 },
                ))));
                i += 1;
            }
            '√' => {
                tokens.push(Token::Func(Func::Sqrt));
                i += 1;
            }
            'π' => {
                tokens.push(Token::Ident("pi".into()));
                i += 1;
            }
            '(' | '[' | '{' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' | ']' | '}' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => {
                return Err(CasError::Parse(format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn enter(&mut self) -> Result<(), CasError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CasError::TooComplex("expression nested too deeply".into()));
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, CasError> {
        self.enter()?;
        let mut chained = 1;
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    self.enter()?;
                    chained += 1;
                    lhs = Expr::Add(Box::new(lhs), Box::new(self.term()?));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    self.enter()?;
                    chained += 1;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(self.term()?));
                }
                _ => break,
            }
        }
        self.depth -= chained;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, CasError> {
        let mut chained = 0;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                Some(tok) if tok.starts_operand() => Token::LParen,
                _ => break,
            };
            self.enter()?;
            chained += 1;
            lhs = match op {
                Token::Star => {
                    self.pos += 1;
                    Expr::Mul(Box::new(lhs), Box::new(self.unary()?))
                }
                Token::Slash => {
                    self.pos += 1;
                    Expr::Div(Box::new(lhs), Box::new(self.unary()?))
                }
                // implicit multiplication
                _ => Expr::Mul(Box::new(lhs), Box::new(self.power()?)),
            };
        }
        self.depth -= chained;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, CasError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.enter()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, CasError> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.pos += 1;
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, CasError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => Ok(Expr::Sym(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(CasError::Parse("unbalanced parentheses".into())),
                }
            }
            Some(Token::Func(func)) => {
                self.enter()?;
                // `sin(x)` binds the parenthesised group, `sin x^2` the power
                let arg = if matches!(self.peek(), Some(Token::LParen)) {
                    self.atom()?
                } else {
                    self.power()?
                };
                self.depth -= 1;
                Ok(Expr::Call(func, Box::new(arg)))
            }
            Some(tok) => Err(CasError::Parse(format!("unexpected token {tok:?}"))),
            None => Err(CasError::Parse("unexpected end of input".into())),
        }
    }
}

/// Parse an expression string into an [`Expr`].
///
/// Supports implicit multiplication (`2x`, `(a+b)(a-b)`), `^` and `**`
/// for powers, and the functions `sqrt sin cos tan exp log ln abs`.
pub fn parse(input: &str) -> Result<Expr, CasError> {
    if input.chars().count() > MAX_INPUT_LEN {
        return Err(CasError::TooComplex(format!(
            "input longer than {MAX_INPUT_LEN} characters"
        )));
    }
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CasError::Parse("empty expression".into()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    if let Some(tok) = parser.peek() {
        return Err(CasError::Parse(format!("trailing input at {tok:?}")));
    }
    Ok(expr)
}

/// Integer literal helper used by the simplifier and tests.
pub fn int(n: i64) -> Expr {
    Expr::Num(BigRational::from_integer(BigInt::from(n)))
}
