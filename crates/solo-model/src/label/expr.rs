use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    LabelSet,
    error::{ModelError, ModelResult},
};

/// Boolean expression over label atoms requested by a task.
///
/// Grammar, loosest binding first:
/// ```text
/// iff     := implies ( "<->" implies )*
/// implies := or ( "->" implies )?
/// or      := and ( "||" and )*
/// and     := unary ( "&&" unary )*
/// unary   := "!" unary | primary
/// primary := atom | "(" iff ")"
/// ```
/// An atom is any run of characters that are not whitespace, `!&|()`, and not the start of `->` / `<->`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LabelExpr {
    Atom(String),
    Not(Box<LabelExpr>),
    And(Box<LabelExpr>, Box<LabelExpr>),
    Or(Box<LabelExpr>, Box<LabelExpr>),
    Implies(Box<LabelExpr>, Box<LabelExpr>),
    Iff(Box<LabelExpr>, Box<LabelExpr>),
}

impl LabelExpr {
    /// Parse an expression such as `docker && !windows`.
    pub fn parse(input: &str) -> ModelResult<Self> {
        let invalid = |reason: String| ModelError::InvalidLabelExpr {
            expr: input.to_string(),
            reason,
        };

        let tokens = tokenize(input).map_err(invalid)?;
        if tokens.is_empty() {
            return Err(invalid("empty expression".into()));
        }
        if tokens.len() > MAX_TOKENS {
            return Err(invalid("expression too long".into()));
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.iff().map_err(invalid)?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(invalid(format!("unexpected '{tok}'"))),
        }
    }

    /// Single-atom expression.
    pub fn atom(name: impl Into<String>) -> ModelResult<Self> {
        let name = name.into();
        if !is_valid_atom(&name) {
            return Err(ModelError::InvalidAtom(name));
        }
        Ok(Self::Atom(name))
    }

    /// Evaluate against a set of labels: an atom holds iff the set contains it.
    pub fn matches(&self, labels: &LabelSet) -> bool {
        match self {
            LabelExpr::Atom(a) => labels.contains(a),
            LabelExpr::Not(e) => !e.matches(labels),
            LabelExpr::And(l, r) => l.matches(labels) && r.matches(labels),
            LabelExpr::Or(l, r) => l.matches(labels) || r.matches(labels),
            LabelExpr::Implies(l, r) => !l.matches(labels) || r.matches(labels),
            LabelExpr::Iff(l, r) => l.matches(labels) == r.matches(labels),
        }
    }

    /// All atoms mentioned by the expression, left to right.
    pub fn atoms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            LabelExpr::Atom(a) => out.push(a),
            LabelExpr::Not(e) => e.collect_atoms(out),
            LabelExpr::And(l, r)
            | LabelExpr::Or(l, r)
            | LabelExpr::Implies(l, r)
            | LabelExpr::Iff(l, r) => {
                l.collect_atoms(out);
                r.collect_atoms(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            LabelExpr::Iff(..) => 1,
            LabelExpr::Implies(..) => 2,
            LabelExpr::Or(..) => 3,
            LabelExpr::And(..) => 4,
            LabelExpr::Not(_) => 5,
            LabelExpr::Atom(_) => 6,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

/// Returns `true` if `s` can be used verbatim as a label atom.
pub fn is_valid_atom(s: &str) -> bool {
    !s.is_empty() && atom_len(s) == s.len()
}

impl fmt::Display for LabelExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelExpr::Atom(a) => f.write_str(a),
            LabelExpr::Not(e) => {
                f.write_str("!")?;
                e.fmt_operand(f, 5)
            }
            LabelExpr::And(l, r) => {
                l.fmt_operand(f, 4)?;
                f.write_str(" && ")?;
                r.fmt_operand(f, 5)
            }
            LabelExpr::Or(l, r) => {
                l.fmt_operand(f, 3)?;
                f.write_str(" || ")?;
                r.fmt_operand(f, 4)
            }
            // right-associative
            LabelExpr::Implies(l, r) => {
                l.fmt_operand(f, 3)?;
                f.write_str(" -> ")?;
                r.fmt_operand(f, 2)
            }
            LabelExpr::Iff(l, r) => {
                l.fmt_operand(f, 1)?;
                f.write_str(" <-> ")?;
                r.fmt_operand(f, 2)
            }
        }
    }
}

impl FromStr for LabelExpr {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LabelExpr {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LabelExpr> for String {
    fn from(e: LabelExpr) -> Self {
        e.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Atom(String),
    Not,
    And,
    Or,
    Implies,
    Iff,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Atom(a) => f.write_str(a),
            Token::Not => f.write_str("!"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Implies => f.write_str("->"),
            Token::Iff => f.write_str("<->"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn atom_len(s: &str) -> usize {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let tail = &s[i..];
        if c.is_whitespace()
            || matches!(c, '!' | '&' | '|' | '(' | ')')
            || tail.starts_with("->")
            || tail.starts_with("<->")
        {
            break;
        }
        end = i + c.len_utf8();
    }
    end
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        let (token, consumed) = if rest.starts_with("<->") {
            (Token::Iff, 3)
        } else if rest.starts_with("->") {
            (Token::Implies, 2)
        } else if rest.starts_with("&&") {
            (Token::And, 2)
        } else if rest.starts_with("||") {
            (Token::Or, 2)
        } else if rest.starts_with('!') {
            (Token::Not, 1)
        } else if rest.starts_with('(') {
            (Token::LParen, 1)
        } else if rest.starts_with(')') {
            (Token::RParen, 1)
        } else {
            let len = atom_len(rest);
            if len == 0 {
                let c = rest.chars().next().unwrap_or_default();
                return Err(format!("unexpected character '{c}'"));
            }
            (Token::Atom(rest[..len].to_string()), len)
        };
        tokens.push(token);
        rest = rest[consumed..].trim_start();
    }
    Ok(tokens)
}

/// Bound on `(` / `!` / `->` nesting while parsing.
const MAX_DEPTH: usize = 128;
/// Bound on flat operator chains, which grow the tree without parser recursion.
const MAX_TOKENS: usize = 4096;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, want: &Token) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, String>,
    ) -> Result<T, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".into());
        }
        self.depth += 1;
        let out = f(self);
        self.depth -= 1;
        out
    }

    fn iff(&mut self) -> Result<LabelExpr, String> {
        let mut lhs = self.implies()?;
        while self.eat(&Token::Iff) {
            let rhs = self.implies()?;
            lhs = LabelExpr::Iff(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn implies(&mut self) -> Result<LabelExpr, String> {
        let lhs = self.or()?;
        if self.eat(&Token::Implies) {
            let rhs = self.nested(Self::implies)?;
            return Ok(LabelExpr::Implies(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn or(&mut self) -> Result<LabelExpr, String> {
        let mut lhs = self.and()?;
        while self.eat(&Token::Or) {
            let rhs = self.and()?;
            lhs = LabelExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<LabelExpr, String> {
        let mut lhs = self.unary()?;
        while self.eat(&Token::And) {
            let rhs = self.unary()?;
            lhs = LabelExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<LabelExpr, String> {
        if self.eat(&Token::Not) {
            return Ok(LabelExpr::Not(Box::new(self.nested(Self::unary)?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<LabelExpr, String> {
        let token = self.peek().cloned();
        match token {
            Some(Token::Atom(a)) => {
                self.pos += 1;
                Ok(LabelExpr::Atom(a))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.nested(Self::iff)?;
                if !self.eat(&Token::RParen) {
                    return Err("missing ')'".into());
                }
                Ok(inner)
            }
            Some(other) => Err(format!("unexpected '{other}'")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(s: &str) -> LabelSet {
        LabelSet::parse(s).unwrap()
    }

    #[test]
    fn single_atom_matches_membership() {
        let e = LabelExpr::parse("docker").unwrap();
        assert_eq!(e, LabelExpr::Atom("docker".into()));
        assert!(e.matches(&set("docker linux")));
        assert!(!e.matches(&set("linux")));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let e = LabelExpr::parse("a || b && c").unwrap();
        assert!(e.matches(&set("a")));
        assert!(!e.matches(&set("b")));
        assert!(e.matches(&set("b c")));
    }

    #[test]
    fn negation_and_parentheses() {
        let e = LabelExpr::parse("docker && !(windows || arm)").unwrap();
        assert!(e.matches(&set("docker")));
        assert!(!e.matches(&set("docker arm")));
        assert!(!e.matches(&set("windows")));
    }

    #[test]
    fn implies_and_iff() {
        let imp = LabelExpr::parse("gpu -> cuda").unwrap();
        assert!(imp.matches(&set("docker")));
        assert!(!imp.matches(&set("gpu")));
        assert!(imp.matches(&set("gpu cuda")));

        let iff = LabelExpr::parse("a<->b").unwrap();
        assert!(iff.matches(&set("x")));
        assert!(iff.matches(&set("a b")));
        assert!(!iff.matches(&set("a")));
    }

    #[test]
    fn atoms_may_contain_dashes_and_dots() {
        let e = LabelExpr::parse("java-17 && os.linux").unwrap();
        assert_eq!(e.atoms(), vec!["java-17", "os.linux"]);
    }

    #[test]
    fn rejects_malformed_expressions() {
        for bad in ["", "   ", "a &&", "&& a", "(a", "a)", "a & b", "a | b", "!", "a b"] {
            assert!(
                LabelExpr::parse(bad).is_err(),
                "expected parse error for {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_deep_nesting() {
        let parens = format!("{}a{}", "(".repeat(10_000), ")".repeat(10_000));
        assert!(LabelExpr::parse(&parens).is_err());

        for deep in [
            format!("{}a{}", "(".repeat(200), ")".repeat(200)),
            format!("{}a", "!".repeat(200)),
            vec!["a"; 200].join(" -> "),
        ] {
            let err = LabelExpr::parse(&deep).unwrap_err();
            assert!(
                err.to_string().contains("nested too deeply"),
                "unexpected error: {err}"
            );
        }

        let shallow = format!("{}a{}", "(".repeat(64), ")".repeat(64));
        assert_eq!(LabelExpr::parse(&shallow).unwrap(), LabelExpr::Atom("a".into()));
    }

    #[test]
    fn rejects_overlong_chains() {
        let chain = vec!["a"; 5_000].join(" && ");
        assert!(LabelExpr::parse(&chain).is_err());
        let ok = vec!["a"; 100].join(" && ");
        assert!(LabelExpr::parse(&ok).is_ok());
    }

    #[test]
    fn display_is_reparsable() {
        for src in [
            "a",
            "!a",
            "a && b || c",
            "a && (b || c)",
            "!(a && b)",
            "a -> b -> c",
            "(a -> b) -> c",
            "a <-> (b || !c)",
        ] {
            let e = LabelExpr::parse(src).unwrap();
            let back = LabelExpr::parse(&e.to_string()).unwrap();
            assert_eq!(e, back, "display of {src:?} was {e}");
        }
    }

    #[test]
    fn serde_uses_expression_text() {
        let e: LabelExpr = serde_json::from_str(r#""docker && linux""#).unwrap();
        assert_eq!(serde_json::to_string(&e).unwrap(), r#""docker && linux""#);
        assert!(serde_json::from_str::<LabelExpr>(r#""docker &&""#).is_err());
    }

    #[test]
    fn atom_constructor_validates() {
        assert!(LabelExpr::atom("docker_ab12").is_ok());
        assert!(LabelExpr::atom("bad atom").is_err());
        assert!(LabelExpr::atom("").is_err());
    }
}
