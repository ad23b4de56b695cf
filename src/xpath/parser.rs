//! XPath Parser
//!
//! Recursive descent parser for XPath 1.0 expressions.

use super::lexer::{Lexer, Token};

/// XPath expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Root path (/)
    Root,
    /// Union of two expressions (|)
    Union(Box<Expr>, Box<Expr>),
    /// Path expression (expr/step)
    Path(Box<Expr>, Box<Step>),
    /// Filter expression with predicate
    Filter(Box<Expr>, Box<Expr>),
    /// Function call
    Function(String, Vec<Expr>),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
    /// Variable reference
    Variable(String),
    /// Location step relative to the context node
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

const MULTIPLICATIVE: u8 = 5;

impl BinaryOp {
    /// Precedence level, 0 binds loosest
    fn level(self) -> u8 {
        match self {
            BinaryOp::Or => 0,
            BinaryOp::And => 1,
            BinaryOp::Eq | BinaryOp::NotEq => 2,
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => MULTIPLICATIVE,
        }
    }
}

fn binary_op(token: &Token) -> Option<BinaryOp> {
    Some(match token {
        Token::Or => BinaryOp::Or,
        Token::And => BinaryOp::And,
        Token::Eq => BinaryOp::Eq,
        Token::NotEq => BinaryOp::NotEq,
        Token::Lt => BinaryOp::Lt,
        Token::LtEq => BinaryOp::LtEq,
        Token::Gt => BinaryOp::Gt,
        Token::GtEq => BinaryOp::GtEq,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Multiply => BinaryOp::Mul,
        Token::Div => BinaryOp::Div,
        Token::Mod => BinaryOp::Mod,
        _ => return None,
    })
}

/// Location step in a path
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    fn bare(axis: Axis, node_test: NodeTest) -> Self {
        Step {
            axis,
            node_test,
            predicates: Vec::new(),
        }
    }

    /// `descendant-or-self::node()`, the expansion of `//`
    fn descendant_or_self() -> Self {
        Self::bare(Axis::DescendantOrSelf, NodeTest::Node)
    }
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }

    /// Reverse axes number their proximity positions backwards
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Parent
                | Axis::Ancestor
                | Axis::AncestorOrSelf
                | Axis::PrecedingSibling
                | Axis::Preceding
        )
    }
}

/// Node test in a location step
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// Matches any node of the principal type (*)
    Any,
    /// Unprefixed name
    Name(String),
    /// prefix:localname
    QName(String, String),
    /// prefix:*
    NamespaceWildcard(String),
    /// node() - matches any node
    Node,
    /// text() - matches text nodes
    Text,
    /// comment() - matches comments
    Comment,
    /// processing-instruction() - matches PIs
    ProcessingInstruction(Option<String>),
}

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Result<Self, String> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current })
    }

    /// Parse a complete XPath expression
    pub fn parse(&mut self) -> Result<Expr, String> {
        let expr = self.parse_expr()?;
        if !matches!(self.current, Token::Eof) {
            return Err(format!(
                "unexpected {:?} before offset {}",
                self.current,
                self.lexer.position()
            ));
        }
        Ok(expr)
    }

    /// Advance to next token
    fn advance(&mut self) -> Result<(), String> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), String> {
        if self.current != token {
            return Err(format!("expected {}, found {:?}", what, self.current));
        }
        self.advance()
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_binary(0)
    }

    /// Left-associative binary operators, loosest first: `or`, `and`,
    /// equality, relational, additive, multiplicative.
    fn parse_binary(&mut self, min_level: u8) -> Result<Expr, String> {
        if min_level > MULTIPLICATIVE {
            return self.parse_unary_expr();
        }
        let mut left = self.parse_binary(min_level + 1)?;
        while let Some(op) = binary_op(&self.current).filter(|op| op.level() == min_level) {
            self.advance()?;
            let right = self.parse_binary(min_level + 1)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    /// Parse unary expression
    fn parse_unary_expr(&mut self) -> Result<Expr, String> {
        if matches!(self.current, Token::Minus) {
            self.advance()?;
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    /// Parse union expression
    fn parse_union_expr(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_path_expr()?;

        while matches!(self.current, Token::Pipe) {
            self.advance()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }

        Ok(left)
    }

    /// Can the current token begin a location step?
    fn at_step_start(&self) -> bool {
        matches!(
            self.current,
            Token::Name(_)
                | Token::NameTest(_)
                | Token::NodeType(_)
                | Token::Star
                | Token::At
                | Token::Axis(_)
                | Token::Dot
                | Token::DoubleDot
        )
    }

    /// Parse path expression
    fn parse_path_expr(&mut self) -> Result<Expr, String> {
        let expr = match &self.current {
            Token::Slash => {
                self.advance()?;
                if !self.at_step_start() {
                    // Just /
                    return Ok(Expr::Root);
                }
                let step = self.parse_step()?;
                Expr::Path(Box::new(Expr::Root), Box::new(step))
            }
            Token::DoubleSlash => {
                self.advance()?;
                // //path is shorthand for /descendant-or-self::node()/path
                let step = self.parse_step()?;
                let base = Expr::Path(Box::new(Expr::Root), Box::new(Step::descendant_or_self()));
                Expr::Path(Box::new(base), Box::new(step))
            }
            _ if self.at_step_start() => Expr::Step(Box::new(self.parse_step()?)),
            _ => self.parse_filter_expr()?,
        };

        self.parse_path_continuation(expr)
    }

    /// Handle path continuation (e.g., /root/child/grandchild)
    fn parse_path_continuation(&mut self, mut expr: Expr) -> Result<Expr, String> {
        loop {
            match &self.current {
                Token::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    let base = Expr::Path(Box::new(expr), Box::new(Step::descendant_or_self()));
                    expr = Expr::Path(Box::new(base), Box::new(step));
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parse filter expression: a primary expression with optional predicates
    fn parse_filter_expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_primary_expr()?;

        while matches!(self.current, Token::LeftBracket) {
            let pred = self.parse_predicate()?;
            expr = Expr::Filter(Box::new(expr), Box::new(pred));
        }

        Ok(expr)
    }

    fn parse_predicate(&mut self) -> Result<Expr, String> {
        self.expect(Token::LeftBracket, "[")?;
        let pred = self.parse_expr()?;
        self.expect(Token::RightBracket, "]")?;
        Ok(pred)
    }

    /// Parse primary expression
    fn parse_primary_expr(&mut self) -> Result<Expr, String> {
        match &self.current {
            Token::Number(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                self.advance()?;
                let name = match &self.current {
                    Token::Name(name) | Token::NameTest(name) => name.clone(),
                    other => return Err(format!("expected variable name, found {:?}", other)),
                };
                self.advance()?;
                Ok(Expr::Variable(name))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                self.expect(Token::RightParen, ")")?;
                Ok(expr)
            }
            Token::FunctionName(name) => {
                let name = name.clone();
                self.advance()?;
                self.expect(Token::LeftParen, "(")?;
                let args = self.parse_function_args()?;
                Ok(Expr::Function(name, args))
            }
            Token::Eof => Err("unexpected end of expression".to_string()),
            other => Err(format!("unexpected {:?}", other)),
        }
    }

    /// Parse a location step, including abbreviations and predicates
    fn parse_step(&mut self) -> Result<Step, String> {
        match self.current {
            Token::Dot => {
                self.advance()?;
                return Ok(Step::bare(Axis::Self_, NodeTest::Node));
            }
            Token::DoubleDot => {
                self.advance()?;
                return Ok(Step::bare(Axis::Parent, NodeTest::Node));
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        if matches!(self.current, Token::At) {
            axis = Axis::Attribute;
            self.advance()?;
        } else if let Token::Axis(axis_name) = &self.current {
            axis = Axis::from_name(axis_name).ok_or_else(|| format!("unknown axis '{}'", axis_name))?;
            self.advance()?;
            self.expect(Token::DoubleColon, "::")?;
        }

        let node_test = match &self.current {
            Token::Star => NodeTest::Any,
            Token::Name(name) => NodeTest::Name(name.clone()),
            Token::NameTest(qname) => match qname.split_once(':') {
                Some((prefix, "*")) => NodeTest::NamespaceWildcard(prefix.to_string()),
                Some((prefix, local)) => NodeTest::QName(prefix.to_string(), local.to_string()),
                None => NodeTest::Name(qname.clone()),
            },
            Token::NodeType(name) => {
                let name = name.clone();
                self.advance()?;
                self.expect(Token::LeftParen, "(")?;
                let arg = match &self.current {
                    Token::String(s) if name == "processing-instruction" => {
                        let s = s.clone();
                        self.advance()?;
                        Some(s)
                    }
                    _ => None,
                };
                if !matches!(self.current, Token::RightParen) {
                    return Err(format!("expected ) after {}(", name));
                }

                match name.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => NodeTest::ProcessingInstruction(arg),
                }
            }
            other => return Err(format!("expected node test, found {:?}", other)),
        };
        self.advance()?;

        // Parse predicates
        let mut predicates = Vec::new();
        while matches!(self.current, Token::LeftBracket) {
            predicates.push(self.parse_predicate()?);
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    /// Parse function arguments
    fn parse_function_args(&mut self) -> Result<Vec<Expr>, String> {
        let mut args = Vec::new();

        if !matches!(self.current, Token::RightParen) {
            args.push(self.parse_expr()?);

            while matches!(self.current, Token::Comma) {
                self.advance()?;
                args.push(self.parse_expr()?);
            }
        }

        self.expect(Token::RightParen, ")")?;
        Ok(args)
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, String> {
    Parser::new(input)?.parse()
}
