//! # Parser - `.bnd`/`.cfg` Text Formats into a [`Model`]
//!
//! A small hand-written recursive-descent parser: tokenize eagerly into a
//! flat `Vec`, then parse with ordinary recursive functions rather than a
//! grammar generator. There is no separate lexer module; tokenizing is cheap
//! enough to do inline, and keeping it in one file makes the two formats
//! easy to compare side by side.
//!
//! Network definitions (`.bnd`) are a sequence of node blocks:
//!
//! ```text
//! A { logic = !A; rate_up = 1; rate_down = 1; }
//! ```
//!
//! Configurations (`.cfg`) are `;`-terminated directives:
//!
//! ```text
//! max_time = 10;
//! time_tick = 1;
//! $u_A = 1;
//! A.istate = 1 [0];
//! B.is_internal = 1;
//! ```
//!
//! A bare identifier inside a `.bnd` expression resolves to [`Expr::Node`]
//! when it names one of the node blocks declared in that same file, and to
//! [`Expr::Var`] otherwise (a forward reference to a `.cfg` variable).
//! Inside a `.cfg` expression there are no node names in scope, so every bare
//! identifier is a [`Expr::Var`].

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::expr::eval::EvalContext;
use crate::expr::{Expr, Op};
use crate::model::{InitialStateEntry, Model, Node};
use crate::state::State;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Alias(String),
    Number(f64),
    Symbol(char),
}

fn lex(text: &str) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            while let Some(&c) = chars.peek() {
                if c == '\n' {
                    break;
                }
                chars.next();
            }
        } else if c == '$' {
            chars.next();
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err(ConfigError::Parse("expected a name after '$'".to_string()));
            }
            tokens.push(Token::Alias(name));
        } else if c.is_alphabetic() || c == '_' {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(name));
        } else if c.is_ascii_digit() || (c == '.' && chars.clone().nth(1).is_some_and(|n| n.is_ascii_digit())) {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let value: f64 = text
                .parse()
                .map_err(|_| ConfigError::Parse(format!("invalid number literal: {text}")))?;
            tokens.push(Token::Number(value));
        } else {
            match c {
                '&' | '|' | '=' | '!' | '<' | '>' => {
                    chars.next();
                    let doubled = chars.peek() == Some(&c);
                    if doubled && (c == '&' || c == '|') {
                        chars.next();
                        tokens.push(Token::Symbol(if c == '&' { 'A' } else { 'O' }));
                    } else if chars.peek() == Some(&'=') && (c == '=' || c == '!' || c == '<' || c == '>') {
                        chars.next();
                        tokens.push(Token::Symbol(match c {
                            '=' => 'Q', // ==
                            '!' => 'N', // !=
                            '<' => 'l', // <=
                            '>' => 'g', // >=
                            _ => unreachable!(),
                        }));
                    } else {
                        tokens.push(Token::Symbol(c));
                    }
                }
                '+' | '-' | '*' | '/' | '(' | ')' | '{' | '}' | ';' | ',' | '?' | ':' | '.' | '[' | ']' => {
                    chars.next();
                    tokens.push(Token::Symbol(c));
                }
                other => return Err(ConfigError::Parse(format!("unexpected character: {other}"))),
            }
        }
    }

    Ok(tokens)
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    node_names: &'a HashSet<String>,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect_symbol(&mut self, c: char) -> Result<(), ConfigError> {
        match self.advance() {
            Some(Token::Symbol(s)) if *s == c => Ok(()),
            other => Err(ConfigError::Parse(format!("expected '{c}', found {other:?}"))),
        }
    }

    fn at_symbol(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if *s == c)
    }

    fn parse_expr(&mut self) -> Result<Expr, ConfigError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, ConfigError> {
        let cond = self.parse_or()?;
        if self.at_symbol('?') {
            self.advance();
            let then_branch = self.parse_ternary()?;
            self.expect_symbol(':')?;
            let else_branch = self.parse_ternary()?;
            Ok(Expr::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch)))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ConfigError> {
        let mut left = self.parse_and()?;
        while self.at_symbol('O') {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::binary(Op::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ConfigError> {
        let mut left = self.parse_equality()?;
        while self.at_symbol('A') {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::binary(Op::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ConfigError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = if self.at_symbol('Q') {
                Op::Eq
            } else if self.at_symbol('N') {
                Op::Ne
            } else {
                break;
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ConfigError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.at_symbol('l') {
                Op::Le
            } else if self.at_symbol('<') {
                Op::Lt
            } else if self.at_symbol('g') {
                Op::Ge
            } else if self.at_symbol('>') {
                Op::Gt
            } else {
                break;
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ConfigError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.at_symbol('+') {
                Op::Add
            } else if self.at_symbol('-') {
                Op::Sub
            } else {
                break;
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ConfigError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.at_symbol('*') {
                Op::Mul
            } else if self.at_symbol('/') {
                Op::Div
            } else {
                break;
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ConfigError> {
        if self.at_symbol('+') {
            self.advance();
            Ok(Expr::unary(Op::Plus, self.parse_unary()?))
        } else if self.at_symbol('-') {
            self.advance();
            Ok(Expr::unary(Op::Minus, self.parse_unary()?))
        } else if self.at_symbol('!') {
            self.advance();
            Ok(Expr::unary(Op::Not, self.parse_unary()?))
        } else {
            self.parse_primary()
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ConfigError> {
        match self.advance() {
            Some(Token::Number(v)) => Ok(Expr::literal(*v)),
            Some(Token::Alias(name)) => Ok(Expr::alias(name.clone())),
            Some(Token::Ident(name)) => {
                if self.node_names.contains(name) {
                    Ok(Expr::node(name.clone()))
                } else {
                    Ok(Expr::var(name.clone()))
                }
            }
            Some(Token::Symbol('(')) => {
                let inner = self.parse_expr()?;
                self.expect_symbol(')')?;
                Ok(Expr::paren(inner))
            }
            other => Err(ConfigError::Parse(format!("expected an expression, found {other:?}"))),
        }
    }
}

fn ident_set(blocks: &[(String, Vec<Token>)]) -> HashSet<String> {
    blocks.iter().map(|(name, _)| name.clone()).collect()
}

/// Parses a `.bnd` network definition into its declared nodes, in file
/// order (that order becomes each node's bit index once the model is built).
pub fn parse_bnd(text: &str) -> Result<Vec<Node>, ConfigError> {
    let tokens = lex(text)?;
    let mut pos = 0;
    let mut blocks = Vec::new();

    while pos < tokens.len() {
        let name = match &tokens[pos] {
            Token::Ident(n) => n.clone(),
            other => return Err(ConfigError::Parse(format!("expected a node name, found {other:?}"))),
        };
        pos += 1;
        match tokens.get(pos) {
            Some(Token::Symbol('{')) => pos += 1,
            other => return Err(ConfigError::Parse(format!("expected '{{' after node name, found {other:?}"))),
        }
        let start = pos;
        let mut depth = 1;
        while depth > 0 {
            match tokens.get(pos) {
                Some(Token::Symbol('{')) => depth += 1,
                Some(Token::Symbol('}')) => depth -= 1,
                Some(_) => {}
                None => return Err(ConfigError::Parse(format!("unterminated node block: {name}"))),
            }
            pos += 1;
        }
        let body = tokens[start..pos - 1].to_vec();
        blocks.push((name, body));
    }

    let node_names = ident_set(&blocks);
    let mut nodes = Vec::with_capacity(blocks.len());

    for (name, body) in &blocks {
        let mut logic = None;
        let mut rate_up = None;
        let mut rate_down = None;

        let mut i = 0;
        while i < body.len() {
            let attr = match &body[i] {
                Token::Ident(a) => a.clone(),
                other => return Err(ConfigError::Parse(format!("expected an attribute name, found {other:?}"))),
            };
            i += 1;
            match body.get(i) {
                Some(Token::Symbol('=')) => i += 1,
                other => return Err(ConfigError::Parse(format!("expected '=' after {attr}, found {other:?}"))),
            }
            let expr_start = i;
            while i < body.len() && body[i] != Token::Symbol(';') {
                i += 1;
            }
            let expr_tokens = &body[expr_start..i];
            if i < body.len() {
                i += 1; // skip ';'
            }

            let mut parser = ExprParser { tokens: expr_tokens, pos: 0, node_names: &node_names };
            let expr = parser.parse_expr()?;
            if parser.pos != expr_tokens.len() {
                return Err(ConfigError::Parse(format!("trailing tokens in {name}.{attr}")));
            }

            match attr.as_str() {
                "logic" => logic = Some(expr),
                "rate_up" => rate_up = Some(expr),
                "rate_down" => rate_down = Some(expr),
                other => return Err(ConfigError::Parse(format!("unknown node attribute: {other}"))),
            }
        }

        nodes.push(Node {
            name: name.clone(),
            logic: logic.ok_or_else(|| ConfigError::Parse(format!("node {name} is missing logic")))?,
            rate_up: rate_up.ok_or_else(|| ConfigError::Parse(format!("node {name} is missing rate_up")))?,
            rate_down: rate_down.ok_or_else(|| ConfigError::Parse(format!("node {name} is missing rate_down")))?,
            internal: false,
        });
    }

    Ok(nodes)
}

/// Applies a `.cfg` configuration to a list of nodes parsed from `.bnd`,
/// producing the finished [`Model`]. Per-node `istate` directives are
/// combined across nodes by independent (Bernoulli) composition into a full
/// joint initial-state distribution; a node with no `istate` directive
/// defaults to a fixed bit 0 with probability 1, matching "non-assigned
/// nodes default to the fixed-points dictated by their istate configuration
/// or 0".
pub fn parse_cfg(text: &str, mut nodes: Vec<Node>) -> Result<Model, ConfigError> {
    let tokens = lex(text)?;
    let node_names: HashSet<String> = HashSet::new(); // .cfg expressions never reference node bits directly

    let mut constants = std::collections::HashMap::new();
    let mut variables = std::collections::HashMap::new();
    let mut istates: Vec<(usize, Vec<(f64, bool)>)> = Vec::new();

    let statements = split_statements(&tokens)?;
    for statement in statements {
        if statement.is_empty() {
            continue;
        }

        if let Token::Alias(name) = &statement[0] {
            let rhs = expect_assignment(&statement[1..])?;
            let value = eval_cfg_expr(rhs, &node_names, &constants, &variables)?;
            variables.insert(name.clone(), value);
            continue;
        }

        if let Token::Ident(first) = &statement[0] {
            if statement.get(1) == Some(&Token::Symbol('.')) {
                let node_name = first.clone();
                let node_index = nodes
                    .iter()
                    .position(|n| &n.name == &node_name)
                    .ok_or_else(|| ConfigError::UnknownNode(node_name.clone()))?;
                let attr = match statement.get(2) {
                    Some(Token::Ident(a)) => a.clone(),
                    other => return Err(ConfigError::Parse(format!("expected attribute after '.', found {other:?}"))),
                };
                match attr.as_str() {
                    "istate" => {
                        let rhs = expect_assignment(&statement[3..])?;
                        let entries = parse_istate_entries(rhs, &node_names, &constants, &variables)?;
                        istates.push((node_index, entries));
                    }
                    "is_internal" => {
                        let rhs = expect_assignment(&statement[3..])?;
                        let value = eval_cfg_expr(rhs, &node_names, &constants, &variables)?;
                        nodes[node_index].internal = value != 0.0;
                    }
                    other => return Err(ConfigError::Parse(format!("unknown per-node attribute: {other}"))),
                }
                continue;
            }

            let name = first.clone();
            let rhs = expect_assignment(&statement[1..])?;
            let value = eval_cfg_expr(rhs, &node_names, &constants, &variables)?;
            constants.insert(name, value);
            continue;
        }

        return Err(ConfigError::Parse(format!("unexpected statement start: {:?}", statement[0])));
    }

    let initial_distribution = build_initial_distribution(nodes.len(), &istates);

    Ok(Model { nodes, constants, variables, initial_distribution })
}

fn split_statements(tokens: &[Token]) -> Result<Vec<Vec<Token>>, ConfigError> {
    let mut statements = Vec::new();
    let mut current = Vec::new();
    for token in tokens {
        if *token == Token::Symbol(';') {
            statements.push(std::mem::take(&mut current));
        } else {
            current.push(token.clone());
        }
    }
    if !current.is_empty() {
        return Err(ConfigError::Parse("missing trailing ';' on final statement".to_string()));
    }
    Ok(statements)
}

fn expect_assignment(tokens: &[Token]) -> Result<&[Token], ConfigError> {
    match tokens.first() {
        Some(Token::Symbol('=')) => Ok(&tokens[1..]),
        other => Err(ConfigError::Parse(format!("expected '=', found {other:?}"))),
    }
}

fn eval_cfg_expr(
    tokens: &[Token],
    node_names: &HashSet<String>,
    constants: &std::collections::HashMap<String, f64>,
    variables: &std::collections::HashMap<String, f64>,
) -> Result<f64, ConfigError> {
    let mut parser = ExprParser { tokens, pos: 0, node_names };
    let expr = parser.parse_expr()?;
    if parser.pos != tokens.len() {
        return Err(ConfigError::Parse("trailing tokens after expression".to_string()));
    }
    let ctx = EvalContext { constants, variables };
    expr.evaluate(&ctx).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Parses `p1 [bit1], p2 [bit2], ...` into `(probability, bit)` pairs.
fn parse_istate_entries(
    tokens: &[Token],
    node_names: &HashSet<String>,
    constants: &std::collections::HashMap<String, f64>,
    variables: &std::collections::HashMap<String, f64>,
) -> Result<Vec<(f64, bool)>, ConfigError> {
    let mut entries = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let prob_start = i;
        while i < tokens.len() && tokens[i] != Token::Symbol('[') {
            i += 1;
        }
        if i >= tokens.len() {
            return Err(ConfigError::Parse("istate entry missing '['".to_string()));
        }
        let prob = eval_cfg_expr(&tokens[prob_start..i], node_names, constants, variables)?;
        i += 1; // skip '['
        let bit_start = i;
        while i < tokens.len() && tokens[i] != Token::Symbol(']') {
            i += 1;
        }
        if i >= tokens.len() {
            return Err(ConfigError::Parse("istate entry missing ']'".to_string()));
        }
        let bit_value = eval_cfg_expr(&tokens[bit_start..i], node_names, constants, variables)?;
        entries.push((prob, bit_value != 0.0));
        i += 1; // skip ']'
        if i < tokens.len() && tokens[i] == Token::Symbol(',') {
            i += 1;
        }
    }
    Ok(entries)
}

fn build_initial_distribution(node_count: usize, istates: &[(usize, Vec<(f64, bool)>)]) -> Vec<InitialStateEntry> {
    if node_count == 0 {
        return Vec::new();
    }

    let mut entries = vec![InitialStateEntry { state: State::empty(node_count), probability: 1.0 }];

    for (node_index, options) in istates {
        if options.is_empty() {
            continue;
        }
        let mut expanded = Vec::with_capacity(entries.len() * options.len());
        for entry in &entries {
            for &(prob, bit) in options {
                let mut state = entry.state;
                state.set_to(*node_index, bit);
                expanded.push(InitialStateEntry { state, probability: entry.probability * prob });
            }
        }
        entries = expanded;
    }

    entries
}
