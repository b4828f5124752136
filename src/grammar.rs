use std::collections::HashMap;
use std::ops::{Add, BitOr};
use bitflags::bitflags;
use indexmap::IndexMap;
use crate::bnf::Symbol;
use crate::error::{GrammarError, GrammarErrors, Span};
use crate::runtime::ParseTreeNode;

/// Name of the end-marker terminal that terminates every token stream.
pub const EOF: &str = "$end";
/// Name of the error pseudo-terminal used by error productions.
pub const ERROR: &str = "error";

/// Builds a parse-tree node for a reduced non-terminal.
pub type NodeFactory = fn(Symbol, Vec<ParseTreeNode>, Span) -> ParseTreeNode;

bitflags! {
  #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
  pub struct TermFlags: u8 {
    /// Dropped from the children of parse-tree nodes.
    const PUNCTUATION = 1;
    /// Single-child nodes of this non-terminal are replaced by the child.
    const TRANSIENT = 1 << 1;
    const NULLABLE = 1 << 2;
    const LIST = 1 << 3;
    /// Shift/reduce conflicts on this terminal are decided while parsing.
    const OPERATOR = 1 << 4;
    /// Skipped by the runtime, e.g. comments.
    const NON_GRAMMAR = 1 << 5;
  }
}

impl Default for TermFlags {
  fn default() -> Self {
    TermFlags::empty()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
  #[default]
  None,
  Left,
  Right,
}

/// Conflict resolution hint attached to a position inside a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hint {
  PreferShift,
  PreferReduce,
  ResolveInCode,
}

/// Returns whether the item already on the stack (with `stack_prec`) should
/// be reduced before a lookahead operator with `prec` and `assoc`.
pub(crate) fn reduce_first(
  stack_prec: u16,
  prec: u16,
  assoc: Assoc,
) -> bool {
  match stack_prec.cmp(&prec) {
    std::cmp::Ordering::Greater => true,
    std::cmp::Ordering::Less => false,
    std::cmp::Ordering::Equal => assoc == Assoc::Left,
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule(pub(crate) RuleVariant);

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RuleVariant {
  Sym(String),
  Empty,
  Seq(Vec<Rule>),
  Or(Vec<Rule>),
  Many(Box<RuleRep>),
  Some(Box<RuleRep>),
  Option(Box<RuleRep>),
  SepBy(Box<RuleSepBy>),
  SepBy1(Box<RuleSepBy>),
  Prec(Box<RulePrec>),
  Hint(Hint),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuleRep {
  pub(crate) rule: Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuleSepBy {
  pub(crate) sep: Rule,
  pub(crate) rule: Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RulePrec {
  pub(crate) prec: u16,
  pub(crate) assoc: Assoc,
  pub(crate) rule: Rule,
}

pub fn sym(
  sym: impl Into<String>,
) -> Rule {
  Rule(RuleVariant::Sym(sym.into()))
}

/// The empty sequence.
pub fn empty() -> Rule {
  Rule(RuleVariant::Empty)
}

pub fn seq(
  rules: impl IntoIterator<Item = Rule>,
) -> Rule {
  Rule(RuleVariant::Seq(rules.into_iter().collect()))
}

/// Zero or more repetitions.
pub fn many(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Many(Box::new(RuleRep {
    rule,
  })))
}

/// One or more repetitions.
pub fn some(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Some(Box::new(RuleRep {
    rule,
  })))
}

pub fn option(
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Option(Box::new(RuleRep {
    rule,
  })))
}

/// Zero or more repetitions separated by `sep`.
pub fn sep_by(
  sep: Rule,
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::SepBy(Box::new(RuleSepBy {
    sep,
    rule,
  })))
}

/// One or more repetitions separated by `sep`.
pub fn sep_by1(
  sep: Rule,
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::SepBy1(Box::new(RuleSepBy {
    sep,
    rule,
  })))
}

/// Gives every production of `rule` an explicit precedence.
pub fn prec(
  prec: u16,
  assoc: Assoc,
  rule: Rule,
) -> Rule {
  Rule(RuleVariant::Prec(Box::new(RulePrec {
    prec,
    assoc,
    rule,
  })))
}

pub fn prefer_shift() -> Rule {
  Rule(RuleVariant::Hint(Hint::PreferShift))
}

pub fn prefer_reduce() -> Rule {
  Rule(RuleVariant::Hint(Hint::PreferReduce))
}

pub fn resolve_in_code() -> Rule {
  Rule(RuleVariant::Hint(Hint::ResolveInCode))
}

impl From<&str> for Rule {
  fn from(name: &str) -> Rule {
    sym(name)
  }
}

impl BitOr for Rule {
  type Output = Rule;

  fn bitor(self, rhs: Rule) -> Rule {
    match (self.0, rhs.0) {
      (RuleVariant::Or(mut x), RuleVariant::Or(mut y)) => {
        x.append(&mut y);
        Rule(RuleVariant::Or(x))
      }
      (RuleVariant::Or(mut x), y) => {
        x.push(Rule(y));
        Rule(RuleVariant::Or(x))
      }
      (x, RuleVariant::Or(mut y)) => {
        y.insert(0, Rule(x));
        Rule(RuleVariant::Or(y))
      }
      (x, y) => {
        Rule(RuleVariant::Or(vec![Rule(x), Rule(y)]))
      }
    }
  }
}

impl Add for Rule {
  type Output = Rule;

  fn add(self, rhs: Rule) -> Rule {
    match (self.0, rhs.0) {
      (RuleVariant::Seq(mut x), RuleVariant::Seq(mut y)) => {
        x.append(&mut y);
        Rule(RuleVariant::Seq(x))
      }
      (RuleVariant::Seq(mut x), y) => {
        x.push(Rule(y));
        Rule(RuleVariant::Seq(x))
      }
      (x, RuleVariant::Seq(mut y)) => {
        y.insert(0, Rule(x));
        Rule(RuleVariant::Seq(y))
      }
      (x, y) => {
        Rule(RuleVariant::Seq(vec![Rule(x), Rule(y)]))
      }
    }
  }
}

impl Rule {
  /// Calls `f` with every symbol name referenced by the rule.
  pub(crate) fn visit_syms<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
    match &self.0 {
      RuleVariant::Sym(name) => f(name),
      RuleVariant::Empty | RuleVariant::Hint(_) => {}
      RuleVariant::Seq(rules) | RuleVariant::Or(rules) => {
        for rule in rules {
          rule.visit_syms(f);
        }
      }
      RuleVariant::Many(rep)
      | RuleVariant::Some(rep)
      | RuleVariant::Option(rep) => rep.rule.visit_syms(f),
      RuleVariant::SepBy(sep_by) | RuleVariant::SepBy1(sep_by) => {
        sep_by.sep.visit_syms(f);
        sep_by.rule.visit_syms(f);
      }
      RuleVariant::Prec(prec) => prec.rule.visit_syms(f),
    }
  }

  fn has_empty_operand(&self) -> bool {
    match &self.0 {
      RuleVariant::Sym(_) | RuleVariant::Empty | RuleVariant::Hint(_) => false,
      RuleVariant::Seq(rules) | RuleVariant::Or(rules) => {
        rules.is_empty() || rules.iter().any(|r| r.has_empty_operand())
      }
      RuleVariant::Many(rep)
      | RuleVariant::Some(rep)
      | RuleVariant::Option(rep) => rep.rule.has_empty_operand(),
      RuleVariant::SepBy(sep_by) | RuleVariant::SepBy1(sep_by) => {
        sep_by.sep.has_empty_operand() || sep_by.rule.has_empty_operand()
      }
      RuleVariant::Prec(prec) => prec.rule.has_empty_operand(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TokenDecl {
  pub(crate) prec: Option<u16>,
  pub(crate) assoc: Assoc,
  pub(crate) flags: TermFlags,
}

/// Collects tokens, rules and term markings; `build` checks them.
#[derive(Default)]
pub struct GrammarBuilder {
  tokens: IndexMap<String, TokenDecl>,
  rules: IndexMap<String, Rule>,
  root: Option<String>,
  operators: Vec<(String, u16, Assoc, bool)>,
  markings: Vec<(String, TermFlags, &'static str)>,
  factories: Vec<(String, NodeFactory)>,
  errors: Vec<GrammarError>,
}

impl GrammarBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn token(&mut self, name: &str) -> &mut Self {
    if name == EOF || name == ERROR {
      self.errors.push(GrammarError::ReservedName(name.to_owned()));
    } else if self.tokens.insert(name.to_owned(), TokenDecl::default()).is_some() {
      self.errors.push(GrammarError::DuplicateToken(name.to_owned()));
    }
    self
  }

  pub fn tokens(&mut self, names: &[&str]) -> &mut Self {
    for name in names {
      self.token(name);
    }
    self
  }

  pub fn rule(&mut self, name: &str, rule: Rule) -> &mut Self {
    if name == EOF || name == ERROR {
      self.errors.push(GrammarError::ReservedName(name.to_owned()));
    } else if self.rules.insert(name.to_owned(), rule).is_some() {
      self.errors.push(GrammarError::DuplicateRule(name.to_owned()));
    }
    self
  }

  pub fn root(&mut self, name: &str) -> &mut Self {
    self.root = Some(name.to_owned());
    self
  }

  /// Registers precedence and associativity used when building the tables.
  pub fn operators(&mut self, prec: u16, assoc: Assoc, names: &[&str]) -> &mut Self {
    for name in names {
      self.operators.push(((*name).to_owned(), prec, assoc, false));
    }
    self
  }

  /// Like `operators`, but conflicts on these terminals are settled while
  /// parsing by comparing against the nearest operator on the stack.
  pub fn runtime_operators(
    &mut self,
    prec: u16,
    assoc: Assoc,
    names: &[&str],
  ) -> &mut Self {
    for name in names {
      self.operators.push(((*name).to_owned(), prec, assoc, true));
    }
    self
  }

  pub fn punctuation(&mut self, names: &[&str]) -> &mut Self {
    self.mark(names, TermFlags::PUNCTUATION, "punctuation")
  }

  pub fn transient(&mut self, names: &[&str]) -> &mut Self {
    self.mark(names, TermFlags::TRANSIENT, "transient")
  }

  pub fn non_grammar(&mut self, names: &[&str]) -> &mut Self {
    self.mark(names, TermFlags::NON_GRAMMAR, "non-grammar")
  }

  pub fn node_factory(&mut self, name: &str, factory: NodeFactory) -> &mut Self {
    self.factories.push((name.to_owned(), factory));
    self
  }

  fn mark(
    &mut self,
    names: &[&str],
    flags: TermFlags,
    context: &'static str,
  ) -> &mut Self {
    for name in names {
      self.markings.push(((*name).to_owned(), flags, context));
    }
    self
  }

  pub fn build(&mut self) -> Result<Grammar, GrammarErrors> {
    let mut errors = std::mem::take(&mut self.errors);
    let mut tokens = self.tokens.clone();
    tokens.insert(EOF.to_owned(), TokenDecl::default());
    tokens.insert(ERROR.to_owned(), TokenDecl::default());
    let mut nonterm_flags = HashMap::new();

    for (name, prec, assoc, runtime) in &self.operators {
      match tokens.get_mut(name) {
        Some(decl) => {
          decl.prec = Some(*prec);
          decl.assoc = *assoc;
          decl.flags.set(TermFlags::OPERATOR, *runtime);
        }
        None => errors.push(GrammarError::UnknownTerm {
          name: name.clone(),
          context: "operator",
        }),
      }
    }

    for (name, flags, context) in &self.markings {
      if let Some(decl) = tokens.get_mut(name) {
        decl.flags |= *flags;
      } else if self.rules.contains_key(name) {
        *nonterm_flags.entry(name.clone()).or_insert_with(TermFlags::empty) |= *flags;
      } else {
        errors.push(GrammarError::UnknownTerm {
          name: name.clone(),
          context,
        });
      }
    }

    let mut factories = HashMap::new();
    for (name, factory) in &self.factories {
      if self.rules.contains_key(name) {
        factories.insert(name.clone(), *factory);
      } else {
        errors.push(GrammarError::UnknownTerm {
          name: name.clone(),
          context: "node factory",
        });
      }
    }

    let root = match &self.root {
      None => {
        errors.push(GrammarError::UnsetRoot);
        String::new()
      }
      Some(root) => {
        if !self.rules.contains_key(root) {
          errors.push(GrammarError::UndefinedRoot(root.clone()));
        }
        root.clone()
      }
    };

    if !errors.is_empty() {
      return Err(GrammarErrors(errors));
    }

    Ok(Grammar {
      tokens,
      rules: self.rules.clone(),
      nonterm_flags,
      root,
      factories,
    })
  }
}

/// A checked grammar, ready to be compiled into parser tables.
#[derive(Clone)]
pub struct Grammar {
  pub(crate) tokens: IndexMap<String, TokenDecl>,
  pub(crate) rules: IndexMap<String, Rule>,
  pub(crate) nonterm_flags: HashMap<String, TermFlags>,
  pub(crate) root: String,
  pub(crate) factories: HashMap<String, NodeFactory>,
}

impl Grammar {
  pub fn builder() -> GrammarBuilder {
    GrammarBuilder::new()
  }

  pub fn root(&self) -> &str {
    &self.root
  }

  pub(crate) fn validate(&self) -> Result<(), GrammarErrors> {
    let errors = self.rules.iter()
      .filter(|(_, rule)| rule.has_empty_operand())
      .map(|(name, _)| GrammarError::EmptyAlternative { rule: name.clone() })
      .collect::<Vec<_>>();
    if errors.is_empty() {
      Ok(())
    } else {
      Err(GrammarErrors(errors))
    }
  }
}

/// Shorthand for a builder with the given tokens, root and rules.
pub fn grammar(
  tokens: &[&str],
  root: &str,
  rules: impl IntoIterator<Item = (&'static str, Rule)>,
) -> GrammarBuilder {
  let mut builder = GrammarBuilder::new();
  builder.tokens(tokens).root(root);
  for (name, rule) in rules {
    builder.rule(name, rule);
  }
  builder
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn or_flattens() {
    let rule = sym("a") | sym("b") | (sym("c") | sym("d"));
    assert_eq!(rule, Rule(RuleVariant::Or(vec![
      sym("a"), sym("b"), sym("c"), sym("d"),
    ])));
  }

  #[test]
  fn add_flattens() {
    let rule = sym("a") + sym("b") + seq([sym("c"), sym("d")]);
    assert_eq!(rule, seq([sym("a"), sym("b"), sym("c"), sym("d")]));
  }

  #[test]
  fn reports_construction_errors() {
    let mut builder = grammar(&["a", "a"], "S", [("S", sym("a"))]);
    builder.token("error").punctuation(&["nope"]);
    let errs = builder.build().err().unwrap();
    assert_eq!(errs.0, vec![
      GrammarError::DuplicateToken("a".to_owned()),
      GrammarError::ReservedName("error".to_owned()),
      GrammarError::UnknownTerm { name: "nope".to_owned(), context: "punctuation" },
    ]);
  }

  #[test]
  fn unset_root() {
    let errs = GrammarBuilder::new().token("a").rule("S", sym("a")).build()
      .err().unwrap();
    assert_eq!(errs.0, vec![GrammarError::UnsetRoot]);
  }

  #[test]
  fn empty_operand() {
    let g = grammar(&["a"], "S", [("S", sym("a") | seq(Vec::new()))]).build().unwrap();
    assert_eq!(g.validate().err().unwrap().0, vec![
      GrammarError::EmptyAlternative { rule: "S".to_owned() },
    ]);
  }

  #[test]
  fn operators_set_flags() {
    let g = grammar(&["+", "*", "n"], "E", [("E", sym("n"))])
      .operators(1, Assoc::Left, &["+"])
      .runtime_operators(2, Assoc::Right, &["*"])
      .build()
      .unwrap();
    assert_eq!(g.tokens["+"].prec, Some(1));
    assert!(!g.tokens["+"].flags.contains(TermFlags::OPERATOR));
    assert_eq!(g.tokens["*"].assoc, Assoc::Right);
    assert!(g.tokens["*"].flags.contains(TermFlags::OPERATOR));
  }

  #[test]
  fn precedence_choice() {
    assert!(reduce_first(2, 1, Assoc::Left));
    assert!(!reduce_first(1, 2, Assoc::Left));
    assert!(reduce_first(1, 1, Assoc::Left));
    assert!(!reduce_first(1, 1, Assoc::Right));
    assert!(!reduce_first(1, 1, Assoc::None));
  }
}
