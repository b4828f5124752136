use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write;
use crate::error::{GrammarError, GrammarErrors};
use crate::grammar::*;

pub(crate) struct Bnf {
  pub(crate) tokens: Vec<Terminal>,
  pub(crate) nonterms: Vec<Nonterm>,
  pub(crate) prods: Vec<Production>,
  /// LR(0) items; each production owns the chain `first_item..=first_item+len`.
  pub(crate) items: Vec<Lr0Item>,
  /// augmented root `Root' -> Root $end`
  pub(crate) start: NontermId,
  pub(crate) root: NontermId,
  pub(crate) eof: TermId,
  pub(crate) error: TermId,
  token_names: HashMap<String, TermId>,
  nonterm_names: HashMap<String, NontermId>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Symbol {
  Term(TermId),
  Nonterm(NontermId),
}

/// Terminal id, stable for the lifetime of a `Parser`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TermId(pub(crate) u32);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NontermId(pub(crate) u32);

/// Production id; lower ids were declared first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ProdId(pub(crate) u32);

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct ItemId(pub(crate) u32);

impl TermId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl NontermId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl ProdId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

impl ItemId {
  pub(crate) fn index(self) -> usize {
    self.0 as usize
  }

  pub(crate) fn next(self) -> ItemId {
    ItemId(self.0 + 1)
  }
}

#[derive(Clone)]
pub(crate) struct Terminal {
  pub(crate) name: String,
  pub(crate) prec: Option<u16>,
  pub(crate) assoc: Assoc,
  pub(crate) flags: TermFlags,
}

#[derive(Clone)]
pub(crate) struct Nonterm {
  pub(crate) name: String,
  pub(crate) prods: Vec<ProdId>,
  pub(crate) flags: TermFlags,
  pub(crate) factory: Option<NodeFactory>,
}

/// How the runtime builds the node of a reduced production.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ProdKind {
  Normal,
  /// `L -> X` or `L -> ε`: a fresh list node.
  ListStart,
  /// `L -> L [sep] X`: the existing list node is extended in place.
  ListAppend,
  /// `L* -> L+`: the child list node is relabelled.
  ListWrap,
}

#[derive(Clone)]
pub(crate) struct Production {
  pub(crate) nonterm: NontermId,
  pub(crate) symbols: Vec<Symbol>,
  pub(crate) prec: Option<u16>,
  pub(crate) assoc: Assoc,
  /// (dot position, hint)
  pub(crate) hints: Vec<(usize, Hint)>,
  pub(crate) kind: ProdKind,
  pub(crate) first_item: ItemId,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Lr0Item {
  pub(crate) prod: ProdId,
  pub(crate) dot: usize,
}

impl Bnf {
  pub(crate) fn new(grammar: &Grammar) -> Result<Bnf, GrammarErrors> {
    let mut lowering = Lowering::new(grammar);
    lowering.lower_all();
    if !lowering.errors.is_empty() {
      return Err(GrammarErrors(lowering.errors));
    }
    let mut bnf = lowering.bnf;
    bnf.detect_transient();
    log::debug!(
      "grammar `{}`: {} tokens, {} non-terminals, {} productions, {} items",
      grammar.root, bnf.tokens.len(), bnf.nonterms.len(), bnf.prods.len(),
      bnf.items.len());
    Ok(bnf)
  }

  pub(crate) fn token_id(&self, name: &str) -> Option<TermId> {
    self.token_names.get(name).copied()
  }

  pub(crate) fn nonterm_id(&self, name: &str) -> Option<NontermId> {
    self.nonterm_names.get(name).copied()
  }

  pub(crate) fn token(&self, id: TermId) -> &Terminal {
    &self.tokens[id.index()]
  }

  pub(crate) fn nonterm(&self, id: NontermId) -> &Nonterm {
    &self.nonterms[id.index()]
  }

  pub(crate) fn prod(&self, id: ProdId) -> &Production {
    &self.prods[id.index()]
  }

  pub(crate) fn item(&self, id: ItemId) -> Lr0Item {
    self.items[id.index()]
  }

  pub(crate) fn symbol_name(&self, sym: Symbol) -> &str {
    match sym {
      Symbol::Term(id) => &self.token(id).name,
      Symbol::Nonterm(id) => &self.nonterm(id).name,
    }
  }

  pub(crate) fn symbol_flags(&self, sym: Symbol) -> TermFlags {
    match sym {
      Symbol::Term(id) => self.token(id).flags,
      Symbol::Nonterm(id) => self.nonterm(id).flags,
    }
  }

  /// The symbol right after the dot, if any.
  pub(crate) fn next_symbol(&self, item: ItemId) -> Option<Symbol> {
    let Lr0Item { prod, dot } = self.item(item);
    self.prod(prod).symbols.get(dot).copied()
  }

  pub(crate) fn is_reduce(&self, item: ItemId) -> bool {
    self.next_symbol(item).is_none()
  }

  pub(crate) fn hint_at(&self, item: ItemId) -> Option<Hint> {
    let Lr0Item { prod, dot } = self.item(item);
    self.prod(prod).hints.iter()
      .find(|(pos, _)| *pos == dot)
      .map(|&(_, hint)| hint)
  }

  pub(crate) fn prod_string(&self, id: ProdId) -> String {
    let prod = self.prod(id);
    let mut s = format!("{} →", self.nonterm(prod.nonterm).name);
    if prod.symbols.is_empty() {
      s.push_str(" ε");
    }
    for &sym in &prod.symbols {
      let _ = write!(s, " {}", self.symbol_name(sym));
    }
    s
  }

  pub(crate) fn item_string(&self, id: ItemId) -> String {
    let Lr0Item { prod, dot } = self.item(id);
    let p = self.prod(prod);
    let mut s = format!("{} →", self.nonterm(p.nonterm).name);
    for (i, &sym) in p.symbols.iter().enumerate() {
      if i == dot {
        s.push_str(" •");
      }
      let _ = write!(s, " {}", self.symbol_name(sym));
    }
    if dot == p.symbols.len() {
      s.push_str(" •");
    }
    s
  }

  /// Non-terminals whose productions all have exactly one symbol collapse
  /// into their child in the parse tree.
  fn detect_transient(&mut self) {
    for i in 0..self.nonterms.len() {
      let nonterm = &self.nonterms[i];
      if NontermId(i as u32) == self.start
        || nonterm.flags.contains(TermFlags::LIST)
        || nonterm.prods.is_empty() {
        continue;
      }
      let single = nonterm.prods.iter()
        .all(|&p| self.prods[p.index()].symbols.len() == 1);
      if single {
        self.nonterms[i].flags |= TermFlags::TRANSIENT;
      }
    }
  }
}

#[derive(Clone, Default)]
struct Alt {
  symbols: Vec<Symbol>,
  hints: Vec<(usize, Hint)>,
  prec: Option<(u16, Assoc)>,
}

impl Alt {
  fn sym(sym: Symbol) -> Alt {
    Alt {
      symbols: vec![sym],
      ..Alt::default()
    }
  }

  fn concat(&self, rhs: &Alt) -> Alt {
    let offset = self.symbols.len();
    let mut symbols = self.symbols.clone();
    symbols.extend_from_slice(&rhs.symbols);
    let mut hints = self.hints.clone();
    hints.extend(rhs.hints.iter().map(|&(pos, hint)| (pos + offset, hint)));
    Alt {
      symbols,
      hints,
      prec: rhs.prec.or(self.prec),
    }
  }
}

#[derive(Clone, Copy)]
enum ListShape {
  Many,
  Some,
  SepBy,
  SepBy1,
}

/// Explicit lowering context: every synthesized non-terminal is registered
/// here rather than in any global state.
struct Lowering<'g> {
  grammar: &'g Grammar,
  bnf: Bnf,
  errors: Vec<GrammarError>,
  hoisted: HashMap<NontermId, usize>,
  lists: HashMap<String, NontermId>,
}

impl<'g> Lowering<'g> {
  fn new(grammar: &'g Grammar) -> Self {
    let mut tokens = vec![];
    let mut token_names = HashMap::new();
    for (i, (name, decl)) in grammar.tokens.iter().enumerate() {
      tokens.push(Terminal {
        name: name.clone(),
        prec: decl.prec,
        assoc: decl.assoc,
        flags: decl.flags,
      });
      token_names.insert(name.clone(), TermId(i as u32));
    }
    let eof = token_names[EOF];
    let error = token_names[ERROR];

    Lowering {
      grammar,
      bnf: Bnf {
        tokens,
        nonterms: vec![],
        prods: vec![],
        items: vec![],
        start: NontermId(0),
        root: NontermId(0),
        eof,
        error,
        token_names,
        nonterm_names: HashMap::new(),
      },
      errors: vec![],
      hoisted: HashMap::new(),
      lists: HashMap::new(),
    }
  }

  /// Names of the rules reachable from the root.
  fn reachable(&self) -> HashSet<&'g str> {
    let grammar: &'g Grammar = self.grammar;
    let rules = &grammar.rules;
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(grammar.root.as_str());
    queue.push_back(grammar.root.as_str());
    while let Some(name) = queue.pop_front() {
      if let Some(rule) = rules.get(name) {
        rule.visit_syms(&mut |sym| {
          if rules.contains_key(sym) && seen.insert(sym) {
            queue.push_back(sym);
          }
        });
      }
    }
    seen
  }

  fn lower_all(&mut self) {
    let grammar = self.grammar;
    let reachable = self.reachable();

    let start = self.add_nonterm(format!("{}'", grammar.root), TermFlags::empty());
    self.bnf.start = start;
    let mut rules = vec![];
    for (name, rule) in &grammar.rules {
      if !reachable.contains(name.as_str()) {
        log::debug!("rule `{}` is unreachable from the root", name);
        continue;
      }
      let flags = grammar.nonterm_flags.get(name).copied().unwrap_or_default();
      let id = self.add_nonterm(name.clone(), flags);
      self.bnf.nonterms[id.index()].factory = grammar.factories.get(name).copied();
      rules.push((id, rule));
    }

    self.bnf.root = self.bnf.nonterm_names[&grammar.root];
    let augmented = Alt {
      symbols: vec![
        Symbol::Nonterm(self.bnf.root),
        Symbol::Term(self.bnf.eof),
      ],
      ..Alt::default()
    };
    self.add_prod(start, augmented, ProdKind::Normal);

    for (id, rule) in rules {
      self.lower_rule(id, rule);
    }
  }

  fn add_nonterm(&mut self, name: String, flags: TermFlags) -> NontermId {
    let id = NontermId(self.bnf.nonterms.len() as u32);
    self.bnf.nonterm_names.insert(name.clone(), id);
    self.bnf.nonterms.push(Nonterm {
      name,
      prods: vec![],
      flags,
      factory: None,
    });
    id
  }

  fn add_prod(&mut self, owner: NontermId, alt: Alt, kind: ProdKind) -> ProdId {
    let bnf = &mut self.bnf;
    let id = ProdId(bnf.prods.len() as u32);
    let first_item = ItemId(bnf.items.len() as u32);
    for dot in 0..=alt.symbols.len() {
      bnf.items.push(Lr0Item {
        prod: id,
        dot,
      });
    }

    let mut implicit_prec = None;
    for &sym in &alt.symbols {
      if let Symbol::Term(t) = sym {
        let token = &bnf.tokens[t.index()];
        if let Some(prec) = token.prec {
          implicit_prec = Some((prec, token.assoc));
        }
      }
    }
    let (prec, assoc) = match alt.prec.or(implicit_prec) {
      Some((prec, assoc)) => (Some(prec), assoc),
      None => (None, Assoc::None),
    };

    bnf.prods.push(Production {
      nonterm: owner,
      symbols: alt.symbols,
      prec,
      assoc,
      hints: alt.hints,
      kind,
      first_item,
    });
    bnf.nonterms[owner.index()].prods.push(id);
    id
  }

  fn lower_rule(&mut self, owner: NontermId, rule: &Rule) {
    match &rule.0 {
      RuleVariant::Many(rep) => self.lower_list(owner, ListShape::Many, None, &rep.rule),
      RuleVariant::Some(rep) => self.lower_list(owner, ListShape::Some, None, &rep.rule),
      RuleVariant::SepBy(s) => {
        self.lower_list(owner, ListShape::SepBy, Some(&s.sep), &s.rule)
      }
      RuleVariant::SepBy1(s) => {
        self.lower_list(owner, ListShape::SepBy1, Some(&s.sep), &s.rule)
      }
      _ => {
        for alt in self.expand(owner, rule) {
          self.add_prod(owner, alt, ProdKind::Normal);
        }
      }
    }
  }

  /// Expands a rule into its alternatives (cross product over options).
  fn expand(&mut self, owner: NontermId, rule: &Rule) -> Vec<Alt> {
    match &rule.0 {
      RuleVariant::Sym(name) => match self.resolve(owner, name) {
        Some(sym) => vec![Alt::sym(sym)],
        None => vec![Alt::default()],
      },
      RuleVariant::Empty => vec![Alt::default()],
      RuleVariant::Hint(hint) => vec![Alt {
        hints: vec![(0, *hint)],
        ..Alt::default()
      }],
      RuleVariant::Or(rules) => {
        rules.iter().flat_map(|r| self.expand(owner, r)).collect()
      }
      RuleVariant::Seq(rules) => {
        let mut alts = vec![Alt::default()];
        for r in rules {
          let elems = match &r.0 {
            RuleVariant::Or(_) => vec![Alt::sym(self.hoist(owner, r))],
            _ => self.expand(owner, r),
          };
          alts = alts.iter()
            .flat_map(|a| elems.iter().map(move |b| a.concat(b)))
            .collect();
        }
        alts
      }
      RuleVariant::Option(rep) => {
        let mut alts = self.expand(owner, &rep.rule);
        alts.push(Alt::default());
        alts
      }
      RuleVariant::Many(rep) => {
        vec![Alt::sym(self.list(owner, ListShape::Many, None, &rep.rule))]
      }
      RuleVariant::Some(rep) => {
        vec![Alt::sym(self.list(owner, ListShape::Some, None, &rep.rule))]
      }
      RuleVariant::SepBy(s) => {
        vec![Alt::sym(self.list(owner, ListShape::SepBy, Some(&s.sep), &s.rule))]
      }
      RuleVariant::SepBy1(s) => {
        vec![Alt::sym(self.list(owner, ListShape::SepBy1, Some(&s.sep), &s.rule))]
      }
      RuleVariant::Prec(p) => {
        let mut alts = self.expand(owner, &p.rule);
        for alt in &mut alts {
          alt.prec = Some((p.prec, p.assoc));
        }
        alts
      }
    }
  }

  fn resolve(&mut self, owner: NontermId, name: &str) -> Option<Symbol> {
    if name == EOF {
      self.errors.push(GrammarError::ReservedName(name.to_owned()));
      return None;
    }
    if let Some(&t) = self.bnf.token_names.get(name) {
      return Some(Symbol::Term(t));
    }
    if let Some(&nt) = self.bnf.nonterm_names.get(name) {
      return Some(Symbol::Nonterm(nt));
    }
    self.errors.push(GrammarError::UndefinedSymbol {
      name: name.to_owned(),
      rule: self.bnf.nonterms[owner.index()].name.clone(),
    });
    None
  }

  /// Moves an anonymous rule into a fresh non-terminal `<owner>_<n>`.
  fn hoist(&mut self, owner: NontermId, rule: &Rule) -> Symbol {
    let n = self.hoisted.entry(owner).or_insert(0);
    *n += 1;
    let name = format!("{}_{}", self.bnf.nonterms[owner.index()].name, n);
    let id = self.add_nonterm(name, TermFlags::empty());
    for alt in self.expand(id, rule) {
      self.add_prod(id, alt, ProdKind::Normal);
    }
    Symbol::Nonterm(id)
  }

  /// Lowers a rule to a single symbol, hoisting it when needed.
  fn symbol_of(&mut self, owner: NontermId, rule: &Rule) -> Option<Symbol> {
    match &rule.0 {
      RuleVariant::Sym(name) => self.resolve(owner, name),
      _ => Some(self.hoist(owner, rule)),
    }
  }

  /// Synthesized list non-terminal, shared between rules by name.
  fn list(
    &mut self,
    owner: NontermId,
    shape: ListShape,
    sep: Option<&Rule>,
    item: &Rule,
  ) -> Symbol {
    let item_sym = match self.symbol_of(owner, item) {
      Some(sym) => sym,
      None => return Symbol::Nonterm(owner),
    };
    let sep_sym = match sep {
      Some(sep) => match self.symbol_of(owner, sep) {
        Some(sym) => Some(sym),
        None => return Symbol::Nonterm(owner),
      },
      None => None,
    };

    let mut name = self.bnf.symbol_name(item_sym).to_owned();
    name.push(match shape {
      ListShape::Many | ListShape::SepBy => '*',
      ListShape::Some | ListShape::SepBy1 => '+',
    });
    if let Some(sep_sym) = sep_sym {
      name.push('/');
      name.push_str(self.bnf.symbol_name(sep_sym));
    }
    if let Some(&id) = self.lists.get(&name) {
      return Symbol::Nonterm(id);
    }

    let id = self.add_nonterm(name.clone(), TermFlags::empty());
    self.lists.insert(name, id);
    self.list_prods(id, shape, sep_sym, item_sym);
    Symbol::Nonterm(id)
  }

  /// A rule whose whole body is a list combinator is itself the list.
  fn lower_list(
    &mut self,
    owner: NontermId,
    shape: ListShape,
    sep: Option<&Rule>,
    item: &Rule,
  ) {
    let item_sym = self.symbol_of(owner, item);
    let sep_sym = sep.map(|sep| self.symbol_of(owner, sep));
    match (item_sym, sep_sym) {
      (Some(item), None) => self.list_prods(owner, shape, None, item),
      (Some(item), Some(Some(sep))) => self.list_prods(owner, shape, Some(sep), item),
      _ => {}
    }
  }

  fn list_prods(
    &mut self,
    list: NontermId,
    shape: ListShape,
    sep: Option<Symbol>,
    item: Symbol,
  ) {
    self.bnf.nonterms[list.index()].flags |= TermFlags::LIST;
    let append = |sep: Option<Symbol>| Alt {
      symbols: std::iter::once(Symbol::Nonterm(list))
        .chain(sep)
        .chain(std::iter::once(item))
        .collect(),
      ..Alt::default()
    };
    match shape {
      ListShape::Many => {
        self.add_prod(list, Alt::default(), ProdKind::ListStart);
        self.add_prod(list, append(None), ProdKind::ListAppend);
      }
      ListShape::Some => {
        self.add_prod(list, Alt::sym(item), ProdKind::ListStart);
        self.add_prod(list, append(None), ProdKind::ListAppend);
      }
      ListShape::SepBy1 => {
        self.add_prod(list, Alt::sym(item), ProdKind::ListStart);
        self.add_prod(list, append(sep), ProdKind::ListAppend);
      }
      ListShape::SepBy => {
        let plus = self.plus_list(sep, item);
        self.add_prod(list, Alt::default(), ProdKind::ListStart);
        self.add_prod(list, Alt::sym(plus), ProdKind::ListWrap);
      }
    }
  }

  fn plus_list(&mut self, sep: Option<Symbol>, item: Symbol) -> Symbol {
    let mut name = format!("{}+", self.bnf.symbol_name(item));
    if let Some(sep) = sep {
      name.push('/');
      name.push_str(self.bnf.symbol_name(sep));
    }
    if let Some(&id) = self.lists.get(&name) {
      return Symbol::Nonterm(id);
    }
    let id = self.add_nonterm(name.clone(), TermFlags::empty());
    self.lists.insert(name, id);
    self.list_prods(id, ListShape::SepBy1, sep, item);
    Symbol::Nonterm(id)
  }
}
