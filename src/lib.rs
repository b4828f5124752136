pub mod error;
pub mod grammar;
pub mod parser;
pub mod runtime;
mod bnf;
#[cfg(test)]
mod test_grammars;

pub use bnf::{NontermId, ProdId, Symbol, TermId};
pub use error::{GrammarError, GrammarErrors, Message, Position, ScanError, Severity, Span};
pub use grammar::{Assoc, Grammar, GrammarBuilder, Hint, TermFlags};
pub use parser::{Action, BuildOptions, Mode, Parser, StateId};
pub use runtime::{
  ConflictResolver, Decision, ParseOptions, ParseStatus, ParseTree, ParseTreeNode, ParserStats,
  Token, TokenValue,
};

/// Compiles `grammar` into LALR tables.
pub fn build(grammar: Grammar) -> Result<Parser, GrammarErrors> {
  Parser::new(grammar, BuildOptions::default())
}
