use integeriser::{HashIntegeriser, Integeriser};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;

const NONTERMINAL_BIT: u32 = 1 << 31;

/// A symbol issued by a `Vocabulary`. The highest bit marks nonterminals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sym(u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymKind {
    Terminal,
    Nonterminal,
}

impl Sym {
    pub fn kind(self) -> SymKind {
        if self.0 & NONTERMINAL_BIT == 0 {
            SymKind::Terminal
        } else {
            SymKind::Nonterminal
        }
    }

    pub fn is_terminal(self) -> bool {
        self.kind() == SymKind::Terminal
    }

    pub fn is_nonterminal(self) -> bool {
        self.kind() == SymKind::Nonterminal
    }

    /// One of the reserved symbols epsilon, rho, sigma and phi.
    pub fn is_special(self) -> bool {
        self.is_terminal() && self.0 < SPECIAL_NAMES.len() as u32
    }

    fn offset(self) -> usize {
        (self.0 & !NONTERMINAL_BIT) as usize
    }

    fn from_offset(kind: SymKind, offset: usize) -> Sym {
        match kind {
            SymKind::Terminal => Sym(offset as u32),
            SymKind::Nonterminal => Sym(offset as u32 | NONTERMINAL_BIT),
        }
    }
}

const SPECIAL_NAMES: [&str; 4] = ["<eps>", "<rho>", "<sigma>", "<phi>"];

/// The reserved symbols every vocabulary registers first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecialSymbols {
    pub epsilon: Sym,
    pub rho: Sym,
    pub sigma: Sym,
    pub phi: Sym,
}

/// The label of a state: an input and an output symbol. States of acceptors
/// carry equal input and output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Label {
    pub input: Sym,
    pub output: Sym,
}

impl Label {
    pub fn new(sym: Sym) -> Self {
        Label {
            input: sym,
            output: sym,
        }
    }

    pub fn pair(input: Sym, output: Sym) -> Self {
        Label { input, output }
    }

    pub fn is_lexical(&self) -> bool {
        self.input.is_terminal()
    }

    pub fn is_epsilon(&self, specials: &SpecialSymbols) -> bool {
        self.input == specials.epsilon && self.output == specials.epsilon
    }
}

struct Tables {
    terminals: HashIntegeriser<String>,
    nonterminals: HashIntegeriser<String>,
}

impl Tables {
    fn table(&self, kind: SymKind) -> &HashIntegeriser<String> {
        match kind {
            SymKind::Terminal => &self.terminals,
            SymKind::Nonterminal => &self.nonterminals,
        }
    }
}

/// Interns symbol strings. Append-only; shared between hypergraphs as
/// `Arc<Vocabulary>` and safe to use from several threads.
pub struct Vocabulary {
    tables: RwLock<Tables>,
    specials: SpecialSymbols,
}

impl Vocabulary {
    pub fn new() -> Self {
        let mut tables = Tables {
            terminals: HashIntegeriser::new(),
            nonterminals: HashIntegeriser::new(),
        };
        let ids: Vec<Sym> = SPECIAL_NAMES
            .iter()
            .map(|name| Sym::from_offset(SymKind::Terminal, tables.terminals.integerise(name.to_string())))
            .collect();
        Vocabulary {
            tables: RwLock::new(tables),
            specials: SpecialSymbols {
                epsilon: ids[0],
                rho: ids[1],
                sigma: ids[2],
                phi: ids[3],
            },
        }
    }

    pub fn specials(&self) -> SpecialSymbols {
        self.specials
    }

    pub fn epsilon(&self) -> Sym {
        self.specials.epsilon
    }

    pub fn add(&self, name: &str, kind: SymKind) -> Sym {
        if let Some(sym) = self.find(name, kind) {
            return sym;
        }
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let offset = match kind {
            SymKind::Terminal => tables.terminals.integerise(name.to_owned()),
            SymKind::Nonterminal => tables.nonterminals.integerise(name.to_owned()),
        };
        Sym::from_offset(kind, offset)
    }

    pub fn add_terminal(&self, name: &str) -> Sym {
        self.add(name, SymKind::Terminal)
    }

    pub fn find(&self, name: &str, kind: SymKind) -> Option<Sym> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables
            .table(kind)
            .find_key(&name.to_owned())
            .map(|offset| Sym::from_offset(kind, offset))
    }

    pub fn str(&self, sym: Sym) -> Option<String> {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.table(sym.kind()).find_value(sym.offset()).cloned()
    }

    /// Number of symbols of both kinds, specials included.
    pub fn len(&self) -> usize {
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        tables.terminals.size() + tables.nonterminals.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Vocabulary::new()
    }
}

impl fmt::Debug for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Vocabulary({} symbols)", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn specials_come_first() {
        let vocabulary = Vocabulary::new();
        let specials = vocabulary.specials();
        assert!(specials.epsilon.is_special());
        assert!(specials.phi.is_special());
        assert_eq!(vocabulary.str(specials.epsilon).as_deref(), Some("<eps>"));
        assert_eq!(vocabulary.len(), 4);
        assert!(!vocabulary.add_terminal("a").is_special());
    }

    #[test]
    fn kinds_are_separate() {
        let vocabulary = Vocabulary::new();
        let t = vocabulary.add("S", SymKind::Terminal);
        let n = vocabulary.add("S", SymKind::Nonterminal);
        assert_ne!(t, n);
        assert!(n.is_nonterminal());
        assert_eq!(vocabulary.add("S", SymKind::Nonterminal), n);
        assert_eq!(vocabulary.str(n).as_deref(), Some("S"));
        assert_eq!(vocabulary.find("T", SymKind::Terminal), None);
    }

    #[test]
    fn concurrent_interning_agrees() {
        let vocabulary = Arc::new(Vocabulary::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let vocabulary = Arc::clone(&vocabulary);
                thread::spawn(move || {
                    (0..50)
                        .map(|i| vocabulary.add_terminal(&format!("w{}", i)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<Vec<Sym>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(vocabulary.len(), 54);
    }
}
