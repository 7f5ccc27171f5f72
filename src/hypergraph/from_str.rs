//! The line-oriented text format of hypergraphs.
//!
//! ```text
//! # comment
//! START <- 0
//! FINAL <- 2
//! 1 <- 0 "a" / 1.5
//! 2 <- 1 3("b" "y") / 0.5
//! ```
//!
//! Each line holds one arc `head <- tail ... / weight`; the weight may be
//! omitted and defaults to one. States are numbers, optionally labelled as in
//! `3("in" "out")`; a quoted symbol `"a"` (or `"a":"b"` for a pair) stands
//! for the shared lexical state of that label. Quoted symbols have no escape
//! sequences. A nonterminal symbol is written in brackets, as in `4([NP])`.
//!
//! `START` without `FINAL` is an error. A file that names only its `FINAL`
//! state is a forest rooted there, and its start is set to the same state.
//! Files that name their `START` and whose arcs all have the shape of
//! finite-state transitions are read as graphs.

use super::{Hypergraph, Hyperarc, Label, Properties, StateId, StateIdTranslation, SymKind, Vocabulary};
use crate::error::{HgError, Result};
use fnv::FnvHashMap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt, rest},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
    IResult,
};
use num_traits::One;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

type Symbol<'a> = (&'a str, SymKind);

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token<'a> {
    State(u32, Option<(Symbol<'a>, Option<Symbol<'a>>)>),
    Lexical(&'a str, Option<&'a str>),
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Head<'a> {
    Start,
    Final,
    State(Token<'a>),
}

#[derive(Debug, PartialEq)]
struct Line<'a> {
    head: Head<'a>,
    tails: Vec<Token<'a>>,
    weight: Option<&'a str>,
}

fn quoted(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_while(|c: char| c != '"'), char('"'))(input)
}

fn bracketed(input: &str) -> IResult<&str, &str> {
    delimited(char('['), take_while(|c: char| c != ']'), char(']'))(input)
}

fn symbol(input: &str) -> IResult<&str, Symbol> {
    alt((
        map(quoted, |name| (name, SymKind::Terminal)),
        map(bracketed, |name| (name, SymKind::Nonterminal)),
    ))(input)
}

fn state_label(input: &str) -> IResult<&str, (Symbol, Option<Symbol>)> {
    delimited(
        pair(char('('), space0),
        pair(symbol, opt(preceded(space1, symbol))),
        pair(space0, char(')')),
    )(input)
}

fn state(input: &str) -> IResult<&str, Token> {
    map(
        pair(map_res(digit1, u32::from_str), opt(state_label)),
        |(id, label)| Token::State(id, label),
    )(input)
}

fn lexical(input: &str) -> IResult<&str, Token> {
    map(
        pair(quoted, opt(preceded(char(':'), quoted))),
        |(input, output)| Token::Lexical(input, output),
    )(input)
}

fn head(input: &str) -> IResult<&str, Head> {
    alt((
        map(tag("START"), |_| Head::Start),
        map(tag("FINAL"), |_| Head::Final),
        map(state, Head::State),
    ))(input)
}

fn line(input: &str) -> IResult<&str, Line> {
    let (input, head) = head(input)?;
    let (input, _) = delimited(space0, tag("<-"), space0)(input)?;
    let (input, tails) = separated_list1(space1, alt((state, lexical)))(input)?;
    let (input, weight) = opt(preceded(delimited(space0, char('/'), space0), rest))(input)?;
    Ok((input, Line { head, tails, weight }))
}

fn parse_line(text: &str, number: usize) -> Result<Line> {
    match all_consuming(line)(text) {
        Ok((_, parsed)) => Ok(parsed),
        Err(_) => Err(HgError::Parse {
            line: number,
            message: format!("cannot read {:?}", text),
        }),
    }
}

fn label_of(vocabulary: &Vocabulary, input: Symbol, output: Option<Symbol>) -> Label {
    let input = vocabulary.add(input.0, input.1);
    let output = output.map_or(input, |(name, kind)| vocabulary.add(name, kind));
    Label::pair(input, output)
}

fn terminals<'a>(input: &'a str, output: Option<&'a str>) -> (Symbol<'a>, Option<Symbol<'a>>) {
    (
        (input, SymKind::Terminal),
        output.map(|o| (o, SymKind::Terminal)),
    )
}

impl<W> Hypergraph<W>
where
    W: One + FromStr<Err = HgError>,
{
    /// Reads a hypergraph in text format, interning symbols in `vocabulary`.
    pub fn parse(text: &str, vocabulary: Arc<Vocabulary>) -> Result<Self> {
        let mut lines = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push((i + 1, parse_line(trimmed, i + 1)?));
        }

        let mut labels: FnvHashMap<u32, Label> = FnvHashMap::default();
        for (number, line) in &lines {
            let heads = match line.head {
                Head::State(token) => Some(token),
                _ => None,
            };
            for token in heads.iter().chain(line.tails.iter()) {
                if let Token::State(id, Some((input, output))) = *token {
                    let label = label_of(&vocabulary, input, output);
                    if *labels.entry(id).or_insert(label) != label {
                        return Err(HgError::Parse {
                            line: *number,
                            message: format!("state {} has two different labels", id),
                        });
                    }
                }
            }
        }

        let mut hg = Hypergraph::new(
            Properties::STORE_IN_ARCS | Properties::STORE_OUT_ARCS | Properties::CANONICAL_LEX,
            Arc::clone(&vocabulary),
        )?;

        // numbered states first, in ascending order, so that their ids agree
        // with the translation and dense files keep their numbering
        let mut numbered = BTreeSet::new();
        for (_, line) in &lines {
            let heads = match line.head {
                Head::State(token) => Some(token),
                _ => None,
            };
            for token in heads.iter().chain(line.tails.iter()) {
                if let Token::State(id, _) = *token {
                    numbered.insert(id);
                }
            }
        }
        let mut translation = StateIdTranslation::open();
        for id in numbered {
            translation.insert(StateId(id));
            match labels.get(&id) {
                Some(&label) => hg.add_labeled_state(label),
                None => hg.add_state(),
            };
        }

        let mut start_line = None;
        for (number, line) in lines {
            let mut states = Vec::with_capacity(line.tails.len());
            for token in &line.tails {
                let state = match *token {
                    Token::State(id, _) => translation.get(StateId(id)),
                    Token::Lexical(input, output) => {
                        let (input, output) = terminals(input, output);
                        Some(hg.lexical_state(label_of(&vocabulary, input, output)))
                    }
                };
                states.push(state.ok_or_else(|| HgError::Parse {
                    line: number,
                    message: "unknown state".to_string(),
                })?);
            }

            let weight = match line.weight.map(str::trim) {
                Some(w) => w.parse::<W>().map_err(|e| HgError::Parse {
                    line: number,
                    message: e.to_string(),
                })?,
                None => W::one(),
            };

            let at_line = |e: HgError| HgError::Parse {
                line: number,
                message: e.to_string(),
            };
            match line.head {
                Head::Start | Head::Final if states.len() != 1 || line.weight.is_some() => {
                    return Err(HgError::Parse {
                        line: number,
                        message: "START and FINAL take exactly one state and no weight".to_string(),
                    });
                }
                Head::Start => {
                    hg.set_start(states[0]).map_err(at_line)?;
                    start_line = Some(number);
                }
                Head::Final => hg.set_final(states[0]).map_err(at_line)?,
                Head::State(token) => {
                    let head = match token {
                        Token::State(id, _) => translation.get(StateId(id)),
                        Token::Lexical(..) => None,
                    };
                    let head = head.ok_or_else(|| HgError::Parse {
                        line: number,
                        message: "the head of an arc must be a numbered state".to_string(),
                    })?;
                    hg.add_arc(Hyperarc::new(head, states, weight)).map_err(at_line)?;
                }
            }
        }

        match (start_line, hg.final_state) {
            (Some(number), None) => {
                return Err(HgError::Parse {
                    line: number,
                    message: "START is given without FINAL".to_string(),
                });
            }
            // a forest is derived towards its root
            (None, Some(root)) => hg.start = Some(root),
            _ => (),
        }
        if start_line.is_some() && hg.is_fsm() {
            hg.properties.insert(Properties::GRAPH);
            hg.force_first_tail_out_arcs();
        }
        debug!(
            states = hg.size(),
            arcs = hg.num_arcs(),
            graph = hg.is_graph(),
            "read hypergraph"
        );
        Ok(hg)
    }
}

impl<W> FromStr for Hypergraph<W>
where
    W: One + FromStr<Err = HgError>,
{
    type Err = HgError;

    fn from_str(s: &str) -> Result<Self> {
        Hypergraph::parse(s, Arc::new(Vocabulary::new()))
    }
}

impl<W> Hypergraph<W> {
    fn write_symbol(&self, f: &mut fmt::Formatter, sym: super::Sym) -> fmt::Result {
        match (self.vocabulary.str(sym), sym.kind()) {
            (Some(name), SymKind::Terminal) => write!(f, "\"{}\"", name),
            (Some(name), SymKind::Nonterminal) => write!(f, "[{}]", name),
            (None, _) => Err(fmt::Error),
        }
    }

    fn write_state(&self, f: &mut fmt::Formatter, state: StateId) -> fmt::Result {
        let label = match self.label(state) {
            Some(label) => label,
            None => return write!(f, "{}", state),
        };
        if self.lexical_states.get(&label) == Some(&state) {
            self.write_symbol(f, label.input)?;
            if label.output != label.input {
                write!(f, ":")?;
                self.write_symbol(f, label.output)?;
            }
            Ok(())
        } else {
            write!(f, "{}(", state)?;
            self.write_symbol(f, label.input)?;
            if label.output != label.input {
                write!(f, " ")?;
                self.write_symbol(f, label.output)?;
            }
            write!(f, ")")
        }
    }
}

impl<W: fmt::Display> fmt::Display for Hypergraph<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(start) = self.start {
            writeln!(f, "START <- {}", start)?;
        }
        if let Some(end) = self.final_state {
            writeln!(f, "FINAL <- {}", end)?;
        }
        for arc in &self.arcs {
            self.write_state(f, arc.head)?;
            write!(f, " <-")?;
            for &t in &arc.tails {
                write!(f, " ")?;
                self.write_state(f, t)?;
            }
            writeln!(f, " / {}", arc.weight)?;
        }
        Ok(())
    }
}
