use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::ErrorMsg;
use crate::location::Location;
use crate::scope::ScopeId;

use super::inst::{BlockId, Inst, InstId, InstKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    pub insts: Vec<InstId>,
}

/// Instructions of one generation unit.
///
/// Append-only. Once poisoned a stream stays poisoned and must not be handed
/// to analysis; the first recorded error is its terminal diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstStream {
    name: String,
    insts: Vec<Inst>,
    blocks: Vec<BasicBlock>,
    current_block: BlockId,
    children: Vec<InstStream>,
    poisoned: bool,
    errors: Vec<ErrorMsg>,
    warnings: Vec<ErrorMsg>,
    is_inline: bool,
}

impl InstStream {
    pub fn new(name: impl Into<String>, is_inline: bool) -> Self {
        InstStream {
            name: name.into(),
            insts: Vec::new(),
            blocks: vec![BasicBlock { id: BlockId(0), name: "entry".to_string(), insts: Vec::new() }],
            current_block: BlockId(0),
            children: Vec::new(),
            poisoned: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            is_inline,
        }
    }

    /// Appends an instruction to the current block.
    ///
    /// Panics if an operand does not refer to an earlier instruction.
    pub fn append(
        &mut self,
        kind: InstKind,
        scope: ScopeId,
        location: Option<Location>,
        is_comptime: bool,
        is_gen: bool,
    ) -> InstId {
        let id = InstId(self.insts.len());
        for operand in kind.operands() {
            assert!(
                operand < id,
                "{}: operand {} of {} is not an earlier instruction",
                self.name,
                operand,
                id
            );
        }
        log::trace!("{}: {} = {}", self.name, id, kind);
        self.insts.push(Inst {
            id,
            kind,
            block: self.current_block,
            scope,
            location,
            is_comptime,
            is_gen,
        });
        self.blocks[self.current_block.0].insts.push(id);
        id
    }

    pub fn new_block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock { id, name: name.into(), insts: Vec::new() });
        id
    }

    pub fn set_current_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    /// `true` once the current block ends in a noreturn instruction.
    pub fn is_terminated(&self) -> bool {
        self.blocks[self.current_block.0]
            .insts
            .last()
            .is_some_and(|id| self.insts[id.0].kind.is_noreturn())
    }

    /// Poisons the stream. The first error recorded stays the terminal one.
    pub fn invalidate(&mut self, msg: ErrorMsg) {
        if !self.poisoned {
            log::warn!("{}: poisoned: {}", self.name, msg);
        }
        self.poisoned = true;
        self.errors.push(msg);
    }

    pub fn add_warning(&mut self, msg: ErrorMsg) {
        log::debug!("{}: warning: {}", self.name, msg);
        self.warnings.push(msg);
    }

    /// Embeds a nested compile-time stream and returns its index. A poisoned
    /// child poisons this stream with the child's terminal diagnostic.
    pub fn add_child(&mut self, child: InstStream) -> usize {
        if child.is_poisoned() {
            for err in child.errors() {
                self.invalidate(err.clone());
            }
        }
        self.children.push(child);
        self.children.len() - 1
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn is_inline(&self) -> bool {
        self.is_inline
    }
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
    pub fn terminal_diagnostic(&self) -> Option<&ErrorMsg> {
        self.errors.first()
    }
    pub fn errors(&self) -> &[ErrorMsg] {
        &self.errors
    }
    pub fn warnings(&self) -> &[ErrorMsg] {
        &self.warnings
    }
    pub fn children(&self) -> &[InstStream] {
        &self.children
    }
    pub fn instructions(&self) -> &[Inst] {
        &self.insts
    }
    pub fn inst(&self, id: InstId) -> &Inst {
        &self.insts[id.0]
    }
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }
    pub fn len(&self) -> usize {
        self.insts.len()
    }
    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// Errors followed by warnings, including warnings of child streams.
    /// Child errors are already part of `errors()` once they poison us.
    pub fn diagnostics(&self) -> Vec<ErrorMsg> {
        let mut out = self.errors.clone();
        self.collect_warnings(&mut out);
        out
    }

    fn collect_warnings(&self, out: &mut Vec<ErrorMsg>) {
        out.extend(self.warnings.iter().cloned());
        for child in &self.children {
            child.collect_warnings(out);
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = " ".repeat(indent);
        writeln!(
            f,
            "{}unit {}{}{}:",
            pad,
            self.name,
            if self.is_inline { " [inline]" } else { "" },
            if self.poisoned { " [poisoned]" } else { "" }
        )?;
        for block in &self.blocks {
            if block.insts.is_empty() && block.id.0 != 0 {
                continue;
            }
            writeln!(f, "{}  {} ({}):", pad, block.id, block.name)?;
            for id in &block.insts {
                writeln!(f, "{}    {}", pad, self.insts[id.0])?;
            }
        }
        for child in &self.children {
            child.fmt_indented(f, indent + 2)?;
        }
        Ok(())
    }
}

impl fmt::Display for InstStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
