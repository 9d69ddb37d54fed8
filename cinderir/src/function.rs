//! Functions: exclusively-owned control-flow graphs of basic blocks.
//!
//! A function owns three arenas: values (arguments and instructions), blocks,
//! and a block name table. Blocks reference each other only through the
//! terminator's declared successor *names*, resolved lazily against the name
//! table, so structural edits never chase stale pointers.
//!
//! All sequence mutations (append/insert/remove/splice) live here rather than
//! on [`BasicBlock`] itself: the owning container is the only place that can
//! keep the arena, the back-references and the name table consistent in one
//! step.
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use slotmap::{SecondaryMap, SlotMap};

use crate::{
    block::{BasicBlock, BlockId},
    error::Error,
    observe::{Change, Observer},
    types::Type,
    value::{Argument, Insn, InsnKind, InsnOp, Value, ValueId},
};

pub struct Function {
    original_name: Option<String>,
    name: Option<String>,
    return_type: Type,
    arguments: Vec<ValueId>,
    values: SlotMap<ValueId, Value>,
    blocks: SlotMap<BlockId, BasicBlock>,
    block_names: HashMap<String, BlockId>,
    /// The designated entry block. Removing that block leaves this id stale;
    /// a stale id resolves to nothing (generational arena), so traversals see
    /// "no entry" rather than a dangling reference.
    pub entry: Option<BlockId>,
    name_prefixes: HashSet<String>,
    next_name: u64,
    observer: Option<Arc<dyn Observer>>,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_name(Some(name.into()))
    }

    pub fn anonymous() -> Self {
        Self::with_name(None)
    }

    fn with_name(name: Option<String>) -> Self {
        Function {
            original_name: name.clone(),
            name,
            return_type: Type::Bottom,
            arguments: Vec::new(),
            values: SlotMap::with_key(),
            blocks: SlotMap::with_key(),
            block_names: HashMap::new(),
            entry: None,
            name_prefixes: HashSet::from([String::new()]),
            next_name: 0,
            observer: None,
        }
    }

    /// The name as first assigned, surviving module-level uniquification.
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
        self.touched(Change::Function);
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn set_return_type(&mut self, ty: impl Into<Type>) {
        self.return_type = ty.into();
        self.touched(Change::Function);
    }

    /// Register the change-notification sink for this function.
    pub fn set_observer(&mut self, observer: Arc<dyn Observer>) {
        self.observer = Some(observer);
    }

    fn touched(&self, change: Change) {
        if let Some(observer) = &self.observer {
            observer.notify(change);
        }
    }

    // ---- naming ----------------------------------------------------------

    /// Allocate a name unique within this function.
    ///
    /// Without a prefix, returns the next value of the function-wide counter.
    /// A not-yet-reserved prefix is returned verbatim; a reserved one gets a
    /// `.<n>` suffix drawn from the same shared counter, so no two calls ever
    /// return the same name.
    pub fn make_name(&mut self, prefix: Option<&str>) -> String {
        match prefix {
            None => {
                self.next_name += 1;
                self.next_name.to_string()
            }
            Some(prefix) => {
                if self.name_prefixes.contains(prefix) {
                    self.next_name += 1;
                    format!("{}.{}", prefix, self.next_name)
                } else {
                    self.name_prefixes.insert(prefix.to_string());
                    prefix.to_string()
                }
            }
        }
    }

    // ---- values ----------------------------------------------------------

    /// Create a formal parameter value. The given name runs through
    /// [`Function::make_name`]; omit it for a purely numeric name.
    pub fn new_argument(&mut self, name: Option<&str>, ty: Type) -> ValueId {
        let name = self.make_name(name);
        self.values.insert(Value::Argument(Argument { name, ty }))
    }

    /// Create a detached instruction value with an auto-allocated name.
    /// Attach it with [`Function::append`] and friends. Operands are not
    /// validated here: forward references (phi inputs defined later) are
    /// legitimate during construction.
    pub fn new_insn(
        &mut self,
        ty: Type,
        kind: InsnKind,
        operands: impl IntoIterator<Item = ValueId>,
    ) -> ValueId {
        let name = self.make_name(None);
        self.values.insert(Value::Insn(Insn {
            name,
            ty,
            kind,
            operands: operands.into_iter().collect(),
            block: None,
        }))
    }

    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn value_mut(&mut self, id: ValueId) -> Option<&mut Value> {
        self.values.get_mut(id)
    }

    pub fn insn(&self, id: ValueId) -> Option<&Insn> {
        match self.values.get(id)? {
            Value::Insn(insn) => Some(insn),
            Value::Argument(_) => None,
        }
    }

    pub fn insn_mut(&mut self, id: ValueId) -> Option<&mut Insn> {
        match self.values.get_mut(id)? {
            Value::Insn(insn) => Some(insn),
            Value::Argument(_) => None,
        }
    }

    /// Every value in the arena, attached or not.
    pub fn values(&self) -> impl Iterator<Item = (ValueId, &Value)> {
        self.values.iter()
    }

    // ---- arguments -------------------------------------------------------

    pub fn arguments(&self) -> &[ValueId] {
        &self.arguments
    }

    /// Replace the argument list atomically.
    ///
    /// Every element must resolve in this function's arena and be an
    /// argument-kind value; on any violation the stored list is left exactly
    /// as it was.
    pub fn set_arguments(&mut self, arguments: Vec<ValueId>) -> Result<(), Error> {
        for (index, &id) in arguments.iter().enumerate() {
            match self.values.get(id) {
                None => return Err(Error::UnknownValue),
                Some(value) if !value.is_argument() => {
                    return Err(Error::NotAnArgument { index });
                }
                Some(_) => {}
            }
        }

        self.arguments = arguments;
        self.touched(Change::Function);
        Ok(())
    }

    // ---- blocks ----------------------------------------------------------

    /// Create an empty block. When `name` is `None`, a fresh numeric name is
    /// allocated.
    pub fn create_block(&mut self, name: Option<&str>) -> Result<BlockId, Error> {
        let name = match name {
            Some(name) => {
                if self.block_names.contains_key(name) {
                    return Err(Error::DuplicateBlockName(name.to_string()));
                }
                name.to_string()
            }
            None => loop {
                let candidate = self.make_name(None);
                if !self.block_names.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        let id = self.blocks.insert(BasicBlock::new(name.clone()));
        self.block_names.insert(name, id);
        self.touched(Change::Function);
        Ok(id)
    }

    /// Re-attach a block previously detached from *this* function.
    ///
    /// Instructions of the incoming block that have been claimed by another
    /// block in the meantime, or that no longer resolve, are dropped from the
    /// sequence.
    pub fn add_block(&mut self, block: BasicBlock) -> Result<BlockId, Error> {
        if self.block_names.contains_key(&block.name) {
            return Err(Error::DuplicateBlockName(block.name));
        }

        let BasicBlock { name, insns } = block;
        let insns: Vec<ValueId> = insns
            .into_iter()
            .filter(|&id| matches!(self.values.get(id), Some(Value::Insn(insn)) if insn.block.is_none()))
            .collect();

        let id = self.blocks.insert(BasicBlock {
            name: name.clone(),
            insns: insns.clone(),
        });
        self.block_names.insert(name, id);
        for insn in insns {
            if let Some(Value::Insn(insn)) = self.values.get_mut(insn) {
                insn.block = Some(id);
            }
        }

        self.touched(Change::Function);
        Ok(id)
    }

    /// Detach a block. Its instructions stay alive in the arena (operands
    /// referencing them remain valid) but belong to no block afterwards.
    /// Removing an absent id is a no-op. `entry` is deliberately not updated:
    /// a stale entry id resolves to nothing and is reported as such.
    pub fn remove_block(&mut self, id: BlockId) -> Option<BasicBlock> {
        let block = self.blocks.remove(id)?;
        self.block_names.remove(block.name.as_str());
        for &insn in &block.insns {
            if let Some(Value::Insn(insn)) = self.values.get_mut(insn) {
                insn.block = None;
            }
        }

        self.touched(Change::Function);
        Some(block)
    }

    /// Move a block, together with its instruction values, into `dest`.
    ///
    /// Operand references between instructions of the moved block are
    /// remapped to the destination arena. Operands referring to values
    /// *outside* the block keep their source-function ids and will not
    /// resolve in `dest`; rewriting those is the caller's responsibility.
    pub fn transfer_block_to(
        &mut self,
        id: BlockId,
        dest: &mut Function,
    ) -> Result<BlockId, Error> {
        let name = self.blocks.get(id).ok_or(Error::UnknownBlock)?.name.clone();
        if dest.block_names.contains_key(&name) {
            return Err(Error::DuplicateBlockName(name));
        }

        log::trace!("transferring block `{name}` between functions");
        let block = self.remove_block(id).ok_or(Error::UnknownBlock)?;

        let mut map: SecondaryMap<ValueId, ValueId> = SecondaryMap::new();
        let mut moved = Vec::with_capacity(block.insns.len());
        for &old in &block.insns {
            if let Some(value) = self.values.remove(old) {
                let new = dest.values.insert(value);
                map.insert(old, new);
                moved.push(new);
            }
        }

        for &new in &moved {
            if let Value::Insn(insn) = &mut dest.values[new] {
                for operand in insn.operands.iter_mut() {
                    if let Some(&mapped) = map.get(*operand) {
                        *operand = mapped;
                    }
                }
            }
        }

        let new_id = dest.blocks.insert(BasicBlock {
            name: name.clone(),
            insns: moved.clone(),
        });
        dest.block_names.insert(name, new_id);
        for new in moved {
            if let Value::Insn(insn) = &mut dest.values[new] {
                insn.block = Some(new_id);
            }
        }

        dest.touched(Change::Function);
        Ok(new_id)
    }

    /// Rename a block, keeping the name table consistent.
    pub fn rename_block(&mut self, id: BlockId, name: impl Into<String>) -> Result<(), Error> {
        let name = name.into();
        if !self.blocks.contains_key(id) {
            return Err(Error::UnknownBlock);
        }
        match self.block_names.get(&name) {
            Some(&existing) if existing != id => {
                return Err(Error::DuplicateBlockName(name));
            }
            Some(_) => return Ok(()),
            None => {}
        }

        let old = std::mem::replace(&mut self.blocks[id].name, name.clone());
        self.block_names.remove(&old);
        self.block_names.insert(name, id);
        self.touched(Change::Function);
        Ok(())
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id)
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.get(self.entry?)
    }

    /// Resolve a block name. Fails with [`Error::BlockNotFound`] if no owned
    /// block carries it.
    pub fn find_block(&self, name: &str) -> Result<BlockId, Error> {
        self.block_names
            .get(name)
            .copied()
            .ok_or_else(|| Error::BlockNotFound(name.to_string()))
    }

    pub fn contains_block(&self, name: &str) -> bool {
        self.block_names.contains_key(name)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks.iter()
    }

    // ---- instruction sequences -------------------------------------------

    /// The block an instruction is currently attached to, if that block is
    /// still owned by this function.
    pub fn block_of(&self, insn: ValueId) -> Option<BlockId> {
        match self.values.get(insn)? {
            Value::Insn(insn) => insn.block.filter(|&id| self.blocks.contains_key(id)),
            Value::Argument(_) => None,
        }
    }

    fn claim(&mut self, block: BlockId, insn: ValueId) -> Result<(), Error> {
        if !self.blocks.contains_key(block) {
            return Err(Error::UnknownBlock);
        }
        match self.values.get(insn) {
            None => return Err(Error::UnknownValue),
            Some(Value::Argument(_)) => return Err(Error::NotAnInsn),
            Some(Value::Insn(_)) => {}
        }

        // An instruction attached elsewhere moves: detach first.
        self.detach(insn);
        if let Some(Value::Insn(insn)) = self.values.get_mut(insn) {
            insn.block = Some(block);
        }
        Ok(())
    }

    fn detach(&mut self, insn: ValueId) -> Option<BlockId> {
        let old = match self.values.get_mut(insn) {
            Some(Value::Insn(insn)) => insn.block.take(),
            _ => None,
        };
        if let Some(block) = old {
            if let Some(block) = self.blocks.get_mut(block) {
                block.insns.retain(|&id| id != insn);
            }
        }
        old
    }

    /// Attach `insn` at the tail of `block`.
    pub fn append(&mut self, block: BlockId, insn: ValueId) -> Result<(), Error> {
        self.claim(block, insn)?;
        self.blocks[block].insns.push(insn);
        self.touched(Change::Block(block));
        Ok(())
    }

    /// Attach `insn` at the head of `block`.
    pub fn prepend(&mut self, block: BlockId, insn: ValueId) -> Result<(), Error> {
        self.claim(block, insn)?;
        self.blocks[block].insns.insert(0, insn);
        self.touched(Change::Block(block));
        Ok(())
    }

    /// Attach `insn` immediately prior to `before`. `before` must be attached
    /// to a block of this function and distinct from `insn`.
    pub fn insert_before(&mut self, before: ValueId, insn: ValueId) -> Result<(), Error> {
        if before == insn {
            return Err(Error::InsnNotFound);
        }
        let block = self.block_of(before).ok_or(Error::InsnNotFound)?;
        self.claim(block, insn)?;
        let index = self.blocks[block]
            .position(before)
            .ok_or(Error::InsnNotFound)?;
        self.blocks[block].insns.insert(index, insn);
        self.touched(Change::Block(block));
        Ok(())
    }

    /// Detach `insn` from its block. The value stays alive in the arena so
    /// operands referencing it keep resolving. Detaching an already-detached
    /// instruction is a no-op; returns whether anything changed.
    pub fn remove_insn(&mut self, insn: ValueId) -> bool {
        match self.detach(insn) {
            Some(block) => {
                self.touched(Change::Block(block));
                true
            }
            None => false,
        }
    }

    /// Put `with` in `insn`'s position and detach `insn`.
    pub fn replace_insn(&mut self, insn: ValueId, with: ValueId) -> Result<(), Error> {
        self.insert_before(insn, with)?;
        self.remove_insn(insn);
        Ok(())
    }

    /// Detach every instruction strictly following `after`, returning them in
    /// original order. The caller owns the sequence; the values stay alive in
    /// the arena and can be re-attached to restore the original graph.
    pub fn splice(&mut self, after: ValueId) -> Result<Vec<ValueId>, Error> {
        let block = self.block_of(after).ok_or(Error::InsnNotFound)?;
        let index = self.blocks[block]
            .position(after)
            .ok_or(Error::InsnNotFound)?;

        let tail = self.blocks[block].insns.split_off(index + 1);
        for &insn in &tail {
            if let Some(Value::Insn(insn)) = self.values.get_mut(insn) {
                insn.block = None;
            }
        }

        self.touched(Change::Block(block));
        Ok(tail)
    }

    /// Attached instructions of one block, in order.
    pub fn block_insns(&self, block: BlockId) -> impl Iterator<Item = (ValueId, &Insn)> {
        self.blocks
            .get(block)
            .into_iter()
            .flat_map(|block| block.insns.iter())
            .filter_map(|&id| match self.values.get(id) {
                Some(Value::Insn(insn)) => Some((id, insn)),
                _ => None,
            })
    }

    /// All attached instructions, block by block.
    pub fn insns(&self) -> impl Iterator<Item = (ValueId, &Insn)> {
        self.blocks.values().flat_map(move |block| {
            block.insns.iter().filter_map(move |&id| match self.values.get(id) {
                Some(Value::Insn(insn)) => Some((id, insn)),
                _ => None,
            })
        })
    }

    /// Attached instructions whose kind matches one of `ops`. The filter is a
    /// pass-through predicate over the lazy stream, not a structural index.
    pub fn insns_of<'a>(
        &'a self,
        ops: &'a [InsnOp],
    ) -> impl Iterator<Item = (ValueId, &'a Insn)> + 'a {
        self.insns()
            .filter(move |(_, insn)| ops.contains(&insn.kind.op()))
    }

    // ---- control flow ----------------------------------------------------

    /// The last instruction of a block, by convention its terminator.
    pub fn terminator(&self, block: BlockId) -> Option<&Insn> {
        let last = self.blocks.get(block)?.terminator()?;
        match self.values.get(last) {
            Some(Value::Insn(insn)) => Some(insn),
            _ => None,
        }
    }

    /// Successor names declared by the block's terminator.
    pub fn successor_names(&self, block: BlockId) -> impl Iterator<Item = &str> {
        self.terminator(block)
            .into_iter()
            .flat_map(|insn| insn.kind.successor_names())
    }

    /// Resolve the declared successors to owned blocks, in declaration order.
    /// Fails with [`Error::BlockNotFound`] when a declared name has no
    /// corresponding block.
    pub fn successors(&self, block: BlockId) -> Result<Vec<BlockId>, Error> {
        self.successor_names(block)
            .map(|name| self.find_block(name))
            .collect()
    }

    /// Blocks whose terminator declares `name` as a successor. Linear scan of
    /// every owned block per call; nothing is cached.
    pub fn predecessors_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = BlockId> + 'a {
        self.blocks
            .keys()
            .filter(move |&id| self.successor_names(id).any(|successor| successor == name))
    }

    /// Blocks that may transfer control to `block`.
    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        let name = self.blocks.get(block).map(|block| block.name.clone());
        self.blocks.keys().filter(move |&id| {
            let Some(name) = name.as_deref() else {
                return false;
            };
            self.successor_names(id).any(|successor| successor == name)
        })
    }

    /// True iff the block's terminator leaves the function.
    pub fn exits(&self, block: BlockId) -> bool {
        self.terminator(block).is_some_and(Insn::exits)
    }

    // ---- whole-graph rewrites ---------------------------------------------

    /// Substitute `from` with `to` in every arena value (arguments and
    /// instructions, attached or detached) and in the return type. Used by
    /// template-style type resolution passes.
    pub fn replace_type_with(&mut self, from: &Type, to: &Type) {
        for value in self.values.values_mut() {
            value.replace_type_with(from, to);
        }
        let mut return_type = std::mem::take(&mut self.return_type);
        return_type.replace(from, to);
        self.set_return_type(return_type);
    }
}

/// Deep copy: an independent, isomorphic duplicate with fresh arena ids.
///
/// Structure is cloned in two phases — arguments and block shells first, then
/// instructions in original order — with a memoized original→clone map, so an
/// operand referencing a not-yet-visited instruction resolves by creating the
/// clone on demand. A value shared by several users is cloned exactly once;
/// no clone operand references an original id. The clone's `name` resets to
/// `original_name` and its reserved-prefix set is cleared; detached values
/// that nothing references are not carried over.
impl Clone for Function {
    fn clone(&self) -> Self {
        log::debug!(
            "deep-copying function `{}` ({} blocks, {} values)",
            self.name.as_deref().unwrap_or("<anonymous>"),
            self.blocks.len(),
            self.values.len(),
        );

        let mut values: SlotMap<ValueId, Value> = SlotMap::with_key();
        let mut blocks: SlotMap<BlockId, BasicBlock> = SlotMap::with_key();
        let mut vmap: SecondaryMap<ValueId, ValueId> = SecondaryMap::new();
        let mut bmap: SecondaryMap<BlockId, BlockId> = SecondaryMap::new();
        // Clones whose operand lists still hold original ids.
        let mut pending: Vec<ValueId> = Vec::new();

        let arguments: Vec<ValueId> = self
            .arguments
            .iter()
            .map(|&argument| clone_value(&self.values, &mut values, &mut vmap, &mut pending, argument))
            .collect();

        for (old, block) in &self.blocks {
            let id = blocks.insert(BasicBlock {
                name: block.name.clone(),
                insns: Vec::with_capacity(block.insns.len()),
            });
            bmap.insert(old, id);
        }
        let block_names = self
            .block_names
            .iter()
            .map(|(name, &id)| (name.clone(), bmap[id]))
            .collect();
        // A stale entry id has no mapping and stays unset in the clone.
        let entry = self.entry.and_then(|id| bmap.get(id).copied());

        for (old, block) in &self.blocks {
            let new_block = bmap[old];
            for &insn in &block.insns {
                let id = clone_value(&self.values, &mut values, &mut vmap, &mut pending, insn);
                if let Value::Insn(insn) = &mut values[id] {
                    insn.block = Some(new_block);
                }
                blocks[new_block].insns.push(id);
            }
        }

        while let Some(id) = pending.pop() {
            let mut operands = match &values[id] {
                Value::Insn(insn) => insn.operands.clone(),
                Value::Argument(_) => continue,
            };
            for operand in operands.iter_mut() {
                *operand = clone_value(&self.values, &mut values, &mut vmap, &mut pending, *operand);
            }
            if let Value::Insn(insn) = &mut values[id] {
                insn.operands = operands;
            }
        }

        Function {
            original_name: self.original_name.clone(),
            name: self.original_name.clone(),
            return_type: self.return_type.clone(),
            arguments,
            values,
            blocks,
            block_names,
            entry,
            name_prefixes: HashSet::from([String::new()]),
            next_name: self.next_name,
            observer: self.observer.clone(),
        }
    }
}

/// Memoized clone-on-demand of one value. Already-mapped ids return their
/// clone; ids that do not resolve in the source arena (references into a
/// foreign function) are kept untranslated, which leaves them equally
/// unresolvable in the clone.
fn clone_value(
    src: &SlotMap<ValueId, Value>,
    dst: &mut SlotMap<ValueId, Value>,
    vmap: &mut SecondaryMap<ValueId, ValueId>,
    pending: &mut Vec<ValueId>,
    old: ValueId,
) -> ValueId {
    if let Some(&mapped) = vmap.get(old) {
        return mapped;
    }
    let Some(value) = src.get(old) else {
        return old;
    };

    let mut value = value.clone();
    let is_insn = match &mut value {
        Value::Insn(insn) => {
            // Re-attached by the block walk; detached values stay detached.
            insn.block = None;
            true
        }
        Value::Argument(_) => false,
    };
    let id = dst.insert(value);
    vmap.insert(old, id);
    if is_insn {
        pending.push(id);
    }
    id
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("arguments", &self.arguments)
            .field("blocks", &self.blocks)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}
