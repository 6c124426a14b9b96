use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::node::Stmt;
use super::types::ValueType;

/// A declared variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub ty: ValueType,
    /// Storage index, unique among symbols of the same type.
    pub slot: u16,
}

/// Why the context refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    AlreadyDefined(String),
    TooManySlots(ValueType),
    PoolFull(ValueType),
}

/// Compile-time state for one program: symbols, constant pools and the
/// line-number label table.
///
/// Built by the parser, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProgramContext {
    symbols: HashMap<String, Symbol>,
    int_slots: u16,
    str_slots: u16,
    int_pool: Vec<i32>,
    str_pool: Vec<String>,
    /// Source line number -> index into the statement list.
    labels: BTreeMap<u32, usize>,
}

impl ProgramContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next slot of `ty` for `name`.
    pub fn declare(&mut self, name: &str, ty: ValueType) -> Result<&Symbol, ContextError> {
        if self.symbols.contains_key(name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }

        let counter = match ty {
            ValueType::Int => &mut self.int_slots,
            ValueType::Str => &mut self.str_slots,
        };
        let slot = *counter;
        *counter = counter
            .checked_add(1)
            .ok_or(ContextError::TooManySlots(ty))?;

        let symbol = Symbol {
            name: name.to_string(),
            ty,
            slot,
        };
        Ok(self.symbols.entry(name.to_string()).or_insert(symbol))
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Intern an integer literal, returning its pool index.
    pub fn add_int_const(&mut self, value: i32) -> Result<u16, ContextError> {
        intern(&mut self.int_pool, value, ValueType::Int)
    }

    /// Intern a string literal (already unescaped), returning its pool index.
    pub fn add_str_const(&mut self, value: &str) -> Result<u16, ContextError> {
        if let Some(index) = self.str_pool.iter().position(|s| s == value) {
            return Ok(index as u16);
        }
        intern(&mut self.str_pool, value.to_string(), ValueType::Str)
    }

    pub fn set_label(&mut self, line: u32, index: usize) {
        self.labels.insert(line, index);
    }

    pub fn label(&self, line: u32) -> Option<usize> {
        self.labels.get(&line).copied()
    }

    pub fn labels(&self) -> &BTreeMap<u32, usize> {
        &self.labels
    }

    pub fn slot_count(&self, ty: ValueType) -> u16 {
        match ty {
            ValueType::Int => self.int_slots,
            ValueType::Str => self.str_slots,
        }
    }

    pub fn int_pool(&self) -> &[i32] {
        &self.int_pool
    }

    pub fn str_pool(&self) -> &[String] {
        &self.str_pool
    }
}

fn intern<T: PartialEq>(pool: &mut Vec<T>, value: T, ty: ValueType) -> Result<u16, ContextError> {
    if let Some(index) = pool.iter().position(|v| *v == value) {
        return Ok(index as u16);
    }
    let index = u16::try_from(pool.len()).map_err(|_| ContextError::PoolFull(ty))?;
    pool.push(value);
    Ok(index)
}

/// A parsed program: its context and the flat statement list.
#[derive(Debug, Clone)]
pub struct Program {
    pub context: ProgramContext,
    pub statements: Vec<Stmt>,
}

/// Storage counts and constant pools, detached from the symbol table.
///
/// This is everything the backends need from the context once lowering is done.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub int_slots: u16,
    pub str_slots: u16,
    pub int_pool: Vec<i32>,
    pub str_pool: Vec<String>,
}

impl From<&ProgramContext> for Storage {
    fn from(ctx: &ProgramContext) -> Self {
        Storage {
            int_slots: ctx.int_slots,
            str_slots: ctx.str_slots,
            int_pool: ctx.int_pool.clone(),
            str_pool: ctx.str_pool.clone(),
        }
    }
}
