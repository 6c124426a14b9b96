use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::error::InternalError;
use crate::lang::node::{Expr, Stmt};
use crate::lang::program::{Program, Storage};
use crate::lang::types::ValueType;
use crate::tac::instr::{Instr, Label, LibFunc, Operand, TacProgram};

/// Hands out fresh temporaries and IF labels for one compilation.
#[derive(Debug, Default)]
pub struct NameAllocator {
    temps: u32,
    end_ifs: u32,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temp(&mut self, ty: ValueType) -> Operand {
        self.temps += 1;
        Operand::Temp { ty, id: self.temps }
    }

    pub fn end_if(&mut self) -> Label {
        self.end_ifs += 1;
        Label::EndIf(self.end_ifs)
    }
}

/// AST -> TAC lowering.
///
/// Emits a `Line` label in front of every statement some GOTO targets, then
/// the statement's code. The list always finishes with `End`, so execution
/// never runs past the last instruction.
pub struct Lowering {
    names: NameAllocator,
    instrs: Vec<Instr>,
}

impl Default for Lowering {
    fn default() -> Self {
        Self::new()
    }
}

impl Lowering {
    pub fn new() -> Self {
        Lowering {
            names: NameAllocator::new(),
            instrs: Vec::new(),
        }
    }

    pub fn lower(mut self, program: &Program) -> Result<TacProgram, InternalError> {
        let targets: BTreeSet<u32> = program
            .statements
            .iter()
            .filter_map(Stmt::goto_target)
            .collect();

        // statement index -> line labels that land on it
        let mut entry_labels: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
        for line in targets {
            let index = program.context.label(line).ok_or_else(|| {
                InternalError::new(format!("GOTO target line {} has no label", line))
            })?;
            entry_labels.entry(index).or_default().push(line);
        }

        for (index, stmt) in program.statements.iter().enumerate() {
            self.emit_labels(entry_labels.get(&index));
            self.lower_stmt(stmt);
        }
        // targets past the last statement (trailing DIM lines)
        self.emit_labels(entry_labels.get(&program.statements.len()));

        if !program.statements.iter().any(Stmt::may_end) {
            warn!("program has no END statement; appending an implicit end");
        }
        self.instrs.push(Instr::End);

        debug!(
            instructions = self.instrs.len(),
            temporaries = self.names.temps,
            "lowered program to TAC"
        );

        Ok(TacProgram {
            instrs: self.instrs,
            storage: Storage::from(&program.context),
        })
    }

    fn emit_labels(&mut self, lines: Option<&Vec<u32>>) {
        for line in lines.into_iter().flatten() {
            self.instrs.push(Instr::Label(Label::Line(*line)));
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Input { prompt, ty, slot } => {
                let shown = self.lower_expr(prompt, None);
                self.instrs.push(Instr::Call {
                    dest: None,
                    func: LibFunc::print(shown.ty()),
                    args: vec![shown],
                });
                self.instrs.push(Instr::Call {
                    dest: Some(Operand::Var {
                        ty: *ty,
                        slot: *slot,
                    }),
                    func: LibFunc::input(*ty),
                    args: Vec::new(),
                });
            }
            Stmt::Assign { ty, slot, value } => {
                let dest = Operand::Var {
                    ty: *ty,
                    slot: *slot,
                };
                self.lower_expr(value, Some(dest));
            }
            Stmt::If { cond, then } => {
                let cond = self.lower_expr(cond, None);
                let end_if = self.names.end_if();
                self.instrs.push(Instr::JumpIfZero {
                    label: end_if.clone(),
                    cond,
                });
                self.lower_stmt(then);
                self.instrs.push(Instr::Label(end_if));
            }
            Stmt::Goto(line) => self.instrs.push(Instr::Jump(Label::Line(*line))),
            Stmt::Print(items) => {
                for item in items {
                    let value = self.lower_expr(item, None);
                    self.instrs.push(Instr::Call {
                        dest: None,
                        func: LibFunc::print(value.ty()),
                        args: vec![value],
                    });
                }
                self.instrs.push(Instr::Call {
                    dest: None,
                    func: LibFunc::PrintNewline,
                    args: Vec::new(),
                });
            }
            Stmt::End => self.instrs.push(Instr::End),
        }
    }

    /// Lowers `expr`, leaving its value in `dest` when given (a fresh
    /// temporary otherwise for operations), and returns where the value is.
    fn lower_expr(&mut self, expr: &Expr, dest: Option<Operand>) -> Operand {
        let leaf = match expr {
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(lhs, None);
                let rhs = self.lower_expr(rhs, None);
                let dest = dest.unwrap_or_else(|| self.names.temp(op.result_type()));
                self.instrs.push(Instr::Binary {
                    op: *op,
                    dest,
                    lhs,
                    rhs,
                });
                return dest;
            }
            Expr::Var { ty, slot } => Operand::Var {
                ty: *ty,
                slot: *slot,
            },
            Expr::Const { ty, index } => Operand::Const {
                ty: *ty,
                index: *index,
            },
        };

        match dest {
            Some(dest) => {
                self.instrs.push(Instr::Copy { dest, src: leaf });
                dest
            }
            None => leaf,
        }
    }
}

/// Lowers a parsed program to TAC.
pub fn lower_program(program: &Program) -> Result<TacProgram, InternalError> {
    Lowering::new().lower(program)
}
