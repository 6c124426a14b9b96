use std::fmt::{self, Write};

/// Assembler dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsmSyntax {
    /// GNU as, AT&T operand order.
    #[default]
    Gas,
    /// NASM, Intel operand order.
    Nasm,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AsmConfig {
    pub syntax: AsmSyntax,
    /// Prepended to external and global C symbols (`_main` on some platforms).
    pub symbol_prefix: String,
}

impl AsmConfig {
    pub fn new(syntax: AsmSyntax) -> Self {
        AsmConfig {
            syntax,
            ..AsmConfig::default()
        }
    }

    pub fn c_symbol(&self, name: &str) -> String {
        format!("{}{}", self.symbol_prefix, name)
    }
}

/// 32-bit x86 registers the code generator touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Eax,
    Ecx,
    Edx,
    Ebp,
    Esp,
    /// Low byte of `eax`, target of `sete`.
    Al,
}

impl Reg {
    fn name(self) -> &'static str {
        match self {
            Reg::Eax => "eax",
            Reg::Ecx => "ecx",
            Reg::Edx => "edx",
            Reg::Ebp => "ebp",
            Reg::Esp => "esp",
            Reg::Al => "al",
        }
    }
}

/// Instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loc {
    Reg(Reg),
    /// The 32-bit word stored at a label.
    Mem(String),
    Imm(i32),
    /// The address of a label.
    Addr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alu {
    Add,
    Sub,
    Imul,
    Cmp,
}

impl Alu {
    fn name(self) -> &'static str {
        match self {
            Alu::Add => "add",
            Alu::Sub => "sub",
            Alu::Imul => "imul",
            Alu::Cmp => "cmp",
        }
    }
}

/// Assembler emission: one method per directive or instruction form.
///
/// Implementations only decide spelling. Which instructions to emit, and in
/// what order, is the code generator's business.
pub trait Assembler {
    fn rodata(&mut self) -> fmt::Result;
    fn data(&mut self) -> fmt::Result;
    fn text(&mut self) -> fmt::Result;

    /// Name of a file-local symbol.
    fn local(&self, name: &str) -> String;

    fn global(&mut self, name: &str) -> fmt::Result;
    fn extern_proc(&mut self, name: &str) -> fmt::Result;
    fn label(&mut self, name: &str) -> fmt::Result;
    fn comment(&mut self, text: &str) -> fmt::Result;

    fn bytes(&mut self, bytes: &[u8]) -> fmt::Result;
    /// A 32-bit data word holding an immediate or an address.
    fn word(&mut self, value: &Loc) -> fmt::Result;

    fn mov(&mut self, dst: &Loc, src: &Loc) -> fmt::Result;
    fn alu(&mut self, op: Alu, dst: Reg, src: &Loc) -> fmt::Result;
    /// Sign-extend `eax` into `edx`.
    fn cdq(&mut self) -> fmt::Result;
    fn idiv(&mut self, src: Reg) -> fmt::Result;
    fn neg(&mut self, dst: Reg) -> fmt::Result;
    fn sete(&mut self, dst: Reg) -> fmt::Result;
    /// Zero-extend a byte register into a 32-bit one.
    fn movzx(&mut self, dst: Reg, src: Reg) -> fmt::Result;

    fn push(&mut self, src: &Loc) -> fmt::Result;
    fn pop(&mut self, dst: Reg) -> fmt::Result;
    fn call(&mut self, name: &str) -> fmt::Result;
    fn jmp(&mut self, label: &str) -> fmt::Result;
    fn jz(&mut self, label: &str) -> fmt::Result;
    fn jnz(&mut self, label: &str) -> fmt::Result;
    fn ret(&mut self) -> fmt::Result;

    /// The text emitted so far.
    fn finish(self: Box<Self>) -> String;
}

/// Builds the emitter for a dialect.
pub fn assembler_for(syntax: AsmSyntax) -> Box<dyn Assembler> {
    match syntax {
        AsmSyntax::Gas => Box::new(GasEmitter::default()),
        AsmSyntax::Nasm => Box::new(NasmEmitter::default()),
    }
}

const BYTES_PER_LINE: usize = 16;

fn byte_list(chunk: &[u8]) -> String {
    chunk.iter().map(u8::to_string).collect::<Vec<_>>().join(", ")
}

/// GNU as, AT&T syntax, 32-bit.
#[derive(Debug, Default)]
pub struct GasEmitter {
    out: String,
}

impl GasEmitter {
    fn operand(&self, loc: &Loc) -> String {
        match loc {
            Loc::Reg(reg) => format!("%{}", reg.name()),
            Loc::Mem(label) => label.clone(),
            Loc::Imm(value) => format!("${}", value),
            Loc::Addr(label) => format!("${}", label),
        }
    }

    fn insn(&mut self, mnemonic: &str, operands: &[&Loc]) -> fmt::Result {
        let operands: Vec<String> = operands.iter().map(|loc| self.operand(loc)).collect();
        if operands.is_empty() {
            writeln!(self.out, "\t{}", mnemonic)
        } else {
            writeln!(self.out, "\t{}\t{}", mnemonic, operands.join(", "))
        }
    }
}

impl Assembler for GasEmitter {
    fn rodata(&mut self) -> fmt::Result {
        writeln!(self.out, "\t.section .rodata")
    }

    fn data(&mut self) -> fmt::Result {
        writeln!(self.out, "\t.data")
    }

    fn text(&mut self) -> fmt::Result {
        writeln!(self.out, "\t.text")
    }

    fn local(&self, name: &str) -> String {
        format!(".L{}", name)
    }

    fn global(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "\t.globl {}", name)
    }

    fn extern_proc(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "\t.extern {}", name)
    }

    fn label(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "{}:", name)
    }

    fn comment(&mut self, text: &str) -> fmt::Result {
        writeln!(self.out, "\t# {}", text)
    }

    fn bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        for chunk in bytes.chunks(BYTES_PER_LINE) {
            writeln!(self.out, "\t.byte {}", byte_list(chunk))?;
        }
        Ok(())
    }

    fn word(&mut self, value: &Loc) -> fmt::Result {
        match value {
            Loc::Imm(value) => writeln!(self.out, "\t.long {}", value),
            Loc::Addr(label) | Loc::Mem(label) => writeln!(self.out, "\t.long {}", label),
            // registers have no data-word encoding
            Loc::Reg(_) => Err(fmt::Error),
        }
    }

    fn mov(&mut self, dst: &Loc, src: &Loc) -> fmt::Result {
        self.insn("movl", &[src, dst])
    }

    fn alu(&mut self, op: Alu, dst: Reg, src: &Loc) -> fmt::Result {
        self.insn(&format!("{}l", op.name()), &[src, &Loc::Reg(dst)])
    }

    fn cdq(&mut self) -> fmt::Result {
        self.insn("cltd", &[])
    }

    fn idiv(&mut self, src: Reg) -> fmt::Result {
        self.insn("idivl", &[&Loc::Reg(src)])
    }

    fn neg(&mut self, dst: Reg) -> fmt::Result {
        self.insn("negl", &[&Loc::Reg(dst)])
    }

    fn sete(&mut self, dst: Reg) -> fmt::Result {
        self.insn("sete", &[&Loc::Reg(dst)])
    }

    fn movzx(&mut self, dst: Reg, src: Reg) -> fmt::Result {
        self.insn("movzbl", &[&Loc::Reg(src), &Loc::Reg(dst)])
    }

    fn push(&mut self, src: &Loc) -> fmt::Result {
        self.insn("pushl", &[src])
    }

    fn pop(&mut self, dst: Reg) -> fmt::Result {
        self.insn("popl", &[&Loc::Reg(dst)])
    }

    fn call(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "\tcall\t{}", name)
    }

    fn jmp(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "\tjmp\t{}", label)
    }

    fn jz(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "\tjz\t{}", label)
    }

    fn jnz(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "\tjnz\t{}", label)
    }

    fn ret(&mut self) -> fmt::Result {
        self.insn("ret", &[])
    }

    fn finish(self: Box<Self>) -> String {
        self.out
    }
}

/// NASM, Intel syntax, 32-bit.
#[derive(Debug, Default)]
pub struct NasmEmitter {
    out: String,
}

impl NasmEmitter {
    fn operand(&self, loc: &Loc) -> String {
        match loc {
            Loc::Reg(reg) => reg.name().to_string(),
            Loc::Mem(label) => format!("dword [{}]", label),
            Loc::Imm(value) => value.to_string(),
            Loc::Addr(label) => label.clone(),
        }
    }

    fn insn(&mut self, mnemonic: &str, operands: &[&Loc]) -> fmt::Result {
        let operands: Vec<String> = operands.iter().map(|loc| self.operand(loc)).collect();
        if operands.is_empty() {
            writeln!(self.out, "\t{}", mnemonic)
        } else {
            writeln!(self.out, "\t{}\t{}", mnemonic, operands.join(", "))
        }
    }
}

impl Assembler for NasmEmitter {
    fn rodata(&mut self) -> fmt::Result {
        writeln!(self.out, "\tsection .rodata")
    }

    fn data(&mut self) -> fmt::Result {
        writeln!(self.out, "\tsection .data")
    }

    fn text(&mut self) -> fmt::Result {
        writeln!(self.out, "\tsection .text")
    }

    // A leading dot would make the symbol local to the previous label.
    fn local(&self, name: &str) -> String {
        format!("L_{}", name)
    }

    fn global(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "\tglobal {}", name)
    }

    fn extern_proc(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "\textern {}", name)
    }

    fn label(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "{}:", name)
    }

    fn comment(&mut self, text: &str) -> fmt::Result {
        writeln!(self.out, "\t; {}", text)
    }

    fn bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        for chunk in bytes.chunks(BYTES_PER_LINE) {
            writeln!(self.out, "\tdb {}", byte_list(chunk))?;
        }
        Ok(())
    }

    fn word(&mut self, value: &Loc) -> fmt::Result {
        match value {
            Loc::Imm(value) => writeln!(self.out, "\tdd {}", value),
            Loc::Addr(label) | Loc::Mem(label) => writeln!(self.out, "\tdd {}", label),
            // registers have no data-word encoding
            Loc::Reg(_) => Err(fmt::Error),
        }
    }

    fn mov(&mut self, dst: &Loc, src: &Loc) -> fmt::Result {
        self.insn("mov", &[dst, src])
    }

    fn alu(&mut self, op: Alu, dst: Reg, src: &Loc) -> fmt::Result {
        self.insn(op.name(), &[&Loc::Reg(dst), src])
    }

    fn cdq(&mut self) -> fmt::Result {
        self.insn("cdq", &[])
    }

    fn idiv(&mut self, src: Reg) -> fmt::Result {
        self.insn("idiv", &[&Loc::Reg(src)])
    }

    fn neg(&mut self, dst: Reg) -> fmt::Result {
        self.insn("neg", &[&Loc::Reg(dst)])
    }

    fn sete(&mut self, dst: Reg) -> fmt::Result {
        self.insn("sete", &[&Loc::Reg(dst)])
    }

    fn movzx(&mut self, dst: Reg, src: Reg) -> fmt::Result {
        self.insn("movzx", &[&Loc::Reg(dst), &Loc::Reg(src)])
    }

    fn push(&mut self, src: &Loc) -> fmt::Result {
        match src {
            Loc::Imm(_) | Loc::Addr(_) => {
                writeln!(self.out, "\tpush\tdword {}", self.operand(src))
            }
            _ => self.insn("push", &[src]),
        }
    }

    fn pop(&mut self, dst: Reg) -> fmt::Result {
        self.insn("pop", &[&Loc::Reg(dst)])
    }

    fn call(&mut self, name: &str) -> fmt::Result {
        writeln!(self.out, "\tcall\t{}", name)
    }

    fn jmp(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "\tjmp\t{}", label)
    }

    fn jz(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "\tjz\t{}", label)
    }

    fn jnz(&mut self, label: &str) -> fmt::Result {
        writeln!(self.out, "\tjnz\t{}", label)
    }

    fn ret(&mut self) -> fmt::Result {
        self.insn("ret", &[])
    }

    fn finish(self: Box<Self>) -> String {
        self.out
    }
}
